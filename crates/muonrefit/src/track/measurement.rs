use nalgebra::Point3;

use crate::identifier::Identifier;
use crate::strategy::ErrorStrategy;

use super::parameters::Surface;

/// Calibrated MDT drift circle on track.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftCircleHit {
    pub id: Identifier,
    /// Signed drift radius (mm); the sign resolves the left/right ambiguity.
    pub drift_radius: f64,
    /// Variance of the drift radius (mm²).
    pub covariance: f64,
    /// Error from the drift-time calibration alone (mm).
    pub calibration_sigma: f64,
    /// Wire position closest to the track, global frame.
    pub wire_position: Point3<f64>,
    pub surface: Surface,
    /// Strategy the current covariance was computed with.
    pub error_strategy: ErrorStrategy,
}

impl DriftCircleHit {
    pub fn sigma(&self) -> f64 {
        self.covariance.sqrt()
    }

    /// Copy of the hit with a recomputed covariance.
    pub fn with_error(&self, covariance: f64, strategy: ErrorStrategy) -> Self {
        Self {
            covariance,
            error_strategy: strategy,
            ..self.clone()
        }
    }
}

/// One-dimensional strip or pad measurement of any non-MDT technology.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterHit {
    pub id: Identifier,
    pub local_position: f64,
    pub covariance: f64,
    pub surface: Surface,
}

/// Constraint without a detector identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct PseudoMeasurement {
    pub local_position: f64,
    pub covariance: f64,
    pub surface: Surface,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    DriftCircle(DriftCircleHit),
    Cluster(ClusterHit),
    Pseudo(PseudoMeasurement),
}

impl Measurement {
    /// Detector identifier; `None` for pseudo measurements.
    pub fn identifier(&self) -> Option<Identifier> {
        match self {
            Self::DriftCircle(hit) => Some(hit.id),
            Self::Cluster(hit) => Some(hit.id),
            Self::Pseudo(_) => None,
        }
    }

    pub fn surface(&self) -> &Surface {
        match self {
            Self::DriftCircle(hit) => &hit.surface,
            Self::Cluster(hit) => &hit.surface,
            Self::Pseudo(m) => &m.surface,
        }
    }

    pub fn covariance(&self) -> f64 {
        match self {
            Self::DriftCircle(hit) => hit.covariance,
            Self::Cluster(hit) => hit.covariance,
            Self::Pseudo(m) => m.covariance,
        }
    }

    pub fn as_drift_circle(&self) -> Option<&DriftCircleHit> {
        match self {
            Self::DriftCircle(hit) => Some(hit),
            _ => None,
        }
    }
}
