use nalgebra::{Isometry3, Matrix1, Point3, Translation3, Unit, UnitQuaternion, Vector3};
use sha2::{Digest, Sha256};

use crate::identifier::Identifier;

/// Order-sensitive digest of a hit-identifier list.
///
/// Two deviations describe the same misalignment exactly when their hit
/// lists, in order, hash equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HitSetHash([u8; 32]);

impl HitSetHash {
    pub fn of(hits: &[Identifier]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((hits.len() as u64).to_be_bytes());
        for id in hits {
            hasher.update(id.raw().to_be_bytes());
        }
        Self(hasher.finalize().into())
    }
}

impl std::fmt::Display for HitSetHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in &self.0[..8] {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviationKind {
    /// Shift along `direction`.
    Translation { direction: Unit<Vector3<f64>> },
    /// Rotation about `axis` through `center`.
    Rotation {
        axis: Unit<Vector3<f64>>,
        center: Point3<f64>,
    },
}

/// One-parameter misalignment hypothesis affecting a list of hits.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentDeviation {
    kind: DeviationKind,
    covariance: Matrix1<f64>,
    hits: Vec<Identifier>,
    hash: Option<HitSetHash>,
}

impl AlignmentDeviation {
    pub const N_PARAMETERS: usize = 1;

    /// Translation with 1-sigma uncertainty `sigma` (mm).
    pub fn translation(direction: Unit<Vector3<f64>>, sigma: f64, hits: Vec<Identifier>) -> Self {
        Self::new(DeviationKind::Translation { direction }, sigma, hits)
    }

    /// Rotation with 1-sigma uncertainty `sigma` (rad).
    pub fn rotation(
        axis: Unit<Vector3<f64>>,
        center: Point3<f64>,
        sigma: f64,
        hits: Vec<Identifier>,
    ) -> Self {
        Self::new(DeviationKind::Rotation { axis, center }, sigma, hits)
    }

    fn new(kind: DeviationKind, sigma: f64, hits: Vec<Identifier>) -> Self {
        let hash = Some(HitSetHash::of(&hits));
        Self {
            kind,
            covariance: Matrix1::new(sigma * sigma),
            hits,
            hash,
        }
    }

    /// Same deviation without a hit-set hash, as produced by tools that do
    /// not stamp one.
    pub fn without_hash(self) -> Self {
        Self { hash: None, ..self }
    }

    pub fn kind(&self) -> &DeviationKind {
        &self.kind
    }

    pub fn is_translation(&self) -> bool {
        matches!(self.kind, DeviationKind::Translation { .. })
    }

    pub fn is_rotation(&self) -> bool {
        matches!(self.kind, DeviationKind::Rotation { .. })
    }

    pub fn n_parameters(&self) -> usize {
        Self::N_PARAMETERS
    }

    pub fn covariance(&self) -> &Matrix1<f64> {
        &self.covariance
    }

    /// 1-sigma uncertainty of the single parameter.
    pub fn sigma(&self) -> f64 {
        self.covariance[(0, 0)].sqrt()
    }

    pub fn hits(&self) -> &[Identifier] {
        &self.hits
    }

    pub fn hash_of_hits(&self) -> Option<HitSetHash> {
        self.hash
    }

    /// Rigid transform for parameter values `params`; `None` unless exactly
    /// [`Self::N_PARAMETERS`] values are given.
    pub fn transform(&self, params: &[f64]) -> Option<Isometry3<f64>> {
        let [value] = params else {
            return None;
        };
        Some(match &self.kind {
            DeviationKind::Translation { direction } => {
                let shift = Translation3::from(direction.into_inner() * *value);
                Isometry3::from_parts(shift, UnitQuaternion::identity())
            }
            DeviationKind::Rotation { axis, center } => {
                let rotation = UnitQuaternion::from_axis_angle(axis, *value);
                Isometry3::rotation_wrt_point(rotation, *center)
            }
        })
    }
}
