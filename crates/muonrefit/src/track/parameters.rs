use nalgebra::{Isometry3, Point3, Vector3};

/// Reference surface of a set of track parameters or a measurement.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    /// Line surface along global z through `origin`.
    Perigee { origin: Point3<f64> },
    /// Planar detector surface; the local frame is given by `transform`.
    Plane { transform: Isometry3<f64> },
    /// Straw or wire surface; the wire runs along the local x axis.
    Line { transform: Isometry3<f64> },
}

impl Surface {
    pub fn center(&self) -> Point3<f64> {
        match self {
            Self::Perigee { origin } => *origin,
            Self::Plane { transform } | Self::Line { transform } => {
                Point3::from(transform.translation.vector)
            }
        }
    }

    pub fn is_perigee(&self) -> bool {
        matches!(self, Self::Perigee { .. })
    }
}

/// Charged track state at a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackParameters {
    pub position: Point3<f64>,
    pub momentum: Vector3<f64>,
    pub charge: f64,
    pub surface: Surface,
}

impl TrackParameters {
    pub fn new(
        position: Point3<f64>,
        momentum: Vector3<f64>,
        charge: f64,
        surface: Surface,
    ) -> Self {
        Self {
            position,
            momentum,
            charge,
            surface,
        }
    }

    /// Perigee parameters expressed at `origin` (zero impact parameters).
    pub fn perigee_at(origin: Point3<f64>, momentum: Vector3<f64>, charge: f64) -> Self {
        Self::new(origin, momentum, charge, Surface::Perigee { origin })
    }

    pub fn is_perigee(&self) -> bool {
        self.surface.is_perigee()
    }

    pub fn direction(&self) -> Vector3<f64> {
        self.momentum.normalize()
    }

    pub fn phi(&self) -> f64 {
        self.momentum.y.atan2(self.momentum.x)
    }

    pub fn theta(&self) -> f64 {
        self.momentum.xy().norm().atan2(self.momentum.z)
    }

    pub fn qoverp(&self) -> f64 {
        self.charge / self.momentum.norm()
    }
}

/// Chi-squared and degrees of freedom of a fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitQuality {
    pub chi_squared: f64,
    pub ndof: f64,
}

impl FitQuality {
    pub fn new(chi_squared: f64, ndof: f64) -> Self {
        Self { chi_squared, ndof }
    }

    /// `None` for fits without degrees of freedom.
    pub fn chi2_per_dof(&self) -> Option<f64> {
        (self.ndof > 0.0).then(|| self.chi_squared / self.ndof)
    }
}

/// Particle hypothesis handed to the track fitter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ParticleHypothesis {
    #[default]
    Undefined,
    NonInteracting,
    Muon,
    Pion,
}

/// Pattern-recognition or fitter origin of a track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TrackAuthor {
    #[default]
    Unknown,
    Moore,
    MuidStandalone,
    MuidCombined,
    Refit,
}

/// Provenance metadata carried unchanged through a refit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TrackInfo {
    pub author: TrackAuthor,
    pub particle: ParticleHypothesis,
}

impl TrackInfo {
    pub fn new(author: TrackAuthor, particle: ParticleHypothesis) -> Self {
        Self { author, particle }
    }
}
