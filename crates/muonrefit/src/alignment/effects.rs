use crate::identifier::Identifier;
use crate::track::Surface;

/// Alignment discontinuity inserted into a track ahead of the hits it affects.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentEffectsOnTrack {
    delta_translation: f64,
    sigma_delta_translation: f64,
    delta_angle: f64,
    sigma_delta_angle: f64,
    affected: Vec<Identifier>,
    surface: Surface,
}

impl AlignmentEffectsOnTrack {
    pub fn new(
        delta_translation: f64,
        sigma_delta_translation: f64,
        delta_angle: f64,
        sigma_delta_angle: f64,
        affected: Vec<Identifier>,
        surface: Surface,
    ) -> Self {
        Self {
            delta_translation,
            sigma_delta_translation,
            delta_angle,
            sigma_delta_angle,
            affected,
            surface,
        }
    }

    pub fn delta_translation(&self) -> f64 {
        self.delta_translation
    }

    pub fn sigma_delta_translation(&self) -> f64 {
        self.sigma_delta_translation
    }

    pub fn delta_angle(&self) -> f64 {
        self.delta_angle
    }

    pub fn sigma_delta_angle(&self) -> f64 {
        self.sigma_delta_angle
    }

    pub fn affected(&self) -> &[Identifier] {
        &self.affected
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// With no affected-hit list the effect applies to every later hit.
    pub fn effects_last_from_now_on(&self) -> bool {
        self.affected.is_empty()
    }
}
