use crate::alignment::AlignmentEffectsOnTrack;
use crate::identifier::Identifier;

use super::measurement::Measurement;
use super::parameters::TrackParameters;

/// Role of a track state. A state may carry several roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TsosType {
    Measurement,
    Outlier,
    Hole,
    Perigee,
    Parameter,
    Scatterer,
    Alignment,
}

impl TsosType {
    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Set of [`TsosType`] roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TsosTypes(u8);

impl TsosTypes {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn with(self, t: TsosType) -> Self {
        Self(self.0 | t.bit())
    }

    pub const fn without(self, t: TsosType) -> Self {
        Self(self.0 & !t.bit())
    }

    pub const fn contains(self, t: TsosType) -> bool {
        self.0 & t.bit() != 0
    }
}

impl FromIterator<TsosType> for TsosTypes {
    fn from_iter<I: IntoIterator<Item = TsosType>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatteringAngles {
    pub delta_phi: f64,
    pub delta_theta: f64,
}

/// Material crossed at a track state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialEffects {
    /// Thickness in radiation lengths.
    pub thickness_x0: f64,
    pub scattering: Option<ScatteringAngles>,
    /// Mean energy loss (MeV).
    pub energy_loss: Option<f64>,
}

/// One waypoint of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackStateOnSurface {
    measurement: Option<Measurement>,
    parameters: Option<TrackParameters>,
    material: Option<MaterialEffects>,
    alignment: Option<AlignmentEffectsOnTrack>,
    types: TsosTypes,
}

impl TrackStateOnSurface {
    pub fn new(
        measurement: Option<Measurement>,
        parameters: Option<TrackParameters>,
        material: Option<MaterialEffects>,
        alignment: Option<AlignmentEffectsOnTrack>,
        types: TsosTypes,
    ) -> Self {
        Self {
            measurement,
            parameters,
            material,
            alignment,
            types,
        }
    }

    /// Measurement state, flagged as outlier when `outlier` is set.
    pub fn measurement(
        measurement: Measurement,
        parameters: Option<TrackParameters>,
        outlier: bool,
    ) -> Self {
        let role = if outlier {
            TsosType::Outlier
        } else {
            TsosType::Measurement
        };
        Self::new(Some(measurement), parameters, None, None, TsosTypes::empty().with(role))
    }

    pub fn perigee(parameters: TrackParameters) -> Self {
        Self::new(
            None,
            Some(parameters),
            None,
            None,
            TsosTypes::empty().with(TsosType::Perigee),
        )
    }

    pub fn parameters_only(parameters: TrackParameters) -> Self {
        Self::new(
            None,
            Some(parameters),
            None,
            None,
            TsosTypes::empty().with(TsosType::Parameter),
        )
    }

    pub fn scatterer(parameters: TrackParameters, material: MaterialEffects) -> Self {
        Self::new(
            None,
            Some(parameters),
            Some(material),
            None,
            TsosTypes::empty().with(TsosType::Scatterer),
        )
    }

    pub fn hole(parameters: TrackParameters) -> Self {
        Self::new(None, Some(parameters), None, None, TsosTypes::empty().with(TsosType::Hole))
    }

    pub fn alignment(parameters: TrackParameters, effects: AlignmentEffectsOnTrack) -> Self {
        Self::new(
            None,
            Some(parameters),
            None,
            Some(effects),
            TsosTypes::empty().with(TsosType::Alignment),
        )
    }

    pub fn measurement_on_track(&self) -> Option<&Measurement> {
        self.measurement.as_ref()
    }

    pub fn parameters(&self) -> Option<&TrackParameters> {
        self.parameters.as_ref()
    }

    pub fn material(&self) -> Option<&MaterialEffects> {
        self.material.as_ref()
    }

    pub fn alignment_effects(&self) -> Option<&AlignmentEffectsOnTrack> {
        self.alignment.as_ref()
    }

    pub fn types(&self) -> TsosTypes {
        self.types
    }

    pub fn is(&self, t: TsosType) -> bool {
        self.types.contains(t)
    }

    pub fn is_outlier(&self) -> bool {
        self.is(TsosType::Outlier)
    }

    /// Identifier of the measurement, if the state has one.
    pub fn identifier(&self) -> Option<Identifier> {
        self.measurement.as_ref().and_then(Measurement::identifier)
    }

    /// Copy with the measurement role switched to `Outlier` or `Measurement`.
    pub fn reclassified(&self, outlier: bool) -> Self {
        let (add, remove) = if outlier {
            (TsosType::Outlier, TsosType::Measurement)
        } else {
            (TsosType::Measurement, TsosType::Outlier)
        };
        Self {
            types: self.types.without(remove).with(add),
            ..self.clone()
        }
    }

    /// Copy with a new measurement and parameters, keeping material and
    /// alignment effects.
    pub fn with_updated_measurement(
        &self,
        measurement: Measurement,
        parameters: Option<TrackParameters>,
        outlier: bool,
    ) -> Self {
        let updated = Self {
            measurement: Some(measurement),
            parameters,
            ..self.clone()
        };
        updated.reclassified(outlier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_set_operations() {
        let types: TsosTypes = [TsosType::Measurement, TsosType::Scatterer].into_iter().collect();
        assert!(types.contains(TsosType::Measurement));
        assert!(types.contains(TsosType::Scatterer));
        assert!(!types.contains(TsosType::Outlier));
        let types = types.without(TsosType::Measurement).with(TsosType::Outlier);
        assert!(types.contains(TsosType::Outlier));
        assert!(!types.contains(TsosType::Measurement));
    }
}
