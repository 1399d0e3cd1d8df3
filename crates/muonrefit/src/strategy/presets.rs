use serde::{Deserialize, Serialize};

use super::{ErrorFlag, ErrorStrategy, ErrorStyle};

/// Named entries of [`ErrorStrategyPresets`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresetKind {
    Bee,
    Ee,
    Bis78,
    Bxe,
    Eel1c05,
    BarrelEndcap,
    OtherSector,
    TwoStations,
    DefaultScaled,
    Muon,
}

/// The fixed strategy table built once per tool instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorStrategyPresets {
    pub bee: ErrorStrategy,
    pub ee: ErrorStrategy,
    pub bis78: ErrorStrategy,
    pub bxe: ErrorStrategy,
    pub eel1c05: ErrorStrategy,
    pub barrel_endcap: ErrorStrategy,
    pub other_sector: ErrorStrategy,
    pub two_stations: ErrorStrategy,
    pub default_scaled: ErrorStrategy,
    pub muon: ErrorStrategy,
}

impl ErrorStrategyPresets {
    pub fn new() -> Self {
        let base = ErrorStrategy::new(ErrorStyle::Moore);
        let station = base.with(ErrorFlag::StationError, true);
        let fixed = base.with(ErrorFlag::FixedError, true);
        Self {
            bee: station,
            ee: station,
            bis78: station,
            bxe: station,
            eel1c05: station,
            barrel_endcap: fixed.with(ErrorFlag::BroadError, true),
            other_sector: fixed,
            two_stations: station,
            default_scaled: base.with(ErrorFlag::ScaledError, true),
            muon: ErrorStrategy::new(ErrorStyle::Muon).with(ErrorFlag::ScaledError, true),
        }
    }

    pub fn get(&self, kind: PresetKind) -> ErrorStrategy {
        match kind {
            PresetKind::Bee => self.bee,
            PresetKind::Ee => self.ee,
            PresetKind::Bis78 => self.bis78,
            PresetKind::Bxe => self.bxe,
            PresetKind::Eel1c05 => self.eel1c05,
            PresetKind::BarrelEndcap => self.barrel_endcap,
            PresetKind::OtherSector => self.other_sector,
            PresetKind::TwoStations => self.two_stations,
            PresetKind::DefaultScaled => self.default_scaled,
            PresetKind::Muon => self.muon,
        }
    }
}

impl Default for ErrorStrategyPresets {
    fn default() -> Self {
        Self::new()
    }
}
