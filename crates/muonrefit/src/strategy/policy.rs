use crate::config::{DeweightConfig, RefitSettings};
use crate::identifier::{ChamberIndex, IdHelper, Identifier, StationIndex};

use super::presets::{ErrorStrategyPresets, PresetKind};
use super::sector::SectorContext;
use super::{ErrorFlag, ErrorStrategy};

/// Location of one MDT hit, as needed by [`select_strategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitClassification {
    pub station_index: StationIndex,
    pub chamber_index: ChamberIndex,
    pub station_eta: i32,
    pub station_phi: i32,
    pub sector: i32,
    pub is_bme: bool,
}

impl HitClassification {
    /// `None` for identifiers the helper cannot place in a station.
    pub fn of(id: Identifier, id_helper: &dyn IdHelper) -> Option<Self> {
        Some(Self {
            station_index: id_helper.station_index(id)?,
            chamber_index: id_helper.chamber_index(id)?,
            station_eta: id_helper.station_eta(id),
            station_phi: id_helper.station_phi(id),
            sector: id_helper.sector(id),
            is_bme: id_helper.is_bme(id),
        })
    }
}

/// Outcome of the per-hit strategy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyDecision {
    pub preset: PresetKind,
    pub strategy: ErrorStrategy,
    /// The hit must end up flagged as an outlier.
    pub outlier: bool,
    /// Deweighted because it lies outside the selected sector.
    pub deweighted_other_sector: bool,
    /// Removed because it lies outside the selected sector.
    pub removed_other_sector: bool,
}

impl StrategyDecision {
    fn preset(presets: &ErrorStrategyPresets, preset: PresetKind) -> Self {
        Self {
            preset,
            strategy: presets.get(preset),
            outlier: false,
            deweighted_other_sector: false,
            removed_other_sector: false,
        }
    }
}

/// Pick the error strategy for one MDT hit. First matching rule wins.
///
/// `has_t0_fit` is carried over from the strategy the hit was created with.
pub fn select_strategy(
    hit: &HitClassification,
    ctx: &SectorContext,
    deweight: &DeweightConfig,
    settings: &RefitSettings,
    presets: &ErrorStrategyPresets,
    has_t0_fit: bool,
) -> StrategyDecision {
    let other_sector = ctx.selected_sector != Some(hit.sector);

    let mut decision = if !deweight.two_station_tracks || ctx.max_stations > 2 {
        select_station_preset(hit, ctx, deweight, settings, presets, has_t0_fit, other_sector)
    } else {
        StrategyDecision::preset(presets, PresetKind::TwoStations)
    };

    if settings.remove_other_sectors && other_sector {
        decision.outlier = true;
        decision.removed_other_sector = true;
    }
    decision
}

fn select_station_preset(
    hit: &HitClassification,
    ctx: &SectorContext,
    deweight: &DeweightConfig,
    settings: &RefitSettings,
    presets: &ErrorStrategyPresets,
    has_t0_fit: bool,
    other_sector: bool,
) -> StrategyDecision {
    let station = hit.station_index;
    let preset = |kind| StrategyDecision::preset(presets, kind);

    if deweight.eel1c05
        && station == StationIndex::EE
        && hit.chamber_index == ChamberIndex::EEL
        && hit.station_eta < 0
        && hit.station_phi == 3
    {
        return preset(PresetKind::Eel1c05);
    }
    let overlap_minority = (ctx.deweight_barrel && station.is_barrel())
        || (ctx.deweight_endcap && station.is_endcap());
    if overlap_minority {
        let mut d = preset(PresetKind::BarrelEndcap);
        d.outlier = settings.remove_barrel_endcap_overlap;
        return d;
    }
    if settings.deweight_other_sectors && other_sector {
        let mut d = preset(PresetKind::OtherSector);
        d.deweighted_other_sector = true;
        return d;
    }
    if deweight.bee && station == StationIndex::BE {
        let mut d = preset(PresetKind::Bee);
        d.outlier = settings.remove_bee;
        return d;
    }
    if deweight.ee && station == StationIndex::EE {
        return preset(PresetKind::Ee);
    }
    if deweight.bis78
        && station == StationIndex::BI
        && hit.chamber_index == ChamberIndex::BIS
        && hit.station_eta.abs() > 6
    {
        return preset(PresetKind::Bis78);
    }
    if deweight.bme && station == StationIndex::BM && hit.station_phi == 7 && hit.is_bme {
        return preset(PresetKind::Bxe);
    }
    if deweight.boe
        && station == StationIndex::BO
        && hit.chamber_index == ChamberIndex::BOL
        && hit.station_eta.abs() == 7
        && hit.station_phi == 7
    {
        return preset(PresetKind::Bxe);
    }

    let mut d = preset(PresetKind::DefaultScaled);
    if has_t0_fit {
        d.strategy.set(ErrorFlag::T0Refit, true);
    }
    if settings.broad {
        d.strategy.set(ErrorFlag::BroadError, true);
    }
    d
}
