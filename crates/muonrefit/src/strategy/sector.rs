use std::collections::{BTreeMap, BTreeSet};

use crate::identifier::{IdHelper, StationIndex};
use crate::track::Track;

/// Track-level context for the strategy policy: the dominant sector and the
/// barrel/endcap overlap decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectorContext {
    /// Sector with the most distinct precision stations, if any hit counted.
    pub selected_sector: Option<i32>,
    /// Distinct stations in the selected sector.
    pub max_stations: usize,
    /// Overlap track with more endcap than barrel stations.
    pub deweight_barrel: bool,
    /// Overlap track with at least as many barrel as endcap stations.
    pub deweight_endcap: bool,
}

impl SectorContext {
    pub fn from_stations(stations_per_sector: &BTreeMap<i32, BTreeSet<StationIndex>>) -> Self {
        let Some((selected, max_stations)) = select_sector(stations_per_sector) else {
            tracing::warn!("no sector selected");
            return Self::default();
        };

        let selected_set = &stations_per_sector[&selected];
        let n_barrel = selected_set.iter().filter(|s| s.is_barrel()).count();
        let n_endcap = selected_set.iter().filter(|s| s.is_endcap()).count();
        let overlap = n_barrel > 0 && n_endcap > 0;
        let deweight_barrel = overlap && n_barrel < n_endcap;
        let deweight_endcap = overlap && !deweight_barrel;

        tracing::debug!(
            sector = selected,
            n_stations = max_stations,
            n_barrel,
            n_endcap,
            deweight_barrel,
            deweight_endcap,
            "selected sector"
        );

        Self {
            selected_sector: Some(selected),
            max_stations,
            deweight_barrel,
            deweight_endcap,
        }
    }

    /// Collect stations per sector from the non-outlier precision hits of
    /// `track`. Trigger hits and CSC phi hits do not count.
    pub fn scan(track: &Track, id_helper: &dyn IdHelper) -> Self {
        let mut stations: BTreeMap<i32, BTreeSet<StationIndex>> = BTreeMap::new();
        for state in track.states() {
            if state.parameters().is_none() || state.is_outlier() {
                continue;
            }
            let Some(id) = state.identifier() else {
                continue;
            };
            if !id.is_valid() || !id_helper.is_muon(id) {
                continue;
            }
            if id_helper.is_trigger(id) || (id_helper.is_csc(id) && id_helper.measures_phi(id)) {
                continue;
            }
            if let Some(station) = id_helper.station_index(id) {
                stations.entry(id_helper.sector(id)).or_default().insert(station);
            }
        }
        Self::from_stations(&stations)
    }

    pub fn has_barrel_endcap_overlap(&self) -> bool {
        self.deweight_barrel || self.deweight_endcap
    }
}

/// Sector with the most distinct stations and that count.
///
/// Ties go to the lowest sector number, except that a small (even) sector is
/// preferred when the lowest candidate is a large (odd) one and the highest
/// candidate is small.
pub fn select_sector(
    stations_per_sector: &BTreeMap<i32, BTreeSet<StationIndex>>,
) -> Option<(i32, usize)> {
    let max_stations = stations_per_sector.values().map(BTreeSet::len).max()?;
    let candidates: Vec<i32> = stations_per_sector
        .iter()
        .filter(|(_, set)| set.len() == max_stations)
        .map(|(sector, _)| *sector)
        .collect();
    let first = *candidates.first()?;
    let last = *candidates.last()?;
    if candidates.len() > 1 {
        tracing::debug!(
            n_candidates = candidates.len(),
            n_stations = max_stations,
            "special sector configuration, using first sector"
        );
    }
    if first.rem_euclid(2) == 1 && last.rem_euclid(2) != 1 {
        return Some((last, max_stations));
    }
    Some((first, max_stations))
}
