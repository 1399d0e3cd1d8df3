use std::collections::{BTreeMap, BTreeSet};

use crate::alignment::{AlignmentDeviation, AlignmentEffectsOnTrack};
use crate::config::RefitSettings;
use crate::identifier::{Identifier, StationIndex};
use crate::track::{Track, TrackStateOnSurface};

use super::{MuonRefitTool, StageError};

/// Lower bound on the translation uncertainty of an inserted effect (mm).
const TRANSLATION_SIGMA_FLOOR: f64 = 0.01;
/// Lower bound on the rotation uncertainty of an inserted effect (rad).
const ROTATION_SIGMA_FLOOR: f64 = 1e-6;

/// Translation and rotation sigmas keyed by the affected-hit list.
pub(crate) type AlignmentErrorMap = BTreeMap<Vec<Identifier>, (f64, f64)>;

/// Pair every translation with the first rotation over the same hit list.
///
/// Unpaired rotations are kept with zero translation error. The first entry
/// for a given hit list wins.
pub(crate) fn pair_deviations(deviations: &[AlignmentDeviation]) -> AlignmentErrorMap {
    let mut map = AlignmentErrorMap::new();
    let mut used = vec![false; deviations.len()];

    for translation in deviations.iter().filter(|d| d.is_translation()) {
        let mut angle_error = 0.0;
        if !translation.hits().is_empty() {
            let rotations = deviations.iter().enumerate().filter(|(_, d)| d.is_rotation());
            for (index, rotation) in rotations {
                match (rotation.hash_of_hits(), translation.hash_of_hits()) {
                    (Some(r), Some(t)) if r == t => {
                        angle_error = rotation.sigma();
                        used[index] = true;
                        break;
                    }
                    (Some(_), Some(_)) => {}
                    _ => tracing::error!("alignment deviation with invalid hit-set hash"),
                }
            }
        }
        tracing::debug!(
            n_hits = translation.hits().len(),
            translation_error = translation.sigma(),
            angle_error,
            "alignment map entry"
        );
        map.entry(translation.hits().to_vec())
            .or_insert((translation.sigma(), angle_error));
    }

    for (index, rotation) in deviations.iter().enumerate() {
        if !rotation.is_rotation() || used[index] {
            continue;
        }
        tracing::error!(
            n_hits = rotation.hits().len(),
            angle_error = rotation.sigma(),
            "rotation deviation without matching translation"
        );
        map.entry(rotation.hits().to_vec()).or_insert((0.0, rotation.sigma()));
    }
    map
}

impl MuonRefitTool {
    /// MDT error update with the muon strategy followed by alignment effects.
    pub fn update_alignment_errors(
        &self,
        track: &Track,
        settings: &RefitSettings,
    ) -> Result<Track, StageError> {
        let updated = self.update_mdt_errors(track, settings)?;
        if self.config.simple_aeots {
            self.make_simple_aeots(&updated)
        } else {
            self.make_aeots(&updated)
        }
    }

    /// Insert one alignment effect per deviation hit list reported by the
    /// alignment-error tool, in front of the middle hit of the list.
    pub fn make_aeots(&self, track: &Track) -> Result<Track, StageError> {
        if track.is_empty() {
            tracing::warn!("track without states, discarding track");
            return Err(StageError::NoStates);
        }
        let Some(tool) = &self.tools.alignment_tool else {
            tracing::debug!("no alignment error tool configured");
            return Ok(track.clone());
        };

        let deviations = tool.make_alignment_deviations(track);
        let errors = pair_deviations(&deviations);
        tracing::debug!(n_entries = errors.len(), "alignment map");

        let mut insertions: Vec<(usize, TrackStateOnSurface)> = Vec::new();
        for (hits, &(translation_error, angle_error)) in &errors {
            let Some(&middle) = hits.get(hits.len() / 2) else {
                tracing::warn!("alignment deviation without hits");
                continue;
            };
            let position = track.states().iter().position(|s| s.identifier() == Some(middle));
            let Some(index) = position else {
                tracing::warn!(
                    id = %self.tools.id_helper.describe(middle),
                    "identifier from alignment error tool not found on track"
                );
                continue;
            };
            let anchor = &track.states()[index];
            let (Some(pars), Some(measurement)) =
                (anchor.parameters(), anchor.measurement_on_track())
            else {
                tracing::warn!(index, "alignment anchor without parameters");
                continue;
            };
            let effects = AlignmentEffectsOnTrack::new(
                0.0,
                translation_error.max(TRANSLATION_SIGMA_FLOOR),
                0.0,
                angle_error.max(ROTATION_SIGMA_FLOOR),
                hits.clone(),
                measurement.surface().clone(),
            );
            insertions.push((index, TrackStateOnSurface::alignment(pars.clone(), effects)));
        }

        let helper = self.tools.id_helper.as_ref();
        let chambers: BTreeSet<_> = track
            .states()
            .iter()
            .filter_map(TrackStateOnSurface::identifier)
            .filter(|id| id.is_valid() && helper.is_mdt(*id))
            .filter_map(|id| helper.chamber_index(id))
            .collect();
        if insertions.is_empty() && chambers.len() > 1 {
            tracing::warn!(n_chambers = chambers.len(), "track without alignment effects");
        }

        let mut states = Vec::with_capacity(track.len() + insertions.len());
        for (index, state) in track.states().iter().enumerate() {
            states.extend(
                insertions
                    .iter()
                    .filter(|(at, _)| *at == index)
                    .map(|(_, aeot)| aeot.clone()),
            );
            if state.alignment_effects().is_some() {
                tracing::debug!(index, "skipping old alignment effects");
                continue;
            }
            states.push(state.clone());
        }
        Ok(track.with_states(states))
    }

    /// Insert alignment effects with fixed values at the middle (and
    /// optionally inner) stations, without consulting the alignment tool.
    pub fn make_simple_aeots(&self, track: &Track) -> Result<Track, StageError> {
        if track.is_empty() {
            tracing::warn!("track without states, discarding track");
            return Err(StageError::NoStates);
        }
        let cfg = &self.config.simple;
        let helper = self.tools.id_helper.as_ref();

        let mut middle: Vec<usize> = Vec::new();
        let mut inner: Vec<usize> = Vec::new();
        for (index, state) in track.states().iter().enumerate() {
            if state.parameters().is_none() || state.is_outlier() {
                continue;
            }
            let Some(id) = state.identifier() else {
                continue;
            };
            if state.alignment_effects().is_some() {
                tracing::warn!(index, "alignment effects already on track, skipping state");
                continue;
            }
            if !id.is_valid() || !helper.is_muon(id) {
                continue;
            }
            if helper.is_trigger(id) || (helper.is_csc(id) && helper.measures_phi(id)) {
                continue;
            }
            if cfg.add_all {
                middle.push(index);
                continue;
            }
            match helper.station_index(id) {
                Some(StationIndex::BM | StationIndex::EM) => {
                    middle.push(index);
                    if cfg.add_two {
                        inner.push(index);
                    }
                }
                Some(StationIndex::BI | StationIndex::EI) => inner.push(index),
                _ => {}
            }
        }

        if middle.is_empty() && inner.is_empty() {
            return Ok(track.clone());
        }

        let mut middle_aeot = if cfg.add_middle || cfg.add_all {
            self.simple_aeot_state(track, &middle)
        } else {
            None
        };
        let mut inner_aeot = if cfg.add_inner || cfg.add_two {
            self.simple_aeot_state(track, &inner)
        } else {
            None
        };

        let mut states = Vec::with_capacity(track.len() + 2);
        for (index, state) in track.states().iter().enumerate() {
            if middle.first() == Some(&index) {
                if let Some(aeot) = middle_aeot.take() {
                    tracing::debug!(
                        index,
                        n_affected = middle.len(),
                        all = cfg.add_all,
                        "middle alignment effects added"
                    );
                    states.push(aeot);
                }
            }
            if inner.first() == Some(&index) {
                if let Some(aeot) = inner_aeot.take() {
                    tracing::debug!(
                        index,
                        n_affected = inner.len(),
                        "inner alignment effects added"
                    );
                    states.push(aeot);
                }
            }
            states.push(state.clone());
        }
        Ok(track.with_states(states))
    }

    /// Alignment state anchored on the middle of `indices`, affecting all of them.
    fn simple_aeot_state(&self, track: &Track, indices: &[usize]) -> Option<TrackStateOnSurface> {
        let cfg = &self.config.simple;
        let anchor = &track.states()[*indices.get(indices.len() / 2)?];
        let affected: Vec<Identifier> = indices
            .iter()
            .filter_map(|&i| track.states()[i].identifier())
            .collect();
        let effects = AlignmentEffectsOnTrack::new(
            cfg.delta,
            cfg.delta_error,
            cfg.angle,
            cfg.angle_error,
            affected,
            anchor.measurement_on_track()?.surface().clone(),
        );
        Some(TrackStateOnSurface::alignment(anchor.parameters()?.clone(), effects))
    }
}
