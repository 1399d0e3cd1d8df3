use crate::config::RefitSettings;
use crate::identifier::{Identifier, Technology};
use crate::strategy::{
    select_strategy, ErrorFlag, HitClassification, PresetKind, SectorContext, StrategyDecision,
};
use crate::track::{Measurement, Track, TrackParameters, TrackStateOnSurface, TsosType};

use super::stats::RefitCounters;
use super::{MuonRefitTool, StageError};

/// How MDT strategies are chosen during an error update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorUpdateMode {
    /// Full decision table with sector and overlap handling.
    SectorAware,
    /// Muon-style scaled errors for every MDT hit.
    MuonStrategy,
}

#[derive(Debug, Default)]
struct UpdateTally {
    deweighted_hits: u64,
    removed_sector_hits: u64,
}

/// Fit starting parameters: the first perigee-flagged state whose parameters
/// are not on a perigee surface, else the first parameters on the track.
/// Returns the state index with the parameters.
pub(crate) fn find_start_parameters(track: &Track) -> Option<(usize, &TrackParameters)> {
    let mut start = None;
    for (index, state) in track.states().iter().enumerate() {
        let Some(pars) = state.parameters() else {
            continue;
        };
        if state.is(TsosType::Perigee) && !pars.is_perigee() {
            if start.is_none() {
                start = Some((index, pars));
            } else {
                tracing::warn!("track with two fit starting parameters");
            }
        }
    }
    start.or_else(|| {
        track
            .states()
            .iter()
            .enumerate()
            .find_map(|(index, state)| state.parameters().map(|pars| (index, pars)))
    })
}

impl MuonRefitTool {
    /// Recompute all muon hit errors with the sector-aware strategy table.
    pub fn update_errors(
        &self,
        track: &Track,
        settings: &RefitSettings,
    ) -> Result<Track, StageError> {
        self.rebuild_with_errors(track, settings, ErrorUpdateMode::SectorAware)
    }

    /// Recompute MDT errors with the muon strategy only.
    pub fn update_mdt_errors(
        &self,
        track: &Track,
        settings: &RefitSettings,
    ) -> Result<Track, StageError> {
        self.rebuild_with_errors(track, settings, ErrorUpdateMode::MuonStrategy)
    }

    fn rebuild_with_errors(
        &self,
        track: &Track,
        settings: &RefitSettings,
        mode: ErrorUpdateMode,
    ) -> Result<Track, StageError> {
        if track.is_empty() {
            tracing::warn!("track without states, discarding track");
            return Err(StageError::NoStates);
        }
        let Some((start_index, start_pars)) = find_start_parameters(track) else {
            tracing::warn!("track without parameters, cannot update errors");
            return Err(StageError::NoParameters);
        };

        let ctx = match mode {
            ErrorUpdateMode::SectorAware => {
                SectorContext::scan(track, self.tools.id_helper.as_ref())
            }
            ErrorUpdateMode::MuonStrategy => SectorContext::default(),
        };

        let mut tally = UpdateTally::default();
        let mut added_perigee = false;
        let mut states = Vec::with_capacity(track.len() + 5);

        for (index, state) in track.states().iter().enumerate() {
            let pars = state.parameters();
            if settings.prepare_for_fit && pars.is_none() {
                if added_perigee {
                    states.push(state.clone());
                } else {
                    tracing::debug!(index, "dropping state before perigee");
                }
                continue;
            }

            let keep_start = settings.prepare_for_fit && !settings.recreate_starting_parameters;
            if keep_start && state.is(TsosType::Perigee) {
                if index == start_index {
                    tracing::debug!(index, "found fit starting parameters");
                    states.push(TrackStateOnSurface::perigee(TrackParameters::perigee_at(
                        start_pars.position,
                        start_pars.momentum,
                        start_pars.charge,
                    )));
                    added_perigee = true;
                } else {
                    tracing::debug!(index, "removing perigee");
                }
                continue;
            }

            let Some(measurement) = state.measurement_on_track() else {
                states.push(state.clone());
                continue;
            };

            let recreate = settings.prepare_for_fit && settings.recreate_starting_parameters;
            if recreate && !added_perigee {
                if let Some(pars) = pars {
                    states.push(TrackStateOnSurface::perigee(self.recreated_perigee(pars)));
                    added_perigee = true;
                    tracing::debug!(index, "adding perigee in front of first measurement");
                }
            }

            let id = match measurement.identifier() {
                Some(id) if id.is_valid() && self.tools.id_helper.is_muon(id) => id,
                _ => {
                    states.push(state.clone());
                    continue;
                }
            };

            if !settings.update_errors {
                states.push(state.clone());
                continue;
            }

            states.push(self.updated_muon_state(
                state,
                measurement,
                id,
                settings,
                &ctx,
                mode,
                &mut tally,
            ));
        }

        if tally.deweighted_hits > 0 {
            tracing::debug!(
                n = tally.deweighted_hits,
                "deweighted MDT hits from neighbouring sectors"
            );
        }
        if tally.removed_sector_hits > 0 {
            tracing::debug!(
                n = tally.removed_sector_hits,
                "removed MDT hits from neighbouring sectors"
            );
        }
        RefitCounters::add(&self.counters.deweighted_hits, tally.deweighted_hits);
        RefitCounters::add(&self.counters.removed_sector_hits, tally.removed_sector_hits);

        tracing::trace!(n_in = track.len(), n_out = states.len(), "rebuilt track states");
        Ok(track.with_states(states))
    }

    /// Perigee placed a fixed distance in front of `pars`, towards the
    /// interaction point.
    fn recreated_perigee(&self, pars: &TrackParameters) -> TrackParameters {
        let sign = if pars.position.coords.dot(&pars.momentum) > 0.0 {
            1.0
        } else {
            -1.0
        };
        let offset = self.config.recreated_perigee_offset * sign;
        let origin = pars.position - pars.direction() * offset;
        TrackParameters::perigee_at(origin, pars.momentum, pars.charge)
    }

    #[allow(clippy::too_many_arguments)]
    fn updated_muon_state(
        &self,
        state: &TrackStateOnSurface,
        measurement: &Measurement,
        id: Identifier,
        settings: &RefitSettings,
        ctx: &SectorContext,
        mode: ErrorUpdateMode,
        tally: &mut UpdateTally,
    ) -> TrackStateOnSurface {
        let helper = self.tools.id_helper.as_ref();
        let chamber = helper.chamber_id(id);
        let station = helper.station_index(id);
        let listed = settings.chambers_to_be_removed.contains(&chamber)
            || station.is_some_and(|s| settings.precision_layers_to_be_removed.contains(&s));

        match helper.technology(id) {
            Some(Technology::Mdt) => {
                let Measurement::DriftCircle(hit) = measurement else {
                    tracing::warn!(
                        id = %helper.describe(id),
                        "measurement with MDT identifier that is not a drift circle"
                    );
                    return state.clone();
                };
                let has_t0_fit = hit.error_strategy.has(ErrorFlag::T0Refit);
                let decision = match mode {
                    ErrorUpdateMode::SectorAware => {
                        let Some(class) = HitClassification::of(id, helper) else {
                            tracing::warn!(
                                id = %helper.describe(id),
                                "MDT hit outside known stations"
                            );
                            return state.clone();
                        };
                        let deweight = &self.config.deweight;
                        select_strategy(&class, ctx, deweight, settings, &self.presets, has_t0_fit)
                    }
                    ErrorUpdateMode::MuonStrategy => self.muon_decision(has_t0_fit, settings.broad),
                };
                if decision.deweighted_other_sector {
                    tally.deweighted_hits += 1;
                }
                if decision.removed_other_sector {
                    tally.removed_sector_hits += 1;
                }

                let mut outlier = state.is_outlier() || decision.outlier;
                let error_tool = self.tools.error_tool.as_ref();
                let updated = error_tool
                    .update_error(hit, state.parameters(), &decision.strategy)
                    .unwrap_or_else(|| {
                        outlier = true;
                        hit.clone()
                    });
                outlier |= listed;

                tracing::debug!(
                    id = %helper.describe(id),
                    preset = ?decision.preset,
                    radius = updated.drift_radius,
                    new_error = updated.sigma(),
                    old_error = hit.sigma(),
                    has_t0_fit,
                    outlier,
                    "updated MDT error"
                );
                if (updated.drift_radius - hit.drift_radius).abs() > 0.1 {
                    tracing::debug!(
                        old = hit.drift_radius,
                        new = updated.drift_radius,
                        "bad recalibration"
                    );
                }
                let pars = state.parameters().cloned();
                state.with_updated_measurement(Measurement::DriftCircle(updated), pars, outlier)
            }
            Some(Technology::Csc) => {
                if listed {
                    state.reclassified(true)
                } else {
                    state.clone()
                }
            }
            Some(Technology::Rpc | Technology::Tgc) => {
                if !helper.measures_phi(id) {
                    return state.clone();
                }
                let phi_listed = helper
                    .phi_index(id)
                    .is_some_and(|p| settings.phi_layers_to_be_removed.contains(&p));
                if settings.chambers_to_be_removed.contains(&chamber) || phi_listed {
                    state.reclassified(true)
                } else {
                    state.clone()
                }
            }
            Some(Technology::Mm | Technology::Stgc) => state.clone(),
            None => {
                tracing::warn!(id = %helper.describe(id), "unknown identifier");
                state.clone()
            }
        }
    }

    fn muon_decision(&self, has_t0_fit: bool, broad: bool) -> StrategyDecision {
        let strategy = self
            .presets
            .muon
            .with(ErrorFlag::T0Refit, has_t0_fit)
            .with(ErrorFlag::BroadError, broad);
        StrategyDecision {
            preset: PresetKind::Muon,
            strategy,
            outlier: false,
            deweighted_other_sector: false,
            removed_other_sector: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RefitToolConfig;
    use crate::identifier::{IdHelper, MuonIdHelper, PhiIndex, StationIndex, StationName};
    use crate::strategy::ErrorStrategy;
    use crate::test_utils::{
        cluster_state, default_tools, hit_parameters, hit_position, mdt_state, mdt_track,
        perigee_state, station_hits, track_from_states,
    };
    use crate::track::{MaterialEffects, TsosTypes};

    fn update_only() -> RefitSettings {
        RefitSettings {
            update_errors: true,
            ..RefitSettings::all_disabled()
        }
    }

    fn tool_for(track: &Track) -> MuonRefitTool {
        MuonRefitTool::new(RefitToolConfig::default(), default_tools(track))
    }

    fn outlier_flags(track: &Track) -> Vec<bool> {
        track.states().iter().map(TrackStateOnSurface::is_outlier).collect()
    }

    fn drift_strategy(state: &TrackStateOnSurface) -> Option<ErrorStrategy> {
        state
            .measurement_on_track()
            .and_then(Measurement::as_drift_circle)
            .map(|hit| hit.error_strategy)
    }

    #[test]
    fn non_mdt_hits_pass_through_unless_listed() {
        let csc = Identifier::csc(StationName::Csl, -1, 3, 2, 1, false, 12);
        let rpc_eta = Identifier::rpc(StationName::Bml, 1, 3, 1, 1, false, 7);
        let rpc_phi = Identifier::rpc(StationName::Bml, 2, 3, 2, 1, true, 8);
        let tgc_phi = Identifier::tgc(StationName::T1e, 2, 4, 1, true, 3);
        let mm = Identifier::mm(StationName::Mml, 1, 3, 1, 1, 30);
        let stgc = Identifier::stgc(StationName::Stl, 1, 3, 1, 1, false, 5);
        let unknown = Identifier::from_raw(9u64 << 60);
        let inner = Identifier::inner_detector(4);
        let ids = [csc, rpc_eta, rpc_phi, tgc_phi, mm, stgc, unknown, inner];
        let mut states = vec![perigee_state()];
        states.extend(ids.iter().enumerate().map(|(i, id)| cluster_state(i, *id)));
        let track = track_from_states(states);
        let tool = tool_for(&track);

        let out = tool.update_errors(&track, &update_only()).unwrap();
        assert_eq!(out, track);

        let helper = MuonIdHelper;
        let listed = RefitSettings {
            chambers_to_be_removed: [csc, rpc_eta, mm, stgc]
                .iter()
                .map(|id| helper.chamber_id(*id))
                .collect(),
            phi_layers_to_be_removed: [PhiIndex::BM2].into_iter().collect(),
            ..update_only()
        };
        let out = tool.update_errors(&track, &listed).unwrap();
        // Perigee, CSC, RPC eta, RPC phi, TGC phi, MM, sTGC, unknown, inner detector.
        assert_eq!(
            outlier_flags(&out),
            vec![false, true, false, true, false, false, false, false, false]
        );
        assert_eq!(out.len(), track.len());

        let by_layer = RefitSettings {
            precision_layers_to_be_removed: [StationIndex::EI].into_iter().collect(),
            ..update_only()
        };
        let out = tool.update_errors(&track, &by_layer).unwrap();
        assert_eq!(out.count_outliers(), 1);
        assert!(out.states()[1].is_outlier());
    }

    #[test]
    fn listed_mdt_hits_become_outliers_with_updated_errors() {
        let ids = station_hits(&[(StationName::Bml, 1, 3, 3), (StationName::Bol, 1, 3, 3)]);
        let track = mdt_track(&ids);
        let tool = tool_for(&track);
        let settings = RefitSettings {
            chambers_to_be_removed: [MuonIdHelper.chamber_id(ids[3])].into_iter().collect(),
            ..update_only()
        };

        let out = tool.update_errors(&track, &settings).unwrap();
        assert_eq!(
            outlier_flags(&out),
            vec![false, false, false, false, true, true, true]
        );
        for state in &out.states()[1..] {
            assert_eq!(drift_strategy(state), Some(tool.presets().default_scaled));
        }

        let by_layer = RefitSettings {
            precision_layers_to_be_removed: [StationIndex::BM].into_iter().collect(),
            ..update_only()
        };
        let out = tool.update_errors(&track, &by_layer).unwrap();
        assert_eq!(
            outlier_flags(&out),
            vec![false, true, true, true, false, false, false]
        );
    }

    #[test]
    fn muon_strategy_does_not_need_a_known_station() {
        // MDT technology code with no station.
        let unplaced = Identifier::from_raw(2u64 << 60);
        let track = track_from_states(vec![perigee_state(), mdt_state(0, unplaced)]);
        let tool = tool_for(&track);

        let out = tool.update_mdt_errors(&track, &update_only()).unwrap();
        let expected = tool
            .presets()
            .muon
            .with(ErrorFlag::T0Refit, false)
            .with(ErrorFlag::BroadError, false);
        assert_eq!(drift_strategy(&out.states()[1]), Some(expected));
        assert!(!out.states()[1].is_outlier());

        // The sector-aware table cannot place the hit and leaves it alone.
        let out = tool.update_errors(&track, &update_only()).unwrap();
        assert_eq!(out, track);
    }

    #[test]
    fn kept_starting_parameters_become_the_leading_perigee() {
        let ids = station_hits(&[(StationName::Bml, 1, 3, 3)]);
        let start_pars = hit_parameters(0, hit_position(0));
        let start = TrackStateOnSurface::new(
            None,
            Some(start_pars.clone()),
            None,
            None,
            TsosTypes::empty().with(TsosType::Perigee),
        );
        let material = TrackStateOnSurface::new(
            None,
            None,
            Some(MaterialEffects {
                thickness_x0: 0.5,
                scattering: None,
                energy_loss: Some(12.0),
            }),
            None,
            TsosTypes::empty().with(TsosType::Scatterer),
        );
        let mut states = vec![perigee_state(), material, start];
        states.extend(ids.iter().enumerate().map(|(i, id)| mdt_state(i, *id)));
        let track = track_from_states(states);
        let tool = tool_for(&track);
        assert_eq!(find_start_parameters(&track).map(|(i, _)| i), Some(2));

        let settings = RefitSettings {
            prepare_for_fit: true,
            recreate_starting_parameters: false,
            ..update_only()
        };
        let out = tool.update_errors(&track, &settings).unwrap();

        // Old perigee and the parameter-less material state are dropped.
        assert_eq!(out.len(), 1 + ids.len());
        let perigee = &out.states()[0];
        assert!(perigee.is(TsosType::Perigee));
        let pars = perigee.parameters().unwrap();
        assert!(pars.is_perigee());
        assert!((pars.position - start_pars.position).norm() < 1e-12);
        assert!((pars.momentum - start_pars.momentum).norm() < 1e-12);
        let n_perigee = out.states().iter().filter(|s| s.is(TsosType::Perigee)).count();
        assert_eq!(n_perigee, 1);
        for state in &out.states()[1..] {
            assert_eq!(drift_strategy(state), Some(tool.presets().default_scaled));
        }
    }
}
