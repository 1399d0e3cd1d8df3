use std::collections::BTreeSet;

use nalgebra::Point2;

use crate::config::RefitSettings;
use crate::identifier::Identifier;
use crate::segment::{
    match_drift_circles, DriftCircle, DriftCircleOnTrack, Line, MdtTubeId, PhiRoad, Segment,
};
use crate::track::{DriftCircleHit, Measurement, Track, TrackParameters, TsosType};

use super::stats::RefitCounters;
use super::{MuonRefitTool, StageError};

/// Why segment cleaning gave up on a chamber group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CleaningFailure {
    MissingGeometry,
    NoSegment,
    /// Cleaning must be complete but the segment has no fitted t0.
    NoT0Fit,
    /// The winning segment is short and would lose hits.
    ShortSegment { hits_on_track: usize, hits: usize },
}

/// Consecutive MDT hits of one chamber, with the track parameters at the
/// first of them.
struct ChamberGroup<'a> {
    chamber: Identifier,
    parameters: &'a TrackParameters,
    hits: Vec<&'a DriftCircleHit>,
}

impl MuonRefitTool {
    /// Segment-based MDT cleaning: hits that do not lie on the best local
    /// segment of their chamber become outliers.
    pub fn remove_outliers(
        &self,
        track: &Track,
        settings: &RefitSettings,
    ) -> Result<Track, StageError> {
        if track.is_empty() {
            return Err(StageError::NoStates);
        }

        let mut removed: BTreeSet<Identifier> = BTreeSet::new();
        for group in self.chamber_groups(track) {
            match self.clean_chamber(&group, settings) {
                Ok(ids) => removed.extend(ids),
                Err(failure) => {
                    RefitCounters::bump(&self.counters.chambers_not_cleaned);
                    if group.hits.len() > 4 {
                        tracing::warn!(
                            chamber = %self.tools.id_helper.describe(group.chamber),
                            hits = group.hits.len(),
                            ?failure,
                            "failed to clean chamber"
                        );
                    } else {
                        tracing::debug!(
                            hits = group.hits.len(),
                            ?failure,
                            "failed to clean chamber"
                        );
                    }
                    if settings.discard_not_cleaned_tracks {
                        return Err(StageError::ChamberNotCleaned {
                            chamber: group.chamber,
                            hits: group.hits.len(),
                        });
                    }
                }
            }
        }

        if removed.is_empty() {
            tracing::debug!("no hits removed");
            return Ok(track.clone());
        }
        tracing::debug!(n_removed = removed.len(), "removing MDT outliers");

        let states = track
            .states()
            .iter()
            .map(|state| match state.identifier() {
                Some(id) if removed.contains(&id) => state.reclassified(true),
                _ => state.clone(),
            })
            .collect();
        Ok(track.with_states(states))
    }

    fn chamber_groups<'a>(&self, track: &'a Track) -> Vec<ChamberGroup<'a>> {
        let helper = self.tools.id_helper.as_ref();
        let mut groups: Vec<ChamberGroup<'a>> = Vec::new();
        for state in track.states() {
            if !state.is(TsosType::Measurement) {
                continue;
            }
            let (Some(pars), Some(Measurement::DriftCircle(hit))) =
                (state.parameters(), state.measurement_on_track())
            else {
                continue;
            };
            if !hit.id.is_valid() || !helper.is_mdt(hit.id) {
                continue;
            }
            let chamber = helper.chamber_id(hit.id);
            if let Some(group) = groups.last_mut().filter(|g| g.chamber == chamber) {
                group.hits.push(hit);
                continue;
            }
            groups.push(ChamberGroup {
                chamber,
                parameters: pars,
                hits: vec![hit],
            });
        }
        groups
    }

    /// Identifiers of the hits in `group` that the winning segment rejects.
    fn clean_chamber(
        &self,
        group: &ChamberGroup<'_>,
        settings: &RefitSettings,
    ) -> Result<Vec<Identifier>, CleaningFailure> {
        let cfg = &self.config.cleaning;
        let n_hits = group.hits.len();
        if n_hits < cfg.min_hits {
            tracing::debug!(hits = n_hits, "too few hits to clean chamber");
            return Ok(Vec::new());
        }
        let geometry = self
            .tools
            .geometry
            .mdt_chamber(group.chamber)
            .ok_or(CleaningFailure::MissingGeometry)?;
        let to_local = &geometry.global_to_local;
        let helper = self.tools.id_helper.as_ref();

        let circles: Vec<DriftCircle> = group
            .hits
            .iter()
            .enumerate()
            .map(|(index, hit)| {
                let local = to_local * hit.wire_position;
                DriftCircle {
                    position: Point2::new(local.y, local.z),
                    radius: hit.drift_radius.abs(),
                    sigma: hit.sigma(),
                    tube: MdtTubeId {
                        is_barrel: !helper.is_endcap(hit.id),
                        multilayer: helper.multilayer(hit.id).saturating_sub(1),
                        layer: helper.layer(hit.id).saturating_sub(1),
                        tube: helper.channel(hit.id).saturating_sub(1),
                    },
                    index,
                }
            })
            .collect();

        let pars = group.parameters;
        let mut direction = pars.direction();
        if direction.y * pars.position.y < 0.0 {
            direction = -direction;
        }
        let local_direction = to_local.rotation * direction;
        let track_angle = local_direction.z.atan2(local_direction.y);
        let chamber_direction = to_local.rotation * geometry.center.coords;
        let chamber_angle = chamber_direction.z.atan2(chamber_direction.y);
        let local_position = to_local * pars.position;
        let seed = Line::new(Point2::new(local_position.y, local_position.z), track_angle);
        let road = PhiRoad {
            track_angle,
            chamber_angle,
            width: cfg.road_width,
        };

        if let Some(fitter) = &self.tools.line_fitter {
            let seeded: Vec<DriftCircleOnTrack> = circles
                .iter()
                .copied()
                .map(DriftCircleOnTrack::unassigned)
                .collect();
            match fitter.fit(&seed, &seeded) {
                Some(seg) => tracing::debug!(
                    angle = seg.line.phi,
                    hits_on_track = seg.hits_on_track,
                    chi2 = seg.chi2,
                    ndof = seg.ndof,
                    "seeded segment fit"
                ),
                None => tracing::debug!(hits = seeded.len(), "seeded segment fit failed"),
            }
        }

        let segments = self.tools.segment_finder.find_segments(&circles, &road);
        if segments.len() > 1 {
            if n_hits > 3 {
                tracing::warn!(
                    n_segments = segments.len(),
                    hits = n_hits,
                    "multiple segment solutions"
                );
            } else {
                tracing::debug!(
                    n_segments = segments.len(),
                    hits = n_hits,
                    "multiple segment solutions"
                );
            }
        }
        let segment = select_segment(segments, track_angle, cfg.segment_angle_tolerance)
            .ok_or(CleaningFailure::NoSegment)?;
        if settings.discard_not_cleaned_tracks && segment.t0_shift.is_none() {
            return Err(CleaningFailure::NoT0Fit);
        }
        if let Some(t0_shift) = segment.t0_shift {
            tracing::debug!(
                t0_shift,
                hits_on_track = segment.hits_on_track,
                "segment with t0 shift"
            );
        }

        if segment.hits_on_track >= n_hits {
            tracing::debug!(hits = n_hits, "segment keeps all hits");
            return Ok(Vec::new());
        }
        if segment.hits_on_track < 4 {
            return Err(CleaningFailure::ShortSegment {
                hits_on_track: segment.hits_on_track,
                hits: n_hits,
            });
        }

        let matched = match_drift_circles(
            &segment.line,
            &circles,
            cfg.match_pull_cut,
            geometry.inner_tube_radius,
        );
        let removed: Vec<Identifier> = matched
            .iter()
            .filter(|dc| !dc.is_on_track())
            .map(|dc| group.hits[dc.circle.index].id)
            .collect();
        tracing::debug!(
            hits = n_hits,
            hits_on_track = segment.hits_on_track,
            n_removed = removed.len(),
            "cleaned chamber"
        );
        Ok(removed)
    }
}

/// The segment closest in angle to `track_angle`; among segments within
/// `tolerance` of the closest, the one with most hits on track.
pub(crate) fn select_segment(
    segments: Vec<Segment>,
    track_angle: f64,
    tolerance: f64,
) -> Option<Segment> {
    let delta = |s: &Segment| (s.line.phi - track_angle).abs();
    let best = segments.iter().map(delta).min_by(f64::total_cmp)?;
    let mut chosen: Option<Segment> = None;
    for segment in segments {
        if delta(&segment) > best + tolerance {
            continue;
        }
        match &chosen {
            Some(current) if current.hits_on_track >= segment.hits_on_track => {}
            _ => chosen = Some(segment),
        }
    }
    chosen
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;

    use super::*;
    use crate::config::RefitToolConfig;
    use crate::identifier::StationName;
    use crate::refit::MuonRefitTool;
    use crate::test_utils::{
        default_tools, hit_position, mdt_track, segment_at, station_hits, track_from_states,
        RecordingLineFitter, ScriptedFinder, TRACK_ANGLE,
    };
    use crate::track::TrackStateOnSurface;

    fn displaced(track: &Track, index: usize, shift: f64) -> Track {
        let states = track
            .states()
            .iter()
            .enumerate()
            .map(|(i, s)| match (i == index, s.measurement_on_track()) {
                (true, Some(Measurement::DriftCircle(hit))) => {
                    let hit = DriftCircleHit {
                        drift_radius: hit.drift_radius + shift,
                        ..hit.clone()
                    };
                    let pars = s.parameters().cloned();
                    s.with_updated_measurement(Measurement::DriftCircle(hit), pars, false)
                }
                _ => s.clone(),
            })
            .collect();
        track.with_states(states)
    }

    fn two_chamber_track() -> Track {
        mdt_track(&station_hits(&[
            (StationName::Bil, 1, 3, 6),
            (StationName::Bml, 1, 3, 6),
        ]))
    }

    fn scripted_tool(track: &Track, segment: Segment) -> MuonRefitTool {
        let mut tools = default_tools(track);
        tools.segment_finder = Arc::new(ScriptedFinder {
            segments: vec![segment],
            ..ScriptedFinder::default()
        });
        MuonRefitTool::new(RefitToolConfig::default(), tools)
    }

    #[test]
    fn select_prefers_closest_then_most_hits() {
        let segs = vec![segment_at(0.30, 4), segment_at(0.302, 6), segment_at(0.5, 8)];
        assert_eq!(select_segment(segs, 0.3, 0.005).unwrap().hits_on_track, 6);
        let segs = vec![segment_at(0.30, 4), segment_at(0.32, 6)];
        assert_eq!(select_segment(segs, 0.3, 0.005).unwrap().hits_on_track, 4);
        assert!(select_segment(Vec::new(), 0.3, 0.005).is_none());
    }

    #[test]
    fn clean_track_is_unchanged() {
        let track = two_chamber_track();
        let tool = MuonRefitTool::new(RefitToolConfig::default(), default_tools(&track));
        let cleaned = tool.remove_outliers(&track, &RefitSettings::default()).unwrap();
        assert_eq!(cleaned, track);
    }

    #[test]
    fn off_segment_hit_becomes_outlier() {
        // State 3 is the third BIL hit.
        let bad = displaced(&two_chamber_track(), 3, 2.0);
        let tool = MuonRefitTool::new(RefitToolConfig::default(), default_tools(&bad));
        let cleaned = tool.remove_outliers(&bad, &RefitSettings::default()).unwrap();
        assert_eq!(cleaned.count_outliers(), 1);
        assert!(cleaned.states()[3].is_outlier());
        assert_eq!(cleaned.len(), bad.len());
    }

    #[test]
    fn three_hit_chamber_never_loses_two_hits() {
        let track = mdt_track(&station_hits(&[(StationName::Bil, 1, 3, 3)]));
        let bad = displaced(&displaced(&track, 1, 3.0), 2, -3.0);
        let tool = MuonRefitTool::new(RefitToolConfig::default(), default_tools(&bad));
        let err = tool.remove_outliers(&bad, &RefitSettings::default()).unwrap_err();
        assert!(matches!(err, StageError::ChamberNotCleaned { hits: 3, .. }));

        let lenient = RefitSettings {
            discard_not_cleaned_tracks: false,
            ..RefitSettings::default()
        };
        let kept = tool.remove_outliers(&bad, &lenient).unwrap();
        assert_eq!(kept.count_outliers(), 0);
        assert_eq!(tool.stats().n_chambers_not_cleaned, 2);
    }

    #[test]
    fn small_groups_are_skipped() {
        let track = mdt_track(&station_hits(&[
            (StationName::Bil, 1, 3, 2),
            (StationName::Bml, 1, 3, 2),
        ]));
        let bad = displaced(&track, 1, 3.0);
        let tool = MuonRefitTool::new(RefitToolConfig::default(), default_tools(&bad));
        assert_eq!(tool.remove_outliers(&bad, &RefitSettings::default()).unwrap(), bad);
    }

    #[test]
    fn no_segment_fails_and_road_is_seeded_from_track() {
        let track = mdt_track(&station_hits(&[(StationName::Bil, 1, 3, 4)]));
        let finder = Arc::new(ScriptedFinder::default());
        let mut tools = default_tools(&track);
        tools.segment_finder = finder.clone();
        let tool = MuonRefitTool::new(RefitToolConfig::default(), tools);
        assert!(tool.remove_outliers(&track, &RefitSettings::default()).is_err());
        let roads = finder.roads.lock().unwrap();
        assert_eq!(roads.len(), 1);
        assert_relative_eq!(roads[0].track_angle, TRACK_ANGLE, epsilon = 1e-12);
        assert_relative_eq!(roads[0].width, 0.14);
    }

    #[test]
    fn segment_without_t0_rejects_chamber_when_cleaning_is_mandatory() {
        let track = mdt_track(&station_hits(&[(StationName::Bil, 1, 3, 4)]));
        let tool = scripted_tool(&track, segment_at(TRACK_ANGLE, 4));
        let strict = RefitSettings::default();
        assert!(strict.discard_not_cleaned_tracks);

        let groups = tool.chamber_groups(&track);
        assert_eq!(groups.len(), 1);
        assert_eq!(tool.clean_chamber(&groups[0], &strict), Err(CleaningFailure::NoT0Fit));

        let err = tool.remove_outliers(&track, &strict).unwrap_err();
        assert!(matches!(err, StageError::ChamberNotCleaned { hits: 4, .. }));
        assert_eq!(tool.stats().n_chambers_not_cleaned, 1);

        let lenient = RefitSettings {
            discard_not_cleaned_tracks: false,
            ..RefitSettings::default()
        };
        assert_eq!(tool.remove_outliers(&track, &lenient).unwrap(), track);
        assert_eq!(tool.stats().n_chambers_not_cleaned, 1);
    }

    #[test]
    fn segment_with_t0_passes_mandatory_cleaning() {
        let track = mdt_track(&station_hits(&[(StationName::Bil, 1, 3, 4)]));
        let segment = Segment {
            t0_shift: Some(1.5),
            ..segment_at(TRACK_ANGLE, 4)
        };
        let tool = scripted_tool(&track, segment);
        assert_eq!(tool.remove_outliers(&track, &RefitSettings::default()).unwrap(), track);
        assert_eq!(tool.stats().n_chambers_not_cleaned, 0);
    }

    #[test]
    fn line_fitter_is_seeded_from_first_hit_parameters() {
        let track = mdt_track(&station_hits(&[(StationName::Bil, 1, 3, 4)]));
        let fitter = Arc::new(RecordingLineFitter::default());
        let mut tools = default_tools(&track);
        tools.line_fitter = Some(fitter.clone());
        let tool = MuonRefitTool::new(RefitToolConfig::default(), tools);

        // The seeded fit is diagnostic only; cleaning is decided by the finder.
        assert_eq!(tool.remove_outliers(&track, &RefitSettings::default()).unwrap(), track);

        let seeds = fitter.seeds.lock().unwrap();
        assert_eq!(seeds.len(), 1);
        let (seed, n_circles) = seeds[0];
        assert_eq!(n_circles, 4);
        let first = hit_position(0);
        assert_relative_eq!(seed.phi, TRACK_ANGLE, epsilon = 1e-12);
        assert_relative_eq!(seed.position.x, first.y, epsilon = 1e-9);
        assert_relative_eq!(seed.position.y, first.z, epsilon = 1e-9);
    }

    #[test]
    fn outliers_and_non_mdt_states_do_not_form_groups() {
        let ids = station_hits(&[(StationName::Bil, 1, 3, 4)]);
        let track = mdt_track(&ids);
        let mut states: Vec<TrackStateOnSurface> = track.states().to_vec();
        states[1] = states[1].reclassified(true);
        states[2] = states[2].reclassified(true);
        let track = track_from_states(states);
        let finder = Arc::new(ScriptedFinder::default());
        let mut tools = default_tools(&track);
        tools.segment_finder = finder.clone();
        let tool = MuonRefitTool::new(RefitToolConfig::default(), tools);
        // Two remaining measurements: below the cleaning threshold.
        assert_eq!(tool.remove_outliers(&track, &RefitSettings::default()).unwrap(), track);
        assert!(finder.roads.lock().unwrap().is_empty());
    }
}
