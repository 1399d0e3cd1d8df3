//! Synthetic tracks and mock collaborators shared by the unit tests.

use std::sync::{Arc, Mutex};

use nalgebra::{Isometry3, Point2, Point3, Vector3};

use crate::alignment::AlignmentDeviation;
use crate::drift_errors::{MooreErrorTable, ParametrisedErrorTool};
use crate::geometry::{ChamberRegistry, MdtChamberGeometry};
use crate::identifier::{IdHelper, Identifier, MuonIdHelper, StationName};
use crate::refit::RefitTools;
use crate::segment::{
    match_drift_circles, DriftCircle, DriftCircleOnTrack, Line, LineFitter, PhiRoad, Segment,
    SegmentFinder,
};
use crate::services::{AlignmentErrorTool, MuonEntryExtrapolator, TrackFitter};
use crate::strategy::{ErrorStrategy, ErrorStyle};
use crate::track::{
    ClusterHit, DriftCircleHit, FitQuality, Measurement, ParticleHypothesis, Surface, Track,
    TrackAuthor, TrackInfo, TrackParameters, TrackStateOnSurface,
};

/// Angle of the synthetic track in the (y, z) plane.
pub(crate) const TRACK_ANGLE: f64 = 0.3;
pub(crate) const DRIFT_RADIUS: f64 = 5.0;
pub(crate) const CALIBRATION_SIGMA: f64 = 0.1;
pub(crate) const TUBE_RADIUS: f64 = 14.6;

pub(crate) fn track_direction() -> Vector3<f64> {
    Vector3::new(0.0, TRACK_ANGLE.cos(), TRACK_ANGLE.sin())
}

fn track_normal() -> Vector3<f64> {
    Vector3::new(0.0, -TRACK_ANGLE.sin(), TRACK_ANGLE.cos())
}

/// MDT identifiers for `n` hits in each `(station, eta, phi, n)` chamber.
pub(crate) fn station_hits(chambers: &[(StationName, i32, u32, usize)]) -> Vec<Identifier> {
    chambers
        .iter()
        .flat_map(|&(station, eta, phi, n)| {
            (0..n).map(move |i| {
                let (ml, layer) = (1 + (i / 4) as u32, 1 + (i % 4) as u32);
                Identifier::mdt(station, eta, phi, ml, layer, 10 + i as u32)
            })
        })
        .collect()
}

/// Drift circle at the origin with calibration error `sigma`.
pub(crate) fn drift_hit(id: Identifier, sigma: f64) -> DriftCircleHit {
    DriftCircleHit {
        id,
        drift_radius: DRIFT_RADIUS,
        covariance: sigma * sigma,
        calibration_sigma: sigma,
        wire_position: Point3::origin(),
        surface: Surface::Line {
            transform: Isometry3::identity(),
        },
        error_strategy: ErrorStrategy::new(ErrorStyle::Moore),
    }
}

/// Point on the synthetic track for the `i`-th hit.
pub(crate) fn hit_position(i: usize) -> Point3<f64> {
    Point3::from(track_direction() * (1000.0 + 40.0 * i as f64))
}

pub(crate) fn hit_parameters(i: usize, wire: Point3<f64>) -> TrackParameters {
    TrackParameters::new(
        hit_position(i),
        track_direction() * 20_000.0,
        1.0,
        Surface::Line {
            transform: Isometry3::translation(wire.x, wire.y, wire.z),
        },
    )
}

/// Track state for hit `i` of the synthetic track. Wires alternate sides of
/// the track at distance [`DRIFT_RADIUS`].
pub(crate) fn mdt_state(i: usize, id: Identifier) -> TrackStateOnSurface {
    let side = if i % 2 == 0 { 1.0 } else { -1.0 };
    let wire = hit_position(i) + track_normal() * (side * DRIFT_RADIUS);
    let hit = DriftCircleHit {
        wire_position: wire,
        drift_radius: side * DRIFT_RADIUS,
        ..drift_hit(id, CALIBRATION_SIGMA)
    };
    let pars = hit_parameters(i, wire);
    TrackStateOnSurface::measurement(Measurement::DriftCircle(hit), Some(pars), false)
}

pub(crate) fn cluster_state(i: usize, id: Identifier) -> TrackStateOnSurface {
    let pos = hit_position(i);
    let hit = ClusterHit {
        id,
        local_position: 0.0,
        covariance: 1.0,
        surface: Surface::Plane {
            transform: Isometry3::translation(pos.x, pos.y, pos.z),
        },
    };
    TrackStateOnSurface::measurement(Measurement::Cluster(hit), Some(hit_parameters(i, pos)), false)
}

pub(crate) fn perigee_state() -> TrackStateOnSurface {
    TrackStateOnSurface::perigee(TrackParameters::perigee_at(
        Point3::origin(),
        track_direction() * 20_000.0,
        1.0,
    ))
}

pub(crate) fn track_from_states(states: Vec<TrackStateOnSurface>) -> Track {
    Track::new(
        TrackInfo::new(TrackAuthor::Moore, ParticleHypothesis::Muon),
        states,
        Some(FitQuality::new(12.0, 10.0)),
    )
}

/// Perigee followed by one MDT state per identifier.
pub(crate) fn mdt_track(ids: &[Identifier]) -> Track {
    let mut states = vec![perigee_state()];
    states.extend(ids.iter().enumerate().map(|(i, id)| mdt_state(i, *id)));
    track_from_states(states)
}

/// Chamber registry with the chamber frame equal to the global frame.
pub(crate) fn registry_for(track: &Track) -> ChamberRegistry {
    let mut registry = ChamberRegistry::new();
    for state in track.states() {
        if let Some(Measurement::DriftCircle(hit)) = state.measurement_on_track() {
            let chamber = MuonIdHelper.chamber_id(hit.id);
            registry.insert(
                chamber,
                MdtChamberGeometry::new(Isometry3::identity(), hit.wire_position, TUBE_RADIUS),
            );
        }
    }
    registry
}

// ── Mock collaborators ─────────────────────────────────────────────────────

/// Returns the input states with a fresh fit quality.
pub(crate) struct PassThroughFitter;

impl TrackFitter for PassThroughFitter {
    fn fit(
        &self,
        track: &Track,
        _run_outlier_logic: bool,
        _particle: ParticleHypothesis,
    ) -> Option<Track> {
        Some(Track::new(
            *track.info(),
            track.states().to_vec(),
            Some(FitQuality::new(8.0, 10.0)),
        ))
    }
}

pub(crate) struct FailingFitter;

impl TrackFitter for FailingFitter {
    fn fit(
        &self,
        _track: &Track,
        _run_outlier_logic: bool,
        _particle: ParticleHypothesis,
    ) -> Option<Track> {
        None
    }
}

pub(crate) struct IdentityExtrapolator;

impl MuonEntryExtrapolator for IdentityExtrapolator {
    fn extrapolate(&self, track: &Track) -> Option<Track> {
        Some(track.clone())
    }
}

pub(crate) struct FailingExtrapolator;

impl MuonEntryExtrapolator for FailingExtrapolator {
    fn extrapolate(&self, _track: &Track) -> Option<Track> {
        None
    }
}

pub(crate) struct StaticAlignmentTool {
    pub deviations: Vec<AlignmentDeviation>,
}

impl AlignmentErrorTool for StaticAlignmentTool {
    fn make_alignment_deviations(&self, _track: &Track) -> Vec<AlignmentDeviation> {
        self.deviations.clone()
    }
}

/// Finds the synthetic track line (through the local origin, along the road
/// track angle) with a fitted t0 and counts the circles matching it.
pub(crate) struct OriginLineFinder;

impl SegmentFinder for OriginLineFinder {
    fn find_segments(&self, circles: &[DriftCircle], road: &PhiRoad) -> Vec<Segment> {
        let line = Line::new(Point2::origin(), road.track_angle);
        let matched = match_drift_circles(&line, circles, 3.0, TUBE_RADIUS);
        let hits_on_track = matched.iter().filter(|m| m.is_on_track()).count();
        vec![Segment {
            line,
            circles: matched,
            hits_on_track,
            chi2: 1.0,
            ndof: hits_on_track.saturating_sub(2),
            t0_shift: Some(0.0),
        }]
    }
}

/// Returns a fixed list of segments and records the roads it was called with.
#[derive(Default)]
pub(crate) struct ScriptedFinder {
    pub segments: Vec<Segment>,
    pub roads: Mutex<Vec<PhiRoad>>,
}

impl SegmentFinder for ScriptedFinder {
    fn find_segments(&self, _circles: &[DriftCircle], road: &PhiRoad) -> Vec<Segment> {
        if let Ok(mut roads) = self.roads.lock() {
            roads.push(*road);
        }
        self.segments.clone()
    }
}

/// Records the seed line and circle count of every fit and returns a segment
/// along the seed through all circles.
#[derive(Default)]
pub(crate) struct RecordingLineFitter {
    pub seeds: Mutex<Vec<(Line, usize)>>,
}

impl LineFitter for RecordingLineFitter {
    fn fit(&self, seed: &Line, circles: &[DriftCircleOnTrack]) -> Option<Segment> {
        if let Ok(mut seeds) = self.seeds.lock() {
            seeds.push((*seed, circles.len()));
        }
        Some(Segment {
            line: *seed,
            circles: circles.to_vec(),
            hits_on_track: circles.len(),
            chi2: 0.0,
            ndof: circles.len().saturating_sub(2),
            t0_shift: None,
        })
    }
}

/// Segment along `angle` through the local origin with `hits_on_track` hits.
pub(crate) fn segment_at(angle: f64, hits_on_track: usize) -> Segment {
    Segment {
        line: Line::new(Point2::origin(), angle),
        circles: Vec::new(),
        hits_on_track,
        chi2: 1.0,
        ndof: hits_on_track.saturating_sub(2),
        t0_shift: None,
    }
}

/// Collaborators wired for the synthetic geometry of `track`.
pub(crate) fn default_tools(track: &Track) -> RefitTools {
    let id_helper: Arc<dyn IdHelper> = Arc::new(MuonIdHelper);
    RefitTools {
        id_helper: id_helper.clone(),
        geometry: Arc::new(registry_for(track)),
        fitter: Arc::new(PassThroughFitter),
        error_tool: Arc::new(ParametrisedErrorTool::new(id_helper, MooreErrorTable::Tight)),
        extrapolator: Arc::new(IdentityExtrapolator),
        segment_finder: Arc::new(OriginLineFinder),
        line_fitter: None,
        alignment_tool: None,
    }
}
