//! Local drift-circle geometry in the chamber (y, z) plane and the segment
//! finding interface used by outlier cleaning.

mod matching;

pub use matching::match_drift_circles;

use nalgebra::{Point2, Vector2};

/// Tube coordinates of a drift circle. Layer and tube are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MdtTubeId {
    pub is_barrel: bool,
    pub multilayer: u32,
    pub layer: u32,
    pub tube: u32,
}

/// Drift circle in the chamber frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftCircle {
    /// Wire position (local y, z).
    pub position: Point2<f64>,
    /// Unsigned drift radius.
    pub radius: f64,
    pub sigma: f64,
    pub tube: MdtTubeId,
    /// Position of the hit in the chamber group it was built from.
    pub index: usize,
}

/// Compatibility of a drift circle with a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriftCircleState {
    /// Residual within the pull cut.
    OnTrack,
    /// Line crosses the tube further from the wire than the drift radius.
    Delta,
    /// Line crosses the tube closer to the wire than the drift radius.
    Outlier,
    /// Line misses the tube.
    OffTrack,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftCircleOnTrack {
    pub circle: DriftCircle,
    pub state: DriftCircleState,
    /// Distance of the line to the wire minus the drift radius.
    pub residual: f64,
    pub pull: f64,
}

impl DriftCircleOnTrack {
    /// Circle not yet classified against any line.
    pub fn unassigned(circle: DriftCircle) -> Self {
        Self {
            circle,
            state: DriftCircleState::OnTrack,
            residual: 0.0,
            pull: 0.0,
        }
    }

    pub fn is_on_track(&self) -> bool {
        self.state == DriftCircleState::OnTrack
    }
}

/// Straight line in the (y, z) plane through `position` at angle `phi`
/// from the y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub position: Point2<f64>,
    pub phi: f64,
}

impl Line {
    pub fn new(position: Point2<f64>, phi: f64) -> Self {
        Self { position, phi }
    }

    pub fn direction(&self) -> Vector2<f64> {
        Vector2::new(self.phi.cos(), self.phi.sin())
    }

    /// Signed perpendicular distance of `p` from the line.
    pub fn signed_distance(&self, p: &Point2<f64>) -> f64 {
        let d = self.direction();
        let v = p - self.position;
        d.x * v.y - d.y * v.x
    }
}

/// Straight-line segment found in one chamber.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub line: Line,
    pub circles: Vec<DriftCircleOnTrack>,
    pub hits_on_track: usize,
    pub chi2: f64,
    pub ndof: usize,
    /// Fitted t0 shift (ns), when the finder fits t0.
    pub t0_shift: Option<f64>,
}

/// Angular road seeding the segment search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhiRoad {
    /// Track direction in the chamber (y, z) plane.
    pub track_angle: f64,
    /// Direction of the chamber centre seen from the origin.
    pub chamber_angle: f64,
    /// Half-width of the road (rad).
    pub width: f64,
}

/// Drift-circle segment finder.
pub trait SegmentFinder: Send + Sync {
    fn find_segments(&self, circles: &[DriftCircle], road: &PhiRoad) -> Vec<Segment>;
}

/// Seeded single-segment line fit.
pub trait LineFitter: Send + Sync {
    fn fit(&self, seed: &Line, circles: &[DriftCircleOnTrack]) -> Option<Segment>;
}
