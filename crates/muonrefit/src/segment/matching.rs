use super::{DriftCircle, DriftCircleOnTrack, DriftCircleState, Line};

/// Classify `circles` against `line`.
///
/// A circle is on track when its pull is below `pull_cut`; otherwise the
/// state records whether the line crosses the tube (`tube_radius`) at all.
pub fn match_drift_circles(
    line: &Line,
    circles: &[DriftCircle],
    pull_cut: f64,
    tube_radius: f64,
) -> Vec<DriftCircleOnTrack> {
    circles
        .iter()
        .map(|dc| {
            let distance = line.signed_distance(&dc.position).abs();
            let residual = distance - dc.radius;
            let pull = if dc.sigma > 0.0 {
                residual / dc.sigma
            } else {
                f64::INFINITY
            };
            let state = if pull.abs() < pull_cut {
                DriftCircleState::OnTrack
            } else if distance >= tube_radius {
                DriftCircleState::OffTrack
            } else if residual > 0.0 {
                DriftCircleState::Delta
            } else {
                DriftCircleState::Outlier
            };
            DriftCircleOnTrack {
                circle: *dc,
                state,
                residual,
                pull,
            }
        })
        .collect()
}
