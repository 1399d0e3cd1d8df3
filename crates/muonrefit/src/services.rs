//! Interfaces of the external tools the refit delegates to.
//!
//! Every call either returns a result or `None`; the refit stages turn a
//! `None` into their documented fallback.

use crate::alignment::AlignmentDeviation;
use crate::strategy::ErrorStrategy;
use crate::track::{DriftCircleHit, ParticleHypothesis, Track, TrackParameters};

/// Global track fitter.
pub trait TrackFitter: Send + Sync {
    fn fit(
        &self,
        track: &Track,
        run_outlier_logic: bool,
        particle: ParticleHypothesis,
    ) -> Option<Track>;
}

/// Source of misalignment hypotheses for the hits of a track.
pub trait AlignmentErrorTool: Send + Sync {
    fn make_alignment_deviations(&self, track: &Track) -> Vec<AlignmentDeviation>;
}

/// Recomputes the error of a drift circle under a given strategy.
pub trait DriftCircleErrorTool: Send + Sync {
    fn update_error(
        &self,
        hit: &DriftCircleHit,
        parameters: Option<&TrackParameters>,
        strategy: &ErrorStrategy,
    ) -> Option<DriftCircleHit>;
}

/// Extrapolates a spectrometer track back to the spectrometer entry.
pub trait MuonEntryExtrapolator: Send + Sync {
    fn extrapolate(&self, track: &Track) -> Option<Track>;
}
