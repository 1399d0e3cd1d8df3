//! Alignment deviations reported by the alignment-error tool and the
//! alignment effects spliced into refitted tracks.

mod deviation;
mod effects;

pub use deviation::{AlignmentDeviation, DeviationKind, HitSetHash};
pub use effects::AlignmentEffectsOnTrack;
