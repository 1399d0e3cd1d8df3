use crate::identifier::Identifier;

/// Why a refit stage could not produce a track.
#[derive(Debug, Clone, PartialEq)]
pub enum StageError {
    /// The track has no states.
    NoStates,
    /// No state carries track parameters.
    NoParameters,
    /// Segment cleaning failed for a chamber and uncleaned tracks are discarded.
    ChamberNotCleaned {
        /// Chamber identifier.
        chamber: Identifier,
        /// Hits in the chamber group.
        hits: usize,
    },
    /// The input track has no fit quality to gate the refit on.
    NoFitQuality,
    /// Input chi2/ndof above the sanity gate.
    FitRejected {
        /// Chi2 per degree of freedom of the input track.
        chi2_per_dof: f64,
    },
    /// The track fitter returned no track.
    FitFailed,
    /// The extrapolation to the muon entry returned no track.
    ExtrapolationFailed,
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoStates => write!(f, "track without states"),
            Self::NoParameters => write!(f, "track without parameters"),
            Self::ChamberNotCleaned { chamber, hits } => {
                write!(f, "failed to clean chamber {} with {} hits", chamber, hits)
            }
            Self::NoFitQuality => write!(f, "track without fit quality"),
            Self::FitRejected { chi2_per_dof } => {
                write!(f, "refit rejected: chi2/ndof {:.1} above sanity gate", chi2_per_dof)
            }
            Self::FitFailed => write!(f, "track fit failed"),
            Self::ExtrapolationFailed => write!(f, "extrapolation to muon entry failed"),
        }
    }
}

impl std::error::Error for StageError {}
