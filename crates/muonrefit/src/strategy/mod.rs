//! Drift-circle error strategies and the per-hit selection policy.

mod policy;
mod presets;
mod sector;

pub use policy::{select_strategy, HitClassification, StrategyDecision};
pub use presets::{ErrorStrategyPresets, PresetKind};
pub use sector::{select_sector, SectorContext};

use serde::{Deserialize, Serialize};

/// Individual switches of an [`ErrorStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorFlag {
    /// Use the chamber-specific station error table.
    StationError,
    /// Additive error independent of the calibration.
    FixedError,
    /// Scale the calibration error.
    ScaledError,
    /// Hit carries a refitted t0.
    T0Refit,
    /// Broad errors for hits not yet cleaned.
    BroadError,
    /// Error for use in segment fits.
    Segment,
    /// Error evaluated at the predicted track position.
    ErrorAtPredictedPosition,
}

impl ErrorFlag {
    pub const ALL: [ErrorFlag; 7] = [
        Self::StationError,
        Self::FixedError,
        Self::ScaledError,
        Self::T0Refit,
        Self::BroadError,
        Self::Segment,
        Self::ErrorAtPredictedPosition,
    ];

    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// Family of error parametrisations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorStyle {
    /// Standalone-muon tuning.
    #[default]
    Moore,
    /// Combined-muon tuning.
    Muon,
}

/// Style plus a set of [`ErrorFlag`]s, carried by every drift-circle hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorStrategy {
    style: ErrorStyle,
    flags: u16,
}

impl ErrorStrategy {
    /// Strategy with no flags set.
    pub const fn new(style: ErrorStyle) -> Self {
        Self { style, flags: 0 }
    }

    pub const fn with(mut self, flag: ErrorFlag, on: bool) -> Self {
        if on {
            self.flags |= flag.bit();
        } else {
            self.flags &= !flag.bit();
        }
        self
    }

    pub fn set(&mut self, flag: ErrorFlag, on: bool) {
        *self = self.with(flag, on);
    }

    pub const fn has(&self, flag: ErrorFlag) -> bool {
        self.flags & flag.bit() != 0
    }

    pub const fn style(&self) -> ErrorStyle {
        self.style
    }

    pub fn set_style(&mut self, style: ErrorStyle) {
        self.style = style;
    }

    pub fn flags(&self) -> impl Iterator<Item = ErrorFlag> + '_ {
        ErrorFlag::ALL.into_iter().filter(|f| self.has(*f))
    }
}

impl std::fmt::Display for ErrorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[", self.style)?;
        for (i, flag) in self.flags().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{:?}", flag)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_toggle_independently() {
        let mut s = ErrorStrategy::new(ErrorStyle::Moore)
            .with(ErrorFlag::ScaledError, true)
            .with(ErrorFlag::BroadError, true);
        assert!(s.has(ErrorFlag::ScaledError));
        assert!(s.has(ErrorFlag::BroadError));
        assert!(!s.has(ErrorFlag::FixedError));
        s.set(ErrorFlag::BroadError, false);
        assert!(!s.has(ErrorFlag::BroadError));
        assert_eq!(s.flags().collect::<Vec<_>>(), vec![ErrorFlag::ScaledError]);
        assert_eq!(s.to_string(), "Moore[ScaledError]");
    }
}
