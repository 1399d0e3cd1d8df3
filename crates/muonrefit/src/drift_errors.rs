//! Parametrised drift-circle errors: the reference [`DriftCircleErrorTool`].
//!
//! New variances are linear in the calibration variance `s2`:
//! `sigma² = scale * s2 + offset`, with `(scale, offset)` chosen by the
//! strategy style, its flags and, for station errors, the chamber.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::identifier::{ChamberIndex, IdHelper, Identifier, StationIndex};
use crate::services::DriftCircleErrorTool;
use crate::strategy::{ErrorFlag, ErrorStrategy, ErrorStyle};
use crate::track::{DriftCircleHit, TrackParameters};

/// Which Moore-style station table to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MooreErrorTable {
    Loose,
    #[default]
    Tight,
}

/// `(scale, offset)` applied as `scale * s2 + offset`.
type Coefficients = (f64, f64);

const UNCHANGED: Coefficients = (1.0, 0.0);

pub struct ParametrisedErrorTool {
    id_helper: Arc<dyn IdHelper>,
    table: MooreErrorTable,
}

impl ParametrisedErrorTool {
    pub fn new(id_helper: Arc<dyn IdHelper>, table: MooreErrorTable) -> Self {
        Self { id_helper, table }
    }

    pub fn table(&self) -> MooreErrorTable {
        self.table
    }

    /// Variance for hit `id` given calibration variance `s2`.
    pub fn parametrised_variance(&self, id: Identifier, s2: f64, strategy: &ErrorStrategy) -> f64 {
        let (scale, offset) = if strategy.has(ErrorFlag::Segment) {
            segment_coefficients(strategy)
        } else {
            match strategy.style() {
                ErrorStyle::Muon => muon_coefficients(strategy),
                ErrorStyle::Moore => self.moore_coefficients(id, strategy),
            }
        };
        scale * s2 + offset
    }

    fn moore_coefficients(&self, id: Identifier, strategy: &ErrorStrategy) -> Coefficients {
        let loose = self.table == MooreErrorTable::Loose;
        if strategy.has(ErrorFlag::StationError) {
            let location = ChamberLocation::of(id, self.id_helper.as_ref());
            return match (location, loose) {
                (ChamberLocation::Bee, true) => (1.44, 4.0),
                (ChamberLocation::Bee, false) => (1.44, 0.04),
                (ChamberLocation::Eel1c05, true) | (ChamberLocation::Ee, true) => (1.44, 0.04),
                (ChamberLocation::Eel1c05, false) => (1.21, 25.0),
                (ChamberLocation::Ee, false) => (1.21, 0.01),
                (ChamberLocation::Bis78 { eta7: true }, _) => (1.44, 1.0),
                (ChamberLocation::Bis78 { eta7: false }, true) => (4.0, 25.0),
                (ChamberLocation::Bis78 { eta7: false }, false) => (4.0, 1.0),
                (ChamberLocation::Bme | ChamberLocation::Boe, true) => (1.44, 0.25),
                (ChamberLocation::Bme | ChamberLocation::Boe, false) => (1.21, 0.25),
                (ChamberLocation::Other, true) => (1.44, 0.04),
                (ChamberLocation::Other, false) => (1.21, 0.04),
            };
        }
        if strategy.has(ErrorFlag::FixedError) {
            return (4.0, 4.0);
        }
        if strategy.has(ErrorFlag::ScaledError) {
            if strategy.has(ErrorFlag::BroadError) {
                return (2.25, 0.09);
            }
            return if loose { (1.44, 0.015) } else { (1.21, 0.01) };
        }
        UNCHANGED
    }
}

fn muon_coefficients(strategy: &ErrorStrategy) -> Coefficients {
    if strategy.has(ErrorFlag::StationError) {
        (1.21, 0.0)
    } else if strategy.has(ErrorFlag::FixedError) {
        (4.0, 0.0)
    } else if strategy.has(ErrorFlag::ScaledError) {
        if strategy.has(ErrorFlag::BroadError) {
            (2.25, 0.0)
        } else {
            (1.21, 0.0)
        }
    } else {
        UNCHANGED
    }
}

fn segment_coefficients(strategy: &ErrorStrategy) -> Coefficients {
    if !(strategy.has(ErrorFlag::FixedError) && strategy.has(ErrorFlag::ScaledError)) {
        return UNCHANGED;
    }
    if strategy.has(ErrorFlag::T0Refit) {
        (1.0, 0.005)
    } else if strategy.has(ErrorFlag::BroadError) {
        (4.0, 0.16)
    } else {
        (1.0, 0.005)
    }
}

/// Chambers with dedicated station errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChamberLocation {
    Bee,
    Eel1c05,
    Ee,
    Bis78 { eta7: bool },
    Bme,
    Boe,
    Other,
}

impl ChamberLocation {
    fn of(id: Identifier, id_helper: &dyn IdHelper) -> Self {
        let (Some(station), Some(chamber)) =
            (id_helper.station_index(id), id_helper.chamber_index(id))
        else {
            return Self::Other;
        };
        let eta = id_helper.station_eta(id);
        let phi = id_helper.station_phi(id);
        match station {
            StationIndex::BE => Self::Bee,
            StationIndex::EE if chamber == ChamberIndex::EEL && eta < 0 && phi == 3 => {
                Self::Eel1c05
            }
            StationIndex::EE => Self::Ee,
            StationIndex::BI if chamber == ChamberIndex::BIS && eta.abs() >= 7 => Self::Bis78 {
                eta7: eta.abs() == 7,
            },
            StationIndex::BM if phi == 7 && id_helper.is_bme(id) => Self::Bme,
            StationIndex::BO if chamber == ChamberIndex::BOL && eta.abs() == 7 && phi == 7 => {
                Self::Boe
            }
            _ => Self::Other,
        }
    }
}

impl DriftCircleErrorTool for ParametrisedErrorTool {
    fn update_error(
        &self,
        hit: &DriftCircleHit,
        parameters: Option<&TrackParameters>,
        strategy: &ErrorStrategy,
    ) -> Option<DriftCircleHit> {
        if !hit.calibration_sigma.is_finite() || hit.calibration_sigma <= 0.0 {
            tracing::debug!(
                id = %hit.id,
                sigma = hit.calibration_sigma,
                "invalid calibration error"
            );
            return None;
        }
        if strategy.has(ErrorFlag::ErrorAtPredictedPosition) && parameters.is_none() {
            return None;
        }
        let s2 = hit.calibration_sigma * hit.calibration_sigma;
        let variance = self.parametrised_variance(hit.id, s2, strategy);
        Some(hit.with_error(variance, *strategy))
    }
}
