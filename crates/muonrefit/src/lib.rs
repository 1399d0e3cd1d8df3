//! muonrefit: refitting of muon spectrometer tracks.
//!
//! Given a fitted track, the refit tool re-derives hit errors and optionally
//! cleans hits and adds alignment effects before handing the track back to a
//! global fitter. The stages are:
//!
//! 1. **Outlier removal** – per-chamber drift-circle segment fit; MDT hits
//!    off the best segment become outliers.
//! 2. **Error update** – drift-circle error strategy per hit from a fixed
//!    decision table (sector, barrel/endcap overlap, special chambers).
//! 3. **Alignment effects** – alignment discontinuities spliced into the
//!    track, from the alignment-error tool or at fixed stations.
//! 4. **Refit / extrapolation** – external fitter and muon-entry
//!    extrapolator.
//!
//! # Public API
//! - [`MuonRefitTool`] with its [`RefitTools`] collaborators as the entry point
//! - [`RefitToolConfig`] and [`RefitSettings`] for tuning
//! - the collaborator traits in [`services`], [`segment`] and [`geometry`]
//! - the track data model in [`track`], [`identifier`] and [`alignment`]

pub mod alignment;
mod config;
mod drift_errors;
pub mod geometry;
pub mod identifier;
mod refit;
pub mod segment;
pub mod services;
pub mod strategy;
pub mod track;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{
    ConfigError, DeweightConfig, OutlierCleaningConfig, RefitSettings, RefitToolConfig,
    SimpleAlignmentConfig,
};
pub use drift_errors::{MooreErrorTable, ParametrisedErrorTool};
pub use identifier::{IdHelper, Identifier, MuonIdHelper};
pub use refit::{MuonRefitTool, RefitStats, RefitTools, StageError};
pub use track::{Track, TrackStateOnSurface};
