//! The refit orchestrator.
//!
//! [`MuonRefitTool`] runs the enabled stages in order:
//!
//! 1. **Outlier removal** – per-chamber segment cleaning of MDT hits.
//! 2. **Error update** – sector-aware strategy selection, or the MDT-only
//!    update followed by alignment effects when alignment errors are on.
//! 3. **Refit** – external track fit, gated on the input fit quality.
//! 4. **Extrapolation** – back to the muon spectrometer entry.
//!
//! A failing stage never drops the track: the tool returns the best track
//! produced so far and bumps the matching counter.

mod aeot;
mod error;
mod error_update;
mod outliers;
mod stats;

pub use error::StageError;
pub(crate) use stats::RefitCounters;
pub use stats::RefitStats;

use std::sync::Arc;

use rayon::prelude::*;

use crate::config::{RefitSettings, RefitToolConfig};
use crate::geometry::ChamberGeometry;
use crate::identifier::IdHelper;
use crate::segment::{LineFitter, SegmentFinder};
use crate::services::{AlignmentErrorTool, DriftCircleErrorTool, MuonEntryExtrapolator, TrackFitter};
use crate::strategy::ErrorStrategyPresets;
use crate::track::{ParticleHypothesis, Track};

/// External collaborators of the refit tool.
#[derive(Clone)]
pub struct RefitTools {
    pub id_helper: Arc<dyn IdHelper>,
    pub geometry: Arc<dyn ChamberGeometry>,
    pub fitter: Arc<dyn TrackFitter>,
    pub error_tool: Arc<dyn DriftCircleErrorTool>,
    pub extrapolator: Arc<dyn MuonEntryExtrapolator>,
    pub segment_finder: Arc<dyn SegmentFinder>,
    /// Seeded line fit, only used for trace diagnostics during cleaning.
    pub line_fitter: Option<Arc<dyn LineFitter>>,
    /// Required for full-mode alignment effects.
    pub alignment_tool: Option<Arc<dyn AlignmentErrorTool>>,
}

/// Refits muon tracks with updated hit errors.
///
/// Create once, refit many tracks. The tool is `Sync`; counters are atomic,
/// so [`Self::refit_tracks_parallel`] may share one instance across workers.
pub struct MuonRefitTool {
    config: RefitToolConfig,
    tools: RefitTools,
    presets: ErrorStrategyPresets,
    counters: RefitCounters,
}

impl MuonRefitTool {
    pub fn new(config: RefitToolConfig, tools: RefitTools) -> Self {
        let d = &config.deweight;
        tracing::info!("Options:");
        for (enabled, name) in [
            (d.bee, "BEE"),
            (d.ee, "EE"),
            (d.bis78, "BIS78"),
            (d.bme, "BME"),
            (d.boe, "BOE"),
            (d.eel1c05, "EEL1C05"),
            (d.two_station_tracks, "Two stations"),
        ] {
            if enabled {
                tracing::info!(" Deweight {}", name);
            }
        }
        if config.alignment_errors {
            tracing::info!(simple = config.simple_aeots, " Alignment effects");
        }
        Self {
            config,
            tools,
            presets: ErrorStrategyPresets::new(),
            counters: RefitCounters::default(),
        }
    }

    pub fn config(&self) -> &RefitToolConfig {
        &self.config
    }

    pub fn presets(&self) -> &ErrorStrategyPresets {
        &self.presets
    }

    /// Refit one track. `None` settings use the configured defaults.
    pub fn refit(&self, track: &Track, settings: Option<&RefitSettings>) -> Track {
        let settings = settings.unwrap_or(&self.config.default_settings);
        RefitCounters::bump(&self.counters.refits);

        let mut current = if settings.remove_outliers {
            match self.remove_outliers(track, settings) {
                Ok(cleaned) => {
                    if cleaned.count_outliers() != track.count_outliers() {
                        tracing::debug!("outlier removal flagged hits on track");
                    }
                    cleaned
                }
                Err(err) => {
                    tracing::debug!(%err, "track lost during outlier removal");
                    RefitCounters::bump(&self.counters.failed_outlier_removal);
                    return track.clone();
                }
            }
        } else {
            track.clone()
        };

        if settings.update_errors {
            let updated = if self.config.alignment_errors {
                self.update_alignment_errors(&current, settings)
            } else {
                self.update_errors(&current, settings)
            };
            match updated {
                Ok(updated) => current = updated,
                Err(err) => {
                    tracing::warn!(%err, "failed to update errors");
                    RefitCounters::bump(&self.counters.failed_error_update);
                    return current;
                }
            }
        }

        if settings.refit {
            match self.fit_track(track, &current) {
                Ok(refitted) => current = refitted,
                Err(err) => {
                    tracing::debug!(%err, "failed to refit track");
                    RefitCounters::bump(&self.counters.failed_refit);
                    return current;
                }
            }
        }

        if settings.extrapolate_to_muon_entry {
            match self.tools.extrapolator.extrapolate(&current) {
                Some(extrapolated) => current = extrapolated,
                None => {
                    tracing::warn!(
                        err = %StageError::ExtrapolationFailed,
                        "failed to back-extrapolate track"
                    );
                    RefitCounters::bump(&self.counters.failed_extrapolation);
                    return current;
                }
            }
        }

        RefitCounters::bump(&self.counters.good);
        current
    }

    /// Refit each track in order; one output per input.
    pub fn refit_tracks(&self, tracks: &[Track], settings: Option<&RefitSettings>) -> Vec<Track> {
        tracks.iter().map(|t| self.refit(t, settings)).collect()
    }

    /// Same as [`Self::refit_tracks`], distributed over the rayon pool.
    pub fn refit_tracks_parallel(
        &self,
        tracks: &[Track],
        settings: Option<&RefitSettings>,
    ) -> Vec<Track> {
        tracks.par_iter().map(|t| self.refit(t, settings)).collect()
    }

    pub fn stats(&self) -> RefitStats {
        self.counters.snapshot()
    }

    pub fn reset_counters(&self) {
        self.counters.reset();
    }

    /// Log the end-of-job summary and return the counters.
    pub fn finalize(&self) -> RefitStats {
        let stats = self.stats();
        tracing::info!(
            n_refits = stats.n_refits,
            good = stats.fraction(stats.n_good),
            failed_outlier_removal = stats.fraction(stats.n_failed_outlier_removal),
            failed_error_update = stats.fraction(stats.n_failed_error_update),
            failed_refit = stats.fraction(stats.n_failed_refit),
            failed_extrapolation = stats.fraction(stats.n_failed_extrapolation),
            deweighted_hits = stats.n_deweighted_hits,
            removed_sector_hits = stats.n_removed_sector_hits,
            chambers_not_cleaned = stats.n_chambers_not_cleaned,
            "refit summary"
        );
        stats
    }

    /// Fit `prepared`, provided the fit quality of the `input` track passes
    /// the sanity gate.
    fn fit_track(&self, input: &Track, prepared: &Track) -> Result<Track, StageError> {
        let fq = input.fit_quality().ok_or(StageError::NoFitQuality)?;
        if !(fq.chi_squared < self.config.max_chi2_per_dof * fq.ndof) {
            return Err(StageError::FitRejected {
                chi2_per_dof: fq.chi2_per_dof().unwrap_or(f64::INFINITY),
            });
        }
        self.tools
            .fitter
            .fit(prepared, false, ParticleHypothesis::Muon)
            .ok_or(StageError::FitFailed)
    }
}
