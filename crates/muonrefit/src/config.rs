//! Tool-level configuration and per-call refit settings.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::identifier::{Identifier, PhiIndex, StationIndex};

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors raised while loading configuration overlays.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Io(std::io::Error),
    /// The JSON text is malformed or does not match the schema.
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read configuration: {}", err),
            Self::Json(err) => write!(f, "invalid configuration JSON: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

// ── Per-call settings ──────────────────────────────────────────────────────

/// Stage toggles and removal lists for one refit call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefitSettings {
    /// Use broad errors for hits that keep the default strategy.
    pub broad: bool,
    /// Run segment-based MDT outlier cleaning.
    pub remove_outliers: bool,
    /// Abort the refit when a chamber cannot be cleaned.
    pub discard_not_cleaned_tracks: bool,
    /// Recompute hit errors.
    pub update_errors: bool,
    /// Refit the track with the external fitter.
    pub refit: bool,
    /// Extrapolate the refitted track to the muon spectrometer entry.
    pub extrapolate_to_muon_entry: bool,
    /// Rebuild the state sequence so that it starts at a perigee.
    pub prepare_for_fit: bool,
    /// Synthesize new starting parameters in front of the first measurement.
    pub recreate_starting_parameters: bool,
    /// Deweight MDT hits outside the selected sector.
    pub deweight_other_sectors: bool,
    /// Turn MDT hits outside the selected sector into outliers.
    pub remove_other_sectors: bool,
    /// Turn deweighted BEE hits into outliers.
    pub remove_bee: bool,
    /// Turn deweighted barrel/endcap overlap hits into outliers.
    pub remove_barrel_endcap_overlap: bool,
    /// Recompute trigger eta-hit errors. Trigger hits are passed through
    /// unchanged either way.
    pub update_trigger_errors: bool,
    /// Chambers whose hits are always turned into outliers.
    pub chambers_to_be_removed: BTreeSet<Identifier>,
    /// Precision station layers whose MDT and CSC hits are turned into outliers.
    pub precision_layers_to_be_removed: BTreeSet<StationIndex>,
    /// Trigger phi layers whose hits are turned into outliers.
    pub phi_layers_to_be_removed: BTreeSet<PhiIndex>,
}

impl Default for RefitSettings {
    fn default() -> Self {
        Self {
            broad: false,
            remove_outliers: true,
            discard_not_cleaned_tracks: true,
            update_errors: true,
            refit: true,
            extrapolate_to_muon_entry: true,
            prepare_for_fit: true,
            recreate_starting_parameters: true,
            deweight_other_sectors: true,
            remove_other_sectors: false,
            remove_bee: false,
            remove_barrel_endcap_overlap: false,
            update_trigger_errors: false,
            chambers_to_be_removed: BTreeSet::new(),
            precision_layers_to_be_removed: BTreeSet::new(),
            phi_layers_to_be_removed: BTreeSet::new(),
        }
    }
}

impl RefitSettings {
    /// Settings with every toggle off; the refit returns an unchanged copy.
    pub fn all_disabled() -> Self {
        Self {
            remove_outliers: false,
            discard_not_cleaned_tracks: false,
            update_errors: false,
            refit: false,
            extrapolate_to_muon_entry: false,
            prepare_for_fit: false,
            recreate_starting_parameters: false,
            deweight_other_sectors: false,
            ..Self::default()
        }
    }

    /// Overlay JSON fields on top of the defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ── Tool configuration ─────────────────────────────────────────────────────

/// Chamber-specific deweighting switches of the error-strategy policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeweightConfig {
    pub bee: bool,
    pub ee: bool,
    /// BIS chambers at |eta| > 6.
    pub bis78: bool,
    /// BME chambers in phi sector 7.
    pub bme: bool,
    /// BOL chambers at |eta| = 7 in phi sector 7.
    pub boe: bool,
    /// EEL chamber 1 on side C, phi sector 3.
    pub eel1c05: bool,
    /// Apply the two-station preset to tracks with at most two stations.
    pub two_station_tracks: bool,
}

impl Default for DeweightConfig {
    fn default() -> Self {
        Self {
            bee: false,
            ee: false,
            bis78: true,
            bme: true,
            boe: true,
            eel1c05: false,
            two_station_tracks: false,
        }
    }
}

/// Fixed alignment effects inserted without consulting the alignment tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleAlignmentConfig {
    /// Discontinuity at the middle stations (BM/EM).
    pub add_middle: bool,
    /// Discontinuity at the inner stations (BI/EI).
    pub add_inner: bool,
    /// Both discontinuities; middle hits are also attached to the inner one.
    pub add_two: bool,
    /// One discontinuity covering every precision hit.
    pub add_all: bool,
    /// Translation value (mm).
    pub delta: f64,
    /// Translation uncertainty (mm).
    pub delta_error: f64,
    /// Rotation value (rad).
    pub angle: f64,
    /// Rotation uncertainty (rad).
    pub angle_error: f64,
}

impl Default for SimpleAlignmentConfig {
    fn default() -> Self {
        Self {
            add_middle: true,
            add_inner: false,
            add_two: false,
            add_all: false,
            delta: 0.0,
            delta_error: 0.1,
            angle: 0.0,
            angle_error: 0.001,
        }
    }
}

/// Segment-based MDT outlier cleaning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierCleaningConfig {
    /// Minimum hits in a chamber group for cleaning to run.
    pub min_hits: usize,
    /// Half-width (rad) of the phi road handed to the segment finder.
    pub road_width: f64,
    /// Pull cut for matching drift circles to the winning segment.
    pub match_pull_cut: f64,
    /// Segments within this angular distance (rad) of the best one compete
    /// on hit count.
    pub segment_angle_tolerance: f64,
}

impl Default for OutlierCleaningConfig {
    fn default() -> Self {
        Self {
            min_hits: 3,
            road_width: 0.14,
            match_pull_cut: 3.0,
            segment_angle_tolerance: 0.005,
        }
    }
}

/// Configuration of a [`crate::MuonRefitTool`] instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefitToolConfig {
    pub deweight: DeweightConfig,
    /// Replace the error update with MDT error update plus alignment
    /// effects on track.
    pub alignment_errors: bool,
    /// Build alignment effects from [`Self::simple`] instead of querying the
    /// alignment tool.
    pub simple_aeots: bool,
    pub simple: SimpleAlignmentConfig,
    pub cleaning: OutlierCleaningConfig,
    /// Refits are attempted only for tracks with `chi2 < max_chi2_per_dof * ndof`.
    pub max_chi2_per_dof: f64,
    /// Distance (mm) between the first measurement and a recreated perigee.
    pub recreated_perigee_offset: f64,
    /// Settings used when a refit call does not supply its own.
    pub default_settings: RefitSettings,
}

impl Default for RefitToolConfig {
    fn default() -> Self {
        Self {
            deweight: DeweightConfig::default(),
            alignment_errors: false,
            simple_aeots: false,
            simple: SimpleAlignmentConfig::default(),
            cleaning: OutlierCleaningConfig::default(),
            max_chi2_per_dof: 10_000.0,
            recreated_perigee_offset: 100.0,
            default_settings: RefitSettings::default(),
        }
    }
}

impl RefitToolConfig {
    /// Overlay JSON fields on top of the defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration overlay from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::StationName;

    #[test]
    fn partial_overlay_keeps_defaults() {
        let cfg = RefitToolConfig::from_json_str(
            r#"{ "deweight": { "bee": true }, "simple": { "add_inner": true } }"#,
        )
        .unwrap();
        assert!(cfg.deweight.bee);
        assert!(cfg.deweight.bis78);
        assert!(cfg.simple.add_inner);
        assert!(cfg.simple.add_middle);
        assert_eq!(cfg.cleaning.min_hits, 3);
        assert_eq!(cfg.max_chi2_per_dof, 10_000.0);
    }

    #[test]
    fn settings_overlay_with_removal_lists() {
        let chamber = Identifier::mdt(StationName::Bol, 2, 4, 0, 0, 0);
        let json = format!(
            r#"{{
                "refit": false,
                "chambers_to_be_removed": [{}],
                "precision_layers_to_be_removed": ["EE"]
            }}"#,
            chamber.raw()
        );
        let settings = RefitSettings::from_json_str(&json).unwrap();
        assert!(!settings.refit);
        assert!(settings.update_errors);
        assert!(settings.chambers_to_be_removed.contains(&chamber));
        assert!(settings.precision_layers_to_be_removed.contains(&StationIndex::EE));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = RefitToolConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        let missing = Path::new("/nonexistent/muonrefit.json");
        let err = RefitToolConfig::from_json_file(missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn all_disabled_turns_every_stage_off() {
        let s = RefitSettings::all_disabled();
        assert!(!s.remove_outliers && !s.update_errors && !s.refit);
        assert!(!s.extrapolate_to_muon_entry && !s.prepare_for_fit);
    }
}
