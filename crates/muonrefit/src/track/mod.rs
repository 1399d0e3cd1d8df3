//! Track event data model: parameters, measurements and track states.

mod measurement;
mod parameters;
mod state;

pub use measurement::{ClusterHit, DriftCircleHit, Measurement, PseudoMeasurement};
pub use parameters::{
    FitQuality, ParticleHypothesis, Surface, TrackAuthor, TrackInfo, TrackParameters,
};
pub use state::{MaterialEffects, ScatteringAngles, TrackStateOnSurface, TsosType, TsosTypes};

use std::sync::OnceLock;

/// Lazily built index lists over the state sequence.
#[derive(Debug, Default)]
struct TrackCache {
    measurements: OnceLock<Vec<usize>>,
    outliers: OnceLock<Vec<usize>>,
    parameters: OnceLock<Vec<usize>>,
    perigee: OnceLock<Option<usize>>,
}

/// Ordered sequence of track states plus fit metadata.
///
/// Tracks are immutable once built; every refit stage produces a new track.
#[derive(Debug)]
pub struct Track {
    info: TrackInfo,
    states: Vec<TrackStateOnSurface>,
    fit_quality: Option<FitQuality>,
    cache: TrackCache,
}

impl Track {
    pub fn new(
        info: TrackInfo,
        states: Vec<TrackStateOnSurface>,
        fit_quality: Option<FitQuality>,
    ) -> Self {
        Self {
            info,
            states,
            fit_quality,
            cache: TrackCache::default(),
        }
    }

    /// New track with the same info and fit quality but different states.
    pub fn with_states(&self, states: Vec<TrackStateOnSurface>) -> Self {
        Self::new(self.info, states, self.fit_quality)
    }

    pub fn info(&self) -> &TrackInfo {
        &self.info
    }

    pub fn fit_quality(&self) -> Option<&FitQuality> {
        self.fit_quality.as_ref()
    }

    pub fn states(&self) -> &[TrackStateOnSurface] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn indices(&self, keep: impl Fn(&TrackStateOnSurface) -> bool) -> Vec<usize> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| keep(s))
            .map(|(i, _)| i)
            .collect()
    }

    /// Measurements that take part in the fit (outliers excluded).
    pub fn measurements(&self) -> impl Iterator<Item = &Measurement> + '_ {
        let idx = self.cache.measurements.get_or_init(|| {
            self.indices(|s| s.measurement_on_track().is_some() && !s.is_outlier())
        });
        idx.iter().filter_map(|&i| self.states[i].measurement_on_track())
    }

    pub fn outliers(&self) -> impl Iterator<Item = &Measurement> + '_ {
        let idx = self
            .cache
            .outliers
            .get_or_init(|| self.indices(|s| s.measurement_on_track().is_some() && s.is_outlier()));
        idx.iter().filter_map(|&i| self.states[i].measurement_on_track())
    }

    pub fn parameters(&self) -> impl Iterator<Item = &TrackParameters> + '_ {
        let idx = self
            .cache
            .parameters
            .get_or_init(|| self.indices(|s| s.parameters().is_some()));
        idx.iter().filter_map(|&i| self.states[i].parameters())
    }

    /// Parameters of the perigee state, preferring perigee-surface parameters.
    pub fn perigee_parameters(&self) -> Option<&TrackParameters> {
        let idx = self.cache.perigee.get_or_init(|| {
            let flagged =
                |s: &TrackStateOnSurface| s.is(TsosType::Perigee) && s.parameters().is_some();
            self.states
                .iter()
                .position(|s| flagged(s) && s.parameters().is_some_and(TrackParameters::is_perigee))
                .or_else(|| self.states.iter().position(flagged))
        });
        idx.and_then(|i| self.states[i].parameters())
    }

    pub fn count_outliers(&self) -> usize {
        self.outliers().count()
    }

    pub fn count_measurements(&self) -> usize {
        self.measurements().count()
    }
}

impl Clone for Track {
    fn clone(&self) -> Self {
        Self::new(self.info, self.states.clone(), self.fit_quality)
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info
            && self.fit_quality == other.fit_quality
            && self.states == other.states
    }
}
