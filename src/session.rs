//! One loaded recording together with its filter chain and detector state.
//!
//! [`Session`] is what an interactive front end drives: every method runs to
//! completion, and on failure nothing observable changes.  Callers serialise
//! access (`&mut self`), so no reader ever sees a half-computed result.
use std::collections::BTreeSet;

use crate::artifact::{ArtifactDetector, ArtifactParams, ArtifactSet};
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::filter::{FilterEngine, FilterId, FilterSpec};
use crate::peaks::{PeakDetector, PeakParams, PeakSet};
use crate::stats::StatisticsAggregator;
use crate::store::{ChannelStore, Recording};

#[derive(Debug, Clone)]
pub struct Session {
    store: ChannelStore,
    filters: FilterEngine,
    artifacts: ArtifactDetector,
    peaks: PeakDetector,
}

impl Session {
    pub fn new(recording: Recording, config: AnalysisConfig) -> Result<Self> {
        let filters = FilterEngine::new(config)?;
        let artifacts = ArtifactDetector::new(filters.config());
        let peaks = PeakDetector::new(filters.config());
        log::info!(
            "session opened: {} channels × {} samples @ {} Hz",
            recording.channel_count(),
            recording.sample_count(),
            recording.sampling_rate_hz()
        );
        Ok(Self { store: ChannelStore::new(recording), filters, artifacts, peaks })
    }

    pub fn store(&self) -> &ChannelStore {
        &self.store
    }

    pub fn filters(&self) -> &FilterEngine {
        &self.filters
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.filters.config()
    }

    // ── Filtering ───────────────────────────────────────────────────────────

    pub fn apply_filter(&mut self, spec: FilterSpec) -> Result<FilterId> {
        self.filters.apply(&mut self.store, spec)
    }

    pub fn remove_filter(&mut self, id: FilterId) -> Result<()> {
        self.filters.remove(&mut self.store, id)
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear(&mut self.store)
    }

    // ── Detection ───────────────────────────────────────────────────────────

    pub fn detect_artifacts(&mut self, params: &ArtifactParams) -> Result<&ArtifactSet> {
        self.artifacts.detect(&self.store, params)
    }

    pub fn detect_peaks(&mut self, params: &PeakParams) -> Result<&PeakSet> {
        self.peaks.detect(&self.store, self.artifacts.result(), params)
    }

    /// Latest artifact set, possibly stale.
    pub fn artifacts(&self) -> Option<&ArtifactSet> {
        self.artifacts.result()
    }

    /// Latest artifact set if it matches the current signal.
    pub fn current_artifacts(&self) -> Result<&ArtifactSet> {
        self.artifacts.current(&self.store)
    }

    /// Latest peak set, possibly stale.
    pub fn peaks(&self) -> Option<&PeakSet> {
        self.peaks.result()
    }

    pub fn current_peaks(&self) -> Result<&PeakSet> {
        self.peaks.current(&self.store)
    }

    pub fn statistics(&self) -> StatisticsAggregator<'_> {
        StatisticsAggregator::new(&self.store, self.artifacts.result(), self.peaks.result())
    }

    // ── Recording edits ─────────────────────────────────────────────────────

    /// Crop the recording to samples `[start, end)`.
    pub fn trim(&mut self, start: usize, end: usize) -> Result<()> {
        let raw = self.store.raw().trimmed(start, end)?;
        self.replace_raw(raw)?;
        log::info!("trimmed to samples [{start}, {end})");
        Ok(())
    }

    /// Keep only `channels`; the rest are dropped.
    pub fn keep_channels(&mut self, channels: &[usize]) -> Result<()> {
        let keep: BTreeSet<usize> = channels.iter().copied().collect();
        self.store.check_channels(&keep)?;
        let raw = self.store.raw().select_channels(&keep)?;
        self.replace_raw(raw)?;
        log::info!("kept {} channels", keep.len());
        Ok(())
    }

    /// Drop `channels`; at least one channel must remain.
    pub fn delete_channels(&mut self, channels: &[usize]) -> Result<()> {
        let drop: BTreeSet<usize> = channels.iter().copied().collect();
        self.store.check_channels(&drop)?;
        let keep: BTreeSet<usize> = self.store.all_channels().difference(&drop).copied().collect();
        if keep.is_empty() {
            return Err(Error::invalid("cannot delete every channel"));
        }
        let raw = self.store.raw().select_channels(&keep)?;
        self.replace_raw(raw)?;
        log::info!("deleted {} channels", drop.len());
        Ok(())
    }

    /// Re-run the active chain over a new raw recording, then commit.
    fn replace_raw(&mut self, raw: Recording) -> Result<()> {
        let working = self.filters.rederive(&raw)?;
        self.store.replace_raw(raw, working);
        Ok(())
    }
}
