//! Amplitude-threshold artifact detection.
//!
//! For each selected channel, every maximal run of samples with
//! `|x| > threshold` becomes one [`Interval`]; runs separated by fewer than
//! [`AnalysisConfig::artifact_merge_gap`] sub-threshold samples are merged.
//! A detection pass replaces the previous [`ArtifactSet`] wholesale.
use std::collections::{BTreeMap, BTreeSet};

use ndarray::ArrayView1;
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::store::{ChannelStore, SignalVersion};

/// Half-open sample range `[start, end)` on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Interval {
    pub channel: usize,
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, sample: usize) -> bool {
        (self.start..self.end).contains(&sample)
    }
}

/// Result of one artifact detection pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSet {
    version: SignalVersion,
    threshold: f64,
    intervals: BTreeMap<usize, Vec<Interval>>,
}

impl ArtifactSet {
    /// Signal version the set was computed against.
    pub fn version(&self) -> SignalVersion {
        self.version
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Channels that were scanned (with or without findings).
    pub fn channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.intervals.keys().copied()
    }

    /// `true` if `channel` was part of the detection pass.
    pub fn covers(&self, channel: usize) -> bool {
        self.intervals.contains_key(&channel)
    }

    /// Ordered, non-overlapping intervals of `channel`; empty if the channel
    /// was not scanned.
    pub fn intervals(&self, channel: usize) -> &[Interval] {
        self.intervals.get(&channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `sample` of `channel` lies inside an artifact.
    pub fn contains(&self, channel: usize, sample: usize) -> bool {
        let ivs = self.intervals(channel);
        let idx = ivs.partition_point(|iv| iv.end <= sample);
        ivs.get(idx).is_some_and(|iv| iv.start <= sample)
    }

    /// Number of intervals on `channel`.
    pub fn count(&self, channel: usize) -> usize {
        self.intervals(channel).len()
    }

    /// Total number of artifact samples on `channel`.
    pub fn total_samples(&self, channel: usize) -> usize {
        self.intervals(channel).iter().map(Interval::len).sum()
    }

    /// Intervals of every scanned channel, channel-ordered.
    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.values().flatten()
    }
}

/// Parameters of one artifact detection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactParams {
    /// Absolute amplitude above which a sample is an artifact; `>= 0`.
    pub threshold: f64,
    /// Channels to scan; must be non-empty and in range.
    pub channels: BTreeSet<usize>,
}

impl ArtifactParams {
    pub fn new(threshold: f64, channels: impl IntoIterator<Item = usize>) -> Self {
        Self { threshold, channels: channels.into_iter().collect() }
    }

    pub fn validate(&self, store: &ChannelStore) -> Result<()> {
        if self.threshold.is_nan() || self.threshold < 0.0 {
            return Err(Error::invalid(format!(
                "artifact threshold must be >= 0, got {}",
                self.threshold
            )));
        }
        store.check_channels(&self.channels)
    }
}

/// Maximal runs of `|x| > threshold` as `(start, end)` pairs, with runs
/// separated by fewer than `merge_gap` samples joined.
pub fn find_runs(x: ArrayView1<'_, f64>, threshold: f64, merge_gap: usize) -> Vec<(usize, usize)> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut open: Option<usize> = None;

    let close = |start: usize, end: usize, runs: &mut Vec<(usize, usize)>| match runs.last_mut() {
        Some(last) if start - last.1 < merge_gap => last.1 = end,
        _ => runs.push((start, end)),
    };

    for (i, &v) in x.iter().enumerate() {
        match (v.abs() > threshold, open) {
            (true, None) => open = Some(i),
            (false, Some(start)) => {
                close(start, i, &mut runs);
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        close(start, x.len(), &mut runs);
    }
    runs
}

/// Owns the most recent [`ArtifactSet`].
#[derive(Debug, Clone)]
pub struct ArtifactDetector {
    merge_gap: usize,
    result: Option<ArtifactSet>,
}

impl ArtifactDetector {
    pub fn new(cfg: &AnalysisConfig) -> Self {
        Self { merge_gap: cfg.artifact_merge_gap, result: None }
    }

    pub fn merge_gap(&self) -> usize {
        self.merge_gap
    }

    /// Scan the working signal and replace the stored set.
    ///
    /// On a parameter error the previous set is kept.
    pub fn detect(&mut self, store: &ChannelStore, params: &ArtifactParams) -> Result<&ArtifactSet> {
        params.validate(store)?;

        let mut intervals = BTreeMap::new();
        for &ch in &params.channels {
            let runs = find_runs(store.working().row(ch), params.threshold, self.merge_gap);
            log::debug!("channel {ch}: {} artifact intervals", runs.len());
            let ivs = runs
                .into_iter()
                .map(|(start, end)| Interval { channel: ch, start, end })
                .collect::<Vec<_>>();
            intervals.insert(ch, ivs);
        }

        let set = ArtifactSet { version: store.version(), threshold: params.threshold, intervals };
        log::info!(
            "artifact detection at threshold {} over {} channels: {} intervals (signal version {})",
            params.threshold,
            params.channels.len(),
            set.iter().count(),
            set.version
        );
        Ok(&*self.result.insert(set))
    }

    /// Last set, whatever signal version it was computed against.
    pub fn result(&self) -> Option<&ArtifactSet> {
        self.result.as_ref()
    }

    /// Last set, only if it matches the store's current signal version.
    pub fn current(&self, store: &ChannelStore) -> Result<&ArtifactSet> {
        match &self.result {
            Some(set) if set.version == store.version() => Ok(set),
            other => Err(Error::StaleState {
                what: "artifact set",
                computed: other.as_ref().map(|s| s.version),
                current: store.version(),
            }),
        }
    }

    /// Forget the stored set.
    pub fn reset(&mut self) {
        self.result = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array2};

    use crate::store::Recording;

    #[test]
    fn single_run() {
        let x = arr1(&[0.0, 5.0, 6.0, 0.0, 0.0]);
        assert_eq!(find_runs(x.view(), 1.0, 0), vec![(1, 3)]);
    }

    #[test]
    fn negative_excursions_count() {
        let x = arr1(&[0.0, -5.0, 0.0]);
        assert_eq!(find_runs(x.view(), 1.0, 0), vec![(1, 2)]);
    }

    #[test]
    fn threshold_is_strict() {
        let x = arr1(&[1.0, 1.0, 1.0]);
        assert!(find_runs(x.view(), 1.0, 0).is_empty());
    }

    #[test]
    fn close_runs_merge_far_runs_do_not() {
        // runs (1,2) and (4,5): gap of 2 samples
        let x = arr1(&[0.0, 9.0, 0.0, 0.0, 9.0, 0.0]);
        assert_eq!(find_runs(x.view(), 1.0, 3), vec![(1, 5)]);
        assert_eq!(find_runs(x.view(), 1.0, 2), vec![(1, 2), (4, 5)]);
    }

    #[test]
    fn run_reaching_end_is_closed() {
        let x = arr1(&[0.0, 0.0, 9.0, 9.0]);
        assert_eq!(find_runs(x.view(), 1.0, 0), vec![(2, 4)]);
    }

    #[test]
    fn contains_uses_half_open_intervals() {
        let data = Array2::from_shape_fn((1, 50), |(_, t)| if (10..20).contains(&t) { 9.0 } else { 0.0 });
        let store = ChannelStore::new(Recording::new(data, 100.0).unwrap());
        let mut det = ArtifactDetector::new(&AnalysisConfig::default());
        let set = det.detect(&store, &ArtifactParams::new(1.0, [0])).unwrap();
        assert!(!set.contains(0, 9));
        assert!(set.contains(0, 10));
        assert!(set.contains(0, 19));
        assert!(!set.contains(0, 20));
        assert_eq!(set.total_samples(0), 10);
    }

    #[test]
    fn negative_threshold_keeps_previous_set() {
        let store = ChannelStore::new(Recording::new(Array2::zeros((1, 20)), 100.0).unwrap());
        let mut det = ArtifactDetector::new(&AnalysisConfig::default());
        det.detect(&store, &ArtifactParams::new(1.0, [0])).unwrap();
        let err = det.detect(&store, &ArtifactParams::new(-1.0, [0])).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert_eq!(det.result().map(|s| s.threshold()), Some(1.0));
    }
}
