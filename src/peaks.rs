//! Threshold peak detection with refractory spacing and windowing.
//!
//! Candidates are local extrema of the working signal with
//! `|x| > threshold` and the requested sign.  A candidate is discarded if
//!   • it lies inside an artifact interval (when exclusion is requested), or
//!   • its window (see [`crate::window`]) would cross a recording boundary.
//!
//! The survivors are then scanned left to right; a candidate closer than
//! [`AnalysisConfig::refractory_samples`] to the last retained peak is
//! skipped.  Because all filtering happens before the refractory scan,
//! raising the threshold can only shrink the candidate set, and the number
//! of retained peaks never grows.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactSet;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::store::{ChannelStore, SignalVersion};
use crate::window::{stack_windows, window_bounds};

/// Sign of a detected extremum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    Positive,
    Negative,
}

/// Which extrema are detection candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeakPolarity {
    Positive,
    Negative,
    #[default]
    Both,
}

impl PeakPolarity {
    fn accepts(self, p: Polarity) -> bool {
        matches!(
            (self, p),
            (PeakPolarity::Both, _)
                | (PeakPolarity::Positive, Polarity::Positive)
                | (PeakPolarity::Negative, Polarity::Negative)
        )
    }
}

impl FromStr for PeakPolarity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" | "+" => Ok(PeakPolarity::Positive),
            "negative" | "neg" | "-" => Ok(PeakPolarity::Negative),
            "both" => Ok(PeakPolarity::Both),
            other => Err(Error::invalid(format!(
                "unknown polarity '{other}' (expected positive, negative or both)"
            ))),
        }
    }
}

impl fmt::Display for PeakPolarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PeakPolarity::Positive => "positive",
            PeakPolarity::Negative => "negative",
            PeakPolarity::Both => "both",
        };
        f.write_str(s)
    }
}

/// One detected peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakEvent {
    pub channel: usize,
    pub sample: usize,
    /// Signed working-signal value at `sample`.
    pub amplitude: f64,
    pub polarity: Polarity,
}

/// Result of one peak detection pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakSet {
    version: SignalVersion,
    threshold: f64,
    window_width: usize,
    events: BTreeMap<usize, Vec<PeakEvent>>,
    /// `[n_peaks, window_width]` per channel, row `k` belongs to event `k`.
    windows: BTreeMap<usize, Array2<f64>>,
}

impl PeakSet {
    pub fn version(&self) -> SignalVersion {
        self.version
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn window_width(&self) -> usize {
        self.window_width
    }

    pub fn channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.events.keys().copied()
    }

    /// `true` if `channel` was part of the detection pass.
    pub fn covers(&self, channel: usize) -> bool {
        self.events.contains_key(&channel)
    }

    /// Peaks of `channel` in sample order; empty if not scanned.
    pub fn events(&self, channel: usize) -> &[PeakEvent] {
        self.events.get(&channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Windows of `channel`, one row per event.
    pub fn windows(&self, channel: usize) -> Option<ArrayView2<'_, f64>> {
        self.windows.get(&channel).map(Array2::view)
    }

    pub fn count(&self, channel: usize) -> usize {
        self.events(channel).len()
    }

    /// Every peak, channel-ordered.
    pub fn iter(&self) -> impl Iterator<Item = &PeakEvent> {
        self.events.values().flatten()
    }
}

/// Parameters of one peak detection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakParams {
    /// Absolute amplitude a candidate must exceed; `>= 0`.
    pub threshold: f64,
    pub channels: BTreeSet<usize>,
    /// Samples per window; `1 ..= sample_count`.
    pub window_width: usize,
    /// Drop candidates inside current artifact intervals.
    pub exclude_artifacts: bool,
    pub polarity: PeakPolarity,
}

impl PeakParams {
    /// Both polarities, no artifact exclusion.
    pub fn new(threshold: f64, channels: impl IntoIterator<Item = usize>, window_width: usize) -> Self {
        Self {
            threshold,
            channels: channels.into_iter().collect(),
            window_width,
            exclude_artifacts: false,
            polarity: PeakPolarity::default(),
        }
    }

    pub fn exclude_artifacts(mut self, exclude: bool) -> Self {
        self.exclude_artifacts = exclude;
        self
    }

    pub fn polarity(mut self, polarity: PeakPolarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn validate(&self, store: &ChannelStore) -> Result<()> {
        if self.threshold.is_nan() || self.threshold < 0.0 {
            return Err(Error::invalid(format!(
                "peak threshold must be >= 0, got {}",
                self.threshold
            )));
        }
        if self.window_width == 0 || self.window_width > store.sample_count() {
            return Err(Error::invalid(format!(
                "window width must be in 1..={}, got {}",
                store.sample_count(),
                self.window_width
            )));
        }
        store.check_channels(&self.channels)
    }
}

/// Local extrema of `x` beyond `±threshold` of an accepted sign.
///
/// A run of equal samples is an extremum only if the signal rises into it
/// and falls out of it (or the reverse for minima); it is reported once, at
/// its last sample.  The first and last samples are never extrema.
pub fn find_extrema(
    x: ArrayView1<'_, f64>,
    threshold: f64,
    polarity: PeakPolarity,
) -> Vec<(usize, Polarity)> {
    let n = x.len();
    let mut out = Vec::new();
    let mut i = 1;
    while i + 1 < n {
        let v = x[i];
        let mut last = i;
        while last + 1 < n && x[last + 1] == v {
            last += 1;
        }
        if last + 1 == n {
            break;
        }
        let (before, after) = (x[i - 1], x[last + 1]);

        let found = if v > threshold && before < v && after < v {
            Some(Polarity::Positive)
        } else if v < -threshold && before > v && after > v {
            Some(Polarity::Negative)
        } else {
            None
        };
        if let Some(p) = found.filter(|&p| polarity.accepts(p)) {
            out.push((last, p));
        }
        i = last + 1;
    }
    out
}

/// Detect peaks on one channel; returns the retained events in sample order.
pub fn detect_channel(
    x: ArrayView1<'_, f64>,
    channel: usize,
    params: &PeakParams,
    refractory: usize,
    artifacts: Option<&ArtifactSet>,
) -> Vec<PeakEvent> {
    let n = x.len();
    let candidates = find_extrema(x, params.threshold, params.polarity);
    let n_candidates = candidates.len();

    let mut events: Vec<PeakEvent> = Vec::new();
    for (i, polarity) in candidates {
        if artifacts.is_some_and(|a| a.contains(channel, i)) {
            continue;
        }
        if window_bounds(i, params.window_width, n).is_none() {
            continue;
        }
        if events.last().is_some_and(|last| i - last.sample < refractory) {
            continue;
        }
        events.push(PeakEvent { channel, sample: i, amplitude: x[i], polarity });
    }
    log::debug!(
        "channel {channel}: {} of {n_candidates} candidates retained",
        events.len()
    );
    events
}

/// Owns the most recent [`PeakSet`].
#[derive(Debug, Clone)]
pub struct PeakDetector {
    refractory: usize,
    result: Option<PeakSet>,
}

impl PeakDetector {
    pub fn new(cfg: &AnalysisConfig) -> Self {
        Self { refractory: cfg.refractory_samples, result: None }
    }

    pub fn refractory_samples(&self) -> usize {
        self.refractory
    }

    /// Scan the working signal and replace the stored set.
    ///
    /// With `exclude_artifacts`, `artifacts` must have been computed against
    /// the store's current signal version; otherwise this fails with
    /// `StaleState` and the previous set is kept.
    pub fn detect(
        &mut self,
        store: &ChannelStore,
        artifacts: Option<&ArtifactSet>,
        params: &PeakParams,
    ) -> Result<&PeakSet> {
        params.validate(store)?;

        let exclusion = if params.exclude_artifacts {
            match artifacts {
                Some(a) if a.version() == store.version() => Some(a),
                other => {
                    return Err(Error::StaleState {
                        what: "artifact set",
                        computed: other.map(ArtifactSet::version),
                        current: store.version(),
                    })
                }
            }
        } else {
            None
        };

        let mut events = BTreeMap::new();
        let mut windows = BTreeMap::new();
        for &ch in &params.channels {
            let row = store.working().row(ch);
            let found = detect_channel(row, ch, params, self.refractory, exclusion);
            let centers: Vec<usize> = found.iter().map(|e| e.sample).collect();
            windows.insert(ch, stack_windows(row, &centers, params.window_width));
            events.insert(ch, found);
        }

        let set = PeakSet {
            version: store.version(),
            threshold: params.threshold,
            window_width: params.window_width,
            events,
            windows,
        };
        log::info!(
            "peak detection at threshold {} ({} polarity, width {}) over {} channels: {} peaks (signal version {})",
            params.threshold,
            params.polarity,
            params.window_width,
            params.channels.len(),
            set.iter().count(),
            set.version
        );
        Ok(&*self.result.insert(set))
    }

    /// Last set, whatever signal version it was computed against.
    pub fn result(&self) -> Option<&PeakSet> {
        self.result.as_ref()
    }

    /// Last set, only if it matches the store's current signal version.
    pub fn current(&self, store: &ChannelStore) -> Result<&PeakSet> {
        match &self.result {
            Some(set) if set.version == store.version() => Ok(set),
            other => Err(Error::StaleState {
                what: "peak set",
                computed: other.as_ref().map(|s| s.version),
                current: store.version(),
            }),
        }
    }

    pub fn reset(&mut self) {
        self.result = None;
    }
}
