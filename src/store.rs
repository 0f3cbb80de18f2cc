//! Raw recording and the working (filtered) signal derived from it.
//!
//! Data are held as `[C, T]` matrices: one row per channel.
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::{s, Array2, ArrayView1, Axis};
use serde::Serialize;

use crate::error::{Error, Result};

/// A multi-channel recording, immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    data: Array2<f64>,
    sampling_rate_hz: f64,
    channel_labels: Vec<usize>,
}

impl Recording {
    /// Wrap a `[C, T]` sample matrix.
    ///
    /// Channels are labelled `0..C`.  Fails with `InvalidParameter` for zero
    /// channels, a non-positive or non-finite sampling rate, or any
    /// non-finite sample.
    pub fn new(data: Array2<f64>, sampling_rate_hz: f64) -> Result<Self> {
        let labels = (0..data.nrows()).collect();
        Self::with_labels(data, sampling_rate_hz, labels)
    }

    /// Like [`Recording::new`] with explicit channel labels (the channel's
    /// index in the originally loaded file).
    pub fn with_labels(
        data: Array2<f64>,
        sampling_rate_hz: f64,
        channel_labels: Vec<usize>,
    ) -> Result<Self> {
        if data.nrows() == 0 {
            return Err(Error::invalid("recording must have at least one channel"));
        }
        if !(sampling_rate_hz.is_finite() && sampling_rate_hz > 0.0) {
            return Err(Error::invalid(format!(
                "sampling rate must be finite and > 0, got {sampling_rate_hz}"
            )));
        }
        if channel_labels.len() != data.nrows() {
            return Err(Error::invalid(format!(
                "{} channel labels for {} channels",
                channel_labels.len(),
                data.nrows()
            )));
        }
        if let Some(((c, t), v)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::invalid(format!("non-finite sample {v} at channel {c}, sample {t}")));
        }
        Ok(Self { data, sampling_rate_hz, channel_labels })
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn channel_count(&self) -> usize {
        self.data.nrows()
    }

    pub fn sample_count(&self) -> usize {
        self.data.ncols()
    }

    pub fn sampling_rate_hz(&self) -> f64 {
        self.sampling_rate_hz
    }

    pub fn channel_labels(&self) -> &[usize] {
        &self.channel_labels
    }

    /// Duration in seconds (`sample_count / sampling_rate_hz`).
    pub fn duration_s(&self) -> f64 {
        self.sample_count() as f64 / self.sampling_rate_hz
    }

    /// New recording restricted to samples `[start, end)`.
    pub fn trimmed(&self, start: usize, end: usize) -> Result<Self> {
        if start >= end || end > self.sample_count() {
            return Err(Error::invalid(format!(
                "trim range [{start}, {end}) must be non-empty and within [0, {}]",
                self.sample_count()
            )));
        }
        Ok(Self {
            data: self.data.slice(s![.., start..end]).to_owned(),
            sampling_rate_hz: self.sampling_rate_hz,
            channel_labels: self.channel_labels.clone(),
        })
    }

    /// New recording holding only `channels` (in ascending order), labels kept.
    pub fn select_channels(&self, channels: &BTreeSet<usize>) -> Result<Self> {
        if channels.is_empty() {
            return Err(Error::invalid("at least one channel must remain"));
        }
        if let Some(&bad) = channels.iter().find(|&&c| c >= self.channel_count()) {
            return Err(Error::invalid(format!(
                "channel {bad} out of range (recording has {})",
                self.channel_count()
            )));
        }
        let rows: Vec<usize> = channels.iter().copied().collect();
        Ok(Self {
            data: self.data.select(Axis(0), &rows),
            sampling_rate_hz: self.sampling_rate_hz,
            channel_labels: rows.iter().map(|&r| self.channel_labels[r]).collect(),
        })
    }
}

/// Version of the working signal.  Bumped on every replacement, so detector
/// results can tell whether they were computed against the current signal.
///
/// Versions are drawn from one process-wide counter: they increase within a
/// store and are never shared by two stores, so a result computed on one
/// store is always stale for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SignalVersion(pub u64);

static NEXT_VERSION: AtomicU64 = AtomicU64::new(0);

impl SignalVersion {
    fn next() -> Self {
        SignalVersion(NEXT_VERSION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SignalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owns the raw recording and the current working signal.
#[derive(Debug, Clone)]
pub struct ChannelStore {
    raw: Recording,
    working: Array2<f64>,
    version: SignalVersion,
}

impl ChannelStore {
    /// The working signal starts out equal to the raw recording.
    pub fn new(raw: Recording) -> Self {
        let working = raw.data.clone();
        Self { raw, working, version: SignalVersion::next() }
    }

    pub fn raw(&self) -> &Recording {
        &self.raw
    }

    /// Working signal, `[C, T]`.
    pub fn working(&self) -> &Array2<f64> {
        &self.working
    }

    pub fn version(&self) -> SignalVersion {
        self.version
    }

    pub fn channel_count(&self) -> usize {
        self.raw.channel_count()
    }

    pub fn sample_count(&self) -> usize {
        self.raw.sample_count()
    }

    pub fn sampling_rate_hz(&self) -> f64 {
        self.raw.sampling_rate_hz()
    }

    /// One channel of the working signal.
    pub fn channel(&self, channel: usize) -> Result<ArrayView1<'_, f64>> {
        self.check_channel(channel)?;
        Ok(self.working.row(channel))
    }

    pub fn check_channel(&self, channel: usize) -> Result<()> {
        if channel >= self.channel_count() {
            return Err(Error::invalid(format!(
                "channel {channel} out of range (recording has {} channels)",
                self.channel_count()
            )));
        }
        Ok(())
    }

    /// Validate a channel selection.  An empty selection is rejected.
    pub fn check_channels(&self, channels: &BTreeSet<usize>) -> Result<()> {
        if channels.is_empty() {
            return Err(Error::invalid("channel selection is empty"));
        }
        channels.iter().try_for_each(|&c| self.check_channel(c))
    }

    /// All channel indices, for "select everything".
    pub fn all_channels(&self) -> BTreeSet<usize> {
        (0..self.channel_count()).collect()
    }

    /// Install a freshly derived working signal and bump the version.
    pub(crate) fn replace_working(&mut self, working: Array2<f64>) {
        debug_assert_eq!(working.dim(), self.raw.data.dim());
        self.working = working;
        self.version = SignalVersion::next();
    }

    /// Swap in a new raw recording together with its derived working signal.
    pub(crate) fn replace_raw(&mut self, raw: Recording, working: Array2<f64>) {
        debug_assert_eq!(working.dim(), raw.data.dim());
        self.raw = raw;
        self.replace_working(working);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec() -> Recording {
        let data = Array2::from_shape_fn((3, 10), |(c, t)| (c * 100 + t) as f64);
        Recording::new(data, 100.0).unwrap()
    }

    #[test]
    fn rejects_bad_sampling_rate() {
        let data = Array2::zeros((1, 4));
        assert!(Recording::new(data.clone(), 0.0).is_err());
        assert!(Recording::new(data, f64::NAN).is_err());
    }

    #[test]
    fn rejects_zero_channels_and_nan_samples() {
        assert!(Recording::new(Array2::zeros((0, 4)), 10.0).is_err());
        let mut data = Array2::zeros((2, 4));
        data[[1, 2]] = f64::INFINITY;
        assert!(Recording::new(data, 10.0).is_err());
    }

    #[test]
    fn empty_recording_is_valid() {
        let r = Recording::new(Array2::zeros((2, 0)), 10.0).unwrap();
        assert_eq!(r.sample_count(), 0);
    }

    #[test]
    fn trim_keeps_range_and_labels() {
        let r = rec().trimmed(2, 5).unwrap();
        assert_eq!(r.sample_count(), 3);
        assert_eq!(r.data()[[1, 0]], 102.0);
        assert!(rec().trimmed(5, 5).is_err());
        assert!(rec().trimmed(0, 11).is_err());
    }

    #[test]
    fn select_channels_keeps_original_labels() {
        let r = rec().select_channels(&BTreeSet::from([2, 0])).unwrap();
        assert_eq!(r.channel_labels(), &[0, 2]);
        assert_eq!(r.data()[[1, 3]], 203.0);
        let r2 = r.select_channels(&BTreeSet::from([1])).unwrap();
        assert_eq!(r2.channel_labels(), &[2]);
    }

    #[test]
    fn select_channels_rejects_out_of_range() {
        let err = rec().select_channels(&BTreeSet::from([0, 5])).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert!(rec().select_channels(&BTreeSet::new()).is_err());
    }

    #[test]
    fn stores_never_share_a_version() {
        let a = ChannelStore::new(rec());
        let b = ChannelStore::new(rec());
        assert_ne!(a.version(), b.version());
    }

    #[test]
    fn replacing_working_bumps_version() {
        let mut store = ChannelStore::new(rec());
        let v0 = store.version();
        let w = store.working().mapv(|v| v * 2.0);
        store.replace_working(w);
        assert!(store.version() > v0);
        assert_eq!(store.working()[[0, 1]], 2.0);
        assert_eq!(store.raw().data()[[0, 1]], 1.0);
    }

    #[test]
    fn channel_checks() {
        let store = ChannelStore::new(rec());
        assert!(store.channel(2).is_ok());
        assert!(store.channel(3).is_err());
        assert!(store.check_channels(&BTreeSet::new()).is_err());
        assert!(store.check_channels(&BTreeSet::from([0, 7])).is_err());
    }
}
