//! Per-channel and per-peak descriptive statistics.
//!
//! [`StatisticsAggregator`] borrows the store and the detector results; it
//! never copies or caches them, so every figure reflects the state at the
//! time of the call.  Standard deviations are population values (`ddof = 0`).
use serde::Serialize;

use crate::artifact::ArtifactSet;
use crate::error::{Error, Result};
use crate::peaks::{PeakSet, Polarity};
use crate::store::ChannelStore;
use crate::window::average_windows;

/// Summary of one channel of the working signal, artifacts excluded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStatistics {
    pub channel: usize,
    /// Index of the channel in the originally loaded recording.
    pub channel_label: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Samples the moments were computed over.
    pub sample_count: usize,
    pub artifact_count: usize,
    pub artifact_samples: usize,
    pub artifact_duration_s: f64,
}

/// Summary of the detected peaks of one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakStatistics {
    pub channel: usize,
    pub channel_label: usize,
    pub peak_count: usize,
    pub positive_count: usize,
    pub negative_count: usize,
    pub mean_amplitude: f64,
    pub amplitude_std: f64,
    /// Peaks per second over the whole recording.
    pub frequency_hz: f64,
    /// `None` with fewer than two peaks.
    pub mean_inter_peak_interval_s: Option<f64>,
    pub std_inter_peak_interval_s: Option<f64>,
    pub mean_inter_peak_distance: Option<f64>,
    /// Sample-wise mean of the channel's peak windows.
    pub average_shape: Vec<f64>,
}

/// Mean and population standard deviation, accumulated in one pass.
fn mean_std(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64, usize)> {
    let (mut n, mut mean, mut m2) = (0usize, 0.0_f64, 0.0_f64);
    for v in values {
        n += 1;
        let d = v - mean;
        mean += d / n as f64;
        m2 += d * (v - mean);
    }
    (n > 0).then(|| (mean, (m2 / n as f64).sqrt(), n))
}

/// Read-only view combining the store with the detectors' latest results.
#[derive(Debug, Clone, Copy)]
pub struct StatisticsAggregator<'a> {
    store: &'a ChannelStore,
    artifacts: Option<&'a ArtifactSet>,
    peaks: Option<&'a PeakSet>,
}

impl<'a> StatisticsAggregator<'a> {
    pub fn new(
        store: &'a ChannelStore,
        artifacts: Option<&'a ArtifactSet>,
        peaks: Option<&'a PeakSet>,
    ) -> Self {
        Self { store, artifacts, peaks }
    }

    /// Artifacts usable for the current signal; stale sets are an error,
    /// an absent set means "no artifacts known".
    fn artifacts(&self) -> Result<Option<&'a ArtifactSet>> {
        match self.artifacts {
            Some(a) if a.version() != self.store.version() => Err(Error::StaleState {
                what: "artifact set",
                computed: Some(a.version()),
                current: self.store.version(),
            }),
            other => Ok(other),
        }
    }

    fn peaks(&self) -> Result<&'a PeakSet> {
        match self.peaks {
            Some(p) if p.version() == self.store.version() => Ok(p),
            other => Err(Error::StaleState {
                what: "peak set",
                computed: other.map(PeakSet::version),
                current: self.store.version(),
            }),
        }
    }

    /// Mean, spread and range of the channel's non-artifact samples.
    pub fn channel_stats(&self, channel: usize) -> Result<ChannelStatistics> {
        let row = self.store.channel(channel)?;
        let artifacts = self.artifacts()?;
        let is_clean = |t: usize| !artifacts.is_some_and(|a| a.contains(channel, t));

        let clean = || {
            row.iter()
                .enumerate()
                .filter(move |&(t, _)| is_clean(t))
                .map(|(_, &v)| v)
        };
        let Some((mean, std_dev, sample_count)) = mean_std(clean()) else {
            return Err(Error::empty(format!("channel {channel} has no artifact-free samples")));
        };
        let (min, max) = clean().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

        let artifact_count = artifacts.map_or(0, |a| a.count(channel));
        let artifact_samples = artifacts.map_or(0, |a| a.total_samples(channel));
        Ok(ChannelStatistics {
            channel,
            channel_label: self.store.raw().channel_labels()[channel],
            mean,
            std_dev,
            min,
            max,
            sample_count,
            artifact_count,
            artifact_samples,
            artifact_duration_s: artifact_samples as f64 / self.store.sampling_rate_hz(),
        })
    }

    /// Amplitude, timing and average shape of the channel's peaks.
    ///
    /// Fails with `EmptyResult` when the channel has no peaks.
    pub fn peak_stats(&self, channel: usize) -> Result<PeakStatistics> {
        self.store.check_channel(channel)?;
        let peaks = self.peaks()?;
        let events = peaks.events(channel);
        if events.is_empty() {
            return Err(Error::empty(format!("no peaks on channel {channel}")));
        }

        let sfreq = self.store.sampling_rate_hz();
        let (mean_amplitude, amplitude_std, peak_count) = mean_std(events.iter().map(|e| e.amplitude))
            .ok_or_else(|| Error::empty(format!("no peaks on channel {channel}")))?;
        let positive_count = events.iter().filter(|e| e.polarity == Polarity::Positive).count();

        let distances: Vec<f64> = events
            .windows(2)
            .map(|w| (w[1].sample - w[0].sample) as f64)
            .collect();
        let distance_stats = mean_std(distances.iter().copied());

        let average_shape = peaks
            .windows(channel)
            .and_then(average_windows)
            .map(|a| a.to_vec())
            .ok_or_else(|| Error::empty(format!("no peak windows on channel {channel}")))?;

        let duration_s = self.store.raw().duration_s();
        Ok(PeakStatistics {
            channel,
            channel_label: self.store.raw().channel_labels()[channel],
            peak_count,
            positive_count,
            negative_count: peak_count - positive_count,
            mean_amplitude,
            amplitude_std,
            frequency_hz: peak_count as f64 / duration_s,
            mean_inter_peak_interval_s: distance_stats.map(|(m, _, _)| m / sfreq),
            std_inter_peak_interval_s: distance_stats.map(|(_, s, _)| s / sfreq),
            mean_inter_peak_distance: distance_stats.map(|(m, _, _)| m),
            average_shape,
        })
    }

    /// Channel statistics for every channel, in channel order.
    pub fn all_channel_stats(&self) -> Result<Vec<ChannelStatistics>> {
        (0..self.store.channel_count())
            .map(|c| self.channel_stats(c))
            .collect()
    }

    /// Peak statistics for every channel that has peaks.
    pub fn all_peak_stats(&self) -> Result<Vec<PeakStatistics>> {
        let mut out = Vec::new();
        for c in 0..self.store.channel_count() {
            match self.peak_stats(c) {
                Ok(s) => out.push(s),
                Err(Error::EmptyResult(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}
