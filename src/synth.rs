//! Synthetic recordings for demos, tests and benchmarks.
//!
//! [`generate`] builds the classic analyzer test signal: a 1/10/20 Hz sine
//! mixture with noise, sparse bipolar artifacts, sparse positive peaks,
//! 50 and 60 Hz mains interference and a linear drift.  The generator is
//! seeded, so a config always yields the same recording.
use std::f64::consts::PI;

use ndarray::{s, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::Recording;

/// `amplitude · sin(2π f t)` sampled at `sfreq`.
pub fn sine(freq_hz: f64, amplitude: f64, sfreq: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| amplitude * (2.0 * PI * freq_hz * i as f64 / sfreq).sin())
        .collect()
}

/// Overwrite samples `[start, end)` of `channel` with `value`.
pub fn inject(
    data: &mut Array2<f64>,
    channel: usize,
    start: usize,
    end: usize,
    value: f64,
) -> Result<()> {
    let (n_ch, n_t) = data.dim();
    if channel >= n_ch || start > end || end > n_t {
        return Err(Error::invalid(format!(
            "cannot inject [{start}, {end}) on channel {channel} of a {n_ch} × {n_t} matrix"
        )));
    }
    data.slice_mut(s![channel, start..end]).fill(value);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub n_samples: usize,
    pub n_channels: usize,
    pub sampling_rate_hz: f64,
    /// Half-width of the uniform noise.
    pub noise: f64,
    /// Single-sample artifacts per channel, `|a| ∈ [2, 5)`, random sign.
    pub n_artifacts: usize,
    /// Single-sample positive peaks per channel, `a ∈ [1, 2)`.
    pub n_peaks: usize,
    pub mains_50hz: f64,
    pub mains_60hz: f64,
    /// Drift ends at a level drawn from `[0.5, 1.5) · drift`.
    pub drift: f64,
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            n_samples: 10_000,
            n_channels: 3,
            sampling_rate_hz: 1000.0,
            noise: 0.1,
            n_artifacts: 5,
            n_peaks: 20,
            mains_50hz: 0.5,
            mains_60hz: 0.3,
            drift: 1.0,
            seed: 0,
        }
    }
}

/// Generate a recording from `cfg`.
pub fn generate(cfg: &SynthConfig) -> Result<Recording> {
    let n = cfg.n_samples;
    if cfg.n_artifacts > n || cfg.n_peaks > n {
        return Err(Error::invalid(format!(
            "{} artifacts / {} peaks do not fit into {n} samples",
            cfg.n_artifacts, cfg.n_peaks
        )));
    }
    if !(cfg.sampling_rate_hz.is_finite() && cfg.sampling_rate_hz > 0.0) {
        return Err(Error::invalid(format!(
            "sampling rate must be finite and > 0, got {}",
            cfg.sampling_rate_hz
        )));
    }

    let fs = cfg.sampling_rate_hz;
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut data = Array2::<f64>::zeros((cfg.n_channels, n));

    let components = [
        (1.0, 1.0),
        (10.0, 0.5),
        (20.0, 0.3),
        (50.0, cfg.mains_50hz),
        (60.0, cfg.mains_60hz),
    ];

    for mut row in data.rows_mut() {
        for &(f, a) in &components {
            for (v, s) in row.iter_mut().zip(sine(f, a, fs, n)) {
                *v += s;
            }
        }

        if cfg.noise > 0.0 {
            row.mapv_inplace(|v| v + rng.gen_range(-cfg.noise..cfg.noise));
        }

        for i in rand::seq::index::sample(&mut rng, n, cfg.n_artifacts) {
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            row[i] += sign * rng.gen_range(2.0..5.0);
        }
        for i in rand::seq::index::sample(&mut rng, n, cfg.n_peaks) {
            row[i] += rng.gen_range(1.0..2.0);
        }

        if cfg.drift > 0.0 && n > 1 {
            let end = cfg.drift * rng.gen_range(0.5..1.5);
            for (i, v) in row.iter_mut().enumerate() {
                *v += end * i as f64 / (n - 1) as f64;
            }
        }
    }

    log::debug!("synthesized {} × {n} recording (seed {})", cfg.n_channels, cfg.seed);
    Recording::new(data, fs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_recording() {
        let cfg = SynthConfig { n_samples: 2000, ..Default::default() };
        assert_eq!(generate(&cfg).unwrap(), generate(&cfg).unwrap());
        let other = SynthConfig { seed: 1, ..cfg.clone() };
        assert_ne!(generate(&cfg).unwrap(), generate(&other).unwrap());
    }

    #[test]
    fn shape_follows_config() {
        let cfg = SynthConfig { n_samples: 500, n_channels: 4, n_peaks: 3, ..Default::default() };
        let r = generate(&cfg).unwrap();
        assert_eq!(r.channel_count(), 4);
        assert_eq!(r.sample_count(), 500);
    }

    #[test]
    fn too_many_events_rejected() {
        let cfg = SynthConfig { n_samples: 10, n_peaks: 20, ..Default::default() };
        assert!(generate(&cfg).is_err());
    }

    #[test]
    fn inject_overwrites_range() {
        let mut d = Array2::zeros((2, 10));
        inject(&mut d, 1, 3, 6, 9.0).unwrap();
        assert_eq!(d.row(1).iter().filter(|&&v| v == 9.0).count(), 3);
        assert_eq!(d.row(0).sum(), 0.0);
    }

    #[test]
    fn inject_out_of_range_rejected() {
        let mut d = Array2::zeros((2, 10));
        assert!(inject(&mut d, 2, 0, 1, 1.0).is_err());
        assert!(inject(&mut d, 0, 5, 11, 1.0).is_err());
        assert!(inject(&mut d, 0, 6, 5, 1.0).is_err());
        assert_eq!(d.sum(), 0.0);
    }
}
