//! Analysis configuration.
//!
//! [`AnalysisConfig`] holds every constant that changes detection results:
//! filter design parameters, the artifact gap-merge distance and the peak
//! refractory distance.  Two runs with equal configs, equal inputs and equal
//! thresholds produce bit-identical outputs, so the config is part of what a
//! result depends on and is exposed rather than hidden.
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default quality factor of the notch filter.
pub const DEFAULT_NOTCH_Q: f64 = 30.0;

/// Default Butterworth order for low-pass / high-pass filters.
pub const DEFAULT_BUTTERWORTH_ORDER: usize = 4;

/// Default gap (in samples) below which two artifact runs are merged.
pub const DEFAULT_ARTIFACT_MERGE_GAP: usize = 10;

/// Default minimum distance (in samples) between two peaks on one channel.
pub const DEFAULT_REFRACTORY_SAMPLES: usize = 10;

/// Configuration shared by the filter engine and both detectors.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use ephys::AnalysisConfig;
///
/// let cfg = AnalysisConfig {
///     refractory_samples: 200,   // at most one peak per 200 ms at 1 kHz
///     ..AnalysisConfig::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Quality factor `f0 / bandwidth` of the notch filter.
    ///
    /// At 50 Hz and the default `Q = 30` the −3 dB stop band is about
    /// 1.7 Hz wide, narrow enough to leave neighbouring content intact.
    ///
    /// Default: `30.0`.
    pub notch_q: f64,

    /// Order of the Butterworth low-pass and high-pass designs.
    ///
    /// Realised as `order / 2` cascaded second-order sections, so the
    /// value must be even.  Forward-backward application doubles the
    /// effective attenuation slope and squares the magnitude response.
    ///
    /// Default: `4`.
    pub butterworth_order: usize,

    /// Artifact runs separated by fewer than this many sub-threshold
    /// samples are merged into one interval.
    ///
    /// Default: `10` samples.
    pub artifact_merge_gap: usize,

    /// Minimum index distance between two retained peaks on one channel.
    ///
    /// Default: `10` samples.
    pub refractory_samples: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            notch_q: DEFAULT_NOTCH_Q,
            butterworth_order: DEFAULT_BUTTERWORTH_ORDER,
            artifact_merge_gap: DEFAULT_ARTIFACT_MERGE_GAP,
            refractory_samples: DEFAULT_REFRACTORY_SAMPLES,
        }
    }
}

impl AnalysisConfig {
    /// Check every field; never clamps.
    pub fn validate(&self) -> Result<()> {
        if !(self.notch_q.is_finite() && self.notch_q > 0.0) {
            return Err(Error::invalid(format!(
                "notch_q must be finite and > 0, got {}",
                self.notch_q
            )));
        }
        if self.butterworth_order == 0 || self.butterworth_order % 2 != 0 {
            return Err(Error::invalid(format!(
                "butterworth_order must be even and >= 2, got {}",
                self.butterworth_order
            )));
        }
        if self.refractory_samples == 0 {
            return Err(Error::invalid("refractory_samples must be >= 1"));
        }
        Ok(())
    }

    /// Number of biquad sections in a low-pass / high-pass design.
    ///
    /// ```
    /// use ephys::AnalysisConfig;
    /// assert_eq!(AnalysisConfig::default().butterworth_sections(), 2);
    /// ```
    pub fn butterworth_sections(&self) -> usize {
        self.butterworth_order / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn odd_order_rejected() {
        let cfg = AnalysisConfig { butterworth_order: 3, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn zero_refractory_rejected() {
        let cfg = AnalysisConfig { refractory_samples: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: AnalysisConfig = serde_json::from_str(r#"{ "notch_q": 10.0 }"#).unwrap();
        assert_eq!(cfg.notch_q, 10.0);
        assert_eq!(cfg.butterworth_order, DEFAULT_BUTTERWORTH_ORDER);
        assert_eq!(cfg.refractory_samples, DEFAULT_REFRACTORY_SAMPLES);
    }
}
