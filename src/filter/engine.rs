//! Ordered filter chain over a [`ChannelStore`].
//!
//! The working signal is always re-derived from the raw recording by
//! running every active filter in activation order; there is no incremental
//! update.  A failed re-derivation leaves the chain and the working signal
//! exactly as they were.
use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::apply::apply_zero_phase;
use super::design::{design_highpass, design_lowpass, design_notch, Biquad};
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::store::{ChannelStore, Recording};

/// One filter of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FilterSpec {
    /// Narrow band-stop centred at `freq_hz` (mains interference).
    Notch { freq_hz: f64 },
    /// Butterworth low-pass.
    LowPass { cutoff_hz: f64 },
    /// Butterworth high-pass.
    HighPass { cutoff_hz: f64 },
}

impl FilterSpec {
    pub fn frequency_hz(&self) -> f64 {
        match *self {
            FilterSpec::Notch { freq_hz } => freq_hz,
            FilterSpec::LowPass { cutoff_hz } | FilterSpec::HighPass { cutoff_hz } => cutoff_hz,
        }
    }

    /// Frequency must be finite, `> 0` and below Nyquist.
    pub fn validate(&self, sampling_rate_hz: f64) -> Result<()> {
        let f = self.frequency_hz();
        let nyquist = sampling_rate_hz / 2.0;
        if !(f.is_finite() && f > 0.0 && f < nyquist) {
            return Err(Error::invalid(format!(
                "{self}: frequency must be in (0, {nyquist}) Hz"
            )));
        }
        Ok(())
    }

    /// Second-order sections for this spec.
    pub fn design(&self, sampling_rate_hz: f64, cfg: &AnalysisConfig) -> Vec<Biquad> {
        match *self {
            FilterSpec::Notch { freq_hz } => design_notch(freq_hz, sampling_rate_hz, cfg.notch_q),
            FilterSpec::LowPass { cutoff_hz } => {
                design_lowpass(cutoff_hz, sampling_rate_hz, cfg.butterworth_order)
            }
            FilterSpec::HighPass { cutoff_hz } => {
                design_highpass(cutoff_hz, sampling_rate_hz, cfg.butterworth_order)
            }
        }
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSpec::Notch { freq_hz } => write!(f, "notch {freq_hz} Hz"),
            FilterSpec::LowPass { cutoff_hz } => write!(f, "low-pass {cutoff_hz} Hz"),
            FilterSpec::HighPass { cutoff_hz } => write!(f, "high-pass {cutoff_hz} Hz"),
        }
    }
}

/// `kind:freq`, e.g. `notch:50`, `lowpass:100`, `highpass:0.5`.
impl FromStr for FilterSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, freq) = s
            .split_once(':')
            .ok_or_else(|| Error::invalid(format!("filter '{s}' is not of the form kind:freq")))?;
        let f: f64 = freq
            .trim()
            .parse()
            .map_err(|_| Error::invalid(format!("filter '{s}': bad frequency '{freq}'")))?;
        match kind.trim().to_ascii_lowercase().as_str() {
            "notch" => Ok(FilterSpec::Notch { freq_hz: f }),
            "lowpass" | "lp" => Ok(FilterSpec::LowPass { cutoff_hz: f }),
            "highpass" | "hp" => Ok(FilterSpec::HighPass { cutoff_hz: f }),
            other => Err(Error::invalid(format!("unknown filter kind '{other}'"))),
        }
    }
}

/// Handle of an activated filter, unique for the lifetime of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FilterId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActiveFilter {
    pub id: FilterId,
    pub spec: FilterSpec,
}

/// The active filter chain.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    config: AnalysisConfig,
    active: Vec<ActiveFilter>,
    next_id: u64,
}

impl FilterEngine {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, active: Vec::new(), next_id: 0 })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Active filters in activation (= application) order.
    pub fn active(&self) -> &[ActiveFilter] {
        &self.active
    }

    /// Append `spec` to the chain and re-derive the working signal.
    pub fn apply(&mut self, store: &mut ChannelStore, spec: FilterSpec) -> Result<FilterId> {
        spec.validate(store.sampling_rate_hz())?;
        let id = FilterId(self.next_id);
        let mut chain = self.active.clone();
        chain.push(ActiveFilter { id, spec });

        let working = self.derive(store.raw(), &chain)?;
        store.replace_working(working);
        self.active = chain;
        self.next_id += 1;
        log::info!(
            "applied {spec} as filter {}; chain of {} re-derived, signal version {}",
            id.0,
            self.active.len(),
            store.version()
        );
        Ok(id)
    }

    /// Remove one filter and re-derive the working signal.
    pub fn remove(&mut self, store: &mut ChannelStore, id: FilterId) -> Result<()> {
        let Some(pos) = self.active.iter().position(|f| f.id == id) else {
            return Err(Error::invalid(format!("no active filter with id {}", id.0)));
        };
        let mut chain = self.active.clone();
        let removed = chain.remove(pos);

        let working = self.derive(store.raw(), &chain)?;
        store.replace_working(working);
        self.active = chain;
        log::info!(
            "removed {} (filter {}); signal version {}",
            removed.spec,
            id.0,
            store.version()
        );
        Ok(())
    }

    /// Drop every filter; the working signal becomes the raw recording.
    pub fn clear(&mut self, store: &mut ChannelStore) {
        self.active.clear();
        let working = store.raw().data().clone();
        store.replace_working(working);
        log::info!("filter chain cleared; signal version {}", store.version());
    }

    /// Run the current chain over `raw` without touching any state.
    pub fn rederive(&self, raw: &Recording) -> Result<Array2<f64>> {
        self.derive(raw, &self.active)
    }

    fn derive(&self, raw: &Recording, chain: &[ActiveFilter]) -> Result<Array2<f64>> {
        let sfreq = raw.sampling_rate_hz();
        let mut data = raw.data().clone();
        for f in chain {
            f.spec.validate(sfreq)?;
            let sections = f.spec.design(sfreq, &self.config);
            apply_zero_phase(&mut data, &sections)?;
            log::debug!("{} applied ({} sections)", f.spec, sections.len());
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(n: usize) -> ChannelStore {
        let data = Array2::from_shape_fn((2, n), |(c, t)| ((c + 1) as f64 * t as f64 * 0.05).sin());
        ChannelStore::new(Recording::new(data, 1000.0).unwrap())
    }

    fn engine() -> FilterEngine {
        FilterEngine::new(AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn frequency_validation() {
        assert!(FilterSpec::Notch { freq_hz: 60.0 }.validate(1000.0).is_ok());
        assert!(FilterSpec::LowPass { cutoff_hz: 500.0 }.validate(1000.0).is_err());
        assert!(FilterSpec::HighPass { cutoff_hz: 0.0 }.validate(1000.0).is_err());
        assert!(FilterSpec::HighPass { cutoff_hz: f64::NAN }.validate(1000.0).is_err());
    }

    #[test]
    fn spec_parses_from_kind_and_frequency() {
        assert_eq!("notch:50".parse::<FilterSpec>().unwrap(), FilterSpec::Notch { freq_hz: 50.0 });
        assert_eq!(
            "HighPass: 0.5".parse::<FilterSpec>().unwrap(),
            FilterSpec::HighPass { cutoff_hz: 0.5 }
        );
        assert_eq!("lp:100".parse::<FilterSpec>().unwrap(), FilterSpec::LowPass { cutoff_hz: 100.0 });
        assert!("bandpass:10".parse::<FilterSpec>().is_err());
        assert!("notch".parse::<FilterSpec>().is_err());
        assert!("notch:abc".parse::<FilterSpec>().is_err());
    }

    #[test]
    fn apply_bumps_version_and_records_order() {
        let mut s = store(500);
        let mut e = engine();
        let v0 = s.version();
        let a = e.apply(&mut s, FilterSpec::LowPass { cutoff_hz: 50.0 }).unwrap();
        let v1 = s.version();
        let b = e.apply(&mut s, FilterSpec::Notch { freq_hz: 60.0 }).unwrap();
        assert_ne!(a, b);
        assert!(v0 < v1 && v1 < s.version());
        let specs: Vec<_> = e.active().iter().map(|f| f.spec).collect();
        assert_eq!(
            specs,
            vec![FilterSpec::LowPass { cutoff_hz: 50.0 }, FilterSpec::Notch { freq_hz: 60.0 }]
        );
    }

    #[test]
    fn failed_apply_leaves_state_intact() {
        let mut s = store(500);
        let mut e = engine();
        e.apply(&mut s, FilterSpec::LowPass { cutoff_hz: 50.0 }).unwrap();
        let before = s.working().clone();
        let v = s.version();
        assert!(e.apply(&mut s, FilterSpec::Notch { freq_hz: 700.0 }).is_err());
        assert_eq!(s.version(), v);
        assert_eq!(s.working(), &before);
        assert_eq!(e.active().len(), 1);
    }

    #[test]
    fn short_recording_rejected() {
        let mut s = store(10);
        let mut e = engine();
        let v = s.version();
        let err = e.apply(&mut s, FilterSpec::LowPass { cutoff_hz: 50.0 }).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert_eq!(s.version(), v);
        assert!(e.active().is_empty());
    }

    #[test]
    fn remove_rederives_from_raw() {
        let mut s = store(500);
        let mut e = engine();
        let a = e.apply(&mut s, FilterSpec::LowPass { cutoff_hz: 50.0 }).unwrap();
        let only_a = s.working().clone();
        let b = e.apply(&mut s, FilterSpec::HighPass { cutoff_hz: 5.0 }).unwrap();
        e.remove(&mut s, b).unwrap();
        assert_eq!(s.working(), &only_a);
        e.remove(&mut s, a).unwrap();
        assert_eq!(s.working(), s.raw().data());
        assert!(e.remove(&mut s, a).is_err());
    }

    #[test]
    fn clear_restores_raw() {
        let mut s = store(500);
        let mut e = engine();
        e.apply(&mut s, FilterSpec::HighPass { cutoff_hz: 5.0 }).unwrap();
        let v = s.version();
        e.clear(&mut s);
        assert!(e.active().is_empty());
        assert_eq!(s.working(), s.raw().data());
        assert!(s.version() > v);
    }
}
