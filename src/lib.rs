//! # ephys — filtering and event detection for electrophysiology recordings
//!
//! `ephys` is the analysis core of an interactive multi-channel voltage
//! recording viewer.  It takes a fully loaded recording, filters it,
//! finds artifacts and peaks, and derives the statistics a front end shows
//! and exports.  File parsing, plotting and spreadsheet writing live
//! outside the crate.
//!
//! ## Pipeline overview
//!
//! ```text
//! Recording [C, T] f64  (immutable raw samples)
//!   │
//!   ├─ FilterEngine        notch / Butterworth LP / HP, zero-phase,
//!   │                      chain re-derived from raw on every change
//!   ├─ ArtifactDetector    |x| > threshold runs, gap-merged → intervals
//!   ├─ PeakDetector        local extrema > threshold, refractory spacing,
//!   │                      optional artifact exclusion, centred windows
//!   └─ StatisticsAggregator
//!        │
//!        └─→ ChannelStatistics / PeakStatistics  (serde-serialisable rows)
//! ```
//!
//! Every replacement of the working signal bumps a [`SignalVersion`].
//! Detector results remember the version they were computed against, and
//! anything that depends on them fails with [`Error::StaleState`] once the
//! signal has moved on.
//!
//! ## Quick start
//!
//! ```
//! use ephys::{AnalysisConfig, ArtifactParams, FilterSpec, PeakParams, PeakPolarity, Recording, Session};
//! use ndarray::Array2;
//!
//! // 2 channels, 1 s at 1 kHz: a 5 Hz sine on channel 0, silence on channel 1.
//! let data = Array2::from_shape_fn((2, 1000), |(c, t)| {
//!     if c == 0 { 100.0 * (2.0 * std::f64::consts::PI * 5.0 * t as f64 / 1000.0).sin() } else { 0.0 }
//! });
//! let mut session = Session::new(Recording::new(data, 1000.0)?, AnalysisConfig::default())?;
//!
//! session.apply_filter(FilterSpec::Notch { freq_hz: 50.0 })?;
//! session.detect_artifacts(&ArtifactParams::new(300.0, [0]))?;
//! let peaks = session.detect_peaks(
//!     &PeakParams::new(50.0, [0], 20)
//!         .exclude_artifacts(true)
//!         .polarity(PeakPolarity::Positive),
//! )?;
//! assert_eq!(peaks.count(0), 5);
//!
//! let stats = session.statistics().peak_stats(0)?;
//! assert_eq!(stats.average_shape.len(), 20);
//! # Ok::<(), ephys::Error>(())
//! ```
//!
//! ## Running individual steps
//!
//! The components can also be driven separately; they only share state
//! through the [`ChannelStore`] and the sets passed by reference:
//!
//! ```
//! use ephys::{AnalysisConfig, ArtifactDetector, ArtifactParams, ChannelStore, FilterEngine,
//!             FilterSpec, Recording, StatisticsAggregator};
//! use ndarray::Array2;
//!
//! let cfg = AnalysisConfig::default();
//! let mut store = ChannelStore::new(Recording::new(Array2::zeros((4, 2000)), 1000.0)?);
//! let mut filters = FilterEngine::new(cfg.clone())?;
//! filters.apply(&mut store, FilterSpec::HighPass { cutoff_hz: 1.0 })?;
//!
//! let mut artifacts = ArtifactDetector::new(&cfg);
//! artifacts.detect(&store, &ArtifactParams::new(5.0, 0..4))?;
//!
//! let agg = StatisticsAggregator::new(&store, artifacts.result(), None);
//! assert_eq!(agg.channel_stats(2)?.artifact_count, 0);
//! # Ok::<(), ephys::Error>(())
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod filter;
pub mod peaks;
pub mod session;
pub mod stats;
pub mod store;
pub mod synth;
pub mod window;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{
    AnalysisConfig, DEFAULT_ARTIFACT_MERGE_GAP, DEFAULT_BUTTERWORTH_ORDER, DEFAULT_NOTCH_Q,
    DEFAULT_REFRACTORY_SAMPLES,
};

// error
pub use error::{Error, Result};

// store
pub use store::{ChannelStore, Recording, SignalVersion};

// filter: chain + design helpers
pub use filter::{ActiveFilter, Biquad, FilterEngine, FilterId, FilterSpec};

// detectors
pub use artifact::{ArtifactDetector, ArtifactParams, ArtifactSet, Interval};
pub use peaks::{PeakDetector, PeakEvent, PeakParams, PeakPolarity, PeakSet, Polarity};

// statistics
pub use stats::{ChannelStatistics, PeakStatistics, StatisticsAggregator};

// session
pub use session::Session;

// synthetic data
pub use synth::{generate, SynthConfig};
