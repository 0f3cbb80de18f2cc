//! IIR filter design, zero-phase application and the active filter chain.
//!
//! - [`design`]: notch and Butterworth low/high-pass biquad cascades.
//! - [`apply`]: forward-backward (`filtfilt`) application with odd-reflection
//!   edge padding.
//! - [`engine`]: [`FilterEngine`], the ordered chain that re-derives the
//!   working signal from the raw recording.

pub mod apply;
pub mod design;
pub mod engine;

pub use apply::{apply_zero_phase, filtfilt, min_signal_len, pad_len};
pub use design::{
    butterworth_q, cascade_magnitude, design_highpass, design_lowpass, design_notch, Biquad,
};
pub use engine::{ActiveFilter, FilterEngine, FilterId, FilterSpec};
