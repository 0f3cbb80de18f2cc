/// Shared recordings and spectral helpers for the integration tests.
use ephys::synth::{inject, sine};
use ephys::{AnalysisConfig, Recording, Session};
use ndarray::Array2;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

#[allow(unused)]
pub const SFREQ: f64 = 1000.0;

/// 2 ch × 1000 samples @ 1 kHz: 100·sin(2π·5 t) on channel 0 with a
/// +500 artifact over `[200, 210)`, flat zero on channel 1.
#[allow(unused)]
pub fn scenario_recording() -> Recording {
    let mut data = Array2::<f64>::zeros((2, 1000));
    for (v, s) in data.row_mut(0).iter_mut().zip(sine(5.0, 100.0, SFREQ, 1000)) {
        *v = s;
    }
    inject(&mut data, 0, 200, 210, 500.0).unwrap();
    Recording::new(data, SFREQ).unwrap()
}

#[allow(unused)]
pub fn scenario_session() -> Session {
    Session::new(scenario_recording(), AnalysisConfig::default()).unwrap()
}

#[allow(unused)]
/// Single-channel recording holding `x`.
pub fn single_channel(x: &[f64], sfreq: f64) -> Recording {
    let data = Array2::from_shape_vec((1, x.len()), x.to_vec()).unwrap();
    Recording::new(data, sfreq).unwrap()
}

#[allow(unused)]
/// Power of `x` in the FFT bin nearest `freq_hz`.
pub fn band_power(x: &[f64], sfreq: f64, freq_hz: f64) -> f64 {
    let n = x.len();
    let mut buf: Vec<Complex<f64>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
    FftPlanner::new().plan_fft_forward(n).process(&mut buf);
    let bin = (freq_hz * n as f64 / sfreq).round() as usize;
    buf[bin].norm_sqr() / (n as f64 * n as f64)
}

#[allow(unused)]
/// Sum of squares.
pub fn energy(x: &[f64]) -> f64 {
    x.iter().map(|v| v * v).sum()
}
