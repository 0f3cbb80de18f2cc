//! Second-order-section (biquad) IIR design.
//!
//! All designs use the bilinear transform with the analog prototype
//! pre-warped at the design frequency, so the cutoff / notch centre lands
//! exactly where requested:
//!   • notch       one section, `b = [1, −2cos ω, 1]`, `α = sin ω / (2Q)`
//!   • Butterworth `N/2` sections, section `k` with pole quality
//!                 `Q_k = 1 / (2 cos(π(2k+1) / 2N))`
use std::f64::consts::PI;

use serde::Serialize;

/// Biquad coefficients normalised so that `a0 = 1`:
///
/// `y[n] = b0·x[n] + b1·x[n−1] + b2·x[n−2] − a1·y[n−1] − a2·y[n−2]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Biquad {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Biquad {
    fn normalised(b: [f64; 3], a: [f64; 3]) -> Self {
        Self {
            b0: b[0] / a[0],
            b1: b[1] / a[0],
            b2: b[2] / a[0],
            a1: a[1] / a[0],
            a2: a[2] / a[0],
        }
    }

    /// Gain at 0 Hz, used for steady-state initial conditions.
    pub fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Magnitude response at `freq_hz`.
    pub fn magnitude(&self, freq_hz: f64, sfreq: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / sfreq;
        // H(e^{jw}) with z^{-1} = e^{-jw}
        let (c1, s1) = (w.cos(), -w.sin());
        let (c2, s2) = ((2.0 * w).cos(), -(2.0 * w).sin());
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = self.b1 * s1 + self.b2 * s2;
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = self.a1 * s1 + self.a2 * s2;
        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }
}

/// Magnitude response of a section cascade (single pass).
pub fn cascade_magnitude(sections: &[Biquad], freq_hz: f64, sfreq: f64) -> f64 {
    sections.iter().map(|s| s.magnitude(freq_hz, sfreq)).product()
}

/// Pre-warped angular frequency and its sine / cosine.
fn omega(freq_hz: f64, sfreq: f64) -> (f64, f64) {
    let w = 2.0 * PI * freq_hz / sfreq;
    (w.cos(), w.sin())
}

/// Single-section notch at `freq_hz` with quality factor `q`.
pub fn design_notch(freq_hz: f64, sfreq: f64, q: f64) -> Vec<Biquad> {
    let (cos_w, sin_w) = omega(freq_hz, sfreq);
    let alpha = sin_w / (2.0 * q);
    vec![Biquad::normalised(
        [1.0, -2.0 * cos_w, 1.0],
        [1.0 + alpha, -2.0 * cos_w, 1.0 - alpha],
    )]
}

/// Pole quality factors of an order-`order` Butterworth filter, one per
/// section.  `order` must be even.
pub fn butterworth_q(order: usize) -> Vec<f64> {
    let n = order as f64;
    (0..order / 2)
        .map(|k| 1.0 / (2.0 * (PI * (2 * k + 1) as f64 / (2.0 * n)).cos()))
        .collect()
}

/// Butterworth low-pass of even `order` as cascaded biquads.
pub fn design_lowpass(cutoff_hz: f64, sfreq: f64, order: usize) -> Vec<Biquad> {
    let (cos_w, sin_w) = omega(cutoff_hz, sfreq);
    butterworth_q(order)
        .into_iter()
        .map(|q| {
            let alpha = sin_w / (2.0 * q);
            let b0 = (1.0 - cos_w) / 2.0;
            Biquad::normalised(
                [b0, 1.0 - cos_w, b0],
                [1.0 + alpha, -2.0 * cos_w, 1.0 - alpha],
            )
        })
        .collect()
}

/// Butterworth high-pass of even `order` as cascaded biquads.
pub fn design_highpass(cutoff_hz: f64, sfreq: f64, order: usize) -> Vec<Biquad> {
    let (cos_w, sin_w) = omega(cutoff_hz, sfreq);
    butterworth_q(order)
        .into_iter()
        .map(|q| {
            let alpha = sin_w / (2.0 * q);
            let b0 = (1.0 + cos_w) / 2.0;
            Biquad::normalised(
                [b0, -(1.0 + cos_w), b0],
                [1.0 + alpha, -2.0 * cos_w, 1.0 - alpha],
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn second_order_butterworth_q_is_sqrt_half() {
        let q = butterworth_q(2);
        assert_eq!(q.len(), 1);
        assert_abs_diff_eq!(q[0], std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn fourth_order_q_values() {
        let q = butterworth_q(4);
        assert_abs_diff_eq!(q[0], 0.541_196_1, epsilon = 1e-6);
        assert_abs_diff_eq!(q[1], 1.306_563_0, epsilon = 1e-6);
    }

    #[test]
    fn lowpass_is_minus_3db_at_cutoff() {
        let h = design_lowpass(50.0, 1000.0, 4);
        assert_abs_diff_eq!(cascade_magnitude(&h, 50.0, 1000.0), std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-9);
        assert_abs_diff_eq!(cascade_magnitude(&h, 0.0, 1000.0), 1.0, epsilon = 1e-12);
        assert!(cascade_magnitude(&h, 200.0, 1000.0) < 1e-2);
    }

    #[test]
    fn highpass_blocks_dc() {
        let h = design_highpass(1.0, 1000.0, 4);
        for s in &h {
            assert_abs_diff_eq!(s.dc_gain(), 0.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(cascade_magnitude(&h, 1.0, 1000.0), std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-9);
        assert_abs_diff_eq!(cascade_magnitude(&h, 400.0, 1000.0), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn notch_zero_at_centre_unity_elsewhere() {
        let h = design_notch(60.0, 1000.0, 30.0);
        assert!(cascade_magnitude(&h, 60.0, 1000.0) < 1e-9);
        assert_abs_diff_eq!(cascade_magnitude(&h, 0.0, 1000.0), 1.0, epsilon = 1e-12);
        assert!(cascade_magnitude(&h, 40.0, 1000.0) > 0.99);
    }
}
