//! Fixed-width windows around event samples.
//!
//! A window of width `w` around sample `i` covers `[i − w/2, i − w/2 + w)`.
//! Windows that would cross either end of the signal are not produced;
//! there is no zero-padding, so averaged waveforms are never diluted by
//! fill values.
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};

/// `[start, end)` of the window around `center`, or `None` if it does not fit
/// inside a signal of `n` samples.
pub fn window_bounds(center: usize, width: usize, n: usize) -> Option<(usize, usize)> {
    if width == 0 {
        return None;
    }
    let start = center.checked_sub(width / 2)?;
    let end = start + width;
    (end <= n).then_some((start, end))
}

/// Copy the window around `center` out of `x`.
pub fn extract_window(x: ArrayView1<'_, f64>, center: usize, width: usize) -> Option<Array1<f64>> {
    let (start, end) = window_bounds(center, width, x.len())?;
    Some(x.slice(s![start..end]).to_owned())
}

/// Stack the windows around `centers` into an `[N, width]` matrix.
///
/// Every center must fit (see [`window_bounds`]); centers that don't are
/// skipped.
pub fn stack_windows(x: ArrayView1<'_, f64>, centers: &[usize], width: usize) -> Array2<f64> {
    let fitting: Vec<(usize, usize)> = centers
        .iter()
        .filter_map(|&c| window_bounds(c, width, x.len()))
        .collect();
    let mut out = Array2::<f64>::zeros((fitting.len(), width));
    for (mut row, &(start, end)) in out.rows_mut().into_iter().zip(&fitting) {
        row.assign(&x.slice(s![start..end]));
    }
    out
}

/// Sample-wise mean of stacked windows; `None` when there are none.
pub fn average_windows(windows: ArrayView2<'_, f64>) -> Option<Array1<f64>> {
    if windows.nrows() == 0 {
        return None;
    }
    windows.mean_axis(Axis(0))
}
