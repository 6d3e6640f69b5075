// lifting.rs — CPU reference 1D wavelet transforms.
//
// This module is the authoritative implementation of every filter; the GPU
// kernels in src/shaders/dwt.wgsl mirror these loops operation-for-operation
// and are validated against them.
//
// A signal of length n splits into even-indexed samples (the low/approx
// band candidate, length ⌈n/2⌉) and odd-indexed samples (high/detail,
// length ⌊n/2⌋). Lifting then updates one parity from the other in place:
//
//   predict: d[i] += c * (s[i] + s[i+1])      (odd from even neighbours)
//   update:  s[i] += c * (d[i-1] + d[i])      (even from odd neighbours)
//
// Out-of-range neighbour indices clamp to the nearest valid entry of the
// same parity array. Each step is trivially invertible by re-applying it
// with the negated coefficient, so the inverse transform is the forward
// step sequence reversed and negated.
//
// The reversible 5/3 path uses the same structure with floor arithmetic.
// All intermediates on integer-valued input stay integer-valued and are
// exactly representable in f32 (|x| < 2^24), so reconstruction is
// bit-exact. This also holds on the GPU, which runs identical arithmetic.
//
// The arbitrary-filter path is direct convolution with whole-sample mirror
// extension: index i < 0 maps to −i, i ≥ n maps to 2n−i−2, folding
// repeatedly for long filters. Synthesis gathers from the mirror-extended
// upsampled bands so boundary contributions fold back exactly as the
// analysis side emitted them.

use crate::error::{Error, Result};
use crate::filter::{cdf97, FilterKernel};

/// Length of the low band for a signal of length `n`.
#[inline]
pub fn low_len(n: usize) -> usize {
    n.div_ceil(2)
}

/// Length of the high band for a signal of length `n`.
#[inline]
pub fn high_len(n: usize) -> usize {
    n / 2
}

/// Forward 1D transform: split `signal` into (low, high) bands.
///
/// Fails with `InvalidParameter` if `signal.len() < 2`.
pub fn forward(filter: &FilterKernel, signal: &[f32]) -> Result<(Vec<f32>, Vec<f32>)> {
    let n = signal.len();
    if n < 2 {
        return Err(Error::invalid(format!("signal length {n} < 2")));
    }

    match filter {
        FilterKernel::Arbitrary { analysis_low, analysis_high, .. } => {
            Ok(forward_convolve(signal, analysis_low, analysis_high))
        }
        _ => {
            let (mut s, mut d) = split(signal);
            match filter {
                FilterKernel::Reversible53 => forward_53(&mut s, &mut d),
                FilterKernel::Irreversible97 => forward_97(&mut s, &mut d),
                FilterKernel::Lifting { coefficients, scale_low, scale_high } => {
                    forward_lifting(&mut s, &mut d, coefficients, *scale_low, *scale_high)
                }
                FilterKernel::Arbitrary { .. } => unreachable!(),
            }
            Ok((s, d))
        }
    }
}

/// Inverse 1D transform: reconstruct the signal from (low, high) bands.
///
/// Fails with `InvalidParameter` unless `low.len() == high.len()` or
/// `low.len() == high.len() + 1` (the shapes `forward` produces), with at
/// least one sample in each band.
pub fn inverse(filter: &FilterKernel, low: &[f32], high: &[f32]) -> Result<Vec<f32>> {
    let (ne, no) = (low.len(), high.len());
    if no == 0 || (ne != no && ne != no + 1) {
        return Err(Error::invalid(format!(
            "band lengths ({ne}, {no}) do not form a valid split"
        )));
    }

    match filter {
        FilterKernel::Arbitrary { synthesis_low, synthesis_high, .. } => {
            Ok(inverse_convolve(low, high, synthesis_low, synthesis_high))
        }
        _ => {
            let mut s = low.to_vec();
            let mut d = high.to_vec();
            match filter {
                FilterKernel::Reversible53 => inverse_53(&mut s, &mut d),
                FilterKernel::Irreversible97 => inverse_97(&mut s, &mut d),
                FilterKernel::Lifting { coefficients, scale_low, scale_high } => {
                    inverse_lifting(&mut s, &mut d, coefficients, *scale_low, *scale_high)
                }
                FilterKernel::Arbitrary { .. } => unreachable!(),
            }
            Ok(merge(&s, &d))
        }
    }
}

// ---------------------------------------------------------------------------
// Split / merge
// ---------------------------------------------------------------------------

/// De-interleave into (even-indexed, odd-indexed) samples.
fn split(signal: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let s = signal.iter().copied().step_by(2).collect();
    let d = signal.iter().copied().skip(1).step_by(2).collect();
    (s, d)
}

/// Interleave (even, odd) back into a single signal.
fn merge(s: &[f32], d: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(s.len() + d.len());
    for i in 0..s.len() {
        out.push(s[i]);
        if i < d.len() {
            out.push(d[i]);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Generic lifting steps
// ---------------------------------------------------------------------------

/// Predict: d[i] += c * (s[i] + s[i+1]), right neighbour edge-clamped.
fn lift_predict(s: &[f32], d: &mut [f32], c: f32) {
    let last = s.len() - 1;
    for (i, di) in d.iter_mut().enumerate() {
        *di += c * (s[i] + s[(i + 1).min(last)]);
    }
}

/// Update: s[i] += c * (d[i-1] + d[i]), both neighbours edge-clamped.
fn lift_update(d: &[f32], s: &mut [f32], c: f32) {
    let last = d.len() - 1;
    for (i, si) in s.iter_mut().enumerate() {
        let left = d[i.saturating_sub(1)];
        let right = d[i.min(last)];
        *si += c * (left + right);
    }
}

fn forward_lifting(s: &mut [f32], d: &mut [f32], coeffs: &[f32], scale_low: f32, scale_high: f32) {
    for (k, &c) in coeffs.iter().enumerate() {
        if k % 2 == 0 {
            lift_predict(s, d, c);
        } else {
            lift_update(d, s, c);
        }
    }
    for v in s.iter_mut() {
        *v *= scale_low;
    }
    for v in d.iter_mut() {
        *v *= scale_high;
    }
}

fn inverse_lifting(s: &mut [f32], d: &mut [f32], coeffs: &[f32], scale_low: f32, scale_high: f32) {
    for v in s.iter_mut() {
        *v /= scale_low;
    }
    for v in d.iter_mut() {
        *v /= scale_high;
    }
    for (k, &c) in coeffs.iter().enumerate().rev() {
        if k % 2 == 0 {
            lift_predict(s, d, -c);
        } else {
            lift_update(d, s, -c);
        }
    }
}

// ---------------------------------------------------------------------------
// Reversible 5/3
// ---------------------------------------------------------------------------

fn forward_53(s: &mut [f32], d: &mut [f32]) {
    let last_s = s.len() - 1;
    for (i, di) in d.iter_mut().enumerate() {
        *di -= ((s[i] + s[(i + 1).min(last_s)]) / 2.0).floor();
    }
    let last_d = d.len() - 1;
    for (i, si) in s.iter_mut().enumerate() {
        let left = d[i.saturating_sub(1)];
        let right = d[i.min(last_d)];
        *si += ((left + right + 2.0) / 4.0).floor();
    }
}

fn inverse_53(s: &mut [f32], d: &mut [f32]) {
    let last_d = d.len() - 1;
    for (i, si) in s.iter_mut().enumerate() {
        let left = d[i.saturating_sub(1)];
        let right = d[i.min(last_d)];
        *si -= ((left + right + 2.0) / 4.0).floor();
    }
    let last_s = s.len() - 1;
    for (i, di) in d.iter_mut().enumerate() {
        *di += ((s[i] + s[(i + 1).min(last_s)]) / 2.0).floor();
    }
}

// ---------------------------------------------------------------------------
// Irreversible 9/7
// ---------------------------------------------------------------------------

fn forward_97(s: &mut [f32], d: &mut [f32]) {
    lift_predict(s, d, cdf97::ALPHA);
    lift_update(d, s, cdf97::BETA);
    lift_predict(s, d, cdf97::GAMMA);
    lift_update(d, s, cdf97::DELTA);
    for v in s.iter_mut() {
        *v *= cdf97::K;
    }
    for v in d.iter_mut() {
        *v /= cdf97::K;
    }
}

fn inverse_97(s: &mut [f32], d: &mut [f32]) {
    for v in s.iter_mut() {
        *v /= cdf97::K;
    }
    for v in d.iter_mut() {
        *v *= cdf97::K;
    }
    lift_update(d, s, -cdf97::DELTA);
    lift_predict(s, d, -cdf97::GAMMA);
    lift_update(d, s, -cdf97::BETA);
    lift_predict(s, d, -cdf97::ALPHA);
}

// ---------------------------------------------------------------------------
// Arbitrary filter (direct convolution)
// ---------------------------------------------------------------------------

/// Whole-sample mirror extension. Maps any index onto [0, n): −1 → 1,
/// n → n−2, folding repeatedly for indices far outside the range.
#[inline]
fn mirror(idx: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = (2 * n - 2) as isize;
    let mut m = idx.rem_euclid(period);
    if m >= n as isize {
        m = period - m;
    }
    m as usize
}

/// Analysis: the low band samples even phase (2i), the high band odd
/// phase (2i+1), each convolved against its tap set centred at
/// `(taps.len() − 1) / 2`.
fn forward_convolve(x: &[f32], a_low: &[f32], a_high: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let n = x.len();
    let c_low = (a_low.len() as isize - 1) / 2;
    let c_high = (a_high.len() as isize - 1) / 2;

    let low = (0..low_len(n))
        .map(|i| {
            a_low.iter().enumerate().fold(0.0, |acc, (k, &t)| {
                acc + t * x[mirror(2 * i as isize + k as isize - c_low, n)]
            })
        })
        .collect();
    let high = (0..high_len(n))
        .map(|i| {
            a_high.iter().enumerate().fold(0.0, |acc, (k, &t)| {
                acc + t * x[mirror(2 * i as isize + 1 + k as isize - c_high, n)]
            })
        })
        .collect();
    (low, high)
}

/// Synthesis: gather from the mirror-extended upsampled bands. A mirrored
/// index keeps its parity (the period 2n−2 is even), so every folded
/// contribution lands back on the band that produced it.
fn inverse_convolve(low: &[f32], high: &[f32], s_low: &[f32], s_high: &[f32]) -> Vec<f32> {
    let n = low.len() + high.len();
    let c_low = (s_low.len() as isize - 1) / 2;
    let c_high = (s_high.len() as isize - 1) / 2;

    (0..n)
        .map(|j| {
            let mut acc = 0.0;
            for (k, &t) in s_low.iter().enumerate() {
                let p = mirror(j as isize + k as isize - c_low, n);
                if p % 2 == 0 {
                    acc += t * low[p / 2];
                }
            }
            for (k, &t) in s_high.iter().enumerate() {
                let p = mirror(j as isize + k as isize - c_high, n);
                if p % 2 == 1 {
                    acc += t * high[p / 2];
                }
            }
            acc
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
