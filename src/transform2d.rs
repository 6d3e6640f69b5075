// transform2d.rs — separable 2D wavelet transform.
//
// Forward: a horizontal 1D transform on every row packs each row as
// [low | high]; a vertical 1D transform on every column then packs each
// column as [low | high]. The result is a quadrant layout in one buffer:
//
//        0..lw        lw..w
//   0..lh  LL           HL        lw = ⌈w/2⌉, lh = ⌈h/2⌉
//   lh..h  LH           HH
//
// LL/LH come from the horizontally-low columns, HL/HH from the
// horizontally-high columns, matching the subband naming
// (first letter = horizontal band, second = vertical band).
//
// The packed buffer is the unit of work both backends share: the GPU
// kernels produce the identical layout, and `split_quadrants` /
// `Subbands::reassemble` convert between it and the per-band arrays.

use crate::error::{Error, Result};
use crate::filter::FilterKernel;
use crate::lifting::{self, low_len};

/// One decomposition level: the four coefficient quadrants of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct Subbands {
    /// Approximation (low/low), `ll_width × ll_height`.
    pub ll: Vec<f32>,
    /// Horizontal-low, vertical-high detail, `ll_width × (height − ll_height)`.
    pub lh: Vec<f32>,
    /// Horizontal-high, vertical-low detail, `(width − ll_width) × ll_height`.
    pub hl: Vec<f32>,
    /// Diagonal detail, `(width − ll_width) × (height − ll_height)`.
    pub hh: Vec<f32>,
    pub ll_width: usize,
    pub ll_height: usize,
    /// Dimensions of the image this level was produced from.
    pub width: usize,
    pub height: usize,
}

impl Subbands {
    /// Rebuild the packed quadrant buffer (inverse of `split_quadrants`).
    pub fn reassemble(&self) -> Vec<f32> {
        let (w, h) = (self.width, self.height);
        let (lw, lh) = (self.ll_width, self.ll_height);
        let hw = w - lw;

        let mut packed = vec![0.0f32; w * h];
        for y in 0..h {
            for x in 0..w {
                let v = if y < lh {
                    if x < lw {
                        self.ll[y * lw + x]
                    } else {
                        self.hl[y * hw + (x - lw)]
                    }
                } else if x < lw {
                    self.lh[(y - lh) * lw + x]
                } else {
                    self.hh[(y - lh) * hw + (x - lw)]
                };
                packed[y * w + x] = v;
            }
        }
        packed
    }
}

/// Check 2D preconditions shared by both backends. Both dimensions must be
/// at least 2 (a 1×N or N×1 image has no second transform axis).
pub(crate) fn validate_dims(samples: &[f32], width: usize, height: usize) -> Result<()> {
    if width < 2 || height < 2 {
        return Err(Error::invalid(format!(
            "image dimensions {width}x{height}: both must be >= 2"
        )));
    }
    if samples.len() != width * height {
        return Err(Error::invalid(format!(
            "sample count {} does not match {width}x{height}",
            samples.len()
        )));
    }
    Ok(())
}

/// Forward 2D transform on the CPU.
pub fn forward(filter: &FilterKernel, samples: &[f32], width: usize, height: usize) -> Result<Subbands> {
    validate_dims(samples, width, height)?;
    let packed = forward_packed(filter, samples, width, height)?;
    Ok(split_quadrants(&packed, width, height))
}

/// Inverse 2D transform on the CPU.
pub fn inverse(filter: &FilterKernel, bands: &Subbands) -> Result<Vec<f32>> {
    let packed = bands.reassemble();
    inverse_packed(filter, &packed, bands.width, bands.height)
}

// ---------------------------------------------------------------------------
// Packed-layout passes (shared with the GPU path's readback)
// ---------------------------------------------------------------------------

/// Rows then columns, producing the packed quadrant layout.
pub(crate) fn forward_packed(
    filter: &FilterKernel,
    samples: &[f32],
    width: usize,
    height: usize,
) -> Result<Vec<f32>> {
    let mut buf = vec![0.0f32; width * height];

    // Horizontal pass: every row becomes [low | high].
    for y in 0..height {
        let row = &samples[y * width..(y + 1) * width];
        let (low, high) = lifting::forward(filter, row)?;
        let out = &mut buf[y * width..(y + 1) * width];
        out[..low.len()].copy_from_slice(&low);
        out[low.len()..].copy_from_slice(&high);
    }

    // Vertical pass: every column becomes [low | high].
    let mut col = vec![0.0f32; height];
    for x in 0..width {
        for y in 0..height {
            col[y] = buf[y * width + x];
        }
        let (low, high) = lifting::forward(filter, &col)?;
        for (y, &v) in low.iter().enumerate() {
            buf[y * width + x] = v;
        }
        for (y, &v) in high.iter().enumerate() {
            buf[(low.len() + y) * width + x] = v;
        }
    }

    Ok(buf)
}

/// Columns then rows, inverting `forward_packed`.
pub(crate) fn inverse_packed(
    filter: &FilterKernel,
    packed: &[f32],
    width: usize,
    height: usize,
) -> Result<Vec<f32>> {
    validate_dims(packed, width, height)?;
    let lh = low_len(height);
    let lw = low_len(width);
    let mut buf = packed.to_vec();

    let mut low = vec![0.0f32; lh];
    let mut high = vec![0.0f32; height - lh];
    for x in 0..width {
        for y in 0..lh {
            low[y] = buf[y * width + x];
        }
        for y in lh..height {
            high[y - lh] = buf[y * width + x];
        }
        let col = lifting::inverse(filter, &low, &high)?;
        for (y, &v) in col.iter().enumerate() {
            buf[y * width + x] = v;
        }
    }

    let mut out = vec![0.0f32; width * height];
    for y in 0..height {
        let row = &buf[y * width..(y + 1) * width];
        let rec = lifting::inverse(filter, &row[..lw], &row[lw..])?;
        out[y * width..(y + 1) * width].copy_from_slice(&rec);
    }

    Ok(out)
}

/// Cut the packed buffer into the four per-band arrays.
pub(crate) fn split_quadrants(packed: &[f32], width: usize, height: usize) -> Subbands {
    let lw = low_len(width);
    let lh = low_len(height);
    let hw = width - lw;
    let hh = height - lh;

    let mut bands = Subbands {
        ll: Vec::with_capacity(lw * lh),
        lh: Vec::with_capacity(lw * hh),
        hl: Vec::with_capacity(hw * lh),
        hh: Vec::with_capacity(hw * hh),
        ll_width: lw,
        ll_height: lh,
        width,
        height,
    };

    for y in 0..height {
        for x in 0..width {
            let v = packed[y * width + x];
            match (y < lh, x < lw) {
                (true, true) => bands.ll.push(v),
                (true, false) => bands.hl.push(v),
                (false, true) => bands.lh.push(v),
                (false, false) => bands.hh.push(v),
            }
        }
    }
    bands
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(w: usize, h: usize) -> Vec<f32> {
        let mut rng = 0x9e37_79b9u32;
        (0..w * h)
            .map(|_| {
                rng = rng.wrapping_mul(1664525).wrapping_add(1013904223);
                ((rng >> 21) as i32 - 1024) as f32
            })
            .collect()
    }

    #[test]
    fn test_subband_dimensions() {
        let img = test_image(7, 5);
        let bands = forward(&FilterKernel::Reversible53, &img, 7, 5).unwrap();
        assert_eq!((bands.ll_width, bands.ll_height), (4, 3));
        assert_eq!(bands.ll.len(), 4 * 3);
        assert_eq!(bands.lh.len(), 4 * 2);
        assert_eq!(bands.hl.len(), 3 * 3);
        assert_eq!(bands.hh.len(), 3 * 2);
        assert_eq!((bands.width, bands.height), (7, 5));
    }

    #[test]
    fn test_rev53_2d_round_trip_exact() {
        for (w, h) in [(2, 2), (4, 4), (5, 7), (16, 9), (33, 65)] {
            let img = test_image(w, h);
            let bands = forward(&FilterKernel::Reversible53, &img, w, h).unwrap();
            let back = inverse(&FilterKernel::Reversible53, &bands).unwrap();
            assert_eq!(back, img, "5/3 2D round trip not exact for {w}x{h}");
        }
    }

    #[test]
    fn test_irr97_2d_round_trip() {
        for (w, h) in [(2, 2), (8, 8), (31, 17), (64, 64)] {
            let img = test_image(w, h);
            let bands = forward(&FilterKernel::Irreversible97, &img, w, h).unwrap();
            let back = inverse(&FilterKernel::Irreversible97, &bands).unwrap();
            for (i, (&a, &b)) in img.iter().zip(back.iter()).enumerate() {
                assert!(
                    (a - b).abs() < 1e-4 * (1.0 + a.abs()),
                    "9/7 2D {w}x{h} sample {i}: {a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn test_constant_image_detail_is_zero() {
        let img = vec![100.0f32; 16 * 16];
        let bands = forward(&FilterKernel::Reversible53, &img, 16, 16).unwrap();
        assert!(bands.ll.iter().all(|&v| v == 100.0));
        assert!(bands.lh.iter().all(|&v| v == 0.0));
        assert!(bands.hl.iter().all(|&v| v == 0.0));
        assert!(bands.hh.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_degenerate_dimensions_rejected() {
        let f = FilterKernel::Reversible53;
        assert!(matches!(
            forward(&f, &[1.0, 2.0, 3.0], 3, 1),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            forward(&f, &[1.0, 2.0, 3.0], 1, 3),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            forward(&f, &[1.0, 2.0, 3.0], 2, 2),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_reassemble_inverts_split() {
        let img = test_image(9, 6);
        let packed = forward_packed(&FilterKernel::Irreversible97, &img, 9, 6).unwrap();
        let bands = split_quadrants(&packed, 9, 6);
        assert_eq!(bands.reassemble(), packed);
    }
}
