// decompose.rs — multi-level decomposition and tile partitioning.
//
// Both are pure structure: they decide *what* to transform and delegate
// each 2D pass to a caller-supplied closure. The engine passes its
// backend-dispatched 2D forward/inverse, so the same level/tile logic
// serves the CPU and GPU paths without duplication.
//
// Level ordering: `levels[0]` is the finest level (first forward pass on
// the full image); the last entry is the coarsest. Reconstruction walks
// the list in reverse, substituting the running image for each level's LL.

use crate::error::{Error, Result};
use crate::transform2d::{validate_dims, Subbands};

/// A complete multi-level decomposition of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// Final approximation: the LL output of the coarsest level.
    pub approx: Vec<f32>,
    pub approx_width: usize,
    pub approx_height: usize,
    /// Per-level subbands, finest first, coarsest last.
    pub levels: Vec<Subbands>,
}

/// One tile's subbands, tagged with its grid position.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSubbands {
    pub bands: Subbands,
    pub tile_x: usize,
    pub tile_y: usize,
}

/// Maximum decomposition depth for an image: halve the smaller dimension
/// (rounding up, matching the LL dimensions) until it drops below 4.
pub fn max_levels(width: usize, height: usize) -> usize {
    let mut d = width.min(height);
    let mut n = 0;
    while d >= 4 {
        n += 1;
        d = d.div_ceil(2);
    }
    n
}

/// Recursive decomposition: apply `fwd2d` to successive LL outputs.
///
/// The level count is `min(requested, max_levels(w, h))`; a clamp result
/// of zero is an `InvalidParameter` (image too small to decompose).
pub fn forward_multi<F>(
    samples: &[f32],
    width: usize,
    height: usize,
    requested: usize,
    mut fwd2d: F,
) -> Result<Decomposition>
where
    F: FnMut(&[f32], usize, usize) -> Result<Subbands>,
{
    validate_dims(samples, width, height)?;
    let level_count = requested.min(max_levels(width, height));
    if level_count == 0 {
        return Err(Error::invalid(format!(
            "cannot decompose {width}x{height} (requested {requested} levels)"
        )));
    }

    let mut cur = samples.to_vec();
    let (mut cw, mut ch) = (width, height);
    let mut levels = Vec::with_capacity(level_count);

    for _ in 0..level_count {
        let bands = fwd2d(&cur, cw, ch)?;
        cur = bands.ll.clone();
        cw = bands.ll_width;
        ch = bands.ll_height;
        levels.push(bands);
    }

    Ok(Decomposition { approx: cur, approx_width: cw, approx_height: ch, levels })
}

/// Reconstruction: replay levels coarsest-to-finest, substituting the
/// progressively rebuilt image as each level's LL.
pub fn inverse_multi<F>(decomp: &Decomposition, mut inv2d: F) -> Result<Vec<f32>>
where
    F: FnMut(&Subbands) -> Result<Vec<f32>>,
{
    if decomp.levels.is_empty() {
        return Err(Error::invalid("decomposition has no levels"));
    }
    let coarsest = decomp.levels.last().unwrap();
    if decomp.approx.len() != coarsest.ll_width * coarsest.ll_height {
        return Err(Error::invalid(format!(
            "approximation length {} does not match coarsest LL {}x{}",
            decomp.approx.len(),
            coarsest.ll_width,
            coarsest.ll_height
        )));
    }

    let mut cur = decomp.approx.clone();
    for bands in decomp.levels.iter().rev() {
        let mut level = bands.clone();
        level.ll = cur;
        cur = inv2d(&level)?;
    }
    Ok(cur)
}

/// Partition the image into a tile grid and transform each tile
/// independently. `tile_w`/`tile_h` of 0 mean one tile covering the whole
/// image. Edge tiles smaller than 2×2 are skipped.
pub fn forward_tiled<F>(
    samples: &[f32],
    width: usize,
    height: usize,
    tile_w: usize,
    tile_h: usize,
    mut fwd2d: F,
) -> Result<Vec<TileSubbands>>
where
    F: FnMut(&[f32], usize, usize) -> Result<Subbands>,
{
    validate_dims(samples, width, height)?;
    let tw = if tile_w == 0 { width } else { tile_w.min(width) };
    let th = if tile_h == 0 { height } else { tile_h.min(height) };

    let tiles_x = width.div_ceil(tw);
    let tiles_y = height.div_ceil(th);
    let mut out = Vec::with_capacity(tiles_x * tiles_y);
    let mut tile = Vec::with_capacity(tw * th);

    for ty in 0..tiles_y {
        let y0 = ty * th;
        let eff_h = th.min(height - y0);
        for tx in 0..tiles_x {
            let x0 = tx * tw;
            let eff_w = tw.min(width - x0);
            if eff_w < 2 || eff_h < 2 {
                continue;
            }

            tile.clear();
            for y in y0..y0 + eff_h {
                tile.extend_from_slice(&samples[y * width + x0..y * width + x0 + eff_w]);
            }

            let bands = fwd2d(&tile, eff_w, eff_h)?;
            out.push(TileSubbands { bands, tile_x: tx, tile_y: ty });
        }
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKernel;
    use crate::transform2d;

    fn cpu_fwd(filter: FilterKernel) -> impl FnMut(&[f32], usize, usize) -> Result<Subbands> {
        move |s, w, h| transform2d::forward(&filter, s, w, h)
    }

    fn cpu_inv(filter: FilterKernel) -> impl FnMut(&Subbands) -> Result<Vec<f32>> {
        move |b| transform2d::inverse(&filter, b)
    }

    fn test_image(w: usize, h: usize) -> Vec<f32> {
        let mut rng = 0x1234_5678u32;
        (0..w * h)
            .map(|_| {
                rng = rng.wrapping_mul(1664525).wrapping_add(1013904223);
                ((rng >> 22) as i32 - 512) as f32
            })
            .collect()
    }

    #[test]
    fn test_max_levels() {
        assert_eq!(max_levels(4, 4), 1);
        assert_eq!(max_levels(8, 8), 2);
        assert_eq!(max_levels(16, 16), 3);
        assert_eq!(max_levels(512, 512), 8);
        // The smaller dimension governs.
        assert_eq!(max_levels(512, 4), 1);
        assert_eq!(max_levels(3, 100), 0);
        assert_eq!(max_levels(2, 2), 0);
    }

    #[test]
    fn test_multi_level_round_trip_exact() {
        let (w, h) = (16, 16);
        let img = test_image(w, h);
        for levels in 1..=max_levels(w, h) {
            let d = forward_multi(&img, w, h, levels, cpu_fwd(FilterKernel::Reversible53)).unwrap();
            assert_eq!(d.levels.len(), levels);
            let back = inverse_multi(&d, cpu_inv(FilterKernel::Reversible53)).unwrap();
            assert_eq!(back, img, "5/3 multi-level round trip failed at L={levels}");
        }
    }

    #[test]
    fn test_multi_level_odd_dims() {
        let (w, h) = (17, 13);
        let img = test_image(w, h);
        let max = max_levels(w, h);
        let d = forward_multi(&img, w, h, max, cpu_fwd(FilterKernel::Reversible53)).unwrap();
        // 13 → 7 → 4 → 2: three levels.
        assert_eq!(max, 3);
        assert_eq!((d.approx_width, d.approx_height), (3, 2));
        let back = inverse_multi(&d, cpu_inv(FilterKernel::Reversible53)).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn test_level_dims_chain() {
        let img = test_image(64, 48);
        let d = forward_multi(&img, 64, 48, 3, cpu_fwd(FilterKernel::Irreversible97)).unwrap();
        assert_eq!((d.levels[0].width, d.levels[0].height), (64, 48));
        assert_eq!((d.levels[1].width, d.levels[1].height), (32, 24));
        assert_eq!((d.levels[2].width, d.levels[2].height), (16, 12));
        assert_eq!((d.approx_width, d.approx_height), (8, 6));
        // Coarsest is last.
        assert_eq!(d.levels.last().unwrap().ll_width, d.approx_width);
    }

    #[test]
    fn test_excess_levels_clamp_silently() {
        let img = test_image(16, 16);
        let d = forward_multi(&img, 16, 16, 100, cpu_fwd(FilterKernel::Reversible53)).unwrap();
        assert_eq!(d.levels.len(), 3);
    }

    #[test]
    fn test_zero_possible_levels_rejected() {
        let img = test_image(3, 3);
        let r = forward_multi(&img, 3, 3, 1, cpu_fwd(FilterKernel::Reversible53));
        assert!(matches!(r, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_inverse_rejects_inconsistent_decomposition() {
        let img = test_image(8, 8);
        let mut d = forward_multi(&img, 8, 8, 2, cpu_fwd(FilterKernel::Reversible53)).unwrap();
        d.approx.pop();
        let r = inverse_multi(&d, cpu_inv(FilterKernel::Reversible53));
        assert!(matches!(r, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_single_tile_matches_whole_image() {
        // Tile size 0 = one tile covering the image; its bands must equal
        // a direct 2D forward (the first level of any decomposition).
        let img = test_image(12, 10);
        let tiles =
            forward_tiled(&img, 12, 10, 0, 0, cpu_fwd(FilterKernel::Reversible53)).unwrap();
        assert_eq!(tiles.len(), 1);
        assert_eq!((tiles[0].tile_x, tiles[0].tile_y), (0, 0));

        let whole = transform2d::forward(&FilterKernel::Reversible53, &img, 12, 10).unwrap();
        assert_eq!(tiles[0].bands, whole);
    }

    #[test]
    fn test_tile_grid_coords_and_round_trip() {
        let (w, h) = (8, 8);
        let img = test_image(w, h);
        let tiles = forward_tiled(&img, w, h, 4, 4, cpu_fwd(FilterKernel::Reversible53)).unwrap();
        assert_eq!(tiles.len(), 4);
        let coords: Vec<_> = tiles.iter().map(|t| (t.tile_x, t.tile_y)).collect();
        assert_eq!(coords, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);

        // Inverting each tile reproduces its source region exactly.
        for t in &tiles {
            let rec = transform2d::inverse(&FilterKernel::Reversible53, &t.bands).unwrap();
            let (x0, y0) = (t.tile_x * 4, t.tile_y * 4);
            for y in 0..4 {
                for x in 0..4 {
                    assert_eq!(rec[y * 4 + x], img[(y0 + y) * w + (x0 + x)]);
                }
            }
        }
    }

    #[test]
    fn test_undersized_edge_tiles_skipped() {
        // 5x5 with 2x2 tiles: the third row/column of tiles is 1 wide/tall
        // and is skipped.
        let img = test_image(5, 5);
        let tiles = forward_tiled(&img, 5, 5, 2, 2, cpu_fwd(FilterKernel::Reversible53)).unwrap();
        let coords: Vec<_> = tiles.iter().map(|t| (t.tile_x, t.tile_y)).collect();
        assert_eq!(coords, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }
}
