// tests/test_roundtrip.rs — end-to-end reconstruction guarantees through
// the public engine API, across filters and shapes.

use liftwave::{BackendPolicy, FilterKernel, TransformConfig, WaveletEngine};

fn engine(filter: FilterKernel) -> WaveletEngine {
    WaveletEngine::new(TransformConfig { filter, ..Default::default() })
}

/// Deterministic pseudo-random integer-valued samples.
fn lcg_image(n: usize, mut seed: u32) -> Vec<f32> {
    (0..n)
        .map(|_| {
            seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
            ((seed >> 20) as i32 - 2048) as f32
        })
        .collect()
}

/// Largest magnitude-scaled error: |x − y| / (1 + |x|). Zero only for an
/// exact reconstruction.
fn max_rel_diff(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs() / (1.0 + x.abs()))
        .fold(0.0, f32::max)
}

fn all_filters() -> Vec<FilterKernel> {
    let r = std::f32::consts::FRAC_1_SQRT_2;
    vec![
        FilterKernel::Reversible53,
        FilterKernel::Irreversible97,
        FilterKernel::cdf97_as_lifting(),
        FilterKernel::Arbitrary {
            analysis_low: vec![-0.125, 0.25, 0.75, 0.25, -0.125],
            analysis_high: vec![-0.5, 1.0, -0.5],
            synthesis_low: vec![0.5, 1.0, 0.5],
            synthesis_high: vec![-0.125, -0.25, 0.75, -0.25, -0.125],
        },
        FilterKernel::Lifting {
            coefficients: vec![r - 1.0, 0.5],
            scale_low: std::f32::consts::SQRT_2,
            scale_high: r,
        },
    ]
}

#[test]
fn every_filter_round_trips_1d() {
    for filter in all_filters() {
        let tol = if filter.is_reversible() { 0.0 } else { 1e-4 };
        let mut eng = engine(filter.clone());
        for n in [2usize, 3, 16, 65, 1024] {
            let signal = lcg_image(n, n as u32);
            let (low, high) = eng.forward_1d(&signal, BackendPolicy::ForceCpu).unwrap();
            let back = eng.inverse_1d(&low, &high, BackendPolicy::ForceCpu).unwrap();
            let err = max_rel_diff(&signal, &back);
            assert!(
                err <= tol,
                "filter {} n={n}: max error {err} > {tol}",
                filter.name()
            );
        }
    }
}

#[test]
fn every_filter_round_trips_2d() {
    for filter in all_filters() {
        let tol = if filter.is_reversible() { 0.0 } else { 1e-4 };
        let mut eng = engine(filter.clone());
        for (w, h) in [(2usize, 2usize), (5, 7), (16, 16), (63, 33)] {
            let img = lcg_image(w * h, (w * h) as u32);
            let bands = eng.forward_2d(&img, w, h, BackendPolicy::ForceCpu).unwrap();
            let back = eng.inverse_2d(&bands, BackendPolicy::ForceCpu).unwrap();
            let err = max_rel_diff(&img, &back);
            assert!(
                err <= tol,
                "filter {} {w}x{h}: max error {err} > {tol}",
                filter.name()
            );
        }
    }
}

#[test]
fn multi_level_round_trips_at_every_depth() {
    let (w, h) = (40, 24);
    let img = lcg_image(w * h, 99);
    let max = WaveletEngine::max_decomposition_levels(w, h);
    assert!(max >= 2);

    for filter in [FilterKernel::Reversible53, FilterKernel::Irreversible97] {
        let tol = if filter.is_reversible() { 0.0 } else { 1e-4 };
        let mut eng = engine(filter.clone());
        for levels in 1..=max {
            let d = eng
                .forward_multi_level(&img, w, h, levels, BackendPolicy::ForceCpu)
                .unwrap();
            assert_eq!(d.levels.len(), levels);
            let back = eng.inverse_multi_level(&d, BackendPolicy::ForceCpu).unwrap();
            let err = max_rel_diff(&img, &back);
            assert!(
                err <= tol,
                "filter {} L={levels}: max error {err} > {tol}",
                filter.name()
            );
        }
    }
}

#[test]
fn requesting_excess_levels_clamps_silently() {
    let (w, h) = (16, 16);
    let img = lcg_image(w * h, 5);
    let mut eng = engine(FilterKernel::Reversible53);
    let d = eng
        .forward_multi_level(&img, w, h, usize::MAX, BackendPolicy::ForceCpu)
        .unwrap();
    assert_eq!(d.levels.len(), WaveletEngine::max_decomposition_levels(w, h));
    let back = eng.inverse_multi_level(&d, BackendPolicy::ForceCpu).unwrap();
    assert_eq!(back, img);
}

#[test]
fn tiled_forward_round_trips_per_tile() {
    let (w, h) = (37, 29);
    let img = lcg_image(w * h, 7);
    let mut eng = WaveletEngine::new(TransformConfig {
        filter: FilterKernel::Reversible53,
        tile_width: 16,
        tile_height: 16,
        ..Default::default()
    });

    let tiles = eng.forward_tiled(&img, w, h, BackendPolicy::ForceCpu).unwrap();
    // 37 → tiles of width 16, 16, 5; 29 → heights 16, 13.
    assert_eq!(tiles.len(), 6);

    for t in &tiles {
        let rec = eng.inverse_2d(&t.bands, BackendPolicy::ForceCpu).unwrap();
        let (x0, y0) = (t.tile_x * 16, t.tile_y * 16);
        for y in 0..t.bands.height {
            for x in 0..t.bands.width {
                assert_eq!(
                    rec[y * t.bands.width + x],
                    img[(y0 + y) * w + (x0 + x)],
                    "tile ({},{}) sample ({x},{y})",
                    t.tile_x,
                    t.tile_y
                );
            }
        }
    }
}

#[test]
fn whole_image_tile_matches_first_decomposition_level() {
    let (w, h) = (48, 32);
    let img = lcg_image(w * h, 21);
    let mut eng = engine(FilterKernel::Reversible53);

    let tiles = eng.forward_tiled(&img, w, h, BackendPolicy::ForceCpu).unwrap();
    assert_eq!(tiles.len(), 1);

    let d = eng
        .forward_multi_level(&img, w, h, 1, BackendPolicy::ForceCpu)
        .unwrap();
    assert_eq!(tiles[0].bands, d.levels[0]);
}

#[test]
fn boundary_dimensions() {
    let mut eng = engine(FilterKernel::Reversible53);

    // Length 2 succeeds; length 1 fails.
    assert!(eng.forward_1d(&[3.0, 9.0], BackendPolicy::ForceCpu).is_ok());
    assert!(eng.forward_1d(&[3.0], BackendPolicy::ForceCpu).is_err());

    // 1×N and N×1 images fail.
    assert!(eng.forward_2d(&[1.0; 8], 8, 1, BackendPolicy::ForceCpu).is_err());
    assert!(eng.forward_2d(&[1.0; 8], 1, 8, BackendPolicy::ForceCpu).is_err());
    // 2×2 is the smallest legal image.
    assert!(eng.forward_2d(&[1.0; 4], 2, 2, BackendPolicy::ForceCpu).is_ok());
}

#[test]
#[ignore = "large: ~128 MB of coefficients"]
fn large_image_round_trip() {
    let (w, h) = (4096, 4096);
    let img = lcg_image(w * h, 3);
    let mut eng = engine(FilterKernel::Reversible53);
    let bands = eng.forward_2d(&img, w, h, BackendPolicy::ForceCpu).unwrap();
    let back = eng.inverse_2d(&bands, BackendPolicy::ForceCpu).unwrap();
    assert_eq!(back, img);
}
