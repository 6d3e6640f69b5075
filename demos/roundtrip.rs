// demos/roundtrip.rs — decompose and reconstruct a synthetic image,
// printing reconstruction error and engine statistics.
//
//   cargo run --example roundtrip
//   RUST_LOG=debug cargo run --example roundtrip   (device/dispatch logs)

use liftwave::{BackendPolicy, FilterKernel, TransformConfig, WaveletEngine};

fn main() {
    env_logger::init();

    let (w, h) = (512usize, 512usize);
    let image: Vec<f32> = (0..w * h)
        .map(|i| {
            let (x, y) = (i % w, i / w);
            let v = ((x as f32 * 0.07).sin() + (y as f32 * 0.05).cos()) * 96.0 + 128.0;
            v.round()
        })
        .collect();

    for filter in [FilterKernel::Reversible53, FilterKernel::Irreversible97] {
        let name = filter.name();
        let mut engine = WaveletEngine::new(TransformConfig { filter, ..Default::default() });
        let levels = engine.config().levels;

        let decomp = engine
            .forward_multi_level(&image, w, h, levels, BackendPolicy::Auto)
            .expect("forward transform");
        let restored = engine
            .inverse_multi_level(&decomp, BackendPolicy::Auto)
            .expect("inverse transform");

        let max_err = image
            .iter()
            .zip(restored.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);

        let stats = engine.statistics();
        println!("{name}: {levels} levels on {w}x{h}, max reconstruction error {max_err:.6}");
        println!(
            "  ops: {} total ({} cpu, {} gpu), {:.2?} wall, pool hit rate {:.0}%",
            stats.total_ops,
            stats.cpu_ops,
            stats.gpu_ops,
            stats.total_time,
            stats.pool.hit_rate() * 100.0
        );
    }
}
