// engine.rs — the dual-backend wavelet transform engine.
//
// Every public entry point follows the same sequence:
//
//   1. Validate caller parameters (before any device or buffer work).
//   2. Ask the backend selector for an execution path. `ForceCpu` skips
//      device initialization entirely; the other policies trigger the
//      device manager's idempotent first-use initialization.
//   3. Run the CPU reference path or the GPU path. A filter without a GPU
//      kernel (Arbitrary / Lifting) runs on the CPU even when the GPU was
//      selected, and is counted as a CPU operation.
//   4. Record statistics for the path that actually executed.
//
// Device absence (`UnsupportedFeature` from the device manager) is
// absorbed here: the selector simply sees "unavailable" and picks the
// CPU. A device/queue/kernel creation failure is not absorbed — it
// propagates as `InternalError` and will do so again on every later
// GPU-selecting call, until the caller switches to `ForceCpu`.

use std::time::{Duration, Instant};

use crate::backend::{self, Backend, BackendPolicy};
use crate::decompose::{self, Decomposition, TileSubbands};
use crate::error::{Error, Result};
use crate::filter::FilterKernel;
use crate::gpu::device::{DeviceManager, PowerPreference};
use crate::gpu::dwt::GpuDwt;
use crate::gpu::kernels::KernelFilter;
use crate::gpu::pool::{BufferPool, PoolConfig, PoolStats};
use crate::lifting::{self, low_len};
use crate::transform2d::{self, Subbands};

/// Engine configuration. All fields have working defaults.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub filter: FilterKernel,
    /// Default decomposition depth for callers that use it; individual
    /// `forward_multi_level` calls pass their own (clamped) count.
    pub levels: usize,
    /// Tile grid cell size for `forward_tiled`; 0 = one whole-image tile.
    pub tile_width: usize,
    pub tile_height: usize,
    /// `Auto` policy: minimum 1D sample count worth a GPU dispatch.
    pub gpu_threshold_1d: usize,
    /// `Auto` policy: minimum 2D pixel count worth a GPU dispatch.
    pub gpu_threshold_2d: usize,
    pub power_preference: PowerPreference,
    /// Soft GPU memory budget in bytes; 0 = unlimited.
    pub memory_budget: u64,
    pub pool: PoolConfig,
}

impl Default for TransformConfig {
    fn default() -> Self {
        TransformConfig {
            filter: FilterKernel::Reversible53,
            levels: 3,
            tile_width: 0,
            tile_height: 0,
            gpu_threshold_1d: 4096,
            gpu_threshold_2d: 128 * 128,
            power_preference: PowerPreference::default(),
            memory_budget: 0,
            pool: PoolConfig::default(),
        }
    }
}

/// Counters and timers, monotone until `reset_statistics`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineStats {
    pub total_ops: u64,
    pub cpu_ops: u64,
    pub gpu_ops: u64,
    /// Wall-clock time spent inside entry points, both backends.
    pub total_time: Duration,
    pub pool: PoolStats,
}

/// The transform engine. Owns its device manager, buffer pool and
/// compiled kernels; `&mut self` on every operation keeps mutation
/// single-writer.
pub struct WaveletEngine {
    config: TransformConfig,
    devices: DeviceManager,
    pool: BufferPool,
    gpu: Option<GpuDwt>,
    total_ops: u64,
    cpu_ops: u64,
    gpu_ops: u64,
    total_time: Duration,
}

impl WaveletEngine {
    /// Construction is cheap; the device is opened on first GPU-eligible
    /// call.
    pub fn new(config: TransformConfig) -> Self {
        let devices = DeviceManager::new(config.power_preference, config.memory_budget);
        let pool = BufferPool::new(config.pool);
        WaveletEngine {
            config,
            devices,
            pool,
            gpu: None,
            total_ops: 0,
            cpu_ops: 0,
            gpu_ops: 0,
            total_time: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    pub fn device_manager(&self) -> &DeviceManager {
        &self.devices
    }

    /// Deepest decomposition the engine will run for these dimensions.
    pub fn max_decomposition_levels(width: usize, height: usize) -> usize {
        decompose::max_levels(width, height)
    }

    pub fn statistics(&self) -> EngineStats {
        EngineStats {
            total_ops: self.total_ops,
            cpu_ops: self.cpu_ops,
            gpu_ops: self.gpu_ops,
            total_time: self.total_time,
            pool: self.pool.stats(),
        }
    }

    pub fn reset_statistics(&mut self) {
        self.total_ops = 0;
        self.cpu_ops = 0;
        self.gpu_ops = 0;
        self.total_time = Duration::ZERO;
        self.pool.reset_stats();
    }

    /// Release all pooled GPU buffers (lifetime statistics survive).
    pub fn drain_pool(&mut self) {
        self.pool.drain();
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Forward 1D transform of `signal` into (low, high) bands.
    pub fn forward_1d(
        &mut self,
        signal: &[f32],
        policy: BackendPolicy,
    ) -> Result<(Vec<f32>, Vec<f32>)> {
        if signal.len() < 2 {
            return Err(Error::invalid(format!("signal length {} < 2", signal.len())));
        }

        let backend = self.choose(policy, signal.len(), self.config.gpu_threshold_1d)?;
        let started = Instant::now();
        let (backend, result) = match (backend, self.kernel_filter(backend)) {
            (Backend::Gpu, Some(kf)) => {
                let (ctx, gpu, pool) = self.gpu_parts();
                (Backend::Gpu, gpu.forward_1d(ctx, pool, kf, signal))
            }
            (_, _) => (Backend::Cpu, lifting::forward(&self.config.filter, signal)),
        };
        self.record(backend, started);
        result
    }

    /// Inverse 1D transform of (low, high) bands back into a signal.
    pub fn inverse_1d(
        &mut self,
        low: &[f32],
        high: &[f32],
        policy: BackendPolicy,
    ) -> Result<Vec<f32>> {
        let (ne, no) = (low.len(), high.len());
        if no == 0 || (ne != no && ne != no + 1) {
            return Err(Error::invalid(format!(
                "band lengths ({ne}, {no}) do not form a valid split"
            )));
        }

        let backend = self.choose(policy, ne + no, self.config.gpu_threshold_1d)?;
        let started = Instant::now();
        let (backend, result) = match (backend, self.kernel_filter(backend)) {
            (Backend::Gpu, Some(kf)) => {
                let (ctx, gpu, pool) = self.gpu_parts();
                (Backend::Gpu, gpu.inverse_1d(ctx, pool, kf, low, high))
            }
            (_, _) => (Backend::Cpu, lifting::inverse(&self.config.filter, low, high)),
        };
        self.record(backend, started);
        result
    }

    /// Forward 2D transform of a `width`×`height` image.
    pub fn forward_2d(
        &mut self,
        samples: &[f32],
        width: usize,
        height: usize,
        policy: BackendPolicy,
    ) -> Result<Subbands> {
        transform2d::validate_dims(samples, width, height)?;

        let backend = self.choose(policy, width * height, self.config.gpu_threshold_2d)?;
        let started = Instant::now();
        let (backend, result) = match (backend, self.kernel_filter(backend)) {
            (Backend::Gpu, Some(kf)) => {
                let (ctx, gpu, pool) = self.gpu_parts();
                let r = gpu
                    .forward_2d_packed(ctx, pool, kf, samples, width, height)
                    .map(|packed| transform2d::split_quadrants(&packed, width, height));
                (Backend::Gpu, r)
            }
            (_, _) => (
                Backend::Cpu,
                transform2d::forward(&self.config.filter, samples, width, height),
            ),
        };
        self.record(backend, started);
        result
    }

    /// Inverse 2D transform of one level's subbands.
    pub fn inverse_2d(&mut self, bands: &Subbands, policy: BackendPolicy) -> Result<Vec<f32>> {
        validate_subbands(bands)?;

        let backend = self.choose(policy, bands.width * bands.height, self.config.gpu_threshold_2d)?;
        let started = Instant::now();
        let (backend, result) = match (backend, self.kernel_filter(backend)) {
            (Backend::Gpu, Some(kf)) => {
                let (ctx, gpu, pool) = self.gpu_parts();
                let packed = bands.reassemble();
                let r = gpu.inverse_2d_packed(ctx, pool, kf, &packed, bands.width, bands.height);
                (Backend::Gpu, r)
            }
            (_, _) => (Backend::Cpu, transform2d::inverse(&self.config.filter, bands)),
        };
        self.record(backend, started);
        result
    }

    /// Multi-level decomposition. The level count is clamped to
    /// `max_decomposition_levels(width, height)`.
    pub fn forward_multi_level(
        &mut self,
        samples: &[f32],
        width: usize,
        height: usize,
        levels: usize,
        policy: BackendPolicy,
    ) -> Result<Decomposition> {
        transform2d::validate_dims(samples, width, height)?;
        if levels.min(decompose::max_levels(width, height)) == 0 {
            return Err(Error::invalid(format!(
                "cannot decompose {width}x{height} (requested {levels} levels)"
            )));
        }

        let backend = self.choose(policy, width * height, self.config.gpu_threshold_2d)?;
        let started = Instant::now();
        let filter = self.config.filter.clone();
        let (backend, result) = match (backend, self.kernel_filter(backend)) {
            (Backend::Gpu, Some(kf)) => {
                let (ctx, gpu, pool) = self.gpu_parts();
                let r = decompose::forward_multi(samples, width, height, levels, |s, w, h| {
                    let packed = gpu.forward_2d_packed(ctx, pool, kf, s, w, h)?;
                    Ok(transform2d::split_quadrants(&packed, w, h))
                });
                (Backend::Gpu, r)
            }
            (_, _) => (
                Backend::Cpu,
                decompose::forward_multi(samples, width, height, levels, |s, w, h| {
                    transform2d::forward(&filter, s, w, h)
                }),
            ),
        };
        self.record(backend, started);
        result
    }

    /// Multi-level reconstruction: the exact inverse of
    /// `forward_multi_level` on the same decomposition.
    pub fn inverse_multi_level(
        &mut self,
        decomp: &Decomposition,
        policy: BackendPolicy,
    ) -> Result<Vec<f32>> {
        let finest = decomp
            .levels
            .first()
            .ok_or_else(|| Error::invalid("decomposition has no levels"))?;
        let coarsest = decomp.levels.last().expect("non-empty");
        if decomp.approx.len() != coarsest.ll_width * coarsest.ll_height {
            return Err(Error::invalid(format!(
                "approximation length {} does not match coarsest LL {}x{}",
                decomp.approx.len(),
                coarsest.ll_width,
                coarsest.ll_height
            )));
        }

        let backend = self.choose(policy, finest.width * finest.height, self.config.gpu_threshold_2d)?;
        let started = Instant::now();
        let filter = self.config.filter.clone();
        let (backend, result) = match (backend, self.kernel_filter(backend)) {
            (Backend::Gpu, Some(kf)) => {
                let (ctx, gpu, pool) = self.gpu_parts();
                let r = decompose::inverse_multi(decomp, |bands| {
                    let packed = bands.reassemble();
                    gpu.inverse_2d_packed(ctx, pool, kf, &packed, bands.width, bands.height)
                });
                (Backend::Gpu, r)
            }
            (_, _) => (
                Backend::Cpu,
                decompose::inverse_multi(decomp, |bands| transform2d::inverse(&filter, bands)),
            ),
        };
        self.record(backend, started);
        result
    }

    /// Tile-partitioned forward transform using the configured tile size.
    /// Returns one `TileSubbands` per tile of at least 2×2 samples.
    pub fn forward_tiled(
        &mut self,
        samples: &[f32],
        width: usize,
        height: usize,
        policy: BackendPolicy,
    ) -> Result<Vec<TileSubbands>> {
        transform2d::validate_dims(samples, width, height)?;

        let backend = self.choose(policy, width * height, self.config.gpu_threshold_2d)?;
        let started = Instant::now();
        let filter = self.config.filter.clone();
        let (tw, th) = (self.config.tile_width, self.config.tile_height);
        let (backend, result) = match (backend, self.kernel_filter(backend)) {
            (Backend::Gpu, Some(kf)) => {
                let (ctx, gpu, pool) = self.gpu_parts();
                let r = decompose::forward_tiled(samples, width, height, tw, th, |s, w, h| {
                    let packed = gpu.forward_2d_packed(ctx, pool, kf, s, w, h)?;
                    Ok(transform2d::split_quadrants(&packed, w, h))
                });
                (Backend::Gpu, r)
            }
            (_, _) => (
                Backend::Cpu,
                decompose::forward_tiled(samples, width, height, tw, th, |s, w, h| {
                    transform2d::forward(&filter, s, w, h)
                }),
            ),
        };
        self.record(backend, started);
        result
    }

    // -----------------------------------------------------------------------
    // Dispatch internals
    // -----------------------------------------------------------------------

    /// Select a backend, initializing the device on first use. Device
    /// absence degrades to CPU; kernel or device creation failure
    /// propagates.
    fn choose(&mut self, policy: BackendPolicy, workload: usize, threshold: usize) -> Result<Backend> {
        let available = match policy {
            BackendPolicy::ForceCpu => false,
            BackendPolicy::ForceGpu | BackendPolicy::Auto => self.ensure_gpu()?,
        };
        Ok(backend::select(policy, available, workload, threshold))
    }

    /// Initialize the device and compile kernels once. Returns whether a
    /// usable GPU path exists.
    fn ensure_gpu(&mut self) -> Result<bool> {
        if self.gpu.is_some() {
            return Ok(true);
        }
        match self.devices.initialize() {
            Ok(()) => {
                let ctx = self.devices.context().expect("initialized");
                self.gpu = Some(GpuDwt::new(ctx)?);
                Ok(true)
            }
            Err(Error::UnsupportedFeature(msg)) => {
                log::debug!("no compute device ({msg}); CPU path only");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// The configured filter's GPU kernel, or None when the selected
    /// backend is CPU or the filter has no kernel.
    fn kernel_filter(&self, backend: Backend) -> Option<KernelFilter> {
        if backend != Backend::Gpu {
            return None;
        }
        let kf = KernelFilter::from_filter(&self.config.filter);
        if kf.is_none() {
            log::debug!(
                "filter {} has no GPU kernel; using CPU path",
                self.config.filter.name()
            );
        }
        kf
    }

    /// Disjoint borrows of the GPU pieces. Only valid after `ensure_gpu`
    /// returned true.
    fn gpu_parts(&mut self) -> (&crate::gpu::device::GpuContext, &GpuDwt, &mut BufferPool) {
        (
            self.devices.context().expect("device initialized"),
            self.gpu.as_ref().expect("kernels compiled"),
            &mut self.pool,
        )
    }

    fn record(&mut self, backend: Backend, started: Instant) {
        self.total_ops += 1;
        match backend {
            Backend::Cpu => self.cpu_ops += 1,
            Backend::Gpu => self.gpu_ops += 1,
        }
        self.total_time += started.elapsed();
    }
}

/// Shape consistency of a `Subbands` value handed back to the engine.
fn validate_subbands(bands: &Subbands) -> Result<()> {
    let (w, h) = (bands.width, bands.height);
    if w < 2 || h < 2 {
        return Err(Error::invalid(format!(
            "subband source dimensions {w}x{h}: both must be >= 2"
        )));
    }
    let (lw, lh) = (bands.ll_width, bands.ll_height);
    if lw != low_len(w) || lh != low_len(h) {
        return Err(Error::invalid(format!(
            "LL dimensions {lw}x{lh} inconsistent with source {w}x{h}"
        )));
    }
    let (hw, hh) = (w - lw, h - lh);
    if bands.ll.len() != lw * lh
        || bands.lh.len() != lw * hh
        || bands.hl.len() != hw * lh
        || bands.hh.len() != hw * hh
    {
        return Err(Error::invalid("subband array lengths inconsistent with dimensions"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
