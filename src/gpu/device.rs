// gpu/device.rs — compute device discovery and selection.
//
// Responsibilities:
//   - Enumerate adapters and select one according to the configured power
//     preference (a discrete card for throughput, an integrated GPU for
//     battery-bound hosts).
//   - Classify the selected adapter into a capability tier that callers
//     can use for coarse workload decisions.
//   - Track a soft memory budget: advisory bookkeeping only, never a hard
//     allocation gate (a budget of 0 means unlimited).
//
// ADAPTER SELECTION:
// wgpu's default `request_adapter` heuristics may hand back a software
// rasterizer when it is the first enumerated Vulkan device. We enumerate
// explicitly and rank adapters ourselves: real hardware first in the
// order the power preference asks for, virtual/other adapters next, and
// a software device only as the last resort.
//
// INITIALIZATION:
// `initialize()` is idempotent. The first call does the full enumeration
// and device request; every later call returns the cached outcome,
// including a cached failure. "No adapter at all" is `UnsupportedFeature`
// (the backend selector degrades to CPU); a failed device/queue request
// on existing hardware is `InternalError` and is not retried.

use std::fmt;

use crate::error::{Error, Result};

/// Adapter-selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerPreference {
    /// Prefer the fastest adapter (discrete before integrated).
    #[default]
    HighPerformance,
    /// Prefer the most efficient adapter (integrated before discrete).
    LowPower,
}

/// Coarse performance class of the selected adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapabilityTier {
    /// Not initialized, or a software/unrecognised adapter.
    #[default]
    Unknown,
    /// Integrated GPU with conventional split memory.
    IntegratedLow,
    /// Discrete GPU with dedicated memory.
    DiscreteMid,
    /// Integrated GPU on a unified-memory backend (Metal): no transfer
    /// penalty between host and device.
    UnifiedHigh,
}

impl fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CapabilityTier::Unknown => "unknown",
            CapabilityTier::IntegratedLow => "integrated-low",
            CapabilityTier::DiscreteMid => "discrete-mid",
            CapabilityTier::UnifiedHigh => "unified-high",
        };
        f.write_str(s)
    }
}

/// The live GPU context: device, queue and adapter facts.
///
/// # Field drop order
/// `_instance` is declared last so the `wgpu::Instance` outlives the
/// device and queue handles that reference it.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub tier: CapabilityTier,
    pub adapter_name: String,
    _instance: wgpu::Instance,
}

/// Owns device selection state and the soft memory budget.
pub struct DeviceManager {
    power_preference: PowerPreference,
    /// Soft ceiling in bytes; 0 = unlimited.
    budget_bytes: u64,
    used_bytes: u64,
    attempted: bool,
    context: Option<GpuContext>,
    init_error: Option<Error>,
}

impl DeviceManager {
    /// Construction is cheap; no GPU work happens until `initialize()`.
    pub fn new(power_preference: PowerPreference, budget_bytes: u64) -> Self {
        DeviceManager {
            power_preference,
            budget_bytes,
            used_bytes: 0,
            attempted: false,
            context: None,
            init_error: None,
        }
    }

    /// Select and open a device. Idempotent: subsequent calls return the
    /// first call's outcome without touching the GPU again.
    pub fn initialize(&mut self) -> Result<()> {
        if self.attempted {
            return match &self.init_error {
                None => Ok(()),
                Some(e) => Err(e.clone()),
            };
        }
        self.attempted = true;

        match pollster::block_on(init_context(self.power_preference)) {
            Ok(ctx) => {
                log::info!("compute device: {} (tier {})", ctx.adapter_name, ctx.tier);
                self.context = Some(ctx);
                Ok(())
            }
            Err(e) => {
                log::warn!("device initialization failed: {e}");
                self.init_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// The live context, if `initialize()` has succeeded.
    pub fn context(&self) -> Option<&GpuContext> {
        self.context.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.context.is_some()
    }

    /// Capability tier; `Unknown` before initialization.
    pub fn tier(&self) -> CapabilityTier {
        self.context.as_ref().map(|c| c.tier).unwrap_or_default()
    }

    /// Adapter name; empty before initialization.
    pub fn adapter_name(&self) -> &str {
        self.context.as_ref().map(|c| c.adapter_name.as_str()).unwrap_or("")
    }

    // --- Soft memory budget -------------------------------------------------

    /// Whether `bytes` more would stay within the budget. Advisory only.
    pub fn can_allocate(&self, bytes: u64) -> bool {
        self.budget_bytes == 0 || self.used_bytes.saturating_add(bytes) <= self.budget_bytes
    }

    pub fn track_allocation(&mut self, bytes: u64) {
        self.used_bytes = self.used_bytes.saturating_add(bytes);
    }

    pub fn track_deallocation(&mut self, bytes: u64) {
        self.used_bytes = self.used_bytes.saturating_sub(bytes);
    }

    /// Bytes currently tracked against the budget; 0 before any tracking.
    pub fn budget_used(&self) -> u64 {
        self.used_bytes
    }
}

// ---------------------------------------------------------------------------
// Selection internals
// ---------------------------------------------------------------------------

async fn init_context(pref: PowerPreference) -> Result<GpuContext> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let mut adapters = instance.enumerate_adapters(wgpu::Backends::PRIMARY);
    if adapters.is_empty() {
        return Err(Error::unsupported("no compute adapter present"));
    }

    for a in &adapters {
        let info = a.get_info();
        log::debug!("adapter: {} ({:?}, {:?})", info.name, info.backend, info.device_type);
    }

    // Stable sort by rank keeps enumeration order within a rank class,
    // which tends to put the primary adapter first.
    adapters.sort_by_key(|a| adapter_rank(pref, a.get_info().device_type));
    let adapter = adapters.into_iter().next().unwrap();

    let info = adapter.get_info();
    let tier = classify_tier(info.device_type, info.backend);

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("liftwave"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        )
        .await
        .map_err(|e| Error::internal(format!("device request failed: {e}")))?;

    Ok(GpuContext {
        device,
        queue,
        tier,
        adapter_name: info.name,
        _instance: instance,
    })
}

/// Lower rank = preferred. Software adapters are always last.
fn adapter_rank(pref: PowerPreference, ty: wgpu::DeviceType) -> u8 {
    use wgpu::DeviceType::*;
    match (pref, ty) {
        (PowerPreference::HighPerformance, DiscreteGpu) => 0,
        (PowerPreference::HighPerformance, IntegratedGpu) => 1,
        (PowerPreference::LowPower, IntegratedGpu) => 0,
        (PowerPreference::LowPower, DiscreteGpu) => 1,
        (_, VirtualGpu) | (_, Other) => 2,
        (_, Cpu) => 3,
    }
}

fn classify_tier(ty: wgpu::DeviceType, backend: wgpu::Backend) -> CapabilityTier {
    use wgpu::DeviceType::*;
    match ty {
        DiscreteGpu => CapabilityTier::DiscreteMid,
        IntegratedGpu if backend == wgpu::Backend::Metal => CapabilityTier::UnifiedHigh,
        IntegratedGpu => CapabilityTier::IntegratedLow,
        _ => CapabilityTier::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
