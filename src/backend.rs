// backend.rs — execution-path selection.
//
// A pure decision, kept separate from the engine so it can be tested
// without a device. Small inputs stay on the CPU under `Auto` because the
// fixed cost of encoding, submitting and reading back a dispatch exceeds
// the transform itself until the workload is large enough; the crossover
// differs per operation kind, so thresholds are configured per kind.

/// The execution path chosen for one logical operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Cpu,
    Gpu,
}

/// How the caller wants the backend chosen.
///
/// Fallback is deliberately asymmetric: `ForceGpu` on a machine with no
/// compute device silently serves from the CPU (device absence is a
/// configuration fact, known before any work starts), but a dispatch
/// failure on a machine that advertises a GPU surfaces as
/// `InternalError` so the caller can decide whether to retry with
/// `ForceCpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendPolicy {
    /// Always use the CPU reference path.
    ForceCpu,
    /// Use the GPU when a device exists; CPU otherwise.
    ForceGpu,
    /// Use the GPU when a device exists and the workload meets the
    /// configured threshold for its operation kind.
    Auto,
}

/// Select the backend for a workload of `workload` elements.
pub fn select(
    policy: BackendPolicy,
    device_available: bool,
    workload: usize,
    threshold: usize,
) -> Backend {
    match policy {
        BackendPolicy::ForceCpu => Backend::Cpu,
        BackendPolicy::ForceGpu => {
            if device_available {
                Backend::Gpu
            } else {
                Backend::Cpu
            }
        }
        BackendPolicy::Auto => {
            if device_available && workload >= threshold {
                Backend::Gpu
            } else {
                Backend::Cpu
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_cpu_ignores_device() {
        assert_eq!(select(BackendPolicy::ForceCpu, true, 1 << 20, 0), Backend::Cpu);
        assert_eq!(select(BackendPolicy::ForceCpu, false, 1 << 20, 0), Backend::Cpu);
    }

    #[test]
    fn test_force_gpu_falls_back_without_device() {
        assert_eq!(select(BackendPolicy::ForceGpu, true, 1, usize::MAX), Backend::Gpu);
        assert_eq!(select(BackendPolicy::ForceGpu, false, 1, 0), Backend::Cpu);
    }

    #[test]
    fn test_auto_threshold() {
        assert_eq!(select(BackendPolicy::Auto, true, 4095, 4096), Backend::Cpu);
        assert_eq!(select(BackendPolicy::Auto, true, 4096, 4096), Backend::Gpu);
        assert_eq!(select(BackendPolicy::Auto, false, 1 << 24, 4096), Backend::Cpu);
    }
}
