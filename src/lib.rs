// liftwave — lifting-scheme discrete wavelet transform engine with
// numerically equivalent CPU and GPU (wgpu compute) execution paths.
//
// The CPU implementations in lifting.rs / transform2d.rs are the
// authoritative reference; every GPU kernel is validated against them.
// The engine picks a path per operation: forced by the caller, or sized
// against per-operation thresholds under the Auto policy.

pub mod backend;
pub mod decompose;
pub mod engine;
pub mod error;
pub mod filter;
pub mod lifting;
pub mod transform2d;

pub mod gpu;

pub use backend::{Backend, BackendPolicy};
pub use decompose::{max_levels as max_decomposition_levels, Decomposition, TileSubbands};
pub use engine::{EngineStats, TransformConfig, WaveletEngine};
pub use error::{Error, Result};
pub use filter::FilterKernel;
pub use gpu::device::{CapabilityTier, DeviceManager, PowerPreference};
pub use gpu::pool::{BufferPool, PoolConfig, PoolStats};
pub use transform2d::Subbands;
