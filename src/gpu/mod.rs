// gpu/mod.rs — wgpu-backed execution layer.
//
// Four pieces, composed by the engine:
//
//   device  — adapter selection, capability tier, soft memory budget
//   pool    — size-bucketed reuse of storage buffers across dispatches
//   kernels — the compiled WGSL pipelines, one per
//             (filter, direction, orientation)
//   dwt     — upload / dispatch / readback for each transform shape
//
// The CPU modules in the parent crate are the authoritative reference;
// every kernel here is validated against them, bit-exactly for the 5/3
// filter and within f32 rounding for the 9/7.

pub mod device;
pub mod dwt;
pub mod kernels;
pub mod pool;
