// gpu/dwt.rs — GPU execution of the wavelet transforms.
//
// Every operation is the same shape:
//   1. Acquire three storage buffers from the pool (src, dst, scratch).
//   2. Upload the input with queue.write_buffer.
//   3. Encode one compute pass per orientation (rows, then columns for a
//      2D forward; columns, then rows for a 2D inverse), ping-ponging the
//      src/dst buffers between passes.
//   4. Copy the final buffer into a fresh MAP_READ staging buffer, submit,
//      and block on device.poll until the map callback fires.
//   5. Give the pooled buffers back and hand the result to the caller.
//
// The pooled buffers go back to the pool on the success path; on an error
// path they are dropped, which releases the GPU allocation outright. Either
// way no buffer leaks across an exit.
//
// Numerics match the CPU reference in src/lifting.rs: the 5/3 kernels are
// bit-exact on integer-valued input, the 9/7 kernels agree to f32 rounding.

use std::mem::size_of;

use wgpu::util::DeviceExt;

use crate::error::{Error, Result};
use crate::gpu::device::GpuContext;
use crate::gpu::kernels::{Direction, KernelFilter, KernelLibrary, Orientation};
use crate::gpu::pool::BufferPool;
use crate::lifting::low_len;

/// Uniform block shared by all kernels. Must match `Params` in dwt.wgsl.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DwtParams {
    width: u32,
    height: u32,
    _pad0: u32,
    _pad1: u32,
}

/// GPU transform executor. Owns the compiled kernel library; borrows the
/// device context and buffer pool per call.
pub struct GpuDwt {
    kernels: KernelLibrary,
}

impl GpuDwt {
    pub fn new(ctx: &GpuContext) -> Result<Self> {
        Ok(GpuDwt { kernels: KernelLibrary::new(&ctx.device)? })
    }

    /// Forward 1D: a single-line dispatch. Returns (low, high).
    pub fn forward_1d(
        &self,
        ctx: &GpuContext,
        pool: &mut BufferPool,
        filter: KernelFilter,
        signal: &[f32],
    ) -> Result<(Vec<f32>, Vec<f32>)> {
        let n = signal.len();
        let packed = self.run(
            ctx,
            pool,
            filter,
            Direction::Forward,
            &[Orientation::Horizontal],
            signal,
            n as u32,
            1,
        )?;
        let ne = low_len(n);
        Ok((packed[..ne].to_vec(), packed[ne..].to_vec()))
    }

    /// Inverse 1D from (low, high) bands.
    pub fn inverse_1d(
        &self,
        ctx: &GpuContext,
        pool: &mut BufferPool,
        filter: KernelFilter,
        low: &[f32],
        high: &[f32],
    ) -> Result<Vec<f32>> {
        let mut packed = Vec::with_capacity(low.len() + high.len());
        packed.extend_from_slice(low);
        packed.extend_from_slice(high);
        let n = packed.len() as u32;
        self.run(
            ctx,
            pool,
            filter,
            Direction::Inverse,
            &[Orientation::Horizontal],
            &packed,
            n,
            1,
        )
    }

    /// Forward 2D into the packed quadrant layout.
    pub fn forward_2d_packed(
        &self,
        ctx: &GpuContext,
        pool: &mut BufferPool,
        filter: KernelFilter,
        samples: &[f32],
        width: usize,
        height: usize,
    ) -> Result<Vec<f32>> {
        self.run(
            ctx,
            pool,
            filter,
            Direction::Forward,
            &[Orientation::Horizontal, Orientation::Vertical],
            samples,
            width as u32,
            height as u32,
        )
    }

    /// Inverse 2D from the packed quadrant layout.
    pub fn inverse_2d_packed(
        &self,
        ctx: &GpuContext,
        pool: &mut BufferPool,
        filter: KernelFilter,
        packed: &[f32],
        width: usize,
        height: usize,
    ) -> Result<Vec<f32>> {
        self.run(
            ctx,
            pool,
            filter,
            Direction::Inverse,
            &[Orientation::Vertical, Orientation::Horizontal],
            packed,
            width as u32,
            height as u32,
        )
    }

    /// Encode, submit and read back one multi-pass transform.
    #[allow(clippy::too_many_arguments)]
    fn run(
        &self,
        ctx: &GpuContext,
        pool: &mut BufferPool,
        filter: KernelFilter,
        direction: Direction,
        passes: &[Orientation],
        input: &[f32],
        width: u32,
        height: u32,
    ) -> Result<Vec<f32>> {
        let byte_len = (input.len() * size_of::<f32>()) as u64;
        let device = &ctx.device;

        let buf_a = pool.acquire(device, byte_len);
        let buf_b = pool.acquire(device, byte_len);
        let scratch = pool.acquire(device, byte_len);

        ctx.queue.write_buffer(buf_a.buffer(), 0, bytemuck::cast_slice(input));

        let params = DwtParams { width, height, _pad0: 0, _pad1: 0 };
        let params_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("dwt params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("dwt readback"),
            size: byte_len,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("dwt dispatch"),
        });

        // Ping-pong between buf_a and buf_b; `src_is_a` tracks which holds
        // the current input.
        let mut src_is_a = true;
        for &orientation in passes {
            let pipeline = self
                .kernels
                .resolve(filter, direction, orientation)
                .ok_or_else(|| Error::internal(format!(
                    "no kernel for {filter:?}/{direction:?}/{orientation:?}"
                )))?;

            let (src, dst) = if src_is_a { (&buf_a, &buf_b) } else { (&buf_b, &buf_a) };
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("dwt BG"),
                layout: self.kernels.bind_group_layout(),
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: src.buffer().as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 1, resource: dst.buffer().as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 2, resource: scratch.buffer().as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 3, resource: params_buf.as_entire_binding() },
                ],
            });

            let lines = match orientation {
                Orientation::Horizontal => height,
                Orientation::Vertical => width,
            };
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("dwt pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(KernelLibrary::dispatch_lines(lines), 1, 1);
            }
            src_is_a = !src_is_a;
        }

        // After the final swap the result sits in the buffer `src_is_a`
        // points at.
        let result_buf = if src_is_a { &buf_a } else { &buf_b };
        encoder.copy_buffer_to_buffer(result_buf.buffer(), 0, &staging, 0, byte_len);
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        ctx.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| Error::internal("readback callback never fired"))?
            .map_err(|e| Error::internal(format!("readback map failed: {e}")))?;

        let mapped = slice.get_mapped_range();
        let out: Vec<f32> = bytemuck::cast_slice(&mapped).to_vec();
        drop(mapped);
        staging.unmap();

        pool.give_back(buf_a);
        pool.give_back(buf_b);
        pool.give_back(scratch);
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests — CPU/GPU parity (subprocess-isolated)
// ---------------------------------------------------------------------------
