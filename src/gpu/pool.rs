// gpu/pool.rs — size-bucketed pool of GPU scratch buffers.
//
// Transform dispatches need short-lived storage buffers whose sizes
// cluster around a handful of values (rows × columns of the current tile
// or level). Creating and destroying `wgpu::Buffer`s per dispatch churns
// the allocator, so returned buffers are kept on per-size free lists.
//
// Bucketing: a requested size is rounded up to the next power of two at
// or above `MIN_BUCKET_BYTES`, so requests of 300 KB and 400 KB share the
// 512 KB bucket. Reuse is LIFO: the most recently returned buffer is the
// most likely to still be resident in caches and is handed out first.
//
// Ceilings: the pool never holds more than `max_buffers` buffers or
// `max_bytes` pooled bytes. A return that would exceed either is dropped
// on the floor (the buffer is released, not queued); that is the only
// backpressure.
//
// Ownership: a `PooledBuffer` is exclusively the caller's between
// `acquire` and `give_back`. Dropping one without giving it back simply
// releases the underlying GPU memory, so early returns (`?`) on failure
// paths cannot leak.

use std::collections::HashMap;

/// Smallest bucket. Requests below this all share one bucket.
pub const MIN_BUCKET_BYTES: u64 = 1024;

/// Pool behaviour knobs.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Disabled pooling: every acquire allocates, every return releases.
    pub enabled: bool,
    /// Ceiling on the number of pooled (idle) buffers.
    pub max_buffers: usize,
    /// Ceiling on the total bytes held by pooled buffers.
    pub max_bytes: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            enabled: true,
            max_buffers: 32,
            max_bytes: 256 << 20,
        }
    }
}

/// Lifetime counters. Survive `drain()`; cleared only by `reset_stats()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Acquires served from a free list.
    pub hits: u64,
    /// Acquires that allocated a fresh buffer.
    pub misses: u64,
    /// Every acquire, hit or miss.
    pub total_allocations: u64,
    /// Returns dropped because a ceiling was reached or pooling is off.
    pub dropped_returns: u64,
}

impl PoolStats {
    /// Fraction of acquires served from the pool; 0.0 before any acquire.
    pub fn hit_rate(&self) -> f64 {
        if self.total_allocations == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_allocations as f64
        }
    }
}

/// A buffer on loan from the pool. `size` is the bucket size, which may
/// exceed the requested size.
pub struct PooledBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

impl PooledBuffer {
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Bucket size in bytes (>= the requested size).
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// The pool itself. Single-writer: all mutation goes through `&mut self`.
pub struct BufferPool {
    config: PoolConfig,
    buckets: HashMap<u64, Vec<wgpu::Buffer>>,
    pooled_count: usize,
    pooled_bytes: u64,
    stats: PoolStats,
}

impl BufferPool {
    pub fn new(config: PoolConfig) -> Self {
        BufferPool {
            config,
            buckets: HashMap::new(),
            pooled_count: 0,
            pooled_bytes: 0,
            stats: PoolStats::default(),
        }
    }

    /// Round a request up to its bucket size.
    pub fn bucket_size(requested: u64) -> u64 {
        requested.max(MIN_BUCKET_BYTES).next_power_of_two()
    }

    /// Hand out a buffer of at least `size` bytes, reusing a pooled one
    /// when possible.
    pub fn acquire(&mut self, device: &wgpu::Device, size: u64) -> PooledBuffer {
        let bucket = Self::bucket_size(size);
        self.stats.total_allocations += 1;

        if self.config.enabled {
            if let Some(buffer) = self.buckets.get_mut(&bucket).and_then(Vec::pop) {
                self.pooled_count -= 1;
                self.pooled_bytes -= bucket;
                self.stats.hits += 1;
                return PooledBuffer { buffer, size: bucket };
            }
        }

        self.stats.misses += 1;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("liftwave pool"),
            size: bucket,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        PooledBuffer { buffer, size: bucket }
    }

    /// Return a buffer to its bucket, or drop it if pooling is disabled
    /// or a ceiling would be exceeded.
    pub fn give_back(&mut self, buf: PooledBuffer) {
        let over_count = self.pooled_count + 1 > self.config.max_buffers;
        let over_bytes = self.pooled_bytes + buf.size > self.config.max_bytes;
        if !self.config.enabled || over_count || over_bytes {
            self.stats.dropped_returns += 1;
            return; // buf drops here, releasing the GPU allocation
        }
        self.pooled_count += 1;
        self.pooled_bytes += buf.size;
        self.buckets.entry(buf.size).or_default().push(buf.buffer);
    }

    /// Release every pooled buffer. Size counters reset; lifetime
    /// statistics are untouched.
    pub fn drain(&mut self) {
        self.buckets.clear();
        self.pooled_count = 0;
        self.pooled_bytes = 0;
    }

    /// Number of idle buffers currently pooled.
    pub fn count(&self) -> usize {
        self.pooled_count
    }

    /// Bytes held by idle pooled buffers.
    pub fn pooled_bytes(&self) -> u64 {
        self.pooled_bytes
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = PoolStats::default();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
