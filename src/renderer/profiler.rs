// renderer/profiler.rs
//! GPU timestamp scopes around render passes.
//!
//! Each scope owns two query slots (begin and end of pass). Timestamps
//! written in frame N are resolved at the end of that frame, mapped after
//! submit, and read back on a later frame without ever waiting on the GPU.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

const MAX_SCOPES: u32 = 16;
const TIMESTAMP_SIZE: u64 = std::mem::size_of::<u64>() as u64;

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeTiming {
    pub name: String,
    pub duration_ms: f32,
}

pub struct GpuProfiler {
    query_set: wgpu::QuerySet,
    resolve_buffer: wgpu::Buffer,
    readback_buffer: wgpu::Buffer,
    readback_ready: Arc<AtomicBool>,
    readback_pending: bool,
    period_ns: f32,
    /// Scope names recorded this frame, in query order.
    scopes: Vec<String>,
    /// Names of the scopes whose timestamps sit in the readback buffer.
    in_flight: Vec<String>,
    last_timings: Vec<ScopeTiming>,
}

impl GpuProfiler {
    pub fn feature_available(features: wgpu::Features) -> bool {
        features.contains(wgpu::Features::TIMESTAMP_QUERY)
    }

    /// Returns `None` when the device was created without timestamp queries.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Option<Self> {
        if !Self::feature_available(device.features()) {
            log::info!("TIMESTAMP_QUERY not available, GPU profiling disabled");
            return None;
        }

        let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some("GpuProfiler QuerySet"),
            ty: wgpu::QueryType::Timestamp,
            count: MAX_SCOPES * 2,
        });
        let size = MAX_SCOPES as u64 * 2 * TIMESTAMP_SIZE;
        let resolve_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("GpuProfiler Resolve Buffer"),
            size,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("GpuProfiler Readback Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let period_ns = queue.get_timestamp_period();
        log::info!("GPU profiler enabled, timestamp period {:.3} ns", period_ns);

        Some(Self {
            query_set,
            resolve_buffer,
            readback_buffer,
            readback_ready: Arc::new(AtomicBool::new(false)),
            readback_pending: false,
            period_ns,
            scopes: Vec::new(),
            in_flight: Vec::new(),
            last_timings: Vec::new(),
        })
    }

    /// Allocates a scope for one render pass. `None` once all slots are used.
    pub fn create_scope_gpu(&mut self, name: &str) -> Option<wgpu::RenderPassTimestampWrites<'_>> {
        let index = self.scopes.len() as u32;
        if index >= MAX_SCOPES {
            log::warn!("GPU profiler out of scopes, '{}' not timed", name);
            return None;
        }
        self.scopes.push(name.to_string());
        let (begin, end) = query_indices(index);

        Some(wgpu::RenderPassTimestampWrites {
            query_set: &self.query_set,
            beginning_of_pass_write_index: Some(begin),
            end_of_pass_write_index: Some(end),
        })
    }

    /// Resolves this frame's scopes into the readback buffer.
    ///
    /// Skipped while the previous readback is still mapped or pending.
    pub fn end_frame(&mut self, encoder: &mut wgpu::CommandEncoder) {
        if self.scopes.is_empty() {
            return;
        }
        if self.readback_pending {
            self.scopes.clear();
            return;
        }

        let count = self.scopes.len() as u32 * 2;
        encoder.resolve_query_set(&self.query_set, 0..count, &self.resolve_buffer, 0);
        encoder.copy_buffer_to_buffer(
            &self.resolve_buffer,
            0,
            &self.readback_buffer,
            0,
            count as u64 * TIMESTAMP_SIZE,
        );
        self.in_flight = std::mem::take(&mut self.scopes);
    }

    /// Requests the mapping of the readback buffer. Call after `queue.submit`.
    pub fn after_submit(&mut self) {
        if self.readback_pending || self.in_flight.is_empty() {
            return;
        }

        let flag = self.readback_ready.clone();
        flag.store(false, Ordering::SeqCst);
        self.readback_buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |res| {
                if let Err(e) = res {
                    log::error!("GPU profiler map_async failed: {:?}", e);
                }
                flag.store(true, Ordering::SeqCst);
            });
        self.readback_pending = true;
    }

    /// Reads back a finished mapping, if any. Never blocks.
    pub fn try_read_previous_frame(&mut self) -> bool {
        if !self.readback_pending || !self.readback_ready.load(Ordering::SeqCst) {
            return false;
        }

        let bytes = self.in_flight.len() as u64 * 2 * TIMESTAMP_SIZE;
        let timestamps: Vec<u64> = {
            let data = self.readback_buffer.slice(..bytes).get_mapped_range();
            bytemuck::pod_collect_to_vec(&data[..])
        };
        self.readback_buffer.unmap();
        self.readback_pending = false;

        self.last_timings = scope_timings(&self.in_flight, &timestamps, self.period_ns);
        true
    }

    pub fn last_timings(&self) -> &[ScopeTiming] {
        &self.last_timings
    }
}

fn query_indices(scope: u32) -> (u32, u32) {
    (scope * 2, scope * 2 + 1)
}

/// Converts begin/end timestamp pairs into per-scope milliseconds.
/// Pairs where the end precedes the begin are dropped.
fn scope_timings(names: &[String], timestamps: &[u64], period_ns: f32) -> Vec<ScopeTiming> {
    names
        .iter()
        .zip(timestamps.chunks_exact(2))
        .filter(|(_, pair)| pair[1] >= pair[0])
        .map(|(name, pair)| ScopeTiming {
            name: name.clone(),
            duration_ms: (pair[1] - pair[0]) as f32 * period_ns / 1_000_000.0,
        })
        .collect()
}
