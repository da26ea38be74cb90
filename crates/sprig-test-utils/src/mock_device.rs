//! Mock implementation of [`GraphicsDevice`] for testing.
//!
//! The mock records every call and keeps a snapshot of the bound state at
//! each draw, so tests can assert on which texture or pipeline a draw used
//! without a GPU.

use std::ops::Range;

use crate::gpu_types::{GpuBindGroup, GpuBuffer, GpuRenderPipeline};
use crate::graphics_device::GraphicsDevice;
use parking_lot::Mutex;
use wgpu::{BufferDescriptor, BufferUsages, IndexFormat};

/// Records a device call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateBuffer {
        buffer_id: usize,
        size: u64,
        usage: BufferUsages,
    },
    WriteBuffer {
        buffer_id: usize,
        offset: u64,
        size: usize,
    },
    DestroyBuffer {
        buffer_id: usize,
    },
    SetVertexBuffer {
        slot: u32,
        buffer_id: usize,
    },
    SetIndexBuffer {
        buffer_id: usize,
        format: IndexFormat,
    },
    SetPipeline {
        pipeline_id: usize,
    },
    SetBindGroup {
        index: u32,
        bind_group_id: usize,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
    },
}

/// Device state captured when a draw was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub indices: Range<u32>,
    pub base_vertex: i32,
    pub pipeline_id: Option<usize>,
    pub vertex_buffer_id: Option<usize>,
    pub index_buffer_id: Option<usize>,
    /// `(index, bind_group_id)` pairs sorted by index.
    pub bind_groups: Vec<(u32, usize)>,
}

impl DrawRecord {
    /// The bind group bound at `index` for this draw, if any.
    pub fn bind_group(&self, index: u32) -> Option<usize> {
        self.bind_groups
            .iter()
            .find(|(slot, _)| *slot == index)
            .map(|(_, id)| *id)
    }

    /// Number of indices covered by this draw.
    pub fn index_count(&self) -> u32 {
        self.indices.end - self.indices.start
    }
}

#[derive(Debug)]
struct MockBuffer {
    contents: Vec<u8>,
    destroyed: bool,
}

#[derive(Debug, Default)]
struct BoundState {
    pipeline_id: Option<usize>,
    vertex_buffer_id: Option<usize>,
    index_buffer_id: Option<usize>,
    bind_groups: Vec<(u32, usize)>,
}

/// Mock implementation of [`GraphicsDevice`].
///
/// # Borrow Checking Pattern: Interior Mutability
///
/// Methods take `&self` but need to mutate internal state (record calls).
/// `parking_lot::Mutex` keeps the mock `Send + Sync` as the trait requires.
///
/// The mock enforces the same rules wgpu validation would: writes must be
/// 4-byte aligned, stay within the buffer, and never target a destroyed
/// buffer. Violations panic so tests catch them.
///
/// # Example
///
/// ```rust
/// use sprig_test_utils::{GraphicsDevice, MockGraphicsDevice};
/// use wgpu::*;
///
/// let mock = MockGraphicsDevice::new();
///
/// let buffer = mock.create_buffer(&BufferDescriptor {
///     label: None,
///     size: 1024,
///     usage: BufferUsages::VERTEX,
///     mapped_at_creation: false,
/// });
///
/// assert!(buffer.is_mock());
/// assert_eq!(mock.count_buffer_creates(), 1);
/// ```
pub struct MockGraphicsDevice {
    /// Recorded calls for verification
    calls: Mutex<Vec<DeviceCall>>,

    /// Mock buffers, indexed by buffer id
    buffers: Mutex<Vec<MockBuffer>>,

    bound: Mutex<BoundState>,
    draws: Mutex<Vec<DrawRecord>>,
}

impl MockGraphicsDevice {
    /// Create a new mock device.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            buffers: Mutex::new(Vec::new()),
            bound: Mutex::new(BoundState::default()),
            draws: Mutex::new(Vec::new()),
        }
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    /// Get a copy of every draw issued, with the state bound at the time.
    pub fn draws(&self) -> Vec<DrawRecord> {
        self.draws.lock().clone()
    }

    /// Count draw calls.
    pub fn count_draws(&self) -> usize {
        self.draws.lock().len()
    }

    /// Count buffer creations.
    pub fn count_buffer_creates(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::CreateBuffer { .. }))
    }

    /// Count buffer write operations.
    pub fn count_buffer_writes(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::WriteBuffer { .. }))
    }

    /// Count buffer destructions.
    pub fn count_buffer_destroys(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::DestroyBuffer { .. }))
    }

    /// Count pipeline selections (one per effect pass applied).
    pub fn count_pipeline_sets(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::SetPipeline { .. }))
    }

    /// Number of buffers that have been created and not destroyed.
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.lock().iter().filter(|b| !b.destroyed).count()
    }

    /// Current contents of a mock buffer.
    pub fn buffer_contents(&self, buffer_id: usize) -> Option<Vec<u8>> {
        self.buffers
            .lock()
            .get(buffer_id)
            .map(|buffer| buffer.contents.clone())
    }

    /// Clear recorded calls and draws (useful between test steps).
    ///
    /// Buffers and bound state are kept.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
        self.draws.lock().clear();
    }

    /// Get total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn count(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().push(call);
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        let mut buffers = self.buffers.lock();
        let buffer_id = buffers.len();

        buffers.push(MockBuffer {
            contents: vec![0; desc.size as usize],
            destroyed: false,
        });

        self.record(DeviceCall::CreateBuffer {
            buffer_id,
            size: desc.size,
            usage: desc.usage,
        });

        GpuBuffer::mock(buffer_id, desc.size)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        let Some(buffer_id) = buffer.mock_id() else {
            return;
        };

        assert!(
            offset % wgpu::COPY_BUFFER_ALIGNMENT == 0
                && data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0,
            "Unaligned buffer write: offset {} size {}",
            offset,
            data.len()
        );

        {
            let mut buffers = self.buffers.lock();
            let target = &mut buffers[buffer_id];
            assert!(!target.destroyed, "Write to destroyed buffer {}", buffer_id);

            let start = offset as usize;
            let end = start + data.len();
            assert!(
                end <= target.contents.len(),
                "Write of {} bytes at {} overflows buffer {} of size {}",
                data.len(),
                offset,
                buffer_id,
                target.contents.len()
            );
            target.contents[start..end].copy_from_slice(data);
        }

        self.record(DeviceCall::WriteBuffer {
            buffer_id,
            offset,
            size: data.len(),
        });
    }

    fn destroy_buffer(&self, buffer: &GpuBuffer) {
        let Some(buffer_id) = buffer.mock_id() else {
            return;
        };

        self.buffers.lock()[buffer_id].destroyed = true;
        self.record(DeviceCall::DestroyBuffer { buffer_id });
    }

    fn set_vertex_buffer(&self, slot: u32, buffer: &GpuBuffer) {
        if let Some(buffer_id) = buffer.mock_id() {
            self.bound.lock().vertex_buffer_id = Some(buffer_id);
            self.record(DeviceCall::SetVertexBuffer { slot, buffer_id });
        }
    }

    fn set_index_buffer(&self, buffer: &GpuBuffer, format: IndexFormat) {
        if let Some(buffer_id) = buffer.mock_id() {
            self.bound.lock().index_buffer_id = Some(buffer_id);
            self.record(DeviceCall::SetIndexBuffer { buffer_id, format });
        }
    }

    fn set_pipeline(&self, pipeline: &GpuRenderPipeline) {
        if let Some(pipeline_id) = pipeline.mock_id() {
            self.bound.lock().pipeline_id = Some(pipeline_id);
            self.record(DeviceCall::SetPipeline { pipeline_id });
        }
    }

    fn set_bind_group(&self, index: u32, bind_group: &GpuBindGroup) {
        if let Some(bind_group_id) = bind_group.mock_id() {
            let mut bound = self.bound.lock();
            match bound.bind_groups.iter_mut().find(|(slot, _)| *slot == index) {
                Some(entry) => entry.1 = bind_group_id,
                None => {
                    bound.bind_groups.push((index, bind_group_id));
                    bound.bind_groups.sort_by_key(|(slot, _)| *slot);
                }
            }
            drop(bound);
            self.record(DeviceCall::SetBindGroup {
                index,
                bind_group_id,
            });
        }
    }

    fn draw_indexed(&self, indices: Range<u32>, base_vertex: i32) {
        let snapshot = {
            let bound = self.bound.lock();
            DrawRecord {
                indices: indices.clone(),
                base_vertex,
                pipeline_id: bound.pipeline_id,
                vertex_buffer_id: bound.vertex_buffer_id,
                index_buffer_id: bound.index_buffer_id,
                bind_groups: bound.bind_groups.clone(),
            }
        };
        self.draws.lock().push(snapshot);
        self.record(DeviceCall::DrawIndexed {
            indices,
            base_vertex,
        });
    }
}
