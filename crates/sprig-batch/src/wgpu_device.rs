//! [`GraphicsDevice`] implementation over a real wgpu device.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use sprig_core::profiling::profile_function;
use sprig_test_utils::{GpuBindGroup, GpuBuffer, GpuRenderPipeline, GraphicsDevice};

use crate::context::GraphicsContext;

#[derive(Debug)]
enum RecordedCommand {
    SetVertexBuffer { slot: u32, buffer: GpuBuffer },
    SetIndexBuffer { buffer: GpuBuffer, format: wgpu::IndexFormat },
    SetPipeline(GpuRenderPipeline),
    SetBindGroup { index: u32, bind_group: GpuBindGroup },
    DrawIndexed { indices: Range<u32>, base_vertex: i32 },
}

/// Whether a draw recorded in `commands` reads from `buffer`.
///
/// Writing such a buffer before the commands are submitted changes what the
/// earlier draws see.
fn recorded_draw_reads(commands: &[RecordedCommand], buffer: &GpuBuffer) -> bool {
    let mut bound = false;
    for command in commands {
        match command {
            RecordedCommand::SetVertexBuffer { buffer: b, .. }
            | RecordedCommand::SetIndexBuffer { buffer: b, .. } => {
                bound |= b == buffer;
            }
            RecordedCommand::DrawIndexed { .. } if bound => return true,
            _ => {}
        }
    }
    false
}

/// Device backed by a [`GraphicsContext`].
///
/// Buffer creation and uploads go straight to wgpu. Binding and draw calls
/// are recorded and played into a render pass with [`replay`](Self::replay),
/// since a batch has no render pass of its own.
///
/// Uploads use `Queue::write_buffer`, which lands before the next submitted
/// command buffer. Replay and submit after every batch flush whose geometry
/// is cleared and rewritten, otherwise earlier draws see the later data.
/// Such writes are logged as warnings and counted by
/// [`overwrite_count`](Self::overwrite_count).
pub struct WgpuGraphicsDevice {
    context: Arc<GraphicsContext>,
    recorded: Mutex<Vec<RecordedCommand>>,
    /// Buffers released while recorded commands may still reference them.
    pending_destroy: Mutex<Vec<wgpu::Buffer>>,
    overwrites: AtomicUsize,
}

impl WgpuGraphicsDevice {
    pub fn new(context: Arc<GraphicsContext>) -> Self {
        Self {
            context,
            recorded: Mutex::new(Vec::new()),
            pending_destroy: Mutex::new(Vec::new()),
            overwrites: AtomicUsize::new(0),
        }
    }

    pub fn context(&self) -> &Arc<GraphicsContext> {
        &self.context
    }

    /// Number of commands waiting to be replayed.
    pub fn recorded_len(&self) -> usize {
        self.recorded.lock().len()
    }

    /// Writes that landed in a buffer still read by unreplayed draws.
    pub fn overwrite_count(&self) -> usize {
        self.overwrites.load(Ordering::Relaxed)
    }

    /// Play every recorded command into `pass` and clear the recording.
    pub fn replay(&self, pass: &mut wgpu::RenderPass<'_>) {
        profile_function!();
        let commands = std::mem::take(&mut *self.recorded.lock());
        for command in commands {
            match command {
                RecordedCommand::SetVertexBuffer { slot, buffer } => {
                    pass.set_vertex_buffer(slot, buffer.as_wgpu().slice(..));
                }
                RecordedCommand::SetIndexBuffer { buffer, format } => {
                    pass.set_index_buffer(buffer.as_wgpu().slice(..), format);
                }
                RecordedCommand::SetPipeline(pipeline) => pass.set_pipeline(pipeline.as_wgpu()),
                RecordedCommand::SetBindGroup { index, bind_group } => {
                    pass.set_bind_group(index, bind_group.as_wgpu(), &[]);
                }
                RecordedCommand::DrawIndexed { indices, base_vertex } => {
                    pass.draw_indexed(indices, base_vertex, 0..1);
                }
            }
        }
    }

    /// Destroy buffers released since the last call. Call once the commands
    /// that used them have been submitted.
    pub fn collect_garbage(&self) {
        for buffer in self.pending_destroy.lock().drain(..) {
            buffer.destroy();
        }
    }

    /// Drop recorded commands without replaying them.
    pub fn discard(&self) {
        self.recorded.lock().clear();
    }

    fn record(&self, command: RecordedCommand) {
        self.recorded.lock().push(command);
    }
}

impl GraphicsDevice for WgpuGraphicsDevice {
    fn create_buffer(&self, desc: &wgpu::BufferDescriptor) -> GpuBuffer {
        GpuBuffer::from_wgpu(self.context.device.create_buffer(desc))
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        if recorded_draw_reads(&self.recorded.lock(), buffer) {
            self.overwrites.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                "Buffer written while recorded draws still read it; replay and submit after each flush"
            );
        }
        self.context.queue.write_buffer(buffer.as_wgpu(), offset, data);
    }

    fn destroy_buffer(&self, buffer: &GpuBuffer) {
        self.pending_destroy.lock().push(buffer.as_wgpu().clone());
    }

    fn set_vertex_buffer(&self, slot: u32, buffer: &GpuBuffer) {
        self.record(RecordedCommand::SetVertexBuffer {
            slot,
            buffer: buffer.clone(),
        });
    }

    fn set_index_buffer(&self, buffer: &GpuBuffer, format: wgpu::IndexFormat) {
        self.record(RecordedCommand::SetIndexBuffer {
            buffer: buffer.clone(),
            format,
        });
    }

    fn set_pipeline(&self, pipeline: &GpuRenderPipeline) {
        self.record(RecordedCommand::SetPipeline(pipeline.clone()));
    }

    fn set_bind_group(&self, index: u32, bind_group: &GpuBindGroup) {
        self.record(RecordedCommand::SetBindGroup {
            index,
            bind_group: bind_group.clone(),
        });
    }

    fn draw_indexed(&self, indices: Range<u32>, base_vertex: i32) {
        self.record(RecordedCommand::DrawIndexed { indices, base_vertex });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw() -> RecordedCommand {
        RecordedCommand::DrawIndexed {
            indices: 0..6,
            base_vertex: 0,
        }
    }

    #[test]
    fn test_write_after_recorded_draw_is_detected() {
        let vertices = GpuBuffer::mock(0, 256);
        let indices = GpuBuffer::mock(1, 256);
        let unrelated = GpuBuffer::mock(2, 256);
        let commands = vec![
            RecordedCommand::SetVertexBuffer {
                slot: 0,
                buffer: vertices.clone(),
            },
            RecordedCommand::SetIndexBuffer {
                buffer: indices.clone(),
                format: wgpu::IndexFormat::Uint32,
            },
            draw(),
        ];

        assert!(recorded_draw_reads(&commands, &vertices));
        assert!(recorded_draw_reads(&commands, &indices));
        assert!(!recorded_draw_reads(&commands, &unrelated));
    }

    #[test]
    fn test_binding_without_draw_is_not_a_hazard() {
        let vertices = GpuBuffer::mock(0, 256);
        let commands = vec![RecordedCommand::SetVertexBuffer {
            slot: 0,
            buffer: vertices.clone(),
        }];
        assert!(!recorded_draw_reads(&commands, &vertices));

        // A draw recorded before the buffer was bound does not read it
        let commands = vec![
            draw(),
            RecordedCommand::SetVertexBuffer {
                slot: 0,
                buffer: vertices.clone(),
            },
        ];
        assert!(!recorded_draw_reads(&commands, &vertices));
    }

    #[test]
    #[ignore] // Requires GPU
    fn test_records_until_replay() {
        let ctx = GraphicsContext::new_owned_sync().unwrap();
        let device = WgpuGraphicsDevice::new(ctx);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("test"),
            size: 64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        device.write_buffer(&buffer, 0, &[0u8; 64]);
        device.set_index_buffer(&buffer, wgpu::IndexFormat::Uint32);
        device.draw_indexed(0..3, 0);
        assert_eq!(device.recorded_len(), 2);
        assert_eq!(device.overwrite_count(), 0);

        device.write_buffer(&buffer, 0, &[1u8; 64]);
        assert_eq!(device.overwrite_count(), 1);

        device.destroy_buffer(&buffer);
        device.discard();
        device.collect_garbage();
        assert_eq!(device.recorded_len(), 0);
    }
}
