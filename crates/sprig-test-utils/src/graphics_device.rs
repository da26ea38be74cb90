//! Trait abstracting the graphics device the batching engine submits to.
//!
//! The device exposes exactly what a batch needs: buffer upload, buffer
//! binding, pipeline/bind group selection and indexed draws. Everything else
//! (surface management, presentation, resource creation beyond buffers)
//! stays with the caller.

use std::ops::Range;

use crate::gpu_types::{GpuBindGroup, GpuBuffer, GpuRenderPipeline};
use wgpu::{BufferDescriptor, IndexFormat};

/// Trait abstracting GPU buffer management and draw submission.
///
/// # Borrow Checking Pattern
///
/// Methods take `&self` and return owned wrapper types, so one device can be
/// shared between batches behind an `Arc<dyn GraphicsDevice>`. State that the
/// device has to track (bound buffers, recorded draws) lives behind interior
/// mutability in the implementation.
///
/// The device is not synchronised across batches: callers that drive several
/// batches against one device must serialise their begin/end brackets.
///
/// # Example
///
/// ```rust,no_run
/// use sprig_test_utils::GraphicsDevice;
/// use wgpu::{BufferDescriptor, BufferUsages};
///
/// fn upload(device: &dyn GraphicsDevice, bytes: &[u8]) {
///     let buffer = device.create_buffer(&BufferDescriptor {
///         label: Some("upload"),
///         size: bytes.len() as u64,
///         usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
///         mapped_at_creation: false,
///     });
///     device.write_buffer(&buffer, 0, bytes);
///     device.set_vertex_buffer(0, &buffer);
/// }
/// ```
pub trait GraphicsDevice: Send + Sync {
    // Buffer operations

    /// Create a GPU buffer.
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer;

    /// Write data to a buffer.
    ///
    /// `offset` and `data.len()` must be multiples of
    /// [`wgpu::COPY_BUFFER_ALIGNMENT`].
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);

    /// Release the device memory behind a buffer.
    fn destroy_buffer(&self, buffer: &GpuBuffer);

    // Binding operations

    /// Bind a vertex buffer to a slot for subsequent draws.
    fn set_vertex_buffer(&self, slot: u32, buffer: &GpuBuffer);

    /// Bind the index buffer for subsequent draws.
    fn set_index_buffer(&self, buffer: &GpuBuffer, format: IndexFormat);

    /// Apply a pass: select the pipeline used by subsequent draws.
    fn set_pipeline(&self, pipeline: &GpuRenderPipeline);

    /// Bind a shader parameter group at `index`.
    fn set_bind_group(&self, index: u32, bind_group: &GpuBindGroup);

    // Draw operations

    /// Draw indexed primitives from the bound buffers.
    fn draw_indexed(&self, indices: Range<u32>, base_vertex: i32);
}
