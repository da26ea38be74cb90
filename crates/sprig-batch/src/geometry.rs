//! CPU-side vertex/index storage with on-demand upload to GPU buffers.
//!
//! A [`GeometryBuffer`] accumulates geometry between flushes. `flush` uploads
//! whatever the GPU has not seen yet, growing the device buffers to the next
//! power of two when needed. Dynamic buffers are cleared after every batch
//! flush; static buffers are uploaded once and then frozen.

use std::sync::Arc;

use sprig_core::profiling::profile_function;
use sprig_test_utils::{GpuBuffer, GraphicsDevice};

use crate::error::{BatchError, BatchResult};
use crate::vertex::Vertex;

/// Index format used by every geometry buffer.
pub const INDEX_FORMAT: wgpu::IndexFormat = wgpu::IndexFormat::Uint32;

const INDEX_SIZE: u64 = std::mem::size_of::<u32>() as u64;

/// Whether geometry is rebuilt every flush or uploaded once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeometryBufferKind {
    /// Uploaded on first flush; contents persist across frames.
    Static,
    /// Rewritten every frame; cleared after each batch flush.
    #[default]
    Dynamic,
}

/// Describes a geometry buffer to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryBufferDescriptor {
    pub label: Option<&'static str>,
    pub kind: GeometryBufferKind,
    pub max_vertices: usize,
    pub max_indices: usize,
}

impl GeometryBufferDescriptor {
    pub fn validate(&self) -> BatchResult<()> {
        if self.max_vertices == 0 || self.max_indices == 0 {
            return Err(BatchError::InvalidArgument(format!(
                "geometry capacity must be non-zero (got {} vertices, {} indices)",
                self.max_vertices, self.max_indices
            )));
        }
        if self.max_vertices > u32::MAX as usize || self.max_indices > u32::MAX as usize {
            return Err(BatchError::InvalidArgument(
                "geometry capacity must fit in 32-bit indices".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GeometryBufferDescriptor {
    fn default() -> Self {
        Self {
            label: Some("Geometry Buffer"),
            kind: GeometryBufferKind::Dynamic,
            max_vertices: 8192,
            max_indices: 12288,
        }
    }
}

/// Where a [`GeometryBuffer::push`] landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryRange {
    /// First vertex of the run; indices were rebased by this amount.
    pub base_vertex: u32,
    /// First index of the run, i.e. the draw command's start index.
    pub start_index: u32,
    pub vertex_count: u32,
    pub index_count: u32,
}

/// Owned vertex and index storage for one batch.
pub struct GeometryBuffer<V: Vertex> {
    device: Arc<dyn GraphicsDevice>,
    descriptor: GeometryBufferDescriptor,
    vertices: Vec<V>,
    indices: Vec<u32>,
    vertex_buffer: Option<GpuBuffer>,
    index_buffer: Option<GpuBuffer>,
    /// Number of vertices/indices already written to the device buffers.
    uploaded_vertices: usize,
    uploaded_indices: usize,
    /// Static buffers freeze after their first upload.
    frozen: bool,
    disposed: bool,
}

impl<V: Vertex> GeometryBuffer<V> {
    pub fn new(device: Arc<dyn GraphicsDevice>, descriptor: GeometryBufferDescriptor) -> BatchResult<Self> {
        descriptor.validate()?;
        if V::SIZE == 0 || V::SIZE % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(BatchError::InvalidArgument(format!(
                "vertex size {} must be a non-zero multiple of {}",
                V::SIZE,
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }

        Ok(Self {
            device,
            vertices: Vec::with_capacity(descriptor.max_vertices.min(1024)),
            indices: Vec::with_capacity(descriptor.max_indices.min(1536)),
            descriptor,
            vertex_buffer: None,
            index_buffer: None,
            uploaded_vertices: 0,
            uploaded_indices: 0,
            frozen: false,
            disposed: false,
        })
    }

    pub fn kind(&self) -> GeometryBufferKind {
        self.descriptor.kind
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn max_vertices(&self) -> usize {
        self.descriptor.max_vertices
    }

    pub fn max_indices(&self) -> usize {
        self.descriptor.max_indices
    }

    pub fn remaining_vertices(&self) -> usize {
        self.descriptor.max_vertices - self.vertices.len()
    }

    pub fn remaining_indices(&self) -> usize {
        self.descriptor.max_indices - self.indices.len()
    }

    /// CPU-side vertices written since the last clear.
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    /// CPU-side indices written since the last clear, already rebased.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Whether every written vertex and index is on the GPU.
    pub fn is_flushed(&self) -> bool {
        self.uploaded_vertices == self.vertices.len() && self.uploaded_indices == self.indices.len()
    }

    /// The device vertex buffer, once something has been uploaded.
    pub fn vertex_buffer(&self) -> Option<&GpuBuffer> {
        self.vertex_buffer.as_ref()
    }

    /// The device index buffer, once something has been uploaded.
    pub fn index_buffer(&self) -> Option<&GpuBuffer> {
        self.index_buffer.as_ref()
    }

    /// Whether `vertex_count` vertices and `index_count` indices would fit.
    pub fn fits(&self, vertex_count: usize, index_count: usize) -> bool {
        vertex_count <= self.remaining_vertices() && index_count <= self.remaining_indices()
    }

    /// Append a run of geometry.
    ///
    /// `indices` are relative to `vertices`; they are rebased so the returned
    /// [`GeometryRange::start_index`] can be drawn with a base vertex of 0.
    pub fn push(&mut self, vertices: &[V], indices: &[u32]) -> BatchResult<GeometryRange> {
        self.ensure_alive()?;
        if self.frozen {
            return Err(BatchError::InvalidOperation(
                "static geometry buffer has already been uploaded".to_string(),
            ));
        }
        if !self.fits(vertices.len(), indices.len()) {
            return Err(BatchError::GeometryFull {
                requested_vertices: vertices.len(),
                requested_indices: indices.len(),
                remaining_vertices: self.remaining_vertices(),
                remaining_indices: self.remaining_indices(),
            });
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(BatchError::InvalidArgument(format!(
                "index {} out of range for {} vertices",
                bad,
                vertices.len()
            )));
        }

        let base_vertex = self.vertices.len() as u32;
        let start_index = self.indices.len() as u32;

        self.vertices.extend_from_slice(vertices);
        self.indices.extend(indices.iter().map(|i| i + base_vertex));

        Ok(GeometryRange {
            base_vertex,
            start_index,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
        })
    }

    /// Upload pending geometry to the device.
    ///
    /// Only data written since the previous flush is sent, so calling this
    /// twice in a row does nothing the second time.
    pub fn flush(&mut self) -> BatchResult<()> {
        profile_function!();
        self.ensure_alive()?;

        if self.is_flushed() {
            if self.descriptor.kind == GeometryBufferKind::Static && !self.vertices.is_empty() {
                self.frozen = true;
            }
            return Ok(());
        }

        let label = self.descriptor.label;
        let vertex_grew = Self::ensure_capacity(
            self.device.as_ref(),
            &mut self.vertex_buffer,
            self.vertices.len() as u64 * V::SIZE,
            self.descriptor.max_vertices as u64 * V::SIZE,
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            label,
        );
        if vertex_grew {
            self.uploaded_vertices = 0;
        }
        let index_grew = Self::ensure_capacity(
            self.device.as_ref(),
            &mut self.index_buffer,
            self.indices.len() as u64 * INDEX_SIZE,
            self.descriptor.max_indices as u64 * INDEX_SIZE,
            wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            label,
        );
        if index_grew {
            self.uploaded_indices = 0;
        }

        if let Some(buffer) = &self.vertex_buffer
            && self.uploaded_vertices < self.vertices.len()
        {
            let pending = &self.vertices[self.uploaded_vertices..];
            self.device.write_buffer(
                buffer,
                self.uploaded_vertices as u64 * V::SIZE,
                bytemuck::cast_slice(pending),
            );
        }
        if let Some(buffer) = &self.index_buffer
            && self.uploaded_indices < self.indices.len()
        {
            let pending = &self.indices[self.uploaded_indices..];
            self.device.write_buffer(
                buffer,
                self.uploaded_indices as u64 * INDEX_SIZE,
                bytemuck::cast_slice(pending),
            );
        }

        tracing::trace!(
            "Geometry flush: {} vertices, {} indices ({} / {} new)",
            self.vertices.len(),
            self.indices.len(),
            self.vertices.len() - self.uploaded_vertices,
            self.indices.len() - self.uploaded_indices
        );

        self.uploaded_vertices = self.vertices.len();
        self.uploaded_indices = self.indices.len();
        if self.descriptor.kind == GeometryBufferKind::Static {
            self.frozen = true;
        }
        Ok(())
    }

    /// Reset the write cursors. A no-op for static buffers, whose contents
    /// persist across frames.
    pub fn clear(&mut self) -> BatchResult<()> {
        self.ensure_alive()?;
        if self.descriptor.kind == GeometryBufferKind::Dynamic {
            self.vertices.clear();
            self.indices.clear();
            self.uploaded_vertices = 0;
            self.uploaded_indices = 0;
        }
        Ok(())
    }

    /// Release the device buffers. The buffer is unusable afterwards; every
    /// later call, including a second `dispose`, fails with
    /// [`BatchError::Disposed`].
    pub fn dispose(&mut self) -> BatchResult<()> {
        self.ensure_alive()?;
        self.release();
        self.disposed = true;
        Ok(())
    }

    fn release(&mut self) {
        if let Some(buffer) = self.vertex_buffer.take() {
            self.device.destroy_buffer(&buffer);
        }
        if let Some(buffer) = self.index_buffer.take() {
            self.device.destroy_buffer(&buffer);
        }
        self.vertices = Vec::new();
        self.indices = Vec::new();
        self.uploaded_vertices = 0;
        self.uploaded_indices = 0;
    }

    fn ensure_alive(&self) -> BatchResult<()> {
        if self.disposed {
            Err(BatchError::Disposed {
                resource: "GeometryBuffer",
            })
        } else {
            Ok(())
        }
    }

    /// Make sure `slot` holds a buffer of at least `required` bytes. Returns
    /// true when a new buffer was created (its contents start empty).
    fn ensure_capacity(
        device: &dyn GraphicsDevice,
        slot: &mut Option<GpuBuffer>,
        required: u64,
        maximum: u64,
        usage: wgpu::BufferUsages,
        label: Option<&'static str>,
    ) -> bool {
        if required == 0 {
            return false;
        }
        if let Some(buffer) = slot.as_ref()
            && buffer.size() >= required
        {
            return false;
        }

        let size = required.next_power_of_two().min(maximum).max(required);
        if let Some(old) = slot.take() {
            device.destroy_buffer(&old);
        }
        *slot = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label,
            size,
            usage,
            mapped_at_creation: false,
        }));
        true
    }
}

impl<V: Vertex> Drop for GeometryBuffer<V> {
    fn drop(&mut self) {
        if !self.disposed {
            self.release();
        }
    }
}

impl<V: Vertex> std::fmt::Debug for GeometryBuffer<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryBuffer")
            .field("kind", &self.descriptor.kind)
            .field("vertices", &self.vertices.len())
            .field("indices", &self.indices.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use sprig_test_utils::{DeviceCall, MockGraphicsDevice};

    use super::*;
    use crate::vertex::VertexPositionColor;

    fn quad() -> ([VertexPositionColor; 4], [u32; 6]) {
        let v = VertexPositionColor {
            position: [0.0; 3],
            color: [1.0; 4],
        };
        ([v; 4], [0, 1, 2, 1, 3, 2])
    }

    fn buffer(mock: &Arc<MockGraphicsDevice>, kind: GeometryBufferKind) -> GeometryBuffer<VertexPositionColor> {
        GeometryBuffer::new(
            mock.clone(),
            GeometryBufferDescriptor {
                kind,
                max_vertices: 16,
                max_indices: 24,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_push_rebases_indices() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut geometry = buffer(&mock, GeometryBufferKind::Dynamic);
        let (vertices, indices) = quad();

        let first = geometry.push(&vertices, &indices).unwrap();
        let second = geometry.push(&vertices, &indices).unwrap();

        assert_eq!(first.start_index, 0);
        assert_eq!(second.base_vertex, 4);
        assert_eq!(second.start_index, 6);
        assert_eq!(&geometry.indices()[6..], &[4, 5, 6, 5, 7, 6]);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut geometry = buffer(&mock, GeometryBufferKind::Dynamic);
        let (vertices, indices) = quad();
        geometry.push(&vertices, &indices).unwrap();

        geometry.flush().unwrap();
        assert_eq!(mock.count_buffer_creates(), 2);
        assert_eq!(mock.count_buffer_writes(), 2);

        geometry.flush().unwrap();
        assert_eq!(mock.count_buffer_writes(), 2);
        assert!(geometry.is_flushed());
    }

    #[test]
    fn test_flush_uploads_only_new_data() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut geometry = buffer(&mock, GeometryBufferKind::Dynamic);
        let (vertices, indices) = quad();

        for _ in 0..3 {
            geometry.push(&vertices, &indices).unwrap();
        }
        geometry.flush().unwrap();
        geometry.push(&vertices, &indices).unwrap();
        mock.clear_calls();
        geometry.flush().unwrap();

        let writes: Vec<DeviceCall> = mock
            .calls()
            .into_iter()
            .filter(|c| matches!(c, DeviceCall::WriteBuffer { .. }))
            .collect();
        // The first flush already sized both buffers to capacity, so only
        // the fourth quad is written, at the end of the earlier data.
        assert_eq!(writes.len(), 2);
        assert!(writes.contains(&DeviceCall::WriteBuffer {
            buffer_id: 0,
            offset: 336,
            size: 112
        }));
        assert!(writes.contains(&DeviceCall::WriteBuffer {
            buffer_id: 1,
            offset: 72,
            size: 24
        }));
    }

    #[test]
    fn test_buffer_grows_and_reuploads() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut geometry = buffer(&mock, GeometryBufferKind::Dynamic);
        let (vertices, indices) = quad();

        geometry.push(&vertices, &indices).unwrap();
        geometry.flush().unwrap();
        let first_size = geometry.vertex_buffer().unwrap().size();

        geometry.push(&vertices, &indices).unwrap();
        geometry.push(&vertices, &indices).unwrap();
        geometry.flush().unwrap();

        assert!(geometry.vertex_buffer().unwrap().size() > first_size);
        assert_eq!(mock.count_buffer_destroys(), 2);
        assert_eq!(mock.live_buffer_count(), 2);
    }

    #[test]
    fn test_clear_resets_dynamic_only() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let (vertices, indices) = quad();

        let mut dynamic = buffer(&mock, GeometryBufferKind::Dynamic);
        dynamic.push(&vertices, &indices).unwrap();
        dynamic.flush().unwrap();
        dynamic.clear().unwrap();
        assert_eq!(dynamic.vertex_count(), 0);
        assert_eq!(dynamic.index_count(), 0);

        let mut fixed = buffer(&mock, GeometryBufferKind::Static);
        fixed.push(&vertices, &indices).unwrap();
        fixed.flush().unwrap();
        fixed.clear().unwrap();
        assert_eq!(fixed.vertex_count(), 4);
    }

    #[test]
    fn test_static_buffer_uploads_once() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut geometry = buffer(&mock, GeometryBufferKind::Static);
        let (vertices, indices) = quad();

        geometry.push(&vertices, &indices).unwrap();
        geometry.flush().unwrap();
        geometry.flush().unwrap();
        assert_eq!(mock.count_buffer_writes(), 2);

        assert!(matches!(
            geometry.push(&vertices, &indices),
            Err(BatchError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_push_rejects_overflow_and_bad_indices() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut geometry = buffer(&mock, GeometryBufferKind::Dynamic);
        let (vertices, indices) = quad();

        for _ in 0..4 {
            geometry.push(&vertices, &indices).unwrap();
        }
        assert!(matches!(
            geometry.push(&vertices, &indices),
            Err(BatchError::GeometryFull {
                remaining_vertices: 0,
                ..
            })
        ));

        geometry.clear().unwrap();
        assert!(matches!(
            geometry.push(&vertices, &[0, 1, 4]),
            Err(BatchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_dispose_fails_loudly_afterwards() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut geometry = buffer(&mock, GeometryBufferKind::Dynamic);
        let (vertices, indices) = quad();
        geometry.push(&vertices, &indices).unwrap();
        geometry.flush().unwrap();

        geometry.dispose().unwrap();
        assert_eq!(mock.live_buffer_count(), 0);

        let disposed = Err(BatchError::Disposed {
            resource: "GeometryBuffer",
        });
        assert_eq!(geometry.flush(), disposed);
        assert_eq!(geometry.clear(), disposed);
        assert_eq!(geometry.dispose(), disposed);
        assert!(geometry.push(&vertices, &indices).is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let result = GeometryBuffer::<VertexPositionColor>::new(
            mock,
            GeometryBufferDescriptor {
                max_vertices: 0,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(BatchError::InvalidArgument(_))));
    }
}
