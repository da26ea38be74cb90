//! A batch that writes its own geometry.

use std::sync::Arc;

use sprig_core::profiling::profile_function;
use sprig_test_utils::GraphicsDevice;

use crate::batch::Batch;
use crate::command::{BatchDrawCommandData, BatchSortMode};
use crate::config::BatchConfig;
use crate::drawer::BatchStats;
use crate::effect::Effect;
use crate::error::{BatchError, BatchResult};
use crate::geometry::{GeometryBuffer, GeometryBufferKind};
use crate::primitive::PrimitiveType;
use crate::vertex::Vertex;

/// Index pattern for a quad given as top-left, top-right, bottom-left,
/// bottom-right.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 1, 3, 2];

/// Appends geometry and enqueues the matching draw command in one call.
///
/// Consecutive draws with the same sort key and payload occupy contiguous
/// index ranges, so the deferred queue merges them into a single draw.
/// When the geometry buffer or the command queue fills up mid-bracket the
/// batch flushes and carries on.
///
/// Only list topologies are accepted: merged strip runs would be drawn as
/// one connected strip.
pub struct PrimitiveBatch<V: Vertex, D: BatchDrawCommandData = ()> {
    batch: Batch<V, D>,
}

impl<V: Vertex, D: BatchDrawCommandData> PrimitiveBatch<V, D> {
    /// Create a primitive batch. The geometry buffer must be dynamic.
    pub fn new(device: Arc<dyn GraphicsDevice>, config: BatchConfig) -> BatchResult<Self> {
        if config.geometry.kind != GeometryBufferKind::Dynamic {
            return Err(BatchError::InvalidArgument(
                "PrimitiveBatch requires a dynamic geometry buffer".to_string(),
            ));
        }
        Ok(Self {
            batch: Batch::new(device, config)?,
        })
    }

    pub fn begin(
        &mut self,
        effect: Arc<Effect>,
        primitive_type: PrimitiveType,
        sort_mode: BatchSortMode,
    ) -> BatchResult<()> {
        if primitive_type.is_strip() {
            return Err(BatchError::InvalidArgument(format!(
                "PrimitiveBatch cannot merge {} runs; use a list topology",
                primitive_type
            )));
        }
        self.batch.begin(effect, primitive_type, sort_mode)
    }

    /// Draw indexed geometry. `indices` are relative to `vertices`.
    pub fn draw_indexed(&mut self, vertices: &[V], indices: &[u32], sort_key: u32, data: D) -> BatchResult<()> {
        profile_function!();
        if !self.batch.has_begun() {
            // Reports NotBegun (or Disposed) with the right operation name
            return self.batch_protocol_error("draw_indexed");
        }
        if indices.is_empty() {
            return Ok(());
        }

        let primitive_type = self.batch.primitive_type();
        let primitive_count = primitive_type
            .primitive_count(indices.len() as u32)
            .ok_or_else(|| {
                BatchError::InvalidArgument(format!(
                    "{} indices do not form whole {} primitives",
                    indices.len(),
                    primitive_type
                ))
            })?;

        let geometry = self.batch.geometry();
        if vertices.len() > geometry.max_vertices() || indices.len() > geometry.max_indices() {
            return Err(BatchError::InvalidArgument(format!(
                "{} vertices / {} indices exceed the geometry buffer ({} / {})",
                vertices.len(),
                indices.len(),
                geometry.max_vertices(),
                geometry.max_indices()
            )));
        }

        if !geometry.fits(vertices.len(), indices.len()) || self.batch.would_exceed_capacity(sort_key, &data) {
            tracing::debug!("PrimitiveBatch full, flushing mid-bracket");
            self.batch.flush()?;
        }

        let range = self.batch.geometry_mut().push(vertices, indices)?;
        self.batch
            .enqueue_draw_command(range.start_index, primitive_count, sort_key, data)
    }

    /// Draw a quad as two triangles using [`QUAD_INDICES`].
    pub fn draw_quad(&mut self, vertices: [V; 4], sort_key: u32, data: D) -> BatchResult<()> {
        if self.batch.has_begun() && self.batch.primitive_type() != PrimitiveType::TriangleList {
            return Err(BatchError::InvalidArgument(format!(
                "draw_quad requires TriangleList, batch was begun with {}",
                self.batch.primitive_type()
            )));
        }
        self.draw_indexed(&vertices, &QUAD_INDICES, sort_key, data)
    }

    pub fn flush(&mut self) -> BatchResult<()> {
        self.batch.flush()
    }

    pub fn end(&mut self) -> BatchResult<()> {
        self.batch.end()
    }

    pub fn dispose(&mut self) -> BatchResult<()> {
        self.batch.dispose()
    }

    pub fn has_begun(&self) -> bool {
        self.batch.has_begun()
    }

    pub fn stats(&self) -> BatchStats {
        self.batch.stats()
    }

    pub fn sort_mode(&self) -> BatchSortMode {
        self.batch.sort_mode()
    }

    pub fn geometry(&self) -> &GeometryBuffer<V> {
        self.batch.geometry()
    }

    /// The underlying command batch.
    pub fn batch(&self) -> &Batch<V, D> {
        &self.batch
    }

    fn batch_protocol_error(&self, operation: &'static str) -> BatchResult<()> {
        if self.batch.is_disposed() {
            Err(BatchError::Disposed { resource: "Batch" })
        } else {
            Err(BatchError::NotBegun { operation })
        }
    }
}
