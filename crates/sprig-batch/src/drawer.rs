//! Turns draw commands into device calls.

use std::ops::Range;
use std::sync::Arc;

use sprig_core::profiling::profile_function;
use sprig_test_utils::GraphicsDevice;

use crate::command::{BatchDrawCommand, BatchDrawCommandData};
use crate::effect::{Effect, EffectParameters};
use crate::error::{BatchError, BatchResult};
use crate::geometry::{GeometryBuffer, INDEX_FORMAT};
use crate::primitive::PrimitiveType;
use crate::vertex::Vertex;

/// Per-bracket counters, reset by every `begin`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Device draw calls issued (one per command per effect pass).
    pub draw_calls: u32,
    /// Commands drawn after merging.
    pub commands_drawn: u32,
    pub primitives_drawn: u32,
    /// Enqueued commands folded into their predecessor.
    pub merged_commands: u32,
    /// Times geometry was uploaded and bound for drawing.
    pub flushes: u32,
}

/// Owns the geometry and the bracket context (effect, topology) and issues
/// the device calls for each command.
///
/// Queues drive the drawer: `select_buffers` once per flush cycle, then
/// `draw` per command.
pub struct BatchCommandDrawer<V: Vertex> {
    device: Arc<dyn GraphicsDevice>,
    geometry: GeometryBuffer<V>,
    effect: Option<Arc<Effect>>,
    primitive_type: PrimitiveType,
    /// Scratch parameters rebuilt from the effect and payload per draw.
    parameters: EffectParameters,
    stats: BatchStats,
}

impl<V: Vertex> BatchCommandDrawer<V> {
    pub fn new(device: Arc<dyn GraphicsDevice>, geometry: GeometryBuffer<V>) -> Self {
        Self {
            device,
            geometry,
            effect: None,
            primitive_type: PrimitiveType::default(),
            parameters: EffectParameters::new(),
            stats: BatchStats::default(),
        }
    }

    /// Store the bracket context and reset the stats.
    pub fn begin(&mut self, effect: Arc<Effect>, primitive_type: PrimitiveType) {
        self.effect = Some(effect);
        self.primitive_type = primitive_type;
        self.stats = BatchStats::default();
    }

    /// Release the bracket context.
    pub fn end(&mut self) {
        self.effect = None;
        self.parameters.clear();
    }

    pub fn effect(&self) -> Option<&Arc<Effect>> {
        self.effect.as_ref()
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        self.primitive_type
    }

    pub fn geometry(&self) -> &GeometryBuffer<V> {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut GeometryBuffer<V> {
        &mut self.geometry
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    pub(crate) fn record_merge(&mut self) {
        self.stats.merged_commands += 1;
    }

    /// Index range covered by `primitive_count` primitives starting at
    /// `start_index`, checked against the geometry capacity.
    pub fn index_range(&self, start_index: u32, primitive_count: u32) -> BatchResult<Range<u32>> {
        let end = self
            .primitive_type
            .index_count(primitive_count)
            .and_then(|count| start_index.checked_add(count));
        match end {
            Some(end) if end as usize <= self.geometry.max_indices() => Ok(start_index..end),
            _ => Err(BatchError::InvalidArgument(format!(
                "{} {} primitives from index {} exceed the geometry buffer ({} indices)",
                primitive_count,
                self.primitive_type,
                start_index,
                self.geometry.max_indices()
            ))),
        }
    }

    /// Upload pending geometry and bind the vertex and index buffers.
    pub fn select_buffers(&mut self) -> BatchResult<()> {
        profile_function!();
        self.geometry.flush()?;
        if let Some(buffer) = self.geometry.vertex_buffer() {
            self.device.set_vertex_buffer(0, buffer);
        }
        if let Some(buffer) = self.geometry.index_buffer() {
            self.device.set_index_buffer(buffer, INDEX_FORMAT);
        }
        self.stats.flushes += 1;
        Ok(())
    }

    /// Draw one command with every pass of the active technique.
    ///
    /// The command is consumed; its payload is dropped once drawn.
    pub fn draw<D: BatchDrawCommandData>(&mut self, command: BatchDrawCommand<D>) -> BatchResult<()> {
        let Some(effect) = self.effect.as_ref() else {
            return Err(BatchError::NotBegun { operation: "draw" });
        };
        let indices = self.index_range(command.start_index, command.primitive_count)?;

        self.parameters.reset_to(effect.parameters());
        command.data.apply_to(&mut self.parameters);

        for pass in effect.passes() {
            pass.apply(self.device.as_ref());
            self.parameters.apply(self.device.as_ref());
            self.device.draw_indexed(indices.clone(), 0);
            self.stats.draw_calls += 1;
        }

        self.stats.commands_drawn += 1;
        self.stats.primitives_drawn += command.primitive_count;
        Ok(())
    }

    /// Reset dynamic geometry after a flush cycle.
    pub fn clear_geometry(&mut self) -> BatchResult<()> {
        self.geometry.clear()
    }

    /// Dispose the geometry buffer and drop the bracket context.
    pub fn dispose(&mut self) -> BatchResult<()> {
        self.end();
        self.geometry.dispose()
    }
}

#[cfg(test)]
mod tests {
    use sprig_test_utils::{DeviceCall, GpuBindGroup, GpuRenderPipeline, MockGraphicsDevice};

    use super::*;
    use crate::command::TextureCommandData;
    use crate::effect::{EffectPass, EffectTechnique, TEXTURE_BIND_GROUP};
    use crate::geometry::GeometryBufferDescriptor;
    use crate::vertex::VertexPositionColor;

    fn drawer(mock: &Arc<MockGraphicsDevice>) -> BatchCommandDrawer<VertexPositionColor> {
        let geometry = GeometryBuffer::new(mock.clone(), GeometryBufferDescriptor::default()).unwrap();
        BatchCommandDrawer::new(mock.clone(), geometry)
    }

    #[test]
    fn test_draw_without_effect_is_protocol_error() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut drawer = drawer(&mock);
        let result = drawer.draw(BatchDrawCommand::new(0, 1, 0, ()));
        assert_eq!(result, Err(BatchError::NotBegun { operation: "draw" }));
    }

    #[test]
    fn test_draw_runs_every_pass() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut drawer = drawer(&mock);
        let effect = Effect::new("outline").with_technique(
            EffectTechnique::new("two-pass")
                .with_pass(EffectPass::new("fill", GpuRenderPipeline::mock(1)))
                .with_pass(EffectPass::new("outline", GpuRenderPipeline::mock(2))),
        );
        drawer.begin(Arc::new(effect), PrimitiveType::TriangleList);

        drawer.draw(BatchDrawCommand::new(6, 2, 0, ())).unwrap();

        let draws = mock.draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].pipeline_id, Some(1));
        assert_eq!(draws[1].pipeline_id, Some(2));
        assert!(draws.iter().all(|d| d.indices == (6..12)));
        assert_eq!(drawer.stats().draw_calls, 2);
        assert_eq!(drawer.stats().commands_drawn, 1);
        assert_eq!(drawer.stats().primitives_drawn, 2);
    }

    #[test]
    fn test_payload_overrides_effect_parameters_per_draw() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut drawer = drawer(&mock);
        let effect = Effect::single_pass("sprites", GpuRenderPipeline::mock(1))
            .with_bind_group(TEXTURE_BIND_GROUP, GpuBindGroup::mock(100));
        drawer.begin(Arc::new(effect), PrimitiveType::TriangleList);

        drawer
            .draw(BatchDrawCommand::new(0, 1, 0, TextureCommandData::new(GpuBindGroup::mock(7))))
            .unwrap();
        drawer.draw(BatchDrawCommand::new(3, 1, 0, ())).unwrap();

        let draws = mock.draws();
        assert_eq!(draws[0].bind_group(TEXTURE_BIND_GROUP), Some(7));
        // The next draw starts from the effect's own parameters again
        assert_eq!(draws[1].bind_group(TEXTURE_BIND_GROUP), Some(100));
    }

    #[test]
    fn test_select_buffers_binds_uploaded_geometry() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut drawer = drawer(&mock);
        let vertex = VertexPositionColor {
            position: [0.0; 3],
            color: [1.0; 4],
        };
        drawer
            .geometry_mut()
            .push(&[vertex; 3], &[0, 1, 2])
            .unwrap();

        drawer.select_buffers().unwrap();

        let calls = mock.calls();
        assert!(calls.contains(&DeviceCall::SetVertexBuffer { slot: 0, buffer_id: 0 }));
        assert!(calls.contains(&DeviceCall::SetIndexBuffer {
            buffer_id: 1,
            format: wgpu::IndexFormat::Uint32
        }));
        assert_eq!(drawer.stats().flushes, 1);
    }

    #[test]
    fn test_index_range_rejects_overflow_and_capacity() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut drawer = drawer(&mock);
        drawer.begin(
            Arc::new(Effect::single_pass("basic", GpuRenderPipeline::mock(1))),
            PrimitiveType::TriangleList,
        );

        assert_eq!(drawer.index_range(3, 2), Ok(3..9));
        assert!(matches!(
            drawer.index_range(0, 2_000_000_000),
            Err(BatchError::InvalidArgument(_))
        ));
        assert!(matches!(
            drawer.index_range(u32::MAX, 1),
            Err(BatchError::InvalidArgument(_))
        ));
        // Default capacity is 12288 indices
        assert!(drawer.index_range(12285, 1).is_ok());
        assert!(drawer.index_range(12286, 1).is_err());

        let result = drawer.draw(BatchDrawCommand::new(0, u32::MAX, 0, ()));
        assert!(matches!(result, Err(BatchError::InvalidArgument(_))));
        assert_eq!(mock.count_draws(), 0);
    }

    #[test]
    fn test_begin_resets_stats_and_end_releases_effect() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut drawer = drawer(&mock);
        let effect = Arc::new(Effect::single_pass("basic", GpuRenderPipeline::mock(1)));

        drawer.begin(effect.clone(), PrimitiveType::TriangleList);
        drawer.draw(BatchDrawCommand::new(0, 1, 0, ())).unwrap();
        drawer.end();
        assert!(drawer.effect().is_none());
        assert_eq!(Arc::strong_count(&effect), 1);

        drawer.begin(effect, PrimitiveType::LineList);
        assert_eq!(drawer.stats(), BatchStats::default());
        assert_eq!(drawer.primitive_type(), PrimitiveType::LineList);
    }
}
