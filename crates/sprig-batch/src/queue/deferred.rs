use std::cmp::Reverse;

use sprig_core::profiling::profile_function;

use super::BatchCommandQueue;
use crate::command::{BatchDrawCommand, BatchDrawCommandData, BatchSortMode};
use crate::drawer::BatchCommandDrawer;
use crate::error::{BatchError, BatchResult};
use crate::vertex::Vertex;

/// Buffers commands until flush.
///
/// A command whose `(sort_key, data)` equals the last buffered command's is
/// merged into it by growing its primitive count. Merging trusts the caller
/// that the two index runs are contiguous.
#[derive(Debug)]
pub struct DeferredQueue<D> {
    commands: Vec<BatchDrawCommand<D>>,
    maximum_commands_count: usize,
    sort_mode: BatchSortMode,
}

impl<D: BatchDrawCommandData> DeferredQueue<D> {
    pub fn new(maximum_commands_count: usize, sort_mode: BatchSortMode) -> Self {
        Self {
            commands: Vec::with_capacity(maximum_commands_count.min(256)),
            maximum_commands_count,
            sort_mode,
        }
    }

    pub fn sort_mode(&self) -> BatchSortMode {
        self.sort_mode
    }

    /// Switch between insertion-order and sorted flushing. Takes effect at
    /// the next flush.
    pub fn set_sort_mode(&mut self, sort_mode: BatchSortMode) {
        self.sort_mode = sort_mode;
    }

    pub fn maximum_commands_count(&self) -> usize {
        self.maximum_commands_count
    }

    /// Buffered commands in enqueue order.
    pub fn commands(&self) -> &[BatchDrawCommand<D>] {
        &self.commands
    }

    /// Drop buffered commands without drawing them.
    pub fn discard(&mut self) {
        self.commands.clear();
    }
}

impl<V: Vertex, D: BatchDrawCommandData> BatchCommandQueue<V, D> for DeferredQueue<D> {
    fn enqueue_draw_command(
        &mut self,
        drawer: &mut BatchCommandDrawer<V>,
        start_index: u32,
        primitive_count: u32,
        sort_key: u32,
        data: D,
    ) -> BatchResult<()> {
        if let Some(last) = self.commands.last_mut()
            && last.can_merge(sort_key, &data)
        {
            let merged = last.primitive_count.checked_add(primitive_count).ok_or_else(|| {
                BatchError::InvalidArgument(format!(
                    "merging {} primitives into a run of {} overflows",
                    primitive_count, last.primitive_count
                ))
            })?;
            drawer.index_range(last.start_index, merged)?;
            last.primitive_count = merged;
            drawer.record_merge();
            tracing::trace!(
                "Merged command into run at index {} ({} primitives)",
                last.start_index,
                last.primitive_count
            );
            return Ok(());
        }

        if self.commands.len() >= self.maximum_commands_count {
            tracing::error!(
                "Deferred queue is full ({} commands); flush before enqueueing more",
                self.maximum_commands_count
            );
            return Err(BatchError::CapacityExceeded {
                maximum: self.maximum_commands_count,
            });
        }

        self.commands
            .push(BatchDrawCommand::new(start_index, primitive_count, sort_key, data));
        Ok(())
    }

    fn flush(&mut self, drawer: &mut BatchCommandDrawer<V>) -> BatchResult<()> {
        profile_function!();
        if self.commands.is_empty() {
            return Ok(());
        }

        drawer.select_buffers()?;

        if self.sort_mode == BatchSortMode::DeferredSorted {
            self.commands.sort_unstable_by_key(|command| Reverse(command.sort_key));
        }

        let count = self.commands.len();
        for command in self.commands.drain(..) {
            drawer.draw(command)?;
        }
        tracing::debug!("Flushed {} deferred commands ({})", count, self.sort_mode);

        drawer.clear_geometry()
    }

    fn buffered_count(&self) -> usize {
        self.commands.len()
    }

    fn discard(&mut self) {
        DeferredQueue::discard(self);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sprig_test_utils::{GpuRenderPipeline, MockGraphicsDevice};

    use super::*;
    use crate::effect::{Effect, EffectParameters};
    use crate::geometry::{GeometryBuffer, GeometryBufferDescriptor};
    use crate::primitive::PrimitiveType;
    use crate::vertex::VertexPositionColor;

    #[derive(Debug, Clone, PartialEq)]
    struct Tag(u8);

    impl BatchDrawCommandData for Tag {
        fn apply_to(&self, _parameters: &mut EffectParameters) {}
    }

    fn setup(mock: &Arc<MockGraphicsDevice>) -> BatchCommandDrawer<VertexPositionColor> {
        let geometry = GeometryBuffer::new(mock.clone(), GeometryBufferDescriptor::default()).unwrap();
        let mut drawer = BatchCommandDrawer::new(mock.clone(), geometry);
        drawer.begin(
            Arc::new(Effect::single_pass("basic", GpuRenderPipeline::mock(1))),
            PrimitiveType::TriangleList,
        );
        drawer
    }

    #[test]
    fn test_merges_only_with_last_command() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut drawer = setup(&mock);
        let mut queue = DeferredQueue::<Tag>::new(8, BatchSortMode::Deferred);

        queue.enqueue_draw_command(&mut drawer, 0, 1, 0, Tag(1)).unwrap();
        queue.enqueue_draw_command(&mut drawer, 3, 1, 0, Tag(2)).unwrap();
        queue.enqueue_draw_command(&mut drawer, 6, 1, 0, Tag(1)).unwrap();
        queue.enqueue_draw_command(&mut drawer, 9, 2, 0, Tag(1)).unwrap();

        let counts: Vec<u32> = queue.commands().iter().map(|c| c.primitive_count).collect();
        assert_eq!(counts, vec![1, 1, 3]);
        assert_eq!(drawer.stats().merged_commands, 1);
    }

    #[test]
    fn test_merge_does_not_consume_capacity() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut drawer = setup(&mock);
        let mut queue = DeferredQueue::<Tag>::new(1, BatchSortMode::Deferred);

        queue.enqueue_draw_command(&mut drawer, 0, 1, 0, Tag(1)).unwrap();
        queue.enqueue_draw_command(&mut drawer, 3, 1, 0, Tag(1)).unwrap();
        assert_eq!(
            queue.enqueue_draw_command(&mut drawer, 6, 1, 0, Tag(2)),
            Err(BatchError::CapacityExceeded { maximum: 1 })
        );
        assert_eq!(BatchCommandQueue::<VertexPositionColor, Tag>::buffered_count(&queue), 1);
    }

    #[test]
    fn test_empty_flush_touches_nothing() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut drawer = setup(&mock);
        let mut queue = DeferredQueue::<Tag>::new(8, BatchSortMode::DeferredSorted);

        queue.flush(&mut drawer).unwrap();
        assert_eq!(mock.call_count(), 0);
        assert_eq!(drawer.stats().flushes, 0);
    }

    #[test]
    fn test_sorted_flush_draws_descending_keys() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut drawer = setup(&mock);
        let mut queue = DeferredQueue::<Tag>::new(8, BatchSortMode::DeferredSorted);

        queue.enqueue_draw_command(&mut drawer, 0, 1, 3, Tag(0)).unwrap();
        queue.enqueue_draw_command(&mut drawer, 3, 1, 1, Tag(0)).unwrap();
        queue.enqueue_draw_command(&mut drawer, 6, 1, 2, Tag(0)).unwrap();
        queue.flush(&mut drawer).unwrap();

        let starts: Vec<u32> = mock.draws().iter().map(|d| d.indices.start).collect();
        assert_eq!(starts, vec![0, 6, 3]);
        assert_eq!(BatchCommandQueue::<VertexPositionColor, Tag>::buffered_count(&queue), 0);
    }

    #[test]
    fn test_merge_past_u32_is_rejected() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut drawer = setup(&mock);
        let mut queue = DeferredQueue::<Tag>::new(8, BatchSortMode::Deferred);

        queue.enqueue_draw_command(&mut drawer, 0, 1, 0, Tag(0)).unwrap();
        let result = queue.enqueue_draw_command(&mut drawer, 3, u32::MAX, 0, Tag(0));

        assert!(matches!(result, Err(BatchError::InvalidArgument(_))));
        assert_eq!(queue.commands()[0].primitive_count, 1);
        assert_eq!(drawer.stats().merged_commands, 0);
    }

    #[test]
    fn test_merge_beyond_geometry_capacity_is_rejected() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut drawer = setup(&mock);
        let mut queue = DeferredQueue::<Tag>::new(8, BatchSortMode::Deferred);

        // 4096 triangles fill the default 12288 indices exactly
        queue.enqueue_draw_command(&mut drawer, 0, 4000, 0, Tag(0)).unwrap();
        queue.enqueue_draw_command(&mut drawer, 12000, 96, 0, Tag(0)).unwrap();
        assert!(queue.enqueue_draw_command(&mut drawer, 12288, 1, 0, Tag(0)).is_err());
        assert_eq!(queue.commands()[0].primitive_count, 4096);
    }

    #[test]
    fn test_discard_drops_buffered_commands() {
        let mock = Arc::new(MockGraphicsDevice::new());
        let mut drawer = setup(&mock);
        let mut queue = DeferredQueue::<Tag>::new(8, BatchSortMode::Deferred);

        queue.enqueue_draw_command(&mut drawer, 0, 1, 0, Tag(0)).unwrap();
        queue.enqueue_draw_command(&mut drawer, 3, 1, 0, Tag(1)).unwrap();
        queue.discard();
        queue.flush(&mut drawer).unwrap();

        assert!(queue.commands().is_empty());
        assert_eq!(mock.count_draws(), 0);
    }
}
