//! The `begin / enqueue / flush / end` facade over the queues.

use std::sync::Arc;

use sprig_test_utils::GraphicsDevice;

use crate::command::{BatchDrawCommandData, BatchSortMode};
use crate::config::BatchConfig;
use crate::drawer::{BatchCommandDrawer, BatchStats};
use crate::effect::Effect;
use crate::error::{BatchError, BatchResult};
use crate::geometry::GeometryBuffer;
use crate::primitive::PrimitiveType;
use crate::queue::{BatchCommandQueue, DeferredQueue, ImmediateQueue};
use crate::vertex::Vertex;

/// A draw-command batch.
///
/// Commands are only accepted between [`begin`](Self::begin) and
/// [`end`](Self::end). The sort mode chosen at `begin` decides whether they
/// are drawn immediately or buffered, merged and drawn on flush.
///
/// # Example
///
/// ```
/// # use std::sync::Arc;
/// # use sprig_batch::*;
/// # use sprig_test_utils::{GpuRenderPipeline, MockGraphicsDevice};
/// let device = Arc::new(MockGraphicsDevice::new());
/// let mut batch = Batch::<VertexPositionColor>::new(device.clone(), BatchConfig::default())?;
/// let effect = Arc::new(Effect::single_pass("flat", GpuRenderPipeline::mock(0)));
///
/// batch.begin(effect, PrimitiveType::TriangleList, BatchSortMode::Deferred)?;
/// batch.enqueue_draw_command(0, 2, 0, ())?;
/// batch.enqueue_draw_command(6, 1, 0, ())?; // merges into the first command
/// batch.end()?;
///
/// assert_eq!(device.count_draws(), 1);
/// # Ok::<(), BatchError>(())
/// ```
pub struct Batch<V: Vertex, D: BatchDrawCommandData = ()> {
    drawer: BatchCommandDrawer<V>,
    immediate: ImmediateQueue,
    deferred: DeferredQueue<D>,
    sort_mode: BatchSortMode,
    begun: bool,
    disposed: bool,
}

impl<V: Vertex, D: BatchDrawCommandData> Batch<V, D> {
    pub fn new(device: Arc<dyn GraphicsDevice>, config: BatchConfig) -> BatchResult<Self> {
        config.validate()?;
        let geometry = GeometryBuffer::new(device.clone(), config.geometry.clone())?;

        tracing::info!(
            "Created batch: {} commands, {:?} geometry ({} vertices, {} indices)",
            config.maximum_commands_count,
            config.geometry.kind,
            config.geometry.max_vertices,
            config.geometry.max_indices
        );

        Ok(Self {
            drawer: BatchCommandDrawer::new(device, geometry),
            immediate: ImmediateQueue::new(),
            deferred: DeferredQueue::new(config.maximum_commands_count, BatchSortMode::Deferred),
            sort_mode: BatchSortMode::default(),
            begun: false,
            disposed: false,
        })
    }

    /// Open a bracket.
    pub fn begin(
        &mut self,
        effect: Arc<Effect>,
        primitive_type: PrimitiveType,
        sort_mode: BatchSortMode,
    ) -> BatchResult<()> {
        self.ensure_alive()?;
        if self.begun {
            tracing::error!("Batch::begin called twice without end");
            return Err(BatchError::AlreadyBegun);
        }
        effect.validate()?;

        self.sort_mode = sort_mode;
        if sort_mode != BatchSortMode::Immediate {
            self.deferred.set_sort_mode(sort_mode);
        }

        tracing::debug!(
            "Batch begin: effect '{}', {}, {}",
            effect.label(),
            primitive_type,
            sort_mode
        );
        let (queue, drawer) = self.queue_and_drawer();
        queue.begin(drawer, effect, primitive_type);
        self.begun = true;
        Ok(())
    }

    /// Submit a run of `primitive_count` primitives starting at
    /// `start_index` in the geometry buffer.
    ///
    /// The run must lie within the geometry capacity; otherwise this fails
    /// with [`BatchError::InvalidArgument`] and nothing is enqueued.
    pub fn enqueue_draw_command(
        &mut self,
        start_index: u32,
        primitive_count: u32,
        sort_key: u32,
        data: D,
    ) -> BatchResult<()> {
        self.ensure_begun("enqueue_draw_command")?;
        self.drawer.index_range(start_index, primitive_count)?;
        let (queue, drawer) = self.queue_and_drawer();
        queue.enqueue_draw_command(drawer, start_index, primitive_count, sort_key, data)
    }

    /// Draw everything buffered so far without closing the bracket.
    pub fn flush(&mut self) -> BatchResult<()> {
        self.ensure_begun("flush")?;
        let (queue, drawer) = self.queue_and_drawer();
        queue.flush(drawer)
    }

    /// Flush and close the bracket. The batch is ready for the next `begin`
    /// afterwards, even when the flush fails; commands that could not be
    /// drawn are dropped.
    pub fn end(&mut self) -> BatchResult<()> {
        self.ensure_begun("end")?;
        let (queue, drawer) = self.queue_and_drawer();
        let result = queue.end(drawer);
        self.begun = false;

        let stats = self.drawer.stats();
        tracing::debug!(
            "Batch end: {} draw calls, {} commands ({} merged), {} primitives",
            stats.draw_calls,
            stats.commands_drawn,
            stats.merged_commands,
            stats.primitives_drawn
        );
        result
    }

    /// Release the geometry buffers and any buffered commands.
    ///
    /// Calling this again is a no-op.
    pub fn dispose(&mut self) -> BatchResult<()> {
        if self.disposed {
            return Ok(());
        }
        self.deferred.discard();
        self.begun = false;
        self.disposed = true;
        tracing::debug!("Batch disposed");
        self.drawer.dispose()
    }

    pub fn has_begun(&self) -> bool {
        self.begun
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Sort mode of the current (or most recent) bracket.
    pub fn sort_mode(&self) -> BatchSortMode {
        self.sort_mode
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        self.drawer.primitive_type()
    }

    pub fn stats(&self) -> BatchStats {
        self.drawer.stats()
    }

    pub fn geometry(&self) -> &GeometryBuffer<V> {
        self.drawer.geometry()
    }

    pub fn geometry_mut(&mut self) -> &mut GeometryBuffer<V> {
        self.drawer.geometry_mut()
    }

    /// Distinct commands waiting for the next flush.
    pub fn buffered_command_count(&self) -> usize {
        match self.sort_mode {
            BatchSortMode::Immediate => 0,
            _ => self.deferred.commands().len(),
        }
    }

    pub fn maximum_commands_count(&self) -> usize {
        self.deferred.maximum_commands_count()
    }

    /// Whether enqueueing `(sort_key, data)` now would hit the command limit.
    pub(crate) fn would_exceed_capacity(&self, sort_key: u32, data: &D) -> bool {
        if self.sort_mode == BatchSortMode::Immediate {
            return false;
        }
        let commands = self.deferred.commands();
        let merges = commands
            .last()
            .is_some_and(|last| last.can_merge(sort_key, data));
        !merges && commands.len() >= self.deferred.maximum_commands_count()
    }

    fn queue_and_drawer(&mut self) -> (&mut dyn BatchCommandQueue<V, D>, &mut BatchCommandDrawer<V>) {
        let queue: &mut dyn BatchCommandQueue<V, D> = match self.sort_mode {
            BatchSortMode::Immediate => &mut self.immediate,
            BatchSortMode::Deferred | BatchSortMode::DeferredSorted => &mut self.deferred,
        };
        (queue, &mut self.drawer)
    }

    fn ensure_alive(&self) -> BatchResult<()> {
        if self.disposed {
            Err(BatchError::Disposed { resource: "Batch" })
        } else {
            Ok(())
        }
    }

    fn ensure_begun(&self, operation: &'static str) -> BatchResult<()> {
        self.ensure_alive()?;
        if !self.begun {
            tracing::error!("Batch::{} called outside begin/end", operation);
            return Err(BatchError::NotBegun { operation });
        }
        Ok(())
    }
}

impl<V: Vertex, D: BatchDrawCommandData> Drop for Batch<V, D> {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            tracing::warn!("Failed to dispose batch on drop: {}", err);
        }
    }
}
