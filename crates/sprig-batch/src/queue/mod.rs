//! Command queues: the strategy that decides when commands reach the drawer.
//!
//! - [`ImmediateQueue`] draws each command as soon as it is enqueued.
//! - [`DeferredQueue`] buffers and merges commands, drawing them on flush,
//!   optionally ordered by descending sort key.

mod deferred;
mod immediate;

pub use deferred::DeferredQueue;
pub use immediate::ImmediateQueue;

use std::sync::Arc;

use crate::command::BatchDrawCommandData;
use crate::drawer::BatchCommandDrawer;
use crate::effect::Effect;
use crate::error::BatchResult;
use crate::primitive::PrimitiveType;
use crate::vertex::Vertex;

/// A batching strategy driven by [`Batch`](crate::Batch).
///
/// Queues own no geometry or device state; every call receives the drawer
/// that does. The trait is object-safe so a batch can switch strategies per
/// bracket.
pub trait BatchCommandQueue<V: Vertex, D: BatchDrawCommandData> {
    /// Open a bracket with the given effect and topology.
    fn begin(&mut self, drawer: &mut BatchCommandDrawer<V>, effect: Arc<Effect>, primitive_type: PrimitiveType) {
        drawer.begin(effect, primitive_type);
    }

    fn enqueue_draw_command(
        &mut self,
        drawer: &mut BatchCommandDrawer<V>,
        start_index: u32,
        primitive_count: u32,
        sort_key: u32,
        data: D,
    ) -> BatchResult<()>;

    /// Submit whatever is buffered. The bracket stays open.
    fn flush(&mut self, drawer: &mut BatchCommandDrawer<V>) -> BatchResult<()>;

    /// Flush, then release the bracket context.
    ///
    /// The context is released even when the flush fails, and whatever the
    /// failed flush left buffered is discarded.
    fn end(&mut self, drawer: &mut BatchCommandDrawer<V>) -> BatchResult<()> {
        let result = self.flush(drawer);
        if result.is_err() {
            self.discard();
        }
        drawer.end();
        result
    }

    /// Commands waiting for the next flush.
    fn buffered_count(&self) -> usize {
        0
    }

    /// Drop buffered commands without drawing them.
    fn discard(&mut self) {}
}
