use sprig_core::profiling::profile_function;

use super::BatchCommandQueue;
use crate::command::{BatchDrawCommand, BatchDrawCommandData};
use crate::drawer::BatchCommandDrawer;
use crate::error::BatchResult;
use crate::vertex::Vertex;

/// Draws every command as it arrives. Commands never merge, so each enqueue
/// costs one upload and one draw per effect pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateQueue;

impl ImmediateQueue {
    pub fn new() -> Self {
        Self
    }
}

impl<V: Vertex, D: BatchDrawCommandData> BatchCommandQueue<V, D> for ImmediateQueue {
    fn enqueue_draw_command(
        &mut self,
        drawer: &mut BatchCommandDrawer<V>,
        start_index: u32,
        primitive_count: u32,
        sort_key: u32,
        data: D,
    ) -> BatchResult<()> {
        profile_function!();
        drawer.select_buffers()?;
        drawer.draw(BatchDrawCommand::new(start_index, primitive_count, sort_key, data))?;
        drawer.clear_geometry()
    }

    fn flush(&mut self, _drawer: &mut BatchCommandDrawer<V>) -> BatchResult<()> {
        Ok(())
    }
}
