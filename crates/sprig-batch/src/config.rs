//! Construction-time configuration for batches.

use crate::error::{BatchError, BatchResult};
use crate::geometry::{GeometryBufferDescriptor, GeometryBufferKind};

/// Configuration for a [`Batch`](crate::Batch).
///
/// # Example
///
/// ```
/// use sprig_batch::{BatchConfig, GeometryBufferKind};
///
/// let config = BatchConfig::default()
///     .with_maximum_commands_count(512)
///     .with_geometry_capacity(4096, 6144)
///     .with_geometry_kind(GeometryBufferKind::Dynamic);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum number of distinct (non-merged) commands buffered per flush
    /// by the deferred queue.
    pub maximum_commands_count: usize,
    /// Geometry buffer owned by the batch.
    pub geometry: GeometryBufferDescriptor,
}

impl BatchConfig {
    pub const DEFAULT_MAXIMUM_COMMANDS_COUNT: usize = 2048;

    pub fn with_maximum_commands_count(mut self, maximum_commands_count: usize) -> Self {
        self.maximum_commands_count = maximum_commands_count;
        self
    }

    pub fn with_geometry_capacity(mut self, max_vertices: usize, max_indices: usize) -> Self {
        self.geometry.max_vertices = max_vertices;
        self.geometry.max_indices = max_indices;
        self
    }

    pub fn with_geometry_kind(mut self, kind: GeometryBufferKind) -> Self {
        self.geometry.kind = kind;
        self
    }

    pub fn with_label(mut self, label: &'static str) -> Self {
        self.geometry.label = Some(label);
        self
    }

    /// Check the configuration without creating any GPU resources.
    pub fn validate(&self) -> BatchResult<()> {
        if self.maximum_commands_count == 0 {
            return Err(BatchError::InvalidArgument(
                "maximum_commands_count must be greater than zero".to_string(),
            ));
        }
        self.geometry.validate()
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            maximum_commands_count: Self::DEFAULT_MAXIMUM_COMMANDS_COUNT,
            geometry: GeometryBufferDescriptor::default(),
        }
    }
}
