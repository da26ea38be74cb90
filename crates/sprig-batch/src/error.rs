//! Errors raised by the batching engine.
//!
//! Every variant describes an integration bug (protocol misuse, undersized
//! capacity, bad arguments) rather than a runtime condition, so nothing in
//! this crate retries or recovers from them.

/// Errors that can occur while batching draw commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// An operation that requires an open bracket was called outside of one.
    NotBegun {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// `begin` was called while a bracket is already open.
    AlreadyBegun,

    /// More distinct draw commands were enqueued than the deferred queue holds.
    CapacityExceeded {
        /// The configured maximum number of buffered commands.
        maximum: usize,
    },

    /// The geometry buffer cannot hold the requested vertices/indices.
    GeometryFull {
        requested_vertices: usize,
        requested_indices: usize,
        remaining_vertices: usize,
        remaining_indices: usize,
    },

    /// An argument was rejected at the call that received it.
    InvalidArgument(String),

    /// The operation is not valid for the object's current configuration.
    InvalidOperation(String),

    /// The resource has been disposed.
    Disposed {
        /// Which resource was used after disposal.
        resource: &'static str,
    },
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchError::NotBegun { operation } => {
                write!(f, "`begin` must be called before `{}`", operation)
            }
            BatchError::AlreadyBegun => {
                write!(f, "`begin` cannot be called again until `end` has been called")
            }
            BatchError::CapacityExceeded { maximum } => write!(
                f,
                "The maximum number of draw commands ({}) has been reached; flush more often or raise the capacity",
                maximum
            ),
            BatchError::GeometryFull {
                requested_vertices,
                requested_indices,
                remaining_vertices,
                remaining_indices,
            } => write!(
                f,
                "Geometry buffer is full: requested {} vertices / {} indices but only {} / {} remain",
                requested_vertices, requested_indices, remaining_vertices, remaining_indices
            ),
            BatchError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            BatchError::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            BatchError::Disposed { resource } => {
                write!(f, "Cannot use {} after it has been disposed", resource)
            }
        }
    }
}

impl std::error::Error for BatchError {}

/// Result type for batching operations.
pub type BatchResult<T> = Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message_includes_maximum() {
        let err = BatchError::CapacityExceeded { maximum: 2048 };
        assert!(err.to_string().contains("2048"));
    }

    #[test]
    fn test_not_begun_names_operation() {
        let err = BatchError::NotBegun {
            operation: "enqueue_draw_command",
        };
        assert_eq!(
            err.to_string(),
            "`begin` must be called before `enqueue_draw_command`"
        );
    }

    #[test]
    fn test_geometry_full_display() {
        let err = BatchError::GeometryFull {
            requested_vertices: 8,
            requested_indices: 12,
            remaining_vertices: 4,
            remaining_indices: 6,
        };
        assert_eq!(
            err.to_string(),
            "Geometry buffer is full: requested 8 vertices / 12 indices but only 4 / 6 remain"
        );
    }
}
