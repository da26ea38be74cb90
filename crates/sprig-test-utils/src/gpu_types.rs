//! GPU resource handles that can be real or mock.
//!
//! Handles are cheap to clone and compare by identity: two handles are equal
//! only when they were cloned from the same resource. The batching engine
//! relies on this to decide whether two draw commands share state.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

fn next_handle_id() -> u64 {
    NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Wrapper around a GPU buffer that can be real or mock.
///
/// Users hold an owned `GpuBuffer`; cloning is cheap since wgpu handles are
/// reference counted internally.
#[derive(Clone, Debug)]
pub struct GpuBuffer {
    inner: GpuBufferInner,
}

#[derive(Clone, Debug)]
enum GpuBufferInner {
    Real { id: u64, buffer: wgpu::Buffer },
    #[cfg(feature = "mock")]
    Mock { id: usize, size: u64 },
}

impl GpuBuffer {
    /// Create from real WGPU buffer
    pub fn from_wgpu(buffer: wgpu::Buffer) -> Self {
        Self {
            inner: GpuBufferInner::Real {
                id: next_handle_id(),
                buffer,
            },
        }
    }

    /// Create mock buffer (for testing)
    #[cfg(feature = "mock")]
    pub fn mock(id: usize, size: u64) -> Self {
        Self {
            inner: GpuBufferInner::Mock { id, size },
        }
    }

    /// Size of the buffer in bytes.
    pub fn size(&self) -> u64 {
        match &self.inner {
            GpuBufferInner::Real { buffer, .. } => buffer.size(),
            #[cfg(feature = "mock")]
            GpuBufferInner::Mock { size, .. } => *size,
        }
    }

    /// Get the underlying wgpu::Buffer (if real)
    ///
    /// # Panics
    /// Panics if this is a mock buffer (test code should never call this)
    pub fn as_wgpu(&self) -> &wgpu::Buffer {
        match &self.inner {
            GpuBufferInner::Real { buffer, .. } => buffer,
            #[cfg(feature = "mock")]
            GpuBufferInner::Mock { .. } => {
                panic!("Attempted to get wgpu::Buffer from mock buffer - this is a test-only buffer")
            }
        }
    }

    /// Check if this is a mock (useful in tests)
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuBufferInner::Mock { .. })
    }

    /// Get mock ID (for test assertions)
    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        match &self.inner {
            GpuBufferInner::Mock { id, .. } => Some(*id),
            _ => None,
        }
    }
}

impl PartialEq for GpuBuffer {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (GpuBufferInner::Real { id: a, .. }, GpuBufferInner::Real { id: b, .. }) => a == b,
            #[cfg(feature = "mock")]
            (GpuBufferInner::Mock { id: a, .. }, GpuBufferInner::Mock { id: b, .. }) => a == b,
            #[cfg(feature = "mock")]
            _ => false,
        }
    }
}

impl Eq for GpuBuffer {}

/// Wrapper around a render pipeline that can be real or mock.
#[derive(Clone, Debug)]
pub struct GpuRenderPipeline {
    inner: GpuRenderPipelineInner,
}

#[derive(Clone, Debug)]
enum GpuRenderPipelineInner {
    Real {
        id: u64,
        pipeline: wgpu::RenderPipeline,
    },
    #[cfg(feature = "mock")]
    Mock { id: usize },
}

impl GpuRenderPipeline {
    /// Create from real WGPU render pipeline
    pub fn from_wgpu(pipeline: wgpu::RenderPipeline) -> Self {
        Self {
            inner: GpuRenderPipelineInner::Real {
                id: next_handle_id(),
                pipeline,
            },
        }
    }

    /// Create mock render pipeline (for testing)
    #[cfg(feature = "mock")]
    pub fn mock(id: usize) -> Self {
        Self {
            inner: GpuRenderPipelineInner::Mock { id },
        }
    }

    /// Get the underlying wgpu::RenderPipeline (if real)
    ///
    /// # Panics
    /// Panics if this is a mock pipeline
    pub fn as_wgpu(&self) -> &wgpu::RenderPipeline {
        match &self.inner {
            GpuRenderPipelineInner::Real { pipeline, .. } => pipeline,
            #[cfg(feature = "mock")]
            GpuRenderPipelineInner::Mock { .. } => {
                panic!("Attempted to get wgpu::RenderPipeline from mock")
            }
        }
    }

    /// Check if this is a mock
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuRenderPipelineInner::Mock { .. })
    }

    /// Get mock ID (for test assertions)
    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        match &self.inner {
            GpuRenderPipelineInner::Mock { id } => Some(*id),
            _ => None,
        }
    }
}

impl PartialEq for GpuRenderPipeline {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (
                GpuRenderPipelineInner::Real { id: a, .. },
                GpuRenderPipelineInner::Real { id: b, .. },
            ) => a == b,
            #[cfg(feature = "mock")]
            (GpuRenderPipelineInner::Mock { id: a }, GpuRenderPipelineInner::Mock { id: b }) => {
                a == b
            }
            #[cfg(feature = "mock")]
            _ => false,
        }
    }
}

impl Eq for GpuRenderPipeline {}

/// Wrapper around a bind group that can be real or mock.
///
/// Textures reach the batching engine as bind groups, so this is the handle
/// draw-command payloads carry around.
#[derive(Clone, Debug)]
pub struct GpuBindGroup {
    inner: GpuBindGroupInner,
}

#[derive(Clone, Debug)]
enum GpuBindGroupInner {
    Real {
        id: u64,
        bind_group: wgpu::BindGroup,
    },
    #[cfg(feature = "mock")]
    Mock { id: usize },
}

impl GpuBindGroup {
    /// Create from real WGPU bind group
    pub fn from_wgpu(bind_group: wgpu::BindGroup) -> Self {
        Self {
            inner: GpuBindGroupInner::Real {
                id: next_handle_id(),
                bind_group,
            },
        }
    }

    /// Create mock bind group (for testing)
    #[cfg(feature = "mock")]
    pub fn mock(id: usize) -> Self {
        Self {
            inner: GpuBindGroupInner::Mock { id },
        }
    }

    /// Get the underlying wgpu::BindGroup (if real)
    ///
    /// # Panics
    /// Panics if this is a mock bind group
    pub fn as_wgpu(&self) -> &wgpu::BindGroup {
        match &self.inner {
            GpuBindGroupInner::Real { bind_group, .. } => bind_group,
            #[cfg(feature = "mock")]
            GpuBindGroupInner::Mock { .. } => {
                panic!("Attempted to get wgpu::BindGroup from mock")
            }
        }
    }

    /// Check if this is a mock
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuBindGroupInner::Mock { .. })
    }

    /// Get mock ID (for test assertions)
    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        match &self.inner {
            GpuBindGroupInner::Mock { id } => Some(*id),
            _ => None,
        }
    }
}

impl PartialEq for GpuBindGroup {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (GpuBindGroupInner::Real { id: a, .. }, GpuBindGroupInner::Real { id: b, .. }) => {
                a == b
            }
            #[cfg(feature = "mock")]
            (GpuBindGroupInner::Mock { id: a }, GpuBindGroupInner::Mock { id: b }) => a == b,
            #[cfg(feature = "mock")]
            _ => false,
        }
    }
}

impl Eq for GpuBindGroup {}
