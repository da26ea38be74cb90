//! Graphics device abstraction and test utilities for sprig.
//!
//! This crate provides the device seam the batching engine submits to,
//! together with a mock implementation for testing without a GPU.
//!
//! # Overview
//!
//! - [`GraphicsDevice`] - Trait abstracting buffer upload, binding and indexed draws
//! - `MockGraphicsDevice` - Recording implementation for tests (requires `mock` feature)
//! - GPU handle types (`GpuBuffer`, `GpuRenderPipeline`, `GpuBindGroup`) - Can be real or mock
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use sprig_test_utils::{GraphicsDevice, MockGraphicsDevice};
//! use wgpu::*;
//!
//! let mock = MockGraphicsDevice::new();
//!
//! let buffer = mock.create_buffer(&BufferDescriptor {
//!     label: Some("test_buffer"),
//!     size: 1024,
//!     usage: BufferUsages::INDEX,
//!     mapped_at_creation: false,
//! });
//! mock.set_index_buffer(&buffer, IndexFormat::Uint32);
//! mock.draw_indexed(0..6, 0);
//!
//! assert_eq!(mock.count_draws(), 1);
//! # }
//! ```
//!
//! # Design Philosophy
//!
//! ## 1. No Lifetimes
//!
//! All GPU handle types are owned and reference counted internally, so no
//! lifetime parameters leak into batch types.
//!
//! ## 2. Identity Equality
//!
//! Handles compare equal only when they refer to the same resource. Draw
//! command payloads built from handles inherit that contract.
//!
//! ## 3. Object Safety
//!
//! `GraphicsDevice` is object-safe, so batches hold an
//! `Arc<dyn GraphicsDevice>` and work against real or mock devices alike.

pub mod gpu_types;
pub mod graphics_device;
#[cfg(feature = "mock")]
pub mod mock_device;

// Re-export main types at crate root
pub use gpu_types::*;
pub use graphics_device::*;
#[cfg(feature = "mock")]
pub use mock_device::*;
