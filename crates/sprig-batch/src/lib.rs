//! Draw-command batching over wgpu.
//!
//! A [`Batch`] collects draw commands between `begin` and `end` and turns
//! them into as few device draw calls as possible. Consecutive commands
//! sharing a sort key and payload merge into one draw; in
//! [`BatchSortMode::DeferredSorted`] commands are drawn by descending sort
//! key. [`PrimitiveBatch`] additionally writes the geometry for each draw.
//!
//! Everything talks to the GPU through
//! [`GraphicsDevice`](sprig_test_utils::GraphicsDevice), implemented for
//! wgpu by [`WgpuGraphicsDevice`] and for tests by
//! `sprig_test_utils::MockGraphicsDevice`.

mod batch;
mod command;
mod config;
mod context;
mod drawer;
mod effect;
mod error;
mod geometry;
mod primitive;
mod primitive_batch;
pub mod queue;
mod vertex;
mod wgpu_device;

pub use batch::Batch;
pub use command::{BatchDrawCommand, BatchDrawCommandData, BatchSortMode, MaterialCommandData, TextureCommandData};
pub use config::BatchConfig;
pub use context::{GraphicsContext, GraphicsContextDescriptor, GraphicsError};
pub use drawer::{BatchCommandDrawer, BatchStats};
pub use effect::{
    Effect, EffectParameters, EffectPass, EffectTechnique, PROJECTION_BIND_GROUP, TEXTURE_BIND_GROUP,
};
pub use error::{BatchError, BatchResult};
pub use geometry::{GeometryBuffer, GeometryBufferDescriptor, GeometryBufferKind, GeometryRange, INDEX_FORMAT};
pub use primitive::PrimitiveType;
pub use primitive_batch::{PrimitiveBatch, QUAD_INDICES};
pub use vertex::{Vertex, VertexPositionColor, VertexPositionColorTexture};
pub use wgpu_device::WgpuGraphicsDevice;

pub use sprig_test_utils::{GpuBindGroup, GpuBuffer, GpuRenderPipeline, GraphicsDevice};
