//! Offscreen Quads: PrimitiveBatch on a real GPU
//!
//! Draws a grid of colored quads into an offscreen texture with a sorted
//! deferred batch, then reports how many draw calls the batch issued.
//!
//! Run with:
//!   cargo run -p sprig-batch --example offscreen_quads
//!
//! Set `SPRIG_PROFILE=1` to serve puffin data on 127.0.0.1:8585.

use std::sync::Arc;

use glam::{Vec3, Vec4};
use sprig_batch::{
    BatchConfig, BatchSortMode, Effect, GpuRenderPipeline, GraphicsContext, PrimitiveBatch, PrimitiveType,
    Vertex, VertexPositionColor, WgpuGraphicsDevice,
};
use sprig_core::config::{Config, ProfilingMode};
use sprig_core::logging;
use sprig_core::profiling::{apply_mode, new_frame, profile_scope};

const SIZE: u32 = 256;
const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

const SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

fn create_pipeline(ctx: &GraphicsContext) -> wgpu::RenderPipeline {
    let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Flat Color Shader"),
        source: wgpu::ShaderSource::Wgsl(SHADER.into()),
    });
    let layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Flat Color Pipeline Layout"),
        bind_group_layouts: &[],
        push_constant_ranges: &[],
    });

    ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Flat Color Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[VertexPositionColor::layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: FORMAT,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: PrimitiveType::TriangleList.to_wgpu(),
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn quad(x: f32, y: f32, size: f32, color: Vec4) -> [VertexPositionColor; 4] {
    [
        VertexPositionColor::new(Vec3::new(x, y, 0.0), color),
        VertexPositionColor::new(Vec3::new(x + size, y, 0.0), color),
        VertexPositionColor::new(Vec3::new(x, y - size, 0.0), color),
        VertexPositionColor::new(Vec3::new(x + size, y - size, 0.0), color),
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let profiling = if std::env::var_os("SPRIG_PROFILE").is_some() {
        ProfilingMode::WithWebserver
    } else {
        ProfilingMode::Off
    };
    let config = Config::default().with_profiling(profiling);
    logging::try_init(&config).map_err(|e| e.to_string())?;
    apply_mode(config.profiling);

    let ctx = GraphicsContext::new_owned_sync()?;
    let device = Arc::new(WgpuGraphicsDevice::new(ctx.clone()));

    let target = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Target"),
        size: wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let effect = Arc::new(Effect::single_pass(
        "flat",
        GpuRenderPipeline::from_wgpu(create_pipeline(&ctx)),
    ));
    let mut batch = PrimitiveBatch::<VertexPositionColor>::new(device.clone(), BatchConfig::default())?;

    new_frame();
    {
        profile_scope!("batch_quads");
        batch.begin(effect, PrimitiveType::TriangleList, BatchSortMode::DeferredSorted)?;
        for row in 0..16 {
            for col in 0..16 {
                let x = -1.0 + col as f32 * 0.125;
                let y = 1.0 - row as f32 * 0.125;
                let color = Vec4::new(col as f32 / 15.0, row as f32 / 15.0, 0.5, 1.0);
                // Rows share a layer, so each row collapses into a single draw
                batch.draw_quad(quad(x, y, 0.1, color), row, ())?;
            }
        }
        batch.end()?;
    }

    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Offscreen Encoder"),
    });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Offscreen Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        device.replay(&mut pass);
    }
    ctx.queue.submit(Some(encoder.finish()));
    let _ = ctx.device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: None,
    });
    device.collect_garbage();

    let stats = batch.stats();
    tracing::info!(
        "Drew {} quads in {} draw calls ({} commands merged)",
        stats.primitives_drawn / 2,
        stats.draw_calls,
        stats.merged_commands
    );

    batch.dispose()?;
    Ok(())
}
