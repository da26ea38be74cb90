//! Graphics context and wgpu device tests. All need a GPU.

use std::sync::Arc;

use sprig_batch::{
    Batch, BatchConfig, BatchSortMode, Effect, GraphicsContext, PrimitiveType, VertexPositionColor,
    WgpuGraphicsDevice,
};

#[test]
#[ignore] // Requires GPU - run with: cargo test --test context_tests -- --ignored
fn test_context_creation_sync() {
    match GraphicsContext::new_owned_sync() {
        Ok(ctx) => {
            assert_eq!(Arc::strong_count(&ctx), 1);
            assert!(ctx.limits().max_buffer_size > 0);
        }
        Err(e) => {
            // Allow test to pass if no GPU (CI environments)
            println!("GPU not available: {}", e);
        }
    }
}

#[test]
#[ignore] // Requires GPU
fn test_context_cleanup() {
    if let Ok(ctx) = GraphicsContext::new_owned_sync() {
        let weak = Arc::downgrade(&ctx);
        assert!(weak.upgrade().is_some());

        drop(ctx);
        assert!(weak.upgrade().is_none());
    }
}

#[test]
#[ignore] // Requires GPU
fn test_batch_records_into_wgpu_device() {
    let Ok(ctx) = GraphicsContext::new_owned_sync() else {
        return;
    };
    let device = Arc::new(WgpuGraphicsDevice::new(ctx.clone()));
    let mut batch = Batch::<VertexPositionColor>::new(device.clone(), BatchConfig::default()).unwrap();

    // An effect needs a pipeline; without a shader we can only check that an
    // empty bracket records nothing.
    let effect = Effect::new("empty");
    assert!(
        batch
            .begin(Arc::new(effect), PrimitiveType::TriangleList, BatchSortMode::Deferred)
            .is_err()
    );
    assert_eq!(device.recorded_len(), 0);

    batch.dispose().unwrap();
    device.collect_garbage();
}
