use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use redlilium_gl::{
    BufferType, ContextId, DeviceConfig, GlDevice, PixelFormat, Point2I, PrimitiveType, RectI,
    RecordingDriver, StateBlockDesc, TextureDescriptor, VertexElementType, VertexFormat,
    VertexSemantic,
};

fn position_format() -> VertexFormat {
    VertexFormat::new().with_element(VertexSemantic::Position, VertexElementType::Float3)
}

fn setup() -> (Arc<RecordingDriver>, GlDevice) {
    let driver = Arc::new(RecordingDriver::new());
    let mut device = GlDevice::new(driver.clone(), DeviceConfig::new().with_debug_output(false))
        .expect("Failed to create device");

    let window = device.alloc_window_target(ContextId(1), Point2I::new(1280, 720));
    device.set_active_render_target(window);
    let vb = device
        .alloc_vertex_buffer(1024, &position_format(), 12, BufferType::Static, None)
        .expect("Failed to create vertex buffer");
    let decl = device.alloc_vertex_decl(&position_format());
    device.set_vertex_buffer(Some(vb));
    device.set_vertex_decl(Some(decl));
    device.set_shader(None);
    (driver, device)
}

// ---------------------------------------------------------------------------
// Draw submission
// ---------------------------------------------------------------------------

fn bench_redundant_draws(c: &mut Criterion) {
    let (driver, mut device) = setup();
    c.bench_function("draw_100_unchanged_state", |b| {
        b.iter(|| {
            for _ in 0..100 {
                device.draw_primitive(PrimitiveType::TriangleList, 0, 300);
            }
            driver.clear_calls();
        });
    });
}

fn bench_state_block_switching(c: &mut Criterion) {
    let (driver, mut device) = setup();
    let opaque = device.create_state_block(&StateBlockDesc::default());
    let overlay = device.create_state_block(&StateBlockDesc::default().with_z_read_write(false, false));

    c.bench_function("draw_100_alternating_state_blocks", |b| {
        b.iter(|| {
            for i in 0..100 {
                device.set_state_block(if i % 2 == 0 { &opaque } else { &overlay });
                device.draw_primitive(PrimitiveType::TriangleList, 0, 300);
            }
            driver.clear_calls();
        });
    });
}

fn bench_texture_switching(c: &mut Criterion) {
    let (driver, mut device) = setup();
    let textures: Vec<_> = (0..8)
        .map(|_| {
            device
                .create_texture(&TextureDescriptor::new_2d(256, 256, PixelFormat::R8G8B8A8))
                .expect("Failed to create texture")
        })
        .collect();

    c.bench_function("draw_64_texture_switches", |b| {
        b.iter(|| {
            for i in 0..64 {
                device.set_texture(0, Some(textures[i % textures.len()].clone()));
                device.draw_primitive(PrimitiveType::TriangleList, 0, 2);
            }
            driver.clear_calls();
        });
    });
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

fn bench_volatile_allocation(c: &mut Criterion) {
    let (_driver, mut device) = setup();
    let format = position_format();

    c.bench_function("volatile_vertex_buffer_reuse", |b| {
        b.iter(|| {
            let vb = device
                .alloc_vertex_buffer(256, &format, 12, BufferType::Volatile, None)
                .expect("Failed to allocate volatile buffer");
            black_box(&vb);
        });
    });
}

fn bench_clip_rect(c: &mut Criterion) {
    let (_driver, mut device) = setup();
    c.bench_function("set_clip_rect", |b| {
        b.iter(|| {
            device.set_clip_rect(black_box(RectI::new(16, 16, 640, 360)));
        });
    });
}

fn bench_cycle_resources(c: &mut Criterion) {
    let (driver, mut device) = setup();
    let textures: Vec<_> = (0..32)
        .map(|_| {
            device
                .create_texture(&TextureDescriptor::new_2d(64, 64, PixelFormat::R8G8B8A8))
                .expect("Failed to create texture")
        })
        .collect();

    c.bench_function("cycle_resources_32_textures", |b| {
        b.iter(|| {
            black_box(device.cycle_resources());
            driver.clear_calls();
        });
    });
    drop(textures);
}

criterion_group!(
    benches,
    bench_redundant_draws,
    bench_state_block_switching,
    bench_texture_switching,
    bench_volatile_allocation,
    bench_clip_rect,
    bench_cycle_resources,
);
criterion_main!(benches);
