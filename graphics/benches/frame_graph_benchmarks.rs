use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use lilium_framegraph::{
    AttachmentDesc, BufferUsage, ClearValue, CommandBuffer, ComputePassDesc, DummyBackend, Format,
    FrameGraph, ImageDescriptor, ImageSubresourceRange, ImageUsage, RenderPassDesc,
};

fn color_target(mips: u32) -> ImageDescriptor {
    ImageDescriptor::new_2d(
        Format::Rgba16Float,
        1920,
        1080,
        ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED | ImageUsage::STORAGE,
    )
    .with_mip_count(mips)
}

// ---------------------------------------------------------------------------
// Full frames
// ---------------------------------------------------------------------------

/// Render, post-process and present one target.
fn bench_scenario_frame(c: &mut Criterion) {
    let mut graph = FrameGraph::new(Arc::new(DummyBackend::new()));
    c.bench_function("frame_graph_render_compute_present", |b| {
        b.iter(|| {
            let image = graph.add_image(color_target(1));
            let view = graph.add_full_image_view(&image);
            graph.add_render_pass(RenderPassDesc::new().with_color_attachments([
                AttachmentDesc::new(&view).with_clear(ClearValue::color(0.0, 0.0, 0.0, 1.0)),
            ]));
            graph.add_compute_pass(ComputePassDesc::new().with_input_images([view.id()]));
            graph.add_image_present(&view);

            let mut cmd = CommandBuffer::dummy();
            black_box(graph.execute(&mut cmd).unwrap());
        });
    });
}

/// A 32-pass chain ping-ponging between two targets with a storage buffer.
fn bench_pass_chain(c: &mut Criterion) {
    let mut graph = FrameGraph::new(Arc::new(DummyBackend::new()));
    c.bench_function("frame_graph_32_pass_chain", |b| {
        b.iter(|| {
            let ping = graph.add_image(color_target(1));
            let pong = graph.add_image(color_target(1));
            let ping_view = graph.add_full_image_view(&ping);
            let pong_view = graph.add_full_image_view(&pong);
            let params = graph.add_buffer::<[f32; 4]>(64, BufferUsage::STORAGE);

            for i in 0..32 {
                let (src, dst) = if i % 2 == 0 {
                    (&ping_view, &pong_view)
                } else {
                    (&pong_view, &ping_view)
                };
                if i % 4 == 3 {
                    graph.add_compute_pass(
                        ComputePassDesc::new()
                            .with_input_images([src.id()])
                            .with_storage_images([dst.id()])
                            .with_storage_buffers([params.id()]),
                    );
                } else {
                    graph.add_render_pass(
                        RenderPassDesc::new()
                            .with_input_images([src.id()])
                            .with_input_buffers([params.id()])
                            .with_color_attachments([AttachmentDesc::new(dst)]),
                    );
                }
            }

            let mut cmd = CommandBuffer::dummy();
            black_box(graph.execute(&mut cmd).unwrap());
        });
    });
}

/// Generate a mip chain: every level reads the previous one.
fn bench_mip_chain(c: &mut Criterion) {
    let mut graph = FrameGraph::new(Arc::new(DummyBackend::new()));
    c.bench_function("frame_graph_mip_chain_11_levels", |b| {
        b.iter(|| {
            let image = graph.add_image(color_target(11));
            let mips: Vec<_> = (0..11)
                .map(|mip| graph.add_image_view(&image, ImageSubresourceRange::single(mip, 0)))
                .collect();
            for pair in mips.windows(2) {
                graph.add_compute_pass(
                    ComputePassDesc::new()
                        .with_input_images([pair[0].id()])
                        .with_storage_images([pair[1].id()]),
                );
            }

            let mut cmd = CommandBuffer::dummy();
            black_box(graph.execute(&mut cmd).unwrap());
        });
    });
}

criterion_group!(benches, bench_scenario_frame, bench_pass_chain, bench_mip_chain);
criterion_main!(benches);
