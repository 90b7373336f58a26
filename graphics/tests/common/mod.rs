//! Common utilities for frame graph integration tests.
//!
//! Every test runs against the dummy backend, which hands out counter
//! handles and records commands into a [`CommandLog`].

#![allow(dead_code)]

use std::sync::Arc;

use rstest::fixture;

use lilium_framegraph::types::{ImageHandle, ImageViewHandle};
use lilium_framegraph::{
    CommandBuffer, CommandLog, DummyBackend, Format, FrameGraph, FrameGraphConfig, GpuBackend,
    ImageDescriptor, ImageInfo, ImageUsage, ImageViewInfo, PipelineBarrier, RecordedCommand,
};

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A frame graph on a dummy backend whose creation counters stay visible.
pub struct TestContext {
    pub backend: Arc<DummyBackend>,
    pub graph: FrameGraph,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_backend(DummyBackend::new())
    }

    pub fn with_backend(backend: DummyBackend) -> Self {
        init_logging();
        let backend = Arc::new(backend);
        let shared: Arc<dyn GpuBackend> = backend.clone();
        let config = FrameGraphConfig::new()
            .with_label("test graph")
            .with_overlap_validation(true);
        Self {
            backend,
            graph: FrameGraph::with_config(shared, config),
        }
    }

    /// Execute the graph into a fresh dummy command buffer.
    pub fn execute(&mut self) -> (lilium_framegraph::FrameStats, CommandBuffer) {
        let mut cmd = CommandBuffer::dummy();
        let stats = self.graph.execute(&mut cmd).expect("frame should execute");
        (stats, cmd)
    }

    /// A fake caller-owned 2D view covering the whole image.
    pub fn external_view(&self, descriptor: ImageDescriptor) -> ImageViewInfo {
        ImageViewInfo {
            handle: ImageViewHandle::from_raw(self.backend.allocate_handle()),
            image: ImageInfo {
                handle: ImageHandle::from_raw(self.backend.allocate_handle()),
                descriptor,
            },
            range: descriptor.full_range(),
        }
    }
}

#[fixture]
pub fn ctx() -> TestContext {
    TestContext::new()
}

/// 512x512 RGBA8 color target that can also be sampled.
pub fn color_target() -> ImageDescriptor {
    ImageDescriptor::new_2d(
        Format::Rgba8Unorm,
        512,
        512,
        ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED | ImageUsage::STORAGE,
    )
}

/// 512x512 depth target.
pub fn depth_target() -> ImageDescriptor {
    ImageDescriptor::new_2d(
        Format::Depth32Float,
        512,
        512,
        ImageUsage::DEPTH_STENCIL_ATTACHMENT,
    )
}

pub fn command_log(cmd: &CommandBuffer) -> &CommandLog {
    cmd.log().expect("dummy command buffer")
}

pub fn barriers(cmd: &CommandBuffer) -> Vec<PipelineBarrier> {
    command_log(cmd).pipeline_barriers().cloned().collect()
}

/// Short names of the recorded commands, for order assertions.
pub fn command_names(cmd: &CommandBuffer) -> Vec<&'static str> {
    command_log(cmd)
        .commands()
        .iter()
        .map(|command| match command {
            RecordedCommand::PipelineBarrier(_) => "barrier",
            RecordedCommand::BeginRenderPass(_) => "begin",
            RecordedCommand::EndRenderPass => "end",
            RecordedCommand::Draw { .. } => "draw",
            RecordedCommand::DrawIndexed { .. } => "draw_indexed",
            RecordedCommand::Dispatch { .. } => "dispatch",
            RecordedCommand::CopyImage { .. } => "copy_image",
            RecordedCommand::CopyBuffer { .. } => "copy_buffer",
            RecordedCommand::BindVertexBuffer { .. } => "bind_vertex_buffer",
            RecordedCommand::Marker(_) => "marker",
        })
        .collect()
}
