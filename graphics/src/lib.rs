//! # Lilium Frame Graph
//!
//! A frame graph over an explicit graphics API.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`FrameGraph`] - ordered tasks over image, view and buffer proxies, with
//!   automatic barrier derivation and transient resource pooling
//! - [`access`] - access-pattern tables mapping usage types to stages,
//!   access masks and layouts
//! - [`resources`] - structurally keyed caches for transient resources
//! - [`GpuBackend`] - the resource factory, with a Vulkan implementation and
//!   a dummy one for testing
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lilium_framegraph::{CommandBuffer, ComputePassDesc, DummyBackend, FrameGraph};
//!
//! let mut graph = FrameGraph::new(Arc::new(DummyBackend::new()));
//! graph.add_compute_pass(ComputePassDesc::new().with_record(|_, cmd| cmd.dispatch(8, 8, 1)));
//!
//! let mut cmd = CommandBuffer::dummy();
//! let stats = graph.execute(&mut cmd)?;
//! ```

pub mod access;
pub mod backend;
pub mod error;
pub mod graph;
pub mod resources;
pub mod types;

// Re-export main types for convenience
pub use access::{BufferUsageType, ImageUsageType};
pub use backend::{CommandBuffer, CommandLog, DummyBackend, GpuBackend, RecordedCommand};
pub use error::GraphicsError;
pub use graph::{
    AttachmentDesc, BufferProxyId, BufferProxyUnique, ComputePassDesc, FrameGraph,
    FrameGraphConfig, FrameStats, ImageProxyId, ImageProxyUnique, ImageViewProxyId,
    ImageViewProxyUnique, PassContext, PipelineBarrier, RenderPassDesc, TaskKind,
    TransferPassDesc,
};
pub use types::{
    BufferDescriptor, BufferInfo, BufferUsage, ClearValue, Extent2d, Format, ImageDescriptor,
    ImageInfo, ImageSubresourceRange, ImageUsage, ImageViewInfo, LoadOp,
};

#[cfg(feature = "vulkan-backend")]
pub use backend::vulkan::VulkanBackend;

/// Frame graph library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the frame graph library.
pub fn init() {
    lilium_core::init();
    log::info!("Lilium Frame Graph v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy Backend");
    }
}
