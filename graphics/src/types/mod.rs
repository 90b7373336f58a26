//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage flags, descriptor structs and
//! the synchronization vocabulary used throughout the frame graph.

mod buffer;
mod common;
mod handles;
mod image;
mod sync;

pub use buffer::{BufferDescriptor, BufferInfo, BufferUsage};
pub use common::{AttachmentLoadOp, ClearValue, Extent2d, LoadOp};
pub use handles::{BufferHandle, FramebufferHandle, ImageHandle, ImageViewHandle, RenderPassHandle};
pub use image::{
    Format, ImageDescriptor, ImageInfo, ImageSubresourceRange, ImageUsage, ImageViewInfo,
};
pub use sync::{AccessFlags, ImageAspect, ImageLayout, PipelineStages, QueueFamilyClass};
