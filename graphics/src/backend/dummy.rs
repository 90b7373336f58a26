//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It hands out unique
//! handles from a counter and counts how many objects of each kind it built,
//! which is what cache and barrier tests need to observe.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::error::GraphicsError;
use crate::graph::{FramebufferKey, RenderPassKey};
use crate::types::{
    BufferDescriptor, BufferHandle, FramebufferHandle, ImageDescriptor, ImageHandle, ImageInfo,
    ImageSubresourceRange, ImageViewHandle, RenderPassHandle,
};

use super::{GpuBackend, GpuBuffer, GpuFramebuffer, GpuImage, GpuImageView, GpuRenderPass};

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    next_handle: AtomicU64,
    images: AtomicUsize,
    image_views: AtomicUsize,
    buffers: AtomicUsize,
    render_passes: AtomicUsize,
    framebuffers: AtomicUsize,
    image_budget: Option<usize>,
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self {
            // Zero is reserved as the null handle.
            next_handle: AtomicU64::new(1),
            images: AtomicUsize::new(0),
            image_views: AtomicUsize::new(0),
            buffers: AtomicUsize::new(0),
            render_passes: AtomicUsize::new(0),
            framebuffers: AtomicUsize::new(0),
            image_budget: None,
        }
    }

    /// Fail image creation with [`GraphicsError::OutOfMemory`] once `count`
    /// images exist.
    pub fn with_image_budget(mut self, count: usize) -> Self {
        self.image_budget = Some(count);
        self
    }

    /// Number of images created so far.
    pub fn created_images(&self) -> usize {
        self.images.load(Ordering::Relaxed)
    }

    /// Number of image views created so far.
    pub fn created_image_views(&self) -> usize {
        self.image_views.load(Ordering::Relaxed)
    }

    /// Number of buffers created so far.
    pub fn created_buffers(&self) -> usize {
        self.buffers.load(Ordering::Relaxed)
    }

    /// Number of render-pass objects created so far.
    pub fn created_render_passes(&self) -> usize {
        self.render_passes.load(Ordering::Relaxed)
    }

    /// Number of framebuffers created so far.
    pub fn created_framebuffers(&self) -> usize {
        self.framebuffers.load(Ordering::Relaxed)
    }

    /// Allocate a fresh raw handle value. Useful for faking external objects.
    pub fn allocate_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_image(&self, descriptor: &ImageDescriptor) -> Result<GpuImage, GraphicsError> {
        if let Some(budget) = self.image_budget {
            if self.created_images() >= budget {
                return Err(GraphicsError::OutOfMemory);
            }
        }
        log::trace!(
            "DummyBackend: creating image {:?} ({}x{}, {} mips, {} layers)",
            descriptor.format,
            descriptor.extent.width,
            descriptor.extent.height,
            descriptor.mip_count,
            descriptor.layer_count
        );
        self.images.fetch_add(1, Ordering::Relaxed);
        Ok(GpuImage::Dummy {
            handle: ImageHandle::from_raw(self.allocate_handle()),
            descriptor: *descriptor,
        })
    }

    fn create_image_view(
        &self,
        image: &ImageInfo,
        range: &ImageSubresourceRange,
    ) -> Result<GpuImageView, GraphicsError> {
        log::trace!(
            "DummyBackend: creating view of image {:?} ({:?})",
            image.handle,
            range
        );
        self.image_views.fetch_add(1, Ordering::Relaxed);
        Ok(GpuImageView::Dummy {
            handle: ImageViewHandle::from_raw(self.allocate_handle()),
            image: *image,
            range: *range,
        })
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError> {
        log::trace!(
            "DummyBackend: creating buffer (size: {}, usage: {:?})",
            descriptor.size,
            descriptor.usage
        );
        self.buffers.fetch_add(1, Ordering::Relaxed);
        Ok(GpuBuffer::Dummy {
            handle: BufferHandle::from_raw(self.allocate_handle()),
            descriptor: *descriptor,
        })
    }

    fn create_render_pass(&self, key: &RenderPassKey) -> Result<GpuRenderPass, GraphicsError> {
        log::trace!(
            "DummyBackend: creating render pass ({} color, depth: {})",
            key.color_attachments.len(),
            key.depth_attachment.is_some()
        );
        self.render_passes.fetch_add(1, Ordering::Relaxed);
        Ok(GpuRenderPass::Dummy {
            handle: RenderPassHandle::from_raw(self.allocate_handle()),
        })
    }

    fn create_framebuffer(&self, key: &FramebufferKey) -> Result<GpuFramebuffer, GraphicsError> {
        log::trace!(
            "DummyBackend: creating framebuffer {}x{} ({} attachments)",
            key.extent.width,
            key.extent.height,
            key.attachments.len()
        );
        self.framebuffers.fetch_add(1, Ordering::Relaxed);
        Ok(GpuFramebuffer::Dummy {
            handle: FramebufferHandle::from_raw(self.allocate_handle()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Format, ImageUsage};

    #[test]
    fn test_handles_are_unique() {
        let backend = DummyBackend::new();
        let desc = ImageDescriptor::new_2d(Format::Rgba8Unorm, 4, 4, ImageUsage::SAMPLED);
        let a = backend.create_image(&desc).unwrap();
        let b = backend.create_image(&desc).unwrap();
        assert_ne!(a.handle(), b.handle());
        assert_eq!(backend.created_images(), 2);
        assert_eq!(a.info().descriptor, desc);
    }

    #[test]
    fn test_image_budget() {
        let backend = DummyBackend::new().with_image_budget(1);
        let desc = ImageDescriptor::new_2d(Format::R8Unorm, 1, 1, ImageUsage::STORAGE);
        assert!(backend.create_image(&desc).is_ok());
        assert_eq!(
            backend.create_image(&desc).unwrap_err(),
            GraphicsError::OutOfMemory
        );
    }
}
