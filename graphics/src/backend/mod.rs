//! GPU backend abstraction layer.
//!
//! The frame graph never allocates memory or builds native objects itself.
//! It asks a [`GpuBackend`] for them and holds the returned owned objects in
//! its caches. Dropping an object destroys the native resource.
//!
//! # Available Backends
//!
//! - [`DummyBackend`]: no GPU, hands out counter handles. Used by tests.
//! - `VulkanBackend` (`vulkan-backend` feature): native objects through `ash`
//!   with memory from `gpu-allocator`.

pub mod command;
pub mod dummy;

#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

#[cfg(feature = "vulkan-backend")]
use std::sync::Arc;

#[cfg(feature = "vulkan-backend")]
use ash::vk;
#[cfg(feature = "vulkan-backend")]
use gpu_allocator::vulkan::{Allocation, Allocator};
#[cfg(feature = "vulkan-backend")]
use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::graph::{FramebufferKey, RenderPassKey};
use crate::types::{
    BufferDescriptor, BufferHandle, BufferInfo, FramebufferHandle, ImageDescriptor, ImageHandle,
    ImageInfo, ImageSubresourceRange, ImageViewHandle, ImageViewInfo, RenderPassHandle,
};

pub use command::{CommandBuffer, CommandLog, RecordedCommand, RenderPassBegin};
pub use dummy::DummyBackend;

/// Resource factory the frame graph builds native objects with.
pub trait GpuBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Create an image with memory bound.
    fn create_image(&self, descriptor: &ImageDescriptor) -> Result<GpuImage, GraphicsError>;

    /// Create a view of `range` of `image`.
    fn create_image_view(
        &self,
        image: &ImageInfo,
        range: &ImageSubresourceRange,
    ) -> Result<GpuImageView, GraphicsError>;

    /// Create a buffer with memory bound.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError>;

    /// Create a single-subpass render-pass object.
    fn create_render_pass(&self, key: &RenderPassKey) -> Result<GpuRenderPass, GraphicsError>;

    /// Create a framebuffer binding views to a render pass.
    fn create_framebuffer(&self, key: &FramebufferKey) -> Result<GpuFramebuffer, GraphicsError>;
}

/// An owned GPU image.
pub enum GpuImage {
    /// Dummy backend (no GPU allocation)
    Dummy {
        handle: ImageHandle,
        descriptor: ImageDescriptor,
    },
    /// Vulkan backend image
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        image: vk::Image,
        allocation: Option<Allocation>,
        descriptor: ImageDescriptor,
    },
}

impl GpuImage {
    /// Native handle.
    pub fn handle(&self) -> ImageHandle {
        match self {
            Self::Dummy { handle, .. } => *handle,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { image, .. } => ImageHandle::from_raw(vk::Handle::as_raw(*image)),
        }
    }

    /// Descriptor the image was created with.
    pub fn descriptor(&self) -> &ImageDescriptor {
        match self {
            Self::Dummy { descriptor, .. } => descriptor,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { descriptor, .. } => descriptor,
        }
    }

    /// Handle and descriptor as a plain value.
    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            handle: self.handle(),
            descriptor: *self.descriptor(),
        }
    }
}

impl std::fmt::Debug for GpuImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy { handle, descriptor } => f
                .debug_struct("GpuImage::Dummy")
                .field("handle", handle)
                .field("descriptor", descriptor)
                .finish(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan {
                image, descriptor, ..
            } => f
                .debug_struct("GpuImage::Vulkan")
                .field("image", image)
                .field("descriptor", descriptor)
                .finish_non_exhaustive(),
        }
    }
}

/// An owned GPU image view.
pub enum GpuImageView {
    /// Dummy backend view
    Dummy {
        handle: ImageViewHandle,
        image: ImageInfo,
        range: ImageSubresourceRange,
    },
    /// Vulkan backend view
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        view: vk::ImageView,
        image: ImageInfo,
        range: ImageSubresourceRange,
    },
}

impl GpuImageView {
    /// Native handle.
    pub fn handle(&self) -> ImageViewHandle {
        match self {
            Self::Dummy { handle, .. } => *handle,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { view, .. } => ImageViewHandle::from_raw(vk::Handle::as_raw(*view)),
        }
    }

    /// Handle, image and range as a plain value.
    pub fn info(&self) -> ImageViewInfo {
        let (image, range) = match self {
            Self::Dummy { image, range, .. } => (*image, *range),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { image, range, .. } => (*image, *range),
        };
        ImageViewInfo {
            handle: self.handle(),
            image,
            range,
        }
    }
}

impl std::fmt::Debug for GpuImageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let info = self.info();
        f.debug_struct("GpuImageView")
            .field("handle", &info.handle)
            .field("image", &info.image.handle)
            .field("range", &info.range)
            .finish()
    }
}

/// An owned GPU buffer.
pub enum GpuBuffer {
    /// Dummy backend (no GPU allocation)
    Dummy {
        handle: BufferHandle,
        descriptor: BufferDescriptor,
    },
    /// Vulkan backend buffer
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        buffer: vk::Buffer,
        allocation: Option<Allocation>,
        descriptor: BufferDescriptor,
    },
}

impl GpuBuffer {
    /// Native handle.
    pub fn handle(&self) -> BufferHandle {
        match self {
            Self::Dummy { handle, .. } => *handle,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { buffer, .. } => BufferHandle::from_raw(vk::Handle::as_raw(*buffer)),
        }
    }

    /// Descriptor the buffer was created with.
    pub fn descriptor(&self) -> &BufferDescriptor {
        match self {
            Self::Dummy { descriptor, .. } => descriptor,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { descriptor, .. } => descriptor,
        }
    }

    /// Handle and descriptor as a plain value.
    pub fn info(&self) -> BufferInfo {
        BufferInfo {
            handle: self.handle(),
            descriptor: *self.descriptor(),
        }
    }
}

impl std::fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("handle", &self.handle())
            .field("descriptor", self.descriptor())
            .finish()
    }
}

/// An owned render-pass object.
pub enum GpuRenderPass {
    /// Dummy backend render pass
    Dummy { handle: RenderPassHandle },
    /// Vulkan backend render pass
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        render_pass: vk::RenderPass,
    },
}

impl GpuRenderPass {
    /// Native handle.
    pub fn handle(&self) -> RenderPassHandle {
        match self {
            Self::Dummy { handle } => *handle,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { render_pass, .. } => {
                RenderPassHandle::from_raw(vk::Handle::as_raw(*render_pass))
            }
        }
    }
}

impl std::fmt::Debug for GpuRenderPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GpuRenderPass").field(&self.handle()).finish()
    }
}

/// An owned framebuffer object.
pub enum GpuFramebuffer {
    /// Dummy backend framebuffer
    Dummy { handle: FramebufferHandle },
    /// Vulkan backend framebuffer
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        framebuffer: vk::Framebuffer,
    },
}

impl GpuFramebuffer {
    /// Native handle.
    pub fn handle(&self) -> FramebufferHandle {
        match self {
            Self::Dummy { handle } => *handle,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { framebuffer, .. } => {
                FramebufferHandle::from_raw(vk::Handle::as_raw(*framebuffer))
            }
        }
    }
}

impl std::fmt::Debug for GpuFramebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GpuFramebuffer").field(&self.handle()).finish()
    }
}

// ============================================================================
// Vulkan Resource Cleanup (Drop implementations)
// ============================================================================

#[cfg(feature = "vulkan-backend")]
fn free_allocation(allocator: &Mutex<Allocator>, allocation: Option<Allocation>) {
    if let Some(allocation) = allocation {
        if let Err(e) = allocator.lock().free(allocation) {
            log::error!("Failed to free GPU allocation: {}", e);
        }
    }
}

#[cfg(feature = "vulkan-backend")]
impl Drop for GpuImage {
    fn drop(&mut self) {
        if let GpuImage::Vulkan {
            device,
            allocator,
            image,
            allocation,
            ..
        } = self
        {
            unsafe {
                device.destroy_image(*image, None);
            }
            free_allocation(allocator, allocation.take());
        }
    }
}

#[cfg(feature = "vulkan-backend")]
impl Drop for GpuImageView {
    fn drop(&mut self) {
        if let GpuImageView::Vulkan { device, view, .. } = self {
            unsafe {
                device.destroy_image_view(*view, None);
            }
        }
    }
}

#[cfg(feature = "vulkan-backend")]
impl Drop for GpuBuffer {
    fn drop(&mut self) {
        if let GpuBuffer::Vulkan {
            device,
            allocator,
            buffer,
            allocation,
            ..
        } = self
        {
            unsafe {
                device.destroy_buffer(*buffer, None);
            }
            free_allocation(allocator, allocation.take());
        }
    }
}

#[cfg(feature = "vulkan-backend")]
impl Drop for GpuRenderPass {
    fn drop(&mut self) {
        if let GpuRenderPass::Vulkan {
            device,
            render_pass,
        } = self
        {
            unsafe {
                device.destroy_render_pass(*render_pass, None);
            }
        }
    }
}

#[cfg(feature = "vulkan-backend")]
impl Drop for GpuFramebuffer {
    fn drop(&mut self) {
        if let GpuFramebuffer::Vulkan {
            device,
            framebuffer,
        } = self
        {
            unsafe {
                device.destroy_framebuffer(*framebuffer, None);
            }
        }
    }
}
