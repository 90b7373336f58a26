//! Vulkan backend using ash.
//!
//! The backend wraps a logical device created by the application and builds
//! images, views, buffers, render passes and framebuffers for the frame
//! graph. Memory comes from gpu-allocator.
//!
//! Instance, device, queue and swapchain management stay with the
//! application: swapchain images enter the graph as external image views.

mod allocator;
pub mod command;
pub mod conversion;

use std::sync::Arc;

use ash::vk::{self, Handle};
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::Allocator;
use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::graph::{FramebufferKey, RenderPassKey};
use crate::types::{
    BufferDescriptor, ImageDescriptor, ImageInfo, ImageLayout, ImageSubresourceRange,
};

use super::{
    CommandBuffer, GpuBackend, GpuBuffer, GpuFramebuffer, GpuImage, GpuImageView, GpuRenderPass,
};
use conversion::{
    convert_access_flags, convert_buffer_usage, convert_format, convert_image_layout,
    convert_image_usage, convert_load_op, convert_pipeline_stages, convert_subresource_range,
};

/// Vulkan GPU backend.
pub struct VulkanBackend {
    device: ash::Device,
    allocator: Arc<Mutex<Allocator>>,
}

impl std::fmt::Debug for VulkanBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanBackend")
            .field("device", &self.device.handle())
            .finish_non_exhaustive()
    }
}

impl VulkanBackend {
    /// Create a backend on an existing logical device.
    ///
    /// The device must outlive the backend and every object it created.
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
    ) -> Result<Self, GraphicsError> {
        let allocator = allocator::create_allocator(instance, physical_device, device.clone())?;
        log::info!("Vulkan frame graph backend created");
        Ok(Self {
            device,
            allocator: Arc::new(Mutex::new(allocator)),
        })
    }

    /// The logical device.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Wrap a command buffer in the recording state.
    pub fn command_buffer(&self, cmd: vk::CommandBuffer) -> CommandBuffer {
        CommandBuffer::vulkan(self.device.clone(), cmd)
    }
}

fn map_vk_error(what: &str, result: vk::Result) -> GraphicsError {
    match result {
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
            GraphicsError::OutOfMemory
        }
        vk::Result::ERROR_DEVICE_LOST => GraphicsError::DeviceLost,
        other => GraphicsError::ResourceCreationFailed(format!(
            "Failed to create {}: {:?}",
            what, other
        )),
    }
}

impl GpuBackend for VulkanBackend {
    fn name(&self) -> &'static str {
        "Vulkan Backend (ash)"
    }

    fn create_image(&self, descriptor: &ImageDescriptor) -> Result<GpuImage, GraphicsError> {
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(convert_format(descriptor.format))
            .extent(vk::Extent3D {
                width: descriptor.extent.width,
                height: descriptor.extent.height,
                depth: 1,
            })
            .mip_levels(descriptor.mip_count)
            .array_layers(descriptor.layer_count)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(convert_image_usage(descriptor.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { self.device.create_image(&image_info, None) }
            .map_err(|e| map_vk_error("image", e))?;

        let requirements = unsafe { self.device.get_image_memory_requirements(image) };
        let allocation = match allocator::allocate(
            &self.allocator,
            "frame graph image",
            requirements,
            MemoryLocation::GpuOnly,
            false,
        ) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                return Err(e);
            }
        };

        // From here on the GpuImage owns both and frees them on error.
        let gpu_image = GpuImage::Vulkan {
            device: self.device.clone(),
            allocator: Arc::clone(&self.allocator),
            image,
            allocation: Some(allocation),
            descriptor: *descriptor,
        };

        if let GpuImage::Vulkan {
            allocation: Some(allocation),
            ..
        } = &gpu_image
        {
            unsafe {
                self.device
                    .bind_image_memory(image, allocation.memory(), allocation.offset())
            }
            .map_err(|e| map_vk_error("image memory binding", e))?;
        }

        log::trace!(
            "VulkanBackend: created image {:?} {:?} {}x{}",
            image,
            descriptor.format,
            descriptor.extent.width,
            descriptor.extent.height
        );
        Ok(gpu_image)
    }

    fn create_image_view(
        &self,
        image: &ImageInfo,
        range: &ImageSubresourceRange,
    ) -> Result<GpuImageView, GraphicsError> {
        let view_type = if range.layer_count > 1 {
            vk::ImageViewType::TYPE_2D_ARRAY
        } else {
            vk::ImageViewType::TYPE_2D
        };

        let view_info = vk::ImageViewCreateInfo::default()
            .image(vk::Image::from_raw(image.handle.as_raw()))
            .view_type(view_type)
            .format(convert_format(image.descriptor.format))
            .components(vk::ComponentMapping::default())
            .subresource_range(convert_subresource_range(
                range,
                image.descriptor.format.aspect(),
            ));

        let view = unsafe { self.device.create_image_view(&view_info, None) }
            .map_err(|e| map_vk_error("image view", e))?;

        Ok(GpuImageView::Vulkan {
            device: self.device.clone(),
            view,
            image: *image,
            range: *range,
        })
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError> {
        let buffer_info = vk::BufferCreateInfo::default()
            .size(descriptor.size)
            .usage(convert_buffer_usage(descriptor.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { self.device.create_buffer(&buffer_info, None) }
            .map_err(|e| map_vk_error("buffer", e))?;

        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };
        let allocation = match allocator::allocate(
            &self.allocator,
            "frame graph buffer",
            requirements,
            allocator::buffer_memory_location(descriptor.usage),
            true,
        ) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let gpu_buffer = GpuBuffer::Vulkan {
            device: self.device.clone(),
            allocator: Arc::clone(&self.allocator),
            buffer,
            allocation: Some(allocation),
            descriptor: *descriptor,
        };

        if let GpuBuffer::Vulkan {
            allocation: Some(allocation),
            ..
        } = &gpu_buffer
        {
            unsafe {
                self.device
                    .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
            }
            .map_err(|e| map_vk_error("buffer memory binding", e))?;
        }

        Ok(gpu_buffer)
    }

    fn create_render_pass(&self, key: &RenderPassKey) -> Result<GpuRenderPass, GraphicsError> {
        let attachments: Vec<vk::AttachmentDescription> = key
            .attachments()
            .map(|attachment| {
                let load_op = convert_load_op(attachment.load_op);
                let stencil_load_op = if attachment.format.has_stencil() {
                    load_op
                } else {
                    vk::AttachmentLoadOp::DONT_CARE
                };
                vk::AttachmentDescription::default()
                    .format(convert_format(attachment.format))
                    .samples(vk::SampleCountFlags::TYPE_1)
                    .load_op(load_op)
                    .store_op(vk::AttachmentStoreOp::STORE)
                    .stencil_load_op(stencil_load_op)
                    .stencil_store_op(if attachment.format.has_stencil() {
                        vk::AttachmentStoreOp::STORE
                    } else {
                        vk::AttachmentStoreOp::DONT_CARE
                    })
                    .initial_layout(convert_image_layout(attachment.initial_layout()))
                    .final_layout(convert_image_layout(attachment.final_layout()))
            })
            .collect();

        let color_refs: Vec<vk::AttachmentReference> = (0..key.color_attachments.len())
            .map(|index| vk::AttachmentReference {
                attachment: index as u32,
                layout: convert_image_layout(ImageLayout::ColorAttachment),
            })
            .collect();
        let depth_ref = vk::AttachmentReference {
            attachment: key.color_attachments.len() as u32,
            layout: convert_image_layout(ImageLayout::DepthStencilAttachment),
        };

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if key.depth_attachment.is_some() {
            subpass = subpass.depth_stencil_attachment(&depth_ref);
        }

        let dependencies: Vec<vk::SubpassDependency> = key
            .external_dependency()
            .map(|dep| {
                vk::SubpassDependency::default()
                    .src_subpass(vk::SUBPASS_EXTERNAL)
                    .dst_subpass(0)
                    .src_stage_mask(convert_pipeline_stages(dep.src_stages))
                    .dst_stage_mask(convert_pipeline_stages(dep.dst_stages))
                    .src_access_mask(convert_access_flags(dep.src_access))
                    .dst_access_mask(convert_access_flags(dep.dst_access))
            })
            .into_iter()
            .collect();

        let info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(&dependencies);

        let render_pass = unsafe { self.device.create_render_pass(&info, None) }
            .map_err(|e| map_vk_error("render pass", e))?;

        log::trace!(
            "VulkanBackend: created render pass {:?} ({} attachments)",
            render_pass,
            attachments.len()
        );
        Ok(GpuRenderPass::Vulkan {
            device: self.device.clone(),
            render_pass,
        })
    }

    fn create_framebuffer(&self, key: &FramebufferKey) -> Result<GpuFramebuffer, GraphicsError> {
        let views: Vec<vk::ImageView> = key
            .attachments
            .iter()
            .map(|view| vk::ImageView::from_raw(view.as_raw()))
            .collect();

        let info = vk::FramebufferCreateInfo::default()
            .render_pass(vk::RenderPass::from_raw(key.render_pass.as_raw()))
            .attachments(&views)
            .width(key.extent.width)
            .height(key.extent.height)
            .layers(1);

        let framebuffer = unsafe { self.device.create_framebuffer(&info, None) }
            .map_err(|e| map_vk_error("framebuffer", e))?;

        Ok(GpuFramebuffer::Vulkan {
            device: self.device.clone(),
            framebuffer,
        })
    }
}
