//! Native command recording for [`CommandBuffer::Vulkan`](crate::backend::CommandBuffer).

use ash::vk::{self, Handle};

use crate::backend::RenderPassBegin;
use crate::graph::PipelineBarrier;
use crate::types::{BufferInfo, Extent2d, ImageLayout, ImageViewInfo};

use super::conversion::{
    convert_access_flags, convert_clear_value, convert_image_aspect, convert_image_layout,
    convert_pipeline_stages, convert_subresource_range,
};

/// Record a `vkCmdPipelineBarrier` carrying every barrier of the batch.
pub fn record_pipeline_barrier(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    barrier: &PipelineBarrier,
) {
    let memory_barriers: Vec<vk::MemoryBarrier> = barrier
        .memory_barriers
        .iter()
        .map(|b| {
            vk::MemoryBarrier::default()
                .src_access_mask(convert_access_flags(b.src_access))
                .dst_access_mask(convert_access_flags(b.dst_access))
        })
        .collect();

    let buffer_barriers: Vec<vk::BufferMemoryBarrier> = barrier
        .buffer_barriers
        .iter()
        .map(|b| {
            vk::BufferMemoryBarrier::default()
                .src_access_mask(convert_access_flags(b.src.access))
                .dst_access_mask(convert_access_flags(b.dst.access))
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .buffer(vk::Buffer::from_raw(b.buffer.as_raw()))
                .offset(0)
                .size(vk::WHOLE_SIZE)
        })
        .collect();

    let image_barriers: Vec<vk::ImageMemoryBarrier> = barrier
        .image_barriers
        .iter()
        .map(|b| {
            vk::ImageMemoryBarrier::default()
                .old_layout(convert_image_layout(b.src.layout))
                .new_layout(convert_image_layout(b.dst.layout))
                .src_access_mask(convert_access_flags(b.src.access))
                .dst_access_mask(convert_access_flags(b.dst.access))
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(vk::Image::from_raw(b.image.as_raw()))
                .subresource_range(convert_subresource_range(&b.range, b.aspect))
        })
        .collect();

    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            convert_pipeline_stages(barrier.src_stages),
            convert_pipeline_stages(barrier.dst_stages),
            vk::DependencyFlags::empty(),
            &memory_barriers,
            &buffer_barriers,
            &image_barriers,
        );
    }
}

/// Record a `vkCmdBeginRenderPass` with inline contents.
pub fn record_begin_render_pass(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    begin: &RenderPassBegin,
) {
    let clear_values: Vec<vk::ClearValue> = begin
        .clear_values
        .iter()
        .map(|value| convert_clear_value(*value))
        .collect();

    let info = vk::RenderPassBeginInfo::default()
        .render_pass(vk::RenderPass::from_raw(begin.render_pass.as_raw()))
        .framebuffer(vk::Framebuffer::from_raw(begin.framebuffer.as_raw()))
        .render_area(vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: begin.render_area.width,
                height: begin.render_area.height,
            },
        })
        .clear_values(&clear_values);

    unsafe {
        device.cmd_begin_render_pass(cmd, &info, vk::SubpassContents::INLINE);
    }
}

/// Record a copy between the base mip levels of two views.
pub fn record_copy_image(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    src: &ImageViewInfo,
    dst: &ImageViewInfo,
    extent: Extent2d,
) {
    let layers = |view: &ImageViewInfo| vk::ImageSubresourceLayers {
        aspect_mask: convert_image_aspect(view.format().aspect()),
        mip_level: view.range.base_mip,
        base_array_layer: view.range.base_layer,
        layer_count: view.range.layer_count.min(src.range.layer_count),
    };

    let region = vk::ImageCopy {
        src_subresource: layers(src),
        src_offset: vk::Offset3D::default(),
        dst_subresource: layers(dst),
        dst_offset: vk::Offset3D::default(),
        extent: vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        },
    };

    unsafe {
        device.cmd_copy_image(
            cmd,
            vk::Image::from_raw(src.image.handle.as_raw()),
            convert_image_layout(ImageLayout::TransferSrc),
            vk::Image::from_raw(dst.image.handle.as_raw()),
            convert_image_layout(ImageLayout::TransferDst),
            &[region],
        );
    }
}

/// Record a copy of `size` bytes between two buffers.
pub fn record_copy_buffer(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    src: &BufferInfo,
    dst: &BufferInfo,
    size: u64,
) {
    let region = vk::BufferCopy {
        src_offset: 0,
        dst_offset: 0,
        size,
    };
    unsafe {
        device.cmd_copy_buffer(
            cmd,
            vk::Buffer::from_raw(src.handle.as_raw()),
            vk::Buffer::from_raw(dst.handle.as_raw()),
            &[region],
        );
    }
}
