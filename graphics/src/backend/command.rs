//! Command recording sink handed to the frame graph and pass callbacks.

#[cfg(feature = "vulkan-backend")]
use ash::vk::{self, Handle};

use crate::graph::PipelineBarrier;
use crate::types::{
    BufferHandle, BufferInfo, ClearValue, Extent2d, FramebufferHandle, ImageHandle,
    ImageSubresourceRange, ImageViewInfo, RenderPassHandle,
};

/// Parameters of a render-pass begin.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassBegin {
    /// Render-pass object.
    pub render_pass: RenderPassHandle,
    /// Framebuffer bound to the pass.
    pub framebuffer: FramebufferHandle,
    /// Area rendered to, anchored at the origin.
    pub render_area: Extent2d,
    /// One entry per attachment (colors first, then depth). `None` for
    /// attachments that are not cleared.
    pub clear_values: Vec<Option<ClearValue>>,
}

/// A command captured by [`CommandBuffer::Dummy`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    PipelineBarrier(PipelineBarrier),
    BeginRenderPass(RenderPassBegin),
    EndRenderPass,
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    CopyImage {
        src: ImageHandle,
        src_range: ImageSubresourceRange,
        dst: ImageHandle,
        dst_range: ImageSubresourceRange,
        extent: Extent2d,
    },
    CopyBuffer {
        src: BufferHandle,
        dst: BufferHandle,
        size: u64,
    },
    BindVertexBuffer {
        binding: u32,
        buffer: BufferHandle,
        offset: u64,
    },
    /// Free-form marker pushed by pass callbacks.
    Marker(String),
}

/// Ordered list of commands recorded without a GPU.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    commands: Vec<RecordedCommand>,
}

impl CommandLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded commands in order.
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Recorded pipeline barriers in order.
    pub fn pipeline_barriers(&self) -> impl Iterator<Item = &PipelineBarrier> {
        self.commands.iter().filter_map(|command| match command {
            RecordedCommand::PipelineBarrier(barrier) => Some(barrier),
            _ => None,
        })
    }

    /// Total number of image barriers across all pipeline barriers.
    pub fn image_barrier_count(&self) -> usize {
        self.pipeline_barriers()
            .map(|barrier| barrier.image_barriers.len())
            .sum()
    }

    /// Total number of buffer barriers across all pipeline barriers.
    pub fn buffer_barrier_count(&self) -> usize {
        self.pipeline_barriers()
            .map(|barrier| barrier.buffer_barriers.len())
            .sum()
    }

    /// Forget every recorded command.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    fn push(&mut self, command: RecordedCommand) {
        log::trace!("CommandLog: {:?}", command);
        self.commands.push(command);
    }
}

/// A command buffer in the recording state.
pub enum CommandBuffer {
    /// Records into an in-memory [`CommandLog`].
    Dummy(CommandLog),
    /// Records into a native Vulkan command buffer.
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        device: ash::Device,
        cmd: vk::CommandBuffer,
    },
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy(log) => f
                .debug_struct("CommandBuffer::Dummy")
                .field("commands", &log.commands().len())
                .finish(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { cmd, .. } => f
                .debug_struct("CommandBuffer::Vulkan")
                .field("cmd", cmd)
                .finish_non_exhaustive(),
        }
    }
}

impl CommandBuffer {
    /// Create a command buffer that records into a [`CommandLog`].
    pub fn dummy() -> Self {
        Self::Dummy(CommandLog::new())
    }

    /// Wrap a native command buffer that is already in the recording state.
    #[cfg(feature = "vulkan-backend")]
    pub fn vulkan(device: ash::Device, cmd: vk::CommandBuffer) -> Self {
        Self::Vulkan { device, cmd }
    }

    /// The command log, for the dummy variant.
    pub fn log(&self) -> Option<&CommandLog> {
        match self {
            Self::Dummy(log) => Some(log),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { .. } => None,
        }
    }

    /// Raw device and command buffer, for callbacks that need the rest of
    /// the Vulkan API.
    #[cfg(feature = "vulkan-backend")]
    pub fn raw_vulkan(&self) -> Option<(&ash::Device, vk::CommandBuffer)> {
        match self {
            Self::Vulkan { device, cmd } => Some((device, *cmd)),
            Self::Dummy(_) => None,
        }
    }

    /// Record a pipeline barrier. Empty barriers are skipped.
    pub fn pipeline_barrier(&mut self, barrier: &PipelineBarrier) {
        if barrier.is_empty() {
            return;
        }
        match self {
            Self::Dummy(log) => log.push(RecordedCommand::PipelineBarrier(barrier.clone())),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { device, cmd } => {
                super::vulkan::command::record_pipeline_barrier(device, *cmd, barrier)
            }
        }
    }

    /// Begin a render pass with inline subpass contents.
    pub fn begin_render_pass(&mut self, begin: &RenderPassBegin) {
        match self {
            Self::Dummy(log) => log.push(RecordedCommand::BeginRenderPass(begin.clone())),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { device, cmd } => {
                super::vulkan::command::record_begin_render_pass(device, *cmd, begin)
            }
        }
    }

    /// End the current render pass.
    pub fn end_render_pass(&mut self) {
        match self {
            Self::Dummy(log) => log.push(RecordedCommand::EndRenderPass),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { device, cmd } => unsafe { device.cmd_end_render_pass(*cmd) },
        }
    }

    /// Draw non-indexed primitives.
    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        match self {
            Self::Dummy(log) => log.push(RecordedCommand::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            }),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { device, cmd } => unsafe {
                device.cmd_draw(*cmd, vertex_count, instance_count, first_vertex, first_instance)
            },
        }
    }

    /// Draw indexed primitives.
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        match self {
            Self::Dummy(log) => log.push(RecordedCommand::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            }),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { device, cmd } => unsafe {
                device.cmd_draw_indexed(
                    *cmd,
                    index_count,
                    instance_count,
                    first_index,
                    vertex_offset,
                    first_instance,
                )
            },
        }
    }

    /// Dispatch compute work groups.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        match self {
            Self::Dummy(log) => log.push(RecordedCommand::Dispatch { x, y, z }),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { device, cmd } => unsafe { device.cmd_dispatch(*cmd, x, y, z) },
        }
    }

    /// Copy the base mip level of `src` into the base mip level of `dst`.
    ///
    /// Both views must be in the transfer layouts, which a transfer pass
    /// that declares them guarantees.
    pub fn copy_image(&mut self, src: &ImageViewInfo, dst: &ImageViewInfo) {
        let extent = src.extent().min(dst.extent());
        match self {
            Self::Dummy(log) => log.push(RecordedCommand::CopyImage {
                src: src.image.handle,
                src_range: src.range,
                dst: dst.image.handle,
                dst_range: dst.range,
                extent,
            }),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { device, cmd } => {
                super::vulkan::command::record_copy_image(device, *cmd, src, dst, extent)
            }
        }
    }

    /// Copy `size` bytes from the start of `src` to the start of `dst`.
    pub fn copy_buffer(&mut self, src: &BufferInfo, dst: &BufferInfo, size: u64) {
        match self {
            Self::Dummy(log) => log.push(RecordedCommand::CopyBuffer {
                src: src.handle,
                dst: dst.handle,
                size,
            }),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { device, cmd } => {
                super::vulkan::command::record_copy_buffer(device, *cmd, src, dst, size)
            }
        }
    }

    /// Bind a vertex buffer.
    pub fn bind_vertex_buffer(&mut self, binding: u32, buffer: &BufferInfo, offset: u64) {
        match self {
            Self::Dummy(log) => log.push(RecordedCommand::BindVertexBuffer {
                binding,
                buffer: buffer.handle,
                offset,
            }),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { device, cmd } => unsafe {
                device.cmd_bind_vertex_buffers(
                    *cmd,
                    binding,
                    &[vk::Buffer::from_raw(buffer.handle.as_raw())],
                    &[offset],
                )
            },
        }
    }

    /// Push a marker into the dummy log. Native command buffers ignore it.
    pub fn marker(&mut self, text: impl Into<String>) {
        match self {
            Self::Dummy(log) => log.push(RecordedCommand::Marker(text.into())),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { .. } => {}
        }
    }
}
