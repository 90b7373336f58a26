//! Access-pattern tables.
//!
//! A usage type names the role a subresource plays at one task. The tables
//! below translate a usage into the pipeline stages, memory accesses and
//! image layout on either side of a transition. Every transition the frame
//! graph emits is derived from these four functions.
//!
//! The source side describes work that already happened and must complete
//! (and whose writes must become available). The destination side describes
//! work about to happen that must wait.

use crate::types::{AccessFlags, ImageLayout, PipelineStages, QueueFamilyClass};

/// Role an image subresource plays at a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageUsageType {
    /// Nothing has touched the subresource yet; contents are undefined.
    None,
    /// Prior usage is not known. Only meaningful as a transition source.
    Unknown,
    /// Sampled or read from vertex/fragment shaders.
    GraphicsShaderRead,
    /// Read and written as a storage image from vertex/fragment shaders.
    GraphicsShaderReadWrite,
    /// Sampled or read from a compute shader.
    ComputeShaderRead,
    /// Read and written as a storage image from a compute shader.
    ComputeShaderReadWrite,
    /// Source of a copy.
    TransferSrc,
    /// Destination of a copy.
    TransferDst,
    /// Color attachment of a render pass.
    ColorAttachment,
    /// Depth/stencil attachment of a render pass.
    DepthAttachment,
    /// Handed to the presentation engine.
    Present,
}

impl ImageUsageType {
    /// Returns true if the usage never writes the subresource.
    pub fn is_read_only(self) -> bool {
        match self {
            Self::GraphicsShaderRead | Self::ComputeShaderRead | Self::TransferSrc => true,
            Self::None
            | Self::Unknown
            | Self::GraphicsShaderReadWrite
            | Self::ComputeShaderReadWrite
            | Self::TransferDst
            | Self::ColorAttachment
            | Self::DepthAttachment
            | Self::Present => false,
        }
    }

    /// Returns true for render-pass attachment usages.
    pub fn is_attachment(self) -> bool {
        matches!(self, Self::ColorAttachment | Self::DepthAttachment)
    }
}

/// Role a buffer plays at a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BufferUsageType {
    /// Nothing has touched the buffer yet.
    None,
    /// Prior usage is not known. Only meaningful as a transition source.
    Unknown,
    /// Read from vertex/fragment shaders.
    GraphicsShaderRead,
    /// Read and written from vertex/fragment shaders.
    GraphicsShaderReadWrite,
    /// Read from a compute shader.
    ComputeShaderRead,
    /// Read and written from a compute shader.
    ComputeShaderReadWrite,
    /// Source of a copy.
    TransferSrc,
    /// Destination of a copy.
    TransferDst,
}

/// Synchronization requirements of an image usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageAccessPattern {
    /// Stages that perform the access.
    pub stages: PipelineStages,
    /// Memory accesses performed.
    pub access: AccessFlags,
    /// Layout the subresource must be in.
    pub layout: ImageLayout,
    /// Queue work class performing the access.
    pub queue_family: QueueFamilyClass,
}

/// Synchronization requirements of a buffer usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferAccessPattern {
    /// Stages that perform the access.
    pub stages: PipelineStages,
    /// Memory accesses performed.
    pub access: AccessFlags,
    /// Queue work class performing the access.
    pub queue_family: QueueFamilyClass,
}

const GRAPHICS_SHADERS: PipelineStages =
    PipelineStages::VERTEX_SHADER.union(PipelineStages::FRAGMENT_SHADER);
const DEPTH_TESTS: PipelineStages =
    PipelineStages::EARLY_FRAGMENT_TESTS.union(PipelineStages::LATE_FRAGMENT_TESTS);
const SHADER_READ_WRITE: AccessFlags = AccessFlags::SHADER_READ.union(AccessFlags::SHADER_WRITE);

fn image_pattern(
    stages: PipelineStages,
    access: AccessFlags,
    layout: ImageLayout,
    queue_family: QueueFamilyClass,
) -> ImageAccessPattern {
    ImageAccessPattern {
        stages,
        access,
        layout,
        queue_family,
    }
}

fn buffer_pattern(
    stages: PipelineStages,
    access: AccessFlags,
    queue_family: QueueFamilyClass,
) -> BufferAccessPattern {
    BufferAccessPattern {
        stages,
        access,
        queue_family,
    }
}

/// Access pattern of the work that last used an image subresource.
pub fn src_image_access_pattern(usage: ImageUsageType) -> ImageAccessPattern {
    use QueueFamilyClass as Q;
    match usage {
        ImageUsageType::None => image_pattern(
            PipelineStages::TOP_OF_PIPE,
            AccessFlags::empty(),
            ImageLayout::Undefined,
            Q::Graphics,
        ),
        ImageUsageType::Unknown => image_pattern(
            PipelineStages::ALL_COMMANDS,
            AccessFlags::MEMORY_READ | AccessFlags::MEMORY_WRITE,
            ImageLayout::Undefined,
            Q::Graphics,
        ),
        ImageUsageType::GraphicsShaderRead => image_pattern(
            GRAPHICS_SHADERS,
            AccessFlags::SHADER_READ,
            ImageLayout::ShaderReadOnly,
            Q::Graphics,
        ),
        ImageUsageType::GraphicsShaderReadWrite => image_pattern(
            GRAPHICS_SHADERS,
            SHADER_READ_WRITE,
            ImageLayout::General,
            Q::Graphics,
        ),
        ImageUsageType::ComputeShaderRead => image_pattern(
            PipelineStages::COMPUTE_SHADER,
            AccessFlags::SHADER_READ,
            ImageLayout::ShaderReadOnly,
            Q::Compute,
        ),
        ImageUsageType::ComputeShaderReadWrite => image_pattern(
            PipelineStages::COMPUTE_SHADER,
            SHADER_READ_WRITE,
            ImageLayout::General,
            Q::Compute,
        ),
        ImageUsageType::TransferSrc => image_pattern(
            PipelineStages::TRANSFER,
            AccessFlags::TRANSFER_READ,
            ImageLayout::TransferSrc,
            Q::Transfer,
        ),
        ImageUsageType::TransferDst => image_pattern(
            PipelineStages::TRANSFER,
            AccessFlags::TRANSFER_WRITE,
            ImageLayout::TransferDst,
            Q::Transfer,
        ),
        ImageUsageType::ColorAttachment => image_pattern(
            PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            AccessFlags::COLOR_ATTACHMENT_WRITE,
            ImageLayout::ColorAttachment,
            Q::Graphics,
        ),
        ImageUsageType::DepthAttachment => image_pattern(
            DEPTH_TESTS,
            AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            ImageLayout::DepthStencilAttachment,
            Q::Graphics,
        ),
        ImageUsageType::Present => image_pattern(
            PipelineStages::BOTTOM_OF_PIPE,
            AccessFlags::empty(),
            ImageLayout::PresentSrc,
            Q::Present,
        ),
    }
}

/// Access pattern of the work about to use an image subresource.
///
/// # Panics
///
/// Panics for `None` and `Unknown`: a task always knows what it does.
pub fn dst_image_access_pattern(usage: ImageUsageType) -> ImageAccessPattern {
    use QueueFamilyClass as Q;
    match usage {
        ImageUsageType::None | ImageUsageType::Unknown => {
            panic!("{usage:?} is not a valid destination image usage")
        }
        ImageUsageType::GraphicsShaderRead => image_pattern(
            GRAPHICS_SHADERS,
            AccessFlags::SHADER_READ,
            ImageLayout::ShaderReadOnly,
            Q::Graphics,
        ),
        ImageUsageType::GraphicsShaderReadWrite => image_pattern(
            GRAPHICS_SHADERS,
            SHADER_READ_WRITE,
            ImageLayout::General,
            Q::Graphics,
        ),
        ImageUsageType::ComputeShaderRead => image_pattern(
            PipelineStages::COMPUTE_SHADER,
            AccessFlags::SHADER_READ,
            ImageLayout::ShaderReadOnly,
            Q::Compute,
        ),
        ImageUsageType::ComputeShaderReadWrite => image_pattern(
            PipelineStages::COMPUTE_SHADER,
            SHADER_READ_WRITE,
            ImageLayout::General,
            Q::Compute,
        ),
        ImageUsageType::TransferSrc => image_pattern(
            PipelineStages::TRANSFER,
            AccessFlags::TRANSFER_READ,
            ImageLayout::TransferSrc,
            Q::Transfer,
        ),
        ImageUsageType::TransferDst => image_pattern(
            PipelineStages::TRANSFER,
            AccessFlags::TRANSFER_WRITE,
            ImageLayout::TransferDst,
            Q::Transfer,
        ),
        ImageUsageType::ColorAttachment => image_pattern(
            PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE,
            ImageLayout::ColorAttachment,
            Q::Graphics,
        ),
        ImageUsageType::DepthAttachment => image_pattern(
            DEPTH_TESTS,
            AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            ImageLayout::DepthStencilAttachment,
            Q::Graphics,
        ),
        ImageUsageType::Present => image_pattern(
            PipelineStages::BOTTOM_OF_PIPE,
            AccessFlags::empty(),
            ImageLayout::PresentSrc,
            Q::Present,
        ),
    }
}

/// Access pattern of the work that last used a buffer.
pub fn src_buffer_access_pattern(usage: BufferUsageType) -> BufferAccessPattern {
    use QueueFamilyClass as Q;
    match usage {
        BufferUsageType::None => {
            buffer_pattern(PipelineStages::TOP_OF_PIPE, AccessFlags::empty(), Q::Graphics)
        }
        BufferUsageType::Unknown => buffer_pattern(
            PipelineStages::ALL_COMMANDS,
            AccessFlags::MEMORY_READ | AccessFlags::MEMORY_WRITE,
            Q::Graphics,
        ),
        BufferUsageType::GraphicsShaderRead => {
            buffer_pattern(GRAPHICS_SHADERS, AccessFlags::SHADER_READ, Q::Graphics)
        }
        BufferUsageType::GraphicsShaderReadWrite => {
            buffer_pattern(GRAPHICS_SHADERS, SHADER_READ_WRITE, Q::Graphics)
        }
        BufferUsageType::ComputeShaderRead => buffer_pattern(
            PipelineStages::COMPUTE_SHADER,
            AccessFlags::SHADER_READ,
            Q::Compute,
        ),
        BufferUsageType::ComputeShaderReadWrite => {
            buffer_pattern(PipelineStages::COMPUTE_SHADER, SHADER_READ_WRITE, Q::Compute)
        }
        BufferUsageType::TransferSrc => buffer_pattern(
            PipelineStages::TRANSFER,
            AccessFlags::TRANSFER_READ,
            Q::Transfer,
        ),
        BufferUsageType::TransferDst => buffer_pattern(
            PipelineStages::TRANSFER,
            AccessFlags::TRANSFER_WRITE,
            Q::Transfer,
        ),
    }
}

/// Access pattern of the work about to use a buffer.
///
/// # Panics
///
/// Panics for `None` and `Unknown`.
pub fn dst_buffer_access_pattern(usage: BufferUsageType) -> BufferAccessPattern {
    use QueueFamilyClass as Q;
    match usage {
        BufferUsageType::None | BufferUsageType::Unknown => {
            panic!("{usage:?} is not a valid destination buffer usage")
        }
        BufferUsageType::GraphicsShaderRead => buffer_pattern(
            PipelineStages::VERTEX_INPUT | GRAPHICS_SHADERS,
            AccessFlags::SHADER_READ
                | AccessFlags::UNIFORM_READ
                | AccessFlags::VERTEX_ATTRIBUTE_READ
                | AccessFlags::INDEX_READ,
            Q::Graphics,
        ),
        BufferUsageType::GraphicsShaderReadWrite => {
            buffer_pattern(GRAPHICS_SHADERS, SHADER_READ_WRITE, Q::Graphics)
        }
        BufferUsageType::ComputeShaderRead => buffer_pattern(
            PipelineStages::COMPUTE_SHADER,
            AccessFlags::SHADER_READ | AccessFlags::UNIFORM_READ,
            Q::Compute,
        ),
        BufferUsageType::ComputeShaderReadWrite => {
            buffer_pattern(PipelineStages::COMPUTE_SHADER, SHADER_READ_WRITE, Q::Compute)
        }
        BufferUsageType::TransferSrc => buffer_pattern(
            PipelineStages::TRANSFER,
            AccessFlags::TRANSFER_READ,
            Q::Transfer,
        ),
        BufferUsageType::TransferDst => buffer_pattern(
            PipelineStages::TRANSFER,
            AccessFlags::TRANSFER_WRITE,
            Q::Transfer,
        ),
    }
}

/// Returns true if moving an image subresource from `src` to `dst` needs a
/// barrier.
///
/// Only a read-only usage followed by the same read-only usage can skip it;
/// everything else, including a first use, gets one.
pub fn image_needs_barrier(src: ImageUsageType, dst: ImageUsageType) -> bool {
    !(src == dst && src.is_read_only())
}

/// Returns true if moving a buffer from `src` to `dst` needs a barrier.
///
/// Buffers have no layout, so a buffer nothing touched yet needs none.
/// Every other transition gets one.
pub fn buffer_needs_barrier(src: BufferUsageType, _dst: BufferUsageType) -> bool {
    src != BufferUsageType::None
}

#[cfg(test)]
mod tests {
    use super::*;

    const DST_IMAGE_USAGES: [ImageUsageType; 9] = [
        ImageUsageType::GraphicsShaderRead,
        ImageUsageType::GraphicsShaderReadWrite,
        ImageUsageType::ComputeShaderRead,
        ImageUsageType::ComputeShaderReadWrite,
        ImageUsageType::TransferSrc,
        ImageUsageType::TransferDst,
        ImageUsageType::ColorAttachment,
        ImageUsageType::DepthAttachment,
        ImageUsageType::Present,
    ];

    #[test]
    fn test_src_and_dst_layouts_agree() {
        for usage in DST_IMAGE_USAGES {
            assert_eq!(
                src_image_access_pattern(usage).layout,
                dst_image_access_pattern(usage).layout,
                "{usage:?}"
            );
            assert_eq!(
                src_image_access_pattern(usage).stages,
                dst_image_access_pattern(usage).stages,
                "{usage:?}"
            );
        }
    }

    #[test]
    fn test_destination_stages_are_never_empty() {
        for usage in DST_IMAGE_USAGES {
            assert!(!dst_image_access_pattern(usage).stages.is_empty(), "{usage:?}");
        }
    }

    #[test]
    fn test_unknown_source_is_conservative() {
        let pattern = src_image_access_pattern(ImageUsageType::Unknown);
        assert_eq!(pattern.stages, PipelineStages::ALL_COMMANDS);
        assert!(pattern.access.contains(AccessFlags::MEMORY_WRITE));
        assert_eq!(pattern.layout, ImageLayout::Undefined);

        let pattern = src_buffer_access_pattern(BufferUsageType::Unknown);
        assert_eq!(pattern.stages, PipelineStages::ALL_COMMANDS);
    }

    #[test]
    fn test_none_source_waits_on_nothing() {
        let pattern = src_image_access_pattern(ImageUsageType::None);
        assert_eq!(pattern.stages, PipelineStages::TOP_OF_PIPE);
        assert!(pattern.access.is_empty());
        assert_eq!(pattern.layout, ImageLayout::Undefined);
    }

    #[test]
    fn test_attachment_patterns() {
        let color = dst_image_access_pattern(ImageUsageType::ColorAttachment);
        assert_eq!(color.layout, ImageLayout::ColorAttachment);
        assert_eq!(color.stages, PipelineStages::COLOR_ATTACHMENT_OUTPUT);

        let depth = src_image_access_pattern(ImageUsageType::DepthAttachment);
        assert_eq!(depth.layout, ImageLayout::DepthStencilAttachment);
        assert!(depth.access.contains(AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE));
    }

    #[test]
    #[should_panic(expected = "not a valid destination")]
    fn test_unknown_destination_panics() {
        dst_image_access_pattern(ImageUsageType::Unknown);
    }

    #[test]
    #[should_panic(expected = "not a valid destination")]
    fn test_none_buffer_destination_panics() {
        dst_buffer_access_pattern(BufferUsageType::None);
    }

    #[test]
    fn test_image_barrier_rules() {
        use ImageUsageType as U;
        assert!(!image_needs_barrier(U::GraphicsShaderRead, U::GraphicsShaderRead));
        assert!(!image_needs_barrier(U::TransferSrc, U::TransferSrc));
        assert!(image_needs_barrier(U::GraphicsShaderRead, U::ComputeShaderRead));
        assert!(image_needs_barrier(U::ComputeShaderReadWrite, U::ComputeShaderReadWrite));
        assert!(image_needs_barrier(U::ColorAttachment, U::ColorAttachment));
        assert!(image_needs_barrier(U::None, U::GraphicsShaderRead));
        assert!(image_needs_barrier(U::Unknown, U::GraphicsShaderRead));
    }

    #[test]
    fn test_buffer_barrier_rules() {
        use BufferUsageType as U;
        assert!(!buffer_needs_barrier(U::None, U::ComputeShaderReadWrite));
        assert!(buffer_needs_barrier(U::ComputeShaderRead, U::ComputeShaderRead));
        assert!(buffer_needs_barrier(U::Unknown, U::TransferSrc));
        assert!(buffer_needs_barrier(U::TransferDst, U::GraphicsShaderRead));
    }
}
