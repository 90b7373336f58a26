//! Synchronization vocabulary: pipeline stages, memory access masks,
//! image layouts.
//!
//! These mirror the Vulkan concepts one-to-one but stay backend neutral so
//! the access-pattern tables and barrier derivation can be tested without a
//! device. `backend::vulkan::conversion` maps them to `ash` types.

use bitflags::bitflags;

bitflags! {
    /// Pipeline stages a barrier waits on or blocks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const DRAW_INDIRECT = 1 << 1;
        const VERTEX_INPUT = 1 << 2;
        const VERTEX_SHADER = 1 << 3;
        const FRAGMENT_SHADER = 1 << 4;
        const EARLY_FRAGMENT_TESTS = 1 << 5;
        const LATE_FRAGMENT_TESTS = 1 << 6;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 7;
        const COMPUTE_SHADER = 1 << 8;
        const TRANSFER = 1 << 9;
        const BOTTOM_OF_PIPE = 1 << 10;
        const ALL_GRAPHICS = 1 << 11;
        const ALL_COMMANDS = 1 << 12;
    }
}

bitflags! {
    /// Memory accesses made available or visible by a barrier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct AccessFlags: u32 {
        const INDIRECT_COMMAND_READ = 1 << 0;
        const INDEX_READ = 1 << 1;
        const VERTEX_ATTRIBUTE_READ = 1 << 2;
        const UNIFORM_READ = 1 << 3;
        const SHADER_READ = 1 << 4;
        const SHADER_WRITE = 1 << 5;
        const COLOR_ATTACHMENT_READ = 1 << 6;
        const COLOR_ATTACHMENT_WRITE = 1 << 7;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 8;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 9;
        const TRANSFER_READ = 1 << 10;
        const TRANSFER_WRITE = 1 << 11;
        const MEMORY_READ = 1 << 12;
        const MEMORY_WRITE = 1 << 13;
    }
}

impl Default for PipelineStages {
    fn default() -> Self {
        Self::empty()
    }
}

impl Default for AccessFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Image layout a subresource must be in for a given usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ImageLayout {
    /// Contents undefined; valid only as a transition source.
    #[default]
    Undefined,
    /// General layout (storage images).
    General,
    /// Optimal for color attachment writes.
    ColorAttachment,
    /// Optimal for depth/stencil attachment writes.
    DepthStencilAttachment,
    /// Optimal for shader sampling.
    ShaderReadOnly,
    /// Optimal for transfer source operations.
    TransferSrc,
    /// Optimal for transfer destination operations.
    TransferDst,
    /// Presentable to a swapchain.
    PresentSrc,
}

/// Aspects of an image covered by a view or barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageAspect {
    Color,
    Depth,
    DepthStencil,
}

/// Class of queue work on one side of a transition.
///
/// Every class is served by the single graphics-capable queue, so barriers
/// never carry a queue family ownership transfer. The class is kept for
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueueFamilyClass {
    Graphics,
    Compute,
    Transfer,
    Present,
}
