//! Common types shared across the graphics system.

/// 2D extent (width and height in pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Extent2d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent2d {
    /// Create a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Component-wise minimum of two extents.
    pub fn min(self, other: Self) -> Self {
        Self::new(self.width.min(other.width), self.height.min(other.height))
    }
}

// ============================================================================
// Clear Values
// ============================================================================

/// Value an attachment is cleared to at the start of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Clear a color attachment with RGBA values.
    Color { r: f32, g: f32, b: f32, a: f32 },
    /// Clear a depth attachment.
    Depth(f32),
    /// Clear a depth and stencil attachment.
    DepthStencil { depth: f32, stencil: u32 },
}

impl ClearValue {
    /// Create a color clear value.
    pub fn color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Color { r, g, b, a }
    }

    /// Create a depth clear value.
    pub fn depth(value: f32) -> Self {
        Self::Depth(value)
    }
}

/// Operation to perform when loading an attachment at the start of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LoadOp {
    /// Clear the attachment with a specified value.
    Clear(ClearValue),
    /// Load the existing contents of the attachment.
    #[default]
    Load,
    /// Don't care about the existing contents (may be undefined).
    DontCare,
}

impl LoadOp {
    /// Create a clear operation with a color value.
    pub fn clear_color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Clear(ClearValue::color(r, g, b, a))
    }

    /// Create a clear operation with a depth value.
    pub fn clear_depth(depth: f32) -> Self {
        Self::Clear(ClearValue::depth(depth))
    }

    /// The load operation without its clear value.
    pub fn kind(&self) -> AttachmentLoadOp {
        match self {
            Self::Clear(_) => AttachmentLoadOp::Clear,
            Self::Load => AttachmentLoadOp::Load,
            Self::DontCare => AttachmentLoadOp::DontCare,
        }
    }

    /// The clear value, if this is a clear.
    pub fn clear_value(&self) -> Option<ClearValue> {
        match self {
            Self::Clear(value) => Some(*value),
            Self::Load | Self::DontCare => None,
        }
    }
}

/// Load operation as it appears in a render-pass object.
///
/// Clear values are supplied when the pass begins, so render passes that
/// only differ in clear color share one native object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttachmentLoadOp {
    /// Clear on load.
    Clear,
    /// Preserve existing contents.
    Load,
    /// Contents undefined.
    DontCare,
}
