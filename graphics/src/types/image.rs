//! Image types, descriptors and subresource ranges.

use bitflags::bitflags;

use super::{Extent2d, ImageAspect, ImageHandle, ImageViewHandle};

/// Image format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Format {
    // 8-bit formats
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,

    // 16-bit formats
    /// 8-bit RG channels, unsigned normalized.
    Rg8Unorm,
    /// 16-bit red channel, float.
    R16Float,

    // 32-bit formats
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit red channel, unsigned integer.
    R32Uint,
    /// 16-bit RG channels, float.
    Rg16Float,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA channels, sRGB.
    Bgra8UnormSrgb,

    // 64-bit formats
    /// 16-bit RGBA channels, float.
    Rgba16Float,

    // 128-bit formats
    /// 32-bit RGBA channels, float.
    Rgba32Float,

    // Depth/stencil formats
    /// 16-bit depth.
    Depth16Unorm,
    /// 32-bit depth, float.
    Depth32Float,
    /// 24-bit depth with 8-bit stencil.
    Depth24UnormStencil8,
    /// 32-bit depth float with 8-bit stencil.
    Depth32FloatStencil8,
}

impl Format {
    /// Returns true if this is a depth or depth/stencil format.
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm
                | Self::Depth32Float
                | Self::Depth24UnormStencil8
                | Self::Depth32FloatStencil8
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24UnormStencil8 | Self::Depth32FloatStencil8)
    }

    /// The aspects a view or barrier of this format covers.
    pub fn aspect(&self) -> ImageAspect {
        if self.has_stencil() {
            ImageAspect::DepthStencil
        } else if self.is_depth() {
            ImageAspect::Depth
        } else {
            ImageAspect::Color
        }
    }
}

bitflags! {
    /// Usage flags an image is created with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ImageUsage: u32 {
        /// Image can be copied from.
        const TRANSFER_SRC = 1 << 0;
        /// Image can be copied to.
        const TRANSFER_DST = 1 << 1;
        /// Image can be sampled in a shader.
        const SAMPLED = 1 << 2;
        /// Image can be bound as a storage image.
        const STORAGE = 1 << 3;
        /// Image can be used as a color attachment.
        const COLOR_ATTACHMENT = 1 << 4;
        /// Image can be used as a depth/stencil attachment.
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
    }
}

impl Default for ImageUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Structural description of an image.
///
/// This is the key transient images are pooled by: two requests with equal
/// descriptors may be served by the same native image on different frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageDescriptor {
    /// Pixel format.
    pub format: Format,
    /// Size of mip level 0.
    pub extent: Extent2d,
    /// Number of mip levels.
    pub mip_count: u32,
    /// Number of array layers.
    pub layer_count: u32,
    /// Usage flags.
    pub usage: ImageUsage,
}

impl ImageDescriptor {
    /// Create a descriptor for a single-mip, single-layer 2D image.
    pub fn new_2d(format: Format, width: u32, height: u32, usage: ImageUsage) -> Self {
        Self {
            format,
            extent: Extent2d::new(width, height),
            mip_count: 1,
            layer_count: 1,
            usage,
        }
    }

    /// Set the mip level count.
    pub fn with_mip_count(mut self, mip_count: u32) -> Self {
        self.mip_count = mip_count;
        self
    }

    /// Set the array layer count.
    pub fn with_layer_count(mut self, layer_count: u32) -> Self {
        self.layer_count = layer_count;
        self
    }

    /// The range covering every subresource of the image.
    pub fn full_range(&self) -> ImageSubresourceRange {
        ImageSubresourceRange::new(0, self.mip_count, 0, self.layer_count)
    }

    /// Size of the given mip level.
    pub fn mip_extent(&self, mip: u32) -> Extent2d {
        Extent2d::new(
            (self.extent.width >> mip).max(1),
            (self.extent.height >> mip).max(1),
        )
    }
}

/// A block of mip levels and array layers of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageSubresourceRange {
    /// First mip level.
    pub base_mip: u32,
    /// Number of mip levels.
    pub mip_count: u32,
    /// First array layer.
    pub base_layer: u32,
    /// Number of array layers.
    pub layer_count: u32,
}

impl ImageSubresourceRange {
    /// Create a range.
    pub const fn new(base_mip: u32, mip_count: u32, base_layer: u32, layer_count: u32) -> Self {
        Self {
            base_mip,
            mip_count,
            base_layer,
            layer_count,
        }
    }

    /// A range covering exactly one subresource.
    pub const fn single(mip: u32, layer: u32) -> Self {
        Self::new(mip, 1, layer, 1)
    }

    /// One past the last mip level.
    pub const fn end_mip(&self) -> u32 {
        self.base_mip + self.mip_count
    }

    /// One past the last array layer.
    pub const fn end_layer(&self) -> u32 {
        self.base_layer + self.layer_count
    }

    /// Returns true if this range covers no subresource.
    pub const fn is_empty(&self) -> bool {
        self.mip_count == 0 || self.layer_count == 0
    }

    /// Returns true if every subresource of `other` is also in `self`.
    ///
    /// Counts that run past `u32::MAX` are never contained.
    pub fn contains(&self, other: &ImageSubresourceRange) -> bool {
        let end = |base: u32, count: u32| u64::from(base) + u64::from(count);
        other.base_mip >= self.base_mip
            && end(other.base_mip, other.mip_count) <= end(self.base_mip, self.mip_count)
            && other.base_layer >= self.base_layer
            && end(other.base_layer, other.layer_count) <= end(self.base_layer, self.layer_count)
    }

    /// Returns true if the two ranges share at least one subresource.
    pub fn overlaps(&self, other: &ImageSubresourceRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.base_mip < other.end_mip()
            && other.base_mip < self.end_mip()
            && self.base_layer < other.end_layer()
            && other.base_layer < self.end_layer()
    }

    /// Returns true if (`mip`, `layer`) lies inside the range.
    pub fn contains_subresource(&self, mip: u32, layer: u32) -> bool {
        (self.base_mip..self.end_mip()).contains(&mip)
            && (self.base_layer..self.end_layer()).contains(&layer)
    }

    /// Iterate every (mip, layer) pair, mip-major.
    pub fn subresources(&self) -> impl Iterator<Item = (u32, u32)> {
        let layers = self.base_layer..self.end_layer();
        (self.base_mip..self.end_mip())
            .flat_map(move |mip| layers.clone().map(move |layer| (mip, layer)))
    }
}

/// A resolved image: native handle plus the descriptor it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageInfo {
    /// Native handle.
    pub handle: ImageHandle,
    /// Structural description.
    pub descriptor: ImageDescriptor,
}

/// A resolved image view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageViewInfo {
    /// Native handle of the view.
    pub handle: ImageViewHandle,
    /// The image the view was created from.
    pub image: ImageInfo,
    /// Subresources the view covers.
    pub range: ImageSubresourceRange,
}

impl ImageViewInfo {
    /// Size of the view's base mip level.
    pub fn extent(&self) -> Extent2d {
        self.image.descriptor.mip_extent(self.range.base_mip)
    }

    /// Format of the underlying image.
    pub fn format(&self) -> Format {
        self.image.descriptor.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_formats() {
        assert!(Format::Depth32Float.is_depth());
        assert!(!Format::Depth32Float.has_stencil());
        assert_eq!(Format::Depth24UnormStencil8.aspect(), ImageAspect::DepthStencil);
        assert_eq!(Format::Rgba8Unorm.aspect(), ImageAspect::Color);
    }

    #[test]
    fn test_range_contains_and_overlaps() {
        let full = ImageSubresourceRange::new(0, 4, 0, 6);
        let mip1 = ImageSubresourceRange::new(1, 1, 0, 6);
        let mip2_layer3 = ImageSubresourceRange::single(2, 3);

        assert!(full.contains(&mip1));
        assert!(!mip1.contains(&full));
        assert!(full.overlaps(&mip2_layer3));
        assert!(!mip1.overlaps(&mip2_layer3));
        assert!(mip2_layer3.contains_subresource(2, 3));
        assert!(!mip2_layer3.contains_subresource(2, 4));
    }

    #[test]
    fn test_range_contains_rejects_oversized_counts() {
        let full = ImageSubresourceRange::new(0, 1, 0, 2);
        assert!(!full.contains(&ImageSubresourceRange::new(0, 1, 1, u32::MAX)));
        assert!(!full.contains(&ImageSubresourceRange::new(0, u32::MAX, 0, 1)));
    }

    #[test]
    fn test_empty_range_overlaps_nothing() {
        let empty = ImageSubresourceRange::new(0, 0, 0, 1);
        assert!(empty.is_empty());
        assert!(!empty.overlaps(&ImageSubresourceRange::new(0, 1, 0, 1)));
    }

    #[test]
    fn test_subresources_are_mip_major() {
        let range = ImageSubresourceRange::new(1, 2, 3, 2);
        let subresources: Vec<_> = range.subresources().collect();
        assert_eq!(subresources, vec![(1, 3), (1, 4), (2, 3), (2, 4)]);
    }

    #[test]
    fn test_mip_extent_clamps_to_one() {
        let desc = ImageDescriptor::new_2d(Format::Rgba8Unorm, 512, 4, ImageUsage::SAMPLED)
            .with_mip_count(4);
        assert_eq!(desc.mip_extent(0), Extent2d::new(512, 4));
        assert_eq!(desc.mip_extent(3), Extent2d::new(64, 1));
        assert_eq!(desc.full_range(), ImageSubresourceRange::new(0, 4, 0, 1));
    }
}
