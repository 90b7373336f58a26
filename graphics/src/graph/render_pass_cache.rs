//! Render-pass and framebuffer cache.
//!
//! Render-pass objects are keyed on attachment formats, load operations and
//! the usages each attachment enters and leaves the pass in. Framebuffers are
//! keyed on the render pass, the attached views and the extent. Both are kept
//! until [`RenderPassCache::clear`].
//!
//! Attachment layout transitions are part of the render-pass object: the
//! attachment's initial layout comes from the usage its subresources were in
//! before the pass, and an external subpass dependency carries the matching
//! execution and memory dependency. The frame graph therefore emits no
//! explicit barrier for attachments.

use std::collections::BTreeMap;

use crate::access::{ImageUsageType, dst_image_access_pattern, src_image_access_pattern};
use crate::backend::{GpuBackend, GpuFramebuffer, GpuRenderPass};
use crate::error::GraphicsError;
use crate::types::{
    AccessFlags, AttachmentLoadOp, Extent2d, Format, FramebufferHandle, ImageLayout,
    ImageViewHandle, PipelineStages, RenderPassHandle,
};

/// One attachment of a render-pass key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttachmentKey {
    /// Attachment format.
    pub format: Format,
    /// Load operation (clear values are supplied at begin time).
    pub load_op: AttachmentLoadOp,
    /// Usage the attachment is in when the pass begins.
    pub initial_usage: ImageUsageType,
    /// Usage the attachment is left in when the pass ends.
    pub final_usage: ImageUsageType,
}

impl AttachmentKey {
    /// Layout the render pass transitions from.
    pub fn initial_layout(&self) -> ImageLayout {
        src_image_access_pattern(self.initial_usage).layout
    }

    /// Layout the render pass leaves the attachment in.
    pub fn final_layout(&self) -> ImageLayout {
        dst_image_access_pattern(self.final_usage).layout
    }
}

/// Execution and memory dependency between work before the pass and the
/// pass's only subpass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalDependency {
    pub src_stages: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_stages: PipelineStages,
    pub dst_access: AccessFlags,
}

/// Structural key of a single-subpass render pass.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RenderPassKey {
    /// Color attachments in binding order.
    pub color_attachments: Vec<AttachmentKey>,
    /// Optional depth attachment, placed after the colors.
    pub depth_attachment: Option<AttachmentKey>,
}

impl RenderPassKey {
    /// All attachments in framebuffer order (colors, then depth).
    pub fn attachments(&self) -> impl Iterator<Item = &AttachmentKey> {
        self.color_attachments
            .iter()
            .chain(self.depth_attachment.iter())
    }

    /// The dependency that orders earlier work against the attachments'
    /// first use in the pass. `None` for a pass without attachments.
    pub fn external_dependency(&self) -> Option<ExternalDependency> {
        self.attachments().fold(None, |acc, attachment| {
            let src = src_image_access_pattern(attachment.initial_usage);
            let dst = dst_image_access_pattern(attachment.final_usage);
            let dep = acc.unwrap_or(ExternalDependency {
                src_stages: PipelineStages::empty(),
                src_access: AccessFlags::empty(),
                dst_stages: PipelineStages::empty(),
                dst_access: AccessFlags::empty(),
            });
            Some(ExternalDependency {
                src_stages: dep.src_stages | src.stages,
                src_access: dep.src_access | src.access,
                dst_stages: dep.dst_stages | dst.stages,
                dst_access: dep.dst_access | dst.access,
            })
        })
    }
}

/// Structural key of a framebuffer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FramebufferKey {
    /// Render pass the framebuffer is compatible with.
    pub render_pass: RenderPassHandle,
    /// Attached views in render-pass attachment order.
    pub attachments: Vec<ImageViewHandle>,
    /// Framebuffer size.
    pub extent: Extent2d,
}

/// Memoized render-pass and framebuffer objects.
#[derive(Debug, Default)]
pub struct RenderPassCache {
    // Declared first so framebuffers are destroyed before their render passes.
    framebuffers: BTreeMap<FramebufferKey, GpuFramebuffer>,
    render_passes: BTreeMap<RenderPassKey, GpuRenderPass>,
}

impl RenderPassCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the render pass for `key`, building it on first request.
    pub fn get_render_pass(
        &mut self,
        backend: &dyn GpuBackend,
        key: &RenderPassKey,
    ) -> Result<RenderPassHandle, GraphicsError> {
        if let Some(render_pass) = self.render_passes.get(key) {
            return Ok(render_pass.handle());
        }
        let render_pass = backend.create_render_pass(key)?;
        let handle = render_pass.handle();
        log::debug!("RenderPassCache: new render pass {:?} for {:?}", handle, key);
        self.render_passes.insert(key.clone(), render_pass);
        Ok(handle)
    }

    /// Get the framebuffer for `key`, building it on first request.
    pub fn get_framebuffer(
        &mut self,
        backend: &dyn GpuBackend,
        key: &FramebufferKey,
    ) -> Result<FramebufferHandle, GraphicsError> {
        if let Some(framebuffer) = self.framebuffers.get(key) {
            return Ok(framebuffer.handle());
        }
        let framebuffer = backend.create_framebuffer(key)?;
        let handle = framebuffer.handle();
        self.framebuffers.insert(key.clone(), framebuffer);
        Ok(handle)
    }

    /// Number of cached render passes.
    pub fn render_pass_count(&self) -> usize {
        self.render_passes.len()
    }

    /// Number of cached framebuffers.
    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    /// Destroy every framebuffer and render pass.
    pub fn clear(&mut self) {
        self.framebuffers.clear();
        self.render_passes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn color(initial_usage: ImageUsageType) -> AttachmentKey {
        AttachmentKey {
            format: Format::Rgba8Unorm,
            load_op: AttachmentLoadOp::Clear,
            initial_usage,
            final_usage: ImageUsageType::ColorAttachment,
        }
    }

    #[test]
    fn test_render_pass_is_memoized() {
        let backend = DummyBackend::new();
        let mut cache = RenderPassCache::new();
        let key = RenderPassKey {
            color_attachments: vec![color(ImageUsageType::None)],
            depth_attachment: None,
        };

        let a = cache.get_render_pass(&backend, &key).unwrap();
        let b = cache.get_render_pass(&backend, &key.clone()).unwrap();
        assert_eq!(a, b);
        assert_eq!(backend.created_render_passes(), 1);

        let other = RenderPassKey {
            color_attachments: vec![color(ImageUsageType::GraphicsShaderRead)],
            depth_attachment: None,
        };
        assert_ne!(cache.get_render_pass(&backend, &other).unwrap(), a);
        assert_eq!(cache.render_pass_count(), 2);
    }

    #[test]
    fn test_framebuffer_is_memoized() {
        let backend = DummyBackend::new();
        let mut cache = RenderPassCache::new();
        let key = FramebufferKey {
            render_pass: RenderPassHandle::from_raw(100),
            attachments: vec![ImageViewHandle::from_raw(5)],
            extent: Extent2d::new(512, 512),
        };
        let a = cache.get_framebuffer(&backend, &key).unwrap();
        let b = cache.get_framebuffer(&backend, &key).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.framebuffer_count(), 1);

        cache.clear();
        assert_eq!(cache.framebuffer_count(), 0);
        cache.get_framebuffer(&backend, &key).unwrap();
        assert_eq!(backend.created_framebuffers(), 2);
    }

    #[test]
    fn test_external_dependency_unions_attachments() {
        let key = RenderPassKey {
            color_attachments: vec![color(ImageUsageType::ComputeShaderRead)],
            depth_attachment: Some(AttachmentKey {
                format: Format::Depth32Float,
                load_op: AttachmentLoadOp::Clear,
                initial_usage: ImageUsageType::None,
                final_usage: ImageUsageType::DepthAttachment,
            }),
        };
        let dep = key.external_dependency().unwrap();
        assert!(dep.src_stages.contains(PipelineStages::COMPUTE_SHADER));
        assert!(dep.src_stages.contains(PipelineStages::TOP_OF_PIPE));
        assert!(dep.dst_stages.contains(PipelineStages::COLOR_ATTACHMENT_OUTPUT));
        assert!(dep.dst_stages.contains(PipelineStages::EARLY_FRAGMENT_TESTS));
        assert!(dep.dst_access.contains(AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE));

        assert_eq!(RenderPassKey::default().external_dependency(), None);
    }

    #[test]
    fn test_attachment_layouts() {
        let key = color(ImageUsageType::ComputeShaderRead);
        assert_eq!(key.initial_layout(), ImageLayout::ShaderReadOnly);
        assert_eq!(key.final_layout(), ImageLayout::ColorAttachment);
        assert_eq!(color(ImageUsageType::None).initial_layout(), ImageLayout::Undefined);
    }
}
