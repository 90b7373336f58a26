//! Pass descriptors and the context handed to recording callbacks.
//!
//! Descriptors are plain builder values: every `with_*` method consumes and
//! returns the descriptor. Nothing is validated when a descriptor is built or
//! added; the graph checks declarations when it executes.

use crate::backend::CommandBuffer;
use crate::types::{
    BufferInfo, ClearValue, Extent2d, FramebufferHandle, ImageViewInfo, LoadOp,
    RenderPassHandle,
};

use super::proxy::{BufferProxyId, ImageViewProxyId};

/// Callback recording the commands of one pass.
pub type RecordFn = Box<dyn FnOnce(&PassContext, &mut CommandBuffer)>;

/// An attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentDesc {
    /// The view rendered to.
    pub view: ImageViewProxyId,
    /// What happens to the previous contents.
    pub load_op: LoadOp,
}

impl AttachmentDesc {
    /// Create an attachment that loads its previous contents.
    pub fn new(view: impl Into<ImageViewProxyId>) -> Self {
        Self {
            view: view.into(),
            load_op: LoadOp::Load,
        }
    }

    /// Set the load operation.
    pub fn with_load_op(mut self, load_op: LoadOp) -> Self {
        self.load_op = load_op;
        self
    }

    /// Clear the attachment to `value` on load.
    pub fn with_clear(mut self, value: ClearValue) -> Self {
        self.load_op = LoadOp::Clear(value);
        self
    }
}

/// Descriptor of a rasterization pass.
#[derive(Default)]
pub struct RenderPassDesc {
    pub(crate) label: Option<String>,
    pub(crate) input_images: Vec<ImageViewProxyId>,
    pub(crate) storage_images: Vec<ImageViewProxyId>,
    pub(crate) input_buffers: Vec<BufferProxyId>,
    pub(crate) storage_buffers: Vec<BufferProxyId>,
    pub(crate) color_attachments: Vec<AttachmentDesc>,
    pub(crate) depth_attachment: Option<AttachmentDesc>,
    pub(crate) render_area: Option<Extent2d>,
    pub(crate) record: Option<RecordFn>,
}

impl RenderPassDesc {
    /// Create an empty render pass descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Views sampled or read by the pass's shaders.
    pub fn with_input_images(mut self, views: impl IntoIterator<Item = ImageViewProxyId>) -> Self {
        self.input_images = views.into_iter().collect();
        self
    }

    /// Views read and written as storage images.
    pub fn with_storage_images(
        mut self,
        views: impl IntoIterator<Item = ImageViewProxyId>,
    ) -> Self {
        self.storage_images = views.into_iter().collect();
        self
    }

    /// Buffers read by the pass (vertex, index, uniform or storage reads).
    pub fn with_input_buffers(mut self, buffers: impl IntoIterator<Item = BufferProxyId>) -> Self {
        self.input_buffers = buffers.into_iter().collect();
        self
    }

    /// Buffers read and written as storage buffers.
    pub fn with_storage_buffers(
        mut self,
        buffers: impl IntoIterator<Item = BufferProxyId>,
    ) -> Self {
        self.storage_buffers = buffers.into_iter().collect();
        self
    }

    /// Color attachments in binding order.
    pub fn with_color_attachments(
        mut self,
        attachments: impl IntoIterator<Item = AttachmentDesc>,
    ) -> Self {
        self.color_attachments = attachments.into_iter().collect();
        self
    }

    /// Depth attachment.
    pub fn with_depth_attachment(mut self, attachment: AttachmentDesc) -> Self {
        self.depth_attachment = Some(attachment);
        self
    }

    /// Render area. Defaults to the smallest attachment extent.
    pub fn with_render_area(mut self, extent: Extent2d) -> Self {
        self.render_area = Some(extent);
        self
    }

    /// Set the recording callback, invoked inside the render pass.
    pub fn with_record(
        mut self,
        record: impl FnOnce(&PassContext, &mut CommandBuffer) + 'static,
    ) -> Self {
        self.record = Some(Box::new(record));
        self
    }
}

impl std::fmt::Debug for RenderPassDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPassDesc")
            .field("label", &self.label)
            .field("input_images", &self.input_images)
            .field("storage_images", &self.storage_images)
            .field("input_buffers", &self.input_buffers)
            .field("storage_buffers", &self.storage_buffers)
            .field("color_attachments", &self.color_attachments)
            .field("depth_attachment", &self.depth_attachment)
            .field("render_area", &self.render_area)
            .field("has_record", &self.record.is_some())
            .finish()
    }
}

/// Descriptor of a compute pass.
#[derive(Default)]
pub struct ComputePassDesc {
    pub(crate) label: Option<String>,
    pub(crate) input_images: Vec<ImageViewProxyId>,
    pub(crate) storage_images: Vec<ImageViewProxyId>,
    pub(crate) input_buffers: Vec<BufferProxyId>,
    pub(crate) storage_buffers: Vec<BufferProxyId>,
    pub(crate) record: Option<RecordFn>,
}

impl ComputePassDesc {
    /// Create an empty compute pass descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Views sampled or read by the shader.
    pub fn with_input_images(mut self, views: impl IntoIterator<Item = ImageViewProxyId>) -> Self {
        self.input_images = views.into_iter().collect();
        self
    }

    /// Views read and written as storage images.
    pub fn with_storage_images(
        mut self,
        views: impl IntoIterator<Item = ImageViewProxyId>,
    ) -> Self {
        self.storage_images = views.into_iter().collect();
        self
    }

    /// Buffers read by the shader.
    pub fn with_input_buffers(mut self, buffers: impl IntoIterator<Item = BufferProxyId>) -> Self {
        self.input_buffers = buffers.into_iter().collect();
        self
    }

    /// Buffers read and written as storage buffers.
    pub fn with_storage_buffers(
        mut self,
        buffers: impl IntoIterator<Item = BufferProxyId>,
    ) -> Self {
        self.storage_buffers = buffers.into_iter().collect();
        self
    }

    /// Set the recording callback, invoked after the pass's barriers.
    pub fn with_record(
        mut self,
        record: impl FnOnce(&PassContext, &mut CommandBuffer) + 'static,
    ) -> Self {
        self.record = Some(Box::new(record));
        self
    }
}

impl std::fmt::Debug for ComputePassDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputePassDesc")
            .field("label", &self.label)
            .field("input_images", &self.input_images)
            .field("storage_images", &self.storage_images)
            .field("input_buffers", &self.input_buffers)
            .field("storage_buffers", &self.storage_buffers)
            .field("has_record", &self.record.is_some())
            .finish()
    }
}

/// Descriptor of a transfer pass (copies between images and buffers).
#[derive(Default)]
pub struct TransferPassDesc {
    pub(crate) label: Option<String>,
    pub(crate) src_images: Vec<ImageViewProxyId>,
    pub(crate) dst_images: Vec<ImageViewProxyId>,
    pub(crate) src_buffers: Vec<BufferProxyId>,
    pub(crate) dst_buffers: Vec<BufferProxyId>,
    pub(crate) record: Option<RecordFn>,
}

impl TransferPassDesc {
    /// Create an empty transfer pass descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Views copied from.
    pub fn with_src_images(mut self, views: impl IntoIterator<Item = ImageViewProxyId>) -> Self {
        self.src_images = views.into_iter().collect();
        self
    }

    /// Views copied to.
    pub fn with_dst_images(mut self, views: impl IntoIterator<Item = ImageViewProxyId>) -> Self {
        self.dst_images = views.into_iter().collect();
        self
    }

    /// Buffers copied from.
    pub fn with_src_buffers(mut self, buffers: impl IntoIterator<Item = BufferProxyId>) -> Self {
        self.src_buffers = buffers.into_iter().collect();
        self
    }

    /// Buffers copied to.
    pub fn with_dst_buffers(mut self, buffers: impl IntoIterator<Item = BufferProxyId>) -> Self {
        self.dst_buffers = buffers.into_iter().collect();
        self
    }

    /// Set the recording callback, invoked after the pass's barriers.
    pub fn with_record(
        mut self,
        record: impl FnOnce(&PassContext, &mut CommandBuffer) + 'static,
    ) -> Self {
        self.record = Some(Box::new(record));
        self
    }
}

impl std::fmt::Debug for TransferPassDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferPassDesc")
            .field("label", &self.label)
            .field("src_images", &self.src_images)
            .field("dst_images", &self.dst_images)
            .field("src_buffers", &self.src_buffers)
            .field("dst_buffers", &self.dst_buffers)
            .field("has_record", &self.record.is_some())
            .finish()
    }
}

/// Resolved resources of one pass, in the order the descriptor declared them.
///
/// Only declared resources are reachable. Looking up any other proxy panics.
#[derive(Debug, Default)]
pub struct PassContext {
    pub(crate) label: Option<String>,
    pub(crate) input_images: Vec<ImageViewInfo>,
    pub(crate) storage_images: Vec<ImageViewInfo>,
    pub(crate) input_buffers: Vec<BufferInfo>,
    pub(crate) storage_buffers: Vec<BufferInfo>,
    pub(crate) color_attachments: Vec<ImageViewInfo>,
    pub(crate) depth_attachment: Option<ImageViewInfo>,
    pub(crate) src_images: Vec<ImageViewInfo>,
    pub(crate) dst_images: Vec<ImageViewInfo>,
    pub(crate) src_buffers: Vec<BufferInfo>,
    pub(crate) dst_buffers: Vec<BufferInfo>,
    pub(crate) render_pass: Option<RenderPassHandle>,
    pub(crate) framebuffer: Option<FramebufferHandle>,
    pub(crate) render_area: Option<Extent2d>,
    pub(crate) views: Vec<(ImageViewProxyId, ImageViewInfo)>,
    pub(crate) buffers: Vec<(BufferProxyId, BufferInfo)>,
}

impl PassContext {
    /// Debug label of the pass.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Input (read-only) image views.
    pub fn input_images(&self) -> &[ImageViewInfo] {
        &self.input_images
    }

    /// Storage (read-write) image views.
    pub fn storage_images(&self) -> &[ImageViewInfo] {
        &self.storage_images
    }

    /// Read-only buffers.
    pub fn input_buffers(&self) -> &[BufferInfo] {
        &self.input_buffers
    }

    /// Storage (read-write) buffers.
    pub fn storage_buffers(&self) -> &[BufferInfo] {
        &self.storage_buffers
    }

    /// Color attachment views of a render pass.
    pub fn color_attachments(&self) -> &[ImageViewInfo] {
        &self.color_attachments
    }

    /// Depth attachment view of a render pass.
    pub fn depth_attachment(&self) -> Option<&ImageViewInfo> {
        self.depth_attachment.as_ref()
    }

    /// Source views of a transfer pass.
    pub fn src_images(&self) -> &[ImageViewInfo] {
        &self.src_images
    }

    /// Destination views of a transfer pass.
    pub fn dst_images(&self) -> &[ImageViewInfo] {
        &self.dst_images
    }

    /// Source buffers of a transfer pass.
    pub fn src_buffers(&self) -> &[BufferInfo] {
        &self.src_buffers
    }

    /// Destination buffers of a transfer pass.
    pub fn dst_buffers(&self) -> &[BufferInfo] {
        &self.dst_buffers
    }

    /// Render-pass object the callback records into, for render passes.
    pub fn render_pass(&self) -> Option<RenderPassHandle> {
        self.render_pass
    }

    /// Framebuffer bound for the pass, for render passes.
    pub fn framebuffer(&self) -> Option<FramebufferHandle> {
        self.framebuffer
    }

    /// Render area, for render passes.
    pub fn render_area(&self) -> Option<Extent2d> {
        self.render_area
    }

    /// Resolved view of a declared image-view proxy.
    ///
    /// # Panics
    ///
    /// Panics if the pass did not declare `id`.
    pub fn image_view(&self, id: impl Into<ImageViewProxyId>) -> ImageViewInfo {
        let id = id.into();
        self.views
            .iter()
            .find(|(declared, _)| *declared == id)
            .map(|(_, info)| *info)
            .unwrap_or_else(|| panic!("{id} was not declared by pass {:?}", self.label))
    }

    /// Resolved buffer of a declared buffer proxy.
    ///
    /// # Panics
    ///
    /// Panics if the pass did not declare `id`.
    pub fn buffer(&self, id: impl Into<BufferProxyId>) -> BufferInfo {
        let id = id.into();
        self.buffers
            .iter()
            .find(|(declared, _)| *declared == id)
            .map(|(_, info)| *info)
            .unwrap_or_else(|| panic!("{id} was not declared by pass {:?}", self.label))
    }

    pub(crate) fn declare_view(&mut self, id: ImageViewProxyId, info: ImageViewInfo) {
        self.views.push((id, info));
    }

    pub(crate) fn declare_buffer(&mut self, id: BufferProxyId, info: BufferInfo) {
        self.buffers.push((id, info));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        BufferDescriptor, BufferHandle, BufferUsage, Format, ImageDescriptor, ImageHandle,
        ImageInfo, ImageSubresourceRange, ImageUsage, ImageViewHandle,
    };
    use lilium_core::pool::PoolId;

    fn view_info(raw: u64) -> ImageViewInfo {
        let descriptor =
            ImageDescriptor::new_2d(Format::Rgba8Unorm, 32, 32, ImageUsage::SAMPLED);
        ImageViewInfo {
            handle: ImageViewHandle::from_raw(raw),
            image: ImageInfo {
                handle: ImageHandle::from_raw(raw + 100),
                descriptor,
            },
            range: ImageSubresourceRange::single(0, 0),
        }
    }

    #[test]
    fn test_attachment_builder() {
        let view = ImageViewProxyId(PoolId::from_index(0));
        let attachment = AttachmentDesc::new(view).with_clear(ClearValue::depth(1.0));
        assert_eq!(attachment.load_op, LoadOp::clear_depth(1.0));
        assert_eq!(AttachmentDesc::new(view).load_op, LoadOp::Load);
    }

    #[test]
    fn test_context_lookup_by_id() {
        let declared = ImageViewProxyId(PoolId::from_index(2));
        let buffer_id = BufferProxyId(PoolId::from_index(0));
        let buffer = BufferInfo {
            handle: BufferHandle::from_raw(9),
            descriptor: BufferDescriptor::new(64, BufferUsage::STORAGE),
        };

        let mut ctx = PassContext::default();
        ctx.declare_view(declared, view_info(1));
        ctx.declare_buffer(buffer_id, buffer);

        assert_eq!(ctx.image_view(declared), view_info(1));
        assert_eq!(ctx.buffer(buffer_id), buffer);
    }

    #[test]
    #[should_panic(expected = "was not declared")]
    fn test_context_rejects_undeclared_view() {
        let ctx = PassContext::default();
        ctx.image_view(ImageViewProxyId(PoolId::from_index(5)));
    }

    #[test]
    fn test_descriptor_builders_keep_order() {
        let a = ImageViewProxyId(PoolId::from_index(1));
        let b = ImageViewProxyId(PoolId::from_index(0));
        let desc = ComputePassDesc::new()
            .with_label("blur")
            .with_storage_images([a, b])
            .with_record(|_, cmd| cmd.dispatch(1, 1, 1));
        assert_eq!(desc.storage_images, vec![a, b]);
        assert!(desc.record.is_some());
        assert_eq!(desc.label.as_deref(), Some("blur"));
    }
}
