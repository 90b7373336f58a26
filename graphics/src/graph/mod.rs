//! Frame graph.
//!
//! A [`FrameGraph`] describes one frame as an ordered list of tasks (render
//! passes, compute passes, transfers, presents and sync points) reading and
//! writing resource proxies. [`FrameGraph::execute`] resolves the proxies to
//! native objects, derives the barriers each task needs from the usages of
//! the tasks before it, and records everything into a [`CommandBuffer`].
//!
//! # Example
//!
//! ```ignore
//! let mut graph = FrameGraph::new(backend);
//!
//! let color = graph.add_image(ImageDescriptor::new_2d(
//!     Format::Rgba8Unorm,
//!     512,
//!     512,
//!     ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED,
//! ));
//! let view = graph.add_full_image_view(&color);
//!
//! graph.add_render_pass(
//!     RenderPassDesc::new()
//!         .with_color_attachments([AttachmentDesc::new(&view)
//!             .with_clear(ClearValue::color(0.0, 0.0, 0.0, 1.0))])
//!         .with_record(|ctx, cmd| cmd.draw(3, 1, 0, 0)),
//! );
//! graph.add_compute_pass(
//!     ComputePassDesc::new()
//!         .with_input_images([view.id()])
//!         .with_record(|ctx, cmd| cmd.dispatch(32, 32, 1)),
//! );
//! graph.add_image_present(&view);
//!
//! let stats = graph.execute(&mut cmd)?;
//! ```
//!
//! # Execution phases
//!
//! 1. Resolve every live proxy. Transient images and buffers come from the
//!    [`ImageCache`] / [`BufferCache`], which are released first so the
//!    same native objects are handed out again frame after frame.
//! 2. For every task, collect the usage of each subresource it touches.
//! 3. Build one pipeline barrier per task from the last usage of each
//!    subresource to the new one.
//! 4. Record the task: begin/end the render pass around the callback, or
//!    call the callback directly.
//! 5. Drop the frame's tasks. Proxies stay alive until their handles go.

mod barrier;
mod config;
mod pass;
mod proxy;
mod render_pass_cache;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use lilium_core::profiling::{frame_mark, profile_function, profile_plot, profile_scope};

use crate::access::{BufferUsageType, ImageUsageType};
use crate::backend::{CommandBuffer, GpuBackend, RenderPassBegin};
use crate::error::GraphicsError;
use crate::resources::{BufferCache, ImageCache, ImageViewCache};
use crate::types::{
    BufferDescriptor, BufferInfo, BufferUsage, Extent2d, ImageDescriptor, ImageInfo,
    ImageSubresourceRange, ImageViewInfo,
};

pub use barrier::{BufferBarrier, ImageBarrier, MemoryBarrier, PipelineBarrier};
pub use config::FrameGraphConfig;
pub use pass::{
    AttachmentDesc, ComputePassDesc, PassContext, RecordFn, RenderPassDesc, TransferPassDesc,
};
pub use proxy::{
    BufferProxyId, BufferProxyUnique, ImageProxyId, ImageProxyUnique, ImageViewProxyId,
    ImageViewProxyUnique, ProxyId, ProxyPools, ProxyUnique,
};
pub use render_pass_cache::{
    AttachmentKey, ExternalDependency, FramebufferKey, RenderPassCache, RenderPassKey,
};

use barrier::{TaskUsages, UsageTracker};
use proxy::{BufferSource, ImageSource, ImageViewSource, SharedPools};

/// Kind of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    RenderPass,
    ComputePass,
    ImageTransfer,
    ImagePresent,
    FrameSync,
}

enum Task {
    RenderPass(RenderPassDesc),
    ComputePass(ComputePassDesc),
    ImageTransfer(TransferPassDesc),
    ImagePresent(ImageViewProxyId),
    FrameSync,
}

impl Task {
    fn kind(&self) -> TaskKind {
        match self {
            Self::RenderPass(_) => TaskKind::RenderPass,
            Self::ComputePass(_) => TaskKind::ComputePass,
            Self::ImageTransfer(_) => TaskKind::ImageTransfer,
            Self::ImagePresent(_) => TaskKind::ImagePresent,
            Self::FrameSync => TaskKind::FrameSync,
        }
    }
}

/// What one [`FrameGraph::execute`] recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Tasks executed.
    pub tasks: usize,
    /// Pipeline-barrier commands recorded.
    pub pipeline_barriers: usize,
    /// Image barriers across all pipeline barriers.
    pub image_barriers: usize,
    /// Buffer barriers across all pipeline barriers.
    pub buffer_barriers: usize,
    /// Render passes begun.
    pub render_passes: usize,
}

impl FrameStats {
    fn record_barrier(&mut self, cmd: &mut CommandBuffer, barrier: &PipelineBarrier) {
        if barrier.is_empty() {
            return;
        }
        cmd.pipeline_barrier(barrier);
        self.pipeline_barriers += 1;
        self.image_barriers += barrier.image_barriers.len();
        self.buffer_barriers += barrier.buffer_barriers.len();
    }
}

/// Resolved proxies and usage state of the frame being executed.
struct FrameState {
    views: BTreeMap<ImageViewProxyId, ImageViewInfo>,
    buffers: BTreeMap<BufferProxyId, BufferInfo>,
    tracker: UsageTracker,
}

impl FrameState {
    fn view(&self, id: ImageViewProxyId) -> ImageViewInfo {
        match self.views.get(&id) {
            Some(info) => *info,
            None => panic!("{id} is not a live image-view proxy"),
        }
    }

    fn buffer(&self, id: BufferProxyId) -> BufferInfo {
        match self.buffers.get(&id) {
            Some(info) => *info,
            None => panic!("{id} is not a live buffer proxy"),
        }
    }
}

/// The frame graph.
///
/// Single-threaded: proxies and pass descriptors are added and the graph is
/// executed from one thread.
pub struct FrameGraph {
    // Declared in destruction order: framebuffers, views, then images.
    render_pass_cache: RenderPassCache,
    image_view_cache: ImageViewCache,
    image_cache: ImageCache,
    buffer_cache: BufferCache,
    pools: SharedPools,
    tasks: Vec<Task>,
    backend: Arc<dyn GpuBackend>,
    config: FrameGraphConfig,
    frame_index: u64,
}

impl FrameGraph {
    /// Create a graph with the default configuration.
    pub fn new(backend: Arc<dyn GpuBackend>) -> Self {
        Self::with_config(backend, FrameGraphConfig::default())
    }

    /// Create a graph with the given configuration.
    pub fn with_config(backend: Arc<dyn GpuBackend>, config: FrameGraphConfig) -> Self {
        log::info!(
            "Creating {} on {} backend",
            config.display_label(),
            backend.name()
        );
        Self {
            render_pass_cache: RenderPassCache::new(),
            image_view_cache: ImageViewCache::new(),
            image_cache: ImageCache::new(),
            buffer_cache: BufferCache::new(),
            pools: Rc::new(RefCell::new(ProxyPools::default())),
            tasks: Vec::new(),
            backend,
            config,
            frame_index: 0,
        }
    }

    // ---- Resources ----

    /// Add a transient image.
    pub fn add_image(&mut self, descriptor: ImageDescriptor) -> ImageProxyUnique {
        assert!(
            descriptor.mip_count > 0 && descriptor.layer_count > 0,
            "image needs at least one mip level and one layer: {descriptor:?}"
        );
        let id = self
            .pools
            .borrow_mut()
            .images
            .add(ImageSource::Transient(descriptor));
        ProxyUnique::new(ImageProxyId(id), &self.pools)
    }

    /// Add a caller-owned image.
    pub fn add_external_image(&mut self, info: ImageInfo) -> ImageProxyUnique {
        let id = self
            .pools
            .borrow_mut()
            .images
            .add(ImageSource::External(info));
        ProxyUnique::new(ImageProxyId(id), &self.pools)
    }

    /// Add a view of `range` of an image proxy.
    ///
    /// # Panics
    ///
    /// Panics if `image` is not live or `range` is empty or leaves the image.
    pub fn add_image_view(
        &mut self,
        image: impl Into<ImageProxyId>,
        range: ImageSubresourceRange,
    ) -> ImageViewProxyUnique {
        let image = image.into();
        let mut pools = self.pools.borrow_mut();
        let full = match pools.images.try_get(image.0) {
            Some(source) => source.descriptor().full_range(),
            None => panic!("{image} is not a live image proxy"),
        };
        assert!(
            !range.is_empty() && full.contains(&range),
            "{range:?} is not a non-empty range of {image} ({full:?})"
        );
        let id = pools
            .image_views
            .add(ImageViewSource::Transient { image, range });
        drop(pools);
        ProxyUnique::new(ImageViewProxyId(id), &self.pools)
    }

    /// Add a view covering every subresource of an image proxy.
    pub fn add_full_image_view(&mut self, image: impl Into<ImageProxyId>) -> ImageViewProxyUnique {
        let image = image.into();
        let range = match self.pools.borrow().images.try_get(image.0) {
            Some(source) => source.descriptor().full_range(),
            None => panic!("{image} is not a live image proxy"),
        };
        self.add_image_view(image, range)
    }

    /// Add a caller-owned view.
    ///
    /// `known_usage` is the usage its subresources are in when the frame
    /// starts, so the first task's barrier transitions from the right state.
    /// Pass [`ImageUsageType::Unknown`] when it is not known.
    ///
    /// # Panics
    ///
    /// Panics if the view's range is empty or leaves its image.
    pub fn add_external_image_view(
        &mut self,
        info: ImageViewInfo,
        known_usage: ImageUsageType,
    ) -> ImageViewProxyUnique {
        let full = info.image.descriptor.full_range();
        assert!(
            !info.range.is_empty() && full.contains(&info.range),
            "{:?} is not a non-empty range of external image {:?} ({full:?})",
            info.range,
            info.image.handle
        );
        let id = self
            .pools
            .borrow_mut()
            .image_views
            .add(ImageViewSource::External { info, known_usage });
        ProxyUnique::new(ImageViewProxyId(id), &self.pools)
    }

    /// Add a transient buffer holding `count` elements of `T`.
    pub fn add_buffer<T: bytemuck::Pod>(
        &mut self,
        count: usize,
        usage: BufferUsage,
    ) -> BufferProxyUnique {
        self.add_raw_buffer(BufferDescriptor::for_elements::<T>(count, usage))
    }

    /// Add a transient buffer from a descriptor.
    pub fn add_raw_buffer(&mut self, descriptor: BufferDescriptor) -> BufferProxyUnique {
        assert!(descriptor.size > 0, "buffer size must be non-zero");
        let id = self
            .pools
            .borrow_mut()
            .buffers
            .add(BufferSource::Transient(descriptor));
        ProxyUnique::new(BufferProxyId(id), &self.pools)
    }

    /// Add a caller-owned buffer.
    pub fn add_external_buffer(&mut self, info: BufferInfo) -> BufferProxyUnique {
        let id = self
            .pools
            .borrow_mut()
            .buffers
            .add(BufferSource::External(info));
        ProxyUnique::new(BufferProxyId(id), &self.pools)
    }

    /// Release an image proxy whose handle was detached.
    pub fn release_image(&mut self, id: ImageProxyId) {
        self.pools.borrow_mut().images.release(id.0);
    }

    /// Release an image-view proxy whose handle was detached.
    pub fn release_image_view(&mut self, id: ImageViewProxyId) {
        self.pools.borrow_mut().image_views.release(id.0);
    }

    /// Release a buffer proxy whose handle was detached.
    pub fn release_buffer(&mut self, id: BufferProxyId) {
        self.pools.borrow_mut().buffers.release(id.0);
    }

    // ---- Tasks ----

    /// Schedule a render pass.
    pub fn add_render_pass(&mut self, desc: RenderPassDesc) {
        self.tasks.push(Task::RenderPass(desc));
    }

    /// Schedule a compute pass.
    pub fn add_compute_pass(&mut self, desc: ComputePassDesc) {
        self.tasks.push(Task::ComputePass(desc));
    }

    /// Schedule a transfer pass.
    pub fn add_transfer_pass(&mut self, desc: TransferPassDesc) {
        self.tasks.push(Task::ImageTransfer(desc));
    }

    /// Schedule the transition of `view` to the presentable layout.
    pub fn add_image_present(&mut self, view: impl Into<ImageViewProxyId>) {
        self.tasks.push(Task::ImagePresent(view.into()));
    }

    /// Schedule a full pipeline barrier.
    pub fn add_frame_sync(&mut self) {
        self.tasks.push(Task::FrameSync);
    }

    // ---- Execution ----

    /// Resolve, synchronize and record every scheduled task into `cmd`.
    ///
    /// The task list is empty afterwards, whether or not execution succeeds.
    /// A resource creation failure aborts the frame: nothing after the
    /// failing task is recorded.
    pub fn execute(&mut self, cmd: &mut CommandBuffer) -> Result<FrameStats, GraphicsError> {
        profile_function!();

        let tasks = std::mem::take(&mut self.tasks);
        let frame_index = self.frame_index;
        self.frame_index += 1;

        match self.execute_tasks(tasks, cmd) {
            Ok(stats) => {
                log::debug!(
                    "{} frame {}: {} tasks, {} pipeline barriers ({} image, {} buffer), {} render passes",
                    self.config.display_label(),
                    frame_index,
                    stats.tasks,
                    stats.pipeline_barriers,
                    stats.image_barriers,
                    stats.buffer_barriers,
                    stats.render_passes
                );
                profile_plot!("frame_graph.pipeline_barriers", stats.pipeline_barriers);
                frame_mark!();
                Ok(stats)
            }
            Err(err) => {
                log::error!(
                    "{} frame {} aborted: {}",
                    self.config.display_label(),
                    frame_index,
                    err
                );
                Err(err)
            }
        }
    }

    fn execute_tasks(
        &mut self,
        tasks: Vec<Task>,
        cmd: &mut CommandBuffer,
    ) -> Result<FrameStats, GraphicsError> {
        let mut frame = {
            profile_scope!("frame_graph.resolve");
            self.resolve()?
        };

        profile_scope!("frame_graph.record");
        let mut stats = FrameStats::default();
        for task in tasks {
            log::trace!("Executing {:?} task", task.kind());
            match task {
                Task::RenderPass(desc) => self.execute_render_pass(desc, &mut frame, cmd, &mut stats)?,
                Task::ComputePass(desc) => self.execute_compute_pass(desc, &mut frame, cmd, &mut stats),
                Task::ImageTransfer(desc) => {
                    self.execute_transfer_pass(desc, &mut frame, cmd, &mut stats)
                }
                Task::ImagePresent(view) => {
                    let mut usages = TaskUsages::new(self.config.validate_overlaps);
                    usages.add_image_view(&frame.view(view), ImageUsageType::Present);
                    Self::synchronize(&mut frame, &usages, cmd, &mut stats);
                }
                Task::FrameSync => stats.record_barrier(cmd, &PipelineBarrier::full_sync()),
            }
            stats.tasks += 1;
        }
        Ok(stats)
    }

    /// Resolve every live proxy and seed the usage tracker with what is known
    /// about external resources.
    fn resolve(&mut self) -> Result<FrameState, GraphicsError> {
        self.image_cache.release();
        self.buffer_cache.release();

        let backend = self.backend.as_ref();
        let pools = self.pools.borrow();
        let mut tracker = UsageTracker::new();

        let mut images = BTreeMap::new();
        for (id, source) in pools.images.iter() {
            let info = match source {
                ImageSource::Transient(descriptor) => {
                    self.image_cache.get_image(backend, descriptor)?
                }
                ImageSource::External(info) => {
                    tracker.add_external_image(info.handle);
                    *info
                }
            };
            images.insert(ImageProxyId(id), info);
        }

        let mut views = BTreeMap::new();
        for (id, source) in pools.image_views.iter() {
            let id = ImageViewProxyId(id);
            let info = match source {
                ImageViewSource::Transient { image, range } => {
                    let Some(image_info) = images.get(image) else {
                        panic!("{image} was released while {id} still refers to it");
                    };
                    self.image_view_cache
                        .get_image_view(backend, image_info, range)?
                }
                ImageViewSource::External { info, known_usage } => {
                    tracker.add_external_view(info, *known_usage);
                    *info
                }
            };
            views.insert(id, info);
        }

        let mut buffers = BTreeMap::new();
        for (id, source) in pools.buffers.iter() {
            let info = match source {
                BufferSource::Transient(descriptor) => {
                    self.buffer_cache.get_buffer(backend, descriptor)?
                }
                BufferSource::External(info) => {
                    tracker.add_external_buffer(info.handle);
                    *info
                }
            };
            buffers.insert(BufferProxyId(id), info);
        }

        log::trace!(
            "Resolved {} images, {} views, {} buffers",
            images.len(),
            views.len(),
            buffers.len()
        );
        Ok(FrameState {
            views,
            buffers,
            tracker,
        })
    }

    fn synchronize(
        frame: &mut FrameState,
        usages: &TaskUsages,
        cmd: &mut CommandBuffer,
        stats: &mut FrameStats,
    ) {
        let barrier = frame.tracker.barrier_for(usages);
        stats.record_barrier(cmd, &barrier);
        frame.tracker.commit(usages);
    }

    /// Declare shader-visible resources in `usages` and `ctx`.
    #[allow(clippy::too_many_arguments)]
    fn declare_shader_resources(
        frame: &FrameState,
        usages: &mut TaskUsages,
        ctx: &mut PassContext,
        input_images: &[ImageViewProxyId],
        storage_images: &[ImageViewProxyId],
        input_buffers: &[BufferProxyId],
        storage_buffers: &[BufferProxyId],
        graphics: bool,
    ) {
        let (image_read, image_read_write, buffer_read, buffer_read_write) = if graphics {
            (
                ImageUsageType::GraphicsShaderRead,
                ImageUsageType::GraphicsShaderReadWrite,
                BufferUsageType::GraphicsShaderRead,
                BufferUsageType::GraphicsShaderReadWrite,
            )
        } else {
            (
                ImageUsageType::ComputeShaderRead,
                ImageUsageType::ComputeShaderReadWrite,
                BufferUsageType::ComputeShaderRead,
                BufferUsageType::ComputeShaderReadWrite,
            )
        };

        for &id in input_images {
            let info = frame.view(id);
            usages.add_image_view(&info, image_read);
            ctx.input_images.push(info);
            ctx.declare_view(id, info);
        }
        for &id in storage_images {
            let info = frame.view(id);
            usages.add_image_view(&info, image_read_write);
            ctx.storage_images.push(info);
            ctx.declare_view(id, info);
        }
        for &id in input_buffers {
            let info = frame.buffer(id);
            usages.add_buffer(&info, buffer_read);
            ctx.input_buffers.push(info);
            ctx.declare_buffer(id, info);
        }
        for &id in storage_buffers {
            let info = frame.buffer(id);
            usages.add_buffer(&info, buffer_read_write);
            ctx.storage_buffers.push(info);
            ctx.declare_buffer(id, info);
        }
    }

    /// Declare one attachment and build its render-pass key entry.
    ///
    /// When every subresource of the view was last in the same usage, the
    /// render pass performs the transition. Otherwise an explicit barrier
    /// brings the view into `usage` first.
    fn declare_attachment(
        frame: &FrameState,
        usages: &mut TaskUsages,
        attachment: &AttachmentDesc,
        info: &ImageViewInfo,
        usage: ImageUsageType,
    ) -> AttachmentKey {
        let initial_usage = match frame.tracker.uniform_last_usage(info) {
            Some(last) => {
                usages.add_folded_attachment(info, usage);
                last
            }
            None => {
                usages.add_image_view(info, usage);
                usage
            }
        };
        AttachmentKey {
            format: info.format(),
            load_op: attachment.load_op.kind(),
            initial_usage,
            final_usage: usage,
        }
    }

    fn execute_render_pass(
        &mut self,
        desc: RenderPassDesc,
        frame: &mut FrameState,
        cmd: &mut CommandBuffer,
        stats: &mut FrameStats,
    ) -> Result<(), GraphicsError> {
        profile_scope!("frame_graph.render_pass");

        let mut usages = TaskUsages::new(self.config.validate_overlaps);
        let mut ctx = PassContext {
            label: desc.label,
            ..PassContext::default()
        };
        Self::declare_shader_resources(
            frame,
            &mut usages,
            &mut ctx,
            &desc.input_images,
            &desc.storage_images,
            &desc.input_buffers,
            &desc.storage_buffers,
            true,
        );

        let mut key = RenderPassKey::default();
        let mut attachment_views = Vec::new();
        let mut clear_values = Vec::new();
        let mut extent: Option<Extent2d> = None;

        for attachment in &desc.color_attachments {
            let info = frame.view(attachment.view);
            assert!(
                !info.format().is_depth(),
                "{} has depth format {:?} but is bound as a color attachment",
                attachment.view,
                info.format()
            );
            key.color_attachments.push(Self::declare_attachment(
                frame,
                &mut usages,
                attachment,
                &info,
                ImageUsageType::ColorAttachment,
            ));
            ctx.color_attachments.push(info);
            ctx.declare_view(attachment.view, info);
            attachment_views.push(info.handle);
            clear_values.push(attachment.load_op.clear_value());
            extent = Some(extent.map_or(info.extent(), |e| e.min(info.extent())));
        }

        if let Some(attachment) = &desc.depth_attachment {
            let info = frame.view(attachment.view);
            assert!(
                info.format().is_depth(),
                "{} has color format {:?} but is bound as the depth attachment",
                attachment.view,
                info.format()
            );
            key.depth_attachment = Some(Self::declare_attachment(
                frame,
                &mut usages,
                attachment,
                &info,
                ImageUsageType::DepthAttachment,
            ));
            ctx.depth_attachment = Some(info);
            ctx.declare_view(attachment.view, info);
            attachment_views.push(info.handle);
            clear_values.push(attachment.load_op.clear_value());
            extent = Some(extent.map_or(info.extent(), |e| e.min(info.extent())));
        }

        let (framebuffer_extent, render_area) = match (extent, desc.render_area) {
            (Some(extent), Some(area)) => {
                assert!(
                    area.width <= extent.width && area.height <= extent.height,
                    "render area {area:?} exceeds attachment extent {extent:?}"
                );
                (extent, area)
            }
            (Some(extent), None) => (extent, extent),
            (None, Some(area)) => (area, area),
            (None, None) => panic!(
                "render pass {:?} has neither attachments nor a render area",
                ctx.label
            ),
        };

        Self::synchronize(frame, &usages, cmd, stats);

        let backend = self.backend.as_ref();
        let render_pass = self.render_pass_cache.get_render_pass(backend, &key)?;
        let framebuffer = self.render_pass_cache.get_framebuffer(
            backend,
            &FramebufferKey {
                render_pass,
                attachments: attachment_views,
                extent: framebuffer_extent,
            },
        )?;

        ctx.render_pass = Some(render_pass);
        ctx.framebuffer = Some(framebuffer);
        ctx.render_area = Some(render_area);

        cmd.begin_render_pass(&RenderPassBegin {
            render_pass,
            framebuffer,
            render_area,
            clear_values,
        });
        if let Some(record) = desc.record {
            record(&ctx, cmd);
        }
        cmd.end_render_pass();
        stats.render_passes += 1;
        Ok(())
    }

    fn execute_compute_pass(
        &mut self,
        desc: ComputePassDesc,
        frame: &mut FrameState,
        cmd: &mut CommandBuffer,
        stats: &mut FrameStats,
    ) {
        profile_scope!("frame_graph.compute_pass");

        let mut usages = TaskUsages::new(self.config.validate_overlaps);
        let mut ctx = PassContext {
            label: desc.label,
            ..PassContext::default()
        };
        Self::declare_shader_resources(
            frame,
            &mut usages,
            &mut ctx,
            &desc.input_images,
            &desc.storage_images,
            &desc.input_buffers,
            &desc.storage_buffers,
            false,
        );

        Self::synchronize(frame, &usages, cmd, stats);
        if let Some(record) = desc.record {
            record(&ctx, cmd);
        }
    }

    fn execute_transfer_pass(
        &mut self,
        desc: TransferPassDesc,
        frame: &mut FrameState,
        cmd: &mut CommandBuffer,
        stats: &mut FrameStats,
    ) {
        profile_scope!("frame_graph.transfer_pass");

        let mut usages = TaskUsages::new(self.config.validate_overlaps);
        let mut ctx = PassContext {
            label: desc.label,
            ..PassContext::default()
        };

        for &id in &desc.src_images {
            let info = frame.view(id);
            usages.add_image_view(&info, ImageUsageType::TransferSrc);
            ctx.src_images.push(info);
            ctx.declare_view(id, info);
        }
        for &id in &desc.dst_images {
            let info = frame.view(id);
            usages.add_image_view(&info, ImageUsageType::TransferDst);
            ctx.dst_images.push(info);
            ctx.declare_view(id, info);
        }
        for &id in &desc.src_buffers {
            let info = frame.buffer(id);
            usages.add_buffer(&info, BufferUsageType::TransferSrc);
            ctx.src_buffers.push(info);
            ctx.declare_buffer(id, info);
        }
        for &id in &desc.dst_buffers {
            let info = frame.buffer(id);
            usages.add_buffer(&info, BufferUsageType::TransferDst);
            ctx.dst_buffers.push(info);
            ctx.declare_buffer(id, info);
        }

        Self::synchronize(frame, &usages, cmd, stats);
        if let Some(record) = desc.record {
            record(&ctx, cmd);
        }
    }

    // ---- Management ----

    /// Full reset: drops scheduled tasks, every proxy and every cached
    /// object. Handles created before the reset become inert.
    pub fn clear(&mut self) {
        log::debug!("Clearing {}", self.config.display_label());
        self.tasks.clear();
        self.pools = Rc::new(RefCell::new(ProxyPools::default()));
        self.render_pass_cache.clear();
        self.image_view_cache.clear();
        self.image_cache.clear();
        self.buffer_cache.clear();
    }

    /// Number of scheduled tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Kinds of the scheduled tasks in execution order.
    pub fn task_kinds(&self) -> Vec<TaskKind> {
        self.tasks.iter().map(Task::kind).collect()
    }

    /// Number of live image proxies.
    pub fn image_proxy_count(&self) -> usize {
        self.pools.borrow().images.len()
    }

    /// Number of live image-view proxies.
    pub fn image_view_proxy_count(&self) -> usize {
        self.pools.borrow().image_views.len()
    }

    /// Number of live buffer proxies.
    pub fn buffer_proxy_count(&self) -> usize {
        self.pools.borrow().buffers.len()
    }

    /// Transient image cache.
    pub fn image_cache(&self) -> &ImageCache {
        &self.image_cache
    }

    /// Transient buffer cache.
    pub fn buffer_cache(&self) -> &BufferCache {
        &self.buffer_cache
    }

    /// Image-view cache.
    pub fn image_view_cache(&self) -> &ImageViewCache {
        &self.image_view_cache
    }

    /// Render-pass and framebuffer cache.
    pub fn render_pass_cache(&self) -> &RenderPassCache {
        &self.render_pass_cache
    }

    /// The backend resources are created on.
    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    /// The configuration.
    pub fn config(&self) -> &FrameGraphConfig {
        &self.config
    }

    /// Number of frames executed so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

impl std::fmt::Debug for FrameGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameGraph")
            .field("label", &self.config.label)
            .field("backend", &self.backend.name())
            .field("tasks", &self.task_kinds())
            .field("frame_index", &self.frame_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::types::{Format, ImageUsage};

    fn graph() -> FrameGraph {
        FrameGraph::new(Arc::new(DummyBackend::new()))
    }

    fn color_desc() -> ImageDescriptor {
        ImageDescriptor::new_2d(
            Format::Rgba8Unorm,
            512,
            512,
            ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED,
        )
    }

    #[test]
    fn test_tasks_keep_declaration_order() {
        let mut graph = graph();
        let image = graph.add_image(color_desc());
        let view = graph.add_full_image_view(&image);

        graph.add_compute_pass(ComputePassDesc::new());
        graph.add_frame_sync();
        graph.add_image_present(&view);
        assert_eq!(
            graph.task_kinds(),
            vec![TaskKind::ComputePass, TaskKind::FrameSync, TaskKind::ImagePresent]
        );
    }

    #[test]
    fn test_execute_clears_tasks_but_not_proxies() {
        let mut graph = graph();
        let image = graph.add_image(color_desc());
        let _view = graph.add_full_image_view(&image);
        graph.add_frame_sync();

        let mut cmd = CommandBuffer::dummy();
        let stats = graph.execute(&mut cmd).unwrap();
        assert_eq!(stats.tasks, 1);
        assert_eq!(stats.pipeline_barriers, 1);
        assert_eq!(graph.task_count(), 0);
        assert_eq!(graph.image_view_proxy_count(), 1);
        assert_eq!(graph.frame_index(), 1);
    }

    #[test]
    #[should_panic(expected = "is not a non-empty range")]
    fn test_view_range_must_fit_image() {
        let mut graph = graph();
        let image = graph.add_image(color_desc());
        graph.add_image_view(&image, ImageSubresourceRange::new(0, 2, 0, 1));
    }

    #[test]
    #[should_panic(expected = "neither attachments nor a render area")]
    fn test_render_pass_needs_an_extent() {
        let mut graph = graph();
        graph.add_render_pass(RenderPassDesc::new().with_label("empty"));
        let _ = graph.execute(&mut CommandBuffer::dummy());
    }
}
