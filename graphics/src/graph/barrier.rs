//! Barrier derivation.
//!
//! [`UsageTracker`] remembers the last usage of every image subresource and
//! buffer touched so far in the frame. For each task the graph collects the
//! declared usages into a [`TaskUsages`], asks the tracker for the
//! [`PipelineBarrier`] that brings every touched subresource from its last
//! usage to the new one, records it, then commits the task's usages.
//!
//! Subresources needing the same transition are merged into as few barriers
//! as possible: first into contiguous layer runs per mip level, then runs
//! with identical layers and transitions on consecutive mips are fused.

use std::collections::{BTreeMap, BTreeSet};

use crate::access::{
    BufferAccessPattern, BufferUsageType, ImageAccessPattern, ImageUsageType,
    buffer_needs_barrier, dst_buffer_access_pattern, dst_image_access_pattern,
    image_needs_barrier, src_buffer_access_pattern, src_image_access_pattern,
};
use crate::types::{
    AccessFlags, BufferHandle, BufferInfo, ImageAspect, ImageHandle, ImageInfo,
    ImageSubresourceRange, ImageViewInfo, PipelineStages,
};

/// Transition of a block of image subresources.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBarrier {
    pub image: ImageHandle,
    pub aspect: ImageAspect,
    pub range: ImageSubresourceRange,
    pub src_usage: ImageUsageType,
    pub dst_usage: ImageUsageType,
    pub src: ImageAccessPattern,
    pub dst: ImageAccessPattern,
}

/// Transition of a whole buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferBarrier {
    pub buffer: BufferHandle,
    pub size: u64,
    pub src_usage: BufferUsageType,
    pub dst_usage: BufferUsageType,
    pub src: BufferAccessPattern,
    pub dst: BufferAccessPattern,
}

/// Global memory dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBarrier {
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
}

/// Everything one pipeline-barrier command carries.
///
/// The stage masks are the union of the stages of every contained barrier.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineBarrier {
    pub src_stages: PipelineStages,
    pub dst_stages: PipelineStages,
    pub memory_barriers: Vec<MemoryBarrier>,
    pub image_barriers: Vec<ImageBarrier>,
    pub buffer_barriers: Vec<BufferBarrier>,
}

impl PipelineBarrier {
    /// Create an empty barrier.
    pub fn new() -> Self {
        Self::default()
    }

    /// A barrier that waits for all prior work and makes every write visible
    /// to all later work.
    pub fn full_sync() -> Self {
        let mut barrier = Self::new();
        barrier.push_memory(
            PipelineStages::ALL_COMMANDS,
            PipelineStages::ALL_COMMANDS,
            MemoryBarrier {
                src_access: AccessFlags::MEMORY_READ | AccessFlags::MEMORY_WRITE,
                dst_access: AccessFlags::MEMORY_READ | AccessFlags::MEMORY_WRITE,
            },
        );
        barrier
    }

    /// Returns true if recording the barrier would do nothing.
    pub fn is_empty(&self) -> bool {
        self.memory_barriers.is_empty()
            && self.image_barriers.is_empty()
            && self.buffer_barriers.is_empty()
    }

    /// Add an image barrier.
    pub fn push_image(&mut self, barrier: ImageBarrier) {
        self.src_stages |= barrier.src.stages;
        self.dst_stages |= barrier.dst.stages;
        self.image_barriers.push(barrier);
    }

    /// Add a buffer barrier.
    pub fn push_buffer(&mut self, barrier: BufferBarrier) {
        self.src_stages |= barrier.src.stages;
        self.dst_stages |= barrier.dst.stages;
        self.buffer_barriers.push(barrier);
    }

    /// Add a memory barrier between the given stages.
    pub fn push_memory(
        &mut self,
        src_stages: PipelineStages,
        dst_stages: PipelineStages,
        barrier: MemoryBarrier,
    ) {
        self.src_stages |= src_stages;
        self.dst_stages |= dst_stages;
        self.memory_barriers.push(barrier);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SubresourceAccess {
    usage: ImageUsageType,
    // Transition performed by the render pass itself.
    folded: bool,
}

#[derive(Debug)]
struct ImageAccesses {
    info: ImageInfo,
    subresources: BTreeMap<(u32, u32), SubresourceAccess>,
}

/// Usages one task declares, keyed per subresource and per buffer.
#[derive(Debug)]
pub(crate) struct TaskUsages {
    images: BTreeMap<ImageHandle, ImageAccesses>,
    buffers: BTreeMap<BufferHandle, (BufferInfo, BufferUsageType)>,
    validate_overlaps: bool,
}

impl TaskUsages {
    pub(crate) fn new(validate_overlaps: bool) -> Self {
        Self {
            images: BTreeMap::new(),
            buffers: BTreeMap::new(),
            validate_overlaps,
        }
    }

    /// Declare `usage` for every subresource of `view`.
    pub(crate) fn add_image_view(&mut self, view: &ImageViewInfo, usage: ImageUsageType) {
        self.insert_view(view, usage, false);
    }

    /// Declare an attachment whose transition the render pass performs.
    pub(crate) fn add_folded_attachment(&mut self, view: &ImageViewInfo, usage: ImageUsageType) {
        self.insert_view(view, usage, true);
    }

    /// Declare `usage` for the whole of `buffer`.
    pub(crate) fn add_buffer(&mut self, buffer: &BufferInfo, usage: BufferUsageType) {
        if let Some((_, previous)) = self.buffers.get(&buffer.handle) {
            if *previous != usage {
                assert!(
                    !self.validate_overlaps,
                    "buffer {:?} declared as both {:?} and {:?} in one task",
                    buffer.handle, previous, usage
                );
                log::warn!(
                    "Buffer {:?} declared as both {:?} and {:?} in one task, using {:?}",
                    buffer.handle,
                    previous,
                    usage,
                    usage
                );
            }
        }
        self.buffers.insert(buffer.handle, (*buffer, usage));
    }

    fn insert_view(&mut self, view: &ImageViewInfo, usage: ImageUsageType, folded: bool) {
        let validate = self.validate_overlaps;
        let accesses = self
            .images
            .entry(view.image.handle)
            .or_insert_with(|| ImageAccesses {
                info: view.image,
                subresources: BTreeMap::new(),
            });
        let mut conflict = None;
        for subresource in view.range.subresources() {
            let access = SubresourceAccess { usage, folded };
            if let Some(previous) = accesses.subresources.insert(subresource, access) {
                if previous.usage != usage {
                    conflict = Some((subresource, previous.usage));
                }
            }
        }
        if let Some(((mip, layer), previous)) = conflict {
            assert!(
                !validate,
                "overlapping views of image {:?} declared as both {:?} and {:?} in one task \
                 (mip {}, layer {})",
                view.image.handle, previous, usage, mip, layer
            );
            log::warn!(
                "Overlapping views of image {:?} declared as both {:?} and {:?} in one task, \
                 using {:?}",
                view.image.handle,
                previous,
                usage,
                usage
            );
        }
    }
}

/// Last usage of every subresource and buffer touched so far in the frame.
#[derive(Debug, Default)]
pub(crate) struct UsageTracker {
    images: BTreeMap<(ImageHandle, u32, u32), ImageUsageType>,
    buffers: BTreeMap<BufferHandle, BufferUsageType>,
    known_views: Vec<(ImageHandle, ImageSubresourceRange, ImageUsageType)>,
    external_images: BTreeSet<ImageHandle>,
    external_buffers: BTreeSet<BufferHandle>,
}

impl UsageTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record an external image. Its subresources start out `Unknown`.
    pub(crate) fn add_external_image(&mut self, image: ImageHandle) {
        self.external_images.insert(image);
    }

    /// Record the usage an external view's subresources are in before the
    /// frame. Later declarations take precedence where ranges overlap.
    pub(crate) fn add_external_view(&mut self, view: &ImageViewInfo, known_usage: ImageUsageType) {
        self.external_images.insert(view.image.handle);
        self.known_views
            .push((view.image.handle, view.range, known_usage));
    }

    /// Record an external buffer. It starts out `Unknown`.
    pub(crate) fn add_external_buffer(&mut self, buffer: BufferHandle) {
        self.external_buffers.insert(buffer);
    }

    fn initial_image_usage(&self, image: ImageHandle, mip: u32, layer: u32) -> ImageUsageType {
        let known = self
            .known_views
            .iter()
            .rev()
            .find(|(handle, range, _)| *handle == image && range.contains_subresource(mip, layer));
        match known {
            Some((_, _, usage)) => *usage,
            None if self.external_images.contains(&image) => ImageUsageType::Unknown,
            None => ImageUsageType::None,
        }
    }

    /// Usage of (`mip`, `layer`) of `image` as of the last committed task.
    pub(crate) fn last_image_usage(&self, image: ImageHandle, mip: u32, layer: u32) -> ImageUsageType {
        self.images
            .get(&(image, mip, layer))
            .copied()
            .unwrap_or_else(|| self.initial_image_usage(image, mip, layer))
    }

    /// Usage of `buffer` as of the last committed task.
    pub(crate) fn last_buffer_usage(&self, buffer: BufferHandle) -> BufferUsageType {
        match self.buffers.get(&buffer) {
            Some(usage) => *usage,
            None if self.external_buffers.contains(&buffer) => BufferUsageType::Unknown,
            None => BufferUsageType::None,
        }
    }

    /// The last usage shared by every subresource of `view`, or `None` when
    /// they disagree.
    pub(crate) fn uniform_last_usage(&self, view: &ImageViewInfo) -> Option<ImageUsageType> {
        let mut usages = view
            .range
            .subresources()
            .map(|(mip, layer)| self.last_image_usage(view.image.handle, mip, layer));
        let first = usages.next()?;
        usages.all(|usage| usage == first).then_some(first)
    }

    /// Barrier bringing everything `task` touches into its declared usage.
    pub(crate) fn barrier_for(&self, task: &TaskUsages) -> PipelineBarrier {
        let mut barrier = PipelineBarrier::new();

        for (handle, accesses) in &task.images {
            let aspect = accesses.info.descriptor.format.aspect();
            for (range, src_usage, dst_usage) in self.image_transitions(*handle, accesses) {
                if src_usage == ImageUsageType::Unknown {
                    log::debug!(
                        "Image {:?} {:?} has unknown prior usage, waiting on all commands",
                        handle,
                        range
                    );
                }
                let image_barrier = ImageBarrier {
                    image: *handle,
                    aspect,
                    range,
                    src_usage,
                    dst_usage,
                    src: src_image_access_pattern(src_usage),
                    dst: dst_image_access_pattern(dst_usage),
                };
                log::trace!("Image barrier: {:?}", image_barrier);
                barrier.push_image(image_barrier);
            }
        }

        for (handle, (info, dst_usage)) in &task.buffers {
            let src_usage = self.last_buffer_usage(*handle);
            if !buffer_needs_barrier(src_usage, *dst_usage) {
                continue;
            }
            let buffer_barrier = BufferBarrier {
                buffer: *handle,
                size: info.size(),
                src_usage,
                dst_usage: *dst_usage,
                src: src_buffer_access_pattern(src_usage),
                dst: dst_buffer_access_pattern(*dst_usage),
            };
            log::trace!("Buffer barrier: {:?}", buffer_barrier);
            barrier.push_buffer(buffer_barrier);
        }

        barrier
    }

    /// Merged transitions of one image's non-folded subresources.
    fn image_transitions(
        &self,
        image: ImageHandle,
        accesses: &ImageAccesses,
    ) -> Vec<(ImageSubresourceRange, ImageUsageType, ImageUsageType)> {
        // Layer runs, in mip-major order.
        let mut runs: Vec<(ImageSubresourceRange, ImageUsageType, ImageUsageType)> = Vec::new();
        for (&(mip, layer), access) in &accesses.subresources {
            if access.folded {
                continue;
            }
            let src = self.last_image_usage(image, mip, layer);
            let dst = access.usage;
            if !image_needs_barrier(src, dst) {
                continue;
            }
            match runs.last_mut() {
                Some((range, s, d))
                    if *s == src && *d == dst && range.base_mip == mip && range.end_layer() == layer =>
                {
                    range.layer_count += 1;
                }
                _ => runs.push((ImageSubresourceRange::single(mip, layer), src, dst)),
            }
        }

        let mut merged: Vec<(ImageSubresourceRange, ImageUsageType, ImageUsageType)> = Vec::new();
        for (run, src, dst) in runs {
            let open = merged.iter_mut().find(|(range, s, d)| {
                *s == src
                    && *d == dst
                    && range.end_mip() == run.base_mip
                    && range.base_layer == run.base_layer
                    && range.layer_count == run.layer_count
            });
            match open {
                Some((range, _, _)) => range.mip_count += 1,
                None => merged.push((run, src, dst)),
            }
        }
        merged
    }

    /// Make `task`'s usages the last usages of what it touched.
    pub(crate) fn commit(&mut self, task: &TaskUsages) {
        for (handle, accesses) in &task.images {
            for (&(mip, layer), access) in &accesses.subresources {
                self.images.insert((*handle, mip, layer), access.usage);
            }
        }
        for (handle, (_, usage)) in &task.buffers {
            self.buffers.insert(*handle, *usage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        BufferDescriptor, BufferUsage, Format, ImageDescriptor, ImageUsage, ImageViewHandle,
    };

    fn image(raw: u64, mips: u32, layers: u32) -> ImageInfo {
        ImageInfo {
            handle: ImageHandle::from_raw(raw),
            descriptor: ImageDescriptor::new_2d(
                Format::Rgba8Unorm,
                256,
                256,
                ImageUsage::SAMPLED | ImageUsage::STORAGE,
            )
            .with_mip_count(mips)
            .with_layer_count(layers),
        }
    }

    fn view(image: ImageInfo, range: ImageSubresourceRange) -> ImageViewInfo {
        ImageViewInfo {
            handle: ImageViewHandle::from_raw(image.handle.as_raw() * 100),
            image,
            range,
        }
    }

    fn full_view(image: ImageInfo) -> ImageViewInfo {
        view(image, image.descriptor.full_range())
    }

    fn run_task(tracker: &mut UsageTracker, task: TaskUsages) -> PipelineBarrier {
        let barrier = tracker.barrier_for(&task);
        tracker.commit(&task);
        barrier
    }

    fn task_with(views: &[(ImageViewInfo, ImageUsageType)]) -> TaskUsages {
        let mut task = TaskUsages::new(true);
        for (view, usage) in views {
            task.add_image_view(view, *usage);
        }
        task
    }

    #[test]
    fn test_repeated_reads_need_no_barrier() {
        let mut tracker = UsageTracker::new();
        let target = full_view(image(1, 1, 1));

        run_task(&mut tracker, task_with(&[(target, ImageUsageType::TransferDst)]));
        let first = run_task(&mut tracker, task_with(&[(target, ImageUsageType::GraphicsShaderRead)]));
        let second =
            run_task(&mut tracker, task_with(&[(target, ImageUsageType::GraphicsShaderRead)]));

        assert_eq!(first.image_barriers.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_disjoint_mips_are_independent() {
        let mut tracker = UsageTracker::new();
        let img = image(1, 2, 1);
        let mip0 = view(img, ImageSubresourceRange::single(0, 0));
        let mip1 = view(img, ImageSubresourceRange::single(1, 0));

        run_task(&mut tracker, task_with(&[(full_view(img), ImageUsageType::TransferDst)]));
        run_task(
            &mut tracker,
            task_with(&[(mip0, ImageUsageType::ComputeShaderReadWrite)]),
        );
        let read = run_task(&mut tracker, task_with(&[(mip1, ImageUsageType::ComputeShaderRead)]));

        assert_eq!(read.image_barriers.len(), 1);
        let barrier = &read.image_barriers[0];
        assert_eq!(barrier.range, ImageSubresourceRange::single(1, 0));
        assert_eq!(barrier.src_usage, ImageUsageType::TransferDst);
        assert_eq!(barrier.dst_usage, ImageUsageType::ComputeShaderRead);
    }

    #[test]
    fn test_uniform_transitions_merge_into_one_barrier() {
        let tracker = UsageTracker::new();
        let img = image(1, 4, 6);
        let barrier = tracker.barrier_for(&task_with(&[(
            full_view(img),
            ImageUsageType::TransferDst,
        )]));

        assert_eq!(barrier.image_barriers.len(), 1);
        assert_eq!(barrier.image_barriers[0].range, ImageSubresourceRange::new(0, 4, 0, 6));
        assert_eq!(barrier.src_stages, PipelineStages::TOP_OF_PIPE);
        assert_eq!(barrier.dst_stages, PipelineStages::TRANSFER);
    }

    #[test]
    fn test_mixed_history_splits_into_runs() {
        let mut tracker = UsageTracker::new();
        let img = image(1, 2, 4);
        // Layers 1..3 of both mips were written by compute.
        let middle = view(img, ImageSubresourceRange::new(0, 2, 1, 2));
        run_task(
            &mut tracker,
            task_with(&[(middle, ImageUsageType::ComputeShaderReadWrite)]),
        );

        let barrier = tracker.barrier_for(&task_with(&[(
            full_view(img),
            ImageUsageType::GraphicsShaderRead,
        )]));

        let ranges: Vec<_> = barrier
            .image_barriers
            .iter()
            .map(|b| (b.range, b.src_usage))
            .collect();
        assert_eq!(
            ranges,
            vec![
                (ImageSubresourceRange::new(0, 2, 0, 1), ImageUsageType::None),
                (
                    ImageSubresourceRange::new(0, 2, 1, 2),
                    ImageUsageType::ComputeShaderReadWrite
                ),
                (ImageSubresourceRange::new(0, 2, 3, 1), ImageUsageType::None),
            ]
        );
    }

    #[test]
    fn test_external_view_known_usage() {
        let mut tracker = UsageTracker::new();
        let img = image(7, 2, 1);
        let mip0 = view(img, ImageSubresourceRange::single(0, 0));
        tracker.add_external_view(&mip0, ImageUsageType::TransferDst);

        assert_eq!(tracker.last_image_usage(img.handle, 0, 0), ImageUsageType::TransferDst);
        assert_eq!(tracker.last_image_usage(img.handle, 1, 0), ImageUsageType::Unknown);
        assert_eq!(
            tracker.last_image_usage(ImageHandle::from_raw(8), 0, 0),
            ImageUsageType::None
        );

        let barrier = tracker.barrier_for(&task_with(&[(mip0, ImageUsageType::GraphicsShaderRead)]));
        assert_eq!(barrier.image_barriers[0].src_usage, ImageUsageType::TransferDst);
    }

    #[test]
    fn test_folded_attachments_emit_nothing_but_commit() {
        let mut tracker = UsageTracker::new();
        let target = full_view(image(1, 1, 1));
        assert_eq!(tracker.uniform_last_usage(&target), Some(ImageUsageType::None));

        let mut task = TaskUsages::new(true);
        task.add_folded_attachment(&target, ImageUsageType::ColorAttachment);
        assert!(run_task(&mut tracker, task).is_empty());
        assert_eq!(
            tracker.uniform_last_usage(&target),
            Some(ImageUsageType::ColorAttachment)
        );
    }

    #[test]
    fn test_uniform_last_usage_detects_disagreement() {
        let mut tracker = UsageTracker::new();
        let img = image(1, 2, 1);
        run_task(
            &mut tracker,
            task_with(&[(
                view(img, ImageSubresourceRange::single(1, 0)),
                ImageUsageType::TransferDst,
            )]),
        );
        assert_eq!(tracker.uniform_last_usage(&full_view(img)), None);
    }

    #[test]
    fn test_buffer_transitions() {
        let mut tracker = UsageTracker::new();
        let transient = BufferInfo {
            handle: BufferHandle::from_raw(1),
            descriptor: BufferDescriptor::new(1024, BufferUsage::STORAGE),
        };
        let external = BufferInfo {
            handle: BufferHandle::from_raw(2),
            descriptor: BufferDescriptor::new(64, BufferUsage::UNIFORM),
        };
        tracker.add_external_buffer(external.handle);

        let mut first = TaskUsages::new(true);
        first.add_buffer(&transient, BufferUsageType::ComputeShaderReadWrite);
        first.add_buffer(&external, BufferUsageType::ComputeShaderRead);
        let barrier = run_task(&mut tracker, first);
        assert_eq!(barrier.buffer_barriers.len(), 1);
        assert_eq!(barrier.buffer_barriers[0].buffer, external.handle);
        assert_eq!(barrier.buffer_barriers[0].src_usage, BufferUsageType::Unknown);

        let mut second = TaskUsages::new(true);
        second.add_buffer(&transient, BufferUsageType::GraphicsShaderRead);
        let barrier = run_task(&mut tracker, second);
        assert_eq!(barrier.buffer_barriers.len(), 1);
        assert_eq!(barrier.buffer_barriers[0].size, 1024);
        assert!(barrier.dst_stages.contains(PipelineStages::VERTEX_INPUT));
    }

    #[test]
    #[should_panic(expected = "overlapping views")]
    fn test_overlapping_views_with_different_usages_panic() {
        let img = image(1, 2, 1);
        task_with(&[
            (full_view(img), ImageUsageType::ComputeShaderRead),
            (
                view(img, ImageSubresourceRange::single(1, 0)),
                ImageUsageType::ComputeShaderReadWrite,
            ),
        ]);
    }

    #[test]
    fn test_overlap_without_validation_takes_last() {
        let img = image(1, 1, 1);
        let mut task = TaskUsages::new(false);
        task.add_image_view(&full_view(img), ImageUsageType::ComputeShaderRead);
        task.add_image_view(&full_view(img), ImageUsageType::ComputeShaderReadWrite);

        let barrier = UsageTracker::new().barrier_for(&task);
        assert_eq!(
            barrier.image_barriers[0].dst_usage,
            ImageUsageType::ComputeShaderReadWrite
        );
    }

    #[test]
    fn test_full_sync() {
        let barrier = PipelineBarrier::full_sync();
        assert!(!barrier.is_empty());
        assert_eq!(barrier.src_stages, PipelineStages::ALL_COMMANDS);
        assert_eq!(barrier.dst_stages, PipelineStages::ALL_COMMANDS);
        assert!(PipelineBarrier::new().is_empty());
    }
}
