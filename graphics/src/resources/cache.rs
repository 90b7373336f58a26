//! Structurally keyed resource caches.
//!
//! Each key maps to a list of instances plus a `used` watermark. A request
//! hands out the next instance after the watermark, constructing one when the
//! list is exhausted. [`ResourceCache::release`] rewinds every watermark
//! without destroying anything, so the next frame reuses the same native
//! objects in the same order.
//!
//! ```text
//! frame N:   get(k) get(k)          -> [a, b]      used = 2
//! release                           -> [a, b]      used = 0
//! frame N+1: get(k) get(k) get(k)   -> [a, b, c]   used = 3
//! ```

use std::collections::BTreeMap;

use crate::backend::{GpuBackend, GpuBuffer, GpuImage, GpuImageView};
use crate::error::GraphicsError;
use crate::types::{
    BufferDescriptor, BufferInfo, Format, ImageDescriptor, ImageHandle, ImageInfo,
    ImageSubresourceRange, ImageViewInfo,
};

/// Instances built for one key and how many were handed out this frame.
#[derive(Debug)]
pub struct CacheEntry<V> {
    instances: Vec<V>,
    used: usize,
}

impl<V> Default for CacheEntry<V> {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            used: 0,
        }
    }
}

/// A cache of instances keyed by a totally ordered structural key.
#[derive(Debug)]
pub struct ResourceCache<K, V> {
    entries: BTreeMap<K, CacheEntry<V>>,
}

impl<K, V> Default for ResourceCache<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, V> ResourceCache<K, V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next unused instance for `key`, building one with
    /// `create` if every existing instance is already in use.
    pub fn get_or_create<E>(
        &mut self,
        key: &K,
        create: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<&V, E> {
        let entry = self.entries.entry(key.clone()).or_default();
        if entry.used == entry.instances.len() {
            entry.instances.push(create(key)?);
        }
        entry.used += 1;
        Ok(&entry.instances[entry.used - 1])
    }

    /// Rewind every watermark. Instances stay alive for reuse.
    pub fn release(&mut self) {
        for entry in self.entries.values_mut() {
            entry.used = 0;
        }
    }

    /// Number of instances ever built for `key`.
    pub fn instance_count(&self, key: &K) -> usize {
        self.entries.get(key).map_or(0, |entry| entry.instances.len())
    }

    /// Number of instances of `key` handed out since the last release.
    pub fn used_count(&self, key: &K) -> usize {
        self.entries.get(key).map_or(0, |entry| entry.used)
    }

    /// Number of instances across all keys.
    pub fn total_instances(&self) -> usize {
        self.entries.values().map(|entry| entry.instances.len()).sum()
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Drop every instance.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Pool of transient images keyed by [`ImageDescriptor`].
#[derive(Debug, Default)]
pub struct ImageCache {
    cache: ResourceCache<ImageDescriptor, GpuImage>,
}

impl ImageCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the next free image matching `descriptor` for this frame.
    pub fn get_image(
        &mut self,
        backend: &dyn GpuBackend,
        descriptor: &ImageDescriptor,
    ) -> Result<ImageInfo, GraphicsError> {
        self.cache
            .get_or_create(descriptor, |d| backend.create_image(d))
            .map(GpuImage::info)
    }

    /// Make every image available again for the next frame.
    pub fn release(&mut self) {
        self.cache.release();
    }

    /// Number of images built for `descriptor`.
    pub fn instance_count(&self, descriptor: &ImageDescriptor) -> usize {
        self.cache.instance_count(descriptor)
    }

    /// Number of images across all descriptors.
    pub fn total_instances(&self) -> usize {
        self.cache.total_instances()
    }

    /// Destroy every image.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Pool of transient buffers keyed by [`BufferDescriptor`].
#[derive(Debug, Default)]
pub struct BufferCache {
    cache: ResourceCache<BufferDescriptor, GpuBuffer>,
}

impl BufferCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the next free buffer matching `descriptor` for this frame.
    pub fn get_buffer(
        &mut self,
        backend: &dyn GpuBackend,
        descriptor: &BufferDescriptor,
    ) -> Result<BufferInfo, GraphicsError> {
        self.cache
            .get_or_create(descriptor, |d| backend.create_buffer(d))
            .map(GpuBuffer::info)
    }

    /// Make every buffer available again for the next frame.
    pub fn release(&mut self) {
        self.cache.release();
    }

    /// Number of buffers built for `descriptor`.
    pub fn instance_count(&self, descriptor: &BufferDescriptor) -> usize {
        self.cache.instance_count(descriptor)
    }

    /// Number of buffers across all descriptors.
    pub fn total_instances(&self) -> usize {
        self.cache.total_instances()
    }

    /// Destroy every buffer.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Key of a cached image view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageViewKey {
    /// Image the view is created from.
    pub image: ImageHandle,
    /// Format of that image.
    pub format: Format,
    /// Subresources covered.
    pub range: ImageSubresourceRange,
}

/// Views derived from (image, range) pairs.
///
/// Views are immutable, so one view per key is built and kept until
/// [`ImageViewCache::clear`]. There is no per-frame release. Views of an
/// external image stay cached after the caller destroys that image; clear the
/// cache (through `FrameGraph::clear`) when external images are recreated.
#[derive(Debug, Default)]
pub struct ImageViewCache {
    views: BTreeMap<ImageViewKey, GpuImageView>,
}

impl ImageViewCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the view of `range` of `image`, building it on first request.
    pub fn get_image_view(
        &mut self,
        backend: &dyn GpuBackend,
        image: &ImageInfo,
        range: &ImageSubresourceRange,
    ) -> Result<ImageViewInfo, GraphicsError> {
        let key = ImageViewKey {
            image: image.handle,
            format: image.descriptor.format,
            range: *range,
        };
        if let Some(view) = self.views.get(&key) {
            return Ok(view.info());
        }
        let view = backend.create_image_view(image, range)?;
        let info = view.info();
        self.views.insert(key, view);
        Ok(info)
    }

    /// Number of cached views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Returns true if no view is cached.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Destroy every view.
    pub fn clear(&mut self) {
        self.views.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::types::{BufferUsage, ImageUsage};

    fn color_desc() -> ImageDescriptor {
        ImageDescriptor::new_2d(Format::Rgba8Unorm, 64, 64, ImageUsage::COLOR_ATTACHMENT)
    }

    #[test]
    fn test_watermark_hands_out_distinct_instances() {
        let mut cache: ResourceCache<u32, &'static str> = ResourceCache::new();
        let names = ["a", "b", "c"];
        let mut next = names.iter();
        let mut create = |_: &u32| Ok::<_, ()>(*next.next().unwrap());

        assert_eq!(*cache.get_or_create(&7, &mut create).unwrap(), "a");
        assert_eq!(*cache.get_or_create(&7, &mut create).unwrap(), "b");
        cache.release();
        assert_eq!(*cache.get_or_create(&7, &mut create).unwrap(), "a");
        assert_eq!(cache.instance_count(&7), 2);
        assert_eq!(cache.used_count(&7), 1);
    }

    #[test]
    fn test_create_error_leaves_entry_unchanged() {
        let mut cache: ResourceCache<u32, u32> = ResourceCache::new();
        assert!(cache.get_or_create(&1, |_| Err::<u32, _>("boom")).is_err());
        assert_eq!(cache.instance_count(&1), 0);
        assert_eq!(cache.used_count(&1), 0);
    }

    #[test]
    fn test_image_cache_reuses_across_release() {
        let backend = DummyBackend::new();
        let mut cache = ImageCache::new();

        let first = cache.get_image(&backend, &color_desc()).unwrap();
        cache.release();
        let second = cache.get_image(&backend, &color_desc()).unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.created_images(), 1);
    }

    #[test]
    fn test_image_cache_grows_never_shrinks() {
        let backend = DummyBackend::new();
        let mut cache = ImageCache::new();
        let desc = color_desc();

        for _ in 0..2 {
            cache.get_image(&backend, &desc).unwrap();
        }
        cache.release();
        for _ in 0..5 {
            cache.get_image(&backend, &desc).unwrap();
        }
        assert_eq!(cache.instance_count(&desc), 5);

        cache.release();
        cache.get_image(&backend, &desc).unwrap();
        assert_eq!(cache.instance_count(&desc), 5);
        assert_eq!(backend.created_images(), 5);
    }

    #[test]
    fn test_different_keys_do_not_share() {
        let backend = DummyBackend::new();
        let mut cache = BufferCache::new();
        let a = BufferDescriptor::new(256, BufferUsage::STORAGE);
        let b = BufferDescriptor::new(512, BufferUsage::STORAGE);

        let buf_a = cache.get_buffer(&backend, &a).unwrap();
        let buf_b = cache.get_buffer(&backend, &b).unwrap();
        assert_ne!(buf_a.handle, buf_b.handle);
        assert_eq!(cache.total_instances(), 2);
    }

    #[test]
    fn test_view_cache_has_one_view_per_range() {
        let backend = DummyBackend::new();
        let mut images = ImageCache::new();
        let mut views = ImageViewCache::new();
        let image = images
            .get_image(&backend, &color_desc().with_mip_count(2))
            .unwrap();

        let mip0 = ImageSubresourceRange::single(0, 0);
        let mip1 = ImageSubresourceRange::single(1, 0);
        let a = views.get_image_view(&backend, &image, &mip0).unwrap();
        let b = views.get_image_view(&backend, &image, &mip0).unwrap();
        let c = views.get_image_view(&backend, &image, &mip1).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.handle, c.handle);
        assert_eq!(views.len(), 2);
        assert_eq!(backend.created_image_views(), 2);
    }
}
