//! Transient resource caches.
//!
//! The frame graph draws every transient image and buffer from these caches:
//! - [`ImageCache`] - images keyed by [`ImageDescriptor`](crate::types::ImageDescriptor)
//! - [`BufferCache`] - buffers keyed by [`BufferDescriptor`](crate::types::BufferDescriptor)
//! - [`ImageViewCache`] - views keyed by image and subresource range
//!
//! Image and buffer caches are released at the start of every frame; the
//! view cache lives until the graph is cleared.

mod cache;

pub use cache::{
    BufferCache, CacheEntry, ImageCache, ImageViewCache, ImageViewKey, ResourceCache,
};
