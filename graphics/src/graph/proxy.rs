//! Resource proxies and their ownership handles.
//!
//! A proxy is a slot in one of the graph's pools describing where a resource
//! comes from: a transient descriptor resolved through a cache at execute
//! time, or an external object owned by the caller. Callers hold proxies
//! through [`ProxyUnique`] handles; dropping the handle frees the slot.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use lilium_core::pool::{Pool, PoolId};

use crate::access::ImageUsageType;
use crate::types::{
    BufferDescriptor, BufferInfo, ImageDescriptor, ImageInfo, ImageSubresourceRange,
    ImageViewInfo,
};

macro_rules! proxy_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) PoolId);

        impl $name {
            /// Slot index inside the graph's pool.
            pub fn index(self) -> usize {
                self.0.index()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

proxy_id!(
    /// Id of an image proxy.
    ImageProxyId,
    "image"
);
proxy_id!(
    /// Id of an image-view proxy.
    ImageViewProxyId,
    "view"
);
proxy_id!(
    /// Id of a buffer proxy.
    BufferProxyId,
    "buffer"
);

/// Where an image proxy gets its image from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ImageSource {
    Transient(ImageDescriptor),
    External(ImageInfo),
}

impl ImageSource {
    pub(crate) fn descriptor(&self) -> ImageDescriptor {
        match self {
            Self::Transient(descriptor) => *descriptor,
            Self::External(info) => info.descriptor,
        }
    }
}

/// Where an image-view proxy gets its view from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ImageViewSource {
    Transient {
        image: ImageProxyId,
        range: ImageSubresourceRange,
    },
    External {
        info: ImageViewInfo,
        known_usage: ImageUsageType,
    },
}

/// Where a buffer proxy gets its buffer from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum BufferSource {
    Transient(BufferDescriptor),
    External(BufferInfo),
}

/// The three proxy pools of a frame graph.
#[derive(Debug, Default)]
pub struct ProxyPools {
    pub(crate) images: Pool<ImageSource>,
    pub(crate) image_views: Pool<ImageViewSource>,
    pub(crate) buffers: Pool<BufferSource>,
}

pub(crate) type SharedPools = Rc<RefCell<ProxyPools>>;

mod sealed {
    pub trait Sealed {
        fn release_from(self, pools: &mut super::ProxyPools);
    }
}

/// A proxy id kind that a [`ProxyUnique`] can own.
pub trait ProxyId: sealed::Sealed + Copy + fmt::Debug + fmt::Display {}

impl sealed::Sealed for ImageProxyId {
    fn release_from(self, pools: &mut ProxyPools) {
        pools.images.release(self.0);
    }
}
impl ProxyId for ImageProxyId {}

impl sealed::Sealed for ImageViewProxyId {
    fn release_from(self, pools: &mut ProxyPools) {
        pools.image_views.release(self.0);
    }
}
impl ProxyId for ImageViewProxyId {}

impl sealed::Sealed for BufferProxyId {
    fn release_from(self, pools: &mut ProxyPools) {
        pools.buffers.release(self.0);
    }
}
impl ProxyId for BufferProxyId {}

/// Exclusive ownership handle of a proxy.
///
/// Dropping the handle releases the proxy slot. [`ProxyUnique::detach`]
/// hands the bare id out instead; the caller then releases it through the
/// graph's `release_*` methods. Handles that outlive
/// [`FrameGraph::clear`](super::FrameGraph::clear) do nothing on drop.
pub struct ProxyUnique<I: ProxyId> {
    id: I,
    pools: Weak<RefCell<ProxyPools>>,
}

/// Owning handle of an image proxy.
pub type ImageProxyUnique = ProxyUnique<ImageProxyId>;
/// Owning handle of an image-view proxy.
pub type ImageViewProxyUnique = ProxyUnique<ImageViewProxyId>;
/// Owning handle of a buffer proxy.
pub type BufferProxyUnique = ProxyUnique<BufferProxyId>;

impl<I: ProxyId> ProxyUnique<I> {
    pub(crate) fn new(id: I, pools: &SharedPools) -> Self {
        Self {
            id,
            pools: Rc::downgrade(pools),
        }
    }

    /// The owned proxy id.
    pub fn id(&self) -> I {
        self.id
    }

    /// Give up ownership without releasing the proxy.
    pub fn detach(mut self) -> I {
        self.pools = Weak::new();
        self.id
    }
}

impl<I: ProxyId> Drop for ProxyUnique<I> {
    fn drop(&mut self) {
        if let Some(pools) = self.pools.upgrade() {
            log::trace!("Releasing proxy {}", self.id);
            sealed::Sealed::release_from(self.id, &mut pools.borrow_mut());
        }
    }
}

impl<I: ProxyId> fmt::Debug for ProxyUnique<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyUnique")
            .field("id", &self.id)
            .field("attached", &(self.pools.strong_count() > 0))
            .finish()
    }
}

impl From<&ImageProxyUnique> for ImageProxyId {
    fn from(handle: &ImageProxyUnique) -> Self {
        handle.id()
    }
}

impl From<&ImageViewProxyUnique> for ImageViewProxyId {
    fn from(handle: &ImageViewProxyUnique) -> Self {
        handle.id()
    }
}

impl From<&BufferProxyUnique> for BufferProxyId {
    fn from(handle: &BufferProxyUnique) -> Self {
        handle.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferUsage, Format, ImageUsage};

    fn shared() -> SharedPools {
        Rc::new(RefCell::new(ProxyPools::default()))
    }

    fn add_buffer(pools: &SharedPools) -> BufferProxyUnique {
        let id = pools
            .borrow_mut()
            .buffers
            .add(BufferSource::Transient(BufferDescriptor::new(
                16,
                BufferUsage::STORAGE,
            )));
        ProxyUnique::new(BufferProxyId(id), pools)
    }

    #[test]
    fn test_drop_releases_slot() {
        let pools = shared();
        let handle = add_buffer(&pools);
        assert_eq!(pools.borrow().buffers.len(), 1);
        drop(handle);
        assert!(pools.borrow().buffers.is_empty());
    }

    #[test]
    fn test_released_id_is_reused() {
        let pools = shared();
        let a = add_buffer(&pools);
        let b = add_buffer(&pools);
        let a_id = a.id();
        assert_eq!((a_id.index(), b.id().index()), (0, 1));

        drop(a);
        let c = add_buffer(&pools);
        assert_eq!(c.id(), a_id);
    }

    #[test]
    fn test_detach_keeps_slot() {
        let pools = shared();
        let id = add_buffer(&pools).detach();
        assert!(pools.borrow().buffers.contains(id.0));
    }

    #[test]
    fn test_handle_outliving_pools_is_inert() {
        let pools = shared();
        let id = pools
            .borrow_mut()
            .images
            .add(ImageSource::Transient(ImageDescriptor::new_2d(
                Format::Rgba8Unorm,
                8,
                8,
                ImageUsage::SAMPLED,
            )));
        let handle = ProxyUnique::new(ImageProxyId(id), &pools);
        drop(pools);
        drop(handle);
    }

    #[test]
    fn test_display() {
        assert_eq!(ImageViewProxyId(PoolId::from_index(3)).to_string(), "view#3");
    }
}
