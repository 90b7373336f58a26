//! Opaque native object handles.
//!
//! A handle is the raw 64-bit value of the native object (`vk::Image`,
//! `vk::Buffer`, ...) for the Vulkan backend and a counter value for the
//! dummy backend. Handles are compared and ordered by value, which is what
//! the caches and the barrier tracker key on.

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw native handle value.
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw native handle value.
            pub const fn as_raw(self) -> u64 {
                self.0
            }
        }
    };
}

native_handle!(
    /// Handle of a native image.
    ImageHandle
);
native_handle!(
    /// Handle of a native image view.
    ImageViewHandle
);
native_handle!(
    /// Handle of a native buffer.
    BufferHandle
);
native_handle!(
    /// Handle of a native render-pass object.
    RenderPassHandle
);
native_handle!(
    /// Handle of a native framebuffer object.
    FramebufferHandle
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_round_trip_and_order() {
        let a = ImageHandle::from_raw(7);
        let b = ImageHandle::from_raw(9);
        assert_eq!(a.as_raw(), 7);
        assert!(a < b);
    }
}
