//! Buffer types and descriptors.

use bitflags::bitflags;

use super::BufferHandle;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be used as a storage buffer.
        const STORAGE = 1 << 3;
        /// Buffer can be used for indirect draw/dispatch arguments.
        const INDIRECT = 1 << 4;
        /// Buffer can be copied from.
        const TRANSFER_SRC = 1 << 5;
        /// Buffer can be copied to.
        const TRANSFER_DST = 1 << 6;
        /// Buffer is read back by the CPU.
        const MAP_READ = 1 << 7;
        /// Buffer is written by the CPU.
        const MAP_WRITE = 1 << 8;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Structural description of a buffer; the key transient buffers are
/// pooled by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferDescriptor {
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self { size, usage }
    }

    /// Descriptor for `count` elements of `T`.
    pub fn for_elements<T: bytemuck::Pod>(count: usize, usage: BufferUsage) -> Self {
        Self::new((count * std::mem::size_of::<T>()) as u64, usage)
    }
}

/// A resolved buffer: native handle plus the descriptor it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferInfo {
    /// Native handle.
    pub handle: BufferHandle,
    /// Structural description.
    pub descriptor: BufferDescriptor,
}

impl BufferInfo {
    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }
}
