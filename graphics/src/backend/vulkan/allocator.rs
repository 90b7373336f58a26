//! GPU memory allocator integration using gpu-allocator.

use ash::vk;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::{AllocationError, MemoryLocation};
use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::types::BufferUsage;

/// Create a memory allocator for the Vulkan device.
pub fn create_allocator(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
) -> Result<Allocator, GraphicsError> {
    Allocator::new(&AllocatorCreateDesc {
        instance: instance.clone(),
        device,
        physical_device,
        debug_settings: Default::default(),
        buffer_device_address: false,
        allocation_sizes: gpu_allocator::AllocationSizes::default(),
    })
    .map_err(|e| map_allocation_error("memory allocator", e))
}

/// Allocate memory for a resource with the given requirements.
pub fn allocate(
    allocator: &Mutex<Allocator>,
    name: &str,
    requirements: vk::MemoryRequirements,
    location: MemoryLocation,
    linear: bool,
) -> Result<Allocation, GraphicsError> {
    allocator
        .lock()
        .allocate(&AllocationCreateDesc {
            name,
            requirements,
            location,
            linear,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })
        .map_err(|e| map_allocation_error(name, e))
}

/// Memory location for a buffer, chosen from its usage flags.
///
/// Buffers the CPU reads back live in `GpuToCpu` memory, buffers the CPU
/// writes in `CpuToGpu`, everything else in device-local memory.
pub fn buffer_memory_location(usage: BufferUsage) -> MemoryLocation {
    if usage.contains(BufferUsage::MAP_READ) {
        MemoryLocation::GpuToCpu
    } else if usage.contains(BufferUsage::MAP_WRITE) {
        MemoryLocation::CpuToGpu
    } else {
        MemoryLocation::GpuOnly
    }
}

fn map_allocation_error(what: &str, error: AllocationError) -> GraphicsError {
    match error {
        AllocationError::OutOfMemory => GraphicsError::OutOfMemory,
        other => GraphicsError::ResourceCreationFailed(format!(
            "Failed to allocate memory for {}: {}",
            what, other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_memory_location() {
        assert_eq!(
            buffer_memory_location(BufferUsage::STORAGE),
            MemoryLocation::GpuOnly
        );
        assert_eq!(
            buffer_memory_location(BufferUsage::UNIFORM | BufferUsage::MAP_WRITE),
            MemoryLocation::CpuToGpu
        );
        assert_eq!(
            buffer_memory_location(BufferUsage::TRANSFER_DST | BufferUsage::MAP_READ),
            MemoryLocation::GpuToCpu
        );
    }
}
