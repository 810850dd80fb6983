use std::alloc;
use std::alloc::Layout;

use thiserror::Error;

use crate::device::Device;

/// Row pitch alignment in bytes of device-accessible allocations.
pub const DEVICE_ROW_ALIGNMENT: usize = 256;

/// Base address alignment in bytes of device-accessible allocations.
pub const DEVICE_BASE_ALIGNMENT: usize = 256;

/// An error type for tensor allocator operations.
#[derive(Debug, Error, PartialEq)]
pub enum TensorAllocatorError {
    /// An error occurred during memory allocation.
    #[error("Invalid tensor layout {0}")]
    LayoutError(core::alloc::LayoutError),

    /// An error occurred during memory allocation.
    #[error("Null pointer")]
    NullPointer,
}

/// A trait for allocating and deallocating memory for tensors.
///
/// Allocations are zero-initialized.
pub trait TensorAllocator: Send + Sync + 'static {
    /// Allocates memory for a tensor with the given layout.
    fn alloc(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError>;

    /// Deallocates memory for a tensor with the given layout.
    fn dealloc(&self, ptr: *mut u8, layout: Layout);

    /// Returns the device the memory lives on.
    fn device(&self) -> Device;

    /// Returns the alignment in bytes applied to the pitch of each row.
    fn row_alignment(&self) -> usize {
        1
    }
}

fn alloc_zeroed(layout: Layout) -> Result<*mut u8, TensorAllocatorError> {
    if layout.size() == 0 {
        // zero-sized buffers still need a unique, aligned, non-null address
        return Ok(layout.align() as *mut u8);
    }
    let ptr = unsafe { alloc::alloc_zeroed(layout) };
    if ptr.is_null() {
        Err(TensorAllocatorError::NullPointer)?
    }
    Ok(ptr)
}

fn dealloc_nonzero(ptr: *mut u8, layout: Layout) {
    if !ptr.is_null() && layout.size() != 0 {
        unsafe { alloc::dealloc(ptr, layout) }
    }
}

/// A tensor allocator for host-only memory using the system allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuAllocator;

impl TensorAllocator for CpuAllocator {
    fn alloc(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError> {
        alloc_zeroed(layout)
    }

    #[allow(clippy::not_unsafe_ptr_arg_deref)]
    fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        dealloc_nonzero(ptr, layout)
    }

    fn device(&self) -> Device {
        Device::Cpu
    }
}

/// A tensor allocator for device-accessible memory.
///
/// The memory is visible from the host address space and served to kernels enqueued on a
/// stream of the same device. Base addresses and row pitches are aligned to
/// [`DEVICE_BASE_ALIGNMENT`] and [`DEVICE_ROW_ALIGNMENT`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DeviceAllocator {
    device_id: usize,
}

impl DeviceAllocator {
    /// Creates an allocator for the device with the given ID.
    pub fn new(device_id: usize) -> Self {
        Self { device_id }
    }

    /// Returns the device ID.
    pub fn device_id(&self) -> usize {
        self.device_id
    }
}

impl TensorAllocator for DeviceAllocator {
    fn alloc(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError> {
        let layout = layout
            .align_to(DEVICE_BASE_ALIGNMENT)
            .map_err(TensorAllocatorError::LayoutError)?;
        alloc_zeroed(layout)
    }

    #[allow(clippy::not_unsafe_ptr_arg_deref)]
    fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // alloc widened the alignment, dealloc must see the same layout
        if let Ok(layout) = layout.align_to(DEVICE_BASE_ALIGNMENT) {
            dealloc_nonzero(ptr, layout)
        }
    }

    fn device(&self) -> Device {
        Device::Gpu {
            device_id: self.device_id,
        }
    }

    fn row_alignment(&self) -> usize {
        DEVICE_ROW_ALIGNMENT
    }
}
