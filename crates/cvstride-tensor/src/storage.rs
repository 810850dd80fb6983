//! Arc-based byte storage shared between tensors, exported data objects and enqueued work.

use std::{alloc::Layout, ptr::NonNull, sync::Arc};

use crate::{
    allocator::{TensorAllocator, TensorAllocatorError},
    device::Device,
};

/// Inner storage implementation that holds the actual memory.
struct StorageImpl {
    /// The pointer to the tensor memory which must be non-null.
    ptr: NonNull<u8>,
    /// The memory layout used for allocation.
    layout: Layout,
    /// The allocator that owns the memory.
    alloc: Box<dyn TensorAllocator>,
}

// SAFETY: the buffer is only reachable through `TensorStorage`, which hands out shared slices
// only while it is the unique owner and raw pointers otherwise.
unsafe impl Send for StorageImpl {}
unsafe impl Sync for StorageImpl {}

impl Drop for StorageImpl {
    fn drop(&mut self) {
        self.alloc.dealloc(self.ptr.as_ptr(), self.layout);
    }
}

impl std::fmt::Debug for StorageImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageImpl")
            .field("ptr", &self.ptr)
            .field("layout", &self.layout)
            .field("device", &self.alloc.device())
            .finish()
    }
}

/// Reference counted byte buffer allocated on a [`Device`].
///
/// Cloning is cheap and yields a new reference to the same memory. Host access through
/// [`TensorStorage::as_bytes`] and [`TensorStorage::as_bytes_mut`] requires that the storage is
/// not shared, i.e. no exported data object and no pending stream work holds a reference.
#[derive(Clone, Debug)]
pub struct TensorStorage {
    inner: Arc<StorageImpl>,
}

impl TensorStorage {
    /// Allocates `len` zeroed bytes aligned to `align` with the given allocator.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout is invalid or the allocation fails.
    pub fn new<A: TensorAllocator>(
        len: usize,
        align: usize,
        alloc: A,
    ) -> Result<Self, TensorAllocatorError> {
        let layout =
            Layout::from_size_align(len, align).map_err(TensorAllocatorError::LayoutError)?;
        let ptr = alloc.alloc(layout)?;
        let ptr = NonNull::new(ptr).ok_or(TensorAllocatorError::NullPointer)?;
        Ok(Self {
            inner: Arc::new(StorageImpl {
                ptr,
                layout,
                alloc: Box::new(alloc),
            }),
        })
    }

    /// Returns the pointer to the first byte.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.inner.ptr.as_ptr()
    }

    /// Returns the mutable pointer to the first byte.
    ///
    /// Writing through the pointer requires that no other reference reads or writes the same
    /// bytes concurrently.
    #[inline]
    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.inner.ptr.as_ptr()
    }

    /// Returns the number of bytes in the storage.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.layout.size()
    }

    /// Returns true if the storage has no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the device where the memory is allocated.
    #[inline]
    pub fn device(&self) -> Device {
        self.inner.alloc.device()
    }

    /// Returns the row pitch alignment of the allocator.
    #[inline]
    pub fn row_alignment(&self) -> usize {
        self.inner.alloc.row_alignment()
    }

    /// Returns true if this storage is uniquely owned (no other Arc references).
    #[inline]
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Returns true if both handles refer to the same memory.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the storage bytes for host reading.
    ///
    /// # Panics
    ///
    /// Panics if the storage is shared with an exported data object or pending stream work.
    pub fn as_bytes(&self) -> &[u8] {
        assert!(
            self.is_unique(),
            "Cannot access storage from the host while it is shared. Drop exported data and synchronize the stream first."
        );
        // SAFETY: ptr is valid for len bytes, and no other reference can write to it while unique
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.len()) }
    }

    /// Returns the storage bytes for host writing.
    ///
    /// # Panics
    ///
    /// Panics if the storage is shared with an exported data object or pending stream work.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        assert!(
            self.is_unique(),
            "Cannot access storage from the host while it is shared. Drop exported data and synchronize the stream first."
        );
        // SAFETY: ptr is valid for len bytes and exclusively owned
        unsafe { std::slice::from_raw_parts_mut(self.as_mut_ptr(), self.len()) }
    }
}
