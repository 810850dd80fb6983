use crate::{
    data_type::DataType,
    device::Device,
    layout::{TensorLayout, MAX_TENSOR_RANK},
    storage::TensorStorage,
    tensor::TensorError,
};

/// Pitch-linear strided view of tensor memory, as handed to kernels.
///
/// The data object describes memory but does not own it. When exported from a
/// [`crate::tensor::Tensor`] it keeps the tensor storage alive, so it can be moved into work
/// enqueued on a stream that outlives the borrow of the tensor. Strides are in bytes and use the
/// wide `i64` type; wraps narrow them to `i32`.
#[derive(Clone, Debug)]
pub struct TensorDataStrided {
    base_ptr: *mut u8,
    shape: [i64; MAX_TENSOR_RANK],
    strides: [i64; MAX_TENSOR_RANK],
    rank: usize,
    dtype: DataType,
    layout: TensorLayout,
    device: Device,
    _owner: Option<TensorStorage>,
}

// SAFETY: the data object only carries the address; every dereference goes through wraps whose
// access methods are unsafe and put the synchronization burden on the caller.
unsafe impl Send for TensorDataStrided {}
unsafe impl Sync for TensorDataStrided {}

fn copy_dims(values: &[i64]) -> [i64; MAX_TENSOR_RANK] {
    let mut out = [0i64; MAX_TENSOR_RANK];
    out[..values.len()].copy_from_slice(values);
    out
}

impl TensorDataStrided {
    pub(crate) fn from_storage(
        storage: TensorStorage,
        shape: &[i64],
        strides: &[i64],
        dtype: DataType,
        layout: TensorLayout,
    ) -> Self {
        Self {
            base_ptr: storage.as_mut_ptr(),
            shape: copy_dims(shape),
            strides: copy_dims(strides),
            rank: shape.len(),
            dtype,
            layout,
            device: storage.device(),
            _owner: Some(storage),
        }
    }

    /// Describes externally owned memory.
    ///
    /// # Errors
    ///
    /// Returns an error if `shape` and `strides` differ in length, the rank is out of range or
    /// the layout rank does not match.
    ///
    /// # Safety
    ///
    /// `base_ptr` must stay valid for every address reachable through `shape` and `strides`
    /// for as long as the data object or any wrap built from it is used.
    pub unsafe fn from_raw_parts(
        base_ptr: *mut u8,
        shape: &[i64],
        strides: &[i64],
        dtype: DataType,
        layout: TensorLayout,
        device: Device,
    ) -> Result<Self, TensorError> {
        if shape.len() != strides.len() {
            return Err(TensorError::InvalidShape(format!(
                "shape {shape:?} and strides {strides:?} differ in rank"
            )));
        }
        if shape.is_empty() || shape.len() > MAX_TENSOR_RANK {
            return Err(TensorError::InvalidShape(format!(
                "rank must be between 1 and {MAX_TENSOR_RANK}, got {}",
                shape.len()
            )));
        }
        if layout.rank() != 0 && layout.rank() != shape.len() {
            return Err(TensorError::InvalidLayout(format!(
                "layout {layout} does not match rank {}",
                shape.len()
            )));
        }
        Ok(Self {
            base_ptr,
            shape: copy_dims(shape),
            strides: copy_dims(strides),
            rank: shape.len(),
            dtype,
            layout,
            device,
            _owner: None,
        })
    }

    /// Returns the base address of the first element.
    #[inline]
    pub fn base_ptr(&self) -> *mut u8 {
        self.base_ptr
    }

    /// Returns the number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Returns the size of dimension `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= rank`.
    #[inline]
    pub fn shape(&self, i: usize) -> i64 {
        self.shapes()[i]
    }

    /// Returns the byte stride of dimension `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= rank`.
    #[inline]
    pub fn stride(&self, i: usize) -> i64 {
        self.strides()[i]
    }

    /// Returns the size of every dimension.
    #[inline]
    pub fn shapes(&self) -> &[i64] {
        &self.shape[..self.rank]
    }

    /// Returns the byte stride of every dimension.
    #[inline]
    pub fn strides(&self) -> &[i64] {
        &self.strides[..self.rank]
    }

    /// Returns the element type.
    #[inline]
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Returns the dimension labels.
    #[inline]
    pub fn layout(&self) -> TensorLayout {
        self.layout
    }

    /// Returns the device holding the memory.
    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    /// Returns true if device kernels can access the memory.
    #[inline]
    pub fn is_device_accessible(&self) -> bool {
        self.device.is_device_accessible()
    }
}
