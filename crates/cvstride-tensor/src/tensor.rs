use thiserror::Error;

use crate::{
    allocator::{TensorAllocator, TensorAllocatorError},
    data_type::DataType,
    device::Device,
    image::Size2D,
    layout::{TensorLayout, MAX_TENSOR_RANK},
    storage::TensorStorage,
    tensor_data::TensorDataStrided,
};

/// Error type for tensor and image creation.
#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    /// Underlying storage operation failed.
    #[error("Storage error: {0}")]
    StorageError(#[from] TensorAllocatorError),

    /// Tensor shape is not valid for the requested layout.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Tensor layout is not valid.
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// Data type is not valid.
    #[error("Invalid data type: {0}")]
    InvalidDataType(String),
}

fn align_up(value: i64, alignment: usize) -> Option<i64> {
    let alignment = i64::try_from(alignment.max(1)).ok()?;
    Some(value.checked_add(alignment - 1)? / alignment * alignment)
}

/// Computes pitch-linear byte strides for `shape`.
///
/// The innermost stride is the element size. When the layout has an `H` dimension that is not
/// the innermost one, its stride (the row pitch) is rounded up to `row_alignment`.
///
/// # Errors
///
/// Returns [`TensorError::InvalidShape`] if a stride or the total size overflows `i64`.
///
/// # Example
///
/// ```
/// use cvstride_tensor::{data_type::DataType, layout::TensorLayout, tensor::calc_strides};
///
/// let strides = calc_strides(&[2, 3, 5, 3], DataType::U8, TensorLayout::NHWC, 1)?;
/// assert_eq!(strides, vec![45, 15, 3, 1]);
///
/// let strides = calc_strides(&[2, 3, 5, 3], DataType::U8, TensorLayout::NHWC, 32)?;
/// assert_eq!(strides, vec![96, 32, 3, 1]);
/// # Ok::<(), cvstride_tensor::tensor::TensorError>(())
/// ```
pub fn calc_strides(
    shape: &[i64],
    dtype: DataType,
    layout: TensorLayout,
    row_alignment: usize,
) -> Result<Vec<i64>, TensorError> {
    let overflow = || TensorError::InvalidShape(format!("size of shape {shape:?} overflows"));

    let mut strides = vec![0i64; shape.len()];
    let row_dim = layout.find('H').filter(|&h| h + 1 < shape.len());
    let mut stride = dtype.stride_bytes() as i64;
    for i in (0..shape.len()).rev() {
        if Some(i) == row_dim {
            stride = align_up(stride, row_alignment).ok_or_else(overflow)?;
        }
        strides[i] = stride;
        stride = stride.checked_mul(shape[i]).ok_or_else(overflow)?;
    }
    Ok(strides)
}

/// An owned, pitch-linear, N-dimensional tensor.
///
/// The tensor owns its memory through a [`TensorStorage`] on the allocator's [`Device`]. Kernels
/// never see the tensor itself: they receive a [`TensorDataStrided`] exported from it and wrap it
/// into a tensor wrap.
///
/// # Example
///
/// ```
/// use cvstride_tensor::{
///     allocator::DeviceAllocator, data_type::DataType, layout::TensorLayout, tensor::Tensor,
/// };
///
/// let tensor = Tensor::new(&[2, 4, 8, 3], DataType::U8, TensorLayout::NHWC, DeviceAllocator::new(0))?;
/// assert_eq!(tensor.rank(), 4);
/// assert_eq!(tensor.strides()[2], 3);
/// // row pitch is aligned for device memory
/// assert_eq!(tensor.strides()[1], 256);
/// assert!(tensor.export_device_data().is_some());
/// # Ok::<(), cvstride_tensor::tensor::TensorError>(())
/// ```
#[derive(Debug)]
pub struct Tensor {
    storage: TensorStorage,
    shape: [i64; MAX_TENSOR_RANK],
    strides: [i64; MAX_TENSOR_RANK],
    rank: usize,
    dtype: DataType,
    layout: TensorLayout,
}

impl Tensor {
    /// Allocates a zeroed tensor.
    ///
    /// # Arguments
    ///
    /// * `shape` - The size of each dimension, from the outermost to the innermost.
    /// * `dtype` - The element type.
    /// * `layout` - The dimension labels, [`TensorLayout::NONE`] or one label per dimension.
    /// * `alloc` - The allocator deciding the device of the memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape does not match the layout, a dimension is not positive or
    /// the allocation fails.
    pub fn new<A: TensorAllocator>(
        shape: &[i64],
        dtype: DataType,
        layout: TensorLayout,
        alloc: A,
    ) -> Result<Self, TensorError> {
        if shape.is_empty() || shape.len() > MAX_TENSOR_RANK {
            return Err(TensorError::InvalidShape(format!(
                "rank must be between 1 and {MAX_TENSOR_RANK}, got {}",
                shape.len()
            )));
        }
        if layout.rank() != 0 && layout.rank() != shape.len() {
            return Err(TensorError::InvalidShape(format!(
                "shape {shape:?} has rank {} but layout {layout} has rank {}",
                shape.len(),
                layout.rank()
            )));
        }
        if let Some(d) = shape.iter().find(|&&d| d <= 0) {
            return Err(TensorError::InvalidShape(format!(
                "dimensions must be positive, got {d} in {shape:?}"
            )));
        }

        let strides = calc_strides(shape, dtype, layout, alloc.row_alignment())?;
        let len = strides[0]
            .checked_mul(shape[0])
            .and_then(|len| usize::try_from(len).ok())
            .ok_or_else(|| TensorError::InvalidShape(format!("size of shape {shape:?} overflows")))?;

        log::debug!(
            "allocating {len} bytes for tensor {shape:?} {dtype} {layout} on {}",
            alloc.device()
        );

        let storage = TensorStorage::new(len, dtype.channel_size(), alloc)?;

        let mut out_shape = [0i64; MAX_TENSOR_RANK];
        let mut out_strides = [0i64; MAX_TENSOR_RANK];
        out_shape[..shape.len()].copy_from_slice(shape);
        out_strides[..shape.len()].copy_from_slice(&strides);

        Ok(Self {
            storage,
            shape: out_shape,
            strides: out_strides,
            rank: shape.len(),
            dtype,
            layout,
        })
    }

    /// Allocates a zeroed NHWC tensor holding `num_images` images of the given size.
    ///
    /// The channels of `pixel` become the `C` dimension and the element type is its single
    /// channel scalar.
    pub fn new_image_batch<A: TensorAllocator>(
        num_images: i64,
        size: Size2D,
        pixel: DataType,
        alloc: A,
    ) -> Result<Self, TensorError> {
        let shape = [
            num_images,
            size.h as i64,
            size.w as i64,
            pixel.channels() as i64,
        ];
        Self::new(&shape, pixel.with_channels(1)?, TensorLayout::NHWC, alloc)
    }

    /// Returns the number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Returns the size of each dimension.
    #[inline]
    pub fn shape(&self) -> &[i64] {
        &self.shape[..self.rank]
    }

    /// Returns the byte stride of each dimension.
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

    /// Returns the device where the tensor is allocated.
    #[inline]
    pub fn device(&self) -> Device {
        self.storage.device()
    }

    /// Returns the underlying storage.
    #[inline]
    pub fn storage(&self) -> &TensorStorage {
        &self.storage
    }

    /// Exports the strided data of the tensor regardless of where it lives.
    pub fn export_data(&self) -> TensorDataStrided {
        TensorDataStrided::from_storage(
            self.storage.clone(),
            self.shape(),
            self.strides(),
            self.dtype,
            self.layout,
        )
    }

    /// Exports the strided data of the tensor if device kernels can access it.
    ///
    /// Returns `None` for host-only tensors.
    pub fn export_device_data(&self) -> Option<TensorDataStrided> {
        self.device()
            .is_device_accessible()
            .then(|| self.export_data())
    }

    /// Returns the tensor bytes, including row padding, for host reading.
    ///
    /// # Panics
    ///
    /// Panics if exported data or pending stream work still references the tensor.
    pub fn as_bytes(&self) -> &[u8] {
        self.storage.as_bytes()
    }

    /// Returns the tensor bytes, including row padding, for host writing.
    ///
    /// # Panics
    ///
    /// Panics if exported data or pending stream work still references the tensor.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.storage.as_bytes_mut()
    }

    /// Sets every byte of the tensor, including row padding, to `value`.
    pub fn fill(&mut self, value: u8) {
        self.as_bytes_mut().fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{CpuAllocator, DeviceAllocator};
    use crate::data_type::DataKind;

    #[test]
    fn test_tensor_new_cpu() -> Result<(), TensorError> {
        let tensor = Tensor::new(&[2, 3, 4], DataType::F32, TensorLayout::NONE, CpuAllocator)?;
        assert_eq!(tensor.rank(), 3);
        assert_eq!(tensor.shape(), &[2, 3, 4]);
        assert_eq!(tensor.strides(), &[48, 16, 4]);
        assert_eq!(tensor.as_bytes().len(), 96);
        assert_eq!(tensor.device(), Device::Cpu);
        assert!(tensor.export_device_data().is_none());
        Ok(())
    }

    #[test]
    fn test_tensor_new_device_row_aligned() -> Result<(), TensorError> {
        let tensor = Tensor::new(
            &[2, 3, 5, 3],
            DataType::U8,
            TensorLayout::NHWC,
            DeviceAllocator::new(0),
        )?;
        assert_eq!(tensor.strides(), &[768, 256, 3, 1]);
        assert_eq!(tensor.as_bytes().len(), 1536);
        assert!(tensor.export_device_data().is_some());
        Ok(())
    }

    #[test]
    fn test_tensor_image_batch() -> Result<(), TensorError> {
        let pixel = DataType::new(DataKind::U8, 4)?;
        let tensor =
            Tensor::new_image_batch(3, Size2D::new(10, 2), pixel, DeviceAllocator::new(0))?;
        assert_eq!(tensor.shape(), &[3, 2, 10, 4]);
        assert_eq!(tensor.dtype(), DataType::U8);
        assert_eq!(tensor.layout(), TensorLayout::NHWC);
        Ok(())
    }

    #[test]
    fn test_tensor_invalid_shape() {
        let res = Tensor::new(&[2, 3], DataType::U8, TensorLayout::NHWC, CpuAllocator);
        assert!(matches!(res, Err(TensorError::InvalidShape(_))));
        let res = Tensor::new(&[2, 0], DataType::U8, TensorLayout::NONE, CpuAllocator);
        assert!(matches!(res, Err(TensorError::InvalidShape(_))));
        let res = Tensor::new(&[], DataType::U8, TensorLayout::NONE, CpuAllocator);
        assert!(matches!(res, Err(TensorError::InvalidShape(_))));
    }

    #[test]
    fn test_tensor_size_overflow() {
        let shape = [1 << 20, 1 << 20, 1 << 20, 16];
        let res = Tensor::new(&shape, DataType::U8, TensorLayout::NHWC, DeviceAllocator::new(0));
        assert!(matches!(res, Err(TensorError::InvalidShape(_))));

        // the row pitch rounding itself overflows
        let res = calc_strides(&[2, i64::MAX, 1], DataType::U8, TensorLayout::HWC, 256);
        assert!(matches!(res, Err(TensorError::InvalidShape(_))));

        let res = Tensor::new(&[i64::MAX, 2], DataType::U16, TensorLayout::NONE, CpuAllocator);
        assert!(matches!(res, Err(TensorError::InvalidShape(_))));
    }

    #[test]
    fn test_tensor_fill() -> Result<(), TensorError> {
        let mut tensor = Tensor::new(&[4], DataType::U16, TensorLayout::NONE, CpuAllocator)?;
        tensor.fill(0xAB);
        assert!(tensor.as_bytes().iter().all(|&b| b == 0xAB));
        Ok(())
    }

    #[test]
    #[should_panic(expected = "while it is shared")]
    fn test_tensor_host_access_while_exported() {
        let tensor = Tensor::new(&[4], DataType::U8, TensorLayout::NONE, CpuAllocator).unwrap();
        let _data = tensor.export_data();
        let _ = tensor.as_bytes();
    }
}
