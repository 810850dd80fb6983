//! Wrap factories for image batch tensors.
//!
//! These take the sample, row and column strides from the tensor layout instead of the raw
//! dimension order, so `HWC`, `NHWC` and `NHW` tensors all wrap the same way. A missing `N`
//! dimension wraps as a single sample with a zero sample stride.
//!
//! Each stride must fit in `i32`. The batch as a whole may be larger; operators that promise
//! 32-bit addressing check the total extent themselves.

use crate::{
    tensor_access::TensorDataAccessStridedImagePlanar,
    tensor_data::TensorDataStrided,
    type_traits::{fits_in, TypeTraits},
    wrap::{Tensor3DWrap, Tensor3DWrapMut, Tensor4DWrap, Tensor4DWrapMut},
};

fn image_strides<const K: usize>(tensor: &TensorDataStrided) -> [i32; K] {
    let Some(access) = TensorDataAccessStridedImagePlanar::create(tensor) else {
        panic!("tensor with layout {} is not an image batch", tensor.layout());
    };

    let all = [
        access.sample_stride(),
        access.row_stride(),
        access.col_stride(),
    ];
    let mut strides = [0i32; K];
    for (dst, &stride) in strides.iter_mut().zip(&all) {
        assert!(
            fits_in::<i32>(stride),
            "stride {stride} exceeds the 32-bit addressing range"
        );
        *dst = stride as i32;
    }
    strides
}

/// Creates a 3D wrap over the samples, rows and pixels of an image batch.
///
/// The pixel type `T` holds every channel, e.g. `[u8; 3]` for an NHWC tensor with 3 channels.
///
/// # Panics
///
/// Panics if the tensor is not an image batch, or if the sample or row stride does not fit in
/// `i32`.
///
/// # Example
///
/// ```
/// use cvstride_tensor::{
///     allocator::DeviceAllocator, data_type::DataType, factory::create_tensor_wrap_nhw,
///     image::Size2D, tensor::Tensor,
/// };
///
/// let pixel = DataType::U8.with_channels(3)?;
/// let tensor = Tensor::new_image_batch(2, Size2D::new(4, 3), pixel, DeviceAllocator::new(0))?;
/// let data = tensor.export_data();
/// let wrap = create_tensor_wrap_nhw::<[u8; 3]>(&data);
/// assert_eq!(wrap.strides(), &[768, 256]);
/// # Ok::<(), cvstride_tensor::tensor::TensorError>(())
/// ```
pub fn create_tensor_wrap_nhw<T: TypeTraits>(tensor: &TensorDataStrided) -> Tensor3DWrap<'_, T> {
    let strides = image_strides::<2>(tensor);
    // SAFETY: the strides come from the tensor layout and the data object outlives the wrap.
    unsafe { Tensor3DWrap::from_raw_parts(tensor.base_ptr(), strides) }
}

/// Mutable version of [`create_tensor_wrap_nhw`].
pub fn create_tensor_wrap_nhw_mut<T: TypeTraits>(
    tensor: &TensorDataStrided,
) -> Tensor3DWrapMut<'_, T> {
    let strides = image_strides::<2>(tensor);
    // SAFETY: see `create_tensor_wrap_nhw`.
    unsafe { Tensor3DWrapMut::from_raw_parts(tensor.base_ptr(), strides) }
}

/// Creates a 4D wrap over the samples, rows, pixels and channels of an image batch.
///
/// The element type `T` is one channel, e.g. `u8` for an NHWC tensor of 8-bit channels.
///
/// # Panics
///
/// Panics if the tensor is not an image batch, or if the sample, row or column stride does not
/// fit in `i32`.
pub fn create_tensor_wrap_nhwc<T: TypeTraits>(tensor: &TensorDataStrided) -> Tensor4DWrap<'_, T> {
    let strides = image_strides::<3>(tensor);
    // SAFETY: see `create_tensor_wrap_nhw`.
    unsafe { Tensor4DWrap::from_raw_parts(tensor.base_ptr(), strides) }
}

/// Mutable version of [`create_tensor_wrap_nhwc`].
pub fn create_tensor_wrap_nhwc_mut<T: TypeTraits>(
    tensor: &TensorDataStrided,
) -> Tensor4DWrapMut<'_, T> {
    let strides = image_strides::<3>(tensor);
    // SAFETY: see `create_tensor_wrap_nhw`.
    unsafe { Tensor4DWrapMut::from_raw_parts(tensor.base_ptr(), strides) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        allocator::{CpuAllocator, DeviceAllocator},
        data_type::DataType,
        device::Device,
        image::Size2D,
        layout::TensorLayout,
        tensor::{Tensor, TensorError},
        vector::{int3, int4},
    };
    use rand::Rng;

    #[test]
    fn test_factory_nhwc_strides() -> Result<(), TensorError> {
        let pixel = DataType::U8.with_channels(4)?;
        let tensor = Tensor::new_image_batch(3, Size2D::new(7, 5), pixel, DeviceAllocator::new(0))?;
        let data = tensor.export_data();

        let wrap = create_tensor_wrap_nhwc::<u8>(&data);
        assert_eq!(wrap.strides(), &[5 * 256, 256, 4]);

        let wrap = create_tensor_wrap_nhw::<[u8; 4]>(&data);
        assert_eq!(wrap.strides(), &[5 * 256, 256]);
        Ok(())
    }

    #[test]
    fn test_factory_hwc_single_sample() -> Result<(), TensorError> {
        let tensor = Tensor::new(&[4, 6, 3], DataType::U8, TensorLayout::HWC, CpuAllocator)?;
        let data = tensor.export_data();
        let wrap = create_tensor_wrap_nhwc::<u8>(&data);
        assert_eq!(wrap.strides(), &[0, 18, 3]);
        Ok(())
    }

    #[test]
    fn test_factory_nhw_write_read() -> Result<(), TensorError> {
        let pixel = DataType::U16.with_channels(3)?;
        let tensor = Tensor::new(&[2, 3, 5], pixel, TensorLayout::NHW, CpuAllocator)?;
        let data = tensor.export_data();
        let wrap = create_tensor_wrap_nhw_mut::<[u16; 3]>(&data);
        unsafe { wrap.write(int3(4, 2, 1), [1, 2, 3]) };

        let channels = create_tensor_wrap_nhwc::<u16>(&data);
        assert_eq!(unsafe { channels.read(int4(2, 4, 2, 1)) }, 3);
        Ok(())
    }

    #[test]
    fn test_factory_address_matches_strides() -> Result<(), TensorError> {
        let mut rng = rand::rng();
        let pixel = DataType::F32.with_channels(2)?;
        let tensor = Tensor::new_image_batch(4, Size2D::new(9, 6), pixel, DeviceAllocator::new(0))?;
        let data = tensor.export_data();
        let wrap = create_tensor_wrap_nhwc_mut::<f32>(&data);
        let base = data.base_ptr() as usize;

        for _ in 0..100 {
            let (n, h, w, c) = (
                rng.random_range(0..4),
                rng.random_range(0..6),
                rng.random_range(0..9),
                rng.random_range(0..2),
            );
            let expected = n as i64 * data.stride(0)
                + h as i64 * data.stride(1)
                + w as i64 * data.stride(2)
                + c as i64 * data.stride(3);
            let addr = wrap.ptr_mut([n, h, w, c]) as usize;
            assert_eq!((addr - base) as i64, expected);
        }
        Ok(())
    }

    #[test]
    #[should_panic(expected = "exceeds the 32-bit addressing range")]
    fn test_factory_stride_overflow() {
        let mut byte = 0u8;
        let data = unsafe {
            TensorDataStrided::from_raw_parts(
                &mut byte,
                &[2, 1, 1, 1],
                &[i32::MAX as i64 + 1, 1, 1, 1],
                DataType::U8,
                TensorLayout::NHWC,
                Device::gpu(0),
            )
            .unwrap()
        };
        let _ = create_tensor_wrap_nhwc::<u8>(&data);
    }

    #[test]
    #[should_panic(expected = "is not an image batch")]
    fn test_factory_not_image() {
        let tensor = Tensor::new(&[4, 4], DataType::U8, TensorLayout::NONE, CpuAllocator).unwrap();
        let data = tensor.export_data();
        let _ = create_tensor_wrap_nhw::<u8>(&data);
    }
}
