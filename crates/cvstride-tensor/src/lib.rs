#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `cvstride-tensor` describes pitch-linear tensor and image memory for computer vision kernels
//! and addresses it through lightweight wraps whose innermost strides are fixed at compile time.
//!
//! # Architecture
//!
//! The crate is organized into several key components:
//!
//! - **Tensor / Image**: Owned pitch-linear buffers allocated on a [`Device`]
//! - **TensorStorage**: Reference counted memory buffer with custom allocator support
//! - **TensorDataStrided / ImageDataStrided**: Exported strided descriptions handed to kernels
//! - **TensorWrap**: Non-owning N-D addressing with compile- and run-time byte strides
//! - **TypeTraits**: Compile-time description of the scalar and vector element types
//!
//! # Quick Start
//!
//! Wrapping an image batch and addressing its channels:
//!
//! ```rust
//! use cvstride_tensor::{
//!     create_tensor_wrap_nhwc_mut, DataType, DeviceAllocator, Size2D, Tensor, vector::int4,
//! };
//!
//! let pixel = DataType::U8.with_channels(3)?;
//! let tensor = Tensor::new_image_batch(2, Size2D::new(4, 3), pixel, DeviceAllocator::new(0))?;
//!
//! let data = tensor.export_device_data().unwrap();
//! let wrap = create_tensor_wrap_nhwc_mut::<u8>(&data);
//! // green channel of pixel (x=3, y=2) in the second image
//! unsafe { wrap.write(int4(1, 3, 2, 1), 255) };
//! drop(data);
//!
//! let row_stride = tensor.strides()[1] as usize;
//! let sample_stride = tensor.strides()[0] as usize;
//! assert_eq!(tensor.as_bytes()[sample_stride + 2 * row_stride + 3 * 3 + 1], 255);
//! # Ok::<(), cvstride_tensor::TensorError>(())
//! ```
//!
//! # Wrap Aliases
//!
//! - [`Tensor1DWrap`]: packed 1D array
//! - [`Tensor2DWrap`]: rows with a run-time pitch
//! - [`Tensor3DWrap`]: samples of rows
//! - [`Tensor4DWrap`]: samples of rows of columns, e.g. channel access into NHWC

/// Allocator module containing memory management utilities.
///
/// This module provides the [`TensorAllocator`] trait, the host [`CpuAllocator`] and the
/// [`DeviceAllocator`] for device-accessible memory with aligned row pitches.
pub mod allocator;

/// Element data types of tensors and images.
pub mod data_type;

/// Device module containing device abstraction.
pub mod device;

/// Wrap factories for image batch tensors.
pub mod factory;

/// Images, image formats and sizes.
pub mod image;

/// Dimension labels of tensors.
pub mod layout;

/// Operator status codes and errors.
pub mod status;

/// Storage module containing low-level memory buffer implementations.
///
/// This module provides [`storage::TensorStorage`] which manages the actual memory buffer
/// for tensor and image data with custom allocator support.
pub mod storage;

/// Tensor module containing the owned tensor and error types.
pub mod tensor;

/// Layout-aware accessors over image tensors.
pub mod tensor_access;

/// Strided data objects exported from tensors.
pub mod tensor_data;

/// Compile-time traits of wrap element types.
pub mod type_traits;

/// Integer vectors used as coordinates.
pub mod vector;

/// Non-owning N-D tensor wraps.
pub mod wrap;

pub use crate::allocator::{CpuAllocator, DeviceAllocator, TensorAllocator};
pub use crate::data_type::{DataKind, DataType};
pub use crate::device::Device;
pub use crate::factory::{
    create_tensor_wrap_nhw, create_tensor_wrap_nhw_mut, create_tensor_wrap_nhwc,
    create_tensor_wrap_nhwc_mut,
};
pub use crate::image::{Image, ImageDataStrided, ImageFormat, Size2D};
pub use crate::layout::TensorLayout;
pub use crate::status::{Status, StatusError};
pub use crate::tensor::{Tensor, TensorError};
pub use crate::tensor_access::TensorDataAccessStridedImagePlanar;
pub use crate::tensor_data::TensorDataStrided;
pub use crate::type_traits::TypeTraits;
pub use crate::wrap::{
    Tensor1DWrap, Tensor1DWrapMut, Tensor2DWrap, Tensor2DWrapMut, Tensor3DWrap, Tensor3DWrapMut,
    Tensor4DWrap, Tensor4DWrapMut, TensorNDWrap, TensorNDWrapMut, TensorWrap, TensorWrapMut,
};
