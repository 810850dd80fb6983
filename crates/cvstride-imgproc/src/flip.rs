use cvstride_tensor::{StatusError, Tensor};

use crate::{legacy, stream::Stream};

/// Axis of a flip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlipMode {
    /// Mirror rows top to bottom.
    Vertical,
    /// Mirror columns left to right.
    Horizontal,
    /// Mirror both axes.
    Both,
}

impl FlipMode {
    /// Maps a flip code: `0` is vertical, positive is horizontal and negative is both.
    pub fn from_code(flip_code: i32) -> Self {
        match flip_code {
            0 => FlipMode::Vertical,
            c if c > 0 => FlipMode::Horizontal,
            _ => FlipMode::Both,
        }
    }
}

/// Flips a batch of images around the vertical axis, the horizontal axis or both.
///
/// Works on interleaved `NHWC`, `HWC`, `NHW` and `HW` tensors with 1 to 4 channels of 1, 2 or 4
/// bytes each.
///
/// # Example
///
/// ```
/// use cvstride_imgproc::{flip::Flip, stream::Stream};
/// use cvstride_tensor::{DataType, Device, DeviceAllocator, Size2D, Tensor};
///
/// let stream = Stream::new(Device::gpu(0))?;
/// let pixel = DataType::U8.with_channels(3)?;
/// let input = Tensor::new_image_batch(1, Size2D::new(4, 2), pixel, DeviceAllocator::new(0))?;
/// let mut output = Tensor::new_image_batch(1, Size2D::new(4, 2), pixel, DeviceAllocator::new(0))?;
///
/// Flip::new().call(&stream, &input, &mut output, 1)?;
/// stream.synchronize()?;
/// # Ok::<(), cvstride_tensor::StatusError>(())
/// ```
#[derive(Debug, Default)]
pub struct Flip;

impl Flip {
    /// Creates the operator.
    pub fn new() -> Self {
        Self
    }

    /// Enqueues the flip of `input` into `output` on `stream`.
    ///
    /// # Arguments
    ///
    /// * `stream` - The stream running the kernel.
    /// * `input` - The images to flip.
    /// * `output` - The flipped images, same shape and data type as the input.
    /// * `flip_code` - `0` flips vertically, positive horizontally and negative both ways.
    ///
    /// # Errors
    ///
    /// Returns an error without enqueueing anything if a tensor is not device-accessible or the
    /// tensors are not compatible images.
    pub fn call(
        &self,
        stream: &Stream,
        input: &Tensor,
        output: &mut Tensor,
        flip_code: i32,
    ) -> Result<(), StatusError> {
        let in_data = input.export_device_data().ok_or_else(|| {
            log::warn!("flip: input on {} is not device-accessible", input.device());
            StatusError::invalid_argument("Input must be device-accessible, pitch-linear tensor")
        })?;

        let out_data = output.export_device_data().ok_or_else(|| {
            log::warn!("flip: output on {} is not device-accessible", output.device());
            StatusError::invalid_argument("Output must be device-accessible, pitch-linear tensor")
        })?;

        legacy::flip::infer(stream, in_data, out_data, FlipMode::from_code(flip_code))
    }
}
