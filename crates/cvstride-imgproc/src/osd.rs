use std::sync::Arc;

use cvstride_tensor::{StatusError, Tensor};

use crate::{elements::Elements, legacy, stream::Stream};

/// On-screen display: composites rectangles, lines, polylines, points and circles over a batch
/// of RGB or RGBA images.
///
/// The output receives a copy of the input with the elements of each sample alpha-blended on
/// top. Input and output are `NHWC` (or `HWC`) tensors of 8-bit channels with 3 or 4 channels
/// and the same shape.
///
/// # Example
///
/// ```
/// use cvstride_imgproc::{
///     elements::{BoundingBox, Color, Element, Elements},
///     osd::Osd,
///     stream::Stream,
/// };
/// use cvstride_tensor::{DataType, Device, DeviceAllocator, Size2D, Tensor};
///
/// let stream = Stream::new(Device::gpu(0))?;
/// let pixel = DataType::U8.with_channels(4)?;
/// let size = Size2D::new(32, 16);
/// let input = Tensor::new_image_batch(1, size, pixel, DeviceAllocator::new(0))?;
/// let mut output = Tensor::new_image_batch(1, size, pixel, DeviceAllocator::new(0))?;
///
/// let elements = Elements::from_samples(vec![vec![Element::Rect {
///     bbox: BoundingBox::new(4, 4, 10, 6),
///     thickness: 2,
///     border_color: Color::rgb(255, 0, 0),
///     fill_color: None,
/// }]]);
///
/// Osd::new().call(&stream, &input, &mut output, &elements)?;
/// stream.synchronize()?;
///
/// let row_stride = output.strides()[1] as usize;
/// assert_eq!(&output.as_bytes()[4 * row_stride + 4 * 4..][..4], &[255, 0, 0, 255]);
/// # Ok::<(), cvstride_tensor::StatusError>(())
/// ```
#[derive(Debug, Default)]
pub struct Osd;

impl Osd {
    /// Creates the operator.
    pub fn new() -> Self {
        Self
    }

    /// Enqueues the composition of `elements` over `input` into `output` on `stream`.
    ///
    /// # Arguments
    ///
    /// * `stream` - The stream running the kernel.
    /// * `input` - The images to draw on.
    /// * `output` - The composited images, same shape as the input.
    /// * `elements` - One list of elements per image of the batch.
    ///
    /// # Errors
    ///
    /// Returns an error without enqueueing anything if a tensor is not device-accessible, the
    /// tensors are not compatible 8-bit RGB(A) images or an element is invalid.
    pub fn call(
        &self,
        stream: &Stream,
        input: &Tensor,
        output: &mut Tensor,
        elements: &Elements,
    ) -> Result<(), StatusError> {
        let in_data = input.export_device_data().ok_or_else(|| {
            log::warn!("osd: input on {} is not device-accessible", input.device());
            StatusError::invalid_argument("Input must be device-accessible, pitch-linear tensor")
        })?;

        let out_data = output.export_device_data().ok_or_else(|| {
            log::warn!("osd: output on {} is not device-accessible", output.device());
            StatusError::invalid_argument("Output must be device-accessible, pitch-linear tensor")
        })?;

        legacy::osd::infer(stream, in_data, out_data, Arc::new(elements.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{BoundingBox, Color, Element, Point2};
    use cvstride_tensor::{
        CpuAllocator, DataType, Device, DeviceAllocator, Size2D, Status, TensorLayout,
    };

    fn rgb_batch(n: i64, size: Size2D) -> Result<Tensor, StatusError> {
        let pixel = DataType::U8.with_channels(3)?;
        Ok(Tensor::new_image_batch(n, size, pixel, DeviceAllocator::new(0))?)
    }

    fn pixel(tensor: &Tensor, n: usize, x: usize, y: usize) -> Vec<u8> {
        let strides = tensor.strides();
        let offset =
            n * strides[0] as usize + y * strides[1] as usize + x * strides[2] as usize;
        let channels = tensor.shape()[3] as usize;
        tensor.as_bytes()[offset..offset + channels].to_vec()
    }

    #[test]
    fn test_osd_copies_and_draws_per_sample() -> Result<(), StatusError> {
        let stream = Stream::new(Device::gpu(0))?;
        let size = Size2D::new(8, 6);
        let mut input = rgb_batch(2, size)?;
        input.fill(10);
        let mut output = rgb_batch(2, size)?;

        let elements = Elements::from_samples(vec![
            vec![Element::Line {
                p0: Point2::new(0, 2),
                p1: Point2::new(7, 2),
                thickness: 1,
                color: Color::rgb(200, 100, 50),
            }],
            vec![Element::Point {
                center: Point2::new(5, 4),
                radius: 1,
                color: Color::rgb(1, 2, 3),
            }],
        ]);

        Osd::new().call(&stream, &input, &mut output, &elements)?;
        stream.synchronize()?;

        // sample 0: line on row 2, background copied elsewhere
        assert_eq!(pixel(&output, 0, 3, 2), vec![200, 100, 50]);
        assert_eq!(pixel(&output, 0, 3, 3), vec![10, 10, 10]);
        assert_eq!(pixel(&output, 0, 5, 4), vec![10, 10, 10]);
        // sample 1: point only
        assert_eq!(pixel(&output, 1, 5, 4), vec![1, 2, 3]);
        assert_eq!(pixel(&output, 1, 3, 2), vec![10, 10, 10]);
        Ok(())
    }

    #[test]
    fn test_osd_rgba_blend() -> Result<(), StatusError> {
        let stream = Stream::new(Device::gpu(0))?;
        let pixel_type = DataType::U8.with_channels(4)?;
        let size = Size2D::new(4, 4);
        let input = Tensor::new_image_batch(1, size, pixel_type, DeviceAllocator::new(0))?;
        let mut output = Tensor::new_image_batch(1, size, pixel_type, DeviceAllocator::new(0))?;

        let elements = Elements::from_samples(vec![vec![Element::Rect {
            bbox: BoundingBox::new(0, 0, 4, 4),
            thickness: -1,
            border_color: Color::new(255, 255, 255, 128),
            fill_color: None,
        }]]);
        Osd::new().call(&stream, &input, &mut output, &elements)?;
        stream.synchronize()?;

        assert_eq!(pixel(&output, 0, 2, 2), vec![128, 128, 128, 128]);
        Ok(())
    }

    #[test]
    fn test_osd_host_input_leaves_output_untouched() -> Result<(), StatusError> {
        let stream = Stream::new(Device::gpu(0))?;
        let input = Tensor::new(&[1, 4, 4, 3], DataType::U8, TensorLayout::NHWC, CpuAllocator)?;
        let mut output = rgb_batch(1, Size2D::new(4, 4))?;
        output.fill(0x5A);

        let elements = Elements::from_samples(vec![vec![]]);
        let err = Osd::new()
            .call(&stream, &input, &mut output, &elements)
            .unwrap_err();
        assert_eq!(err.status(), Status::ErrorInvalidArgument);
        assert_eq!(
            err.message(),
            "Input must be device-accessible, pitch-linear tensor"
        );

        stream.synchronize()?;
        assert_eq!(stream.enqueued(), 0);
        assert!(output.as_bytes().iter().all(|&b| b == 0x5A));
        Ok(())
    }

    #[test]
    fn test_osd_host_output_rejected() -> Result<(), StatusError> {
        let stream = Stream::new(Device::gpu(0))?;
        let input = rgb_batch(1, Size2D::new(4, 4))?;
        let mut output =
            Tensor::new(&[1, 4, 4, 3], DataType::U8, TensorLayout::NHWC, CpuAllocator)?;
        let err = Osd::new()
            .call(&stream, &input, &mut output, &Elements::from_samples(vec![vec![]]))
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Output must be device-accessible, pitch-linear tensor"
        );
        Ok(())
    }

    #[test]
    fn test_osd_extreme_elements_clipped() -> Result<(), StatusError> {
        let stream = Stream::new(Device::gpu(0))?;
        let input = rgb_batch(2, Size2D::new(8, 4))?;
        let mut output = rgb_batch(2, Size2D::new(8, 4))?;
        let red = Color::rgb(255, 0, 0);

        let elements = Elements::from_samples(vec![
            vec![Element::Point {
                center: Point2::new(3, 2),
                radius: i32::MAX,
                color: red,
            }],
            vec![Element::Rect {
                bbox: BoundingBox::new(2, 0, i32::MAX, 4),
                thickness: -1,
                border_color: red,
                fill_color: None,
            }],
        ]);
        Osd::new().call(&stream, &input, &mut output, &elements)?;
        stream.synchronize()?;

        for x in 0..8 {
            assert_eq!(pixel(&output, 0, x, 2), vec![255, 0, 0]);
            let expected = if x < 2 { vec![0, 0, 0] } else { vec![255, 0, 0] };
            assert_eq!(pixel(&output, 1, x, 2), expected);
        }
        Ok(())
    }

    #[test]
    fn test_osd_validation() -> Result<(), StatusError> {
        let stream = Stream::new(Device::gpu(0))?;
        let input = rgb_batch(2, Size2D::new(4, 4))?;
        let mut output = rgb_batch(2, Size2D::new(4, 4))?;

        // one list for two samples
        let err = Osd::new()
            .call(&stream, &input, &mut output, &Elements::from_samples(vec![vec![]]))
            .unwrap_err();
        assert_eq!(err.status(), Status::ErrorInvalidArgument);

        // single channel images
        let gray_in = Tensor::new(&[1, 4, 4, 1], DataType::U8, TensorLayout::NHWC, DeviceAllocator::new(0))?;
        let mut gray_out =
            Tensor::new(&[1, 4, 4, 1], DataType::U8, TensorLayout::NHWC, DeviceAllocator::new(0))?;
        let err = Osd::new()
            .call(&stream, &gray_in, &mut gray_out, &Elements::from_samples(vec![vec![]]))
            .unwrap_err();
        assert_eq!(err.status(), Status::ErrorInvalidImageFormat);

        // invalid element
        let elements = Elements::from_samples(vec![
            vec![],
            vec![Element::Circle {
                center: Point2::new(1, 1),
                radius: -3,
                thickness: 1,
                color: Color::default(),
            }],
        ]);
        let err = Osd::new()
            .call(&stream, &input, &mut output, &elements)
            .unwrap_err();
        assert_eq!(err.status(), Status::ErrorInvalidArgument);

        assert_eq!(stream.enqueued(), 0);
        Ok(())
    }
}
