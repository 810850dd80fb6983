use std::sync::Arc;

use cvstride_tensor::{
    create_tensor_wrap_nhw, create_tensor_wrap_nhw_mut, DataKind, StatusError,
    TensorDataStrided,
};

use super::{image_batch_shape, ImageBatchShape};
use crate::{draw::draw_element_row, elements::Elements, parallel::par_iter_rows, stream::Stream};

type Kernel = fn(&TensorDataStrided, &TensorDataStrided, ImageBatchShape, &Elements);

fn composite<const C: usize>(
    input: &TensorDataStrided,
    output: &TensorDataStrided,
    shape: ImageBatchShape,
    elements: &Elements,
) {
    let src = create_tensor_wrap_nhw::<[u8; C]>(input);
    let dst = create_tensor_wrap_nhw_mut::<[u8; C]>(output);
    let width = shape.width as usize;

    par_iter_rows(shape.num_samples, shape.height, |s, y| {
        // SAFETY: the shape was validated against both tensors and each task owns one
        // output row; input and output are distinct tensors.
        let (src_row, dst_row) = unsafe {
            (
                std::slice::from_raw_parts(src.ptr([s, y]), width),
                std::slice::from_raw_parts_mut(dst.ptr_mut([s, y]), width),
            )
        };
        dst_row.copy_from_slice(src_row);
        for element in elements.sample(s as usize) {
            draw_element_row(dst_row, y, element);
        }
    });
}

/// Validates the on-screen display arguments and enqueues the compositing kernel.
pub(crate) fn infer(
    stream: &Stream,
    input: TensorDataStrided,
    output: TensorDataStrided,
    elements: Arc<Elements>,
) -> Result<(), StatusError> {
    let in_shape = image_batch_shape(&input, "Input")?;
    let out_shape = image_batch_shape(&output, "Output")?;

    if input.dtype().kind() != DataKind::U8 || output.dtype().kind() != DataKind::U8 {
        return Err(StatusError::invalid_image_format(format!(
            "Invalid DataType {} -> {}, only 8-bit channels are supported",
            input.dtype(),
            output.dtype()
        )));
    }

    let kernel: Kernel = match in_shape.channels {
        3 => composite::<3>,
        4 => composite::<4>,
        channels => {
            return Err(StatusError::invalid_image_format(format!(
                "Invalid channel number {channels}, expected 3 or 4"
            )))
        }
    };

    if in_shape != out_shape {
        return Err(StatusError::invalid_argument(format!(
            "Input and output shapes differ: {in_shape:?} vs {out_shape:?}"
        )));
    }

    if elements.num_samples() != in_shape.num_samples as usize {
        return Err(StatusError::invalid_argument(format!(
            "Expected element lists for {} samples, got {}",
            in_shape.num_samples,
            elements.num_samples()
        )));
    }
    elements.validate()?;

    log::debug!(
        "osd: {} elements over {} samples of {}x{}x{} on stream {}",
        elements.num_elements(),
        in_shape.num_samples,
        in_shape.width,
        in_shape.height,
        in_shape.channels,
        stream.name()
    );

    stream.enqueue(move || kernel(&input, &output, in_shape, &elements))
}
