use cvstride_tensor::{
    create_tensor_wrap_nhw, create_tensor_wrap_nhw_mut, Status, StatusError, TensorDataStrided,
    TypeTraits,
};

use super::{image_batch_shape, ImageBatchShape};
use crate::{flip::FlipMode, parallel::par_iter_rows, stream::Stream};

type Kernel = fn(&TensorDataStrided, &TensorDataStrided, ImageBatchShape, FlipMode);

fn flip_rows<P: TypeTraits>(
    input: &TensorDataStrided,
    output: &TensorDataStrided,
    shape: ImageBatchShape,
    mode: FlipMode,
) {
    let src = create_tensor_wrap_nhw::<P>(input);
    let dst = create_tensor_wrap_nhw_mut::<P>(output);
    let width = shape.width as usize;
    let vertical = matches!(mode, FlipMode::Vertical | FlipMode::Both);
    let horizontal = matches!(mode, FlipMode::Horizontal | FlipMode::Both);

    par_iter_rows(shape.num_samples, shape.height, |s, y| {
        let src_y = if vertical { shape.height - 1 - y } else { y };
        // SAFETY: the shape was validated against both tensors and each task owns one
        // output row; input and output are distinct tensors.
        let (src_row, dst_row) = unsafe {
            (
                std::slice::from_raw_parts(src.ptr([s, src_y]), width),
                std::slice::from_raw_parts_mut(dst.ptr_mut([s, y]), width),
            )
        };
        if horizontal {
            dst_row
                .iter_mut()
                .zip(src_row.iter().rev())
                .for_each(|(d, s)| *d = *s);
        } else {
            dst_row.copy_from_slice(src_row);
        }
    });
}

fn select_kernel(channel_size: usize, channels: i32) -> Option<Kernel> {
    let kernel: Kernel = match (channel_size, channels) {
        (1, 1) => flip_rows::<u8>,
        (1, 2) => flip_rows::<[u8; 2]>,
        (1, 3) => flip_rows::<[u8; 3]>,
        (1, 4) => flip_rows::<[u8; 4]>,
        (2, 1) => flip_rows::<u16>,
        (2, 2) => flip_rows::<[u16; 2]>,
        (2, 3) => flip_rows::<[u16; 3]>,
        (2, 4) => flip_rows::<[u16; 4]>,
        // 32-bit channels move as raw bits, floats included
        (4, 1) => flip_rows::<u32>,
        (4, 2) => flip_rows::<[u32; 2]>,
        (4, 3) => flip_rows::<[u32; 3]>,
        (4, 4) => flip_rows::<[u32; 4]>,
        _ => return None,
    };
    Some(kernel)
}

/// Validates the flip arguments and enqueues the flip kernel.
pub(crate) fn infer(
    stream: &Stream,
    input: TensorDataStrided,
    output: TensorDataStrided,
    mode: FlipMode,
) -> Result<(), StatusError> {
    let in_shape = image_batch_shape(&input, "Input")?;
    let out_shape = image_batch_shape(&output, "Output")?;

    if input.dtype() != output.dtype() {
        return Err(StatusError::new(
            Status::ErrorNotCompatible,
            format!(
                "Input and output data types differ: {} vs {}",
                input.dtype(),
                output.dtype()
            ),
        ));
    }
    if in_shape != out_shape {
        return Err(StatusError::invalid_argument(format!(
            "Input and output shapes differ: {in_shape:?} vs {out_shape:?}"
        )));
    }

    let kernel = select_kernel(in_shape.channel_size, in_shape.channels).ok_or_else(|| {
        StatusError::invalid_image_format(format!(
            "Unsupported pixel of {} channels of {} bytes",
            in_shape.channels, in_shape.channel_size
        ))
    })?;

    log::debug!(
        "flip {mode:?}: {} samples of {}x{} on stream {}",
        in_shape.num_samples,
        in_shape.width,
        in_shape.height,
        stream.name()
    );

    stream.enqueue(move || kernel(&input, &output, in_shape, mode))
}
