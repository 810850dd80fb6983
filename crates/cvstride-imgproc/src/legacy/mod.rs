//! Kernel implementations behind the operators.
//!
//! Each kernel validates the exported data it receives, picks a specialization for the element
//! type and enqueues it on the stream. Nothing is enqueued when validation fails.

pub(crate) mod flip;
pub(crate) mod osd;

use cvstride_tensor::{
    type_traits::fits_in, StatusError, TensorDataAccessStridedImagePlanar, TensorDataStrided,
};

/// Geometry of a validated batch of interleaved images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ImageBatchShape {
    pub num_samples: i32,
    pub height: i32,
    pub width: i32,
    pub channels: i32,
    pub channel_size: usize,
}

fn to_i32(value: i64, what: &str) -> Result<i32, StatusError> {
    if !fits_in::<i32>(value) {
        return Err(StatusError::invalid_argument(format!(
            "{what} {value} is out of range"
        )));
    }
    Ok(value as i32)
}

// One past the last byte addressed by a kernel: (n-1)*sample + (h-1)*row + w*col.
fn byte_extent(access: &TensorDataAccessStridedImagePlanar) -> Option<i64> {
    let last_sample = (access.num_samples() - 1).checked_mul(access.sample_stride())?;
    let last_row = (access.num_rows() - 1).checked_mul(access.row_stride())?;
    let row_bytes = access.num_cols().checked_mul(access.col_stride())?;
    last_sample.checked_add(last_row)?.checked_add(row_bytes)
}

/// Reads the geometry of an `NHWC`, `HWC`, `NHW` or `HW` tensor with packed pixels.
///
/// Kernels address the tensor with 32-bit byte offsets, so the whole batch must span at most
/// `i32::MAX` bytes.
pub(crate) fn image_batch_shape(
    data: &TensorDataStrided,
    name: &str,
) -> Result<ImageBatchShape, StatusError> {
    let access = TensorDataAccessStridedImagePlanar::create(data).ok_or_else(|| {
        StatusError::invalid_argument(format!(
            "{name} must have an image layout, got {}",
            data.layout()
        ))
    })?;

    if access.is_planar() {
        return Err(StatusError::invalid_image_format(
            format!("{name} with planar layout {} is not supported", data.layout()),
        ));
    }

    let channel_size = data.dtype().channel_size();
    let channels = access.num_channels();
    if access.chan_stride() != channel_size as i64
        || access.col_stride() != channels * channel_size as i64
    {
        return Err(StatusError::invalid_argument(format!(
            "{name} pixels must be packed, got column stride {} and channel stride {}",
            access.col_stride(),
            access.chan_stride()
        )));
    }

    match byte_extent(&access) {
        Some(extent) if fits_in::<i32>(extent) => {}
        extent => {
            return Err(StatusError::invalid_argument(format!(
                "{name} spans {} bytes, beyond the 32-bit addressing range",
                extent.map_or_else(|| "more than i64::MAX".to_string(), |e| e.to_string())
            )))
        }
    }

    Ok(ImageBatchShape {
        num_samples: to_i32(access.num_samples(), "number of samples")?,
        height: to_i32(access.num_rows(), "height")?,
        width: to_i32(access.num_cols(), "width")?,
        channels: to_i32(channels, "number of channels")?,
        channel_size,
    })
}
