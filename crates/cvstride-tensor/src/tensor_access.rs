use crate::{image::Size2D, tensor_data::TensorDataStrided};

/// Image-oriented accessors over a strided tensor with `H` and `W` dimensions.
///
/// Covers batched and single images with interleaved (`NHWC`, `HWC`, `NHW`) or planar (`NCHW`,
/// `CHW`) channels. Dimensions missing from the layout read as a single sample, a single plane
/// and zero strides.
///
/// # Example
///
/// ```
/// use cvstride_tensor::{
///     allocator::CpuAllocator, data_type::DataType, layout::TensorLayout, tensor::Tensor,
///     tensor_access::TensorDataAccessStridedImagePlanar,
/// };
///
/// let tensor = Tensor::new(&[2, 4, 5, 3], DataType::U8, TensorLayout::NHWC, CpuAllocator)?;
/// let data = tensor.export_data();
/// let access = TensorDataAccessStridedImagePlanar::create(&data).unwrap();
/// assert_eq!(access.num_samples(), 2);
/// assert_eq!(access.sample_stride(), 60);
/// assert_eq!(access.row_stride(), 15);
/// assert_eq!(access.col_stride(), 3);
/// # Ok::<(), cvstride_tensor::tensor::TensorError>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct TensorDataAccessStridedImagePlanar<'a> {
    data: &'a TensorDataStrided,
    dim_n: Option<usize>,
    dim_c: Option<usize>,
    dim_h: usize,
    dim_w: usize,
}

impl<'a> TensorDataAccessStridedImagePlanar<'a> {
    /// Creates the accessor, or returns `None` if the layout does not describe images.
    pub fn create(data: &'a TensorDataStrided) -> Option<Self> {
        let layout = data.layout();
        let dim_h = layout.find('H')?;
        let dim_w = layout.find('W')?;
        let dim_n = layout.find('N');
        let dim_c = layout.find('C');

        // rows must be outside columns and samples outside everything
        if dim_h > dim_w || dim_n.is_some_and(|n| n != 0) {
            return None;
        }
        // only interleaved (C last) or planar (C before H) channels
        if let Some(c) = dim_c {
            if c != layout.rank() - 1 && c > dim_h {
                return None;
            }
        }
        // no other labels
        let known = 2 + dim_n.is_some() as usize + dim_c.is_some() as usize;
        if known != layout.rank() {
            return None;
        }

        Some(Self {
            data,
            dim_n,
            dim_c,
            dim_h,
            dim_w,
        })
    }

    /// Returns the wrapped tensor data.
    pub fn data(&self) -> &'a TensorDataStrided {
        self.data
    }

    /// Returns the number of samples, 1 without an `N` dimension.
    pub fn num_samples(&self) -> i64 {
        self.dim_n.map_or(1, |n| self.data.shape(n))
    }

    /// Returns the byte stride between samples, 0 without an `N` dimension.
    pub fn sample_stride(&self) -> i64 {
        self.dim_n.map_or(0, |n| self.data.stride(n))
    }

    /// Returns the number of rows.
    pub fn num_rows(&self) -> i64 {
        self.data.shape(self.dim_h)
    }

    /// Returns the byte stride between rows.
    pub fn row_stride(&self) -> i64 {
        self.data.stride(self.dim_h)
    }

    /// Returns the number of columns.
    pub fn num_cols(&self) -> i64 {
        self.data.shape(self.dim_w)
    }

    /// Returns the byte stride between columns.
    pub fn col_stride(&self) -> i64 {
        self.data.stride(self.dim_w)
    }

    /// Returns the number of channels, taken from the element type without a `C` dimension.
    pub fn num_channels(&self) -> i64 {
        self.dim_c
            .map_or(self.data.dtype().channels() as i64, |c| self.data.shape(c))
    }

    /// Returns the byte stride between channels.
    pub fn chan_stride(&self) -> i64 {
        self.dim_c
            .map_or(self.data.dtype().channel_size() as i64, |c| {
                self.data.stride(c)
            })
    }

    /// Returns true if channels are stored in separate planes.
    pub fn is_planar(&self) -> bool {
        self.dim_c.is_some_and(|c| c < self.dim_h)
    }

    /// Returns the number of planes, 1 for interleaved channels.
    pub fn num_planes(&self) -> i64 {
        if self.is_planar() {
            self.num_channels()
        } else {
            1
        }
    }

    /// Returns the byte stride between planes, 0 for interleaved channels.
    pub fn plane_stride(&self) -> i64 {
        match self.dim_c {
            Some(c) if self.is_planar() => self.data.stride(c),
            _ => 0,
        }
    }

    /// Returns the image size of each sample.
    pub fn size(&self) -> Size2D {
        Size2D::new(self.num_cols() as i32, self.num_rows() as i32)
    }
}
