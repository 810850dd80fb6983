use crate::{
    allocator::TensorAllocator,
    data_type::{DataKind, DataType},
    device::Device,
    storage::TensorStorage,
    tensor::TensorError,
};

/// Maximum number of planes of an image.
pub const MAX_PLANES: usize = 4;

/// Size of a 2D image in pixels.
///
/// Sizes compare lexicographically by width and then height.
///
/// # Example
///
/// ```
/// use cvstride_tensor::image::Size2D;
///
/// let size = Size2D::new(640, 480);
/// assert_eq!(size.to_string(), "640x480");
/// assert!(Size2D::new(640, 480) < Size2D::new(640, 481));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size2D {
    /// Width of the image in pixels
    pub w: i32,
    /// Height of the image in pixels
    pub h: i32,
}

impl Size2D {
    /// Creates a size from its width and height.
    pub const fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }
}

impl std::fmt::Display for Size2D {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Pixel format of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImageFormat {
    /// Single channel 8-bit.
    U8,
    /// Single channel 16-bit.
    U16,
    /// Single channel 32-bit float.
    F32,
    /// Interleaved 8-bit RGB.
    Rgb8,
    /// Interleaved 8-bit RGBA.
    Rgba8,
    /// Interleaved 8-bit BGR.
    Bgr8,
    /// Interleaved 32-bit float RGB.
    Rgbf32,
    /// Luma plane followed by a half resolution interleaved chroma plane.
    Nv12,
}

impl ImageFormat {
    /// Returns the number of planes.
    pub fn num_planes(&self) -> usize {
        match self {
            ImageFormat::Nv12 => 2,
            _ => 1,
        }
    }

    /// Returns the pixel type of plane `plane`.
    pub fn plane_data_type(&self, plane: usize) -> DataType {
        let (kind, channels) = match (self, plane) {
            (ImageFormat::U8, _) => (DataKind::U8, 1),
            (ImageFormat::U16, _) => (DataKind::U16, 1),
            (ImageFormat::F32, _) => (DataKind::F32, 1),
            (ImageFormat::Rgb8 | ImageFormat::Bgr8, _) => (DataKind::U8, 3),
            (ImageFormat::Rgba8, _) => (DataKind::U8, 4),
            (ImageFormat::Rgbf32, _) => (DataKind::F32, 3),
            (ImageFormat::Nv12, 0) => (DataKind::U8, 1),
            (ImageFormat::Nv12, _) => (DataKind::U8, 2),
        };
        // channels are always in 1..=4
        DataType::new(kind, channels).unwrap_or(DataType::U8)
    }

    /// Returns the size of plane `plane` for an image of size `size`.
    pub fn plane_size(&self, size: Size2D, plane: usize) -> Size2D {
        match (self, plane) {
            (ImageFormat::Nv12, 1) => Size2D::new((size.w + 1) / 2, (size.h + 1) / 2),
            _ => size,
        }
    }
}

/// One plane of a pitch-linear image.
#[derive(Clone, Copy, Debug)]
pub struct ImagePlaneStrided {
    /// Width of the plane in pixels.
    pub width: i32,
    /// Height of the plane in pixels.
    pub height: i32,
    /// Byte offset between consecutive rows.
    pub row_stride: i32,
    /// Address of the first pixel.
    pub base_ptr: *mut u8,
}

/// Pitch-linear view of image memory, as handed to kernels.
///
/// Like [`crate::tensor_data::TensorDataStrided`], an exported image data object keeps the image
/// storage alive.
#[derive(Clone, Debug)]
pub struct ImageDataStrided {
    format: ImageFormat,
    size: Size2D,
    planes: [Option<ImagePlaneStrided>; MAX_PLANES],
    device: Device,
    _owner: Option<TensorStorage>,
}

// SAFETY: see `TensorDataStrided`.
unsafe impl Send for ImageDataStrided {}
unsafe impl Sync for ImageDataStrided {}

impl ImageDataStrided {
    /// Describes externally owned image memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of planes does not match the format.
    ///
    /// # Safety
    ///
    /// Every plane base pointer must stay valid for `height * row_stride` bytes for as long as
    /// the data object or any wrap built from it is used.
    pub unsafe fn from_raw_parts(
        format: ImageFormat,
        size: Size2D,
        planes: &[ImagePlaneStrided],
        device: Device,
    ) -> Result<Self, TensorError> {
        if planes.len() != format.num_planes() {
            return Err(TensorError::InvalidShape(format!(
                "format {format:?} needs {} planes, got {}",
                format.num_planes(),
                planes.len()
            )));
        }
        let mut out = [None; MAX_PLANES];
        for (dst, src) in out.iter_mut().zip(planes) {
            *dst = Some(*src);
        }
        Ok(Self {
            format,
            size,
            planes: out,
            device,
            _owner: None,
        })
    }

    /// Returns the pixel format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Returns the image size.
    pub fn size(&self) -> Size2D {
        self.size
    }

    /// Returns the number of planes.
    pub fn num_planes(&self) -> usize {
        self.format.num_planes()
    }

    /// Returns plane `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is not a plane of the image format.
    pub fn plane(&self, i: usize) -> &ImagePlaneStrided {
        match self.planes.get(i) {
            Some(Some(plane)) => plane,
            _ => panic!("plane {i} out of range for {:?}", self.format),
        }
    }

    /// Returns the device holding the memory.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Returns true if device kernels can access the memory.
    pub fn is_device_accessible(&self) -> bool {
        self.device.is_device_accessible()
    }
}

/// An owned pitch-linear image with one or more planes in a single allocation.
#[derive(Debug)]
pub struct Image {
    storage: TensorStorage,
    size: Size2D,
    format: ImageFormat,
    // (byte offset, row stride) per plane
    planes: Vec<(usize, i32)>,
}

impl Image {
    /// Allocates a zeroed image.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is not positive or the allocation fails.
    pub fn new<A: TensorAllocator>(
        size: Size2D,
        format: ImageFormat,
        alloc: A,
    ) -> Result<Self, TensorError> {
        if size.w <= 0 || size.h <= 0 {
            return Err(TensorError::InvalidShape(format!(
                "image size must be positive, got {size}"
            )));
        }

        let row_align = alloc.row_alignment().max(1);
        let mut planes = Vec::with_capacity(format.num_planes());
        let mut offset = 0usize;
        for p in 0..format.num_planes() {
            let plane_size = format.plane_size(size, p);
            let row_bytes = plane_size.w as usize * format.plane_data_type(p).stride_bytes();
            let row_stride = row_bytes.div_ceil(row_align) * row_align;
            let row_stride = i32::try_from(row_stride).map_err(|_| {
                TensorError::InvalidShape(format!("row pitch of {size} image overflows"))
            })?;
            planes.push((offset, row_stride));
            offset = (row_stride as usize)
                .checked_mul(plane_size.h as usize)
                .and_then(|bytes| offset.checked_add(bytes))
                .ok_or_else(|| TensorError::InvalidShape(format!("size of {size} image overflows")))?;
        }

        let align = format.plane_data_type(0).channel_size();
        let storage = TensorStorage::new(offset, align, alloc)?;

        Ok(Self {
            storage,
            size,
            format,
            planes,
        })
    }

    /// Returns the image size.
    pub fn size(&self) -> Size2D {
        self.size
    }

    /// Returns the pixel format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Returns the device where the image is allocated.
    pub fn device(&self) -> Device {
        self.storage.device()
    }

    /// Returns the row stride of plane `plane`.
    pub fn row_stride(&self, plane: usize) -> i32 {
        self.planes[plane].1
    }

    /// Exports the strided data of the image regardless of where it lives.
    pub fn export_data(&self) -> ImageDataStrided {
        let mut planes = [None; MAX_PLANES];
        for (p, (dst, &(offset, row_stride))) in planes.iter_mut().zip(&self.planes).enumerate() {
            let plane_size = self.format.plane_size(self.size, p);
            *dst = Some(ImagePlaneStrided {
                width: plane_size.w,
                height: plane_size.h,
                row_stride,
                base_ptr: self.storage.as_mut_ptr().wrapping_add(offset),
            });
        }
        ImageDataStrided {
            format: self.format,
            size: self.size,
            planes,
            device: self.storage.device(),
            _owner: Some(self.storage.clone()),
        }
    }

    /// Exports the strided data of the image if device kernels can access it.
    pub fn export_device_data(&self) -> Option<ImageDataStrided> {
        self.device()
            .is_device_accessible()
            .then(|| self.export_data())
    }

    /// Returns the image bytes of all planes, including row padding, for host reading.
    ///
    /// # Panics
    ///
    /// Panics if exported data or pending stream work still references the image.
    pub fn as_bytes(&self) -> &[u8] {
        self.storage.as_bytes()
    }

    /// Returns the image bytes of all planes, including row padding, for host writing.
    ///
    /// # Panics
    ///
    /// Panics if exported data or pending stream work still references the image.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.storage.as_bytes_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{CpuAllocator, DeviceAllocator};

    #[test]
    fn test_size2d() {
        let a = Size2D::new(2, 3);
        assert_eq!(a, Size2D { w: 2, h: 3 });
        assert_ne!(a, Size2D::new(3, 2));
        assert!(Size2D::new(1, 9) < Size2D::new(2, 0));
        assert!(Size2D::new(2, 1) < Size2D::new(2, 3));
        assert_eq!(format!("{a}"), "2x3");
    }

    #[test]
    fn test_image_rgb8() -> Result<(), TensorError> {
        let image = Image::new(Size2D::new(5, 3), ImageFormat::Rgb8, CpuAllocator)?;
        assert_eq!(image.row_stride(0), 15);
        assert_eq!(image.as_bytes().len(), 45);

        let data = image.export_data();
        assert_eq!(data.num_planes(), 1);
        assert_eq!(data.plane(0).row_stride, 15);
        assert_eq!(data.plane(0).width, 5);
        assert!(!data.is_device_accessible());
        Ok(())
    }

    #[test]
    fn test_image_nv12_device() -> Result<(), TensorError> {
        let image = Image::new(Size2D::new(6, 4), ImageFormat::Nv12, DeviceAllocator::new(0))?;
        let data = image.export_device_data().expect("device image");
        assert_eq!(data.num_planes(), 2);
        assert_eq!(data.plane(0).row_stride, 256);
        assert_eq!(data.plane(1).width, 3);
        assert_eq!(data.plane(1).height, 2);
        assert_eq!(
            data.plane(1).base_ptr as usize - data.plane(0).base_ptr as usize,
            256 * 4
        );
        Ok(())
    }

    #[test]
    fn test_image_invalid_size() {
        let res = Image::new(Size2D::new(0, 4), ImageFormat::U8, CpuAllocator);
        assert!(res.is_err());
    }
}
