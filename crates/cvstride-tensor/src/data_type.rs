use crate::tensor::TensorError;

/// Scalar kind of a tensor or image channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataKind {
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 8-bit integer.
    S8,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 16-bit integer.
    S16,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    S32,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl DataKind {
    /// Returns the size in bytes of one channel.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DataKind::U8 | DataKind::S8 => 1,
            DataKind::U16 | DataKind::S16 => 2,
            DataKind::U32 | DataKind::S32 | DataKind::F32 => 4,
            DataKind::F64 => 8,
        }
    }
}

/// Element type of a tensor: a scalar kind packed into 1 to 4 channels.
///
/// # Example
///
/// ```
/// use cvstride_tensor::data_type::{DataKind, DataType};
///
/// let rgb8 = DataType::new(DataKind::U8, 3).unwrap();
/// assert_eq!(rgb8.stride_bytes(), 3);
/// assert_eq!(rgb8, DataType::U8.with_channels(3).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataType {
    kind: DataKind,
    channels: usize,
}

impl DataType {
    /// Single channel u8.
    pub const U8: DataType = DataType::single(DataKind::U8);
    /// Single channel i8.
    pub const S8: DataType = DataType::single(DataKind::S8);
    /// Single channel u16.
    pub const U16: DataType = DataType::single(DataKind::U16);
    /// Single channel i16.
    pub const S16: DataType = DataType::single(DataKind::S16);
    /// Single channel u32.
    pub const U32: DataType = DataType::single(DataKind::U32);
    /// Single channel i32.
    pub const S32: DataType = DataType::single(DataKind::S32);
    /// Single channel f32.
    pub const F32: DataType = DataType::single(DataKind::F32);
    /// Single channel f64.
    pub const F64: DataType = DataType::single(DataKind::F64);

    const fn single(kind: DataKind) -> Self {
        Self { kind, channels: 1 }
    }

    /// Creates a data type with the given scalar kind and number of channels.
    ///
    /// # Errors
    ///
    /// Returns an error if `channels` is not in `1..=4`.
    pub fn new(kind: DataKind, channels: usize) -> Result<Self, TensorError> {
        if !(1..=4).contains(&channels) {
            return Err(TensorError::InvalidDataType(format!(
                "number of channels must be between 1 and 4, got {channels}"
            )));
        }
        Ok(Self { kind, channels })
    }

    /// Returns the same scalar kind with a different number of channels.
    pub fn with_channels(&self, channels: usize) -> Result<Self, TensorError> {
        Self::new(self.kind, channels)
    }

    /// Returns the scalar kind.
    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// Returns the number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the size in bytes of one channel.
    pub fn channel_size(&self) -> usize {
        self.kind.size_in_bytes()
    }

    /// Returns the size in bytes of one element.
    pub fn stride_bytes(&self) -> usize {
        self.kind.size_in_bytes() * self.channels
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.channels == 1 {
            write!(f, "{:?}", self.kind)
        } else {
            write!(f, "{:?}x{}", self.kind, self.channels)
        }
    }
}
