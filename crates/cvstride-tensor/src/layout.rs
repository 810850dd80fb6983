use crate::tensor::TensorError;

/// Maximum rank of a tensor.
pub const MAX_TENSOR_RANK: usize = 8;

/// Dimension labels of a tensor, from the outermost to the innermost dimension.
///
/// Labels are single ASCII letters, e.g. `N` (samples), `C` (channels), `H` (rows),
/// `W` (columns) and `D` (depth).
///
/// # Example
///
/// ```
/// use cvstride_tensor::layout::TensorLayout;
///
/// let layout = TensorLayout::NHWC;
/// assert_eq!(layout.rank(), 4);
/// assert_eq!(layout.find('H'), Some(1));
/// assert_eq!("NHWC".parse::<TensorLayout>().unwrap(), layout);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorLayout {
    labels: [u8; MAX_TENSOR_RANK],
    rank: usize,
}

impl TensorLayout {
    /// Batch of interleaved images.
    pub const NHWC: TensorLayout = TensorLayout::from_const(b"NHWC");
    /// Single interleaved image.
    pub const HWC: TensorLayout = TensorLayout::from_const(b"HWC");
    /// Batch of planar images.
    pub const NCHW: TensorLayout = TensorLayout::from_const(b"NCHW");
    /// Single planar image.
    pub const CHW: TensorLayout = TensorLayout::from_const(b"CHW");
    /// Batch of single channel images with the channel folded in the element type.
    pub const NHW: TensorLayout = TensorLayout::from_const(b"NHW");
    /// Batch of 1D signals.
    pub const NW: TensorLayout = TensorLayout::from_const(b"NW");
    /// Batch of 1D interleaved signals.
    pub const NWC: TensorLayout = TensorLayout::from_const(b"NWC");
    /// Layout without labels.
    pub const NONE: TensorLayout = TensorLayout::from_const(b"");

    const fn from_const(labels: &[u8]) -> Self {
        let mut out = [0u8; MAX_TENSOR_RANK];
        let mut i = 0;
        while i < labels.len() {
            out[i] = labels[i];
            i += 1;
        }
        Self {
            labels: out,
            rank: labels.len(),
        }
    }

    /// Creates a layout from its labels.
    ///
    /// # Errors
    ///
    /// Returns an error if there are too many labels, a label is not an ASCII letter or a
    /// label is repeated.
    pub fn new(labels: &str) -> Result<Self, TensorError> {
        let bytes = labels.as_bytes();
        if bytes.len() > MAX_TENSOR_RANK {
            return Err(TensorError::InvalidLayout(format!(
                "layout '{labels}' has more than {MAX_TENSOR_RANK} dimensions"
            )));
        }
        for (i, b) in bytes.iter().enumerate() {
            if !b.is_ascii_alphabetic() {
                return Err(TensorError::InvalidLayout(format!(
                    "invalid label '{}' in layout '{labels}'",
                    *b as char
                )));
            }
            if bytes[..i].contains(b) {
                return Err(TensorError::InvalidLayout(format!(
                    "repeated label '{}' in layout '{labels}'",
                    *b as char
                )));
            }
        }
        Ok(Self::from_const(bytes))
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Returns the label of dimension `i`.
    pub fn label(&self, i: usize) -> Option<char> {
        (i < self.rank).then(|| self.labels[i] as char)
    }

    /// Returns the index of the dimension with the given label.
    pub fn find(&self, label: char) -> Option<usize> {
        self.labels[..self.rank]
            .iter()
            .position(|&l| l as char == label)
    }

    /// Returns true if the layout has a batch dimension as its outermost dimension.
    pub fn is_batch(&self) -> bool {
        self.find('N') == Some(0)
    }

    /// Returns true if the channels are the innermost dimension.
    pub fn is_channel_last(&self) -> bool {
        self.rank > 0 && self.labels[self.rank - 1] == b'C'
    }

    /// Returns the labels as a string slice.
    pub fn as_str(&self) -> &str {
        // labels are validated ASCII
        std::str::from_utf8(&self.labels[..self.rank]).unwrap_or_default()
    }
}

impl std::str::FromStr for TensorLayout {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for TensorLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TensorLayout({})", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(TensorLayout::NHWC.as_str(), "NHWC");
        assert!(TensorLayout::NHWC.is_batch());
        assert!(TensorLayout::NHWC.is_channel_last());
        assert!(!TensorLayout::HWC.is_batch());
        assert!(!TensorLayout::NCHW.is_channel_last());
        assert_eq!(TensorLayout::CHW.find('W'), Some(2));
        assert_eq!(TensorLayout::NONE.rank(), 0);
        assert_eq!(TensorLayout::NW.label(1), Some('W'));
        assert_eq!(TensorLayout::NW.label(2), None);
    }

    #[test]
    fn test_layout_parse() -> Result<(), TensorError> {
        let layout: TensorLayout = "NCDHW".parse()?;
        assert_eq!(layout.rank(), 5);
        assert_eq!(layout.find('D'), Some(2));
        assert_eq!(format!("{layout}"), "NCDHW");
        Ok(())
    }

    #[test]
    fn test_layout_invalid() {
        assert!(TensorLayout::new("NH1C").is_err());
        assert!(TensorLayout::new("NHWW").is_err());
        assert!(TensorLayout::new("ABCDEFGHI").is_err());
    }
}
