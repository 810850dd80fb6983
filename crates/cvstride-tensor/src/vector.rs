//! Small integer vectors used as N-D coordinates.
//!
//! Components follow the device vector convention: `x` is the fastest changing (innermost)
//! dimension, then `y`, `z` and `w`. A coordinate into an NHWC tensor is therefore
//! `Int4 { x: c, y: w, z: h, w: n }`.

/// 2D integer vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Int2 {
    /// Innermost component.
    pub x: i32,
    /// Second component.
    pub y: i32,
}

/// 3D integer vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Int3 {
    /// Innermost component.
    pub x: i32,
    /// Second component.
    pub y: i32,
    /// Third component.
    pub z: i32,
}

/// 4D integer vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Int4 {
    /// Innermost component.
    pub x: i32,
    /// Second component.
    pub y: i32,
    /// Third component.
    pub z: i32,
    /// Outermost component.
    pub w: i32,
}

/// Creates an [`Int2`].
#[inline]
pub const fn int2(x: i32, y: i32) -> Int2 {
    Int2 { x, y }
}

/// Creates an [`Int3`].
#[inline]
pub const fn int3(x: i32, y: i32, z: i32) -> Int3 {
    Int3 { x, y, z }
}

/// Creates an [`Int4`].
#[inline]
pub const fn int4(x: i32, y: i32, z: i32, w: i32) -> Int4 {
    Int4 { x, y, z, w }
}

/// A coordinate with 1 to 4 integer components accepted by wrap element access.
pub trait Coordinate: Copy {
    /// Number of components.
    const RANK: usize;

    /// Returns the components ordered from the outermost to the innermost dimension.
    ///
    /// Only the first [`Coordinate::RANK`] entries are meaningful.
    fn outer_to_inner(self) -> [i32; 4];
}

impl Coordinate for i32 {
    const RANK: usize = 1;

    #[inline(always)]
    fn outer_to_inner(self) -> [i32; 4] {
        [self, 0, 0, 0]
    }
}

impl Coordinate for [i32; 1] {
    const RANK: usize = 1;

    #[inline(always)]
    fn outer_to_inner(self) -> [i32; 4] {
        [self[0], 0, 0, 0]
    }
}

impl Coordinate for Int2 {
    const RANK: usize = 2;

    #[inline(always)]
    fn outer_to_inner(self) -> [i32; 4] {
        [self.y, self.x, 0, 0]
    }
}

impl Coordinate for Int3 {
    const RANK: usize = 3;

    #[inline(always)]
    fn outer_to_inner(self) -> [i32; 4] {
        [self.z, self.y, self.x, 0]
    }
}

impl Coordinate for Int4 {
    const RANK: usize = 4;

    #[inline(always)]
    fn outer_to_inner(self) -> [i32; 4] {
        [self.w, self.z, self.y, self.x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outer_to_inner() {
        assert_eq!(7i32.outer_to_inner(), [7, 0, 0, 0]);
        assert_eq!([7i32].outer_to_inner(), [7, 0, 0, 0]);
        assert_eq!(int2(1, 2).outer_to_inner(), [2, 1, 0, 0]);
        assert_eq!(int3(1, 2, 3).outer_to_inner(), [3, 2, 1, 0]);
        assert_eq!(int4(1, 2, 3, 4).outer_to_inner(), [4, 3, 2, 1]);
    }

    #[test]
    fn test_rank() {
        assert_eq!(<i32 as Coordinate>::RANK, 1);
        assert_eq!(Int4::RANK, 4);
    }
}
