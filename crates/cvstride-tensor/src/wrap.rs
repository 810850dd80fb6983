//! Non-owning N-D tensor wraps with compile- and run-time byte strides.
//!
//! A [`TensorWrap`] addresses a pitch-linear buffer of up to [`MAX_WRAP_DIMENSIONS`] dimensions.
//! The strides of its outermost `RT` dimensions are only known at run time and are stored in the
//! wrap; the strides of the remaining innermost dimensions are fixed by the type parameter `F`
//! and fold into constants when the addressing code is monomorphized.
//!
//! For example, a wrap over an NHWC tensor of `u8` channels where each sample and each row have
//! a run-time pitch, a pixel is 3 bytes and a channel is 1 byte:
//!
//! ```
//! use cvstride_tensor::vector::int4;
//! use cvstride_tensor::wrap::{Interleaved, TensorWrapMut};
//!
//! type Wrap<'a> = TensorWrapMut<'a, u8, 2, Interleaved<[u8; 3]>>;
//!
//! let mut buf = vec![0u8; 2 * 4 * 16];
//! // sample pitch 64 bytes, row pitch 16 bytes
//! let wrap = unsafe { Wrap::from_raw_parts(buf.as_mut_ptr(), [64, 16]) };
//! assert_eq!(Wrap::NUM_DIMENSIONS, 4);
//!
//! // channel 2 of pixel (x=1, y=3) of sample 1
//! unsafe { wrap.write(int4(2, 1, 3, 1), 42) };
//! assert_eq!(buf[64 + 3 * 16 + 3 + 2], 42);
//! ```

use std::marker::PhantomData;
use std::ops::Deref;

use crate::{
    image::ImageDataStrided,
    tensor_data::TensorDataStrided,
    type_traits::{fits_in, TypeTraits},
    vector::Coordinate,
};

/// Maximum number of dimensions addressed by a wrap.
pub const MAX_WRAP_DIMENSIONS: usize = 4;

/// Byte stride of one wrap dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stride {
    /// Stride known at compile time.
    Fixed(i32),
    /// Stride supplied at construction and stored in the wrap.
    Dynamic,
}

/// Ordered per-dimension strides of a wrap, from the outermost to the innermost dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrideDescriptor {
    strides: [Stride; MAX_WRAP_DIMENSIONS],
    len: usize,
}

impl StrideDescriptor {
    /// Creates a descriptor with `num_variable` leading dynamic strides followed by the first
    /// `num_fixed` entries of `fixed`.
    pub const fn new(
        num_variable: usize,
        fixed: [i32; MAX_WRAP_DIMENSIONS],
        num_fixed: usize,
    ) -> Self {
        let mut strides = [Stride::Dynamic; MAX_WRAP_DIMENSIONS];
        let mut i = 0;
        while i < num_fixed {
            strides[num_variable + i] = Stride::Fixed(fixed[i]);
            i += 1;
        }
        Self {
            strides,
            len: num_variable + num_fixed,
        }
    }

    /// Returns the total number of dimensions.
    pub const fn num_dimensions(&self) -> usize {
        self.len
    }

    /// Returns the number of run-time strides.
    pub fn num_variable(&self) -> usize {
        self.iter().filter(|s| *s == Stride::Dynamic).count()
    }

    /// Returns the number of compile-time strides.
    pub fn num_constant(&self) -> usize {
        self.len - self.num_variable()
    }

    /// Returns the stride of dimension `i`.
    pub fn get(&self, i: usize) -> Option<Stride> {
        self.strides[..self.len].get(i).copied()
    }

    /// Iterates over the strides from the outermost to the innermost dimension.
    pub fn iter(&self) -> impl Iterator<Item = Stride> + '_ {
        self.strides[..self.len].iter().copied()
    }
}

/// Compile-time strides of the innermost dimensions of a wrap over elements of type `T`.
pub trait FixedStrides<T>: 'static {
    /// Number of fixed strides.
    const LEN: usize;

    /// The fixed strides in bytes, outermost first; entries past [`FixedStrides::LEN`] are unused.
    const STRIDES: [i32; MAX_WRAP_DIMENSIONS];
}

/// A single innermost stride equal to the size of the element type.
#[derive(Debug)]
pub struct Packed;

impl<T: TypeTraits> FixedStrides<T> for Packed {
    const LEN: usize = 1;
    const STRIDES: [i32; MAX_WRAP_DIMENSIONS] = [std::mem::size_of::<T>() as i32, 0, 0, 0];
}

/// No compile-time strides: every dimension has a run-time stride.
#[derive(Debug)]
pub struct NoFixed;

impl<T> FixedStrides<T> for NoFixed {
    const LEN: usize = 0;
    const STRIDES: [i32; MAX_WRAP_DIMENSIONS] = [0; MAX_WRAP_DIMENSIONS];
}

/// One literal innermost stride.
#[derive(Debug)]
pub struct Fixed1<const S0: i32>;

impl<T, const S0: i32> FixedStrides<T> for Fixed1<S0> {
    const LEN: usize = 1;
    const STRIDES: [i32; MAX_WRAP_DIMENSIONS] = [S0, 0, 0, 0];
}

/// Two literal innermost strides.
#[derive(Debug)]
pub struct Fixed2<const S0: i32, const S1: i32>;

impl<T, const S0: i32, const S1: i32> FixedStrides<T> for Fixed2<S0, S1> {
    const LEN: usize = 2;
    const STRIDES: [i32; MAX_WRAP_DIMENSIONS] = [S0, S1, 0, 0];
}

/// Three literal innermost strides.
#[derive(Debug)]
pub struct Fixed3<const S0: i32, const S1: i32, const S2: i32>;

impl<T, const S0: i32, const S1: i32, const S2: i32> FixedStrides<T> for Fixed3<S0, S1, S2> {
    const LEN: usize = 3;
    const STRIDES: [i32; MAX_WRAP_DIMENSIONS] = [S0, S1, S2, 0];
}

/// Pixel then channel strides for channel-level access of interleaved pixels of type `P`.
///
/// The wrap element type is the base type of `P`, e.g. `u8` for `P = [u8; 3]`.
#[derive(Debug)]
pub struct Interleaved<P>(PhantomData<fn() -> P>);

impl<P: TypeTraits> FixedStrides<P::BaseType> for Interleaved<P> {
    const LEN: usize = 2;
    const STRIDES: [i32; MAX_WRAP_DIMENSIONS] = [
        std::mem::size_of::<P>() as i32,
        std::mem::size_of::<P::BaseType>() as i32,
        0,
        0,
    ];
}

/// Number of dimensions of a wrap type, used for compile-time coordinate checks.
pub trait WrapShape {
    /// Total number of dimensions.
    const NUM_DIMENSIONS: usize;
}

struct CoordCheck<W, C>(PhantomData<fn() -> (W, C)>);

impl<W: WrapShape, C: Coordinate> CoordCheck<W, C> {
    const OK: () = assert!(
        C::RANK <= W::NUM_DIMENSIONS,
        "coordinate has more components than the wrap has dimensions"
    );
}

struct IndexCheck<W, const K: usize>(PhantomData<fn() -> W>);

impl<W: WrapShape, const K: usize> IndexCheck<W, K> {
    const OK: () = assert!(
        K <= W::NUM_DIMENSIONS,
        "more indices than the wrap has dimensions"
    );
}

/// Read-only non-owning wrap of an N-D tensor.
///
/// * `T` - element type
/// * `RT` - number of leading dimensions whose byte stride is given at run time
/// * `F` - byte strides of the trailing dimensions, fixed at compile time
///
/// The wrap is a raw base address plus `RT` integer strides. It is `Copy` and cheap to hand to
/// every task of a kernel. It performs no bounds checking: element access is `unsafe` and the
/// caller guarantees coordinates stay inside the wrapped buffer.
pub struct TensorWrap<'a, T, const RT: usize, F> {
    data: *const u8,
    strides: [i32; RT],
    _marker: PhantomData<(&'a T, fn() -> F)>,
}

impl<T, const RT: usize, F> Clone for TensorWrap<'_, T, RT, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const RT: usize, F> Copy for TensorWrap<'_, T, RT, F> {}

// SAFETY: the wrap only hands out shared access to `T`.
unsafe impl<T: Sync, const RT: usize, F> Send for TensorWrap<'_, T, RT, F> {}
unsafe impl<T: Sync, const RT: usize, F> Sync for TensorWrap<'_, T, RT, F> {}

impl<T: TypeTraits, const RT: usize, F: FixedStrides<T>> WrapShape for TensorWrap<'_, T, RT, F> {
    const NUM_DIMENSIONS: usize = RT + F::LEN;
}

impl<T, const RT: usize, F> std::fmt::Debug for TensorWrap<'_, T, RT, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorWrap")
            .field("data", &self.data)
            .field("strides", &self.strides)
            .finish()
    }
}

impl<'a, T: TypeTraits, const RT: usize, F: FixedStrides<T>> TensorWrap<'a, T, RT, F> {
    /// Total number of dimensions.
    pub const NUM_DIMENSIONS: usize = RT + F::LEN;

    /// Number of dimensions with a run-time stride.
    pub const VARIABLE_STRIDES: usize = RT;

    /// Number of dimensions with a compile-time stride.
    pub const CONSTANT_STRIDES: usize = F::LEN;

    /// The per-dimension strides of this wrap type.
    pub const DESCRIPTOR: StrideDescriptor = StrideDescriptor::new(RT, F::STRIDES, F::LEN);

    const VALID: () = assert!(
        RT + F::LEN >= 1 && RT + F::LEN <= MAX_WRAP_DIMENSIONS,
        "a tensor wrap has between 1 and 4 dimensions"
    );

    const VALID_IMAGE: () = assert!(
        RT == 1 && RT + F::LEN == 2,
        "wrapping an image requires a 2D wrap with exactly one run-time stride"
    );

    /// Wraps a raw pointer.
    ///
    /// # Arguments
    ///
    /// * `data` - Address of the first element.
    /// * `strides` - Each run-time byte stride, from the first to the last dimension.
    ///
    /// Each stride is limited to the `i32` range; offsets combining them are computed in
    /// `isize`.
    ///
    /// # Safety
    ///
    /// `data` must stay valid for reads of every element addressed through the wrap for `'a`.
    #[inline]
    pub unsafe fn from_raw_parts<D>(data: *const D, strides: [i32; RT]) -> Self {
        let () = Self::VALID;
        Self {
            data: data as *const u8,
            strides,
            _marker: PhantomData,
        }
    }

    /// Wraps the first plane of an image.
    ///
    /// Only valid for 2D wraps with one run-time stride, which receives the row stride.
    pub fn from_image(image: &'a ImageDataStrided) -> Self {
        let () = Self::VALID;
        let () = Self::VALID_IMAGE;
        let plane = image.plane(0);
        let mut strides = [0i32; RT];
        if let Some(row_stride) = strides.first_mut() {
            *row_stride = plane.row_stride;
        }
        Self {
            data: plane.base_ptr as *const u8,
            strides,
            _marker: PhantomData,
        }
    }

    /// Wraps the first `NUM_DIMENSIONS` dimensions of a tensor.
    ///
    /// # Panics
    ///
    /// Panics if the tensor rank is lower than the wrap dimensions, if a tensor stride differs
    /// from the compile-time stride of its dimension or if a run-time stride does not fit in
    /// `i32`. These are precondition violations, not recoverable errors. Only each stride is
    /// limited, the tensor itself may span more than `i32::MAX` bytes.
    pub fn from_tensor(tensor: &'a TensorDataStrided) -> Self {
        let () = Self::VALID;
        assert!(
            tensor.rank() >= Self::NUM_DIMENSIONS,
            "tensor of rank {} cannot be wrapped in {} dimensions",
            tensor.rank(),
            Self::NUM_DIMENSIONS
        );

        let mut strides = [0i32; RT];
        for i in 0..Self::NUM_DIMENSIONS {
            let actual = tensor.stride(i);
            if i < RT {
                assert!(
                    fits_in::<i32>(actual),
                    "stride {actual} of dimension {i} exceeds the 32-bit addressing range"
                );
                strides[i] = actual as i32;
            } else {
                let expected = F::STRIDES[i - RT];
                assert!(
                    actual == expected as i64,
                    "stride {actual} of dimension {i} does not match the fixed stride {expected}"
                );
            }
        }

        Self {
            data: tensor.base_ptr() as *const u8,
            strides,
            _marker: PhantomData,
        }
    }

    /// Returns the run-time strides in bytes.
    #[inline]
    pub fn strides(&self) -> &[i32] {
        &self.strides
    }

    /// Returns the base address.
    #[inline]
    pub fn data(&self) -> *const u8 {
        self.data
    }

    // Strides and indices are i32, their products and sum are pointer sized so a buffer may
    // span more than 2 GiB.
    #[inline(always)]
    fn offset(&self, coords: &[i32]) -> isize {
        let var = coords.len().min(RT);
        let dims = coords.len().min(Self::NUM_DIMENSIONS);

        let mut offset = 0isize;
        for i in 0..var {
            offset += coords[i] as isize * self.strides[i] as isize;
        }
        for i in RT..dims {
            offset += coords[i] as isize * F::STRIDES[i - RT] as isize;
        }
        offset
    }

    /// Returns the address at the given indices, from the first to the last dimension.
    ///
    /// Fewer indices than dimensions address the beginning of an outer slab, e.g. a sample or a
    /// row whose innermost dimension can then be walked manually.
    #[inline]
    pub fn ptr<const K: usize>(&self, indices: [i32; K]) -> *const T {
        let () = IndexCheck::<Self, K>::OK;
        self.data.wrapping_offset(self.offset(&indices)) as *const T
    }

    /// Returns a reference to the element at coordinate `c`, whose `x` is the innermost index.
    ///
    /// # Safety
    ///
    /// The coordinate must address an element inside the wrapped buffer and no one may write to
    /// that element while the reference is alive.
    #[inline]
    pub unsafe fn get<C: Coordinate>(&self, c: C) -> &'a T {
        &*self.coord_ptr(c)
    }

    #[inline(always)]
    fn coord_ptr<C: Coordinate>(&self, c: C) -> *const T {
        let () = CoordCheck::<Self, C>::OK;
        let coords = c.outer_to_inner();
        self.data.wrapping_offset(self.offset(&coords[..C::RANK])) as *const T
    }

    /// Reads the element at coordinate `c`.
    ///
    /// # Safety
    ///
    /// The coordinate must address an element inside the wrapped buffer and no one may write to
    /// that element concurrently.
    #[inline]
    pub unsafe fn read<C: Coordinate>(&self, c: C) -> T {
        *self.get(c)
    }
}

/// Read-and-write non-owning wrap of an N-D tensor.
///
/// Layout compatible with [`TensorWrap`], which it dereferences to for read access. Mutation
/// only lifts the constness of the returned pointers and references.
#[repr(transparent)]
pub struct TensorWrapMut<'a, T, const RT: usize, F> {
    inner: TensorWrap<'a, T, RT, F>,
    _marker: PhantomData<&'a mut T>,
}

impl<T, const RT: usize, F> Clone for TensorWrapMut<'_, T, RT, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const RT: usize, F> Copy for TensorWrapMut<'_, T, RT, F> {}

// SAFETY: writes through the wrap are unsafe and the caller keeps tasks on disjoint elements.
unsafe impl<T: Send + Sync, const RT: usize, F> Send for TensorWrapMut<'_, T, RT, F> {}
unsafe impl<T: Send + Sync, const RT: usize, F> Sync for TensorWrapMut<'_, T, RT, F> {}

impl<T: TypeTraits, const RT: usize, F: FixedStrides<T>> WrapShape
    for TensorWrapMut<'_, T, RT, F>
{
    const NUM_DIMENSIONS: usize = RT + F::LEN;
}

impl<T, const RT: usize, F> std::fmt::Debug for TensorWrapMut<'_, T, RT, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorWrapMut")
            .field("data", &self.inner.data)
            .field("strides", &self.inner.strides)
            .finish()
    }
}

impl<'a, T, const RT: usize, F> Deref for TensorWrapMut<'a, T, RT, F> {
    type Target = TensorWrap<'a, T, RT, F>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<'a, T: TypeTraits, const RT: usize, F: FixedStrides<T>> TensorWrapMut<'a, T, RT, F> {
    /// Total number of dimensions.
    pub const NUM_DIMENSIONS: usize = RT + F::LEN;

    /// Number of dimensions with a run-time stride.
    pub const VARIABLE_STRIDES: usize = RT;

    /// Number of dimensions with a compile-time stride.
    pub const CONSTANT_STRIDES: usize = F::LEN;

    /// Wraps a raw mutable pointer.
    ///
    /// # Safety
    ///
    /// `data` must stay valid for reads and writes of every element addressed through the wrap
    /// for `'a`.
    #[inline]
    pub unsafe fn from_raw_parts<D>(data: *mut D, strides: [i32; RT]) -> Self {
        Self {
            inner: TensorWrap::from_raw_parts(data as *const D, strides),
            _marker: PhantomData,
        }
    }

    /// Wraps the first plane of an image, see [`TensorWrap::from_image`].
    pub fn from_image(image: &'a ImageDataStrided) -> Self {
        Self {
            inner: TensorWrap::from_image(image),
            _marker: PhantomData,
        }
    }

    /// Wraps a tensor, see [`TensorWrap::from_tensor`].
    pub fn from_tensor(tensor: &'a TensorDataStrided) -> Self {
        Self {
            inner: TensorWrap::from_tensor(tensor),
            _marker: PhantomData,
        }
    }

    /// Returns the read-only wrap over the same memory.
    #[inline]
    pub fn as_const(&self) -> TensorWrap<'a, T, RT, F> {
        self.inner
    }

    /// Returns the mutable address at the given indices, from the first to the last dimension.
    #[inline]
    pub fn ptr_mut<const K: usize>(&self, indices: [i32; K]) -> *mut T {
        // the only place where constness is lifted
        self.inner.ptr(indices) as *mut T
    }

    /// Returns a mutable reference to the element at coordinate `c`.
    ///
    /// # Safety
    ///
    /// The coordinate must address an element inside the wrapped buffer and the reference must
    /// be the only access to that element while it is alive.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut<C: Coordinate>(&self, c: C) -> &'a mut T {
        &mut *(self.inner.coord_ptr(c) as *mut T)
    }

    /// Writes `value` to the element at coordinate `c`.
    ///
    /// # Safety
    ///
    /// The coordinate must address an element inside the wrapped buffer and no one may access
    /// that element concurrently.
    #[inline]
    pub unsafe fn write<C: Coordinate>(&self, c: C, value: T) {
        *self.get_mut(c) = value;
    }
}

/// 1D wrap whose only stride is the element size.
pub type Tensor1DWrap<'a, T> = TensorWrap<'a, T, 0, Packed>;
/// 2D wrap with a run-time row stride.
pub type Tensor2DWrap<'a, T> = TensorWrap<'a, T, 1, Packed>;
/// 3D wrap with run-time sample and row strides.
pub type Tensor3DWrap<'a, T> = TensorWrap<'a, T, 2, Packed>;
/// 4D wrap with run-time sample, row and column strides.
pub type Tensor4DWrap<'a, T> = TensorWrap<'a, T, 3, Packed>;

/// Mutable [`Tensor1DWrap`].
pub type Tensor1DWrapMut<'a, T> = TensorWrapMut<'a, T, 0, Packed>;
/// Mutable [`Tensor2DWrap`].
pub type Tensor2DWrapMut<'a, T> = TensorWrapMut<'a, T, 1, Packed>;
/// Mutable [`Tensor3DWrap`].
pub type Tensor3DWrapMut<'a, T> = TensorWrapMut<'a, T, 2, Packed>;
/// Mutable [`Tensor4DWrap`].
pub type Tensor4DWrapMut<'a, T> = TensorWrapMut<'a, T, 3, Packed>;

/// Marker selecting the wrap aliases of a given number of dimensions.
#[derive(Debug)]
pub struct Rank<const N: usize>;

/// Maps a [`Rank`] to its dimension-specialized wraps.
pub trait SelectWrap {
    /// The read-only wrap.
    type Wrap<'a, T: TypeTraits>;
    /// The read-and-write wrap.
    type WrapMut<'a, T: TypeTraits>;
}

impl SelectWrap for Rank<1> {
    type Wrap<'a, T: TypeTraits> = Tensor1DWrap<'a, T>;
    type WrapMut<'a, T: TypeTraits> = Tensor1DWrapMut<'a, T>;
}

impl SelectWrap for Rank<2> {
    type Wrap<'a, T: TypeTraits> = Tensor2DWrap<'a, T>;
    type WrapMut<'a, T: TypeTraits> = Tensor2DWrapMut<'a, T>;
}

impl SelectWrap for Rank<3> {
    type Wrap<'a, T: TypeTraits> = Tensor3DWrap<'a, T>;
    type WrapMut<'a, T: TypeTraits> = Tensor3DWrapMut<'a, T>;
}

impl SelectWrap for Rank<4> {
    type Wrap<'a, T: TypeTraits> = Tensor4DWrap<'a, T>;
    type WrapMut<'a, T: TypeTraits> = Tensor4DWrapMut<'a, T>;
}

/// The read-only wrap with `N` dimensions, one of [`Tensor1DWrap`] to [`Tensor4DWrap`].
pub type TensorNDWrap<'a, T, const N: usize> = <Rank<N> as SelectWrap>::Wrap<'a, T>;

/// The read-and-write wrap with `N` dimensions.
pub type TensorNDWrapMut<'a, T, const N: usize> = <Rank<N> as SelectWrap>::WrapMut<'a, T>;
