use crate::vector::{Int2, Int3, Int4};

/// Compile-time description of an element type that can live inside a tensor wrap.
///
/// A type with traits is either a scalar (`COMPONENTS == 0`) or a fixed-size vector of up to
/// four scalars of the same [`TypeTraits::BaseType`], e.g. `[u8; 3]` for an RGB8 pixel.
///
/// # Safety
///
/// Implementors must be plain old data: every bit pattern of `size_of::<Self>()` bytes is a
/// valid value, the type has no padding and no drop glue. Wraps reinterpret raw device bytes
/// as `Self`.
pub unsafe trait TypeTraits: Copy + Send + Sync + 'static {
    /// The scalar type of each component.
    type BaseType: ScalarType;

    /// Number of components, 0 for scalar types.
    const COMPONENTS: usize;

    /// Number of elements, 1 for scalar types.
    const ELEMENTS: usize = if Self::COMPONENTS == 0 {
        1
    } else {
        Self::COMPONENTS
    };

    /// Human readable name of the type.
    const NAME: &'static str;
}

/// Scalar base types: the components of every type with [`TypeTraits`].
pub trait ScalarType: TypeTraits + num_traits::Bounded + num_traits::NumCast + PartialOrd {}

/// The base scalar type of `T`.
pub type BaseType<T> = <T as TypeTraits>::BaseType;

/// Returns the number of components of `T`, 0 for scalars.
pub const fn num_components<T: TypeTraits>() -> usize {
    T::COMPONENTS
}

/// Returns the number of elements of `T`, 1 for scalars.
pub const fn num_elements<T: TypeTraits>() -> usize {
    T::ELEMENTS
}

/// Returns true if `value` is representable by the scalar type `T` without loss.
///
/// # Example
///
/// ```
/// use cvstride_tensor::type_traits::fits_in;
///
/// assert!(fits_in::<i32>(i32::MAX as i64));
/// assert!(!fits_in::<i32>(i32::MAX as i64 + 1));
/// ```
pub fn fits_in<T: ScalarType>(value: i64) -> bool {
    num_traits::cast::<i64, T>(value).is_some()
}

macro_rules! impl_scalar_traits {
    ($($ty:ty),* $(,)?) => {
        $(
            unsafe impl TypeTraits for $ty {
                type BaseType = $ty;
                const COMPONENTS: usize = 0;
                const NAME: &'static str = stringify!($ty);
            }

            impl ScalarType for $ty {}

            unsafe impl<const N: usize> TypeTraits for [$ty; N] {
                type BaseType = $ty;
                const COMPONENTS: usize = {
                    assert!(N >= 1 && N <= 4, "vector types have between 1 and 4 components");
                    N
                };
                const NAME: &'static str = concat!("[", stringify!($ty), "; N]");
            }
        )*
    };
}

impl_scalar_traits!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

unsafe impl TypeTraits for Int2 {
    type BaseType = i32;
    const COMPONENTS: usize = 2;
    const NAME: &'static str = "Int2";
}

unsafe impl TypeTraits for Int3 {
    type BaseType = i32;
    const COMPONENTS: usize = 3;
    const NAME: &'static str = "Int3";
}

unsafe impl TypeTraits for Int4 {
    type BaseType = i32;
    const COMPONENTS: usize = 4;
    const NAME: &'static str = "Int4";
}
