#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use cvstride_tensor as tensor;

#[doc(inline)]
pub use cvstride_imgproc as imgproc;
