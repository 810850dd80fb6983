#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// utilities to draw elements row by row.
pub mod draw;

/// shapes drawn by the on-screen display.
pub mod elements;

/// image flipping module.
pub mod flip;

mod legacy;

/// on-screen display compositing module.
pub mod osd;

/// module containing parallelization utilities.
pub mod parallel;

/// in-order execution queues.
pub mod stream;

pub use crate::elements::{BoundingBox, Color, Element, Elements, Point2};
pub use crate::flip::{Flip, FlipMode};
pub use crate::osd::Osd;
pub use crate::stream::{Stream, StreamConfig};
