use cvstride_tensor::StatusError;

/// An RGBA colour. Alpha 255 is opaque, 0 leaves the image untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
    /// Opacity.
    pub a: u8,
}

impl Color {
    /// Creates a colour from its components.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque colour.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// A point in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point2 {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Point2 {
    /// Creates a point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis aligned box from its top-left corner and size in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// Left column.
    pub x: i32,
    /// Top row.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl BoundingBox {
    /// Creates a bounding box.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the column one past the right edge, saturated to the `i32` range.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Returns the row one past the bottom edge, saturated to the `i32` range.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }
}

/// A shape drawn by the on-screen display.
///
/// Thicknesses are in pixels. For rectangles and circles a negative thickness fills the shape.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Element {
    /// A rectangle outline, optionally filled.
    Rect {
        /// Outer bounds of the rectangle.
        bbox: BoundingBox,
        /// Border thickness, negative to fill with `border_color`.
        thickness: i32,
        /// Colour of the border.
        border_color: Color,
        /// Colour of the interior, drawn under the border.
        fill_color: Option<Color>,
    },
    /// A straight segment.
    Line {
        /// Start point.
        p0: Point2,
        /// End point.
        p1: Point2,
        /// Line thickness.
        thickness: i32,
        /// Line colour.
        color: Color,
    },
    /// A chain of segments.
    PolyLine {
        /// Vertices, at least two.
        points: Vec<Point2>,
        /// Line thickness.
        thickness: i32,
        /// Joins the last point back to the first.
        closed: bool,
        /// Line colour.
        color: Color,
    },
    /// A filled dot.
    Point {
        /// Centre of the dot.
        center: Point2,
        /// Radius of the dot.
        radius: i32,
        /// Dot colour.
        color: Color,
    },
    /// A circle outline or disc.
    Circle {
        /// Centre of the circle.
        center: Point2,
        /// Radius of the circle.
        radius: i32,
        /// Ring thickness, negative to fill.
        thickness: i32,
        /// Circle colour.
        color: Color,
    },
}

impl Element {
    /// Checks the parameters of the element.
    ///
    /// # Errors
    ///
    /// Returns [`cvstride_tensor::Status::ErrorInvalidArgument`] for empty shapes and zero
    /// thicknesses.
    pub fn validate(&self) -> Result<(), StatusError> {
        match self {
            Element::Rect {
                bbox, thickness, ..
            } => {
                if bbox.width <= 0 || bbox.height <= 0 {
                    return Err(StatusError::invalid_argument(format!(
                        "rectangle size must be positive, got {}x{}",
                        bbox.width, bbox.height
                    )));
                }
                check_thickness(*thickness, true)
            }
            Element::Line { thickness, .. } => check_thickness(*thickness, false),
            Element::PolyLine {
                points, thickness, ..
            } => {
                if points.len() < 2 {
                    return Err(StatusError::invalid_argument(format!(
                        "polyline needs at least 2 points, got {}",
                        points.len()
                    )));
                }
                check_thickness(*thickness, false)
            }
            Element::Point { radius, .. } => check_radius(*radius),
            Element::Circle {
                radius, thickness, ..
            } => {
                check_radius(*radius)?;
                check_thickness(*thickness, true)
            }
        }
    }
}

fn check_thickness(thickness: i32, fillable: bool) -> Result<(), StatusError> {
    if thickness == 0 || (!fillable && thickness < 0) {
        return Err(StatusError::invalid_argument(format!(
            "invalid thickness {thickness}"
        )));
    }
    Ok(())
}

fn check_radius(radius: i32) -> Result<(), StatusError> {
    if radius <= 0 {
        return Err(StatusError::invalid_argument(format!(
            "radius must be positive, got {radius}"
        )));
    }
    Ok(())
}

/// The elements to draw, one list per sample of the image batch.
///
/// # Example
///
/// ```
/// use cvstride_imgproc::elements::{BoundingBox, Color, Element, Elements};
///
/// let mut elements = Elements::new();
/// elements.push_sample(vec![Element::Rect {
///     bbox: BoundingBox::new(2, 2, 8, 4),
///     thickness: 1,
///     border_color: Color::rgb(255, 0, 0),
///     fill_color: None,
/// }]);
/// elements.push_sample(vec![]);
/// assert_eq!(elements.num_samples(), 2);
/// assert_eq!(elements.num_elements(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Elements {
    samples: Vec<Vec<Element>>,
}

impl Elements {
    /// Creates an empty element batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an element batch from one list per sample.
    pub fn from_samples(samples: Vec<Vec<Element>>) -> Self {
        Self { samples }
    }

    /// Appends the element list of the next sample.
    pub fn push_sample(&mut self, elements: Vec<Element>) {
        self.samples.push(elements);
    }

    /// Returns the number of samples.
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Returns the elements of sample `i`, empty if out of range.
    pub fn sample(&self, i: usize) -> &[Element] {
        self.samples.get(i).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the total number of elements.
    pub fn num_elements(&self) -> usize {
        self.samples.iter().map(Vec::len).sum()
    }

    /// Checks every element.
    ///
    /// # Errors
    ///
    /// Returns the error of the first invalid element, prefixed with its position.
    pub fn validate(&self) -> Result<(), StatusError> {
        for (s, sample) in self.samples.iter().enumerate() {
            for (i, element) in sample.iter().enumerate() {
                element.validate().map_err(|e| {
                    StatusError::new(
                        e.status(),
                        format!("element {i} of sample {s}: {}", e.message()),
                    )
                })?;
            }
        }
        Ok(())
    }
}
