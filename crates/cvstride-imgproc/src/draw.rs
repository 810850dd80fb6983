use std::cmp::{max, min};

use crate::elements::{BoundingBox, Color, Element, Point2};

/// Alpha-blends `color` over an RGB or RGBA pixel.
///
/// The colour channels are mixed by the colour alpha. An alpha channel, if present, keeps the
/// more opaque of the pixel and the colour.
#[inline]
pub fn blend_pixel<const C: usize>(pixel: &mut [u8; C], color: Color) {
    let a = color.a as u32;
    if a == 0 {
        return;
    }
    let src = [color.r, color.g, color.b];
    for (dst, &src) in pixel.iter_mut().zip(src.iter()) {
        *dst = ((src as u32 * a + *dst as u32 * (255 - a) + 127) / 255) as u8;
    }
    if let Some(alpha) = pixel.get_mut(3) {
        *alpha = (*alpha).max(color.a);
    }
}

// [x0, x1) clamped to the row; spans are i64 so element extents never overflow
#[inline]
fn clamp_span(len: usize, x0: i64, x1: i64) -> (usize, usize) {
    let len = len as i64;
    let end = x1.clamp(0, len);
    let start = x0.clamp(0, end);
    (start as usize, end as usize)
}

fn fill_span<const C: usize>(row: &mut [[u8; C]], x0: i64, x1: i64, color: Color) {
    let (start, end) = clamp_span(row.len(), x0, x1);
    for pixel in &mut row[start..end] {
        blend_pixel(pixel, color);
    }
}

fn blend_where<const C: usize>(
    row: &mut [[u8; C]],
    x0: i64,
    x1: i64,
    covered: impl Fn(i64) -> bool,
    color: Color,
) {
    let (start, end) = clamp_span(row.len(), x0, x1);
    for (x, pixel) in row[start..end].iter_mut().enumerate() {
        if covered((start + x) as i64) {
            blend_pixel(pixel, color);
        }
    }
}

fn segment_dist2(px: f64, py: f64, a: Point2, b: Point2) -> f64 {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - ax, b.y as f64 - ay);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0)
    };
    let (ex, ey) = (ax + t * dx - px, ay + t * dy - py);
    ex * ex + ey * ey
}

fn segments(points: &[Point2], closed: bool) -> impl Iterator<Item = (Point2, Point2)> + '_ {
    let closing = match (closed, points.first(), points.last()) {
        (true, Some(&first), Some(&last)) if points.len() > 2 => Some((last, first)),
        _ => None,
    };
    points
        .windows(2)
        .map(|w| (w[0], w[1]))
        .chain(closing)
}

/// Draws the part of a polyline on row `y`.
///
/// A pixel is covered when its centre is within half the thickness of any segment, so joints
/// are blended once.
fn draw_polyline_row<const C: usize>(
    row: &mut [[u8; C]],
    y: i32,
    points: &[Point2],
    closed: bool,
    thickness: i32,
    color: Color,
) {
    let half = thickness as f64 / 2.0;
    let reach = half.ceil() as i64;
    let y = y as i64;

    let (mut x0, mut x1) = (i64::MAX, i64::MIN);
    for (a, b) in segments(points, closed) {
        if y < min(a.y, b.y) as i64 - reach || y > max(a.y, b.y) as i64 + reach {
            continue;
        }
        x0 = min(x0, min(a.x, b.x) as i64 - reach);
        x1 = max(x1, max(a.x, b.x) as i64 + reach);
    }
    if x0 > x1 {
        return;
    }

    let (py, half2) = (y as f64, half * half);
    blend_where(
        row,
        x0,
        x1 + 1,
        |x| segments(points, closed).any(|(a, b)| segment_dist2(x as f64, py, a, b) <= half2),
        color,
    );
}

fn draw_disc_row<const C: usize>(
    row: &mut [[u8; C]],
    y: i32,
    center: Point2,
    radius: i32,
    color: Color,
) {
    let dy = y as i64 - center.y as i64;
    let r = radius as i64;
    if dy.abs() > r {
        return;
    }
    let dx = ((r * r - dy * dy) as f64).sqrt() as i64;
    let cx = center.x as i64;
    fill_span(row, cx - dx, cx + dx + 1, color);
}

fn draw_ring_row<const C: usize>(
    row: &mut [[u8; C]],
    y: i32,
    center: Point2,
    radius: i32,
    thickness: i32,
    color: Color,
) {
    let half = thickness as f64 / 2.0;
    let outer = radius as f64 + half;
    let inner = (radius as f64 - half).max(0.0);
    let dy = (y as i64 - center.y as i64) as f64;
    if dy.abs() > outer {
        return;
    }
    let reach = outer.ceil() as i64;
    let cx = center.x as i64;
    let (outer2, inner2) = (outer * outer, inner * inner);
    blend_where(
        row,
        cx - reach,
        cx + reach + 1,
        |x| {
            let dx = (x - cx) as f64;
            let d2 = dx * dx + dy * dy;
            d2 >= inner2 && d2 <= outer2
        },
        color,
    );
}

fn draw_rect_row<const C: usize>(
    row: &mut [[u8; C]],
    y: i32,
    bbox: &BoundingBox,
    thickness: i32,
    border_color: Color,
    fill_color: Option<Color>,
) {
    let (top, bottom) = (bbox.y as i64, bbox.y as i64 + bbox.height as i64);
    let (left, right) = (bbox.x as i64, bbox.x as i64 + bbox.width as i64);
    let y = y as i64;
    if y < top || y >= bottom {
        return;
    }
    if thickness < 0 {
        fill_span(row, left, right, border_color);
        return;
    }

    let t = thickness as i64;
    let horizontal_edge = y < top + t || y >= bottom - t;
    if horizontal_edge {
        fill_span(row, left, right, border_color);
        return;
    }

    let left_end = min(left + t, right);
    let right_start = max(right - t, left_end);
    if let Some(fill) = fill_color {
        fill_span(row, left_end, right_start, fill);
    }
    fill_span(row, left, left_end, border_color);
    fill_span(row, right_start, right, border_color);
}

/// Draws the part of `element` that falls on row `y` of an image.
///
/// Rows can be drawn independently and in any order. Pixels outside the row are clipped.
pub fn draw_element_row<const C: usize>(row: &mut [[u8; C]], y: i32, element: &Element) {
    match element {
        Element::Rect {
            bbox,
            thickness,
            border_color,
            fill_color,
        } => draw_rect_row(row, y, bbox, *thickness, *border_color, *fill_color),
        Element::Line {
            p0,
            p1,
            thickness,
            color,
        } => draw_polyline_row(row, y, &[*p0, *p1], false, *thickness, *color),
        Element::PolyLine {
            points,
            thickness,
            closed,
            color,
        } => draw_polyline_row(row, y, points, *closed, *thickness, *color),
        Element::Point {
            center,
            radius,
            color,
        } => draw_disc_row(row, y, *center, *radius, *color),
        Element::Circle {
            center,
            radius,
            thickness,
            color,
        } => {
            if *thickness < 0 {
                draw_disc_row(row, y, *center, *radius, *color);
            } else {
                draw_ring_row(row, y, *center, *radius, *thickness, *color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render<const C: usize>(width: usize, height: usize, elements: &[Element]) -> Vec<[u8; C]> {
        let mut image = vec![[0u8; C]; width * height];
        for (y, row) in image.chunks_exact_mut(width).enumerate() {
            for element in elements {
                draw_element_row(row, y as i32, element);
            }
        }
        image
    }

    fn first_channel<const C: usize>(image: &[[u8; C]]) -> Vec<u8> {
        image.iter().map(|p| p[0]).collect()
    }

    #[test]
    fn test_blend_pixel() {
        let mut px = [0u8, 100, 200];
        blend_pixel(&mut px, Color::rgb(10, 20, 30));
        assert_eq!(px, [10, 20, 30]);

        let mut px = [0u8, 0, 0, 10];
        blend_pixel(&mut px, Color::new(255, 255, 255, 128));
        assert_eq!(px, [128, 128, 128, 128]);

        let mut px = [7u8, 8, 9];
        blend_pixel(&mut px, Color::new(255, 255, 255, 0));
        assert_eq!(px, [7, 8, 9]);
    }

    #[rustfmt::skip]
    #[test]
    fn test_draw_line() {
        let line = Element::Line {
            p0: Point2::new(0, 0),
            p1: Point2::new(4, 4),
            thickness: 1,
            color: Color::rgb(255, 255, 255),
        };
        let image = render::<3>(5, 5, &[line]);
        assert_eq!(
            first_channel(&image),
            &[
                255,   0,   0,   0,   0,
                  0, 255,   0,   0,   0,
                  0,   0, 255,   0,   0,
                  0,   0,   0, 255,   0,
                  0,   0,   0,   0, 255,
            ]
        );
    }

    #[rustfmt::skip]
    #[test]
    fn test_draw_rect() {
        let rect = Element::Rect {
            bbox: BoundingBox::new(1, 1, 3, 3),
            thickness: 1,
            border_color: Color::rgb(128, 128, 128),
            fill_color: None,
        };
        let image = render::<3>(5, 5, &[rect]);
        assert_eq!(
            first_channel(&image),
            &[
                  0,   0,   0,   0,   0,
                  0, 128, 128, 128,   0,
                  0, 128,   0, 128,   0,
                  0, 128, 128, 128,   0,
                  0,   0,   0,   0,   0,
            ]
        );
    }

    #[rustfmt::skip]
    #[test]
    fn test_draw_rect_with_fill() {
        let rect = Element::Rect {
            bbox: BoundingBox::new(0, 0, 4, 3),
            thickness: 1,
            border_color: Color::rgb(200, 0, 0),
            fill_color: Some(Color::rgb(50, 0, 0)),
        };
        let image = render::<4>(4, 3, &[rect]);
        assert_eq!(
            first_channel(&image),
            &[
                200, 200, 200, 200,
                200,  50,  50, 200,
                200, 200, 200, 200,
            ]
        );
        assert!(image.iter().all(|p| p[3] == 255));
    }

    #[rustfmt::skip]
    #[test]
    fn test_draw_filled_rect_clipped() {
        let rect = Element::Rect {
            bbox: BoundingBox::new(2, -1, 10, 3),
            thickness: -1,
            border_color: Color::rgb(0, 0, 255),
            fill_color: None,
        };
        let image = render::<3>(4, 3, &[rect]);
        let blue = image.iter().map(|p| p[2]).collect::<Vec<_>>();
        assert_eq!(
            blue,
            &[
                0, 0, 255, 255,
                0, 0, 255, 255,
                0, 0,   0,   0,
            ]
        );
    }

    #[rustfmt::skip]
    #[test]
    fn test_draw_closed_polyline() {
        let poly = Element::PolyLine {
            points: vec![Point2::new(0, 0), Point2::new(3, 0), Point2::new(3, 3), Point2::new(0, 3)],
            thickness: 1,
            closed: true,
            color: Color::rgb(9, 9, 9),
        };
        let image = render::<3>(5, 4, &[poly]);
        assert_eq!(
            first_channel(&image),
            &[
                9, 9, 9, 9, 0,
                9, 0, 0, 9, 0,
                9, 0, 0, 9, 0,
                9, 9, 9, 9, 0,
            ]
        );
    }

    #[test]
    fn test_draw_polyline_joint_blended_once() {
        let poly = Element::PolyLine {
            points: vec![Point2::new(0, 1), Point2::new(2, 1), Point2::new(4, 1)],
            thickness: 1,
            closed: false,
            color: Color::new(255, 255, 255, 128),
        };
        let image = render::<3>(5, 3, &[poly]);
        assert!(image[5..10].iter().all(|p| *p == [128, 128, 128]));
    }

    #[rustfmt::skip]
    #[test]
    fn test_draw_point_and_circle() {
        let point = Element::Point {
            center: Point2::new(2, 2),
            radius: 1,
            color: Color::rgb(1, 1, 1),
        };
        let image = render::<3>(5, 5, &[point]);
        assert_eq!(
            first_channel(&image),
            &[
                0, 0, 0, 0, 0,
                0, 0, 1, 0, 0,
                0, 1, 1, 1, 0,
                0, 0, 1, 0, 0,
                0, 0, 0, 0, 0,
            ]
        );

        let ring = Element::Circle {
            center: Point2::new(2, 2),
            radius: 2,
            thickness: 1,
            color: Color::rgb(1, 1, 1),
        };
        let image = render::<3>(5, 5, &[ring]);
        let values = first_channel(&image);
        // centre untouched, axis extremes on the ring
        assert_eq!(values[2 * 5 + 2], 0);
        assert_eq!(values[2], 1);
        assert_eq!(values[2 * 5], 1);
        assert_eq!(values[4 * 5 + 2], 1);
    }

    #[test]
    fn test_draw_extreme_geometry_clipped() {
        let red = Color::rgb(255, 0, 0);

        let point = Element::Point {
            center: Point2::new(3, 2),
            radius: i32::MAX,
            color: red,
        };
        assert!(render::<3>(8, 4, &[point]).iter().all(|p| p[0] == 255));

        let rect = Element::Rect {
            bbox: BoundingBox::new(2, 0, i32::MAX, 4),
            thickness: -1,
            border_color: red,
            fill_color: None,
        };
        let image = render::<3>(8, 4, &[rect]);
        for row in image.chunks_exact(8) {
            assert_eq!(first_channel(row), &[0, 0, 255, 255, 255, 255, 255, 255]);
        }

        let outline = Element::Rect {
            bbox: BoundingBox::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX),
            thickness: i32::MAX,
            border_color: red,
            fill_color: None,
        };
        // last row and column of the box are -2
        assert!(render::<3>(8, 4, &[outline]).iter().all(|p| p[0] == 0));

        let ring = Element::Circle {
            center: Point2::new(3, 2),
            radius: i32::MAX,
            thickness: 1,
            color: red,
        };
        assert!(render::<3>(8, 4, &[ring]).iter().all(|p| p[0] == 0));

        let line = Element::Line {
            p0: Point2::new(i32::MIN, 1),
            p1: Point2::new(i32::MAX, 1),
            thickness: 3,
            color: red,
        };
        let image = render::<3>(8, 4, &[line]);
        let covered = image
            .chunks_exact(8)
            .map(|row| row.iter().all(|p| p[0] == 255))
            .collect::<Vec<_>>();
        assert_eq!(covered, vec![true, true, true, false]);
    }
}
