use cvstride_imgproc::{
    draw::draw_element_row, BoundingBox, Color, Element, Elements, Flip, Osd, Point2, Stream,
    StreamConfig,
};
use cvstride_tensor::{DataType, Device, DeviceAllocator, Size2D, StatusError, Tensor};
use rand::Rng;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rgba_batch(n: i64, size: Size2D) -> Result<Tensor, StatusError> {
    let pixel = DataType::U8.with_channels(4)?;
    Ok(Tensor::new_image_batch(n, size, pixel, DeviceAllocator::new(0))?)
}

// packed pixels of one sample
fn sample_pixels(tensor: &Tensor, n: usize) -> Vec<[u8; 4]> {
    let strides = tensor.strides();
    let (h, w) = (tensor.shape()[1] as usize, tensor.shape()[2] as usize);
    let bytes = tensor.as_bytes();
    let mut out = Vec::with_capacity(h * w);
    for y in 0..h {
        for x in 0..w {
            let o = n * strides[0] as usize + y * strides[1] as usize + x * strides[2] as usize;
            out.push([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]]);
        }
    }
    out
}

fn random_color(rng: &mut impl Rng) -> Color {
    Color::new(rng.random(), rng.random(), rng.random(), rng.random())
}

// mostly near the image, sometimes anywhere in the i32 range
fn random_coord(rng: &mut impl Rng, limit: i32) -> i32 {
    match rng.random_range(0..20) {
        0 => i32::MIN,
        1 => i32::MAX,
        2 => rng.random(),
        _ => rng.random_range(-4..limit + 4),
    }
}

fn random_extent(rng: &mut impl Rng, limit: i32) -> i32 {
    if rng.random_bool(0.1) {
        rng.random_range(1..=i32::MAX)
    } else {
        rng.random_range(1..limit)
    }
}

fn random_point(rng: &mut impl Rng, size: Size2D) -> Point2 {
    Point2::new(random_coord(rng, size.w), random_coord(rng, size.h))
}

fn random_element(rng: &mut impl Rng, size: Size2D) -> Element {
    match rng.random_range(0..5) {
        0 => Element::Rect {
            bbox: BoundingBox::new(
                random_coord(rng, size.w),
                random_coord(rng, size.h),
                random_extent(rng, size.w),
                random_extent(rng, size.h),
            ),
            thickness: if rng.random_bool(0.3) {
                -1
            } else {
                rng.random_range(1..4)
            },
            border_color: random_color(rng),
            fill_color: rng.random_bool(0.5).then(|| random_color(rng)),
        },
        1 => Element::Line {
            p0: random_point(rng, size),
            p1: random_point(rng, size),
            thickness: rng.random_range(1..5),
            color: random_color(rng),
        },
        2 => Element::PolyLine {
            points: (0..rng.random_range(2..6))
                .map(|_| random_point(rng, size))
                .collect(),
            thickness: rng.random_range(1..4),
            closed: rng.random_bool(0.5),
            color: random_color(rng),
        },
        3 => Element::Point {
            center: random_point(rng, size),
            radius: random_extent(rng, 6),
            color: random_color(rng),
        },
        _ => Element::Circle {
            center: random_point(rng, size),
            radius: random_extent(rng, 10),
            thickness: if rng.random_bool(0.3) {
                -1
            } else {
                rng.random_range(1..4)
            },
            color: random_color(rng),
        },
    }
}

#[test]
fn test_osd_matches_host_rendering() -> Result<(), StatusError> {
    init_logger();
    let mut rng = rand::rng();
    let stream = Stream::with_config(
        Device::gpu(0),
        StreamConfig {
            num_threads: Some(4),
            name: "osd-test".to_string(),
        },
    )?;

    let size = Size2D::new(37, 23);
    let num_samples = 3;
    let mut input = rgba_batch(num_samples, size)?;
    let background: Vec<u8> = (0..input.as_bytes().len()).map(|_| rng.random()).collect();
    input.as_bytes_mut().copy_from_slice(&background);
    let mut output = rgba_batch(num_samples, size)?;

    let samples = (0..num_samples)
        .map(|_| {
            (0..rng.random_range(0..12))
                .map(|_| random_element(&mut rng, size))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let elements = Elements::from_samples(samples);

    Osd::new().call(&stream, &input, &mut output, &elements)?;
    stream.synchronize()?;

    let width = size.w as usize;
    for n in 0..num_samples as usize {
        let mut expected = sample_pixels(&input, n);
        for (y, row) in expected.chunks_exact_mut(width).enumerate() {
            for element in elements.sample(n) {
                draw_element_row(row, y as i32, element);
            }
        }
        assert_eq!(sample_pixels(&output, n), expected, "sample {n}");
    }
    Ok(())
}

#[test]
fn test_stream_orders_dependent_operators() -> Result<(), StatusError> {
    init_logger();
    let stream = Stream::new(Device::gpu(0))?;
    let size = Size2D::new(6, 4);
    let input = rgba_batch(1, size)?;
    let mut drawn = rgba_batch(1, size)?;
    let mut flipped = rgba_batch(1, size)?;

    let elements = Elements::from_samples(vec![vec![Element::Point {
        center: Point2::new(0, 0),
        radius: 1,
        color: Color::rgb(255, 0, 0),
    }]]);

    // the flip reads what the osd wrote, ordering comes from the stream alone
    Osd::new().call(&stream, &input, &mut drawn, &elements)?;
    Flip::new().call(&stream, &drawn, &mut flipped, -1)?;
    assert!(stream.enqueued() == 2);
    stream.synchronize()?;

    let pixels = sample_pixels(&flipped, 0);
    let at = |x: usize, y: usize| pixels[y * size.w as usize + x];
    assert_eq!(at(5, 3), [255, 0, 0, 255]);
    assert_eq!(at(4, 3), [255, 0, 0, 255]);
    assert_eq!(at(5, 2), [255, 0, 0, 255]);
    assert_eq!(at(0, 0), [0, 0, 0, 0]);
    Ok(())
}
