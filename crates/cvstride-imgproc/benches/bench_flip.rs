use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use cvstride_imgproc::{Flip, Stream};
use cvstride_tensor::{DataKind, DataType, Device, DeviceAllocator, Size2D, Tensor};

fn bench_flip(c: &mut Criterion) {
    let mut group = c.benchmark_group("Flip");
    let stream = Stream::new(Device::gpu(0)).unwrap();

    for (width, height) in [(256, 224), (512, 448), (1024, 896)] {
        let size = Size2D::new(width, height);
        group.throughput(criterion::Throughput::Elements((width * height) as u64));

        for kind in [DataKind::U8, DataKind::F32] {
            let pixel = DataType::new(kind, 3).unwrap();
            let input = Tensor::new_image_batch(1, size, pixel, DeviceAllocator::new(0)).unwrap();
            let mut output =
                Tensor::new_image_batch(1, size, pixel, DeviceAllocator::new(0)).unwrap();

            for (name, code) in [("vertical", 0), ("horizontal", 1), ("both", -1)] {
                let id = BenchmarkId::new(format!("{name}_{kind:?}"), size);
                group.bench_function(id, |b| {
                    b.iter(|| {
                        Flip::new()
                            .call(&stream, &input, &mut output, code)
                            .unwrap();
                        stream.synchronize().unwrap();
                    })
                });
            }
        }
    }

    group.finish();
}

criterion_group!(benches, bench_flip);
criterion_main!(benches);
