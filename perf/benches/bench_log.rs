use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use klog_perf::{make_log, make_payload};
use klog_record::{MAX_DATA, MAX_RECORD, Record};

fn bench_write(c: &mut Criterion) {
    let log = make_log(1 << 17);
    let mut group = c.benchmark_group("klog");
    group.throughput(Throughput::Elements(1));

    for len in [16usize, 64, MAX_DATA] {
        let payload = make_payload(len);
        group.bench_function(format!("write_{len}"), |b| {
            b.iter(|| log.write(0x30, 0, black_box(&payload)));
        });
    }

    group.finish();
}

fn bench_read_data(c: &mut Criterion) {
    let log = make_log(1 << 20);
    let mut reader = log.attach(None);
    let payload = make_payload(64);
    let mut rec = Record::default();

    let mut group = c.benchmark_group("klog");
    group.throughput(Throughput::Elements(1));

    group.bench_function("read (data)", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = std::time::Duration::ZERO;
            // Refill in chunks that fit, so the reader is never lapped.
            let mut left = iters;
            while left > 0 {
                let chunk = left.min(8_000);
                for _ in 0..chunk {
                    let _ = log.write(0x30, 0, &payload);
                }
                let start = std::time::Instant::now();
                for _ in 0..chunk {
                    let _ = black_box(reader.read(0, &mut rec));
                }
                elapsed += start.elapsed();
                left -= chunk;
            }
            elapsed
        });
    });

    drop(group);
    reader.disconnect();
}

fn bench_read_empty(c: &mut Criterion) {
    let log = make_log(1 << 17);
    let mut reader = log.attach(None);
    let mut image = [0u8; MAX_RECORD];

    let mut group = c.benchmark_group("klog");
    group.throughput(Throughput::Elements(1));

    group.bench_function("read (empty)", |b| {
        b.iter(|| black_box(reader.read_raw(0, &mut image)));
    });

    drop(group);
    reader.disconnect();
}

fn bench_round_trip(c: &mut Criterion) {
    let log = make_log(1 << 17);
    let mut reader = log.attach(None);
    let payload = make_payload(64);
    let mut rec = Record::default();

    let mut group = c.benchmark_group("klog");
    group.throughput(Throughput::Elements(1));

    group.bench_function("round_trip", |b| {
        b.iter(|| {
            let _ = log.write(0x30, 0, black_box(&payload));
            let _ = black_box(reader.read(0, &mut rec));
        });
    });

    drop(group);
    reader.disconnect();
}

fn bench_capacities(c: &mut Criterion) {
    let mut group = c.benchmark_group("klog_capacity");
    group.throughput(Throughput::Elements(1));
    let payload = make_payload(64);

    for cap in [1024usize, 4096, 16384, 131072] {
        let log = make_log(cap);
        let mut reader = log.attach(None);
        let mut rec = Record::default();

        group.bench_function(format!("round_trip_cap_{cap}"), |b| {
            b.iter(|| {
                let _ = log.write(0x30, 0, black_box(&payload));
                let _ = black_box(reader.read(0, &mut rec));
            });
        });

        // Writer only: every write past the first few evicts a record.
        group.bench_function(format!("overwrite_cap_{cap}"), |b| {
            b.iter(|| log.write(0x30, 0, black_box(&payload)));
        });

        reader.disconnect();
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_write,
    bench_read_data,
    bench_read_empty,
    bench_round_trip,
    bench_capacities,
);
criterion_main!(benches);
