use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use klog_perf::make_payload;
use klog_record::{
    HEADER_SIZE, MAX_DATA, MAX_RECORD, Preamble, Record, RecordHeader, read_wrapped,
    render_record, write_wrapped,
};

fn header(len: usize) -> RecordHeader {
    RecordHeader {
        preamble: Preamble::for_payload(len).0,
        datalen: len as u16,
        severity: 0x30,
        flags: 0,
        timestamp: 12_345_678_901,
        pid: 4242,
        tid: 17,
        sequence: 99,
    }
}

fn bench_header(c: &mut Criterion) {
    let hdr = header(64);
    let bytes = hdr.encode();

    let mut group = c.benchmark_group("klog_codec");
    group.throughput(Throughput::Elements(1));

    group.bench_function("header_encode", |b| b.iter(|| black_box(&hdr).encode()));
    group.bench_function("header_decode", |b| {
        b.iter(|| RecordHeader::decode(black_box(&bytes)))
    });

    group.finish();
}

fn bench_wrapped_copies(c: &mut Criterion) {
    let payload = make_payload(MAX_DATA);
    let hdr = header(MAX_DATA).encode();
    let mut ring = vec![0u8; 4096];
    let mut out = [0u8; MAX_RECORD];

    let mut group = c.benchmark_group("klog_codec");
    group.throughput(Throughput::Bytes(MAX_RECORD as u64));

    // Contiguous, split inside the header, split inside the payload.
    for (label, offset) in [("contiguous", 0usize), ("in_header", 4096 - 20), ("in_payload", 4096 - 100)] {
        group.bench_function(format!("write_wrapped_{label}"), |b| {
            b.iter(|| write_wrapped(&mut ring, black_box(offset), &hdr, &payload));
        });
        group.bench_function(format!("read_wrapped_{label}"), |b| {
            b.iter(|| read_wrapped(&ring, black_box(offset), &mut out));
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let payload = make_payload(80);
    let hdr = header(80);
    let mut image = hdr.encode().to_vec();
    image.extend_from_slice(&payload);
    let mut rec = Record::default();

    let mut group = c.benchmark_group("klog_codec");
    group.throughput(Throughput::Elements(1));

    group.bench_function("record_fill_from", |b| {
        b.iter(|| rec.fill_from(black_box(&image[..HEADER_SIZE + 80])))
    });
    group.bench_function("render_record", |b| {
        b.iter(|| render_record(black_box(&hdr), black_box(&payload)))
    });

    group.finish();
}

criterion_group!(benches, bench_header, bench_wrapped_copies, bench_render);
criterion_main!(benches);
