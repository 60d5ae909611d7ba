use std::hint::black_box;
use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};

use klog_config::KlogConfig;
use klog_engine::KernelLog;
use klog_perf::*;
use klog_record::{MAX_DATA, MAX_RECORD, Record};
use klog_ring::{MemorySink, NullSink};

const WRITER_THREADS: [usize; 4] = [1, 2, 4, 8];
const WRITES_PER_THREAD: usize = 200_000;

#[derive(serde::Serialize)]
struct ContentionRow {
    threads: usize,
    writes: u64,
    elapsed_ns: u64,
    writes_per_sec: f64,
}

#[derive(serde::Serialize)]
struct DumperRow {
    records: u64,
    drain_ns: u64,
    dropped_notices: usize,
}

fn main() {
    let mut results: Vec<BenchResult> = Vec::new();

    let bar = "\u{2550}".repeat(90);
    println!("\n{bar}");
    println!("  KLOG PERFORMANCE REPORT");
    println!("  single-thread latency + writer contention + dumper drain");
    println!("{bar}");

    section_latency(&mut results);
    let contention = section_contention();
    let dumper = section_dumper();
    section_criterion();

    save_results(&results, &contention, &dumper);
}

fn section_latency(results: &mut Vec<BenchResult>) {
    section_header("Single-thread latency");
    print_table_header();

    for len in [16usize, 64, MAX_DATA] {
        let log = make_log(1 << 17);
        let payload = make_payload(len);
        let r = measure_batched(&format!("write_{len}"), 2_000, 100, 10, || {
            let _ = black_box(log.write(0x30, 0, &payload));
        });
        print_result_row(&r);
        results.push(r);
    }

    let log = make_log(1 << 17);
    let mut reader = log.attach(None);
    let payload = make_payload(64);
    let mut rec = Record::default();
    let r = measure_batched("round_trip_64", 2_000, 100, 10, || {
        let _ = log.write(0x30, 0, &payload);
        let _ = black_box(reader.read(0, &mut rec));
    });
    print_result_row(&r);
    results.push(r);

    let mut image = [0u8; MAX_RECORD];
    let r = measure_batched("read_empty", 2_000, 100, 10, || {
        let _ = black_box(reader.read_raw(0, &mut image));
    });
    print_result_row(&r);
    results.push(r);
    reader.disconnect();
}

fn section_contention() -> Vec<ContentionRow> {
    section_header("Writer contention (64-byte records, 1 MiB ring)");
    println!(
        "  {:<10} {:>12} {:>12} {:>14}",
        "threads", "writes", "elapsed", "writes/s"
    );
    println!("  {}", "─".repeat(52));

    let mut rows = Vec::new();
    for threads in WRITER_THREADS {
        let log = make_log(1 << 20);
        let barrier = Arc::new(Barrier::new(threads + 1));
        let workers: Vec<_> = (0..threads)
            .map(|_| {
                let log = Arc::clone(&log);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let payload = make_payload(64);
                    barrier.wait();
                    for _ in 0..WRITES_PER_THREAD {
                        let _ = log.write(0x30, 0, &payload);
                    }
                })
            })
            .collect();

        barrier.wait();
        let start = Instant::now();
        for w in workers {
            let _ = w.join();
        }
        let elapsed = start.elapsed();

        let writes = (threads * WRITES_PER_THREAD) as u64;
        let row = ContentionRow {
            threads,
            writes,
            elapsed_ns: elapsed.as_nanos() as u64,
            writes_per_sec: writes as f64 / elapsed.as_secs_f64(),
        };
        println!(
            "  {:<10} {:>12} {:>12} {:>14}",
            row.threads,
            format_count(row.writes),
            format_ns(row.elapsed_ns as f64),
            format_count(row.writes_per_sec as u64),
        );
        rows.push(row);
    }
    rows
}

fn section_dumper() -> DumperRow {
    section_header("Dumper drain (100K records into a memory console)");

    let console = Arc::new(MemorySink::new());
    let config = KlogConfig {
        capacity: 1 << 20,
        serial: false,
        ..KlogConfig::default()
    };
    let Ok(klog) = KernelLog::new(&config, console.clone(), Arc::new(NullSink)) else {
        println!("  invalid config, skipped");
        return DumperRow {
            records: 0,
            drain_ns: 0,
            dropped_notices: 0,
        };
    };
    klog.start_threads();

    let payload = make_payload(64);
    let records = 100_000u64;
    let start = Instant::now();
    for _ in 0..records {
        let _ = klog.write(0x30, 0, &payload);
    }
    let _ = klog.shutdown(Instant::now() + Duration::from_secs(30));
    let drain = start.elapsed();

    let lines = console.lines();
    let dropped_notices = lines.iter().filter(|l| l.starts_with("klog: dropped")).count();
    println!("  records written:   {}", format_count(records));
    println!("  lines emitted:     {}", format_count(lines.len() as u64));
    println!("  drop notices:      {dropped_notices}");
    println!("  write + drain:     {}", format_ns(drain.as_nanos() as f64));

    DumperRow {
        records,
        drain_ns: drain.as_nanos() as u64,
        dropped_notices,
    }
}

fn criterion_target_dir() -> PathBuf {
    // CARGO_MANIFEST_DIR = perf/, criterion output is in <workspace>/target/criterion
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .map(|root| root.join("target"))
        .unwrap_or_else(|| PathBuf::from("target"))
        .join("criterion")
}

fn section_criterion() {
    section_header("Criterion estimates (run `cargo bench -p klog-perf` first)");
    let estimates = read_criterion_estimates(&criterion_target_dir());
    if estimates.is_empty() {
        println!("  no criterion results found");
        return;
    }
    println!(
        "  {:<44} {:>10} {:>10} {:>10}",
        "bench", "median", "mean", "stddev"
    );
    println!("  {}", "─".repeat(78));
    for est in estimates.values() {
        println!(
            "  {:<44} {:>10} {:>10} {:>10}",
            est.name,
            format_ns(est.median_ns),
            format_ns(est.mean_ns),
            format_ns(est.stddev_ns),
        );
    }
}

fn save_results(results: &[BenchResult], contention: &[ContentionRow], dumper: &DumperRow) {
    let report = serde_json::json!({
        "latency": results,
        "contention": contention,
        "dumper": dumper,
    });
    let path = criterion_target_dir().with_file_name("klog_perf.json");
    match serde_json::to_string_pretty(&report) {
        Ok(text) => match std::fs::write(&path, text) {
            Ok(()) => println!("\n  results written to {}", path.display()),
            Err(e) => eprintln!("\n  failed to write {}: {e}", path.display()),
        },
        Err(e) => eprintln!("\n  failed to serialize results: {e}"),
    }
}
