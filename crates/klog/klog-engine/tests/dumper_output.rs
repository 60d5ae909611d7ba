//! End-to-end: producers → ring → notifier → dumper → sinks.

use klog_config::KlogConfig;
use klog_engine::KernelLog;
use klog_record::Severity;
use klog_ring::{LogError, MemorySink};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Rig {
    klog: KernelLog,
    console: Arc<MemorySink>,
    serial: Arc<MemorySink>,
}

fn rig(config: KlogConfig) -> Rig {
    let console = Arc::new(MemorySink::new());
    let serial = Arc::new(MemorySink::new());
    let klog = KernelLog::new(&config, console.clone(), serial.clone()).unwrap();
    Rig {
        klog,
        console,
        serial,
    }
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(5)
}

/// `[sssss.mmm] ppppp:ttttt> text`
fn assert_line_shape(line: &str, text: &str) {
    let (stamp, rest) = line.split_once("] ").unwrap();
    let (secs, millis) = stamp.strip_prefix('[').unwrap().split_once('.').unwrap();
    assert_eq!(secs.len(), 5);
    assert_eq!(millis.len(), 3);
    let (ids, body) = rest.split_once("> ").unwrap();
    let (pid, tid) = ids.split_once(':').unwrap();
    assert!(pid.len() >= 5 && tid.len() >= 5);
    assert_eq!(pid.parse::<u64>().unwrap(), u64::from(std::process::id()));
    assert_eq!(body, text);
}

#[test]
fn records_reach_console_and_serial_in_order() {
    let rig = rig(KlogConfig::default());
    rig.klog.start_threads();
    assert!(rig.klog.has_notifier());
    assert!(rig.klog.has_dumper());

    rig.klog.log(Severity::Info, "INFO: first\n");
    rig.klog.log(Severity::Warning, "WARN: second");
    rig.klog.log(Severity::Error, "ERROR: third\n");

    rig.klog.shutdown(deadline()).unwrap();
    assert!(!rig.klog.has_dumper());

    let lines = rig.console.lines();
    assert_eq!(lines.len(), 3, "{lines:?}");
    assert_line_shape(&lines[0], "INFO: first");
    assert_line_shape(&lines[1], "WARN: second");
    assert_line_shape(&lines[2], "ERROR: third");
    assert!(lines.iter().all(|l| !l.contains("dropped")));

    assert_eq!(rig.serial.lines(), lines);
}

#[test]
fn backlog_written_before_start_is_dumped() {
    let rig = rig(KlogConfig::default());
    for i in 0..10 {
        rig.klog.log(Severity::Info, &format!("early {i}"));
    }
    rig.klog.start_threads();
    rig.klog.shutdown(deadline()).unwrap();

    let lines = rig.console.lines();
    assert_eq!(lines.len(), 10);
    for (i, line) in lines.iter().enumerate() {
        assert!(line.ends_with(&format!("> early {i}")));
    }
}

#[test]
fn overwritten_records_produce_drop_notice() {
    let config = KlogConfig {
        capacity: 512,
        ..KlogConfig::default()
    };
    let rig = rig(config);

    // 50-byte payloads take 92 bytes each; five fit in 512.
    for i in 0..20 {
        let mut text = format!("msg {i:02} ");
        text.push_str(&"x".repeat(50 - text.len()));
        rig.klog.log(Severity::Info, &text);
    }
    rig.klog.start_threads();
    rig.klog.shutdown(deadline()).unwrap();

    let lines = rig.console.lines();
    assert_eq!(lines[0], "klog: dropped 15 messages");
    assert_eq!(lines.len(), 6);
    assert!(lines[1].contains("> msg 15 "));
    assert!(lines[5].contains("> msg 19 "));
}

#[test]
fn writes_after_shutdown_are_refused() {
    let rig = rig(KlogConfig::default());
    rig.klog.start_threads();
    rig.klog.shutdown(deadline()).unwrap();

    assert_eq!(
        rig.klog.write(Severity::Info.into(), 0, b"late"),
        Err(LogError::BadState)
    );

    // The helper falls back to serial.
    rig.klog.log(Severity::Info, "late but visible\n");
    assert_eq!(rig.serial.writes(), vec!["late but visible\n".to_string()]);
    assert!(rig.console.writes().is_empty());
}

#[test]
fn no_outputs_means_no_dumper() {
    let rig = rig(KlogConfig {
        console: false,
        serial: false,
        ..KlogConfig::default()
    });
    rig.klog.start_threads();
    assert!(rig.klog.has_notifier());
    assert!(!rig.klog.has_dumper());

    rig.klog.log(Severity::Info, "nobody listens");
    rig.klog.shutdown(deadline()).unwrap();
    assert!(rig.console.writes().is_empty());
    assert!(rig.serial.writes().is_empty());
}

#[test]
fn console_only_leaves_serial_quiet() {
    let rig = rig(KlogConfig {
        serial: false,
        ..KlogConfig::default()
    });
    rig.klog.start_threads();
    rig.klog.log(Severity::Info, "console only");
    rig.klog.shutdown(deadline()).unwrap();

    assert_eq!(rig.console.lines().len(), 1);
    assert!(rig.serial.writes().is_empty());
}

#[test]
fn serial_only_still_starts_dumper() {
    let rig = rig(KlogConfig {
        console: false,
        ..KlogConfig::default()
    });
    rig.klog.start_threads();
    assert!(rig.klog.has_dumper());
    rig.klog.log(Severity::Info, "serial only");
    rig.klog.shutdown(deadline()).unwrap();

    assert!(rig.console.writes().is_empty());
    assert_eq!(rig.serial.lines().len(), 1);
}

#[test]
fn second_start_is_ignored() {
    let rig = rig(KlogConfig::default());
    rig.klog.start_threads();
    rig.klog.start_threads();
    rig.klog.log(Severity::Info, "once");
    rig.klog.shutdown(deadline()).unwrap();
    assert_eq!(rig.console.lines().len(), 1);
}

#[test]
fn external_reader_is_notified_by_the_notifier() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let rig = rig(KlogConfig::default());
    rig.klog.start_threads();

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let mut reader = rig
        .klog
        .attach(Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

    rig.klog.log(Severity::Info, "ping");
    let give_up = Instant::now() + Duration::from_secs(5);
    while hits.load(Ordering::SeqCst) == 0 && Instant::now() < give_up {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(hits.load(Ordering::SeqCst) >= 1);

    reader.disconnect();
    rig.klog.shutdown(deadline()).unwrap();
}
