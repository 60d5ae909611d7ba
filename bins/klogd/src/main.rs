use anyhow::{Context, Result, anyhow};
use klog_config::KlogConfig;
use klog_engine::{init_global, klog};
use klog_record::Severity;
use klog_ring::{StderrSink, StdoutSink};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const PRODUCERS: usize = 4;
const MESSAGES_PER_PRODUCER: usize = 25;

const SEVERITIES: [Severity; 4] = [
    Severity::Debug,
    Severity::Info,
    Severity::Warning,
    Severity::Error,
];

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => KlogConfig::load(path.clone())
            .with_context(|| format!("loading config from {path}"))?,
        None => KlogConfig::default(),
    };
    init_tracing(&config.log_level);
    info!(?config, "starting klogd");

    // Console and serial are both terminals here; keep them apart.
    let klog = init_global(&config, Arc::new(StdoutSink), Arc::new(StderrSink))?;
    klog.start_threads();

    let producers = (0..PRODUCERS)
        .map(|p| {
            thread::Builder::new()
                .name(format!("producer-{p}"))
                .spawn(move || {
                    for i in 0..MESSAGES_PER_PRODUCER {
                        let severity = SEVERITIES[(p + i) % SEVERITIES.len()];
                        klog!(klog, severity, "producer {p} message {i} ({})", severity.as_str());
                    }
                })
        })
        .collect::<std::io::Result<Vec<_>>>()?;

    for producer in producers {
        producer
            .join()
            .map_err(|_| anyhow!("producer thread panicked"))?;
    }

    let stats = klog.ring().stats();
    info!(
        records = stats.next_sequence,
        live_bytes = stats.live_bytes(),
        capacity = stats.capacity,
        "producers finished"
    );

    klog.shutdown(Instant::now() + config.shutdown_timeout())
        .context("debuglog shutdown")?;
    info!("klogd done");
    Ok(())
}
