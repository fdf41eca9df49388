use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// Highest per-message latency tracked, in nanoseconds
const MAX_TRACKED_NS: u64 = 60_000_000_000;

/// Per-run counters and per-message latency distribution.
#[derive(Debug)]
pub struct RunStats {
    started: Instant,
    messages: u64,
    emitted: u64,
    latency_ns: Option<Histogram<u64>>
}

impl RunStats {
    pub fn start() -> Self {
        let latency_ns = match Histogram::new_with_bounds(1, MAX_TRACKED_NS, 3) {
            Ok(h) => Some(h),
            Err(e) => {
                warn!(error=%e, "Latency histogram disabled");
                None
            }
        };
        Self { started: Instant::now(), messages: 0, emitted: 0, latency_ns }
    }

    pub fn record(&mut self, took: Duration, emitted: bool) {
        self.messages += 1;
        if emitted {
            self.emitted += 1;
        }
        if let Some(h) = self.latency_ns.as_mut() {
            h.saturating_record(took.as_nanos().min(u64::MAX as u128) as u64);
        }
    }

    pub fn messages(&self) -> u64 {
        self.messages
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn quantile_ns(&self, q: f64) -> Option<u64> {
        self.latency_ns.as_ref().filter(|h| !h.is_empty()).map(|h| h.value_at_quantile(q))
    }

    pub fn log_summary(&self, books: usize) {
        let elapsed = self.started.elapsed();
        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            messages = self.messages,
            emitted = self.emitted,
            books = books,
            p50_ns = self.quantile_ns(0.5).unwrap_or(0),
            p99_ns = self.quantile_ns(0.99).unwrap_or(0),
            max_ns = self.latency_ns.as_ref().map(|h| h.max()).unwrap_or(0),
            "Execution finished"
        );
    }
}
