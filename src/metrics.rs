//! Prometheus-compatible metrics endpoint
//!
//! Exposes observatory counters in Prometheus format.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::sky::registry::ReconcileChange;

/// Rolling window for reconcile time percentiles
const RECONCILE_HISTORY: usize = 500;

/// Metrics registry for the observatory
#[derive(Debug)]
pub struct Metrics {
    // Activity
    pub scans_total: AtomicU64,
    pub analyses_total: AtomicU64,
    pub bodies: AtomicU64,
    pub constellations: AtomicU64,

    // Reconciliation outcomes
    pub constellations_created: AtomicU64,
    pub constellations_extended: AtomicU64,
    pub constellations_merged: AtomicU64,

    // Oracle health
    pub oracle_failures: AtomicU64,
    pub fallback_names: AtomicU64,
    pub placeholder_bodies: AtomicU64,

    // Reconcile timing (microseconds)
    pub reconcile_time_us: AtomicU64,
    pub reconcile_time_p95_us: AtomicU64,
    pub reconcile_time_max_us: AtomicU64,
    pub reconcile_count: AtomicU64,

    // Resources
    pub starlight: AtomicU64,
    pub data: AtomicU64,

    // Persistence
    pub saves_total: AtomicU64,
    pub save_failures: AtomicU64,

    start_time: Instant,

    reconcile_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            scans_total: AtomicU64::new(0),
            analyses_total: AtomicU64::new(0),
            bodies: AtomicU64::new(0),
            constellations: AtomicU64::new(0),
            constellations_created: AtomicU64::new(0),
            constellations_extended: AtomicU64::new(0),
            constellations_merged: AtomicU64::new(0),
            oracle_failures: AtomicU64::new(0),
            fallback_names: AtomicU64::new(0),
            placeholder_bodies: AtomicU64::new(0),
            reconcile_time_us: AtomicU64::new(0),
            reconcile_time_p95_us: AtomicU64::new(0),
            reconcile_time_max_us: AtomicU64::new(0),
            reconcile_count: AtomicU64::new(0),
            starlight: AtomicU64::new(0),
            data: AtomicU64::new(0),
            saves_total: AtomicU64::new(0),
            save_failures: AtomicU64::new(0),
            start_time: Instant::now(),
            reconcile_history: RwLock::new(VecDeque::with_capacity(RECONCILE_HISTORY)),
        }
    }

    /// Record one reconcile pass duration and update percentiles
    pub fn record_reconcile_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.reconcile_time_us.store(us, Ordering::Relaxed);
        self.reconcile_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.reconcile_history.write();
        history.push_back(us);
        while history.len() > RECONCILE_HISTORY {
            history.pop_front();
        }

        let mut sorted: Vec<u64> = history.iter().copied().collect();
        sorted.sort_unstable();

        let p95_idx = (sorted.len() as f32 * 0.95) as usize;
        self.reconcile_time_p95_us
            .store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
        self.reconcile_time_max_us
            .store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
    }

    /// Count the structural changes of one pass
    pub fn record_changes(&self, changes: &[ReconcileChange]) {
        for change in changes {
            let counter = match change {
                ReconcileChange::Created { .. } => &self.constellations_created,
                ReconcileChange::Extended { .. } => &self.constellations_extended,
                ReconcileChange::Merged { .. } => &self.constellations_merged,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Mirror current state sizes and balances
    pub fn set_totals(&self, bodies: usize, constellations: usize, starlight: u64, data: u64) {
        self.bodies.store(bodies as u64, Ordering::Relaxed);
        self.constellations.store(constellations as u64, Ordering::Relaxed);
        self.starlight.store(starlight, Ordering::Relaxed);
        self.data.store(data, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("stargazer_scans_total", "Total scans performed", "counter",
            self.scans_total.load(Ordering::Relaxed));
        metric!("stargazer_analyses_total", "Total body analyses", "counter",
            self.analyses_total.load(Ordering::Relaxed));
        metric!("stargazer_bodies", "Discovered bodies", "gauge",
            self.bodies.load(Ordering::Relaxed));
        metric!("stargazer_constellations", "Recorded constellations", "gauge",
            self.constellations.load(Ordering::Relaxed));

        metric!("stargazer_constellations_created_total", "Constellations founded", "counter",
            self.constellations_created.load(Ordering::Relaxed));
        metric!("stargazer_constellations_extended_total", "Constellation extensions", "counter",
            self.constellations_extended.load(Ordering::Relaxed));
        metric!("stargazer_constellations_merged_total", "Constellation merges", "counter",
            self.constellations_merged.load(Ordering::Relaxed));

        metric!("stargazer_oracle_failures_total", "Failed or timed out oracle calls", "counter",
            self.oracle_failures.load(Ordering::Relaxed));
        metric!("stargazer_fallback_names_total", "Constellations named by the fallback", "counter",
            self.fallback_names.load(Ordering::Relaxed));
        metric!("stargazer_placeholder_bodies_total", "Bodies created from placeholders", "counter",
            self.placeholder_bodies.load(Ordering::Relaxed));

        metric!("stargazer_reconcile_time_microseconds", "Last reconcile pass time", "gauge",
            self.reconcile_time_us.load(Ordering::Relaxed));
        metric!("stargazer_reconcile_time_p95_microseconds", "95th percentile reconcile time", "gauge",
            self.reconcile_time_p95_us.load(Ordering::Relaxed));
        metric!("stargazer_reconcile_time_max_microseconds", "Maximum reconcile time", "gauge",
            self.reconcile_time_max_us.load(Ordering::Relaxed));
        metric!("stargazer_reconcile_count", "Reconcile passes run", "counter",
            self.reconcile_count.load(Ordering::Relaxed));

        metric!("stargazer_starlight", "Starlight balance", "gauge",
            self.starlight.load(Ordering::Relaxed));
        metric!("stargazer_data", "Data balance", "gauge",
            self.data.load(Ordering::Relaxed));

        metric!("stargazer_saves_total", "Snapshots written", "counter",
            self.saves_total.load(Ordering::Relaxed));
        metric!("stargazer_save_failures_total", "Snapshot writes that failed", "counter",
            self.save_failures.load(Ordering::Relaxed));
        metric!("stargazer_uptime_seconds", "Process uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// Generate JSON format metrics
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "activity": {
                "scans": self.scans_total.load(Ordering::Relaxed),
                "analyses": self.analyses_total.load(Ordering::Relaxed),
                "bodies": self.bodies.load(Ordering::Relaxed),
                "constellations": self.constellations.load(Ordering::Relaxed),
            },
            "reconcile": {
                "created": self.constellations_created.load(Ordering::Relaxed),
                "extended": self.constellations_extended.load(Ordering::Relaxed),
                "merged": self.constellations_merged.load(Ordering::Relaxed),
                "time_us": self.reconcile_time_us.load(Ordering::Relaxed),
                "time_p95_us": self.reconcile_time_p95_us.load(Ordering::Relaxed),
                "time_max_us": self.reconcile_time_max_us.load(Ordering::Relaxed),
                "count": self.reconcile_count.load(Ordering::Relaxed),
            },
            "oracle": {
                "failures": self.oracle_failures.load(Ordering::Relaxed),
                "fallback_names": self.fallback_names.load(Ordering::Relaxed),
                "placeholder_bodies": self.placeholder_bodies.load(Ordering::Relaxed),
            },
            "resources": {
                "starlight": self.starlight.load(Ordering::Relaxed),
                "data": self.data.load(Ordering::Relaxed),
            },
            "persistence": {
                "saves": self.saves_total.load(Ordering::Relaxed),
                "failures": self.save_failures.load(Ordering::Relaxed),
            },
            "uptime_seconds": self.uptime_seconds(),
        })
        .to_string()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn http_response(content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        content_type,
        body.len(),
        body
    )
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);

                    // Longest prefix first: /metrics/json before /metrics
                    let response = if request.starts_with("GET /metrics/json") || request.starts_with("GET /json") {
                        http_response("application/json", &metrics.to_json())
                    } else if request.starts_with("GET /metrics") {
                        http_response("text/plain; version=0.0.4", &metrics.to_prometheus())
                    } else if request.starts_with("GET /health") || request.starts_with("GET / ") {
                        http_response("text/plain", "OK")
                    } else {
                        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
                    };

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}
