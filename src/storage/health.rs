//! Storage health reporting
//!
//! A check verifies the backend, then writes, reads back and deletes a small probe
//! artifact. A failed check marks the service unhealthy with the reason; it never stops
//! the process, so the failure stays visible through `/health`.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use super::naming::ArtifactId;
use super::router::StorageRouter;

const PROBE_PAYLOAD: &[u8] = b"pptx-mcp-server health probe";

/// Outcome of one storage check
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    /// Why the check failed
    pub reason: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Runs storage checks and caches the latest result
pub struct HealthReporter {
    router: StorageRouter,
    max_age: Duration,
    last: RwLock<Option<(Instant, HealthReport)>>,
    /// Held while a stale report is being refreshed
    refreshing: Mutex<()>,
}

impl HealthReporter {
    /// `max_age` bounds how long a cached report is served before re-probing
    pub fn new(router: StorageRouter, max_age: Duration) -> Self {
        Self {
            router,
            max_age,
            last: RwLock::new(None),
            refreshing: Mutex::new(()),
        }
    }

    /// Run a check now and remember the result
    pub async fn probe(&self) -> HealthReport {
        let report = match run_probe(&self.router).await {
            Ok(()) => {
                info!(backend = %self.router.kind(), "Storage health check passed");
                HealthReport {
                    healthy: true,
                    reason: None,
                    checked_at: Utc::now(),
                }
            }
            Err(reason) => {
                error!(
                    backend = %self.router.kind(),
                    location = %self.router.describe(),
                    reason = %reason,
                    "Storage health check failed"
                );
                HealthReport {
                    healthy: false,
                    reason: Some(reason),
                    checked_at: Utc::now(),
                }
            }
        };

        *self.last.write() = Some((Instant::now(), report.clone()));
        report
    }

    /// Latest report, re-probing when the cached one is older than `max_age`
    pub async fn current(&self) -> HealthReport {
        if let Some(report) = self.fresh_report() {
            return report;
        }

        // Only one caller probes; the rest wait and reuse its report
        let _guard = self.refreshing.lock().await;
        if let Some(report) = self.fresh_report() {
            return report;
        }
        self.probe().await
    }

    fn fresh_report(&self) -> Option<HealthReport> {
        let last = self.last.read();
        match last.as_ref() {
            Some((at, report)) if at.elapsed() < self.max_age => Some(report.clone()),
            _ => None,
        }
    }
}

async fn run_probe(router: &StorageRouter) -> Result<(), String> {
    router.verify().await.map_err(|e| e.to_string())?;

    let id = ArtifactId::parse(&format!("health-probe-{}", Uuid::new_v4().simple()))
        .map_err(|e| format!("could not name probe artifact: {}", e))?;
    let payload = Bytes::from_static(PROBE_PAYLOAD);

    router
        .save(&id, payload.clone())
        .await
        .map_err(|e| format!("write probe failed: {}", e))?;

    let read_back = router.load(&id).await;
    // Clean up even when the read failed
    let cleanup = router.delete(&id).await;

    match read_back {
        Ok(artifact) if artifact.bytes == payload => {}
        Ok(_) => return Err("read probe returned different bytes than were written".to_string()),
        Err(e) => return Err(format!("read probe failed: {}", e)),
    }
    cleanup.map_err(|e| format!("delete probe failed: {}", e))
}
