//! Shared state and response types for the HTTP API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{AuditCounts, AuditLog, AuditRecord};
use crate::models::ProcessingStatus;
use crate::pipeline::ClinicalPipeline;

const PER_MINUTE: u32 = 100;
const PER_HOUR: u32 = 1000;
const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<ClinicalPipeline>,
    pub audit: Arc<Mutex<AuditLog>>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    /// Key rate limits on `X-Forwarded-For` rather than the peer address.
    pub trust_forwarded_for: bool,
}

impl ApiContext {
    pub fn new(pipeline: ClinicalPipeline, audit: AuditLog) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            audit: Arc::new(Mutex::new(audit)),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new())),
            trust_forwarded_for: false,
        }
    }

    pub fn with_trusted_forwarding(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Arc::new(Mutex::new(limiter));
        self
    }
}

// ═══════════════════════════════════════════════════════════
// Rate limiter: per-client sliding window
// ═══════════════════════════════════════════════════════════

/// Per-client rate limiter with per-minute and per-hour limits.
///
/// Clients idle for an hour are dropped on a once-a-minute sweep, so the
/// map only holds clients seen within the last hour.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
    per_hour: u32,
    last_sweep: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(PER_MINUTE, PER_HOUR)
    }

    pub fn with_limits(per_minute: u32, per_hour: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
            per_hour,
            last_sweep: Instant::now(),
        }
    }

    /// Check if a client is within rate limits. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, client: &str) -> Result<(), u64> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&mut self, client: &str, now: Instant) -> Result<(), u64> {
        if now.saturating_duration_since(self.last_sweep) >= MINUTE {
            self.sweep(now);
        }

        let entries = self.windows.entry(client.to_string()).or_default();
        entries.retain(|ts| now.saturating_duration_since(*ts) < HOUR);

        let last_minute = entries
            .iter()
            .filter(|ts| now.saturating_duration_since(**ts) < MINUTE)
            .count() as u32;
        if last_minute >= self.per_minute {
            return Err(60);
        }

        if entries.len() as u32 >= self.per_hour {
            return Err(3600);
        }

        entries.push(now);
        Ok(())
    }

    /// Drop clients with no request inside the hour window.
    fn sweep(&mut self, now: Instant) {
        let before = self.windows.len();
        self.windows.retain(|_, entries| {
            entries
                .last()
                .is_some_and(|ts| now.saturating_duration_since(*ts) < HOUR)
        });
        self.last_sweep = now;
        let dropped = before - self.windows.len();
        if dropped > 0 {
            tracing::debug!(dropped, tracked = self.windows.len(), "Rate limiter swept idle clients");
        }
    }

    /// Clients currently holding a window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════
// Response shapes
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model_version: &'static str,
    pub llm_configured: bool,
    pub retrieval_configured: bool,
}

/// `GET /api/stats` body.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model_version: &'static str,
    pub llm_configured: bool,
    pub retrieval_configured: bool,
    pub requests_total: i64,
    pub requests_by_status: AuditCounts,
    pub recent_requests: Vec<StatusResponse>,
}

/// `GET /api/status/:request_id` body.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub request_id: String,
    pub status: ProcessingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processing_time_ms: Option<u64>,
    pub model_version: Option<String>,
    pub error: Option<String>,
    pub output_available: bool,
}

impl From<AuditRecord> for StatusResponse {
    fn from(record: AuditRecord) -> Self {
        Self {
            output_available: record.response_json.is_some(),
            request_id: record.request_id,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
            processing_time_ms: record.processing_time_ms,
            model_version: record.model_version,
            error: record.error_message,
        }
    }
}
