//! Revenue Sharing Adapter
//!
//! Delivers CDR batches to the revenue sharing (settlement) system over HTTP.
//! A batch goes out as one `POST {base_url}/rss/cdrs` whose body is the JSON
//! array of [`SettlementRecord`]s, identified to the settlement system by the
//! store's nickname, admin role and CDR source headers.
//!
//! # Error Handling
//!
//! Responses are mapped to `PortError` variants:
//! - 2xx -> success
//! - 401/403 -> `PortError::Unauthorized`
//! - 404 -> `PortError::NotFound`
//! - 429 -> `PortError::RateLimited` (honoring `Retry-After`)
//! - 5xx -> `PortError::ServiceUnavailable`
//! - other statuses -> `PortError::Rejected`
//! - timeouts -> `PortError::Timeout`, transport failures -> `PortError::Connection`
//!
//! Only transient failures count towards the circuit breaker; a settlement
//! system that answers with validation errors is up.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use core_kernel::{
    AdapterHealth, CircuitBreakerConfig, DomainPort, HealthCheckResult, HealthCheckable,
    PortError,
};

use crate::cdr::CdrBatch;
use crate::settlement::{encode_batch, SettlementPort, SettlementRecord};

const ADAPTER_ID: &str = "revenue-sharing-adapter";
const CDR_PATH: &str = "rss/cdrs";
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Configuration for the revenue sharing adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueSharingConfig {
    /// Base URL of the settlement system (e.g., "http://rss.example.com/DSRevenueSharing")
    pub base_url: String,

    /// Source tag put on every record and sent as `X-Email`
    pub cdr_source: String,

    /// Store nickname sent as `X-Nick-Name`
    pub store_name: String,

    /// Role sent as `X-Roles`
    pub admin_role: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Circuit breaker configuration; `None` disables the breaker
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl Default for RevenueSharingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/DSRevenueSharing".to_string(),
            cdr_source: "charging-backend@example.com".to_string(),
            store_name: "store".to_string(),
            admin_role: "provider".to_string(),
            timeout_secs: 10,
            circuit_breaker: Some(CircuitBreakerConfig::default()),
        }
    }
}

/// Circuit breaker state for fault tolerance
#[derive(Debug)]
struct CircuitBreaker {
    config: CircuitBreakerConfig,
    failure_count: AtomicU64,
    success_count: AtomicU64,
    is_open: AtomicBool,
    opened_at: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            failure_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            is_open: AtomicBool::new(false),
            opened_at: RwLock::new(None),
        }
    }

    async fn is_available(&self) -> bool {
        if !self.is_open.load(Ordering::Relaxed) {
            return true;
        }

        // Half-open once the reset timeout has elapsed
        match *self.opened_at.read().await {
            Some(time) => time.elapsed() >= Duration::from_secs(self.config.reset_timeout_secs),
            None => true,
        }
    }

    fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        if !self.is_open.load(Ordering::Relaxed) {
            return;
        }

        let success = self.success_count.fetch_add(1, Ordering::Relaxed) + 1;
        if success >= u64::from(self.config.success_threshold) {
            self.is_open.store(false, Ordering::Relaxed);
            self.success_count.store(0, Ordering::Relaxed);
        }
    }

    async fn record_failure(&self) {
        self.success_count.store(0, Ordering::Relaxed);
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= u64::from(self.config.failure_threshold) {
            self.is_open.store(true, Ordering::Relaxed);
            *self.opened_at.write().await = Some(Instant::now());
        }
    }
}

/// HTTP adapter implementing the `SettlementPort` trait
///
/// # Example
///
/// ```rust,ignore
/// use domain_charging::adapters::{RevenueSharingAdapter, RevenueSharingConfig};
///
/// let adapter = RevenueSharingAdapter::new(RevenueSharingConfig {
///     base_url: "http://rss.example.com/DSRevenueSharing".to_string(),
///     store_name: "marketplace".to_string(),
///     ..Default::default()
/// })?;
///
/// adapter.submit(&batch).await?;
/// ```
#[derive(Debug)]
pub struct RevenueSharingAdapter {
    config: RevenueSharingConfig,
    client: Client,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
}

impl RevenueSharingAdapter {
    /// Creates the adapter and its pooled HTTP client
    ///
    /// # Errors
    ///
    /// Returns `PortError::Internal` if the HTTP client cannot be built.
    pub fn new(config: RevenueSharingConfig) -> Result<Self, PortError> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| PortError::Internal {
                message: "Failed to build settlement HTTP client".to_string(),
                source: Some(Box::new(e)),
            })?;

        let circuit_breaker = config
            .circuit_breaker
            .clone()
            .map(|cb| Arc::new(CircuitBreaker::new(cb)));

        Ok(Self {
            config,
            client,
            circuit_breaker,
        })
    }

    /// URL batches are posted to
    pub fn cdr_endpoint(&self) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), CDR_PATH)
    }

    /// Checks if the circuit breaker is open (blocking requests)
    pub async fn is_circuit_open(&self) -> bool {
        match self.circuit_breaker {
            Some(ref cb) => !cb.is_available().await,
            None => false,
        }
    }

    async fn post_records(&self, records: &[SettlementRecord]) -> Result<(), PortError> {
        let response = self
            .client
            .post(self.cdr_endpoint())
            .header("X-Nick-Name", self.config.store_name.as_str())
            .header("X-Roles", self.config.admin_role.as_str())
            .header("X-Email", self.config.cdr_source.as_str())
            .json(records)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok());
        let body = response.text().await.unwrap_or_default();

        Err(map_status(status, retry_after_secs, &body))
    }

    fn transport_error(&self, error: reqwest::Error) -> PortError {
        if error.is_timeout() {
            PortError::Timeout {
                operation: "submit_batch".to_string(),
                duration_ms: self.config.timeout_secs.saturating_mul(1000),
            }
        } else if error.is_builder() {
            PortError::Serialization {
                message: error.to_string(),
            }
        } else {
            PortError::Connection {
                message: format!("Settlement system unreachable at {}", self.config.base_url),
                source: Some(Box::new(error)),
            }
        }
    }
}

/// Maps a non-success status to the matching `PortError`
fn map_status(status: StatusCode, retry_after_secs: Option<u64>, body: &str) -> PortError {
    let message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized {
            message: format!("{}: {}", status, message),
        },
        StatusCode::NOT_FOUND => PortError::not_found("Settlement endpoint", CDR_PATH),
        StatusCode::TOO_MANY_REQUESTS => PortError::RateLimited {
            retry_after_secs: retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        s if s.is_server_error() => PortError::ServiceUnavailable {
            service: format!("revenue sharing ({})", s),
        },
        s => PortError::rejected(message, Some(s.as_u16())),
    }
}

impl DomainPort for RevenueSharingAdapter {}

#[async_trait]
impl HealthCheckable for RevenueSharingAdapter {
    /// Probes the settlement system's base URL
    ///
    /// Any answer below 500 means the system is reachable.
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();

        if self.is_circuit_open().await {
            return HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Degraded,
                latency_ms: 0,
                message: Some("Circuit breaker is open".to_string()),
                checked_at: Utc::now(),
            };
        }

        let (status, message) = match self.client.get(&self.config.base_url).send().await {
            Ok(response) if !response.status().is_server_error() => (AdapterHealth::Healthy, None),
            Ok(response) => (
                AdapterHealth::Unhealthy,
                Some(format!("Settlement system answered {}", response.status())),
            ),
            Err(e) => (AdapterHealth::Unhealthy, Some(e.to_string())),
        };

        HealthCheckResult {
            adapter_id: ADAPTER_ID.to_string(),
            status,
            latency_ms: start.elapsed().as_millis() as u64,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl SettlementPort for RevenueSharingAdapter {
    #[instrument(skip(self, batch), fields(batch_id = %batch.id(), records = batch.len()))]
    async fn submit(&self, batch: &CdrBatch) -> Result<(), PortError> {
        if let Some(ref cb) = self.circuit_breaker {
            if !cb.is_available().await {
                return Err(PortError::ServiceUnavailable {
                    service: "Circuit breaker is open".to_string(),
                });
            }
        }

        let records = encode_batch(batch, &self.config.cdr_source);
        let result = self.post_records(&records).await;

        if let Some(ref cb) = self.circuit_breaker {
            match &result {
                Ok(()) => cb.record_success(),
                Err(e) if e.is_transient() => cb.record_failure().await,
                Err(_) => {}
            }
        }

        match &result {
            Ok(()) => debug!("Settlement accepted batch"),
            Err(e) => warn!(error = %e, "Settlement submission failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::OrganizationId;

    fn adapter(circuit_breaker: Option<CircuitBreakerConfig>) -> RevenueSharingAdapter {
        RevenueSharingAdapter::new(RevenueSharingConfig {
            base_url: "http://rss.invalid/DSRevenueSharing/".to_string(),
            circuit_breaker,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = RevenueSharingConfig::default();
        assert_eq!(config.timeout_secs, 10);
        assert!(config.circuit_breaker.is_some());
    }

    #[test]
    fn test_endpoint_joins_path_once() {
        assert_eq!(
            adapter(None).cdr_endpoint(),
            "http://rss.invalid/DSRevenueSharing/rss/cdrs"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, None, ""),
            PortError::Unauthorized { .. }
        ));
        assert!(map_status(StatusCode::NOT_FOUND, None, "").is_not_found());
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, Some(7), ""),
            PortError::RateLimited { retry_after_secs: 7 }
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, None, ""),
            PortError::RateLimited { retry_after_secs: DEFAULT_RETRY_AFTER_SECS }
        ));
        assert!(map_status(StatusCode::BAD_GATEWAY, None, "").is_transient());

        let rejected = map_status(StatusCode::UNPROCESSABLE_ENTITY, None, "bad currency");
        assert!(!rejected.is_transient());
        assert_eq!(rejected.to_string(), "Rejected with status 422: bad currency");
    }

    #[test]
    fn test_rejection_body_is_truncated() {
        let body = "x".repeat(2 * MAX_ERROR_BODY_CHARS);
        match map_status(StatusCode::BAD_REQUEST, None, &body) {
            PortError::Rejected { message, .. } => assert_eq!(message.len(), MAX_ERROR_BODY_CHARS),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_open_circuit_short_circuits_submit() {
        let adapter = adapter(Some(CircuitBreakerConfig {
            failure_threshold: 2,
            reset_timeout_secs: 3600,
            success_threshold: 1,
        }));
        let cb = adapter.circuit_breaker.clone().unwrap();
        cb.record_failure().await;
        assert!(!adapter.is_circuit_open().await);
        cb.record_failure().await;
        assert!(adapter.is_circuit_open().await);

        let batch = CdrBatch::new(OrganizationId::new(), Vec::new());
        let err = adapter.submit(&batch).await.unwrap_err();
        assert!(matches!(err, PortError::ServiceUnavailable { .. }));

        let health = adapter.health_check().await;
        assert_eq!(health.status, AdapterHealth::Degraded);
    }

    #[tokio::test]
    async fn test_circuit_half_opens_after_reset_timeout() {
        let adapter = adapter(Some(CircuitBreakerConfig {
            failure_threshold: 1,
            reset_timeout_secs: 0,
            success_threshold: 1,
        }));
        let cb = adapter.circuit_breaker.clone().unwrap();
        cb.record_failure().await;

        assert!(!adapter.is_circuit_open().await);
        cb.record_success();
        assert!(!cb.is_open.load(Ordering::Relaxed));
    }
}
