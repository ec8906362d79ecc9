//! Test doubles for the charging ports
//!
//! Compiled for this crate's tests and for any crate enabling the `mock`
//! feature.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use core_kernel::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, OrganizationId, PortError,
};

use crate::cdr::CdrBatch;
use crate::dispatch::CdrDispatcher;
use crate::error::AllocationError;
use crate::sequence::{InMemorySequenceAllocator, SequenceAllocator};
use crate::settlement::SettlementPort;

/// How the mock settlement system answers one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementBehavior {
    Accept,
    /// 503 equivalent, retried by the dispatcher
    Unavailable,
    /// 429 equivalent asking to wait the given seconds
    RateLimited(u64),
    /// Validation failure, never retried
    Reject,
    /// Never answers; relies on the caller's timeout
    Hang,
}

/// Scripted in-memory settlement system
///
/// Answers follow the script in order, then fall back to the default
/// behavior (`Accept` unless changed).
#[derive(Debug)]
pub struct MockSettlementPort {
    script: RwLock<VecDeque<SettlementBehavior>>,
    fallback: RwLock<SettlementBehavior>,
    delivered: RwLock<Vec<CdrBatch>>,
    attempts: AtomicUsize,
}

impl Default for MockSettlementPort {
    fn default() -> Self {
        Self {
            script: RwLock::new(VecDeque::new()),
            fallback: RwLock::new(SettlementBehavior::Accept),
            delivered: RwLock::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }
}

impl MockSettlementPort {
    /// Accepts every batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers with `script` first, then accepts
    pub fn with_script(script: impl IntoIterator<Item = SettlementBehavior>) -> Self {
        Self {
            script: RwLock::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Answers every submission the same way
    pub fn always(behavior: SettlementBehavior) -> Self {
        Self {
            fallback: RwLock::new(behavior),
            ..Self::default()
        }
    }

    pub async fn set_fallback(&self, behavior: SettlementBehavior) {
        *self.fallback.write().await = behavior;
    }

    /// Batches accepted so far, in acceptance order
    pub async fn delivered(&self) -> Vec<CdrBatch> {
        self.delivered.read().await.clone()
    }

    /// Submissions received so far, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl DomainPort for MockSettlementPort {}

#[async_trait]
impl HealthCheckable for MockSettlementPort {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "mock-settlement-port".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: Some("Mock adapter always healthy".to_string()),
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl SettlementPort for MockSettlementPort {
    async fn submit(&self, batch: &CdrBatch) -> Result<(), PortError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let scripted = self.script.write().await.pop_front();
        let behavior = match scripted {
            Some(behavior) => behavior,
            None => *self.fallback.read().await,
        };

        match behavior {
            SettlementBehavior::Accept => {
                self.delivered.write().await.push(batch.clone());
                Ok(())
            }
            SettlementBehavior::Unavailable => Err(PortError::ServiceUnavailable {
                service: "mock settlement".to_string(),
            }),
            SettlementBehavior::RateLimited(retry_after_secs) => {
                Err(PortError::RateLimited { retry_after_secs })
            }
            SettlementBehavior::Reject => {
                Err(PortError::rejected("mock settlement rejected the batch", Some(422)))
            }
            SettlementBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

/// Dispatcher that keeps every batch instead of delivering it
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    batches: Mutex<Vec<CdrBatch>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<CdrBatch> {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl CdrDispatcher for RecordingDispatcher {
    async fn dispatch(&self, batch: CdrBatch) {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(batch);
    }
}

/// Allocator that fails on one chosen call and delegates every other call
#[derive(Debug)]
pub struct FailingAllocator {
    inner: Arc<InMemorySequenceAllocator>,
    fail_on_call: usize,
    calls: AtomicUsize,
}

impl FailingAllocator {
    /// Fails the `fail_on_call`-th call (1-based) with `StoreUnavailable`
    pub fn new(inner: Arc<InMemorySequenceAllocator>, fail_on_call: usize) -> Self {
        Self {
            inner,
            fail_on_call,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DomainPort for FailingAllocator {}

#[async_trait]
impl SequenceAllocator for FailingAllocator {
    async fn next(&self, entity: OrganizationId) -> Result<u64, AllocationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on_call {
            return Err(AllocationError::unavailable(format!(
                "injected failure on call {}",
                call
            )));
        }
        self.inner.next(entity).await
    }
}
