//! Tests for dead-letter replay

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use domain_charging::mock::{MockSettlementPort, SettlementBehavior};
use domain_charging::{CdrBatch, DeadLetterStore, InMemoryDeadLetterStore};
use interface_relay::{Relay, ReplayConfig, ReplaySummary};
use test_utils::{AppliedChargeBuilder, ChargingFixture, TimeFixtures};

async fn parked_batch(store: &InMemoryDeadLetterStore) -> CdrBatch {
    let fixture = ChargingFixture::new().await;
    let applied = AppliedChargeBuilder::new()
        .one_time(dec!(12.00), dec!(10.00))
        .build();
    fixture
        .manager()
        .generate(&applied, TimeFixtures::charge_time())
        .await
        .unwrap();

    let batch = fixture.dispatcher.batches().remove(0);
    store
        .park(batch.clone(), "Service unavailable: settlement".to_string(), 5)
        .await
        .unwrap();
    batch
}

fn single_pass() -> ReplayConfig {
    ReplayConfig {
        interval_secs: 0,
        batch_limit: 10,
        run_once: true,
    }
}

#[tokio::test]
async fn test_replay_delivers_original_records() {
    let store = Arc::new(InMemoryDeadLetterStore::new());
    let settlement = Arc::new(MockSettlementPort::new());
    let first = parked_batch(&store).await;
    let second = parked_batch(&store).await;

    let relay = Relay::new(settlement.clone(), store.clone(), single_pass());
    let summary = relay.replay_once().await.unwrap();

    assert_eq!(
        summary,
        ReplaySummary {
            attempted: 2,
            delivered: 2,
            failed: 0,
            interrupted: false,
        }
    );
    assert_eq!(store.pending_count().await, 0);

    let delivered = settlement.delivered().await;
    assert!(delivered.contains(&first));
    assert!(delivered.contains(&second));
}

#[tokio::test]
async fn test_transient_failure_interrupts_pass() {
    let store = Arc::new(InMemoryDeadLetterStore::new());
    let settlement = Arc::new(MockSettlementPort::always(SettlementBehavior::Unavailable));
    parked_batch(&store).await;
    parked_batch(&store).await;

    let relay = Relay::new(settlement.clone(), store.clone(), single_pass());
    let summary = relay.replay_once().await.unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.failed, 1);
    assert!(summary.interrupted);
    assert_eq!(settlement.attempts(), 1);
    assert_eq!(store.pending_count().await, 2);

    let pending = store.pending(10).await.unwrap();
    let retried = pending.iter().find(|letter| letter.attempts == 6).unwrap();
    assert!(retried.reason.contains("Service unavailable"));
}

#[tokio::test]
async fn test_rejection_does_not_stop_pass() {
    let store = Arc::new(InMemoryDeadLetterStore::new());
    let settlement = Arc::new(MockSettlementPort::with_script([SettlementBehavior::Reject]));
    parked_batch(&store).await;
    parked_batch(&store).await;

    let relay = Relay::new(settlement.clone(), store.clone(), single_pass());
    let summary = relay.replay_once().await.unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.failed, 1);
    assert!(!summary.interrupted);
    assert_eq!(store.pending_count().await, 1);
}

#[tokio::test]
async fn test_empty_store_is_a_no_op() {
    let settlement = Arc::new(MockSettlementPort::new());
    let relay = Relay::new(
        settlement.clone(),
        Arc::new(InMemoryDeadLetterStore::new()),
        single_pass(),
    );

    assert_eq!(relay.replay_once().await.unwrap(), ReplaySummary::default());
    assert_eq!(settlement.attempts(), 0);
}

#[tokio::test]
async fn test_batch_limit_bounds_a_pass() {
    let store = Arc::new(InMemoryDeadLetterStore::new());
    for _ in 0..3 {
        parked_batch(&store).await;
    }

    let config = ReplayConfig {
        batch_limit: 2,
        ..single_pass()
    };
    let relay = Relay::new(Arc::new(MockSettlementPort::new()), store.clone(), config);

    assert_eq!(relay.replay_once().await.unwrap().delivered, 2);
    assert_eq!(store.pending_count().await, 1);
}

#[tokio::test]
async fn test_run_once_returns_after_single_pass() {
    let store = Arc::new(InMemoryDeadLetterStore::new());
    parked_batch(&store).await;
    let relay = Relay::new(Arc::new(MockSettlementPort::new()), store.clone(), single_pass());

    tokio::time::timeout(Duration::from_secs(5), relay.run(std::future::pending()))
        .await
        .expect("single pass did not return")
        .unwrap();

    assert_eq!(store.pending_count().await, 0);
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let store = Arc::new(InMemoryDeadLetterStore::new());
    let config = ReplayConfig {
        interval_secs: 3600,
        batch_limit: 10,
        run_once: false,
    };
    let relay = Relay::new(Arc::new(MockSettlementPort::new()), store, config);

    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    stop.send(()).unwrap();

    tokio::time::timeout(
        Duration::from_secs(5),
        relay.run(async {
            let _ = stopped.await;
        }),
    )
    .await
    .expect("relay ignored shutdown")
    .unwrap();
}
