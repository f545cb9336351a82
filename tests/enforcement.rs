//! BLOCK verdicts and block suggestions.

use admission_gate::infrastructure::mocks::{MockCaptureLayer, MockClock, RecordingEnforcer};
use admission_gate::{
    AdmissionGate, AdmissionVerdict, ChallengeResponse, ClientIdentity, CounterStore,
    DecisionReason, GateConfig, MemoryCounterStore, VerificationStatus,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

fn blocking_gate(enforcer: Arc<RecordingEnforcer>) -> AdmissionGate {
    AdmissionGate::builder()
        .with_config(
            GateConfig::default()
                .with_rate_limit(100, Duration::from_secs(60))
                .with_flood(5, Duration::from_secs(600))
                .with_block_threshold(8),
        )
        .with_clock(Arc::new(MockClock::new(Instant::now())))
        .with_enforcer(enforcer)
        .build()
        .unwrap()
}

#[test]
fn test_block_above_threshold_and_suggest_once() {
    let enforcer = Arc::new(RecordingEnforcer::new());
    let gate = blocking_gate(enforcer.clone());
    let c: ClientIdentity = "198.51.100.66".parse().unwrap();

    let reasons: Vec<_> = (0..12).map(|_| gate.evaluate(&c).reason).collect();

    assert!(reasons[..5].iter().all(|r| *r == DecisionReason::WithinLimits));
    assert!(reasons[5..8].iter().all(|r| *r == DecisionReason::Flood));
    assert!(reasons[8..].iter().all(|r| *r == DecisionReason::Blocked));

    assert_eq!(enforcer.blocked(), vec![c]);
    assert_eq!(gate.metrics().blocked(), 4);
    assert_eq!(gate.status(&c), VerificationStatus::Challenged);
}

#[test]
fn test_enforcer_failure_does_not_change_verdict() {
    let enforcer = Arc::new(RecordingEnforcer::new());
    enforcer.set_failing(true);
    let gate = blocking_gate(enforcer.clone());
    let c: ClientIdentity = "198.51.100.66".parse().unwrap();
    let capture = MockCaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());

    let verdicts: Vec<_> = tracing::subscriber::with_default(subscriber, || {
        (0..10).map(|_| gate.admit(&c)).collect()
    });

    assert_eq!(verdicts[8], AdmissionVerdict::Block);
    assert_eq!(verdicts[9], AdmissionVerdict::Block);
    assert_eq!(enforcer.blocked().len(), 1);

    // Threshold crossing plus the failed delivery
    assert_eq!(capture.count_at(Level::WARN), 2);
    assert_eq!(capture.count_message("block suggestion not delivered"), 1);
}

#[test]
fn test_no_block_without_threshold() {
    let enforcer = Arc::new(RecordingEnforcer::new());
    let gate = AdmissionGate::builder()
        .with_config(
            GateConfig::default()
                .with_rate_limit(100, Duration::from_secs(60))
                .with_flood(5, Duration::from_secs(600)),
        )
        .with_enforcer(enforcer.clone())
        .build()
        .unwrap();
    let c: ClientIdentity = "198.51.100.66".parse().unwrap();

    for _ in 0..50 {
        assert_ne!(gate.admit(&c), AdmissionVerdict::Block);
    }
    assert!(enforcer.blocked().is_empty());
}

#[test]
fn test_verified_client_is_not_blocked() {
    let enforcer = Arc::new(RecordingEnforcer::new());
    let gate = blocking_gate(enforcer.clone());
    let c: ClientIdentity = "198.51.100.66".parse().unwrap();

    for _ in 0..6 {
        gate.admit(&c);
    }
    gate.submit_form(&c, None, Some("6"));

    for _ in 0..20 {
        assert_eq!(gate.admit(&c), AdmissionVerdict::Allow);
    }
    assert!(enforcer.blocked().is_empty());
}

#[test]
fn test_block_suggested_when_crossing_count_was_never_seen() {
    let clock = MockClock::new(Instant::now());
    let store = Arc::new(MemoryCounterStore::new(Arc::new(clock.clone())));
    let enforcer = Arc::new(RecordingEnforcer::new());
    let gate = AdmissionGate::builder()
        .with_config(
            GateConfig::default()
                .with_rate_limit(100, Duration::from_secs(60))
                .with_flood(5, Duration::from_secs(600))
                .with_block_threshold(8),
        )
        .with_clock(Arc::new(clock))
        .with_counter_store(store.clone())
        .with_enforcer(enforcer.clone())
        .build()
        .unwrap();
    let c: ClientIdentity = "198.51.100.66".parse().unwrap();

    // Another process sharing the store took the count through 9
    for _ in 0..9 {
        store
            .increment("flood:198.51.100.66", Duration::from_secs(600))
            .unwrap();
    }

    for _ in 0..5 {
        assert_eq!(gate.admit(&c), AdmissionVerdict::Block);
    }
    assert_eq!(enforcer.blocked(), vec![c]);
    assert_eq!(gate.status(&c), VerificationStatus::Challenged);
}

#[test]
fn test_block_suggested_again_after_client_verified() {
    let clock = MockClock::new(Instant::now());
    let enforcer = Arc::new(RecordingEnforcer::new());
    let gate = AdmissionGate::builder()
        .with_config(
            GateConfig::default()
                .with_rate_limit(100, Duration::from_secs(60))
                .with_flood(5, Duration::from_secs(600))
                .with_block_threshold(8)
                .with_verified_ttl(Duration::from_secs(60)),
        )
        .with_clock(Arc::new(clock.clone()))
        .with_enforcer(enforcer.clone())
        .build()
        .unwrap();
    let c: ClientIdentity = "198.51.100.66".parse().unwrap();

    for _ in 0..10 {
        gate.admit(&c);
    }
    assert_eq!(enforcer.blocked().len(), 1);

    gate.submit_response(&c, &ChallengeResponse::answer("6"));
    clock.advance(Duration::from_secs(61));

    // Verification lapsed while the flood window is still open
    assert_eq!(gate.admit(&c), AdmissionVerdict::Block);
    assert_eq!(gate.admit(&c), AdmissionVerdict::Block);
    assert_eq!(enforcer.blocked().len(), 2);
}
