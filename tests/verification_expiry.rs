//! Optional expiry of VERIFIED status.

use admission_gate::infrastructure::mocks::MockClock;
use admission_gate::{
    AdmissionGate, AdmissionVerdict, ChallengeResponse, ClientIdentity, ConfigError,
    DecisionReason, GateConfig, VerificationStatus,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn gate(ttl: Option<Duration>) -> (AdmissionGate, MockClock) {
    let clock = MockClock::new(Instant::now());
    let mut config = GateConfig::default().with_rate_limit(2, Duration::from_secs(60));
    if let Some(ttl) = ttl {
        config = config.with_verified_ttl(ttl);
    }
    let gate = AdmissionGate::builder()
        .with_config(config)
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    (gate, clock)
}

fn verify(gate: &AdmissionGate, c: &ClientIdentity) {
    for _ in 0..3 {
        gate.admit(c);
    }
    gate.submit_response(c, &ChallengeResponse::checkbox(true));
    assert_eq!(gate.status(c), VerificationStatus::Verified);
}

#[test]
fn test_verification_lasts_forever_by_default() {
    let (gate, clock) = gate(None);
    let c: ClientIdentity = "192.0.2.8".parse().unwrap();
    verify(&gate, &c);

    clock.advance(Duration::from_secs(30 * 24 * 3600));
    assert_eq!(gate.evaluate(&c).reason, DecisionReason::Verified);
}

#[test]
fn test_expired_verification_is_counted_again() {
    let (gate, clock) = gate(Some(Duration::from_secs(3600)));
    let c: ClientIdentity = "192.0.2.8".parse().unwrap();
    verify(&gate, &c);

    clock.advance(Duration::from_secs(3599));
    assert_eq!(gate.evaluate(&c).reason, DecisionReason::Verified);

    clock.advance(Duration::from_secs(1));
    let decision = gate.evaluate(&c);
    assert_eq!(decision.verdict, AdmissionVerdict::Allow);
    assert_eq!(decision.reason, DecisionReason::WithinLimits);
    assert_eq!(gate.status(&c), VerificationStatus::Unverified);

    gate.admit(&c);
    assert_eq!(gate.admit(&c), AdmissionVerdict::Challenge);

    gate.submit_response(&c, &ChallengeResponse::answer("6"));
    assert_eq!(gate.admit(&c), AdmissionVerdict::Allow);
}

#[test]
fn test_prune_drops_expired_records() {
    let (gate, clock) = gate(Some(Duration::from_secs(60)));
    let a: ClientIdentity = "192.0.2.8".parse().unwrap();
    let b: ClientIdentity = "192.0.2.9".parse().unwrap();
    verify(&gate, &a);
    for _ in 0..3 {
        gate.admit(&b);
    }

    clock.advance(Duration::from_secs(61));
    assert_eq!(gate.prune().status_records, 1);
    assert_eq!(gate.status(&a), VerificationStatus::Unverified);
    assert_eq!(gate.status(&b), VerificationStatus::Challenged);
}

#[test]
fn test_zero_ttl_rejected() {
    let result = AdmissionGate::builder()
        .with_config(GateConfig::default().with_verified_ttl(Duration::ZERO))
        .build();
    assert!(matches!(result, Err(ConfigError::ZeroVerifiedTtl)));
}
