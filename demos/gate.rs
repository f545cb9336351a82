//! Walks one client through the admission pipeline.
//!
//! A client sends a burst, gets challenged, answers wrong, answers right,
//! and is let through from then on. Logs go to stdout through
//! `tracing-subscriber`, audit records to `user-data.json` in the
//! temp directory.

use admission_gate::{
    AdmissionGate, ChallengeResponse, ClientIdentity, GateConfig, JsonLinesAuditSink,
    TracingEnforcer,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let audit_path = std::env::temp_dir().join("user-data.json");
    let gate = AdmissionGate::builder()
        .with_config(
            GateConfig::default()
                .with_rate_limit(3, Duration::from_secs(60))
                .with_flood(8, Duration::from_secs(600))
                .with_block_threshold(12),
        )
        .with_audit_sink(Arc::new(JsonLinesAuditSink::open(&audit_path)?))
        .with_enforcer(Arc::new(TracingEnforcer))
        .build()?;

    println!("=== Admission Gate Demo ===\n");
    println!("Rate limit: 3/min, flood: 8/10min, block above 12\n");

    let client: ClientIdentity = "203.0.113.7".parse()?;

    println!("Burst of 5 requests:");
    for i in 1..=5 {
        let decision = gate.evaluate(&client);
        println!("  #{} -> {} ({:?})", i, decision.verdict, decision.reason);
    }

    let policy = gate.challenge_policy();
    println!("\nChallenge: {}", policy.prompt);

    let outcome = gate.submit_response(&client, &ChallengeResponse::answer("7"));
    println!("  answer 7 -> {:?}, status {}", outcome, gate.status(&client));

    let outcome = gate.submit_response(&client, &ChallengeResponse::answer("6"));
    println!("  answer 6 -> {:?}, status {}", outcome, gate.status(&client));

    println!("\nVerified client, 5 more requests:");
    for i in 1..=5 {
        println!("  #{} -> {}", i, gate.admit(&client));
    }

    println!("\nA second client floods:");
    let flooder: ClientIdentity = "198.51.100.99".parse()?;
    for i in 1..=14 {
        let decision = gate.evaluate(&flooder);
        println!("  #{} -> {} ({:?})", i, decision.verdict, decision.reason);
    }

    println!("\nGarbage source address -> {}", gate.admit_addr("not-an-ip"));

    let snapshot = gate.metrics().snapshot();
    println!("\n=== Metrics ===");
    println!("Allowed: {}", snapshot.allowed);
    println!("Challenged: {}", snapshot.challenged);
    println!("Blocked: {}", snapshot.blocked);
    println!("Verified: {}", snapshot.verified);
    println!("Challenge rate: {:.1}%", snapshot.challenge_rate() * 100.0);
    println!("\nAudit log: {}", audit_path.display());

    Ok(())
}
