//! Admission gate: the per-request orchestrator.
//!
//! For each inbound request the gate:
//! 1. lets VERIFIED clients straight through,
//! 2. runs the flood detector (and, if configured, the block threshold),
//! 3. runs the rate limiter,
//! 4. challenges clients still waiting on a correct answer.
//!
//! Abuse signals escalate the client to CHALLENGED. A counter store failure
//! fails open: the request is judged as if no counter had fired.

use crate::application::circuit_breaker::{CircuitBreaker, GuardedStore};
use crate::application::config::{ConfigError, GateConfig};
use crate::application::flood::FloodDetector;
use crate::application::metrics::Metrics;
use crate::application::ports::{AuditSink, Clock, CounterStore, Enforcer, Storage};
use crate::application::rate_limiter::RateLimiter;
use crate::application::verification::{StatusCounts, VerificationStateMachine};
use crate::domain::audit::{AuditEvent, AuditSource};
use crate::domain::challenge::{ChallengePolicy, ChallengeResponse};
use crate::domain::client::ClientIdentity;
use crate::domain::decision::{
    AdmissionVerdict, ChallengeOutcome, Decision, DecisionReason,
};
use crate::domain::error::GateError;
use crate::domain::verification::{VerificationRecord, VerificationStatus};
use crate::infrastructure::audit::NoopAuditSink;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::enforcement::NoopEnforcer;
use crate::infrastructure::memory_store::MemoryCounterStore;
use crate::infrastructure::storage::ShardedStorage;
use std::sync::Arc;

/// Status store used when none is supplied.
pub type DefaultStatusStore = Arc<ShardedStorage<ClientIdentity, VerificationRecord>>;

/// What [`AdmissionGate::prune`] dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Verification records that no longer carried information
    pub status_records: usize,
    /// Expired counter records
    pub counters: usize,
}

/// Builder for an [`AdmissionGate`].
///
/// Anything not supplied falls back to an in-process default: system
/// clock, in-memory counter store, sharded status store, no audit sink and
/// no enforcer.
pub struct AdmissionGateBuilder<S = DefaultStatusStore> {
    config: GateConfig,
    clock: Option<Arc<dyn Clock>>,
    counter_store: Option<Arc<dyn CounterStore>>,
    status_store: S,
    audit: Option<Arc<dyn AuditSink>>,
    enforcer: Option<Arc<dyn Enforcer>>,
    challenge: ChallengePolicy,
}

impl<S> AdmissionGateBuilder<S>
where
    S: Storage<ClientIdentity, VerificationRecord> + Clone,
{
    /// Set thresholds and windows.
    pub fn with_config(mut self, config: GateConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the clock used for windows, breaker recovery and verification expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use a shared counter store (e.g. Redis) instead of the in-memory one.
    pub fn with_counter_store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.counter_store = Some(store);
        self
    }

    /// Send audit events to `sink`.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Hand block suggestions to `enforcer`.
    pub fn with_enforcer(mut self, enforcer: Arc<dyn Enforcer>) -> Self {
        self.enforcer = Some(enforcer);
        self
    }

    /// Replace the challenge question and answer.
    pub fn with_challenge_policy(mut self, policy: ChallengePolicy) -> Self {
        self.challenge = policy;
        self
    }

    /// Keep verification status in `store` instead of the default map.
    pub fn with_status_store<T>(self, store: T) -> AdmissionGateBuilder<T>
    where
        T: Storage<ClientIdentity, VerificationRecord> + Clone,
    {
        AdmissionGateBuilder {
            config: self.config,
            clock: self.clock,
            counter_store: self.counter_store,
            status_store: store,
            audit: self.audit,
            enforcer: self.enforcer,
            challenge: self.challenge,
        }
    }

    /// Build the gate.
    ///
    /// The default in-memory counter store is capped at
    /// `GateConfig::max_counters` records.
    ///
    /// # Errors
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn build(self) -> Result<AdmissionGate<S>, ConfigError> {
        self.config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let store = self.counter_store.unwrap_or_else(|| {
            let memory = MemoryCounterStore::new(clock.clone());
            match self.config.max_counters {
                Some(max) => Arc::new(memory.with_max_counters(max)),
                None => Arc::new(memory),
            }
        });

        let circuit_breaker = Arc::new(CircuitBreaker::new(
            self.config.circuit_breaker.clone(),
            clock.clone(),
        ));
        let guarded: Arc<dyn CounterStore> =
            Arc::new(GuardedStore::new(store, circuit_breaker.clone()));

        let flood = FloodDetector::new(
            guarded.clone(),
            self.config.flood_threshold,
            self.config.flood_window,
        );
        let rate = RateLimiter::new(
            guarded.clone(),
            self.config.rate_limit_count,
            self.config.rate_limit_window,
        );
        let verification =
            VerificationStateMachine::new(self.status_store, clock, self.config.verified_ttl);

        Ok(AdmissionGate {
            config: self.config,
            counters: guarded,
            flood,
            rate,
            verification,
            challenge: self.challenge,
            audit: self.audit.unwrap_or_else(|| Arc::new(NoopAuditSink)),
            enforcer: self.enforcer.unwrap_or_else(|| Arc::new(NoopEnforcer)),
            metrics: Metrics::new(),
            circuit_breaker,
        })
    }
}

/// Per-request admission control.
///
/// Cheap to clone; clones share counters, status and metrics. Safe to call
/// from many request workers at once.
#[derive(Debug, Clone)]
pub struct AdmissionGate<S = DefaultStatusStore>
where
    S: Storage<ClientIdentity, VerificationRecord> + Clone,
{
    config: GateConfig,
    counters: Arc<dyn CounterStore>,
    flood: FloodDetector,
    rate: RateLimiter,
    verification: VerificationStateMachine<S>,
    challenge: ChallengePolicy,
    audit: Arc<dyn AuditSink>,
    enforcer: Arc<dyn Enforcer>,
    metrics: Metrics,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl AdmissionGate<DefaultStatusStore> {
    /// Start building a gate with default configuration.
    pub fn builder() -> AdmissionGateBuilder<DefaultStatusStore> {
        AdmissionGateBuilder {
            config: GateConfig::default(),
            clock: None,
            counter_store: None,
            status_store: Arc::new(ShardedStorage::new()),
            audit: None,
            enforcer: None,
            challenge: ChallengePolicy::default(),
        }
    }
}

impl<S> AdmissionGate<S>
where
    S: Storage<ClientIdentity, VerificationRecord> + Clone,
{
    /// Classify one request from `client`.
    pub fn admit(&self, client: &ClientIdentity) -> AdmissionVerdict {
        self.evaluate(client).verdict
    }

    /// Classify one request given its raw source address.
    ///
    /// An address that cannot be parsed fails closed with CHALLENGE and is
    /// audited under the raw address.
    pub fn admit_addr(&self, source: &str) -> AdmissionVerdict {
        self.evaluate_addr(source).verdict
    }

    /// Like [`admit_addr`](Self::admit_addr), with the reason.
    pub fn evaluate_addr(&self, source: &str) -> Decision {
        match ClientIdentity::parse(source) {
            Ok(client) => self.evaluate(&client),
            Err(e) => {
                tracing::warn!(source, error = %e, "unidentifiable client, challenging");
                let decision =
                    Decision::new(AdmissionVerdict::Challenge, DecisionReason::UnidentifiedClient);
                self.metrics.record_verdict(decision.verdict);
                self.record_audit(AuditSource::unidentified(source));
                decision
            }
        }
    }

    /// Classify one request from `client` and report why.
    ///
    /// Never fails: store errors fail open, audit errors are ignored.
    pub fn evaluate(&self, client: &ClientIdentity) -> Decision {
        let decision = self.classify(client);

        self.metrics.record_verdict(decision.verdict);
        self.record_audit(AuditSource::Client(*client));

        tracing::debug!(
            client = %client,
            verdict = %decision.verdict,
            reason = ?decision.reason,
            "admission decision"
        );
        decision
    }

    fn classify(&self, client: &ClientIdentity) -> Decision {
        let status = self.verification.status(client);
        if status == VerificationStatus::Verified {
            return Decision::new(AdmissionVerdict::Allow, DecisionReason::Verified);
        }

        let fallback = match self.screen(client) {
            Ok(Some(decision)) => return decision,
            Ok(None) => DecisionReason::WithinLimits,
            Err(e) => {
                self.metrics.record_fail_open();
                tracing::warn!(client = %client, error = %e, "counter store unavailable, failing open");
                DecisionReason::FailOpen
            }
        };

        if status == VerificationStatus::Challenged {
            Decision::new(AdmissionVerdict::Challenge, DecisionReason::AwaitingChallenge)
        } else {
            Decision::new(AdmissionVerdict::Allow, fallback)
        }
    }

    /// Run the counters. `Ok(None)` means no counter fired.
    ///
    /// The first store error ends screening so a failing request touches
    /// the store at most once.
    fn screen(&self, client: &ClientIdentity) -> Result<Option<Decision>, GateError> {
        let reading = self.flood.inspect(client)?;

        if let Some(block_threshold) = self.config.block_threshold {
            if reading.count > block_threshold {
                // Keyed on the status record rather than the exact crossing
                // count, which a failed-open request may never have seen
                if self.verification.flag_for_block(client) {
                    self.suggest_block(client, reading.count);
                }
                return Ok(Some(Decision::new(
                    AdmissionVerdict::Block,
                    DecisionReason::Blocked,
                )));
            }
        }

        if reading.decision.is_flood() {
            self.verification.escalate(client);
            return Ok(Some(Decision::new(
                AdmissionVerdict::Challenge,
                DecisionReason::Flood,
            )));
        }

        if self.rate.check(client)?.is_exceeded() {
            self.verification.escalate(client);
            return Ok(Some(Decision::new(
                AdmissionVerdict::Challenge,
                DecisionReason::RateLimited,
            )));
        }

        Ok(None)
    }

    fn suggest_block(&self, client: &ClientIdentity, count: u64) {
        tracing::warn!(client = %client, count, "flood crossed block threshold");
        if let Err(e) = self.enforcer.block(client) {
            tracing::warn!(client = %client, error = %e, "block suggestion not delivered");
        }
    }

    fn record_audit(&self, source: AuditSource) {
        let event = AuditEvent::now(source);
        if let Err(e) = self.audit.record(&event) {
            tracing::debug!(client = %event.source, error = %e, "audit record dropped");
        }
    }

    /// Score a challenge response and apply it.
    ///
    /// A correct answer verifies a CHALLENGED client. Responses from
    /// clients that are not challenged are scored without effect.
    pub fn submit_response(
        &self,
        client: &ClientIdentity,
        response: &ChallengeResponse,
    ) -> ChallengeOutcome {
        let outcome = self.challenge.evaluate(response);

        match outcome {
            ChallengeOutcome::Correct => {
                if self.verification.apply_outcome(client, outcome) {
                    self.metrics.record_verified();
                }
            }
            ChallengeOutcome::Incorrect => {
                self.metrics.record_rejected_response();
                tracing::debug!(client = %client, "incorrect challenge response");
            }
        }
        outcome
    }

    /// Parse raw form fields and submit them.
    ///
    /// Malformed input scores as incorrect.
    pub fn submit_form(
        &self,
        client: &ClientIdentity,
        confirmed: Option<&str>,
        answer: Option<&str>,
    ) -> ChallengeOutcome {
        match ChallengeResponse::from_fields(confirmed, answer) {
            Ok(response) => self.submit_response(client, &response),
            Err(e) => {
                self.metrics.record_rejected_response();
                tracing::debug!(client = %client, error = %e, "malformed challenge response");
                ChallengeOutcome::Incorrect
            }
        }
    }

    /// Current verification status of `client`.
    pub fn status(&self, client: &ClientIdentity) -> VerificationStatus {
        self.verification.status(client)
    }

    /// Tally of tracked clients by status.
    pub fn status_counts(&self) -> StatusCounts {
        self.verification.counts()
    }

    /// Drop status records that no longer carry information and expired
    /// counters.
    ///
    /// The in-memory counter store also sweeps itself as it is used; this
    /// reclaims memory on demand, e.g. from a periodic maintenance task.
    pub fn prune(&self) -> PruneReport {
        let report = PruneReport {
            status_records: self.verification.prune(),
            counters: self.counters.purge_expired(),
        };
        tracing::debug!(
            status_records = report.status_records,
            counters = report.counters,
            "pruned admission state"
        );
        report
    }

    /// The challenge shown to CHALLENGED clients.
    pub fn challenge_policy(&self) -> &ChallengePolicy {
        &self.challenge
    }

    /// Active configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Decision counters.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Breaker guarding the counter store.
    ///
    /// - `circuit_breaker().state()` - Current circuit state
    /// - `circuit_breaker().consecutive_failures()` - Failure count
    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }
}
