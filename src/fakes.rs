//! In-memory collaborators for exercising the provisioner without AWS.
//!
//! Every fake records what it was asked to do so tests can assert on call order, and the
//! authority replays scripted responses so retry and hand-off paths run deterministically
//! on virtual time.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;

use crate::core::errors::ProviderError;
use crate::core::types::{
    CertificateDetails, CertificateHandle, CertificateRequest, ChallengeRecord, ChangeAction,
    DnsValidationRecord, DomainValidation, ProvisioningOutcome, ProvisioningRequest,
    ValidationStatus,
};
use crate::providers::{
    CertificateAuthorityClient, Clock, Collaborators, CompletionSignaler, ContinuationInvoker,
    DnsZoneClient, InvocationBudgetSource,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clock that advances virtual time instead of sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }

    pub fn elapsed(&self) -> Duration {
        lock(&self.sleeps).iter().sum()
    }
}

impl Clock for ManualClock {
    fn sleep(&self, duration: Duration) {
        lock(&self.sleeps).push(duration);
    }
}

/// Budget that shrinks as a [`ManualClock`] advances.
#[derive(Debug)]
pub struct ClockBudget {
    clock: Arc<ManualClock>,
    total: Duration,
}

impl ClockBudget {
    pub fn new(clock: Arc<ManualClock>, total: Duration) -> Self {
        Self { clock, total }
    }
}

impl InvocationBudgetSource for ClockBudget {
    fn remaining(&self) -> Duration {
        self.total.saturating_sub(self.clock.elapsed())
    }
}

/// Call made against [`FakeAuthority`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityCall {
    Request(CertificateRequest),
    Describe(String),
    Delete(String),
}

/// One collaborator call, in the order the fakes of a world received them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Authority(AuthorityCall),
    Zone(ChangeAction),
}

/// Ordered log shared by the fakes of one [`FakeWorld`].
#[derive(Debug, Default)]
pub struct Journal {
    entries: Mutex<Vec<JournalEntry>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, entry: JournalEntry) {
        lock(&self.entries).push(entry);
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        lock(&self.entries).clone()
    }

    /// Position of the first entry matching `matcher`.
    pub fn position(&self, matcher: fn(&JournalEntry) -> bool) -> Option<usize> {
        lock(&self.entries).iter().position(matcher)
    }
}

/// Scripted certificate authority.
///
/// Each operation pops its next scripted response; the last describe response repeats once
/// the script runs dry, and unscripted requests and deletes succeed.
#[derive(Debug)]
pub struct FakeAuthority {
    arn: String,
    requests: Mutex<VecDeque<Result<(), ProviderError>>>,
    describes: Mutex<VecDeque<Result<CertificateDetails, ProviderError>>>,
    last_describe: Mutex<Option<Result<CertificateDetails, ProviderError>>>,
    deletes: Mutex<VecDeque<Result<(), ProviderError>>>,
    calls: Mutex<Vec<AuthorityCall>>,
    journal: Arc<Journal>,
}

impl FakeAuthority {
    pub fn new(arn: &str) -> Self {
        Self::with_journal(arn, Arc::new(Journal::new()))
    }

    pub fn with_journal(arn: &str, journal: Arc<Journal>) -> Self {
        Self {
            arn: arn.to_string(),
            requests: Mutex::new(VecDeque::new()),
            describes: Mutex::new(VecDeque::new()),
            last_describe: Mutex::new(None),
            deletes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            journal,
        }
    }

    pub fn handle(&self) -> CertificateHandle {
        CertificateHandle::new(&self.arn)
    }

    pub fn push_request_error(&self, err: ProviderError) {
        lock(&self.requests).push_back(Err(err));
    }

    pub fn push_describe(&self, details: CertificateDetails) {
        lock(&self.describes).push_back(Ok(details));
    }

    pub fn push_describe_error(&self, err: ProviderError) {
        lock(&self.describes).push_back(Err(err));
    }

    pub fn push_delete_error(&self, err: ProviderError) {
        lock(&self.deletes).push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<AuthorityCall> {
        lock(&self.calls).clone()
    }

    pub fn request_calls(&self) -> Vec<CertificateRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                AuthorityCall::Request(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matcher: fn(&AuthorityCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|call| matcher(call)).count()
    }

    fn record(&self, call: AuthorityCall) {
        self.journal.record(JournalEntry::Authority(call.clone()));
        lock(&self.calls).push(call);
    }
}

impl CertificateAuthorityClient for FakeAuthority {
    fn request_certificate(
        &self,
        request: &CertificateRequest,
    ) -> Result<CertificateHandle, ProviderError> {
        self.record(AuthorityCall::Request(request.clone()));
        match lock(&self.requests).pop_front() {
            Some(Err(err)) => Err(err),
            _ => Ok(self.handle()),
        }
    }

    fn describe_certificate(
        &self,
        handle: &CertificateHandle,
    ) -> Result<CertificateDetails, ProviderError> {
        self.record(AuthorityCall::Describe(handle.arn().to_string()));
        let next = lock(&self.describes).pop_front();
        let mut last = lock(&self.last_describe);
        match next {
            Some(response) => {
                *last = Some(response.clone());
                response
            }
            None => last.clone().unwrap_or_else(|| {
                Err(ProviderError::from_service(
                    Some("ResourceNotFoundException"),
                    format!("Could not find certificate {handle}"),
                ))
            }),
        }
    }

    fn delete_certificate(&self, handle: &CertificateHandle) -> Result<(), ProviderError> {
        self.record(AuthorityCall::Delete(handle.arn().to_string()));
        lock(&self.deletes).pop_front().unwrap_or(Ok(()))
    }
}

/// Change batch received by [`FakeZone`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedBatch {
    pub zone_id: String,
    pub action: ChangeAction,
    pub records: Vec<DnsValidationRecord>,
}

/// Hosted zone that records batches and fails them on request.
#[derive(Debug, Default)]
pub struct FakeZone {
    errors: Mutex<VecDeque<ProviderError>>,
    batches: Mutex<Vec<AppliedBatch>>,
    journal: Arc<Journal>,
}

impl FakeZone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Arc<Journal>) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn push_error(&self, err: ProviderError) {
        lock(&self.errors).push_back(err);
    }

    /// Every batch received, including rejected ones.
    pub fn batches(&self) -> Vec<AppliedBatch> {
        lock(&self.batches).clone()
    }
}

impl DnsZoneClient for FakeZone {
    fn apply_changes(
        &self,
        zone_id: &str,
        action: ChangeAction,
        records: &[DnsValidationRecord],
    ) -> Result<(), ProviderError> {
        self.journal.record(JournalEntry::Zone(action));
        lock(&self.batches).push(AppliedBatch {
            zone_id: zone_id.to_string(),
            action,
            records: records.to_vec(),
        });
        match lock(&self.errors).pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Records continuation payloads instead of dispatching them.
#[derive(Debug, Default)]
pub struct RecordingContinuation {
    payloads: Mutex<Vec<Value>>,
    failure: Mutex<Option<ProviderError>>,
}

impl RecordingContinuation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, err: ProviderError) {
        *lock(&self.failure) = Some(err);
    }

    pub fn payloads(&self) -> Vec<Value> {
        lock(&self.payloads).clone()
    }
}

impl ContinuationInvoker for RecordingContinuation {
    fn invoke_continuation(&self, payload: &Value) -> Result<(), ProviderError> {
        if let Some(err) = lock(&self.failure).clone() {
            return Err(err);
        }
        lock(&self.payloads).push(payload.clone());
        Ok(())
    }
}

/// Records completion signals instead of delivering them.
#[derive(Debug, Default)]
pub struct RecordingSignaler {
    outcomes: Mutex<Vec<ProvisioningOutcome>>,
}

impl RecordingSignaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<ProvisioningOutcome> {
        lock(&self.outcomes).clone()
    }
}

impl CompletionSignaler for RecordingSignaler {
    fn signal(
        &self,
        _request: &ProvisioningRequest,
        outcome: &ProvisioningOutcome,
    ) -> Result<(), ProviderError> {
        lock(&self.outcomes).push(outcome.clone());
        Ok(())
    }
}

/// A full set of fakes plus the [`Collaborators`] view over them.
pub struct FakeWorld {
    pub authority: Arc<FakeAuthority>,
    pub zone: Arc<FakeZone>,
    pub continuation: Arc<RecordingContinuation>,
    pub signaler: Arc<RecordingSignaler>,
    pub clock: Arc<ManualClock>,
    /// Authority and zone calls interleaved in call order.
    pub journal: Arc<Journal>,
}

impl FakeWorld {
    pub fn new(arn: &str) -> Self {
        let journal = Arc::new(Journal::new());
        Self {
            authority: Arc::new(FakeAuthority::with_journal(arn, journal.clone())),
            zone: Arc::new(FakeZone::with_journal(journal.clone())),
            continuation: Arc::new(RecordingContinuation::new()),
            signaler: Arc::new(RecordingSignaler::new()),
            clock: Arc::new(ManualClock::new()),
            journal,
        }
    }

    /// Collaborators for one invocation with `budget` of wall-clock time.
    ///
    /// Each call starts a new budget measured from the clock's current virtual time, so
    /// several invocations of a hand-off chain can share one world.
    pub fn collaborators(&self, budget: Duration) -> Collaborators {
        let total = self.clock.elapsed() + budget;
        Collaborators {
            authority: self.authority.clone(),
            zone: self.zone.clone(),
            continuation: self.continuation.clone(),
            signaler: self.signaler.clone(),
            budget: Arc::new(ClockBudget::new(self.clock.clone(), total)),
            clock: self.clock.clone(),
        }
    }
}

/// Describe response listing `(domain, status, record)` triples.
///
/// A `None` status means validation has not started; a `None` record means the authority
/// has not assigned one yet. Record names and values are derived from the domain.
pub fn details(arn: &str, domains: &[(&str, Option<&str>, bool)]) -> CertificateDetails {
    CertificateDetails {
        handle: CertificateHandle::new(arn),
        validations: domains
            .iter()
            .map(|(domain, status, has_record)| DomainValidation {
                domain_name: domain.to_string(),
                status: status.map(ValidationStatus::parse),
                challenge: has_record.then(|| challenge_for(domain)),
            })
            .collect(),
    }
}

/// The challenge record [`details`] assigns to `domain`.
pub fn challenge_for(domain: &str) -> ChallengeRecord {
    ChallengeRecord {
        name: format!("_c0ffee.{domain}."),
        value: format!("_{}.acm-validations.aws.", domain.replace('.', "-")),
    }
}
