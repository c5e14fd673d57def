use std::time::Duration;

use anyhow::{Result, anyhow};

use acm_cert_provisioner::core::errors::ProviderError;
use acm_cert_provisioner::core::types::{ChangeAction, OutcomeStatus};
use acm_cert_provisioner::fakes::{FakeWorld, details};
use acm_cert_provisioner::{Disposition, ProvisioningRequest};

use super::test_utils::{ARN, FULL_BUDGET, event, invoke, request, single_outcome};

fn pending(world: &FakeWorld) {
    world.authority.push_describe(details(
        ARN,
        &[
            ("a.example.com", Some("PENDING_VALIDATION"), true),
            ("b.example.com", Some("PENDING_VALIDATION"), true),
        ],
    ));
}

#[test]
fn pending_validation_hands_off_and_stays_silent() -> Result<()> {
    let world = FakeWorld::new(ARN);
    pending(&world);
    let original = event("Create", &["a.example.com", "b.example.com"], None);
    let request = request(original.clone())?;

    // 40s: two 15s polls bring the budget to 10s, below the 20s reserve.
    let disposition = invoke(&world, Duration::from_secs(40), &request)?;

    assert_eq!(disposition, Disposition::HandedOff);
    assert!(world.signaler.outcomes().is_empty());
    assert_eq!(world.continuation.payloads(), vec![original]);
    assert_eq!(
        world.clock.sleeps(),
        vec![Duration::from_secs(15), Duration::from_secs(15)]
    );
    Ok(())
}

#[test]
fn continuation_chain_signals_exactly_once() -> Result<()> {
    let world = FakeWorld::new(ARN);
    pending(&world);
    let first = request(event("Create", &["a.example.com", "b.example.com"], None))?;

    assert_eq!(
        invoke(&world, Duration::from_secs(40), &first)?,
        Disposition::HandedOff
    );

    let payload = world
        .continuation
        .payloads()
        .pop()
        .ok_or_else(|| anyhow!("no continuation dispatched"))?;
    world.authority.push_describe(details(
        ARN,
        &[
            ("a.example.com", Some("SUCCESS"), true),
            ("b.example.com", Some("SUCCESS"), true),
        ],
    ));
    let second = ProvisioningRequest::from_payload(payload)?;

    assert!(matches!(
        invoke(&world, FULL_BUDGET, &second)?,
        Disposition::Signal(_)
    ));

    let outcome = single_outcome(&world)?;
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.data.certificate_arn.as_deref(), Some(ARN));
    assert_eq!(world.continuation.payloads().len(), 1);

    // The re-run request deduplicates to the same certificate.
    let requests = world.authority.request_calls();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].token, requests[1].token);

    let batches = world.zone.batches();
    assert_eq!(batches.len(), 2);
    assert!(batches.iter().all(|batch| batch.action == ChangeAction::Create));
    assert_eq!(batches[0].records, batches[1].records);
    Ok(())
}

#[test]
fn repeated_hand_offs_still_signal_once() -> Result<()> {
    let world = FakeWorld::new(ARN);
    pending(&world);
    let original = event("Create", &["a.example.com", "b.example.com"], None);
    let mut next = request(original.clone())?;

    for hop in 1..=2 {
        assert_eq!(
            invoke(&world, Duration::from_secs(40), &next)?,
            Disposition::HandedOff
        );
        let payloads = world.continuation.payloads();
        assert_eq!(payloads.len(), hop);
        let payload = payloads
            .last()
            .cloned()
            .ok_or_else(|| anyhow!("no continuation dispatched"))?;
        assert_eq!(payload, original);
        next = ProvisioningRequest::from_payload(payload)?;
    }
    assert!(world.signaler.outcomes().is_empty());

    world.authority.push_describe(details(
        ARN,
        &[
            ("a.example.com", Some("SUCCESS"), true),
            ("b.example.com", Some("SUCCESS"), true),
        ],
    ));
    invoke(&world, FULL_BUDGET, &next)?;

    let outcome = single_outcome(&world)?;
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.physical_id.as_deref(), Some(ARN));
    assert_eq!(world.continuation.payloads().len(), 2);
    assert_eq!(world.authority.request_calls().len(), 3);
    Ok(())
}

#[test]
fn failed_hand_off_is_reported() -> Result<()> {
    let world = FakeWorld::new(ARN);
    pending(&world);
    world.continuation.fail_with(ProviderError::from_service(
        Some("AccessDeniedException"),
        "not authorized to perform: lambda:InvokeFunction",
    ));
    let request = request(event("Create", &["a.example.com", "b.example.com"], None))?;

    invoke(&world, Duration::from_secs(25), &request)?;

    let outcome = single_outcome(&world)?;
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.physical_id.as_deref(), Some(ARN));
    assert!(
        outcome
            .reason
            .unwrap_or_default()
            .contains("lambda:InvokeFunction")
    );
    Ok(())
}
