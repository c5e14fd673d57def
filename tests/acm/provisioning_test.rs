use std::time::Duration;

use anyhow::{Result, anyhow};

use acm_cert_provisioner::Disposition;
use acm_cert_provisioner::core::UPDATE_REJECTED_REASON;
use acm_cert_provisioner::core::errors::ProviderError;
use acm_cert_provisioner::core::types::{ChangeAction, OutcomeStatus};
use acm_cert_provisioner::fakes::{AuthorityCall, FakeWorld, JournalEntry, challenge_for, details};

use super::test_utils::{ARN, FULL_BUDGET, ZONE, event, invoke, request, single_outcome};

#[test]
fn create_issues_publishes_and_reports_certificate() -> Result<()> {
    let world = FakeWorld::new(ARN);
    world.authority.push_describe(details(
        ARN,
        &[
            ("a.example.com", Some("PENDING_VALIDATION"), true),
            ("b.example.com", Some("PENDING_VALIDATION"), true),
        ],
    ));
    world.authority.push_describe(details(
        ARN,
        &[
            ("a.example.com", Some("SUCCESS"), true),
            ("b.example.com", Some("SUCCESS"), true),
        ],
    ));
    let request = request(event("Create", &["a.example.com", "b.example.com"], None))?;

    let disposition = invoke(&world, FULL_BUDGET, &request)?;
    assert!(matches!(disposition, Disposition::Signal(_)));

    let requests = world.authority.request_calls();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].primary_host, "a.example.com");
    assert_eq!(requests[0].alternate_hosts, vec!["b.example.com".to_string()]);

    let batches = world.zone.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].zone_id, ZONE);
    assert_eq!(batches[0].action, ChangeAction::Create);
    let names: Vec<&str> = batches[0].records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            challenge_for("a.example.com").name.as_str(),
            challenge_for("b.example.com").name.as_str()
        ]
    );
    assert!(batches[0].records.iter().all(|r| r.ttl == 600));

    let outcome = single_outcome(&world)?;
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.physical_id.as_deref(), Some(ARN));
    assert_eq!(outcome.data.certificate_arn.as_deref(), Some(ARN));
    Ok(())
}

#[test]
fn failed_alternate_name_fails_the_create() -> Result<()> {
    let world = FakeWorld::new(ARN);
    world.authority.push_describe(details(
        ARN,
        &[
            ("a.example.com", Some("PENDING_VALIDATION"), true),
            ("b.example.com", Some("PENDING_VALIDATION"), true),
        ],
    ));
    world.authority.push_describe(details(
        ARN,
        &[
            ("a.example.com", Some("SUCCESS"), true),
            ("b.example.com", Some("FAILED"), true),
        ],
    ));
    let request = request(event("Create", &["a.example.com", "b.example.com"], None))?;

    invoke(&world, FULL_BUDGET, &request)?;

    let outcome = single_outcome(&world)?;
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    let reason = outcome.reason.ok_or_else(|| anyhow!("missing reason"))?;
    assert!(reason.contains("One or more domains failed to validate"));
    assert!(reason.contains("b.example.com"));
    // The certificate is reported so a rollback deletes it.
    assert_eq!(outcome.physical_id.as_deref(), Some(ARN));

    // Records stay published; nothing is deleted on a failed validation.
    let batches = world.zone.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].action, ChangeAction::Create);
    Ok(())
}

#[test]
fn throttled_requests_are_retried_with_growing_delays() -> Result<()> {
    let world = FakeWorld::new(ARN);
    let throttled =
        || ProviderError::from_service(Some("ThrottlingException"), "Rate exceeded");
    world.authority.push_request_error(throttled());
    world.authority.push_request_error(throttled());
    world
        .authority
        .push_describe(details(ARN, &[("a.example.com", Some("SUCCESS"), true)]));
    let request = request(event("Create", &["a.example.com"], None))?;

    invoke(&world, FULL_BUDGET, &request)?;

    assert_eq!(world.authority.request_calls().len(), 3);
    assert_eq!(
        world.clock.sleeps(),
        vec![Duration::from_secs(5), Duration::from_secs(10)]
    );
    assert_eq!(single_outcome(&world)?.status, OutcomeStatus::Success);
    Ok(())
}

#[test]
fn every_request_uses_the_same_idempotency_token() -> Result<()> {
    let first = FakeWorld::new(ARN);
    let second = FakeWorld::new(ARN);
    for world in [&first, &second] {
        world
            .authority
            .push_describe(details(ARN, &[("a.example.com", Some("SUCCESS"), true)]));
        invoke(world, FULL_BUDGET, &request(event("Create", &["a.example.com"], None))?)?;
    }

    let token = first.authority.request_calls()[0].token.clone();
    assert_eq!(second.authority.request_calls()[0].token, token);
    assert!(token.as_str().len() <= 32);
    assert!(token.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    assert!(token.as_str().ends_with("SiteCertificate"));
    Ok(())
}

#[test]
fn invalid_properties_fail_without_touching_aws() -> Result<()> {
    let world = FakeWorld::new(ARN);
    let request = request(event("Create", &[], None))?;

    invoke(&world, FULL_BUDGET, &request)?;

    let outcome = single_outcome(&world)?;
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.physical_id, None);
    assert!(world.authority.calls().is_empty());
    assert!(world.zone.batches().is_empty());
    Ok(())
}

#[test]
fn rejected_record_batch_fails_with_the_certificate_as_physical_id() -> Result<()> {
    let world = FakeWorld::new(ARN);
    world
        .authority
        .push_describe(details(ARN, &[("a.example.com", Some("PENDING_VALIDATION"), true)]));
    world.zone.push_error(ProviderError::from_service(
        Some("NoSuchHostedZone"),
        "No hosted zone found with ID: Z1",
    ));
    let request = request(event("Create", &["a.example.com"], None))?;

    invoke(&world, FULL_BUDGET, &request)?;

    let outcome = single_outcome(&world)?;
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.physical_id.as_deref(), Some(ARN));
    assert!(
        outcome
            .reason
            .unwrap_or_default()
            .contains("No hosted zone found")
    );
    Ok(())
}

#[test]
fn updates_are_rejected_without_side_effects() -> Result<()> {
    let world = FakeWorld::new(ARN);
    let request = request(event("Update", &["a.example.com"], Some(ARN)))?;

    invoke(&world, FULL_BUDGET, &request)?;

    let outcome = single_outcome(&world)?;
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.reason.as_deref(), Some(UPDATE_REJECTED_REASON));
    assert_eq!(outcome.physical_id.as_deref(), Some(ARN));
    assert!(world.authority.calls().is_empty());
    assert!(world.zone.batches().is_empty());
    assert!(world.continuation.payloads().is_empty());
    Ok(())
}

#[test]
fn delete_waits_until_certificate_is_released() -> Result<()> {
    let world = FakeWorld::new(ARN);
    world.authority.push_describe(details(
        ARN,
        &[
            ("a.example.com", Some("SUCCESS"), true),
            ("b.example.com", Some("SUCCESS"), true),
        ],
    ));
    let in_use = || {
        ProviderError::from_service(
            Some("ResourceInUseException"),
            format!("Certificate {ARN} in account 123456789012 is in use."),
        )
    };
    world.authority.push_delete_error(in_use());
    world.authority.push_delete_error(in_use());
    let request = request(event(
        "Delete",
        &["a.example.com", "b.example.com"],
        Some(ARN),
    ))?;

    invoke(&world, FULL_BUDGET, &request)?;

    let outcome = single_outcome(&world)?;
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.reason, None);
    assert_eq!(outcome.physical_id.as_deref(), Some(ARN));

    let batches = world.zone.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].action, ChangeAction::Delete);
    assert_eq!(batches[0].records.len(), 2);

    let calls = world.authority.calls();
    assert_eq!(calls[0], AuthorityCall::Describe(ARN.to_string()));
    let removal = world
        .journal
        .position(|entry| *entry == JournalEntry::Zone(ChangeAction::Delete))
        .ok_or_else(|| anyhow!("records were never removed"))?;
    let first_delete = world
        .journal
        .position(|entry| matches!(entry, JournalEntry::Authority(AuthorityCall::Delete(_))))
        .ok_or_else(|| anyhow!("certificate was never deleted"))?;
    assert!(removal < first_delete);
    assert_eq!(
        world
            .authority
            .count(|call| matches!(call, AuthorityCall::Delete(_))),
        3
    );
    assert_eq!(world.clock.sleeps().len(), 2);
    Ok(())
}

#[test]
fn delete_of_failed_create_succeeds() -> Result<()> {
    let world = FakeWorld::new(ARN);
    // A create that failed before issuing reports the log stream as physical id.
    let request = request(event(
        "Delete",
        &["a.example.com"],
        Some("2026/10/17/[$LATEST]9f8e7d6c5b4a"),
    ))?;

    invoke(&world, FULL_BUDGET, &request)?;

    assert_eq!(single_outcome(&world)?.status, OutcomeStatus::Success);
    assert!(world.authority.calls().is_empty());
    Ok(())
}
