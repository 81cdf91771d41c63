#![cfg(unix)]

// Integration suite for the docpack tools: drives the library API and the
// compiled helpers against a throwaway repository fixture.
mod support;

use anyhow::{Context, Result};
use docpack::schemas::OutputSchema;
use docpack::{
    CandidateKind, CandidateRecord, CatalogStore, ChangeSummary, DocpackLayout, IndexDocument,
    Severity, validate_repo,
};
use serde_json::Value;
use std::fs;
use support::{
    EVENT_CATALOG, fixture_repo, helper_command, run_command, stdout_text, write_file,
};

// Console output lists each finding and a count summary; warnings keep exit 0.
#[test]
fn validate_reports_findings_and_summary() -> Result<()> {
    let repo = fixture_repo()?;
    let mut cmd = helper_command("validate-docpack");
    cmd.arg("--repo").arg(repo.path());
    let output = run_command(cmd)?;
    let stdout = stdout_text(&output);

    assert!(
        stdout.contains("WARNING: Unknown consumer service :: evt.invoice.created -> ghost"),
        "{stdout}"
    );
    assert!(stdout.contains(
        "WARNING: Subjects referenced by service catalog but not present in event catalog :: invoice.voided"
    ));
    assert!(
        stdout.contains("Summary: services=2 items=3 events=2 commands=0 queries=1 orphans=1"),
        "{stdout}"
    );
    assert!(!stdout.contains("ERROR:"));
    Ok(())
}

#[test]
fn validate_writes_markdown_report() -> Result<()> {
    let repo = fixture_repo()?;
    let report_path = repo.path().join("reports/inventory.md");
    let mut cmd = helper_command("validate-docpack");
    cmd.arg("--repo")
        .arg(repo.path())
        .arg("--write-report")
        .arg(&report_path);
    run_command(cmd)?;

    let report = fs::read_to_string(&report_path)?;
    assert!(report.starts_with("# Inventory Report\n"));
    assert!(report.contains("- Services cataloged: 2"));
    assert!(report.contains("### WARNING"));
    assert!(report.contains("| evt.invoice.paid | invoice.paid | billing | orphan |"));
    assert!(report.contains("1. Fix errors and rerun validation."));
    Ok(())
}

// A relative report path lands under --repo, not the working directory.
#[test]
fn validate_report_path_is_repo_relative() -> Result<()> {
    let repo = fixture_repo()?;
    let elsewhere = tempfile::TempDir::new()?;
    let mut cmd = helper_command("validate-docpack");
    cmd.current_dir(elsewhere.path())
        .arg("--repo")
        .arg(repo.path())
        .arg("--write-report")
        .arg("reports/inventory.md");
    run_command(cmd)?;

    assert!(repo.path().join("reports/inventory.md").is_file());
    assert!(!elsewhere.path().join("reports").exists());
    Ok(())
}

#[test]
fn validate_exits_two_when_context_doc_missing() -> Result<()> {
    let repo = fixture_repo()?;
    fs::remove_file(repo.path().join("AI_CONTEXT.md"))?;
    let output = helper_command("validate-docpack")
        .arg("--repo")
        .arg(repo.path())
        .output()?;

    assert_eq!(output.status.code(), Some(2));
    let stdout = stdout_text(&output);
    assert!(stdout.contains("ERROR: Missing required file"), "{stdout}");
    assert!(!stdout.contains("Summary:"));
    Ok(())
}

#[test]
fn validate_exits_two_on_unparsable_catalog() -> Result<()> {
    let repo = fixture_repo()?;
    write_file(repo.path(), "catalogs/service_catalog.yaml", "services: [unclosed\n")?;
    let output = helper_command("validate-docpack")
        .arg("--repo")
        .arg(repo.path())
        .output()?;

    assert_eq!(output.status.code(), Some(2));
    assert!(stdout_text(&output).contains("ERROR: Failed to parse service_catalog.yaml"));
    Ok(())
}

// Catalog paths can be redirected through the environment.
#[test]
fn validate_honours_catalog_env_overrides() -> Result<()> {
    let repo = fixture_repo()?;
    write_file(repo.path(), "alt/events.yaml", "catalog:\n  events: []\n")?;
    let mut cmd = helper_command("validate-docpack");
    cmd.arg("--repo")
        .arg(repo.path())
        .env("DOCPACK_EVENT_CATALOG", "alt/events.yaml");
    let stdout = stdout_text(&run_command(cmd)?);
    assert!(stdout.contains("items=0"), "{stdout}");
    Ok(())
}

#[test]
fn validate_repo_api_matches_cli() -> Result<()> {
    let repo = fixture_repo()?;
    let outcome = validate_repo(&DocpackLayout::new(repo.path()));
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.count(Severity::Error), 0);
    assert_eq!(outcome.count(Severity::Warning), 2);
    let summary = outcome.summary.context("summary present")?;
    assert_eq!(summary.orphans.len(), 1);
    assert_eq!(summary.orphans[0].id, "evt.invoice.paid");
    Ok(())
}

// Rebuilding unchanged catalogs must reproduce the files byte for byte.
#[test]
fn build_indexes_is_idempotent() -> Result<()> {
    let repo = fixture_repo()?;
    let services_path = repo.path().join("indexes/services.jsonl");
    let items_path = repo.path().join("indexes/events.jsonl");

    let mut first = helper_command("build-indexes");
    first.arg("--repo").arg(repo.path());
    run_command(first)?;
    let services_before = fs::read(&services_path)?;
    let items_before = fs::read(&items_path)?;

    let mut second = helper_command("build-indexes");
    second.arg("--repo").arg(repo.path());
    run_command(second)?;
    assert_eq!(fs::read(&services_path)?, services_before);
    assert_eq!(fs::read(&items_path)?, items_before);

    let schema = OutputSchema::index_document()?;
    let items_text = String::from_utf8(items_before)?;
    assert!(schema.validate_jsonl(&items_text).is_empty());

    let docs: Vec<IndexDocument> = items_text
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    let titles: Vec<&str> = docs.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["invoice.created", "invoice.paid", "ContactService.GetContact"]
    );

    let services: Vec<IndexDocument> = String::from_utf8(services_before)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(services[1].body, "Service CRM (domain=sales, type=backend). gRPC=1. Consumes 1.");
    assert_eq!(
        services[1].links,
        vec![
            "catalogs/service_catalog.yaml#crm",
            "services/crm",
            "services/crm/proto/contact.proto",
        ]
    );
    Ok(())
}

#[test]
fn build_indexes_check_detects_stale_files() -> Result<()> {
    let repo = fixture_repo()?;
    let missing = helper_command("build-indexes")
        .arg("--repo")
        .arg(repo.path())
        .arg("--check")
        .output()?;
    assert_eq!(missing.status.code(), Some(1));
    assert!(stdout_text(&missing).contains("is missing"));

    let mut build = helper_command("build-indexes");
    build.arg("--repo").arg(repo.path());
    run_command(build)?;

    let mut fresh = helper_command("build-indexes");
    fresh.arg("--repo").arg(repo.path()).arg("--check");
    assert!(stdout_text(&run_command(fresh)?).contains("Indexes are up to date."));

    let edited = EVENT_CATALOG.replace("responder: crm", "responder: billing");
    write_file(repo.path(), "catalogs/event_catalog.yaml", &edited)?;
    let stale = helper_command("build-indexes")
        .arg("--repo")
        .arg(repo.path())
        .arg("--check")
        .output()?;
    assert_eq!(stale.status.code(), Some(1));
    assert!(stdout_text(&stale).contains("events.jsonl is stale"));
    Ok(())
}

#[test]
fn scan_candidates_streams_schema_valid_records() -> Result<()> {
    let repo = fixture_repo()?;
    let coverage_path = repo.path().join("reports/coverage.json");
    let mut cmd = helper_command("scan-candidates");
    cmd.arg("--root")
        .arg(repo.path())
        .arg("--coverage")
        .arg(&coverage_path);
    let stdout = stdout_text(&run_command(cmd)?);

    let schema = OutputSchema::candidate()?;
    assert!(schema.validate_jsonl(&stdout).is_empty());
    let records: Vec<CandidateRecord> = stdout
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].kind, CandidateKind::Publish);
    assert_eq!(records[0].value, "invoice.created");
    assert_eq!(records[0].file, "services/billing/src/invoice.ts");
    assert_eq!(records[0].line, 2);
    assert_eq!(records[2].kind, CandidateKind::Proto);
    assert_eq!(records[2].value, "ContactService.GetContact");

    let coverage: Value = serde_json::from_str(&fs::read_to_string(&coverage_path)?)?;
    assert_eq!(coverage["invoice.created"]["cataloged"], Value::Bool(true));
    assert_eq!(coverage["invoice.refunded"]["cataloged"], Value::Bool(false));
    assert_eq!(
        coverage["invoice.refunded"]["locations"][0],
        Value::String("services/billing/src/invoice.ts:3".into())
    );
    Ok(())
}

// Coverage needs only the event catalog.
#[test]
fn scan_coverage_without_service_catalog() -> Result<()> {
    let repo = fixture_repo()?;
    fs::remove_file(repo.path().join("catalogs/service_catalog.yaml"))?;
    let coverage_path = repo.path().join("coverage.json");
    let mut cmd = helper_command("scan-candidates");
    cmd.arg("--root")
        .arg(repo.path())
        .arg("--coverage")
        .arg(&coverage_path);
    run_command(cmd)?;

    let coverage: Value = serde_json::from_str(&fs::read_to_string(&coverage_path)?)?;
    assert_eq!(coverage["invoice.created"]["cataloged"], Value::Bool(true));
    Ok(())
}

#[test]
fn scan_candidates_respects_service_scope() -> Result<()> {
    let repo = fixture_repo()?;
    let out_path = repo.path().join("candidates.jsonl");
    let mut cmd = helper_command("scan-candidates");
    cmd.arg("--root")
        .arg(repo.path())
        .arg("--services")
        .arg("crm")
        .arg("--out")
        .arg(&out_path);
    run_command(cmd)?;

    let text = fs::read_to_string(&out_path)?;
    let records: Vec<CandidateRecord> = text
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, CandidateKind::Proto);
    Ok(())
}

#[test]
fn map_changes_prints_services_and_writes_summary() -> Result<()> {
    let repo = fixture_repo()?;
    let changed = write_file(
        repo.path(),
        "changed.txt",
        "services/billing/x.ts\nshared/util.ts\n\nservices/retired/old.ts\n",
    )?;
    let mut cmd = helper_command("map-changes");
    cmd.arg("--repo").arg(repo.path()).arg("--changed-files").arg(&changed);
    let stdout = stdout_text(&run_command(cmd)?);
    assert_eq!(stdout, "billing\n");

    let summary_path = repo.path().join("changed.txt.summary.json");
    let text = fs::read_to_string(&summary_path)?;
    OutputSchema::change_summary()?.validate(&serde_json::from_str(&text)?)?;
    let summary: ChangeSummary = serde_json::from_str(&text)?;
    assert_eq!(summary.affected_services, vec!["billing"]);
    assert_eq!(summary.non_service_paths, vec!["shared/util.ts"]);
    assert_eq!(summary.changed_file_list, changed.display().to_string());
    Ok(())
}

// The umbrella binary finds its sibling helpers and forwards arguments.
#[test]
fn dispatcher_forwards_to_helpers() -> Result<()> {
    let repo = fixture_repo()?;
    let changed = write_file(repo.path(), "changed.txt", "services/crm/a.ts\n")?;
    let mut cmd = helper_command("docpack");
    cmd.arg("changes")
        .arg("--repo")
        .arg(repo.path())
        .arg("--changed-files")
        .arg(&changed);
    assert_eq!(stdout_text(&run_command(cmd)?), "crm\n");

    let failing = helper_command("docpack")
        .arg("validate")
        .arg("--repo")
        .arg(repo.path().join("nowhere"))
        .output()?;
    assert_eq!(failing.status.code(), Some(2), "helper exit codes pass through");
    Ok(())
}

#[test]
fn store_loads_fixture_catalogs() -> Result<()> {
    let repo = fixture_repo()?;
    let layout = DocpackLayout::new(repo.path());
    let store = CatalogStore::load(&layout.service_catalog, &layout.event_catalog)?;
    assert_eq!(store.services().len(), 2);
    assert_eq!(store.items().len(), 3);
    assert!(store.service(&docpack::ServiceId("crm".into())).is_some());

    let items_only = CatalogStore::load_items(&layout.event_catalog)?;
    assert!(items_only.services().is_empty());
    assert_eq!(items_only.items().len(), 3);
    Ok(())
}
