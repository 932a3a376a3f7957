use session_learnings::errors::LearningsError;
use session_learnings::pipeline::{run_pipeline, PipelineRequest};
use session_learnings::report::ReportLimits;
use session_learnings::runtime::{FakeClock, FakeTerminal, ProductionFileSystem, ProductionRuntime};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir");
    }
    fs::write(path, contents).expect("write fixture");
}

fn runtime(terminal: &FakeTerminal) -> ProductionRuntime {
    ProductionRuntime {
        clock: Arc::new(FakeClock::default()),
        file_system: Arc::new(ProductionFileSystem),
        terminal: Arc::new(terminal.clone()),
    }
}

const OOM_REPORT: &str = "# Learning Report

## Problem Description
payments-api pods were OOMKilled during the nightly batch.

## Root Cause
Memory limit of 256Mi was too low.

## Solution
Raised the memory limit to 1Gi.

## Resources Modified
- deployment/payments-api

## Key Learnings
- Profile memory before setting limits
- Watch batch windows
";

const SYNC_REPORT: &str = "## Problem Description
ArgoCD application stuck OutOfSync.

## Root Cause
Drift from a manual kubectl edit.

## Key Learnings
- Never kubectl edit managed resources
- Profile memory before setting limits
";

#[test]
fn mixed_layouts_produce_one_consolidated_document() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("tmp");

    write(
        &root.join("k8s-session-summary-20240101-0900.txt"),
        "Date: 2024-01-01\nJira Ticket: OPS-1\nAffected Namespaces: payments\n",
    );
    write(&root.join("20240101-0900/session-learning-report.md"), OOM_REPORT);
    write(
        &root.join("k8s-troubleshooter/2024-02-01_1/k8s-session-summary.txt"),
        "Date: 2024-02-01\nJira Ticket: Not specified\nAffected Namespaces: argocd payments\n",
    );
    write(
        &root.join("k8s-troubleshooter/2024-02-01_1/session-learning-report.md"),
        SYNC_REPORT,
    );
    write(
        &root.join("2024-03-01_1/k8s-session-summary.txt"),
        "Date: 2024-03-01\nJira Ticket: OPS-3\n",
    );
    write(&root.join("2024-03-01_1/session-learning-report.md"), OOM_REPORT);

    let output = temp.path().join("out/knowledge.md");
    let terminal = FakeTerminal::default();
    let summary = run_pipeline(
        &runtime(&terminal),
        &PipelineRequest {
            root: root.clone(),
            output: output.clone(),
            limits: ReportLimits::default(),
            dry_run: false,
        },
    )
    .expect("pipeline");

    assert_eq!(summary.sessions_analyzed, 3);
    assert_eq!(summary.problem_types, 2);
    assert_eq!(summary.namespaces_tracked, 2);

    let doc = fs::read_to_string(&output).expect("document");
    let oom = doc.find("### Memory/OOM Issues\nOccurrences: 2").expect("oom block");
    let sync = doc.find("### ArgoCD Sync Issues\nOccurrences: 1").expect("sync block");
    assert!(oom < sync);

    let first = doc.find("#### OPS-1").expect("OPS-1");
    let third = doc.find("#### OPS-3").expect("OPS-3");
    assert!(first < third);
    assert!(doc.contains("#### Session from 2024-02-01"));
    assert!(doc.contains("- deployment/payments-api\n"));
    assert!(doc.contains("- payments: 2 incident(s)\n- argocd: 1 incident(s)\n"));
    assert!(doc.contains(
        "- Profile memory before setting limits\n- Watch batch windows\n- Never kubectl edit managed resources\n"
    ));
    assert_eq!(doc.matches("- Profile memory before setting limits").count(), 1);
}

#[test]
fn rerun_overwrites_previous_document() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("sessions");
    write(&root.join("k8s-session-summary-a.txt"), "Jira Ticket: OPS-9\n");
    let output = temp.path().join("kb.md");
    fs::write(&output, "stale content that must disappear").expect("stale");

    let terminal = FakeTerminal::default();
    let request = PipelineRequest {
        root,
        output: output.clone(),
        limits: ReportLimits::default(),
        dry_run: false,
    };
    run_pipeline(&runtime(&terminal), &request).expect("first run");
    let first = fs::read_to_string(&output).expect("first");
    run_pipeline(&runtime(&terminal), &request).expect("second run");
    let second = fs::read_to_string(&output).expect("second");

    assert!(!first.contains("stale content"));
    assert_eq!(first, second);
}

#[test]
fn unwritable_output_is_a_write_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("sessions");
    write(&root.join("k8s-session-summary-a.txt"), "Jira Ticket: OPS-5\n");
    let occupied = temp.path().join("already-a-dir");
    fs::create_dir_all(&occupied).expect("occupied");

    let terminal = FakeTerminal::default();
    let err = run_pipeline(
        &runtime(&terminal),
        &PipelineRequest {
            root,
            output: occupied.clone(),
            limits: ReportLimits::default(),
            dry_run: false,
        },
    )
    .expect_err("write must fail");

    assert!(matches!(err, LearningsError::Write { ref path, .. } if *path == occupied));
    assert!(!terminal
        .written_lines()
        .iter()
        .any(|line| line.starts_with("Knowledge base written to")));
}

#[test]
fn legacy_change_manifest_supplies_resources() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("sessions");
    write(
        &root.join("k8s-session-summary-20240401-1000.txt"),
        "Date: 2024-04-01\nJira Ticket: OPS-8\n",
    );
    write(
        &root.join("k8s-changes-20240401-1000.yaml"),
        "kind: Deployment\nmetadata:\n  name: checkout\nspec:\n  template:\n    spec:\n      containers:\n        - name: app\n          resources:\n            limits:\n              memory: 2Gi\n",
    );
    let output = temp.path().join("kb.md");

    let terminal = FakeTerminal::default();
    run_pipeline(
        &runtime(&terminal),
        &PipelineRequest {
            root,
            output: output.clone(),
            limits: ReportLimits::default(),
            dry_run: false,
        },
    )
    .expect("pipeline");

    let doc = fs::read_to_string(&output).expect("document");
    assert!(doc.contains("#### OPS-8\n"));
    assert!(doc.contains("- deployment/checkout (resource_limit_fix)\n"));
}
