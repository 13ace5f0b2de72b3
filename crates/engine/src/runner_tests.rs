// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::actions::{Action, CreateFileAction, PrintStrAction, RemovePathAction};
use crate::args::ResolvedArgs;
use crate::context::{ExecutionConfig, ExecutionContext};
use crate::fs::{FileSystem, MemFs};
use crate::step::CleanupSpec;
use std::sync::Arc;

fn ctx() -> ExecutionContext {
    ExecutionContext::new(
        ResolvedArgs::default(),
        ExecutionConfig::default(),
        Arc::new(MemFs::new()),
    )
}

fn plain_step(name: &str, action: Action) -> Step {
    Step {
        name: name.to_string(),
        action,
        cleanup: CleanupSpec::None,
        env: Default::default(),
        checks: Vec::new(),
        chdir: None,
        outputs: Vec::new(),
        guard: None,
        timeout_seconds: None,
    }
}

fn create_step(name: &str, path: &str) -> Step {
    let mut step = plain_step(
        name,
        Action::CreateFile(CreateFileAction {
            path: path.to_string(),
            contents: "x".to_string(),
            overwrite: false,
        }),
    );
    step.cleanup = CleanupSpec::Default;
    step
}

fn failing_step(name: &str) -> Step {
    plain_step(
        name,
        Action::RemovePath(RemovePathAction {
            path: "/no-such-path".to_string(),
            recursive: false,
        }),
    )
}

fn print_step(name: &str, message: &str) -> Step {
    plain_step(
        name,
        Action::PrintStr(PrintStrAction {
            message: message.to_string(),
        }),
    )
}

fn ttp_with(steps: Vec<Step>) -> Ttp {
    Ttp {
        name: "test".to_string(),
        description: String::new(),
        args: Vec::new(),
        requirements: None,
        mitre: None,
        env: Default::default(),
        steps,
        work_dir: None,
    }
}

// ============================================================================
// Frontier bookkeeping
// ============================================================================

#[test]
fn all_steps_succeed() {
    let mut ttp = ttp_with(vec![create_step("a", "/a"), create_step("b", "/b")]);
    let mut ctx = ctx();
    let (cleanup_from, outcome) = run_steps(&mut ttp, &mut ctx);
    outcome.unwrap();
    assert_eq!(cleanup_from, 1);
    assert_eq!(ctx.results.len(), 2);
    assert!(ctx.fs.exists("/a".as_ref()));
    assert!(ctx.fs.exists("/b".as_ref()));
}

#[test]
fn failure_stops_the_run_and_freezes_the_frontier() {
    let mut ttp = ttp_with(vec![
        create_step("a", "/a"),
        failing_step("boom"),
        create_step("c", "/c"),
    ]);
    let mut ctx = ctx();
    let (cleanup_from, outcome) = run_steps(&mut ttp, &mut ctx);
    let err = outcome.unwrap_err();
    assert!(matches!(err, RunError::Step { ref step, .. } if step == "boom"));
    assert_eq!(cleanup_from, 0);
    // The failed step is not recorded and the later step never ran.
    assert_eq!(ctx.results.len(), 1);
    assert!(!ctx.fs.exists("/c".as_ref()));
}

#[test]
fn first_step_failure_means_nothing_to_clean() {
    let mut ttp = ttp_with(vec![failing_step("boom")]);
    let mut ctx = ctx();
    let (cleanup_from, outcome) = run_steps(&mut ttp, &mut ctx);
    assert!(outcome.is_err());
    assert_eq!(cleanup_from, -1);
}

#[test]
fn results_are_recorded_under_both_indices() {
    let mut ttp = ttp_with(vec![print_step("only", "hi")]);
    let mut ctx = ctx();
    let (_, outcome) = run_steps(&mut ttp, &mut ctx);
    outcome.unwrap();
    assert_eq!(ctx.results.by_index(0).unwrap().action.stdout, "hi");
    assert_eq!(ctx.results.by_name("only").unwrap().action.stdout, "hi");
}

// ============================================================================
// Success checks
// ============================================================================

#[test]
fn failing_check_fails_the_step_without_advancing_the_frontier() {
    let mut step = create_step("checked", "/made");
    step.checks = vec![crate::checks::SuccessCheck::FileExists {
        msg: None,
        path: "/some-other-file".to_string(),
    }];
    let mut ttp = ttp_with(vec![step]);
    let mut ctx = ctx();
    let (cleanup_from, outcome) = run_steps(&mut ttp, &mut ctx);
    let err = outcome.unwrap_err();
    assert!(matches!(err, RunError::Check { number: 1, .. }));
    // The action ran (the file exists) but the check kept the step out of
    // the cleanup walk.
    assert!(ctx.fs.exists("/made".as_ref()));
    assert_eq!(cleanup_from, -1);
    assert_eq!(ctx.results.len(), 0);
}

#[test]
fn passing_checks_record_the_step() {
    let mut step = create_step("checked", "/made");
    step.checks = vec![crate::checks::SuccessCheck::FileExists {
        msg: Some("file landed".to_string()),
        path: "/made".to_string(),
    }];
    let mut ttp = ttp_with(vec![step]);
    let mut ctx = ctx();
    let (cleanup_from, outcome) = run_steps(&mut ttp, &mut ctx);
    outcome.unwrap();
    assert_eq!(cleanup_from, 0);
}

// ============================================================================
// Guards
// ============================================================================

#[test]
fn falsy_guard_skips_the_step() {
    let mut step = create_step("skipped", "/never");
    step.guard = Some("false".to_string());
    let mut ttp = ttp_with(vec![step, print_step("after", "ran")]);
    let mut ctx = ctx();
    let (cleanup_from, outcome) = run_steps(&mut ttp, &mut ctx);
    outcome.unwrap();
    assert!(!ctx.fs.exists("/never".as_ref()));
    // Skipped steps still occupy their slot so indices stay aligned.
    assert_eq!(cleanup_from, 1);
    assert!(ctx.results.by_index(0).unwrap().skipped);
    assert!(!ctx.results.by_index(1).unwrap().skipped);
}

#[test]
fn truthy_guard_runs_the_step() {
    let mut step = create_step("kept", "/made");
    step.guard = Some("yes-run-it".to_string());
    let mut ttp = ttp_with(vec![step]);
    let mut ctx = ctx();
    let (_, outcome) = run_steps(&mut ttp, &mut ctx);
    outcome.unwrap();
    assert!(ctx.fs.exists("/made".as_ref()));
}

// ============================================================================
// Per-step templating (phase b)
// ============================================================================

#[test]
fn later_steps_see_earlier_outputs() {
    let seed = print_step("seed", "from-seed");
    let mut sink = create_step("sink", "/out");
    if let Action::CreateFile(action) = &mut sink.action {
        action.contents = "value={{ Steps.seed.stdout }}".to_string();
    }
    let mut ttp = ttp_with(vec![seed, sink]);
    let mut ctx = ctx();
    let (_, outcome) = run_steps(&mut ttp, &mut ctx);
    outcome.unwrap();
    assert_eq!(
        ctx.fs.read_to_string("/out".as_ref()).unwrap(),
        "value=from-seed"
    );
}

#[test]
fn reference_to_future_step_is_a_step_time_error() {
    let mut early = create_step("early", "/out");
    if let Action::CreateFile(action) = &mut early.action {
        action.contents = "{{ Steps.later.stdout }}".to_string();
    }
    let mut ttp = ttp_with(vec![early, print_step("later", "x")]);
    let mut ctx = ctx();
    let (cleanup_from, outcome) = run_steps(&mut ttp, &mut ctx);
    let err = outcome.unwrap_err();
    assert!(matches!(err, RunError::Template { .. }));
    assert_eq!(cleanup_from, -1);
}

// ============================================================================
// Output filters
// ============================================================================

#[test]
fn output_filters_populate_the_result() {
    let mut step = print_step("json", r#"{"auth":{"token":"s3cr3t"}}"#);
    step.outputs = vec![crate::outputs::OutputSpec {
        name: "token".to_string(),
        filters: vec![crate::outputs::OutputFilter::Json {
            path: "auth.token".to_string(),
        }],
    }];
    let mut ttp = ttp_with(vec![step]);
    let mut ctx = ctx();
    let (_, outcome) = run_steps(&mut ttp, &mut ctx);
    outcome.unwrap();
    assert_eq!(
        ctx.results
            .by_name("json")
            .unwrap()
            .action
            .outputs
            .get("token")
            .map(String::as_str),
        Some("s3cr3t")
    );
}

#[test]
fn failed_output_filter_fails_the_step() {
    let mut step = print_step("notjson", "plain text");
    step.outputs = vec![crate::outputs::OutputSpec {
        name: "x".to_string(),
        filters: vec![crate::outputs::OutputFilter::Json {
            path: "a".to_string(),
        }],
    }];
    let mut ttp = ttp_with(vec![step]);
    let mut ctx = ctx();
    let (cleanup_from, outcome) = run_steps(&mut ttp, &mut ctx);
    assert!(matches!(outcome.unwrap_err(), RunError::Output { .. }));
    assert_eq!(cleanup_from, -1);
}

// ============================================================================
// Cancellation and environment
// ============================================================================

#[test]
fn cancellation_stops_before_the_next_step() {
    let mut ttp = ttp_with(vec![create_step("never", "/never")]);
    let mut ctx = ctx();
    ctx.cancel.cancel();
    let (cleanup_from, outcome) = run_steps(&mut ttp, &mut ctx);
    assert!(matches!(outcome.unwrap_err(), RunError::Cancelled));
    assert_eq!(cleanup_from, -1);
    assert!(!ctx.fs.exists("/never".as_ref()));
}

#[test]
fn step_env_overrides_playbook_env_key_by_key() {
    let mut ctx = ctx();
    ctx.env.insert("SHARED".to_string(), "playbook".to_string());
    ctx.env.insert("BASE".to_string(), "playbook".to_string());

    let mut step = print_step("s", "hi");
    step.env.insert("SHARED".to_string(), "step".to_string());

    let scope = scope_for(&ctx, &step);
    assert_eq!(scope.env.get("SHARED").map(String::as_str), Some("step"));
    assert_eq!(scope.env.get("BASE").map(String::as_str), Some("playbook"));
}

#[test]
fn workdir_guard_restores_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let before = std::env::current_dir().unwrap();
    {
        let _guard = WorkDirGuard::enter(dir.path()).unwrap();
        assert_eq!(
            std::env::current_dir().unwrap().canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
    assert_eq!(std::env::current_dir().unwrap(), before);
}
