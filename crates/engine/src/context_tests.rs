// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::args::ResolvedArgs;
use crate::fs::MemFs;

fn record_with(names: &[&str]) -> StepResultsRecord {
    let mut record = StepResultsRecord::new();
    for name in names {
        record.push(StepResult {
            name: name.to_string(),
            action: ActionResult {
                stdout: format!("out-{name}"),
                ..ActionResult::default()
            },
            cleanup: None,
            skipped: false,
        });
    }
    record
}

// ============================================================================
// Index duality
// ============================================================================

#[test]
fn by_name_and_by_index_agree() {
    let record = record_with(&["first", "second"]);
    let by_name = record.by_name("second").unwrap();
    let by_index = record.by_index(1).unwrap();
    assert_eq!(by_name.name, by_index.name);
    assert_eq!(by_name.action.stdout, by_index.action.stdout);
}

#[test]
fn cleanup_set_by_index_is_visible_by_name() {
    let mut record = record_with(&["only"]);
    record.set_cleanup(
        0,
        ActionResult {
            stdout: "cleaned".to_string(),
            ..ActionResult::default()
        },
    );
    let by_name = record.by_name("only").unwrap();
    assert_eq!(by_name.cleanup.as_ref().unwrap().stdout, "cleaned");
    let by_index = record.by_index(0).unwrap();
    assert_eq!(by_index.cleanup.as_ref().unwrap().stdout, "cleaned");
}

#[test]
fn unknown_lookups_are_none() {
    let record = record_with(&["a"]);
    assert!(record.by_name("b").is_none());
    assert!(record.by_index(5).is_none());
}

// ============================================================================
// Template bindings
// ============================================================================

#[test]
fn steps_binding_exposes_stdout_and_outputs() {
    let mut record = StepResultsRecord::new();
    let mut outputs = std::collections::BTreeMap::new();
    outputs.insert("token".to_string(), "abc123".to_string());
    record.push(StepResult {
        name: "login".to_string(),
        action: ActionResult {
            stdout: "ok".to_string(),
            stderr: "warn".to_string(),
            status: Some(0),
            outputs,
        },
        cleanup: None,
        skipped: false,
    });

    match record.to_binding() {
        BindingValue::Object(steps) => match steps.get("login") {
            Some(BindingValue::Object(fields)) => {
                assert_eq!(
                    fields.get("stdout"),
                    Some(&BindingValue::String("ok".to_string()))
                );
                assert_eq!(
                    fields.get("stderr"),
                    Some(&BindingValue::String("warn".to_string()))
                );
                match fields.get("outputs") {
                    Some(BindingValue::Object(outs)) => assert_eq!(
                        outs.get("token"),
                        Some(&BindingValue::String("abc123".to_string()))
                    ),
                    other => panic!("expected outputs object, got {other:?}"),
                }
            }
            other => panic!("expected step object, got {other:?}"),
        },
        other => panic!("expected steps object, got {other:?}"),
    }
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn cancel_token_is_shared_between_clones() {
    let token = CancelToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());
    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn context_bindings_include_args_and_steps() {
    let mut ctx = ExecutionContext::new(
        ResolvedArgs::default(),
        ExecutionConfig::default(),
        std::sync::Arc::new(MemFs::new()),
    );
    ctx.results.push(StepResult {
        name: "one".to_string(),
        ..StepResult::default()
    });
    let rendered = crate::template::Renderer::new()
        .render("{{ Steps.one.stdout }}ok", &ctx.bindings())
        .unwrap();
    assert_eq!(rendered, "ok");
}
