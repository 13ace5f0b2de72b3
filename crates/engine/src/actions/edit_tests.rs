// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::args::ResolvedArgs;
use crate::context::ExecutionConfig;
use crate::document::RawEdit;
use crate::fs::{FileSystem, MemFs};
use std::sync::Arc;

fn ctx() -> ExecutionContext {
    ExecutionContext::new(
        ResolvedArgs::default(),
        ExecutionConfig::default(),
        Arc::new(MemFs::new()),
    )
}

fn delete(pattern: &str, regexp: bool) -> EditOp {
    EditOp::Delete {
        pattern: pattern.to_string(),
        regexp,
    }
}

fn append(line: &str) -> EditOp {
    EditOp::Append {
        line: line.to_string(),
    }
}

fn replace(pattern: &str, with_text: &str, regexp: bool) -> EditOp {
    EditOp::Replace {
        pattern: pattern.to_string(),
        with_text: with_text.to_string(),
        regexp,
    }
}

// ============================================================================
// Edit application
// ============================================================================

#[test]
fn delete_literal_drops_emptied_line() {
    let ctx = ctx();
    ctx.fs
        .write("/f".as_ref(), b"keep\nthis_will_be_deleted\nalso keep\n")
        .unwrap();
    let mut action = EditFileAction::new("/f", vec![delete("this_will_be_deleted", false)]);
    action.execute(&ctx).unwrap();
    assert_eq!(
        ctx.fs.read_to_string("/f".as_ref()).unwrap(),
        "keep\nalso keep\n"
    );
}

#[test]
fn delete_literal_keeps_partial_line() {
    let ctx = ctx();
    ctx.fs.write("/f".as_ref(), b"prefix NOISE suffix\n").unwrap();
    let mut action = EditFileAction::new("/f", vec![delete("NOISE ", false)]);
    action.execute(&ctx).unwrap();
    assert_eq!(
        ctx.fs.read_to_string("/f".as_ref()).unwrap(),
        "prefix suffix\n"
    );
}

#[test]
fn delete_regexp_removes_all_matches() {
    let ctx = ctx();
    ctx.fs
        .write("/f".as_ref(), b"code();\n// one\nmore();\n// two\n")
        .unwrap();
    let mut action = EditFileAction::new("/f", vec![delete(r"(?m)//.*$", true)]);
    action.execute(&ctx).unwrap();
    assert_eq!(
        ctx.fs.read_to_string("/f".as_ref()).unwrap(),
        "code();\nmore();\n"
    );
}

#[test]
fn append_adds_single_line_with_newline() {
    let ctx = ctx();
    ctx.fs.write("/f".as_ref(), b"first").unwrap();
    let mut action = EditFileAction::new("/f", vec![append("second")]);
    action.execute(&ctx).unwrap();
    assert_eq!(
        ctx.fs.read_to_string("/f".as_ref()).unwrap(),
        "first\nsecond\n"
    );
}

#[test]
fn replace_substitutes_all_occurrences() {
    let ctx = ctx();
    ctx.fs.write("/f".as_ref(), b"a foo b foo c\n").unwrap();
    let mut action = EditFileAction::new("/f", vec![replace("foo", "bar", false)]);
    action.execute(&ctx).unwrap();
    assert_eq!(
        ctx.fs.read_to_string("/f".as_ref()).unwrap(),
        "a bar b bar c\n"
    );
}

#[test]
fn edits_apply_in_declared_order() {
    let ctx = ctx();
    ctx.fs.write("/f".as_ref(), b"alpha\n").unwrap();
    let mut action = EditFileAction::new(
        "/f",
        vec![replace("alpha", "beta", false), replace("beta", "gamma", false)],
    );
    action.execute(&ctx).unwrap();
    assert_eq!(ctx.fs.read_to_string("/f".as_ref()).unwrap(), "gamma\n");
}

// ============================================================================
// Backup and restore
// ============================================================================

#[test]
fn backup_file_is_removed_after_success() {
    let ctx = ctx();
    ctx.fs.write("/f".as_ref(), b"data\n").unwrap();
    let mut action = EditFileAction::new("/f", vec![append("more")]);
    action.execute(&ctx).unwrap();
    assert!(!ctx.fs.exists("/f.bak".as_ref()));
}

#[test]
fn cleanup_restores_original_bytes() {
    let ctx = ctx();
    let original = "one\nthis_will_be_deleted\ntwo\n// a\n// b\n// c\n";
    ctx.fs.write("/f".as_ref(), original.as_bytes()).unwrap();

    let mut action = EditFileAction::new(
        "/f",
        vec![
            delete("this_will_be_deleted", false),
            delete(r"(?m)//.*$", true),
            append("appended"),
        ],
    );
    action.execute(&ctx).unwrap();
    assert_eq!(
        ctx.fs.read_to_string("/f".as_ref()).unwrap(),
        "one\ntwo\nappended\n"
    );

    action.cleanup(&ctx).unwrap();
    assert_eq!(ctx.fs.read_to_string("/f".as_ref()).unwrap(), original);
}

#[test]
fn failed_edit_leaves_no_backup_and_no_changes() {
    let ctx = ctx();
    ctx.fs.write("/f".as_ref(), b"data\n").unwrap();
    // An invalid pattern can reach execute when the per-step template pass
    // rewrites it after validation already passed.
    let mut action = EditFileAction::new("/f", vec![delete("(unclosed", true)]);
    assert!(action.execute(&ctx).is_err());
    assert!(!ctx.fs.exists("/f.bak".as_ref()));
    assert_eq!(ctx.fs.read_to_string("/f".as_ref()).unwrap(), "data\n");
    assert!(matches!(
        action.cleanup(&ctx),
        Err(ActionError::NoBackup(_))
    ));
}

#[test]
fn cleanup_without_execute_is_an_error() {
    let ctx = ctx();
    let mut action = EditFileAction::new("/f", vec![append("x")]);
    assert!(matches!(
        action.cleanup(&ctx),
        Err(ActionError::NoBackup(_))
    ));
}

#[test]
fn missing_target_is_an_error() {
    let ctx = ctx();
    let mut action = EditFileAction::new("/absent", vec![append("x")]);
    assert!(matches!(
        action.execute(&ctx),
        Err(ActionError::SourceMissing(_))
    ));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn validate_rejects_empty_edit_list() {
    let ctx = ctx();
    let action = EditFileAction::new("/f", Vec::new());
    assert!(matches!(
        action.validate(&ctx),
        Err(crate::step::ValidationError::NoEdits)
    ));
}

#[test]
fn validate_rejects_bad_regexp() {
    let ctx = ctx();
    let action = EditFileAction::new("/f", vec![delete("(unclosed", true)]);
    assert!(matches!(
        action.validate(&ctx),
        Err(crate::step::ValidationError::InvalidRegex { .. })
    ));
}

#[test]
fn resolve_enforces_one_selector() {
    let err = EditOp::resolve(RawEdit {
        delete: Some("a".to_string()),
        append: Some("b".to_string()),
        replace: None,
        with_text: None,
        regexp: false,
    })
    .unwrap_err();
    assert!(matches!(
        err,
        crate::step::ValidationError::BadEditSelector
    ));
}

#[test]
fn resolve_replace_requires_with() {
    let err = EditOp::resolve(RawEdit {
        delete: None,
        append: None,
        replace: Some("a".to_string()),
        with_text: None,
        regexp: false,
    })
    .unwrap_err();
    assert!(matches!(
        err,
        crate::step::ValidationError::MissingReplaceWith
    ));
}
