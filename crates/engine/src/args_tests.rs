// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use yare::parameterized;

fn decl(name: &str, arg_type: ArgType) -> ArgDecl {
    ArgDecl {
        name: name.to_string(),
        arg_type,
        default: None,
        choices: Vec::new(),
    }
}

fn supplied(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ============================================================================
// Resolution basics
// ============================================================================

#[test]
fn resolves_supplied_string() {
    let decls = vec![decl("target", ArgType::String)];
    let args = resolve_args(&decls, &supplied(&[("target", "host-a")])).unwrap();
    assert_eq!(
        args.get("target"),
        Some(&ArgValue::String("host-a".to_string()))
    );
}

#[test]
fn applies_default_when_absent() {
    let mut d = decl("mode", ArgType::String);
    d.default = Some(serde_yaml::Value::String("safe".to_string()));
    let args = resolve_args(&[d], &supplied(&[])).unwrap();
    assert_eq!(args.get("mode"), Some(&ArgValue::String("safe".to_string())));
}

#[test]
fn supplied_value_beats_default() {
    let mut d = decl("mode", ArgType::String);
    d.default = Some(serde_yaml::Value::String("safe".to_string()));
    let args = resolve_args(&[d], &supplied(&[("mode", "loud")])).unwrap();
    assert_eq!(args.get("mode"), Some(&ArgValue::String("loud".to_string())));
}

#[test]
fn missing_required_argument() {
    let err = resolve_args(&[decl("target", ArgType::String)], &supplied(&[])).unwrap_err();
    assert!(matches!(err, ArgError::Missing(name) if name == "target"));
}

#[test]
fn undeclared_supplied_argument() {
    let err = resolve_args(&[], &supplied(&[("extra", "x")])).unwrap_err();
    assert!(matches!(err, ArgError::Undeclared { name } if name == "extra"));
}

#[test]
fn duplicate_declaration() {
    let decls = vec![decl("x", ArgType::String), decl("x", ArgType::String)];
    let err = resolve_args(&decls, &supplied(&[("x", "1")])).unwrap_err();
    assert!(matches!(err, ArgError::DuplicateDeclaration { .. }));
}

// ============================================================================
// Choices
// ============================================================================

#[test]
fn choice_membership_accepted() {
    let mut d = decl("mode", ArgType::String);
    d.choices = vec!["safe".to_string(), "loud".to_string()];
    let args = resolve_args(&[d], &supplied(&[("mode", "loud")])).unwrap();
    assert_eq!(args.get("mode"), Some(&ArgValue::String("loud".to_string())));
}

#[test]
fn choice_violation_rejected() {
    let mut d = decl("mode", ArgType::String);
    d.choices = vec!["safe".to_string(), "loud".to_string()];
    let err = resolve_args(&[d], &supplied(&[("mode", "reckless")])).unwrap_err();
    assert!(matches!(err, ArgError::NotInChoices { value, .. } if value == "reckless"));
}

// ============================================================================
// Coercion
// ============================================================================

#[parameterized(
    word_true = { "true", true },
    word_false = { "false", false },
    upper_true = { "TRUE", true },
    mixed_yes = { "Yes", true },
    word_no = { "no", false },
    digit_one = { "1", true },
    digit_zero = { "0", false },
)]
fn bool_coercion(input: &str, expected: bool) {
    let args = resolve_args(&[decl("flag", ArgType::Bool)], &supplied(&[("flag", input)])).unwrap();
    assert_eq!(args.get("flag"), Some(&ArgValue::Bool(expected)));
}

#[test]
fn bool_rejects_garbage() {
    let err =
        resolve_args(&[decl("flag", ArgType::Bool)], &supplied(&[("flag", "maybe")])).unwrap_err();
    assert!(matches!(err, ArgError::InvalidBool { .. }));
}

#[test]
fn int_coercion() {
    let args = resolve_args(&[decl("n", ArgType::Int)], &supplied(&[("n", "42")])).unwrap();
    assert_eq!(args.get("n"), Some(&ArgValue::Int(42)));
}

#[test]
fn int_rejects_non_integer() {
    let err = resolve_args(&[decl("n", ArgType::Int)], &supplied(&[("n", "4.2")])).unwrap_err();
    assert!(matches!(err, ArgError::InvalidInt { .. }));
}

#[test]
fn path_becomes_absolute() {
    let args = resolve_args(&[decl("p", ArgType::Path)], &supplied(&[("p", "some/dir")])).unwrap();
    match args.get("p") {
        Some(ArgValue::Path(path)) => assert!(path.is_absolute()),
        other => panic!("expected path value, got {other:?}"),
    }
}

#[test]
fn path_expands_home() {
    let args = resolve_args(&[decl("p", ArgType::Path)], &supplied(&[("p", "~/notes")])).unwrap();
    match args.get("p") {
        Some(ArgValue::Path(path)) => {
            assert!(path.is_absolute());
            assert!(!path.display().to_string().contains('~'));
        }
        other => panic!("expected path value, got {other:?}"),
    }
}

// ============================================================================
// Template bindings
// ============================================================================

#[test]
fn binding_object_carries_types() {
    let decls = vec![decl("name", ArgType::String), decl("count", ArgType::Int)];
    let args = resolve_args(&decls, &supplied(&[("name", "x"), ("count", "3")])).unwrap();
    match args.to_binding() {
        crate::template::BindingValue::Object(map) => {
            assert_eq!(
                map.get("name"),
                Some(&crate::template::BindingValue::String("x".to_string()))
            );
            assert_eq!(
                map.get("count"),
                Some(&crate::template::BindingValue::Int(3))
            );
        }
        other => panic!("expected object binding, got {other:?}"),
    }
}
