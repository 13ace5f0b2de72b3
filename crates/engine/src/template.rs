// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-phase template expansion for playbook documents.
//!
//! Phase (a) expands the whole document before structural parsing, binding
//! argument values only. References to step results (`Steps.*`) are swapped
//! for opaque sentinels before rendering and restored afterwards, so they
//! survive untouched into the parsed playbook.
//!
//! Phase (b) re-renders individual step fields just before the step runs,
//! binding arguments plus the results of already-executed steps.
//!
//! Dialect: `{{ Args.X }}` (a leading dot as in `{{.Args.X}}` is accepted
//! and normalized away), `{% for %}` / `{% if %}` control tags, and the
//! helpers `splitList`, `joinList`, `trim`, `lower`, `upper`, `contains`,
//! `default`.

use minijinja::{Environment, UndefinedBehavior, Value};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

// Allow expect here as the patterns are compile-time verified to be valid
#[allow(clippy::expect_used)]
static DOTTED_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(-?)\s*\.").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static STEP_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{[^{}]*\bSteps\.[^{}]*\}\}").expect("constant regex pattern is valid")
});

const GUARD_OPEN: char = '\u{1}';
const GUARD_CLOSE: char = '\u{2}';

/// Errors that can occur during template expansion.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Expression or tag does not parse
    #[error("template syntax error: {0}")]
    Syntax(String),

    /// Reference to a variable that is not bound
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    /// Helper misuse or other render failure
    #[error("template render error: {0}")]
    Render(String),
}

impl From<minijinja::Error> for TemplateError {
    fn from(err: minijinja::Error) -> Self {
        use minijinja::ErrorKind;
        match err.kind() {
            ErrorKind::SyntaxError => TemplateError::Syntax(err.to_string()),
            ErrorKind::UndefinedError => TemplateError::UndefinedVariable(err.to_string()),
            _ => TemplateError::Render(err.to_string()),
        }
    }
}

/// A value bound into the template context.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingValue {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<BindingValue>),
    Object(BTreeMap<String, BindingValue>),
}

impl BindingValue {
    fn to_value(&self) -> Value {
        match self {
            BindingValue::String(s) => Value::from(s.clone()),
            BindingValue::Int(n) => Value::from(*n),
            BindingValue::Bool(b) => Value::from(*b),
            BindingValue::List(items) => {
                Value::from(items.iter().map(BindingValue::to_value).collect::<Vec<_>>())
            }
            BindingValue::Object(map) => {
                Value::from_iter(map.iter().map(|(k, v)| (k.clone(), v.to_value())))
            }
        }
    }
}

/// Template context: top-level names bound for a render.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: BTreeMap<String, BindingValue>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a top-level name.
    pub fn set(&mut self, key: impl Into<String>, value: BindingValue) {
        self.values.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: BindingValue) -> Self {
        self.set(key, value);
        self
    }

    fn to_value(&self) -> Value {
        Value::from_iter(self.values.iter().map(|(k, v)| (k.clone(), v.to_value())))
    }
}

/// Renders template strings against a set of bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    fn create_env(&self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_filter("splitList", split_list);
        env.add_filter("joinList", join_list);
        env.add_filter("contains", contains);
        env
    }

    /// Render a single template string.
    pub fn render(&self, template: &str, bindings: &Bindings) -> Result<String, TemplateError> {
        let env = self.create_env();
        let normalized = normalize_dotted_refs(template);
        let tmpl = env.template_from_str(&normalized)?;
        Ok(tmpl.render(bindings.to_value())?)
    }

    /// Phase (a): expand a whole document with argument bindings only.
    ///
    /// `Steps.*` expressions are guarded so they pass through verbatim.
    pub fn expand_document(
        &self,
        text: &str,
        bindings: &Bindings,
    ) -> Result<String, TemplateError> {
        let normalized = normalize_dotted_refs(text);
        let (guarded, spans) = guard_step_refs(&normalized);
        let rendered = self.render(&guarded, bindings)?;
        Ok(restore_step_refs(&rendered, &spans))
    }
}

/// Normalize Go-style dotted references: `{{.Args.x}}` becomes `{{ Args.x }}`.
fn normalize_dotted_refs(text: &str) -> String {
    DOTTED_REF.replace_all(text, "{{${1} ").into_owned()
}

/// Replace every `Steps.*` expression with an opaque sentinel.
///
/// Returns the guarded text and the original expression spans, indexed by
/// sentinel number.
fn guard_step_refs(text: &str) -> (String, Vec<String>) {
    let mut spans = Vec::new();
    let guarded = STEP_REF
        .replace_all(text, |caps: &regex::Captures| {
            spans.push(caps[0].to_string());
            format!("{}{}{}", GUARD_OPEN, spans.len() - 1, GUARD_CLOSE)
        })
        .into_owned();
    (guarded, spans)
}

/// Swap sentinels back for their original expression text.
fn restore_step_refs(text: &str, spans: &[String]) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(GUARD_OPEN) {
        result.push_str(&rest[..start]);
        rest = &rest[start + GUARD_OPEN.len_utf8()..];
        match rest.find(GUARD_CLOSE) {
            Some(end) => {
                if let Ok(idx) = rest[..end].parse::<usize>() {
                    if let Some(span) = spans.get(idx) {
                        result.push_str(span);
                    }
                }
                rest = &rest[end + GUARD_CLOSE.len_utf8()..];
            }
            None => break,
        }
    }
    result.push_str(rest);
    result
}

/// Evaluate a rendered guard expression as a boolean.
///
/// Empty strings and the words `false`, `no`, `0` (case-insensitive) are
/// falsy; everything else is truthy.
pub fn is_truthy(rendered: &str) -> bool {
    let v = rendered.trim();
    !(v.is_empty() || v.eq_ignore_ascii_case("false") || v.eq_ignore_ascii_case("no") || v == "0")
}

fn split_list(value: String, delimiter: String) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(&delimiter).map(str::to_string).collect()
}

fn join_list(value: Vec<String>, delimiter: String) -> String {
    value.join(&delimiter)
}

fn contains(value: String, needle: String) -> bool {
    value.contains(&needle)
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
