// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw playbook types that mirror the YAML document exactly.
//!
//! These types are used for parsing only. They are converted to validated
//! runtime types ([`crate::step::Step`], [`crate::ttp::Ttp`]) by the loader
//! after the document has been template-expanded.

use crate::args::ArgDecl;
use crate::checks::Requirements;
use crate::ttp::MitreAttack;
use serde::Deserialize;
use std::collections::BTreeMap;

/// The full playbook document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTtp {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub args: Vec<ArgDecl>,
    #[serde(default)]
    pub requirements: Option<Requirements>,
    #[serde(default)]
    pub mitre: Option<MitreAttack>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub steps: Vec<RawStep>,
}

/// The document preamble: everything above the `steps:` key.
///
/// Decoded from the raw (pre-expansion) text so argument declarations are
/// available before the template pass runs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPreamble {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub args: Vec<ArgDecl>,
    #[serde(default)]
    pub requirements: Option<Requirements>,
    #[serde(default)]
    pub mitre: Option<MitreAttack>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A single step as written in the document.
///
/// Exactly one action-selector key must be present; the shared keys
/// (`env`, `cleanup`, `success_checks`, `chdir`, `outputs`, `if`,
/// `timeout_seconds`) apply to any action. Supporting fields such as
/// `contents` or `edits` are only legal next to their selector.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStep {
    pub name: String,

    // Action selectors (exactly one).
    /// Shell command run through an interpreter.
    pub shell: Option<String>,
    /// Alias for `shell`.
    pub inline: Option<String>,
    /// Path of a file to create.
    pub create_file: Option<String>,
    /// Path of a file to edit in place.
    pub edit_file: Option<String>,
    /// Source path to copy.
    pub copy_path: Option<String>,
    /// Path to delete.
    pub remove_path: Option<String>,
    /// URI to download.
    pub fetch_uri: Option<String>,
    /// Message to emit to the log sink.
    pub print_str: Option<String>,
    /// Path of a nested playbook to run.
    pub ttp: Option<String>,

    // Supporting fields, legal only with their selector.
    /// create_file: file contents.
    pub contents: Option<String>,
    /// create_file / copy_path / fetch_uri: replace an existing destination.
    #[serde(default)]
    pub overwrite: bool,
    /// edit_file: ordered edit operations.
    #[serde(default)]
    pub edits: Vec<RawEdit>,
    /// copy_path: destination path.
    pub to: Option<String>,
    /// remove_path: delete directories recursively.
    #[serde(default)]
    pub recursive: bool,
    /// fetch_uri: destination path for the download.
    pub location: Option<String>,
    /// ttp: argument bindings for the nested playbook.
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    /// shell / inline: interpreter to use (defaults to `sh`).
    pub executor: Option<String>,

    // Shared step keys.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    pub cleanup: Option<RawCleanup>,
    #[serde(default)]
    pub success_checks: Vec<RawCheck>,
    pub chdir: Option<String>,
    #[serde(default)]
    pub outputs: Vec<RawOutputSpec>,
    #[serde(rename = "if")]
    pub guard: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Step cleanup: the literal token `default` or an inline action.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCleanup {
    Token(String),
    Action(Box<RawCleanupAction>),
}

/// An inline cleanup action: the action-selector subset of a step.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCleanupAction {
    pub shell: Option<String>,
    pub inline: Option<String>,
    pub create_file: Option<String>,
    pub edit_file: Option<String>,
    pub copy_path: Option<String>,
    pub remove_path: Option<String>,
    pub fetch_uri: Option<String>,
    pub print_str: Option<String>,

    pub contents: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub edits: Vec<RawEdit>,
    pub to: Option<String>,
    #[serde(default)]
    pub recursive: bool,
    pub location: Option<String>,
    pub executor: Option<String>,
}

/// A single edit operation inside an `edit_file` step.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEdit {
    /// Remove all matches; lines emptied by a removal are dropped.
    pub delete: Option<String>,
    /// Add a single line with a trailing newline.
    pub append: Option<String>,
    /// Substitute all matches with `with`.
    pub replace: Option<String>,
    #[serde(rename = "with")]
    pub with_text: Option<String>,
    /// Treat the pattern as a regular expression.
    #[serde(default)]
    pub regexp: bool,
}

/// A post-execution success check.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCheck {
    pub msg: Option<String>,
    pub file_exists: Option<String>,
    pub file_contains: Option<String>,
    /// file_contains: the string that must be present.
    pub value: Option<String>,
    /// Command that must exit zero.
    pub command: Option<String>,
}

/// A named output filter chain applied to a step's stdout.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawOutputSpec {
    pub name: String,
    #[serde(default)]
    pub filters: Vec<RawFilter>,
}

/// A single output filter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFilter {
    /// Dotted path into JSON stdout.
    pub json: Option<String>,
}
