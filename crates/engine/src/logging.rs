// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log dividers emitted between steps and between run phases.

const THIN: &str = "----------------------------------------------------------";
const THICK: &str = "==========================================================";

pub fn divider_thin() {
    tracing::info!("{}", THIN);
}

pub fn divider_thick() {
    tracing::info!("{}", THICK);
}
