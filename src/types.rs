// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Core types shared across the model-building pipeline.
*/

use std::path::PathBuf;

/// Stable index of a section within a morphology, assigned in first-seen order.
pub type SegmentId = usize;

/// Result type for configuration and model-building operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading input tables or assembling the cell model.
///
/// Every variant is fatal: a model built from inconsistent inputs is
/// unusable, so nothing here is retried. Variants carry enough context
/// (file, row, label) to diagnose the problem without re-running.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{row}: {detail}", .path.display())]
    MalformedRow {
        path: PathBuf,
        row: usize,
        detail: String,
    },

    #[error("{left} has {left_len} entries but {right} has {right_len} rows")]
    LengthMismatch {
        left: String,
        left_len: usize,
        right: String,
        right_len: usize,
    },

    #[error("{table} row {row}: column {column} must be {expected}, found {actual}")]
    SentinelViolation {
        table: String,
        row: usize,
        column: usize,
        expected: i64,
        actual: f64,
    },

    #[error("{table} row {row}: index {index} out of range (dendrite count {count})")]
    IndexOutOfRange {
        table: String,
        row: usize,
        index: i64,
        count: usize,
    },

    #[error("section '{0}' has no parent and is not the root")]
    UnparentedSection(String),

    #[error("section '{0}' is part of a parent cycle")]
    ParentCycle(String),

    #[error("undefined region label: {0}")]
    UndefinedLabel(String),

    #[error("mechanism '{mechanism}' uses ion '{ion}' which is not declared")]
    UndefinedIon { mechanism: String, ion: String },

    #[error("mechanism '{0}' does not define its insertion parameter")]
    MissingInsertionParam(String),

    #[error("config file not found: {0}")]
    FileNotFound(String),

    #[error("invalid TOML in {}: {detail}", .path.display())]
    InvalidToml { path: PathBuf, detail: String },

    #[error("malformed section report: {0}")]
    MalformedReport(String),
}
