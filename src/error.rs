//! Typed errors for problems the pipeline must refuse to continue past.
//! They travel inside `anyhow::Error`; callers can `downcast_ref::<SchemaError>()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{table} table ({path}) is missing required column `{column}`")]
    MissingColumn { table: &'static str, path: PathBuf, column: String },

    #[error("column `{column}` not present in {table} table")]
    MissingFrameColumn { table: &'static str, column: String },

    #[error("{table} table ({path}) has no header row")]
    NoHeader { table: &'static str, path: PathBuf },

    #[error("row {row} of {table} table: cannot parse `{value}` as {expected} in column `{column}`")]
    BadValue { table: &'static str, row: u64, column: String, value: String, expected: &'static str },

    #[error("no raw dump files matching `{prefix}*` under {dir}")]
    NoDumps { prefix: &'static str, dir: PathBuf },
}
