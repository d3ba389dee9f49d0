//! Error taxonomy for the memory scanner.
//!
//! Every fallible operation in the crate returns this enum instead of
//! a loose `anyhow::Error`; the shell layer wraps it in `anyhow` only
//! where it needs to mix in I/O errors from the REPL loop itself.

use thiserror::Error;

use crate::value::{CompareOp, ValueType};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // ---- lifecycle ----
    #[error("not attached to a target")]
    NotAttached,

    #[error("already attached to pid {0}")]
    AlreadyAttached(u32),

    #[error("no prior scan results; run `scan` first")]
    NoPriorResults,

    #[error("next-scan type {found:?} does not match current result type {expected:?}")]
    TypeMismatch {
        expected: ValueType,
        found: ValueType,
    },

    #[error("operator {op:?} is not supported for type {ty:?}")]
    UnsupportedOp { op: CompareOp, ty: ValueType },

    // ---- OS ----
    #[error("permission denied opening pid {pid}")]
    PermissionDenied { pid: u32 },

    #[error("no such process: {pid}")]
    NotFound { pid: u32 },

    #[error("could not read {len} bytes at {addr:#x}")]
    Unreadable { addr: usize, len: usize },

    #[error("could not write {len} bytes at {addr:#x}")]
    Unwritable { addr: usize, len: usize },

    #[error("short read at {addr:#x}: expected {expected} bytes, got {got}")]
    SizeMismatch {
        addr: usize,
        expected: usize,
        got: usize,
    },

    // ---- user input ----
    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("unknown operator '{0}'")]
    UnknownOp(String),

    #[error("malformed literal '{literal}' for type {ty:?}")]
    MalformedLiteral { literal: String, ty: ValueType },

    #[error("value '{literal}' out of range for type {ty:?}")]
    OutOfRange { literal: String, ty: ValueType },

    #[error("missing argument: {0}")]
    MissingArgument(String),

    // ---- capacity (informational) ----
    #[error("result set truncated at {cap} candidates")]
    ResultSetTruncated { cap: usize },

    // ---- misc OS ----
    #[error("process enumeration failed")]
    EnumerationFailed,

    #[error("no process named '{0}'")]
    NoSuchProcessName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed save file at line {line}: {reason}")]
    MalformedSaveFile { line: usize, reason: String },
}
