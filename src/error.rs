//! Error taxonomy for the splitter, following the domain split from the design: failures that
//! prevent the run from starting at all versus failures that are recorded in-stream against a
//! single record and counted.

use std::io;
use std::path::PathBuf;

/// Top-level error type. Every fallible operation in this crate returns one of these variants (or
/// wraps one via `#[from]`), matching the one-enum-per-crate shape used by the teacher's parser
/// crate (`parser::format::ParseError`).
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("failed to open input '{path}': {source}")]
    InputOpen { path: PathBuf, source: io::Error },

    #[error("failed to open or write shard file '{path}': {source}")]
    Output { path: PathBuf, source: io::Error },

    #[error("unrecoverable parse error: {0}")]
    UnrecoverableParse(String),
}

/// Errors that prevent a run from starting: rejected at argument-validation time, before any
/// input byte is read.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("--addEntriesOutsideSplitBaseDNToAllSets and --addEntriesOutsideSplitBaseDNToDedicatedSet are mutually exclusive")]
    ConflictingOutsideHandling,

    #[error("--targetLDIFBasePath is required when more than one --sourceLDIF is given")]
    MissingTargetBasePath,

    #[error("numSets must be at least 2, got {0}")]
    TooFewShards(u32),

    #[error("filter strategy requires at least 2 filters, got {0}")]
    TooFewFilters(usize),

    #[error("duplicate filter (by canonical form): {0}")]
    DuplicateFilter(String),

    #[error("invalid split base DN '{0}': {1}")]
    InvalidSplitBaseDn(String, String),

    #[error("--numThreads must be at least 1, got {0}")]
    TooFewThreads(u32),

    #[error("failed to parse filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },
}

/// Errors loading or parsing the optional schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("no schema files found under '{0}'")]
    NoSchemaFiles(PathBuf),

    #[error("failed to read schema file '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },
}

/// A record-local failure, recorded against a single entry rather than aborting the run. The
/// dispatcher turns these into synthetic `.errors` records and keeps going (except for
/// `Unrecoverable`, which stops the read loop).
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecordError {
    #[error("malformed LDIF record: {0}")]
    Recoverable(String),

    #[error("input stream integrity lost: {0}")]
    Unrecoverable(String),

    #[error("entry has no parent in a previously-seen shard")]
    NoParent,
}
