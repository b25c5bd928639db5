//! Crate-wide error taxonomy.
//!
//! Every public entry point returns `Result<T>` with this single `Error`
//! type. There is no per-module error type: all failure modes funnel up to
//! one of the variants below, matching the taxonomy a caller actually needs
//! to branch on (parse vs. pattern vs. memory vs. depth).

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// A single tagged error, covering every failure mode a public entry point
/// can return.
#[derive(Debug)]
pub enum Error {
    /// Null/empty input, or the input text failed to parse as JSON.
    InvalidInput(String),
    /// A regex pattern failed to compile, or violated the length bounds in
    /// `regex_engine`.
    InvalidPattern(String),
    /// An allocation failed: arena growth, slab overflow with no fallback
    /// available, or a queue node could not be boxed.
    OutOfMemory(String),
    /// A flattened key path exceeded `EngineOptions::max_path_depth` bytes.
    DepthExceeded(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Error::InvalidPattern(msg) => write!(f, "invalid pattern: {msg}"),
            Error::OutOfMemory(msg) => write!(f, "out of memory: {msg}"),
            Error::DepthExceeded(msg) => write!(f, "path depth exceeded: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub(crate) fn invalid_input<M: Into<String>>(msg: M) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub(crate) fn invalid_pattern<M: Into<String>>(msg: M) -> Self {
        Error::InvalidPattern(msg.into())
    }

    pub(crate) fn depth_exceeded<M: Into<String>>(msg: M) -> Self {
        Error::DepthExceeded(msg.into())
    }
}
