//! Error types for the session engine.

use std::fmt;

use thiserror::Error;

/// Errors that escape the session as `Err`.
///
/// Everything here is either fatal at startup (`ToolchainNotFound`) or an
/// I/O problem underneath a single build attempt. Ordinary compile and run
/// failures are reported through [`Failure`] instead.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The compiler or classifier could not be located.
    #[error("unable to find {tool} binary: {reason}")]
    ToolchainNotFound { tool: String, reason: String },

    /// Spawning a process or touching the scratch directory failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stream reader thread died before reaching end of stream.
    #[error("output reader for {0} panicked")]
    Capture(&'static str),
}

/// A recoverable failure of one submission.
///
/// The session stays usable after any of these, with its state identical to
/// the snapshot taken before the submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The classifier rejected the snippet.
    Classification { diagnostic: String },
    /// The classifier accepted the snippet but its verdict names no usable category.
    Unrecognized { diagnostic: String },
    /// The compiler exited with a nonzero code.
    Compile { exit_code: i32 },
    /// The produced executable exited with a nonzero code.
    Runtime { exit_code: i32 },
    /// The build could not be carried out at all.
    Build { message: String },
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Classification { diagnostic } => {
                write!(f, "classification failed: {}", diagnostic)
            }
            Failure::Unrecognized { diagnostic } => write!(f, "unrecognized input: {}", diagnostic),
            Failure::Compile { exit_code } => {
                write!(f, "compiler exited with code {}", exit_code)
            }
            Failure::Runtime { exit_code } => {
                write!(f, "executable exited with code {}", exit_code)
            }
            Failure::Build { message } => write!(f, "build error: {}", message),
        }
    }
}
