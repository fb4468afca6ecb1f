//! Incremental compile-and-run session engine.
//!
//! Each submitted snippet is classified, tentatively merged into an
//! accumulated program, compiled and executed by the external SaC toolchain,
//! and kept only if both steps succeed. On failure the session is restored to
//! the state it had before the submission.

mod action;
mod capture;
mod classify;
mod command;
mod error;
mod orchestrator;
mod session;
mod store;
mod synth;
mod toolchain;

pub use action::{Action, REGISTRY};
pub use capture::{CapturedOutput, CapturedProcess, Chunk};
pub use classify::{Category, Classification, Classifier, ProcessClassifier, Status};
pub use command::{split_flags, SessionCommand, HELP_TEXT};
pub use error::{Failure, SessionError};
pub use orchestrator::{BuildOutcome, Orchestrator};
pub use session::{Disposition, Reply, Session};
pub use store::{ExpressionSlot, StatementLog, Stores, SymbolStore, Undo};
pub use synth::{synthesize, PRINT_PLACEHOLDER};
pub use toolchain::{SessionOptions, Toolchain, DEFAULT_FLAGS};

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
