//! Build-then-run of one complete program.

use std::io::Write;
use std::process::Command;

use crate::capture::CapturedProcess;
use crate::error::{Failure, SessionError};
use crate::toolchain::Toolchain;

/// Result of one compile-and-run attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    pub failure: Option<Failure>,
    pub stdout: String,
    pub stderr: String,
}

impl BuildOutcome {
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Outcome for a build that could not be carried out at all.
    pub fn broken(error: &SessionError) -> Self {
        Self {
            failure: Some(Failure::Build {
                message: error.to_string(),
            }),
            stdout: String::new(),
            stderr: format!("[sacrepl] {}\n", error),
        }
    }

    fn append(&mut self, stdout: &str, stderr: &str) {
        self.stdout.push_str(stdout);
        self.stderr.push_str(stderr);
    }

    fn fail(&mut self, failure: Failure, note: &str) {
        if !self.stderr.is_empty() && !self.stderr.ends_with('\n') {
            self.stderr.push('\n');
        }
        self.stderr.push_str("[sacrepl] ");
        self.stderr.push_str(note);
        self.stderr.push('\n');
        self.failure = Some(failure);
    }
}

/// Drives the compiler and the produced executable.
#[derive(Debug)]
pub struct Orchestrator {
    toolchain: Toolchain,
}

impl Orchestrator {
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Write `source` to a fresh file, compile it with `flags`, and run the
    /// result if compilation succeeded.
    ///
    /// Output from both steps is kept, compiler output first.
    pub fn build_and_run(&mut self, source: &str, flags: &[String]) -> crate::Result<BuildOutcome> {
        let (mut file, source_path) = self.toolchain.new_artifact(".sac")?;
        file.write_all(source.as_bytes())?;
        file.flush()?;
        drop(file);
        let (_, binary) = self.toolchain.new_artifact(".exe")?;

        let dir = self.toolchain.scratch_dir().to_path_buf();
        let command = self.toolchain.compile_command(&source_path, &binary, flags);
        tracing::debug!(
            "compiling {} with {}",
            source_path.display(),
            self.toolchain.compiler().display()
        );
        let compiled = CapturedProcess::start(command, &dir)?.run_to_completion()?;

        let mut outcome = BuildOutcome::default();
        outcome.append(&compiled.stdout, &compiled.stderr);
        if !compiled.success() {
            tracing::debug!("compiler exited with code {}", compiled.exit_code);
            outcome.fail(
                Failure::Compile {
                    exit_code: compiled.exit_code,
                },
                &format!(
                    "compiler exited with code {}, the executable will not be executed",
                    compiled.exit_code
                ),
            );
            return Ok(outcome);
        }

        let ran = CapturedProcess::start(Command::new(&binary), &dir)?.run_to_completion()?;
        outcome.append(&ran.stdout, &ran.stderr);
        if !ran.success() {
            tracing::debug!("executable exited with code {}", ran.exit_code);
            outcome.fail(
                Failure::Runtime {
                    exit_code: ran.exit_code,
                },
                &format!("executable exited with code {}", ran.exit_code),
            );
        }

        Ok(outcome)
    }

    /// Tear down the toolchain, removing all scratch artifacts.
    pub fn shutdown(self) -> crate::Result<()> {
        self.toolchain.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_note_starts_on_new_line() {
        let mut outcome = BuildOutcome::default();
        outcome.append("", "error: bad token");
        outcome.fail(Failure::Compile { exit_code: 2 }, "compiler exited with code 2");
        assert_eq!(
            outcome.stderr,
            "error: bad token\n[sacrepl] compiler exited with code 2\n"
        );
        assert!(outcome.failed());
    }

    #[test]
    fn test_broken_outcome_is_failed() {
        let error = SessionError::Io(std::io::Error::other("disk full"));
        let outcome = BuildOutcome::broken(&error);
        assert!(outcome.failed());
        assert!(outcome.stderr.contains("disk full"));
    }
}
