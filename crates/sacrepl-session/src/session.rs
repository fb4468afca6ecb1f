//! The session: dispatches submissions and runs the commit/revert
//! transaction around every build.

use crate::action::{self, Selection};
use crate::classify::{Category, Classification, Classifier};
use crate::command::{split_flags, SessionCommand, HELP_TEXT};
use crate::error::Failure;
use crate::orchestrator::{BuildOutcome, Orchestrator};
use crate::store::Stores;
use crate::synth::{synthesize, PRINT_PLACEHOLDER};
use crate::toolchain::{SessionOptions, Toolchain};

/// How a submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A session command ran; no build took place.
    Command,
    /// Build and run succeeded; the new state was kept.
    Committed(Category),
    /// Build or run failed; the old state was restored.
    RolledBack(Category),
    /// The input was not recognised; nothing changed.
    Rejected,
}

/// What a submission produced for the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub disposition: Disposition,
    pub stdout: String,
    pub stderr: String,
    pub failure: Option<Failure>,
}

impl Reply {
    fn command(stdout: impl Into<String>) -> Self {
        Self {
            disposition: Disposition::Command,
            stdout: stdout.into(),
            stderr: String::new(),
            failure: None,
        }
    }

    fn rejected(failure: Failure) -> Self {
        let diagnostic = match &failure {
            Failure::Classification { diagnostic } | Failure::Unrecognized { diagnostic } => {
                diagnostic.as_str()
            }
            _ => "",
        };
        let stderr = format!(
            "[sacrepl] This is not an expression, statement, function, use, import or typedef\n{}",
            diagnostic
        );
        Self {
            disposition: Disposition::Rejected,
            stdout: String::new(),
            stderr,
            failure: Some(failure),
        }
    }

    /// A recognised session command whose arguments were unusable.
    fn command_error(message: String) -> Self {
        Self {
            disposition: Disposition::Rejected,
            stdout: String::new(),
            stderr: format!("[sacrepl] {}\n", message),
            failure: Some(Failure::Unrecognized {
                diagnostic: message,
            }),
        }
    }

    /// True unless the submission failed in some way.
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// An interactive compilation session.
pub struct Session<C> {
    classifier: C,
    orchestrator: Orchestrator,
    flags: Vec<String>,
    stores: Stores,
}

impl<C: Classifier> Session<C> {
    /// Initialise the toolchain and start an empty session.
    pub fn start(options: &SessionOptions, classifier: C) -> crate::Result<Self> {
        let toolchain = Toolchain::init(options)?;
        Ok(Self::new(
            Orchestrator::new(toolchain),
            classifier,
            options.flags.clone(),
        ))
    }

    pub fn new(orchestrator: Orchestrator, classifier: C, flags: Vec<String>) -> Self {
        Self {
            classifier,
            orchestrator,
            flags,
            stores: Stores::new(),
        }
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn toolchain(&self) -> &Toolchain {
        self.orchestrator.toolchain()
    }

    /// The program as `%print` shows it.
    pub fn program(&self) -> String {
        synthesize(&self.stores, PRINT_PLACEHOLDER)
    }

    /// Process one submission to completion.
    pub fn submit(&mut self, snippet: &str) -> Reply {
        match action::select(snippet, &mut self.classifier) {
            Selection::Command { command, args } => self.run_command(command, args),
            Selection::Source {
                category,
                classification,
            } => self.transact(category, &classification, snippet),
            Selection::Rejected(failure) => {
                tracing::warn!("rejected submission: {}", failure);
                Reply::rejected(failure)
            }
        }
    }

    fn run_command(&mut self, command: SessionCommand, args: &str) -> Reply {
        tracing::debug!("running {}", command.magic());
        match command {
            SessionCommand::Help => Reply::command(HELP_TEXT),
            SessionCommand::Print => Reply::command(self.program()),
            SessionCommand::Flags => Reply::command(self.flags.join(" ")),
            SessionCommand::SetFlags => match split_flags(args) {
                Some(flags) => {
                    self.flags = flags;
                    Reply::command("")
                }
                None => {
                    tracing::warn!("ignoring %setflags with unbalanced quotes");
                    Reply::command_error(format!("%setflags: unbalanced quotes in `{}`", args))
                }
            },
        }
    }

    /// Apply the candidate, build, then keep or undo it.
    ///
    /// Expressions are always undone: they only exist to be printed by the
    /// one run that consumes them.
    fn transact(
        &mut self,
        category: Category,
        classification: &Classification,
        snippet: &str,
    ) -> Reply {
        let text = snippet.trim_end();
        let symbol = classification.symbol.as_deref();

        let Some(undo) = self.stores.apply(category, symbol, text) else {
            return Reply::rejected(Failure::Unrecognized {
                diagnostic: format!("classifier named no symbol for this {}", category),
            });
        };
        tracing::debug!(%category, symbol = symbol.unwrap_or(""), "applied candidate");

        let program = synthesize(&self.stores, "");
        let outcome = match self.orchestrator.build_and_run(&program, &self.flags) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("build could not be carried out: {}", e);
                BuildOutcome::broken(&e)
            }
        };

        let failed = outcome.failed();
        if failed || category == Category::Expression {
            self.stores.revert(undo);
        }

        let disposition = if failed {
            tracing::warn!(%category, "rolled back");
            Disposition::RolledBack(category)
        } else {
            tracing::debug!(%category, "committed");
            Disposition::Committed(category)
        };

        Reply {
            disposition,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            failure: outcome.failure,
        }
    }

    /// End the session, removing every scratch artifact.
    pub fn shutdown(self) -> crate::Result<()> {
        self.orchestrator.shutdown()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// A session whose "compiler" is `true`: every build fails at run time
    /// because the empty binary it leaves behind cannot be executed.
    fn session_with<C: Classifier>(classifier: C) -> Session<C> {
        let options = SessionOptions::new().compiler("true");
        Session::start(&options, classifier).unwrap()
    }

    #[test]
    fn test_help_and_flags_commands() {
        let mut session = session_with(|_: &str| Classification::fail("unused"));
        let reply = session.submit("%help");
        assert_eq!(reply.disposition, Disposition::Command);
        assert!(reply.stdout.contains("%setflags"));

        let reply = session.submit("%flags");
        assert_eq!(reply.stdout, "-v0 -O0 -noprelude -noinl -maxspec 0 -check tc");
    }

    #[test]
    fn test_setflags_round_trip() {
        let mut session = session_with(|_: &str| Classification::fail("unused"));
        let reply = session.submit("%setflags -O1");
        assert!(reply.is_ok());
        assert_eq!(session.submit("%flags").stdout, "-O1");

        session.submit("%setflags");
        assert_eq!(session.submit("%flags").stdout, "");
    }

    #[test]
    fn test_setflags_unbalanced_quotes_keeps_flags() {
        let mut session = session_with(|_: &str| Classification::fail("unused"));
        let reply = session.submit("%setflags -D 'oops");
        assert_eq!(reply.disposition, Disposition::Rejected);
        assert_eq!(
            reply.stderr,
            "[sacrepl] %setflags: unbalanced quotes in `-D 'oops`\n"
        );
        assert!(!reply.stderr.contains("This is not an expression"));
        assert_eq!(session.flags().len(), 8);
    }

    #[test]
    fn test_missing_symbol_rejected() {
        let mut session = session_with(|_: &str| Classification::ok(Category::Function, None));
        let before = session.stores().clone();
        let reply = session.submit("int f() { return 0; }");
        assert_eq!(reply.disposition, Disposition::Rejected);
        assert_eq!(session.stores(), &before);
    }

    #[test]
    fn test_failed_run_rolls_back() {
        let mut session =
            session_with(|_: &str| Classification::ok(Category::Function, Some("f")));
        let before = session.stores().clone();
        let reply = session.submit("int f() { return 0; }");
        assert_eq!(reply.disposition, Disposition::RolledBack(Category::Function));
        assert_eq!(session.stores(), &before);
    }
}
