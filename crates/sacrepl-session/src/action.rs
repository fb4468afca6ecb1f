//! The action registry: every kind of input the session recognises, in
//! priority order. The first action that matches a submission handles it.

use crate::classify::{Category, Classification, Classifier};
use crate::command::SessionCommand;
use crate::error::Failure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Command(SessionCommand),
    Source(Category),
}

/// Commands first, then source categories in program order.
pub const REGISTRY: [Action; 10] = [
    Action::Command(SessionCommand::Help),
    Action::Command(SessionCommand::Print),
    Action::Command(SessionCommand::Flags),
    Action::Command(SessionCommand::SetFlags),
    Action::Source(Category::Use),
    Action::Source(Category::Import),
    Action::Source(Category::Typedef),
    Action::Source(Category::Function),
    Action::Source(Category::Statement),
    Action::Source(Category::Expression),
];

/// The action chosen for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Selection<'a> {
    Command {
        command: SessionCommand,
        args: &'a str,
    },
    Source {
        category: Category,
        classification: Classification,
    },
    Rejected(Failure),
}

/// Walk the registry and pick the first matching action.
///
/// The classifier runs at most once, and only when no command matched.
pub(crate) fn select<'a, C>(input: &'a str, classifier: &mut C) -> Selection<'a>
where
    C: Classifier + ?Sized,
{
    let mut cached: Option<Classification> = None;

    for action in REGISTRY {
        match action {
            Action::Command(command) => {
                if let Some(args) = command.strip(input) {
                    return Selection::Command { command, args };
                }
            }
            Action::Source(category) => {
                let verdict = cached.get_or_insert_with(|| classifier.classify(input));
                if !verdict.is_ok() {
                    return Selection::Rejected(Failure::Classification {
                        diagnostic: verdict.diagnostic().to_string(),
                    });
                }
                if verdict.category == Some(category) {
                    return Selection::Source {
                        category,
                        classification: verdict.clone(),
                    };
                }
            }
        }
    }

    let diagnostic = cached
        .as_ref()
        .map(|verdict| verdict.diagnostic().to_string())
        .unwrap_or_default();
    Selection::Rejected(Failure::Unrecognized { diagnostic })
}
