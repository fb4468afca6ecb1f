//! Snippet classification.
//!
//! The parser that decides what a snippet is lives outside this crate. It is
//! consumed through the [`Classifier`] trait; [`ProcessClassifier`] drives an
//! external program that answers with a small JSON verdict.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;

use crate::capture::CapturedProcess;
use crate::error::SessionError;

/// The six mutually exclusive kinds of source snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Use,
    Import,
    Typedef,
    Function,
    Statement,
    Expression,
}

impl Category {
    /// All categories in program order.
    pub const ALL: [Category; 6] = [
        Category::Use,
        Category::Import,
        Category::Typedef,
        Category::Function,
        Category::Statement,
        Category::Expression,
    ];

    /// Map the classifier's numeric verdict onto a category.
    pub fn from_code(code: i64) -> Option<Category> {
        match code {
            1 => Some(Category::Expression),
            2 => Some(Category::Statement),
            3 => Some(Category::Function),
            4 => Some(Category::Typedef),
            5 => Some(Category::Import),
            6 => Some(Category::Use),
            _ => None,
        }
    }

    /// Whether definitions of this category are keyed by symbol name.
    pub fn is_symbol_keyed(self) -> bool {
        matches!(
            self,
            Category::Use | Category::Import | Category::Typedef | Category::Function
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Use => "use",
            Category::Import => "import",
            Category::Typedef => "typedef",
            Category::Function => "function",
            Category::Statement => "statement",
            Category::Expression => "expression",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Fail,
}

/// The classifier's verdict on one snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: Status,
    /// `None` when the verdict was ok but named no known category.
    pub category: Option<Category>,
    pub symbol: Option<String>,
    pub diagnostic: Option<String>,
}

impl Classification {
    pub fn ok(category: Category, symbol: Option<&str>) -> Self {
        Self {
            status: Status::Ok,
            category: Some(category),
            symbol: symbol.map(str::to_string),
            diagnostic: None,
        }
    }

    pub fn fail(diagnostic: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            category: None,
            symbol: None,
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// The diagnostic text, or an empty string.
    pub fn diagnostic(&self) -> &str {
        self.diagnostic.as_deref().unwrap_or("")
    }

    /// Parse the classifier's JSON wire format.
    ///
    /// Anything that is not a valid verdict becomes a failed classification.
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str::<WireVerdict>(text) {
            Ok(verdict) => verdict.into(),
            Err(_) => Classification::fail(format!("cannot parse json: {}", text.trim())),
        }
    }
}

/// JSON shape emitted by the classifier program.
#[derive(Debug, Deserialize)]
struct WireVerdict {
    status: String,
    #[serde(default)]
    ret: Option<i64>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
}

impl From<WireVerdict> for Classification {
    fn from(wire: WireVerdict) -> Self {
        if wire.status != "ok" {
            return Classification {
                status: Status::Fail,
                category: None,
                symbol: None,
                diagnostic: Some(wire.stderr.unwrap_or_default()),
            };
        }
        Classification {
            status: Status::Ok,
            category: wire.ret.and_then(Category::from_code),
            symbol: wire.symbol.filter(|s| !s.is_empty()),
            diagnostic: wire.stderr.filter(|s| !s.is_empty()),
        }
    }
}

/// Decides which category a snippet belongs to.
pub trait Classifier {
    fn classify(&mut self, snippet: &str) -> Classification;
}

impl<F> Classifier for F
where
    F: FnMut(&str) -> Classification,
{
    fn classify(&mut self, snippet: &str) -> Classification {
        self(snippet)
    }
}

/// Classifier backed by an external program.
///
/// The program is invoked as `<program> <args...> <snippet-file>` and must
/// print one JSON verdict on stdout.
#[derive(Debug, Clone)]
pub struct ProcessClassifier {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessClassifier {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Resolve `program` on `PATH`.
    pub fn locate(program: impl AsRef<OsStr>) -> crate::Result<Self> {
        let program = program.as_ref();
        let path = which::which(program).map_err(|e| SessionError::ToolchainNotFound {
            tool: program.to_string_lossy().into_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(path))
    }

    /// Add an argument placed before the snippet path.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn run(&self, snippet: &str) -> crate::Result<Classification> {
        let mut file = tempfile::Builder::new()
            .prefix("snippet")
            .suffix(".sac")
            .tempfile()?;
        file.write_all(snippet.as_bytes())?;
        file.flush()?;

        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(file.path());
        let dir = std::env::temp_dir();
        let output = CapturedProcess::start(command, &dir)?.run_to_completion()?;

        if !output.success() {
            return Ok(Classification::fail(format!(
                "classifier exited with code {}\n{}",
                output.exit_code, output.stderr
            )));
        }
        Ok(Classification::from_json(&output.stdout))
    }
}

impl Classifier for ProcessClassifier {
    fn classify(&mut self, snippet: &str) -> Classification {
        match self.run(snippet) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!("classifier {} failed: {}", self.program.display(), e);
                Classification::fail(e.to_string())
            }
        }
    }
}
