//! The external compiler and the scratch directory it works in.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::SessionError;

/// Flags every session starts with. Array bound checks stay on.
pub const DEFAULT_FLAGS: [&str; 8] = [
    "-v0",
    "-O0",
    "-noprelude",
    "-noinl",
    "-maxspec",
    "0",
    "-check",
    "tc",
];

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Compiler program, looked up on `PATH` unless it is a path.
    pub compiler: PathBuf,
    /// Arguments placed before everything else on the compiler command line.
    pub compiler_args: Vec<String>,
    /// Initial session flags, replaceable with `%setflags`.
    pub flags: Vec<String>,
    /// Flags appended after the session flags on every compile.
    pub extra_flags: Vec<String>,
    /// Where to create the scratch directory. Defaults to the system temp dir.
    pub scratch_parent: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from("sac2c"),
            compiler_args: Vec::new(),
            flags: DEFAULT_FLAGS.iter().map(|f| f.to_string()).collect(),
            extra_flags: Vec::new(),
            scratch_parent: None,
        }
    }
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compiler(mut self, compiler: impl Into<PathBuf>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn compiler_args(mut self, args: Vec<String>) -> Self {
        self.compiler_args = args;
        self
    }

    pub fn flags(mut self, flags: Vec<String>) -> Self {
        self.flags = flags;
        self
    }

    pub fn extra_flags(mut self, flags: Vec<String>) -> Self {
        self.extra_flags = flags;
        self
    }

    pub fn scratch_parent(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_parent = Some(dir.into());
        self
    }
}

/// Handle on the external toolchain for the lifetime of one session.
///
/// Owns the scratch directory. Every build attempt leaves a source file and
/// a binary in it; they stay until [`shutdown`](Self::shutdown) (or drop)
/// removes the whole directory.
#[derive(Debug)]
pub struct Toolchain {
    compiler: PathBuf,
    compiler_args: Vec<String>,
    extra_flags: Vec<String>,
    scratch: tempfile::TempDir,
    artifacts: Vec<PathBuf>,
}

impl Toolchain {
    /// Locate the compiler and create a fresh scratch directory.
    pub fn init(options: &SessionOptions) -> crate::Result<Self> {
        let compiler =
            which::which(&options.compiler).map_err(|e| SessionError::ToolchainNotFound {
                tool: options.compiler.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("sacrepl-");
        let scratch = match &options.scratch_parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };

        tracing::info!(
            "using compiler {} with scratch directory {}",
            compiler.display(),
            scratch.path().display()
        );

        Ok(Self {
            compiler,
            compiler_args: options.compiler_args.clone(),
            extra_flags: options.extra_flags.clone(),
            scratch,
            artifacts: Vec::new(),
        })
    }

    pub fn compiler(&self) -> &Path {
        &self.compiler
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Every file created so far, oldest first.
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// Create a uniquely named file in the scratch directory that survives
    /// until shutdown.
    pub fn new_artifact(&mut self, suffix: &str) -> crate::Result<(File, PathBuf)> {
        let (file, path) = tempfile::Builder::new()
            .prefix("cell")
            .suffix(suffix)
            .tempfile_in(self.scratch.path())?
            .keep()
            .map_err(|e| e.error)?;
        self.artifacts.push(path.clone());
        Ok((file, path))
    }

    /// `<compiler> <compiler-args> -o <binary> <flags> <extra-flags> <source>`
    pub fn compile_command(&self, source: &Path, binary: &Path, flags: &[String]) -> Command {
        let mut command = Command::new(&self.compiler);
        command
            .args(&self.compiler_args)
            .arg("-o")
            .arg(binary)
            .args(flags)
            .args(&self.extra_flags)
            .arg(source);
        command
    }

    /// Remove the scratch directory and everything in it.
    pub fn shutdown(self) -> crate::Result<()> {
        let dir = self.scratch.path().to_path_buf();
        self.scratch.close().map_err(|e| {
            SessionError::Io(io::Error::new(
                e.kind(),
                format!("cannot remove {}: {}", dir.display(), e),
            ))
        })?;
        tracing::info!(
            "removed scratch directory {} ({} artifacts)",
            dir.display(),
            self.artifacts.len()
        );
        Ok(())
    }
}
