/// SaC REPL
///
/// Reads cells from stdin, separated by blank lines, and feeds each one to a
/// compile-and-run session.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sacrepl_session::{split_flags, ProcessClassifier, Reply, Session, SessionOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sacrepl")]
#[command(about = "Interactive SaC - every cell is compiled and run with sac2c")]
#[command(version)]
struct Args {
    /// Compiler binary
    #[arg(long, value_name = "PATH", default_value = "sac2c")]
    compiler: PathBuf,

    /// Classifier program, called with the path of a file holding one cell
    #[arg(long, value_name = "PATH", default_value = "sac2c-classify")]
    classifier: PathBuf,

    /// Initial compiler flags, split shell-style (replaces the defaults)
    #[arg(long, value_name = "FLAGS", allow_hyphen_values = true)]
    flags: Option<String>,

    /// Flag appended to every compile, after the session flags
    #[arg(long = "extra-flag", value_name = "FLAG", allow_hyphen_values = true)]
    extra_flags: Vec<String>,

    /// Directory in which to create the scratch directory
    #[arg(long, value_name = "DIR")]
    scratch_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut options = SessionOptions::new()
        .compiler(args.compiler)
        .extra_flags(args.extra_flags);
    if let Some(flags) = args.flags {
        let flags = split_flags(&flags).context("unbalanced quotes in --flags")?;
        options = options.flags(flags);
    }
    if let Some(dir) = args.scratch_dir {
        options = options.scratch_parent(dir);
    }

    let classifier = ProcessClassifier::locate(&args.classifier)?;
    let mut session = Session::start(&options, classifier)?;
    tracing::info!("session started");

    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut cell = String::new();

    prompt(interactive, &cell)?;
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            if !cell.trim().is_empty() {
                report(&session.submit(&cell))?;
            }
            cell.clear();
        } else {
            cell.push_str(&line);
            cell.push('\n');
        }
        prompt(interactive, &cell)?;
    }
    if !cell.trim().is_empty() {
        report(&session.submit(&cell))?;
    }

    session.shutdown()?;
    Ok(())
}

fn prompt(interactive: bool, cell: &str) -> io::Result<()> {
    if !interactive {
        return Ok(());
    }
    let mut stdout = io::stdout();
    stdout.write_all(if cell.is_empty() { b"sac> " } else { b"...> " })?;
    stdout.flush()
}

/// Write a reply's streams, each terminated by a newline.
fn report(reply: &Reply) -> io::Result<()> {
    if !reply.stdout.is_empty() {
        let mut stdout = io::stdout().lock();
        stdout.write_all(reply.stdout.as_bytes())?;
        if !reply.stdout.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
        stdout.flush()?;
    }
    if !reply.stderr.is_empty() {
        let mut stderr = io::stderr().lock();
        stderr.write_all(reply.stderr.as_bytes())?;
        if !reply.stderr.ends_with('\n') {
            stderr.write_all(b"\n")?;
        }
    }
    Ok(())
}
