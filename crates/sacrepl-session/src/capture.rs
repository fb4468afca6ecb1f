//! Real-time capture of a child process's stdout and stderr.
//!
//! Each stream gets its own reader thread that pushes fixed-size chunks onto
//! an unbounded channel. The owning thread polls liveness and drains both
//! channels on every iteration, so a child that fills one pipe while the other
//! stays idle never stalls.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::SessionError;

/// Size of a single read from a child's pipe.
const CHUNK_SIZE: usize = 4096;

/// How long the owner sleeps between liveness polls.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Bytes drained from both streams in one call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Chunk {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

/// Everything a finished child wrote, plus its exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// One stream's reader thread and the receiving end of its queue.
struct Reader {
    name: &'static str,
    rx: Receiver<Vec<u8>>,
    handle: Option<JoinHandle<()>>,
}

impl Reader {
    fn spawn<R>(name: &'static str, stream: R) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("capture-{}", name))
            .spawn(move || pump(stream, tx))?;
        Ok(Self {
            name,
            rx,
            handle: Some(handle),
        })
    }

    fn drain_into(&self, buf: &mut Vec<u8>) {
        while let Ok(bytes) = self.rx.try_recv() {
            buf.extend_from_slice(&bytes);
        }
    }

    fn join(&mut self) -> crate::Result<()> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| SessionError::Capture(self.name)),
            None => Ok(()),
        }
    }
}

/// Read `stream` until end of file, forwarding every chunk.
fn pump<R: Read>(mut stream: R, tx: Sender<Vec<u8>>) {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    // The handle was dropped; nobody is listening any more.
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("stream read failed: {}", e);
                break;
            }
        }
    }
}

/// Exit code of a finished process. Signals map to their negated number.
fn exit_code_of(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    status.code().unwrap_or(-1)
}

/// Start a reader thread on each of the child's output pipes.
fn attach(child: &mut Child) -> crate::Result<(Reader, Reader)> {
    let (Some(out), Some(err)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(SessionError::Io(io::Error::other(
            "child was spawned without piped output",
        )));
    };
    Ok((Reader::spawn("stdout", out)?, Reader::spawn("stderr", err)?))
}

/// Kill and wait for a child nobody will ever own.
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!("kill {}: {}", child.id(), e);
    }
    if let Err(e) = child.wait() {
        tracing::debug!("wait {}: {}", child.id(), e);
    }
}

/// A running child whose output is being captured.
pub struct CapturedProcess {
    child: Child,
    stdout: Reader,
    stderr: Reader,
    status: Option<ExitStatus>,
}

impl CapturedProcess {
    /// Spawn `command` in `working_dir` with both output streams piped.
    pub fn start(mut command: Command, working_dir: &Path) -> crate::Result<Self> {
        command
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!("spawning {:?}", command);
        let mut child = command.spawn()?;

        match attach(&mut child) {
            Ok((stdout, stderr)) => Ok(Self {
                child,
                stdout,
                stderr,
                status: None,
            }),
            Err(e) => {
                tracing::warn!("cannot capture output of child {}: {}", child.id(), e);
                reap(&mut child);
                Err(e)
            }
        }
    }

    /// Whether the child is still running. Never blocks.
    pub fn is_alive(&mut self) -> crate::Result<bool> {
        if self.status.is_none() {
            self.status = self.child.try_wait()?;
        }
        Ok(self.status.is_none())
    }

    /// Take everything buffered so far. Returns an empty chunk if nothing arrived.
    pub fn drain(&self) -> Chunk {
        let mut chunk = Chunk::default();
        self.stdout.drain_into(&mut chunk.stdout);
        self.stderr.drain_into(&mut chunk.stderr);
        if !chunk.is_empty() {
            tracing::trace!(
                stdout = chunk.stdout.len(),
                stderr = chunk.stderr.len(),
                "drained output"
            );
        }
        chunk
    }

    /// Block until the child has exited and both readers hit end of stream.
    ///
    /// Returns the exit code. Anything still queued must be collected with a
    /// final [`drain`](Self::drain).
    pub fn join(&mut self) -> crate::Result<i32> {
        let status = match self.status {
            Some(status) => status,
            None => {
                let status = self.child.wait()?;
                self.status = Some(status);
                status
            }
        };
        self.stdout.join()?;
        self.stderr.join()?;
        Ok(exit_code_of(status))
    }

    /// Exit code, available once the child has been observed to terminate.
    pub fn exit_code(&self) -> Option<i32> {
        self.status.map(exit_code_of)
    }

    /// Poll the child to completion, collecting all of its output.
    pub fn run_to_completion(mut self) -> crate::Result<CapturedOutput> {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        while self.is_alive()? {
            let chunk = self.drain();
            stdout.extend_from_slice(&chunk.stdout);
            stderr.extend_from_slice(&chunk.stderr);
            thread::sleep(POLL_INTERVAL);
        }

        let exit_code = self.join()?;
        let chunk = self.drain();
        stdout.extend_from_slice(&chunk.stdout);
        stderr.extend_from_slice(&chunk.stderr);

        Ok(CapturedOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    }

    #[test]
    fn test_captures_both_streams() {
        let dir = std::env::temp_dir();
        let process = CapturedProcess::start(sh("echo out; echo err >&2"), &dir).unwrap();
        let output = process.run_to_completion().unwrap();
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert!(output.success());
    }

    #[test]
    fn test_exit_code_only_after_termination() {
        let dir = std::env::temp_dir();
        let mut process = CapturedProcess::start(sh("exit 3"), &dir).unwrap();
        let code = process.join().unwrap();
        assert_eq!(code, 3);
        assert_eq!(process.exit_code(), Some(3));
        assert!(!process.is_alive().unwrap());
    }

    #[test]
    fn test_drain_is_empty_when_nothing_written() {
        let dir = std::env::temp_dir();
        let mut process = CapturedProcess::start(sh("true"), &dir).unwrap();
        process.join().unwrap();
        assert!(process.drain().is_empty());
    }

    #[test]
    fn test_signal_exit_is_negative() {
        let dir = std::env::temp_dir();
        let process = CapturedProcess::start(sh("kill -9 $$"), &dir).unwrap();
        let output = process.run_to_completion().unwrap();
        assert_eq!(output.exit_code, -9);
    }

    #[test]
    fn test_failed_attach_reaps_child() {
        let mut command = sh("exec sleep 30");
        command.stdout(Stdio::null()).stderr(Stdio::null());
        let mut child = command.spawn().unwrap();

        assert!(matches!(attach(&mut child), Err(SessionError::Io(_))));
        reap(&mut child);
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn test_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let process = CapturedProcess::start(sh("pwd"), dir.path()).unwrap();
        let output = process.run_to_completion().unwrap();
        let reported = std::fs::canonicalize(output.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }
}
