//! Ownership of one live OS process.
//!
//! A [`ProcessHandle`] is created at launch and lives on the stack of a
//! single `execute` call. The child runs in its own process group, so a
//! kill reaches every stage of a shell pipeline and not just the shell.
//! Output is read by background tasks into shared buffers, which lets a
//! timed-out invocation still return whatever was printed before the kill.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long to wait for output pipes to close after the process is gone.
///
/// Background grandchildren can keep a pipe open forever; after this long
/// the buffered bytes are taken as-is.
pub(crate) const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

const CHUNK_SIZE: usize = 8 * 1024;

/// A pipe being copied into a shared buffer.
struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn spawn<R>(reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);

        let task = tokio::spawn(async move {
            let Some(mut reader) = reader else {
                return;
            };
            let mut chunk = vec![0u8; CHUNK_SIZE];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => lock(&sink).extend_from_slice(&chunk[..n]),
                    Err(e) => {
                        debug!(error = %e, "Output pipe read failed");
                        break;
                    }
                }
            }
        });

        Self { buffer, task }
    }

    /// Waits up to `drain` for the pipe to reach EOF, then takes the buffer.
    async fn finish(mut self, drain: Duration) -> Vec<u8> {
        if tokio::time::timeout(drain, &mut self.task).await.is_err() {
            debug!("Output pipe still open after drain timeout");
            self.task.abort();
        }
        std::mem::take(&mut *lock(&self.buffer))
    }
}

fn lock(buffer: &Mutex<Vec<u8>>) -> std::sync::MutexGuard<'_, Vec<u8>> {
    buffer.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// A running child process and its captured output.
///
/// Dropping a handle whose process was not reaped kills the whole process
/// group; tokio then reaps the child in the background.
pub(crate) struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
    stdout: Option<Capture>,
    stderr: Option<Capture>,
    reaped: bool,
}

impl ProcessHandle {
    /// Spawns `command` with piped output in a new process group.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the program cannot be started.
    pub(crate) fn spawn(mut command: Command) -> io::Result<Self> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn()?;
        let pid = child.id();
        let stdout = Capture::spawn(child.stdout.take());
        let stderr = Capture::spawn(child.stderr.take());
        debug!(pid = ?pid, "Process launched");

        Ok(Self {
            child,
            pid,
            stdout: Some(stdout),
            stderr: Some(stderr),
            reaped: false,
        })
    }

    /// Waits for the process to exit and reaps it.
    ///
    /// Cancel-safe: dropping the future leaves the handle usable.
    pub(crate) async fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        self.reaped = true;
        Ok(status)
    }

    /// Kills the process group and reaps the child.
    ///
    /// Returns the exit status if reaping succeeded.
    pub(crate) async fn terminate(&mut self) -> Option<ExitStatus> {
        if self.reaped {
            return None;
        }
        self.kill_group();
        if let Err(e) = self.child.start_kill() {
            debug!(error = %e, "start_kill failed; process may have exited already");
        }
        match self.child.wait().await {
            Ok(status) => {
                self.reaped = true;
                debug!(pid = ?self.pid, status = %status, "Process terminated and reaped");
                Some(status)
            }
            Err(e) => {
                warn!(pid = ?self.pid, error = %e, "Failed to reap terminated process");
                None
            }
        }
    }

    /// Collects everything captured on stdout and stderr.
    pub(crate) async fn collect_output(&mut self) -> (Vec<u8>, Vec<u8>) {
        let stdout = match self.stdout.take() {
            Some(capture) => capture.finish(DRAIN_TIMEOUT).await,
            None => Vec::new(),
        };
        let stderr = match self.stderr.take() {
            Some(capture) => capture.finish(DRAIN_TIMEOUT).await,
            None => Vec::new(),
        };
        (stdout, stderr)
    }

    fn kill_group(&self) {
        #[cfg(unix)]
        if let (Some(pid), false) = (self.pid, self.reaped) {
            let Ok(pgid) = libc::pid_t::try_from(pid) else {
                return;
            };
            // SAFETY: killpg has no memory-safety preconditions. The group id
            // is the child's pid (process_group(0)) and the child is not yet
            // reaped, so the id still names our group.
            let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
            if rc != 0 {
                debug!(
                    pgid,
                    error = %io::Error::last_os_error(),
                    "killpg failed"
                );
            }
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if !self.reaped {
            warn!(pid = ?self.pid, "Process handle dropped while running; killing process group");
            self.kill_group();
            let _ = self.child.start_kill();
        }
        for capture in [self.stdout.take(), self.stderr.take()].into_iter().flatten() {
            capture.task.abort();
        }
    }
}

/// Maps an exit status to a shell-style return code.
///
/// Signal deaths become `128 + signo`, like `$?` in a POSIX shell.
pub(crate) fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    crate::types::NOT_LAUNCHED
}
