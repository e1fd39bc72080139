//! Child process execution with full stream capture.
//!
//! [`SystemRunner`] implements [`ProcessRunner`] by spawning the requested
//! program with the environment context as its complete environment, draining
//! stdout and stderr on dedicated reader threads while waiting for exit, and
//! optionally enforcing a timeout. On Unix the child leads its own process
//! group, so a timeout also kills anything it forked. Failures to spawn are reported through the
//! returned [`ExecutionOutcome`] rather than as errors, so callers only ever
//! inspect an exit status.

use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::environment::EnvironmentContext;

/// Tracing target for process execution.
const PROCESS_TARGET: &str = "bridgecheck_pipeline::process";

/// Exit status reported when the executable could not be started.
pub const SPAWN_FAILURE_STATUS: i32 = 127;
/// Exit status reported when the child was killed after its timeout.
pub const TIMEOUT_STATUS: i32 = 124;
/// Exit status reported when the child ended without an exit code.
pub const SIGNAL_STATUS: i32 = -1;

const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// How long to keep reading output once the child has been killed.
const DRAIN_GRACE: Duration = Duration::from_secs(1);
const READ_CHUNK: usize = 8192;

/// Program, arguments, and working directory of a single child process.
///
/// # Example
///
/// ```
/// use bridgecheck_pipeline::Invocation;
///
/// let invocation = Invocation::new("python3", "/tmp")
///     .arg("-m")
///     .arg("unittest")
///     .arg("test_api.py");
/// assert_eq!(invocation.command_line(), "python3 -m unittest test_api.py");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    working_dir: PathBuf,
    timeout: Option<Duration>,
}

impl Invocation {
    /// Creates an invocation with no arguments and no timeout.
    #[must_use]
    pub fn new(program: impl Into<OsString>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            timeout: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets the timeout after which the child is killed.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the program to execute.
    #[must_use]
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Returns the arguments passed to the program.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Returns the working directory of the child.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Returns the configured timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Renders the program and arguments as a single display line.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    command: String,
    stdout: String,
    stderr: String,
    exit_code: i32,
    cause: Option<String>,
}

impl ExecutionOutcome {
    /// Creates an outcome for a child that exited normally.
    #[must_use]
    pub fn new(
        command: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        Self {
            command: command.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            cause: None,
        }
    }

    /// Creates an outcome for an executable that could not be started.
    #[must_use]
    pub fn spawn_failure(command: impl Into<String>, reason: impl Into<String>) -> Self {
        let cause = reason.into();
        Self {
            command: command.into(),
            stdout: String::new(),
            stderr: cause.clone(),
            exit_code: SPAWN_FAILURE_STATUS,
            cause: Some(cause),
        }
    }

    /// Attaches a human-readable explanation of an abnormal termination.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Returns the rendered command line.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Returns the captured standard error.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Returns the exit status.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Returns why the child ended abnormally, if it did.
    #[must_use]
    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    /// Returns `true` when the child exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait abstracting child process execution for testability.
///
/// The production implementation is [`SystemRunner`]. Test code implements
/// this trait to script exit statuses and record the invocations issued.
///
/// # Example
///
/// ```
/// use bridgecheck_pipeline::{EnvironmentContext, ExecutionOutcome, Invocation, ProcessRunner};
///
/// struct AlwaysPasses;
///
/// impl ProcessRunner for AlwaysPasses {
///     fn run(&self, invocation: &Invocation, _env: &EnvironmentContext) -> ExecutionOutcome {
///         ExecutionOutcome::new(invocation.command_line(), "ok", "", 0)
///     }
/// }
///
/// let outcome = AlwaysPasses.run(&Invocation::new("true", "."), &EnvironmentContext::default());
/// assert!(outcome.success());
/// ```
pub trait ProcessRunner {
    /// Runs `invocation` to completion under `env` and reports its outcome.
    fn run(&self, invocation: &Invocation, env: &EnvironmentContext) -> ExecutionOutcome;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, invocation: &Invocation, env: &EnvironmentContext) -> ExecutionOutcome {
        (**self).run(invocation, env)
    }
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, env: &EnvironmentContext) -> ExecutionOutcome {
        let command_line = invocation.command_line();
        let mut command = Command::new(invocation.program());
        command
            .args(invocation.args())
            .current_dir(invocation.working_dir())
            .env_clear()
            .envs(env.vars())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        debug!(
            target: PROCESS_TARGET,
            command = %command_line,
            working_dir = %invocation.working_dir().display(),
            "spawning child process"
        );

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                let cause = describe_spawn_error(invocation, &err);
                warn!(target: PROCESS_TARGET, command = %command_line, %cause, "spawn failed");
                return ExecutionOutcome::spawn_failure(command_line, cause);
            }
        };

        let limit = invocation.timeout().filter(|duration| !duration.is_zero());
        let deadline = limit.and_then(|duration| Instant::now().checked_add(duration));
        let mut captured = CapturedStreams {
            stdout: child.stdout.take().map(StreamDrain::spawn),
            stderr: child.stderr.take().map(StreamDrain::spawn),
        };
        let mut waited = wait_for_exit(&mut child, deadline);
        if matches!(waited, Ok(Exit::Status(_))) && !captured.wait_until(deadline) {
            warn!(
                target: PROCESS_TARGET,
                command = %command_line,
                "descendants held the output pipes past the timeout"
            );
            terminate(&mut child);
            waited = Ok(Exit::TimedOut);
        }
        if !captured.wait_until(Instant::now().checked_add(DRAIN_GRACE)) {
            warn!(
                target: PROCESS_TARGET,
                command = %command_line,
                "output pipes still open after termination; keeping partial output"
            );
        }
        let (stdout, stderr) = captured.into_text();

        let outcome = match waited {
            Ok(Exit::Status(status)) => from_status(command_line, stdout, stderr, status),
            Ok(Exit::TimedOut) => {
                let secs = limit.map_or(0, |duration| duration.as_secs());
                warn!(
                    target: PROCESS_TARGET,
                    command = %command_line,
                    timeout_secs = secs,
                    "child timed out and its process group was killed"
                );
                ExecutionOutcome::new(command_line, stdout, stderr, TIMEOUT_STATUS)
                    .with_cause(format!("timed out after {secs}s"))
            }
            Err(err) => ExecutionOutcome::new(command_line, stdout, stderr, SIGNAL_STATUS)
                .with_cause(format!("failed to wait for child: {err}")),
        };

        debug!(
            target: PROCESS_TARGET,
            command = %outcome.command(),
            exit_code = outcome.exit_code(),
            stdout_bytes = outcome.stdout().len(),
            stderr_bytes = outcome.stderr().len(),
            "child process finished"
        );
        outcome
    }
}

enum Exit {
    Status(ExitStatus),
    TimedOut,
}

fn describe_spawn_error(invocation: &Invocation, err: &io::Error) -> String {
    let program = invocation.program().to_string_lossy();
    if err.kind() == io::ErrorKind::NotFound {
        format!("executable '{program}' not found (or working directory missing): {err}")
    } else {
        format!("failed to start '{program}': {err}")
    }
}

/// A pipe read to its end on a background thread.
///
/// Bytes land in a shared buffer as they arrive, so whatever was read before
/// the caller gives up on the stream is still available.
struct StreamDrain {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
    closed: bool,
}

impl StreamDrain {
    fn spawn<R: Read + Send + 'static>(mut reader: R) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let (sender, done) = mpsc::channel();
        thread::spawn(move || {
            let mut chunk = [0_u8; READ_CHUNK];
            loop {
                match reader.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(read) => {
                        lock(&sink).extend_from_slice(chunk.get(..read).unwrap_or_default());
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                    Err(err) => {
                        warn!(target: PROCESS_TARGET, %err, "failed to drain child stream");
                        break;
                    }
                }
            }
            drop(sender.send(()));
        });
        Self {
            buffer,
            done,
            closed: false,
        }
    }

    /// Waits for end of stream, giving up at `deadline`. Returns `true` once
    /// every writer has closed the pipe.
    fn wait_until(&mut self, deadline: Option<Instant>) -> bool {
        if self.closed {
            return true;
        }
        let received = match deadline {
            None => self.done.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(until) => self
                .done
                .recv_timeout(until.saturating_duration_since(Instant::now())),
        };
        self.closed = !matches!(received, Err(RecvTimeoutError::Timeout));
        self.closed
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&lock(&self.buffer)).into_owned()
    }
}

fn lock(buffer: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

struct CapturedStreams {
    stdout: Option<StreamDrain>,
    stderr: Option<StreamDrain>,
}

impl CapturedStreams {
    fn wait_until(&mut self, deadline: Option<Instant>) -> bool {
        let stdout = self
            .stdout
            .as_mut()
            .is_none_or(|drain| drain.wait_until(deadline));
        let stderr = self
            .stderr
            .as_mut()
            .is_none_or(|drain| drain.wait_until(deadline));
        stdout && stderr
    }

    fn into_text(self) -> (String, String) {
        (
            self.stdout.as_ref().map(StreamDrain::text).unwrap_or_default(),
            self.stderr.as_ref().map(StreamDrain::text).unwrap_or_default(),
        )
    }
}

/// Waits for the child to exit, killing its process group at `deadline`.
fn wait_for_exit(child: &mut Child, deadline: Option<Instant>) -> io::Result<Exit> {
    let Some(until) = deadline else {
        return child.wait().map(Exit::Status);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Exit::Status(status));
        }
        let remaining = until.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            terminate(child);
            return Ok(Exit::TimedOut);
        }
        thread::sleep(POLL_INTERVAL.min(remaining));
    }
}

/// Kills the child together with every process left in its group.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    kill_process_group(child.id());
    drop(child.kill());
    drop(child.wait());
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(group) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: `kill` takes plain integers and touches no memory we own.
    let result = unsafe { libc::kill(-group, libc::SIGKILL) };
    if result != 0 {
        let err = io::Error::last_os_error();
        debug!(target: PROCESS_TARGET, pid, %err, "process group already gone");
    }
}

fn from_status(
    command_line: String,
    stdout: String,
    stderr: String,
    status: ExitStatus,
) -> ExecutionOutcome {
    match status.code() {
        Some(code) => ExecutionOutcome::new(command_line, stdout, stderr, code),
        None => ExecutionOutcome::new(command_line, stdout, stderr, SIGNAL_STATUS)
            .with_cause(format!("terminated without an exit code ({status})")),
    }
}
