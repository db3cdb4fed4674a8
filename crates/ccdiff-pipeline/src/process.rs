//! Subprocess invocation behind a swappable backend.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Exit code recorded for a process killed after its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Base added to the signal number of a signal-terminated process.
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// A program to run: argument vector, working directory, optional timeout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: cwd.into(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Final path component of the program, for matching and messages.
    #[must_use]
    pub fn program_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .unwrap_or(&self.program)
            .to_string_lossy()
            .into_owned()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Everything a finished process produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Captured {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
}

impl Captured {
    /// A process that exited zero with no output.
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    /// A process that exited with `code` and printed `stderr`.
    #[must_use]
    pub fn failure(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: code,
            stderr: stderr.into(),
            ..Self::default()
        }
    }

    /// A process that printed `stdout` and exited with `code`.
    #[must_use]
    pub fn output(stdout: impl Into<Vec<u8>>, code: i32) -> Self {
        Self {
            exit_code: code,
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs invocations to completion.
///
/// Implementations must fully drain both output streams before returning.
pub trait ProcessBackend: Send + Sync {
    /// Run `invocation` and wait for it to exit.
    ///
    /// # Errors
    /// Returns an error only when the process could not be started or waited
    /// for; a nonzero exit is a normal [`Captured`] result.
    fn run(&self, invocation: &Invocation) -> io::Result<Captured>;
}

impl<B: ProcessBackend + ?Sized> ProcessBackend for &B {
    fn run(&self, invocation: &Invocation) -> io::Result<Captured> {
        (**self).run(invocation)
    }
}

/// Backend spawning real processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemBackend;

impl ProcessBackend for SystemBackend {
    fn run(&self, invocation: &Invocation) -> io::Result<Captured> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a timeout also reaches anything the child spawned.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command.spawn()?;

        // Readers run while we wait so a chatty child never blocks on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let (status, timed_out) = wait_with_timeout(&mut child, invocation.timeout)?;
        let stdout = join(stdout)?;
        let stderr = join(stderr)?;

        Ok(Captured {
            exit_code: exit_code(status, timed_out),
            stdout,
            stderr,
            timed_out,
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join(handle: JoinHandle<io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))?
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
) -> io::Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        return Ok((child.wait()?, false));
    };
    let start = Instant::now();

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if start.elapsed() >= timeout {
            kill_group(child);
            return Ok((child.wait()?, true));
        }
        thread::sleep(Duration::from_millis(20));
    }
}

/// Kill the child and every process left in its group.
///
/// Descendants holding the output pipes would otherwise keep the readers
/// blocked after the child itself is gone.
fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = i32::try_from(child.id()) {
            // SAFETY: plain syscall; the group id is the child's own pid.
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
}

fn exit_code(status: ExitStatus, timed_out: bool) -> i32 {
    if timed_out {
        return TIMEOUT_EXIT_CODE;
    }
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return SIGNAL_EXIT_BASE + signal;
        }
    }
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Invocation {
        Invocation::new("sh", std::env::temp_dir()).args(["-c", script])
    }

    #[test]
    fn test_captures_streams_and_status() {
        let captured = SystemBackend
            .run(&sh("echo out; echo err >&2; exit 3"))
            .unwrap();
        assert_eq!(captured.exit_code, 3);
        assert_eq!(captured.stdout, b"out\n");
        assert_eq!(captured.stderr, b"err\n");
        assert!(!captured.timed_out);
    }

    #[test]
    fn test_drains_large_output() {
        // Well past a 64 KiB pipe buffer on both streams.
        let script = "i=0; while [ $i -lt 20000 ]; do echo 0123456789; echo 0123456789 >&2; i=$((i+1)); done";
        let captured = SystemBackend.run(&sh(script)).unwrap();
        assert!(captured.succeeded());
        assert_eq!(captured.stdout.len(), 20000 * 11);
        assert_eq!(captured.stderr.len(), 20000 * 11);
    }

    #[test]
    fn test_kills_on_timeout() {
        let invocation = sh("exec sleep 5").with_timeout(Some(Duration::from_millis(100)));
        let captured = SystemBackend.run(&invocation).unwrap();
        assert!(captured.timed_out);
        assert_eq!(captured.exit_code, TIMEOUT_EXIT_CODE);
    }

    #[test]
    fn test_timeout_kills_grandchildren() {
        // The backgrounded sleep inherits the output pipes.
        let invocation =
            sh("sleep 30 & sleep 30").with_timeout(Some(Duration::from_millis(100)));
        let start = Instant::now();
        let captured = SystemBackend.run(&invocation).unwrap();
        assert!(captured.timed_out);
        assert!(start.elapsed() < Duration::from_secs(10), "{:?}", start.elapsed());
    }

    #[test]
    fn test_signal_exit_code() {
        let captured = SystemBackend.run(&sh("kill -9 $$")).unwrap();
        assert_eq!(captured.exit_code, SIGNAL_EXIT_BASE + 9);
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let invocation = Invocation::new("/nonexistent/ccdiff-no-such-tool", std::env::temp_dir());
        assert!(SystemBackend.run(&invocation).is_err());
    }

    #[test]
    fn test_display_and_program_name() {
        let invocation = Invocation::new("/usr/bin/gcc", "/tmp").args(["-S", "input.c"]);
        assert_eq!(invocation.to_string(), "/usr/bin/gcc -S input.c");
        assert_eq!(invocation.program_name(), "gcc");
    }
}
