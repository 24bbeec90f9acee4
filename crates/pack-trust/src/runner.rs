//! Timeout-bounded script execution.
//!
//! The engine only depends on the [`ScriptRunner`] contract; [`ShellRunner`]
//! is the production implementation and tests substitute their own.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

use crate::error::{Error, Result};

/// Captured result of a finished script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a shell command to completion or until `timeout` elapses.
///
/// Implementations must report a timeout as [`Error::ScriptTimeout`], never
/// as a non-zero exit code.
pub trait ScriptRunner {
    fn run(
        &self,
        command: &str,
        cwd: &Path,
        env: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<ScriptOutput>;
}

/// Minimum time left to collect output once the shell itself has exited.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Runs commands through the platform shell.
///
/// - Unix: `sh -c "{command}"` in its own process group, so a timeout
///   stops everything the script started
/// - Windows: `cmd /C "{command}"`
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

fn shell_command(command: &str) -> Command {
    #[cfg(windows)]
    {
        let mut c = Command::new("cmd");
        c.args(["/C", command]);
        c
    }
    #[cfg(not(windows))]
    {
        use std::os::unix::process::CommandExt;

        let mut c = Command::new("sh");
        c.arg("-c").arg(command).process_group(0);
        c
    }
}

impl ScriptRunner for ShellRunner {
    fn run(
        &self,
        command: &str,
        cwd: &Path,
        env: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<ScriptOutput> {
        let spawn_err = |source| Error::ScriptSpawn {
            command: command.to_string(),
            source,
        };

        let started = Instant::now();
        let mut child = shell_command(command)
            .current_dir(cwd)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // Drain both pipes while waiting so a chatty script cannot block on
        // a full pipe buffer.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match child.wait_timeout(timeout).map_err(spawn_err)? {
            Some(status) => status,
            None => {
                kill_tree(&mut child);
                if let Err(e) = child.wait() {
                    tracing::warn!(command, error = %e, "failed to reap timed out script");
                }
                tracing::warn!(command, timeout_secs = timeout.as_secs_f64(), "script timed out");
                return Err(Error::ScriptTimeout {
                    command: command.to_string(),
                    timeout,
                });
            }
        };

        // Background processes may keep the pipes open after the shell exits
        let deadline = (started + timeout).max(Instant::now() + DRAIN_GRACE);
        let stdout = collect(stdout, deadline);
        let stderr = collect(stderr, deadline);
        if stdout.is_none() || stderr.is_none() {
            tracing::warn!(command, "output still open after exit; stopping leftover processes");
            kill_tree(&mut child);
        }

        let output = ScriptOutput {
            stdout: stdout.unwrap_or_default(),
            stderr: stderr.unwrap_or_default(),
            exit_code: status.code(),
        };
        tracing::debug!(command, exit_code = ?output.exit_code, "script finished");
        Ok(output)
    }
}

/// Kill the script's process group, falling back to the shell alone.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        let pgid = child.id() as libc::pid_t;
        // SAFETY: killpg only sends a signal. The group was created for this
        // child at spawn, so its id is the child's pid.
        if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
            return;
        }
        tracing::debug!(pgid, error = %std::io::Error::last_os_error(), "process group kill failed");
    }
    if let Err(e) = child.kill() {
        tracing::warn!(pid = child.id(), error = %e, "failed to kill script");
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = reader.read_to_end(&mut buf) {
            tracing::debug!(error = %e, "script output read failed");
        }
        // The receiver is gone once the runner stopped waiting
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Output of a drain thread, or `None` if it did not finish by `deadline`.
fn collect(rx: Option<mpsc::Receiver<String>>, deadline: Instant) -> Option<String> {
    match rx {
        Some(rx) => rx
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
            .ok(),
        None => Some(String::new()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn captures_stdout_and_exit_code() {
        let dir = tempdir().unwrap();
        let out = ShellRunner
            .run("echo hello; exit 3", dir.path(), &BTreeMap::new(), Duration::from_secs(5))
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.success());
    }

    #[test]
    fn passes_environment_and_cwd() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "").unwrap();
        let env = BTreeMap::from([("PACK_VALUE".to_string(), "42".to_string())]);
        let out = ShellRunner
            .run("ls; echo $PACK_VALUE >&2", dir.path(), &env, Duration::from_secs(5))
            .unwrap();
        assert!(out.stdout.contains("marker"));
        assert_eq!(out.stderr.trim(), "42");
        assert!(out.success());
    }

    #[test]
    fn timeout_is_distinct_from_failure() {
        let dir = tempdir().unwrap();
        let err = ShellRunner
            .run("sleep 5", dir.path(), &BTreeMap::new(), Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, Error::ScriptTimeout { .. }));
    }

    #[test]
    fn timeout_stops_background_children() {
        let dir = tempdir().unwrap();
        let err = ShellRunner
            .run(
                "(sleep 1; touch late) & wait",
                dir.path(),
                &BTreeMap::new(),
                Duration::from_millis(200),
            )
            .unwrap_err();
        assert!(matches!(err, Error::ScriptTimeout { .. }));

        std::thread::sleep(Duration::from_millis(1500));
        assert!(!dir.path().join("late").exists());
    }

    #[test]
    fn background_child_holding_output_does_not_block() {
        let dir = tempdir().unwrap();
        let started = Instant::now();
        let out = ShellRunner
            .run("echo ready; sleep 10 & exit 0", dir.path(), &BTreeMap::new(), Duration::from_secs(1))
            .unwrap();
        assert!(out.success());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
