//! Repository sync: `git pull` against the working copy.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

const UP_TO_DATE_MARKER: &str = "Already up to date";

/// Result of a pull attempt. Failures are data, not errors: spawn problems
/// and timeouts land in `stderr` with `success = false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl PullOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: reason.into(),
        }
    }

    /// Whether git reported that nothing was fetched. Presentation only.
    pub fn is_up_to_date(&self) -> bool {
        self.success && self.stdout.contains(UP_TO_DATE_MARKER)
    }
}

/// Source of fresh documents for a run.
pub trait Repository {
    fn pull(&self) -> PullOutcome;
}

/// A local git checkout pulled from a fixed remote and branch.
#[derive(Debug, Clone)]
pub struct GitRepository {
    dir: PathBuf,
    remote: String,
    branch: String,
    timeout: Duration,
}

impl GitRepository {
    pub fn new(
        dir: impl Into<PathBuf>,
        remote: impl Into<String>,
        branch: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            dir: dir.into(),
            remote: remote.into(),
            branch: branch.into(),
            timeout,
        }
    }
}

impl Repository for GitRepository {
    fn pull(&self) -> PullOutcome {
        let mut command = Command::new("git");
        command
            .args(["pull", self.remote.as_str(), self.branch.as_str()])
            .current_dir(&self.dir)
            .env("GIT_TERMINAL_PROMPT", "0");
        tracing::debug!(
            dir = %self.dir.display(),
            remote = %self.remote,
            branch = %self.branch,
            "running git pull"
        );
        run_bounded(command, self.timeout)
    }
}

/// Run `command` and collect its output, giving up once `timeout` elapses.
///
/// The deadline covers output collection too, so a background process that
/// inherited the pipes cannot hold the run open. The child is killed when
/// the timed-out future is dropped.
pub(crate) fn run_bounded(command: Command, timeout: Duration) -> PullOutcome {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => return PullOutcome::failed(format!("failed to start runtime: {err}")),
    };
    runtime.block_on(output_with_timeout(command, timeout))
}

async fn output_with_timeout(mut command: Command, timeout: Duration) -> PullOutcome {
    let program = command
        .as_std()
        .get_program()
        .to_string_lossy()
        .into_owned();
    command.stdin(Stdio::null()).kill_on_drop(true);

    match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => PullOutcome {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        },
        Ok(Err(err)) => PullOutcome::failed(format!("failed to spawn {program}: {err}")),
        Err(_) => PullOutcome::failed(format!(
            "{program} timed out after {}s",
            timeout.as_secs_f32()
        )),
    }
}
