//! Adapter between the installer and the container engine. All
//! stack operations go through [`StackRuntime`] so the logic above
//! it can run against a fake.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cmd;
use crate::error::DeployResult;
use crate::settings::{COMPOSE_FILE, ENV_FILE};

/// Reported state of one stack service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceState {
    pub service: String,
    pub state: String,
}

impl ServiceState {
    #[must_use]
    pub fn new(service: &str, state: &str) -> Self {
        Self {
            service: service.to_string(),
            state: state.to_string(),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }
}

/// Which log stream to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSelector<'a> {
    All,
    Service(&'a str),
}

impl fmt::Display for LogSelector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all services"),
            Self::Service(name) => f.write_str(name),
        }
    }
}

/// Lifecycle operations on a rendered stack.
pub trait StackRuntime {
    /// Create or update containers to match the descriptor, detached.
    fn apply(&self) -> DeployResult<()>;

    fn start(&self) -> DeployResult<()>;

    fn stop(&self) -> DeployResult<()>;

    fn restart(&self) -> DeployResult<()>;

    /// Pull newer images for every service.
    fn pull(&self) -> DeployResult<()>;

    fn status(&self) -> DeployResult<Vec<ServiceState>>;

    /// Follow logs on the terminal until interrupted.
    fn follow_logs(&self, selector: LogSelector<'_>) -> DeployResult<()>;

    /// Last `lines` log lines of every service.
    fn log_tail(&self, lines: u32) -> DeployResult<String>;

    /// Run `args` inside `service` with the terminal attached.
    fn exec_interactive(
        &self,
        service: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> DeployResult<()>;

    /// Run `args` inside `service`, writing its stdout to `dest`.
    fn exec_to_file(
        &self,
        service: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        dest: &Path,
    ) -> DeployResult<()>;
}

/// [`StackRuntime`] backed by `docker compose`.
#[derive(Debug, Clone)]
pub struct ComposeRuntime {
    compose_file: PathBuf,
    env_file: PathBuf,
}

impl ComposeRuntime {
    #[must_use]
    pub fn new(install_dir: &Path) -> Self {
        Self {
            compose_file: install_dir.join(COMPOSE_FILE),
            env_file: install_dir.join(ENV_FILE),
        }
    }

    fn base_args(&self) -> Vec<String> {
        vec![
            "compose".to_string(),
            "-f".to_string(),
            self.compose_file.display().to_string(),
            "--env-file".to_string(),
            self.env_file.display().to_string(),
        ]
    }

    fn args(&self, extra: &[&str]) -> Vec<String> {
        let mut args = self.base_args();
        args.extend(extra.iter().map(|a| (*a).to_string()));
        args
    }

    fn interactive(&self, extra: &[&str]) -> DeployResult<()> {
        let args = self.args(extra);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_interactive("docker", &refs)
    }

    fn exec_args(
        &self,
        tty: bool,
        service: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Vec<String> {
        let mut all = self.args(&["exec"]);
        if !tty {
            all.push("-T".to_string());
        }
        // `-e NAME` without a value makes docker copy it from our
        // environment, keeping secrets off the command line.
        for (name, _) in envs {
            all.push("-e".to_string());
            all.push((*name).to_string());
        }
        all.push(service.to_string());
        all.extend(args.iter().map(|a| (*a).to_string()));
        all
    }
}

impl StackRuntime for ComposeRuntime {
    fn apply(&self) -> DeployResult<()> {
        self.interactive(&["up", "-d", "--remove-orphans"])
    }

    fn start(&self) -> DeployResult<()> {
        self.interactive(&["up", "-d"])
    }

    fn stop(&self) -> DeployResult<()> {
        self.interactive(&["down"])
    }

    fn restart(&self) -> DeployResult<()> {
        self.interactive(&["restart"])
    }

    fn pull(&self) -> DeployResult<()> {
        self.interactive(&["pull"])
    }

    fn status(&self) -> DeployResult<Vec<ServiceState>> {
        let args = self.args(&["ps", "--all", "--format", "json"]);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = cmd::run("docker", &refs)?;
        parse_ps(&out)
    }

    fn follow_logs(&self, selector: LogSelector<'_>) -> DeployResult<()> {
        match selector {
            LogSelector::All => self.interactive(&["logs", "-f", "--tail", "100"]),
            LogSelector::Service(name) => self.interactive(&["logs", "-f", "--tail", "100", name]),
        }
    }

    fn log_tail(&self, lines: u32) -> DeployResult<String> {
        let n = lines.to_string();
        let args = self.args(&["logs", "--no-color", "--tail", &n]);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let (_, out) = cmd::run_combined("docker", &refs)?;
        Ok(out)
    }

    fn exec_interactive(
        &self,
        service: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> DeployResult<()> {
        let all = self.exec_args(true, service, args, envs);
        let refs: Vec<&str> = all.iter().map(String::as_str).collect();
        cmd::run_interactive_env("docker", &refs, envs)
    }

    fn exec_to_file(
        &self,
        service: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        dest: &Path,
    ) -> DeployResult<()> {
        let all = self.exec_args(false, service, args, envs);
        let refs: Vec<&str> = all.iter().map(String::as_str).collect();
        cmd::run_to_file("docker", &refs, envs, dest)
    }
}

#[derive(Deserialize)]
struct PsEntry {
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "State")]
    state: String,
}

/// Parse `docker compose ps --format json`. Older releases print one
/// JSON array, newer ones one object per line.
pub fn parse_ps(output: &str) -> DeployResult<Vec<ServiceState>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<PsEntry> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?
    };

    Ok(entries
        .into_iter()
        .map(|e| ServiceState {
            service: e.service,
            state: e.state,
        })
        .collect())
}
