use std::fmt;

use tracing::info;

use crate::cmd;
use crate::error::{DeployError, DeployResult};
use crate::prompt::Prompter;
use crate::ui;

/// Host tools the installer shells out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Docker,
    Compose,
    Nginx,
    Certbot,
}

impl Tool {
    pub const ALL: [Self; 4] = [Self::Docker, Self::Compose, Self::Nginx, Self::Certbot];
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Docker => "docker",
            Self::Compose => "docker compose",
            Self::Nginx => "nginx",
            Self::Certbot => "certbot",
        })
    }
}

/// What the resolver needs to know about, and do to, the host.
pub trait HostCheck {
    /// Effective user id.
    fn uid(&self) -> DeployResult<u32>;

    /// Total memory, if it can be determined.
    fn memory_mib(&self) -> Option<u64>;

    fn has(&self, tool: Tool) -> bool;

    fn install(&self, tool: Tool) -> DeployResult<()>;
}

/// Debian/Ubuntu host driven through `apt-get`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AptHost;

impl HostCheck for AptHost {
    fn uid(&self) -> DeployResult<u32> {
        let out = cmd::run("id", &["-u"])?;
        out.parse()
            .map_err(|_| DeployError::Other(format!("unexpected `id -u` output: {out}")))
    }

    fn memory_mib(&self) -> Option<u64> {
        std::fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|s| parse_meminfo_mib(&s))
    }

    fn has(&self, tool: Tool) -> bool {
        match tool {
            Tool::Docker => cmd::command_exists("docker"),
            Tool::Compose => cmd::run("docker", &["compose", "version"]).is_ok(),
            Tool::Nginx => cmd::command_exists("nginx"),
            Tool::Certbot => cmd::command_exists("certbot"),
        }
    }

    fn install(&self, tool: Tool) -> DeployResult<()> {
        match tool {
            Tool::Docker => {
                cmd::run_pipeline("curl -fsSL https://get.docker.com | sh")?;
                cmd::run_interactive("systemctl", &["enable", "--now", "docker"])
            }
            Tool::Compose => apt_install(&["docker-compose-plugin"]),
            Tool::Nginx => {
                apt_install(&["nginx"])?;
                cmd::run_interactive("systemctl", &["enable", "--now", "nginx"])
            }
            Tool::Certbot => apt_install(&["certbot"]),
        }
    }
}

fn apt_install(packages: &[&str]) -> DeployResult<()> {
    cmd::run_interactive("apt-get", &["update", "-qq"])?;
    let mut args = vec!["install", "-y", "-qq"];
    args.extend_from_slice(packages);
    cmd::run_interactive("apt-get", &args)
}

/// `MemTotal` from `/proc/meminfo`, in MiB.
#[must_use]
pub fn parse_meminfo_mib(meminfo: &str) -> Option<u64> {
    meminfo.lines().find_map(|line| {
        let rest = line.strip_prefix("MemTotal:")?;
        let kib: u64 = rest.split_whitespace().next()?.parse().ok()?;
        Some(kib / 1024)
    })
}

/// Check privileges and memory, then install whatever is missing.
pub fn resolve(
    host: &dyn HostCheck,
    prompter: &dyn Prompter,
    min_memory_mib: u64,
) -> DeployResult<()> {
    let uid = host.uid()?;
    if uid != 0 {
        return Err(DeployError::NotRoot(uid));
    }

    match host.memory_mib() {
        Some(mib) if mib < min_memory_mib => {
            ui::warn(&format!(
                "{mib} MiB of memory detected, at least {min_memory_mib} MiB is recommended"
            ));
            if !prompter.confirm("Continue anyway?", false)? {
                return Err(DeployError::Aborted("insufficient memory".into()));
            }
        }
        Some(mib) => info!(mib, "memory check passed"),
        None => ui::warn("could not determine total memory, skipping check"),
    }

    for tool in Tool::ALL {
        if host.has(tool) {
            ui::success(&format!("{tool} found"));
            continue;
        }
        ui::info(&format!("installing {tool}..."));
        host.install(tool)?;
        if !host.has(tool) {
            return Err(DeployError::PrerequisiteMissing(tool.to_string()));
        }
        ui::success(&format!("{tool} installed"));
    }
    Ok(())
}
