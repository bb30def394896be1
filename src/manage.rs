//! Day-2 command table: start, stop, restart, logs, status, backup,
//! update and a database shell.

use std::fmt::Write as _;

use crate::backup;
use crate::error::{DeployError, DeployResult};
use crate::provisioning::ProvisioningConfig;
use crate::runtime::{LogSelector, ServiceState, StackRuntime};
use crate::settings::Settings;
use crate::stack::{AGENT, DATABASE, SERVER, WEB};
use crate::ui;

pub const USAGE: &str = "\
Usage: zabbix-manage <command>

Commands:
  start              Start all services
  stop               Stop all services
  restart            Restart all services
  logs [target]      Follow logs (target: server | web | mysql | agent)
  status             Show service state and access details
  backup             Dump the database and archive persisted data
  update             Pull newer images and re-apply the stack
  mysql              Open a MySQL root shell";

/// Log stream aliases accepted by `logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Server,
    Web,
    Database,
    Agent,
}

impl LogTarget {
    #[must_use]
    pub fn parse(alias: &str) -> Option<Self> {
        match alias {
            "server" | "zabbix" | "zabbix-server" => Some(Self::Server),
            "web" | "frontend" | "ui" | "zabbix-web" => Some(Self::Web),
            "mysql" | "db" | "database" => Some(Self::Database),
            "agent" | "zabbix-agent" => Some(Self::Agent),
            _ => None,
        }
    }

    /// Stack service whose log this target selects.
    #[must_use]
    pub const fn service(self) -> &'static str {
        match self {
            Self::Server => SERVER,
            Self::Web => WEB,
            Self::Database => DATABASE,
            Self::Agent => AGENT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManageCommand {
    Start,
    Stop,
    Restart,
    Logs(Option<LogTarget>),
    Status,
    Backup,
    Update,
    DbShell,
}

impl ManageCommand {
    /// Parse `args` (without the program name). Anything outside the
    /// table is a usage error.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> DeployResult<Self> {
        let mut it = args.iter().map(<S as AsRef<str>>::as_ref);
        let Some(name) = it.next() else {
            return Err(DeployError::Usage(USAGE.to_string()));
        };
        let arg = it.next();
        if it.next().is_some() {
            return Err(usage(&format!("too many arguments for '{name}'")));
        }

        let command = match name {
            "start" => Self::Start,
            "stop" => Self::Stop,
            "restart" => Self::Restart,
            "status" => Self::Status,
            "backup" => Self::Backup,
            "update" => Self::Update,
            "mysql" | "db-shell" => Self::DbShell,
            "logs" => {
                return match arg {
                    None => Ok(Self::Logs(None)),
                    Some(alias) => LogTarget::parse(alias)
                        .map(|t| Self::Logs(Some(t)))
                        .ok_or_else(|| usage(&format!("unknown log target '{alias}'"))),
                };
            }
            other => return Err(usage(&format!("unknown command '{other}'"))),
        };

        match arg {
            Some(extra) => Err(usage(&format!("unexpected argument '{extra}' for '{name}'"))),
            None => Ok(command),
        }
    }
}

fn usage(problem: &str) -> DeployError {
    DeployError::Usage(format!("{problem}\n\n{USAGE}"))
}

/// Status text: one line per service, then access details from the
/// env file.
#[must_use]
pub fn status_report(config: &ProvisioningConfig, states: &[ServiceState]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<16} STATE", "SERVICE");
    for name in [DATABASE, SERVER, WEB, AGENT] {
        let state = states
            .iter()
            .find(|s| s.service == name)
            .map_or("absent", |s| s.state.as_str());
        let _ = writeln!(out, "{name:<16} {state}");
    }
    let ports = config.ports();
    let _ = writeln!(out);
    let _ = writeln!(out, "Web UI:        {}", config.url());
    let _ = writeln!(out, "Zabbix server: port {}", ports.server);
    let _ = writeln!(out, "MySQL:         127.0.0.1:{}", ports.database);
    out
}

/// Runs management commands against an installed stack.
pub struct Manager<'a> {
    runtime: &'a dyn StackRuntime,
    settings: &'a Settings,
}

impl<'a> Manager<'a> {
    #[must_use]
    pub const fn new(runtime: &'a dyn StackRuntime, settings: &'a Settings) -> Self {
        Self { runtime, settings }
    }

    /// Credentials and ports, read fresh from the env file.
    fn config(&self) -> DeployResult<ProvisioningConfig> {
        ProvisioningConfig::from_env_file(&self.settings.env_path())
    }

    pub fn dispatch(&self, command: ManageCommand) -> DeployResult<()> {
        match command {
            ManageCommand::Start => {
                self.runtime.start()?;
                ui::success("services started");
            }
            ManageCommand::Stop => {
                self.runtime.stop()?;
                ui::success("services stopped");
            }
            ManageCommand::Restart => {
                self.runtime.restart()?;
                ui::success("services restarted");
            }
            ManageCommand::Logs(target) => {
                let selector =
                    target.map_or(LogSelector::All, |t| LogSelector::Service(t.service()));
                self.runtime.follow_logs(selector)?;
            }
            ManageCommand::Status => {
                let config = self.config()?;
                let states = self.runtime.status()?;
                print!("{}", status_report(&config, &states));
            }
            ManageCommand::Backup => {
                let config = self.config()?;
                let now = chrono::Local::now();
                let done = backup::run(self.runtime, self.settings, &config, &now)?;
                ui::success(&format!("database dump: {}", done.dump.display()));
                ui::success(&format!("archive:       {}", done.archive.display()));
            }
            ManageCommand::Update => {
                self.runtime.pull()?;
                self.runtime.apply()?;
                ui::success("images updated and stack re-applied");
            }
            ManageCommand::DbShell => {
                let config = self.config()?;
                let envs = [("MYSQL_PWD", config.root_password().expose())];
                self.runtime.exec_interactive(DATABASE, &["mysql", "-uroot"], &envs)?;
            }
        }
        Ok(())
    }
}
