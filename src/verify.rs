use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{DeployError, DeployResult};
use crate::probe::{HttpProbe, Reachability};
use crate::runtime::{ServiceState, StackRuntime};
use crate::settings::Readiness;
use crate::stack::REQUIRED;
use crate::ui;

/// Log lines surfaced when bring-up fails.
pub const FAILURE_LOG_LINES: u32 = 50;

/// Observed state once the stack is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Health {
    pub states: Vec<ServiceState>,
    pub web: Reachability,
}

/// Required services that are absent or not running.
#[must_use]
pub fn not_running(states: &[ServiceState]) -> Vec<String> {
    REQUIRED
        .iter()
        .filter(|name| {
            !states
                .iter()
                .any(|s| s.service == **name && s.is_running())
        })
        .map(|name| (*name).to_string())
        .collect()
}

/// Starts the stack and waits for it.
pub struct Verifier<'a> {
    runtime: &'a dyn StackRuntime,
    http: &'a dyn HttpProbe,
    readiness: Readiness,
    sleep: Box<dyn Fn(Duration) + 'a>,
}

impl<'a> Verifier<'a> {
    #[must_use]
    pub fn new(
        runtime: &'a dyn StackRuntime,
        http: &'a dyn HttpProbe,
        readiness: Readiness,
    ) -> Self {
        Self {
            runtime,
            http,
            readiness,
            sleep: Box::new(thread::sleep),
        }
    }

    /// Replace the sleep function, e.g. to run without delays.
    #[must_use]
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + 'a) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    /// Apply the descriptor, wait for the required services, then
    /// check the web UI on `web_port`. A web UI that is not answering
    /// yet is only a warning.
    pub fn bring_up(&self, web_port: u16) -> DeployResult<Health> {
        self.runtime.apply()?;

        let (states, remaining) = match self.wait_for_services() {
            Ok(ok) => ok,
            Err(missing) => return Err(self.failure(missing)),
        };
        ui::success("database, server and web UI are running");

        let web = self.wait_for_web(web_port, remaining);
        match web {
            Reachability::Responding(code) => {
                ui::success(&format!("web UI responding on port {web_port} (HTTP {code})"));
            }
            Reachability::Unexpected(code) => ui::warn(&format!(
                "web UI answered HTTP {code} on port {web_port}, it may still be initializing"
            )),
            Reachability::Unreachable => ui::warn(&format!(
                "web UI not answering on port {web_port} yet, it may still be initializing"
            )),
        }

        Ok(Health { states, web })
    }

    /// Poll until every required service runs. Returns the final
    /// states and the unused wait budget, or the services still down.
    fn wait_for_services(&self) -> Result<(Vec<ServiceState>, Duration), Vec<String>> {
        match self.readiness {
            Readiness::Fixed(delay) => {
                ui::info(&format!("waiting {}s for services to settle...", delay.as_secs()));
                (self.sleep)(delay);
                let states = self.states();
                let missing = not_running(&states);
                if missing.is_empty() {
                    Ok((states, Duration::ZERO))
                } else {
                    Err(missing)
                }
            }
            Readiness::Poll {
                initial,
                cap,
                max_wait,
            } => {
                ui::info(&format!("waiting up to {}s for services...", max_wait.as_secs()));
                let mut waited = Duration::ZERO;
                let mut delay = initial;
                loop {
                    let states = self.states();
                    let missing = not_running(&states);
                    if missing.is_empty() {
                        info!(waited_secs = waited.as_secs(), "required services running");
                        return Ok((states, max_wait.saturating_sub(waited)));
                    }
                    if waited >= max_wait {
                        return Err(missing);
                    }
                    debug!(?missing, "services not running yet");
                    let step = delay.min(max_wait - waited);
                    if step.is_zero() {
                        return Err(missing);
                    }
                    (self.sleep)(step);
                    waited += step;
                    delay = (delay * 2).min(cap);
                }
            }
        }
    }

    fn wait_for_web(&self, port: u16, budget: Duration) -> Reachability {
        let Readiness::Poll { initial, cap, .. } = self.readiness else {
            return self.http.probe(port);
        };
        let mut waited = Duration::ZERO;
        let mut delay = initial;
        loop {
            let result = self.http.probe(port);
            if result.is_responding() || waited >= budget {
                return result;
            }
            let step = delay.min(budget - waited);
            if step.is_zero() {
                return result;
            }
            (self.sleep)(step);
            waited += step;
            delay = (delay * 2).min(cap);
        }
    }

    fn states(&self) -> Vec<ServiceState> {
        self.runtime.status().unwrap_or_else(|e| {
            debug!(error = %e, "status query failed");
            Vec::new()
        })
    }

    fn failure(&self, missing: Vec<String>) -> DeployError {
        let logs = self
            .runtime
            .log_tail(FAILURE_LOG_LINES)
            .unwrap_or_else(|e| format!("(could not read logs: {e})"));
        ui::error(&format!("not running: {}", missing.join(", ")));
        ui::block("recent logs", &logs);
        DeployError::BringUpFailed {
            services: missing,
            logs,
        }
    }
}
