#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use zabbix_deploy::certbot::CertificateIssuer;
use zabbix_deploy::error::{DeployError, DeployResult};
use zabbix_deploy::ports::{PortProbe, Ports};
use zabbix_deploy::prereq::{HostCheck, Tool};
use zabbix_deploy::probe::{HttpProbe, Reachability};
use zabbix_deploy::prompt::Prompter;
use zabbix_deploy::provisioning::ProvisioningConfig;
use zabbix_deploy::proxy::ProxyControl;
use zabbix_deploy::runtime::{LogSelector, ServiceState, StackRuntime};
use zabbix_deploy::settings::{Readiness, Settings};
use zabbix_deploy::stack::{AGENT, DATABASE, SERVER, WEB};

pub fn scenario_config(ports: Ports) -> ProvisioningConfig {
    ProvisioningConfig::new("mon.example.com", "ops@example.com", "R1!", "A1!", ports)
        .expect("valid config")
}

/// Settings rooted entirely inside `root`.
pub fn settings_in(root: &Path) -> Settings {
    Settings::new()
        .install_dir(root.join("zabbix"))
        .nginx_dirs(root.join("sites-available"), root.join("sites-enabled"))
        .acme_webroot(root.join("certbot"))
        .letsencrypt_live(root.join("live"))
        .manage_script(root.join("bin/zabbix-manage"))
        .readiness(Readiness::Fixed(std::time::Duration::ZERO))
}

pub fn states(pairs: &[(&str, &str)]) -> Vec<ServiceState> {
    pairs
        .iter()
        .map(|(name, state)| ServiceState::new(name, state))
        .collect()
}

pub fn all_running() -> Vec<ServiceState> {
    states(&[
        (DATABASE, "running"),
        (SERVER, "running"),
        (WEB, "running"),
        (AGENT, "running"),
    ])
}

/// Records every call. `status` walks through the scripted states
/// and then keeps returning the last one.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    calls: Rc<RefCell<Vec<String>>>,
    states: Rc<RefCell<VecDeque<Vec<ServiceState>>>>,
    logs: String,
    dump: Option<String>,
}

impl FakeRuntime {
    pub fn new(sequence: Vec<Vec<ServiceState>>) -> Self {
        Self {
            states: Rc::new(RefCell::new(sequence.into())),
            logs: "mysql  | [ERROR] InnoDB: cannot allocate memory".to_string(),
            dump: Some("-- MySQL dump\nCREATE TABLE hosts (id int);\n".to_string()),
            ..Default::default()
        }
    }

    pub fn healthy() -> Self {
        Self::new(vec![all_running()])
    }

    pub fn failing_dump(mut self) -> Self {
        self.dump = None;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl StackRuntime for FakeRuntime {
    fn apply(&self) -> DeployResult<()> {
        self.record("apply".into());
        Ok(())
    }

    fn start(&self) -> DeployResult<()> {
        self.record("start".into());
        Ok(())
    }

    fn stop(&self) -> DeployResult<()> {
        self.record("stop".into());
        Ok(())
    }

    fn restart(&self) -> DeployResult<()> {
        self.record("restart".into());
        Ok(())
    }

    fn pull(&self) -> DeployResult<()> {
        self.record("pull".into());
        Ok(())
    }

    fn status(&self) -> DeployResult<Vec<ServiceState>> {
        self.record("status".into());
        let mut queue = self.states.borrow_mut();
        if queue.len() > 1 {
            Ok(queue.pop_front().unwrap_or_default())
        } else {
            Ok(queue.front().cloned().unwrap_or_default())
        }
    }

    fn follow_logs(&self, selector: LogSelector<'_>) -> DeployResult<()> {
        self.record(format!("logs {selector}"));
        Ok(())
    }

    fn log_tail(&self, lines: u32) -> DeployResult<String> {
        self.record(format!("log_tail {lines}"));
        Ok(self.logs.clone())
    }

    fn exec_interactive(
        &self,
        service: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> DeployResult<()> {
        let names: Vec<&str> = envs.iter().map(|(k, _)| *k).collect();
        self.record(format!(
            "exec {service} {} [{}]",
            args.join(" "),
            names.join(",")
        ));
        Ok(())
    }

    fn exec_to_file(
        &self,
        service: &str,
        args: &[&str],
        _envs: &[(&str, &str)],
        dest: &Path,
    ) -> DeployResult<()> {
        self.record(format!("exec_to_file {service} {}", args[0]));
        match &self.dump {
            Some(text) => {
                fs::write(dest, text)?;
                Ok(())
            }
            None => {
                fs::write(dest, "-- truncated")?;
                Err(DeployError::Other("mysqldump exited with 2".into()))
            }
        }
    }
}

/// Ports listed as busy are reported in use.
pub struct FakePorts(pub BTreeSet<u16>);

impl FakePorts {
    pub fn free() -> Self {
        Self(BTreeSet::new())
    }

    pub fn busy(ports: &[u16]) -> Self {
        Self(ports.iter().copied().collect())
    }
}

impl PortProbe for FakePorts {
    fn in_use(&self, port: u16) -> bool {
        self.0.contains(&port)
    }
}

#[derive(Clone)]
pub struct FakeHttp {
    pub answer: Reachability,
    pub probes: Rc<Cell<u32>>,
}

impl FakeHttp {
    pub fn new(answer: Reachability) -> Self {
        Self {
            answer,
            probes: Rc::new(Cell::new(0)),
        }
    }
}

impl HttpProbe for FakeHttp {
    fn probe(&self, _port: u16) -> Reachability {
        self.probes.set(self.probes.get() + 1);
        self.answer
    }
}

/// `check` answers come from the script, then default to valid.
/// An `unavailable` proxy cannot run its validator at all.
#[derive(Clone, Default)]
pub struct FakeProxy {
    verdicts: Rc<RefCell<VecDeque<bool>>>,
    unavailable: bool,
    pub checks: Rc<Cell<u32>>,
    pub reloads: Rc<Cell<u32>>,
}

impl FakeProxy {
    pub fn with_verdicts(verdicts: &[bool]) -> Self {
        Self {
            verdicts: Rc::new(RefCell::new(verdicts.iter().copied().collect())),
            ..Default::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }
}

impl ProxyControl for FakeProxy {
    fn check(&self) -> DeployResult<(bool, String)> {
        self.checks.set(self.checks.get() + 1);
        if self.unavailable {
            return Err(DeployError::CommandNotFound("nginx".into()));
        }
        let ok = self.verdicts.borrow_mut().pop_front().unwrap_or(true);
        let output = if ok {
            "nginx: configuration file /etc/nginx/nginx.conf test is successful".to_string()
        } else {
            "nginx: [emerg] cannot load certificate".to_string()
        };
        Ok((ok, output))
    }

    fn reload(&self) -> DeployResult<()> {
        self.reloads.set(self.reloads.get() + 1);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeIssuer {
    pub issued: Rc<RefCell<Vec<String>>>,
}

impl CertificateIssuer for FakeIssuer {
    fn issue(&self, domain: &str, email: &str, _webroot: &Path) -> DeployResult<()> {
        self.issued.borrow_mut().push(format!("{domain} {email}"));
        Ok(())
    }
}

/// Replays scripted answers in order. Running out is an error.
#[derive(Clone, Default)]
pub struct ScriptedPrompter {
    answers: Rc<RefCell<VecDeque<String>>>,
    confirms: Rc<RefCell<VecDeque<bool>>>,
    pub asked: Rc<RefCell<Vec<String>>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Rc::new(RefCell::new(
                answers.iter().map(|a| (*a).to_string()).collect(),
            )),
            ..Default::default()
        }
    }

    pub fn scenario() -> Self {
        Self::new(&["mon.example.com", "ops@example.com", "R1!", "R1!", "A1!", "A1!"])
    }

    pub fn confirms(self, confirms: &[bool]) -> Self {
        self.confirms.borrow_mut().extend(confirms.iter().copied());
        self
    }

    fn next(&self, prompt: &str) -> DeployResult<String> {
        self.asked.borrow_mut().push(prompt.to_string());
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| DeployError::Other(format!("no scripted answer for '{prompt}'")))
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&self, prompt: &str, _default: Option<&str>) -> DeployResult<String> {
        self.next(prompt)
    }

    fn secret(&self, prompt: &str) -> DeployResult<String> {
        self.next(prompt)
    }

    fn confirm(&self, prompt: &str, _default: bool) -> DeployResult<bool> {
        self.asked.borrow_mut().push(prompt.to_string());
        self.confirms
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| DeployError::Other(format!("no scripted confirmation for '{prompt}'")))
    }
}

/// Root host with plenty of memory. Tools not in `present` get
/// "installed" on request.
#[derive(Clone)]
pub struct FakeHost {
    pub uid: u32,
    pub memory_mib: Option<u64>,
    pub present: Rc<RefCell<Vec<Tool>>>,
    pub installed: Rc<RefCell<Vec<Tool>>>,
    pub broken_install: bool,
}

impl FakeHost {
    pub fn ready() -> Self {
        Self {
            uid: 0,
            memory_mib: Some(4096),
            present: Rc::new(RefCell::new(Tool::ALL.to_vec())),
            installed: Rc::new(RefCell::new(Vec::new())),
            broken_install: false,
        }
    }

    pub fn missing(self, tools: &[Tool]) -> Self {
        self.present.borrow_mut().retain(|t| !tools.contains(t));
        self
    }
}

impl HostCheck for FakeHost {
    fn uid(&self) -> DeployResult<u32> {
        Ok(self.uid)
    }

    fn memory_mib(&self) -> Option<u64> {
        self.memory_mib
    }

    fn has(&self, tool: Tool) -> bool {
        self.present.borrow().contains(&tool)
    }

    fn install(&self, tool: Tool) -> DeployResult<()> {
        self.installed.borrow_mut().push(tool);
        if !self.broken_install {
            self.present.borrow_mut().push(tool);
        }
        Ok(())
    }
}
