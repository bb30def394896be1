use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use fs2::FileExt;
use tracing::{info, warn};

use crate::certbot::{Certbot, CertificateIssuer};
use crate::error::{DeployError, DeployResult};
use crate::manage::{ManageCommand, Manager};
use crate::nginx::{self, VirtualHost};
use crate::ports::{self, PortProbe, SocketTable};
use crate::prereq::{self, AptHost, HostCheck};
use crate::probe::{HttpProbe, LocalHttp};
use crate::prompt::{self, Prompter, TerminalPrompter};
use crate::provisioning::ProvisioningConfig;
use crate::proxy::{Nginx, ProxyConfigurator, ProxyControl};
use crate::render::{self, Rendered};
use crate::runtime::{ComposeRuntime, StackRuntime};
use crate::script;
use crate::settings::Settings;
use crate::ui;
use crate::verify::{Health, Verifier};

const STEPS: u32 = 9;

/// Advisory lock on the install directory, held for as long as this
/// value lives. The kernel releases it when the holder exits, so a
/// lock file left behind by a killed run does not block the next one.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

impl InstallLock {
    pub fn acquire(path: &Path) -> DeployResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if let Err(e) = FileExt::try_lock_exclusive(&file) {
            if e.kind() != fs2::lock_contended_error().kind() {
                return Err(e.into());
            }
            let holder = fs::read_to_string(path).unwrap_or_default();
            warn!(lock = %path.display(), holder = holder.trim(), "install lock is held");
            return Err(DeployError::Locked(path.display().to_string()));
        }

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(error = %e, lock = %self.path.display(), "could not release install lock");
        }
    }
}

/// What a finished installation produced.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub config: ProvisioningConfig,
    pub rendered: Rendered,
    pub health: Health,
}

/// End-to-end installer wiring the provisioning steps together.
pub struct Installer {
    settings: Settings,
    prompter: Box<dyn Prompter>,
    host: Box<dyn HostCheck>,
    ports: Box<dyn PortProbe>,
    http: Box<dyn HttpProbe>,
    runtime: Option<Box<dyn StackRuntime>>,
    proxy: Box<dyn ProxyControl>,
    issuer: Box<dyn CertificateIssuer>,
    manage_binary: Option<PathBuf>,
}

impl Installer {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            prompter: Box::new(TerminalPrompter),
            host: Box::new(AptHost),
            ports: Box::new(SocketTable),
            http: Box::new(LocalHttp::new()),
            runtime: None,
            proxy: Box::new(Nginx),
            issuer: Box::new(Certbot::new()),
            manage_binary: None,
        }
    }

    #[must_use]
    pub fn prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Box::new(prompter);
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl HostCheck + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    #[must_use]
    pub fn port_probe(mut self, probe: impl PortProbe + 'static) -> Self {
        self.ports = Box::new(probe);
        self
    }

    #[must_use]
    pub fn http_probe(mut self, probe: impl HttpProbe + 'static) -> Self {
        self.http = Box::new(probe);
        self
    }

    #[must_use]
    pub fn runtime(mut self, runtime: impl StackRuntime + 'static) -> Self {
        self.runtime = Some(Box::new(runtime));
        self
    }

    #[must_use]
    pub fn proxy(mut self, proxy: impl ProxyControl + 'static) -> Self {
        self.proxy = Box::new(proxy);
        self
    }

    #[must_use]
    pub fn issuer(mut self, issuer: impl CertificateIssuer + 'static) -> Self {
        self.issuer = Box::new(issuer);
        self
    }

    /// Binary the management wrapper execs. Defaults to the running
    /// executable.
    #[must_use]
    pub fn manage_binary(mut self, path: impl AsRef<Path>) -> Self {
        self.manage_binary = Some(path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Parse CLI arguments and dispatch. Without a subcommand the
    /// installer runs.
    pub fn run(self) -> DeployResult<()> {
        self.run_with_args(std::env::args_os())
    }

    /// Same as [`Installer::run`] with an explicit argument list.
    pub fn run_with_args<I, T>(mut self, args: I) -> DeployResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::parse_from(args);

        match cli.command.unwrap_or(Command::Install { dry_run: false }) {
            Command::Install { dry_run: true } => self.preview().map(|_| ()),
            Command::Install { dry_run: false } => self.install().map(|_| ()),
            Command::Manage { dir, args } => {
                if let Some(dir) = dir {
                    self.settings.install_dir = dir;
                }
                self.manage(&args)
            }
        }
    }

    fn with_runtime<T>(&self, f: impl FnOnce(&dyn StackRuntime) -> T) -> T {
        match &self.runtime {
            Some(rt) => f(rt.as_ref()),
            None => f(&ComposeRuntime::new(&self.settings.install_dir)),
        }
    }

    /// Parse and run one management command.
    pub fn manage<S: AsRef<str>>(&self, args: &[S]) -> DeployResult<()> {
        let command = ManageCommand::parse(args)?;
        self.with_runtime(|rt| Manager::new(rt, &self.settings).dispatch(command))
    }

    /// Configuration from a previous run, if one is on disk.
    fn previous(&self) -> Option<ProvisioningConfig> {
        let path = self.settings.env_path();
        if !path.exists() {
            return None;
        }
        match ProvisioningConfig::from_env_file(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(error = %e, "existing env file unreadable, treating as fresh install");
                None
            }
        }
    }

    /// Collect answers and settle the ports. A previous installation
    /// keeps its ports and database credentials.
    fn configure(&self, previous: Option<&ProvisioningConfig>) -> DeployResult<ProvisioningConfig> {
        let answers = prompt::collect(
            self.prompter.as_ref(),
            self.settings.prompt_attempts,
            previous,
        )?;

        let ports = match previous {
            Some(prev) => {
                ui::info("keeping ports from the existing installation");
                prev.ports()
            }
            None => ports::negotiate_all(
                self.settings.default_ports,
                self.settings.port_search_span,
                self.ports.as_ref(),
            )?,
        };
        ui::success(&format!(
            "ports: web {}, server {}, database 127.0.0.1:{}",
            ports.web, ports.server, ports.database
        ));
        answers.into_config(ports)
    }

    fn vhost(&self, config: &ProvisioningConfig) -> VirtualHost {
        VirtualHost::new(config.domain(), config.ports().web)
            .webroot(&self.settings.acme_webroot)
            .security_headers()
    }

    /// Show what an installation would write, without changing the
    /// host.
    pub fn preview(&self) -> DeployResult<Rendered> {
        let config = self.configure(self.previous().as_ref())?;
        let rendered = render::render(&config, &self.settings)?;
        let vhost = self.vhost(&config);
        let (cert, key) = self.settings.certificate_paths(config.domain());

        eprintln!("=== Dry run: no changes will be made ===");
        eprintln!();
        eprintln!("--- {} ---", self.settings.compose_path().display());
        println!("{}", rendered.descriptor);
        eprintln!("--- {} ---", self.settings.env_path().display());
        println!("{}", config.to_redacted_env_file());
        eprintln!("--- nginx ({}) ---", nginx::Phase::Challenge.as_str());
        println!("{}", nginx::render_challenge(&vhost));
        eprintln!("--- nginx ({}) ---", nginx::Phase::Secured.as_str());
        println!("{}", nginx::render_secured(&vhost, &cert, &key));

        Ok(rendered)
    }

    /// Run every provisioning step in order. Any failure stops the
    /// run; nothing already created is rolled back.
    pub fn install(&self) -> DeployResult<InstallReport> {
        ui::step(1, STEPS, "Checking prerequisites");
        prereq::resolve(
            self.host.as_ref(),
            self.prompter.as_ref(),
            self.settings.min_memory_mib,
        )?;

        fs::create_dir_all(&self.settings.install_dir)?;
        let _lock = InstallLock::acquire(&self.settings.lock_path())?;

        let previous = self.previous();
        if previous.is_some() {
            ui::warn(&format!(
                "existing installation found in {}",
                self.settings.install_dir.display()
            ));
            if !self
                .prompter
                .confirm("Re-render its configuration and re-apply the stack?", false)?
            {
                return Err(DeployError::Aborted("existing installation kept".into()));
            }
        }

        ui::step(2, STEPS, "Collecting configuration");
        let config = self.configure(previous.as_ref())?;

        ui::step(3, STEPS, "Rendering stack");
        let rendered = render::write(&config, &self.settings)?;
        ui::success(&format!("wrote {}", self.settings.compose_path().display()));
        ui::success(&format!("wrote {}", self.settings.env_path().display()));

        ui::step(4, STEPS, "Starting containers");
        let health = self.with_runtime(|rt| {
            Verifier::new(rt, self.http.as_ref(), self.settings.readiness)
                .bring_up(config.ports().web)
        })?;

        let vhost = self.vhost(&config);
        let proxy = ProxyConfigurator::new(self.proxy.as_ref(), &self.settings);

        ui::step(5, STEPS, "Configuring nginx for the ACME challenge");
        proxy.challenge(&vhost)?;
        ui::success(&format!("{} enabled", proxy.site_path(config.domain()).display()));

        ui::step(6, STEPS, "Requesting TLS certificate");
        self.issuer
            .issue(config.domain(), config.email(), &self.settings.acme_webroot)?;
        ui::success(&format!("certificate issued for {}", config.domain()));

        ui::step(7, STEPS, "Enabling HTTPS");
        let (cert, key) = self.settings.certificate_paths(config.domain());
        proxy.secure(&vhost, &cert, &key)?;
        ui::success("HTTPS virtual host active");

        ui::step(8, STEPS, "Installing management script");
        let binary = match &self.manage_binary {
            Some(path) => path.clone(),
            None => std::env::current_exe()?,
        };
        script::install(&self.settings.manage_script, &binary, &self.settings.install_dir)?;
        ui::success(&format!("{}", self.settings.manage_script.display()));

        ui::step(9, STEPS, "Done");
        self.summary(&config);
        info!(domain = config.domain(), "installation complete");

        Ok(InstallReport {
            config,
            rendered,
            health,
        })
    }

    fn summary(&self, config: &ProvisioningConfig) {
        let ports = config.ports();
        ui::info(&format!("Web UI:        {}", config.url()));
        ui::info("Login:         Admin / zabbix (change it on first login)");
        ui::info(&format!("Zabbix server: port {}", ports.server));
        ui::info(&format!("Install dir:   {}", self.settings.install_dir.display()));
        ui::info(&format!(
            "Manage with:   {} {{start|stop|restart|logs|status|backup|update|mysql}}",
            self.settings.manage_script.display()
        ));
    }
}

#[derive(Parser)]
#[command(name = "zabbix-deploy")]
#[command(about = "Install and operate a Zabbix stack behind nginx with TLS")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Install the stack (default)
    Install {
        /// Print generated files without changing the host
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a management command against an installed stack
    Manage {
        /// Installation directory [default: $ZABBIX_DEPLOY_DIR or /opt/zabbix-docker]
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Command and its argument, e.g. `logs web`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}
