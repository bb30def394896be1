//! # zabbix-deploy
//!
//! Install a containerised Zabbix stack (`MySQL`, server, web
//! frontend, agent) on a single Debian/Ubuntu host, publish it
//! behind nginx with a Let's Encrypt certificate, and operate it
//! afterwards through a small command table.
//!
//! The installer runs these steps in order and stops at the first
//! failure:
//!
//! 1. Check root, memory and host tools (installing what is missing)
//! 2. Prompt for domain, email and database passwords
//! 3. Pick free host ports for web, server and database
//! 4. Write `docker-compose.yml` and `.env` to the install directory
//! 5. Start the stack and wait until every required service runs
//! 6. Enable an HTTP-only nginx vhost for the ACME challenge
//! 7. Request the certificate with certbot
//! 8. Replace the vhost with the HTTPS reverse proxy
//! 9. Install the `zabbix-manage` wrapper
//!
//! ## Usage
//!
//! ```sh
//! # Interactive install
//! sudo zabbix-deploy
//!
//! # Show generated files without touching the host
//! zabbix-deploy install --dry-run
//!
//! # Day-2 operations
//! zabbix-manage status
//! zabbix-manage logs web
//! zabbix-manage backup
//! ```
//!
//! ## Library use
//!
//! Every host interaction sits behind a trait, so the same flow can
//! run against fakes:
//!
//! ```rust,no_run
//! use zabbix_deploy::{Installer, Settings};
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env().install_dir("/srv/zabbix");
//!     let report = Installer::new(settings).install()?;
//!     println!("{}", report.config.url());
//!     Ok(())
//! }
//! ```

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod backup;
pub mod certbot;
pub mod cmd;
pub mod compose;
pub mod error;
pub mod installer;
pub mod manage;
pub mod nginx;
pub mod ports;
pub mod prereq;
pub mod probe;
pub mod prompt;
pub mod provisioning;
pub mod proxy;
pub mod render;
pub mod runtime;
pub mod script;
pub mod service;
pub mod settings;
pub mod stack;
pub mod ui;
pub mod verify;

pub use certbot::{Certbot, CertificateIssuer};
pub use error::{DeployError, DeployResult};
pub use installer::{InstallReport, Installer};
pub use manage::{ManageCommand, Manager};
pub use nginx::VirtualHost;
pub use ports::{PortProbe, Ports};
pub use prereq::HostCheck;
pub use probe::{HttpProbe, Reachability};
pub use prompt::Prompter;
pub use provisioning::{ProvisioningConfig, Secret};
pub use proxy::ProxyControl;
pub use runtime::{ComposeRuntime, StackRuntime};
pub use service::Service;
pub use settings::{Readiness, Settings};
