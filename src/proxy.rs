//! Writes, enables, validates and reloads the nginx virtual host.
//!
//! A new revision only stays on disk if `nginx -t` accepts it;
//! otherwise the previous revision (or nothing) is put back before
//! the error is returned, so the running proxy never reloads into a
//! broken configuration.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cmd;
use crate::error::{DeployError, DeployResult};
use crate::nginx::{self, Phase, VirtualHost};
use crate::settings::Settings;

/// Control surface of the reverse proxy.
pub trait ProxyControl {
    /// Validate the on-disk configuration. Returns whether it passed
    /// and the validator's output.
    fn check(&self) -> DeployResult<(bool, String)>;

    fn reload(&self) -> DeployResult<()>;
}

/// nginx managed by systemd.
#[derive(Debug, Default, Clone, Copy)]
pub struct Nginx;

impl ProxyControl for Nginx {
    fn check(&self) -> DeployResult<(bool, String)> {
        cmd::run_combined("nginx", &["-t"])
    }

    fn reload(&self) -> DeployResult<()> {
        cmd::run("systemctl", &["reload", "nginx"]).map(|_| ())
    }
}

pub struct ProxyConfigurator<'a> {
    control: &'a dyn ProxyControl,
    sites_available: PathBuf,
    sites_enabled: PathBuf,
    webroot: PathBuf,
}

impl<'a> ProxyConfigurator<'a> {
    #[must_use]
    pub fn new(control: &'a dyn ProxyControl, settings: &Settings) -> Self {
        Self {
            control,
            sites_available: settings.sites_available.clone(),
            sites_enabled: settings.sites_enabled.clone(),
            webroot: settings.acme_webroot.clone(),
        }
    }

    #[must_use]
    pub fn site_path(&self, domain: &str) -> PathBuf {
        self.sites_available.join(domain)
    }

    #[must_use]
    pub fn enabled_path(&self, domain: &str) -> PathBuf {
        self.sites_enabled.join(domain)
    }

    /// Install the challenge-only virtual host.
    pub fn challenge(&self, vhost: &VirtualHost) -> DeployResult<()> {
        fs::create_dir_all(&self.webroot)?;
        self.apply(&vhost.domain, Phase::Challenge, &nginx::render_challenge(vhost))
    }

    /// Replace the challenge host with the TLS one.
    pub fn secure(&self, vhost: &VirtualHost, cert: &Path, key: &Path) -> DeployResult<()> {
        self.apply(
            &vhost.domain,
            Phase::Secured,
            &nginx::render_secured(vhost, cert, key),
        )
    }

    /// Write `content` as the site for `domain`, enable it, validate
    /// and reload. When validation fails or cannot run, the previous
    /// state is restored and nothing is reloaded.
    pub fn apply(&self, domain: &str, phase: Phase, content: &str) -> DeployResult<()> {
        fs::create_dir_all(&self.sites_available)?;
        fs::create_dir_all(&self.sites_enabled)?;

        let site = self.site_path(domain);
        let link = self.enabled_path(domain);

        let previous = match fs::read_to_string(&site) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        let link_existed = fs::symlink_metadata(&link).is_ok();

        write_atomic(&site, content)?;
        if !link_existed {
            enable(&site, &link)?;
        }

        let rejected = match self.control.check() {
            Ok((true, _)) => None,
            Ok((false, output)) => Some(DeployError::ProxyValidation {
                phase: phase.as_str().to_string(),
                output,
            }),
            Err(e) => Some(e),
        };
        if let Some(err) = rejected {
            warn!(domain, phase = phase.as_str(), error = %err, "virtual host not accepted, rolling back");
            restore(&site, &link, previous.as_deref())?;
            return Err(err);
        }

        self.control.reload()?;
        info!(domain, phase = phase.as_str(), "virtual host active");
        Ok(())
    }
}

/// Put back the previous site revision, or remove the site and its
/// link if there was none.
fn restore(site: &Path, link: &Path, previous: Option<&str>) -> DeployResult<()> {
    match previous {
        Some(text) => write_atomic(site, text),
        None => {
            remove_if_present(link)?;
            remove_if_present(site)
        }
    }
}

fn write_atomic(path: &Path, content: &str) -> DeployResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn remove_if_present(path: &Path) -> DeployResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn enable(site: &Path, link: &Path) -> DeployResult<()> {
    std::os::unix::fs::symlink(site, link)?;
    Ok(())
}

#[cfg(not(unix))]
fn enable(site: &Path, link: &Path) -> DeployResult<()> {
    fs::copy(site, link)?;
    Ok(())
}
