use std::path::Path;

use crate::cmd;
use crate::error::{DeployError, DeployResult};

/// Obtains a certificate for a domain.
pub trait CertificateIssuer {
    /// Issue (or renew) a certificate for `domain`, answering the
    /// HTTP-01 challenge from `webroot`.
    fn issue(&self, domain: &str, email: &str, webroot: &Path) -> DeployResult<()>;
}

/// Let's Encrypt through the `certbot` CLI in webroot mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct Certbot {
    pub staging: bool,
}

impl Certbot {
    #[must_use]
    pub const fn new() -> Self {
        Self { staging: false }
    }

    #[must_use]
    pub const fn staging(mut self) -> Self {
        self.staging = true;
        self
    }

    /// Arguments passed to `certbot`.
    #[must_use]
    pub fn args(&self, domain: &str, email: &str, webroot: &Path) -> Vec<String> {
        let mut args: Vec<String> = [
            "certonly",
            "--webroot",
            "-w",
            &webroot.display().to_string(),
            "-d",
            domain,
            "--email",
            email,
            "--agree-tos",
            "--no-eff-email",
            "--non-interactive",
            "--keep-until-expiring",
        ]
        .iter()
        .map(|a| (*a).to_string())
        .collect();
        if self.staging {
            args.push("--staging".to_string());
        }
        args
    }
}

impl CertificateIssuer for Certbot {
    fn issue(&self, domain: &str, email: &str, webroot: &Path) -> DeployResult<()> {
        let args = self.args(domain, email, webroot);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_interactive("certbot", &refs).map_err(|e| match e {
            DeployError::CommandFailed { .. } => DeployError::Certificate(domain.to_string()),
            other => other,
        })
    }
}
