//! The provisioning configuration and its persisted form, the
//! stack's environment file.

use std::fmt;
use std::path::Path;

use crate::error::{DeployError, DeployResult};
use crate::ports::Ports;

pub const KEY_DOMAIN: &str = "DOMAIN";
pub const KEY_WEB_PORT: &str = "WEB_PORT";
pub const KEY_ZABBIX_PORT: &str = "ZABBIX_PORT";
pub const KEY_MYSQL_PORT: &str = "MYSQL_PORT";
pub const KEY_MYSQL_ROOT_PASSWORD: &str = "MYSQL_ROOT_PASSWORD";
pub const KEY_MYSQL_PASSWORD: &str = "MYSQL_PASSWORD";
pub const KEY_EMAIL: &str = "EMAIL";

/// Keys of the environment file, in the order they are written.
pub const ENV_KEYS: [&str; 7] = [
    KEY_DOMAIN,
    KEY_WEB_PORT,
    KEY_ZABBIX_PORT,
    KEY_MYSQL_PORT,
    KEY_MYSQL_ROOT_PASSWORD,
    KEY_MYSQL_PASSWORD,
    KEY_EMAIL,
];

/// A credential that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Everything the installer needs to render the stack. Built once,
/// then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningConfig {
    domain: String,
    email: String,
    root_password: Secret,
    app_password: Secret,
    ports: Ports,
}

impl ProvisioningConfig {
    /// Validate and assemble a configuration.
    pub fn new(
        domain: &str,
        email: &str,
        root_password: &str,
        app_password: &str,
        ports: Ports,
    ) -> DeployResult<Self> {
        validate_domain(domain)?;
        validate_email(email)?;
        validate_secret("database root password", root_password)?;
        validate_secret("database application password", app_password)?;

        Ok(Self {
            domain: domain.trim().to_string(),
            email: email.trim().to_string(),
            root_password: Secret::new(root_password),
            app_password: Secret::new(app_password),
            ports,
        })
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub const fn root_password(&self) -> &Secret {
        &self.root_password
    }

    #[must_use]
    pub const fn app_password(&self) -> &Secret {
        &self.app_password
    }

    #[must_use]
    pub const fn ports(&self) -> Ports {
        self.ports
    }

    /// Public URL of the web UI once TLS is in place.
    #[must_use]
    pub fn url(&self) -> String {
        format!("https://{}", self.domain)
    }

    /// Key/value pairs written to the environment file, in
    /// [`ENV_KEYS`] order.
    #[must_use]
    pub fn env_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (KEY_DOMAIN, self.domain.clone()),
            (KEY_WEB_PORT, self.ports.web.to_string()),
            (KEY_ZABBIX_PORT, self.ports.server.to_string()),
            (KEY_MYSQL_PORT, self.ports.database.to_string()),
            (KEY_MYSQL_ROOT_PASSWORD, self.root_password.0.clone()),
            (KEY_MYSQL_PASSWORD, self.app_password.0.clone()),
            (KEY_EMAIL, self.email.clone()),
        ]
    }

    /// Render the environment file.
    #[must_use]
    pub fn to_env_file(&self) -> String {
        let mut out = String::from("# Generated by zabbix-deploy. Read by zabbix-manage.\n");
        for (key, value) in self.env_pairs() {
            out.push_str(key);
            out.push('=');
            out.push_str(&quote_env_value(&value));
            out.push('\n');
        }
        out
    }

    /// Same as [`ProvisioningConfig::to_env_file`] with credentials
    /// masked, for previews.
    #[must_use]
    pub fn to_redacted_env_file(&self) -> String {
        self.to_env_file()
            .lines()
            .map(|line| match line.split_once('=') {
                Some((key, _)) if key == KEY_MYSQL_ROOT_PASSWORD || key == KEY_MYSQL_PASSWORD => {
                    format!("{key}=********\n")
                }
                _ => format!("{line}\n"),
            })
            .collect()
    }

    /// Load a configuration back from an environment file written by
    /// [`ProvisioningConfig::to_env_file`].
    pub fn from_env_file(path: &Path) -> DeployResult<Self> {
        if !path.exists() {
            return Err(DeployError::FileNotFound(path.display().to_string()));
        }
        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| DeployError::Other(format!("{}: {e}", path.display())))?;

        let mut pairs = Vec::new();
        for item in iter {
            let (key, value) =
                item.map_err(|e| DeployError::Other(format!("{}: {e}", path.display())))?;
            pairs.push((key, value));
        }
        Self::from_pairs(&pairs)
    }

    /// Build from parsed key/value pairs. Later duplicates win.
    pub fn from_pairs(pairs: &[(String, String)]) -> DeployResult<Self> {
        let get = |key: &str| -> DeployResult<String> {
            pairs
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| DeployError::EnvMissing(key.to_string()))
        };
        let port = |key: &str| -> DeployResult<u16> {
            let value = get(key)?;
            value.parse().map_err(|_| DeployError::EnvInvalid {
                key: key.to_string(),
                value,
            })
        };

        let ports = Ports::new(
            port(KEY_WEB_PORT)?,
            port(KEY_ZABBIX_PORT)?,
            port(KEY_MYSQL_PORT)?,
        );
        Self::new(
            &get(KEY_DOMAIN)?,
            &get(KEY_EMAIL)?,
            &get(KEY_MYSQL_ROOT_PASSWORD)?,
            &get(KEY_MYSQL_PASSWORD)?,
            ports,
        )
    }
}

/// Quote a value so that both `docker compose` and `dotenvy` read it
/// back verbatim.
fn quote_env_value(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_.:/@+!%,".contains(c));
    if plain {
        value.to_string()
    } else if !value.contains('\'') {
        format!("'{value}'")
    } else {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$");
        format!("\"{escaped}\"")
    }
}

/// Dotted labels of ASCII letters, digits and hyphens.
pub fn validate_domain(domain: &str) -> DeployResult<()> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(DeployError::validation("domain", "must not be empty"));
    }
    if domain.len() > 253 || !domain.contains('.') {
        return Err(DeployError::validation(
            "domain",
            "expected a fully qualified name like mon.example.com",
        ));
    }
    let labels_ok = domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if labels_ok {
        Ok(())
    } else {
        Err(DeployError::validation(
            "domain",
            "labels may only contain letters, digits and inner hyphens",
        ))
    }
}

pub fn validate_email(email: &str) -> DeployResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(DeployError::validation("email", "must not be empty"));
    }
    match email.split_once('@') {
        Some((local, host))
            if !local.is_empty()
                && host.contains('.')
                && !host.starts_with('.')
                && !host.ends_with('.')
                && !email.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(DeployError::validation("email", "expected user@example.com")),
    }
}

pub fn validate_secret(field: &str, value: &str) -> DeployResult<()> {
    if value.is_empty() {
        return Err(DeployError::validation(field, "must not be empty"));
    }
    if value.contains(['\n', '\r']) {
        return Err(DeployError::validation(field, "must be a single line"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProvisioningConfig {
        ProvisioningConfig::new(
            "mon.example.com",
            "ops@example.com",
            "R1!",
            "A1!",
            Ports::default(),
        )
        .unwrap()
    }

    #[test]
    fn secret_debug_is_redacted() {
        let debug = format!("{:?}", sample());

        assert!(!debug.contains("R1!"));
        assert!(!debug.contains("A1!"));
        assert!(debug.contains("Secret(***)"));
    }

    #[test]
    fn quoting() {
        assert_eq!(quote_env_value("R1!"), "R1!");
        assert_eq!(quote_env_value("a b"), "'a b'");
        assert_eq!(quote_env_value("pa$$"), "'pa$$'");
        assert_eq!(quote_env_value("it's $x"), "\"it's \\$x\"");
    }

    #[test]
    fn redacted_env_file_hides_credentials() {
        let text = sample().to_redacted_env_file();

        assert!(text.contains("MYSQL_ROOT_PASSWORD=********"));
        assert!(text.contains("MYSQL_PASSWORD=********"));
        assert!(text.contains("DOMAIN=mon.example.com"));
        assert!(!text.contains("R1!"));
    }

    #[test]
    fn domain_rules() {
        assert!(validate_domain("mon.example.com").is_ok());
        assert!(validate_domain("").is_err());
        assert!(validate_domain("localhost").is_err());
        assert!(validate_domain("bad..example.com").is_err());
        assert!(validate_domain("-x.example.com").is_err());
        assert!(validate_domain("a_b.example.com").is_err());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("ops@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("ops").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ops@localhost").is_err());
    }
}
