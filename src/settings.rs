use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ports::Ports;

pub const DEFAULT_INSTALL_DIR: &str = "/opt/zabbix-docker";
pub const DEFAULT_SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
pub const DEFAULT_SITES_ENABLED: &str = "/etc/nginx/sites-enabled";
pub const DEFAULT_ACME_WEBROOT: &str = "/var/www/certbot";
pub const DEFAULT_LETSENCRYPT_LIVE: &str = "/etc/letsencrypt/live";
pub const DEFAULT_MANAGE_SCRIPT: &str = "/usr/local/bin/zabbix-manage";

pub const COMPOSE_FILE: &str = "docker-compose.yml";
pub const ENV_FILE: &str = ".env";
pub const LOCK_FILE: &str = ".install.lock";

/// Container images for the four stack services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Images {
    pub database: String,
    pub server: String,
    pub web: String,
    pub agent: String,
}

impl Default for Images {
    fn default() -> Self {
        Self {
            database: "mysql:8.0".to_string(),
            server: "zabbix/zabbix-server-mysql:alpine-7.0-latest".to_string(),
            web: "zabbix/zabbix-web-nginx-mysql:alpine-7.0-latest".to_string(),
            agent: "zabbix/zabbix-agent2:alpine-7.0-latest".to_string(),
        }
    }
}

/// How the bring-up verifier waits for the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Poll service state and the web UI with capped exponential
    /// backoff until `max_wait` is spent.
    Poll {
        initial: Duration,
        cap: Duration,
        max_wait: Duration,
    },
    /// Sleep once, then check. Used when no readiness signal is
    /// available.
    Fixed(Duration),
}

impl Default for Readiness {
    fn default() -> Self {
        Self::Poll {
            initial: Duration::from_secs(2),
            cap: Duration::from_secs(15),
            max_wait: Duration::from_secs(180),
        }
    }
}

/// Ambient installer settings: where things live on the host and
/// which thresholds apply.
///
/// ```
/// use zabbix_deploy::Settings;
///
/// let settings = Settings::new().install_dir("/srv/zabbix").timezone("Europe/Paris");
///
/// assert_eq!(settings.compose_path().to_str(), Some("/srv/zabbix/docker-compose.yml"));
/// assert_eq!(settings.timezone, "Europe/Paris");
/// ```
#[derive(Debug, Clone)]
pub struct Settings {
    pub install_dir: PathBuf,
    pub sites_available: PathBuf,
    pub sites_enabled: PathBuf,
    pub acme_webroot: PathBuf,
    pub letsencrypt_live: PathBuf,
    pub manage_script: PathBuf,
    pub images: Images,
    pub timezone: String,
    pub default_ports: Ports,
    pub port_search_span: u16,
    pub min_memory_mib: u64,
    pub readiness: Readiness,
    pub prompt_attempts: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            sites_available: PathBuf::from(DEFAULT_SITES_AVAILABLE),
            sites_enabled: PathBuf::from(DEFAULT_SITES_ENABLED),
            acme_webroot: PathBuf::from(DEFAULT_ACME_WEBROOT),
            letsencrypt_live: PathBuf::from(DEFAULT_LETSENCRYPT_LIVE),
            manage_script: PathBuf::from(DEFAULT_MANAGE_SCRIPT),
            images: Images::default(),
            timezone: "UTC".to_string(),
            default_ports: Ports::default(),
            port_search_span: 100,
            min_memory_mib: 2048,
            readiness: Readiness::default(),
            prompt_attempts: 3,
        }
    }
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `ZABBIX_DEPLOY_*` environment
    /// variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] with an injectable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        if let Some(v) = lookup("ZABBIX_DEPLOY_DIR") {
            settings.install_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ZABBIX_DEPLOY_SITES_AVAILABLE") {
            settings.sites_available = PathBuf::from(v);
        }
        if let Some(v) = lookup("ZABBIX_DEPLOY_SITES_ENABLED") {
            settings.sites_enabled = PathBuf::from(v);
        }
        if let Some(v) = lookup("ZABBIX_DEPLOY_WEBROOT") {
            settings.acme_webroot = PathBuf::from(v);
        }
        if let Some(v) = lookup("ZABBIX_DEPLOY_MANAGE_SCRIPT") {
            settings.manage_script = PathBuf::from(v);
        }
        if let Some(v) = lookup("ZABBIX_DEPLOY_TZ") {
            settings.timezone = v;
        }
        settings
    }

    #[must_use]
    pub fn install_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.install_dir = dir.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn nginx_dirs(mut self, available: impl AsRef<Path>, enabled: impl AsRef<Path>) -> Self {
        self.sites_available = available.as_ref().to_path_buf();
        self.sites_enabled = enabled.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn acme_webroot(mut self, dir: impl AsRef<Path>) -> Self {
        self.acme_webroot = dir.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn letsencrypt_live(mut self, dir: impl AsRef<Path>) -> Self {
        self.letsencrypt_live = dir.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn manage_script(mut self, path: impl AsRef<Path>) -> Self {
        self.manage_script = path.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn images(mut self, images: Images) -> Self {
        self.images = images;
        self
    }

    #[must_use]
    pub fn timezone(mut self, tz: &str) -> Self {
        self.timezone = tz.to_string();
        self
    }

    #[must_use]
    pub const fn default_ports(mut self, ports: Ports) -> Self {
        self.default_ports = ports;
        self
    }

    #[must_use]
    pub const fn readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    #[must_use]
    pub const fn min_memory_mib(mut self, mib: u64) -> Self {
        self.min_memory_mib = mib;
        self
    }

    #[must_use]
    pub fn compose_path(&self) -> PathBuf {
        self.install_dir.join(COMPOSE_FILE)
    }

    #[must_use]
    pub fn env_path(&self) -> PathBuf {
        self.install_dir.join(ENV_FILE)
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.install_dir.join(LOCK_FILE)
    }

    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.install_dir.join("backups")
    }

    /// Certificate and key paths issued for `domain`.
    #[must_use]
    pub fn certificate_paths(&self, domain: &str) -> (PathBuf, PathBuf) {
        let live = self.letsencrypt_live.join(domain);
        (live.join("fullchain.pem"), live.join("privkey.pem"))
    }
}
