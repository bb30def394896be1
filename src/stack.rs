//! The Zabbix stack: database, server, web UI and agent on one
//! bridge network.

use crate::error::{DeployError, DeployResult};
use crate::provisioning::{KEY_MYSQL_PASSWORD, KEY_MYSQL_ROOT_PASSWORD, ProvisioningConfig};
use crate::service::Service;
use crate::settings::Settings;

pub const DATABASE: &str = "mysql";
pub const SERVER: &str = "zabbix-server";
pub const WEB: &str = "zabbix-web";
pub const AGENT: &str = "zabbix-agent";

pub const NETWORK: &str = "zabbix-net";

pub const DB_NAME: &str = "zabbix";
pub const DB_USER: &str = "zabbix";

/// Directory (relative to the install dir) holding persisted data.
pub const DATA_ROOT: &str = "zbx_env";
pub const MYSQL_DATA: &str = "zbx_env/var/lib/mysql";
pub const ALERT_SCRIPTS: &str = "zbx_env/usr/lib/zabbix/alertscripts";
pub const EXTERNAL_SCRIPTS: &str = "zbx_env/usr/lib/zabbix/externalscripts";
pub const MODULES: &str = "zbx_env/var/lib/zabbix/modules";
pub const ENC: &str = "zbx_env/var/lib/zabbix/enc";

/// Host directories that must exist before the stack starts.
pub const MOUNT_DIRS: [&str; 5] = [MYSQL_DATA, ALERT_SCRIPTS, EXTERNAL_SCRIPTS, MODULES, ENC];

/// Services that must be running for the deployment to count as
/// up. The agent is optional.
pub const REQUIRED: [&str; 3] = [DATABASE, SERVER, WEB];

/// Port the web container listens on internally.
pub const WEB_CONTAINER_PORT: u16 = 8080;

/// Build the four services for `config`.
#[must_use]
pub fn services(config: &ProvisioningConfig, settings: &Settings) -> Vec<Service> {
    let ports = config.ports();
    let tz = settings.timezone.as_str();

    let database = Service::new(DATABASE, &settings.images.database)
        .command(&[
            "--character-set-server=utf8mb4",
            "--collation-server=utf8mb4_bin",
            "--log-bin-trust-function-creators=1",
        ])
        .loopback_port(ports.database, 3306)
        .env("MYSQL_DATABASE", DB_NAME)
        .env("MYSQL_USER", DB_USER)
        .env_var("MYSQL_PASSWORD", KEY_MYSQL_PASSWORD)
        .env_var("MYSQL_ROOT_PASSWORD", KEY_MYSQL_ROOT_PASSWORD)
        .volume(&format!("./{MYSQL_DATA}"), "/var/lib/mysql");

    let server = Service::new(SERVER, &settings.images.server)
        .port(ports.server, 10051)
        .host_env("DB_SERVER_HOST", DATABASE)
        .env("MYSQL_DATABASE", DB_NAME)
        .env("MYSQL_USER", DB_USER)
        .env_var("MYSQL_PASSWORD", KEY_MYSQL_PASSWORD)
        .env_var("MYSQL_ROOT_PASSWORD", KEY_MYSQL_ROOT_PASSWORD)
        .env("ZBX_TIMEZONE", tz)
        .volume(&format!("./{ALERT_SCRIPTS}"), "/usr/lib/zabbix/alertscripts:ro")
        .volume(&format!("./{EXTERNAL_SCRIPTS}"), "/usr/lib/zabbix/externalscripts:ro")
        .volume(&format!("./{MODULES}"), "/var/lib/zabbix/modules:ro")
        .volume(&format!("./{ENC}"), "/var/lib/zabbix/enc:ro")
        .depends_on(DATABASE);

    let web = Service::new(WEB, &settings.images.web)
        .port(ports.web, WEB_CONTAINER_PORT)
        .host_env("ZBX_SERVER_HOST", SERVER)
        .host_env("DB_SERVER_HOST", DATABASE)
        .env("MYSQL_DATABASE", DB_NAME)
        .env("MYSQL_USER", DB_USER)
        .env_var("MYSQL_PASSWORD", KEY_MYSQL_PASSWORD)
        .env("PHP_TZ", tz)
        .depends_on(DATABASE)
        .depends_on(SERVER);

    let agent = Service::new(AGENT, &settings.images.agent)
        .host_env("ZBX_SERVER_HOST", SERVER)
        .env("ZBX_HOSTNAME", "Zabbix server")
        .depends_on(SERVER);

    vec![database, server, web, agent]
}

/// Every service reference must name a service in `services`.
pub fn check_references(services: &[Service]) -> DeployResult<()> {
    for svc in services {
        for target in svc.references() {
            if !services.iter().any(|s| s.name == target) {
                return Err(DeployError::DanglingReference {
                    service: svc.name.clone(),
                    target: target.to_string(),
                });
            }
        }
    }
    Ok(())
}
