use std::path::Path;

use zabbix_deploy::error::DeployError;

#[test]
fn display_not_root() {
    let err = DeployError::NotRoot(1000);
    assert_eq!(err.to_string(), "must be run as root (current uid: 1000)");
}

#[test]
fn display_validation() {
    let err = DeployError::validation("domain", "must not be empty");
    assert_eq!(err.to_string(), "invalid domain: must not be empty");
}

#[test]
fn display_prompt_exhausted() {
    let err = DeployError::PromptExhausted("Domain name".into(), 3);
    assert_eq!(err.to_string(), "no valid Domain name after 3 attempts");
}

#[test]
fn display_command_not_found() {
    let err = DeployError::CommandNotFound("docker".into());
    assert_eq!(err.to_string(), "command not found: docker");
}

#[test]
fn display_prerequisite_missing() {
    let err = DeployError::PrerequisiteMissing("certbot".into());
    assert_eq!(err.to_string(), "prerequisite missing: certbot");
}

#[test]
fn display_ports_exhausted() {
    let err = DeployError::PortsExhausted {
        start: 8080,
        end: 8179,
    };
    assert_eq!(err.to_string(), "no free port in 8080..=8179");
}

#[test]
fn display_bring_up_failed_lists_services() {
    let err = DeployError::BringUpFailed {
        services: vec!["mysql".into(), "zabbix-web".into()],
        logs: "tail".into(),
    };
    assert_eq!(
        err.to_string(),
        "stack did not come up, not running: mysql, zabbix-web"
    );
}

#[test]
fn display_proxy_validation() {
    let err = DeployError::ProxyValidation {
        phase: "secured".into(),
        output: "nginx: [emerg] bad".into(),
    };
    assert_eq!(
        err.to_string(),
        "secured virtual host rejected by nginx: nginx: [emerg] bad"
    );
}

#[test]
fn display_dangling_reference() {
    let err = DeployError::DanglingReference {
        service: "zabbix-web".into(),
        target: "zabbix-proxy".into(),
    };
    assert_eq!(
        err.to_string(),
        "stack descriptor references undeclared service 'zabbix-proxy' from 'zabbix-web'"
    );
}

#[test]
fn display_env_missing() {
    let err = DeployError::EnvMissing("MYSQL_PASSWORD".into());
    assert_eq!(
        err.to_string(),
        "environment variable missing: MYSQL_PASSWORD"
    );
}

#[test]
fn display_env_invalid() {
    let err = DeployError::EnvInvalid {
        key: "WEB_PORT".into(),
        value: "http".into(),
    };
    assert_eq!(err.to_string(), "invalid value for WEB_PORT: http");
}

#[test]
fn display_locked() {
    let err = DeployError::Locked("/opt/zabbix-docker/.install.lock".into());
    assert_eq!(
        err.to_string(),
        "another installation is in progress (lock: /opt/zabbix-docker/.install.lock)"
    );
}

#[test]
fn display_file_not_found() {
    let err = DeployError::FileNotFound("/opt/zabbix-docker/.env".into());
    assert_eq!(err.to_string(), "file not found: /opt/zabbix-docker/.env");
}

#[test]
fn io_error_converts() {
    let io = std::fs::read_to_string(Path::new("/nonexistent/zabbix/.env")).unwrap_err();
    let err: DeployError = io.into();
    assert!(matches!(err, DeployError::Io(_)));
}
