use std::process::ExitStatus;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("must be run as root (current uid: {0})")]
    NotRoot(u32),

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no valid {0} after {1} attempts")]
    PromptExhausted(String, u32),

    #[error("aborted by operator: {0}")]
    Aborted(String),

    #[error("command failed: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("no free port in {start}..={end}")]
    PortsExhausted { start: u16, end: u16 },

    #[error("stack did not come up, not running: {}", .services.join(", "))]
    BringUpFailed { services: Vec<String>, logs: String },

    #[error("{phase} virtual host rejected by nginx: {output}")]
    ProxyValidation { phase: String, output: String },

    #[error("certificate issuance failed for {0}")]
    Certificate(String),

    #[error("stack descriptor references undeclared service '{target}' from '{service}'")]
    DanglingReference { service: String, target: String },

    #[error("{0}")]
    Usage(String),

    #[error("environment variable missing: {0}")]
    EnvMissing(String),

    #[error("invalid value for {key}: {value}")]
    EnvInvalid { key: String, value: String },

    #[error("another installation is in progress (lock: {0})")]
    Locked(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl DeployError {
    pub fn validation(field: &str, reason: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}
