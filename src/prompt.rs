use dialoguer::{Confirm, Input, Password};

use crate::error::{DeployError, DeployResult};
use crate::ports::Ports;
use crate::provisioning::{
    ProvisioningConfig, Secret, validate_domain, validate_email, validate_secret,
};
use crate::ui;

/// Source of operator answers.
pub trait Prompter {
    /// Free-form text line. An empty answer selects `default` when
    /// one is given.
    fn input(&self, prompt: &str, default: Option<&str>) -> DeployResult<String>;

    /// One hidden entry.
    fn secret(&self, prompt: &str) -> DeployResult<String>;

    /// Yes/no question.
    fn confirm(&self, prompt: &str, default: bool) -> DeployResult<bool>;
}

/// Terminal prompts via `dialoguer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn input(&self, prompt: &str, default: Option<&str>) -> DeployResult<String> {
        let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
        if let Some(value) = default {
            input = input.default(value.to_string());
        }
        input.interact_text().map_err(dialoguer_error)
    }

    fn secret(&self, prompt: &str) -> DeployResult<String> {
        Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(dialoguer_error)
    }

    fn confirm(&self, prompt: &str, default: bool) -> DeployResult<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(dialoguer_error)
    }
}

fn dialoguer_error(e: dialoguer::Error) -> DeployError {
    DeployError::Other(format!("prompt failed: {e}"))
}

/// Ask until `validate` accepts the trimmed answer, at most
/// `attempts` times.
pub fn ask_valid(
    prompter: &dyn Prompter,
    field: &str,
    default: Option<&str>,
    attempts: u32,
    validate: impl Fn(&str) -> DeployResult<()>,
) -> DeployResult<String> {
    for _ in 0..attempts {
        let answer = prompter.input(field, default)?;
        let answer = match (answer.trim(), default) {
            ("", Some(value)) => value.to_string(),
            (trimmed, _) => trimmed.to_string(),
        };
        match validate(&answer) {
            Ok(()) => return Ok(answer),
            Err(e) => ui::warn(&e.to_string()),
        }
    }
    Err(DeployError::PromptExhausted(field.to_string(), attempts))
}

/// Hidden variant of [`ask_valid`]. Each attempt reads the value and
/// a repeat of it; a mismatch uses up the attempt. Secrets are kept
/// verbatim.
pub fn ask_secret(
    prompter: &dyn Prompter,
    field: &str,
    attempts: u32,
    validate: impl Fn(&str) -> DeployResult<()>,
) -> DeployResult<String> {
    for _ in 0..attempts {
        let answer = prompter.secret(field)?;
        if let Err(e) = validate(&answer) {
            ui::warn(&e.to_string());
            continue;
        }
        let repeat = prompter.secret(&format!("Repeat {field}"))?;
        if repeat == answer {
            return Ok(answer);
        }
        ui::warn(&format!("{field}: values do not match"));
    }
    Err(DeployError::PromptExhausted(field.to_string(), attempts))
}

/// Operator answers, before ports are known.
#[derive(Debug, Clone)]
pub struct Answers {
    pub domain: String,
    pub email: String,
    pub root_password: Secret,
    pub app_password: Secret,
}

impl Answers {
    /// Pair the answers with negotiated ports.
    pub fn into_config(self, ports: Ports) -> DeployResult<ProvisioningConfig> {
        ProvisioningConfig::new(
            &self.domain,
            &self.email,
            self.root_password.expose(),
            self.app_password.expose(),
            ports,
        )
    }
}

/// Collect domain, email and both database credentials.
///
/// With a `previous` installation, domain and email are offered as
/// defaults and the database credentials are kept: the database only
/// reads them when its data directory is first initialised.
pub fn collect(
    prompter: &dyn Prompter,
    attempts: u32,
    previous: Option<&ProvisioningConfig>,
) -> DeployResult<Answers> {
    let domain = ask_valid(
        prompter,
        "Domain name (e.g. zabbix.example.com)",
        previous.map(ProvisioningConfig::domain),
        attempts,
        validate_domain,
    )?;
    let email = ask_valid(
        prompter,
        "Email for Let's Encrypt notifications",
        previous.map(ProvisioningConfig::email),
        attempts,
        validate_email,
    )?;

    if let Some(prev) = previous {
        ui::info("keeping database credentials from the existing installation");
        return Ok(Answers {
            domain,
            email,
            root_password: prev.root_password().clone(),
            app_password: prev.app_password().clone(),
        });
    }

    let root = ask_secret(prompter, "MySQL root password", attempts, |v| {
        validate_secret("MySQL root password", v)
    })?;
    let app = ask_secret(prompter, "MySQL zabbix user password", attempts, |v| {
        validate_secret("MySQL zabbix user password", v)
    })?;

    Ok(Answers {
        domain,
        email,
        root_password: Secret::new(&root),
        app_password: Secret::new(&app),
    })
}
