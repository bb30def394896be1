use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use zabbix_deploy::{DeployError, Installer, Settings, ui};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Installer::new(Settings::from_env()).run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(DeployError::Usage(text)) => {
            eprintln!("{text}");
            ExitCode::from(2)
        }
        Err(e) => {
            ui::error(&format!("{:#}", anyhow::Error::from(e)));
            ExitCode::FAILURE
        }
    }
}
