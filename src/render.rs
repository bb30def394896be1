use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::compose;
use crate::error::{DeployError, DeployResult};
use crate::provisioning::ProvisioningConfig;
use crate::settings::Settings;
use crate::stack;

/// The two rendered stack artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub descriptor: String,
    pub env_file: String,
}

impl Rendered {
    /// Placeholders in the descriptor with no key in the env file.
    #[must_use]
    pub fn dangling_placeholders(&self) -> Vec<String> {
        let keys: Vec<&str> = self
            .env_file
            .lines()
            .filter(|l| !l.trim_start().starts_with('#'))
            .filter_map(|l| l.split_once('=').map(|(k, _)| k.trim()))
            .collect();
        compose::placeholders(&self.descriptor)
            .into_iter()
            .filter(|p| !keys.contains(&p.as_str()))
            .collect()
    }
}

/// Render descriptor and env file without touching the disk.
pub fn render(config: &ProvisioningConfig, settings: &Settings) -> DeployResult<Rendered> {
    let services = stack::services(config, settings);
    stack::check_references(&services)?;

    let rendered = Rendered {
        descriptor: compose::render(&services)?,
        env_file: config.to_env_file(),
    };

    let dangling = rendered.dangling_placeholders();
    if !dangling.is_empty() {
        return Err(DeployError::EnvMissing(dangling.join(", ")));
    }
    Ok(rendered)
}

/// Create the bind-mount directories under `install_dir`.
pub fn create_layout(install_dir: &Path) -> DeployResult<Vec<PathBuf>> {
    let mut created = Vec::with_capacity(stack::MOUNT_DIRS.len());
    for dir in stack::MOUNT_DIRS {
        let path = install_dir.join(dir);
        fs::create_dir_all(&path)?;
        created.push(path);
    }
    Ok(created)
}

/// Render, lay out the mount directories, then write both files.
/// The env file is readable by root only.
pub fn write(config: &ProvisioningConfig, settings: &Settings) -> DeployResult<Rendered> {
    let rendered = render(config, settings)?;

    fs::create_dir_all(&settings.install_dir)?;
    create_layout(&settings.install_dir)?;

    write_private(&settings.env_path(), &rendered.env_file)?;
    fs::write(settings.compose_path(), &rendered.descriptor)?;

    info!(dir = %settings.install_dir.display(), "stack rendered");
    Ok(rendered)
}

/// Write `content` with mode 0600 on unix.
pub fn write_private(path: &Path, content: &str) -> DeployResult<()> {
    fs::write(path, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
