use std::fs;
use std::path::Path;

use crate::error::DeployResult;

/// Render the `zabbix-manage` wrapper. It hands every argument to
/// `zabbix-deploy manage`, which reads the env file on each call.
#[must_use]
pub fn render(binary: &Path, install_dir: &Path) -> String {
    format!(
        "#!/bin/sh\n\
         # Generated by zabbix-deploy. Day-2 operations for the Zabbix stack.\n\
         # Commands: start stop restart logs [server|web|mysql|agent] status backup update mysql\n\
         exec {} manage --dir {} \"$@\"\n",
        shell_quote(&binary.display().to_string()),
        shell_quote(&install_dir.display().to_string()),
    )
}

/// Write the wrapper to `dest` and make it executable.
pub fn install(dest: &Path, binary: &Path, install_dir: &Path) -> DeployResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, render(binary, install_dir))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dest, fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

fn shell_quote(s: &str) -> String {
    if s.chars()
        .all(|c| c.is_ascii_alphanumeric() || "/._-".contains(c))
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}
