use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::provisioning::ProvisioningConfig;
use crate::runtime::StackRuntime;
use crate::settings::{COMPOSE_FILE, ENV_FILE, Settings};
use crate::stack::{self, DATABASE, DB_NAME};

const PARTIAL: &str = "partial";

/// Files produced by one backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub dump: PathBuf,
    pub archive: PathBuf,
}

fn dump_name(stamp: &str) -> String {
    format!("zabbix_db_{stamp}.sql")
}

fn archive_name(stamp: &str) -> String {
    format!("zabbix_backup_{stamp}.tar.gz")
}

/// `%Y%m%d_%H%M%S` for `now`, with a `-N` suffix if a backup with
/// that stamp already exists in `dir`.
pub fn unique_stamp<Tz: TimeZone>(dir: &Path, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let base = now.format("%Y%m%d_%H%M%S").to_string();
    let taken = |stamp: &str| {
        dir.join(dump_name(stamp)).exists() || dir.join(archive_name(stamp)).exists()
    };
    if !taken(&base) {
        return base;
    }
    (1u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|s| !taken(s))
        .unwrap_or(base)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".");
    os.push(PARTIAL);
    PathBuf::from(os)
}

/// Dump the database and bundle it with the persisted
/// configuration. Intermediate `.partial` files are removed or
/// renamed before returning.
pub fn run<Tz: TimeZone>(
    runtime: &dyn StackRuntime,
    settings: &Settings,
    config: &ProvisioningConfig,
    now: &DateTime<Tz>,
) -> DeployResult<Backup>
where
    Tz::Offset: std::fmt::Display,
{
    let dir = settings.backup_dir();
    fs::create_dir_all(&dir)?;

    let stamp = unique_stamp(&dir, now);
    let dump = dir.join(dump_name(&stamp));
    let archive = dir.join(archive_name(&stamp));

    let dump_tmp = partial_path(&dump);
    let envs = [("MYSQL_PWD", config.root_password().expose())];
    let dumped = runtime.exec_to_file(
        DATABASE,
        &[
            "mysqldump",
            "-uroot",
            "--single-transaction",
            "--routines",
            "--triggers",
            DB_NAME,
        ],
        &envs,
        &dump_tmp,
    );
    if let Err(e) = dumped {
        let _ = fs::remove_file(&dump_tmp);
        return Err(e);
    }
    fs::rename(&dump_tmp, &dump)?;
    info!(dump = %dump.display(), "database dumped");

    let archive_tmp = partial_path(&archive);
    if let Err(e) = write_archive(&archive_tmp, &dump, &settings.install_dir) {
        let _ = fs::remove_file(&archive_tmp);
        return Err(e);
    }
    fs::rename(&archive_tmp, &archive)?;
    info!(archive = %archive.display(), "backup archive written");

    Ok(Backup { dump, archive })
}

fn write_archive(dest: &Path, dump: &Path, install_dir: &Path) -> DeployResult<()> {
    let file = File::create(dest)?;
    let enc = GzEncoder::new(file, Compression::default());
    let mut tar = tar::Builder::new(enc);

    let dump_name = dump
        .file_name()
        .ok_or_else(|| DeployError::Other(format!("bad dump path {}", dump.display())))?;
    tar.append_path_with_name(dump, dump_name)?;

    for name in [ENV_FILE, COMPOSE_FILE] {
        let path = install_dir.join(name);
        if path.is_file() {
            tar.append_path_with_name(&path, name)?;
        }
    }

    for dir in [
        stack::ALERT_SCRIPTS,
        stack::EXTERNAL_SCRIPTS,
        stack::MODULES,
        stack::ENC,
    ] {
        let path = install_dir.join(dir);
        if path.is_dir() {
            tar.append_dir_all(dir, &path)?;
        }
    }

    let enc = tar.into_inner()?;
    enc.finish()?;
    Ok(())
}
