mod common;

use std::fs::{self, File};
use std::path::Path;

use chrono::{TimeZone, Utc};
use flate2::read::GzDecoder;
use zabbix_deploy::backup;
use zabbix_deploy::ports::Ports;
use zabbix_deploy::render;

use common::{FakeRuntime, scenario_config, settings_in};

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn archive_members(path: &Path) -> Vec<String> {
    let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
    archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().display().to_string())
        .collect()
}

#[test]
fn dump_and_archive_are_written() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = settings_in(tmp.path());
    let config = scenario_config(Ports::default());
    render::write(&config, &settings).unwrap();
    let runtime = FakeRuntime::healthy();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 5).unwrap();

    let done = backup::run(&runtime, &settings, &config, &now).unwrap();

    assert!(done.dump.ends_with("zabbix_db_20260301_123005.sql"));
    assert!(done.archive.ends_with("zabbix_backup_20260301_123005.tar.gz"));
    assert_eq!(runtime.calls(), vec!["exec_to_file mysql mysqldump"]);

    let members = archive_members(&done.archive);
    assert!(members.contains(&"zabbix_db_20260301_123005.sql".to_string()));
    assert!(members.contains(&".env".to_string()));
    assert!(members.contains(&"docker-compose.yml".to_string()));
    assert!(members.iter().any(|m| m.starts_with("zbx_env/usr/lib/zabbix/alertscripts")));
    assert!(!members.iter().any(|m| m.contains("var/lib/mysql")));
}

#[test]
fn same_second_backups_get_distinct_names() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = settings_in(tmp.path());
    let config = scenario_config(Ports::default());
    render::write(&config, &settings).unwrap();
    let runtime = FakeRuntime::healthy();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 5).unwrap();

    let first = backup::run(&runtime, &settings, &config, &now).unwrap();
    let second = backup::run(&runtime, &settings, &config, &now).unwrap();

    assert_ne!(first.dump, second.dump);
    assert_ne!(first.archive, second.archive);
    assert!(second.dump.ends_with("zabbix_db_20260301_123005-1.sql"));
    assert_eq!(
        entries(&settings.backup_dir()),
        vec![
            "zabbix_backup_20260301_123005-1.tar.gz",
            "zabbix_backup_20260301_123005.tar.gz",
            "zabbix_db_20260301_123005-1.sql",
            "zabbix_db_20260301_123005.sql",
        ]
    );
}

#[test]
fn failed_dump_leaves_nothing_behind() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = settings_in(tmp.path());
    let config = scenario_config(Ports::default());
    render::write(&config, &settings).unwrap();
    let runtime = FakeRuntime::healthy().failing_dump();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 5).unwrap();

    assert!(backup::run(&runtime, &settings, &config, &now).is_err());

    assert!(entries(&settings.backup_dir()).is_empty());
}

#[test]
fn stamp_suffix_counts_up() {
    let tmp = tempfile::tempdir().unwrap();
    let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    fs::write(tmp.path().join("zabbix_db_20260102_030405.sql"), "").unwrap();
    fs::write(tmp.path().join("zabbix_backup_20260102_030405-1.tar.gz"), "").unwrap();

    assert_eq!(backup::unique_stamp(tmp.path(), &now), "20260102_030405-2");
}
