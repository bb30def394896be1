mod common;

use zabbix_deploy::error::DeployError;
use zabbix_deploy::prereq::{self, Tool};

use common::{FakeHost, ScriptedPrompter};

#[test]
fn ready_host_passes_without_prompts() {
    let host = FakeHost::ready();
    let prompter = ScriptedPrompter::default();

    prereq::resolve(&host, &prompter, 2048).unwrap();

    assert!(host.installed.borrow().is_empty());
    assert!(prompter.asked.borrow().is_empty());
}

#[test]
fn low_memory_needs_confirmation() {
    let host = FakeHost {
        memory_mib: Some(1024),
        ..FakeHost::ready()
    };

    let declined = prereq::resolve(&host, &ScriptedPrompter::default().confirms(&[false]), 2048);
    let accepted = prereq::resolve(&host, &ScriptedPrompter::default().confirms(&[true]), 2048);

    assert!(matches!(declined, Err(DeployError::Aborted(_))));
    assert!(accepted.is_ok());
}

#[test]
fn unknown_memory_is_not_fatal() {
    let host = FakeHost {
        memory_mib: None,
        ..FakeHost::ready()
    };

    assert!(prereq::resolve(&host, &ScriptedPrompter::default(), 2048).is_ok());
}

#[test]
fn failed_install_is_reported() {
    let host = FakeHost {
        broken_install: true,
        ..FakeHost::ready().missing(&[Tool::Compose])
    };

    let err = prereq::resolve(&host, &ScriptedPrompter::default(), 2048).unwrap_err();

    let DeployError::PrerequisiteMissing(tool) = err else {
        panic!("expected missing prerequisite");
    };
    assert_eq!(tool, "docker compose");
}

#[test]
fn non_root_stops_before_anything_else() {
    let host = FakeHost {
        uid: 1000,
        ..FakeHost::ready().missing(&[Tool::Docker])
    };

    let err = prereq::resolve(&host, &ScriptedPrompter::default(), 2048).unwrap_err();

    assert!(matches!(err, DeployError::NotRoot(1000)));
    assert!(host.installed.borrow().is_empty());
}
