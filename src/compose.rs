use std::collections::BTreeSet;

use docker_compose_types::{
    Command, Compose, ComposeNetworks, DependsOnOptions, Environment, MapOrEmpty,
    NetworkSettings, Networks, Ports, Service as ComposeService, Services, Volumes,
};
use indexmap::IndexMap;

use crate::error::DeployResult;
use crate::service::Service;
use crate::stack::NETWORK;

/// Render a complete `docker-compose.yml` for `services` on the
/// stack network. Output depends only on the input, in order, and
/// carries no top-level `version` key.
pub fn render(services: &[Service]) -> DeployResult<String> {
    let mut map = IndexMap::new();
    for svc in services {
        map.insert(svc.name.clone(), Some(compose_service(svc)));
    }

    let compose = Compose {
        services: Services(map),
        networks: network(),
        ..Default::default()
    };

    Ok(serde_yaml::to_string(&compose)?)
}

fn compose_service(svc: &Service) -> ComposeService {
    let environment = if svc.env.is_empty() {
        Environment::default()
    } else {
        Environment::List(svc.env.iter().map(|(k, v)| format!("{k}={v}")).collect())
    };

    let volumes = svc
        .volumes
        .iter()
        .map(|(host, mount)| Volumes::Simple(format!("{host}:{mount}")))
        .collect();

    let depends_on = if svc.depends_on.is_empty() {
        DependsOnOptions::default()
    } else {
        DependsOnOptions::Simple(svc.depends_on.clone())
    };

    let command = if svc.command.is_empty() {
        None
    } else {
        Some(Command::Args(svc.command.clone()))
    };

    ComposeService {
        image: Some(svc.image.clone()),
        container_name: Some(svc.name.clone()),
        restart: Some(svc.restart.clone()),
        command,
        ports: Ports::Short(svc.ports.clone()),
        environment,
        volumes,
        depends_on,
        networks: Networks::Simple(vec![NETWORK.to_string()]),
        ..Default::default()
    }
}

fn network() -> ComposeNetworks {
    let mut nets = IndexMap::new();
    nets.insert(
        NETWORK.to_string(),
        MapOrEmpty::Map(NetworkSettings {
            driver: Some("bridge".to_string()),
            ..Default::default()
        }),
    );
    ComposeNetworks(nets)
}

/// Names of all `${VAR}` placeholders in `text`.
#[must_use]
pub fn placeholders(text: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let inner = &after[..end];
        // `${VAR:-default}` and friends still reference VAR.
        let name = inner
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .next()
            .unwrap_or_default();
        if !name.is_empty() {
            found.insert(name.to_string());
        }
        rest = &after[end + 1..];
    }
    found
}
