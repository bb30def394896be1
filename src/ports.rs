//! Host port negotiation.
//!
//! Each logical port starts at its default and walks upwards until
//! the host reports it free. Ports already claimed earlier in the
//! same run count as taken, so two services never end up on the
//! same incremented port.

use std::collections::BTreeSet;
use std::net::TcpListener;

use tracing::{debug, info};

use crate::cmd;
use crate::error::{DeployError, DeployResult};

/// The three host ports published by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ports {
    /// Web UI, proxied by nginx.
    pub web: u16,
    /// Zabbix server trapper port.
    pub server: u16,
    /// Database, bound to loopback only.
    pub database: u16,
}

impl Ports {
    #[must_use]
    pub const fn new(web: u16, server: u16, database: u16) -> Self {
        Self {
            web,
            server,
            database,
        }
    }
}

impl Default for Ports {
    fn default() -> Self {
        Self::new(8080, 10051, 3306)
    }
}

/// Answers whether a port is currently bound on the host.
pub trait PortProbe {
    fn in_use(&self, port: u16) -> bool;
}

/// Probe backed by the host's listening-socket table (`ss`), with a
/// bind attempt as fallback when `ss` is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketTable;

impl SocketTable {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PortProbe for SocketTable {
    fn in_use(&self, port: u16) -> bool {
        match cmd::run("ss", &["-H", "-t", "-u", "-l", "-n"]) {
            Ok(table) => listening_ports(&table).contains(&port),
            Err(e) => {
                debug!(error = %e, port, "ss unavailable, probing with bind");
                TcpListener::bind(("0.0.0.0", port)).is_err()
            }
        }
    }
}

/// Extract local ports from `ss -Htuln` output. The first column
/// shaped like `addr:port` on each line is the local address.
#[must_use]
pub fn listening_ports(table: &str) -> BTreeSet<u16> {
    table
        .lines()
        .filter_map(|line| {
            line.split_whitespace()
                .find_map(|col| col.rsplit_once(':').and_then(|(_, p)| p.parse().ok()))
        })
        .collect()
}

/// Smallest port `>= default` that is neither bound on the host nor
/// already in `claimed`. Gives up after `span` candidates.
pub fn negotiate(
    default: u16,
    span: u16,
    probe: &dyn PortProbe,
    claimed: &BTreeSet<u16>,
) -> DeployResult<u16> {
    let end = default.saturating_add(span.saturating_sub(1));
    for port in default..=end {
        if claimed.contains(&port) {
            continue;
        }
        if probe.in_use(port) {
            debug!(port, "port in use");
            continue;
        }
        return Ok(port);
    }
    Err(DeployError::PortsExhausted {
        start: default,
        end,
    })
}

/// Negotiate web, server and database ports in that order.
pub fn negotiate_all(defaults: Ports, span: u16, probe: &dyn PortProbe) -> DeployResult<Ports> {
    let mut claimed = BTreeSet::new();

    let web = negotiate(defaults.web, span, probe, &claimed)?;
    claimed.insert(web);
    let server = negotiate(defaults.server, span, probe, &claimed)?;
    claimed.insert(server);
    let database = negotiate(defaults.database, span, probe, &claimed)?;

    let ports = Ports::new(web, server, database);
    for (name, default, chosen) in [
        ("web", defaults.web, web),
        ("server", defaults.server, server),
        ("database", defaults.database, database),
    ] {
        if default != chosen {
            info!(name, default, chosen, "default port taken, using next free port");
        }
    }
    Ok(ports)
}
