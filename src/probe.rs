use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use tracing::debug;

/// Outcome of one HTTP probe against the web UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    /// Answered with 200 or 302.
    Responding(u16),
    /// Answered with any other status.
    Unexpected(u16),
    /// No HTTP answer at all.
    Unreachable,
}

impl Reachability {
    #[must_use]
    pub const fn from_status(code: u16) -> Self {
        match code {
            200 | 302 => Self::Responding(code),
            other => Self::Unexpected(other),
        }
    }

    #[must_use]
    pub const fn is_responding(self) -> bool {
        matches!(self, Self::Responding(_))
    }
}

/// Local HTTP reachability check.
pub trait HttpProbe {
    fn probe(&self, port: u16) -> Reachability;
}

/// Probe `http://127.0.0.1:<port>/` without following redirects.
#[derive(Debug, Clone)]
pub struct LocalHttp {
    client: Option<Client>,
}

impl LocalHttp {
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| debug!(error = %e, "http client unavailable"))
            .ok();
        Self { client }
    }
}

impl Default for LocalHttp {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpProbe for LocalHttp {
    fn probe(&self, port: u16) -> Reachability {
        let Some(client) = &self.client else {
            return Reachability::Unreachable;
        };
        match client.get(format!("http://127.0.0.1:{port}/")).send() {
            Ok(resp) => Reachability::from_status(resp.status().as_u16()),
            Err(e) => {
                debug!(error = %e, port, "probe failed");
                Reachability::Unreachable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(Reachability::from_status(200), Reachability::Responding(200));
        assert_eq!(Reachability::from_status(302), Reachability::Responding(302));
        assert_eq!(Reachability::from_status(301), Reachability::Unexpected(301));
        assert_eq!(Reachability::from_status(502), Reachability::Unexpected(502));
        assert!(!Reachability::Unreachable.is_responding());
    }
}
