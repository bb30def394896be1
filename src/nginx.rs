use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// The two lifecycle phases of a virtual host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Plain HTTP, ACME challenge only.
    Challenge,
    /// HTTPS with the issued certificate.
    Secured,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Challenge => "challenge",
            Self::Secured => "secured",
        }
    }
}

/// nginx virtual host in front of the web UI.
///
/// # Example
///
/// ```
/// use zabbix_deploy::VirtualHost;
///
/// let vhost = VirtualHost::new("mon.example.com", 8080)
///     .webroot("/var/www/certbot")
///     .security_headers();
///
/// assert_eq!(vhost.upstream(), "http://127.0.0.1:8080");
/// assert!(vhost.security_headers);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualHost {
    pub domain: String,
    pub upstream_port: u16,
    pub webroot: PathBuf,
    pub security_headers: bool,
    pub max_body: String,
}

impl VirtualHost {
    #[must_use]
    pub fn new(domain: &str, upstream_port: u16) -> Self {
        Self {
            domain: domain.to_string(),
            upstream_port,
            webroot: PathBuf::from("/var/www/certbot"),
            security_headers: false,
            max_body: "16M".to_string(),
        }
    }

    #[must_use]
    pub fn webroot(mut self, dir: impl AsRef<Path>) -> Self {
        self.webroot = dir.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub const fn security_headers(mut self) -> Self {
        self.security_headers = true;
        self
    }

    #[must_use]
    pub fn max_body(mut self, size: &str) -> Self {
        self.max_body = size.to_string();
        self
    }

    #[must_use]
    pub fn upstream(&self) -> String {
        format!("http://127.0.0.1:{}", self.upstream_port)
    }
}

fn acme_location(out: &mut String, vhost: &VirtualHost) {
    let _ = writeln!(out, "    location /.well-known/acme-challenge/ {{");
    let _ = writeln!(out, "        root {};", vhost.webroot.display());
    let _ = writeln!(out, "    }}");
}

fn redirect_location(out: &mut String) {
    let _ = writeln!(out, "    location / {{");
    let _ = writeln!(out, "        return 301 https://$host$request_uri;");
    let _ = writeln!(out, "    }}");
}

/// Plain-HTTP server block: serve ACME challenges, redirect the rest.
#[must_use]
pub fn render_challenge(vhost: &VirtualHost) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "server {{");
    let _ = writeln!(out, "    listen 80;");
    let _ = writeln!(out, "    listen [::]:80;");
    let _ = writeln!(out, "    server_name {};", vhost.domain);
    let _ = writeln!(out);
    acme_location(&mut out, vhost);
    let _ = writeln!(out);
    redirect_location(&mut out);
    let _ = writeln!(out, "}}");
    out
}

/// HTTP redirect block plus the TLS server proxying to the web UI.
#[must_use]
pub fn render_secured(vhost: &VirtualHost, cert: &Path, key: &Path) -> String {
    let mut out = render_challenge(vhost);
    let _ = writeln!(out);
    let _ = writeln!(out, "server {{");
    // `http2 on;` needs nginx 1.25.1, newer than the Debian/Ubuntu packages.
    let _ = writeln!(out, "    listen 443 ssl http2;");
    let _ = writeln!(out, "    listen [::]:443 ssl http2;");
    let _ = writeln!(out, "    server_name {};", vhost.domain);
    let _ = writeln!(out);
    let _ = writeln!(out, "    ssl_certificate {};", cert.display());
    let _ = writeln!(out, "    ssl_certificate_key {};", key.display());
    let _ = writeln!(out, "    ssl_protocols TLSv1.2 TLSv1.3;");
    let _ = writeln!(out, "    ssl_prefer_server_ciphers on;");
    let _ = writeln!(out, "    ssl_session_cache shared:SSL:10m;");
    let _ = writeln!(out, "    ssl_session_timeout 10m;");

    if vhost.security_headers {
        let _ = writeln!(out);
        for (name, value) in [
            ("Strict-Transport-Security", "\"max-age=31536000; includeSubDomains\""),
            ("X-Content-Type-Options", "\"nosniff\""),
            ("X-Frame-Options", "\"SAMEORIGIN\""),
            ("X-XSS-Protection", "\"1; mode=block\""),
        ] {
            let _ = writeln!(out, "    add_header {name} {value} always;");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "    client_max_body_size {};", vhost.max_body);
    let _ = writeln!(out);
    let _ = writeln!(out, "    location / {{");
    let _ = writeln!(out, "        proxy_pass {};", vhost.upstream());
    let _ = writeln!(out, "        proxy_http_version 1.1;");
    let _ = writeln!(out, "        proxy_set_header Host $host;");
    let _ = writeln!(out, "        proxy_set_header X-Real-IP $remote_addr;");
    let _ = writeln!(out, "        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;");
    let _ = writeln!(out, "        proxy_set_header X-Forwarded-Proto $scheme;");
    let _ = writeln!(out, "        proxy_read_timeout 300;");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    out
}
