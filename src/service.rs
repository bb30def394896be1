/// One container of the stack: image, restart policy, published
/// ports, environment, bind mounts and dependencies.
///
/// # Example
///
/// ```
/// use zabbix_deploy::Service;
///
/// let web = Service::new("zabbix-web", "zabbix/zabbix-web-nginx-mysql:alpine-7.0-latest")
///     .port(8080, 8080)
///     .host_env("ZBX_SERVER_HOST", "zabbix-server")
///     .env_var("MYSQL_PASSWORD", "MYSQL_PASSWORD")
///     .depends_on("zabbix-server");
///
/// assert_eq!(web.ports, vec!["8080:8080"]);
/// assert_eq!(web.references(), vec!["zabbix-server", "zabbix-server"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub image: String,
    pub restart: String,
    pub command: Vec<String>,
    pub ports: Vec<String>,
    pub env: Vec<(String, String)>,
    pub volumes: Vec<(String, String)>,
    pub depends_on: Vec<String>,
    /// Environment keys whose value is another service's name.
    pub host_keys: Vec<String>,
}

impl Service {
    #[must_use]
    pub fn new(name: &str, image: &str) -> Self {
        Self {
            name: name.to_string(),
            image: image.to_string(),
            restart: "unless-stopped".to_string(),
            command: Vec::new(),
            ports: Vec::new(),
            env: Vec::new(),
            volumes: Vec::new(),
            depends_on: Vec::new(),
            host_keys: Vec::new(),
        }
    }

    #[must_use]
    pub fn restart(mut self, policy: &str) -> Self {
        self.restart = policy.to_string();
        self
    }

    #[must_use]
    pub fn command(mut self, args: &[&str]) -> Self {
        self.command = args.iter().map(|a| (*a).to_string()).collect();
        self
    }

    /// Publish `container` on all host interfaces at `host`.
    #[must_use]
    pub fn port(mut self, host: u16, container: u16) -> Self {
        self.ports.push(format!("{host}:{container}"));
        self
    }

    /// Publish `container` on the loopback interface only.
    #[must_use]
    pub fn loopback_port(mut self, host: u16, container: u16) -> Self {
        self.ports.push(format!("127.0.0.1:{host}:{container}"));
        self
    }

    /// Literal environment value.
    #[must_use]
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Environment value substituted from the env file at start-up.
    #[must_use]
    pub fn env_var(self, key: &str, var: &str) -> Self {
        let placeholder = format!("${{{var}}}");
        self.env(key, &placeholder)
    }

    /// Environment value naming another service on the stack network.
    #[must_use]
    pub fn host_env(mut self, key: &str, service: &str) -> Self {
        self.host_keys.push(key.to_string());
        self.env(key, service)
    }

    /// Bind mount `host` (relative to the descriptor) at `mount`.
    #[must_use]
    pub fn volume(mut self, host: &str, mount: &str) -> Self {
        self.volumes.push((host.to_string(), mount.to_string()));
        self
    }

    #[must_use]
    pub fn depends_on(mut self, service: &str) -> Self {
        self.depends_on.push(service.to_string());
        self
    }

    /// Names of other services this one points at, through
    /// `depends_on` or host environment values.
    #[must_use]
    pub fn references(&self) -> Vec<&str> {
        let hosts = self.host_keys.iter().filter_map(|key| {
            self.env
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        });
        self.depends_on
            .iter()
            .map(String::as_str)
            .chain(hosts)
            .collect()
    }
}
