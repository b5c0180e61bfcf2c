// ABOUTME: Configuration types and parsing for dockfleet.yml.
// ABOUTME: Loads endpoint lists, reads DOCKER_HOST, and applies the local default.

mod endpoint;

pub use endpoint::{
    ConfigError, DEFAULT_PORT, DEFAULT_SOCKET, EndpointConfig, LOCAL_ENDPOINT_NAME, Scheme,
    Target, TlsMaterial,
};

use crate::compose::ComposeRunner;
use crate::error::{Error, Result};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "dockfleet.yml";
pub const CONFIG_FILENAME_ALT: &str = "dockfleet.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".dockfleet/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,

    /// Upper bound for each per-endpoint call during fan-out.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default)]
    pub compose: ComposeSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            timeout: default_timeout(),
            compose: ComposeSettings::default(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

/// How the external Compose tool is invoked.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ComposeSettings {
    #[serde(default = "default_compose_program")]
    pub program: String,
    #[serde(default = "default_compose_args")]
    pub args: Vec<String>,
    /// Where deployment files are written. Defaults to the system temp dir.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            program: default_compose_program(),
            args: default_compose_args(),
            temp_dir: None,
        }
    }
}

fn default_compose_program() -> String {
    "docker".to_string()
}

fn default_compose_args() -> Vec<String> {
    vec!["compose".to_string()]
}

impl ComposeSettings {
    pub fn runner(&self) -> ComposeRunner {
        let runner = ComposeRunner::new(self.program.clone(), self.args.clone());
        match &self.temp_dir {
            Some(dir) => runner.with_temp_dir(dir.clone()),
            None => runner,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(yaml).map_err(Error::from)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Find a settings file in `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Like `discover`, but a missing file yields default settings.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// More than one endpoint requires every one to carry a distinct name.
    fn validate(&self) -> Result<()> {
        if self.endpoints.len() < 2 {
            return Ok(());
        }

        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            let name = endpoint.name().ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "endpoint {} needs a name when several endpoints are configured",
                    endpoint.target()
                ))
            })?;
            if !seen.insert(name) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate endpoint name: {}",
                    name
                )));
            }
        }
        Ok(())
    }

    /// The endpoints to register.
    ///
    /// Resolution order:
    /// 1. Endpoints listed in the settings file
    /// 2. `DOCKER_HOST` (with `DOCKER_TLS_VERIFY`/`DOCKER_CERT_PATH`)
    /// 3. The local socket if it exists, else `localhost:2375`
    pub fn resolve_endpoints(&self) -> Result<NonEmpty<EndpointConfig>> {
        if let Some(endpoints) = NonEmpty::from_vec(self.endpoints.clone()) {
            return Ok(endpoints);
        }

        if let Some(config) = endpoint_from_env()? {
            tracing::debug!(host = %config.docker_host(), "using endpoint from DOCKER_HOST");
            return Ok(NonEmpty::new(config));
        }

        Ok(NonEmpty::new(EndpointConfig::local_default()))
    }
}

/// Read an endpoint from the docker environment variables, if `DOCKER_HOST` is set.
pub fn endpoint_from_env() -> Result<Option<EndpointConfig>> {
    let host = match std::env::var("DOCKER_HOST") {
        Ok(value) if !value.trim().is_empty() => value,
        _ => return Ok(None),
    };

    let config = parse_docker_host(host.trim())?;

    let tls_verify = std::env::var("DOCKER_TLS_VERIFY")
        .map(|v| !v.is_empty() && v != "0")
        .unwrap_or(false);
    if !tls_verify {
        return Ok(Some(config));
    }

    let cert_dir = std::env::var("DOCKER_CERT_PATH").map_err(|_| {
        Error::InvalidConfig("DOCKER_TLS_VERIFY is set but DOCKER_CERT_PATH is not".to_string())
    })?;
    Ok(Some(
        config.with_tls(TlsMaterial::from_cert_dir(Path::new(&cert_dir))),
    ))
}

/// Parse `unix:///path`, `tcp://host:port`, `http://...`, or `https://...`.
fn parse_docker_host(value: &str) -> Result<EndpointConfig> {
    if let Some(path) = value.strip_prefix("unix://") {
        return Ok(EndpointConfig::socket(path));
    }

    let (scheme, rest) = if let Some(rest) = value.strip_prefix("tcp://") {
        (Scheme::Http, rest)
    } else if let Some(rest) = value.strip_prefix("http://") {
        (Scheme::Http, rest)
    } else if let Some(rest) = value.strip_prefix("https://") {
        (Scheme::Https, rest)
    } else {
        return Err(Error::InvalidConfig(format!(
            "unsupported DOCKER_HOST: {}",
            value
        )));
    };

    let (host, port) = split_host_port(rest.trim_end_matches('/'))?;

    if host.is_empty() {
        return Err(Error::InvalidConfig(format!(
            "DOCKER_HOST has no host: {}",
            value
        )));
    }

    Ok(EndpointConfig::tcp(host, port).with_scheme(scheme))
}

/// Split `host[:port]`. Bracketed IPv6 hosts keep their brackets.
fn split_host_port(authority: &str) -> Result<(&str, u16)> {
    let (host, port) = if authority.starts_with('[') {
        let end = authority.find(']').ok_or_else(|| {
            Error::InvalidConfig(format!("unterminated IPv6 host in DOCKER_HOST: {}", authority))
        })?;
        let (host, after) = authority.split_at(end + 1);
        match after.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if after.is_empty() => (host, None),
            None => {
                return Err(Error::InvalidConfig(format!(
                    "unexpected text after IPv6 host in DOCKER_HOST: {}",
                    authority
                )));
            }
        }
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    let port = match port {
        Some(port) => port
            .parse::<u16>()
            .map_err(|_| Error::InvalidConfig(format!("invalid port in DOCKER_HOST: {}", port)))?,
        None => DEFAULT_PORT,
    };
    Ok((host, port))
}
