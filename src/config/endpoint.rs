// ABOUTME: Endpoint configuration: one engine target plus optional TLS material.
// ABOUTME: Parses the flat external shape, validates it, and derives display names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Port used when a TCP endpoint does not specify one.
pub const DEFAULT_PORT: u16 = 2375;

/// Well-known local engine socket.
pub const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

/// Name given to the endpoint used when nothing is configured.
pub const LOCAL_ENDPOINT_NAME: &str = "local";

/// Errors from validating or applying an endpoint configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("endpoint needs either a socket path or a host")]
    MissingTarget,

    #[error("endpoint sets both socket path {socket} and host {host}")]
    AmbiguousTarget { socket: String, host: String },

    #[error("incomplete TLS material: ca, cert, and key must be given together (missing {missing})")]
    IncompleteTls { missing: String },

    #[error("cannot read TLS file {path}: {source}")]
    TlsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("endpoint {endpoint} uses https but has no TLS material")]
    TlsRequired { endpoint: String },

    #[error("endpoint {endpoint} has TLS material but its scheme is http")]
    TlsOverHttp { endpoint: String },

    #[error("unsupported scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

/// Transport scheme for TCP endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl std::str::FromStr for Scheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            _ => Err(ConfigError::InvalidScheme(s.to_string())),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => write!(f, "http"),
            Scheme::Https => write!(f, "https"),
        }
    }
}

/// Where the engine listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Socket(PathBuf),
    Tcp {
        host: String,
        port: u16,
        scheme: Scheme,
    },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Socket(path) => write!(f, "unix://{}", path.display()),
            Target::Tcp { host, port, scheme } => write!(f, "{}://{}:{}", scheme, host, port),
        }
    }
}

/// Client certificate material. Paths to PEM files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsMaterial {
    pub ca: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl TlsMaterial {
    /// Build from optional parts; all three or none.
    pub fn from_parts(
        ca: Option<PathBuf>,
        cert: Option<PathBuf>,
        key: Option<PathBuf>,
    ) -> Result<Option<Self>, ConfigError> {
        match (ca, cert, key) {
            (None, None, None) => Ok(None),
            (Some(ca), Some(cert), Some(key)) => Ok(Some(Self { ca, cert, key })),
            (ca, cert, key) => {
                let missing = [("ca", ca.is_none()), ("cert", cert.is_none()), ("key", key.is_none())]
                    .iter()
                    .filter(|(_, absent)| *absent)
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(ConfigError::IncompleteTls { missing })
            }
        }
    }

    /// Conventional `ca.pem`, `cert.pem`, `key.pem` inside one directory.
    pub fn from_cert_dir(dir: &Path) -> Self {
        Self {
            ca: dir.join("ca.pem"),
            cert: dir.join("cert.pem"),
            key: dir.join("key.pem"),
        }
    }

    /// Fail unless every file can be opened.
    pub fn check_readable(&self) -> Result<(), ConfigError> {
        for path in [&self.ca, &self.cert, &self.key] {
            std::fs::File::open(path).map_err(|source| ConfigError::TlsUnreadable {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Configuration for one engine endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawEndpointConfig")]
pub struct EndpointConfig {
    name: Option<String>,
    target: Target,
    tls: Option<TlsMaterial>,
}

impl EndpointConfig {
    /// Endpoint reached through a unix socket.
    pub fn socket(path: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            target: Target::Socket(path.into()),
            tls: None,
        }
    }

    /// Endpoint reached over plain TCP.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            name: None,
            target: Target::Tcp {
                host: host.into(),
                port,
                scheme: Scheme::Http,
            },
            tls: None,
        }
    }

    /// The endpoint used when no configuration is supplied at all.
    ///
    /// Prefers the well-known local socket; falls back to `localhost:2375`.
    pub fn local_default() -> Self {
        Self::local_default_with(Path::new(DEFAULT_SOCKET))
    }

    pub(crate) fn local_default_with(socket: &Path) -> Self {
        let base = if socket.exists() {
            Self::socket(socket)
        } else {
            Self::tcp("localhost", DEFAULT_PORT)
        };
        base.with_name(LOCAL_ENDPOINT_NAME)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the scheme. No effect on socket endpoints.
    pub fn with_scheme(mut self, new_scheme: Scheme) -> Self {
        if let Target::Tcp { scheme, .. } = &mut self.target {
            *scheme = new_scheme;
        }
        self
    }

    /// Attach TLS material and switch the scheme to https. No effect on
    /// socket endpoints.
    pub fn with_tls(mut self, tls: TlsMaterial) -> Self {
        if let Target::Tcp { scheme, .. } = &mut self.target {
            *scheme = Scheme::Https;
            self.tls = Some(tls);
        }
        self
    }

    /// Explicitly configured name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Registry key: the configured name, or one derived from the target.
    ///
    /// Socket endpoints become `socket-<path>` with separators replaced by
    /// `_`; TCP endpoints use the host string.
    pub fn resolved_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match &self.target {
            Target::Socket(path) => format!(
                "socket-{}",
                path.to_string_lossy().replace(['/', '\\'], "_")
            ),
            Target::Tcp { host, .. } => host.clone(),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn tls(&self) -> Option<&TlsMaterial> {
        self.tls.as_ref()
    }

    /// Address in `DOCKER_HOST` form: `unix:///path` or `tcp://host:port`.
    pub fn docker_host(&self) -> String {
        match &self.target {
            Target::Socket(path) => format!("unix://{}", path.display()),
            Target::Tcp { host, port, .. } => format!("tcp://{}:{}", host, port),
        }
    }

    /// Environment that points docker tooling at this endpoint.
    ///
    /// `DOCKER_CERT_PATH` is the directory of the client certificate, so
    /// external tools only pick up TLS material laid out as
    /// `ca.pem`/`cert.pem`/`key.pem` in one directory.
    pub fn engine_env(&self) -> Vec<(String, String)> {
        let mut env = vec![("DOCKER_HOST".to_string(), self.docker_host())];
        if let Some(dir) = self.tls.as_ref().and_then(|tls| tls.cert.parent()) {
            env.push(("DOCKER_TLS_VERIFY".to_string(), "1".to_string()));
            env.push((
                "DOCKER_CERT_PATH".to_string(),
                dir.to_string_lossy().into_owned(),
            ));
        }
        env
    }
}

/// Flat shape used in configuration files.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawEndpointConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    scheme: Option<String>,
    #[serde(default)]
    socket_path: Option<PathBuf>,
    #[serde(default)]
    ca: Option<PathBuf>,
    #[serde(default)]
    cert: Option<PathBuf>,
    #[serde(default)]
    key: Option<PathBuf>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl TryFrom<RawEndpointConfig> for EndpointConfig {
    type Error = ConfigError;

    fn try_from(raw: RawEndpointConfig) -> Result<Self, Self::Error> {
        let tls = TlsMaterial::from_parts(raw.ca, raw.cert, raw.key)?;

        let target = match (raw.socket_path, raw.host) {
            (Some(socket), Some(host)) => {
                return Err(ConfigError::AmbiguousTarget {
                    socket: socket.display().to_string(),
                    host,
                });
            }
            (Some(socket), None) => Target::Socket(socket),
            (None, Some(host)) if !host.trim().is_empty() => {
                let host = host.trim().to_string();
                // TLS material implies https unless a scheme says otherwise
                let scheme = match (raw.scheme.as_deref(), &tls) {
                    (Some(scheme), _) => scheme.parse()?,
                    (None, Some(_)) => Scheme::Https,
                    (None, None) => Scheme::Http,
                };
                if scheme == Scheme::Http && tls.is_some() {
                    return Err(ConfigError::TlsOverHttp {
                        endpoint: raw.name.unwrap_or(host),
                    });
                }
                Target::Tcp {
                    host,
                    port: raw.port,
                    scheme,
                }
            }
            _ => return Err(ConfigError::MissingTarget),
        };

        // TLS material only applies to TCP endpoints
        let tls = match target {
            Target::Socket(_) => None,
            Target::Tcp { .. } => tls,
        };

        Ok(Self {
            name: raw.name.filter(|n| !n.trim().is_empty()),
            target,
            tls,
        })
    }
}
