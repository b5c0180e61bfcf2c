// ABOUTME: Shared types returned by engine clients.
// ABOUTME: ContainerDescriptor, PortMapping, EngineVersion, and the passthrough Document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Semi-structured engine response passed through as-is.
pub type Document = Map<String, Value>;

/// Wrap any JSON value as a document.
///
/// Objects are used directly; anything else is stored under `value`.
pub fn into_document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// Summary of one container as reported by a list call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    /// Full container ID.
    pub id: String,
    /// Display name without the leading `/`.
    pub name: String,
    /// Image reference the container was created from.
    pub image: String,
    /// Lifecycle state, lowercase (`running`, `exited`, ...).
    pub state: String,
    /// Human status string (`Up 3 hours`).
    pub status: String,
    /// Published ports.
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    /// Creation time.
    pub created: Option<DateTime<Utc>>,
    /// Name of the endpoint that reported this container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl ContainerDescriptor {
    /// Whether `identifier` names this container by full ID or display name.
    pub fn matches(&self, identifier: &str) -> bool {
        let identifier = identifier.trim_start_matches('/');
        self.id == identifier || self.name == identifier
    }

    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

/// A port published by a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub private_port: u16,
    pub public_port: Option<u16>,
    /// `tcp`, `udp`, or `sctp`.
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl std::fmt::Display for PortMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.public_port, &self.ip) {
            (Some(public), Some(ip)) => {
                write!(f, "{}:{}->{}/{}", ip, public, self.private_port, self.protocol)
            }
            (Some(public), None) => {
                write!(f, "{}->{}/{}", public, self.private_port, self.protocol)
            }
            (None, _) => write!(f, "{}/{}", self.private_port, self.protocol),
        }
    }
}

/// Version information reported by an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineVersion {
    pub version: String,
    pub api_version: String,
}
