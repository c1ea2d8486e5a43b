use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The four kinds of remote-access connection the client can track.
/// Which factory branch and which health probe apply is decided by this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionType {
    Ssh,
    Desktop,
    Web,
    AwsService,
}

impl ConnectionType {
    pub fn from_string(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "ssh" => Some(Self::Ssh),
            "desktop" => Some(Self::Desktop),
            "web" => Some(Self::Web),
            "aws-service" => Some(Self::AwsService),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ssh => "ssh",
            Self::Desktop => "desktop",
            Self::Web => "web",
            Self::AwsService => "aws-service",
        }
    }

    /// Leading segment of generated connection ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Ssh => "ssh",
            Self::Desktop => "desktop",
            Self::Web => "web",
            Self::AwsService => "aws",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    pub fn from_string(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "connecting" => Some(Self::Connecting),
            "connected" => Some(Self::Connected),
            "disconnected" => Some(Self::Disconnected),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }
}

/// How the frontend should embed the session. Carried on the record for the
/// UI's benefit; nothing in this crate branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    Iframe,
    Websocket,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: String,
    pub connection_type: ConnectionType,
    pub instance_name: Option<String>,
    pub aws_service: Option<String>,
    pub region: Option<String>,
    /// Local-facing address through which the session is reached. Computed
    /// once at creation and never mutated afterward. Empty only for a
    /// federation-token-only AWS connection.
    pub proxy_url: String,
    pub auth_token: Option<String>,
    pub embedding_mode: EmbeddingMode,
    pub title: String,
    pub status: ConnectionStatus,
    pub metadata: HashMap<String, Value>,
}

/// Registry-wide counts by status, for the dashboard header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub total: usize,
    pub connecting: usize,
    pub connected: usize,
    pub disconnected: usize,
    pub error: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub probe_interval_secs: u64,
    pub probe_timeout_secs: u64,
    pub aws_probe_timeout_secs: u64, // AWS endpoints answer slower than the local proxy
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: 30,
            probe_timeout_secs: 5,
            aws_probe_timeout_secs: 10,
        }
    }
}
