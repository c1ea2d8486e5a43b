use std::time::Duration;

use crate::connection_types::{ConnectionRecord, ConnectionStatus, ConnectionType, MonitorConfig};

const MAX_REDIRECTS: usize = 10;

/// Liveness probing over each connection's HTTP-reachable proxy surface.
///
/// Probes are a sample of reachability, not a protocol handshake: auth
/// redirects and upgrade-required responses still count as alive, because
/// the daemon in front of the session answers on its behalf. The resulting
/// status is data for the monitor loop; a failed probe is never an error.
pub struct HealthProber {
    client: reqwest::Client,
}

impl HealthProber {
    pub fn new() -> Self {
        // Auth flows bounce through redirect chains before settling.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// Observe the current status of one connection. Stateless with respect
    /// to the registry; the caller passes a record snapshot.
    pub async fn probe(&self, record: &ConnectionRecord, config: &MonitorConfig) -> ConnectionStatus {
        match record.connection_type {
            ConnectionType::Ssh => self.probe_terminal(record, config).await,
            ConnectionType::Desktop => self.probe_desktop(record, config).await,
            ConnectionType::Web => self.probe_web(record, config).await,
            ConnectionType::AwsService => self.probe_aws(record, config).await,
        }
    }

    async fn probe_terminal(&self, record: &ConnectionRecord, config: &MonitorConfig) -> ConnectionStatus {
        if record.proxy_url.is_empty() {
            return ConnectionStatus::Error;
        }
        // Liveness comes from the HTTP upgrade endpoint, not a full
        // websocket handshake.
        let url = ws_to_http(&record.proxy_url);
        match self.fetch_status(&url, config.probe_timeout_secs).await {
            Some(code) => classify_terminal_status(code),
            None => ConnectionStatus::Disconnected,
        }
    }

    async fn probe_desktop(&self, record: &ConnectionRecord, config: &MonitorConfig) -> ConnectionStatus {
        if record.proxy_url.is_empty() {
            return ConnectionStatus::Error;
        }
        match self.fetch_status(&record.proxy_url, config.probe_timeout_secs).await {
            Some(code) => classify_desktop_status(code),
            None => ConnectionStatus::Disconnected,
        }
    }

    async fn probe_web(&self, record: &ConnectionRecord, config: &MonitorConfig) -> ConnectionStatus {
        if record.proxy_url.is_empty() {
            return ConnectionStatus::Error;
        }
        match self.fetch_status(&record.proxy_url, config.probe_timeout_secs).await {
            Some(code) => classify_web_status(code),
            None => ConnectionStatus::Disconnected,
        }
    }

    async fn probe_aws(&self, record: &ConnectionRecord, config: &MonitorConfig) -> ConnectionStatus {
        if record.proxy_url.is_empty() {
            // Federation links carry no probeable endpoint; token presence
            // is the only liveness signal we have.
            return match record.auth_token.as_deref() {
                Some(token) if !token.is_empty() => ConnectionStatus::Connected,
                _ => ConnectionStatus::Error,
            };
        }
        match self.fetch_status(&record.proxy_url, config.aws_probe_timeout_secs).await {
            Some(code) => classify_web_status(code),
            None => ConnectionStatus::Disconnected,
        }
    }

    async fn fetch_status(&self, url: &str, timeout_secs: u64) -> Option<u16> {
        match self
            .client
            .get(url)
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await
        {
            Ok(response) => Some(response.status().as_u16()),
            Err(e) => {
                log::debug!("probe of {} failed: {}", url, e);
                None
            }
        }
    }
}

impl Default for HealthProber {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal proxies answer almost anything while the session is up; only a
/// 5xx from the proxy itself means the session is gone.
pub fn classify_terminal_status(code: u16) -> ConnectionStatus {
    if code < 500 {
        ConnectionStatus::Connected
    } else {
        ConnectionStatus::Disconnected
    }
}

/// Desktop gateways answer 200 when open, 302/401 mid-auth.
pub fn classify_desktop_status(code: u16) -> ConnectionStatus {
    match code {
        200 | 302 | 401 => ConnectionStatus::Connected,
        _ => ConnectionStatus::Disconnected,
    }
}

pub fn classify_web_status(code: u16) -> ConnectionStatus {
    if (200..=499).contains(&code) {
        ConnectionStatus::Connected
    } else {
        ConnectionStatus::Disconnected
    }
}

pub fn ws_to_http(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else {
        url.to_string()
    }
}
