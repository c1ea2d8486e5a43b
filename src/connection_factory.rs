use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use chrono::Utc;
use serde_json::Value;

use crate::connection_types::{ConnectionRecord, ConnectionStatus, ConnectionType, EmbeddingMode};

/// Address the orchestration daemon listens on for local proxy traffic.
const PROXY_HOST: &str = "127.0.0.1:8943";

const DEFAULT_WEB_SERVICE: &str = "jupyter";
const DEFAULT_AWS_REGION: &str = "us-east-1";
const DEFAULT_AWS_SERVICE: &str = "console";

/// Build a fully-populated record for the given type. The caller has already
/// validated the type tag; construction itself cannot fail.
pub fn build_connection(
    conn_type: ConnectionType,
    target: &str,
    options: &HashMap<String, String>,
) -> ConnectionRecord {
    match conn_type {
        ConnectionType::Ssh => build_ssh(target, options),
        ConnectionType::Desktop => build_desktop(target, options),
        ConnectionType::Web => build_web(target, options),
        ConnectionType::AwsService => build_aws(options),
    }
}

fn build_ssh(target: &str, options: &HashMap<String, String>) -> ConnectionRecord {
    let proxy_url = options
        .get("proxy_url")
        .cloned()
        .unwrap_or_else(|| format!("ws://{}/proxy/terminal/{}", PROXY_HOST, target));

    ConnectionRecord {
        id: format!("ssh-{}-{}", target, unix_timestamp()),
        connection_type: ConnectionType::Ssh,
        instance_name: Some(target.to_string()),
        aws_service: None,
        region: None,
        proxy_url,
        auth_token: options.get("auth_token").cloned(),
        embedding_mode: EmbeddingMode::Websocket,
        title: format!("🖥 SSH: {}", target),
        status: ConnectionStatus::Connecting,
        metadata: base_metadata(ConnectionType::Ssh),
    }
}

fn build_desktop(target: &str, options: &HashMap<String, String>) -> ConnectionRecord {
    let proxy_url = options
        .get("proxy_url")
        .cloned()
        .unwrap_or_else(|| format!("http://{}/proxy/desktop/{}", PROXY_HOST, target));

    ConnectionRecord {
        id: format!("desktop-{}-{}", target, unix_timestamp()),
        connection_type: ConnectionType::Desktop,
        instance_name: Some(target.to_string()),
        aws_service: None,
        region: None,
        proxy_url,
        auth_token: options.get("auth_token").cloned(),
        embedding_mode: EmbeddingMode::Iframe,
        title: format!("🪟 Desktop: {}", target),
        status: ConnectionStatus::Connecting,
        metadata: base_metadata(ConnectionType::Desktop),
    }
}

fn build_web(target: &str, options: &HashMap<String, String>) -> ConnectionRecord {
    let service = options
        .get("service")
        .cloned()
        .unwrap_or_else(|| DEFAULT_WEB_SERVICE.to_string());

    // The daemon routes by target; the service only shows up in the id,
    // title and metadata.
    let proxy_url = options
        .get("proxy_url")
        .cloned()
        .unwrap_or_else(|| format!("http://{}/proxy/web/{}", PROXY_HOST, target));

    let mut metadata = base_metadata(ConnectionType::Web);
    metadata.insert("service".to_string(), Value::String(service.clone()));

    ConnectionRecord {
        id: format!("web-{}-{}-{}", target, service, unix_timestamp()),
        connection_type: ConnectionType::Web,
        instance_name: Some(target.to_string()),
        aws_service: None,
        region: None,
        proxy_url,
        auth_token: options.get("auth_token").cloned(),
        embedding_mode: EmbeddingMode::Iframe,
        title: format!("🌐 Web: {} on {}", service, target),
        status: ConnectionStatus::Connecting,
        metadata,
    }
}

fn build_aws(options: &HashMap<String, String>) -> ConnectionRecord {
    let region = options
        .get("region")
        .cloned()
        .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());
    let service = options
        .get("service")
        .cloned()
        .unwrap_or_else(|| DEFAULT_AWS_SERVICE.to_string());
    let auth_token = options.get("auth_token").cloned();

    // A token-only federation link has no proxy endpoint to synthesize.
    let proxy_url = match options.get("proxy_url") {
        Some(url) => url.clone(),
        None if auth_token.is_some() => String::new(),
        None => format!(
            "http://{}/proxy/aws?service={}&region={}",
            PROXY_HOST,
            urlencoding::encode(&service),
            urlencoding::encode(&region)
        ),
    };

    let mut metadata = base_metadata(ConnectionType::AwsService);
    metadata.insert("service".to_string(), Value::String(service.clone()));
    metadata.insert("region".to_string(), Value::String(region.clone()));

    ConnectionRecord {
        id: format!("aws-{}-{}-{}", service, region, unix_timestamp()),
        connection_type: ConnectionType::AwsService,
        instance_name: None,
        aws_service: Some(service.clone()),
        region: Some(region.clone()),
        proxy_url,
        auth_token,
        embedding_mode: EmbeddingMode::Iframe,
        title: aws_title(&service, &region),
        status: ConnectionStatus::Connecting,
        metadata,
    }
}

/// Display names for the AWS services the client has dedicated UI for.
/// Anything else falls back to the raw service name.
fn aws_title(service: &str, region: &str) -> String {
    match service {
        "braket" => format!("⚛ Amazon Braket ({})", region),
        "sagemaker" => format!("📓 SageMaker Notebook ({})", region),
        "console" => format!("☁ AWS Console ({})", region),
        "cloudshell" => format!("🐚 AWS CloudShell ({})", region),
        _ => format!("☁ {} ({})", service, region),
    }
}

fn base_metadata(conn_type: ConnectionType) -> HashMap<String, Value> {
    let mut metadata = HashMap::new();
    metadata.insert(
        "connection_type".to_string(),
        Value::String(conn_type.as_str().to_string()),
    );
    metadata.insert(
        "launch_time".to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
    metadata
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_connection_is_a_websocket_terminal() {
        let record = build_connection(ConnectionType::Ssh, "gpu-box", &HashMap::new());
        assert!(record.id.starts_with("ssh-gpu-box-"));
        assert_eq!(record.embedding_mode, EmbeddingMode::Websocket);
        assert_eq!(record.status, ConnectionStatus::Connecting);
        assert_eq!(record.instance_name.as_deref(), Some("gpu-box"));
        assert_eq!(record.proxy_url, "ws://127.0.0.1:8943/proxy/terminal/gpu-box");
        assert!(record.title.contains("SSH: gpu-box"));
    }

    #[test]
    fn desktop_connection_embeds_as_iframe() {
        let record = build_connection(ConnectionType::Desktop, "render-01", &HashMap::new());
        assert!(record.id.starts_with("desktop-render-01-"));
        assert_eq!(record.embedding_mode, EmbeddingMode::Iframe);
        assert!(record.proxy_url.ends_with("/proxy/desktop/render-01"));
        assert!(record.title.contains("Desktop: render-01"));
    }

    #[test]
    fn web_connection_defaults_to_jupyter() {
        let record = build_connection(ConnectionType::Web, "gpu-box", &HashMap::new());
        assert!(record.id.starts_with("web-gpu-box-jupyter-"));
        assert_eq!(
            record.metadata.get("service"),
            Some(&Value::String("jupyter".to_string()))
        );
        // Proxy path is keyed by target only.
        assert_eq!(record.proxy_url, "http://127.0.0.1:8943/proxy/web/gpu-box");
        assert!(record.title.contains("jupyter"));
    }

    #[test]
    fn braket_connection_carries_service_and_region() {
        let mut options = HashMap::new();
        options.insert("service".to_string(), "braket".to_string());
        options.insert("region".to_string(), "eu-west-1".to_string());

        let record = build_connection(ConnectionType::AwsService, "", &options);
        assert!(record.id.starts_with("aws-braket-eu-west-1-"));
        assert!(record.title.contains("Braket"));
        assert!(record.title.contains("eu-west-1"));
        assert!(record.proxy_url.contains("service=braket"));
        assert!(record.proxy_url.contains("region=eu-west-1"));
        assert_eq!(record.instance_name, None);
        assert_eq!(record.aws_service.as_deref(), Some("braket"));
        assert_eq!(record.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn unknown_aws_service_gets_generic_title() {
        let mut options = HashMap::new();
        options.insert("service".to_string(), "lightsail".to_string());

        let record = build_connection(ConnectionType::AwsService, "", &options);
        assert!(record.title.contains("lightsail (us-east-1)"));
        assert_eq!(record.region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn daemon_supplied_proxy_and_token_are_used_verbatim() {
        let mut options = HashMap::new();
        options.insert("proxy_url".to_string(), "http://127.0.0.1:9110/t/abc".to_string());
        options.insert("auth_token".to_string(), "tok-123".to_string());

        let record = build_connection(ConnectionType::Ssh, "gpu-box", &options);
        assert_eq!(record.proxy_url, "http://127.0.0.1:9110/t/abc");
        assert_eq!(record.auth_token.as_deref(), Some("tok-123"));
    }

    #[test]
    fn token_only_aws_connection_has_no_proxy() {
        let mut options = HashMap::new();
        options.insert("auth_token".to_string(), "federation-token".to_string());

        let record = build_connection(ConnectionType::AwsService, "", &options);
        assert!(record.proxy_url.is_empty());
        assert_eq!(record.auth_token.as_deref(), Some("federation-token"));
    }

    #[test]
    fn metadata_is_seeded_at_creation() {
        let record = build_connection(ConnectionType::Ssh, "gpu-box", &HashMap::new());
        assert_eq!(
            record.metadata.get("connection_type"),
            Some(&Value::String("ssh".to_string()))
        );
        assert!(record.metadata.contains_key("launch_time"));
        assert!(!record.metadata.contains_key("last_update"));
    }

    #[test]
    fn ids_are_distinct_across_targets_and_types_in_the_same_second() {
        let a = build_connection(ConnectionType::Ssh, "box-a", &HashMap::new());
        let b = build_connection(ConnectionType::Ssh, "box-b", &HashMap::new());
        let c = build_connection(ConnectionType::Desktop, "box-a", &HashMap::new());
        assert_ne!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_ne!(b.id, c.id);
    }
}
