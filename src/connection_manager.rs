use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use crate::connection_factory::build_connection;
use crate::connection_types::{
    ConnectionRecord, ConnectionStats, ConnectionStatus, ConnectionType, MonitorConfig,
};
use crate::health_prober::HealthProber;

pub type StatusCallback = Arc<dyn Fn(&ConnectionRecord) + Send + Sync>;

/// Records and callbacks live behind the same lock so a callback can never
/// fire for an id that has just been removed.
#[derive(Default)]
struct Registry {
    connections: HashMap<String, ConnectionRecord>,
    callbacks: HashMap<String, StatusCallback>,
}

/// Owns every live connection record, runs one background monitor per
/// connection and pushes status changes to registered callbacks.
///
/// One instance exists per running client. The registry stays small (tens of
/// records), so every mutation goes through a single coarse lock; readers
/// share it.
pub struct ConnectionManager {
    registry: Arc<RwLock<Registry>>,
    prober: Arc<HealthProber>,
    monitor_config: Arc<RwLock<MonitorConfig>>,
    shutting_down: Arc<AtomicBool>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            prober: Arc::new(HealthProber::new()),
            monitor_config: Arc::new(RwLock::new(MonitorConfig::default())),
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a connection record, register it and start its monitor.
    /// The returned record carries the generated id for later calls.
    pub fn create_connection(
        &self,
        conn_type: &str,
        target: &str,
        options: &HashMap<String, String>,
    ) -> Result<ConnectionRecord, String> {
        let kind = match ConnectionType::from_string(conn_type) {
            Some(kind) => kind,
            None => return Err(format!("unsupported connection type: {}", conn_type)),
        };

        let record = build_connection(kind, target, options);
        {
            let mut registry = self.registry.write().unwrap();
            registry
                .connections
                .insert(record.id.clone(), record.clone());
        }

        log::info!("created {} connection {}", kind.as_str(), record.id);
        self.spawn_monitor(record.id.clone());
        Ok(record)
    }

    pub fn get_connection(&self, id: &str) -> Option<ConnectionRecord> {
        self.registry.read().unwrap().connections.get(id).cloned()
    }

    /// Snapshot of all current records. Callers never observe later registry
    /// mutations through the returned vector.
    pub fn get_all_connections(&self) -> Vec<ConnectionRecord> {
        self.registry
            .read()
            .unwrap()
            .connections
            .values()
            .cloned()
            .collect()
    }

    /// Single choke point for status changes, shared with the monitor loops.
    /// Fires the registered callback with the updated record.
    pub fn update_connection(
        &self,
        id: &str,
        status: ConnectionStatus,
        message: Option<String>,
    ) -> Result<(), String> {
        Self::apply_update(&self.registry, id, status, message)
    }

    /// Close a connection and evict it. The record and its callback leave
    /// the registry in the same atomic step; the monitor notices the absence
    /// on its next tick and exits. Closing an unknown id is an error, not a
    /// no-op.
    pub fn close_connection(&self, id: &str) -> Result<(), String> {
        let mut registry = self.registry.write().unwrap();
        match registry.connections.get_mut(id) {
            Some(record) => {
                record.status = ConnectionStatus::Disconnected;
                record.metadata.insert(
                    "closed_at".to_string(),
                    Value::String(Utc::now().to_rfc3339()),
                );
            }
            None => return Err(format!("connection {} not found", id)),
        }
        registry.connections.remove(id);
        registry.callbacks.remove(id);
        log::info!("closed connection {}", id);
        Ok(())
    }

    /// Register the status-change callback for one connection, replacing any
    /// previous one. The callback only fires while the record exists; it
    /// must return quickly and must not call back into the registry.
    pub fn register_callback<F>(&self, id: &str, callback: F)
    where
        F: Fn(&ConnectionRecord) + Send + Sync + 'static,
    {
        self.registry
            .write()
            .unwrap()
            .callbacks
            .insert(id.to_string(), Arc::new(callback));
    }

    pub fn get_connection_stats(&self) -> ConnectionStats {
        let registry = self.registry.read().unwrap();
        let mut stats = ConnectionStats::default();
        for record in registry.connections.values() {
            stats.total += 1;
            match record.status {
                ConnectionStatus::Connecting => stats.connecting += 1,
                ConnectionStatus::Connected => stats.connected += 1,
                ConnectionStatus::Disconnected => stats.disconnected += 1,
                ConnectionStatus::Error => stats.error += 1,
            }
        }
        stats
    }

    /// JSON snapshot of the registry for the caller. The manager itself
    /// never persists anything.
    pub fn export_connections(&self) -> Result<String, String> {
        let registry = self.registry.read().unwrap();
        serde_json::to_string_pretty(&registry.connections)
            .map_err(|e| format!("failed to serialize connections: {}", e))
    }

    pub fn get_monitor_config(&self) -> MonitorConfig {
        self.monitor_config.read().unwrap().clone()
    }

    /// Monitors read the config when they start, so changes apply to
    /// connections created afterwards.
    pub fn update_monitor_config(&self, config: MonitorConfig) {
        *self.monitor_config.write().unwrap() = config;
    }

    /// Stop all monitors and drop every record. Monitors observe the flag on
    /// their next tick; useful for tests and app teardown.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Relaxed);
        let mut registry = self.registry.write().unwrap();
        registry.connections.clear();
        registry.callbacks.clear();
        log::info!("connection manager shut down");
    }

    fn spawn_monitor(&self, id: String) {
        let registry = self.registry.clone();
        let prober = self.prober.clone();
        let shutting_down = self.shutting_down.clone();
        let config = self.monitor_config.read().unwrap().clone();

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(config.probe_interval_secs));
            // The first tick completes immediately; consume it so the first
            // probe happens one interval after creation.
            interval.tick().await;

            loop {
                interval.tick().await;
                if shutting_down.load(Ordering::Relaxed) {
                    break;
                }

                // Absence from the registry is the stop signal.
                let snapshot = registry.read().unwrap().connections.get(&id).cloned();
                let record = match snapshot {
                    Some(record) => record,
                    None => break,
                };

                let observed = prober.probe(&record, &config).await;
                if observed != record.status {
                    log::debug!(
                        "connection {} went {} -> {}",
                        id,
                        record.status.as_str(),
                        observed.as_str()
                    );
                    // The record may have been closed while the probe was in
                    // flight; losing that race is fine.
                    let _ = Self::apply_update(&registry, &id, observed, None);
                }
            }
            log::debug!("monitor for {} stopped", id);
        });
    }

    fn apply_update(
        registry: &Arc<RwLock<Registry>>,
        id: &str,
        status: ConnectionStatus,
        message: Option<String>,
    ) -> Result<(), String> {
        let (updated, callback) = {
            let mut registry = registry.write().unwrap();
            let updated = match registry.connections.get_mut(id) {
                Some(record) => {
                    record.status = status;
                    record.metadata.insert(
                        "last_update".to_string(),
                        Value::String(Utc::now().to_rfc3339()),
                    );
                    if let Some(message) = message.filter(|m| !m.is_empty()) {
                        record
                            .metadata
                            .insert("status_message".to_string(), Value::String(message));
                    }
                    record.clone()
                }
                None => return Err(format!("connection {} not found", id)),
            };
            (updated, registry.callbacks.get(id).cloned())
        };

        // Invoked outside the write lock so a slow callback cannot stall
        // readers, and a callback that reads the registry cannot deadlock.
        if let Some(callback) = callback {
            callback(&updated);
        }
        Ok(())
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
