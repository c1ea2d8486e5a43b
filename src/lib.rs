//! Connection lifecycle manager for the Workbench desktop client.
//!
//! Tracks heterogeneous remote-access connections (terminal, remote desktop,
//! tunneled web services, AWS console sessions), health-checks each one on
//! its own background task and notifies the UI layer of status changes
//! through per-connection callbacks. Actually provisioning the sessions is
//! the orchestration daemon's job; this crate only models records and their
//! health.

pub mod connection_factory;
pub mod connection_manager;
pub mod connection_types;
pub mod health_prober;

pub use connection_manager::{ConnectionManager, StatusCallback};
pub use connection_types::{
    ConnectionRecord, ConnectionStats, ConnectionStatus, ConnectionType, EmbeddingMode,
    MonitorConfig,
};
pub use health_prober::HealthProber;
