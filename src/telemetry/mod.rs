//! Usage Telemetry
//!
//! Identity of a running backend as reported to the cluster's event log, and
//! the background heartbeat that reports it.

pub mod heartbeat;

pub use heartbeat::*;

use crate::config::{BackendConfig, DriverKind, OrchestratorContext};
use serde::{Deserialize, Serialize};
use std::fs;

/// Heartbeat payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    #[serde(flatten)]
    pub orchestrator: OrchestratorContext,
    /// Storage driver name
    pub plugin: String,
    pub svm: String,
    pub storage_prefix: String,
}

impl Telemetry {
    pub fn new(orchestrator: &OrchestratorContext, driver: DriverKind, config: &BackendConfig) -> Self {
        Self {
            orchestrator: orchestrator.clone(),
            plugin: driver.name().to_string(),
            svm: config.svm.clone(),
            storage_prefix: config.storage_prefix().to_string(),
        }
    }
}

/// Name of the local host, `unknown` if it cannot be determined
pub fn hostname() -> String {
    if let Ok(hostname) = fs::read_to_string("/etc/hostname") {
        let hostname = hostname.trim();
        if !hostname.is_empty() {
            return hostname.to_string();
        }
    }

    #[cfg(unix)]
    {
        use std::process::Command;
        if let Ok(output) = Command::new("hostname").output() {
            let hostname = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if output.status.success() && !hostname.is_empty() {
                return hostname;
            }
        }
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let config = BackendConfig {
            svm: "svm0".into(),
            storage_prefix: Some("trident_".into()),
            ..Default::default()
        };
        let orchestrator = OrchestratorContext {
            version: "19.07.0".into(),
            platform_version: "v1.15.0".into(),
            ..Default::default()
        };

        let telemetry = Telemetry::new(&orchestrator, DriverKind::OntapNasEconomy, &config);
        let value = serde_json::to_value(&telemetry).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "name": "trident",
                "version": "19.07.0",
                "platform": "kubernetes",
                "platformVersion": "v1.15.0",
                "plugin": "ontap-nas-economy",
                "svm": "svm0",
                "storagePrefix": "trident_",
            })
        );
    }

    #[test]
    fn test_hostname_is_never_empty() {
        assert!(!hostname().is_empty());
    }
}
