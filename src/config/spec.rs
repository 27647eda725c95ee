//! Configuration file types.
//!
//! These types map to the resource registry file (`sonic-resources.yaml`),
//! the device connection file and task files listing desired state per
//! resource.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reconciler::DesiredState;
use crate::schema::ResourceDescriptor;

/// The resource registry file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryFile {
    /// Resource descriptors.
    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
}

/// Connection settings for one switch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Host name, address or base URL of the management interface.
    pub host: String,
    /// REST user name.
    #[serde(default = "default_username")]
    pub username: String,
    /// REST password. Usually supplied through `SONIC_PASSWORD`.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Whether to verify the device TLS certificate.
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Attempts per request for transient failures.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

/// A task file: desired state for a sequence of resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskFile {
    /// Tasks in execution order.
    pub tasks: Vec<ResourceTask>,
}

/// Desired state for one resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceTask {
    /// Resource name in the registry.
    pub resource: String,
    /// Reconciliation mode.
    #[serde(default)]
    pub state: DesiredState,
    /// Want tree. Omitted means empty.
    #[serde(default)]
    pub config: Value,
}

impl DeviceConfig {
    /// Creates a configuration for a host with default settings.
    #[must_use]
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: default_username(),
            password: None,
            verify_tls: true,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }

    /// Base URL of the REST interface. Bare hosts get `https://`.
    #[must_use]
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        }
    }
}

fn default_username() -> String {
    String::from("admin")
}

const fn default_true() -> bool {
    true
}

const fn default_timeout() -> u64 {
    30
}

const fn default_retries() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_defaults() {
        let config: DeviceConfig = serde_yaml::from_str("host: 10.0.0.1").expect("parse");
        assert_eq!(config.username, "admin");
        assert!(config.verify_tls);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.base_url(), "https://10.0.0.1");
    }

    #[test]
    fn test_base_url_keeps_scheme() {
        let config = DeviceConfig::for_host("http://127.0.0.1:8080/");
        assert_eq!(config.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_password_not_serialized() {
        let mut config = DeviceConfig::for_host("leaf1");
        config.password = Some(String::from("secret"));
        let yaml = serde_yaml::to_string(&config).expect("serialize");
        assert!(!yaml.contains("secret"));
    }

    #[test]
    fn test_task_defaults() {
        let file: TaskFile = serde_yaml::from_str(
            r"
tasks:
  - resource: interfaces
    config:
      - name: Ethernet0
        mtu: 9100
  - resource: vlans
    state: deleted
",
        )
        .expect("parse");
        assert_eq!(file.tasks[0].state, DesiredState::Merged);
        assert_eq!(file.tasks[1].state, DesiredState::Deleted);
        assert!(file.tasks[1].config.is_null());
    }
}
