//! Configuration parser for the registry, device and task files.
//!
//! This module handles loading configuration from YAML (or JSON) files and
//! environment variables, with proper precedence and error handling.

use crate::error::{ConfigError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::spec::{DeviceConfig, RegistryFile, ResourceTask, TaskFile};
use super::validator::RegistryValidator;
use crate::schema::ResourceRegistry;

/// Default registry file names to search for.
pub const DEFAULT_REGISTRY_FILES: &[&str] = &["sonic-resources.yaml", "sonic-resources.yml"];

/// Environment variables that override the device connection file.
pub const ENV_HOST: &str = "SONIC_HOST";
/// Environment override for the REST user name.
pub const ENV_USERNAME: &str = "SONIC_USERNAME";
/// Environment override for the REST password.
pub const ENV_PASSWORD: &str = "SONIC_PASSWORD";
/// Environment override for TLS verification (`true`/`false`).
pub const ENV_VERIFY_TLS: &str = "SONIC_VERIFY_TLS";

/// Configuration parser.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Loads and validates a resource registry file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_registry(&self, path: impl AsRef<Path>) -> Result<ResourceRegistry> {
        let path = self.resolve(path.as_ref());
        info!("Loading resource registry from: {}", path.display());
        let content = read_file(&path)?;
        self.parse_registry(&content, Some(&path))
    }

    /// Parses and validates a registry from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or a descriptor is malformed.
    pub fn parse_registry(&self, content: &str, source: Option<&Path>) -> Result<ResourceRegistry> {
        let file: RegistryFile = parse_yaml(content, source)?;
        let result = RegistryValidator::new().validate(&file)?;
        for warning in &result.warnings {
            warn!("{warning}");
        }

        let registry = ResourceRegistry::from_descriptors(file.resources)?;
        debug!("Registry holds {} resource(s)", registry.len());
        Ok(registry)
    }

    /// Loads device connection settings, then applies environment overrides.
    ///
    /// Without a file, `SONIC_HOST` must be set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or no host is configured.
    pub fn load_device(&self, path: Option<&Path>) -> Result<DeviceConfig> {
        let lookup = |name: &str| std::env::var(name).ok();

        let mut config = match path {
            Some(path) => {
                let path = self.resolve(path);
                info!("Loading device configuration from: {}", path.display());
                parse_yaml(&read_file(&path)?, Some(&path))?
            }
            None => {
                let host = lookup(ENV_HOST).ok_or_else(|| ConfigError::MissingEnvVar {
                    name: String::from(ENV_HOST),
                })?;
                DeviceConfig::for_host(host)
            }
        };

        Self::apply_overrides(&mut config, lookup)?;
        Ok(config)
    }

    /// Applies `SONIC_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if `SONIC_VERIFY_TLS` is not a boolean.
    pub fn apply_overrides(
        config: &mut DeviceConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(host) = lookup(ENV_HOST) {
            debug!("Overriding host from environment");
            config.host = host;
        }

        if let Some(username) = lookup(ENV_USERNAME) {
            debug!("Overriding username from environment");
            config.username = username;
        }

        if let Some(password) = lookup(ENV_PASSWORD) {
            debug!("Overriding password from environment");
            config.password = Some(password);
        }

        if let Some(verify) = lookup(ENV_VERIFY_TLS) {
            config.verify_tls = verify.parse().map_err(|_| {
                ConfigError::validation(
                    format!("{ENV_VERIFY_TLS} must be 'true' or 'false', got '{verify}'"),
                    ENV_VERIFY_TLS,
                )
            })?;
        }

        Ok(())
    }

    /// Loads a task file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_tasks(&self, path: impl AsRef<Path>) -> Result<Vec<ResourceTask>> {
        let path = path.as_ref();
        info!("Loading tasks from: {}", path.display());
        let file: TaskFile = self.load_document(path)?;
        Ok(file.tasks)
    }

    /// Loads a configuration tree: a want tree or a facts document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_tree(&self, path: impl AsRef<Path>) -> Result<Value> {
        self.load_document(path.as_ref())
    }

    /// Loads any document, as JSON for `.json` files and YAML otherwise.
    fn load_document<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let path = self.resolve(path);
        let content = read_file(&path)?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| {
                ConfigError::ParseError {
                    message: format!("JSON parse error: {e}"),
                    location: Some(path.display().to_string()),
                }
                .into()
            })
        } else {
            parse_yaml(&content, Some(&path))
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| ConfigError::ParseError {
                message: format!("Failed to load .env file: {e}"),
                location: Some(env_path.display().to_string()),
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    std::fs::read_to_string(path).map_err(|e| {
        ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        }
        .into()
    })
}

fn parse_yaml<T: DeserializeOwned>(content: &str, source: Option<&Path>) -> Result<T> {
    serde_yaml::from_str(content).map_err(|e| {
        ConfigError::ParseError {
            message: format!("YAML parse error: {e}"),
            location: source.map(|p| p.display().to_string()),
        }
        .into()
    })
}

/// Finds the registry file in `start_dir` or its parents, then in the user
/// configuration directory.
///
/// # Errors
///
/// Returns an error if no registry file is found.
pub fn find_registry_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_REGISTRY_FILES {
            let candidate = current.join(filename);
            if candidate.exists() {
                info!("Found registry file: {}", candidate.display());
                return Ok(candidate);
            }
        }

        if !current.pop() {
            break;
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let candidate = config_dir.join("sonic-reconcile").join(DEFAULT_REGISTRY_FILES[0]);
        if candidate.exists() {
            info!("Found registry file: {}", candidate.display());
            return Ok(candidate);
        }
    }

    Err(ConfigError::FileNotFound {
        path: start.join(DEFAULT_REGISTRY_FILES[0]),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::DesiredState;
    use std::collections::HashMap;

    const REGISTRY: &str = r"
resources:
  - name: vlans
    description: VLANs and their members
    rest:
      path: /restconf/data/sonic-vlan:sonic-vlan/VLAN
      list_name: VLAN_LIST
    schema:
      type: list
      key: [vlan_id]
      element:
        type: dict
        fields:
          vlan_id: { type: scalar, kind: int }
          members: { type: list, element: { type: scalar, kind: string } }
";

    #[test]
    fn test_parse_registry() {
        let registry = ConfigParser::new()
            .parse_registry(REGISTRY, None)
            .expect("registry should parse");
        assert_eq!(registry.len(), 1);
        let vlans = registry.get("vlans").expect("vlans registered");
        assert_eq!(vlans.key_specs().keys_for(""), Some(&[String::from("vlan_id")][..]));
    }

    #[test]
    fn test_parse_registry_reports_location() {
        let err = ConfigParser::new()
            .parse_registry("resources: [", Some(Path::new("bad.yaml")))
            .expect_err("invalid yaml");
        match err {
            crate::error::SonicError::Config(ConfigError::ParseError { location, .. }) => {
                assert_eq!(location.as_deref(), Some("bad.yaml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_registry_relative_to_base() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("sonic-resources.yaml"), REGISTRY).expect("write");

        let registry = ConfigParser::new()
            .with_base_path(dir.path())
            .load_registry("sonic-resources.yaml")
            .expect("load");
        assert!(registry.get("vlans").is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigParser::new()
            .load_registry("/nonexistent/sonic-resources.yaml")
            .expect_err("missing");
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_load_tree_json_and_yaml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let json_path = dir.path().join("facts.json");
        let yaml_path = dir.path().join("facts.yaml");
        std::fs::write(&json_path, r#"{ "vlans": [{ "vlan_id": 10 }] }"#).expect("write");
        std::fs::write(&yaml_path, "vlans:\n  - vlan_id: 10\n").expect("write");

        let parser = ConfigParser::new();
        let from_json = parser.load_tree(&json_path).expect("json");
        let from_yaml = parser.load_tree(&yaml_path).expect("yaml");
        assert_eq!(from_json, from_yaml);
    }

    #[test]
    fn test_load_tasks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.yaml");
        std::fs::write(
            &path,
            "tasks:\n  - resource: vlans\n    state: overridden\n    config:\n      - vlan_id: 10\n",
        )
        .expect("write");

        let tasks = ConfigParser::new().load_tasks(&path).expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].state, DesiredState::Overridden);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_HOST, "10.1.1.1"),
            (ENV_PASSWORD, "secret"),
            (ENV_VERIFY_TLS, "false"),
        ]);
        let mut config = DeviceConfig::for_host("leaf1");
        ConfigParser::apply_overrides(&mut config, |name| env.get(name).map(ToString::to_string))
            .expect("overrides");

        assert_eq!(config.host, "10.1.1.1");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert!(!config.verify_tls);
    }

    #[test]
    fn test_invalid_verify_tls() {
        let mut config = DeviceConfig::for_host("leaf1");
        let result = ConfigParser::apply_overrides(&mut config, |name| {
            (name == ENV_VERIFY_TLS).then(|| String::from("maybe"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_find_registry_file_in_parent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(dir.path().join("sonic-resources.yaml"), REGISTRY).expect("write");

        let found = find_registry_file(&nested).expect("found");
        assert_eq!(found, dir.path().join("sonic-resources.yaml"));
    }
}
