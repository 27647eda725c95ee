//! Fact collection: reading the current configuration of a resource.
//!
//! Collected trees are normalized into the same canonical shape as user
//! input, so that absent and empty read the same on both sides of a diff.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::config::ConfigParser;
use crate::error::{DeviceError, Result};
use crate::schema::ResourceDescriptor;
use crate::tree::normalize;

use super::client::RestClient;

/// Reads the have tree of a resource.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FactCollector: Send + Sync {
    /// Returns the normalized tree currently configured for `resource`.
    async fn collect(&self, resource: &ResourceDescriptor) -> Result<Value>;
}

/// Collects facts from the device REST interface.
#[derive(Debug, Clone)]
pub struct RestFactCollector {
    /// Device client.
    client: RestClient,
}

impl RestFactCollector {
    /// Creates a collector over a client.
    #[must_use]
    pub const fn new(client: RestClient) -> Self {
        Self { client }
    }

    /// Strips the RESTCONF envelope: a single module-qualified wrapper and,
    /// for list resources, the list node.
    fn unwrap_response(resource: &ResourceDescriptor, value: Value) -> Value {
        let value = match value {
            Value::Object(object)
                if object.len() == 1 && object.keys().all(|k| k.contains(':')) =>
            {
                object.into_iter().next().map_or(Value::Null, |(_, inner)| inner)
            }
            other => other,
        };

        let list_name = resource.rest.as_ref().and_then(|r| r.list_name.as_deref());
        match (list_name, &value) {
            (Some(name), Value::Object(object)) => object
                .iter()
                .find(|(k, _)| *k == name || k.rsplit(':').next() == Some(name))
                .map(|(_, v)| v.clone())
                .unwrap_or(Value::Null),
            _ => value,
        }
    }
}

#[async_trait]
impl FactCollector for RestFactCollector {
    async fn collect(&self, resource: &ResourceDescriptor) -> Result<Value> {
        let rest = resource.rest.as_ref().ok_or_else(|| DeviceError::Unbound {
            resource: resource.name.clone(),
        })?;

        info!("Collecting facts for {} from {}", resource.name, self.client.base_url());
        let response = self.client.get(&rest.path).await?;
        let facts = normalize(&Self::unwrap_response(resource, response));

        debug!(
            "Facts for {}: {}",
            resource.name,
            if facts.is_null() { "empty" } else { "present" }
        );
        Ok(facts)
    }
}

/// Collects facts from a document keyed by resource name.
#[derive(Debug, Clone, Default)]
pub struct FileFactCollector {
    /// Facts document.
    facts: Value,
}

impl FileFactCollector {
    /// Creates a collector over an in-memory document.
    #[must_use]
    pub const fn new(facts: Value) -> Self {
        Self { facts }
    }

    /// Loads the document from a YAML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let facts = ConfigParser::new().load_tree(path)?;
        Ok(Self { facts })
    }
}

#[async_trait]
impl FactCollector for FileFactCollector {
    async fn collect(&self, resource: &ResourceDescriptor) -> Result<Value> {
        let facts = self.facts.get(&resource.name).map_or(Value::Null, normalize);
        debug!("Read facts for {} from document", resource.name);
        Ok(facts)
    }
}
