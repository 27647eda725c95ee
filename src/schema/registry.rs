//! Registry of resource descriptors.
//!
//! The registry is built once at startup from the descriptor file and passed
//! by reference to everything that needs to look a resource up.

use std::collections::BTreeMap;
use tracing::debug;

use super::descriptor::ResourceDescriptor;
use crate::error::{ConfigError, Result};

/// Resource name → descriptor table.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, ResourceDescriptor>,
}

impl ResourceRegistry {
    /// Builds a registry, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns an error if two descriptors share a name.
    pub fn from_descriptors(descriptors: Vec<ResourceDescriptor>) -> Result<Self> {
        let mut resources = BTreeMap::new();
        for descriptor in descriptors {
            if resources.contains_key(&descriptor.name) {
                return Err(ConfigError::DuplicateResource {
                    name: descriptor.name,
                }
                .into());
            }
            debug!("Registered resource: {}", descriptor.name);
            resources.insert(descriptor.name.clone(), descriptor);
        }
        Ok(Self { resources })
    }

    /// Looks a resource up by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource is not registered.
    pub fn get(&self, name: &str) -> Result<&ResourceDescriptor> {
        self.resources.get(name).ok_or_else(|| {
            ConfigError::UnknownResource {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Iterates over descriptors in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.values()
    }

    /// Number of registered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if no resource is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SonicError;
    use crate::schema::{DictSchema, FieldSchema};

    fn descriptor(name: &str) -> ResourceDescriptor {
        ResourceDescriptor {
            name: name.to_string(),
            description: String::new(),
            schema: FieldSchema::Dict(DictSchema::default()),
            rest: None,
        }
    }

    #[test]
    fn test_lookup() {
        let registry =
            ResourceRegistry::from_descriptors(vec![descriptor("vlans"), descriptor("interfaces")])
                .expect("registry should build");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("vlans").map(|d| d.name.as_str()).ok(), Some("vlans"));
        let names: Vec<_> = registry.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["interfaces", "vlans"]);
        assert!(matches!(
            registry.get("bgp"),
            Err(SonicError::Config(ConfigError::UnknownResource { .. }))
        ));
    }

    #[test]
    fn test_duplicate_rejected() {
        let result = ResourceRegistry::from_descriptors(vec![descriptor("vlans"), descriptor("vlans")]);
        assert!(matches!(
            result,
            Err(SonicError::Config(ConfigError::DuplicateResource { .. }))
        ));
    }
}
