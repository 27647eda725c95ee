//! Configuration for the SONiC reconciler.
//!
//! This module handles all configuration-related functionality:
//! - Parsing the resource registry (`sonic-resources.yaml`)
//! - Validation of resource descriptors
//! - Device connection settings and task files

mod parser;
mod spec;
mod validator;

pub use parser::{
    ConfigParser, DEFAULT_REGISTRY_FILES, ENV_HOST, ENV_PASSWORD, ENV_USERNAME, ENV_VERIFY_TLS,
    find_registry_file,
};
pub use spec::{DeviceConfig, RegistryFile, ResourceTask, TaskFile};
pub use validator::{RegistryValidator, ValidationError, ValidationResult};
