//! Device I/O around the reconciliation core.
//!
//! This module provides:
//! - REST client with retry logic
//! - Fact collection from the device or a facts document
//! - Translation of operations into RESTCONF requests
//! - Ordered execution of requests

mod client;
mod executor;
mod facts;
mod translate;

pub use client::{RequestSender, RestClient};
pub use executor::{ExecutionResult, RequestExecutor, RequestResult};
pub use facts::{FactCollector, FileFactCollector, RestFactCollector};
pub use translate::{HttpMethod, RequestTranslator, RestRequest, RestconfTranslator};

#[cfg(test)]
pub(crate) use client::MockRequestSender;
#[cfg(test)]
pub(crate) use facts::MockFactCollector;
