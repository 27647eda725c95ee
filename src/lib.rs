// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # SONiC Reconcile
//!
//! Declarative, idempotent configuration of SONiC switch resources.
//!
//! ## Overview
//!
//! Every resource (VLANs, interfaces, BGP neighbors, ...) is handled by one
//! generic reconciler parameterized by a resource descriptor. A run:
//!
//! 1. **Have**: collects the current configuration tree from the device
//! 2. **Want**: takes the desired tree and a desired state
//! 3. **Diff**: compares both trees, matching list elements by key
//! 4. **Reconcile**: derives ordered ADD/REPLACE/REMOVE operations and the
//!    predicted configuration once they are applied
//! 5. **Apply**: translates operations into RESTCONF requests and sends them
//!
//! ## Desired states
//!
//! - `merged`: add and update, never remove
//! - `replaced`: like merged, and reset unnamed fields of the named elements
//! - `overridden`: make the device match want exactly
//! - `deleted`: remove what want names, or everything when want is empty
//!
//! ## Modules
//!
//! - [`tree`]: configuration trees, paths and normalization
//! - [`schema`]: resource descriptors and key specifications
//! - [`differ`]: structural diff engine
//! - [`reconciler`]: desired-state policies, ordering and prediction
//! - [`device`]: REST client, fact collection and request translation
//! - [`runner`]: one full reconciliation run of a resource
//! - [`config`]: registry, device and task file loading
//! - [`cli`]: command-line interface
//!
//! ## Example
//!
//! ```yaml
//! resources:
//!   - name: vlans
//!     rest:
//!       path: /restconf/data/sonic-vlan:sonic-vlan/VLAN
//!       list_name: VLAN_LIST
//!     schema:
//!       type: list
//!       key: [name]
//!       element:
//!         type: dict
//!         fields:
//!           name: { type: scalar, kind: string }
//!           mtu: { type: scalar, kind: int, default: 9100 }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod device;
pub mod differ;
pub mod error;
pub mod reconciler;
pub mod runner;
pub mod schema;
pub mod tree;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, DeviceConfig, RegistryValidator, ResourceTask};
pub use device::{FactCollector, RequestSender, RequestTranslator, RestClient, RestconfTranslator};
pub use differ::{Change, ChangeKind, DiffEngine, DiffResult};
pub use error::{Result, SonicError};
pub use reconciler::{DesiredState, Operation, OperationKind, Reconciliation, StateReconciler};
pub use runner::{ModuleResult, ModuleRunner};
pub use schema::{KeySpecTable, ResourceDescriptor, ResourceRegistry};
pub use tree::{ConfigTree, TreePath};
