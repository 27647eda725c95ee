//! Resource schemas.
//!
//! Every resource is one generic reconciler parameterized by a descriptor:
//! its schema, the key specification of its lists and its REST binding.

mod descriptor;
mod keyspec;
mod registry;
mod validate;

pub use descriptor::{
    DictSchema, FieldSchema, ListSchema, ResourceDescriptor, RestBinding, ScalarKind, ScalarSchema,
};
pub use keyspec::KeySpecTable;
pub use registry::ResourceRegistry;
pub use validate::SchemaValidator;
