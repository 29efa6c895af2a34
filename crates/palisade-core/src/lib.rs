#![doc = include_str!("../README.md")]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod label;
mod registry;
mod schema;

pub use label::{collect_required, lookup_path, Label, LabelError, Principal, SEC_FIELD};
pub use registry::SchemaRegistry;
pub use schema::SchemaNode;
