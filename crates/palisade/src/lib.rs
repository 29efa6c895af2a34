#![doc = include_str!("../README.md")]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod attachments;
pub mod auth;
mod config;
mod context;
mod error;
pub mod read;
pub mod rewrite;
pub mod routes;
mod state;
pub mod store;
pub mod write;

pub use config::{AttachmentMode, BlobCredentials, DatabaseAuth, GatewayConfig};
pub use context::RequestContext;
pub use error::{Error, Result};
pub use state::GatewayState;
