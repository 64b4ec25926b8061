//! # vigil-client
//!
//! HTTP implementation of the `vigil-core` source traits.
//!
//! - [`ResourceClient`] - runtimes, apps, error details, workspace state, migrations
//! - [`error`] - client errors and their mapping onto `VigilError`

pub mod api;
pub mod api_types;
pub mod error;

pub use api::ResourceClient;
pub use error::{ClientError, Result};
