//! Entity object model exposed over the GraphQL schema.
//!
//! Each entity module defines the output type, its [`Entity`] impl (tag,
//! default ordering, row conversion), loader constructors for single-key
//! lookups, and the entity's `load_count`/`load_slice`/`load_all` family
//! where it is list-capable.

use serde::de::DeserializeOwned;

use crate::error::{GatewayError, Result};
use crate::storage::Row;

mod agent;
mod domain;
mod group;
mod image;
mod kernel;
mod keypair;
mod scaling_group;
mod user;
mod vfolder;

pub use agent::Agent;
pub use domain::Domain;
pub use group::Group;
pub use image::Image;
pub use kernel::{ComputeContainer, ComputeSession};
pub use keypair::KeyPair;
pub use scaling_group::ScalingGroup;
pub use user::User;
pub use vfolder::VirtualFolder;

/// A resource row materialized from the storage collaborator.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Table-level entity tag understood by the storage backend.
    const TAG: &'static str;
    /// Stable default ordering when the caller does not customize it.
    const DEFAULT_ORDER_KEY: &'static str;

    fn from_row(row: &Row) -> Result<Self>;

    /// Entity-specific not-found error for singular lookups.
    fn not_found() -> GatewayError {
        GatewayError::ObjectNotFound { object: Self::TAG }
    }
}

/// Deserializes a storage row into an entity; a row that does not fit the
/// entity shape is a storage integrity failure, not a client error.
pub(crate) fn from_row_via_serde<T: DeserializeOwned>(tag: &'static str, row: &Row) -> Result<T> {
    serde_json::from_value(row.clone())
        .map_err(|e| GatewayError::Internal(format!("malformed {tag} row: {e}")))
}
