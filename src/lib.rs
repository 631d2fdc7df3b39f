//! # strato-graphql-gateway
//!
//! Query/authorization layer of the Strato control plane's API gateway.
//!
//! ## Features
//!
//! - **Role-Gated Resolvers** - Privilege and scope guards applied per field
//! - **Batched Loaders** - Per-request coalescing caches for N+1 prevention
//! - **Offset Pagination** - Uniform count/slice/all listing protocol
//! - **Mutation Privilege Middleware** - Deny-by-default allow-sets per
//!   mutation, rejected in-band as `{ok, msg}` payloads
//! - **Problem Errors** - RFC 7807 style machine-readable error taxonomy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use strato_graphql_gateway::{build_schema, graphql_handler};
//!
//! let schema = build_schema(storage);
//! let app = axum::Router::new()
//!     .route("/admin/graphql", axum::routing::post(graphql_handler))
//!     .layer(axum::extract::Extension(schema));
//! ```

pub mod auth;
pub mod error;
pub mod guard;
pub mod loader;
pub mod middleware;
pub mod models;
pub mod mutation;
pub mod pagination;
pub mod query;
pub mod scope;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{
    build_schema, graphql_handler, CallerIdentity, GatewayContext, GatewaySchema, UserRole,
};
pub use error::{AgentErrorCode, GatewayError, GqlError, GqlResult, Result};
pub use guard::{ensure_mutation_scope, PrivilegedQuery, ScopedQuery};
pub use loader::{BatchSource, DataLoaderManager, EntitySource, ListSource, Loader, LoaderKey};
pub use middleware::MutationPrivilege;
pub use models::{
    Agent, ComputeContainer, ComputeSession, Domain, Entity, Group, Image, KeyPair, ScalingGroup,
    User, VirtualFolder,
};
pub use mutation::{allowed_roles_for, MutationDescriptor, Mutations, MUTATION_DESCRIPTORS};
pub use pagination::{load_all, load_count, load_slice, PageOrder, PaginatedList};
pub use query::Queries;
pub use scope::{IdentityKey, ScopeFilter};
pub use storage::{FilterSet, MutationOp, MutationOutcome, Row, SortOrder, StorageBackend};
