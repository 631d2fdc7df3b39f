//! Caller identity, request context, and the GraphQL endpoint handler.
//!
//! Provides helpers for:
//! - Extracting the authenticated caller identity from gateway-verified
//!   HTTP headers
//! - Building the per-request GraphQL context (identity + fresh loader set)
//! - A standard Axum handler for the GraphQL endpoint
//!
//! Authentication itself (signature checks, keypair lookup) happens in the
//! upstream gateway; by the time a request reaches this layer its identity
//! headers are trusted.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, Enum, Request, Response, Schema};
use axum::{extract::Extension, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GatewayError, Result};
use crate::loader::DataLoaderManager;
use crate::middleware::MutationPrivilege;
use crate::mutation::Mutations;
use crate::query::Queries;
use crate::scope::IdentityKey;
use crate::storage::StorageBackend;

/// Client roles, ordered by privilege: MONITOR < USER < ADMIN < SUPERADMIN.
#[derive(
    Enum, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Monitor,
    User,
    Admin,
    Superadmin,
}

impl FromStr for UserRole {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "monitor" => Ok(UserRole::Monitor),
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            "superadmin" => Ok(UserRole::Superadmin),
            other => Err(GatewayError::InvalidApiParameters(format!(
                "unknown client role: {other}"
            ))),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Monitor => "monitor",
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Superadmin => "superadmin",
        };
        f.write_str(s)
    }
}

/// The authenticated caller, attached once per request and immutable for the
/// request's duration.
#[derive(Clone, Debug)]
pub struct CallerIdentity {
    pub role: UserRole,
    pub domain_name: String,
    pub user_id: Uuid,
    pub email: String,
    pub access_key: String,
}

impl CallerIdentity {
    /// Builds the identity from the trusted headers set by the upstream
    /// authentication layer.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let role: UserRole = required_header(headers, "x-strato-role")?.parse()?;
        let domain_name = required_header(headers, "x-strato-domain")?.to_owned();
        let user_id = required_header(headers, "x-strato-user-id")?
            .parse::<Uuid>()
            .map_err(|e| {
                GatewayError::InvalidAuthParameters(format!("malformed x-strato-user-id: {e}"))
            })?;
        let email = required_header(headers, "x-strato-email")?.to_owned();
        let access_key = required_header(headers, "x-strato-access-key")?.to_owned();
        Ok(Self { role, domain_name, user_id, email, access_key })
    }

    /// The caller's own value for a scoped-query identity key.
    pub fn value_for(&self, key: IdentityKey) -> String {
        match key {
            IdentityKey::AccessKey => self.access_key.clone(),
            IdentityKey::Email => self.email.clone(),
            IdentityKey::UserId => self.user_id.to_string(),
        }
    }
}

fn required_header<'h>(headers: &'h HeaderMap, name: &str) -> Result<&'h str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GatewayError::InvalidAuthParameters(format!("missing header {name}")))
}

/// Per-request context bag available to every resolver.
///
/// The loader manager is created fresh for each request and discarded with
/// it; loaders never outlive or cross requests.
pub struct GatewayContext {
    pub identity: CallerIdentity,
    pub storage: Arc<dyn StorageBackend>,
    pub loaders: DataLoaderManager,
}

impl GatewayContext {
    pub fn new(identity: CallerIdentity, storage: Arc<dyn StorageBackend>) -> Self {
        Self { identity, storage, loaders: DataLoaderManager::new() }
    }

    /// Fetches the request context from the GraphQL resolver context.
    pub fn from_graphql<'a>(ctx: &'a Context<'_>) -> Result<&'a GatewayContext> {
        ctx.data_opt::<GatewayContext>()
            .ok_or_else(|| GatewayError::Internal("request context is not initialized".into()))
    }
}

/// The executable gateway schema.
pub type GatewaySchema = Schema<Queries, Mutations, EmptySubscription>;

/// Wires the query/mutation roots and the mutation privilege middleware.
pub fn build_schema(storage: Arc<dyn StorageBackend>) -> GatewaySchema {
    Schema::build(Queries, Mutations, EmptySubscription)
        .extension(MutationPrivilege)
        .data(storage)
        .finish()
}

/// Standard GraphQL handler with caller identity injection.
///
/// Extracts the caller identity from headers, attaches a fresh
/// [`GatewayContext`] to the request, and executes the schema. Requests with
/// missing or malformed identity headers are answered with an error response
/// without executing the query.
pub async fn graphql_handler(
    Extension(schema): Extension<GatewaySchema>,
    Extension(storage): Extension<Arc<dyn StorageBackend>>,
    headers: HeaderMap,
    Json(request): Json<Request>,
) -> Json<Response> {
    let identity = match CallerIdentity::from_headers(&headers) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(error = %err, "rejecting request with bad identity headers");
            return Json(Response::from_errors(vec![err.into_server_error()]));
        }
    };
    tracing::debug!(
        role = %identity.role,
        domain = %identity.domain_name,
        "executing gql query",
    );
    let gctx = GatewayContext::new(identity, storage);
    Json(schema.execute(request.data(gctx)).await)
}
