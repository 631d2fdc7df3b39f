//! Machine-readable error taxonomy for the gateway core.
//!
//! Every error kind carries a stable URI-style type identifier and a default
//! human-readable title, and serializes to an RFC 7807 problem object
//! (`{type, title, ...}`). The transport layer maps `status()` to the HTTP
//! response code; clients should dispatch on `type`, not on `title`, because
//! titles may change for localization.

use std::str::FromStr;

use async_graphql::{ErrorExtensionValues, ErrorExtensions, ServerError};
use axum::http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

const PROB_BASE: &str = "https://api.strato.cloud/probs";

/// Gateway errors surfaced by resolvers, guards, and loaders.
///
/// All variants are cheap to construct from information available at the
/// raise site. Variants are `Clone` so a single batched-fetch failure can be
/// fanned out to every coalesced waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Target entity absent for the computed scope, with a free-form hint.
    #[error("no such object ({0})")]
    GenericNotFound(String),

    /// Target entity absent; the entity kind is known statically.
    #[error("no such {object}")]
    ObjectNotFound { object: &'static str },

    #[error("bad request")]
    GenericBadRequest,

    /// Malformed or missing required argument, or unrecognized role.
    #[error("missing or invalid API parameters ({0})")]
    InvalidApiParameters(String),

    /// Missing or malformed identity material at the trust boundary.
    #[error("missing or invalid authorization parameters ({0})")]
    InvalidAuthParameters(String),

    /// Caller is authenticated but not authorized for this scope/role.
    #[error("insufficient privilege to perform this operation")]
    InsufficientPrivilege,

    /// A lookup expected to be unique matched more than one row.
    #[error("too many {object} matches found")]
    TooManyMatches { object: &'static str },

    /// Wraps a failure reported by a remote worker agent.
    #[error("agent-side error occurred")]
    AgentSide {
        /// Resolved sub-type URI of the agent failure.
        sub_type: String,
        /// Summary of the original agent-side exception, if any.
        exception: Option<String>,
    },

    #[error("internal server error ({0})")]
    Internal(String),
}

impl GatewayError {
    /// Wraps an agent-reported failure.
    ///
    /// `code_or_uri` is either an explicit `https://` sub-type URI or one of
    /// the fixed short codes (`TIMEOUT`, `INVALID_INPUT`, `FAILURE`). Unknown
    /// short codes fail fast instead of silently defaulting.
    pub fn agent_side(code_or_uri: &str, exception: Option<String>) -> Result<Self> {
        let sub_type = if code_or_uri.starts_with("https://") {
            code_or_uri.to_owned()
        } else {
            code_or_uri.parse::<AgentErrorCode>()?.error_type().to_owned()
        };
        Ok(GatewayError::AgentSide { sub_type, exception })
    }

    /// Stable URI identifying the error kind.
    pub fn error_type(&self) -> String {
        let slug = match self {
            GatewayError::GenericNotFound(_) | GatewayError::ObjectNotFound { .. } => {
                "generic-not-found"
            }
            GatewayError::GenericBadRequest => "generic-bad-request",
            GatewayError::InvalidApiParameters(_) => "invalid-api-params",
            GatewayError::InvalidAuthParameters(_) => "invalid-auth-params",
            GatewayError::InsufficientPrivilege => "insufficient-privilege",
            GatewayError::TooManyMatches { .. } => "too-many-matches",
            GatewayError::AgentSide { .. } => "agent-error",
            GatewayError::Internal(_) => "internal-server-error",
        };
        format!("{PROB_BASE}/{slug}")
    }

    /// Default human-readable title for the error kind.
    pub fn title(&self) -> &'static str {
        match self {
            GatewayError::GenericNotFound(_) | GatewayError::ObjectNotFound { .. } => {
                "No such object."
            }
            GatewayError::GenericBadRequest => "Bad request.",
            GatewayError::InvalidApiParameters(_) => "Missing or invalid API parameters.",
            GatewayError::InvalidAuthParameters(_) => {
                "Missing or invalid authorization parameters."
            }
            GatewayError::InsufficientPrivilege => "Insufficient privilege.",
            GatewayError::TooManyMatches { .. } => "Too many matches found.",
            GatewayError::AgentSide { .. } => "Agent-side error occurred.",
            GatewayError::Internal(_) => "Internal server error.",
        }
    }

    /// HTTP status equivalent, consumed by the transport boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::GenericNotFound(_)
            | GatewayError::ObjectNotFound { .. }
            | GatewayError::TooManyMatches { .. } => StatusCode::NOT_FOUND,
            GatewayError::GenericBadRequest | GatewayError::InvalidApiParameters(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::InvalidAuthParameters(_) => StatusCode::UNAUTHORIZED,
            GatewayError::InsufficientPrivilege => StatusCode::FORBIDDEN,
            GatewayError::AgentSide { .. } | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// RFC 7807 problem body.
    ///
    /// Agent-side failures nest their original sub-type and exception summary
    /// under `agent-details`.
    pub fn to_problem(&self) -> serde_json::Value {
        let mut body = json!({
            "type": self.error_type(),
            "title": self.title(),
        });
        if let GatewayError::AgentSide { sub_type, exception } = self {
            let mut details = json!({
                "type": sub_type,
                "title": "Agent-side exception occurred.",
            });
            if let Some(exc) = exception {
                details["exception"] = json!(exc);
            }
            body["agent-details"] = details;
        }
        body
    }

    /// Converts into a GraphQL server error with `type`/`title` extensions,
    /// for failures raised before schema execution starts.
    pub fn into_server_error(self) -> ServerError {
        let mut err = ServerError::new(self.to_string(), None);
        let mut ext = ErrorExtensionValues::default();
        ext.set("type", self.error_type());
        ext.set("title", self.title());
        ext.set("status", self.status().as_u16());
        err.extensions = Some(ext);
        err
    }
}

impl ErrorExtensions for GatewayError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, ext| {
            ext.set("type", self.error_type());
            ext.set("title", self.title());
            ext.set("status", self.status().as_u16());
        })
    }
}

/// [`GatewayError`] as it crosses the resolver boundary.
///
/// Resolvers return this wrapper instead of the bare enum so the taxonomy
/// lands in the GraphQL response as `type`/`title`/`status` extensions.
/// Must not implement `Display`: conversion into [`async_graphql::Error`]
/// goes through [`ErrorExtensions::extend`] only.
#[derive(Debug)]
pub struct GqlError(pub GatewayError);

impl From<GatewayError> for GqlError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl From<GqlError> for async_graphql::Error {
    fn from(err: GqlError) -> Self {
        err.0.extend()
    }
}

/// Result type for resolver boundaries.
pub type GqlResult<T> = std::result::Result<T, GqlError>;

/// Short codes an agent may report for a failed RPC operation.
///
/// The code-to-URI mapping is fixed at compile time; there is no dynamic
/// lookup table to fall through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentErrorCode {
    Timeout,
    InvalidInput,
    Failure,
}

impl AgentErrorCode {
    pub fn error_type(self) -> &'static str {
        match self {
            AgentErrorCode::Timeout => "https://api.strato.cloud/probs/agent-timeout",
            AgentErrorCode::InvalidInput => "https://api.strato.cloud/probs/agent-invalid-input",
            AgentErrorCode::Failure => "https://api.strato.cloud/probs/agent-failure",
        }
    }
}

impl FromStr for AgentErrorCode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TIMEOUT" => Ok(AgentErrorCode::Timeout),
            "INVALID_INPUT" => Ok(AgentErrorCode::InvalidInput),
            "FAILURE" => Ok(AgentErrorCode::Failure),
            other => Err(GatewayError::InvalidApiParameters(format!(
                "unknown agent error code: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_body_has_type_and_title() {
        let err = GatewayError::InsufficientPrivilege;
        let body = err.to_problem();
        assert_eq!(
            body["type"],
            "https://api.strato.cloud/probs/insufficient-privilege"
        );
        assert_eq!(body["title"], "Insufficient privilege.");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn agent_short_codes_resolve_to_fixed_uris() {
        let err = GatewayError::agent_side("timeout", Some("RuntimeError('oops')".into()))
            .expect("known short code");
        let body = err.to_problem();
        assert_eq!(
            body["agent-details"]["type"],
            "https://api.strato.cloud/probs/agent-timeout"
        );
        assert_eq!(body["agent-details"]["exception"], "RuntimeError('oops')");
    }

    #[test]
    fn explicit_agent_uri_passes_through() {
        let err = GatewayError::agent_side("https://api.strato.cloud/probs/agent-failure", None)
            .expect("explicit uri");
        assert!(matches!(
            err,
            GatewayError::AgentSide { ref sub_type, .. }
                if sub_type == "https://api.strato.cloud/probs/agent-failure"
        ));
    }

    #[test]
    fn unknown_agent_short_code_fails_fast() {
        let err = GatewayError::agent_side("EXPLODED", None).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidApiParameters(_)));
    }

    #[test]
    fn not_found_variants_share_a_status_class() {
        assert_eq!(
            GatewayError::ObjectNotFound { object: "kernel" }.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::TooManyMatches { object: "kernel" }.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn graphql_error_carries_extensions() {
        let err: async_graphql::Error = GqlError::from(GatewayError::GenericBadRequest).into();
        let ext = err.extensions.expect("extensions set");
        assert_eq!(
            ext.get("type"),
            Some(&async_graphql::Value::from(
                "https://api.strato.cloud/probs/generic-bad-request"
            ))
        );
    }
}
