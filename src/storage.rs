//! Interface to the storage/ORM collaborator.
//!
//! This core never constructs SQL. Every read goes through the
//! [`StorageBackend`] trait as an (entity tag, filter, scope) triple; every
//! write is an opaque [`MutationOp`] plus a JSON payload. Retry and backoff,
//! if any, belong to the implementation behind the trait.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::scope::ScopeFilter;

/// One row as handed over by the storage collaborator.
pub type Row = JsonValue;

/// Ordered equality predicates on entity fields.
///
/// Kept as an ordered list so a filter set has a stable textual form when it
/// participates in loader cache keys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterSet(Vec<(&'static str, JsonValue)>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &'static str, value: impl Into<JsonValue>) -> Self {
        self.0.push((field, value.into()));
        self
    }

    /// Adds an equality predicate only when the value is present; `None`
    /// means "do not filter on this field" throughout the gateway.
    pub fn maybe<V: Into<JsonValue>>(self, field: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    pub fn entries(&self) -> &[(&'static str, JsonValue)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Concrete ordering applied to a listing query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortOrder {
    pub key: String,
    pub ascending: bool,
}

/// Write-side operation descriptors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationOp {
    Insert,
    Update { key: String },
    Delete { key: String },
}

/// Result of a write operation.
#[derive(Clone, Debug, Default)]
pub struct MutationOutcome {
    /// Number of rows the operation touched; zero signals "no such object".
    pub affected: u64,
    /// The written row, when the backend can return it.
    pub row: Option<Row>,
}

/// The storage/ORM collaborator.
///
/// `tag` names an entity table (`"agent"`) or a keyed lookup
/// (`"user.by_email"`); the implementation owns the mapping from tags to
/// actual queries.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Batched multi-key lookup. Returns rows grouped per key; keys with no
    /// match are simply absent from the map. Grouping (rather than a single
    /// row per key) lets one method serve both unique lookups and
    /// list-valued lookups such as session-name matches.
    async fn fetch_by_keys(
        &self,
        tag: &str,
        keys: &[String],
        scope: &ScopeFilter,
        filters: &FilterSet,
    ) -> Result<HashMap<String, Vec<Row>>>;

    /// Count of rows matching filter+scope, ignoring any slicing.
    async fn count(&self, tag: &str, filters: &FilterSet, scope: &ScopeFilter) -> Result<u64>;

    /// Ordered listing under filter+scope with optional slicing.
    async fn query_slice(
        &self,
        tag: &str,
        filters: &FilterSet,
        scope: &ScopeFilter,
        order: &SortOrder,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<Vec<Row>>;

    /// Applies a write operation and reports how many rows it touched.
    async fn apply(&self, tag: &str, op: MutationOp, payload: Row) -> Result<MutationOutcome>;
}
