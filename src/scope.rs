//! Scope narrowing predicates applied to every query.
//!
//! A [`ScopeFilter`] is the sparse set of domain/group/user boundaries the
//! storage collaborator must honor for one resolver invocation. Filters are
//! computed fresh per invocation from the caller identity and are never
//! cached across requests; they also hash into loader cache keys so that
//! lookups under different scopes never share results.

use uuid::Uuid;

/// Sparse narrowing predicates for a single query.
///
/// Invariants enforced by the guards that produce these values:
/// - for role USER the caller's own access key / user id is pinned,
/// - for role ADMIN the caller's own domain is pinned,
/// - for role SUPERADMIN the filter is fully caller-specified (an empty
///   filter means unrestricted).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ScopeFilter {
    pub domain_name: Option<String>,
    pub group_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub access_key: Option<String>,
}

impl ScopeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(mut self, domain_name: Option<String>) -> Self {
        self.domain_name = domain_name;
        self
    }

    pub fn with_group(mut self, group_id: Option<Uuid>) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn with_user(mut self, user_id: Option<Uuid>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_access_key(mut self, access_key: Option<String>) -> Self {
        self.access_key = access_key;
        self
    }

    /// True when no narrowing predicate is set at all.
    pub fn is_unrestricted(&self) -> bool {
        self.domain_name.is_none()
            && self.group_id.is_none()
            && self.user_id.is_none()
            && self.access_key.is_none()
    }
}

/// Which identity value a scoped query argument is checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityKey {
    AccessKey,
    Email,
    UserId,
}
