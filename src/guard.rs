//! Composable privilege policies applied at the resolver boundary.
//!
//! Two policies exist: a hard role gate ([`PrivilegedQuery`], attached to
//! fields as an `async_graphql` guard) and an argument-rewriting scope gate
//! ([`ScopedQuery`], applied as the first statement of a resolver body so the
//! resolver never observes an unvalidated argument). Mutations additionally
//! use [`ensure_mutation_scope`] to keep domain admins inside their own
//! domain.

use async_graphql::{Context, ErrorExtensions, Guard};

use crate::auth::{CallerIdentity, GatewayContext, UserRole};
use crate::error::{GatewayError, Result};
use crate::scope::IdentityKey;

/// Hard privilege gate: the wrapped resolver runs only for callers whose
/// role is at least `min_role` in the total order
/// SUPERADMIN > ADMIN > USER > MONITOR.
pub struct PrivilegedQuery {
    min_role: UserRole,
}

impl PrivilegedQuery {
    pub fn at_least(min_role: UserRole) -> Self {
        Self { min_role }
    }
}

impl Guard for PrivilegedQuery {
    async fn check(&self, ctx: &Context<'_>) -> async_graphql::Result<()> {
        let gctx = GatewayContext::from_graphql(ctx).map_err(|e| e.extend())?;
        if gctx.identity.role >= self.min_role {
            Ok(())
        } else {
            tracing::debug!(
                role = ?gctx.identity.role,
                required = ?self.min_role,
                "privileged query rejected",
            );
            Err(GatewayError::InsufficientPrivilege.extend())
        }
    }
}

/// Scope gate over a named identity-bearing argument (access key, email, or
/// user id) plus the accompanying `domain_name` argument.
///
/// Policy, by caller role:
/// - SUPERADMIN: both arguments pass through unmodified.
/// - ADMIN: an absent `domain_name` is overridden to the caller's own
///   domain; a present but mismatched one is rejected.
/// - below ADMIN: a value differing from the caller's own identity is
///   rejected before the resolver body runs, and an omitted value is always
///   pinned to the caller's own.
/// - with `autofill`, an omitted value resolves to the caller's own for
///   admin-level callers too.
#[derive(Clone, Copy, Debug)]
pub struct ScopedQuery {
    user_key: IdentityKey,
    autofill_user: bool,
}

impl ScopedQuery {
    /// Gate that fills in the caller's own identity when the argument is
    /// omitted (the "me" query shape).
    pub const fn autofill(user_key: IdentityKey) -> Self {
        Self { user_key, autofill_user: true }
    }

    /// Gate that leaves an omitted argument empty for admin-level callers,
    /// widening the query to their allowed scope. Callers below ADMIN are
    /// pinned to their own identity either way.
    pub const fn strict(user_key: IdentityKey) -> Self {
        Self { user_key, autofill_user: false }
    }

    /// Validates and rewrites `(domain_name, value)`, returning the pair the
    /// resolver is allowed to observe.
    pub fn apply(
        &self,
        identity: &CallerIdentity,
        domain_name: Option<String>,
        value: Option<String>,
    ) -> Result<(Option<String>, Option<String>)> {
        let own = identity.value_for(self.user_key);
        let mut domain_name = domain_name;
        let mut value = value;
        match identity.role {
            UserRole::Superadmin => {}
            UserRole::Admin => match domain_name {
                None => domain_name = Some(identity.domain_name.clone()),
                Some(ref given) if *given != identity.domain_name => {
                    return Err(GatewayError::InsufficientPrivilege);
                }
                Some(_) => {}
            },
            UserRole::User | UserRole::Monitor => {
                if let Some(ref given) = value {
                    if *given != own {
                        return Err(GatewayError::InsufficientPrivilege);
                    }
                }
                // Never let a sub-admin query run with an unpinned scope.
                value = Some(own.clone());
            }
        }
        if self.autofill_user && value.is_none() {
            value = Some(own);
        }
        Ok((domain_name, value))
    }
}

/// Admin-level mutations may only touch objects inside the caller's own
/// domain; superadmins are unrestricted.
pub fn ensure_mutation_scope(identity: &CallerIdentity, target_domain: &str) -> Result<()> {
    match identity.role {
        UserRole::Superadmin => Ok(()),
        UserRole::Admin if identity.domain_name == target_domain => Ok(()),
        _ => Err(GatewayError::InsufficientPrivilege),
    }
}
