//! Offset pagination with independent total counts.
//!
//! Every list-capable entity exposes the same three operations:
//! `load_count` (total under filter+scope, ignoring slicing), `load_slice`
//! (ordered window), and `load_all` (legacy unbounded variant). Count and
//! slice observe identical filter+scope semantics, so a slice with
//! `limit >= count` and `offset == 0` returns exactly `count` items.

use async_graphql::{OutputType, SimpleObject};

use crate::auth::GatewayContext;
use crate::error::Result;
use crate::models::{
    Agent, ComputeContainer, ComputeSession, Entity, Group, KeyPair, User, VirtualFolder,
};
use crate::scope::ScopeFilter;
use crate::storage::{FilterSet, SortOrder};

/// Caller-supplied ordering customization.
#[derive(Clone, Debug, Default)]
pub struct PageOrder {
    pub order_key: Option<String>,
    pub order_asc: Option<bool>,
}

impl PageOrder {
    pub fn new(order_key: Option<String>, order_asc: Option<bool>) -> Self {
        Self { order_key, order_asc }
    }

    /// Resolves to a concrete ordering, falling back to the entity's stable
    /// default key. Ascending unless explicitly disabled.
    pub fn resolve(&self, default_key: &str) -> SortOrder {
        SortOrder {
            key: self
                .order_key
                .clone()
                .unwrap_or_else(|| default_key.to_owned()),
            ascending: self.order_asc.unwrap_or(true),
        }
    }
}

/// Count of entities matching filter+scope, independent of limit/offset.
pub async fn load_count<E: Entity>(
    ctx: &GatewayContext,
    filters: &FilterSet,
    scope: &ScopeFilter,
) -> Result<u64> {
    ctx.storage.count(E::TAG, filters, scope).await
}

/// Ordered `offset..offset+limit` window of entities under filter+scope.
pub async fn load_slice<E: Entity>(
    ctx: &GatewayContext,
    limit: u64,
    offset: u64,
    filters: &FilterSet,
    scope: &ScopeFilter,
    order: &PageOrder,
) -> Result<Vec<E>> {
    let order = order.resolve(E::DEFAULT_ORDER_KEY);
    let rows = ctx
        .storage
        .query_slice(E::TAG, filters, scope, &order, Some(limit), offset)
        .await?;
    rows.iter().map(E::from_row).collect()
}

/// Unbounded listing for callers that do not paginate (legacy path). An
/// optional cap keeps runaway result sets in check.
pub async fn load_all<E: Entity>(
    ctx: &GatewayContext,
    filters: &FilterSet,
    scope: &ScopeFilter,
    cap: Option<u64>,
) -> Result<Vec<E>> {
    let order = PageOrder::default().resolve(E::DEFAULT_ORDER_KEY);
    let rows = ctx
        .storage
        .query_slice(E::TAG, filters, scope, &order, cap, 0)
        .await?;
    rows.iter().map(E::from_row).collect()
}

/// Paired (items, total_count) response for list queries.
///
/// `total_count` is computed over filter+scope only, never over the slice.
#[derive(SimpleObject, Debug, Clone)]
#[graphql(rename_fields = "snake_case")]
#[graphql(concrete(name = "AgentList", params(Agent)))]
#[graphql(concrete(name = "GroupList", params(Group)))]
#[graphql(concrete(name = "UserList", params(User)))]
#[graphql(concrete(name = "KeyPairList", params(KeyPair)))]
#[graphql(concrete(name = "ComputeSessionList", params(ComputeSession)))]
#[graphql(concrete(name = "ComputeContainerList", params(ComputeContainer)))]
#[graphql(concrete(name = "VirtualFolderList", params(VirtualFolder)))]
pub struct PaginatedList<T: OutputType> {
    pub items: Vec<T>,
    pub total_count: u64,
}

impl<T: OutputType> PaginatedList<T> {
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self { items, total_count }
    }
}
