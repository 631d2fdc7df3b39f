use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{from_row_via_serde, Entity};
use crate::auth::GatewayContext;
use crate::error::Result;
use crate::loader::{EntitySource, Loader};
use crate::pagination::{self, PageOrder};
use crate::scope::ScopeFilter;
use crate::storage::{FilterSet, Row};

/// A worker node registered with the control plane. Visible to superadmins
/// only; there is no domain scope to narrow an agent query with.
#[derive(async_graphql::SimpleObject, Clone, Debug, Serialize, Deserialize)]
#[graphql(rename_fields = "snake_case")]
pub struct Agent {
    pub id: String,
    pub status: String,
    pub scaling_group: String,
    pub addr: String,
    pub region: String,
    pub schedulable: bool,
    pub first_contact: DateTime<Utc>,
    pub lost_at: Option<DateTime<Utc>>,
}

impl Entity for Agent {
    const TAG: &'static str = "agent";
    const DEFAULT_ORDER_KEY: &'static str = "id";

    fn from_row(row: &Row) -> Result<Self> {
        from_row_via_serde(Self::TAG, row)
    }
}

impl Agent {
    /// Loader for id lookups, optionally pinned to one status.
    pub fn by_id(
        ctx: &GatewayContext,
        status: Option<String>,
    ) -> Loader<EntitySource<Agent>> {
        ctx.loaders.get_loader(
            EntitySource::new(ctx.storage.clone(), "agent.by_id", ScopeFilter::new())
                .filter("status", status),
        )
    }

    fn filters(scaling_group: Option<String>, status: Option<String>) -> FilterSet {
        FilterSet::new()
            .maybe("scaling_group", scaling_group)
            .maybe("status", status)
    }

    pub async fn load_count(
        ctx: &GatewayContext,
        scaling_group: Option<String>,
        status: Option<String>,
    ) -> Result<u64> {
        pagination::load_count::<Agent>(
            ctx,
            &Self::filters(scaling_group, status),
            &ScopeFilter::new(),
        )
        .await
    }

    pub async fn load_slice(
        ctx: &GatewayContext,
        limit: u64,
        offset: u64,
        scaling_group: Option<String>,
        status: Option<String>,
        order: &PageOrder,
    ) -> Result<Vec<Agent>> {
        pagination::load_slice(
            ctx,
            limit,
            offset,
            &Self::filters(scaling_group, status),
            &ScopeFilter::new(),
            order,
        )
        .await
    }

    pub async fn load_all(
        ctx: &GatewayContext,
        scaling_group: Option<String>,
        status: Option<String>,
    ) -> Result<Vec<Agent>> {
        pagination::load_all(
            ctx,
            &Self::filters(scaling_group, status),
            &ScopeFilter::new(),
            None,
        )
        .await
    }
}
