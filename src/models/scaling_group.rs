use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{from_row_via_serde, Entity};
use crate::auth::GatewayContext;
use crate::error::Result;
use crate::loader::{EntitySource, Loader};
use crate::pagination;
use crate::scope::ScopeFilter;
use crate::storage::{FilterSet, Row};

/// A named pool of agents plus the scheduler configured for it. Visibility
/// for non-superadmins flows through association tables with domains,
/// groups, and keypairs.
#[derive(async_graphql::SimpleObject, Clone, Debug, Serialize, Deserialize)]
#[graphql(rename_fields = "snake_case")]
pub struct ScalingGroup {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub driver: String,
    pub scheduler: String,
    pub wsproxy_addr: Option<String>,
}

impl Entity for ScalingGroup {
    const TAG: &'static str = "scaling_group";
    const DEFAULT_ORDER_KEY: &'static str = "name";

    fn from_row(row: &Row) -> Result<Self> {
        from_row_via_serde(Self::TAG, row)
    }
}

impl ScalingGroup {
    pub fn by_name(ctx: &GatewayContext) -> Loader<EntitySource<ScalingGroup>> {
        ctx.loaders.get_loader(EntitySource::new(
            ctx.storage.clone(),
            "scaling_group.by_name",
            ScopeFilter::new(),
        ))
    }

    pub async fn load_all(
        ctx: &GatewayContext,
        is_active: Option<bool>,
    ) -> Result<Vec<ScalingGroup>> {
        pagination::load_all(
            ctx,
            &FilterSet::new().maybe("is_active", is_active),
            &ScopeFilter::new(),
            None,
        )
        .await
    }

    pub async fn load_by_domain(
        ctx: &GatewayContext,
        domain_name: String,
        is_active: Option<bool>,
    ) -> Result<Vec<ScalingGroup>> {
        pagination::load_all(
            ctx,
            &FilterSet::new()
                .eq("domain", domain_name)
                .maybe("is_active", is_active),
            &ScopeFilter::new(),
            None,
        )
        .await
    }

    pub async fn load_by_group(
        ctx: &GatewayContext,
        group_id: Uuid,
        is_active: Option<bool>,
    ) -> Result<Vec<ScalingGroup>> {
        pagination::load_all(
            ctx,
            &FilterSet::new()
                .eq("group", group_id.to_string())
                .maybe("is_active", is_active),
            &ScopeFilter::new(),
            None,
        )
        .await
    }

    pub async fn load_by_keypair(
        ctx: &GatewayContext,
        access_key: String,
        is_active: Option<bool>,
    ) -> Result<Vec<ScalingGroup>> {
        pagination::load_all(
            ctx,
            &FilterSet::new()
                .eq("access_key", access_key)
                .maybe("is_active", is_active),
            &ScopeFilter::new(),
            None,
        )
        .await
    }
}
