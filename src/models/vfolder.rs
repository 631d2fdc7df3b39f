use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{from_row_via_serde, Entity};
use crate::auth::GatewayContext;
use crate::error::Result;
use crate::pagination::{self, PageOrder};
use crate::scope::ScopeFilter;
use crate::storage::{FilterSet, Row};

/// A virtual folder mounted into sessions. Owned by either a user or a
/// group, never both.
#[derive(async_graphql::SimpleObject, Clone, Debug, Serialize, Deserialize)]
#[graphql(rename_fields = "snake_case")]
pub struct VirtualFolder {
    pub id: Uuid,
    pub host: String,
    pub name: String,
    pub user: Option<Uuid>,
    pub group: Option<Uuid>,
    pub creator: Option<String>,
    pub unmanaged_path: Option<String>,
    pub max_size: u64,
    pub created_at: DateTime<Utc>,
}

impl Entity for VirtualFolder {
    const TAG: &'static str = "vfolder";
    const DEFAULT_ORDER_KEY: &'static str = "created_at";

    fn from_row(row: &Row) -> Result<Self> {
        from_row_via_serde(Self::TAG, row)
    }
}

impl VirtualFolder {
    fn scope(
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> ScopeFilter {
        ScopeFilter::new()
            .with_domain(domain_name)
            .with_group(group_id)
            .with_user(user_id)
    }

    pub async fn load_count(
        ctx: &GatewayContext,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<u64> {
        pagination::load_count::<VirtualFolder>(
            ctx,
            &FilterSet::new(),
            &Self::scope(domain_name, group_id, user_id),
        )
        .await
    }

    pub async fn load_slice(
        ctx: &GatewayContext,
        limit: u64,
        offset: u64,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        user_id: Option<Uuid>,
        order: &PageOrder,
    ) -> Result<Vec<VirtualFolder>> {
        pagination::load_slice(
            ctx,
            limit,
            offset,
            &FilterSet::new(),
            &Self::scope(domain_name, group_id, user_id),
            order,
        )
        .await
    }

    pub async fn load_all(
        ctx: &GatewayContext,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        access_key: Option<String>,
    ) -> Result<Vec<VirtualFolder>> {
        pagination::load_all(
            ctx,
            &FilterSet::new(),
            &Self::scope(domain_name, group_id, None).with_access_key(access_key),
            None,
        )
        .await
    }
}
