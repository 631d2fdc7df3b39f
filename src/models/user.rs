use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{from_row_via_serde, Entity};
use crate::auth::{GatewayContext, UserRole};
use crate::error::Result;
use crate::loader::{EntitySource, Loader};
use crate::pagination::{self, PageOrder};
use crate::scope::ScopeFilter;
use crate::storage::{FilterSet, Row};

#[derive(async_graphql::SimpleObject, Clone, Debug, Serialize, Deserialize)]
#[graphql(rename_fields = "snake_case")]
pub struct User {
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub domain_name: String,
    pub role: UserRole,
}

impl Entity for User {
    const TAG: &'static str = "user";
    const DEFAULT_ORDER_KEY: &'static str = "created_at";

    fn from_row(row: &Row) -> Result<Self> {
        from_row_via_serde(Self::TAG, row)
    }
}

impl User {
    pub fn by_email(
        ctx: &GatewayContext,
        domain_name: Option<String>,
    ) -> Loader<EntitySource<User>> {
        ctx.loaders.get_loader(EntitySource::new(
            ctx.storage.clone(),
            "user.by_email",
            ScopeFilter::new().with_domain(domain_name),
        ))
    }

    pub fn by_uuid(
        ctx: &GatewayContext,
        domain_name: Option<String>,
    ) -> Loader<EntitySource<User>> {
        ctx.loaders.get_loader(EntitySource::new(
            ctx.storage.clone(),
            "user.by_uuid",
            ScopeFilter::new().with_domain(domain_name),
        ))
    }

    fn filters(
        group_id: Option<Uuid>,
        is_active: Option<bool>,
        status: Option<String>,
    ) -> FilterSet {
        FilterSet::new()
            .maybe("member_group_id", group_id.map(|g| g.to_string()))
            .maybe("is_active", is_active)
            .maybe("status", status)
    }

    pub async fn load_count(
        ctx: &GatewayContext,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        is_active: Option<bool>,
        status: Option<String>,
    ) -> Result<u64> {
        pagination::load_count::<User>(
            ctx,
            &Self::filters(group_id, is_active, status),
            &ScopeFilter::new().with_domain(domain_name),
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn load_slice(
        ctx: &GatewayContext,
        limit: u64,
        offset: u64,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        is_active: Option<bool>,
        status: Option<String>,
        order: &PageOrder,
    ) -> Result<Vec<User>> {
        pagination::load_slice(
            ctx,
            limit,
            offset,
            &Self::filters(group_id, is_active, status),
            &ScopeFilter::new().with_domain(domain_name),
            order,
        )
        .await
    }

    pub async fn load_all(
        ctx: &GatewayContext,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        is_active: Option<bool>,
        status: Option<String>,
        cap: Option<u64>,
    ) -> Result<Vec<User>> {
        pagination::load_all(
            ctx,
            &Self::filters(group_id, is_active, status),
            &ScopeFilter::new().with_domain(domain_name),
            cap,
        )
        .await
    }
}
