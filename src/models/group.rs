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

/// A project-style group inside one domain. Users become members through an
/// association table owned by the storage layer.
#[derive(async_graphql::SimpleObject, Clone, Debug, Serialize, Deserialize)]
#[graphql(rename_fields = "snake_case")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub domain_name: String,
    pub integration_id: Option<String>,
}

impl Entity for Group {
    const TAG: &'static str = "group";
    const DEFAULT_ORDER_KEY: &'static str = "created_at";

    fn from_row(row: &Row) -> Result<Self> {
        from_row_via_serde(Self::TAG, row)
    }
}

impl Group {
    pub fn by_id(ctx: &GatewayContext) -> Loader<EntitySource<Group>> {
        ctx.loaders.get_loader(EntitySource::new(
            ctx.storage.clone(),
            "group.by_id",
            ScopeFilter::new(),
        ))
    }

    pub async fn load_all(
        ctx: &GatewayContext,
        domain_name: Option<String>,
        is_active: Option<bool>,
    ) -> Result<Vec<Group>> {
        pagination::load_all(
            ctx,
            &FilterSet::new().maybe("is_active", is_active),
            &ScopeFilter::new().with_domain(domain_name),
            None,
        )
        .await
    }

    /// Groups the given user is a member of, resolved through the
    /// membership association.
    pub async fn get_groups_for_user(ctx: &GatewayContext, user_id: Uuid) -> Result<Vec<Group>> {
        pagination::load_all(
            ctx,
            &FilterSet::new().eq("member_user_id", user_id.to_string()),
            &ScopeFilter::new(),
            None,
        )
        .await
    }
}
