use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{from_row_via_serde, Entity};
use crate::auth::GatewayContext;
use crate::error::Result;
use crate::loader::{EntitySource, Loader};
use crate::pagination;
use crate::scope::ScopeFilter;
use crate::storage::{FilterSet, Row};

/// Top-level tenancy boundary. Every group, user, and session belongs to
/// exactly one domain.
#[derive(async_graphql::SimpleObject, Clone, Debug, Serialize, Deserialize)]
#[graphql(rename_fields = "snake_case")]
pub struct Domain {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Container registries whose images this domain's members may use.
    pub allowed_docker_registries: Vec<String>,
    pub integration_id: Option<String>,
}

impl Entity for Domain {
    const TAG: &'static str = "domain";
    const DEFAULT_ORDER_KEY: &'static str = "name";

    fn from_row(row: &Row) -> Result<Self> {
        from_row_via_serde(Self::TAG, row)
    }
}

impl Domain {
    pub fn by_name(ctx: &GatewayContext) -> Loader<EntitySource<Domain>> {
        ctx.loaders.get_loader(EntitySource::new(
            ctx.storage.clone(),
            "domain.by_name",
            ScopeFilter::new(),
        ))
    }

    pub async fn load_all(ctx: &GatewayContext, is_active: Option<bool>) -> Result<Vec<Domain>> {
        pagination::load_all(
            ctx,
            &FilterSet::new().maybe("is_active", is_active),
            &ScopeFilter::new(),
            None,
        )
        .await
    }
}
