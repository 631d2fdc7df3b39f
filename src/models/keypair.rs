use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{from_row_via_serde, Entity};
use crate::auth::GatewayContext;
use crate::error::Result;
use crate::loader::{EntitySource, ListSource, Loader};
use crate::pagination::{self, PageOrder};
use crate::scope::ScopeFilter;
use crate::storage::{FilterSet, Row};

/// API credential pair. `user_id` carries the owner's email for historical
/// reasons; `user` is the owning account's uuid.
#[derive(async_graphql::SimpleObject, Clone, Debug, Serialize, Deserialize)]
#[graphql(rename_fields = "snake_case")]
pub struct KeyPair {
    pub user_id: String,
    pub access_key: String,
    pub secret_key: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub rate_limit: u64,
    pub num_queries: u64,
    pub user: Uuid,
}

impl Entity for KeyPair {
    const TAG: &'static str = "keypair";
    const DEFAULT_ORDER_KEY: &'static str = "created_at";

    fn from_row(row: &Row) -> Result<Self> {
        from_row_via_serde(Self::TAG, row)
    }
}

impl KeyPair {
    pub fn by_access_key(
        ctx: &GatewayContext,
        domain_name: Option<String>,
    ) -> Loader<EntitySource<KeyPair>> {
        ctx.loaders.get_loader(EntitySource::new(
            ctx.storage.clone(),
            "keypair.by_access_key",
            ScopeFilter::new().with_domain(domain_name),
        ))
    }

    /// Loader keyed by owner email; an account can hold several keypairs.
    pub fn by_email(
        ctx: &GatewayContext,
        domain_name: Option<String>,
        is_active: Option<bool>,
    ) -> Loader<ListSource<KeyPair>> {
        ctx.loaders.get_loader(
            ListSource::new(
                ctx.storage.clone(),
                "keypair.by_email",
                ScopeFilter::new().with_domain(domain_name),
            )
            .filter("is_active", is_active),
        )
    }

    fn filters(email: Option<String>, is_active: Option<bool>) -> FilterSet {
        FilterSet::new()
            .maybe("user_id", email)
            .maybe("is_active", is_active)
    }

    pub async fn load_count(
        ctx: &GatewayContext,
        domain_name: Option<String>,
        email: Option<String>,
        is_active: Option<bool>,
    ) -> Result<u64> {
        pagination::load_count::<KeyPair>(
            ctx,
            &Self::filters(email, is_active),
            &ScopeFilter::new().with_domain(domain_name),
        )
        .await
    }

    pub async fn load_slice(
        ctx: &GatewayContext,
        limit: u64,
        offset: u64,
        domain_name: Option<String>,
        email: Option<String>,
        is_active: Option<bool>,
        order: &PageOrder,
    ) -> Result<Vec<KeyPair>> {
        pagination::load_slice(
            ctx,
            limit,
            offset,
            &Self::filters(email, is_active),
            &ScopeFilter::new().with_domain(domain_name),
            order,
        )
        .await
    }

    pub async fn load_all(
        ctx: &GatewayContext,
        domain_name: Option<String>,
        is_active: Option<bool>,
        cap: Option<u64>,
    ) -> Result<Vec<KeyPair>> {
        pagination::load_all(
            ctx,
            &Self::filters(None, is_active),
            &ScopeFilter::new().with_domain(domain_name),
            cap,
        )
        .await
    }
}
