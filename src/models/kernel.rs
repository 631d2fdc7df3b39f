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

/// A compute session: the unit of workload scheduling. Identified by uuid;
/// clients also address sessions by (name, access key), which is unique only
/// among live sessions.
#[derive(async_graphql::SimpleObject, Clone, Debug, Serialize, Deserialize)]
#[graphql(rename_fields = "snake_case")]
pub struct ComputeSession {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub domain_name: String,
    pub group_id: Uuid,
    pub access_key: String,
    pub status: String,
    pub status_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub terminated_at: Option<DateTime<Utc>>,
}

impl Entity for ComputeSession {
    const TAG: &'static str = "compute_session";
    const DEFAULT_ORDER_KEY: &'static str = "created_at";

    fn from_row(row: &Row) -> Result<Self> {
        from_row_via_serde(Self::TAG, row)
    }
}

impl ComputeSession {
    pub fn detail(
        ctx: &GatewayContext,
        domain_name: Option<String>,
        access_key: Option<String>,
    ) -> Loader<EntitySource<ComputeSession>> {
        let mut scope = ScopeFilter::new().with_domain(domain_name);
        scope = scope.with_access_key(access_key);
        ctx.loaders.get_loader(EntitySource::new(
            ctx.storage.clone(),
            "compute_session.detail",
            scope,
        ))
    }

    /// Loader keyed by session name. Names are reused across restarts, so
    /// each key may match zero, one, or many sessions.
    pub fn by_name(
        ctx: &GatewayContext,
        domain_name: Option<String>,
        access_key: Option<String>,
        status: Option<String>,
    ) -> Loader<ListSource<ComputeSession>> {
        let mut scope = ScopeFilter::new().with_domain(domain_name);
        scope = scope.with_access_key(access_key);
        ctx.loaders.get_loader(
            ListSource::new(ctx.storage.clone(), "compute_session.by_name", scope)
                .filter("status", status),
        )
    }

    fn scope(
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        access_key: Option<String>,
    ) -> ScopeFilter {
        ScopeFilter::new()
            .with_domain(domain_name)
            .with_group(group_id)
            .with_access_key(access_key)
    }

    pub async fn load_count(
        ctx: &GatewayContext,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        access_key: Option<String>,
        status: Option<String>,
    ) -> Result<u64> {
        pagination::load_count::<ComputeSession>(
            ctx,
            &FilterSet::new().maybe("status", status),
            &Self::scope(domain_name, group_id, access_key),
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
        access_key: Option<String>,
        status: Option<String>,
        order: &PageOrder,
    ) -> Result<Vec<ComputeSession>> {
        pagination::load_slice(
            ctx,
            limit,
            offset,
            &FilterSet::new().maybe("status", status),
            &Self::scope(domain_name, group_id, access_key),
            order,
        )
        .await
    }
}

/// One container participating in a session. A single-node session has one
/// container with the `main` role; cluster sessions have several.
#[derive(async_graphql::SimpleObject, Clone, Debug, Serialize, Deserialize)]
#[graphql(rename_fields = "snake_case")]
pub struct ComputeContainer {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: String,
    pub agent: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for ComputeContainer {
    const TAG: &'static str = "compute_container";
    const DEFAULT_ORDER_KEY: &'static str = "created_at";

    fn from_row(row: &Row) -> Result<Self> {
        from_row_via_serde(Self::TAG, row)
    }
}

impl ComputeContainer {
    pub fn detail(
        ctx: &GatewayContext,
        domain_name: Option<String>,
        access_key: Option<String>,
    ) -> Loader<EntitySource<ComputeContainer>> {
        let scope = ScopeFilter::new().with_domain(domain_name);
        ctx.loaders.get_loader(EntitySource::new(
            ctx.storage.clone(),
            "compute_container.detail",
            scope.with_access_key(access_key),
        ))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn load_count(
        ctx: &GatewayContext,
        session_id: Uuid,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        access_key: Option<String>,
        role: Option<String>,
    ) -> Result<u64> {
        pagination::load_count::<ComputeContainer>(
            ctx,
            &FilterSet::new()
                .eq("session_id", session_id.to_string())
                .maybe("role", role),
            &ComputeSession::scope(domain_name, group_id, access_key),
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn load_slice(
        ctx: &GatewayContext,
        limit: u64,
        offset: u64,
        session_id: Uuid,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        access_key: Option<String>,
        role: Option<String>,
        order: &PageOrder,
    ) -> Result<Vec<ComputeContainer>> {
        pagination::load_slice(
            ctx,
            limit,
            offset,
            &FilterSet::new()
                .eq("session_id", session_id.to_string())
                .maybe("role", role),
            &ComputeSession::scope(domain_name, group_id, access_key),
            order,
        )
        .await
    }
}
