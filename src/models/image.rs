use serde::{Deserialize, Serialize};

use super::{from_row_via_serde, Domain, Entity};
use crate::auth::GatewayContext;
use crate::error::Result;
use crate::loader::{EntitySource, Loader};
use crate::pagination;
use crate::scope::ScopeFilter;
use crate::storage::{FilterSet, Row};

/// A container image known to the registry catalog. Image metadata is
/// global; per-domain visibility is applied after loading, by intersecting
/// the image's registry with the domain's allowed registries.
#[derive(async_graphql::SimpleObject, Clone, Debug, Serialize, Deserialize)]
#[graphql(rename_fields = "snake_case")]
pub struct Image {
    pub name: String,
    pub registry: String,
    pub tag: String,
    pub digest: String,
    pub architecture: String,
    pub size_bytes: u64,
    pub is_installed: bool,
    /// Operation images back internal plumbing and are hidden from
    /// non-admin listings unless explicitly requested.
    pub is_operation: bool,
}

impl Entity for Image {
    const TAG: &'static str = "image";
    const DEFAULT_ORDER_KEY: &'static str = "name";

    fn from_row(row: &Row) -> Result<Self> {
        from_row_via_serde(Self::TAG, row)
    }
}

impl Image {
    pub fn by_reference(ctx: &GatewayContext) -> Loader<EntitySource<Image>> {
        ctx.loaders.get_loader(EntitySource::new(
            ctx.storage.clone(),
            "image.by_reference",
            ScopeFilter::new(),
        ))
    }

    pub async fn load_item(ctx: &GatewayContext, reference: String) -> Result<Image> {
        Self::by_reference(ctx).load(reference).await
    }

    pub async fn load_all(
        ctx: &GatewayContext,
        is_installed: Option<bool>,
        is_operation: Option<bool>,
    ) -> Result<Vec<Image>> {
        pagination::load_all(
            ctx,
            &FilterSet::new()
                .maybe("is_installed", is_installed)
                .maybe("is_operation", is_operation),
            &ScopeFilter::new(),
            None,
        )
        .await
    }

    /// Drops images whose registry the domain has not allowed. An unknown
    /// domain fails the whole query rather than silently hiding everything.
    pub async fn filter_allowed(
        ctx: &GatewayContext,
        items: Vec<Image>,
        domain_name: String,
    ) -> Result<Vec<Image>> {
        let domain = Domain::by_name(ctx).load(domain_name).await?;
        Ok(items
            .into_iter()
            .filter(|image| domain.allowed_docker_registries.contains(&image.registry))
            .collect())
    }
}
