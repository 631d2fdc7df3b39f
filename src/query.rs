//! Read resolvers for the gateway schema.
//!
//! Every resolver runs behind zero or more guards: superadmin-only fields
//! use [`PrivilegedQuery`] as a field guard, identity-scoped fields apply
//! [`ScopedQuery`] as their first statement, and the group/user listings
//! carry their role-matching logic inline because the narrowing differs per
//! role rather than per argument.

use async_graphql::{Context, Object};
use uuid::Uuid;

use crate::auth::{GatewayContext, UserRole};
use crate::error::{GatewayError, GqlResult as Result};
use crate::guard::{PrivilegedQuery, ScopedQuery};
use crate::models::{
    Agent, ComputeContainer, ComputeSession, Domain, Entity, Group, Image, KeyPair, ScalingGroup,
    User, VirtualFolder,
};
use crate::pagination::{PageOrder, PaginatedList};
use crate::scope::IdentityKey;

/// Root query object.
pub struct Queries;

/// Narrows the `domain_name` argument for role-matched listings: admins are
/// pinned to their own domain, superadmins pass through.
fn narrow_admin_domain(
    gctx: &GatewayContext,
    domain_name: Option<String>,
) -> Result<Option<String>> {
    match gctx.identity.role {
        UserRole::Superadmin => Ok(domain_name),
        UserRole::Admin => match domain_name {
            Some(given) if given != gctx.identity.domain_name => {
                Err(GatewayError::InsufficientPrivilege.into())
            }
            _ => Ok(Some(gctx.identity.domain_name.clone())),
        },
        UserRole::User => Err(GatewayError::InsufficientPrivilege.into()),
        UserRole::Monitor => Err(GatewayError::InvalidApiParameters(
            "unknown client role".into(),
        )
        .into()),
    }
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid> {
    value
        .parse::<Uuid>()
        .map_err(|e| GatewayError::InvalidApiParameters(format!("malformed {field}: {e}")).into())
}

#[Object(rename_fields = "snake_case", rename_args = "snake_case")]
impl Queries {
    #[graphql(guard = "PrivilegedQuery::at_least(UserRole::Superadmin)")]
    async fn agent(&self, ctx: &Context<'_>, agent_id: String) -> Result<Agent> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        Ok(Agent::by_id(gctx, None).load(agent_id).await?)
    }

    #[graphql(guard = "PrivilegedQuery::at_least(UserRole::Superadmin)")]
    async fn agents(
        &self,
        ctx: &Context<'_>,
        scaling_group: Option<String>,
        status: Option<String>,
    ) -> Result<Vec<Agent>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        Ok(Agent::load_all(gctx, scaling_group, status).await?)
    }

    #[graphql(guard = "PrivilegedQuery::at_least(UserRole::Superadmin)")]
    #[allow(clippy::too_many_arguments)]
    async fn agent_list(
        &self,
        ctx: &Context<'_>,
        limit: u64,
        offset: u64,
        scaling_group: Option<String>,
        status: Option<String>,
        order_key: Option<String>,
        order_asc: Option<bool>,
    ) -> Result<PaginatedList<Agent>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let total_count =
            Agent::load_count(gctx, scaling_group.clone(), status.clone()).await?;
        let order = PageOrder::new(order_key, order_asc);
        let items =
            Agent::load_slice(gctx, limit, offset, scaling_group, status, &order).await?;
        Ok(PaginatedList::new(items, total_count))
    }

    /// Non-superadmins asking about another domain get a not-found, not a
    /// privilege error, so domain existence does not leak.
    async fn domain(&self, ctx: &Context<'_>, name: Option<String>) -> Result<Domain> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let name = name.unwrap_or_else(|| gctx.identity.domain_name.clone());
        if gctx.identity.role != UserRole::Superadmin && name != gctx.identity.domain_name {
            return Err(GatewayError::GenericNotFound("no such domain".into()).into());
        }
        Ok(Domain::by_name(gctx).load(name).await?)
    }

    #[graphql(guard = "PrivilegedQuery::at_least(UserRole::Superadmin)")]
    async fn domains(&self, ctx: &Context<'_>, is_active: Option<bool>) -> Result<Vec<Domain>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        Ok(Domain::load_all(gctx, is_active).await?)
    }

    async fn group(&self, ctx: &Context<'_>, id: Uuid) -> Result<Group> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let group = Group::by_id(gctx).load(id.to_string()).await?;
        match gctx.identity.role {
            UserRole::Superadmin => {}
            UserRole::Admin => {
                if group.domain_name != gctx.identity.domain_name {
                    return Err(GatewayError::InsufficientPrivilege.into());
                }
            }
            UserRole::User => {
                let member_of =
                    Group::get_groups_for_user(gctx, gctx.identity.user_id).await?;
                if !member_of.iter().any(|g| g.id == group.id) {
                    return Err(GatewayError::InsufficientPrivilege.into());
                }
            }
            UserRole::Monitor => {
                return Err(GatewayError::InvalidApiParameters(
                    "unknown client role".into(),
                )
                .into());
            }
        }
        Ok(group)
    }

    async fn groups(
        &self,
        ctx: &Context<'_>,
        domain_name: Option<String>,
        is_active: Option<bool>,
    ) -> Result<Vec<Group>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let domain_name = match gctx.identity.role {
            UserRole::Superadmin => domain_name,
            UserRole::Admin => match domain_name {
                Some(given) if given != gctx.identity.domain_name => {
                    return Err(GatewayError::InsufficientPrivilege.into());
                }
                _ => Some(gctx.identity.domain_name.clone()),
            },
            UserRole::User => {
                return Ok(Group::get_groups_for_user(gctx, gctx.identity.user_id).await?);
            }
            UserRole::Monitor => {
                return Err(GatewayError::InvalidApiParameters(
                    "unknown client role".into(),
                )
                .into());
            }
        };
        Ok(Group::load_all(gctx, domain_name, is_active).await?)
    }

    /// A reference outside the caller's allowed registries is reported as
    /// not-found, never as a privilege error.
    async fn image(&self, ctx: &Context<'_>, reference: String) -> Result<Image> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let item = Image::load_item(gctx, reference).await?;
        match gctx.identity.role {
            UserRole::Superadmin => Ok(item),
            UserRole::Admin | UserRole::User => {
                let domain = gctx.identity.domain_name.clone();
                let mut allowed = Image::filter_allowed(gctx, vec![item], domain).await?;
                allowed.pop().ok_or_else(|| Image::not_found().into())
            }
            UserRole::Monitor => Err(GatewayError::InvalidApiParameters(
                "unknown client role".into(),
            )
            .into()),
        }
    }

    async fn images(
        &self,
        ctx: &Context<'_>,
        is_installed: Option<bool>,
        #[graphql(default = false)] is_operation: bool,
    ) -> Result<Vec<Image>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let items = Image::load_all(gctx, is_installed, Some(is_operation)).await?;
        match gctx.identity.role {
            UserRole::Superadmin => Ok(items),
            UserRole::Admin | UserRole::User => {
                let domain = gctx.identity.domain_name.clone();
                Ok(Image::filter_allowed(gctx, items, domain).await?)
            }
            UserRole::Monitor => Err(GatewayError::InvalidApiParameters(
                "unknown client role".into(),
            )
            .into()),
        }
    }

    async fn user(
        &self,
        ctx: &Context<'_>,
        domain_name: Option<String>,
        email: Option<String>,
    ) -> Result<User> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let (domain_name, email) =
            ScopedQuery::autofill(IdentityKey::Email).apply(&gctx.identity, domain_name, email)?;
        let email = email
            .ok_or_else(|| GatewayError::InvalidApiParameters("email is required".into()))?;
        Ok(User::by_email(gctx, domain_name).load(email).await?)
    }

    async fn user_from_uuid(
        &self,
        ctx: &Context<'_>,
        domain_name: Option<String>,
        user_id: Option<String>,
    ) -> Result<User> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let (domain_name, user_id) = ScopedQuery::autofill(IdentityKey::UserId)
            .apply(&gctx.identity, domain_name, user_id)?;
        let user_id = user_id
            .ok_or_else(|| GatewayError::InvalidApiParameters("user_id is required".into()))?;
        let user_uuid = parse_uuid("user_id", &user_id)?;
        Ok(User::by_uuid(gctx, domain_name)
            .load(user_uuid.to_string())
            .await?)
    }

    async fn users(
        &self,
        ctx: &Context<'_>,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        is_active: Option<bool>,
        status: Option<String>,
    ) -> Result<Vec<User>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let domain_name = narrow_admin_domain(gctx, domain_name)?;
        Ok(User::load_all(gctx, domain_name, group_id, is_active, status, Some(100)).await?)
    }

    #[allow(clippy::too_many_arguments)]
    async fn user_list(
        &self,
        ctx: &Context<'_>,
        limit: u64,
        offset: u64,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        is_active: Option<bool>,
        status: Option<String>,
        order_key: Option<String>,
        order_asc: Option<bool>,
    ) -> Result<PaginatedList<User>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let domain_name = narrow_admin_domain(gctx, domain_name)?;
        let total_count = User::load_count(
            gctx,
            domain_name.clone(),
            group_id,
            is_active,
            status.clone(),
        )
        .await?;
        let order = PageOrder::new(order_key, order_asc);
        let items = User::load_slice(
            gctx, limit, offset, domain_name, group_id, is_active, status, &order,
        )
        .await?;
        Ok(PaginatedList::new(items, total_count))
    }

    async fn keypair(
        &self,
        ctx: &Context<'_>,
        domain_name: Option<String>,
        access_key: Option<String>,
    ) -> Result<KeyPair> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let (domain_name, access_key) = ScopedQuery::autofill(IdentityKey::AccessKey)
            .apply(&gctx.identity, domain_name, access_key)?;
        let access_key = access_key
            .ok_or_else(|| GatewayError::InvalidApiParameters("access_key is required".into()))?;
        Ok(KeyPair::by_access_key(gctx, domain_name)
            .load(access_key)
            .await?)
    }

    async fn keypairs(
        &self,
        ctx: &Context<'_>,
        domain_name: Option<String>,
        email: Option<String>,
        is_active: Option<bool>,
    ) -> Result<Vec<KeyPair>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let (domain_name, email) =
            ScopedQuery::strict(IdentityKey::Email).apply(&gctx.identity, domain_name, email)?;
        match email {
            None => Ok(KeyPair::load_all(gctx, domain_name, is_active, Some(100)).await?),
            Some(email) => {
                Ok(KeyPair::by_email(gctx, domain_name, is_active)
                    .load(email)
                    .await?)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn keypair_list(
        &self,
        ctx: &Context<'_>,
        limit: u64,
        offset: u64,
        domain_name: Option<String>,
        email: Option<String>,
        is_active: Option<bool>,
        order_key: Option<String>,
        order_asc: Option<bool>,
    ) -> Result<PaginatedList<KeyPair>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let (domain_name, email) =
            ScopedQuery::strict(IdentityKey::Email).apply(&gctx.identity, domain_name, email)?;
        let total_count = KeyPair::load_count(
            gctx,
            domain_name.clone(),
            email.clone(),
            is_active,
        )
        .await?;
        let order = PageOrder::new(order_key, order_asc);
        let items = KeyPair::load_slice(
            gctx, limit, offset, domain_name, email, is_active, &order,
        )
        .await?;
        Ok(PaginatedList::new(items, total_count))
    }

    #[graphql(guard = "PrivilegedQuery::at_least(UserRole::Superadmin)")]
    async fn scaling_group(&self, ctx: &Context<'_>, name: String) -> Result<ScalingGroup> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        Ok(ScalingGroup::by_name(gctx).load(name).await?)
    }

    #[graphql(guard = "PrivilegedQuery::at_least(UserRole::Superadmin)")]
    async fn scaling_groups(
        &self,
        ctx: &Context<'_>,
        is_active: Option<bool>,
    ) -> Result<Vec<ScalingGroup>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        Ok(ScalingGroup::load_all(gctx, is_active).await?)
    }

    #[graphql(guard = "PrivilegedQuery::at_least(UserRole::Superadmin)")]
    async fn scaling_groups_for_domain(
        &self,
        ctx: &Context<'_>,
        domain: String,
        is_active: Option<bool>,
    ) -> Result<Vec<ScalingGroup>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        Ok(ScalingGroup::load_by_domain(gctx, domain, is_active).await?)
    }

    #[graphql(guard = "PrivilegedQuery::at_least(UserRole::Superadmin)")]
    async fn scaling_groups_for_user_group(
        &self,
        ctx: &Context<'_>,
        user_group: Uuid,
        is_active: Option<bool>,
    ) -> Result<Vec<ScalingGroup>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        Ok(ScalingGroup::load_by_group(gctx, user_group, is_active).await?)
    }

    #[graphql(guard = "PrivilegedQuery::at_least(UserRole::Superadmin)")]
    async fn scaling_groups_for_keypair(
        &self,
        ctx: &Context<'_>,
        access_key: String,
        is_active: Option<bool>,
    ) -> Result<Vec<ScalingGroup>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        Ok(ScalingGroup::load_by_keypair(gctx, access_key, is_active).await?)
    }

    #[allow(clippy::too_many_arguments)]
    async fn vfolder_list(
        &self,
        ctx: &Context<'_>,
        limit: u64,
        offset: u64,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        user_id: Option<String>,
        order_key: Option<String>,
        order_asc: Option<bool>,
    ) -> Result<PaginatedList<VirtualFolder>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let (domain_name, user_id) =
            ScopedQuery::strict(IdentityKey::UserId).apply(&gctx.identity, domain_name, user_id)?;
        let user_id = match user_id {
            Some(raw) => Some(parse_uuid("user_id", &raw)?),
            None => None,
        };
        let total_count =
            VirtualFolder::load_count(gctx, domain_name.clone(), group_id, user_id).await?;
        let order = PageOrder::new(order_key, order_asc);
        let items = VirtualFolder::load_slice(
            gctx, limit, offset, domain_name, group_id, user_id, &order,
        )
        .await?;
        Ok(PaginatedList::new(items, total_count))
    }

    async fn vfolders(
        &self,
        ctx: &Context<'_>,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        access_key: Option<String>,
    ) -> Result<Vec<VirtualFolder>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let (domain_name, access_key) = ScopedQuery::strict(IdentityKey::AccessKey)
            .apply(&gctx.identity, domain_name, access_key)?;
        Ok(VirtualFolder::load_all(gctx, domain_name, group_id, access_key).await?)
    }

    async fn compute_session(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        domain_name: Option<String>,
        access_key: Option<String>,
    ) -> Result<ComputeSession> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let (domain_name, access_key) = ScopedQuery::strict(IdentityKey::AccessKey)
            .apply(&gctx.identity, domain_name, access_key)?;
        Ok(ComputeSession::detail(gctx, domain_name, access_key)
            .load(id.to_string())
            .await?)
    }

    /// Group membership of the addressed container is not re-checked here;
    /// the domain/user boundary is what this resolver protects.
    async fn compute_container(
        &self,
        ctx: &Context<'_>,
        container_id: Uuid,
        domain_name: Option<String>,
        access_key: Option<String>,
    ) -> Result<ComputeContainer> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let (domain_name, access_key) = ScopedQuery::strict(IdentityKey::AccessKey)
            .apply(&gctx.identity, domain_name, access_key)?;
        Ok(ComputeContainer::detail(gctx, domain_name, access_key)
            .load(container_id.to_string())
            .await?)
    }

    #[allow(clippy::too_many_arguments)]
    async fn compute_session_list(
        &self,
        ctx: &Context<'_>,
        limit: u64,
        offset: u64,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        access_key: Option<String>,
        status: Option<String>,
        order_key: Option<String>,
        order_asc: Option<bool>,
    ) -> Result<PaginatedList<ComputeSession>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let (domain_name, access_key) = ScopedQuery::strict(IdentityKey::AccessKey)
            .apply(&gctx.identity, domain_name, access_key)?;
        let total_count = ComputeSession::load_count(
            gctx,
            domain_name.clone(),
            group_id,
            access_key.clone(),
            status.clone(),
        )
        .await?;
        let order = PageOrder::new(order_key, order_asc);
        let items = ComputeSession::load_slice(
            gctx, limit, offset, domain_name, group_id, access_key, status, &order,
        )
        .await?;
        Ok(PaginatedList::new(items, total_count))
    }

    #[allow(clippy::too_many_arguments)]
    async fn compute_container_list(
        &self,
        ctx: &Context<'_>,
        limit: u64,
        offset: u64,
        session_id: Option<Uuid>,
        role: Option<String>,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        access_key: Option<String>,
        order_key: Option<String>,
        order_asc: Option<bool>,
    ) -> Result<PaginatedList<ComputeContainer>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        // Mandatory filter, validated before any scope is applied.
        let session_id = session_id
            .ok_or_else(|| GatewayError::InvalidApiParameters("session_id is required".into()))?;
        let (domain_name, access_key) = ScopedQuery::strict(IdentityKey::AccessKey)
            .apply(&gctx.identity, domain_name, access_key)?;
        let total_count = ComputeContainer::load_count(
            gctx,
            session_id,
            domain_name.clone(),
            group_id,
            access_key.clone(),
            role.clone(),
        )
        .await?;
        let order = PageOrder::new(order_key, order_asc);
        let items = ComputeContainer::load_slice(
            gctx, limit, offset, session_id, domain_name, group_id, access_key, role, &order,
        )
        .await?;
        Ok(PaginatedList::new(items, total_count))
    }

    #[allow(clippy::too_many_arguments)]
    async fn legacy_compute_session_list(
        &self,
        ctx: &Context<'_>,
        limit: u64,
        offset: u64,
        domain_name: Option<String>,
        group_id: Option<Uuid>,
        access_key: Option<String>,
        status: Option<String>,
        order_key: Option<String>,
        order_asc: Option<bool>,
    ) -> Result<PaginatedList<ComputeSession>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let (domain_name, access_key) = ScopedQuery::strict(IdentityKey::AccessKey)
            .apply(&gctx.identity, domain_name, access_key)?;
        let total_count = ComputeSession::load_count(
            gctx,
            domain_name.clone(),
            group_id,
            access_key.clone(),
            status.clone(),
        )
        .await?;
        let order = PageOrder::new(order_key, order_asc);
        let items = ComputeSession::load_slice(
            gctx, limit, offset, domain_name, group_id, access_key, status, &order,
        )
        .await?;
        Ok(PaginatedList::new(items, total_count))
    }

    /// Session names are unique only among live sessions, so a name lookup
    /// may legitimately match zero, one, or (on integrity violation) many
    /// rows.
    async fn legacy_compute_session(
        &self,
        ctx: &Context<'_>,
        sess_id: String,
        domain_name: Option<String>,
        access_key: Option<String>,
        status: Option<String>,
    ) -> Result<Option<ComputeSession>> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let (domain_name, access_key) = ScopedQuery::strict(IdentityKey::AccessKey)
            .apply(&gctx.identity, domain_name, access_key)?;
        let mut matches = ComputeSession::by_name(gctx, domain_name, access_key, status)
            .load(sess_id)
            .await?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(GatewayError::TooManyMatches { object: "compute session" }.into()),
        }
    }
}
