//! Write resolvers and their privilege descriptors.
//!
//! Every mutation returns an `{ok, msg, ...}` payload: storage-level
//! failures are reported as data, never as transport errors, so the response
//! schema stays uniform for clients. Privilege is enforced in two layers:
//! the [`MUTATION_DESCRIPTORS`] registry consulted by the middleware before
//! the resolver runs (deny-by-default), and [`ensure_mutation_scope`] inside
//! admin-level resolvers to keep domain admins inside their own domain.

use async_graphql::{Context, InputObject, Object, SimpleObject};
use chrono::Utc;
use serde_json::{json, Map, Value as JsonValue};
use uuid::Uuid;

use crate::auth::{GatewayContext, UserRole};
use crate::error::GqlResult as Result;
use crate::guard::ensure_mutation_scope;
use crate::models::{Domain, Entity, Group, KeyPair, ScalingGroup, User};
use crate::storage::{MutationOp, MutationOutcome};

/// GraphQL type name of the mutation root, used by the privilege middleware
/// to recognize top-level mutation fields.
pub const MUTATION_ROOT: &str = "Mutations";

/// Which roles may invoke a mutation field. Fields without a descriptor are
/// denied for everyone.
pub struct MutationDescriptor {
    pub name: &'static str,
    pub allowed_roles: &'static [UserRole],
}

const SUPERADMIN_ONLY: &[UserRole] = &[UserRole::Superadmin];
const ADMIN_AND_UP: &[UserRole] = &[UserRole::Admin, UserRole::Superadmin];

pub const MUTATION_DESCRIPTORS: &[MutationDescriptor] = &[
    MutationDescriptor { name: "create_domain", allowed_roles: SUPERADMIN_ONLY },
    MutationDescriptor { name: "modify_domain", allowed_roles: SUPERADMIN_ONLY },
    MutationDescriptor { name: "delete_domain", allowed_roles: SUPERADMIN_ONLY },
    MutationDescriptor { name: "create_user", allowed_roles: SUPERADMIN_ONLY },
    MutationDescriptor { name: "modify_user", allowed_roles: SUPERADMIN_ONLY },
    MutationDescriptor { name: "delete_user", allowed_roles: SUPERADMIN_ONLY },
    MutationDescriptor { name: "create_group", allowed_roles: ADMIN_AND_UP },
    MutationDescriptor { name: "modify_group", allowed_roles: ADMIN_AND_UP },
    MutationDescriptor { name: "delete_group", allowed_roles: ADMIN_AND_UP },
    MutationDescriptor { name: "create_keypair", allowed_roles: ADMIN_AND_UP },
    MutationDescriptor { name: "modify_keypair", allowed_roles: ADMIN_AND_UP },
    MutationDescriptor { name: "delete_keypair", allowed_roles: ADMIN_AND_UP },
    MutationDescriptor { name: "create_scaling_group", allowed_roles: SUPERADMIN_ONLY },
    MutationDescriptor { name: "modify_scaling_group", allowed_roles: SUPERADMIN_ONLY },
    MutationDescriptor { name: "delete_scaling_group", allowed_roles: SUPERADMIN_ONLY },
    MutationDescriptor {
        name: "associate_scaling_group_with_domain",
        allowed_roles: SUPERADMIN_ONLY,
    },
    MutationDescriptor {
        name: "disassociate_scaling_group_with_domain",
        allowed_roles: SUPERADMIN_ONLY,
    },
];

/// Allow-set for a mutation field name; unknown fields get the empty set.
pub fn allowed_roles_for(field: &str) -> &'static [UserRole] {
    MUTATION_DESCRIPTORS
        .iter()
        .find(|d| d.name == field)
        .map(|d| d.allowed_roles)
        .unwrap_or(&[])
}

/// Payload for mutations without an entity result.
#[derive(SimpleObject, Debug)]
#[graphql(rename_fields = "snake_case")]
pub struct MutationResult {
    pub ok: bool,
    pub msg: String,
}

impl MutationResult {
    fn success() -> Self {
        Self { ok: true, msg: "success".into() }
    }

    fn failure(msg: impl Into<String>) -> Self {
        Self { ok: false, msg: msg.into() }
    }
}

macro_rules! entity_payload {
    ($name:ident, $field:ident, $entity:ty) => {
        #[derive(SimpleObject, Debug)]
        #[graphql(rename_fields = "snake_case")]
        pub struct $name {
            pub ok: bool,
            pub msg: String,
            pub $field: Option<$entity>,
        }

        impl $name {
            fn success($field: Option<$entity>) -> Self {
                Self { ok: true, msg: "success".into(), $field }
            }

            fn failure(msg: impl Into<String>) -> Self {
                Self { ok: false, msg: msg.into(), $field: None }
            }
        }
    };
}

entity_payload!(DomainMutationResult, domain, Domain);
entity_payload!(GroupMutationResult, group, Group);
entity_payload!(UserMutationResult, user, User);
entity_payload!(KeyPairMutationResult, keypair, KeyPair);
entity_payload!(ScalingGroupMutationResult, scaling_group, ScalingGroup);

#[derive(InputObject, Debug)]
#[graphql(rename_fields = "snake_case")]
pub struct DomainInput {
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub allowed_docker_registries: Option<Vec<String>>,
    pub integration_id: Option<String>,
}

#[derive(InputObject, Debug)]
#[graphql(rename_fields = "snake_case")]
pub struct ModifyDomainInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub allowed_docker_registries: Option<Vec<String>>,
    pub integration_id: Option<String>,
}

#[derive(InputObject, Debug)]
#[graphql(rename_fields = "snake_case")]
pub struct UserInput {
    pub username: String,
    pub password: String,
    pub domain_name: String,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub status: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(InputObject, Debug)]
#[graphql(rename_fields = "snake_case")]
pub struct ModifyUserInput {
    pub username: Option<String>,
    pub password: Option<String>,
    pub domain_name: Option<String>,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub status: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(InputObject, Debug)]
#[graphql(rename_fields = "snake_case")]
pub struct GroupInput {
    pub domain_name: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub integration_id: Option<String>,
}

#[derive(InputObject, Debug)]
#[graphql(rename_fields = "snake_case")]
pub struct ModifyGroupInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub domain_name: Option<String>,
    pub integration_id: Option<String>,
}

#[derive(InputObject, Debug)]
#[graphql(rename_fields = "snake_case")]
pub struct KeyPairInput {
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
    pub rate_limit: Option<u64>,
}

#[derive(InputObject, Debug)]
#[graphql(rename_fields = "snake_case")]
pub struct ModifyKeyPairInput {
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
    pub rate_limit: Option<u64>,
}

#[derive(InputObject, Debug)]
#[graphql(rename_fields = "snake_case")]
pub struct ScalingGroupInput {
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub driver: String,
    pub scheduler: String,
    pub wsproxy_addr: Option<String>,
}

#[derive(InputObject, Debug)]
#[graphql(rename_fields = "snake_case")]
pub struct ModifyScalingGroupInput {
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub driver: Option<String>,
    pub scheduler: Option<String>,
    pub wsproxy_addr: Option<String>,
}

fn put<V: serde::Serialize>(data: &mut Map<String, JsonValue>, field: &str, value: &Option<V>) {
    if let Some(v) = value {
        if let Ok(v) = serde_json::to_value(v) {
            data.insert(field.to_owned(), v);
        }
    }
}

fn parsed_row<E: Entity>(outcome: &MutationOutcome) -> Option<E> {
    outcome.row.as_ref().and_then(|row| E::from_row(row).ok())
}

/// Root mutation object.
pub struct Mutations;

#[Object(rename_fields = "snake_case", rename_args = "snake_case")]
impl Mutations {
    async fn create_domain(
        &self,
        ctx: &Context<'_>,
        name: String,
        props: DomainInput,
    ) -> Result<DomainMutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let now = Utc::now();
        let mut data = Map::new();
        data.insert("name".into(), json!(name));
        data.insert("description".into(), json!(props.description));
        data.insert("is_active".into(), json!(props.is_active.unwrap_or(true)));
        data.insert("created_at".into(), json!(now));
        data.insert("modified_at".into(), json!(now));
        data.insert(
            "allowed_docker_registries".into(),
            json!(props.allowed_docker_registries.unwrap_or_default()),
        );
        data.insert("integration_id".into(), json!(props.integration_id));
        match gctx
            .storage
            .apply(Domain::TAG, MutationOp::Insert, JsonValue::Object(data))
            .await
        {
            Ok(outcome) if outcome.affected > 0 => {
                Ok(DomainMutationResult::success(parsed_row(&outcome)))
            }
            Ok(_) => Ok(DomainMutationResult::failure("failed to create domain")),
            Err(e) => Ok(DomainMutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    async fn modify_domain(
        &self,
        ctx: &Context<'_>,
        name: String,
        props: ModifyDomainInput,
    ) -> Result<DomainMutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let mut data = Map::new();
        put(&mut data, "name", &props.name);
        put(&mut data, "description", &props.description);
        put(&mut data, "is_active", &props.is_active);
        put(
            &mut data,
            "allowed_docker_registries",
            &props.allowed_docker_registries,
        );
        put(&mut data, "integration_id", &props.integration_id);
        if data.is_empty() {
            return Ok(DomainMutationResult::failure("nothing to update"));
        }
        match gctx
            .storage
            .apply(
                Domain::TAG,
                MutationOp::Update { key: name },
                JsonValue::Object(data),
            )
            .await
        {
            Ok(outcome) if outcome.affected > 0 => {
                Ok(DomainMutationResult::success(parsed_row(&outcome)))
            }
            Ok(_) => Ok(DomainMutationResult::failure("no such domain")),
            Err(e) => Ok(DomainMutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    async fn delete_domain(&self, ctx: &Context<'_>, name: String) -> Result<MutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        match gctx
            .storage
            .apply(Domain::TAG, MutationOp::Delete { key: name }, JsonValue::Null)
            .await
        {
            Ok(outcome) if outcome.affected > 0 => Ok(MutationResult::success()),
            Ok(_) => Ok(MutationResult::failure("no such domain")),
            Err(e) => Ok(MutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    async fn create_user(
        &self,
        ctx: &Context<'_>,
        email: String,
        props: UserInput,
    ) -> Result<UserMutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let mut data = Map::new();
        data.insert("uuid".into(), json!(Uuid::new_v4()));
        data.insert("email".into(), json!(email));
        data.insert("username".into(), json!(props.username));
        data.insert("password".into(), json!(props.password));
        data.insert("domain_name".into(), json!(props.domain_name));
        data.insert("full_name".into(), json!(props.full_name));
        data.insert("description".into(), json!(props.description));
        data.insert("is_active".into(), json!(props.is_active.unwrap_or(true)));
        data.insert(
            "status".into(),
            json!(props.status.unwrap_or_else(|| "active".to_owned())),
        );
        data.insert("role".into(), json!(props.role.unwrap_or(UserRole::User)));
        data.insert("created_at".into(), json!(Utc::now()));
        match gctx
            .storage
            .apply(User::TAG, MutationOp::Insert, JsonValue::Object(data))
            .await
        {
            Ok(outcome) if outcome.affected > 0 => {
                Ok(UserMutationResult::success(parsed_row(&outcome)))
            }
            Ok(_) => Ok(UserMutationResult::failure("failed to create user")),
            Err(e) => Ok(UserMutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    async fn modify_user(
        &self,
        ctx: &Context<'_>,
        email: String,
        props: ModifyUserInput,
    ) -> Result<UserMutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let mut data = Map::new();
        put(&mut data, "username", &props.username);
        put(&mut data, "password", &props.password);
        put(&mut data, "domain_name", &props.domain_name);
        put(&mut data, "full_name", &props.full_name);
        put(&mut data, "description", &props.description);
        put(&mut data, "is_active", &props.is_active);
        put(&mut data, "status", &props.status);
        put(&mut data, "role", &props.role);
        if data.is_empty() {
            return Ok(UserMutationResult::failure("nothing to update"));
        }
        match gctx
            .storage
            .apply(
                User::TAG,
                MutationOp::Update { key: email },
                JsonValue::Object(data),
            )
            .await
        {
            Ok(outcome) if outcome.affected > 0 => {
                Ok(UserMutationResult::success(parsed_row(&outcome)))
            }
            Ok(_) => Ok(UserMutationResult::failure("no such user")),
            Err(e) => Ok(UserMutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    async fn delete_user(&self, ctx: &Context<'_>, email: String) -> Result<MutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        match gctx
            .storage
            .apply(User::TAG, MutationOp::Delete { key: email }, JsonValue::Null)
            .await
        {
            Ok(outcome) if outcome.affected > 0 => Ok(MutationResult::success()),
            Ok(_) => Ok(MutationResult::failure("no such user")),
            Err(e) => Ok(MutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    async fn create_group(
        &self,
        ctx: &Context<'_>,
        name: String,
        props: GroupInput,
    ) -> Result<GroupMutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        ensure_mutation_scope(&gctx.identity, &props.domain_name)?;
        let now = Utc::now();
        let mut data = Map::new();
        data.insert("id".into(), json!(Uuid::new_v4()));
        data.insert("name".into(), json!(name));
        data.insert("description".into(), json!(props.description));
        data.insert("is_active".into(), json!(props.is_active.unwrap_or(true)));
        data.insert("created_at".into(), json!(now));
        data.insert("modified_at".into(), json!(now));
        data.insert("domain_name".into(), json!(props.domain_name));
        data.insert("integration_id".into(), json!(props.integration_id));
        match gctx
            .storage
            .apply(Group::TAG, MutationOp::Insert, JsonValue::Object(data))
            .await
        {
            Ok(outcome) if outcome.affected > 0 => {
                Ok(GroupMutationResult::success(parsed_row(&outcome)))
            }
            Ok(_) => Ok(GroupMutationResult::failure("failed to create group")),
            Err(e) => Ok(GroupMutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    async fn modify_group(
        &self,
        ctx: &Context<'_>,
        gid: Uuid,
        props: ModifyGroupInput,
    ) -> Result<GroupMutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let target = Group::by_id(gctx).load(gid.to_string()).await?;
        ensure_mutation_scope(&gctx.identity, &target.domain_name)?;
        let mut data = Map::new();
        put(&mut data, "name", &props.name);
        put(&mut data, "description", &props.description);
        put(&mut data, "is_active", &props.is_active);
        put(&mut data, "domain_name", &props.domain_name);
        put(&mut data, "integration_id", &props.integration_id);
        if data.is_empty() {
            return Ok(GroupMutationResult::failure("nothing to update"));
        }
        match gctx
            .storage
            .apply(
                Group::TAG,
                MutationOp::Update { key: gid.to_string() },
                JsonValue::Object(data),
            )
            .await
        {
            Ok(outcome) if outcome.affected > 0 => {
                Ok(GroupMutationResult::success(parsed_row(&outcome)))
            }
            Ok(_) => Ok(GroupMutationResult::failure("no such group")),
            Err(e) => Ok(GroupMutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    /// Groups are deactivated rather than removed; sessions and folders may
    /// still reference them.
    async fn delete_group(&self, ctx: &Context<'_>, gid: Uuid) -> Result<MutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let target = Group::by_id(gctx).load(gid.to_string()).await?;
        ensure_mutation_scope(&gctx.identity, &target.domain_name)?;
        let payload = json!({"is_active": false, "integration_id": null});
        match gctx
            .storage
            .apply(Group::TAG, MutationOp::Update { key: gid.to_string() }, payload)
            .await
        {
            Ok(outcome) if outcome.affected > 0 => Ok(MutationResult::success()),
            Ok(_) => Ok(MutationResult::failure("no such group")),
            Err(e) => Ok(MutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    async fn create_keypair(
        &self,
        ctx: &Context<'_>,
        email: String,
        props: KeyPairInput,
    ) -> Result<KeyPairMutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let owner = User::by_email(gctx, None).load(email.clone()).await?;
        ensure_mutation_scope(&gctx.identity, &owner.domain_name)?;
        let mut data = Map::new();
        data.insert("user_id".into(), json!(email));
        data.insert("user".into(), json!(owner.uuid));
        data.insert("access_key".into(), json!(format!("AKIA{}", Uuid::new_v4().simple())));
        data.insert("secret_key".into(), json!(Uuid::new_v4().simple().to_string()));
        data.insert("is_active".into(), json!(props.is_active.unwrap_or(true)));
        data.insert("is_admin".into(), json!(props.is_admin.unwrap_or(false)));
        data.insert("rate_limit".into(), json!(props.rate_limit.unwrap_or(10_000)));
        data.insert("num_queries".into(), json!(0));
        data.insert("created_at".into(), json!(Utc::now()));
        match gctx
            .storage
            .apply(KeyPair::TAG, MutationOp::Insert, JsonValue::Object(data))
            .await
        {
            Ok(outcome) if outcome.affected > 0 => {
                Ok(KeyPairMutationResult::success(parsed_row(&outcome)))
            }
            Ok(_) => Ok(KeyPairMutationResult::failure("failed to create keypair")),
            Err(e) => Ok(KeyPairMutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    async fn modify_keypair(
        &self,
        ctx: &Context<'_>,
        access_key: String,
        props: ModifyKeyPairInput,
    ) -> Result<KeyPairMutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let target = KeyPair::by_access_key(gctx, None)
            .load(access_key.clone())
            .await?;
        let owner = User::by_uuid(gctx, None).load(target.user.to_string()).await?;
        ensure_mutation_scope(&gctx.identity, &owner.domain_name)?;
        let mut data = Map::new();
        put(&mut data, "is_active", &props.is_active);
        put(&mut data, "is_admin", &props.is_admin);
        put(&mut data, "rate_limit", &props.rate_limit);
        if data.is_empty() {
            return Ok(KeyPairMutationResult::failure("nothing to update"));
        }
        match gctx
            .storage
            .apply(
                KeyPair::TAG,
                MutationOp::Update { key: access_key },
                JsonValue::Object(data),
            )
            .await
        {
            Ok(outcome) if outcome.affected > 0 => {
                Ok(KeyPairMutationResult::success(parsed_row(&outcome)))
            }
            Ok(_) => Ok(KeyPairMutationResult::failure("no such keypair")),
            Err(e) => Ok(KeyPairMutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    async fn delete_keypair(
        &self,
        ctx: &Context<'_>,
        access_key: String,
    ) -> Result<MutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let target = KeyPair::by_access_key(gctx, None)
            .load(access_key.clone())
            .await?;
        let owner = User::by_uuid(gctx, None).load(target.user.to_string()).await?;
        ensure_mutation_scope(&gctx.identity, &owner.domain_name)?;
        match gctx
            .storage
            .apply(
                KeyPair::TAG,
                MutationOp::Delete { key: access_key },
                JsonValue::Null,
            )
            .await
        {
            Ok(outcome) if outcome.affected > 0 => Ok(MutationResult::success()),
            Ok(_) => Ok(MutationResult::failure("no such keypair")),
            Err(e) => Ok(MutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    async fn create_scaling_group(
        &self,
        ctx: &Context<'_>,
        name: String,
        props: ScalingGroupInput,
    ) -> Result<ScalingGroupMutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let mut data = Map::new();
        data.insert("name".into(), json!(name));
        data.insert("description".into(), json!(props.description));
        data.insert("is_active".into(), json!(props.is_active.unwrap_or(true)));
        data.insert("created_at".into(), json!(Utc::now()));
        data.insert("driver".into(), json!(props.driver));
        data.insert("scheduler".into(), json!(props.scheduler));
        data.insert("wsproxy_addr".into(), json!(props.wsproxy_addr));
        match gctx
            .storage
            .apply(ScalingGroup::TAG, MutationOp::Insert, JsonValue::Object(data))
            .await
        {
            Ok(outcome) if outcome.affected > 0 => {
                Ok(ScalingGroupMutationResult::success(parsed_row(&outcome)))
            }
            Ok(_) => Ok(ScalingGroupMutationResult::failure("failed to create scaling group")),
            Err(e) => Ok(ScalingGroupMutationResult::failure(format!(
                "unexpected error: {e}"
            ))),
        }
    }

    async fn modify_scaling_group(
        &self,
        ctx: &Context<'_>,
        name: String,
        props: ModifyScalingGroupInput,
    ) -> Result<ScalingGroupMutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let mut data = Map::new();
        put(&mut data, "description", &props.description);
        put(&mut data, "is_active", &props.is_active);
        put(&mut data, "driver", &props.driver);
        put(&mut data, "scheduler", &props.scheduler);
        put(&mut data, "wsproxy_addr", &props.wsproxy_addr);
        if data.is_empty() {
            return Ok(ScalingGroupMutationResult::failure("nothing to update"));
        }
        match gctx
            .storage
            .apply(
                ScalingGroup::TAG,
                MutationOp::Update { key: name },
                JsonValue::Object(data),
            )
            .await
        {
            Ok(outcome) if outcome.affected > 0 => {
                Ok(ScalingGroupMutationResult::success(parsed_row(&outcome)))
            }
            Ok(_) => Ok(ScalingGroupMutationResult::failure("no such scaling group")),
            Err(e) => Ok(ScalingGroupMutationResult::failure(format!(
                "unexpected error: {e}"
            ))),
        }
    }

    async fn delete_scaling_group(
        &self,
        ctx: &Context<'_>,
        name: String,
    ) -> Result<MutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        match gctx
            .storage
            .apply(
                ScalingGroup::TAG,
                MutationOp::Delete { key: name },
                JsonValue::Null,
            )
            .await
        {
            Ok(outcome) if outcome.affected > 0 => Ok(MutationResult::success()),
            Ok(_) => Ok(MutationResult::failure("no such scaling group")),
            Err(e) => Ok(MutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    async fn associate_scaling_group_with_domain(
        &self,
        ctx: &Context<'_>,
        scaling_group: String,
        domain: String,
    ) -> Result<MutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let payload = json!({"scaling_group": scaling_group, "domain": domain});
        match gctx
            .storage
            .apply("sgroups_for_domains", MutationOp::Insert, payload)
            .await
        {
            Ok(outcome) if outcome.affected > 0 => Ok(MutationResult::success()),
            Ok(_) => Ok(MutationResult::failure("failed to associate scaling group")),
            Err(e) => Ok(MutationResult::failure(format!("unexpected error: {e}"))),
        }
    }

    async fn disassociate_scaling_group_with_domain(
        &self,
        ctx: &Context<'_>,
        scaling_group: String,
        domain: String,
    ) -> Result<MutationResult> {
        let gctx = GatewayContext::from_graphql(ctx)?;
        let payload = json!({"domain": domain});
        match gctx
            .storage
            .apply(
                "sgroups_for_domains",
                MutationOp::Delete { key: scaling_group },
                payload,
            )
            .await
        {
            Ok(outcome) if outcome.affected > 0 => Ok(MutationResult::success()),
            Ok(_) => Ok(MutationResult::failure("no such association")),
            Err(e) => Ok(MutationResult::failure(format!("unexpected error: {e}"))),
        }
    }
}
