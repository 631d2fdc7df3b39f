//! Mutation privilege middleware.
//!
//! A schema extension that intercepts every top-level mutation field before
//! its resolver runs and checks the caller's role against the field's
//! descriptor in [`MUTATION_DESCRIPTORS`]. A role mismatch short-circuits
//! with the mutation's own failure payload shape instead of a transport
//! error; queries and nested fields pass through untouched.
//!
//! [`MUTATION_DESCRIPTORS`]: crate::mutation::MUTATION_DESCRIPTORS

use std::sync::Arc;

use async_graphql::extensions::{
    Extension, ExtensionContext, ExtensionFactory, NextResolve, ResolveInfo,
};
use async_graphql::parser::types::Selection;
use async_graphql::{value, ServerResult, Value};

use crate::auth::GatewayContext;
use crate::mutation::{allowed_roles_for, MUTATION_ROOT};

/// Factory registered on the schema; one checker instance per request.
pub struct MutationPrivilege;

impl ExtensionFactory for MutationPrivilege {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(MutationPrivilegeChecker)
    }
}

struct MutationPrivilegeChecker;

#[async_trait::async_trait]
impl Extension for MutationPrivilegeChecker {
    async fn resolve(
        &self,
        ctx: &ExtensionContext<'_>,
        info: ResolveInfo<'_>,
        next: NextResolve<'_>,
    ) -> ServerResult<Option<Value>> {
        // Only first-level mutation fields are gated here.
        if info.parent_type == MUTATION_ROOT && info.path_node.parent.is_none() {
            let field = info.name;
            let permitted = ctx
                .data_opt::<GatewayContext>()
                .map(|gctx| allowed_roles_for(field).contains(&gctx.identity.role))
                .unwrap_or(false);
            if !permitted {
                tracing::warn!(field, "mutation rejected by privilege check");
                return Ok(Some(denial_payload(&info, field)));
            }
        }
        next.run(ctx, info).await
    }
}

/// Failure payload shaped by the client's selection: `ok`/`msg` carry the
/// denial, every other selected field resolves to null.
fn denial_payload(info: &ResolveInfo<'_>, field: &str) -> Value {
    let msg = format!("no permission to execute {field}");
    let mut obj = serde_json::Map::new();
    for item in &info.field.selection_set.node.items {
        if let Selection::Field(sub) = &item.node {
            let name = sub.node.name.node.as_str();
            let key = sub.node.response_key().node.to_string();
            let value = match name {
                "ok" => serde_json::Value::Bool(false),
                "msg" => serde_json::Value::String(msg.clone()),
                _ => serde_json::Value::Null,
            };
            obj.insert(key, value);
        }
    }
    Value::from_json(serde_json::Value::Object(obj))
        .unwrap_or_else(|_| value!({ "ok": false, "msg": msg }))
}
