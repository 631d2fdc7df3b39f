//! Shared test fixtures: an in-memory storage backend with call counters,
//! a seeded cluster snapshot, canned caller identities, and a helper that
//! executes a query end to end against the real schema.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use crate::auth::{build_schema, CallerIdentity, GatewayContext, UserRole};
use crate::error::{GatewayError, Result};
use crate::scope::ScopeFilter;
use crate::storage::{FilterSet, MutationOp, MutationOutcome, Row, SortOrder, StorageBackend};

pub(crate) const SUPERADMIN_UUID: &str = "c3a81cdb-3d03-4ba6-9b0a-1e59e9f57cd6";
pub(crate) const ADMIN_UUID: &str = "6f9619ff-8b86-4d01-b42d-00c04fc964ff";
pub(crate) const USER1_UUID: &str = "f5d8a231-4d3e-43d3-b7e5-f2b1f8d2a101";
pub(crate) const MONITOR_UUID: &str = "0b2f813e-9b2f-4f26-a3b1-6dd0f67b11c2";
pub(crate) const GROUP_RESEARCH_ID: &str = "7a0b4a6e-ffd1-4b52-9e2b-3a9d4d2c8f10";
pub(crate) const GROUP_OPS_ID: &str = "2c7e3b1d-55aa-4f0e-8d0c-91f2a6b7c8d9";
pub(crate) const SESSION_ONE_ID: &str = "d1a2b3c4-1111-4aaa-8bbb-000000000001";
pub(crate) const SESSION_DUP_A_ID: &str = "d1a2b3c4-1111-4aaa-8bbb-000000000002";
pub(crate) const SESSION_DUP_B_ID: &str = "d1a2b3c4-1111-4aaa-8bbb-000000000003";
pub(crate) const CONTAINER_MAIN_ID: &str = "e5f6a7b8-2222-4ccc-9ddd-000000000001";

/// Canned caller identities matching the seeded snapshot.
pub(crate) mod identities {
    use super::*;

    fn identity(role: UserRole, domain: &str, uuid: &str, email: &str, ak: &str) -> CallerIdentity {
        CallerIdentity {
            role,
            domain_name: domain.to_owned(),
            user_id: uuid.parse().expect("fixture uuid"),
            email: email.to_owned(),
            access_key: ak.to_owned(),
        }
    }

    pub(crate) fn superadmin() -> CallerIdentity {
        identity(
            UserRole::Superadmin,
            "default",
            SUPERADMIN_UUID,
            "superadmin@example.com",
            "AKIA-SUPER",
        )
    }

    pub(crate) fn admin() -> CallerIdentity {
        identity(
            UserRole::Admin,
            "default",
            ADMIN_UUID,
            "admin@example.com",
            "AKIA-ADMIN",
        )
    }

    pub(crate) fn user() -> CallerIdentity {
        identity(
            UserRole::User,
            "default",
            USER1_UUID,
            "user1@example.com",
            "AKIA-USER1",
        )
    }

    pub(crate) fn monitor() -> CallerIdentity {
        identity(
            UserRole::Monitor,
            "default",
            MONITOR_UUID,
            "monitor@example.com",
            "AKIA-MON",
        )
    }
}

/// In-memory [`StorageBackend`] with per-method call counters.
///
/// Tables are plain JSON rows keyed by entity tag. Keyed-lookup tags such as
/// `"user.by_email"` map onto a `(table, key_field)` pair; association
/// tables back membership and scaling-group visibility filters.
pub(crate) struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    fetch_calls: AtomicUsize,
    count_calls: AtomicUsize,
    slice_calls: AtomicUsize,
    apply_calls: AtomicUsize,
}

impl MemoryBackend {
    pub(crate) fn new(tables: HashMap<String, Vec<Row>>) -> Self {
        Self {
            tables: Mutex::new(tables),
            fetch_calls: AtomicUsize::new(0),
            count_calls: AtomicUsize::new(0),
            slice_calls: AtomicUsize::new(0),
            apply_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn total_read_calls(&self) -> usize {
        self.fetch_calls.load(AtomicOrdering::SeqCst)
            + self.count_calls.load(AtomicOrdering::SeqCst)
            + self.slice_calls.load(AtomicOrdering::SeqCst)
    }

    pub(crate) fn fetch_call_count(&self) -> usize {
        self.fetch_calls.load(AtomicOrdering::SeqCst)
    }

    pub(crate) fn apply_call_count(&self) -> usize {
        self.apply_calls.load(AtomicOrdering::SeqCst)
    }

    fn with_tables<R>(&self, f: impl FnOnce(&mut HashMap<String, Vec<Row>>) -> R) -> R {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut tables)
    }

    /// Rows of `table` matching scope + filters.
    fn select(
        &self,
        tables: &HashMap<String, Vec<Row>>,
        table: &str,
        scope: &ScopeFilter,
        filters: &FilterSet,
    ) -> Vec<Row> {
        tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_scope(row, scope))
                    .filter(|row| matches_filters(tables, table, row, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Maps a keyed-lookup tag to its backing table and key field.
fn lookup_spec(tag: &str) -> (&str, &str) {
    match tag {
        "agent.by_id" => ("agent", "id"),
        "domain.by_name" => ("domain", "name"),
        "group.by_id" => ("group", "id"),
        "user.by_email" => ("user", "email"),
        "user.by_uuid" => ("user", "uuid"),
        "keypair.by_access_key" => ("keypair", "access_key"),
        "keypair.by_email" => ("keypair", "user_id"),
        "image.by_reference" => ("image", "name"),
        "compute_session.detail" => ("compute_session", "id"),
        "compute_session.by_name" => ("compute_session", "name"),
        "compute_container.detail" => ("compute_container", "id"),
        "scaling_group.by_name" => ("scaling_group", "name"),
        other => (other, "id"),
    }
}

fn field_str(row: &Row, field: &str) -> Option<String> {
    row.get(field).and_then(|v| v.as_str()).map(str::to_owned)
}

fn matches_scope(row: &Row, scope: &ScopeFilter) -> bool {
    if let Some(ref domain) = scope.domain_name {
        if field_str(row, "domain_name").as_deref() != Some(domain) {
            return false;
        }
    }
    if let Some(group) = scope.group_id {
        let wanted = group.to_string();
        let got = field_str(row, "group_id").or_else(|| field_str(row, "group"));
        if got.as_deref() != Some(wanted.as_str()) {
            return false;
        }
    }
    if let Some(user) = scope.user_id {
        let wanted = user.to_string();
        let got = field_str(row, "user")
            .or_else(|| field_str(row, "user_id"))
            .or_else(|| field_str(row, "uuid"));
        if got.as_deref() != Some(wanted.as_str()) {
            return false;
        }
    }
    if let Some(ref ak) = scope.access_key {
        if field_str(row, "access_key").as_deref() != Some(ak) {
            return false;
        }
    }
    true
}

/// True when `other` appears in the named association table with the given
/// field equal to `value`, alongside `anchor_field == anchor`.
fn associated(
    tables: &HashMap<String, Vec<Row>>,
    assoc_table: &str,
    anchor_field: &str,
    anchor: &str,
    field: &str,
    value: &JsonValue,
) -> bool {
    tables
        .get(assoc_table)
        .map(|rows| {
            rows.iter().any(|row| {
                field_str(row, anchor_field).as_deref() == Some(anchor)
                    && row.get(field) == Some(value)
            })
        })
        .unwrap_or(false)
}

fn matches_filters(
    tables: &HashMap<String, Vec<Row>>,
    table: &str,
    row: &Row,
    filters: &FilterSet,
) -> bool {
    for (field, value) in filters.entries() {
        let ok = match (*field, table) {
            ("member_user_id", "group") => {
                let group_id = field_str(row, "id").unwrap_or_default();
                associated(
                    tables,
                    "association_groups_users",
                    "group_id",
                    &group_id,
                    "user_id",
                    value,
                )
            }
            ("member_group_id", "user") => {
                let user_id = field_str(row, "uuid").unwrap_or_default();
                associated(
                    tables,
                    "association_groups_users",
                    "user_id",
                    &user_id,
                    "group_id",
                    value,
                )
            }
            ("domain", "scaling_group") => {
                let name = field_str(row, "name").unwrap_or_default();
                associated(
                    tables,
                    "sgroups_for_domains",
                    "scaling_group",
                    &name,
                    "domain",
                    value,
                )
            }
            ("group", "scaling_group") => {
                let name = field_str(row, "name").unwrap_or_default();
                associated(
                    tables,
                    "sgroups_for_groups",
                    "scaling_group",
                    &name,
                    "group",
                    value,
                )
            }
            ("access_key", "scaling_group") => {
                let name = field_str(row, "name").unwrap_or_default();
                associated(
                    tables,
                    "sgroups_for_keypairs",
                    "scaling_group",
                    &name,
                    "access_key",
                    value,
                )
            }
            _ => row.get(field) == Some(value),
        };
        if !ok {
            return false;
        }
    }
    true
}

fn cmp_sort_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn primary_key_field(table: &str) -> &'static str {
    match table {
        "domain" | "scaling_group" => "name",
        "user" => "email",
        "keypair" => "access_key",
        _ => "id",
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn fetch_by_keys(
        &self,
        tag: &str,
        keys: &[String],
        scope: &ScopeFilter,
        filters: &FilterSet,
    ) -> Result<HashMap<String, Vec<Row>>> {
        self.fetch_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let (table, key_field) = lookup_spec(tag);
        self.with_tables(|tables| {
            let rows = self.select(tables, table, scope, filters);
            let mut grouped: HashMap<String, Vec<Row>> = HashMap::new();
            for row in rows {
                if let Some(key) = field_str(&row, key_field) {
                    if keys.contains(&key) {
                        grouped.entry(key).or_default().push(row);
                    }
                }
            }
            Ok(grouped)
        })
    }

    async fn count(&self, tag: &str, filters: &FilterSet, scope: &ScopeFilter) -> Result<u64> {
        self.count_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.with_tables(|tables| Ok(self.select(tables, tag, scope, filters).len() as u64))
    }

    async fn query_slice(
        &self,
        tag: &str,
        filters: &FilterSet,
        scope: &ScopeFilter,
        order: &SortOrder,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<Vec<Row>> {
        self.slice_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.with_tables(|tables| {
            let mut rows = self.select(tables, tag, scope, filters);
            rows.sort_by(|a, b| {
                let av = a.get(&order.key).unwrap_or(&JsonValue::Null);
                let bv = b.get(&order.key).unwrap_or(&JsonValue::Null);
                let ord = cmp_sort_values(av, bv);
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
            let rows: Vec<Row> = rows
                .into_iter()
                .skip(offset as usize)
                .take(limit.map(|l| l as usize).unwrap_or(usize::MAX))
                .collect();
            Ok(rows)
        })
    }

    async fn apply(&self, tag: &str, op: MutationOp, payload: Row) -> Result<MutationOutcome> {
        self.apply_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let pk = primary_key_field(tag);
        self.with_tables(|tables| {
            let rows = tables.entry(tag.to_owned()).or_default();
            match op {
                MutationOp::Insert => {
                    rows.push(payload.clone());
                    Ok(MutationOutcome { affected: 1, row: Some(payload) })
                }
                MutationOp::Update { key } => {
                    let patch = payload
                        .as_object()
                        .cloned()
                        .ok_or_else(|| GatewayError::Internal("non-object patch".into()))?;
                    let mut updated = None;
                    for row in rows.iter_mut() {
                        if field_str(row, pk).as_deref() == Some(key.as_str()) {
                            if let Some(obj) = row.as_object_mut() {
                                for (k, v) in &patch {
                                    obj.insert(k.clone(), v.clone());
                                }
                            }
                            updated = Some(row.clone());
                            break;
                        }
                    }
                    Ok(MutationOutcome {
                        affected: updated.is_some() as u64,
                        row: updated,
                    })
                }
                MutationOp::Delete { key } => {
                    let extra = payload.as_object().cloned().unwrap_or_default();
                    let before = rows.len();
                    rows.retain(|row| {
                        let hit = field_str(row, pk).as_deref() == Some(key.as_str())
                            && extra.iter().all(|(k, v)| row.get(k) == Some(v));
                        !hit
                    });
                    Ok(MutationOutcome {
                        affected: (before - rows.len()) as u64,
                        row: None,
                    })
                }
            }
        })
    }
}

/// A small but complete cluster snapshot: two domains, two groups, three
/// users with keypairs, agents, images with mixed registries, compute
/// sessions (including a duplicated legacy name), containers, folders, and
/// one scaling group associated with the default domain.
pub(crate) fn seeded_storage() -> MemoryBackend {
    let mut tables: HashMap<String, Vec<Row>> = HashMap::new();

    tables.insert(
        "domain".into(),
        vec![
            json!({
                "name": "default",
                "description": "default tenant",
                "is_active": true,
                "created_at": "2024-01-01T00:00:00Z",
                "modified_at": "2024-01-01T00:00:00Z",
                "allowed_docker_registries": ["cr.example.com"],
                "integration_id": null,
            }),
            json!({
                "name": "other",
                "description": "another tenant",
                "is_active": true,
                "created_at": "2024-01-02T00:00:00Z",
                "modified_at": "2024-01-02T00:00:00Z",
                "allowed_docker_registries": [],
                "integration_id": null,
            }),
        ],
    );

    tables.insert(
        "group".into(),
        vec![
            json!({
                "id": GROUP_RESEARCH_ID,
                "name": "research",
                "description": null,
                "is_active": true,
                "created_at": "2024-02-01T00:00:00Z",
                "modified_at": "2024-02-01T00:00:00Z",
                "domain_name": "default",
                "integration_id": null,
            }),
            json!({
                "id": GROUP_OPS_ID,
                "name": "ops",
                "description": null,
                "is_active": true,
                "created_at": "2024-02-02T00:00:00Z",
                "modified_at": "2024-02-02T00:00:00Z",
                "domain_name": "other",
                "integration_id": null,
            }),
        ],
    );

    tables.insert(
        "association_groups_users".into(),
        vec![json!({"user_id": USER1_UUID, "group_id": GROUP_RESEARCH_ID})],
    );

    tables.insert(
        "user".into(),
        vec![
            json!({
                "uuid": SUPERADMIN_UUID,
                "username": "superadmin",
                "email": "superadmin@example.com",
                "full_name": null,
                "description": null,
                "is_active": true,
                "status": "active",
                "created_at": "2024-01-01T01:00:00Z",
                "domain_name": "default",
                "role": "superadmin",
            }),
            json!({
                "uuid": ADMIN_UUID,
                "username": "admin",
                "email": "admin@example.com",
                "full_name": null,
                "description": null,
                "is_active": true,
                "status": "active",
                "created_at": "2024-01-01T02:00:00Z",
                "domain_name": "default",
                "role": "admin",
            }),
            json!({
                "uuid": USER1_UUID,
                "username": "user1",
                "email": "user1@example.com",
                "full_name": "User One",
                "description": null,
                "is_active": true,
                "status": "active",
                "created_at": "2024-01-01T03:00:00Z",
                "domain_name": "default",
                "role": "user",
            }),
        ],
    );

    tables.insert(
        "keypair".into(),
        vec![
            json!({
                "user_id": "superadmin@example.com",
                "access_key": "AKIA-SUPER",
                "secret_key": "secret-super",
                "is_active": true,
                "is_admin": true,
                "created_at": "2024-01-01T01:00:00Z",
                "last_used": null,
                "rate_limit": 10000,
                "num_queries": 0,
                "user": SUPERADMIN_UUID,
                "domain_name": "default",
            }),
            json!({
                "user_id": "admin@example.com",
                "access_key": "AKIA-ADMIN",
                "secret_key": "secret-admin",
                "is_active": true,
                "is_admin": true,
                "created_at": "2024-01-01T02:00:00Z",
                "last_used": null,
                "rate_limit": 10000,
                "num_queries": 0,
                "user": ADMIN_UUID,
                "domain_name": "default",
            }),
            json!({
                "user_id": "user1@example.com",
                "access_key": "AKIA-USER1",
                "secret_key": "secret-user1",
                "is_active": true,
                "is_admin": false,
                "created_at": "2024-01-01T03:00:00Z",
                "last_used": null,
                "rate_limit": 10000,
                "num_queries": 0,
                "user": USER1_UUID,
                "domain_name": "default",
            }),
        ],
    );

    tables.insert(
        "agent".into(),
        vec![
            json!({
                "id": "i-agent01",
                "status": "ALIVE",
                "scaling_group": "default-sg",
                "addr": "tcp://10.0.0.11:6001",
                "region": "local",
                "schedulable": true,
                "first_contact": "2024-03-01T00:00:00Z",
                "lost_at": null,
            }),
            json!({
                "id": "i-agent02",
                "status": "LOST",
                "scaling_group": "default-sg",
                "addr": "tcp://10.0.0.12:6001",
                "region": "local",
                "schedulable": false,
                "first_contact": "2024-03-01T00:00:00Z",
                "lost_at": "2024-03-05T00:00:00Z",
            }),
        ],
    );

    tables.insert(
        "image".into(),
        vec![
            json!({
                "name": "cr.example.com/python:3.11",
                "registry": "cr.example.com",
                "tag": "3.11",
                "digest": "sha256:aaaa",
                "architecture": "x86_64",
                "size_bytes": 123456789u64,
                "is_installed": true,
                "is_operation": false,
            }),
            json!({
                "name": "private.example.com/secret:latest",
                "registry": "private.example.com",
                "tag": "latest",
                "digest": "sha256:bbbb",
                "architecture": "x86_64",
                "size_bytes": 4242424u64,
                "is_installed": false,
                "is_operation": false,
            }),
        ],
    );

    tables.insert(
        "compute_session".into(),
        vec![
            json!({
                "id": SESSION_ONE_ID,
                "name": "sess-one",
                "image": "cr.example.com/python:3.11",
                "domain_name": "default",
                "group_id": GROUP_RESEARCH_ID,
                "access_key": "AKIA-USER1",
                "status": "RUNNING",
                "status_info": null,
                "created_at": "2024-04-01T00:00:00Z",
                "terminated_at": null,
            }),
            json!({
                "id": SESSION_DUP_A_ID,
                "name": "sess-dup",
                "image": "cr.example.com/python:3.11",
                "domain_name": "default",
                "group_id": GROUP_RESEARCH_ID,
                "access_key": "AKIA-USER1",
                "status": "RUNNING",
                "status_info": null,
                "created_at": "2024-04-02T00:00:00Z",
                "terminated_at": null,
            }),
            json!({
                "id": SESSION_DUP_B_ID,
                "name": "sess-dup",
                "image": "cr.example.com/python:3.11",
                "domain_name": "default",
                "group_id": GROUP_RESEARCH_ID,
                "access_key": "AKIA-USER1",
                "status": "TERMINATED",
                "status_info": null,
                "created_at": "2024-04-03T00:00:00Z",
                "terminated_at": "2024-04-04T00:00:00Z",
            }),
        ],
    );

    tables.insert(
        "compute_container".into(),
        vec![json!({
            "id": CONTAINER_MAIN_ID,
            "session_id": SESSION_ONE_ID,
            "role": "main",
            "agent": "i-agent01",
            "status": "RUNNING",
            "created_at": "2024-04-01T00:00:10Z",
            "domain_name": "default",
            "access_key": "AKIA-USER1",
        })],
    );

    tables.insert(
        "vfolder".into(),
        vec![
            json!({
                "id": "9e8d7c6b-3333-4eee-8fff-000000000001",
                "host": "local:volume1",
                "name": "workspace",
                "user": USER1_UUID,
                "group": null,
                "creator": "user1@example.com",
                "unmanaged_path": null,
                "max_size": 1048576u64,
                "created_at": "2024-05-01T00:00:00Z",
                "domain_name": "default",
                "access_key": "AKIA-USER1",
            }),
            // Belongs to a different tenant; must stay invisible to user1.
            json!({
                "id": "9e8d7c6b-3333-4eee-8fff-000000000002",
                "host": "local:volume1",
                "name": "ops-data",
                "user": null,
                "group": GROUP_OPS_ID,
                "creator": null,
                "unmanaged_path": null,
                "max_size": 1048576u64,
                "created_at": "2024-05-02T00:00:00Z",
                "domain_name": "other",
                "access_key": "AKIA-OTHER",
            }),
        ],
    );

    tables.insert(
        "scaling_group".into(),
        vec![json!({
            "name": "default-sg",
            "description": null,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "driver": "static",
            "scheduler": "fifo",
            "wsproxy_addr": null,
        })],
    );

    tables.insert(
        "sgroups_for_domains".into(),
        vec![json!({"scaling_group": "default-sg", "domain": "default"})],
    );

    MemoryBackend::new(tables)
}

/// Executes one GraphQL request end to end against the real schema with the
/// given identity, the way the HTTP handler would.
pub(crate) async fn execute(
    storage: Arc<MemoryBackend>,
    identity: CallerIdentity,
    query: &str,
) -> async_graphql::Response {
    let storage: Arc<dyn StorageBackend> = storage;
    let schema = build_schema(storage.clone());
    let gctx = GatewayContext::new(identity, storage);
    schema
        .execute(async_graphql::Request::new(query).data(gctx))
        .await
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;

    #[tokio::test]
    async fn seeded_backend_serves_scoped_counts() {
        let storage = seeded_storage();
        let all = storage.count("user", &FilterSet::new(), &ScopeFilter::new()).await;
        assert_eq!(assert_ok!(all), 3);
        let scoped = storage
            .count(
                "compute_session",
                &FilterSet::new().eq("status", "RUNNING"),
                &ScopeFilter::new().with_access_key(Some("AKIA-USER1".into())),
            )
            .await;
        assert_eq!(assert_ok!(scoped), 2);
    }

    #[tokio::test]
    async fn membership_filter_resolves_through_association() {
        let storage = seeded_storage();
        let grouped = storage
            .fetch_by_keys(
                "group.by_id",
                &[GROUP_RESEARCH_ID.to_owned(), GROUP_OPS_ID.to_owned()],
                &ScopeFilter::new(),
                &FilterSet::new().eq("member_user_id", USER1_UUID),
            )
            .await
            .expect("fetch");
        assert!(grouped.contains_key(GROUP_RESEARCH_ID));
        assert!(!grouped.contains_key(GROUP_OPS_ID));
    }
}
