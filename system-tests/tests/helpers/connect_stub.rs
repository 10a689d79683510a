// system-tests/tests/helpers/connect_stub.rs
// ============================================================================
// Module: Connector Runtime Stub
// Description: Connector REST surface authorizing against stored bindings.
// Purpose: Answer job-list, submit, status, and delete calls as the runtime would.
// Dependencies: axum, rolebind-core, rolebind-verify, serde_json
// ============================================================================

//! ## Overview
//! The runtime answers `GET /` to any authenticated caller once booted.
//! Connector calls are authorized in the runtime cluster scope:
//! - listing needs some binding on the runtime cluster;
//! - submitting and deleting need manage rights on the connector;
//! - status needs any role on the connector, or `SystemAdmin` or
//!   `ClusterAdmin` on the runtime cluster.
//!
//! A submitted connector only becomes visible after the configured status
//! delay, and its state reflects whether the submitting principal may write
//! its topic (and register its value subject when the converter needs one).
//! A running connector appends its records to the topic log right away.

use std::collections::BTreeMap;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use rolebind_core::ClusterRole;
use rolebind_core::ClusterType;
use rolebind_core::ResourceRole;
use rolebind_core::ResourceType;
use rolebind_verify::ConnectorConfig;
use serde_json::json;

use super::platform::CONNECT_CLUSTER_ID;
use super::platform::Component;
use super::platform::MANAGE_ROLES;
use super::platform::PRIMARY_CLUSTER_ID;
use super::platform::Platform;
use super::platform::REGISTRY_CLUSTER_ID;
use super::platform::StoredConnector;
use super::platform::WRITE_ROLES;
use super::server::StubServer;
use super::server::spawn_router;

/// Worker id reported in connector status documents.
pub const WORKER_ID: &str = "connect:8083";

/// Starts the connector runtime stub.
pub fn spawn_connect_stub(platform: Platform) -> Result<StubServer, String> {
    let router = Router::new()
        .route("/", get(handle_root))
        .route("/connectors", get(handle_list).post(handle_submit))
        .route("/connectors/{name}", get(handle_describe).delete(handle_delete))
        .route("/connectors/{name}/status", get(handle_status))
        .with_state(platform);
    spawn_router("connect", router)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

async fn handle_root(State(platform): State<Platform>, headers: HeaderMap) -> Response {
    match admit(&platform, &headers) {
        Ok(_) => Json(json!({"version": "7.4.0-ce", "kafka_cluster_id": PRIMARY_CLUSTER_ID}))
            .into_response(),
        Err(status) => status.into_response(),
    }
}

async fn handle_list(State(platform): State<Platform>, headers: HeaderMap) -> Response {
    let principal = match admit(&platform, &headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    if !platform.has_any_binding_on(&principal, ClusterType::Connect, CONNECT_CLUSTER_ID) {
        return forbidden(&principal, "Cluster", CONNECT_CLUSTER_ID);
    }
    let names: Vec<String> = platform.with_state(|state| state.connectors.keys().cloned().collect());
    let names: Vec<String> =
        names.into_iter().filter(|name| can_see(&platform, &principal, name)).collect();
    Json(names).into_response()
}

async fn handle_submit(State(platform): State<Platform>, headers: HeaderMap, body: Bytes) -> Response {
    let principal = match admit(&platform, &headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    let Ok(submitted) = serde_json::from_slice::<ConnectorConfig>(&body) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error_code": 400, "message": "malformed connector"})))
            .into_response();
    };
    if !may_manage(&platform, &principal, &submitted.name) {
        return forbidden(&principal, "Connector", &submitted.name);
    }
    if platform.with_state(|state| state.connectors.contains_key(&submitted.name)) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"error_code": 409, "message": format!("Connector {} already exists", submitted.name)})),
        )
            .into_response();
    }
    let state = producer_state(&platform, &principal, &submitted);
    if state == "RUNNING" {
        if let Some(topic) = submitted.get("kafka.topic") {
            let count = platform.with_state(|platform_state| platform_state.options.records_per_connector);
            platform.produce(topic, count);
        }
    }
    platform.with_state(|platform_state| {
        let visible_at = Instant::now() + platform_state.options.status_delay;
        platform_state.connectors.insert(
            submitted.name.clone(),
            StoredConnector {
                owner: principal.clone(),
                config: submitted.config.clone(),
                visible_at,
                state: state.to_string(),
            },
        );
    });
    (StatusCode::CREATED, Json(json!({"name": submitted.name, "config": submitted.config, "tasks": []})))
        .into_response()
}

async fn handle_describe(
    State(platform): State<Platform>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let principal = match admit(&platform, &headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    if !can_see(&platform, &principal, &name) {
        return forbidden(&principal, "Connector", &name);
    }
    let config = platform.with_state(|state| visible(&state.connectors, &name).map(|c| c.config.clone()));
    match config {
        Some(config) => Json(json!({"name": name, "config": config})).into_response(),
        None => not_found(&name),
    }
}

async fn handle_status(
    State(platform): State<Platform>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let principal = match admit(&platform, &headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    if !can_see(&platform, &principal, &name) {
        return forbidden(&principal, "Connector", &name);
    }
    let state = platform.with_state(|state| visible(&state.connectors, &name).map(|c| c.state.clone()));
    match state {
        Some(state) => Json(json!({
            "name": name,
            "connector": {"state": state, "worker_id": WORKER_ID},
            "tasks": [{"id": 0, "state": state, "worker_id": WORKER_ID}],
            "type": "source"
        }))
        .into_response(),
        None => not_found(&name),
    }
}

async fn handle_delete(
    State(platform): State<Platform>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let principal = match admit(&platform, &headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    if !may_manage(&platform, &principal, &name) {
        return forbidden(&principal, "Connector", &name);
    }
    if platform.with_state(|state| state.connectors.remove(&name)).is_some() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found(&name)
    }
}

// ============================================================================
// SECTION: Authorization
// ============================================================================

/// Requires a booted runtime and a known identity.
fn admit(platform: &Platform, headers: &HeaderMap) -> Result<String, StatusCode> {
    if !platform.is_up(Component::Connect) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    platform.authenticate(headers)
}

fn may_manage(platform: &Platform, principal: &str, connector: &str) -> bool {
    platform.has_resource_role(
        principal,
        ClusterType::Connect,
        CONNECT_CLUSTER_ID,
        ResourceType::Connector,
        connector,
        &MANAGE_ROLES,
    )
}

fn can_see(platform: &Platform, principal: &str, connector: &str) -> bool {
    platform.has_resource_role(
        principal,
        ClusterType::Connect,
        CONNECT_CLUSTER_ID,
        ResourceType::Connector,
        connector,
        &ResourceRole::ALL,
    ) || platform.has_cluster_role(
        principal,
        ClusterType::Connect,
        CONNECT_CLUSTER_ID,
        &[ClusterRole::SystemAdmin, ClusterRole::ClusterAdmin],
    )
}

/// State the connector reaches once its tasks try to produce.
fn producer_state(platform: &Platform, principal: &str, connector: &ConnectorConfig) -> &'static str {
    let Some(topic) = connector.get("kafka.topic") else {
        return "FAILED";
    };
    let can_write = platform.has_resource_role(
        principal,
        ClusterType::Kafka,
        PRIMARY_CLUSTER_ID,
        ResourceType::Topic,
        topic,
        &WRITE_ROLES,
    );
    if !can_write {
        return "FAILED";
    }
    let needs_subject = connector.get("value.converter").is_some_and(|class| class.contains("Avro"));
    if needs_subject {
        let subject = format!("{topic}-value");
        let can_register = platform.has_resource_role(
            principal,
            ClusterType::SchemaRegistry,
            REGISTRY_CLUSTER_ID,
            ResourceType::Subject,
            &subject,
            &WRITE_ROLES,
        );
        if !can_register {
            return "FAILED";
        }
        platform.with_state(|state| {
            let versions = state.subjects.entry(subject).or_default();
            if versions.is_empty() {
                versions.push(1);
            }
        });
    }
    "RUNNING"
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn visible<'a>(
    connectors: &'a BTreeMap<String, StoredConnector>,
    name: &str,
) -> Option<&'a StoredConnector> {
    connectors.get(name).filter(|connector| Instant::now() >= connector.visible_at)
}

fn not_found(name: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error_code": 404, "message": format!("No status found for connector {name}")})),
    )
        .into_response()
}

fn forbidden(principal: &str, resource_type: &str, name: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error_code": 403,
            "message": format!("User:{principal} is not authorized on {resource_type}:{name}")
        })),
    )
        .into_response()
}
