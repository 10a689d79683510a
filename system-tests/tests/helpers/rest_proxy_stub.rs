// system-tests/tests/helpers/rest_proxy_stub.rs
// ============================================================================
// Module: REST Proxy Stub
// Description: Consumer-instance endpoints reading the stub topic logs.
// Purpose: Let suites observe group and topic read grants by consuming.
// Dependencies: axum, rolebind-core, serde_json
// ============================================================================

//! ## Overview
//! Consumer instances are created and subscribed without authorization
//! checks, as the proxy defers those to the brokers. Fetching records is
//! where the primary cluster decides: the caller needs a read role on the
//! consumer group and on every subscribed topic. The proxy answers only
//! while the primary cluster is up.

use std::collections::BTreeMap;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::ACCEPT;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use rolebind_core::ClusterType;
use rolebind_core::ResourceType;
use serde_json::Value;
use serde_json::json;

use super::platform::Component;
use super::platform::PRIMARY_CLUSTER_ID;
use super::platform::Platform;
use super::platform::READ_ROLES;
use super::platform::StoredConsumer;
use super::server::StubServer;
use super::server::spawn_router;

/// Starts the REST proxy stub.
pub fn spawn_rest_proxy_stub(platform: Platform) -> Result<StubServer, String> {
    let router = Router::new()
        .route("/consumers/{group}", post(handle_create))
        .route("/consumers/{group}/instances/{instance}", delete(handle_delete))
        .route("/consumers/{group}/instances/{instance}/subscription", post(handle_subscribe))
        .route("/consumers/{group}/instances/{instance}/records", get(handle_records))
        .with_state(platform);
    spawn_router("rest-proxy", router)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

async fn handle_create(
    State(platform): State<Platform>,
    Path(group): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let principal = match admit(&platform, &headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    let Some(instance) = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|request| request.get("name").and_then(Value::as_str).map(str::to_string))
    else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, 42204, "Consumer instance name is required.");
    };
    let key = (group.clone(), instance.clone());
    let created = platform.with_state(|state| {
        if state.consumers.contains_key(&key) {
            return false;
        }
        state.consumers.insert(
            key,
            StoredConsumer {
                owner: principal,
                topics: Vec::new(),
                positions: BTreeMap::new(),
            },
        );
        true
    });
    if !created {
        return error(
            StatusCode::CONFLICT,
            40902,
            "Consumer instance with the specified name already exists.",
        );
    }
    Json(json!({
        "instance_id": instance,
        "base_uri": format!("/consumers/{group}/instances/{instance}"),
    }))
    .into_response()
}

async fn handle_subscribe(
    State(platform): State<Platform>,
    Path((group, instance)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let principal = match admit(&platform, &headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    let Some(topics) = serde_json::from_slice::<Value>(&body).ok().and_then(|request| {
        request.get("topics").and_then(Value::as_array).map(|topics| {
            topics.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>()
        })
    }) else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, 42205, "Subscription requires topics.");
    };
    let key = (group, instance);
    let subscribed = platform.with_state(|state| match state.consumers.get_mut(&key) {
        Some(consumer) if consumer.owner == principal => {
            consumer.positions = topics.iter().map(|topic| (topic.clone(), 0)).collect();
            consumer.topics = topics;
            true
        }
        _ => false,
    });
    if subscribed { StatusCode::NO_CONTENT.into_response() } else { instance_not_found() }
}

async fn handle_records(
    State(platform): State<Platform>,
    Path((group, instance)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let principal = match admit(&platform, &headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    let accepts_records = headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/vnd.kafka."));
    if !accepts_records {
        return error(StatusCode::NOT_ACCEPTABLE, 40601, "Embedded format is required.");
    }
    let key = (group.clone(), instance);
    let topics = platform.with_state(|state| {
        state.consumers.get(&key).filter(|consumer| consumer.owner == principal).map(|c| c.topics.clone())
    });
    let Some(topics) = topics else {
        return instance_not_found();
    };
    if !can_read(&platform, &principal, ResourceType::Group, &group) {
        return error(StatusCode::FORBIDDEN, 40301, &format!("Not authorized to access group: {group}"));
    }
    if let Some(topic) = topics.iter().find(|topic| !can_read(&platform, &principal, ResourceType::Topic, topic)) {
        return error(StatusCode::FORBIDDEN, 40301, &format!("Not authorized to access topics: [{topic}]"));
    }
    let records = platform.with_state(|state| {
        let mut batch = Vec::new();
        let Some(consumer) = state.consumers.get_mut(&key) else {
            return batch;
        };
        for topic in &consumer.topics {
            let log = state.topics.get(topic).map(Vec::as_slice).unwrap_or_default();
            let position = consumer.positions.entry(topic.clone()).or_insert(0);
            for (offset, value) in log.iter().enumerate().skip(*position) {
                batch.push(json!({
                    "topic": topic,
                    "key": null,
                    "value": value,
                    "partition": 0,
                    "offset": offset,
                }));
            }
            *position = log.len();
        }
        batch
    });
    Json(records).into_response()
}

async fn handle_delete(
    State(platform): State<Platform>,
    Path((group, instance)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let principal = match admit(&platform, &headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    let key = (group, instance);
    let removed = platform.with_state(|state| {
        if state.consumers.get(&key).is_some_and(|consumer| consumer.owner == principal) {
            state.consumers.remove(&key).is_some()
        } else {
            false
        }
    });
    if removed { StatusCode::NO_CONTENT.into_response() } else { instance_not_found() }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Requires a booted primary cluster and a known identity.
fn admit(platform: &Platform, headers: &HeaderMap) -> Result<String, StatusCode> {
    if !platform.is_up(Component::Primary) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    platform.authenticate(headers)
}

fn can_read(platform: &Platform, principal: &str, resource_type: ResourceType, name: &str) -> bool {
    platform.has_resource_role(principal, ClusterType::Kafka, PRIMARY_CLUSTER_ID, resource_type, name, &READ_ROLES)
}

fn instance_not_found() -> Response {
    error(StatusCode::NOT_FOUND, 40403, "Consumer instance not found.")
}

fn error(status: StatusCode, error_code: u32, message: &str) -> Response {
    (status, Json(json!({"error_code": error_code, "message": message}))).into_response()
}
