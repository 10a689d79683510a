// system-tests/tests/suites/authorization.rs
// ============================================================================
// Module: Authorization Tests
// Description: Pattern, scope, and idempotence behavior of granted bindings.
// Purpose: Confirm grants sent by the policy client drive observed outcomes.
// Dependencies: system-tests helpers
// ============================================================================

//! Authorization system tests.

use std::time::Duration;

use rolebind_core::BindingError;
use rolebind_core::ClusterId;
use rolebind_core::ClusterRole;
use rolebind_core::ClusterType;
use rolebind_core::Principal;
use rolebind_core::ResourcePattern;
use rolebind_core::ResourceRole;
use rolebind_core::ResourceType;
use rolebind_policy::PolicyClient;
use rolebind_policy::PolicyError;
use rolebind_verify::ConnectorConfig;
use rolebind_verify::OutcomeKind;
use rolebind_verify::RestProbe;

use crate::helpers;
use helpers::logging::init_test_tracing;
use helpers::platform::BOB;
use helpers::platform::CONNECT_CLUSTER_ID;
use helpers::platform::PRIMARY_CLUSTER_ID;
use helpers::platform::PlatformOptions;
use helpers::readiness::start_and_wait;
use helpers::services::StubPlatform;
use helpers::services::running_platform;
use helpers::services::runtime_grants;
use helpers::timeouts::resolve_timeout;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Starts only the identity store and primary cluster.
async fn primary_only() -> Result<(StubPlatform, PolicyClient), Box<dyn std::error::Error>> {
    init_test_tracing();
    let stub = StubPlatform::start(PlatformOptions::default())?;
    let services = stub.services()?;
    let timeout = resolve_timeout(Duration::from_secs(10));
    start_and_wait(services.identity.as_ref(), timeout).await?;
    start_and_wait(services.primary.as_ref(), timeout).await?;
    let admin = stub.resolved_policy_client().await?;
    Ok((stub, admin))
}

async fn describe_topic(probe: &RestProbe, topic: &str) -> OutcomeKind {
    probe.get(&["kafka", "v3", "clusters", PRIMARY_CLUSTER_ID, "topics", topic]).await.kind()
}

fn bob() -> Principal {
    Principal::user(BOB).expect("valid principal")
}

// ============================================================================
// SECTION: Pattern Semantics
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn literal_binding_authorizes_only_the_named_resource() -> Result<(), Box<dyn std::error::Error>> {
    let (stub, admin) = primary_only().await?;
    admin
        .grant_role_on_kafka_resource(&bob(), ResourceRole::DeveloperRead, ResourceType::Topic, "foo")
        .await?;

    let probe = stub.policy_probe(BOB)?;
    assert_eq!(describe_topic(&probe, "foo").await, OutcomeKind::Authorized);
    assert_eq!(describe_topic(&probe, "bar").await, OutcomeKind::Forbidden);
    assert_eq!(describe_topic(&probe, "foobar").await, OutcomeKind::Forbidden);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn prefixed_binding_covers_names_sharing_the_prefix() -> Result<(), Box<dyn std::error::Error>> {
    let (stub, admin) = primary_only().await?;
    admin
        .grant_role_on_patterns(
            &bob(),
            ResourceRole::DeveloperRead,
            [],
            vec![ResourcePattern::prefixed(ResourceType::Topic, "connect-")],
        )
        .await?;

    let probe = stub.policy_probe(BOB)?;
    for topic in ["connect-configs", "connect-offsets", "connect-status"] {
        assert_eq!(describe_topic(&probe, topic).await, OutcomeKind::Authorized, "{topic}");
    }
    assert_eq!(describe_topic(&probe, "other-topic").await, OutcomeKind::Forbidden);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn literal_pattern_outranks_overlapping_prefix() -> Result<(), Box<dyn std::error::Error>> {
    let (stub, _) = running_platform(PlatformOptions::default(), runtime_grants(&[])?).await?;
    let mut admin = stub.policy_client()?;
    admin.resolve_primary_cluster().await?;
    let connect_id = ClusterId::new(CONNECT_CLUSTER_ID)?;
    admin
        .grant_role_on_patterns(
            &bob(),
            ResourceRole::DeveloperManage,
            [(ClusterType::Connect, connect_id.clone())],
            vec![ResourcePattern::prefixed(ResourceType::Connector, "data")],
        )
        .await?;
    admin
        .grant_role_on_resource(
            &bob(),
            ResourceRole::DeveloperRead,
            ClusterType::Connect,
            &connect_id,
            ResourceType::Connector,
            "datagen",
        )
        .await?;

    let connect = stub.connect_client(BOB)?;
    let governed_by_literal = connect.submit_connector(&ConnectorConfig::datagen("datagen")).await;
    assert!(governed_by_literal.is_forbidden(), "{governed_by_literal:?}");
    let governed_by_prefix = connect.submit_connector(&ConnectorConfig::datagen("database")).await;
    assert_eq!(governed_by_prefix.status(), Some(201));
    Ok(())
}

// ============================================================================
// SECTION: Scope Semantics
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn principal_without_bindings_is_forbidden_cluster_actions() -> Result<(), Box<dyn std::error::Error>> {
    let (stub, _) = running_platform(PlatformOptions::default(), runtime_grants(&[])?).await?;

    let probe = stub.policy_probe(BOB)?;
    let describe = probe.get(&["kafka", "v3", "clusters", PRIMARY_CLUSTER_ID]).await;
    assert!(describe.is_forbidden(), "{describe:?}");
    let list = stub.connect_client(BOB)?.list_connectors().await;
    assert!(list.is_forbidden(), "{list:?}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cluster_role_applies_only_in_its_scope() -> Result<(), Box<dyn std::error::Error>> {
    let (stub, _) = running_platform(PlatformOptions::default(), runtime_grants(&[])?).await?;
    let mut admin = stub.policy_client()?;
    let primary = admin.resolve_primary_cluster().await?;
    admin
        .grant_role_on_cluster(&bob(), ClusterRole::Operator, ClusterType::Kafka, &primary)
        .await?;

    let probe = stub.policy_probe(BOB)?;
    let describe = probe.get(&["kafka", "v3", "clusters", PRIMARY_CLUSTER_ID]).await;
    assert!(describe.is_authorized(), "{describe:?}");
    let list = stub.connect_client(BOB)?.list_connectors().await;
    assert!(list.is_forbidden(), "{list:?}");
    Ok(())
}

// ============================================================================
// SECTION: Grant Submission
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn granting_twice_keeps_the_outcome_authorized() -> Result<(), Box<dyn std::error::Error>> {
    let (stub, admin) = primary_only().await?;
    for _ in 0..2 {
        admin
            .grant_role_on_kafka_resource(&bob(), ResourceRole::ResourceOwner, ResourceType::Topic, "datagen")
            .await?;
    }

    let probe = stub.policy_probe(BOB)?;
    assert_eq!(describe_topic(&probe, "datagen").await, OutcomeKind::Authorized);
    let stored = stub.platform().bindings().into_iter().filter(|b| b.principal == "User:bob").count();
    assert_eq!(stored, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn mismatched_resource_type_is_never_submitted() -> Result<(), Box<dyn std::error::Error>> {
    let (stub, admin) = primary_only().await?;
    let err = admin
        .grant_role_on_resource(
            &bob(),
            ResourceRole::DeveloperManage,
            ClusterType::Connect,
            &ClusterId::new(CONNECT_CLUSTER_ID)?,
            ResourceType::Topic,
            "datagen",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PolicyError::Binding(BindingError::InvalidResourceType { .. })), "{err}");
    assert!(stub.platform().bindings().is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unresolved_primary_cluster_fails_before_any_request() -> Result<(), Box<dyn std::error::Error>> {
    let (stub, _) = primary_only().await?;
    let unresolved = stub.policy_client()?;
    let err = unresolved
        .grant_role_on_kafka_resource(&bob(), ResourceRole::DeveloperRead, ResourceType::Topic, "foo")
        .await
        .unwrap_err();
    assert!(err.is_scope_resolution(), "{err}");
    assert!(stub.platform().bindings().is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn non_administrator_grant_is_rejected_by_backend() -> Result<(), Box<dyn std::error::Error>> {
    let (stub, _) = primary_only().await?;
    let mut impostor = stub.policy_client_as(BOB)?;
    impostor.resolve_primary_cluster().await?;
    let err = impostor
        .grant_role_on_kafka_resource(&bob(), ResourceRole::ResourceOwner, ResourceType::Topic, "foo")
        .await
        .unwrap_err();
    assert!(matches!(err, PolicyError::AuthorizationBackend { status: 403, .. }), "{err}");
    Ok(())
}
