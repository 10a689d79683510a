// system-tests/tests/suites/bringup.rs
// ============================================================================
// Module: Bring-Up Tests
// Description: Dependency ordering, failure propagation, and teardown.
// Purpose: Validate the coordinator against slow and failing stub services.
// Dependencies: system-tests helpers
// ============================================================================

//! Bring-up system tests.

use std::time::Duration;

use rolebind_bringup::BringUpError;
use rolebind_bringup::BringUpPhase;
use rolebind_bringup::Coordinator;
use rolebind_core::ClusterId;
use rolebind_core::ClusterType;
use rolebind_core::Principal;
use rolebind_core::ResourceRole;
use rolebind_core::ResourceType;
use rolebind_policy::GrantIntent;
use rolebind_policy::GrantPlan;

use crate::helpers;
use helpers::logging::init_test_tracing;
use helpers::platform::BOB;
use helpers::platform::BootState;
use helpers::platform::CONNECT_CLUSTER_ID;
use helpers::platform::Component;
use helpers::platform::PRIMARY_CLUSTER_ID;
use helpers::platform::PlatformOptions;
use helpers::platform::REGISTRY_CLUSTER_ID;
use helpers::platform::REGISTRY_PRINCIPAL;
use helpers::services::StubPlatform;
use helpers::services::coordinator_config;
use helpers::services::running_platform;
use helpers::services::runtime_grants;

const HOOK: &str = "runtime-grants";

#[tokio::test(flavor = "multi_thread")]
async fn dependents_start_after_slow_primary_is_ready() -> Result<(), Box<dyn std::error::Error>> {
    init_test_tracing();
    let options = PlatformOptions {
        primary_boot_delay: Duration::from_millis(300),
        ..PlatformOptions::default()
    };
    let (_stub, report) = running_platform(options, runtime_grants(&[])?).await?;

    let identity_ready = report.first("identity-store", &BringUpPhase::Ready).expect("identity ready");
    let primary_start = report.first("primary-cluster", &BringUpPhase::StartInvoked).expect("primary start");
    let primary_ready = report.first("primary-cluster", &BringUpPhase::Ready).expect("primary ready");
    assert!(primary_start >= identity_ready);
    assert!(primary_ready.duration_since(primary_start) >= Duration::from_millis(300));

    let hook_started = report.first(HOOK, &BringUpPhase::HookStarted).expect("hook started");
    let hook_completed = report.first(HOOK, &BringUpPhase::HookCompleted).expect("hook completed");
    assert!(hook_started >= primary_ready);
    for dependent in ["connect", "schema-registry"] {
        let started = report.first(dependent, &BringUpPhase::StartInvoked).expect("dependent start");
        assert!(started >= primary_ready, "{dependent} started before the primary cluster was ready");
        assert!(started >= hook_completed, "{dependent} started before runtime grants were applied");
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn ready_services_carry_cluster_ids() -> Result<(), Box<dyn std::error::Error>> {
    init_test_tracing();
    let (_stub, report) = running_platform(PlatformOptions::default(), runtime_grants(&[])?).await?;

    let id = |name: &str| report.ready.cluster_id(name).map(|id| id.as_str().to_string());
    assert_eq!(id("primary-cluster").as_deref(), Some(PRIMARY_CLUSTER_ID));
    assert_eq!(id("connect").as_deref(), Some(CONNECT_CLUSTER_ID));
    assert_eq!(id("schema-registry").as_deref(), Some(REGISTRY_CLUSTER_ID));
    assert!(report.ready.get("identity-store").is_some());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn runtime_without_internal_bindings_is_a_startup_failure() -> Result<(), Box<dyn std::error::Error>> {
    init_test_tracing();
    let stub = StubPlatform::start(PlatformOptions::default())?;
    let registry_only = GrantPlan::schema_registry_runtime(
        &Principal::user(REGISTRY_PRINCIPAL)?,
        &ClusterId::new(REGISTRY_CLUSTER_ID)?,
        None,
    );
    let plan = stub.bring_up_plan(registry_only)?;
    let coordinator = Coordinator::new(coordinator_config());

    let err = coordinator.run(&plan).await.unwrap_err();
    let BringUpError::StartupFailure {
        service,
        reason,
        events,
    } = &err
    else {
        panic!("expected startup failure, got {err}");
    };
    assert_eq!(service, "connect");
    assert!(reason.contains("User:connect-principal"), "{reason}");
    assert!(events.iter().any(|event| event.service == "connect"
        && matches!(event.phase, BringUpPhase::Failed(_))));

    coordinator.teardown(&plan).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_runtime_grant_stops_before_dependents() -> Result<(), Box<dyn std::error::Error>> {
    init_test_tracing();
    let stub = StubPlatform::start(PlatformOptions::default())?;
    let invalid = GrantPlan::new().push(GrantIntent::Resource {
        principal: Principal::user(BOB)?,
        role: ResourceRole::DeveloperManage,
        cluster_type: ClusterType::Connect,
        cluster_id: ClusterId::new(CONNECT_CLUSTER_ID)?,
        resource_type: ResourceType::Topic,
        name: "datagen".to_string(),
    });
    let plan = stub.bring_up_plan(invalid)?;

    let err = Coordinator::new(coordinator_config()).run(&plan).await.unwrap_err();
    assert!(matches!(&err, BringUpError::HookFailure { hook, .. } if hook == HOOK), "{err}");
    assert!(!err.events().iter().any(|event| event.service == "connect"));
    assert_eq!(stub.platform().boot_state(Component::Connect), BootState::Down);
    assert!(stub.platform().bindings().is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn teardown_stops_every_service() -> Result<(), Box<dyn std::error::Error>> {
    init_test_tracing();
    let stub = StubPlatform::start(PlatformOptions::default())?;
    let plan = stub.bring_up_plan(runtime_grants(&[])?)?;
    let coordinator = Coordinator::new(coordinator_config());
    coordinator.run(&plan).await?;
    assert!(stub.platform().is_up(Component::Connect));

    coordinator.teardown(&plan).await?;
    for component in [Component::IdentityStore, Component::Primary, Component::Connect, Component::Registry] {
        assert_eq!(stub.platform().boot_state(component), BootState::Down, "{component:?}");
    }
    Ok(())
}
