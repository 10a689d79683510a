// system-tests/tests/helpers/services.rs
// ============================================================================
// Module: Stub Services
// Description: Service handles and client factories over the stub platform.
// Purpose: Drive the real coordinator and clients against in-process stubs.
// Dependencies: async-trait, rolebind-bringup, rolebind-policy, rolebind-verify
// ============================================================================

//! ## Overview
//! [`StubPlatform`] owns the four stub servers of a scenario and hands out
//! service handles for the coordinator plus clients for each principal.
//! [`StubService`] starts a platform component and reports readiness through
//! the same HTTP probes used against real services; a component that refused
//! to boot reports the refusal instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rolebind_bringup::BringUpPlan;
use rolebind_bringup::BringUpReport;
use rolebind_bringup::ClusterIdSource;
use rolebind_bringup::Coordinator;
use rolebind_bringup::CoordinatorConfig;
use rolebind_bringup::HttpProbe;
use rolebind_bringup::HttpService;
use rolebind_bringup::ProbeCredentials;
use rolebind_bringup::Readiness;
use rolebind_bringup::ReadyServices;
use rolebind_bringup::ServiceError;
use rolebind_bringup::ServiceHandle;
use rolebind_bringup::ServiceKind;
use rolebind_config::SecretString;
use rolebind_core::ClusterId;
use rolebind_core::ClusterRole;
use rolebind_core::Principal;
use rolebind_core::wire::METADATA_ID_PATH;
use rolebind_policy::AdminCredentials;
use rolebind_policy::GrantPlan;
use rolebind_policy::PolicyClient;
use rolebind_policy::PolicyClientConfig;
use rolebind_verify::BasicCredentials;
use rolebind_verify::ConnectClient;
use rolebind_verify::PollPolicy;
use rolebind_verify::RegistryClient;
use rolebind_verify::RestProbe;
use rolebind_verify::RestProxyConsumer;

use super::connect_stub::spawn_connect_stub;
use super::platform::ADMIN;
use super::platform::BootState;
use super::platform::CONNECT_CLUSTER_ID;
use super::platform::CONNECT_PRINCIPAL;
use super::platform::Component;
use super::platform::Platform;
use super::platform::PlatformOptions;
use super::platform::REGISTRY_CLUSTER_ID;
use super::platform::REGISTRY_PRINCIPAL;
use super::platform::secret_for;
use super::policy_stub::spawn_policy_stub;
use super::registry_stub::spawn_registry_stub;
use super::rest_proxy_stub::spawn_rest_proxy_stub;
use super::server::StubServer;
use super::timeouts::resolve_timeout;

/// Per-request timeout for clients and probes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SECTION: Service Handle
// ============================================================================

/// Platform component observed over its stub HTTP surface.
pub struct StubService {
    /// Shared platform.
    platform: Platform,
    /// Component started by this handle.
    component: Component,
    /// HTTP readiness; absent for components without an HTTP surface.
    http: Option<HttpService>,
    /// Name reported when there is no HTTP surface.
    name: &'static str,
}

impl StubService {
    /// Identity store handle; ready as soon as it is started.
    pub const fn identity_store(platform: Platform) -> Self {
        Self {
            platform,
            component: Component::IdentityStore,
            http: None,
            name: "identity-store",
        }
    }

    fn with_http(platform: Platform, component: Component, http: HttpService) -> Self {
        Self {
            platform,
            component,
            http: Some(http),
            name: "",
        }
    }
}

#[async_trait]
impl ServiceHandle for StubService {
    fn name(&self) -> &str {
        self.http.as_ref().map_or(self.name, |http| http.name())
    }

    fn kind(&self) -> ServiceKind {
        self.http.as_ref().map_or(ServiceKind::IdentityStore, ServiceHandle::kind)
    }

    async fn start(&self) -> Result<(), ServiceError> {
        self.platform.start(self.component);
        Ok(())
    }

    async fn readiness(&self) -> Readiness {
        match self.platform.boot_state(self.component) {
            BootState::Failed(reason) => Readiness::Failed(reason),
            BootState::Down => Readiness::Starting,
            BootState::Booting {
                ..
            }
            | BootState::Up => match &self.http {
                Some(http) => http.readiness().await,
                None => Readiness::Ready,
            },
        }
    }

    fn base_address(&self) -> Option<String> {
        self.http.as_ref().and_then(ServiceHandle::base_address)
    }

    fn cluster_id(&self) -> Option<ClusterId> {
        self.http.as_ref().and_then(ServiceHandle::cluster_id)
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        self.platform.stop(self.component);
        Ok(())
    }
}

// ============================================================================
// SECTION: Platform Fixture
// ============================================================================

/// Service handles for one scenario.
pub struct StubServices {
    /// Identity store.
    pub identity: Arc<dyn ServiceHandle>,
    /// Primary cluster serving the policy endpoint.
    pub primary: Arc<dyn ServiceHandle>,
    /// Connector runtime.
    pub connect: Arc<dyn ServiceHandle>,
    /// Schema registry.
    pub registry: Arc<dyn ServiceHandle>,
}

/// In-process platform with live stub servers.
pub struct StubPlatform {
    /// Shared state.
    platform: Platform,
    /// Policy endpoint and primary cluster surface.
    policy: StubServer,
    /// Connector runtime surface.
    connect: StubServer,
    /// Schema registry surface.
    registry: StubServer,
    /// REST proxy consumer surface.
    rest_proxy: StubServer,
}

impl StubPlatform {
    /// Starts the stub servers. Every component starts down.
    pub fn start(options: PlatformOptions) -> Result<Self, String> {
        let platform = Platform::new(options);
        Ok(Self {
            policy: spawn_policy_stub(platform.clone())?,
            connect: spawn_connect_stub(platform.clone())?,
            registry: spawn_registry_stub(platform.clone())?,
            rest_proxy: spawn_rest_proxy_stub(platform.clone())?,
            platform,
        })
    }

    /// Returns the shared state.
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Returns the policy endpoint base URL.
    pub fn policy_url(&self) -> &str {
        self.policy.base_url()
    }

    /// Returns the connector runtime base URL.
    pub fn connect_url(&self) -> &str {
        self.connect.base_url()
    }

    /// Builds fresh service handles.
    pub fn services(&self) -> Result<StubServices, String> {
        let primary_probe = HttpProbe::new(METADATA_ID_PATH, REQUEST_TIMEOUT)
            .map_err(|err| err.to_string())?
            .with_credentials(probe_credentials(ADMIN));
        let primary = HttpService::new(
            "primary-cluster",
            ServiceKind::PrimaryCluster,
            self.policy.base_url(),
            primary_probe,
        )
        .with_cluster_id_source(ClusterIdSource::Discover {
            path: METADATA_ID_PATH.to_string(),
        });

        let connect_probe = HttpProbe::new("/", REQUEST_TIMEOUT)
            .map_err(|err| err.to_string())?
            .accept_auth_challenge(true);
        let connect_id = ClusterId::new(CONNECT_CLUSTER_ID).map_err(|err| err.to_string())?;
        let connect = HttpService::new(
            "connect",
            ServiceKind::ConnectRuntime,
            self.connect.base_url(),
            connect_probe,
        )
        .with_cluster_id_source(ClusterIdSource::Fixed(connect_id));

        let registry_probe = HttpProbe::new("/", REQUEST_TIMEOUT)
            .map_err(|err| err.to_string())?
            .with_credentials(probe_credentials(REGISTRY_PRINCIPAL));
        let registry = HttpService::new(
            "schema-registry",
            ServiceKind::SchemaRegistry,
            self.registry.base_url(),
            registry_probe,
        )
        .with_cluster_id_source(ClusterIdSource::Discover {
            path: METADATA_ID_PATH.to_string(),
        });

        Ok(StubServices {
            identity: Arc::new(StubService::identity_store(self.platform.clone())),
            primary: Arc::new(StubService::with_http(self.platform.clone(), Component::Primary, primary)),
            connect: Arc::new(StubService::with_http(self.platform.clone(), Component::Connect, connect)),
            registry: Arc::new(StubService::with_http(
                self.platform.clone(),
                Component::Registry,
                registry,
            )),
        })
    }

    /// Builds the standard plan: identity store, primary cluster, runtime
    /// grants, then both runtimes together.
    pub fn bring_up_plan(&self, runtime_grants: GrantPlan) -> Result<BringUpPlan, String> {
        let services = self.services()?;
        let admin = self.policy_client()?;
        let grants = Arc::new(runtime_grants);
        Ok(BringUpPlan::new()
            .group([services.identity])
            .group([services.primary])
            .then_hook("runtime-grants", move |ready: ReadyServices| {
                let admin = admin.clone();
                let grants = Arc::clone(&grants);
                async move {
                    let primary = ready
                        .first_of(ServiceKind::PrimaryCluster)
                        .and_then(|service| service.cluster_id.clone())
                        .ok_or_else(|| "primary cluster id is unknown".to_string())?;
                    let admin = admin.with_primary_cluster(primary);
                    grants.apply(&admin).await.map(|_| ()).map_err(|err| err.to_string())
                }
            })
            .group([services.connect, services.registry]))
    }

    /// Returns an administrator policy client without a primary cluster id.
    pub fn policy_client(&self) -> Result<PolicyClient, String> {
        self.policy_client_as(ADMIN)
    }

    /// Returns a policy client submitting grants as `user`.
    pub fn policy_client_as(&self, user: &str) -> Result<PolicyClient, String> {
        PolicyClient::new(PolicyClientConfig {
            base_url: self.policy.base_url().to_string(),
            admin: AdminCredentials {
                principal: user.to_string(),
                secret: SecretString::new(secret_for(user)),
            },
            request_timeout: REQUEST_TIMEOUT,
        })
        .map_err(|err| err.to_string())
    }

    /// Returns an administrator policy client with the primary cluster resolved.
    pub async fn resolved_policy_client(&self) -> Result<PolicyClient, String> {
        let mut client = self.policy_client()?;
        client.resolve_primary_cluster().await.map_err(|err| err.to_string())?;
        Ok(client)
    }

    /// Returns a connector runtime client authenticating as `user`.
    pub fn connect_client(&self, user: &str) -> Result<ConnectClient, String> {
        Ok(ConnectClient::new(rest_probe(self.connect.base_url(), user)?))
    }

    /// Returns a registry client authenticating as `user`.
    pub fn registry_client(&self, user: &str) -> Result<RegistryClient, String> {
        Ok(RegistryClient::new(rest_probe(self.registry.base_url(), user)?))
    }

    /// Returns a REST proxy consumer authenticating as `user`.
    pub fn consumer(&self, user: &str) -> Result<RestProxyConsumer, String> {
        Ok(RestProxyConsumer::new(rest_probe(self.rest_proxy.base_url(), user)?))
    }

    /// Returns a raw REST probe against the policy endpoint as `user`.
    pub fn policy_probe(&self, user: &str) -> Result<RestProbe, String> {
        rest_probe(self.policy.base_url(), user)
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Bindings both runtimes need before they can boot.
///
/// The connector runtime principal gets `SecurityAdmin` plus
/// `status_visibility_roles` on the runtime cluster.
pub fn runtime_grants(status_visibility_roles: &[ClusterRole]) -> Result<GrantPlan, String> {
    runtime_grants_with_topics(status_visibility_roles, &[])
}

/// Runtime bindings where the connector runtime also owns `data_topics`.
pub fn runtime_grants_with_topics(
    status_visibility_roles: &[ClusterRole],
    data_topics: &[&str],
) -> Result<GrantPlan, String> {
    let connect_principal = Principal::user(CONNECT_PRINCIPAL).map_err(|err| err.to_string())?;
    let registry_principal = Principal::user(REGISTRY_PRINCIPAL).map_err(|err| err.to_string())?;
    let connect_id = ClusterId::new(CONNECT_CLUSTER_ID).map_err(|err| err.to_string())?;
    let registry_id = ClusterId::new(REGISTRY_CLUSTER_ID).map_err(|err| err.to_string())?;
    Ok(GrantPlan::connect_runtime(&connect_principal, &connect_id, status_visibility_roles, data_topics)
        .extend(GrantPlan::schema_registry_runtime(&registry_principal, &registry_id, None)))
}

/// Starts a stub platform and brings every service up through the coordinator.
pub async fn running_platform(
    options: PlatformOptions,
    grants: GrantPlan,
) -> Result<(StubPlatform, BringUpReport), String> {
    let stub = StubPlatform::start(options)?;
    let plan = stub.bring_up_plan(grants)?;
    let report = Coordinator::new(coordinator_config()).run(&plan).await.map_err(|err| err.to_string())?;
    Ok((stub, report))
}

/// Coordinator bounds for stub scenarios.
pub fn coordinator_config() -> CoordinatorConfig {
    CoordinatorConfig {
        ready_timeout: resolve_timeout(Duration::from_secs(10)),
        poll_interval: Duration::from_millis(20),
    }
}

/// Status polling tuned for in-process stubs.
pub const fn fast_poll(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(200),
    }
}

fn probe_credentials(user: &str) -> ProbeCredentials {
    ProbeCredentials {
        username: user.to_string(),
        secret: SecretString::new(secret_for(user)),
    }
}

fn rest_probe(base_url: &str, user: &str) -> Result<RestProbe, String> {
    RestProbe::new(base_url, BasicCredentials::new(user, secret_for(user)), REQUEST_TIMEOUT)
        .map_err(|err| err.to_string())
}
