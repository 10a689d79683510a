// crates/rolebind-bringup/src/coordinator.rs
// ============================================================================
// Module: Bring-up Coordinator
// Description: Starts service groups in dependency order with bounded waits.
// Purpose: Guarantee grant-before-dependent-start and start-before-verify.
// Dependencies: tokio, tracing, rolebind-config
// ============================================================================

//! ## Overview
//! A [`BringUpPlan`] is an ordered list of stages. A group stage starts every
//! service it holds concurrently and completes once all of them are ready. A
//! hook stage runs an async step (usually granting bindings) between groups,
//! after the previous group is ready and before the next one starts.
//!
//! Invariants:
//! - No service in group `n + 1` has `start` invoked before every service in
//!   group `n` reported ready.
//! - Start plus readiness is bounded by the configured timeout per service.
//! - On failure the remaining stages are skipped and nothing is stopped;
//!   teardown is a separate, explicit call.
//!
//! Every start invocation and readiness transition is recorded as a
//! [`BringUpEvent`] so callers can assert ordering after the fact.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use rolebind_config::BringUpConfig;
use rolebind_core::ClusterId;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio::time::timeout;
use tracing::info;
use tracing::warn;

use crate::readiness::Readiness;
use crate::service::ServiceHandle;
use crate::service::ServiceKind;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Bring-up phase recorded for a service or hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BringUpPhase {
    /// `start` was invoked.
    StartInvoked,
    /// Readiness reported ready.
    Ready,
    /// Start failed, readiness failed, or the wait timed out.
    Failed(String),
    /// A hook began running.
    HookStarted,
    /// A hook finished successfully.
    HookCompleted,
}

/// One recorded bring-up transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BringUpEvent {
    /// Service or hook name.
    pub service: String,
    /// Transition.
    pub phase: BringUpPhase,
    /// Monotonic time of the transition.
    pub at: Instant,
}

impl BringUpEvent {
    /// Records a transition at the current instant.
    #[must_use]
    pub fn now(service: impl Into<String>, phase: BringUpPhase) -> Self {
        Self {
            service: service.into(),
            phase,
            at: Instant::now(),
        }
    }
}

/// Snapshot of a ready service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyService {
    /// Service name.
    pub name: String,
    /// Service role.
    pub kind: ServiceKind,
    /// Base HTTP address, when the service exposes one.
    pub base_address: Option<String>,
    /// Cluster id, when known.
    pub cluster_id: Option<ClusterId>,
}

/// Services that are ready so far, in readiness order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadyServices {
    /// Ready services.
    services: Vec<ReadyService>,
}

impl ReadyServices {
    /// Returns the service with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ReadyService> {
        self.services.iter().find(|service| service.name == name)
    }

    /// Returns the first service of the given kind.
    #[must_use]
    pub fn first_of(&self, kind: ServiceKind) -> Option<&ReadyService> {
        self.services.iter().find(|service| service.kind == kind)
    }

    /// Returns the cluster id of the named service.
    #[must_use]
    pub fn cluster_id(&self, name: &str) -> Option<&ClusterId> {
        self.get(name).and_then(|service| service.cluster_id.as_ref())
    }

    /// Iterates over ready services.
    pub fn iter(&self) -> impl Iterator<Item = &ReadyService> {
        self.services.iter()
    }

    /// Returns the number of ready services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true when no service is ready.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Result of a successful bring-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BringUpReport {
    /// Every recorded transition, ordered by time.
    pub events: Vec<BringUpEvent>,
    /// Ready services.
    pub ready: ReadyServices,
}

impl BringUpReport {
    /// Returns when `service` first reached `phase`.
    #[must_use]
    pub fn first(&self, service: &str, phase: &BringUpPhase) -> Option<Instant> {
        first_event(&self.events, service, phase)
    }
}

/// Returns when `service` first reached `phase` in an event list.
fn first_event(events: &[BringUpEvent], service: &str, phase: &BringUpPhase) -> Option<Instant> {
    events.iter().find(|event| event.service == service && &event.phase == phase).map(|e| e.at)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Bring-up errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `events` holds every transition recorded before the failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BringUpError {
    /// A service failed to start or become ready in time.
    #[error("startup failure in {service}: {reason}")]
    StartupFailure {
        /// Failed service name.
        service: String,
        /// Failure reason.
        reason: String,
        /// Transitions recorded so far.
        events: Vec<BringUpEvent>,
    },
    /// A hook between groups failed.
    #[error("bring-up hook {hook} failed: {reason}")]
    HookFailure {
        /// Hook name.
        hook: String,
        /// Failure reason.
        reason: String,
        /// Transitions recorded so far.
        events: Vec<BringUpEvent>,
    },
    /// One or more services failed to stop during teardown.
    #[error("teardown failed for {count} service(s)", count = .failures.len())]
    Teardown {
        /// Service names with the stop error message.
        failures: Vec<(String, String)>,
    },
}

impl BringUpError {
    /// Returns the recorded transitions, if any.
    #[must_use]
    pub fn events(&self) -> &[BringUpEvent] {
        match self {
            Self::StartupFailure {
                events, ..
            }
            | Self::HookFailure {
                events, ..
            } => events,
            Self::Teardown {
                ..
            } => &[],
        }
    }
}

// ============================================================================
// SECTION: Plan
// ============================================================================

/// Boxed future returned by a hook.
pub type HookFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;

/// Hook invoked between groups with the services ready so far.
pub type HookFn = Arc<dyn Fn(ReadyServices) -> HookFuture + Send + Sync>;

/// One plan stage.
#[derive(Clone)]
enum Stage {
    /// Services started concurrently.
    Group(Vec<Arc<dyn ServiceHandle>>),
    /// Async step between groups.
    Hook {
        /// Hook name for events and errors.
        name: String,
        /// Hook body.
        run: HookFn,
    },
}

/// Ordered bring-up stages.
#[derive(Clone, Default)]
pub struct BringUpPlan {
    /// Stages in execution order.
    stages: Vec<Stage>,
}

impl std::fmt::Debug for BringUpPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for stage in &self.stages {
            match stage {
                Stage::Group(services) => {
                    let names: Vec<&str> = services.iter().map(|service| service.name()).collect();
                    list.entry(&names);
                }
                Stage::Hook {
                    name, ..
                } => {
                    list.entry(&format!("hook:{name}"));
                }
            }
        }
        list.finish()
    }
}

impl BringUpPlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a group of mutually independent services.
    #[must_use]
    pub fn group<I>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ServiceHandle>>,
    {
        let services: Vec<_> = services.into_iter().collect();
        if !services.is_empty() {
            self.stages.push(Stage::Group(services));
        }
        self
    }

    /// Appends a hook that runs after every earlier group is ready.
    #[must_use]
    pub fn then_hook<F, Fut>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(ReadyServices) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let run: HookFn = Arc::new(move |ready| -> HookFuture { Box::pin(hook(ready)) });
        self.stages.push(Stage::Hook {
            name: name.into(),
            run,
        });
        self
    }

    /// Iterates over every service in start order.
    pub fn services(&self) -> impl Iterator<Item = &Arc<dyn ServiceHandle>> {
        self.stages.iter().flat_map(|stage| match stage {
            Stage::Group(services) => services.as_slice(),
            Stage::Hook {
                ..
            } => &[][..],
        })
    }

    /// Returns the number of group stages.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.stages.iter().filter(|stage| matches!(stage, Stage::Group(_))).count()
    }
}

// ============================================================================
// SECTION: Coordinator
// ============================================================================

/// Bounds applied while waiting for readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Maximum wait for one service, from the start invocation until ready.
    pub ready_timeout: Duration,
    /// Delay between readiness polls.
    pub poll_interval: Duration,
}

impl From<&BringUpConfig> for CoordinatorConfig {
    fn from(config: &BringUpConfig) -> Self {
        Self {
            ready_timeout: config.ready_timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// Outcome of bringing up a single service.
struct ServiceRun {
    /// Service name.
    name: String,
    /// Transitions recorded by the task.
    events: Vec<BringUpEvent>,
    /// Failure time and reason, if any.
    failure: Option<(Instant, String)>,
}

/// Dependency-ordered service starter.
#[derive(Debug, Clone, Copy)]
pub struct Coordinator {
    /// Readiness bounds.
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Creates a coordinator.
    #[must_use]
    pub const fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
        }
    }

    /// Runs every stage of the plan in order.
    ///
    /// # Errors
    ///
    /// Returns [`BringUpError::StartupFailure`] for the earliest failed
    /// service in a group and [`BringUpError::HookFailure`] for a failed hook.
    /// Remaining stages are skipped; started services keep running.
    pub async fn run(&self, plan: &BringUpPlan) -> Result<BringUpReport, BringUpError> {
        let mut events = Vec::new();
        let mut ready = ReadyServices::default();
        for (index, stage) in plan.stages.iter().enumerate() {
            match stage {
                Stage::Group(services) => {
                    info!(group = index, services = services.len(), "starting service group");
                    self.run_group(services, &mut events, &mut ready).await?;
                    info!(group = index, "service group ready");
                }
                Stage::Hook {
                    name,
                    run,
                } => {
                    events.push(BringUpEvent::now(name.clone(), BringUpPhase::HookStarted));
                    if let Err(reason) = run(ready.clone()).await {
                        warn!(hook = %name, %reason, "bring-up hook failed");
                        events.push(BringUpEvent::now(name.clone(), BringUpPhase::Failed(reason.clone())));
                        return Err(BringUpError::HookFailure {
                            hook: name.clone(),
                            reason,
                            events,
                        });
                    }
                    events.push(BringUpEvent::now(name.clone(), BringUpPhase::HookCompleted));
                }
            }
        }
        Ok(BringUpReport {
            events,
            ready,
        })
    }

    /// Starts one group concurrently and waits for every member.
    async fn run_group(
        &self,
        services: &[Arc<dyn ServiceHandle>],
        events: &mut Vec<BringUpEvent>,
        ready: &mut ReadyServices,
    ) -> Result<(), BringUpError> {
        let mut tasks = JoinSet::new();
        let mut names = HashMap::new();
        for service in services {
            let handle = Arc::clone(service);
            let config = self.config;
            let abort = tasks.spawn(async move { bring_up_service(handle.as_ref(), config).await });
            names.insert(abort.id(), service.name().to_string());
        }

        let mut failures: Vec<(Instant, String, String)> = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, run)) => {
                    if let Some((at, reason)) = run.failure {
                        failures.push((at, run.name, reason));
                    }
                    events.extend(run.events);
                }
                Err(err) => {
                    let name = names.get(&err.id()).cloned().unwrap_or_default();
                    let reason = format!("bring-up task aborted: {err}");
                    let event = BringUpEvent::now(name.clone(), BringUpPhase::Failed(reason.clone()));
                    failures.push((event.at, name, reason));
                    events.push(event);
                }
            }
        }
        events.sort_by_key(|event| event.at);

        if let Some((_, service, reason)) = failures.into_iter().min_by_key(|failure| failure.0) {
            warn!(%service, %reason, "service failed to come up");
            return Err(BringUpError::StartupFailure {
                service,
                reason,
                events: events.clone(),
            });
        }

        for service in services {
            ready.services.push(ReadyService {
                name: service.name().to_string(),
                kind: service.kind(),
                base_address: service.base_address(),
                cluster_id: service.cluster_id(),
            });
        }
        Ok(())
    }

    /// Stops every service in reverse start order.
    ///
    /// Every service is asked to stop even when an earlier stop fails.
    ///
    /// # Errors
    ///
    /// Returns [`BringUpError::Teardown`] listing the services that failed.
    pub async fn teardown(&self, plan: &BringUpPlan) -> Result<(), BringUpError> {
        let services: Vec<&Arc<dyn ServiceHandle>> = plan.services().collect();
        let mut failures = Vec::new();
        for service in services.into_iter().rev() {
            if let Err(err) = service.stop().await {
                warn!(service = service.name(), error = %err, "service stop failed");
                failures.push((service.name().to_string(), err.to_string()));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(BringUpError::Teardown {
                failures,
            })
        }
    }
}

/// Starts one service and waits for readiness within the configured bound.
///
/// The bound runs from the start invocation, so a `start` call that never
/// returns fails the service like a readiness wait that never ends.
async fn bring_up_service(service: &dyn ServiceHandle, config: CoordinatorConfig) -> ServiceRun {
    let name = service.name().to_string();
    let mut events = vec![BringUpEvent::now(name.clone(), BringUpPhase::StartInvoked)];
    let started = Instant::now();
    let start_failure = match timeout(config.ready_timeout, service.start()).await {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err.to_string()),
        Err(_) => Some(format!("start did not return within {} ms", config.ready_timeout.as_millis())),
    };
    if let Some(reason) = start_failure {
        let event = BringUpEvent::now(name.clone(), BringUpPhase::Failed(reason.clone()));
        let at = event.at;
        events.push(event);
        return ServiceRun {
            name,
            events,
            failure: Some((at, reason)),
        };
    }

    let mut polls = 0u32;
    let failure = loop {
        polls = polls.saturating_add(1);
        let remaining = config.ready_timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            break Some(format!(
                "not ready after {} ms ({polls} polls)",
                config.ready_timeout.as_millis()
            ));
        }
        match timeout(remaining, service.readiness()).await {
            Ok(Readiness::Ready) => break None,
            Ok(Readiness::Failed(reason)) => break Some(reason),
            Ok(Readiness::Starting) => {
                let pause = config.poll_interval.min(config.ready_timeout.saturating_sub(started.elapsed()));
                sleep(pause).await;
            }
            Err(_) => {
                break Some(format!(
                    "readiness probe did not answer within {} ms",
                    config.ready_timeout.as_millis()
                ));
            }
        }
    };

    let failure = match failure {
        None => {
            info!(service = %name, kind = %service.kind(), polls, "service ready");
            events.push(BringUpEvent::now(name.clone(), BringUpPhase::Ready));
            None
        }
        Some(reason) => {
            let event = BringUpEvent::now(name.clone(), BringUpPhase::Failed(reason.clone()));
            let at = event.at;
            events.push(event);
            Some((at, reason))
        }
    };
    ServiceRun {
        name,
        events,
        failure,
    }
}
