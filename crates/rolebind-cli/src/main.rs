// crates/rolebind-cli/src/main.rs
// ============================================================================
// Module: Rolebind CLI Entry Point
// Description: Command dispatcher for binding grants and verification probes.
// Purpose: Drive the policy endpoint and verification clients by hand.
// Dependencies: clap, rolebind-config, rolebind-policy, rolebind-verify, tokio
// ============================================================================

//! ## Overview
//! `rolebind` resolves the primary cluster id, grants role bindings as the
//! configured administrator, applies the `[[grants]]` plan from a harness
//! config, probes a service as a given principal, and consumes a topic
//! through a REST proxy consumer group to check that data is observed. Every
//! command writes a single JSON document to stdout; diagnostics go to stderr.
//!
//! Security posture: secrets are read from the config file or environment,
//! never from command-line arguments, and never written to output.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod observability;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use rolebind_config::HarnessConfig;
use rolebind_config::VerifyConfig;
use rolebind_config::read_env_nonempty;
use rolebind_core::ClusterId;
use rolebind_core::ClusterRole;
use rolebind_core::ClusterType;
use rolebind_core::Principal;
use rolebind_core::ResourcePattern;
use rolebind_core::ResourceRole;
use rolebind_core::ResourceType;
use rolebind_policy::GrantIntent;
use rolebind_policy::GrantPlan;
use rolebind_policy::PolicyClient;
use rolebind_policy::PolicyClientConfig;
use rolebind_verify::BasicCredentials;
use rolebind_verify::ConsumeOutcome;
use rolebind_verify::ConsumerSpec;
use rolebind_verify::Outcome;
use rolebind_verify::OutcomeKind;
use rolebind_verify::PollPolicy;
use rolebind_verify::RecordFormat;
use rolebind_verify::RestProbe;
use rolebind_verify::RestProxyConsumer;
use rolebind_verify::TEST_CONSUMER_GROUP;
use rolebind_verify::consume_until;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::observability::init_tracing;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the probe principal's password by default.
const DEFAULT_PROBE_SECRET_ENV: &str = "ROLEBIND_PROBE_SECRET";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "rolebind", version, disable_help_subcommand = true)]
struct Cli {
    /// Harness configuration file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "info", value_name = "FILTER")]
    log: String,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the primary cluster id.
    ClusterId,
    /// Grant a cluster-level role.
    GrantCluster(GrantClusterCommand),
    /// Grant a resource-level role on one resource or prefix.
    GrantResource(GrantResourceCommand),
    /// Apply the `[[grants]]` plan from the config file.
    Apply(ApplyCommand),
    /// Call a service as a principal and report the outcome.
    Probe(ProbeCommand),
    /// Consume a topic through a REST proxy as a principal.
    Consume(ConsumeCommand),
}

/// Arguments for `grant-cluster`.
#[derive(Args, Debug)]
struct GrantClusterCommand {
    /// Principal, `User:name` or `Group:name`.
    #[arg(long)]
    principal: Principal,
    /// Cluster role name.
    #[arg(long)]
    role: ClusterRole,
    /// Cluster type wire key.
    #[arg(long, default_value = "kafka-cluster")]
    cluster_type: ClusterType,
    /// Cluster id; defaults to the primary id for `kafka-cluster`.
    #[arg(long)]
    cluster_id: Option<ClusterId>,
}

/// Arguments for `grant-resource`.
#[derive(Args, Debug)]
struct GrantResourceCommand {
    /// Principal, `User:name` or `Group:name`.
    #[arg(long)]
    principal: Principal,
    /// Resource role name.
    #[arg(long)]
    role: ResourceRole,
    /// Resource type (`Topic`, `Group`, `Connector`, `Subject`, ...).
    #[arg(long)]
    resource_type: ResourceType,
    /// Resource name, or prefix with `--prefixed`.
    #[arg(long)]
    name: String,
    /// Match every resource sharing the name as prefix.
    #[arg(long)]
    prefixed: bool,
    /// Id of the owning cluster when it is not the primary cluster.
    #[arg(long)]
    cluster_id: Option<ClusterId>,
}

/// Arguments for `apply`.
#[derive(Args, Debug)]
struct ApplyCommand {
    /// Print the plan instead of submitting it.
    #[arg(long)]
    dry_run: bool,
}

/// HTTP method for `probe`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ProbeMethod {
    /// GET.
    Get,
    /// DELETE.
    Delete,
}

/// Expected outcome class for `probe`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ExpectArg {
    /// 2xx.
    Authorized,
    /// 401 or 403.
    Forbidden,
}

impl ExpectArg {
    /// Returns the outcome class this expectation requires.
    const fn kind(self) -> OutcomeKind {
        match self {
            Self::Authorized => OutcomeKind::Authorized,
            Self::Forbidden => OutcomeKind::Forbidden,
        }
    }
}

/// Arguments for `probe`.
#[derive(Args, Debug)]
struct ProbeCommand {
    /// Service base URL.
    #[arg(long)]
    url: String,
    /// Account name to authenticate as.
    #[arg(long)]
    user: String,
    /// Environment variable holding the account password.
    #[arg(long, default_value = DEFAULT_PROBE_SECRET_ENV)]
    secret_env: String,
    /// HTTP method.
    #[arg(long, value_enum, default_value = "get")]
    method: ProbeMethod,
    /// Fail unless the outcome has this class.
    #[arg(long, value_enum)]
    expect: Option<ExpectArg>,
    /// Path segments, for example `connectors datagen status`.
    #[arg(required = true, num_args = 1..)]
    path: Vec<String>,
}

/// Record format for `consume`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    /// Avro through the schema registry.
    Avro,
    /// Plain JSON.
    Json,
    /// Base64 bytes.
    Binary,
}

impl From<FormatArg> for RecordFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Avro => Self::Avro,
            FormatArg::Json => Self::Json,
            FormatArg::Binary => Self::Binary,
        }
    }
}

/// Expected result for `consume`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ConsumeExpectArg {
    /// Enough records arrived.
    Data,
    /// 401 or 403 at any step.
    Forbidden,
}

impl ConsumeExpectArg {
    /// Returns the result label this expectation requires.
    const fn label(self) -> &'static str {
        match self {
            Self::Data => "data_observed",
            Self::Forbidden => "forbidden",
        }
    }

    /// Returns true when `outcome` satisfies the expectation.
    const fn matches(self, outcome: &ConsumeOutcome) -> bool {
        match self {
            Self::Data => outcome.is_data_observed(),
            Self::Forbidden => outcome.is_forbidden(),
        }
    }
}

/// Arguments for `consume`.
#[derive(Args, Debug)]
struct ConsumeCommand {
    /// REST proxy base URL.
    #[arg(long)]
    url: String,
    /// Account name to authenticate as.
    #[arg(long)]
    user: String,
    /// Environment variable holding the account password.
    #[arg(long, default_value = DEFAULT_PROBE_SECRET_ENV)]
    secret_env: String,
    /// Consumer group to join.
    #[arg(long, default_value = TEST_CONSUMER_GROUP)]
    group: String,
    /// Topic to read.
    #[arg(long)]
    topic: String,
    /// Embedded record format.
    #[arg(long, value_enum, default_value = "avro")]
    format: FormatArg,
    /// Records that must arrive before data counts as observed.
    #[arg(long, default_value_t = 1)]
    min_records: usize,
    /// Fail unless the result has this class.
    #[arg(long, value_enum)]
    expect: Option<ConsumeExpectArg>,
}

// ============================================================================
// SECTION: Output Types
// ============================================================================

/// `cluster-id` output.
#[derive(Debug, Serialize)]
struct ClusterIdOutput {
    /// Primary cluster id.
    cluster_id: String,
}

/// `grant-cluster` and `grant-resource` output.
#[derive(Debug, Serialize)]
struct GrantOutput {
    /// Granted principal.
    principal: String,
    /// Granted role.
    role: String,
}

/// `apply` output.
#[derive(Debug, Serialize)]
struct ApplyOutput<'a> {
    /// Number of grants submitted.
    applied: usize,
    /// Plan content, only on dry runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'a [GrantIntent]>,
}

/// `probe` output.
#[derive(Debug, Serialize)]
struct ProbeOutput {
    /// Principal the call authenticated as.
    principal: String,
    /// Outcome class.
    outcome: OutcomeKind,
    /// HTTP status, absent on transport errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    /// Response body as JSON when it parses, else as text.
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    /// Transport failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ProbeOutput {
    /// Builds the report for one outcome.
    fn from_outcome(principal: &str, outcome: &Outcome) -> Self {
        let body = outcome.response().filter(|response| !response.body.is_empty()).map(|response| {
            serde_json::from_str(&response.body).unwrap_or_else(|_| Value::String(response.body.clone()))
        });
        let error = match outcome {
            Outcome::TransportError(message) => Some(message.clone()),
            Outcome::Authorized(_) | Outcome::Forbidden(_) | Outcome::Unexpected(_) => None,
        };
        Self {
            principal: principal.to_string(),
            outcome: outcome.kind(),
            status: outcome.status(),
            body,
            error,
        }
    }
}

/// `consume` output.
#[derive(Debug, Serialize)]
struct ConsumeOutput {
    /// Principal the consumer authenticated as.
    principal: String,
    /// Consumer group joined.
    group: String,
    /// Topic read.
    topic: String,
    /// Result class.
    outcome: &'static str,
    /// Records observed.
    records: usize,
    /// HTTP status that ended the check, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    /// Transport failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ConsumeOutput {
    /// Builds the report for one consumer-side check.
    fn from_outcome(principal: &str, spec: &ConsumerSpec, outcome: &ConsumeOutcome) -> Self {
        let (records, status, error) = match outcome {
            ConsumeOutcome::DataObserved(records) => (records.len(), None, None),
            ConsumeOutcome::NoData {
                observed,
            } => (*observed, None, None),
            ConsumeOutcome::Forbidden(status) => (0, Some(*status), None),
            ConsumeOutcome::Unexpected(response) => (0, Some(response.status), None),
            ConsumeOutcome::TransportError(message) => (0, None, Some(message.clone())),
        };
        Self {
            principal: principal.to_string(),
            group: spec.group.clone(),
            topic: spec.topic.clone(),
            outcome: outcome.label(),
            records,
            status,
            error,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log);
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            warn!(error = %err, "command failed");
            emit_error(&err.to_string())
        }
    }
}

/// Executes the command dispatcher.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::ClusterId => command_cluster_id(config_path).await,
        Commands::GrantCluster(command) => command_grant_cluster(config_path, command).await,
        Commands::GrantResource(command) => command_grant_resource(config_path, command).await,
        Commands::Apply(command) => command_apply(config_path, &command).await,
        Commands::Probe(command) => command_probe(config_path, command).await,
        Commands::Consume(command) => command_consume(config_path, command).await,
    }
}

// ============================================================================
// SECTION: Policy Commands
// ============================================================================

/// Executes `cluster-id`.
async fn command_cluster_id(config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let client = policy_client(&config)?;
    let id = client.fetch_primary_cluster_id().await.map_err(|err| CliError::new(err.to_string()))?;
    debug!(cluster_id = %id, "primary cluster id fetched");
    write_json(&ClusterIdOutput {
        cluster_id: id.as_str().to_string(),
    })?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `grant-cluster`.
async fn command_grant_cluster(
    config_path: Option<&Path>,
    command: GrantClusterCommand,
) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let client = resolved_policy_client(&config).await?;
    let cluster_id = match (command.cluster_id, command.cluster_type) {
        (Some(id), _) => id,
        (None, ClusterType::Kafka) => client
            .primary_cluster()
            .cloned()
            .ok_or_else(|| CliError::new("primary cluster id is unresolved".to_string()))?,
        (None, other) => {
            return Err(CliError::new(format!("--cluster-id is required for {other}")));
        }
    };
    client
        .grant_role_on_cluster(&command.principal, command.role, command.cluster_type, &cluster_id)
        .await
        .map_err(|err| CliError::new(err.to_string()))?;
    write_json(&GrantOutput {
        principal: command.principal.to_string(),
        role: command.role.to_string(),
    })?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `grant-resource`.
async fn command_grant_resource(
    config_path: Option<&Path>,
    command: GrantResourceCommand,
) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let client = resolved_policy_client(&config).await?;
    let owner = owning_cluster(command.resource_type, command.cluster_id)?;
    let result = match (command.prefixed, owner) {
        (true, owner) => {
            let pattern = ResourcePattern::prefixed(command.resource_type, command.name.clone());
            client
                .grant_role_on_patterns(&command.principal, command.role, owner, vec![pattern])
                .await
        }
        (false, None) => {
            client
                .grant_role_on_kafka_resource(
                    &command.principal,
                    command.role,
                    command.resource_type,
                    &command.name,
                )
                .await
        }
        (false, Some((cluster_type, cluster_id))) => {
            client
                .grant_role_on_resource(
                    &command.principal,
                    command.role,
                    cluster_type,
                    &cluster_id,
                    command.resource_type,
                    &command.name,
                )
                .await
        }
    };
    result.map_err(|err| CliError::new(err.to_string()))?;
    write_json(&GrantOutput {
        principal: command.principal.to_string(),
        role: command.role.to_string(),
    })?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `apply`.
async fn command_apply(config_path: Option<&Path>, command: &ApplyCommand) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let plan = GrantPlan::from_config(&config.grants);
    if command.dry_run {
        info!(intents = plan.len(), "grant plan dry run");
        write_json(&ApplyOutput {
            applied: 0,
            plan: Some(plan.intents()),
        })?;
        return Ok(ExitCode::SUCCESS);
    }
    let client = resolved_policy_client(&config).await?;
    let applied = plan.apply(&client).await.map_err(|err| CliError::new(err.to_string()))?;
    info!(applied, "grant plan applied");
    write_json(&ApplyOutput {
        applied,
        plan: None,
    })?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Probe Command
// ============================================================================

/// Executes `probe`.
async fn command_probe(config_path: Option<&Path>, command: ProbeCommand) -> CliResult<ExitCode> {
    let verify = match config_path {
        Some(path) => load_config(Some(path))?.verify,
        None => VerifyConfig::default(),
    };
    let secret = read_env_nonempty(&command.secret_env)
        .map_err(CliError::new)?
        .ok_or_else(|| CliError::new(format!("{} is not set", command.secret_env)))?;
    let credentials = BasicCredentials::new(command.user.clone(), secret);
    let probe = RestProbe::new(&command.url, credentials, verify.request_timeout())
        .map_err(|err| CliError::new(err.to_string()))?;
    let segments: Vec<&str> = command.path.iter().map(String::as_str).collect();
    let outcome = match command.method {
        ProbeMethod::Get => probe.get(&segments).await,
        ProbeMethod::Delete => probe.delete(&segments).await,
    };
    info!(
        user = %command.user,
        status = outcome.status(),
        outcome = %outcome.kind(),
        "verification call finished"
    );
    write_json(&ProbeOutput::from_outcome(&command.user, &outcome))?;
    Ok(probe_exit_code(command.expect, &outcome))
}

/// Maps an outcome to the exit code demanded by `--expect`.
fn probe_exit_code(expect: Option<ExpectArg>, outcome: &Outcome) -> ExitCode {
    match expect {
        Some(expect) if expect.kind() != outcome.kind() => {
            warn!(expected = %expect.kind(), observed = %outcome.kind(), "outcome did not match expectation");
            ExitCode::FAILURE
        }
        _ => ExitCode::SUCCESS,
    }
}

// ============================================================================
// SECTION: Consume Command
// ============================================================================

/// Executes `consume`.
async fn command_consume(config_path: Option<&Path>, command: ConsumeCommand) -> CliResult<ExitCode> {
    let verify = match config_path {
        Some(path) => load_config(Some(path))?.verify,
        None => VerifyConfig::default(),
    };
    let secret = read_env_nonempty(&command.secret_env)
        .map_err(CliError::new)?
        .ok_or_else(|| CliError::new(format!("{} is not set", command.secret_env)))?;
    let credentials = BasicCredentials::new(command.user.clone(), secret);
    let rest = RestProbe::new(&command.url, credentials, verify.request_timeout())
        .map_err(|err| CliError::new(err.to_string()))?;
    let spec = ConsumerSpec::new(command.group, command.topic)
        .with_format(command.format.into())
        .with_min_records(command.min_records);
    let consumer = RestProxyConsumer::new(rest);
    let outcome = consume_until(&consumer, &spec, &PollPolicy::from(verify.status_poll)).await;
    info!(
        user = %command.user,
        group = %spec.group,
        topic = %spec.topic,
        outcome = outcome.label(),
        records = outcome.records().len(),
        "consume finished"
    );
    write_json(&ConsumeOutput::from_outcome(&command.user, &spec, &outcome))?;
    Ok(consume_exit_code(command.expect, &outcome))
}

/// Maps a consumer-side result to the exit code demanded by `--expect`.
fn consume_exit_code(expect: Option<ConsumeExpectArg>, outcome: &ConsumeOutcome) -> ExitCode {
    match expect {
        Some(expect) if !expect.matches(outcome) => {
            warn!(expected = expect.label(), observed = outcome.label(), "consume result did not match expectation");
            ExitCode::FAILURE
        }
        _ => ExitCode::SUCCESS,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates the harness config.
fn load_config(path: Option<&Path>) -> CliResult<HarnessConfig> {
    let path = path.ok_or_else(|| CliError::new("--config is required".to_string()))?;
    HarnessConfig::load(path).map_err(|err| CliError::new(err.to_string()))
}

/// Builds a policy client from the `[policy]` section.
fn policy_client(config: &HarnessConfig) -> CliResult<PolicyClient> {
    PolicyClient::new(PolicyClientConfig::from_endpoint(&config.policy))
        .map_err(|err| CliError::new(err.to_string()))
}

/// Builds a policy client with the primary cluster id cached.
async fn resolved_policy_client(config: &HarnessConfig) -> CliResult<PolicyClient> {
    let mut client = policy_client(config)?;
    client.resolve_primary_cluster().await.map_err(|err| CliError::new(err.to_string()))?;
    Ok(client)
}

/// Returns the non-primary cluster owning `resource_type`, if any.
fn owning_cluster(
    resource_type: ResourceType,
    cluster_id: Option<ClusterId>,
) -> CliResult<Option<(ClusterType, ClusterId)>> {
    let owner = resource_type.owner();
    if owner.is_primary() {
        return Ok(None);
    }
    cluster_id
        .map(|id| Some((owner, id)))
        .ok_or_else(|| CliError::new(format!("--cluster-id is required for {resource_type} ({owner})")))
}

/// Writes one JSON document to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = serde_json::to_vec(value)
        .map_err(|err| CliError::new(format!("failed to render output: {err}")))?;
    bytes.push(b'\n');
    std::io::stdout()
        .write_all(&bytes)
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
