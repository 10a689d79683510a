// crates/rolebind-verify/src/consume.rs
// ============================================================================
// Module: Record Consumption
// Description: Consumer-side verification through a record source.
// Purpose: Report whether a principal in a consumer group observes data.
// Dependencies: async-trait, serde, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! A consumer-side check joins a consumer group as the principal under test,
//! subscribes to one topic, and polls until enough records arrive. Reading
//! needs a role on the group as well as on the topic, so a missing group
//! binding shows up here and nowhere else.
//!
//! [`RecordSource`] is the seam: [`RestProxyConsumer`] speaks the REST proxy
//! v2 consumer API over a [`RestProbe`] client, and tests substitute their own
//! sources. [`consume_until`] drives any source with the same bounded
//! backoff as status polling.
//!
//! Invariants:
//! - A refusal at any step ends the check at once; it is never retried.
//! - The consumer instance is released whatever the result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tracing::debug;

use crate::connect::PollPolicy;
use crate::connect::is_transient;
use crate::outcome::Outcome;
use crate::outcome::RestResponse;
use crate::rest::RestProbe;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Media type of REST proxy v2 control requests.
pub const REST_PROXY_V2: &str = "application/vnd.kafka.v2+json";

/// Consumer group the end-user scenarios read with.
pub const TEST_CONSUMER_GROUP: &str = "test-group";

/// HTTP status the REST proxy answers when the consumer instance exists.
const INSTANCE_EXISTS: u16 = 409;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Embedded format of consumed records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Base64 payloads.
    Binary,
    /// Plain JSON payloads.
    Json,
    /// Avro payloads decoded through the schema registry.
    Avro,
}

impl RecordFormat {
    /// Returns the format name used when creating a consumer.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Json => "json",
            Self::Avro => "avro",
        }
    }

    /// Returns the media type accepted when fetching records.
    #[must_use]
    pub const fn accept(self) -> &'static str {
        match self {
            Self::Binary => "application/vnd.kafka.binary.v2+json",
            Self::Json => "application/vnd.kafka.json.v2+json",
            Self::Avro => "application/vnd.kafka.avro.v2+json",
        }
    }
}

/// What to consume and how much counts as observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSpec {
    /// Consumer group joined by the principal.
    pub group: String,
    /// Subscribed topic.
    pub topic: String,
    /// Record format.
    pub format: RecordFormat,
    /// Records needed before data counts as observed; at least 1.
    pub min_records: usize,
}

impl ConsumerSpec {
    /// Creates a spec reading Avro records until one arrives.
    #[must_use]
    pub fn new(group: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            topic: topic.into(),
            format: RecordFormat::Avro,
            min_records: 1,
        }
    }

    /// Sets the record format.
    #[must_use]
    pub const fn with_format(mut self, format: RecordFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets how many records must arrive.
    #[must_use]
    pub fn with_min_records(mut self, min_records: usize) -> Self {
        self.min_records = min_records.max(1);
        self
    }
}

/// One consumed record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsumedRecord {
    /// Source topic.
    pub topic: String,
    /// Record key, `null` when absent.
    #[serde(default)]
    pub key: Value,
    /// Decoded record value.
    pub value: Value,
    /// Source partition.
    pub partition: i32,
    /// Offset within the partition.
    pub offset: i64,
}

/// Result of a consumer-side check.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    /// At least the requested number of records arrived.
    DataObserved(Vec<ConsumedRecord>),
    /// Polling ended before enough records arrived.
    NoData {
        /// Records seen before giving up.
        observed: usize,
    },
    /// The service refused the principal (401 or 403).
    Forbidden(u16),
    /// Any other answer that ends the check.
    Unexpected(RestResponse),
    /// No HTTP answer.
    TransportError(String),
}

impl ConsumeOutcome {
    /// Returns true for [`ConsumeOutcome::DataObserved`].
    #[must_use]
    pub const fn is_data_observed(&self) -> bool {
        matches!(self, Self::DataObserved(_))
    }

    /// Returns true for [`ConsumeOutcome::Forbidden`].
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// Returns the observed records.
    #[must_use]
    pub fn records(&self) -> &[ConsumedRecord] {
        match self {
            Self::DataObserved(records) => records,
            _ => &[],
        }
    }

    /// Returns the report label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::DataObserved(_) => "data_observed",
            Self::NoData { .. } => "no_data",
            Self::Forbidden(_) => "forbidden",
            Self::Unexpected(_) => "unexpected",
            Self::TransportError(_) => "transport_error",
        }
    }

    /// Maps an answer that ends the check.
    fn from_refusal(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Forbidden(status) => Self::Forbidden(status),
            Outcome::TransportError(message) => Self::TransportError(message),
            Outcome::Authorized(response) | Outcome::Unexpected(response) => Self::Unexpected(response),
        }
    }
}

// ============================================================================
// SECTION: Record Source
// ============================================================================

/// Consumer bound to one principal.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Joins `spec.group` and subscribes to `spec.topic`.
    async fn subscribe(&self, spec: &ConsumerSpec) -> Outcome;

    /// Fetches the next batch. An authorized answer carries a JSON array of
    /// records, possibly empty.
    async fn fetch(&self, spec: &ConsumerSpec) -> Outcome;

    /// Leaves the group.
    async fn close(&self, spec: &ConsumerSpec) -> Outcome;
}

/// Consumes through `source` until `spec.min_records` records arrive.
///
/// Empty batches and "not yet visible" answers are retried under `policy`;
/// anything else that is not a batch ends the check.
pub async fn consume_until(
    source: &dyn RecordSource,
    spec: &ConsumerSpec,
    policy: &PollPolicy,
) -> ConsumeOutcome {
    let subscribed = source.subscribe(spec).await;
    let outcome = if subscribed.is_authorized() {
        poll_records(source, spec, policy).await
    } else {
        ConsumeOutcome::from_refusal(subscribed)
    };
    let closed = source.close(spec).await;
    if !closed.is_authorized() {
        debug!(group = %spec.group, status = ?closed.status(), "consumer close not acknowledged");
    }
    outcome
}

/// Fetches batches until enough records arrive or the attempts run out.
async fn poll_records(source: &dyn RecordSource, spec: &ConsumerSpec, policy: &PollPolicy) -> ConsumeOutcome {
    let attempts = policy.max_attempts.max(1);
    let wanted = spec.min_records.max(1);
    let mut records = Vec::new();
    let mut attempt = 1;
    loop {
        match source.fetch(spec).await {
            Outcome::Authorized(response) => match response.json::<Vec<ConsumedRecord>>() {
                Ok(batch) => records.extend(batch),
                Err(_) => return ConsumeOutcome::Unexpected(response),
            },
            pending if is_transient(&pending) => {}
            refused => return ConsumeOutcome::from_refusal(refused),
        }
        if records.len() >= wanted {
            return ConsumeOutcome::DataObserved(records);
        }
        if attempt >= attempts {
            return ConsumeOutcome::NoData {
                observed: records.len(),
            };
        }
        let delay = policy.delay_after(attempt);
        debug!(
            group = %spec.group,
            topic = %spec.topic,
            observed = records.len(),
            wanted,
            attempt,
            "waiting for records"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

// ============================================================================
// SECTION: REST Proxy Consumer
// ============================================================================

/// REST proxy v2 consumer authenticating as the principal under test.
///
/// The instance name is derived from the principal so repeated checks reuse
/// one instance per group.
#[derive(Debug, Clone)]
pub struct RestProxyConsumer {
    /// REST proxy client.
    rest: RestProbe,
    /// Consumer instance name.
    instance: String,
}

impl RestProxyConsumer {
    /// Creates a consumer over a REST proxy client.
    #[must_use]
    pub fn new(rest: RestProbe) -> Self {
        let instance = format!("rolebind-{}", rest.username());
        Self {
            rest,
            instance,
        }
    }

    /// Returns the consumer instance name.
    #[must_use]
    pub fn instance(&self) -> &str {
        &self.instance
    }
}

#[async_trait]
impl RecordSource for RestProxyConsumer {
    async fn subscribe(&self, spec: &ConsumerSpec) -> Outcome {
        let create = json!({
            "name": self.instance,
            "format": spec.format.as_str(),
            "auto.offset.reset": "earliest",
        });
        let created = self.rest.post_json_as(&["consumers", &spec.group], REST_PROXY_V2, &create).await;
        let reusable = matches!(&created, Outcome::Unexpected(response) if response.status == INSTANCE_EXISTS);
        if !created.is_authorized() && !reusable {
            return created;
        }
        let subscription = json!({"topics": [spec.topic]});
        self.rest
            .post_json_as(
                &["consumers", &spec.group, "instances", &self.instance, "subscription"],
                REST_PROXY_V2,
                &subscription,
            )
            .await
    }

    async fn fetch(&self, spec: &ConsumerSpec) -> Outcome {
        self.rest
            .get_accepting(
                &["consumers", &spec.group, "instances", &self.instance, "records"],
                spec.format.accept(),
            )
            .await
    }

    async fn close(&self, spec: &ConsumerSpec) -> Outcome {
        self.rest.delete_as(&["consumers", &spec.group, "instances", &self.instance], REST_PROXY_V2).await
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
