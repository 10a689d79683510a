// crates/rolebind-verify/src/lib.rs
// ============================================================================
// Module: Rolebind Verify Library
// Description: Verification clients for services under role-based access.
// Purpose: Exercise actions as specific principals and classify the answers.
// Dependencies: async-trait, reqwest, rolebind-config, serde, tokio
// ============================================================================

//! ## Overview
//! Verification clients authenticate as the principal under test and return
//! an [`Outcome`] for every call. Authorization itself is decided by the
//! service; scenarios assert on the outcome class. Consumer-side checks
//! report a [`ConsumeOutcome`] instead, whose success class is "data
//! observed".

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod connect;
pub mod consume;
pub mod connector;
pub mod outcome;
pub mod registry;
pub mod rest;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use connect::ConnectClient;
pub use connect::ConnectorStatus;
pub use connect::PollPolicy;
pub use connect::is_transient;
pub use consume::ConsumeOutcome;
pub use consume::ConsumedRecord;
pub use consume::ConsumerSpec;
pub use consume::REST_PROXY_V2;
pub use consume::RecordFormat;
pub use consume::RecordSource;
pub use consume::RestProxyConsumer;
pub use consume::TEST_CONSUMER_GROUP;
pub use consume::consume_until;
pub use connector::ConnectorConfig;
pub use connector::DATAGEN_CONNECTOR_CLASS;
pub use outcome::Outcome;
pub use outcome::OutcomeKind;
pub use outcome::RestResponse;
pub use registry::RegistryClient;
pub use rest::BasicCredentials;
pub use rest::MAX_VERIFY_RESPONSE_BYTES;
pub use rest::RestProbe;
pub use rest::VerifyError;
