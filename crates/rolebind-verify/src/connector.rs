// crates/rolebind-verify/src/connector.rs
// ============================================================================
// Module: Connector Config
// Description: Connector submission document with datagen helpers.
// Purpose: Build the body of a connector submission.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`ConnectorConfig`] serializes to the `{"name": ..., "config": {...}}`
//! document accepted by `POST /connectors`. Keys are kept sorted so request
//! bodies are stable across runs.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// Connector class of the datagen source connector.
pub const DATAGEN_CONNECTOR_CLASS: &str = "io.confluent.kafka.connect.datagen.DatagenConnector";

/// Connector submission document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Connector name.
    pub name: String,
    /// Connector properties.
    pub config: BTreeMap<String, String>,
}

impl ConnectorConfig {
    /// Creates a config with only a name and a connector class.
    #[must_use]
    pub fn new(name: impl Into<String>, connector_class: impl Into<String>) -> Self {
        let mut config = BTreeMap::new();
        config.insert("connector.class".to_string(), connector_class.into());
        Self {
            name: name.into(),
            config,
        }
    }

    /// Creates a datagen source connector config.
    #[must_use]
    pub fn datagen(name: impl Into<String>) -> Self {
        Self::new(name, DATAGEN_CONNECTOR_CLASS)
    }

    /// Sets the target topic.
    #[must_use]
    pub fn with_kafka_topic(self, topic: impl Into<String>) -> Self {
        self.with("kafka.topic", topic)
    }

    /// Sets the datagen quickstart schema (for example `inventory`).
    #[must_use]
    pub fn with_quickstart(self, quickstart: impl Into<String>) -> Self {
        self.with("quickstart", quickstart)
    }

    /// Sets the number of generated records.
    #[must_use]
    pub fn with_iterations(self, iterations: u64) -> Self {
        self.with("iterations", iterations.to_string())
    }

    /// Sets the value converter class.
    #[must_use]
    pub fn with_value_converter(self, converter: impl Into<String>) -> Self {
        self.with("value.converter", converter)
    }

    /// Sets an arbitrary property, replacing any earlier value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Returns a property value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }
}
