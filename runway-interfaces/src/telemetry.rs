//! Telemetry events

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single telemetry event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub event_type: String,
    pub description: String,
    pub category: String,
    pub attributes: HashMap<String, String>,
}

impl TelemetryEvent {
    pub fn new(
        event_type: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            description: description.into(),
            category: category.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Sink for telemetry events. Capturing is fire-and-forget.
#[async_trait]
pub trait Telemetry: Send + Sync {
    async fn capture(&self, event: TelemetryEvent);
}
