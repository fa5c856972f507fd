//! Native DOM events.

use bindery_core::{NodeId, RawEvent, Value};
use std::collections::HashMap;

/// A native event dispatched into a [`Document`](super::Document).
///
/// Events always bubble: from the target up through every ancestor.
/// Extra properties (`clientX`, `key`, ...) are attached with [`DomEvent::with`].
#[derive(Debug, Clone)]
pub struct DomEvent {
    event_type: String,
    target: NodeId,
    properties: HashMap<String, Value>,
}

impl DomEvent {
    /// Create an event of `event_type` targeted at `target`.
    pub fn new(event_type: impl Into<String>, target: NodeId) -> Self {
        Self {
            event_type: event_type.into(),
            target,
            properties: HashMap::new(),
        }
    }

    /// Attach a property.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// The event name.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The node the event was dispatched at.
    pub fn target(&self) -> NodeId {
        self.target
    }
}

impl RawEvent for DomEvent {
    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn property(&self, name: &str) -> Value {
        match name {
            "type" => Value::from(self.event_type.as_str()),
            "target" => Value::Node(self.target),
            other => self.properties.get(other).cloned().unwrap_or_default(),
        }
    }
}
