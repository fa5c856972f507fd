//! The raw triggering event seen by argument resolution.

use crate::value::Value;

/// A triggering event whose properties handlers can ask for by path.
///
/// Implemented by DOM events and by model change notifications. Property
/// lookup never fails: a missing property is `Value::Undefined`.
pub trait RawEvent {
    /// The event name, e.g. `click` or `change`.
    fn event_type(&self) -> &str;

    /// The first step of a property path.
    fn property(&self, name: &str) -> Value;
}
