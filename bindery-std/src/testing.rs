//! Testing utilities for Bindery.
//!
//! - [`Recorder`]: a shared call log, usable as a model field
//! - [`ChangeRecorder`]: records every change set a model publishes
//! - [`click`] / [`fire`]: dispatch native events at a node

use crate::dom::{Document, DomEvent};
use bindery_core::{BoxError, ChangeSet, ListenerId, Model, ModelState, NodeId, ToValue, Value};
use std::{cell::RefCell, fmt, rc::Rc};

// ============================================================================
// Recorder
// ============================================================================

/// A shared, append-only log.
///
/// Clones share the same log, and compare equal only to each other, so a
/// recorder can sit in a model without ever showing up as a changed field.
///
/// # Example
///
/// ```rust,ignore
/// let calls = Recorder::new();
/// let model = Model::new(Counter { counter: 0, calls: calls.clone() });
///
/// click(&doc, button)?;
/// assert_eq!(calls.entries(), vec!["clicked"]);
/// ```
pub struct Recorder<T> {
    entries: Rc<RefCell<Vec<T>>>,
}

impl<T: Clone> Recorder<T> {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Append an entry.
    pub fn record(&self, entry: T) {
        self.entries.borrow_mut().push(entry);
    }

    /// A copy of every entry, oldest first.
    pub fn entries(&self) -> Vec<T> {
        self.entries.borrow().clone()
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<T> {
        self.entries.borrow().last().cloned()
    }

    /// Number of entries.
    pub fn count(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl<T: Clone> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
        }
    }
}

impl<T> PartialEq for Recorder<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }
}

impl<T: fmt::Debug> fmt::Debug for Recorder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Recorder").field(&self.entries.borrow()).finish()
    }
}

impl<T: ToValue> ToValue for Recorder<T> {
    fn to_value(&self) -> Value {
        self.entries.borrow().to_value()
    }
}

// ============================================================================
// Change Recorder
// ============================================================================

/// Records the change sets published by one model.
///
/// Stops recording when dropped.
pub struct ChangeRecorder<S: ModelState> {
    model: Model<S>,
    listener: ListenerId,
    changes: Recorder<ChangeSet>,
}

impl<S: ModelState> ChangeRecorder<S> {
    /// Start recording `model`.
    pub fn new(model: &Model<S>) -> Self {
        let changes = Recorder::new();
        let sink = changes.clone();
        let listener = model.subscribe(move |event| {
            sink.record(event.changed().clone());
            Ok(())
        });
        Self {
            model: model.clone(),
            listener,
            changes,
        }
    }

    /// Every recorded change set, oldest first.
    pub fn changes(&self) -> Vec<ChangeSet> {
        self.changes.entries()
    }

    /// Number of notifications received.
    pub fn count(&self) -> usize {
        self.changes.count()
    }

    /// Whether any recorded change touched `field`.
    pub fn saw(&self, field: &str) -> bool {
        self.changes.entries().iter().any(|c| c.contains(field))
    }
}

impl<S: ModelState> Drop for ChangeRecorder<S> {
    fn drop(&mut self) {
        self.model.unsubscribe(self.listener);
    }
}

// ============================================================================
// Event helpers
// ============================================================================

/// Dispatch a `click` at `node`.
pub fn click(document: &Document, node: NodeId) -> Result<(), BoxError> {
    fire(document, node, "click")
}

/// Dispatch a bare event of `event_type` at `node`.
pub fn fire(document: &Document, node: NodeId, event_type: &str) -> Result<(), BoxError> {
    document.dispatch_event(&DomEvent::new(event_type, node))
}
