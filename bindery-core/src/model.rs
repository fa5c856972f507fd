//! # Observable Model
//!
//! A [`Model`] is a shared handle to some state plus an ordered list of
//! change listeners. State is never assigned directly: every mutation goes
//! through [`Model::set`], which
//!
//! 1. applies the update to a working copy,
//! 2. computes the names of the fields that changed,
//! 3. commits the working copy in one step,
//! 4. notifies every listener, in registration order, before returning.
//!
//! Models are single-threaded (`Rc` based) and re-entrant: listeners may read
//! the model, call `set` again, subscribe or unsubscribe while a notification
//! is running. No internal borrow is held while a listener runs.
//!
//! A model knows nothing about controllers. Listeners are attached from the
//! outside, by the lifecycle binder or by application code.

use crate::{
    error::BoxError,
    event::RawEvent,
    value::{ToValue, Value},
};
use std::{
    any::{Any, TypeId},
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

/// State that can live inside a [`Model`].
///
/// Usually derived with `#[derive(ModelState)]`, which compares fields with
/// `PartialEq` and exposes them through [`ToValue`].
pub trait ModelState: Clone + 'static {
    /// Names of the fields that differ between `self` and `previous`.
    fn changed_fields(&self, previous: &Self) -> ChangeSet;

    /// The value of a field by name, `Undefined` if there is no such field.
    fn field(&self, name: &str) -> Value;
}

/// The set of field names changed by one update, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    fields: Vec<&'static str>,
}

impl ChangeSet {
    /// An empty change set.
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Record a changed field. Duplicates are ignored.
    pub fn insert(&mut self, field: &'static str) {
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
    }

    /// Whether `field` changed.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| *f == field)
    }

    /// Iterate over the changed field names.
    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().copied()
    }

    /// The changed field names.
    pub fn as_slice(&self) -> &[&'static str] {
        &self.fields
    }

    /// Number of changed fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<&'static str> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = &'static str>>(iter: I) -> Self {
        let mut set = ChangeSet::new();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'static str;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, &'static str>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter().copied()
    }
}

/// The notification a listener receives from [`Model::set`].
///
/// Carries the changed field names and the full post-update state.
#[derive(Debug, Clone)]
pub struct ChangeEvent<S> {
    changed: ChangeSet,
    state: S,
}

impl<S: ModelState> ChangeEvent<S> {
    /// The fields changed by the update.
    pub fn changed(&self) -> &ChangeSet {
        &self.changed
    }

    /// The state right after the update.
    pub fn state(&self) -> &S {
        &self.state
    }
}

impl<S: ModelState> RawEvent for ChangeEvent<S> {
    fn event_type(&self) -> &str {
        crate::selector::MODEL_CHANGE_EVENT
    }

    fn property(&self, name: &str) -> Value {
        match name {
            "type" => Value::from(crate::selector::MODEL_CHANGE_EVENT),
            "changed" => self.changed.as_slice().to_value(),
            field => self.state.field(field),
        }
    }
}

/// Handle returned by [`Model::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ChangeListener<S> = dyn Fn(&ChangeEvent<S>) -> Result<(), BoxError>;

struct Subscription<S> {
    id: ListenerId,
    callback: Rc<ChangeListener<S>>,
}

struct Shared<S> {
    state: RefCell<S>,
    listeners: RefCell<Vec<Subscription<S>>>,
    next_listener: Cell<u64>,
}

impl<S> Shared<S> {
    fn is_subscribed(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|s| s.id == id)
    }
}

/// An observable state holder with partial-update semantics.
///
/// Cloning a `Model` clones the handle, not the state.
pub struct Model<S> {
    shared: Rc<Shared<S>>,
}

impl<S: ModelState> Model<S> {
    /// Create a model holding `state`.
    pub fn new(state: S) -> Self {
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(state),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    /// Read the current state.
    ///
    /// `read` sees a copy, so it may call [`Model::set`] on this same model.
    pub fn with<R>(&self, read: impl FnOnce(&S) -> R) -> R {
        let state = self.snapshot();
        read(&state)
    }

    /// Clone the current state.
    pub fn snapshot(&self) -> S {
        self.shared.state.borrow().clone()
    }

    /// The current value of a field by name.
    pub fn field(&self, name: &str) -> Value {
        self.shared.state.borrow().field(name)
    }

    /// Apply a partial update and notify listeners.
    ///
    /// `update` runs against a working copy, so it may freely read this
    /// model. Returns the changed field names. When nothing changed no
    /// listener is notified.
    ///
    /// A listener error stops the notification and is returned unmodified;
    /// the state stays committed.
    pub fn set(&self, update: impl FnOnce(&mut S)) -> Result<ChangeSet, BoxError> {
        let mut next = self.snapshot();
        update(&mut next);

        let changed = next.changed_fields(&self.shared.state.borrow());
        if changed.is_empty() {
            return Ok(changed);
        }

        let event = ChangeEvent {
            changed: changed.clone(),
            state: next.clone(),
        };
        *self.shared.state.borrow_mut() = next;

        self.notify(&event)?;
        Ok(changed)
    }

    fn notify(&self, event: &ChangeEvent<S>) -> Result<(), BoxError> {
        let listeners: Vec<(ListenerId, Rc<ChangeListener<S>>)> = self
            .shared
            .listeners
            .borrow()
            .iter()
            .map(|s| (s.id, Rc::clone(&s.callback)))
            .collect();

        for (id, callback) in listeners {
            // Unsubscribed by an earlier listener of this same notification.
            if !self.shared.is_subscribed(id) {
                continue;
            }
            callback(event)?;
        }
        Ok(())
    }

    /// Register a change listener. Listeners fire in registration order.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ChangeEvent<S>) -> Result<(), BoxError> + 'static,
    {
        let id = ListenerId(self.shared.next_listener.get());
        self.shared.next_listener.set(id.0 + 1);
        self.shared.listeners.borrow_mut().push(Subscription {
            id,
            callback: Rc::new(listener),
        });
        id
    }

    /// Remove a change listener. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.shared.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|s| s.id != id);
        listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.shared.listeners.borrow().len()
    }

    /// Whether two handles point at the same model.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// A type-erased handle to this model.
    pub fn to_any(&self) -> AnyModel {
        AnyModel {
            erased: self.shared.clone(),
            any: self.shared.clone(),
        }
    }
}

impl<S> Clone for Model<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

/// Models compare by identity.
impl<S> PartialEq for Model<S> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<S: ModelState + Default> Default for Model<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: fmt::Debug> fmt::Debug for Model<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("state", &*self.shared.state.borrow())
            .field("listeners", &self.shared.listeners.borrow().len())
            .finish()
    }
}

// ============================================================================
// AnyModel
// ============================================================================

trait ErasedModel {
    fn state_type(&self) -> TypeId;
    fn state_name(&self) -> &'static str;
    fn field(&self, name: &str) -> Value;
    fn listener_count(&self) -> usize;
}

impl<S: ModelState> ErasedModel for Shared<S> {
    fn state_type(&self) -> TypeId {
        TypeId::of::<S>()
    }

    fn state_name(&self) -> &'static str {
        std::any::type_name::<S>()
    }

    fn field(&self, name: &str) -> Value {
        self.state.borrow().field(name)
    }

    fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// A type-erased [`Model`] handle.
///
/// Carries the stable [`TypeId`] of the state type so lookups such as
/// "nearest model of type `T`" compare type identity, never field shapes.
#[derive(Clone)]
pub struct AnyModel {
    erased: Rc<dyn ErasedModel>,
    any: Rc<dyn Any>,
}

impl AnyModel {
    /// The `TypeId` of the state type.
    pub fn state_type(&self) -> TypeId {
        self.erased.state_type()
    }

    /// The name of the state type, for diagnostics.
    pub fn state_name(&self) -> &'static str {
        self.erased.state_name()
    }

    /// Whether the state type is `S`.
    pub fn is<S: ModelState>(&self) -> bool {
        self.state_type() == TypeId::of::<S>()
    }

    /// Recover the typed handle.
    pub fn downcast<S: ModelState>(&self) -> Option<Model<S>> {
        Rc::clone(&self.any)
            .downcast::<Shared<S>>()
            .ok()
            .map(|shared| Model { shared })
    }

    /// The current value of a field by name.
    pub fn field(&self, name: &str) -> Value {
        self.erased.field(name)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.erased.listener_count()
    }

    /// Whether two handles point at the same model.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.any, &other.any)
    }
}

impl PartialEq for AnyModel {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for AnyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyModel").field(&self.state_name()).finish()
    }
}

impl<S: ModelState> From<Model<S>> for AnyModel {
    fn from(model: Model<S>) -> Self {
        model.to_any()
    }
}

impl<S: ModelState> From<&Model<S>> for AnyModel {
    fn from(model: &Model<S>) -> Self {
        model.to_any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Sum {
        a: i32,
        b: i32,
        c: i32,
    }

    impl ModelState for Sum {
        fn changed_fields(&self, previous: &Self) -> ChangeSet {
            let mut changed = ChangeSet::new();
            if self.a != previous.a {
                changed.insert("a");
            }
            if self.b != previous.b {
                changed.insert("b");
            }
            if self.c != previous.c {
                changed.insert("c");
            }
            changed
        }

        fn field(&self, name: &str) -> Value {
            match name {
                "a" => self.a.to_value(),
                "b" => self.b.to_value(),
                "c" => self.c.to_value(),
                _ => Value::Undefined,
            }
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Other;

    impl ModelState for Other {
        fn changed_fields(&self, _previous: &Self) -> ChangeSet {
            ChangeSet::new()
        }

        fn field(&self, _name: &str) -> Value {
            Value::Undefined
        }
    }

    #[test]
    fn test_set_reports_changed_fields() {
        let model = Model::new(Sum::default());
        let changed = model.set(|s| {
            s.a = 1;
            s.b = 2;
        });
        assert_eq!(changed.unwrap().as_slice(), &["a", "b"]);
        assert_eq!(model.with(|s| (s.a, s.b, s.c)), (1, 2, 0));
    }

    #[test]
    fn test_listeners_fire_in_order_with_post_update_state() {
        let model = Model::new(Sum::default());
        let log = Rc::new(RefCell::new(Vec::new()));

        for id in 0..3 {
            let log = log.clone();
            model.subscribe(move |event: &ChangeEvent<Sum>| {
                log.borrow_mut().push((id, event.state().a, event.changed().len()));
                Ok(())
            });
        }

        model.set(|s| s.a = 5).unwrap();
        assert_eq!(*log.borrow(), vec![(0, 5, 1), (1, 5, 1), (2, 5, 1)]);
    }

    #[test]
    fn test_no_notification_without_changes() {
        let model = Model::new(Sum::default());
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        model.subscribe(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        assert!(model.set(|s| s.a = 0).unwrap().is_empty());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_listener_can_write_back() {
        let model = Model::new(Sum::default());
        let handle = model.clone();
        model.subscribe(move |_| {
            handle.set(|s| s.c = s.a + s.b)?;
            Ok(())
        });

        model.set(|s| {
            s.a = 10;
            s.b = 15;
        })
        .unwrap();
        assert_eq!(model.with(|s| s.c), 25);
    }

    #[test]
    fn test_set_inside_with() {
        let model = Model::new(Sum::default());
        let changed = model.with(|s| model.set(|next| next.c = s.a + 7)).unwrap();

        assert_eq!(changed.as_slice(), &["c"]);
        assert_eq!(model.with(|s| s.c), 7);
    }

    #[test]
    fn test_handler_reading_then_writing_its_model() {
        let model = Model::new(Sum::default());
        let handle = model.clone();
        model.subscribe(move |event: &ChangeEvent<Sum>| {
            if event.changed().contains("a") {
                handle.with(|s| handle.set(|next| next.b = s.a * 2))?;
            }
            Ok(())
        });

        model.set(|s| s.a = 4).unwrap();
        assert_eq!(model.with(|s| (s.a, s.b)), (4, 8));
    }

    #[test]
    fn test_unsubscribe_during_notification() {
        let model = Model::new(Sum::default());
        let calls = Rc::new(Cell::new(0));
        let second: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));

        let handle = model.clone();
        let target = second.clone();
        model.subscribe(move |_| {
            if let Some(id) = target.get() {
                handle.unsubscribe(id);
            }
            Ok(())
        });
        let counter = calls.clone();
        second.set(Some(model.subscribe(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        })));

        model.set(|s| s.a = 1).unwrap();
        assert_eq!(calls.get(), 0, "removed listener must not run");
        assert_eq!(model.listener_count(), 1);
        assert!(!model.unsubscribe(second.get().unwrap()));
    }

    #[test]
    fn test_listener_error_propagates() {
        let model = Model::new(Sum::default());
        model.subscribe(|_| Err("boom".into()));
        let err = model.set(|s| s.a = 1).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(model.with(|s| s.a), 1, "state stays committed");
    }

    #[test]
    fn test_any_model_downcast() {
        let model = Model::new(Sum::default());
        let any = model.to_any();
        assert!(any.is::<Sum>());
        assert!(!any.is::<Other>());
        assert!(any.downcast::<Other>().is_none());
        assert!(any.downcast::<Sum>().unwrap().ptr_eq(&model));
        assert_eq!(any, AnyModel::from(&model));
        assert_ne!(any, Model::new(Sum::default()).to_any());
    }

    #[test]
    fn test_change_event_properties() {
        let model = Model::new(Sum::default());
        let seen = Rc::new(RefCell::new(Value::Undefined));
        let sink = seen.clone();
        model.subscribe(move |event: &ChangeEvent<Sum>| {
            *sink.borrow_mut() = event.property("changed");
            Ok(())
        });
        model.set(|s| s.b = 3).unwrap();
        assert_eq!(*seen.borrow(), Value::List(vec![Value::from("b")]));
    }
}
