//! # Delegated Event Dispatcher
//!
//! One native listener per (root node, event type), shared by every binding
//! registered under that root. The index is
//!
//! ```text
//! (root, event) -> class name -> [registration]
//! ```
//!
//! On a native event the dispatcher takes the ancestor chain from the target
//! up to the root, looks every class of every ancestor up in the index and
//! collects the matching registrations. A registration matches at most once
//! per event, at its innermost matching ancestor. Matches run in registration
//! order: mount order first, declaration order within a controller.
//!
//! Roots nest when components do. The outermost root with a listener for the
//! event handles it for every root on the target's path, each registration
//! still bounded by its own root, so a parent mounted before its child fires
//! first. Listeners on inner roots stand down.
//!
//! No borrow is held while a handler runs. Each registration carries a
//! liveness flag that is checked right before invocation, so a handler may
//! unmount components (its own included) without the unmounted ones seeing
//! the rest of the event.

use crate::{
    dom::{Document, DomEvent, NativeListenerId},
    error::DomError,
    lifecycle::ComponentId,
};
use bindery_core::{BoxError, Invocation, NodeId};
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    rc::{Rc, Weak},
};

/// Entry point of one registration: the event and the matched element.
pub type DispatchHandler = dyn Fn(&DomEvent, NodeId) -> Result<Invocation, BoxError>;

/// Handle of one registration. Ordered by registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationId(u64);

/// What one native event did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Live registrations whose selector matched.
    pub matched: usize,
    /// Handlers that ran.
    pub invoked: usize,
    /// Handlers skipped because an argument could not be resolved.
    pub skipped: usize,
}

struct Registration {
    id: RegistrationId,
    component: ComponentId,
    root: NodeId,
    event: String,
    class: String,
    live: Cell<bool>,
    handler: Rc<DispatchHandler>,
}

struct RootListeners {
    native: NativeListenerId,
    by_class: HashMap<String, Vec<Rc<Registration>>>,
    len: usize,
}

#[derive(Default)]
struct Index {
    roots: HashMap<(NodeId, String), RootListeners>,
    by_id: HashMap<RegistrationId, Rc<Registration>>,
    next_id: u64,
}

struct Shared {
    document: Document,
    index: RefCell<Index>,
}

/// The delegated dispatcher of one document.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Rc<Shared>,
}

impl Dispatcher {
    /// Create a dispatcher listening on `document`.
    pub fn new(document: Document) -> Self {
        Self {
            shared: Rc::new(Shared {
                document,
                index: RefCell::new(Index::default()),
            }),
        }
    }

    /// The document this dispatcher listens on.
    pub fn document(&self) -> &Document {
        &self.shared.document
    }

    /// Register `handler` for `event` on elements carrying `class` inside
    /// `root`.
    ///
    /// The first registration for a (root, event) pair attaches the native
    /// listener.
    pub fn register<F>(
        &self,
        component: ComponentId,
        root: NodeId,
        event: &str,
        class: &str,
        handler: F,
    ) -> Result<RegistrationId, DomError>
    where
        F: Fn(&DomEvent, NodeId) -> Result<Invocation, BoxError> + 'static,
    {
        let key = (root, event.to_owned());
        if !self.shared.index.borrow().roots.contains_key(&key) {
            let native = self.listen(root, event)?;
            self.shared.index.borrow_mut().roots.insert(
                key.clone(),
                RootListeners {
                    native,
                    by_class: HashMap::new(),
                    len: 0,
                },
            );
        }

        let mut index = self.shared.index.borrow_mut();
        let id = RegistrationId(index.next_id);
        index.next_id += 1;
        let registration = Rc::new(Registration {
            id,
            component,
            root,
            event: event.to_owned(),
            class: class.to_owned(),
            live: Cell::new(true),
            handler: Rc::new(handler),
        });
        index.by_id.insert(id, Rc::clone(&registration));
        if let Some(listeners) = index.roots.get_mut(&key) {
            listeners
                .by_class
                .entry(class.to_owned())
                .or_default()
                .push(registration);
            listeners.len += 1;
        }
        Ok(id)
    }

    fn listen(&self, root: NodeId, event: &str) -> Result<NativeListenerId, DomError> {
        let weak: Weak<Shared> = Rc::downgrade(&self.shared);
        self.shared
            .document
            .add_event_listener(root, event, move |event: &DomEvent| {
                let Some(shared) = weak.upgrade() else {
                    return Ok(());
                };
                Dispatcher { shared }.dispatch(root, event).map(|_| ())
            })
    }

    /// Remove a registration. Returns `false` if it was already removed.
    ///
    /// The native listener goes away with the last registration of its
    /// (root, event) pair.
    pub fn unregister(&self, id: RegistrationId) -> bool {
        let native = {
            let mut index = self.shared.index.borrow_mut();
            let Some(registration) = index.by_id.remove(&id) else {
                return false;
            };
            registration.live.set(false);

            let key = (registration.root, registration.event.clone());
            let Some(listeners) = index.roots.get_mut(&key) else {
                return true;
            };
            if let Some(list) = listeners.by_class.get_mut(&registration.class) {
                list.retain(|r| r.id != id);
                if list.is_empty() {
                    listeners.by_class.remove(&registration.class);
                }
            }
            listeners.len -= 1;
            if listeners.len > 0 {
                return true;
            }
            index.roots.remove(&key).map(|l| l.native)
        };

        if let Some(native) = native {
            self.shared.document.remove_event_listener(native);
        }
        true
    }

    /// Whether `id` is still registered.
    pub fn is_registered(&self, id: RegistrationId) -> bool {
        self.shared.index.borrow().by_id.contains_key(&id)
    }

    /// Number of native listeners currently attached.
    pub fn native_listener_count(&self) -> usize {
        self.shared.index.borrow().roots.len()
    }

    /// Number of live registrations.
    pub fn registration_count(&self) -> usize {
        self.shared.index.borrow().by_id.len()
    }

    /// Number of live registrations owned by `component`.
    pub fn component_registration_count(&self, component: ComponentId) -> usize {
        self.shared
            .index
            .borrow()
            .by_id
            .values()
            .filter(|r| r.component == component)
            .count()
    }

    /// Route one native event, received at `root`, to the matching
    /// registrations.
    ///
    /// Handler errors abort the dispatch and are returned unmodified.
    pub fn dispatch(&self, root: NodeId, event: &DomEvent) -> Result<DispatchReport, BoxError> {
        let mut report = DispatchReport::default();
        let document = &self.shared.document;
        let Some(path) = document.path_to(event.target(), root) else {
            return Ok(report);
        };
        let outer = document.ancestors(root);
        let classes: Vec<Vec<String>> = path.iter().map(|node| document.classes(*node)).collect();
        let event_type = event.event_type();

        let mut matches: Vec<(Rc<Registration>, NodeId)> = {
            let index = self.shared.index.borrow();
            let key = |node: NodeId| (node, event_type.to_owned());
            if outer.iter().skip(1).any(|a| index.roots.contains_key(&key(*a))) {
                return Ok(report);
            }

            let mut seen = HashSet::new();
            let mut matches = Vec::new();
            for (boundary, boundary_root) in path.iter().enumerate() {
                let Some(listeners) = index.roots.get(&key(*boundary_root)) else {
                    continue;
                };
                // Innermost first, never past the registration's own root.
                for (node, node_classes) in path[..=boundary].iter().zip(&classes) {
                    for class in node_classes {
                        let Some(registrations) = listeners.by_class.get(class) else {
                            continue;
                        };
                        for registration in registrations {
                            if seen.insert(registration.id) {
                                matches.push((Rc::clone(registration), *node));
                            }
                        }
                    }
                }
            }
            matches
        };
        matches.sort_by_key(|(registration, _)| registration.id);

        #[cfg(feature = "tracing")]
        tracing::trace!(
            event = event.event_type(),
            root = %root,
            target = %event.target(),
            matches = matches.len(),
            "dispatching native event"
        );

        for (registration, element) in matches {
            if !registration.live.get() {
                continue;
            }
            report.matched += 1;

            #[cfg(feature = "tracing")]
            tracing::trace!(
                component = %registration.component,
                class = %registration.class,
                element = %element,
                "invoking delegated handler"
            );

            match (registration.handler)(event, element)? {
                Invocation::Invoked => report.invoked += 1,
                Invocation::Skipped => report.skipped += 1,
            }
        }
        Ok(report)
    }
}
