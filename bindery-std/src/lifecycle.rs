//! # Controller Lifecycle
//!
//! Couples controllers to the mount/unmount lifecycle of the components
//! that declare them.
//!
//! - **mount**: one controller per declared class, built with the component
//!   model. `model` bindings subscribe to the model, class bindings register
//!   with the [`Dispatcher`] under the component root.
//! - **rerender**: same model is a no-op. A new model rebuilds every
//!   controller, moves the model listeners over and leaves the DOM
//!   registrations in place.
//! - **unmount**: children first, synchronously, every listener and
//!   registration of the subtree, DOM containment included. Unknown and already unmounted ids are a
//!   no-op.
//!
//! Controllers only ever run with no binder borrow held, so a handler may
//! mount, re-render or unmount components (its own included).

use crate::{
    dispatcher::{Dispatcher, RegistrationId},
    dom::{Document, DomEvent},
    error::{BindError, DomError},
    resolve::{self, DispatchContext, ModelScope},
};
use bindery_core::{
    registry, AnyModel, BoxError, ChangeEvent, Controller, ControllerBindings, Invocation,
    ListenerId, Model, NodeId,
};
use std::{
    any::{type_name, Any, TypeId},
    cell::RefCell,
    collections::{HashMap, HashSet},
    fmt,
    rc::{Rc, Weak},
};

/// Identifier of a mounted component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u64);

impl ComponentId {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

// ============================================================================
// Controller classes
// ============================================================================

type AttachFn =
    fn(&Rc<BinderInner>, ComponentId, NodeId, &AnyModel) -> Result<Box<dyn Bound>, BindError>;

/// A controller type, as declared by a component.
#[derive(Clone, Copy)]
pub struct ControllerClass {
    name: &'static str,
    type_id: fn() -> TypeId,
    attach: AttachFn,
}

impl ControllerClass {
    /// The class of controller `C`.
    pub fn of<C: Controller>() -> Self {
        Self {
            name: type_name::<C>(),
            type_id: TypeId::of::<C>,
            attach: attach_mounted::<C>,
        }
    }

    /// The controller type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The controller `TypeId`.
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }
}

impl PartialEq for ControllerClass {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl Eq for ControllerClass {}

impl fmt::Debug for ControllerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ControllerClass").field(&self.name).finish()
    }
}

/// Mount parameters of one component instance.
///
/// ```rust,ignore
/// let id = binder.mount(
///     Mount::new(root, &counter)
///         .controller::<CounterController>()
///         .parent(app),
/// )?;
/// ```
#[derive(Debug, Clone)]
pub struct Mount {
    root: NodeId,
    model: AnyModel,
    controllers: Vec<ControllerClass>,
    parent: Option<ComponentId>,
}

impl Mount {
    /// A component rendered at `root` with `model`.
    pub fn new(root: NodeId, model: impl Into<AnyModel>) -> Self {
        Self {
            root,
            model: model.into(),
            controllers: Vec::new(),
            parent: None,
        }
    }

    /// Declare controller `C`.
    pub fn controller<C: Controller>(mut self) -> Self {
        self.controllers.push(ControllerClass::of::<C>());
        self
    }

    /// Declare several controller classes, in order.
    pub fn controllers(mut self, classes: impl IntoIterator<Item = ControllerClass>) -> Self {
        self.controllers.extend(classes);
        self
    }

    /// The parent component.
    ///
    /// Without one, the innermost mounted component whose root contains
    /// `root` becomes the parent.
    pub fn parent(mut self, parent: ComponentId) -> Self {
        self.parent = Some(parent);
        self
    }
}

// ============================================================================
// Bound controllers
// ============================================================================

/// One bound controller, type erased.
trait Bound {
    /// Build the controller for `model` without touching the live one.
    fn prepare(&self, model: &AnyModel) -> Result<Box<dyn Any>, BindError>;
    /// Swap in a controller built by `prepare`.
    fn commit(&mut self, prepared: Box<dyn Any>);
    fn controller(&self) -> Rc<dyn Any>;
    fn detach(&mut self);
}

struct Live<C: Controller> {
    controller: Rc<C>,
    model: Model<C::State>,
}

struct Slot<C: Controller> {
    live: Rc<RefCell<Live<C>>>,
    bindings: Rc<ControllerBindings<C>>,
    scope: Weak<BinderInner>,
    root: Option<NodeId>,
    dispatcher: Option<Dispatcher>,
    listeners: Vec<ListenerId>,
    registrations: Vec<RegistrationId>,
    detached: bool,
}

fn downcast<C: Controller>(model: &AnyModel) -> Result<Model<C::State>, BindError> {
    model.downcast::<C::State>().ok_or(BindError::ModelMismatch {
        controller: type_name::<C>(),
        expected: type_name::<C::State>(),
        actual: model.state_name(),
    })
}

fn construct<C: Controller>(model: &Model<C::State>) -> Result<Rc<C>, BindError> {
    C::new(model.clone())
        .map(Rc::new)
        .map_err(|source| BindError::Construct {
            controller: type_name::<C>(),
            source,
        })
}

impl<C: Controller> Slot<C> {
    fn attach(
        model: Model<C::State>,
        scope: Weak<BinderInner>,
        mounted: Option<(ComponentId, NodeId, Dispatcher)>,
    ) -> Result<Self, BindError> {
        let bindings = registry::register::<C>()?;
        let controller = construct::<C>(&model)?;

        let mut slot = Slot {
            live: Rc::new(RefCell::new(Live {
                controller,
                model: model.clone(),
            })),
            bindings,
            scope,
            root: mounted.as_ref().map(|(_, root, _)| *root),
            dispatcher: None,
            listeners: Vec::new(),
            registrations: Vec::new(),
            detached: false,
        };
        slot.subscribe(&model);

        if let Some((component, root, dispatcher)) = mounted {
            slot.dispatcher = Some(dispatcher.clone());
            let bindings = Rc::clone(&slot.bindings);
            for (index, binding) in bindings.class_bindings() {
                let Some(class) = binding.selector().class_name() else {
                    continue;
                };
                // On error `slot` drops here and detaches what it holds.
                let id = dispatcher.register(
                    component,
                    root,
                    binding.event(),
                    class,
                    slot.dom_handler(index),
                )?;
                slot.registrations.push(id);
            }
        }
        Ok(slot)
    }

    fn subscribe(&mut self, model: &Model<C::State>) {
        let indices: Vec<usize> = self.bindings.model_bindings().map(|(i, _)| i).collect();
        for index in indices {
            let live = Rc::downgrade(&self.live);
            let bindings = Rc::clone(&self.bindings);
            let scope = self.scope.clone();
            let root = self.root;

            let id = model.subscribe(move |event: &ChangeEvent<C::State>| {
                let (Some(live), Some(binding)) = (live.upgrade(), bindings.get(index)) else {
                    return Ok(());
                };
                let (controller, own) = {
                    let live = live.borrow();
                    (Rc::clone(&live.controller), live.model.to_any())
                };
                let scope = scope.upgrade();
                let mut ctx = DispatchContext::new(event, own);
                if let (Some(scope), Some(root)) = (scope.as_deref(), root) {
                    ctx = ctx
                        .with_document(&scope.document)
                        .with_element(root)
                        .with_scope(scope);
                }
                resolve::invoke(&*controller, binding, &ctx).map(|_| ())
            });
            self.listeners.push(id);
        }
    }

    fn dom_handler(
        &self,
        index: usize,
    ) -> impl Fn(&DomEvent, NodeId) -> Result<Invocation, BoxError> + 'static {
        let live = Rc::downgrade(&self.live);
        let bindings = Rc::clone(&self.bindings);
        let scope = self.scope.clone();

        move |event: &DomEvent, element: NodeId| {
            let (Some(live), Some(scope), Some(binding)) =
                (live.upgrade(), scope.upgrade(), bindings.get(index))
            else {
                return Ok(Invocation::Skipped);
            };
            let (controller, own) = {
                let live = live.borrow();
                (Rc::clone(&live.controller), live.model.to_any())
            };
            let ctx = DispatchContext::new(event, own)
                .with_document(&scope.document)
                .with_target(event.target())
                .with_element(element)
                .with_scope(&*scope);
            resolve::invoke(&*controller, binding, &ctx)
        }
    }

    fn model(&self) -> Model<C::State> {
        self.live.borrow().model.clone()
    }
}

impl<C: Controller> Bound for Slot<C> {
    fn prepare(&self, model: &AnyModel) -> Result<Box<dyn Any>, BindError> {
        let model = downcast::<C>(model)?;
        let controller = construct::<C>(&model)?;
        Ok(Box::new(Live { controller, model }))
    }

    fn commit(&mut self, prepared: Box<dyn Any>) {
        let Ok(prepared) = prepared.downcast::<Live<C>>() else {
            return;
        };
        let model = prepared.model.clone();
        let previous = std::mem::replace(&mut *self.live.borrow_mut(), *prepared);
        for id in std::mem::take(&mut self.listeners) {
            previous.model.unsubscribe(id);
        }
        if !self.detached {
            self.subscribe(&model);
        }
    }

    fn controller(&self) -> Rc<dyn Any> {
        let controller: Rc<C> = Rc::clone(&self.live.borrow().controller);
        controller
    }

    fn detach(&mut self) {
        if self.detached {
            return;
        }
        self.detached = true;

        let model = self.model();
        for id in self.listeners.drain(..) {
            model.unsubscribe(id);
        }
        if let Some(dispatcher) = &self.dispatcher {
            for id in self.registrations.drain(..) {
                dispatcher.unregister(id);
            }
        }
    }
}

impl<C: Controller> Drop for Slot<C> {
    fn drop(&mut self) {
        self.detach();
    }
}

fn attach_mounted<C: Controller>(
    inner: &Rc<BinderInner>,
    component: ComponentId,
    root: NodeId,
    model: &AnyModel,
) -> Result<Box<dyn Bound>, BindError> {
    let model = downcast::<C>(model)?;
    let slot = Slot::<C>::attach(
        model,
        Rc::downgrade(inner),
        Some((component, root, inner.dispatcher.clone())),
    )?;
    Ok(Box::new(slot))
}

// ============================================================================
// Standalone controllers
// ============================================================================

/// A controller bound to a model without any view.
///
/// Its `model` bindings stay live until the handle is dropped or
/// [`detach`](BoundController::detach)ed. Nearest-model arguments resolve
/// to the controller's own model only.
pub struct BoundController<C: Controller> {
    slot: Slot<C>,
}

impl<C: Controller> BoundController<C> {
    /// The controller instance.
    pub fn controller(&self) -> Rc<C> {
        Rc::clone(&self.slot.live.borrow().controller)
    }

    /// The model the controller is bound to.
    pub fn model(&self) -> Model<C::State> {
        self.slot.model()
    }

    /// Whether the model bindings are still live.
    pub fn is_attached(&self) -> bool {
        !self.slot.detached
    }

    /// Remove every model listener. Idempotent.
    pub fn detach(&mut self) {
        self.slot.detach();
    }
}

impl<C: Controller> fmt::Debug for BoundController<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundController")
            .field("controller", &type_name::<C>())
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Build controller `C` for `model` and attach its `model` bindings.
pub fn bind_model<C: Controller>(model: &Model<C::State>) -> Result<BoundController<C>, BindError> {
    let slot = Slot::<C>::attach(model.clone(), Weak::new(), None)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        controller = type_name::<C>(),
        listeners = slot.listeners.len(),
        "bound standalone controller"
    );

    Ok(BoundController { slot })
}

// ============================================================================
// Binder
// ============================================================================

struct Component {
    root: NodeId,
    model: AnyModel,
    parent: Option<ComponentId>,
    children: Vec<ComponentId>,
    slots: Vec<Box<dyn Bound>>,
}

#[derive(Default)]
struct State {
    components: HashMap<ComponentId, Component>,
    roots: HashMap<NodeId, Vec<ComponentId>>,
    next_id: u64,
}

struct BinderInner {
    document: Document,
    dispatcher: Dispatcher,
    state: RefCell<State>,
}

impl ModelScope for BinderInner {
    fn models_at(&self, node: NodeId) -> Vec<AnyModel> {
        let state = self.state.borrow();
        state
            .roots
            .get(&node)
            .into_iter()
            .flat_map(|ids| ids.iter().rev())
            .filter_map(|id| state.components.get(id).map(|c| c.model.clone()))
            .collect()
    }
}

/// Binds controllers to the components mounted in one document.
#[derive(Clone)]
pub struct Binder {
    inner: Rc<BinderInner>,
}

impl Binder {
    /// Create a binder for `document`.
    pub fn new(document: Document) -> Self {
        Self {
            inner: Rc::new(BinderInner {
                dispatcher: Dispatcher::new(document.clone()),
                document,
                state: RefCell::new(State::default()),
            }),
        }
    }

    /// The document components are mounted in.
    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// The delegated dispatcher of the document.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Mount a component and bind its controllers.
    ///
    /// If any controller fails to bind, every controller already bound for
    /// this component is unbound again and the error is returned.
    pub fn mount(&self, mount: Mount) -> Result<ComponentId, BindError> {
        let Mount {
            root,
            model,
            controllers,
            parent,
        } = mount;

        if !self.inner.document.exists(root) {
            return Err(DomError::UnknownNode(root).into());
        }
        let ancestors = self.inner.document.ancestors(root);

        let id = {
            let mut guard = self.inner.state.borrow_mut();
            let state = &mut *guard;
            let id = ComponentId(state.next_id);
            let parent = parent.or_else(|| {
                ancestors
                    .iter()
                    .skip(1)
                    .find_map(|node| state.roots.get(node).and_then(|ids| ids.last().copied()))
            });
            if let Some(parent) = parent {
                state
                    .components
                    .get_mut(&parent)
                    .ok_or(BindError::NotMounted(parent))?
                    .children
                    .push(id);
            }
            state.next_id += 1;
            state.components.insert(
                id,
                Component {
                    root,
                    model: model.clone(),
                    parent,
                    children: Vec::new(),
                    slots: Vec::new(),
                },
            );
            state.roots.entry(root).or_default().push(id);
            id
        };

        for class in &controllers {
            let slot = match (class.attach)(&self.inner, id, root, &model) {
                Ok(slot) => slot,
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        component = %id,
                        controller = class.name(),
                        error = %err,
                        "mount failed, unbinding component"
                    );
                    self.release(id, false);
                    return Err(err);
                }
            };
            let orphan = match self.inner.state.borrow_mut().components.get_mut(&id) {
                Some(component) => {
                    component.slots.push(slot);
                    None
                }
                None => Some(slot),
            };
            if orphan.is_some() {
                // A constructor unmounted the component it was built for.
                return Err(BindError::NotMounted(id));
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            component = %id,
            root = %root,
            model = model.state_name(),
            controllers = controllers.len(),
            "mounted component"
        );

        Ok(id)
    }

    /// Re-render a mounted component.
    ///
    /// `None`, or the model the component already has, changes nothing. A
    /// different model rebuilds every controller for it and moves the model
    /// listeners over; DOM registrations keep their slot and order. If a
    /// controller fails to build, the component keeps its current model.
    pub fn rerender(&self, id: ComponentId, model: Option<AnyModel>) -> Result<(), BindError> {
        let Some(model) = model else {
            return Ok(());
        };

        let slots = {
            let mut state = self.inner.state.borrow_mut();
            let component = state
                .components
                .get_mut(&id)
                .ok_or(BindError::NotMounted(id))?;
            if component.model.ptr_eq(&model) {
                return Ok(());
            }
            std::mem::take(&mut component.slots)
        };

        let prepared: Result<Vec<Box<dyn Any>>, BindError> =
            slots.iter().map(|slot| slot.prepare(&model)).collect();

        let mut slots = slots;
        let result = prepared.map(|prepared| {
            for (slot, prepared) in slots.iter_mut().zip(prepared) {
                slot.commit(prepared);
            }
        });

        let orphaned = match self.inner.state.borrow_mut().components.get_mut(&id) {
            Some(component) => {
                component.slots = slots;
                if result.is_ok() {
                    component.model = model;

                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        component = %id,
                        model = component.model.state_name(),
                        "replaced component model"
                    );
                }
                None
            }
            None => Some(slots),
        };
        // Unmounted while the controllers were being rebuilt.
        for mut slot in orphaned.into_iter().flatten() {
            slot.detach();
        }
        result
    }

    /// Unmount a component and all its descendants, children first.
    ///
    /// Descendants are the components mounted under it (see
    /// [`Mount::parent`]) and any component whose root lies inside its root.
    ///
    /// Returns the number of components unmounted: zero for unknown or
    /// already unmounted ids.
    pub fn unmount(&self, id: ComponentId) -> usize {
        self.release(id, true)
    }

    /// Unmount `id` and its children. With `contained`, components whose
    /// root lies inside the root of `id` go too.
    fn release(&self, id: ComponentId, contained: bool) -> usize {
        let order = {
            let state = self.inner.state.borrow();
            if !state.components.contains_key(&id) {
                return 0;
            }
            let document = contained.then_some(&self.inner.document);
            let mut order = Vec::new();
            post_order(&state, document, id, &mut HashSet::new(), &mut order);
            order
        };

        let mut unmounted = 0;
        for component_id in order {
            let component = {
                let mut state = self.inner.state.borrow_mut();
                let Some(component) = state.components.remove(&component_id) else {
                    continue;
                };
                if let Some(ids) = state.roots.get_mut(&component.root) {
                    ids.retain(|c| *c != component_id);
                    if ids.is_empty() {
                        state.roots.remove(&component.root);
                    }
                }
                if let Some(parent) = component.parent.and_then(|p| state.components.get_mut(&p)) {
                    parent.children.retain(|c| *c != component_id);
                }
                component
            };

            // Detach outside the borrow: unregistering touches the document.
            for mut slot in component.slots {
                slot.detach();
            }
            unmounted += 1;

            #[cfg(feature = "tracing")]
            tracing::debug!(component = %component_id, "unmounted component");
        }
        unmounted
    }

    /// Whether `id` is mounted.
    pub fn is_mounted(&self, id: ComponentId) -> bool {
        self.inner.state.borrow().components.contains_key(&id)
    }

    /// Number of mounted components.
    pub fn component_count(&self) -> usize {
        self.inner.state.borrow().components.len()
    }

    /// The mounted children of `id`, in mount order.
    pub fn children(&self, id: ComponentId) -> Vec<ComponentId> {
        self.inner
            .state
            .borrow()
            .components
            .get(&id)
            .map(|c| c.children.clone())
            .unwrap_or_default()
    }

    /// The current model of `id`.
    pub fn model_of(&self, id: ComponentId) -> Option<AnyModel> {
        self.inner
            .state
            .borrow()
            .components
            .get(&id)
            .map(|c| c.model.clone())
    }

    /// The root node of `id`.
    pub fn root_of(&self, id: ComponentId) -> Option<NodeId> {
        self.inner.state.borrow().components.get(&id).map(|c| c.root)
    }

    /// The live controller of type `C` bound to `id`.
    pub fn controller<C: Controller>(&self, id: ComponentId) -> Option<Rc<C>> {
        let state = self.inner.state.borrow();
        state
            .components
            .get(&id)?
            .slots
            .iter()
            .find_map(|slot| slot.controller().downcast::<C>().ok())
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("components", &self.component_count())
            .field("registrations", &self.dispatcher().registration_count())
            .finish()
    }
}

/// `id` and everything mounted under it, children first. "Under" is the
/// parent link or, for components mounted before their container, a root
/// inside this component's root.
fn post_order(
    state: &State,
    document: Option<&Document>,
    id: ComponentId,
    seen: &mut HashSet<ComponentId>,
    order: &mut Vec<ComponentId>,
) {
    if !seen.insert(id) {
        return;
    }
    if let Some(component) = state.components.get(&id) {
        let mut descendants: Vec<ComponentId> = state
            .components
            .iter()
            .filter(|(_, other)| {
                other.root != component.root
                    && document.is_some_and(|doc| doc.contains(component.root, other.root))
            })
            .map(|(other, _)| *other)
            .chain(component.children.iter().copied())
            .collect();
        descendants.sort();
        descendants.dedup();
        for child in descendants {
            post_order(state, document, child, seen, order);
        }
    }
    order.push(id);
}
