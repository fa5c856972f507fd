//! Mount, re-render and unmount as seen from the rendering layer.

#![cfg(feature = "macros")]

mod common;

use bindery::{
    BindError, Binder, BoxError, ComponentId, Controller, Model, ModelState, Mount, NodeId,
    controller,
    testing::{Recorder, click},
};
use common::Page;
use std::{cell::Cell, rc::Rc};

// ============================================================================
// Parent renders a child conditionally
// ============================================================================

#[derive(Clone, Default, ModelState)]
struct Child {
    value: i32,
    calls: Recorder<&'static str>,
}

#[derive(Clone, ModelState)]
struct Parent {
    render_element: bool,
    child: Model<Child>,
}

struct ChildController {
    model: Model<Child>,
}

#[controller]
impl ChildController {
    #[on("click", ".button")]
    fn on_click_button(&self) {
        self.model.with(|s| s.calls.record("click"));
    }

    #[on("change", "model")]
    fn on_change(&self) {
        self.model.with(|s| s.calls.record("change"));
    }
}

impl Controller for ChildController {
    type State = Child;

    fn new(model: Model<Child>) -> Result<Self, BoxError> {
        Ok(Self { model })
    }
}

/// The parent view: renders `ChildView` while `render_element` is set.
struct ParentView {
    binder: Binder,
    root: NodeId,
    id: ComponentId,
    child: Rc<Cell<Option<(ComponentId, NodeId)>>>,
}

impl ParentView {
    fn mount(page: &Page, model: &Model<Parent>) -> Self {
        let root = page.el(page.container, "div", "parent");
        let id = page.binder.mount(Mount::new(root, model)).unwrap();
        let view = ParentView {
            binder: page.binder.clone(),
            root,
            id,
            child: Rc::new(Cell::new(None)),
        };
        view.render(&model.snapshot());

        let binder = view.binder.clone();
        let child = Rc::clone(&view.child);
        model.subscribe(move |event| {
            if event.changed().contains("render_element") && !event.state().render_element {
                if let Some((id, node)) = child.take() {
                    binder.unmount(id);
                    binder.document().remove(node)?;
                }
            }
            Ok(())
        });
        view
    }

    fn render(&self, state: &Parent) {
        if !state.render_element {
            return;
        }
        let document = self.binder.document();
        let child_root = document.element(self.root, "div", "child").unwrap();
        document.element(child_root, "button", "button").unwrap();
        let id = self
            .binder
            .mount(
                Mount::new(child_root, &state.child)
                    .controller::<ChildController>()
                    .parent(self.id),
            )
            .unwrap();
        self.child.set(Some((id, child_root)));
    }
}

fn parent_model() -> (Model<Parent>, Model<Child>) {
    let child = Model::new(Child::default());
    let parent = Model::new(Parent {
        render_element: true,
        child: child.clone(),
    });
    (parent, child)
}

#[test]
fn test_removed_child_stops_dom_events() {
    let page = Page::new();
    let (parent, child) = parent_model();
    let view = ParentView::mount(&page, &parent);
    let button = page.query("button");
    let child_root = page.query("child");

    click(&page.document, button).unwrap();
    assert_eq!(child.with(|s| s.calls.entries()), vec!["click"]);
    assert_eq!(page.document.listener_count(child_root, "click"), 1);

    parent.set(|s| s.render_element = false).unwrap();
    assert_eq!(page.binder.children(view.id), Vec::new());

    // The node still exists; nothing listens to it any more.
    click(&page.document, button).unwrap();
    assert_eq!(child.with(|s| s.calls.entries()), vec!["click"]);
    assert_eq!(page.document.listener_count(child_root, "click"), 0);
    assert_eq!(page.binder.dispatcher().native_listener_count(), 0);
    assert!(page.binder.is_mounted(view.id));
}

#[test]
fn test_removed_child_stops_model_events() {
    let page = Page::new();
    let (parent, child) = parent_model();
    let _view = ParentView::mount(&page, &parent);

    child.set(|s| s.value = 1).unwrap();
    assert_eq!(child.with(|s| s.calls.entries()), vec!["change"]);

    parent.set(|s| s.render_element = false).unwrap();
    child.set(|s| s.value = 2).unwrap();
    assert_eq!(child.with(|s| s.calls.entries()), vec!["change"]);
    assert_eq!(child.listener_count(), 0);
}

#[test]
fn test_parent_keeps_working_after_child_removal() {
    let page = Page::new();
    let (parent, _child) = parent_model();
    let view = ParentView::mount(&page, &parent);

    let counter = Model::new(Counter::default());
    let toolbar = page.el(view.root, "div", "toolbar");
    let increment = page.el(toolbar, "button", "increment");
    page.binder
        .mount(
            Mount::new(toolbar, &counter)
                .controller::<CounterController>()
                .parent(view.id),
        )
        .unwrap();

    parent.set(|s| s.render_element = false).unwrap();
    click(&page.document, increment).unwrap();
    assert_eq!(counter.with(|s| s.counter), 1);
}

// ============================================================================
// Unmount
// ============================================================================

#[derive(Clone, Default, ModelState)]
struct Counter {
    counter: i32,
}

struct CounterController {
    model: Model<Counter>,
}

#[controller]
impl CounterController {
    #[on("click", ".increment")]
    fn increment(&self) -> Result<(), BoxError> {
        self.model.set(|s| s.counter += 1).map(|_| ())
    }
}

impl Controller for CounterController {
    type State = Counter;

    fn new(model: Model<Counter>) -> Result<Self, BoxError> {
        Ok(Self { model })
    }
}

fn mount_counter(page: &Page) -> (ComponentId, NodeId, Model<Counter>) {
    let root = page.el(page.container, "div", "counter");
    let button = page.el(root, "button", "increment");
    let model = Model::new(Counter::default());
    let id = page
        .binder
        .mount(Mount::new(root, &model).controller::<CounterController>())
        .unwrap();
    (id, button, model)
}

#[test]
fn test_unmount_twice_is_safe() {
    let page = Page::new();
    let (id, button, model) = mount_counter(&page);

    assert_eq!(page.binder.unmount(id), 1);
    assert_eq!(page.binder.unmount(id), 0);

    click(&page.document, button).unwrap();
    assert_eq!(model.with(|s| s.counter), 0);
}

#[test]
fn test_unmount_without_listeners_is_noop() {
    let page = Page::new();
    let root = page.el(page.container, "div", "");
    let id = page
        .binder
        .mount(Mount::new(root, Model::new(Counter::default())))
        .unwrap();

    assert_eq!(page.binder.unmount(id), 1);
    assert_eq!(page.binder.unmount(id), 0);
    assert_eq!(page.binder.component_count(), 0);
}

#[test]
fn test_sibling_unmounted_mid_event_is_not_invoked() {
    let page = Page::new();
    let root = page.el(page.container, "div", "");
    let button = page.el(root, "button", "increment");

    let outer = Model::new(Killer::default());
    let inner = Model::new(Counter::default());

    // Both components share the root node, like a view that renders another
    // view as its top-level element.
    page.binder
        .mount(Mount::new(root, &outer).controller::<KillerController>())
        .unwrap();
    let victim = page
        .binder
        .mount(Mount::new(root, &inner).controller::<CounterController>())
        .unwrap();
    outer.with(|s| s.target.set(Some((page.binder.clone(), victim))));

    click(&page.document, button).unwrap();
    assert!(!page.binder.is_mounted(victim));
    assert_eq!(inner.with(|s| s.counter), 0);
}

#[test]
fn test_unmount_reaches_children_mounted_without_parent_link() {
    let page = Page::new();
    let parent_root = page.el(page.container, "div", "parent");
    let (child, child_model) = {
        let child_root = page.el(parent_root, "div", "child");
        page.el(child_root, "button", "button");
        let model = Model::new(Child::default());
        let id = page
            .binder
            .mount(Mount::new(child_root, &model).controller::<ChildController>())
            .unwrap();
        (id, model)
    };
    // The container mounts after the component rendered inside it.
    let parent = page
        .binder
        .mount(Mount::new(parent_root, Model::new(Counter::default())))
        .unwrap();
    let later_root = page.el(parent_root, "div", "later");
    let later_button = page.el(later_root, "button", "increment");
    let later_model = Model::new(Counter::default());
    page.binder
        .mount(Mount::new(later_root, &later_model).controller::<CounterController>())
        .unwrap();

    assert_eq!(page.binder.unmount(parent), 3);
    assert!(!page.binder.is_mounted(child));
    assert_eq!(page.binder.component_count(), 0);

    click(&page.document, page.query("button")).unwrap();
    click(&page.document, later_button).unwrap();
    child_model.set(|s| s.value = 1).unwrap();
    assert!(child_model.with(|s| s.calls.entries()).is_empty());
    assert_eq!(later_model.with(|s| s.counter), 0);
    assert_eq!(page.document.total_listener_count(), 0);
}

#[derive(Clone, Default)]
struct Killer {
    target: Rc<Cell<Option<(Binder, ComponentId)>>>,
}

impl ModelState for Killer {
    fn changed_fields(&self, _previous: &Self) -> bindery::ChangeSet {
        bindery::ChangeSet::new()
    }

    fn field(&self, _name: &str) -> bindery::Value {
        bindery::Value::Undefined
    }
}

struct KillerController {
    model: Model<Killer>,
}

#[controller]
impl KillerController {
    #[on("click", ".increment")]
    fn on_click(&self) {
        if let Some((binder, victim)) = self.model.with(|s| s.target.take()) {
            binder.unmount(victim);
        }
    }
}

impl Controller for KillerController {
    type State = Killer;

    fn new(model: Model<Killer>) -> Result<Self, BoxError> {
        Ok(Self { model })
    }
}

// ============================================================================
// Re-render
// ============================================================================

#[test]
fn test_rerender_with_same_model_adds_nothing() {
    let page = Page::new();
    let (id, button, model) = mount_counter(&page);

    for _ in 0..3 {
        page.binder.rerender(id, Some(model.to_any())).unwrap();
        page.binder.rerender(id, None).unwrap();
    }

    assert_eq!(page.binder.dispatcher().registration_count(), 1);
    click(&page.document, button).unwrap();
    assert_eq!(model.with(|s| s.counter), 1);
}

#[test]
fn test_model_replacement_rebinds() {
    let page = Page::new();
    let (id, button, first) = mount_counter(&page);
    let second = Model::new(Counter { counter: 10 });

    page.binder.rerender(id, Some(second.to_any())).unwrap();
    click(&page.document, button).unwrap();

    assert_eq!(first.with(|s| s.counter), 0);
    assert_eq!(second.with(|s| s.counter), 11);
    assert_eq!(page.binder.model_of(id), Some(second.to_any()));
}

// ============================================================================
// Failure
// ============================================================================

struct Broken;

#[controller]
impl Broken {}

impl Controller for Broken {
    type State = Counter;

    fn new(_model: Model<Counter>) -> Result<Self, BoxError> {
        Err("broken controller".into())
    }
}

#[test]
fn test_constructor_failure_leaves_nothing_bound() {
    let page = Page::new();
    let root = page.el(page.container, "div", "");
    let button = page.el(root, "button", "increment");
    let model = Model::new(Counter::default());

    let err = page
        .binder
        .mount(
            Mount::new(root, &model)
                .controller::<CounterController>()
                .controller::<Broken>(),
        )
        .unwrap_err();
    assert!(matches!(err, BindError::Construct { .. }));

    assert_eq!(page.binder.component_count(), 0);
    assert_eq!(page.binder.dispatcher().registration_count(), 0);
    assert_eq!(page.document.total_listener_count(), 0);
    click(&page.document, button).unwrap();
    assert_eq!(model.with(|s| s.counter), 0);
}
