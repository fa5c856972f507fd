//! # Host Document
//!
//! A minimal in-process DOM: an arena of element nodes with class lists,
//! named properties, text, parent/child links and per-node native event
//! listeners. The rendering layer writes into it; the dispatcher listens on
//! it.
//!
//! Nodes are never freed. A removed node keeps its id and its own subtree,
//! it is only detached from its parent, so events can still be dispatched at
//! it the way a script can still hold a removed DOM element.
//!
//! `Document` is a cheap handle (`Rc`). Listener callbacks run with no
//! internal borrow held, so they may mutate the document.

mod event;

pub use event::DomEvent;

use crate::error::DomError;
use bindery_core::{BoxError, NodeId, Value};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

/// A native listener callback.
pub type NativeListener = dyn Fn(&DomEvent) -> Result<(), BoxError>;

/// Handle returned by [`Document::add_event_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeListenerId(u64);

struct Node {
    tag: String,
    classes: Vec<String>,
    properties: HashMap<String, Value>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_owned(),
            classes: Vec::new(),
            properties: HashMap::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

struct Listener {
    id: NativeListenerId,
    node: NodeId,
    event: String,
    callback: Rc<NativeListener>,
}

struct Inner {
    nodes: Vec<Node>,
    listeners: Vec<Listener>,
    next_listener: u64,
}

impl Inner {
    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.index()).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.index()).ok_or(DomError::UnknownNode(id))
    }

    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.filter(|n| n.index() < self.nodes.len()) {
            path.push(node);
            current = self.nodes[node.index()].parent;
        }
        path
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|c| *c != id);
        }
    }

    fn text_content(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.index()];
        out.push_str(&node.text);
        for child in &node.children {
            self.text_content(*child, out);
        }
    }
}

/// A host document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<Inner>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document containing only its `body`.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                nodes: vec![Node::new("body")],
                listeners: Vec::new(),
                next_listener: 0,
            })),
        }
    }

    /// The `body` element.
    pub fn body(&self) -> NodeId {
        NodeId::new(0)
    }

    /// Whether `id` names a node of this document.
    pub fn exists(&self, id: NodeId) -> bool {
        id.index() < self.inner.borrow().nodes.len()
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut inner = self.inner.borrow_mut();
        inner.nodes.push(Node::new(tag));
        NodeId::new(inner.nodes.len() - 1)
    }

    /// Create an element with `class_name` and append it to `parent`.
    pub fn element(&self, parent: NodeId, tag: &str, class_name: &str) -> Result<NodeId, DomError> {
        let id = self.create_element(tag);
        self.set_class_name(id, class_name)?;
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Append `child` to `parent`, detaching it from its previous parent.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.node(parent)?;
        inner.node(child)?;
        if inner.ancestors(parent).contains(&child) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        inner.detach(child);
        inner.nodes[child.index()].parent = Some(parent);
        inner.nodes[parent.index()].children.push(child);
        Ok(())
    }

    /// Detach `node` from its parent. Its own subtree stays intact.
    pub fn remove(&self, node: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.node(node)?;
        inner.detach(node);
        Ok(())
    }

    /// Replace the class list with the whitespace separated `class_name`.
    pub fn set_class_name(&self, node: NodeId, class_name: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.node_mut(node)?.classes = class_name.split_whitespace().map(str::to_owned).collect();
        Ok(())
    }

    /// Add one class.
    pub fn add_class(&self, node: NodeId, class: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        let node = inner.node_mut(node)?;
        if !node.classes.iter().any(|c| c == class) {
            node.classes.push(class.to_owned());
        }
        Ok(())
    }

    /// Remove one class.
    pub fn remove_class(&self, node: NodeId, class: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.node_mut(node)?.classes.retain(|c| c != class);
        Ok(())
    }

    /// Whether `node` carries `class`.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        let inner = self.inner.borrow();
        inner
            .node(node)
            .is_ok_and(|n| n.classes.iter().any(|c| c == class))
    }

    /// The class list of `node`, empty for unknown nodes.
    pub fn classes(&self, node: NodeId) -> Vec<String> {
        let inner = self.inner.borrow();
        inner.node(node).map(|n| n.classes.clone()).unwrap_or_default()
    }

    /// Set a named property, e.g. an input's `value`.
    pub fn set_property(
        &self,
        node: NodeId,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.node_mut(node)?.properties.insert(name.to_owned(), value.into());
        Ok(())
    }

    /// Read a property of `node`.
    ///
    /// Built in: `className`, `parentNode`, `tagName`, `textContent`,
    /// `childNodes`, `firstChild`. Anything else comes from the properties
    /// set with [`Document::set_property`]. Missing properties and unknown
    /// nodes yield `Undefined`.
    pub fn property(&self, node: NodeId, name: &str) -> Value {
        let inner = self.inner.borrow();
        let Ok(data) = inner.node(node) else {
            return Value::Undefined;
        };
        match name {
            "className" => Value::String(data.classes.join(" ")),
            "parentNode" => data.parent.map_or(Value::Null, Value::Node),
            "tagName" => Value::String(data.tag.to_ascii_uppercase()),
            "textContent" => {
                let mut text = String::new();
                inner.text_content(node, &mut text);
                Value::String(text)
            }
            "childNodes" => Value::List(data.children.iter().copied().map(Value::Node).collect()),
            "firstChild" => data.children.first().copied().map_or(Value::Null, Value::Node),
            other => data.properties.get(other).cloned().unwrap_or_default(),
        }
    }

    /// Set the node's own text.
    pub fn set_text(&self, node: NodeId, text: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.node_mut(node)?.text = text.to_owned();
        Ok(())
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        self.property(node, "textContent")
            .as_str()
            .map(str::to_owned)
            .unwrap_or_default()
    }

    /// The parent of `node`.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        let inner = self.inner.borrow();
        inner.node(node).ok().and_then(|n| n.parent)
    }

    /// The children of `node`.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        inner.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    /// `node` and its ancestors, innermost first.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.borrow().ancestors(node)
    }

    /// The ancestor chain from `node` up to and including `root`, or `None`
    /// when `root` is not `node` or one of its ancestors.
    pub fn path_to(&self, node: NodeId, root: NodeId) -> Option<Vec<NodeId>> {
        let ancestors = self.ancestors(node);
        let end = ancestors.iter().position(|n| *n == root)?;
        Some(ancestors[..=end].to_vec())
    }

    /// Whether `node` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).contains(&ancestor)
    }

    /// Whether `node` is attached under `body`.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.body(), node)
    }

    /// Every node under `root` (inclusive) carrying `class`, in document order.
    pub fn find_all_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Ok(node) = inner.node(id) else {
                continue;
            };
            if node.classes.iter().any(|c| c == class) {
                found.push(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        found
    }

    /// The first node under `root` (inclusive) carrying `class`.
    pub fn find_by_class(&self, root: NodeId, class: &str) -> Option<NodeId> {
        self.find_all_by_class(root, class).into_iter().next()
    }

    // ========================================================================
    // Native listeners
    // ========================================================================

    /// Attach a native listener for `event` on `node`.
    pub fn add_event_listener<F>(
        &self,
        node: NodeId,
        event: &str,
        callback: F,
    ) -> Result<NativeListenerId, DomError>
    where
        F: Fn(&DomEvent) -> Result<(), BoxError> + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        inner.node(node)?;
        let id = NativeListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.push(Listener {
            id,
            node,
            event: event.to_owned(),
            callback: Rc::new(callback),
        });
        Ok(id)
    }

    /// Detach a native listener. Returns `false` if it was already detached.
    pub fn remove_event_listener(&self, id: NativeListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|l| l.id != id);
        inner.listeners.len() != before
    }

    /// Number of native listeners for `event` on `node`.
    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        let inner = self.inner.borrow();
        inner
            .listeners
            .iter()
            .filter(|l| l.node == node && l.event == event)
            .count()
    }

    /// Total number of native listeners in the document.
    pub fn total_listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn is_listening(&self, id: NativeListenerId) -> bool {
        self.inner.borrow().listeners.iter().any(|l| l.id == id)
    }

    /// Dispatch `event` at its target and bubble it up to the top.
    ///
    /// The propagation path is fixed before the first listener runs. A
    /// listener removed while the event is in flight is not invoked. The
    /// first listener error stops propagation and is returned unmodified.
    pub fn dispatch_event(&self, event: &DomEvent) -> Result<(), BoxError> {
        let path = self.ancestors(event.target());

        for node in path {
            let listeners: Vec<(NativeListenerId, Rc<NativeListener>)> = self
                .inner
                .borrow()
                .listeners
                .iter()
                .filter(|l| l.node == node && l.event == event.event_type())
                .map(|l| (l.id, Rc::clone(&l.callback)))
                .collect();

            for (id, callback) in listeners {
                if !self.is_listening(id) {
                    continue;
                }
                callback(event)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::RawEvent;
    use std::cell::RefCell;

    #[test]
    fn test_builds_tree_and_reads_properties() {
        let doc = Document::new();
        let left = doc.element(doc.body(), "div", "left panel").unwrap();
        let btn = doc.element(left, "button", "btn").unwrap();
        doc.set_text(btn, "go").unwrap();

        assert_eq!(doc.property(btn, "parentNode"), Value::Node(left));
        assert_eq!(doc.property(left, "className"), Value::from("left panel"));
        assert_eq!(doc.property(btn, "tagName"), Value::from("BUTTON"));
        assert_eq!(doc.text_content(left), "go");
        assert!(doc.property(btn, "value").is_undefined());
        assert_eq!(doc.property(doc.body(), "parentNode"), Value::Null);
        assert!(doc.property(NodeId::new(99), "className").is_undefined());
    }

    #[test]
    fn test_rejects_cycles() {
        let doc = Document::new();
        let outer = doc.element(doc.body(), "div", "").unwrap();
        let inner = doc.element(outer, "div", "").unwrap();
        assert_eq!(
            doc.append_child(inner, outer),
            Err(DomError::HierarchyRequest {
                parent: inner,
                child: outer
            })
        );
        assert_eq!(
            doc.append_child(outer, NodeId::new(42)),
            Err(DomError::UnknownNode(NodeId::new(42)))
        );
    }

    #[test]
    fn test_removed_nodes_keep_their_subtree() {
        let doc = Document::new();
        let outer = doc.element(doc.body(), "div", "").unwrap();
        let inner = doc.element(outer, "div", "").unwrap();
        doc.remove(outer).unwrap();

        assert!(!doc.is_connected(inner));
        assert!(doc.contains(outer, inner));
        assert!(doc.children(doc.body()).is_empty());
        assert_eq!(doc.path_to(inner, outer), Some(vec![inner, outer]));
        assert_eq!(doc.path_to(inner, doc.body()), None);
    }

    #[test]
    fn test_events_bubble_to_ancestors() {
        let doc = Document::new();
        let outer = doc.element(doc.body(), "div", "outer").unwrap();
        let inner = doc.element(outer, "div", "inner").unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (node, name) in [(doc.body(), "body"), (outer, "outer"), (inner, "inner")] {
            let log = log.clone();
            doc.add_event_listener(node, "click", move |event: &DomEvent| {
                log.borrow_mut().push((name, event.property("target")));
                Ok(())
            })
            .unwrap();
        }

        doc.dispatch_event(&DomEvent::new("click", inner)).unwrap();
        let names: Vec<&str> = log.borrow().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["inner", "outer", "body"]);
        assert!(log.borrow().iter().all(|(_, t)| *t == Value::Node(inner)));

        doc.dispatch_event(&DomEvent::new("keyup", inner)).unwrap();
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_listener_removed_in_flight_is_skipped() {
        let doc = Document::new();
        let outer = doc.element(doc.body(), "div", "").unwrap();
        let inner = doc.element(outer, "div", "").unwrap();
        let calls = Rc::new(RefCell::new(0));

        let counter = calls.clone();
        let outer_listener = doc
            .add_event_listener(outer, "click", move |_| {
                *counter.borrow_mut() += 1;
                Ok(())
            })
            .unwrap();
        let handle = doc.clone();
        doc.add_event_listener(inner, "click", move |_| {
            handle.remove_event_listener(outer_listener);
            Ok(())
        })
        .unwrap();

        doc.dispatch_event(&DomEvent::new("click", inner)).unwrap();
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(doc.listener_count(outer, "click"), 0);
    }

    #[test]
    fn test_listener_error_stops_propagation() {
        let doc = Document::new();
        let node = doc.element(doc.body(), "div", "").unwrap();
        let reached_body = Rc::new(RefCell::new(false));

        doc.add_event_listener(node, "click", |_| Err("handler failed".into()))
            .unwrap();
        let flag = reached_body.clone();
        doc.add_event_listener(doc.body(), "click", move |_| {
            *flag.borrow_mut() = true;
            Ok(())
        })
        .unwrap();

        let err = doc.dispatch_event(&DomEvent::new("click", node)).unwrap_err();
        assert_eq!(err.to_string(), "handler failed");
        assert!(!*reached_body.borrow());
    }

    #[test]
    fn test_find_by_class_in_document_order() {
        let doc = Document::new();
        let list = doc.element(doc.body(), "ul", "list").unwrap();
        let first = doc.element(list, "li", "User").unwrap();
        let nested = doc.element(first, "span", "User").unwrap();
        let second = doc.element(list, "li", "User").unwrap();

        assert_eq!(doc.find_all_by_class(list, "User"), vec![first, nested, second]);
        assert_eq!(doc.find_by_class(doc.body(), "list"), Some(list));
        assert_eq!(doc.find_by_class(doc.body(), "missing"), None);
    }
}
