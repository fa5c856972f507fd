//! Shared fixtures: a page to render into and a minimal rendering layer.

#![allow(dead_code)]

use bindery::{Binder, Document, Model, ModelState, NodeId};

// ============================================================================
// Page
// ============================================================================

/// A document with an empty container attached to its body.
pub struct Page {
    pub document: Document,
    pub binder: Binder,
    pub container: NodeId,
}

impl Page {
    pub fn new() -> Self {
        let document = Document::new();
        let container = document
            .element(document.body(), "div", "")
            .expect("body accepts children");
        let binder = Binder::new(document.clone());
        Self {
            document,
            binder,
            container,
        }
    }

    /// Create an element under `parent`.
    pub fn el(&self, parent: NodeId, tag: &str, class_name: &str) -> NodeId {
        self.document
            .element(parent, tag, class_name)
            .expect("parent exists")
    }

    /// The first element carrying `class` in the container.
    pub fn query(&self, class: &str) -> NodeId {
        self.document
            .find_by_class(self.container, class)
            .unwrap_or_else(|| panic!("no element with class {class}"))
    }

    /// Every element carrying `class` in the container.
    pub fn query_all(&self, class: &str) -> Vec<NodeId> {
        self.document.find_all_by_class(self.container, class)
    }

    /// Text content of the first element carrying `class`.
    pub fn text(&self, class: &str) -> String {
        self.document.text_content(self.query(class))
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Keep the text of `node` in sync with `field` of `model`, the way a
/// template interpolation would.
///
/// Subscribe before mounting controllers so nested updates made by
/// controllers render last.
pub fn render_text<S: ModelState>(
    document: &Document,
    node: NodeId,
    model: &Model<S>,
    field: &'static str,
) {
    document
        .set_text(node, &model.field(field).to_string())
        .expect("node exists");
    let document = document.clone();
    model.subscribe(move |event| {
        if event.changed().contains(field) {
            document.set_text(node, &event.state().field(field).to_string())?;
        }
        Ok(())
    });
}
