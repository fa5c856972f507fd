//! # Argument Resolution
//!
//! Produces the concrete value of each handler argument from the triggering
//! event and the live component tree.
//!
//! - [`ArgDescriptor::Path`] walks properties starting at the raw event.
//!   A missing step yields `Undefined`, never an error.
//! - [`ArgDescriptor::NearestModel`] searches outward through the DOM for
//!   the closest mounted component whose model has the requested state
//!   type. No match yields [`Resolved::Skip`].
//!
//! A single `Skip` means the handler is not invoked for this event.

use crate::dom::Document;
use bindery_core::{
    AnyModel, ArgDescriptor, BindingDescriptor, BoxError, Invocation, NodeId, RawEvent, Value,
};
use std::any::TypeId;

/// Outcome of resolving one argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// The argument value. May be `Undefined`.
    Value(Value),
    /// The argument cannot be produced; the handler must not run.
    Skip,
}

/// Lookup of the models of components rooted at a DOM node.
pub trait ModelScope {
    /// Models of the mounted components whose root is `node`, innermost
    /// (most recently mounted) first.
    fn models_at(&self, node: NodeId) -> Vec<AnyModel>;
}

/// Everything argument resolution can see for one handler invocation.
pub struct DispatchContext<'a> {
    event: &'a dyn RawEvent,
    target: Option<NodeId>,
    element: Option<NodeId>,
    model: AnyModel,
    document: Option<&'a Document>,
    scope: Option<&'a dyn ModelScope>,
}

impl<'a> DispatchContext<'a> {
    /// A context with no DOM: only the event and the controller's own model.
    pub fn new(event: &'a dyn RawEvent, model: AnyModel) -> Self {
        Self {
            event,
            target: None,
            element: None,
            model,
            document: None,
            scope: None,
        }
    }

    /// The document node properties are read from.
    pub fn with_document(mut self, document: &'a Document) -> Self {
        self.document = Some(document);
        self
    }

    /// The node the event was dispatched at.
    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }

    /// The element the binding's selector matched (or the component root
    /// for model bindings).
    pub fn with_element(mut self, element: NodeId) -> Self {
        self.element = Some(element);
        self
    }

    /// The mounted components used for nearest-model lookup.
    pub fn with_scope(mut self, scope: &'a dyn ModelScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// The triggering event.
    pub fn event(&self) -> &dyn RawEvent {
        self.event
    }

    /// The matched element, if any.
    pub fn element(&self) -> Option<NodeId> {
        self.element
    }

    /// The controller's own model.
    pub fn model(&self) -> &AnyModel {
        &self.model
    }

    fn step(&self, value: &Value, name: &str) -> Value {
        match value {
            Value::Node(node) => self
                .document
                .map_or(Value::Undefined, |doc| doc.property(*node, name)),
            other => other.property(name),
        }
    }

    fn nearest_model(&self, state: TypeId) -> Option<AnyModel> {
        if let (Some(doc), Some(scope), Some(origin)) =
            (self.document, self.scope, self.target.or(self.element))
        {
            let found = doc
                .ancestors(origin)
                .into_iter()
                .flat_map(|node| scope.models_at(node))
                .find(|model| model.state_type() == state);
            if found.is_some() {
                return found;
            }
        }
        (self.model.state_type() == state).then(|| self.model.clone())
    }
}

/// Resolve one argument.
pub fn resolve(descriptor: &ArgDescriptor, ctx: &DispatchContext<'_>) -> Resolved {
    match descriptor {
        ArgDescriptor::Path(path) => {
            let Some((first, rest)) = path.split_first() else {
                return Resolved::Value(Value::Undefined);
            };
            let mut value = ctx.event.property(first);
            for name in rest {
                if value.is_nullish() {
                    return Resolved::Value(Value::Undefined);
                }
                value = ctx.step(&value, name);
            }
            Resolved::Value(value)
        }
        ArgDescriptor::NearestModel { state, .. } => ctx
            .nearest_model(*state)
            .map_or(Resolved::Skip, |model| Resolved::Value(Value::Model(model))),
    }
}

/// Resolve every argument, or `None` as soon as one is skipped.
pub fn resolve_all(descriptors: &[ArgDescriptor], ctx: &DispatchContext<'_>) -> Option<Vec<Value>> {
    descriptors
        .iter()
        .map(|descriptor| match resolve(descriptor, ctx) {
            Resolved::Value(value) => Some(value),
            Resolved::Skip => None,
        })
        .collect()
}

/// Resolve the arguments of `binding` and run it on `controller`.
///
/// Skips are reported as [`Invocation::Skipped`]; handler errors propagate.
pub fn invoke<C>(
    controller: &C,
    binding: &BindingDescriptor<C>,
    ctx: &DispatchContext<'_>,
) -> Result<Invocation, BoxError> {
    let Some(args) = resolve_all(binding.args(), ctx) else {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            event = binding.event(),
            selector = %binding.selector(),
            handler = binding.name().unwrap_or("<anonymous>"),
            "argument unresolved, handler skipped"
        );
        return Ok(Invocation::Skipped);
    };

    let outcome = binding.invoke(controller, args)?;

    #[cfg(feature = "tracing")]
    if outcome == Invocation::Skipped {
        tracing::trace!(
            event = binding.event(),
            selector = %binding.selector(),
            handler = binding.name().unwrap_or("<anonymous>"),
            "argument type mismatch, handler skipped"
        );
    }

    Ok(outcome)
}
