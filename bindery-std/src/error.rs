//! Error types for the binding runtime.
//!
//! - [`BindError`] - Mounting, re-rendering or standalone binding failed
//! - [`DomError`] - Invalid operation on the host document

use crate::lifecycle::ComponentId;
use bindery_core::{BoxError, DeclarationError, NodeId};
use thiserror::Error;

/// Errors raised while binding controllers to a component.
#[derive(Error, Debug)]
pub enum BindError {
    /// The controller type has an invalid declaration.
    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    /// The component model does not have the controller's state type.
    #[error("controller `{controller}` expects a `{expected}` model, got `{actual}`")]
    ModelMismatch {
        /// The controller type.
        controller: &'static str,
        /// The state type the controller works on.
        expected: &'static str,
        /// The state type of the model it was given.
        actual: &'static str,
    },

    /// The controller constructor failed.
    #[error("controller `{controller}` failed to construct")]
    Construct {
        /// The controller type.
        controller: &'static str,
        /// The constructor's error.
        #[source]
        source: BoxError,
    },

    /// The component is not mounted.
    #[error("{0} is not mounted")]
    NotMounted(ComponentId),

    /// The host document rejected an operation.
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Errors raised by the host document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The node does not exist.
    #[error("{0} does not exist")]
    UnknownNode(NodeId),

    /// Inserting the node would make it its own ancestor.
    #[error("cannot insert {child} into {parent}: it would become its own ancestor")]
    HierarchyRequest {
        /// The would-be parent.
        parent: NodeId,
        /// The node being inserted.
        child: NodeId,
    },
}
