//! Error types for Bindery.
//!
//! - [`DeclarationError`] - A controller declared a binding that can never work
//! - [`BoxError`] - Errors raised by handler bodies, passed through untouched

use thiserror::Error;

/// A boxed error type for handler results.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while a controller type declares its bindings.
///
/// These are definition-time errors: the controller type cannot be used
/// until the declaration is fixed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    /// The selector is neither `model` nor a single `.class` selector.
    #[error("invalid selector \"{0}\", selector should be just \".some-class\" or \"model\"")]
    InvalidSelector(String),

    /// A `model` binding listens to something other than `change`.
    #[error("invalid event \"{0}\" for selector \"model\", model bindings only listen to \"change\"")]
    InvalidModelEvent(String),

    /// The event name is empty.
    #[error("missing event name for selector \"{0}\"")]
    MissingEvent(String),

    /// The handler takes a different number of arguments than were declared.
    #[error(
        "handler `{handler}` takes {expected} argument(s) but {declared} argument descriptor(s) were declared"
    )]
    ArgumentCount {
        /// Handler name, or the selector when the handler is anonymous.
        handler: String,
        /// Arguments the handler accepts.
        expected: usize,
        /// Argument descriptors declared for it.
        declared: usize,
    },

    /// A property path feeds a parameter that cannot hold `Undefined`.
    #[error(
        "handler `{handler}` reads \"{path}\" into argument {index}, which cannot be undefined; take it as `Option<_>` or `Value`"
    )]
    UndefinedPath {
        /// Handler name, or the selector when the handler is anonymous.
        handler: String,
        /// Position of the parameter.
        index: usize,
        /// The property path, dot separated.
        path: String,
    },
}

impl DeclarationError {
    /// The offending selector, when the error is about one.
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::InvalidSelector(selector) | Self::MissingEvent(selector) => Some(selector),
            Self::InvalidModelEvent(_) => Some(crate::selector::MODEL_SELECTOR),
            Self::ArgumentCount { .. } | Self::UndefinedPath { .. } => None,
        }
    }
}
