//! # bindery - Declarative Event Binding for UI Controllers
//!
//! `bindery` lets a UI component declare, through small annotated handler
//! methods on its controllers, which DOM events or model changes it reacts
//! to. Listeners are never attached by hand: a delegated dispatcher routes
//! native events to the bound handlers, and the lifecycle binder attaches
//! every binding exactly while its component is mounted.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bindery::prelude::*;
//!
//! #[derive(Clone, Default, ModelState)]
//! struct Counter {
//!     counter: i32,
//! }
//!
//! struct CounterController {
//!     model: Model<Counter>,
//! }
//!
//! #[controller]
//! impl CounterController {
//!     #[on("click", ".button")]
//!     fn increment(&self) -> Result<(), BoxError> {
//!         self.model.set(|s| s.counter += 1).map(|_| ())
//!     }
//! }
//!
//! impl Controller for CounterController {
//!     type State = Counter;
//!
//!     fn new(model: Model<Counter>) -> Result<Self, BoxError> {
//!         Ok(Self { model })
//!     }
//! }
//!
//! let document = Document::new();
//! let binder = Binder::new(document.clone());
//! let root = document.element(document.body(), "div", "counter")?;
//! let button = document.element(root, "button", "button")?;
//!
//! let model = Model::new(Counter::default());
//! binder.mount(Mount::new(root, &model).controller::<CounterController>())?;
//!
//! document.dispatch_event(&DomEvent::new("click", button))?;
//! assert_eq!(model.with(|s| s.counter), 1);
//! ```
//!
//! ## Features
//!
//! - `macros` (default): `#[controller]` and `#[derive(ModelState)]`
//! - `tracing` (default): `debug`/`trace` events for registration, mounting
//!   and dispatch

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use bindery_core::{
    // Values
    AnyModel,
    // Descriptors
    ArgDescriptor,
    BindingDescriptor,
    // Controller traits
    Bindings,
    // Error types
    BoxError,
    // Model
    ChangeEvent,
    ChangeSet,
    Controller,
    ControllerBindings,
    DeclarationError,
    Declarations,
    FromArgs,
    FromValue,
    IntoHandlerResult,
    Invocation,
    ListenerId,
    // Selectors
    MODEL_CHANGE_EVENT,
    MODEL_SELECTOR,
    Model,
    ModelState,
    NodeId,
    On,
    // Events
    RawEvent,
    Selector,
    ToValue,
    Value,
    validate,
};

pub use bindery_std::{
    BindError, Binder, BoundController, ComponentId, ControllerClass, DispatchReport, Dispatcher,
    DomError, Mount, RegistrationId, bind_model,
};

/// Binding registry.
pub mod registry {
    pub use bindery_core::registry::{is_registered, register, registered_count};
}

/// Host document.
pub mod dom {
    pub use bindery_std::dom::{Document, DomEvent, NativeListener, NativeListenerId};
}

/// Argument resolution.
pub mod resolve {
    pub use bindery_std::resolve::{
        DispatchContext, ModelScope, Resolved, invoke, resolve, resolve_all,
    };
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use bindery_std::testing::*;
}

pub use dom::{Document, DomEvent};

/// Prelude module - common imports for Bindery.
///
/// # Usage
///
/// ```rust,ignore
/// use bindery::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AnyModel, BindError, Binder, Bindings, BoxError, ChangeEvent, Controller, Declarations,
        Document, DomEvent, Model, ModelState, Mount, NodeId, ToValue, Value,
    };

    #[cfg(feature = "macros")]
    pub use crate::controller;
}

#[cfg(feature = "macros")]
pub use bindery_macros::{ModelState, controller};
