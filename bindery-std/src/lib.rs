//! # bindery-std
//!
//! Runtime pieces of the Bindery controller framework.
//!
//! This crate provides:
//! - **Host document**: [`dom::Document`], an in-process element tree with
//!   bubbling native events
//! - **Argument resolution**: [`resolve`], event property paths and nearest
//!   model lookup
//! - **Delegated dispatch**: [`Dispatcher`], one native listener per root and
//!   event type
//! - **Lifecycle**: [`Binder`], binding controllers while components are
//!   mounted, and [`bind_model`] for controllers without a view
//! - **Testing utilities**: [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use bindery_core;

pub mod dispatcher;
pub mod dom;
pub mod error;
pub mod lifecycle;
pub mod resolve;
pub mod testing;

pub use dispatcher::{DispatchReport, Dispatcher, RegistrationId};
pub use error::{BindError, DomError};
pub use lifecycle::{bind_model, Binder, BoundController, ComponentId, ControllerClass, Mount};
