//! # bindery-core
//!
//! Core types for the Bindery controller binding framework.
//!
//! This crate has minimal dependencies and holds everything that does not
//! need a document: the observable [`Model`], the [`Value`] currency of
//! argument resolution, [`Selector`]s, binding descriptors and the
//! per-type binding [`registry`].
//!
//! # Layers
//!
//! ## Model ([`Model`], [`ModelState`])
//!
//! Observable state with partial updates and synchronous, ordered change
//! notification.
//!
//! ## Declarations ([`Bindings`], [`Declarations`], [`BindingDescriptor`])
//!
//! What a controller reacts to: an event name, a selector (`model` or one
//! `.class`) and an argument plan ([`ArgDescriptor`]) per handler.
//!
//! ## Registry ([`registry::register`])
//!
//! Declarations are evaluated once per controller type and cached.
//!
//! # Error Types
//!
//! - [`DeclarationError`] - Invalid declarations, fatal for the controller type
//! - [`BoxError`] - Handler errors, passed through unmodified

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod controller;
mod descriptor;
mod error;
mod event;
mod model;
pub mod registry;
mod selector;
mod value;

// Re-exports
pub use controller::{Bindings, Controller};
pub use descriptor::{
    ArgDescriptor, BindingDescriptor, ControllerBindings, Declarations, FromArgs,
    IntoHandlerResult, Invocation, On,
};
pub use error::{BoxError, DeclarationError};
pub use event::RawEvent;
pub use model::{AnyModel, ChangeEvent, ChangeSet, ListenerId, Model, ModelState};
pub use selector::{MODEL_CHANGE_EVENT, MODEL_SELECTOR, Selector, validate};
pub use value::{FromValue, NodeId, ToValue, Value};
