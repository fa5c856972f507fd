//! Procedural macros for Bindery.
//!
//! - `#[controller]` - Collects `#[on(..)]` handler methods of an inherent
//!   impl block into a `Bindings` implementation
//! - `#[derive(ModelState)]` - Field-wise change detection and field access

use proc_macro::TokenStream;

mod controller;
mod model;

/// Turn the `#[on(event, selector)]` methods of an inherent impl block into
/// the controller's binding declarations.
///
/// Handler parameters declare where their value comes from:
///
/// - `#[arg("target", "value")]` - a property path into the raw event; the
///   parameter must be `Option<_>` or `Value` since the path can miss
/// - `#[arg(UserModel)]` - the nearest model whose state is `UserModel`
///
/// Selectors are validated while expanding: anything but `model` or a
/// single `.class` is a compile error.
///
/// ```rust,ignore
/// #[controller]
/// impl CounterController {
///     #[on("click", ".button")]
///     fn increment(&self) -> Result<(), BoxError> {
///         self.model.set(|s| s.counter += 1).map(|_| ())
///     }
///
///     #[on("keyup", ".input")]
///     fn rename(&self, #[arg("target", "value")] name: Option<String>) {
///         // ...
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn controller(attr: TokenStream, item: TokenStream) -> TokenStream {
    controller::controller_impl(attr, item)
}

/// Derive `ModelState`.
///
/// Every field must implement `PartialEq` (change detection) and `ToValue`
/// (field access by name).
#[proc_macro_derive(ModelState)]
pub fn derive_model_state(input: TokenStream) -> TokenStream {
    model::derive_model_state_impl(input)
}
