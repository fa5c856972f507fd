//! Controller traits.
//!
//! A controller is a stateless-by-convention object created once per
//! component instance, holding the component's model. Its declared handlers
//! are the code paths that mutate that model in response to events.
//!
//! Handlers take `&self`: a handler may trigger another handler of the same
//! controller (a click handler updating the model fires the controller's
//! own `change` handler) and that must not conflict.

use crate::{descriptor::Declarations, error::BoxError, model::Model, model::ModelState};

/// The binding declarations of a controller type.
///
/// Implemented by `#[controller]`, or by hand. A controller without bindings
/// can rely on the default, empty `declare`.
pub trait Bindings: Sized + 'static {
    /// Declare every handler of this type. Called once per type.
    fn declare(declarations: &mut Declarations<Self>) {
        let _ = declarations;
    }
}

/// A controller type bound to a model of state `State`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Controller`",
    label = "missing `Controller` implementation",
    note = "Controllers implement `Controller` (state type and constructor) and `Bindings`."
)]
pub trait Controller: Bindings {
    /// The state type of the model this controller works on.
    type State: ModelState;

    /// Create the controller for `model`.
    ///
    /// Runs on every mount, and again when the component's model is
    /// replaced.
    fn new(model: Model<Self::State>) -> Result<Self, BoxError>;
}
