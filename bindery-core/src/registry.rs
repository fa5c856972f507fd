//! Binding registry.
//!
//! Per controller type metadata, built once from [`Bindings::declare`] the
//! first time the type is instantiated or inspected, then cached for the
//! rest of the process. The result of a failed declaration is cached too:
//! a controller type with an invalid selector never becomes usable.
//!
//! The cache is thread-local because the whole binding runtime is
//! single-threaded (`Rc` based); one thread sees one registry.

use crate::{
    controller::Bindings,
    descriptor::{ControllerBindings, Declarations},
    error::DeclarationError,
};
use std::{
    any::{Any, TypeId},
    cell::RefCell,
    collections::HashMap,
    rc::Rc,
};

type Entry<C> = Result<Rc<ControllerBindings<C>>, DeclarationError>;

thread_local! {
    static CACHE: RefCell<HashMap<TypeId, Rc<dyn Any>>> = RefCell::new(HashMap::new());
}

/// The bindings of controller type `C`.
///
/// Idempotent: every call after the first returns the cached result.
pub fn register<C: Bindings>() -> Result<Rc<ControllerBindings<C>>, DeclarationError> {
    let key = TypeId::of::<C>();
    let cached = CACHE.with(|cache| cache.borrow().get(&key).cloned());
    if let Some(entry) = cached.as_ref().and_then(|e| e.downcast_ref::<Entry<C>>()) {
        return entry.clone();
    }

    // `declare` is user code; no cache borrow is held while it runs.
    let mut declarations = Declarations::new();
    C::declare(&mut declarations);
    let entry: Entry<C> = declarations.finish().map(Rc::new);

    #[cfg(feature = "tracing")]
    match &entry {
        Ok(bindings) => tracing::debug!(
            controller = std::any::type_name::<C>(),
            bindings = bindings.len(),
            "registered controller bindings"
        ),
        Err(err) => tracing::debug!(
            controller = std::any::type_name::<C>(),
            error = %err,
            "rejected controller bindings"
        ),
    }

    CACHE.with(|cache| {
        cache
            .borrow_mut()
            .insert(key, Rc::new(entry.clone()) as Rc<dyn Any>)
    });
    entry
}

/// Whether `C` has already been registered on this thread.
pub fn is_registered<C: Bindings>() -> bool {
    CACHE.with(|cache| cache.borrow().contains_key(&TypeId::of::<C>()))
}

/// Number of controller types registered on this thread.
pub fn registered_count() -> usize {
    CACHE.with(|cache| cache.borrow().len())
}
