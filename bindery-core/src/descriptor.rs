//! # Binding Descriptors
//!
//! Static metadata for one handler: its trigger (event name plus selector),
//! its argument resolution plan, and a type-erased entry point that converts
//! resolved [`Value`]s into the handler's typed parameters.
//!
//! Descriptors are collected through [`Declarations`], either by hand or by
//! the `#[controller]` attribute:
//!
//! ```rust,ignore
//! impl Bindings for FormController {
//!     fn declare(on: &mut Declarations<Self>) {
//!         on.on("change", ".input")
//!             .path(["target", "value"])
//!             .call(|this: &Self, (value,): (Option<String>,)| this.rename(value));
//!     }
//! }
//! ```

use crate::{
    error::{BoxError, DeclarationError},
    model::ModelState,
    selector::{self, Selector},
    value::{FromValue, Value},
};
use std::{any::TypeId, fmt, rc::Rc};

/// How one handler argument is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgDescriptor {
    /// Property path into the raw triggering event, e.g.
    /// `target -> parentNode -> className`.
    Path(Vec<String>),
    /// The nearest model whose state type is `state`.
    NearestModel {
        /// `TypeId` of the requested state type.
        state: TypeId,
        /// Name of the requested state type, for diagnostics.
        name: &'static str,
    },
}

impl ArgDescriptor {
    /// A property path descriptor.
    pub fn path<I, P>(path: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        ArgDescriptor::Path(path.into_iter().map(Into::into).collect())
    }

    /// A "nearest model of type `S`" descriptor.
    pub fn model<S: ModelState>() -> Self {
        ArgDescriptor::NearestModel {
            state: TypeId::of::<S>(),
            name: std::any::type_name::<S>(),
        }
    }
}

impl fmt::Display for ArgDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgDescriptor::Path(path) => write!(f, "path({})", path.join(".")),
            ArgDescriptor::NearestModel { name, .. } => write!(f, "model({name})"),
        }
    }
}

/// Outcome of one handler invocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// The handler ran.
    Invoked,
    /// An argument could not be produced; the handler did not run.
    Skipped,
}

/// Conversion of a handler's return value into a handler result.
///
/// - `()` → success
/// - `Result<(), E>` → success or `E` boxed
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be returned from a handler",
    label = "missing `IntoHandlerResult` implementation",
    note = "Handlers return `()` or `Result<(), E>`."
)]
pub trait IntoHandlerResult {
    /// Convert into a handler result.
    fn into_handler_result(self) -> Result<(), BoxError>;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_handler_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// Conversion of resolved values into a handler's parameter tuple.
pub trait FromArgs: Sized {
    /// Number of parameters.
    const ARITY: usize;

    /// Whether the parameter at `index` accepts `Undefined`.
    fn accepts_undefined(index: usize) -> bool;

    /// Convert the values, or `None` if any of them does not fit.
    fn from_args(args: Vec<Value>) -> Option<Self>;
}

impl FromArgs for () {
    const ARITY: usize = 0;

    fn accepts_undefined(_index: usize) -> bool {
        false
    }

    fn from_args(_args: Vec<Value>) -> Option<Self> {
        Some(())
    }
}

macro_rules! impl_from_args_tuple {
    ($arity:literal => $($T:ident),+) => {
        impl<$($T: FromValue,)+> FromArgs for ($($T,)+) {
            const ARITY: usize = $arity;

            fn accepts_undefined(index: usize) -> bool {
                [$(<$T as FromValue>::ACCEPTS_UNDEFINED),+]
                    .get(index)
                    .copied()
                    .unwrap_or(false)
            }

            #[allow(non_snake_case)]
            fn from_args(args: Vec<Value>) -> Option<Self> {
                let mut args = args.into_iter();
                $(
                    let $T = $T::from_value(args.next()?)?;
                )+
                Some(($($T,)+))
            }
        }
    };
}

impl_from_args_tuple!(1 => T1);
impl_from_args_tuple!(2 => T1, T2);
impl_from_args_tuple!(3 => T1, T2, T3);
impl_from_args_tuple!(4 => T1, T2, T3, T4);
impl_from_args_tuple!(5 => T1, T2, T3, T4, T5);
impl_from_args_tuple!(6 => T1, T2, T3, T4, T5, T6);
impl_from_args_tuple!(7 => T1, T2, T3, T4, T5, T6, T7);
impl_from_args_tuple!(8 => T1, T2, T3, T4, T5, T6, T7, T8);

type ErasedHandler<C> = dyn Fn(&C, Vec<Value>) -> Result<Invocation, BoxError>;

/// Metadata and entry point for one declared handler of controller `C`.
pub struct BindingDescriptor<C> {
    event: String,
    selector: Selector,
    args: Vec<ArgDescriptor>,
    name: Option<&'static str>,
    handler: Rc<ErasedHandler<C>>,
}

impl<C> BindingDescriptor<C> {
    /// The event name.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// The selector.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// The argument resolution plan, in parameter order.
    pub fn args(&self) -> &[ArgDescriptor] {
        &self.args
    }

    /// The handler name, when declared through `#[controller]` or `named`.
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    /// Call the handler with already resolved arguments.
    ///
    /// Returns [`Invocation::Skipped`] when a value does not convert to its
    /// parameter type.
    pub fn invoke(&self, controller: &C, args: Vec<Value>) -> Result<Invocation, BoxError> {
        (self.handler)(controller, args)
    }
}

impl<C> Clone for BindingDescriptor<C> {
    fn clone(&self) -> Self {
        Self {
            event: self.event.clone(),
            selector: self.selector.clone(),
            args: self.args.clone(),
            name: self.name,
            handler: Rc::clone(&self.handler),
        }
    }
}

impl<C> fmt::Debug for BindingDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingDescriptor")
            .field("event", &self.event)
            .field("selector", &self.selector)
            .field("args", &self.args)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// Collector for the bindings of one controller type.
///
/// Declaration order is preserved; it is the order in which bindings of the
/// same controller fire for one event. The first invalid declaration makes
/// the whole controller type unusable.
pub struct Declarations<C> {
    entries: Vec<BindingDescriptor<C>>,
    error: Option<DeclarationError>,
}

impl<C: 'static> Declarations<C> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            error: None,
        }
    }

    /// Start declaring a handler for `event` on `selector`.
    pub fn on(&mut self, event: &str, selector: &str) -> On<'_, C> {
        On {
            declarations: self,
            event: event.to_owned(),
            selector: selector.to_owned(),
            args: Vec::new(),
            name: None,
        }
    }

    /// Number of valid declarations so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: Result<BindingDescriptor<C>, DeclarationError>) {
        match entry {
            Ok(descriptor) => self.entries.push(descriptor),
            Err(err) => {
                if self.error.is_none() {
                    self.error = Some(err);
                }
            }
        }
    }

    pub(crate) fn finish(self) -> Result<ControllerBindings<C>, DeclarationError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(ControllerBindings {
                entries: self.entries,
            }),
        }
    }
}

/// Builder for one handler declaration. Finish it with [`On::call`].
#[must_use = "a binding is only declared once `call` is invoked"]
pub struct On<'a, C> {
    declarations: &'a mut Declarations<C>,
    event: String,
    selector: String,
    args: Vec<ArgDescriptor>,
    name: Option<&'static str>,
}

impl<C: 'static> On<'_, C> {
    /// Append an argument descriptor.
    pub fn arg(mut self, arg: ArgDescriptor) -> Self {
        self.args.push(arg);
        self
    }

    /// Append a property path argument.
    pub fn path<I, P>(self, path: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.arg(ArgDescriptor::path(path))
    }

    /// Append a "nearest model of type `S`" argument.
    pub fn model<S: ModelState>(self) -> Self {
        self.arg(ArgDescriptor::model::<S>())
    }

    /// Name the handler, for diagnostics.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Finish the declaration with its handler.
    pub fn call<A, F, R>(self, callback: F)
    where
        A: FromArgs + 'static,
        F: Fn(&C, A) -> R + 'static,
        R: IntoHandlerResult,
    {
        let On {
            declarations,
            event,
            selector,
            args,
            name,
        } = self;

        let entry = selector::validate(&event, &selector).and_then(|selector| {
            let handler_name = || name.map_or_else(|| format!("{event} {selector}"), str::to_owned);
            if args.len() != A::ARITY {
                return Err(DeclarationError::ArgumentCount {
                    handler: handler_name(),
                    expected: A::ARITY,
                    declared: args.len(),
                });
            }
            // A path can always miss; its parameter has to say so.
            for (index, arg) in args.iter().enumerate() {
                if let ArgDescriptor::Path(path) = arg {
                    if !A::accepts_undefined(index) {
                        return Err(DeclarationError::UndefinedPath {
                            handler: handler_name(),
                            index,
                            path: path.join("."),
                        });
                    }
                }
            }
            let handler: Rc<ErasedHandler<C>> = Rc::new(
                move |controller: &C, values: Vec<Value>| -> Result<Invocation, BoxError> {
                    let Some(args) = A::from_args(values) else {
                        return Ok(Invocation::Skipped);
                    };
                    callback(controller, args).into_handler_result()?;
                    Ok(Invocation::Invoked)
                },
            );
            Ok(BindingDescriptor {
                event,
                selector,
                args,
                name,
                handler,
            })
        });
        declarations.push(entry);
    }
}

/// The validated bindings of one controller type, in declaration order.
pub struct ControllerBindings<C> {
    entries: Vec<BindingDescriptor<C>>,
}

impl<C> ControllerBindings<C> {
    /// All bindings.
    pub fn iter(&self) -> impl Iterator<Item = &BindingDescriptor<C>> {
        self.entries.iter()
    }

    /// A binding by declaration index.
    pub fn get(&self, index: usize) -> Option<&BindingDescriptor<C>> {
        self.entries.get(index)
    }

    /// Bindings on the `model` selector, with their declaration index.
    pub fn model_bindings(&self) -> impl Iterator<Item = (usize, &BindingDescriptor<C>)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, b)| b.selector.is_model())
    }

    /// Bindings on class selectors, with their declaration index.
    pub fn class_bindings(&self) -> impl Iterator<Item = (usize, &BindingDescriptor<C>)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.selector.is_model())
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C> fmt::Debug for ControllerBindings<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.entries).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Sink {
        seen: RefCell<Vec<String>>,
    }

    fn sink() -> Sink {
        Sink {
            seen: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_declaration_order_is_kept() {
        let mut declarations = Declarations::<Sink>::new();
        declarations
            .on("click", ".left")
            .call(|p: &Sink, ()| p.seen.borrow_mut().push("left".into()));
        declarations
            .on("change", "model")
            .call(|p: &Sink, ()| p.seen.borrow_mut().push("model".into()));

        let bindings = declarations.finish().unwrap();
        let selectors: Vec<String> = bindings.iter().map(|b| b.selector().to_string()).collect();
        assert_eq!(selectors, vec![".left", "model"]);
        assert_eq!(bindings.model_bindings().map(|(i, _)| i).collect::<Vec<_>>(), vec![1]);
        assert_eq!(bindings.class_bindings().map(|(i, _)| i).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_first_error_wins() {
        let mut declarations = Declarations::<Sink>::new();
        declarations.on("click", ".button some").call(|_: &Sink, ()| ());
        declarations.on("click", ".button>some").call(|_: &Sink, ()| ());

        let err = declarations.finish().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid selector \".button some\", selector should be just \".some-class\" or \"model\""
        );
    }

    #[test]
    fn test_argument_count_is_checked() {
        let mut declarations = Declarations::<Sink>::new();
        declarations
            .on("click", ".btn")
            .named("on_click")
            .call(|_: &Sink, (_value,): (String,)| ());

        let err = declarations.finish().unwrap_err();
        assert_eq!(
            err,
            DeclarationError::ArgumentCount {
                handler: "on_click".into(),
                expected: 1,
                declared: 0,
            }
        );
    }

    #[test]
    fn test_path_parameters_must_accept_undefined() {
        let mut declarations = Declarations::<Sink>::new();
        declarations
            .on("mousemove", ".area")
            .named("on_move")
            .path(["clientX"])
            .path(["clientY"])
            .call(|_: &Sink, (_x, _y): (Option<f64>, f64)| ());

        let err = declarations.finish().unwrap_err();
        assert_eq!(
            err,
            DeclarationError::UndefinedPath {
                handler: "on_move".into(),
                index: 1,
                path: "clientY".into(),
            }
        );
        assert_eq!(
            err.to_string(),
            "handler `on_move` reads \"clientY\" into argument 1, which cannot be undefined; take it as `Option<_>` or `Value`"
        );
    }

    #[test]
    fn test_invoke_passes_undefined_and_skips_mismatches() {
        let mut declarations = Declarations::<Sink>::new();
        declarations
            .on("change", ".input")
            .path(["target", "value"])
            .call(|p: &Sink, (value,): (Option<String>,)| {
                p.seen
                    .borrow_mut()
                    .push(value.unwrap_or_else(|| "<undefined>".into()))
            });
        let bindings = declarations.finish().unwrap();
        let binding = bindings.get(0).unwrap();
        let p = sink();

        assert_eq!(
            binding.invoke(&p, vec![Value::from("hello")]).unwrap(),
            Invocation::Invoked
        );
        assert_eq!(
            binding.invoke(&p, vec![Value::Undefined]).unwrap(),
            Invocation::Invoked
        );
        // A defined value of the wrong type is still a mismatch.
        assert_eq!(
            binding.invoke(&p, vec![Value::Number(1.0)]).unwrap(),
            Invocation::Skipped
        );
        assert_eq!(
            *p.seen.borrow(),
            vec!["hello".to_string(), "<undefined>".to_string()]
        );
    }

    #[test]
    fn test_handler_errors_pass_through() {
        let mut declarations = Declarations::<Sink>::new();
        declarations
            .on("click", ".fail")
            .call(|_: &Sink, ()| -> Result<(), std::fmt::Error> { Err(std::fmt::Error) });
        let bindings = declarations.finish().unwrap();

        let err = bindings.get(0).unwrap().invoke(&sink(), Vec::new()).unwrap_err();
        assert!(err.downcast_ref::<std::fmt::Error>().is_some());
    }
}
