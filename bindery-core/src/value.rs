//! Dynamic values produced by argument resolution.
//!
//! Handlers are plain typed methods, while the data they ask for (a property
//! path into an event, a field of a model, a node of the document) is only
//! known at run time. [`Value`] is the currency in between: resolution
//! produces values, [`FromValue`] turns them into handler parameters, and
//! [`ToValue`] exposes model fields.

use crate::model::{AnyModel, Model, ModelState};
use std::fmt;

/// Identifier of a node in a host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Create an identifier from an arena index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The arena index of this node.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A dynamically typed value.
///
/// `Undefined` is what a property path yields when any step along it is
/// missing. It is a regular value, not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Missing property.
    #[default]
    Undefined,
    /// Explicitly empty, e.g. the `parentNode` of a detached node.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. All numbers are `f64`, as in the DOM.
    Number(f64),
    /// A string.
    String(String),
    /// A node of the host document.
    Node(NodeId),
    /// A model.
    Model(AnyModel),
    /// A list of values.
    List(Vec<Value>),
}

impl Value {
    /// Whether this value is `Undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Whether this value is `Undefined` or `Null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// The string, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The number, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The node, if this is a node.
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// The model, if this is a model.
    pub fn as_model(&self) -> Option<&AnyModel> {
        match self {
            Self::Model(model) => Some(model),
            _ => None,
        }
    }

    /// Read a property of this value without any document context.
    ///
    /// Models expose their fields, lists and strings expose `length`, lists
    /// are indexable. Nodes need a document and yield `Undefined` here.
    pub fn property(&self, name: &str) -> Value {
        match self {
            Self::Model(model) => model.field(name),
            Self::List(items) => match name {
                "length" => Value::Number(items.len() as f64),
                index => index
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or_default(),
            },
            Self::String(s) if name == "length" => Value::Number(s.chars().count() as f64),
            _ => Value::Undefined,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Node(id) => write!(f, "{id}"),
            Self::Model(model) => write!(f, "[model {}]", model.state_name()),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value.into())
    }
}

impl From<NodeId> for Value {
    fn from(value: NodeId) -> Self {
        Value::Node(value)
    }
}

impl From<AnyModel> for Value {
    fn from(value: AnyModel) -> Self {
        Value::Model(value)
    }
}

// ============================================================================
// FromValue
// ============================================================================

/// Conversion from a resolved [`Value`] into a handler parameter.
///
/// Returning `None` means the value does not fit the parameter; the handler
/// is then not invoked for that event. A property path can always come out
/// `Undefined`, so parameters fed by a path must be `Option<T>` or [`Value`]
/// (see [`FromValue::ACCEPTS_UNDEFINED`]).
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as a handler argument",
    label = "missing `FromValue` implementation",
    note = "Handler parameters are converted from resolved values with `FromValue`."
)]
pub trait FromValue: Sized {
    /// Whether `Undefined` converts into this type.
    const ACCEPTS_UNDEFINED: bool = false;

    /// Convert the value, or `None` if it has the wrong shape.
    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for Value {
    const ACCEPTS_UNDEFINED: bool = true;

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Option<Self> {
        value.as_f64().map(|n| n as f32)
    }
}

macro_rules! impl_integer_value {
    ($($T:ty),+) => {
        $(
            impl FromValue for $T {
                fn from_value(value: Value) -> Option<Self> {
                    let n = value.as_f64()?;
                    // `MAX as f64` rounds up for 64-bit types; one past it is exact.
                    if n.fract() != 0.0 || n < <$T>::MIN as f64 || n >= <$T>::MAX as f64 + 1.0 {
                        return None;
                    }
                    Some(n as $T)
                }
            }

            impl ToValue for $T {
                fn to_value(&self) -> Value {
                    Value::Number(*self as f64)
                }
            }
        )+
    };
}

impl_integer_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromValue for NodeId {
    fn from_value(value: Value) -> Option<Self> {
        value.as_node()
    }
}

impl FromValue for AnyModel {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Model(model) => Some(model),
            _ => None,
        }
    }
}

impl<S: ModelState> FromValue for Model<S> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Model(model) => model.downcast::<S>(),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const ACCEPTS_UNDEFINED: bool = true;

    fn from_value(value: Value) -> Option<Self> {
        if value.is_nullish() {
            return Some(None);
        }
        T::from_value(value).map(Some)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

// ============================================================================
// ToValue
// ============================================================================

/// Conversion of a model field into a [`Value`].
///
/// `#[derive(ModelState)]` requires every field to implement this.
pub trait ToValue {
    /// Produce the value.
    fn to_value(&self) -> Value;
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_owned())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Number(*self)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Number((*self).into())
    }
}

impl ToValue for NodeId {
    fn to_value(&self) -> Value {
        Value::Node(*self)
    }
}

impl ToValue for AnyModel {
    fn to_value(&self) -> Value {
        Value::Model(self.clone())
    }
}

impl<S: ModelState> ToValue for Model<S> {
    fn to_value(&self) -> Value {
        Value::Model(self.to_any())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(value) => value.to_value(),
            None => Value::Undefined,
        }
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}
