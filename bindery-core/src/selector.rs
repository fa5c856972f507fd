//! Binding selectors.
//!
//! A selector is either the reserved token `model`, binding to change
//! notifications of the controller's own model, or a single class selector
//! `.some-class`, binding to DOM events that bubble through an element
//! carrying that class. Compound selectors are rejected so delegation stays
//! unambiguous.

use crate::error::DeclarationError;
use std::{fmt, str::FromStr};

/// The reserved selector for model change bindings.
pub const MODEL_SELECTOR: &str = "model";

/// The event name model change bindings listen to.
pub const MODEL_CHANGE_EVENT: &str = "change";

/// A validated binding selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// The controller's own model.
    Model,
    /// A single class name, stored without the leading dot.
    Class(String),
}

impl Selector {
    /// Parse a selector string.
    ///
    /// Accepts `model` or anything matching `^\.[A-Za-z_-][A-Za-z0-9_-]*$`.
    pub fn parse(selector: &str) -> Result<Self, DeclarationError> {
        if selector == MODEL_SELECTOR {
            return Ok(Selector::Model);
        }
        match selector.strip_prefix('.') {
            Some(name) if is_class_name(name) => Ok(Selector::Class(name.to_owned())),
            _ => Err(DeclarationError::InvalidSelector(selector.to_owned())),
        }
    }

    /// The class name for class selectors.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Selector::Class(name) => Some(name),
            Selector::Model => None,
        }
    }

    /// Whether this is the `model` selector.
    pub fn is_model(&self) -> bool {
        matches!(self, Selector::Model)
    }
}

/// Validate an `(event, selector)` pair the way a binding declaration does.
pub fn validate(event: &str, selector: &str) -> Result<Selector, DeclarationError> {
    let parsed = Selector::parse(selector)?;
    if event.is_empty() {
        return Err(DeclarationError::MissingEvent(selector.to_owned()));
    }
    if parsed.is_model() && event != MODEL_CHANGE_EVENT {
        return Err(DeclarationError::InvalidModelEvent(event.to_owned()));
    }
    Ok(parsed)
}

fn is_class_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '-' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl FromStr for Selector {
    type Err = DeclarationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Model => f.write_str(MODEL_SELECTOR),
            Selector::Class(name) => write!(f, ".{name}"),
        }
    }
}
