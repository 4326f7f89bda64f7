//! Opaque variant argument
//!
//! A [`Variant`] captures one stack slot without committing to a native
//! type up front. Methods that accept "anything" take a `Variant` and
//! classify it with the accessors.

use serde_json::Value as DynamicValue;

use crate::context::{ScriptStack, ValueKind};
use crate::dynamic;

/// Snapshot of a single script value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    /// nil or missing argument
    #[default]
    Nil,
    /// Boolean
    Boolean(bool),
    /// Number with an exact integer representation
    Integer(i64),
    /// Float number
    Number(f64),
    /// String
    String(String),
    /// Table, converted through the dynamic value bridge
    Table(DynamicValue),
    /// Value with no native counterpart (function, userdata, thread)
    Opaque(ValueKind),
}

impl Variant {
    /// Capture the value at `idx`.
    pub fn fetch(stack: &mut dyn ScriptStack, idx: i32) -> Self {
        match stack.kind(idx) {
            ValueKind::None | ValueKind::Nil => Variant::Nil,
            ValueKind::Boolean => Variant::Boolean(stack.to_boolean(idx)),
            ValueKind::Number => match stack.to_integer(idx) {
                Some(i) if stack.is_integer(idx) => Variant::Integer(i),
                _ => Variant::Number(stack.to_number(idx).unwrap_or(f64::NAN)),
            },
            ValueKind::String => Variant::String(stack.to_str(idx).unwrap_or_default()),
            ValueKind::Table => Variant::Table(dynamic::to_dynamic(stack, idx)),
            kind @ (ValueKind::Function | ValueKind::Userdata | ValueKind::Thread) => {
                Variant::Opaque(kind)
            }
        }
    }

    /// Push the captured value back. Opaque values push nil.
    pub fn push(&self, stack: &mut dyn ScriptStack) {
        match self {
            Variant::Nil | Variant::Opaque(_) => stack.push_nil(),
            Variant::Boolean(b) => stack.push_boolean(*b),
            Variant::Integer(i) => crate::codec::push_integer(stack, *i),
            Variant::Number(n) => stack.push_number(*n),
            Variant::String(s) => stack.push_string(s),
            Variant::Table(value) => dynamic::from_dynamic(stack, value),
        }
    }

    /// Runtime kind of the captured value
    pub fn kind(&self) -> ValueKind {
        match self {
            Variant::Nil => ValueKind::Nil,
            Variant::Boolean(_) => ValueKind::Boolean,
            Variant::Integer(_) | Variant::Number(_) => ValueKind::Number,
            Variant::String(_) => ValueKind::String,
            Variant::Table(_) => ValueKind::Table,
            Variant::Opaque(kind) => *kind,
        }
    }

    /// Whether the value is nil or was missing
    pub fn is_nil(&self) -> bool {
        matches!(self, Variant::Nil)
    }

    /// Boolean value, following runtime truthiness
    pub fn as_bool(&self) -> bool {
        !matches!(self, Variant::Nil | Variant::Boolean(false))
    }

    /// Integer value of an integer, an integral float or a numeric string
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Variant::Integer(i) => Some(*i),
            Variant::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            Variant::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Float value of a number or numeric string
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Variant::Integer(i) => Some(*i as f64),
            Variant::Number(n) => Some(*n),
            Variant::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// String value of a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into a dynamic value tree
    pub fn into_dynamic(self) -> DynamicValue {
        match self {
            Variant::Nil | Variant::Opaque(_) => DynamicValue::Null,
            Variant::Boolean(b) => DynamicValue::Bool(b),
            Variant::Integer(i) => DynamicValue::from(i),
            Variant::Number(n) => serde_json::Number::from_f64(n)
                .map(DynamicValue::Number)
                .unwrap_or(DynamicValue::Null),
            Variant::String(s) => DynamicValue::String(s),
            Variant::Table(value) => value,
        }
    }
}
