//! Scalar codec
//!
//! Converts single stack slots into [`Arg`]s and [`Scalar`]s back into stack
//! values. One exhaustive match per direction.
//!
//! Conversion rules:
//! - integer kinds read exact integers directly and truncate other numbers
//!   (numeric strings included); a slot above the top reads as `0`
//! - integer to narrower integer conversions wrap like C casts, float to
//!   integer conversions truncate toward zero and saturate
//! - pushing an integer that does not fit the runtime's integer width
//!   produces a float instead

use crate::context::{ScriptStack, ValueKind};
use crate::dynamic;
use crate::error::{GlueError, GlueResult};
use crate::reference::ScriptRef;
use crate::value::{Arg, ParamKind, Ret, Scalar};
use crate::variant::Variant;

// ============================================================================
// Fetch
// ============================================================================

/// Fetch the slot at `idx` as `kind`.
///
/// Type errors report `idx` as the argument number; the fetch pipeline
/// rebases it to the method's own argument numbering.
pub fn fetch(stack: &mut dyn ScriptStack, idx: i32, kind: ParamKind) -> GlueResult<Arg> {
    let idx = stack.abs_index(idx);
    let arg = match kind {
        ParamKind::Int32 => Arg::Int32(fetch_integer(stack, idx)? as i32),
        ParamKind::UInt32 => Arg::UInt32(fetch_integer(stack, idx)? as u32),
        ParamKind::Int64 => Arg::Int64(fetch_integer(stack, idx)?),
        ParamKind::Number => Arg::Number(check_number(stack, idx)?),
        ParamKind::Bool => Arg::Bool(check_boolean(stack, idx)?),
        ParamKind::Str => Arg::Str(check_string(stack, idx)?),
        ParamKind::Ref => Arg::Ref(ScriptRef::fetch(stack, idx)),
        ParamKind::Variant => Arg::Variant(Variant::fetch(stack, idx)),
        ParamKind::Dynamic => Arg::Dynamic(dynamic::to_dynamic(stack, idx)),
        ParamKind::Void => {
            return Err(GlueError::Signature(format!(
                "cannot fetch 'void' from slot {idx}"
            )))
        }
    };
    Ok(arg)
}

/// Integer at `idx`, `0` when the slot is above the top.
pub fn fetch_integer(stack: &dyn ScriptStack, idx: i32) -> GlueResult<i64> {
    if idx > stack.top() {
        return Ok(0);
    }
    if stack.is_integer(idx) {
        if let Some(i) = stack.to_integer(idx) {
            return Ok(i);
        }
    }
    Ok(check_number(stack, idx)? as i64)
}

/// Number or numeric string at `idx`.
pub fn check_number(stack: &dyn ScriptStack, idx: i32) -> GlueResult<f64> {
    stack
        .to_number(idx)
        .ok_or_else(|| type_error(stack, idx, ValueKind::Number))
}

/// String, or number rendered as a string, at `idx`.
pub fn check_string(stack: &dyn ScriptStack, idx: i32) -> GlueResult<String> {
    match stack.kind(idx) {
        ValueKind::String | ValueKind::Number => stack
            .to_str(idx)
            .ok_or_else(|| type_error(stack, idx, ValueKind::String)),
        _ => Err(type_error(stack, idx, ValueKind::String)),
    }
}

/// Boolean at `idx`; an exact integer reads as `!= 0`.
pub fn check_boolean(stack: &dyn ScriptStack, idx: i32) -> GlueResult<bool> {
    match stack.kind(idx) {
        ValueKind::Boolean => Ok(stack.to_boolean(idx)),
        ValueKind::Number if stack.is_integer(idx) => Ok(stack.to_integer(idx) != Some(0)),
        _ => Err(type_error(stack, idx, ValueKind::Boolean)),
    }
}

fn type_error(stack: &dyn ScriptStack, idx: i32, expected: ValueKind) -> GlueError {
    GlueError::TypeMismatch {
        arg: idx,
        expected: expected.type_name(),
        got: stack.kind(idx).type_name(),
    }
}

// ============================================================================
// Push
// ============================================================================

/// Push a scalar.
pub fn push(stack: &mut dyn ScriptStack, value: Scalar) {
    match value {
        Scalar::Int32(i) => push_integer(stack, i as i64),
        Scalar::UInt32(u) => push_integer(stack, u as i64),
        Scalar::Int64(i) => push_integer(stack, i),
        Scalar::Number(n) => stack.push_number(n),
        Scalar::Bool(b) => stack.push_boolean(b),
        Scalar::Str(s) => stack.push_string(&s),
        Scalar::Nil => stack.push_nil(),
        Scalar::Ref(r) => r.push(stack),
    }
}

/// Push an integer, promoting to float when it exceeds the runtime's width.
pub fn push_integer(stack: &mut dyn ScriptStack, value: i64) {
    if stack.integer_width().fits(value) {
        stack.push_integer(value);
    } else {
        stack.push_number(value as f64);
    }
}

/// Push an unsigned integer, promoting to float when it exceeds the
/// runtime's width.
pub fn push_unsigned(stack: &mut dyn ScriptStack, value: u64) {
    if stack.integer_width().fits_unsigned(value) {
        stack.push_integer(value as i64);
    } else {
        stack.push_number(value as f64);
    }
}

/// Push an encoded return value, returning the number of results.
pub fn encode(stack: &mut dyn ScriptStack, ret: Ret) -> usize {
    match ret {
        Ret::Void => 0,
        Ret::Scalar(value) => {
            push(stack, value);
            1
        }
        Ret::Dynamic(value) => {
            dynamic::from_dynamic(stack, &value);
            1
        }
    }
}
