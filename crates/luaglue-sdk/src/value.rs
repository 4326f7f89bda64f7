//! Closed value kinds exchanged across the stack boundary
//!
//! Every supported parameter and return type maps onto one variant of the
//! enums below, and the codec handles each enum with one exhaustive match
//! per direction. Adding a kind therefore breaks the build at every place
//! that has to learn about it.

use serde_json::Value as DynamicValue;

use crate::reference::ScriptRef;
use crate::variant::Variant;

// ============================================================================
// Parameter descriptors
// ============================================================================

/// Declared native type of one method parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// `i32`, optional (missing slot reads as 0)
    Int32,
    /// `u32`, optional (missing slot reads as 0)
    UInt32,
    /// `i64`, optional (missing slot reads as 0)
    Int64,
    /// `f64`
    Number,
    /// `bool`
    Bool,
    /// `String`
    Str,
    /// Persisted registry reference
    Ref,
    /// Opaque variant, classified on use
    Variant,
    /// Dynamic value tree
    Dynamic,
    /// No value; only valid as the sole entry of a nullary signature
    Void,
}

impl ParamKind {
    /// Human readable name, used in traces and signature errors
    pub fn name(self) -> &'static str {
        match self {
            ParamKind::Int32 => "i32",
            ParamKind::UInt32 => "u32",
            ParamKind::Int64 => "i64",
            ParamKind::Number => "f64",
            ParamKind::Bool => "bool",
            ParamKind::Str => "string",
            ParamKind::Ref => "ref",
            ParamKind::Variant => "variant",
            ParamKind::Dynamic => "dynamic",
            ParamKind::Void => "void",
        }
    }
}

/// Ordered parameter descriptor list of one method.
///
/// Invariant: the length equals the native arity. A list consisting of a
/// single [`ParamKind::Void`] is normalised to the empty list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParamList(Vec<ParamKind>);

impl ParamList {
    /// Validate and normalise a descriptor list.
    pub fn new(kinds: &[ParamKind]) -> crate::GlueResult<Self> {
        if kinds == [ParamKind::Void] {
            return Ok(ParamList(Vec::new()));
        }
        if let Some(pos) = kinds.iter().position(|k| *k == ParamKind::Void) {
            return Err(crate::GlueError::Signature(format!(
                "'void' at parameter {} of {}; it may only appear alone",
                pos + 1,
                kinds.len()
            )));
        }
        Ok(ParamList(kinds.to_vec()))
    }

    /// Native arity
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// Descriptors in declaration order
    pub fn kinds(&self) -> &[ParamKind] {
        &self.0
    }
}

// ============================================================================
// Fetched arguments
// ============================================================================

/// One argument fetched from the stack, tagged by its [`ParamKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// From [`ParamKind::Int32`]
    Int32(i32),
    /// From [`ParamKind::UInt32`]
    UInt32(u32),
    /// From [`ParamKind::Int64`]
    Int64(i64),
    /// From [`ParamKind::Number`]
    Number(f64),
    /// From [`ParamKind::Bool`]
    Bool(bool),
    /// From [`ParamKind::Str`]
    Str(String),
    /// From [`ParamKind::Ref`]
    Ref(ScriptRef),
    /// From [`ParamKind::Variant`]
    Variant(Variant),
    /// From [`ParamKind::Dynamic`]
    Dynamic(DynamicValue),
}

impl Arg {
    /// Kind this argument was fetched as
    pub fn kind(&self) -> ParamKind {
        match self {
            Arg::Int32(_) => ParamKind::Int32,
            Arg::UInt32(_) => ParamKind::UInt32,
            Arg::Int64(_) => ParamKind::Int64,
            Arg::Number(_) => ParamKind::Number,
            Arg::Bool(_) => ParamKind::Bool,
            Arg::Str(_) => ParamKind::Str,
            Arg::Ref(_) => ParamKind::Ref,
            Arg::Variant(_) => ParamKind::Variant,
            Arg::Dynamic(_) => ParamKind::Dynamic,
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// A native scalar to push onto the stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Signed 32-bit integer
    Int32(i32),
    /// Unsigned 32-bit integer
    UInt32(u32),
    /// 64-bit integer
    Int64(i64),
    /// Float
    Number(f64),
    /// Boolean
    Bool(bool),
    /// String
    Str(String),
    /// nil
    Nil,
    /// The value behind a registry reference
    Ref(ScriptRef),
}

/// Encoded form of a method's return value.
#[derive(Debug, Clone, PartialEq)]
pub enum Ret {
    /// No results
    Void,
    /// One scalar result
    Scalar(Scalar),
    /// One result built from a dynamic value tree
    Dynamic(DynamicValue),
}
