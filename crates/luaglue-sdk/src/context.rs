//! ScriptStack trait: abstract runtime stack operations
//!
//! Defines the narrow contract the embedding runtime implements. The codec,
//! the dynamic-value bridge and the dispatch binder only ever see
//! `&mut dyn ScriptStack`, so independent runtime instances stay isolated:
//! the persistent registry is reached through the stack handle, never
//! through global state.

use std::any::Any;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

// ============================================================================
// Value kinds
// ============================================================================

/// Runtime type tag of a stack slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Slot index is above the current top
    None,
    /// nil
    Nil,
    /// true / false
    Boolean,
    /// Integer or float number
    Number,
    /// Byte string
    String,
    /// Associative table
    Table,
    /// Callable
    Function,
    /// Full or light userdata
    Userdata,
    /// Coroutine
    Thread,
}

impl ValueKind {
    /// Name used by the runtime in error messages
    pub fn type_name(self) -> &'static str {
        match self {
            ValueKind::None => "no value",
            ValueKind::Nil => "nil",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Table => "table",
            ValueKind::Function => "function",
            ValueKind::Userdata => "userdata",
            ValueKind::Thread => "thread",
        }
    }

    /// `None` or `Nil`
    pub fn is_none_or_nil(self) -> bool {
        matches!(self, ValueKind::None | ValueKind::Nil)
    }
}

// ============================================================================
// Integer width
// ============================================================================

/// Width of the runtime's native integer type.
///
/// Decides when an integer must be promoted to a float on push. Both the
/// scalar codec and the dynamic-value bridge go through [`IntegerWidth::fits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegerWidth {
    /// 32-bit `lua_Integer`
    Bits32,
    /// 64-bit `lua_Integer`
    Bits64,
}

impl IntegerWidth {
    /// Width selected at build time (feature `int32`)
    #[cfg(feature = "int32")]
    pub const NATIVE: IntegerWidth = IntegerWidth::Bits32;

    /// Width selected at build time (feature `int32`)
    #[cfg(not(feature = "int32"))]
    pub const NATIVE: IntegerWidth = IntegerWidth::Bits64;

    /// Smallest representable integer
    pub const fn min(self) -> i64 {
        match self {
            IntegerWidth::Bits32 => i32::MIN as i64,
            IntegerWidth::Bits64 => i64::MIN,
        }
    }

    /// Largest representable integer
    pub const fn max(self) -> i64 {
        match self {
            IntegerWidth::Bits32 => i32::MAX as i64,
            IntegerWidth::Bits64 => i64::MAX,
        }
    }

    /// Whether `value` can be pushed as an exact integer
    pub const fn fits(self, value: i64) -> bool {
        value >= self.min() && value <= self.max()
    }

    /// Whether an unsigned `value` can be pushed as an exact integer
    pub const fn fits_unsigned(self, value: u64) -> bool {
        value <= self.max() as u64
    }
}

impl Default for IntegerWidth {
    fn default() -> Self {
        IntegerWidth::NATIVE
    }
}

// ============================================================================
// ScriptStack
// ============================================================================

/// Abstract script runtime stack.
///
/// Index convention: a positive index is a 1-based slot in the current call
/// frame, a negative index counts down from the top (`-1` is the top).
/// Reading a positive index above the top yields [`ValueKind::None`].
///
/// All operations are single-threaded; implementations are free to be
/// `!Send`.
pub trait ScriptStack {
    // ========================================================================
    // Configuration
    // ========================================================================

    /// Native integer width of this runtime
    fn integer_width(&self) -> IntegerWidth;

    // ========================================================================
    // Stack shape
    // ========================================================================

    /// Index of the top slot (number of slots in the current frame)
    fn top(&self) -> i32;

    /// Grow (with nils) or shrink the current frame to `top` slots
    fn set_top(&mut self, top: i32);

    /// Push a copy of the value at `idx`
    fn push_copy(&mut self, idx: i32);

    /// Pop `n` values
    fn pop(&mut self, n: i32);

    // ========================================================================
    // Reading
    // ========================================================================

    /// Type tag of the slot
    fn kind(&self, idx: i32) -> ValueKind;

    /// Whether the slot holds a number with an exact integer representation
    fn is_integer(&self, idx: i32) -> bool;

    /// Integer value of a number or numeric string with exact integer value
    fn to_integer(&self, idx: i32) -> Option<i64>;

    /// Float value of a number or numeric string
    fn to_number(&self, idx: i32) -> Option<f64>;

    /// Truthiness (only nil and false are false)
    fn to_boolean(&self, idx: i32) -> bool;

    /// String value of a string or number; does not modify the slot
    fn to_str(&self, idx: i32) -> Option<String>;

    /// Identity of a table, function or userdata; `None` for other values.
    /// Two slots share an identity exactly when they hold the same object.
    fn to_pointer(&self, idx: i32) -> Option<usize>;

    // ========================================================================
    // Pushing
    // ========================================================================

    /// Push nil
    fn push_nil(&mut self);

    /// Push a boolean
    fn push_boolean(&mut self, b: bool);

    /// Push an integer; callers guarantee it fits [`Self::integer_width`]
    fn push_integer(&mut self, i: i64);

    /// Push a float
    fn push_number(&mut self, n: f64);

    /// Push a string
    fn push_string(&mut self, s: &str);

    // ========================================================================
    // Tables
    // ========================================================================

    /// Push a new empty table
    fn new_table(&mut self);

    /// `t[k] = v` where `t` is at `idx`, `v` on top and `k` just below;
    /// pops both key and value
    fn set_table(&mut self, idx: i32) -> crate::GlueResult<()>;

    /// Table traversal step.
    ///
    /// Pops a key and pushes the next key/value pair of the table at `idx`.
    /// Returns `false` (pushing nothing) when the traversal is finished.
    /// Start the traversal by pushing nil.
    fn next(&mut self, idx: i32) -> crate::GlueResult<bool>;

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call the function sitting below the top `nargs` values.
    ///
    /// Function and arguments are popped; on success the results are left
    /// on top and their count is returned.
    fn call_function(&mut self, nargs: usize) -> crate::GlueResult<usize>;

    // ========================================================================
    // Registry
    // ========================================================================

    /// Pop the top value and store it in the registry, returning its key.
    /// Storing nil returns [`crate::ScriptRef::REFNIL`] without allocating.
    fn registry_ref(&mut self) -> i32;

    /// Free a registry key
    fn registry_unref(&mut self, key: i32);

    /// Push the registry value stored under `key` (nil if free)
    fn push_registry(&mut self, key: i32);

    // ========================================================================
    // Userdata
    // ========================================================================

    /// Declare a named userdata type. Returns `false` if it already existed.
    fn register_type(&mut self, type_name: &str) -> bool;

    /// Push a userdata tagged with a registered type name
    fn push_userdata(&mut self, type_name: &str, data: Rc<dyn Any>);

    /// Payload of the userdata at `idx` if it carries type `type_name`
    fn userdata(&self, idx: i32, type_name: &str) -> Option<Rc<dyn Any>>;

    /// Whether the slot is a userdata of type `type_name`
    fn test_userdata(&self, idx: i32, type_name: &str) -> bool {
        self.userdata(idx, type_name).is_some()
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Convert a relative index into a positive one
    fn abs_index(&self, idx: i32) -> i32 {
        if idx > 0 {
            idx
        } else {
            self.top() + idx + 1
        }
    }
}
