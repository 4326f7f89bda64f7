//! Persisted script references
//!
//! A [`ScriptRef`] keeps a script value (typically a callback or table)
//! alive past the call that delivered it by storing it in the runtime
//! registry. The registry owns the value; this side only holds the integer
//! key and must hand it back with [`ScriptRef::release`]. There is no `Drop`
//! impl: a reference that is never released occupies its registry slot for
//! the lifetime of the runtime.

use crate::context::ScriptStack;

/// Integer key of a value persisted in the runtime registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptRef(i32);

impl ScriptRef {
    /// Key that refers to nothing
    pub const NOREF: i32 = -2;

    /// Key returned when nil is persisted
    pub const REFNIL: i32 = -1;

    /// A reference to nothing
    pub const fn none() -> Self {
        ScriptRef(Self::NOREF)
    }

    /// Wrap a raw registry key
    pub const fn from_key(key: i32) -> Self {
        ScriptRef(key)
    }

    /// Raw registry key
    pub const fn key(self) -> i32 {
        self.0
    }

    /// Whether this refers to something (nil references count as valid)
    pub const fn is_valid(self) -> bool {
        self.0 != Self::NOREF
    }

    /// Persist a copy of the value at `idx`. The slot itself is left intact.
    pub fn fetch(stack: &mut dyn ScriptStack, idx: i32) -> Self {
        stack.push_copy(idx);
        ScriptRef(stack.registry_ref())
    }

    /// Push the referenced value (nil for released or empty references)
    pub fn push(self, stack: &mut dyn ScriptStack) {
        match self.0 {
            Self::NOREF | Self::REFNIL => stack.push_nil(),
            key => stack.push_registry(key),
        }
    }

    /// Give the registry slot back to the runtime
    pub fn release(self, stack: &mut dyn ScriptStack) {
        if self.0 >= 0 {
            stack.registry_unref(self.0);
        }
    }
}

impl Default for ScriptRef {
    fn default() -> Self {
        Self::none()
    }
}
