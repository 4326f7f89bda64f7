//! Run-time configuration of a [`crate::MemoryState`]

use serde::{Deserialize, Serialize};

use luaglue_sdk::IntegerWidth;

/// Default number of stack slots a state may hold
pub const DEFAULT_STACK_LIMIT: usize = 1_000_000;

/// Default limit of nested native calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// State configuration.
///
/// Every field has a default, so an empty document is a valid
/// configuration:
///
/// ```toml
/// integer_width = "bits32"
/// stack_limit = 4096
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Width of the integer subtype. Integers pushed into a 32-bit state
    /// wrap like the runtime's own integer arithmetic.
    pub integer_width: IntegerWidth,

    /// Upper bound on the total number of stack slots. A call that leaves
    /// the stack above it fails with a stack overflow.
    pub stack_limit: usize,

    /// Upper bound on nested [`crate::MemoryState::call`]s
    pub max_call_depth: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        StateConfig {
            integer_width: IntegerWidth::NATIVE,
            stack_limit: DEFAULT_STACK_LIMIT,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl StateConfig {
    /// Configuration with the given integer width and default limits
    pub fn with_width(integer_width: IntegerWidth) -> Self {
        StateConfig {
            integer_width,
            ..Default::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}
