//! luaglue-state - in-memory script runtime state
//!
//! A Lua 5.3 compatible implementation of [`luaglue_sdk::ScriptStack`]:
//! call frames, tables with `next` traversal, a registry with a free list
//! and typed userdata. There is no parser and no bytecode; hosts drive the
//! state directly, pushing values and calling native entry points.
//!
//! # Example
//!
//! ```ignore
//! use luaglue_sdk::{MethodTable, NativeObjectHandle};
//! use luaglue_state::MemoryState;
//!
//! let mut state = MemoryState::default();
//! state.register_class(Tracker::method_table()?);
//!
//! NativeObjectHandle::new(Tracker::default()).push(&mut state);
//! state.push_string("apple");
//! let results = state.call_method("Tracker", "add_item", 2)?;
//! ```

pub mod config;
pub mod state;
pub mod value;

pub use config::StateConfig;
pub use state::MemoryState;
pub use value::{LuaValue, Table, TableRef, Userdata};
