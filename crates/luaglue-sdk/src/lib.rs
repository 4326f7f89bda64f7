//! luaglue SDK - marshalling between a Lua-style script stack and native methods
//!
//! This crate lets native Rust types expose methods to an embedded script
//! runtime without per-method glue. A bound method declares its parameter
//! types in its Rust signature; the dispatch entry point fetches one stack
//! slot per parameter, invokes the method and pushes the result back.
//!
//! The runtime itself is reached only through the [`ScriptStack`] trait.
//!
//! # Example
//!
//! ```ignore
//! use luaglue_sdk::{MethodTable, ScriptClass};
//!
//! struct Tracker { items: Vec<String> }
//!
//! impl ScriptClass for Tracker {
//!     const CLASS_NAME: &'static str = "Tracker";
//! }
//!
//! impl Tracker {
//!     fn add_item(&mut self, name: String) -> i32 {
//!         self.items.push(name);
//!         self.items.len() as i32
//!     }
//! }
//!
//! let table = MethodTable::builder::<Tracker>()
//!     .method("AddItem", Tracker::add_item)
//!     .build()?;
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod context;
pub mod convert;
pub mod dispatch;
pub mod dynamic;
pub mod error;
pub mod handler;
pub mod method;
pub mod object;
pub mod reference;
pub mod value;
pub mod variant;

pub use context::{IntegerWidth, ScriptStack, ValueKind};
pub use convert::{FromArg, IntoRet, IntoScalar, Nil};
pub use dispatch::{DispatchFn, FIRST_ARG_SLOT, RECEIVER_SLOT};
pub use dynamic::{from_dynamic, to_dynamic, EmptyList};
pub use error::{GlueError, GlueResult};
pub use handler::{MethodBinding, MethodTable, MethodTableBuilder};
pub use method::Method;
pub use object::{NativeObjectHandle, ScriptClass};
pub use reference::ScriptRef;
pub use value::{Arg, ParamKind, ParamList, Ret, Scalar};
pub use variant::Variant;

/// Generic value tree exchanged through [`dynamic`]
pub use serde_json::Value as DynamicValue;
