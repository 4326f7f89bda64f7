// luaglue-native: binding-table generation for luaglue
//
// Provides proc-macros that remove per-method registration boilerplate:
// - #[methods] - Generates a `method_table()` for an impl block
//
// Example:
// ```
// use luaglue_native::methods;
//
// #[methods]
// impl Tracker {
//     pub fn add_item(&mut self, name: String) -> i32 { ... }
//
//     #[glue(rename = "Count")]
//     pub fn count(&self) -> i32 { ... }
// }
// ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemImpl};

mod methods;

/// Generates the binding table of an impl block.
///
/// Every `pub fn` taking `&self` or `&mut self` is bound under its own name.
/// The generated associated function
///
/// ```ignore
/// pub fn method_table() -> luaglue_sdk::GlueResult<luaglue_sdk::MethodTable>
/// ```
///
/// registers them in source order. Per-method options:
///
/// - `#[glue(rename = "Name")]` binds under a different script name
/// - `#[glue(skip)]` leaves a public method unbound
///
/// Parameter and return types are checked by the `FromArg` / `IntoRet`
/// bounds of `MethodTableBuilder::method`, so an unsupported type is a
/// compile error at the generated registration call.
///
/// # Example
///
/// ```ignore
/// #[methods]
/// impl Tracker {
///     pub fn add_item(&mut self, name: String) -> i32 {
///         self.items.push(name);
///         self.items.len() as i32
///     }
/// }
///
/// let table = Tracker::method_table()?;
/// ```
#[proc_macro_attribute]
pub fn methods(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr = proc_macro2::TokenStream::from(attr);
    let input = parse_macro_input!(item as ItemImpl);
    methods::expand_methods(attr, input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
