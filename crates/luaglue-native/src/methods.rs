// #[methods] proc-macro implementation
//
// Collects the bindable methods of an impl block and generates the
// registration chain for them.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, FnArg, ImplItem, ImplItemFn, ItemImpl, LitStr, Result, Visibility};

/// Expands the #[methods] attribute macro.
///
/// Input: inherent impl block
/// Output: the impl block (with `#[glue(..)]` attributes removed) plus a
/// second impl block holding `method_table()`
///
/// Example expansion:
/// ```ignore
/// // Input:
/// #[methods]
/// impl Tracker {
///     pub fn add_item(&mut self, name: String) -> i32 { .. }
///     #[glue(rename = "Count")]
///     pub fn count(&self) -> i32 { .. }
/// }
///
/// // Output:
/// impl Tracker {
///     pub fn add_item(&mut self, name: String) -> i32 { .. }
///     pub fn count(&self) -> i32 { .. }
/// }
///
/// impl Tracker {
///     pub fn method_table() -> ::luaglue_sdk::GlueResult<::luaglue_sdk::MethodTable> {
///         ::luaglue_sdk::MethodTable::builder::<Self>()
///             .method("add_item", Self::add_item)
///             .method("Count", Self::count)
///             .build()
///     }
/// }
/// ```
pub fn expand_methods(attr: TokenStream, mut item: ItemImpl) -> Result<TokenStream> {
    if !attr.is_empty() {
        return Err(syn::Error::new_spanned(
            attr,
            "#[methods] takes no arguments; use #[glue(..)] on individual methods",
        ));
    }
    if let Some((_, trait_path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            trait_path,
            "#[methods] must be applied to an inherent impl block",
        ));
    }

    let mut registrations = Vec::new();
    for impl_item in item.items.iter_mut() {
        if let ImplItem::Fn(func) = impl_item {
            let options = take_glue_options(&mut func.attrs)?;
            if options.skip || !is_bindable(func)? {
                continue;
            }
            let ident = &func.sig.ident;
            let script_name = options
                .rename
                .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
            registrations.push(quote! {
                .method(#script_name, Self::#ident)
            });
        }
    }

    let (impl_generics, _, where_clause) = item.generics.split_for_impl();
    let self_ty = &item.self_ty;

    Ok(quote! {
        #item

        impl #impl_generics #self_ty #where_clause {
            /// Binding table of the methods exposed to scripts.
            pub fn method_table() -> ::luaglue_sdk::GlueResult<::luaglue_sdk::MethodTable> {
                ::luaglue_sdk::MethodTable::builder::<Self>()
                    #(#registrations)*
                    .build()
            }
        }
    })
}

#[derive(Default)]
struct GlueOptions {
    rename: Option<LitStr>,
    skip: bool,
}

/// Removes `#[glue(..)]` attributes from `attrs` and parses them.
fn take_glue_options(attrs: &mut Vec<Attribute>) -> Result<GlueOptions> {
    let mut options = GlueOptions::default();
    let mut result = Ok(());
    attrs.retain(|attr| {
        if !attr.path().is_ident("glue") {
            return true;
        }
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                options.rename = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("skip") {
                options.skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `rename = \"..\"` or `skip`"))
            }
        });
        if let Err(e) = parsed {
            if result.is_ok() {
                result = Err(e);
            }
        }
        false
    });
    result.map(|_| options)
}

/// A method is bound when it is `pub`, non-generic and takes `&self` or
/// `&mut self`. Receivers by value are rejected outright.
fn is_bindable(func: &ImplItemFn) -> Result<bool> {
    if !matches!(func.vis, Visibility::Public(_)) {
        return Ok(false);
    }
    let receiver = match func.sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) => receiver,
        _ => return Ok(false),
    };
    if receiver.reference.is_none() || receiver.colon_token.is_some() {
        return Err(syn::Error::new_spanned(
            receiver,
            "bound methods must take `&self` or `&mut self`; mark with #[glue(skip)] to exclude",
        ));
    }
    if !func.sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &func.sig.generics,
            "bound methods cannot be generic; mark with #[glue(skip)] to exclude",
        ));
    }
    if func.sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            func.sig.asyncness,
            "async methods cannot be bound; mark with #[glue(skip)] to exclude",
        ));
    }
    Ok(true)
}
