//! Binding tables: the per-class list of exposed methods
//!
//! A [`MethodTable`] is assembled once when a class is registered and never
//! mutated afterwards. The runtime's class registration consumes it as an
//! ordered list of `(name, entry point)` pairs.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use crate::dispatch::{self, DispatchFn};
use crate::error::{GlueError, GlueResult};
use crate::method::Method;
use crate::object::ScriptClass;
use crate::value::{Arg, ParamKind, ParamList, Ret};

/// One exposed method: its name, signature and dispatch entry point.
#[derive(Clone)]
pub struct MethodBinding {
    name: String,
    params: ParamList,
    entry: DispatchFn,
}

impl MethodBinding {
    /// Method name as seen by scripts
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter descriptors
    pub fn params(&self) -> &ParamList {
        &self.params
    }

    /// Dispatch entry point
    pub fn entry(&self) -> &DispatchFn {
        &self.entry
    }
}

impl fmt::Debug for MethodBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBinding")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Ordered method bindings of one class.
#[derive(Debug, Clone)]
pub struct MethodTable {
    class_name: &'static str,
    bindings: Vec<MethodBinding>,
}

impl MethodTable {
    /// Start a table for class `T`
    pub fn builder<T: ScriptClass>() -> MethodTableBuilder<T> {
        MethodTableBuilder {
            bindings: Vec::new(),
            error: None,
            _class: PhantomData,
        }
    }

    /// Class the table belongs to
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Get a binding by method name
    pub fn get(&self, name: &str) -> Option<&MethodBinding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    /// Method names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.name.as_str()).collect()
    }

    /// Bindings in registration order
    pub fn iter(&self) -> impl Iterator<Item = &MethodBinding> {
        self.bindings.iter()
    }

    /// Number of bound methods
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no methods are bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Builder for a [`MethodTable`].
///
/// Errors (duplicate names, invalid descriptor lists) are reported once by
/// [`MethodTableBuilder::build`].
pub struct MethodTableBuilder<T> {
    bindings: Vec<MethodBinding>,
    error: Option<GlueError>,
    _class: PhantomData<fn() -> T>,
}

impl<T: ScriptClass> MethodTableBuilder<T> {
    /// Bind a typed method
    pub fn method<M, Marker>(self, name: &str, method: M) -> Self
    where
        M: Method<T, Marker>,
        Marker: 'static,
    {
        let params = match ParamList::new(M::PARAMS) {
            Ok(params) => params,
            Err(err) => return self.fail(err),
        };
        let entry = dispatch::bind::<T, M, Marker>(name, method);
        self.push(name, params, entry)
    }

    /// Bind a handler with a hand-written descriptor list.
    ///
    /// A list consisting of a single [`ParamKind::Void`] binds a nullary
    /// method.
    pub fn signature<F>(self, name: &str, params: &[ParamKind], handler: F) -> Self
    where
        F: Fn(&mut T, Vec<Arg>) -> GlueResult<Ret> + 'static,
    {
        let params = match ParamList::new(params) {
            Ok(params) => params,
            Err(err) => return self.fail(err),
        };
        let entry = dispatch::bind_signature::<T, F>(name, params.clone(), handler);
        self.push(name, params, entry)
    }

    /// Finish the table
    pub fn build(self) -> GlueResult<MethodTable> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut seen = HashSet::new();
        for binding in &self.bindings {
            if !seen.insert(binding.name.as_str()) {
                return Err(GlueError::Signature(format!(
                    "method '{}' bound twice on '{}'",
                    binding.name,
                    T::CLASS_NAME
                )));
            }
        }
        Ok(MethodTable {
            class_name: T::CLASS_NAME,
            bindings: self.bindings,
        })
    }

    fn push(mut self, name: &str, params: ParamList, entry: DispatchFn) -> Self {
        self.bindings.push(MethodBinding {
            name: name.to_string(),
            params,
            entry,
        });
        self
    }

    fn fail(mut self, err: GlueError) -> Self {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tracker {
        items: Vec<String>,
    }

    impl ScriptClass for Tracker {
        const CLASS_NAME: &'static str = "Tracker";
    }

    impl Tracker {
        fn add_item(&mut self, name: String) -> i32 {
            self.items.push(name);
            self.items.len() as i32
        }

        fn count(&self) -> i32 {
            self.items.len() as i32
        }

        fn clear(&mut self) {
            self.items.clear();
        }
    }

    #[test]
    fn test_table_keeps_order_and_signatures() {
        let table = MethodTable::builder::<Tracker>()
            .method("AddItem", Tracker::add_item)
            .method("Count", Tracker::count)
            .method("Clear", Tracker::clear)
            .build()
            .unwrap();

        assert_eq!(table.class_name(), "Tracker");
        assert_eq!(table.names(), vec!["AddItem", "Count", "Clear"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("AddItem").unwrap().params().kinds(), &[ParamKind::Str]);
        assert_eq!(table.get("Count").unwrap().params().arity(), 0);
        assert!(table.get("Missing").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = MethodTable::builder::<Tracker>()
            .method("Count", Tracker::count)
            .method("Count", Tracker::count)
            .build()
            .unwrap_err();
        assert!(matches!(err, GlueError::Signature(_)));
    }

    #[test]
    fn test_signature_void_override() {
        let table = MethodTable::builder::<Tracker>()
            .signature("Reset", &[ParamKind::Void], |tracker, _args| {
                tracker.items.clear();
                Ok(Ret::Void)
            })
            .build()
            .unwrap();
        assert_eq!(table.get("Reset").unwrap().params().arity(), 0);
    }

    #[test]
    fn test_invalid_signature_rejected() {
        let err = MethodTable::builder::<Tracker>()
            .signature("Bad", &[ParamKind::Void, ParamKind::Int32], |_, _| Ok(Ret::Void))
            .build()
            .unwrap_err();
        assert!(matches!(err, GlueError::Signature(_)));
    }
}
