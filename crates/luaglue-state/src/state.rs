//! In-memory runtime state
//!
//! `MemoryState` owns a value stack split into call frames, a registry with
//! a free list and the set of declared userdata types. Native entry points
//! run through [`MemoryState::call`], which gives them a fresh frame whose
//! slot 1 is the first argument and moves their results back onto the
//! caller's frame.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use luaglue_sdk::{
    DispatchFn, GlueError, GlueResult, IntegerWidth, MethodTable, ScriptRef, ScriptStack,
    ValueKind,
};

use crate::config::StateConfig;
use crate::value::{LuaValue, Table, Userdata};

/// In-memory implementation of [`ScriptStack`].
pub struct MemoryState {
    config: StateConfig,
    stack: Vec<LuaValue>,
    /// Stack position of slot 1 of the current frame
    base: usize,
    depth: usize,
    registry: Vec<LuaValue>,
    free_refs: Vec<i32>,
    types: FxHashSet<String>,
    classes: FxHashMap<&'static str, MethodTable>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self::new(StateConfig::default())
    }
}

impl MemoryState {
    /// Create an empty state
    pub fn new(config: StateConfig) -> Self {
        MemoryState {
            config,
            stack: Vec::new(),
            base: 0,
            depth: 0,
            registry: Vec::new(),
            free_refs: Vec::new(),
            types: FxHashSet::default(),
            classes: FxHashMap::default(),
        }
    }

    /// Create an empty state with the given integer width
    pub fn with_width(width: IntegerWidth) -> Self {
        Self::new(StateConfig::with_width(width))
    }

    /// Active configuration
    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    // ========================================================================
    // Host-side access
    // ========================================================================

    /// Push an arbitrary value
    pub fn push_value(&mut self, value: LuaValue) {
        let value = match value {
            LuaValue::Integer(i) => LuaValue::Integer(self.wrap_integer(i)),
            other => other,
        };
        self.stack.push(value);
    }

    /// Push a native function
    pub fn push_function(&mut self, entry: DispatchFn) {
        self.stack.push(LuaValue::Function(entry));
    }

    /// Value at `idx` (nil for invalid indices)
    pub fn value(&self, idx: i32) -> LuaValue {
        self.slot(idx)
            .map(|pos| self.stack[pos].clone())
            .unwrap_or_default()
    }

    /// Values of the current frame, bottom first
    pub fn values(&self) -> Vec<LuaValue> {
        self.stack[self.base..].to_vec()
    }

    /// Number of registry slots holding a value
    pub fn live_refs(&self) -> usize {
        self.registry
            .iter()
            .filter(|v| !matches!(v, LuaValue::Nil))
            .count()
    }

    /// Value stored under a persisted reference
    pub fn ref_value(&self, r: ScriptRef) -> LuaValue {
        self.registry_get(r.key())
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Run `entry` with the top `nargs` values as its frame.
    ///
    /// The arguments are consumed; on success the results are left on top
    /// of the caller's frame and their count is returned. On failure the
    /// callee's frame is discarded.
    pub fn call(&mut self, entry: &DispatchFn, nargs: usize) -> GlueResult<usize> {
        let available = self.stack.len() - self.base;
        if nargs > available {
            return Err(GlueError::Runtime(format!(
                "call expects {nargs} arguments, frame holds {available}"
            )));
        }
        if self.depth >= self.config.max_call_depth {
            return Err(GlueError::Runtime("C stack overflow".into()));
        }

        let caller_base = self.base;
        let callee_base = self.stack.len() - nargs;
        self.base = callee_base;
        self.depth += 1;
        tracing::trace!(nargs, depth = self.depth, "entering native call");

        let frame: &mut dyn ScriptStack = &mut *self;
        let outcome = entry(frame).and_then(|count| {
            if self.stack.len() > self.config.stack_limit {
                Err(GlueError::Runtime("stack overflow".into()))
            } else {
                Ok(count)
            }
        });

        self.depth -= 1;
        let result = match outcome {
            Ok(count) => {
                let count = count.min(self.stack.len() - callee_base);
                let results = self.stack.split_off(self.stack.len() - count);
                self.stack.truncate(callee_base);
                self.stack.extend(results);
                Ok(count)
            }
            Err(err) => {
                self.stack.truncate(callee_base);
                Err(err)
            }
        };
        self.base = caller_base;
        result
    }

    /// Call the function sitting below the top `nargs` values.
    pub fn call_value(&mut self, nargs: usize) -> GlueResult<usize> {
        let func_slot = -(nargs as i32) - 1;
        let pos = self
            .slot(func_slot)
            .ok_or_else(|| GlueError::Runtime("attempt to call a no value".into()))?;
        match self.stack.remove(pos) {
            LuaValue::Function(entry) => self.call(&entry, nargs),
            other => {
                self.stack.truncate(pos);
                Err(GlueError::Runtime(format!(
                    "attempt to call a {} value",
                    other.kind().type_name()
                )))
            }
        }
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// Install a binding table. Replaces any table of the same class.
    pub fn register_class(&mut self, table: MethodTable) {
        let class = table.class_name();
        self.register_type(class);
        tracing::debug!(class, methods = table.len(), "registered class");
        self.classes.insert(class, table);
    }

    /// Binding table of a registered class
    pub fn class(&self, class: &str) -> Option<&MethodTable> {
        self.classes.get(class)
    }

    /// Call `class:method(...)`; the receiver and arguments are the top
    /// `nargs` values, receiver first.
    pub fn call_method(&mut self, class: &str, method: &str, nargs: usize) -> GlueResult<usize> {
        let entry = self
            .classes
            .get(class)
            .and_then(|table| table.get(method))
            .map(|binding| binding.entry().clone())
            .ok_or_else(|| {
                GlueError::Runtime(format!(
                    "attempt to call a nil value (method '{method}' of '{class}')"
                ))
            })?;
        self.call(&entry, nargs)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn slot(&self, idx: i32) -> Option<usize> {
        let top = self.stack.len() - self.base;
        if idx > 0 {
            let offset = idx as usize - 1;
            (offset < top).then_some(self.base + offset)
        } else if idx < 0 {
            let back = idx.unsigned_abs() as usize;
            (back <= top).then(|| self.stack.len() - back)
        } else {
            None
        }
    }

    fn get(&self, idx: i32) -> Option<&LuaValue> {
        self.slot(idx).map(|pos| &self.stack[pos])
    }

    fn wrap_integer(&self, i: i64) -> i64 {
        match self.config.integer_width {
            IntegerWidth::Bits32 => i as i32 as i64,
            IntegerWidth::Bits64 => i,
        }
    }

    fn table_at(&self, idx: i32) -> GlueResult<Rc<RefCell<Table>>> {
        match self.get(idx) {
            Some(LuaValue::Table(t)) => Ok(Rc::clone(t)),
            other => {
                let kind = other.map(LuaValue::kind).unwrap_or(ValueKind::None);
                Err(GlueError::Runtime(format!(
                    "attempt to index a {} value",
                    kind.type_name()
                )))
            }
        }
    }

    fn take_top(&mut self) -> LuaValue {
        if self.stack.len() > self.base {
            self.stack.pop().unwrap_or_default()
        } else {
            LuaValue::Nil
        }
    }

    fn registry_get(&self, key: i32) -> LuaValue {
        if key < 1 {
            return LuaValue::Nil;
        }
        self.registry
            .get(key as usize - 1)
            .cloned()
            .unwrap_or_default()
    }
}

impl ScriptStack for MemoryState {
    fn integer_width(&self) -> IntegerWidth {
        self.config.integer_width
    }

    fn top(&self) -> i32 {
        (self.stack.len() - self.base) as i32
    }

    fn set_top(&mut self, top: i32) {
        let target = if top >= 0 {
            self.base + top as usize
        } else {
            let back = (top.unsigned_abs() as usize).saturating_sub(1);
            self.stack.len().saturating_sub(back).max(self.base)
        };
        self.stack.resize(target, LuaValue::Nil);
    }

    fn push_copy(&mut self, idx: i32) {
        let value = self.value(idx);
        self.stack.push(value);
    }

    fn pop(&mut self, n: i32) {
        let keep = self
            .stack
            .len()
            .saturating_sub(n.max(0) as usize)
            .max(self.base);
        self.stack.truncate(keep);
    }

    fn kind(&self, idx: i32) -> ValueKind {
        self.get(idx).map(LuaValue::kind).unwrap_or(ValueKind::None)
    }

    fn is_integer(&self, idx: i32) -> bool {
        matches!(self.get(idx), Some(LuaValue::Integer(_)))
    }

    fn to_integer(&self, idx: i32) -> Option<i64> {
        let i = self.get(idx)?.to_integer()?;
        self.config.integer_width.fits(i).then_some(i)
    }

    fn to_number(&self, idx: i32) -> Option<f64> {
        self.get(idx)?.to_number()
    }

    fn to_boolean(&self, idx: i32) -> bool {
        self.get(idx).is_some_and(LuaValue::truthy)
    }

    fn to_str(&self, idx: i32) -> Option<String> {
        self.get(idx)?.to_str()
    }

    fn to_pointer(&self, idx: i32) -> Option<usize> {
        self.get(idx)?.identity()
    }

    fn push_nil(&mut self) {
        self.stack.push(LuaValue::Nil);
    }

    fn push_boolean(&mut self, b: bool) {
        self.stack.push(LuaValue::Boolean(b));
    }

    fn push_integer(&mut self, i: i64) {
        let i = self.wrap_integer(i);
        self.stack.push(LuaValue::Integer(i));
    }

    fn push_number(&mut self, n: f64) {
        self.stack.push(LuaValue::Number(n));
    }

    fn push_string(&mut self, s: &str) {
        self.stack.push(LuaValue::str(s));
    }

    fn new_table(&mut self) {
        self.stack
            .push(LuaValue::Table(Rc::new(RefCell::new(Table::default()))));
    }

    fn set_table(&mut self, idx: i32) -> GlueResult<()> {
        let table = self.table_at(idx);
        let value = self.take_top();
        let key = self.take_top();
        table?.borrow_mut().set(key, value)
    }

    fn next(&mut self, idx: i32) -> GlueResult<bool> {
        let table = self.table_at(idx)?;
        let key = self.take_top();
        let entry = table.borrow().next(&key)?;
        match entry {
            Some((k, v)) => {
                self.stack.push(k);
                self.stack.push(v);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn call_function(&mut self, nargs: usize) -> GlueResult<usize> {
        self.call_value(nargs)
    }

    fn registry_ref(&mut self) -> i32 {
        let value = self.take_top();
        if matches!(value, LuaValue::Nil) {
            return ScriptRef::REFNIL;
        }
        match self.free_refs.pop() {
            Some(key) => {
                self.registry[key as usize - 1] = value;
                key
            }
            None => {
                self.registry.push(value);
                self.registry.len() as i32
            }
        }
    }

    fn registry_unref(&mut self, key: i32) {
        if key < 1 {
            return;
        }
        if let Some(slot) = self.registry.get_mut(key as usize - 1) {
            // a nil slot is already free
            if !matches!(slot, LuaValue::Nil) {
                *slot = LuaValue::Nil;
                self.free_refs.push(key);
            }
        }
    }

    fn push_registry(&mut self, key: i32) {
        let value = self.registry_get(key);
        self.stack.push(value);
    }

    fn register_type(&mut self, type_name: &str) -> bool {
        if self.types.contains(type_name) {
            return false;
        }
        self.types.insert(type_name.to_string())
    }

    fn push_userdata(&mut self, type_name: &str, data: Rc<dyn Any>) {
        self.stack
            .push(LuaValue::Userdata(Rc::new(Userdata::new(type_name, data))));
    }

    fn userdata(&self, idx: i32, type_name: &str) -> Option<Rc<dyn Any>> {
        match self.get(idx)? {
            LuaValue::Userdata(ud)
                if ud.type_name() == type_name && self.types.contains(type_name) =>
            {
                Some(Rc::clone(ud.data()))
            }
            _ => None,
        }
    }
}
