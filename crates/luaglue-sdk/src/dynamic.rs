//! Dynamic value bridge
//!
//! Converts script values into a [`DynamicValue`] tree and back. Tables are
//! classified while they are walked: a table whose keys are all positive
//! integers becomes a list (holes read as null), anything else becomes a map
//! keyed by strings, integer keys rendered in decimal. An empty table
//! becomes an empty map unless it is the [`EmptyList`] sentinel.
//!
//! A table reached again while it is still being converted (a cycle)
//! converts to null at the repeat.
//!
//! Map key order follows the tree representation, not the runtime; callers
//! must not rely on it. Integers that do not fit the runtime's integer width
//! are pushed back as floats, which loses precision above 2^53.

use rustc_hash::FxHashSet;
use serde_json::{Map, Number, Value as DynamicValue};

use crate::codec;
use crate::context::{ScriptStack, ValueKind};

/// Tables nested deeper than this convert to null.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Highest index a list may have. Tables with a larger positive integer key
/// convert as maps, since padding them with nulls would not fit in memory.
pub const MAX_LIST_INDEX: i64 = 1 << 24;

// ============================================================================
// Empty list sentinel
// ============================================================================

/// Stateless marker object that converts to an empty list.
///
/// The runtime cannot tell an empty list from an empty map, so scripts pass
/// this sentinel where an empty list is meant.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyList;

impl EmptyList {
    /// Userdata type name of the sentinel
    pub const TYPE_NAME: &'static str = "luaglue.EmptyList";

    /// Declare the sentinel type with the runtime
    pub fn register(stack: &mut dyn ScriptStack) {
        stack.register_type(Self::TYPE_NAME);
    }

    /// Push a sentinel instance
    pub fn push(stack: &mut dyn ScriptStack) {
        stack.push_userdata(Self::TYPE_NAME, std::rc::Rc::new(EmptyList));
    }

    /// Whether the slot holds a sentinel instance
    pub fn is(stack: &dyn ScriptStack, idx: i32) -> bool {
        stack.test_userdata(idx, Self::TYPE_NAME)
    }
}

// ============================================================================
// Script -> dynamic
// ============================================================================

/// Convert the value at `idx` into a dynamic value tree.
///
/// Never fails: unsupported values (nil, functions, threads, unknown
/// userdata) become null, malformed table keys are skipped with a warning.
/// The stack is left as it was found.
pub fn to_dynamic(stack: &mut dyn ScriptStack, idx: i32) -> DynamicValue {
    let idx = stack.abs_index(idx);
    convert(stack, idx, &mut Walk::default())
}

/// Tables on the path from the root to the value being converted
#[derive(Default)]
struct Walk {
    open: FxHashSet<usize>,
    depth: usize,
}

fn convert(stack: &mut dyn ScriptStack, idx: i32, walk: &mut Walk) -> DynamicValue {
    match stack.kind(idx) {
        ValueKind::Number => number_at(stack, idx),
        ValueKind::String => stack
            .to_str(idx)
            .map(DynamicValue::String)
            .unwrap_or(DynamicValue::Null),
        ValueKind::Boolean => DynamicValue::Bool(stack.to_boolean(idx)),
        ValueKind::Table => {
            if walk.depth >= MAX_NESTING_DEPTH {
                tracing::warn!(depth = walk.depth, "table nested too deeply, converting to null");
                return DynamicValue::Null;
            }
            let id = stack.to_pointer(idx);
            if let Some(id) = id {
                if !walk.open.insert(id) {
                    tracing::warn!(
                        depth = walk.depth,
                        "table contains itself, converting the repeat to null"
                    );
                    return DynamicValue::Null;
                }
            }
            walk.depth += 1;
            let value = convert_table(stack, idx, walk);
            walk.depth -= 1;
            if let Some(id) = id {
                walk.open.remove(&id);
            }
            value
        }
        ValueKind::Userdata if EmptyList::is(stack, idx) => DynamicValue::Array(Vec::new()),
        ValueKind::None
        | ValueKind::Nil
        | ValueKind::Userdata
        | ValueKind::Function
        | ValueKind::Thread => DynamicValue::Null,
    }
}

fn number_at(stack: &dyn ScriptStack, idx: i32) -> DynamicValue {
    if stack.is_integer(idx) {
        if let Some(i) = stack.to_integer(idx) {
            return DynamicValue::from(i);
        }
    }
    let n = stack.to_number(idx).unwrap_or(f64::NAN);
    match Number::from_f64(n) {
        Some(n) => DynamicValue::Number(n),
        None => {
            tracing::warn!(value = n, "non-finite number has no dynamic representation");
            DynamicValue::Null
        }
    }
}

enum EntryKey {
    Index(i64),
    Name(String),
}

impl EntryKey {
    fn into_name(self) -> String {
        match self {
            EntryKey::Index(i) => i.to_string(),
            EntryKey::Name(s) => s,
        }
    }
}

fn convert_table(stack: &mut dyn ScriptStack, idx: i32, walk: &mut Walk) -> DynamicValue {
    let mut entries: Vec<(EntryKey, DynamicValue)> = Vec::new();
    let mut is_list = true;
    let mut max_index: i64 = 0;

    stack.push_nil();
    loop {
        match stack.next(idx) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => {
                tracing::warn!(%err, "table traversal failed, keeping entries read so far");
                break;
            }
        }
        // key at -2, value at -1
        let key = match stack.kind(-2) {
            ValueKind::Number if stack.is_integer(-2) => stack.to_integer(-2).map(EntryKey::Index),
            ValueKind::Number | ValueKind::String => stack.to_str(-2).map(EntryKey::Name),
            _ => None,
        };
        match key {
            Some(key) => {
                match &key {
                    EntryKey::Index(i) if *i > 0 => max_index = max_index.max(*i),
                    _ => is_list = false,
                }
                let value_idx = stack.abs_index(-1);
                let value = convert(stack, value_idx, walk);
                entries.push((key, value));
            }
            None => {
                tracing::warn!(
                    key_type = stack.kind(-2).type_name(),
                    "skipping table entry with unsupported key type"
                );
            }
        }
        // pop value, keep key for the next step
        stack.pop(1);
    }

    if entries.is_empty() {
        return DynamicValue::Object(Map::new());
    }

    if is_list && max_index > MAX_LIST_INDEX {
        tracing::warn!(max_index, "list index too large, converting as a map");
    } else if is_list {
        let mut list = vec![DynamicValue::Null; max_index as usize];
        for (key, value) in entries {
            if let EntryKey::Index(i) = key {
                list[(i - 1) as usize] = value;
            }
        }
        return DynamicValue::Array(list);
    }

    let map = entries
        .into_iter()
        .map(|(key, value)| (key.into_name(), value))
        .collect::<Map<String, DynamicValue>>();
    DynamicValue::Object(map)
}

// ============================================================================
// Dynamic -> script
// ============================================================================

/// Push a dynamic value tree onto the stack as one value.
pub fn from_dynamic(stack: &mut dyn ScriptStack, value: &DynamicValue) {
    match value {
        DynamicValue::Null => stack.push_nil(),
        DynamicValue::Bool(b) => stack.push_boolean(*b),
        DynamicValue::Number(n) => push_number(stack, n),
        DynamicValue::String(s) => stack.push_string(s),
        DynamicValue::Array(items) => {
            stack.new_table();
            for (i, item) in items.iter().enumerate() {
                codec::push_integer(stack, i as i64 + 1);
                from_dynamic(stack, item);
                set_field(stack);
            }
        }
        DynamicValue::Object(map) => {
            stack.new_table();
            for (key, item) in map {
                stack.push_string(key);
                from_dynamic(stack, item);
                set_field(stack);
            }
        }
    }
}

fn push_number(stack: &mut dyn ScriptStack, n: &Number) {
    if let Some(i) = n.as_i64() {
        codec::push_integer(stack, i);
    } else if let Some(u) = n.as_u64() {
        codec::push_unsigned(stack, u);
    } else {
        stack.push_number(n.as_f64().unwrap_or(f64::NAN));
    }
}

fn set_field(stack: &mut dyn ScriptStack) {
    // table sits below key and value
    if let Err(err) = stack.set_table(-3) {
        tracing::warn!(%err, "failed to store converted entry");
        stack.pop(2);
    }
}
