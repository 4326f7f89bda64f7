//! Script value model of the in-memory state
//!
//! Follows Lua 5.3: numbers have integer and float subtypes, float keys with
//! an integral value are stored as integer keys, strings and numbers coerce
//! into each other, and tables are compared by identity.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use luaglue_sdk::{DispatchFn, GlueError, GlueResult, ValueKind};

/// Shared, mutable table
pub type TableRef = Rc<RefCell<Table>>;

/// A script value.
#[derive(Clone, Default)]
pub enum LuaValue {
    /// nil
    #[default]
    Nil,
    /// Boolean
    Boolean(bool),
    /// Integer subtype of number
    Integer(i64),
    /// Float subtype of number
    Number(f64),
    /// Immutable string
    String(Rc<str>),
    /// Table
    Table(TableRef),
    /// Native function
    Function(DispatchFn),
    /// Typed userdata
    Userdata(Rc<Userdata>),
}

impl LuaValue {
    /// String value
    pub fn str(s: &str) -> Self {
        LuaValue::String(Rc::from(s))
    }

    /// New table holding `pairs`
    pub fn table<I>(pairs: I) -> GlueResult<Self>
    where
        I: IntoIterator<Item = (LuaValue, LuaValue)>,
    {
        let mut table = Table::default();
        for (key, value) in pairs {
            table.set(key, value)?;
        }
        Ok(LuaValue::Table(Rc::new(RefCell::new(table))))
    }

    /// New table holding `items` at keys `1..=n`
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = LuaValue>,
    {
        let mut table = Table::default();
        for (i, item) in items.into_iter().enumerate() {
            table.insert_unchecked(LuaValue::Integer(i as i64 + 1), item);
        }
        LuaValue::Table(Rc::new(RefCell::new(table)))
    }

    /// Runtime type tag
    pub fn kind(&self) -> ValueKind {
        match self {
            LuaValue::Nil => ValueKind::Nil,
            LuaValue::Boolean(_) => ValueKind::Boolean,
            LuaValue::Integer(_) | LuaValue::Number(_) => ValueKind::Number,
            LuaValue::String(_) => ValueKind::String,
            LuaValue::Table(_) => ValueKind::Table,
            LuaValue::Function(_) => ValueKind::Function,
            LuaValue::Userdata(_) => ValueKind::Userdata,
        }
    }

    /// Truthiness: only nil and false are false
    pub fn truthy(&self) -> bool {
        !matches!(self, LuaValue::Nil | LuaValue::Boolean(false))
    }

    /// Numeric value of a number or numeric string (`lua_tonumber`)
    pub fn to_number(&self) -> Option<f64> {
        match self {
            LuaValue::Integer(i) => Some(*i as f64),
            LuaValue::Number(n) => Some(*n),
            LuaValue::String(s) => match parse_number(s)? {
                LuaValue::Integer(i) => Some(i as f64),
                LuaValue::Number(n) => Some(n),
                _ => None,
            },
            _ => None,
        }
    }

    /// Integer value of a number or numeric string with an exact integer
    /// value (`lua_tointegerx`)
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            LuaValue::Integer(i) => Some(*i),
            LuaValue::Number(n) => float_to_integer(*n),
            LuaValue::String(s) => parse_number(s)?.to_integer(),
            _ => None,
        }
    }

    /// String form of a string or number (`lua_tolstring`)
    pub fn to_str(&self) -> Option<String> {
        match self {
            LuaValue::String(s) => Some(s.to_string()),
            LuaValue::Integer(i) => Some(i.to_string()),
            LuaValue::Number(n) => Some(format_number(*n)),
            _ => None,
        }
    }

    /// Table behind the value
    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            LuaValue::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Primitive equality without metamethods (`lua_rawequal`)
    pub fn raw_equal(&self, other: &LuaValue) -> bool {
        match (self, other) {
            (LuaValue::Nil, LuaValue::Nil) => true,
            (LuaValue::Boolean(a), LuaValue::Boolean(b)) => a == b,
            (LuaValue::Integer(a), LuaValue::Integer(b)) => a == b,
            (LuaValue::Number(a), LuaValue::Number(b)) => a == b,
            (LuaValue::Integer(i), LuaValue::Number(n))
            | (LuaValue::Number(n), LuaValue::Integer(i)) => float_to_integer(*n) == Some(*i),
            (LuaValue::String(a), LuaValue::String(b)) => a == b,
            (LuaValue::Table(a), LuaValue::Table(b)) => Rc::ptr_eq(a, b),
            (LuaValue::Function(a), LuaValue::Function(b)) => Rc::ptr_eq(a, b),
            (LuaValue::Userdata(a), LuaValue::Userdata(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Address of a table, function or userdata
    pub fn identity(&self) -> Option<usize> {
        match self {
            LuaValue::Table(t) => Some(Rc::as_ptr(t) as *const () as usize),
            LuaValue::Function(f) => Some(Rc::as_ptr(f) as *const () as usize),
            LuaValue::Userdata(u) => Some(Rc::as_ptr(u) as *const () as usize),
            _ => None,
        }
    }
}

impl PartialEq for LuaValue {
    fn eq(&self, other: &Self) -> bool {
        self.raw_equal(other)
    }
}

impl fmt::Debug for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "nil"),
            LuaValue::Boolean(b) => write!(f, "{b}"),
            LuaValue::Integer(i) => write!(f, "{i}"),
            LuaValue::Number(n) => write!(f, "{}", format_number(*n)),
            LuaValue::String(s) => write!(f, "{s:?}"),
            LuaValue::Table(t) => write!(f, "table: {:p}", Rc::as_ptr(t)),
            LuaValue::Function(func) => write!(f, "function: {:p}", Rc::as_ptr(func) as *const ()),
            LuaValue::Userdata(u) => write!(f, "{}: {:p}", u.type_name, Rc::as_ptr(u)),
        }
    }
}

impl From<bool> for LuaValue {
    fn from(b: bool) -> Self {
        LuaValue::Boolean(b)
    }
}

impl From<i32> for LuaValue {
    fn from(i: i32) -> Self {
        LuaValue::Integer(i as i64)
    }
}

impl From<i64> for LuaValue {
    fn from(i: i64) -> Self {
        LuaValue::Integer(i)
    }
}

impl From<f64> for LuaValue {
    fn from(n: f64) -> Self {
        LuaValue::Number(n)
    }
}

impl From<&str> for LuaValue {
    fn from(s: &str) -> Self {
        LuaValue::str(s)
    }
}

// ============================================================================
// Userdata
// ============================================================================

/// Userdata payload tagged with its type name
pub struct Userdata {
    type_name: String,
    data: Rc<dyn Any>,
}

impl Userdata {
    /// Wrap a payload
    pub fn new(type_name: &str, data: Rc<dyn Any>) -> Self {
        Userdata {
            type_name: type_name.to_string(),
            data,
        }
    }

    /// Type name given at creation
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Shared payload
    pub fn data(&self) -> &Rc<dyn Any> {
        &self.data
    }
}

// ============================================================================
// Tables
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TableKey {
    Boolean(bool),
    Integer(i64),
    Float(u64),
    String(Rc<str>),
    Object(usize),
}

/// Associative table with insertion-ordered traversal.
///
/// Assigning nil to an existing key leaves a tombstone so that a traversal
/// in progress can continue past it; the slot is reused if the key is set
/// again. Inserting a new key (which invalidates traversals anyway) first
/// compacts the table once tombstones outnumber live entries.
#[derive(Default)]
pub struct Table {
    entries: Vec<(LuaValue, LuaValue)>,
    index: FxHashMap<TableKey, usize>,
    dead: usize,
}

impl Table {
    /// `t[key]`, nil when absent
    pub fn get(&self, key: &LuaValue) -> LuaValue {
        match table_key(key) {
            Ok(k) => self
                .index
                .get(&k)
                .map(|&pos| self.entries[pos].1.clone())
                .unwrap_or_default(),
            Err(_) => LuaValue::Nil,
        }
    }

    /// `t[key] = value`; nil and NaN keys are errors
    pub fn set(&mut self, key: LuaValue, value: LuaValue) -> GlueResult<()> {
        let k = table_key(&key)?;
        match self.index.get(&k) {
            Some(&pos) => {
                let slot = &mut self.entries[pos].1;
                match (matches!(slot, LuaValue::Nil), matches!(value, LuaValue::Nil)) {
                    (false, true) => self.dead += 1,
                    (true, false) => self.dead -= 1,
                    _ => {}
                }
                *slot = value;
            }
            None if matches!(value, LuaValue::Nil) => {}
            None => {
                if self.dead > self.entries.len() - self.dead {
                    self.compact();
                }
                self.index.insert(k, self.entries.len());
                self.entries.push((normalize_key(key), value));
            }
        }
        Ok(())
    }

    fn compact(&mut self) {
        self.entries.retain(|(_, v)| !matches!(v, LuaValue::Nil));
        self.index.clear();
        for (pos, (key, _)) in self.entries.iter().enumerate() {
            if let Ok(k) = table_key(key) {
                self.index.insert(k, pos);
            }
        }
        self.dead = 0;
    }

    /// Number of slots held, tombstones included
    pub fn capacity_used(&self) -> usize {
        self.entries.len()
    }

    fn insert_unchecked(&mut self, key: LuaValue, value: LuaValue) {
        if matches!(value, LuaValue::Nil) {
            return;
        }
        if let Ok(k) = table_key(&key) {
            self.index.insert(k, self.entries.len());
            self.entries.push((key, value));
        }
    }

    /// Traversal step: the entry after `key` (nil starts the traversal)
    pub fn next(&self, key: &LuaValue) -> GlueResult<Option<(LuaValue, LuaValue)>> {
        let start = match key {
            LuaValue::Nil => 0,
            other => {
                let k = table_key(other)?;
                match self.index.get(&k) {
                    Some(&pos) => pos + 1,
                    None => return Err(GlueError::Runtime("invalid key to 'next'".into())),
                }
            }
        };
        Ok(self.entries[start.min(self.entries.len())..]
            .iter()
            .find(|(_, v)| !matches!(v, LuaValue::Nil))
            .cloned())
    }

    /// Live entries in traversal order
    pub fn pairs(&self) -> impl Iterator<Item = (&LuaValue, &LuaValue)> {
        self.entries
            .iter()
            .filter(|(_, v)| !matches!(v, LuaValue::Nil))
            .map(|(k, v)| (k, v))
    }

    /// Number of live entries
    pub fn count(&self) -> usize {
        self.entries.len() - self.dead
    }

    /// Border of the sequence part: largest `n` with `t[1..=n]` all non-nil
    pub fn sequence_len(&self) -> i64 {
        let mut n = 0;
        while !matches!(self.get(&LuaValue::Integer(n + 1)), LuaValue::Nil) {
            n += 1;
        }
        n
    }
}

fn table_key(key: &LuaValue) -> GlueResult<TableKey> {
    let k = match key {
        LuaValue::Nil => return Err(GlueError::Runtime("table index is nil".into())),
        LuaValue::Boolean(b) => TableKey::Boolean(*b),
        LuaValue::Integer(i) => TableKey::Integer(*i),
        LuaValue::Number(n) if n.is_nan() => {
            return Err(GlueError::Runtime("table index is NaN".into()))
        }
        LuaValue::Number(n) => match float_to_integer(*n) {
            Some(i) => TableKey::Integer(i),
            None => TableKey::Float(n.to_bits()),
        },
        LuaValue::String(s) => TableKey::String(Rc::clone(s)),
        LuaValue::Table(_) | LuaValue::Function(_) | LuaValue::Userdata(_) => {
            TableKey::Object(key.identity().unwrap_or_default())
        }
    };
    Ok(k)
}

fn normalize_key(key: LuaValue) -> LuaValue {
    match key {
        LuaValue::Number(n) => match float_to_integer(n) {
            Some(i) => LuaValue::Integer(i),
            None => LuaValue::Number(n),
        },
        other => other,
    }
}

// ============================================================================
// Number conversions
// ============================================================================

/// Integer with the same value as `n`, if any
pub fn float_to_integer(n: f64) -> Option<i64> {
    // 2^63 is exactly representable; i64::MAX is not
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if n.fract() == 0.0 && n >= -LIMIT && n < LIMIT {
        Some(n as i64)
    } else {
        None
    }
}

/// Parse a numeric string the way the runtime coerces strings to numbers.
///
/// Accepts surrounding whitespace, decimal and hexadecimal integers, and
/// decimal floats. Decimal integers that overflow become floats.
pub fn parse_number(s: &str) -> Option<LuaValue> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    let (negative, digits) = match t.as_bytes()[0] {
        b'-' => (true, &t[1..]),
        b'+' => (false, &t[1..]),
        _ => (false, t),
    };
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        // hexadecimal integers wrap around
        let value = hex.bytes().fold(0i64, |acc, b| {
            let d = (b as char).to_digit(16).unwrap_or(0) as i64;
            acc.wrapping_mul(16).wrapping_add(d)
        });
        return Some(LuaValue::Integer(if negative { value.wrapping_neg() } else { value }));
    }
    if !digits
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return None;
    }
    if digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = t.parse::<i64>() {
            return Some(LuaValue::Integer(i));
        }
    }
    t.parse::<f64>().ok().map(LuaValue::Number)
}

/// Render a float like the runtime's `%.14g` format, marking integral
/// values with a trailing `.0`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return if n.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let s = format_g(n, 14);
    if s.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        format!("{s}.0")
    } else {
        s
    }
}

fn format_g(n: f64, precision: usize) -> String {
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let sci = format!("{:.*e}", precision - 1, n);
    let (mantissa, exp) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    if exp < -4 || exp >= precision as i32 {
        let mantissa = trim_fraction(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(3.0), "3.0");
        assert_eq!(format_number(-0.25), "-0.25");
        assert_eq!(format_number(1e100), "1e+100");
        assert_eq!(format_number(1e15), "1e+15");
        assert_eq!(format_number(123456789012.0), "123456789012.0");
        assert_eq!(format_number(0.0001), "0.0001");
        assert_eq!(format_number(0.00001), "1e-05");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(f64::INFINITY), "inf");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 42 "), Some(LuaValue::Integer(42)));
        assert_eq!(parse_number("-7"), Some(LuaValue::Integer(-7)));
        assert_eq!(parse_number("0x10"), Some(LuaValue::Integer(16)));
        assert_eq!(parse_number("2.5"), Some(LuaValue::Number(2.5)));
        assert_eq!(parse_number("1e3"), Some(LuaValue::Number(1000.0)));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(""), None);
        assert!(matches!(
            parse_number("99999999999999999999"),
            Some(LuaValue::Number(_))
        ));
    }

    #[test]
    fn test_coercions() {
        assert_eq!(LuaValue::Number(3.0).to_integer(), Some(3));
        assert_eq!(LuaValue::Number(3.5).to_integer(), None);
        assert_eq!(LuaValue::str("10").to_integer(), Some(10));
        assert_eq!(LuaValue::str("10.0").to_integer(), Some(10));
        assert_eq!(LuaValue::Integer(5).to_str().as_deref(), Some("5"));
        assert_eq!(LuaValue::Boolean(true).to_number(), None);
        assert_eq!(float_to_integer(9.3e18), None);
    }

    #[test]
    fn test_table_keys_normalised() {
        let mut t = Table::default();
        t.set(LuaValue::Number(2.0), LuaValue::str("two")).unwrap();
        assert_eq!(t.get(&LuaValue::Integer(2)), LuaValue::str("two"));
        let (k, _) = t.next(&LuaValue::Nil).unwrap().unwrap();
        assert!(matches!(k, LuaValue::Integer(2)));
        assert!(t.set(LuaValue::Nil, LuaValue::Integer(1)).is_err());
        assert!(t.set(LuaValue::Number(f64::NAN), LuaValue::Integer(1)).is_err());
    }

    #[test]
    fn test_traversal_survives_removal() {
        let mut t = Table::default();
        for i in 1..=3 {
            t.set(LuaValue::Integer(i), LuaValue::Integer(i * 10)).unwrap();
        }
        let (k1, _) = t.next(&LuaValue::Nil).unwrap().unwrap();
        t.set(k1.clone(), LuaValue::Nil).unwrap();
        let (k2, v2) = t.next(&k1).unwrap().unwrap();
        assert_eq!(k2, LuaValue::Integer(2));
        assert_eq!(v2, LuaValue::Integer(20));
        assert_eq!(t.count(), 2);
        assert!(t.next(&LuaValue::str("missing")).is_err());
    }

    #[test]
    fn test_sequence_len() {
        let list = LuaValue::list(vec![LuaValue::Integer(1), LuaValue::Integer(2)]);
        assert_eq!(list.as_table().unwrap().borrow().sequence_len(), 2);
    }

    #[test]
    fn test_churning_keys_stay_bounded() {
        let mut t = Table::default();
        t.set(LuaValue::str("keep"), LuaValue::Boolean(true)).unwrap();
        for i in 0..1000 {
            t.set(LuaValue::Integer(i), LuaValue::Integer(i)).unwrap();
            t.set(LuaValue::Integer(i), LuaValue::Nil).unwrap();
        }
        assert!(t.capacity_used() <= 3);
        assert_eq!(t.count(), 1);
        assert_eq!(t.get(&LuaValue::str("keep")), LuaValue::Boolean(true));
        let (k, _) = t.next(&LuaValue::Nil).unwrap().unwrap();
        assert_eq!(k, LuaValue::str("keep"));
        assert!(t.next(&k).unwrap().is_none());
    }

    #[test]
    fn test_resetting_a_removed_key_revives_its_slot() {
        let mut t = Table::default();
        t.set(LuaValue::Integer(1), LuaValue::Integer(10)).unwrap();
        t.set(LuaValue::Integer(1), LuaValue::Nil).unwrap();
        assert_eq!(t.count(), 0);
        t.set(LuaValue::Integer(1), LuaValue::Integer(11)).unwrap();
        assert_eq!(t.count(), 1);
        assert_eq!(t.capacity_used(), 1);
    }
}
