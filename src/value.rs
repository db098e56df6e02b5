//! Data context values
//!
//! Templates render against a flat mapping from identifier to [`Value`].
//! The value space is deliberately closed: scalars, one level of object
//! nesting, and lists of objects (loop rows). Everything the renderer does
//! with a value is total pattern matching over this enum.

use std::collections::HashMap;

/// A mapping from identifier to value (one object / one loop row)
pub type Dict = HashMap<String, Value>;

/// A value supplied by the caller at render time
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A nested object
    Object(Dict),
    /// An ordered list of objects, iterated by `{{#LOOP name}}`
    List(Vec<Dict>),
}

impl Value {
    /// Human-readable type name (for diagnostics and tests)
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::List(_) => "list",
        }
    }

    /// JS-style falsiness: `false`, `0`, `0.0` and `""` are falsy.
    /// Objects and lists are always truthy, even when empty.
    ///
    /// The engine reports absent *and* falsy lookups as "NOT FOUND", so this
    /// mirrors the host language semantics of the original engine exactly.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Object(_) | Value::List(_) => false,
        }
    }

    /// Render the value to output text. Lists have no display form: the
    /// renderer diagnoses them before reaching this path, so they render
    /// as nothing.
    pub fn render_to_string(&self) -> String {
        match self {
            Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Object(_) => "[object]".to_string(),
            Value::List(_) => String::new(),
        }
    }
}

/// Is this string one of the four accepted boolean spellings?
///
/// Conditions only accept `"true"`, `"false"`, `"0"` and `"1"` (case
/// sensitive); anything else is a data error surfaced inline.
pub fn is_boolean_string(s: &str) -> bool {
    matches!(s, "true" | "false" | "0" | "1")
}

/// Coerce an accepted boolean string to its truth value.
/// Callers must check [`is_boolean_string`] first; unknown strings are false.
pub fn is_trueish(s: &str) -> bool {
    matches!(s, "true" | "1")
}

/// The data context for one render call
///
/// A thin wrapper over [`Dict`] with ergonomic setters. Loop bodies do not
/// see the enclosing context: each iteration renders against the row's own
/// dict in isolation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    vars: Dict,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Get a variable
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Borrow the underlying dict
    pub fn as_dict(&self) -> &Dict {
        &self.vars
    }
}

impl From<Dict> for Context {
    fn from(vars: Dict) -> Self {
        Self { vars }
    }
}

// Convenience conversions for common types
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Dict> for Value {
    fn from(d: Dict) -> Self {
        Value::Object(d)
    }
}

impl From<Vec<Dict>> for Value {
    fn from(rows: Vec<Dict>) -> Self {
        Value::List(rows)
    }
}
