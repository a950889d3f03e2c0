//! Template context for variable resolution and rendering.
//!
//! Provides [`Context`] for holding template variables in a stack-based scope,
//! and [`ContextValue`] for representing dynamic template values.

use std::collections::BTreeMap;
use std::fmt;

/// Represents a dynamic value in a template context.
#[derive(Debug, Clone)]
pub enum ContextValue {
    /// A string value, escaped on output when auto-escaping is on.
    String(String),
    /// A 64-bit integer.
    Integer(i64),
    /// A 64-bit floating point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// An ordered list of values.
    List(Vec<ContextValue>),
    /// A key-value mapping.
    Dict(BTreeMap<String, ContextValue>),
    /// The absence of a value.
    None,
    /// A string marked as safe; auto-escaping will not be applied.
    SafeString(String),
}

impl ContextValue {
    /// Returns `true` if this value is considered "truthy" in template logic.
    ///
    /// `None`, `false`, zero, and empty strings/lists/dicts are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) | Self::SafeString(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Dict(d) => !d.is_empty(),
        }
    }

    /// Converts this value to a display string (without HTML escaping).
    pub fn to_display_string(&self) -> String {
        match self {
            Self::String(s) | Self::SafeString(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => {
                if f.fract() == 0.0 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Self::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            Self::List(_) | Self::Dict(_) => self.to_repr(),
            Self::None => String::new(),
        }
    }

    /// Returns a Python-like repr string, used when a collection is printed.
    fn to_repr(&self) -> String {
        match self {
            Self::String(s) | Self::SafeString(s) => format!("'{s}'"),
            Self::None => "None".to_string(),
            Self::List(items) => {
                let inner: Vec<String> = items.iter().map(Self::to_repr).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Dict(map) => {
                let inner: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("'{k}': {}", v.to_repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            other => other.to_display_string(),
        }
    }

    /// Returns `true` if this value is a safe string (auto-escaping bypassed).
    pub const fn is_safe(&self) -> bool {
        matches!(self, Self::SafeString(_))
    }

    /// Marks a string value as safe, bypassing auto-escaping.
    #[must_use]
    pub fn mark_safe(self) -> Self {
        match self {
            Self::String(s) => Self::SafeString(s),
            other => other,
        }
    }

    /// Resolves one segment of a dotted path (`field.label`, `data.0`).
    pub fn resolve_path(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Dict(map) => map.get(key),
            Self::List(list) => key.parse::<usize>().ok().and_then(|idx| list.get(idx)),
            _ => None,
        }
    }

    /// Returns the length of a list, string, or dict.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::String(s) | Self::SafeString(s) => Some(s.chars().count()),
            Self::List(l) => Some(l.len()),
            Self::Dict(d) => Some(d.len()),
            _ => None,
        }
    }

    /// Returns `true` if this is an empty collection or empty string.
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|l| l == 0)
    }

    /// Attempts to convert this value to an f64.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            Self::String(s) | Self::SafeString(s) => s.parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Returns the string contents if this is a `String` or `SafeString`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::SafeString(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl PartialEq for ContextValue {
    #[allow(clippy::cast_precision_loss)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a) | Self::SafeString(a), Self::String(b) | Self::SafeString(b)) => {
                a == b
            }
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                (*a as f64) == *b
            }
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::None, Self::None) => true,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            _ => false,
        }
    }
}

// -- From implementations --

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for ContextValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for ContextValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<usize> for ContextValue {
    fn from(i: usize) -> Self {
        Self::Integer(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ContextValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Self>> From<Vec<T>> for ContextValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<BTreeMap<String, T>> for ContextValue {
    fn from(m: BTreeMap<String, T>) -> Self {
        Self::Dict(m.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for ContextValue {
    fn from(o: Option<T>) -> Self {
        o.map_or(Self::None, Into::into)
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::None),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(arr) => Self::List(arr.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => {
                Self::Dict(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// A template context that holds variables in a stack of scopes.
///
/// Lookup searches from the top of the stack downward, so `{% for %}` and
/// `{% with %}` can shadow outer names.
///
/// # Examples
///
/// ```
/// use form_designer_template::context::{Context, ContextValue};
///
/// let mut ctx = Context::new();
/// ctx.set("email", ContextValue::from("ann@example.com"));
/// ctx.push();
/// ctx.set("email", ContextValue::from("bob@example.com"));
/// assert_eq!(ctx.get("email").unwrap().to_display_string(), "bob@example.com");
/// ctx.pop();
/// assert_eq!(ctx.get("email").unwrap().to_display_string(), "ann@example.com");
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    stack: Vec<BTreeMap<String, ContextValue>>,
    auto_escape: bool,
}

impl Context {
    /// Creates a new empty context with a single scope and auto-escaping on.
    pub fn new() -> Self {
        Self {
            stack: vec![BTreeMap::new()],
            auto_escape: true,
        }
    }

    /// Creates a context from a flat map of variables.
    pub fn from_map(values: BTreeMap<String, ContextValue>) -> Self {
        Self {
            stack: vec![values],
            auto_escape: true,
        }
    }

    /// Pushes a new scope onto the context stack.
    pub fn push(&mut self) {
        self.stack.push(BTreeMap::new());
    }

    /// Pops the top scope. The root scope is never removed.
    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Sets a variable in the current (top) scope.
    pub fn set(&mut self, key: impl Into<String>, value: ContextValue) {
        if let Some(top) = self.stack.last_mut() {
            top.insert(key.into(), value);
        }
    }

    /// Copies every entry of `values` into the current scope.
    pub fn update(&mut self, values: BTreeMap<String, ContextValue>) {
        for (key, value) in values {
            self.set(key, value);
        }
    }

    /// Looks up a variable by name, supporting dotted paths like `field.label`.
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        let mut parts = key.split('.');
        let root_key = parts.next()?;

        let mut current = self
            .stack
            .iter()
            .rev()
            .find_map(|scope| scope.get(root_key))?;

        for part in parts {
            current = current.resolve_path(part)?;
        }

        Some(current)
    }

    /// Returns whether auto-escaping is enabled.
    pub const fn auto_escape(&self) -> bool {
        self.auto_escape
    }

    /// Sets whether auto-escaping is enabled.
    pub fn set_auto_escape(&mut self, enabled: bool) {
        self.auto_escape = enabled;
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Escapes HTML special characters in a string.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
