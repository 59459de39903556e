use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use super::Value;

/// Walk `segments` through `data`. Objects are indexed by key, arrays by a
/// non-negative integer segment; any other step fails.
fn resolve_segments<'d, 's>(
    data: &'d Value,
    segments: impl IntoIterator<Item = &'s str>,
) -> Option<&'d Value> {
    segments.into_iter().try_fold(data, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    })
}

/// Resolve a dot-separated path against `data`. The empty path is the whole
/// context. Returns `None` if any step fails.
#[must_use]
pub fn resolve<'d>(data: &'d Value, path: &str) -> Option<&'d Value> {
    if path.is_empty() {
        return Some(data);
    }
    resolve_segments(data, path.split('.'))
}

/// The path text named by a `var` key or a `missing` entry: strings are dot
/// paths, integers index a single step, and `null` names the whole context.
/// Any other value names no path.
pub(crate) fn key_path(key: &Value) -> Option<Cow<'_, str>> {
    match key {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Int(i) => Some(Cow::Owned(i.to_string())),
        Value::Null => Some(Cow::Borrowed("")),
        _ => None,
    }
}

/// Resolve a key (see [`key_path`]) against `data`.
pub(crate) fn resolve_key<'d>(data: &'d Value, key: &Value) -> Option<&'d Value> {
    key_path(key).and_then(|path| resolve(data, &path))
}

/// A variable path split into segments once, ahead of evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Split a dot-separated path. The empty string yields the root path.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::default();
        }
        Self::from_segments(path.split('.').map(str::to_owned).collect())
    }

    pub(crate) fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Whether this path names the whole context.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn resolve<'d>(&self, data: &'d Value) -> Option<&'d Value> {
        resolve_segments(data, self.segments.iter().map(String::as_str))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Builder for nested data contexts from dot-separated paths.
///
/// ```
/// use tessera::{Context, Value};
///
/// let ctx = Context::new()
///     .set("user.profile.age", 25_i64)
///     .set("user.status", "active");
/// assert_eq!(ctx.get("user.profile.age"), Some(&Value::Int(25)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    data: Value,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            data: Value::Object(BTreeMap::new()),
        }
    }
}

impl Context {
    /// Create an empty context (an empty object).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value at a dot-separated path. Creates intermediate objects as needed.
    #[must_use]
    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.insert(path, value.into());
        self
    }

    /// Insert a value at a dot-separated path (mutable reference version).
    pub fn insert(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        Self::insert_recursive(&mut self.data, &segments, value);
    }

    /// Look up a value by dot-separated path, the same way `var` does.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        resolve(&self.data, path)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.data
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.data
    }

    fn insert_recursive(node: &mut Value, segments: &[&str], value: Value) {
        if !matches!(node, Value::Object(_)) {
            *node = Value::Object(BTreeMap::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        match segments {
            [] => {}
            [last] => {
                map.insert((*last).to_owned(), value);
            }
            [first, rest @ ..] => {
                let entry = map.entry((*first).to_owned()).or_insert(Value::Null);
                Self::insert_recursive(entry, rest, value);
            }
        }
    }
}

impl From<Context> for Value {
    fn from(ctx: Context) -> Self {
        ctx.data
    }
}

impl AsRef<Value> for Context {
    fn as_ref(&self) -> &Value {
        &self.data
    }
}
