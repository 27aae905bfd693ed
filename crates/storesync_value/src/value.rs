//! Dynamic state value type.

use crate::kind::Kind;
use crate::path::{Path, PathSegment};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, LazyLock, OnceLock};

/// Ordered key/value entries of an [`Object`].
///
/// Insertion order is the enumeration order used everywhere keys are walked.
pub type Map = IndexMap<String, Value>;

static EMPTY_MAP: LazyLock<Map> = LazyLock::new(Map::new);

/// A dynamic state value.
///
/// Scalars are stored inline. Containers ([`Object`] and [`Array`]) are
/// reference counted and never mutated after construction, so cloning a
/// `Value` is cheap and two clones of the same container share identity.
#[derive(Debug, Clone)]
pub enum Value {
    /// The absent sentinel.
    Undefined,
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Double-precision number.
    Number(f64),
    /// Text string.
    Text(String),
    /// A point in time, compared by instant.
    Date(DateTime<Utc>),
    /// A regular expression, stored as its source pattern.
    Regex(String),
    /// Ordered sequence of values.
    Array(Array),
    /// Ordered map of string keys to values.
    Object(Object),
}

impl Value {
    /// Creates an object value from key/value pairs.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Object(entries.into_iter().collect())
    }

    /// Creates an empty object value.
    pub fn empty_object() -> Self {
        Value::Object(Object::empty())
    }

    /// Creates an array value from items.
    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Creates a date value from milliseconds since the Unix epoch.
    ///
    /// Returns `None` when the instant is out of range.
    pub fn date_from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Value::Date)
    }

    /// Classifies this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Undefined => Kind::Undefined,
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Boolean,
            Value::Number(_) => Kind::Number,
            Value::Text(_) => Kind::String,
            Value::Date(_) => Kind::Date,
            Value::Regex(_) => Kind::RegExp,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    /// Check if this value is the absent sentinel.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as a number, if it is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as an object, if it is one.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Look up a key in this object value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|o| o.get(key))
    }

    /// Look up a single path segment.
    ///
    /// Keys resolve against objects, indices against arrays. Any other
    /// combination resolves to `None`.
    pub fn child(&self, segment: &PathSegment) -> Option<&Value> {
        match (self, segment) {
            (Value::Object(o), PathSegment::Key(k)) => o.get(k),
            (Value::Array(a), PathSegment::Index(i)) => a.get(*i),
            _ => None,
        }
    }

    /// Resolves a path by sequential traversal from this value.
    pub fn get_path(&self, path: &Path) -> Option<&Value> {
        path.iter()
            .try_fold(self, |current, segment| current.child(segment))
    }

    /// Returns true if both values are the same reference.
    ///
    /// Containers compare by identity. Scalars compare by strict equality,
    /// so `NaN` is never the same reference as anything.
    pub fn same_ref(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => {
                false
            }
            _ => self == other,
        }
    }

    /// Returns the identity of a container value.
    pub fn container_id(&self) -> Option<usize> {
        match self {
            Value::Object(o) => Some(o.id()),
            Value::Array(a) => Some(a.id()),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

/// An immutable, reference-counted ordered map.
///
/// Cloning shares the underlying entries. Use [`Object::to_map`] to take a
/// shallow copy that can be edited and wrapped again with [`Object::new`].
#[derive(Clone)]
pub struct Object(Arc<OnceLock<Map>>);

impl Object {
    /// Wraps the given entries.
    pub fn new(entries: Map) -> Self {
        Self(Arc::new(OnceLock::from(entries)))
    }

    /// Creates an object with no entries.
    pub fn empty() -> Self {
        Self::new(Map::new())
    }

    /// Builds an object that may contain references to itself.
    ///
    /// The closure receives a handle to the object under construction and
    /// returns its entries. Reading through the handle inside the closure
    /// sees an empty object. Self-referential objects are never freed.
    pub fn cyclic<F>(build: F) -> Self
    where
        F: FnOnce(&Object) -> Map,
    {
        let object = Self(Arc::new(OnceLock::new()));
        let entries = build(&object);
        let _ = object.0.set(entries);
        object
    }

    /// Returns the entries.
    pub fn entries(&self) -> &Map {
        self.0.get().unwrap_or(&EMPTY_MAP)
    }

    /// Returns a shallow copy of the entries.
    pub fn to_map(&self) -> Map {
        self.entries().clone()
    }

    /// Looks up a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries().get(key)
    }

    /// Returns true if the key is present, even when bound to `Undefined`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries().contains_key(key)
    }

    /// Iterates keys in enumeration order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.entries().keys()
    }

    /// Iterates entries in enumeration order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.entries().iter()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Returns true if both handles point at the same object.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of this object, stable for its lifetime.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || compare_guarded(self.id(), other.id(), || self.entries() == other.entries())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print_guarded(self.id(), f, |f| f.debug_map().entries(self.iter()).finish())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// An immutable, reference-counted sequence of values.
#[derive(Clone)]
pub struct Array(Arc<OnceLock<Vec<Value>>>);

impl Array {
    /// Wraps the given items.
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(OnceLock::from(items)))
    }

    /// Creates an array with no items.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Builds an array that may contain references to itself.
    ///
    /// See [`Object::cyclic`].
    pub fn cyclic<F>(build: F) -> Self
    where
        F: FnOnce(&Array) -> Vec<Value>,
    {
        let array = Self(Arc::new(OnceLock::new()));
        let items = build(&array);
        let _ = array.0.set(items);
        array
    }

    /// Returns the items.
    pub fn items(&self) -> &[Value] {
        self.0.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns a shallow copy of the items.
    pub fn to_vec(&self) -> Vec<Value> {
        self.items().to_vec()
    }

    /// Returns the item at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items().get(index)
    }

    /// Iterates the items.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items().iter()
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items().len()
    }

    /// Returns true if there are no items.
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Returns true if both handles point at the same array.
    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of this array, stable for its lifetime.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || compare_guarded(self.id(), other.id(), || self.items() == other.items())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print_guarded(self.id(), f, |f| f.debug_list().entries(self.iter()).finish())
    }
}

impl<V: Into<Value>> FromIterator<V> for Array {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

thread_local! {
    static PRINTING: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
    static COMPARING: RefCell<HashSet<(usize, usize)>> = RefCell::new(HashSet::new());
}

// A pair of containers already being compared further up the stack is
// assumed equal; any difference shows up on the outer comparison.
fn compare_guarded<F>(lhs: usize, rhs: usize, body: F) -> bool
where
    F: FnOnce() -> bool,
{
    let entered = COMPARING.with(|comparing| comparing.borrow_mut().insert((lhs, rhs)));
    if !entered {
        return true;
    }
    let result = body();
    COMPARING.with(|comparing| {
        comparing.borrow_mut().remove(&(lhs, rhs));
    });
    result
}

// Containers already on the print stack render as `<cycle>`.
fn print_guarded<F>(id: usize, f: &mut fmt::Formatter<'_>, body: F) -> fmt::Result
where
    F: FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    let entered = PRINTING.with(|printing| printing.borrow_mut().insert(id));
    if !entered {
        return f.write_str("<cycle>");
    }
    let result = body(f);
    PRINTING.with(|printing| {
        printing.borrow_mut().remove(&id);
    });
    result
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Object(Object::new(m))
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Undefined, Into::into)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}
