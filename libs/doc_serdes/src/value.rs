//! The in-memory document tree walked by the engine.
//!
//! Containers are reference-counted and copy-on-write. Cloning a [`Value`]
//! is cheap and a walk that does not mutate in place only copies the levels it
//! actually visits, leaving untouched subtrees shared with its input.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use indexmap::IndexMap;

/// The ordered key-value map backing a [`Document`].
pub type Map = IndexMap<String, Value>;

/// A node in a document tree.
///
/// Besides the kinds a wire document can hold, a value may also be
/// [`Value::Typed`]: an application value that a codec converts to or from its
/// wire form.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// `null`, or an absent value.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// A number that does not fit [`Value::Int`] or [`Value::Float`] without
    /// losing precision.
    BigNumber(BigDecimal),
    String(String),
    Array(Array),
    Object(Document),
    /// An application value with no wire representation of its own.
    Typed(Typed),
}

impl Value {
    /// Wraps an application value.
    pub fn typed<T: DocType>(value: T) -> Self {
        Self::Typed(Typed::new(value))
    }

    /// Whether this is [`Value::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this is an array or an object, i.e. something the walker can
    /// descend into.
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub const fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Object(doc) => Some(doc),
            _ => None,
        }
    }

    pub const fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub const fn as_typed(&self) -> Option<&Typed> {
        match self {
            Self::Typed(t) => Some(t),
            _ => None,
        }
    }

    /// Gets a field of an object value.
    ///
    /// Returns [`None`] if this isn't an object or the key is missing.
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_document().and_then(|doc| doc.get(key))
    }

    /// Gets the application value of type `T`, if this holds one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_typed().and_then(Typed::downcast_ref)
    }

    /// Whether this holds an application value of the given class.
    pub fn is_instance_of(&self, class: Class) -> bool {
        self.as_typed().is_some_and(|t| t.class() == class)
    }

    /// A short name for the kind of value, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::BigNumber(_) => "big number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Typed(t) => t.type_name(),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Self::$variant(value.into())
            }
        }
    )*};
}

impl_from!(
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => Int,
    f64 => Float,
    String => String,
    &str => String,
    BigDecimal => BigNumber,
    Document => Object,
    Map => Object,
    Array => Array,
    Vec<Value> => Array,
    Typed => Typed,
);

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A copy-on-write object.
///
/// Derefs to the underlying [`Map`] for reading. Mutating goes through
/// [`Document::make_mut`], which copies the map first if it is shared.
#[derive(Clone, Default, PartialEq)]
pub struct Document(Arc<Map>);

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets mutable access to the map, copying it if it is currently shared
    /// with another handle.
    pub fn make_mut(&mut self) -> &mut Map {
        Arc::make_mut(&mut self.0)
    }

    /// Inserts a field, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.make_mut().insert(key.into(), value.into())
    }

    /// Whether both handles point at the same map.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }

    /// Unwraps the map, cloning it only if it is shared.
    pub fn into_map(self) -> Map {
        Arc::unwrap_or_clone(self.0)
    }
}

impl Deref for Document {
    type Target = Map;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl From<Map> for Document {
    fn from(value: Map) -> Self {
        Self(Arc::new(value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let map = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<Map>();
        Self::from(map)
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A copy-on-write array.
///
/// Works the same way as [`Document`].
#[derive(Clone, Default, PartialEq)]
pub struct Array(Arc<Vec<Value>>);

impl Array {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets mutable access to the elements, copying them if currently shared.
    pub fn make_mut(&mut self) -> &mut Vec<Value> {
        Arc::make_mut(&mut self.0)
    }

    /// Whether both handles point at the same elements.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }
}

impl Deref for Array {
    type Target = [Value];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl From<Vec<Value>> for Array {
    fn from(value: Vec<Value>) -> Self {
        Self(Arc::new(value))
    }
}

impl<V: Into<Value>> FromIterator<V> for Array {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        Self::from(iter.into_iter().map(Into::into).collect::<Vec<_>>())
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Object-safe surface for application values stored in a [`Value::Typed`].
///
/// This is implemented for every `'static` type that is [`Debug`](fmt::Debug),
/// [`PartialEq`], [`Send`], and [`Sync`].
pub trait DocType: Any + fmt::Debug + Send + Sync {
    /// Upcasts to [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Compares against another value, which is never equal if the concrete
    /// types differ.
    fn dyn_eq(&self, other: &dyn DocType) -> bool;

    /// The name of the concrete type.
    fn type_name(&self) -> &'static str;
}

impl<T> DocType for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn DocType) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A shared application value.
#[derive(Clone)]
pub struct Typed(Arc<dyn DocType>);

impl Typed {
    pub fn new<T: DocType>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Gets the runtime class of the contained value.
    pub fn class(&self) -> Class {
        Class {
            id: (*self.0).as_any().type_id(),
            name: self.type_name(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        (*self.0).type_name()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).as_any().downcast_ref()
    }
}

impl PartialEq for Typed {
    fn eq(&self, other: &Self) -> bool {
        (*self.0).dyn_eq(&*other.0)
    }
}

impl fmt::Debug for Typed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// The runtime identity of an application type, used by class-guarded codecs.
#[derive(Debug, Clone, Copy)]
pub struct Class {
    id: TypeId,
    name: &'static str,
}

impl Class {
    /// Gets the class of `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The type name of the class.
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Meters(u32);

    #[derive(Debug, PartialEq)]
    struct Feet(u32);

    #[test]
    fn typed_eq_by_concrete_type() {
        assert_eq!(Value::typed(Meters(3)), Value::typed(Meters(3)), "same type and value");
        assert_ne!(Value::typed(Meters(3)), Value::typed(Meters(4)), "same type, other value");
        assert_ne!(Value::typed(Meters(3)), Value::typed(Feet(3)), "other type");
    }

    #[test]
    fn typed_class_and_downcast() {
        let value = Value::typed(Meters(7));

        assert!(value.is_instance_of(Class::of::<Meters>()), "is meters");
        assert!(!value.is_instance_of(Class::of::<Feet>()), "is not feet");
        assert_eq!(value.downcast_ref::<Meters>(), Some(&Meters(7)), "downcast");
        assert!(value.kind().ends_with("Meters"), "kind is type name");
    }

    #[test]
    fn document_copy_on_write() {
        let mut a = [("x", 1)].into_iter().collect::<Document>();
        let b = a.clone();
        assert!(Document::ptr_eq(&a, &b), "clone shares");

        a.insert("y", 2);
        assert!(!Document::ptr_eq(&a, &b), "write unshares");
        assert_eq!(b.len(), 1, "original untouched");
        assert_eq!(a.get("y"), Some(&Value::Int(2)), "copy written");
    }

    #[test]
    fn document_preserves_insertion_order() {
        let doc = [("b", 1), ("a", 2), ("c", 3)].into_iter().collect::<Document>();
        let keys = doc.keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(keys, ["b", "a", "c"], "insertion order");
    }
}
