// Deferred value prototypes
//
// A descriptor's default is not a value yet. It becomes one when a field is
// instantiated (literals, counters, custom prototypes) or when the root record
// is initialized and again at serialization time (bound values).

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::codec::types::Value;
use crate::internal::error::{Error, Result};
use crate::tree::{Field, Scope};

/// Closure behind a bound value; it sees the enclosing record and its ancestors.
pub type BindFn = dyn Fn(&Scope<'_>) -> Result<Value> + Send + Sync;

/// Closure behind a multi-field bound value; it sees the mapped fields by alias.
pub type MultiBindFn = dyn Fn(&BoundFields<'_, '_>) -> Result<Value> + Send + Sync;

/// A value computed from other fields of the tree.
#[derive(Clone)]
pub enum Binding {
    /// Computed from the enclosing scope.
    Single(Arc<BindFn>),
    /// Computed from a fixed set of fields, each under an alias.
    Multi {
        resolve: Arc<MultiBindFn>,
        fields: Vec<(String, String)>,
    },
}

impl Binding {
    pub fn single<F>(f: F) -> Self
    where
        F: Fn(&Scope<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        Binding::Single(Arc::new(f))
    }

    /// `fields` maps alias to field name (or dotted path) in the enclosing scope.
    pub fn multi<F>(f: F, fields: &[(&str, &str)]) -> Self
    where
        F: Fn(&BoundFields<'_, '_>) -> Result<Value> + Send + Sync + 'static,
    {
        Binding::Multi {
            resolve: Arc::new(f),
            fields: fields
                .iter()
                .map(|(alias, name)| (alias.to_string(), name.to_string()))
                .collect(),
        }
    }

    pub fn resolve(&self, scope: &Scope<'_>) -> Result<Value> {
        match self {
            Binding::Single(f) => f(scope),
            Binding::Multi { resolve, fields } => {
                for (alias, name) in fields {
                    if scope.field(name).is_none() {
                        return Err(Error::BindingError(format!(
                            "Bound field '{}' (alias '{}') is not in scope",
                            name, alias
                        )));
                    }
                }
                resolve(&BoundFields { scope, fields })
            }
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Single(_) => write!(f, "Binding::Single(..)"),
            Binding::Multi { fields, .. } => f.debug_struct("Binding::Multi").field("fields", fields).finish(),
        }
    }
}

/// The fields a multi-field binding depends on.
pub struct BoundFields<'s, 'a> {
    scope: &'s Scope<'a>,
    fields: &'s [(String, String)],
}

impl<'s, 'a> BoundFields<'s, 'a> {
    fn target(&self, alias: &str) -> Result<&'s str> {
        self.fields
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, name)| name.as_str())
            .ok_or_else(|| Error::BindingError(format!("No bound field with alias '{}'", alias)))
    }

    pub fn field(&self, alias: &str) -> Result<&'a Field> {
        let name = self.target(alias)?;
        self.scope
            .field(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    pub fn value(&self, alias: &str) -> Result<&'a Value> {
        self.scope.value(self.target(alias)?)
    }

    pub fn encoded_len(&self, alias: &str) -> Result<usize> {
        self.scope.encoded_len(self.target(alias)?)
    }

    /// Serialized bytes of the aliased field.
    pub fn serialize(&self, alias: &str) -> Result<Bytes> {
        self.scope.serialize(self.target(alias)?)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(alias, _)| alias.as_str())
    }
}

/// Auto-incrementing value prototype.
///
/// Every field instantiated from a descriptor holding this counter (and every
/// instantiation-time clone of that descriptor) draws from the same sequence.
/// Deriving a schema forks the sequence.
#[derive(Debug, Clone)]
pub struct Counter {
    name: String,
    next: Arc<AtomicI64>,
    step: i64,
    replace_on_reuse: bool,
}

impl Counter {
    pub fn new(name: impl Into<String>, start: i64, step: i64, replace_on_reuse: bool) -> Self {
        Self {
            name: name.into(),
            next: Arc::new(AtomicI64::new(start)),
            step,
            replace_on_reuse,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a reset record draws a fresh number instead of keeping its own.
    pub fn replace_on_reuse(&self) -> bool {
        self.replace_on_reuse
    }

    /// The number the next instantiation will receive.
    pub fn peek(&self) -> i64 {
        self.next.load(Ordering::Relaxed)
    }

    pub fn next_value(&self) -> Value {
        Value::I64(self.next.fetch_add(self.step, Ordering::Relaxed))
    }

    /// Independent copy continuing from the current position.
    pub fn fork(&self) -> Self {
        Self {
            name: self.name.clone(),
            next: Arc::new(AtomicI64::new(self.peek())),
            step: self.step,
            replace_on_reuse: self.replace_on_reuse,
        }
    }
}

/// Custom deferred value.
pub trait ValuePrototype: fmt::Debug + Send + Sync {
    /// Produces the value for one new field instance.
    fn create(&self) -> Result<Value>;

    /// Independent copy for a derived schema, or None when the prototype
    /// cannot be copied.
    fn try_fork(&self) -> Option<Arc<dyn ValuePrototype>>;
}

/// Default slot of a field descriptor.
#[derive(Debug, Clone, Default)]
pub enum DefaultValue {
    /// The field type's zero value.
    #[default]
    None,
    Literal(Value),
    Bound(Binding),
    Counter(Counter),
    Custom(Arc<dyn ValuePrototype>),
}

impl DefaultValue {
    /// Deep copy for inheritance. None when a custom prototype refuses to fork.
    pub fn deep_clone(&self) -> Option<DefaultValue> {
        match self {
            DefaultValue::None => Some(DefaultValue::None),
            DefaultValue::Literal(v) => Some(DefaultValue::Literal(v.clone())),
            // closures are immutable once declared
            DefaultValue::Bound(b) => Some(DefaultValue::Bound(b.clone())),
            DefaultValue::Counter(c) => Some(DefaultValue::Counter(c.fork())),
            DefaultValue::Custom(p) => p.try_fork().map(DefaultValue::Custom),
        }
    }

    /// Value of a freshly instantiated field. Bound defaults start at `zero`
    /// until the record is initialized.
    pub fn seed(&self, zero: Value) -> Result<Value> {
        match self {
            DefaultValue::None | DefaultValue::Bound(_) => Ok(zero),
            DefaultValue::Literal(v) => Ok(v.clone()),
            DefaultValue::Counter(c) => Ok(c.next_value()),
            DefaultValue::Custom(p) => p.create(),
        }
    }

    pub fn binding(&self) -> Option<&Binding> {
        match self {
            DefaultValue::Bound(b) => Some(b),
            _ => None,
        }
    }

    pub fn literal(&self) -> Option<&Value> {
        match self {
            DefaultValue::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn counter(&self) -> Option<&Counter> {
        match self {
            DefaultValue::Counter(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, DefaultValue::None)
    }
}

impl From<Value> for DefaultValue {
    fn from(v: Value) -> Self {
        DefaultValue::Literal(v)
    }
}

impl From<Binding> for DefaultValue {
    fn from(b: Binding) -> Self {
        DefaultValue::Bound(b)
    }
}

impl From<Counter> for DefaultValue {
    fn from(c: Counter) -> Self {
        DefaultValue::Counter(c)
    }
}

impl From<Arc<dyn ValuePrototype>> for DefaultValue {
    fn from(p: Arc<dyn ValuePrototype>) -> Self {
        DefaultValue::Custom(p)
    }
}

impl<T: Into<Value>> From<Option<T>> for DefaultValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => DefaultValue::Literal(v.into()),
            None => DefaultValue::None,
        }
    }
}

macro_rules! impl_literal_default {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for DefaultValue {
                fn from(v: $ty) -> Self {
                    DefaultValue::Literal(Value::from(v))
                }
            }
        )*
    };
}

impl_literal_default!(bool, u8, u16, u32, u64, i8, i16, i32, i64, &str, String, Bytes, Vec<u8>);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Sequence(Mutex<Vec<u8>>);

    impl ValuePrototype for Sequence {
        fn create(&self) -> Result<Value> {
            let mut items = self.0.lock().map_err(|_| Error::BindingError("poisoned".to_string()))?;
            Ok(Value::U8(items.pop().unwrap_or(0)))
        }

        fn try_fork(&self) -> Option<Arc<dyn ValuePrototype>> {
            None
        }
    }

    #[test]
    fn test_counter_sequence_is_shared_by_clones() {
        let counter = Counter::new("seq", 10, 5, true);
        let clone = counter.clone();
        assert_eq!(counter.next_value(), Value::I64(10));
        assert_eq!(clone.next_value(), Value::I64(15));
        assert_eq!(counter.peek(), 20);
    }

    #[test]
    fn test_counter_fork_is_independent() {
        let counter = Counter::new("seq", 0, 1, false);
        counter.next_value();
        let fork = counter.fork();
        assert_eq!(fork.next_value(), Value::I64(1));
        assert_eq!(fork.next_value(), Value::I64(2));
        assert_eq!(counter.next_value(), Value::I64(1));
    }

    #[test]
    fn test_seed() {
        assert_eq!(DefaultValue::None.seed(Value::U8(0)).unwrap(), Value::U8(0));
        assert_eq!(DefaultValue::from(7u8).seed(Value::U8(0)).unwrap(), Value::U8(7));
        let bound = DefaultValue::from(Binding::single(|_| Ok(Value::U8(1))));
        assert_eq!(bound.seed(Value::U8(0)).unwrap(), Value::U8(0));
        let custom = DefaultValue::Custom(Arc::new(Sequence(Mutex::new(vec![3, 4]))));
        assert_eq!(custom.seed(Value::U8(0)).unwrap(), Value::U8(4));
    }

    #[test]
    fn test_deep_clone_refuses_unforkable_prototype() {
        let custom = DefaultValue::Custom(Arc::new(Sequence(Mutex::new(vec![]))));
        assert!(custom.deep_clone().is_none());
        assert!(DefaultValue::from("x").deep_clone().is_some());
    }
}
