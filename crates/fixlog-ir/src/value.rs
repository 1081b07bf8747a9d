//! Ground runtime values.

use std::cmp::Ordering;
use std::fmt;

use crate::{Symbol, sym};

/// A ground value: the denotation of a constant term, a fact column, or a
/// lattice element. Values are immutable and cheap to clone; string payloads
/// are interned so values stay `Send + Sync`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Unit value.
    Unit,
    /// Boolean.
    Bool(bool),
    /// Signed integers.
    I32(i32),
    I64(i64),
    /// Interned string.
    Str(Symbol),
    /// Constructor application: `Name(v1, …, vn)`.
    Ctor(Symbol, Vec<Value>),
}

/// A tuple of values: a row in a relation, or a lattice-map key.
pub type Tuple = Vec<Value>;

impl Value {
    /// Create an interned string value.
    pub fn str(s: &str) -> Self {
        Value::Str(sym(s))
    }

    /// Create a constructor value.
    pub fn ctor(name: &str, args: Vec<Value>) -> Self {
        Value::Ctor(sym(name), args)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i64, widening i32.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(v) => Some(*v as i64),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Compare two values of the same shape. `None` across shapes; builtin
    /// comparison atoms fail rather than invent an ordering.
    pub fn partial_cmp_val(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Unit, Value::Unit) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::I32(a), Value::I32(b)) => Some(a.cmp(b)),
            (Value::I64(a), Value::I64(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.as_ref().cmp(b.as_ref())),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}i64"),
            Value::Str(v) => write!(f, "{:?}", v.as_ref()),
            Value::Ctor(name, args) => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "(")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg:?}")?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            other => write!(f, "{other:?}"),
        }
    }
}

// Convenience From implementations
impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::str(v)
    }
}
