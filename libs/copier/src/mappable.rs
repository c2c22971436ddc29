use chrono::{DateTime, Utc};

use crate::error::CopyError;
use crate::shape::{PrimitiveKind, Shape, TypeKey};
use crate::value::{PointerValue, SequenceValue, Value};

/// A Rust type the engine can read from and write into.
///
/// `shape()` is the static descriptor, `to_value()` reflects an instance out
/// into the dynamic tree, `from_value()` rebuilds it and `assign()` writes a
/// value back into an existing instance. Structs get this from
/// `#[derive(Mappable)]`.
pub trait Mappable: Sized + 'static {
    fn shape() -> Shape;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, CopyError>;

    /// Write `value` into `self`. Parts of `self` the value does not carry
    /// (fields left out of reflection) keep their current contents.
    fn assign(&mut self, value: Value) -> Result<(), CopyError> {
        *self = Self::from_value(value)?;
        Ok(())
    }
}

macro_rules! primitive_mappable {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Mappable for $ty {
                fn shape() -> Shape {
                    Shape::Primitive(PrimitiveKind::$variant)
                }

                fn to_value(&self) -> Value {
                    Value::$variant(Clone::clone(self))
                }

                fn from_value(value: Value) -> Result<Self, CopyError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(CopyError::mismatch(TypeKey::of::<$ty>().name(), other.type_name())),
                    }
                }
            }
        )*
    };
}

primitive_mappable! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
    DateTime<Utc> => Timestamp,
}

/// `None` is the nil pointer.
impl<T: Mappable> Mappable for Option<T> {
    fn shape() -> Shape {
        Shape::Pointer {
            key: TypeKey::of::<Self>(),
            elem: T::shape,
        }
    }

    fn to_value(&self) -> Value {
        let key = TypeKey::of::<Self>();
        Value::Pointer(match self {
            Some(v) => PointerValue::new(key, T::shape, v.to_value()),
            None => PointerValue::nil(key, T::shape),
        })
    }

    fn from_value(value: Value) -> Result<Self, CopyError> {
        match value {
            Value::Pointer(p) => match p.target {
                Some(v) => T::from_value(*v).map(Some),
                None => Ok(None),
            },
            other => Err(CopyError::mismatch(TypeKey::of::<Self>().name(), other.type_name())),
        }
    }

    fn assign(&mut self, value: Value) -> Result<(), CopyError> {
        match (self, value) {
            (Some(current), Value::Pointer(PointerValue { target: Some(v), .. })) => current.assign(*v),
            (slot, value) => {
                *slot = Self::from_value(value)?;
                Ok(())
            }
        }
    }
}

/// Transparent: same shape and values as `T`.
impl<T: Mappable> Mappable for Box<T> {
    fn shape() -> Shape {
        T::shape()
    }

    fn to_value(&self) -> Value {
        T::to_value(self)
    }

    fn from_value(value: Value) -> Result<Self, CopyError> {
        T::from_value(value).map(Box::new)
    }

    fn assign(&mut self, value: Value) -> Result<(), CopyError> {
        T::assign(self, value)
    }
}

impl<T: Mappable> Mappable for Vec<T> {
    fn shape() -> Shape {
        Shape::Sequence {
            key: TypeKey::of::<Self>(),
            elem: T::shape,
        }
    }

    fn to_value(&self) -> Value {
        let items = self.iter().map(T::to_value).collect();
        Value::Sequence(SequenceValue::new(TypeKey::of::<Self>(), T::shape, items))
    }

    fn from_value(value: Value) -> Result<Self, CopyError> {
        match value {
            Value::Sequence(s) => s.items.into_iter().map(T::from_value).collect(),
            other => Err(CopyError::mismatch(TypeKey::of::<Self>().name(), other.type_name())),
        }
    }
}
