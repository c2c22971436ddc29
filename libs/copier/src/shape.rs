use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::path::FieldPath;
use crate::value::{FieldValue, PointerValue, SequenceValue, StructValue, Value};

/// Identity of a Rust type, with a printable name for error messages.
///
/// Equality and hashing only look at the `TypeId`.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Type name with module paths stripped (`Option<String>`, not
    /// `core::option::Option<alloc::string::String>`).
    pub fn name(&self) -> String {
        short_type_name(self.name)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for c in full.chars() {
        if matches!(c, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&') {
            out.push_str(segment.rsplit("::").next().unwrap_or(&segment));
            segment.clear();
            out.push(c);
        } else {
            segment.push(c);
        }
    }
    out.push_str(segment.rsplit("::").next().unwrap_or(&segment));
    out
}

/// Lazily built shape. Keeps recursive types (through `Option<Box<T>>`) finite.
pub type ShapeFn = fn() -> Shape;

/// Leaf value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Char,
    String,
    /// `chrono::DateTime<Utc>`.
    Timestamp,
}

impl PrimitiveKind {
    pub fn key(self) -> TypeKey {
        match self {
            PrimitiveKind::Bool => TypeKey::of::<bool>(),
            PrimitiveKind::I8 => TypeKey::of::<i8>(),
            PrimitiveKind::I16 => TypeKey::of::<i16>(),
            PrimitiveKind::I32 => TypeKey::of::<i32>(),
            PrimitiveKind::I64 => TypeKey::of::<i64>(),
            PrimitiveKind::Isize => TypeKey::of::<isize>(),
            PrimitiveKind::U8 => TypeKey::of::<u8>(),
            PrimitiveKind::U16 => TypeKey::of::<u16>(),
            PrimitiveKind::U32 => TypeKey::of::<u32>(),
            PrimitiveKind::U64 => TypeKey::of::<u64>(),
            PrimitiveKind::Usize => TypeKey::of::<usize>(),
            PrimitiveKind::F32 => TypeKey::of::<f32>(),
            PrimitiveKind::F64 => TypeKey::of::<f64>(),
            PrimitiveKind::Char => TypeKey::of::<char>(),
            PrimitiveKind::String => TypeKey::of::<String>(),
            PrimitiveKind::Timestamp => TypeKey::of::<DateTime<Utc>>(),
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            PrimitiveKind::I8
                | PrimitiveKind::I16
                | PrimitiveKind::I32
                | PrimitiveKind::I64
                | PrimitiveKind::Isize
                | PrimitiveKind::U8
                | PrimitiveKind::U16
                | PrimitiveKind::U32
                | PrimitiveKind::U64
                | PrimitiveKind::Usize
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, PrimitiveKind::F32 | PrimitiveKind::F64)
    }

    pub fn zero_value(self) -> Value {
        match self {
            PrimitiveKind::Bool => Value::Bool(false),
            PrimitiveKind::I8 => Value::I8(0),
            PrimitiveKind::I16 => Value::I16(0),
            PrimitiveKind::I32 => Value::I32(0),
            PrimitiveKind::I64 => Value::I64(0),
            PrimitiveKind::Isize => Value::Isize(0),
            PrimitiveKind::U8 => Value::U8(0),
            PrimitiveKind::U16 => Value::U16(0),
            PrimitiveKind::U32 => Value::U32(0),
            PrimitiveKind::U64 => Value::U64(0),
            PrimitiveKind::Usize => Value::Usize(0),
            PrimitiveKind::F32 => Value::F32(0.0),
            PrimitiveKind::F64 => Value::F64(0.0),
            PrimitiveKind::Char => Value::Char('\0'),
            PrimitiveKind::String => Value::String(String::new()),
            PrimitiveKind::Timestamp => Value::Timestamp(DateTime::<Utc>::default()),
        }
    }
}

/// Runtime type descriptor: the closed set of value shapes the engine
/// dispatches on.
#[derive(Debug, Clone)]
pub enum Shape {
    Primitive(PrimitiveKind),
    /// Nullable indirection (`Option<T>`).
    Pointer { key: TypeKey, elem: ShapeFn },
    Struct(StructShape),
    /// Growable sequence (`Vec<T>`).
    Sequence { key: TypeKey, elem: ShapeFn },
}

impl Shape {
    pub fn key(&self) -> TypeKey {
        match self {
            Shape::Primitive(kind) => kind.key(),
            Shape::Pointer { key, .. } | Shape::Sequence { key, .. } => *key,
            Shape::Struct(s) => s.key,
        }
    }

    pub fn name(&self) -> String {
        self.key().name()
    }

    pub fn zero_value(&self) -> Value {
        match self {
            Shape::Primitive(kind) => kind.zero_value(),
            Shape::Pointer { key, elem } => Value::Pointer(PointerValue::nil(*key, *elem)),
            Shape::Struct(s) => Value::Struct(s.zero_value()),
            Shape::Sequence { key, elem } => Value::Sequence(SequenceValue::new(*key, *elem, Vec::new())),
        }
    }

    /// The struct behind this shape, looking through one pointer level.
    pub fn deref_struct(&self) -> Option<StructShape> {
        match self {
            Shape::Struct(s) => Some(s.clone()),
            Shape::Pointer { elem, .. } => match elem() {
                Shape::Struct(s) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }

    /// Shape of the field addressed by `path`, or `None` if some segment
    /// does not name a field.
    pub fn resolve_path(&self, path: &FieldPath) -> Option<Shape> {
        let mut current = self.clone();
        for segment in path.segments() {
            let strukt = current.deref_struct()?;
            current = strukt.field_map().remove(segment.as_str())?.shape;
        }
        Some(current)
    }
}

/// A declared struct field.
#[derive(Debug, Clone)]
pub struct FieldShape {
    pub name: &'static str,
    /// Anonymous field whose own fields are promoted into the parent.
    pub embedded: bool,
    pub shape: ShapeFn,
}

impl FieldShape {
    pub fn new(name: &'static str, embedded: bool, shape: ShapeFn) -> Self {
        Self { name, embedded, shape }
    }
}

#[derive(Debug, Clone)]
pub struct StructShape {
    pub key: TypeKey,
    pub fields: Vec<FieldShape>,
}

/// One entry of a flattened field list.
#[derive(Debug, Clone)]
pub struct FlatField {
    pub name: &'static str,
    /// Field indices from the outer struct down to this field.
    pub path: Vec<usize>,
    pub shape: Shape,
}

impl StructShape {
    pub fn new(key: TypeKey, fields: Vec<FieldShape>) -> Self {
        Self { key, fields }
    }

    pub fn zero_value(&self) -> StructValue {
        let fields = self
            .fields
            .iter()
            .map(|f| FieldValue::new(f.name, f.embedded, (f.shape)().zero_value()))
            .collect();
        StructValue::new(self.key, fields)
    }

    /// Declared fields in order, embedded structs expanded in place.
    pub fn flatten(&self) -> Vec<FlatField> {
        let mut out = Vec::with_capacity(self.fields.len());
        self.flatten_into(&mut Vec::new(), &mut out);
        out
    }

    fn flatten_into(&self, prefix: &mut Vec<usize>, out: &mut Vec<FlatField>) {
        for (i, field) in self.fields.iter().enumerate() {
            prefix.push(i);
            let shape = (field.shape)();
            match field.embedded.then(|| shape.deref_struct()).flatten() {
                Some(inner) => inner.flatten_into(prefix, out),
                None => out.push(FlatField {
                    name: field.name,
                    path: prefix.clone(),
                    shape,
                }),
            }
            prefix.pop();
        }
    }

    /// Flattened fields by name. On a name collision the field that comes
    /// later in the flattened order wins.
    pub fn field_map(&self) -> HashMap<&'static str, FlatField> {
        self.flatten().into_iter().map(|f| (f.name, f)).collect()
    }
}
