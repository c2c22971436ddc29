use chrono::{DateTime, Utc};

use crate::shape::{PrimitiveKind, ShapeFn, TypeKey};

/// Dynamic value tree the engine copies through.
///
/// Strategy by shape:
/// - Primitives: one variant per kind, carries the Rust value itself.
/// - Pointer: nullable box plus the pointee shape (to allocate on write).
/// - Struct: ordered named fields, embedded fields kept nested.
/// - Sequence: items plus the element shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F32(f32),
    F64(f64),
    Char(char),
    String(String),
    Timestamp(DateTime<Utc>),

    Pointer(PointerValue),
    Struct(StructValue),
    Sequence(SequenceValue),
}

/// Intermediate for numeric casts: keeps float → int saturation of `as`.
#[derive(Clone, Copy)]
enum Num {
    Int(i128),
    Float(f64),
}

impl Value {
    pub fn kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            Value::Bool(_) => PrimitiveKind::Bool,
            Value::I8(_) => PrimitiveKind::I8,
            Value::I16(_) => PrimitiveKind::I16,
            Value::I32(_) => PrimitiveKind::I32,
            Value::I64(_) => PrimitiveKind::I64,
            Value::Isize(_) => PrimitiveKind::Isize,
            Value::U8(_) => PrimitiveKind::U8,
            Value::U16(_) => PrimitiveKind::U16,
            Value::U32(_) => PrimitiveKind::U32,
            Value::U64(_) => PrimitiveKind::U64,
            Value::Usize(_) => PrimitiveKind::Usize,
            Value::F32(_) => PrimitiveKind::F32,
            Value::F64(_) => PrimitiveKind::F64,
            Value::Char(_) => PrimitiveKind::Char,
            Value::String(_) => PrimitiveKind::String,
            Value::Timestamp(_) => PrimitiveKind::Timestamp,
            Value::Pointer(_) | Value::Struct(_) | Value::Sequence(_) => return None,
        })
    }

    pub fn type_key(&self) -> TypeKey {
        match self {
            Value::Pointer(p) => p.key,
            Value::Struct(s) => s.key,
            Value::Sequence(s) => s.key,
            _ => self.kind().map_or_else(TypeKey::of::<()>, PrimitiveKind::key),
        }
    }

    pub fn type_name(&self) -> String {
        self.type_key().name()
    }

    /// Zero value check: 0, false, empty string, epoch, nil, empty
    /// sequence, or a struct whose fields are all zero.
    ///
    /// A real `1970-01-01T00:00:00Z` timestamp counts as zero too, so
    /// `skip_zero_values` never copies it.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Bool(v) => !v,
            Value::I8(v) => *v == 0,
            Value::I16(v) => *v == 0,
            Value::I32(v) => *v == 0,
            Value::I64(v) => *v == 0,
            Value::Isize(v) => *v == 0,
            Value::U8(v) => *v == 0,
            Value::U16(v) => *v == 0,
            Value::U32(v) => *v == 0,
            Value::U64(v) => *v == 0,
            Value::Usize(v) => *v == 0,
            Value::F32(v) => *v == 0.0,
            Value::F64(v) => *v == 0.0,
            Value::Char(v) => *v == '\0',
            Value::String(v) => v.is_empty(),
            Value::Timestamp(v) => *v == DateTime::<Utc>::default(),
            Value::Pointer(p) => p.target.is_none(),
            Value::Struct(s) => s.fields.iter().all(|f| f.value.is_zero()),
            Value::Sequence(s) => s.items.is_empty(),
        }
    }

    fn as_num(&self) -> Option<Num> {
        Some(match *self {
            Value::I8(v) => Num::Int(v as i128),
            Value::I16(v) => Num::Int(v as i128),
            Value::I32(v) => Num::Int(v as i128),
            Value::I64(v) => Num::Int(v as i128),
            Value::Isize(v) => Num::Int(v as i128),
            Value::U8(v) => Num::Int(v as i128),
            Value::U16(v) => Num::Int(v as i128),
            Value::U32(v) => Num::Int(v as i128),
            Value::U64(v) => Num::Int(v as i128),
            Value::Usize(v) => Num::Int(v as i128),
            Value::Char(v) => Num::Int(v as u32 as i128),
            Value::F32(v) => Num::Float(v as f64),
            Value::F64(v) => Num::Float(v),
            _ => return None,
        })
    }

    /// Native representation change between primitive kinds.
    ///
    /// Identical kinds pass through. Numbers convert with `as` semantics
    /// (wrapping between integers, saturating from floats). Chars convert to
    /// integers and back when the code point is valid. Everything else
    /// returns `None`.
    pub fn cast(self, target: PrimitiveKind) -> Option<Value> {
        if self.kind()? == target {
            return Some(self);
        }
        if !target.is_numeric() && target != PrimitiveKind::Char {
            return None;
        }
        let num = self.as_num()?;
        macro_rules! cast_to {
            ($variant:ident, $ty:ty) => {
                Value::$variant(match num {
                    Num::Int(v) => v as $ty,
                    Num::Float(v) => v as $ty,
                })
            };
        }
        Some(match target {
            PrimitiveKind::I8 => cast_to!(I8, i8),
            PrimitiveKind::I16 => cast_to!(I16, i16),
            PrimitiveKind::I32 => cast_to!(I32, i32),
            PrimitiveKind::I64 => cast_to!(I64, i64),
            PrimitiveKind::Isize => cast_to!(Isize, isize),
            PrimitiveKind::U8 => cast_to!(U8, u8),
            PrimitiveKind::U16 => cast_to!(U16, u16),
            PrimitiveKind::U32 => cast_to!(U32, u32),
            PrimitiveKind::U64 => cast_to!(U64, u64),
            PrimitiveKind::Usize => cast_to!(Usize, usize),
            PrimitiveKind::F32 => cast_to!(F32, f32),
            PrimitiveKind::F64 => cast_to!(F64, f64),
            PrimitiveKind::Char => match num {
                Num::Int(v) => Value::Char(char::from_u32(u32::try_from(v).ok()?)?),
                Num::Float(_) => return None,
            },
            _ => return None,
        })
    }
}

/// Nullable indirection.
#[derive(Debug, Clone)]
pub struct PointerValue {
    pub key: TypeKey,
    pub elem: ShapeFn,
    pub target: Option<Box<Value>>,
}

impl PointerValue {
    pub fn nil(key: TypeKey, elem: ShapeFn) -> Self {
        Self { key, elem, target: None }
    }

    pub fn new(key: TypeKey, elem: ShapeFn, value: Value) -> Self {
        Self {
            key,
            elem,
            target: Some(Box::new(value)),
        }
    }

    /// Pointee, allocating a zero value first if the pointer is nil.
    pub fn get_or_alloc(&mut self) -> &mut Value {
        let elem = self.elem;
        self.target.get_or_insert_with(|| Box::new(elem().zero_value()))
    }
}

impl PartialEq for PointerValue {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.target == other.target
    }
}

#[derive(Debug, Clone)]
pub struct SequenceValue {
    pub key: TypeKey,
    pub elem: ShapeFn,
    pub items: Vec<Value>,
}

impl SequenceValue {
    pub fn new(key: TypeKey, elem: ShapeFn, items: Vec<Value>) -> Self {
        Self { key, elem, items }
    }
}

impl PartialEq for SequenceValue {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.items == other.items
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub name: &'static str,
    pub embedded: bool,
    pub value: Value,
}

impl FieldValue {
    pub fn new(name: &'static str, embedded: bool, value: Value) -> Self {
        Self { name, embedded, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    pub key: TypeKey,
    pub fields: Vec<FieldValue>,
}

impl StructValue {
    pub fn new(key: TypeKey, fields: Vec<FieldValue>) -> Self {
        Self { key, fields }
    }

    /// Remove a declared (not promoted) field by name.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(pos).value)
    }

    /// Field values in flattened order, embedded structs expanded in place.
    /// A nil embedded pointer contributes no fields.
    pub fn flatten(self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::with_capacity(self.fields.len());
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<(&'static str, Value)>) {
        for field in self.fields {
            match (field.embedded, field.value) {
                (true, Value::Struct(inner)) => inner.flatten_into(out),
                (true, Value::Pointer(PointerValue { key, elem, target: Some(inner) })) => match *inner {
                    Value::Struct(inner) => inner.flatten_into(out),
                    other => out.push((field.name, Value::Pointer(PointerValue::new(key, elem, other)))),
                },
                (true, Value::Pointer(PointerValue { target: None, .. })) => {}
                (_, value) => out.push((field.name, value)),
            }
        }
    }

    /// Flattened field by name, following the same last-wins rule as
    /// [`StructShape::field_map`](crate::shape::StructShape::field_map).
    pub fn find(&self, name: &str) -> Option<&Value> {
        let mut found = None;
        for field in &self.fields {
            match (field.embedded, &field.value) {
                (true, Value::Struct(inner)) => {
                    if let Some(v) = inner.find(name) {
                        found = Some(v);
                    }
                }
                (true, Value::Pointer(p)) => match p.target.as_deref() {
                    Some(Value::Struct(inner)) => {
                        if let Some(v) = inner.find(name) {
                            found = Some(v);
                        }
                    }
                    Some(_) if field.name == name => found = Some(&field.value),
                    _ => {}
                },
                _ if field.name == name => found = Some(&field.value),
                _ => {}
            }
        }
        found
    }

    /// Field at a flattened index path (see [`StructShape::flatten`](crate::shape::StructShape::flatten)),
    /// allocating nil embedded pointers on the way down.
    pub fn field_at_mut(&mut self, path: &[usize]) -> Option<&mut Value> {
        let (first, rest) = path.split_first()?;
        let value = &mut self.fields.get_mut(*first)?.value;
        if rest.is_empty() {
            return Some(value);
        }
        let inner = match value {
            Value::Pointer(p) => p.get_or_alloc(),
            other => other,
        };
        match inner {
            Value::Struct(s) => s.field_at_mut(rest),
            _ => None,
        }
    }
}
