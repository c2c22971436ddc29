use std::fmt;

use crate::error::CopyError;
use crate::shape::Shape;
use crate::value::Value;

pub const SEPARATOR: char = '.';

/// A field name or a dotted multi-level path (`"order.customer.id"`).
///
/// Each segment names a field of the struct reached so far, looking through
/// one pointer level and through embedded fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, CopyError> {
        if raw.is_empty() {
            return Err(CopyError::invalid_path(raw, "empty field name"));
        }
        let segments: Vec<String> = raw.split(SEPARATOR).map(str::to_string).collect();
        if let Some(pos) = segments.iter().position(|s| s.trim().is_empty()) {
            return Err(CopyError::invalid_path(raw, format!("segment {pos} is empty")));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_multi_level(&self) -> bool {
        self.segments.len() > 1
    }

    /// Read the addressed value out of `root`.
    ///
    /// Returns `Ok(None)` when a nil pointer is met on the way: traversal
    /// stops there and the caller treats the source as absent.
    pub fn get(&self, root: &Value) -> Result<Option<Value>, CopyError> {
        let mut current = root;
        for segment in &self.segments {
            let strukt = match current {
                Value::Pointer(p) => match p.target.as_deref() {
                    None => return Ok(None),
                    Some(Value::Struct(s)) => s,
                    Some(other) => return Err(self.not_a_struct(segment, &other.type_name())),
                },
                Value::Struct(s) => s,
                other => return Err(self.not_a_struct(segment, &other.type_name())),
            };
            current = strukt.find(segment).ok_or_else(|| {
                CopyError::invalid_path(
                    self.raw.clone(),
                    format!("{} has no field '{segment}'", strukt.key),
                )
            })?;
        }
        Ok(Some(current.clone()))
    }

    /// Writable slot for the addressed field inside `root` (of shape
    /// `shape`), together with the field's shape. Nil pointers on the way
    /// are allocated with zero values.
    pub fn get_mut<'a>(&self, root: &'a mut Value, shape: &Shape) -> Result<(&'a mut Value, Shape), CopyError> {
        let mut current = root;
        let mut shape = shape.clone();
        for segment in &self.segments {
            let strukt_shape = shape
                .deref_struct()
                .ok_or_else(|| self.not_a_struct(segment, &shape.name()))?;
            let target = match current {
                Value::Pointer(p) => p.get_or_alloc(),
                other => other,
            };
            let Value::Struct(strukt) = target else {
                return Err(self.not_a_struct(segment, &shape.name()));
            };
            let field = strukt_shape.field_map().remove(segment.as_str()).ok_or_else(|| {
                CopyError::invalid_path(
                    self.raw.clone(),
                    format!("{} has no field '{segment}'", strukt_shape.key),
                )
            })?;
            current = strukt.field_at_mut(&field.path).ok_or_else(|| {
                CopyError::invalid_path(self.raw.clone(), format!("field '{segment}' is not addressable"))
            })?;
            shape = field.shape;
        }
        Ok((current, shape))
    }

    fn not_a_struct(&self, segment: &str, type_name: &str) -> CopyError {
        CopyError::invalid_path(
            self.raw.clone(),
            format!("cannot get field '{segment}' of {type_name}: not a struct or pointer to struct"),
        )
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_segments() {
        let path = FieldPath::parse("order.customer.id").unwrap();
        assert_eq!(path.segments(), ["order", "customer", "id"]);
        assert!(path.is_multi_level());
        assert!(!FieldPath::parse("id").unwrap().is_multi_level());
    }

    #[test]
    fn parse_rejects_empty_segments() {
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("a..b").is_err());
        assert!(FieldPath::parse(".a").is_err());
        assert!(FieldPath::parse("a.").is_err());
    }

    #[test]
    fn get_on_primitive_is_a_path_error() {
        let path = FieldPath::parse("a.b").unwrap();
        let err = path.get(&Value::I64(1)).unwrap_err();
        assert!(matches!(err, CopyError::InvalidPath { .. }));
        assert!(err.is_config());
    }
}
