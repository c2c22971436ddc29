use std::sync::Arc;

use crate::config::TypeErrorPolicy;
use crate::error::CopyError;
use crate::mappable::Mappable;
use crate::registry::{CopierBuilder, Registry};
use crate::shape::{PrimitiveKind, Shape, ShapeFn, StructShape, TypeKey};
use crate::value::{PointerValue, SequenceValue, StructValue, Value};

/// The mapping engine: a frozen registry plus the default policies.
///
/// Cheap to clone and safe to share between threads; every call works on
/// its own values and never keeps references to them.
#[derive(Debug, Clone)]
pub struct Copier {
    registry: Arc<Registry>,
    policy: TypeErrorPolicy,
    skip_zero_values: bool,
}

impl Default for Copier {
    fn default() -> Self {
        Self::new(TypeErrorPolicy::default())
    }
}

impl Copier {
    /// A copier with no converters, renames or transformers.
    pub fn new(policy: TypeErrorPolicy) -> Self {
        Self::with_registry(Registry::default(), policy, false)
    }

    pub fn builder() -> CopierBuilder {
        CopierBuilder::new()
    }

    pub(crate) fn with_registry(registry: Registry, policy: TypeErrorPolicy, skip_zero_values: bool) -> Self {
        Self {
            registry: Arc::new(registry),
            policy,
            skip_zero_values,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn policy(&self) -> TypeErrorPolicy {
        self.policy
    }

    /// Start a mapping call from `source`.
    pub fn from<'c, 's, S: Mappable>(&'c self, source: &'s S) -> CopyCall<'c, 's, S> {
        CopyCall {
            copier: self,
            source,
            policy: self.policy,
        }
    }

    /// Map `source` into `dest` with the copier's own policy.
    pub fn copy<S: Mappable, D: Mappable>(&self, source: &S, dest: &mut D) -> Result<(), CopyError> {
        self.from(source).to(dest)
    }

    /// Map a dynamic value onto `dest` (the current destination value) of
    /// shape `shape`, returning the new destination value.
    pub fn copy_value(&self, source: Value, dest: Value, shape: &Shape) -> Result<Value, CopyError> {
        self.session(self.policy).copy_root(source, dest, shape)
    }

    fn session(&self, policy: TypeErrorPolicy) -> Session<'_> {
        Session {
            registry: &self.registry,
            policy,
            skip_zero_values: self.skip_zero_values,
        }
    }
}

/// One pending mapping call. The policy can be overridden for this call only.
#[must_use = "a copy call does nothing until `to` is called"]
pub struct CopyCall<'c, 's, S> {
    copier: &'c Copier,
    source: &'s S,
    policy: TypeErrorPolicy,
}

impl<S: Mappable> CopyCall<'_, '_, S> {
    pub fn policy(mut self, policy: TypeErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run the mapping into `dest`.
    ///
    /// `dest` is only written when the whole mapping succeeded; on error it
    /// keeps its previous value. Fields left out of reflection
    /// (`#[copier(skip)]`) are never touched.
    pub fn to<D: Mappable>(self, dest: &mut D) -> Result<(), CopyError> {
        let shape = D::shape();
        let source = self.source.to_value();
        tracing::trace!(from = %source.type_name(), to = %shape.name(), "copy");
        let value = self
            .copier
            .session(self.policy)
            .copy_root(source, dest.to_value(), &shape)?;
        dest.assign(value)
    }
}

/// Where a struct sits in the call: the root record, or reached through a
/// field of another struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    Nested,
}

struct Session<'c> {
    registry: &'c Registry,
    policy: TypeErrorPolicy,
    skip_zero_values: bool,
}

impl Session<'_> {
    fn copy_root(&self, from: Value, to: Value, shape: &Shape) -> Result<Value, CopyError> {
        if let Value::Pointer(PointerValue { target: None, .. }) = &from {
            return Ok(shape.zero_value());
        }
        self.target_value(from, to, shape, Scope::Root)
    }

    /// Produce the destination value of shape `shape` from `from`, reusing
    /// `to` (the destination's current value) where parts are kept.
    fn target_value(&self, from: Value, to: Value, shape: &Shape, scope: Scope) -> Result<Value, CopyError> {
        let from_key = from.type_key();
        if let Some(converter) = self.registry.converter(from_key, shape.key()) {
            return match converter.convert(from, shape) {
                Ok(value) => Ok(value),
                Err(source) => self.type_error(
                    shape,
                    CopyError::Converter {
                        from: from_key.name(),
                        to: shape.name(),
                        source,
                    },
                ),
            };
        }
        if from_key == shape.key() {
            return Ok(from);
        }

        match (from, shape) {
            (from, Shape::Primitive(kind)) if from.kind().is_some() => match from.cast(*kind) {
                Some(value) => Ok(value),
                None => self.unconvertible(from_key, shape),
            },
            (Value::String(s), Shape::Sequence { key, elem }) if is_bytes(*elem) => {
                let items = s.into_bytes().into_iter().map(Value::U8).collect();
                Ok(Value::Sequence(SequenceValue::new(*key, *elem, items)))
            }
            (Value::Sequence(seq), Shape::Primitive(PrimitiveKind::String)) if is_bytes(seq.elem) => {
                let bytes: Vec<u8> = seq
                    .items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::U8(b) => Some(b),
                        _ => None,
                    })
                    .collect();
                Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            }

            (Value::Pointer(from), Shape::Pointer { key, elem }) => match from.target {
                None => Ok(Value::Pointer(PointerValue::nil(*key, *elem))),
                Some(inner) => self.wrap_pointer(*inner, to, *key, *elem, scope),
            },
            (Value::Pointer(from), _) => match from.target {
                None => Ok(shape.zero_value()),
                Some(inner) => self.target_value(*inner, to, shape, scope),
            },
            (from, Shape::Pointer { key, elem }) => self.wrap_pointer(from, to, *key, *elem, scope),

            (Value::Struct(from), Shape::Struct(strukt)) => {
                let to = match to {
                    Value::Struct(to) if to.key == strukt.key => to,
                    _ => strukt.zero_value(),
                };
                self.copy_struct(from, to, strukt, scope)
            }
            (Value::Sequence(from), Shape::Sequence { key, elem }) => self.copy_sequence(from, *key, *elem, scope),

            (from, _) => self.unconvertible(from.type_key(), shape),
        }
    }

    /// Convert into the pointee type and box the result in a fresh pointer.
    fn wrap_pointer(&self, from: Value, to: Value, key: TypeKey, elem: ShapeFn, scope: Scope) -> Result<Value, CopyError> {
        let elem_shape = elem();
        let to = match to {
            Value::Pointer(PointerValue { target: Some(current), .. }) => *current,
            _ => elem_shape.zero_value(),
        };
        let value = self.target_value(from, to, &elem_shape, scope)?;
        Ok(Value::Pointer(PointerValue::new(key, elem, value)))
    }

    fn copy_struct(&self, from: StructValue, mut to: StructValue, shape: &StructShape, scope: Scope) -> Result<Value, CopyError> {
        let run_paths = scope == Scope::Root && self.registry.has_multi_level_pairs();
        let root = run_paths.then(|| Value::Struct(from.clone()));
        let fields = shape.field_map();

        for (name, value) in from.flatten() {
            if self.skip_zero_values && value.is_zero() {
                tracing::trace!(field = name, "zero source value, skipping");
                continue;
            }
            for target in self.registry.target_names(name) {
                let Some(field) = fields.get(target) else {
                    tracing::trace!(field = name, to = target, "no destination field, skipping");
                    continue;
                };
                let slot = to.field_at_mut(&field.path).ok_or_else(|| {
                    CopyError::invalid_path(target, format!("not addressable in {}", shape.key))
                })?;
                let source = self.transform(target, value.clone())?;
                let current = std::mem::replace(slot, field.shape.zero_value());
                *slot = self.target_value(source, current, &field.shape, Scope::Nested)?;
            }
        }

        let mut to = Value::Struct(to);
        if let Some(root) = root {
            self.copy_paths(&root, &mut to, &Shape::Struct(shape.clone()))?;
        }
        Ok(to)
    }

    /// Dotted rename rules: copy path to path, independent of the field walk.
    fn copy_paths(&self, from: &Value, to: &mut Value, shape: &Shape) -> Result<(), CopyError> {
        for (origin, target) in self.registry.multi_level_pairs() {
            let source = origin.get(from)?;
            if self.skip_zero_values && source.as_ref().is_none_or(Value::is_zero) {
                continue;
            }
            let (slot, slot_shape) = target.get_mut(to, shape)?;
            tracing::trace!(from = %origin, to = %target, "copy field path");
            let value = match source {
                None => slot_shape.zero_value(),
                Some(value) => {
                    let value = self.transform(target.as_str(), value)?;
                    let current = std::mem::replace(slot, slot_shape.zero_value());
                    self.target_value(value, current, &slot_shape, Scope::Nested)?
                }
            };
            *slot = value;
        }
        Ok(())
    }

    fn copy_sequence(&self, from: SequenceValue, key: TypeKey, elem: ShapeFn, scope: Scope) -> Result<Value, CopyError> {
        let elem_shape = elem();
        let mut items = Vec::with_capacity(from.items.len());
        for (index, item) in from.items.into_iter().enumerate() {
            let value = self
                .target_value(item, elem_shape.zero_value(), &elem_shape, scope)
                .map_err(|e| CopyError::Element {
                    index,
                    source: Box::new(e),
                })?;
            items.push(value);
        }
        Ok(Value::Sequence(SequenceValue::new(key, elem, items)))
    }

    /// Apply the transformer registered for `field`, if any. The value is
    /// first brought to the transformer's argument type.
    fn transform(&self, field: &str, value: Value) -> Result<Value, CopyError> {
        let Some(transformer) = self.registry.transformer(field) else {
            return Ok(value);
        };
        let input = transformer.input_shape();
        let value = if value.type_key() == input.key() {
            value
        } else {
            self.target_value(value, input.zero_value(), &input, Scope::Nested)?
        };
        transformer.apply(field, value)
    }

    fn unconvertible(&self, from: TypeKey, shape: &Shape) -> Result<Value, CopyError> {
        self.type_error(
            shape,
            CopyError::Unconvertible {
                from: from.name(),
                to: shape.name(),
            },
        )
    }

    fn type_error(&self, shape: &Shape, err: CopyError) -> Result<Value, CopyError> {
        match self.policy {
            TypeErrorPolicy::Ignore => {
                tracing::debug!(error = %err, "ignoring type error, using zero value");
                Ok(shape.zero_value())
            }
            TypeErrorPolicy::Strict => Err(err),
        }
    }
}

fn is_bytes(elem: ShapeFn) -> bool {
    matches!(elem(), Shape::Primitive(PrimitiveKind::U8))
}
