use std::fmt;
use std::sync::Arc;

use crate::error::CopyError;
use crate::mappable::Mappable;
use crate::shape::{Shape, ShapeFn, TypeKey};
use crate::value::Value;

type TransformFn = dyn Fn(Value) -> Result<Value, CopyError> + Send + Sync;

/// Per-destination-field function applied to the source value before it is
/// converted into the field's type.
///
/// Built from a typed one-argument closure, so the single input / single
/// output rule holds by construction.
#[derive(Clone)]
pub struct Transformer {
    input: ShapeFn,
    output: TypeKey,
    func: Arc<TransformFn>,
}

impl Transformer {
    pub fn new<A, B, F>(func: F) -> Self
    where
        A: Mappable,
        B: Mappable,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Self {
            input: A::shape,
            output: TypeKey::of::<B>(),
            func: Arc::new(move |value: Value| A::from_value(value).map(|a| func(a).to_value())),
        }
    }

    /// Shape of the argument the closure takes.
    pub fn input_shape(&self) -> Shape {
        (self.input)()
    }

    pub fn output(&self) -> TypeKey {
        self.output
    }

    /// Run the transformer on a value already shaped like its input.
    pub fn apply(&self, field: &str, value: Value) -> Result<Value, CopyError> {
        let found = value.type_name();
        (self.func)(value).map_err(|_| CopyError::Transformer {
            field: field.to_string(),
            reason: format!("expects {}, got {found}", self.input_shape().name()),
        })
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("input", &self.input_shape().key())
            .field("output", &self.output)
            .finish()
    }
}
