use std::fmt;
use std::sync::Arc;

use crate::error::ConvertError;
use crate::mappable::Mappable;
use crate::shape::{Shape, TypeKey};
use crate::value::Value;

/// Converts a value of one type into another.
///
/// Generic conversion always runs when no converter matches; a converter
/// takes over one specific (origin, target) type pair.
pub trait ValueConverter: Send + Sync {
    fn convert(&self, value: Value, target: &Shape) -> Result<Value, ConvertError>;
}

impl<F> ValueConverter for F
where
    F: Fn(Value, &Shape) -> Result<Value, ConvertError> + Send + Sync,
{
    fn convert(&self, value: Value, target: &Shape) -> Result<Value, ConvertError> {
        self(value, target)
    }
}

/// A registered conversion for an exact (origin, target) type pair.
#[derive(Clone)]
pub struct Converter {
    origin: TypeKey,
    target: TypeKey,
    func: Arc<dyn ValueConverter>,
}

impl Converter {
    pub fn new(origin: TypeKey, target: TypeKey, func: impl ValueConverter + 'static) -> Self {
        Self {
            origin,
            target,
            func: Arc::new(func),
        }
    }

    /// Converter between two Rust types working on dynamic values.
    pub fn between<A: Mappable, B: Mappable>(func: impl ValueConverter + 'static) -> Self {
        Self::new(TypeKey::of::<A>(), TypeKey::of::<B>(), func)
    }

    /// Converter from a typed function. The source value is rebuilt as `A`
    /// and the result reflected back from `B`.
    pub fn typed<A, B, E, F>(func: F) -> Self
    where
        A: Mappable,
        B: Mappable,
        E: Into<ConvertError>,
        F: Fn(A) -> Result<B, E> + Send + Sync + 'static,
    {
        Self::between::<A, B>(move |value: Value, _: &Shape| -> Result<Value, ConvertError> {
            let input = A::from_value(value)?;
            func(input).map(|out| out.to_value()).map_err(Into::into)
        })
    }

    pub fn origin(&self) -> TypeKey {
        self.origin
    }

    pub fn target(&self) -> TypeKey {
        self.target
    }

    pub fn matches(&self, origin: TypeKey, target: TypeKey) -> bool {
        self.origin == origin && self.target == target
    }

    pub fn convert(&self, value: Value, target: &Shape) -> Result<Value, ConvertError> {
        self.func.convert(value, target)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("origin", &self.origin)
            .field("target", &self.target)
            .finish()
    }
}
