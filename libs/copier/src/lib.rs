//! Field-by-field value mapping between structurally similar types.
//!
//! A [`Copier`] walks the source value, decides for every field where it
//! lands (same name, rename rules, dotted paths) and how its value is
//! produced at the destination type (registered converter, native
//! conversion, pointer indirection, struct or sequence recursion).
//!
//! ```ignore
//! use copier::{converters, Copier, Mappable, RenamePair};
//!
//! let copier = Copier::builder()
//!     .register_converter(converters::time_to_string())
//!     .register_rename_pairs([RenamePair::new("id", ["external_id"])])
//!     .register_transformer("external_id", |id: String| id.parse::<i64>().unwrap_or_default())
//!     .build()?;
//! copier.from(&order).to(&mut order_view)?;
//! ```

extern crate self as copier;

pub mod config;
pub mod converter;
pub mod converters;
pub mod engine;
pub mod error;
pub mod mappable;
pub mod path;
pub mod registry;
pub mod shape;
pub mod transform;
pub mod value;

pub use copier_derive::Mappable;

pub use crate::config::{CopierConfig, RenamePair, TypeErrorPolicy};
pub use crate::converter::{Converter, ValueConverter};
pub use crate::engine::{CopyCall, Copier};
pub use crate::error::{ConvertError, CopyError};
pub use crate::mappable::Mappable;
pub use crate::path::FieldPath;
pub use crate::registry::{CopierBuilder, Registry};
pub use crate::shape::{FieldShape, PrimitiveKind, Shape, StructShape, TypeKey};
pub use crate::transform::Transformer;
pub use crate::value::{FieldValue, PointerValue, SequenceValue, StructValue, Value};
