use std::collections::{HashMap, HashSet};

use crate::config::{CopierConfig, RenamePair, TypeErrorPolicy};
use crate::converter::Converter;
use crate::engine::Copier;
use crate::error::CopyError;
use crate::mappable::Mappable;
use crate::path::FieldPath;
use crate::shape::{Shape, TypeKey};
use crate::transform::Transformer;

/// Registered converters, rename rules and transformers.
///
/// Read-only once built: a [`Copier`] shares it between calls.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    converters: Vec<Converter>,
    /// Origin → targets, in registration order.
    renames: Vec<(FieldPath, Vec<FieldPath>)>,
    transformers: HashMap<String, Transformer>,
}

impl Registry {
    /// First converter registered for exactly this pair.
    pub fn converter(&self, origin: TypeKey, target: TypeKey) -> Option<&Converter> {
        self.converters.iter().find(|c| c.matches(origin, target))
    }

    /// Destination names for a source field: its rename targets, or the name
    /// itself when no rule applies.
    pub fn target_names<'a>(&'a self, origin: &'a str) -> Vec<&'a str> {
        match self.renames.iter().find(|(o, _)| o.as_str() == origin) {
            Some((_, targets)) if !targets.is_empty() => targets.iter().map(FieldPath::as_str).collect(),
            _ => vec![origin],
        }
    }

    pub fn transformer(&self, field: &str) -> Option<&Transformer> {
        self.transformers.get(field)
    }

    /// Rename pairs where either side is a dotted path. These are copied
    /// path-to-path after the field walk.
    pub fn multi_level_pairs(&self) -> impl Iterator<Item = (&FieldPath, &FieldPath)> {
        self.renames.iter().flat_map(|(origin, targets)| {
            targets
                .iter()
                .filter(move |target| origin.is_multi_level() || target.is_multi_level())
                .map(move |target| (origin, target))
        })
    }

    pub fn has_multi_level_pairs(&self) -> bool {
        self.multi_level_pairs().next().is_some()
    }

    pub fn converter_count(&self) -> usize {
        self.converters.len()
    }

    pub fn rename_count(&self) -> usize {
        self.renames.len()
    }

    pub fn transformer_count(&self) -> usize {
        self.transformers.len()
    }

    /// Check rule names against concrete source and destination shapes.
    ///
    /// Dotted paths must resolve from the root record (the struct behind any
    /// sequence or pointer layers). Plain names are applied at every struct
    /// level of the walk, so they only need to name a field somewhere in the
    /// shape tree.
    pub fn validate(&self, source: &Shape, dest: &Shape) -> Result<(), CopyError> {
        let source_fields = reachable_field_names(source);
        let dest_fields = reachable_field_names(dest);
        let source_root = record_shape(source);
        let dest_root = record_shape(dest);

        let check = |path: &FieldPath, root: &Shape, fields: &HashSet<&'static str>, side: &str| {
            let found = if path.is_multi_level() {
                root.resolve_path(path).is_some()
            } else {
                fields.contains(path.as_str())
            };
            if found {
                Ok(())
            } else {
                Err(CopyError::invalid_path(
                    path.as_str(),
                    format!("no such field in {side} type {}", root.name()),
                ))
            }
        };

        for (origin, targets) in &self.renames {
            check(origin, &source_root, &source_fields, "source")?;
            for target in targets {
                check(target, &dest_root, &dest_fields, "destination")?;
            }
        }
        for field in self.transformers.keys() {
            let path = FieldPath::parse(field)?;
            check(&path, &dest_root, &dest_fields, "destination").map_err(|e| e.with_context("transformer"))?;
        }
        Ok(())
    }
}

/// The struct a mapping call ultimately works on: sequences and pointers
/// peeled off.
fn record_shape(shape: &Shape) -> Shape {
    match shape {
        Shape::Pointer { elem, .. } | Shape::Sequence { elem, .. } => record_shape(&elem()),
        other => other.clone(),
    }
}

fn reachable_field_names(shape: &Shape) -> HashSet<&'static str> {
    let mut names = HashSet::new();
    let mut seen = HashSet::new();
    collect_field_names(shape, &mut seen, &mut names);
    names
}

fn collect_field_names(shape: &Shape, seen: &mut HashSet<TypeKey>, names: &mut HashSet<&'static str>) {
    if !seen.insert(shape.key()) {
        return;
    }
    match shape {
        Shape::Primitive(_) => {}
        Shape::Pointer { elem, .. } | Shape::Sequence { elem, .. } => collect_field_names(&elem(), seen, names),
        Shape::Struct(s) => {
            for field in s.flatten() {
                names.insert(field.name);
                collect_field_names(&field.shape, seen, names);
            }
        }
    }
}

/// Collects registrations, then freezes them into a [`Copier`].
///
/// Every method returns the builder for chaining. Names are checked when
/// [`build`](Self::build) runs, before any mapping call.
#[derive(Debug, Default)]
pub struct CopierBuilder {
    policy: TypeErrorPolicy,
    skip_zero_values: bool,
    converters: Vec<Converter>,
    renames: Vec<(String, Vec<String>)>,
    transformers: Vec<(String, Transformer)>,
}

impl CopierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(mut self, policy: TypeErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn ignore_type_errors(self, ignore: bool) -> Self {
        self.policy(TypeErrorPolicy::from_ignore(ignore))
    }

    /// Skip source values that are zero instead of copying them.
    pub fn skip_zero_values(mut self, skip: bool) -> Self {
        self.skip_zero_values = skip;
        self
    }

    pub fn register_converter(mut self, converter: Converter) -> Self {
        self.converters.push(converter);
        self
    }

    /// Registering an origin again replaces its targets.
    pub fn register_rename_pairs(mut self, pairs: impl IntoIterator<Item = RenamePair>) -> Self {
        for pair in pairs {
            if let Some(entry) = self.renames.iter_mut().find(|(origin, _)| *origin == pair.origin) {
                entry.1 = pair.targets;
            } else {
                self.renames.push((pair.origin, pair.targets));
            }
        }
        self
    }

    /// Transformer for a destination field, keyed by its name or, for
    /// dotted rename targets, by the full path.
    pub fn register_transformer<A, B, F>(mut self, field: impl Into<String>, func: F) -> Self
    where
        A: Mappable,
        B: Mappable,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        let field = field.into();
        let transformer = Transformer::new(func);
        if let Some(entry) = self.transformers.iter_mut().find(|(name, _)| *name == field) {
            entry.1 = transformer;
        } else {
            self.transformers.push((field, transformer));
        }
        self
    }

    /// Apply file-based settings: policy flags and rename pairs.
    pub fn configure(self, config: &CopierConfig) -> Self {
        self.policy(config.policy())
            .skip_zero_values(config.skip_zero_values)
            .register_rename_pairs(config.renames.iter().cloned())
    }

    /// Freeze the registrations. Fails on malformed field names.
    pub fn build(self) -> Result<Copier, CopyError> {
        let mut renames = Vec::with_capacity(self.renames.len());
        for (origin, targets) in self.renames {
            let origin_path = FieldPath::parse(&origin).map_err(|e| e.with_context("rename origin"))?;
            let targets = targets
                .iter()
                .map(|t| FieldPath::parse(t).map_err(|e| e.with_context(format!("rename target of '{origin}'"))))
                .collect::<Result<Vec<_>, _>>()?;
            renames.push((origin_path, targets));
        }

        let mut transformers = HashMap::with_capacity(self.transformers.len());
        for (field, transformer) in self.transformers {
            FieldPath::parse(&field).map_err(|e| e.with_context("transformer"))?;
            transformers.insert(field, transformer);
        }

        let registry = Registry {
            converters: self.converters,
            renames,
            transformers,
        };
        tracing::debug!(
            converters = registry.converter_count(),
            renames = registry.rename_count(),
            transformers = registry.transformer_count(),
            policy = ?self.policy,
            "copier built"
        );
        Ok(Copier::with_registry(registry, self.policy, self.skip_zero_values))
    }

    /// Like [`build`](Self::build), and also check every rule name against
    /// the source type `S` and the destination type `D`.
    pub fn build_for<S: Mappable, D: Mappable>(self) -> Result<Copier, CopyError> {
        let copier = self.build()?;
        copier.registry().validate(&S::shape(), &D::shape())?;
        Ok(copier)
    }
}
