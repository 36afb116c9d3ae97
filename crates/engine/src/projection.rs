//! Projection rules: deriving secondary records from primary ones.
//!
//! A rule computes a derived key from a source record's properties, either by
//! substituting named fields into a key template or by calling a key
//! function. The materialized value is the full property view or, when the
//! rule carries a field filter, the named subset. A filtered rule's value
//! only depends on the listed fields, so the engine skips the value refresh
//! when none of them changed; the derived key is recomputed every round
//! regardless, which means a filtered rule must not vary its key by a field
//! outside its own filter.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use ordex_core::{Key, PropertyMap};

/// One component of a derived key template.
pub enum TemplatePart {
    /// A literal component.
    Lit(Key),
    /// Substituted from the named source property (must be scalar).
    Field(String),
}

/// The outcome of a key rule for one source state.
pub struct Derived {
    /// The derived record's key.
    pub key: Key,
    /// Field filter for this round; `None` materializes the full view.
    pub fields: Option<Vec<String>>,
}

impl Derived {
    /// A derived key carrying the rule's own field filter.
    pub fn new(key: Key) -> Self {
        Self { key, fields: None }
    }

    /// A derived key with a per-round field filter override.
    pub fn with_fields(key: Key, fields: Vec<String>) -> Self {
        Self {
            key,
            fields: Some(fields),
        }
    }
}

/// How a rule computes its derived key.
pub enum KeySpec {
    /// A key template with literal and field-substituted components.
    Template(Vec<TemplatePart>),
    /// A function from source properties to a derived key; returning `None`
    /// produces nothing this round (retiring any live derived record).
    With(Box<dyn Fn(&PropertyMap) -> Option<Derived>>),
}

/// A projection rule registered on a definition.
pub struct ProjectionRule {
    pub(crate) spec: KeySpec,
    pub(crate) fields: Option<Vec<String>>,
}

impl ProjectionRule {
    pub(crate) fn new(spec: KeySpec, fields: Option<Vec<String>>) -> Self {
        Self { spec, fields }
    }

    /// Computes the derived key and effective field filter for the current
    /// source properties. A template naming a missing or non-scalar property
    /// produces nothing.
    pub(crate) fn derive(&self, props: &PropertyMap) -> Option<Derived> {
        match &self.spec {
            KeySpec::Template(parts) => {
                let mut components = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        TemplatePart::Lit(key) => components.push(key.clone()),
                        TemplatePart::Field(name) => {
                            components.push(Key::from_scalar(props.get(name)?)?)
                        }
                    }
                }
                Some(Derived {
                    key: Key::Tuple(components),
                    fields: self.fields.clone(),
                })
            }
            KeySpec::With(func) => {
                let mut derived = func(props)?;
                if derived.fields.is_none() {
                    derived.fields = self.fields.clone();
                }
                Some(derived)
            }
        }
    }
}

/// Materializes the value for a derived record: the full view, or the
/// filtered subset when a field filter applies.
pub(crate) fn materialize(props: &PropertyMap, fields: Option<&[String]>) -> PropertyMap {
    match fields {
        None => props.clone(),
        Some(fields) => fields
            .iter()
            .filter_map(|f| props.get(f).map(|v| (f.clone(), v.clone())))
            .collect(),
    }
}
