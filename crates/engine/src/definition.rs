//! Definitions: key patterns that claim ownership of matching keys.
//!
//! A definition's pattern is a sequence of components, each a literal to
//! match exactly or a named parameter that captures the key component as an
//! initial property when a record is first created. Definitions are matched
//! in registration order, first match wins; keys matched by no explicit
//! definition fall under the implicit default definition (empty pattern,
//! matches everything).

use crate::projection::ProjectionRule;
use crate::reducer::Reducer;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;
use ordex_core::{Key, PropertyMap};

/// Handle to a definition in the indexer arena. Id 0 is the implicit
/// default definition.
pub type DefinitionId = usize;

/// The implicit default definition owning all otherwise-unmatched keys.
pub const DEFAULT_DEFINITION: DefinitionId = 0;

/// One component of a definition pattern.
pub enum PatternPart {
    /// Matches a key component equal to the literal.
    Literal(Key),
    /// Matches any component, capturing it as an initial property.
    Param(String),
}

/// Lifecycle notifications emitted by a definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// A record owned by this definition was created.
    Created,
    /// A record owned by this definition changed.
    Changed,
}

/// Listener for definition lifecycle notifications.
pub type LifecycleCallback = Box<dyn FnMut(Lifecycle, &Key)>;

/// A key-pattern template hosting reducers and projection rules.
pub struct Definition {
    pattern: Vec<PatternPart>,
    pub(crate) reducers: HashMap<String, Reducer>,
    pub(crate) rules: Vec<ProjectionRule>,
}

impl Definition {
    /// Creates a definition with the given pattern.
    pub(crate) fn new(pattern: Vec<PatternPart>) -> Self {
        Self {
            pattern,
            reducers: HashMap::new(),
            rules: Vec::new(),
        }
    }

    /// The implicit default definition.
    pub(crate) fn default_definition() -> Self {
        Self::new(Vec::new())
    }

    /// Returns true if the key matches this pattern: same component arity,
    /// every literal equal, parameters match anything. The empty pattern
    /// matches every key.
    pub fn matches(&self, key: &Key) -> bool {
        if self.pattern.is_empty() {
            return true;
        }
        let components = key.components();
        if components.len() != self.pattern.len() {
            return false;
        }
        self.pattern
            .iter()
            .zip(components.iter())
            .all(|(part, component)| match part {
                PatternPart::Literal(lit) => lit == component,
                PatternPart::Param(_) => true,
            })
    }

    /// Builds the initial properties for a new record: each parameter
    /// component captured under its name.
    pub(crate) fn initial_props(&self, key: &Key) -> PropertyMap {
        let mut props = PropertyMap::new();
        for (part, component) in self.pattern.iter().zip(key.components().iter()) {
            if let PatternPart::Param(name) = part {
                if let Some(value) = component.to_value() {
                    props.insert(name.clone(), value);
                }
            }
        }
        props
    }

    /// Returns true if the property is routed through a reducer.
    pub fn is_reduced(&self, property: &str) -> bool {
        self.reducers.contains_key(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use ordex_core::Value;

    fn foo_id_pattern() -> Vec<PatternPart> {
        vec![
            PatternPart::Literal(Key::text("foo")),
            PatternPart::Param(String::from("id")),
        ]
    }

    #[test]
    fn test_matches_literal_and_param() {
        let def = Definition::new(foo_id_pattern());
        assert!(def.matches(&Key::tuple(vec![Key::text("foo"), Key::number(1.0)])));
        assert!(def.matches(&Key::tuple(vec![Key::text("foo"), Key::text("x")])));
        assert!(!def.matches(&Key::tuple(vec![Key::text("bar"), Key::number(1.0)])));
        // arity must agree
        assert!(!def.matches(&Key::tuple(vec![
            Key::text("foo"),
            Key::number(1.0),
            Key::number(2.0)
        ])));
        assert!(!def.matches(&Key::text("foo")));
    }

    #[test]
    fn test_default_matches_everything() {
        let def = Definition::default_definition();
        assert!(def.matches(&Key::text("anything")));
        assert!(def.matches(&Key::tuple(vec![Key::number(1.0), Key::number(2.0)])));
    }

    #[test]
    fn test_scalar_key_matches_single_param() {
        let def = Definition::new(vec![PatternPart::Param(String::from("name"))]);
        assert!(def.matches(&Key::text("foo")));
        let props = def.initial_props(&Key::text("foo"));
        assert_eq!(props.get("name"), Some(&Value::text("foo")));
    }

    #[test]
    fn test_initial_props_capture_params() {
        let def = Definition::new(foo_id_pattern());
        let key = Key::tuple(vec![Key::text("foo"), Key::number(7.0)]);
        let props = def.initial_props(&key);
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("id"), Some(&Value::number(7.0)));
    }
}
