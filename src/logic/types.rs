//! Type hierarchy for variables and placeholders.
//!
//! Types form a forest: each type has at most one parent, and a variable of
//! type `k` (key) may fill a placeholder of type `o` (object) when `k` is a
//! subtype of `o`. Types that were never declared only match themselves.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{LogicError, LogicResult};

use super::variable::{Mapping, Placeholder, Variable};

/// A declared set of types with single-parent inheritance plus the constants
/// (pre-bound variables such as the player `P` and the inventory `I`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeHierarchy {
    /// Parent of each declared type (`None` for roots).
    parents: BTreeMap<String, Option<String>>,
    /// Types in declaration order.
    order: Vec<String>,
    /// Names of constant types; each has exactly one variable of the same name.
    constants: Vec<String>,
}

impl TypeHierarchy {
    /// Create an empty hierarchy: every type only matches itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a type, optionally below an already-declared parent.
    pub fn add_type(&mut self, name: &str, parent: Option<&str>) -> LogicResult<()> {
        if self.parents.contains_key(name) {
            return Err(LogicError::DuplicateType {
                name: name.to_string(),
            });
        }
        if let Some(parent) = parent {
            if !self.parents.contains_key(parent) {
                return Err(LogicError::UnknownType {
                    name: parent.to_string(),
                });
            }
        }
        self.parents
            .insert(name.to_string(), parent.map(str::to_string));
        self.order.push(name.to_string());
        Ok(())
    }

    /// Declare a type from its text form: `name` or `name: parent`.
    pub fn declare(&mut self, declaration: &str) -> LogicResult<()> {
        let (name, parent) = match declaration.split_once(':') {
            Some((name, parent)) => (name.trim(), Some(parent.trim())),
            None => (declaration.trim(), None),
        };
        if name.is_empty() || parent.is_some_and(str::is_empty) {
            return Err(LogicError::TypeParse {
                text: declaration.to_string(),
            });
        }
        self.add_type(name, parent)
    }

    /// Mark a declared type as a constant.
    pub fn add_constant(&mut self, name: &str) -> LogicResult<()> {
        if !self.parents.contains_key(name) {
            return Err(LogicError::UnknownType {
                name: name.to_string(),
            });
        }
        if !self.constants.iter().any(|c| c == name) {
            self.constants.push(name.to_string());
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parents.contains_key(name)
    }

    /// Declared types, in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn parent(&self, name: &str) -> Option<&str> {
        self.parents.get(name).and_then(|p| p.as_deref())
    }

    /// Whether `ty` is `of` or one of its descendants.
    pub fn is_subtype(&self, ty: &str, of: &str) -> bool {
        let mut current = Some(ty);
        while let Some(name) = current {
            if name == of {
                return true;
            }
            current = self.parent(name);
        }
        false
    }

    /// `ty` and every type below it. An undeclared type yields only itself.
    pub fn subtypes(&self, ty: &str) -> BTreeSet<String> {
        let mut result: BTreeSet<String> = self
            .order
            .iter()
            .filter(|name| self.is_subtype(name, ty))
            .cloned()
            .collect();
        result.insert(ty.to_string());
        result
    }

    pub fn constants(&self) -> impl Iterator<Item = &str> {
        self.constants.iter().map(String::as_str)
    }

    pub fn is_constant(&self, name: &str) -> bool {
        self.constants.iter().any(|c| c == name)
    }

    /// Placeholder-to-variable bindings of every constant (`P -> P`, `I -> I`).
    pub fn constants_mapping(&self) -> Mapping {
        self.constants
            .iter()
            .map(|c| (Placeholder::new(c, c), Variable::new(c, c)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy() -> TypeHierarchy {
        let mut types = TypeHierarchy::new();
        for decl in ["P", "I", "t", "r", "c: t", "o: t", "k: o", "oven: c"] {
            types.declare(decl).unwrap();
        }
        types.add_constant("P").unwrap();
        types.add_constant("I").unwrap();
        types
    }

    #[test]
    fn subtype_walks_parents() {
        let types = hierarchy();
        assert!(types.is_subtype("k", "o"));
        assert!(types.is_subtype("k", "t"));
        assert!(types.is_subtype("o", "o"));
        assert!(!types.is_subtype("o", "k"));
        assert!(!types.is_subtype("r", "t"));
    }

    #[test]
    fn subtypes_include_self_and_descendants() {
        let types = hierarchy();
        let below_t: Vec<_> = types.subtypes("t").into_iter().collect();
        assert_eq!(below_t, vec!["c", "k", "o", "oven", "t"]);
        let unknown: Vec<_> = types.subtypes("foo").into_iter().collect();
        assert_eq!(unknown, vec!["foo"]);
    }

    #[test]
    fn duplicate_and_unknown_parent_are_rejected() {
        let mut types = hierarchy();
        assert!(matches!(
            types.declare("k: o"),
            Err(LogicError::DuplicateType { .. })
        ));
        assert!(matches!(
            types.declare("x: nothing"),
            Err(LogicError::UnknownType { .. })
        ));
        assert!(matches!(types.declare("x:"), Err(LogicError::TypeParse { .. })));
    }

    #[test]
    fn constants_mapping_binds_constants_to_themselves() {
        let mapping = hierarchy().constants_mapping();
        assert_eq!(mapping.len(), 2);
        assert_eq!(
            mapping.get(&Placeholder::new("P", "P")),
            Some(&Variable::new("P", "P"))
        );
    }
}
