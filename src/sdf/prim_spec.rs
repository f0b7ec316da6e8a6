//! Prim specs: the named containers that form a layer's hierarchy.

use super::layer::SpecId;
use super::path::Path;
use super::spec::{Spec, SpecType, Specifier};
use super::token::{Token, TokenRegistry};

/// Name the pseudo-root reports.
pub const PSEUDO_ROOT_NAME: &str = "/";

/// A prim description in a [`Layer`](super::Layer).
///
/// Parent and children are ids into the owning layer; a prim spec is only
/// meaningful together with the layer that created it.
#[derive(Clone, Debug)]
pub struct PrimSpec {
    spec: Spec,
    name: Token,
    specifier: Specifier,
    name_parent: Option<SpecId>,
    name_children: Vec<SpecId>,
}

impl PrimSpec {
    /// The pseudo-root at `/`, its own name root.
    pub(crate) fn pseudo_root(registry: &TokenRegistry) -> Self {
        Self {
            spec: Spec::new(Path::absolute_root(), SpecType::PseudoRoot),
            name: registry.intern(PSEUDO_ROOT_NAME),
            specifier: Specifier::Def,
            name_parent: None,
            name_children: Vec::new(),
        }
    }

    /// A prim named after the last element of `path`.
    pub(crate) fn new(parent: SpecId, path: Path, name: Token, specifier: Specifier) -> Self {
        Self {
            spec: Spec::new(path, SpecType::Prim),
            name,
            specifier,
            name_parent: Some(parent),
            name_children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn name_token(&self) -> &Token {
        &self.name
    }

    pub fn specifier(&self) -> Specifier {
        self.specifier
    }

    pub fn path(&self) -> &Path {
        self.spec.path()
    }

    pub fn spec_type(&self) -> SpecType {
        self.spec.spec_type()
    }

    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    pub(crate) fn spec_mut(&mut self) -> &mut Spec {
        &mut self.spec
    }

    pub fn is_pseudo_root(&self) -> bool {
        self.spec.spec_type() == SpecType::PseudoRoot
    }

    /// Parent prim, `None` for the pseudo-root.
    pub fn name_parent(&self) -> Option<SpecId> {
        self.name_parent
    }

    /// Child prims in insertion order.
    pub fn name_children(&self) -> &[SpecId] {
        &self.name_children
    }

    /// Insert a child at `index`; `None` appends. Fails past the end.
    pub(crate) fn insert_name_child(&mut self, child: SpecId, index: Option<usize>) -> bool {
        let index = index.unwrap_or(self.name_children.len());
        if index > self.name_children.len() {
            return false;
        }
        self.name_children.insert(index, child);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pseudo_root() {
        let reg = TokenRegistry::new();
        let root = PrimSpec::pseudo_root(&reg);
        assert!(root.is_pseudo_root());
        assert_eq!(root.name(), "/");
        assert!(root.path().is_absolute_root());
        assert!(root.name_parent().is_none());
        assert!(root.name_children().is_empty());
    }

    #[test]
    fn test_insert_name_child() {
        let reg = TokenRegistry::new();
        let mut root = PrimSpec::pseudo_root(&reg);
        assert!(root.insert_name_child(SpecId(1), None));
        assert!(root.insert_name_child(SpecId(2), None));
        assert!(root.insert_name_child(SpecId(3), Some(0)));
        assert!(!root.insert_name_child(SpecId(4), Some(9)));
        assert_eq!(root.name_children(), &[SpecId(3), SpecId(1), SpecId(2)]);
    }

    #[test]
    fn test_new_prim() {
        let reg = TokenRegistry::new();
        let name = reg.intern("Mesh");
        let path = Path::absolute_root().append_child(&name).unwrap();
        let prim = PrimSpec::new(SpecId(0), path, name, Specifier::Over);
        assert_eq!(prim.name(), "Mesh");
        assert_eq!(prim.spec_type(), SpecType::Prim);
        assert_eq!(prim.specifier(), Specifier::Over);
        assert_eq!(prim.name_parent(), Some(SpecId(0)));
    }
}
