//! Layers: the spec directory populated from one Crate file.

use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::Arc;

use super::path::Path;
use super::prim_spec::PrimSpec;
use super::spec::{FieldEntry, Spec, SpecType, Specifier};
use super::token::TokenRegistry;
use crate::crate_file::{CrateFile, ReadOptions, Version};
use crate::util::{Error, Result};

/// Handle of a spec inside its [`Layer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecId(pub(crate) usize);

impl SpecId {
    /// The pseudo-root is always the first object of a layer.
    pub const PSEUDO_ROOT: SpecId = SpecId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Handling of specs that are neither prims nor the pseudo-root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CompositionPolicy {
    /// Keep them as plain [`Spec`] entries in the directory.
    #[default]
    Record,
    /// Fail with [`Error::Unsupported`].
    Strict,
}

/// Entry of a layer's directory.
#[derive(Clone, Debug)]
pub enum SpecObject {
    Prim(PrimSpec),
    /// Any other spec type, kept with its raw fields.
    Other(Spec),
}

impl SpecObject {
    pub fn spec(&self) -> &Spec {
        match self {
            Self::Prim(prim) => prim.spec(),
            Self::Other(spec) => spec,
        }
    }

    pub fn spec_type(&self) -> SpecType {
        self.spec().spec_type()
    }

    pub fn path(&self) -> &Path {
        self.spec().path()
    }

    pub fn as_prim(&self) -> Option<&PrimSpec> {
        match self {
            Self::Prim(prim) => Some(prim),
            Self::Other(_) => None,
        }
    }
}

/// A decoded scene description: every spec keyed by its path, plus the
/// pseudo-root whose name children form the prim hierarchy.
///
/// Layers are built in one pass and are read-only afterwards.
pub struct Layer {
    registry: Arc<TokenRegistry>,
    version: Option<Version>,
    objects: Vec<SpecObject>,
    directory: HashMap<Path, SpecId>,
}

impl Layer {
    /// Empty layer holding only the pseudo-root.
    pub fn new(registry: Arc<TokenRegistry>) -> Self {
        let root = PrimSpec::pseudo_root(&registry);
        let mut directory = HashMap::new();
        directory.insert(root.path().clone(), SpecId::PSEUDO_ROOT);
        tracing::trace!("Add PseudoRoot: {}", root.path());
        Self {
            registry,
            version: None,
            objects: vec![SpecObject::Prim(root)],
            directory,
        }
    }

    /// Open and compose a Crate file with default options.
    pub fn open(path: impl AsRef<FsPath>) -> Result<Self> {
        Self::open_opts(path, &ReadOptions::default())
    }

    pub fn open_opts(path: impl AsRef<FsPath>, options: &ReadOptions) -> Result<Self> {
        let file = CrateFile::open_opts(path, options, TokenRegistry::shared())?;
        Self::from_crate(&file, options)
    }

    /// Decode and compose an in-memory Crate file with default options.
    ///
    /// Files older than version 0.4.0 are rejected with
    /// [`Error::UnsupportedVersion`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_opts(bytes, &ReadOptions::default())
    }

    pub fn from_bytes_opts(bytes: &[u8], options: &ReadOptions) -> Result<Self> {
        let file = CrateFile::read(bytes, options, TokenRegistry::shared())?;
        Self::from_crate(&file, options)
    }

    /// Compose a layer from decoded crate tables.
    ///
    /// Specs are composed in file order; a prim's parent must already be
    /// in the directory when the prim is reached.
    pub fn from_crate(file: &CrateFile, options: &ReadOptions) -> Result<Self> {
        let mut layer = Self::new(file.registry().clone());
        layer.version = Some(file.version());

        let mut recorded = 0usize;
        for record in file.specs() {
            let path = file.path(record.path_index)?.clone();
            let fields = file.field_set(record.field_set_index)?;
            tracing::trace!("{} {} ({} fields)", path, record.spec_type, fields.len());

            if path.is_absolute_root() {
                if !record.spec_type.is_prim_like() {
                    return Err(Error::invalid(format!(
                        "{} spec at the absolute root",
                        record.spec_type
                    )));
                }
                layer.pseudo_root_mut().spec_mut().set_fields(fields);
                continue;
            }

            match record.spec_type {
                SpecType::Prim => {
                    layer.add_prim(path, fields)?;
                }
                SpecType::PseudoRoot => {
                    return Err(Error::invalid(format!("pseudo-root spec at {}", path)));
                }
                other => match options.composition {
                    CompositionPolicy::Strict => {
                        return Err(Error::unsupported(format!(
                            "composition of {} spec at {}",
                            other, path
                        )));
                    }
                    CompositionPolicy::Record => {
                        tracing::debug!("Unhandled spec type: {} at {}", other, path);
                        let spec = Spec::new(path, other).with_fields(fields);
                        layer.insert(SpecObject::Other(spec))?;
                        recorded += 1;
                    }
                },
            }
        }

        if recorded > 0 {
            tracing::warn!("Recorded {} non-prim specs without composing them", recorded);
        }
        tracing::debug!("Composed layer with {} specs", layer.len());
        Ok(layer)
    }

    fn pseudo_root_mut(&mut self) -> &mut PrimSpec {
        match &mut self.objects[SpecId::PSEUDO_ROOT.0] {
            SpecObject::Prim(prim) => prim,
            SpecObject::Other(_) => unreachable!("object 0 is always the pseudo-root"),
        }
    }

    fn insert(&mut self, object: SpecObject) -> Result<SpecId> {
        let path = object.path().clone();
        if self.directory.contains_key(&path) {
            return Err(Error::invalid(format!("duplicate spec at {}", path)));
        }
        let id = SpecId(self.objects.len());
        self.objects.push(object);
        self.directory.insert(path, id);
        Ok(id)
    }

    fn add_prim(&mut self, path: Path, fields: Vec<FieldEntry>) -> Result<SpecId> {
        if !path.is_prim_path() {
            return Err(Error::invalid(format!("prim spec at non-prim path {}", path)));
        }
        let (Some(parent_path), Some(name)) = (path.parent(), path.name_token().cloned()) else {
            return Err(Error::MissingParent(path.to_string()));
        };

        let parent_id = *self
            .directory
            .get(&parent_path)
            .ok_or_else(|| Error::MissingParent(path.to_string()))?;
        if !matches!(self.objects[parent_id.0], SpecObject::Prim(_)) {
            return Err(Error::invalid(format!(
                "parent {} of {} is not a prim",
                parent_path, path
            )));
        }
        tracing::trace!(
            "\"{}\" parent path: \"{}\", path count: {}",
            path,
            parent_path,
            self.directory.len()
        );

        let mut prim = PrimSpec::new(parent_id, path, name, Specifier::Def);
        prim.spec_mut().set_fields(fields);
        let id = self.insert(SpecObject::Prim(prim))?;

        if let SpecObject::Prim(parent) = &mut self.objects[parent_id.0] {
            parent.insert_name_child(id, None);
        }
        Ok(id)
    }

    pub fn registry(&self) -> &Arc<TokenRegistry> {
        &self.registry
    }

    /// Version of the file this layer was read from.
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    pub fn pseudo_root(&self) -> &PrimSpec {
        match &self.objects[SpecId::PSEUDO_ROOT.0] {
            SpecObject::Prim(prim) => prim,
            SpecObject::Other(_) => unreachable!("object 0 is always the pseudo-root"),
        }
    }

    pub fn has_spec(&self, path: impl AsRef<str>) -> bool {
        self.directory.contains_key(path.as_ref())
    }

    /// Type of the spec at `path`, [`SpecType::Unknown`] when absent.
    pub fn spec_type(&self, path: impl AsRef<str>) -> SpecType {
        self.object_at_path(path)
            .map_or(SpecType::Unknown, SpecObject::spec_type)
    }

    pub fn object_at_path(&self, path: impl AsRef<str>) -> Option<&SpecObject> {
        self.directory
            .get(path.as_ref())
            .and_then(|&id| self.object(id))
    }

    pub fn prim_at_path(&self, path: impl AsRef<str>) -> Option<&PrimSpec> {
        self.object_at_path(path).and_then(SpecObject::as_prim)
    }

    pub fn object(&self, id: SpecId) -> Option<&SpecObject> {
        self.objects.get(id.0)
    }

    pub fn prim(&self, id: SpecId) -> Option<&PrimSpec> {
        self.object(id).and_then(SpecObject::as_prim)
    }

    /// Child prims of `prim`, in file order.
    pub fn name_children<'a>(&'a self, prim: &'a PrimSpec) -> impl Iterator<Item = &'a PrimSpec> + 'a {
        prim.name_children().iter().filter_map(move |&id| self.prim(id))
    }

    pub fn name_parent(&self, prim: &PrimSpec) -> Option<&PrimSpec> {
        prim.name_parent().and_then(|id| self.prim(id))
    }

    /// Every prim in pre-order, starting with the pseudo-root.
    pub fn traverse(&self) -> impl Iterator<Item = &PrimSpec> + '_ {
        let mut stack = vec![SpecId::PSEUDO_ROOT];
        std::iter::from_fn(move || {
            let prim = self.prim(stack.pop()?)?;
            stack.extend(prim.name_children().iter().rev().copied());
            Some(prim)
        })
    }

    /// All specs, pseudo-root first, in composition order.
    pub fn objects(&self) -> &[SpecObject] {
        &self.objects
    }

    /// Number of specs, pseudo-root included.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when only the pseudo-root is present.
    pub fn is_empty(&self) -> bool {
        self.objects.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_with(paths: &[&str]) -> Result<Layer> {
        let mut layer = Layer::new(TokenRegistry::shared());
        for text in paths {
            let path = Path::parse(layer.registry(), text)?;
            layer.add_prim(path, Vec::new())?;
        }
        Ok(layer)
    }

    #[test]
    fn test_new_layer_has_pseudo_root() {
        let layer = Layer::new(TokenRegistry::shared());
        assert!(layer.is_empty());
        assert!(layer.has_spec("/"));
        assert_eq!(layer.spec_type("/"), SpecType::PseudoRoot);
        assert!(layer.pseudo_root().is_pseudo_root());
        assert_eq!(layer.spec_type("/Nope"), SpecType::Unknown);
        assert!(layer.object_at_path("/Nope").is_none());
    }

    #[test]
    fn test_add_prims_builds_hierarchy() {
        let layer = layer_with(&["/World", "/World/Mesh", "/World/Light", "/Looks"]).unwrap();
        assert_eq!(layer.len(), 5);
        assert_eq!(layer.spec_type("/World/Mesh"), SpecType::Prim);

        let root = layer.pseudo_root();
        let names: Vec<&str> = layer.name_children(root).map(PrimSpec::name).collect();
        assert_eq!(names, vec!["World", "Looks"]);

        let world = layer.prim_at_path("/World").unwrap();
        let names: Vec<&str> = layer.name_children(world).map(PrimSpec::name).collect();
        assert_eq!(names, vec!["Mesh", "Light"]);

        let mesh = layer.prim_at_path("/World/Mesh").unwrap();
        assert_eq!(layer.name_parent(mesh).unwrap().name(), "World");
        assert_eq!(mesh.specifier(), Specifier::Def);
    }

    #[test]
    fn test_missing_parent() {
        let err = layer_with(&["/World/Mesh"]).err().unwrap();
        assert!(matches!(err, Error::MissingParent(p) if p == "/World/Mesh"));
    }

    #[test]
    fn test_duplicate_prim() {
        assert!(matches!(
            layer_with(&["/A", "/A"]),
            Err(Error::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_traverse_pre_order() {
        let layer = layer_with(&["/A", "/A/B", "/A/B/C", "/D", "/A/E"]).unwrap();
        let order: Vec<&str> = layer.traverse().map(|p| p.path().as_str()).collect();
        assert_eq!(order, vec!["/", "/A", "/A/B", "/A/B/C", "/A/E", "/D"]);
    }

    #[test]
    fn test_lookup_by_path_value() {
        let layer = layer_with(&["/A"]).unwrap();
        let path = Path::parse(layer.registry(), "/A").unwrap();
        assert!(layer.has_spec(&path));
        assert!(layer.prim_at_path(&path).is_some());
        assert!(layer.has_spec(String::from("/A")));
    }

    #[test]
    fn test_property_prim_rejected() {
        let mut layer = Layer::new(TokenRegistry::shared());
        let path = Path::parse(layer.registry(), "/A.size").unwrap();
        assert!(layer.add_prim(path, Vec::new()).is_err());
    }
}
