//! Hierarchical scene paths.
//!
//! Paths are immutable and cheap to clone. They are only ever built by
//! appending to an existing path, starting from [`Path::absolute_root`]:
//!
//! ```text
//! /                   absolute root
//! /World              child (prim) element
//! /World/Mesh         child element
//! /World/Mesh.points  property element
//! ```
//!
//! Equality, ordering and hashing use the path text, so a directory keyed
//! by `Path` can be queried with a plain `&str`.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smallvec::SmallVec;

use super::token::{Token, TokenRegistry};
use crate::util::{Error, Result};

/// Separator between prim elements.
pub const CHILD_DELIMITER: char = '/';
/// Separator before a property element.
pub const PROPERTY_DELIMITER: char = '.';
/// Separator inside namespaced property names.
pub const NAMESPACE_DELIMITER: char = ':';

/// One segment of a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathElement {
    /// Prim (child) name, joined with `/`.
    Prim(Token),
    /// Property name, joined with `.`.
    Property(Token),
}

impl PathElement {
    pub fn token(&self) -> &Token {
        match self {
            Self::Prim(t) | Self::Property(t) => t,
        }
    }

    pub fn is_property(&self) -> bool {
        matches!(self, Self::Property(_))
    }
}

/// Immutable absolute path.
#[derive(Clone)]
pub struct Path {
    inner: Arc<PathData>,
}

struct PathData {
    text: String,
    elements: SmallVec<[PathElement; 8]>,
}

impl Path {
    /// The unique root path `/`.
    pub fn absolute_root() -> Self {
        Self {
            inner: Arc::new(PathData {
                text: CHILD_DELIMITER.to_string(),
                elements: SmallVec::new(),
            }),
        }
    }

    fn with_element(&self, element: PathElement) -> Self {
        let name = element.token().as_str();
        let mut text = String::with_capacity(self.inner.text.len() + 1 + name.len());
        text.push_str(&self.inner.text);
        match &element {
            PathElement::Prim(_) => {
                if !self.is_absolute_root() {
                    text.push(CHILD_DELIMITER);
                }
            }
            PathElement::Property(_) => text.push(PROPERTY_DELIMITER),
        }
        text.push_str(name);

        let mut elements = self.inner.elements.clone();
        elements.push(element);
        Self {
            inner: Arc::new(PathData { text, elements }),
        }
    }

    /// Append a prim element. Property paths cannot have children.
    pub fn append_child(&self, name: &Token) -> Result<Self> {
        if self.is_property_path() {
            return Err(Error::invalid(format!(
                "cannot append child '{}' to property path {}",
                name, self
            )));
        }
        if name.is_empty() {
            return Err(Error::invalid(format!("empty child name under {}", self)));
        }
        Ok(self.with_element(PathElement::Prim(name.clone())))
    }

    /// Append a property element to a prim path.
    pub fn append_property(&self, name: &Token) -> Result<Self> {
        if !self.is_prim_path() {
            return Err(Error::invalid(format!(
                "cannot append property '{}' to {}",
                name, self
            )));
        }
        if name.is_empty() {
            return Err(Error::invalid(format!("empty property name under {}", self)));
        }
        Ok(self.with_element(PathElement::Property(name.clone())))
    }

    /// Parent path, `None` for the absolute root.
    pub fn parent(&self) -> Option<Self> {
        let (last, rest) = self.inner.elements.split_last()?;
        if rest.is_empty() {
            return Some(Self::absolute_root());
        }
        let cut = self.inner.text.len() - last.token().as_str().len() - 1;
        Some(Self {
            inner: Arc::new(PathData {
                text: self.inner.text[..cut].to_string(),
                elements: rest.iter().cloned().collect(),
            }),
        })
    }

    /// Name of the last element, empty for the absolute root.
    pub fn name(&self) -> &str {
        self.name_token().map(Token::as_str).unwrap_or("")
    }

    pub fn name_token(&self) -> Option<&Token> {
        self.inner.elements.last().map(PathElement::token)
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.inner.elements
    }

    #[inline]
    pub fn path_element_count(&self) -> usize {
        self.inner.elements.len()
    }

    #[inline]
    pub fn is_absolute_root(&self) -> bool {
        self.inner.elements.is_empty()
    }

    /// True for `/a/b`-style paths (not the root, not a property).
    pub fn is_prim_path(&self) -> bool {
        matches!(self.inner.elements.last(), Some(PathElement::Prim(_)))
    }

    pub fn is_property_path(&self) -> bool {
        matches!(self.inner.elements.last(), Some(PathElement::Property(_)))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.inner.text
    }

    /// Parse an absolute prim or property path, interning its names.
    pub fn parse(registry: &TokenRegistry, text: &str) -> Result<Self> {
        let rest = text
            .strip_prefix(CHILD_DELIMITER)
            .ok_or_else(|| Error::invalid(format!("path '{}' is not absolute", text)))?;

        let mut path = Self::absolute_root();
        if rest.is_empty() {
            return Ok(path);
        }

        let components: Vec<&str> = rest.split(CHILD_DELIMITER).collect();
        let last = components.len() - 1;
        for (i, component) in components.iter().enumerate() {
            let (prim, property) = match component.split_once(PROPERTY_DELIMITER) {
                Some((prim, property)) if i == last => (prim, Some(property)),
                Some(_) => {
                    return Err(Error::invalid(format!(
                        "property element in the middle of '{}'",
                        text
                    )))
                }
                None => (*component, None),
            };

            if !is_valid_identifier(prim) {
                return Err(Error::invalid(format!("bad prim name '{}' in '{}'", prim, text)));
            }
            path = path.append_child(&registry.intern(prim))?;

            if let Some(property) = property {
                if !is_valid_namespaced_identifier(property) {
                    return Err(Error::invalid(format!(
                        "bad property name '{}' in '{}'",
                        property, text
                    )));
                }
                path = path.append_property(&registry.intern(property))?;
            }
        }
        Ok(path)
    }
}

/// Letters, digits and underscores, not starting with a digit.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Identifiers joined by `:`, e.g. `primvars:st`.
pub fn is_valid_namespaced_identifier(name: &str) -> bool {
    name.split(NAMESPACE_DELIMITER).all(is_valid_identifier)
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.as_str() == other.as_str()
    }
}

impl Eq for Path {}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must match `str` hashing for `Borrow<str>` lookups.
        self.as_str().hash(state);
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Borrow<str> for Path {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({})", self.as_str())
    }
}
