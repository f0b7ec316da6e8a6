//! Interned strings.
//!
//! A [`Token`] is an immutable string handed out by a [`TokenRegistry`].
//! Within one registry equal text always yields the same token, so
//! comparing tokens is a pointer comparison and hashing uses the id.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;

/// Interned string.
#[derive(Clone)]
pub struct Token {
    id: u32,
    text: Arc<str>,
}

impl Token {
    /// Registry-local id, dense from 0 in interning order.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.text, &other.text)
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Token {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}: {:?})", self.id, &*self.text)
    }
}

/// String interning table.
///
/// Lookups take a read lock; only the first sighting of a string takes the
/// write lock. Share one registry between concurrent decodes through an
/// `Arc<TokenRegistry>`.
#[derive(Default)]
pub struct TokenRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    ids: HashMap<Arc<str>, u32>,
    tokens: Vec<Token>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// New registry behind an `Arc`, ready to be shared.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Return the token for `text`, creating it on first sight.
    pub fn intern(&self, text: &str) -> Token {
        if let Some(token) = self.find(text) {
            return token;
        }

        let mut inner = self.inner.write();
        // Another writer may have won the race.
        if let Some(&id) = inner.ids.get(text) {
            return inner.tokens[id as usize].clone();
        }

        let id = inner.tokens.len() as u32;
        let text: Arc<str> = Arc::from(text);
        let token = Token {
            id,
            text: text.clone(),
        };
        inner.ids.insert(text, id);
        inner.tokens.push(token.clone());
        token
    }

    /// Existing token for `text`, without interning.
    pub fn find(&self, text: &str) -> Option<Token> {
        let inner = self.inner.read();
        inner
            .ids
            .get(text)
            .map(|&id| inner.tokens[id as usize].clone())
    }

    /// Token by registry id.
    pub fn get(&self, id: u32) -> Option<Token> {
        self.inner.read().tokens.get(id as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRegistry")
            .field("len", &self.len())
            .finish()
    }
}
