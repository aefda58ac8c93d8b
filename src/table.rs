use indexmap::IndexMap;
use tracing::debug;

use crate::ast::{Token, TokenSequence};
use crate::error::ResolveError;
use crate::parser::tokenize;

/// Key to raw value, in first-definition order
pub type RawMapping = IndexMap<String, String>;

/// Merge mappings into one; a later mapping overrides an earlier one's value
/// for the same key, while the key keeps its original position.
pub fn consolidate<I, M, K, V>(mappings: I) -> RawMapping
where
    I: IntoIterator<Item = M>,
    M: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut merged = RawMapping::new();
    for mapping in mappings {
        for (key, value) in mapping {
            merged.insert(key.into(), value.into());
        }
    }
    merged
}

/// Tokenized form of every consolidated key. Read-only once built.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TokenTable(IndexMap<String, TokenSequence<'static>>);

impl TokenTable {
    /// Consolidate raw mappings and tokenize every value
    pub fn build<I, M, K, V>(mappings: I) -> Result<Self, ResolveError>
    where
        I: IntoIterator<Item = M>,
        M: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::from_raw(consolidate(mappings))
    }

    /// Tokenize an already consolidated mapping
    pub fn from_raw(raw: RawMapping) -> Result<Self, ResolveError> {
        let mut table = IndexMap::with_capacity(raw.len());
        for (key, value) in raw {
            let parsed = tokenize(&value)
                .map(|tokens| tokens.into_iter().map(Token::into_owned).collect::<Vec<_>>());
            match parsed {
                Ok(tokens) => {
                    table.insert(key, tokens);
                }
                Err(source) => return Err(ResolveError::Parse { key, value, source }),
            }
        }
        debug!(keys = table.len(), "built token table");
        Ok(Self(table))
    }

    pub fn get(&self, key: &str) -> Option<&TokenSequence<'static>> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub(crate) fn entries(&self) -> &IndexMap<String, TokenSequence<'static>> {
        &self.0
    }
}
