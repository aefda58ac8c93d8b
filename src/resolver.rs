use std::borrow::Cow;

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::ast::{Token, TokenSequence};
use crate::error::ResolveError;
use crate::table::TokenTable;

/// Key to fully resolved value, in table order
pub type ResolvedMapping = IndexMap<String, String>;

/// What to do with a reference to the key whose value contains it, e.g. `a=x ${a}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfReferencePolicy {
    /// The reference expands to nothing: `a=x ${a}` resolves to `x`
    #[default]
    Drop,
    /// The reference is a one-key cycle
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    pub self_reference: SelfReferencePolicy,
    /// Longest chain of nested references followed from one key
    pub max_depth: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            self_reference: SelfReferencePolicy::default(),
            max_depth: 100,
        }
    }
}

impl ResolverOptions {
    pub fn with_self_reference(mut self, policy: SelfReferencePolicy) -> Self {
        self.self_reference = policy;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Outcome of resolving every key without stopping at the first failure
#[derive(Debug, Default)]
pub struct Resolution {
    /// Keys that resolved, in table order
    pub values: ResolvedMapping,
    /// One error per key that did not
    pub errors: Vec<ResolveError>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fail with the first error, if any
    pub fn into_result(self) -> Result<ResolvedMapping, ResolveError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.values),
        }
    }
}

/// Resolve `${key}` placeholders across the consolidated mappings.
///
/// Later mappings override earlier ones. Fails on the first key, in
/// consolidated order, that cannot be resolved.
pub fn resolve<I, M, K, V>(mappings: I) -> Result<ResolvedMapping, ResolveError>
where
    I: IntoIterator<Item = M>,
    M: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    Resolver::new(TokenTable::build(mappings)?).resolve_table()
}

/// Join resolved words with single spaces
pub fn render<S: AsRef<str>>(words: &[S]) -> String {
    let mut rendered = String::new();
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            rendered.push(' ');
        }
        rendered.push_str(word.as_ref());
    }
    rendered
}

/// Placeholder resolver over an immutable token table
#[derive(Debug, Clone)]
pub struct Resolver {
    table: TokenTable,
    options: ResolverOptions,
}

impl Resolver {
    pub fn new(table: TokenTable) -> Self {
        Self::with_options(table, ResolverOptions::default())
    }

    pub fn with_options(table: TokenTable, options: ResolverOptions) -> Self {
        Self { table, options }
    }

    /// Resolve every key, failing with the first error in table order
    pub fn resolve_table(&self) -> Result<ResolvedMapping, ResolveError> {
        let mut resolved = ResolvedMapping::with_capacity(self.table.len());
        for (key, result) in self.resolve_each() {
            resolved.insert(key.to_owned(), result?);
        }
        Ok(resolved)
    }

    /// Resolve every key, collecting failures instead of stopping
    pub fn resolve_partial(&self) -> Resolution {
        let mut resolution = Resolution::default();
        for (key, result) in self.resolve_each() {
            match result {
                Ok(value) => {
                    resolution.values.insert(key.to_owned(), value);
                }
                Err(err) => resolution.errors.push(err),
            }
        }
        resolution
    }

    /// Resolve and render a single key; `None` if the table has no such key
    pub fn resolve_key(&self, key: &str) -> Result<Option<String>, ResolveError> {
        let Some((key, tokens)) = self.table.entries().get_key_value(key) else {
            return Ok(None);
        };
        self.resolve_entry(key, tokens).map(Some)
    }

    /// Resolve a single key into its literal tokens
    pub fn resolve_tokens(&self, key: &str) -> Result<Option<TokenSequence<'_>>, ResolveError> {
        let Some((key, tokens)) = self.table.entries().get_key_value(key) else {
            return Ok(None);
        };
        let words = self.expand_entry(key, tokens)?;
        Ok(Some(
            words
                .into_iter()
                .map(|word| Token::Literal(Cow::Borrowed(word)))
                .collect(),
        ))
    }

    /// Keys are independent of each other, so they are resolved in parallel.
    /// Results come back in table order.
    fn resolve_each(&self) -> impl Iterator<Item = (&str, Result<String, ResolveError>)> {
        let results: Vec<_> = self
            .table
            .entries()
            .par_iter()
            .map(|(key, tokens)| self.resolve_entry(key, tokens))
            .collect();
        self.table.keys().zip(results)
    }

    fn resolve_entry(&self, key: &str, tokens: &[Token<'static>]) -> Result<String, ResolveError> {
        let words = self.expand_entry(key, tokens)?;
        debug!(key, words = words.len(), "resolved key");
        Ok(render(&words))
    }

    fn expand_entry<'s>(
        &'s self,
        key: &'s str,
        tokens: &'s [Token<'static>],
    ) -> Result<Vec<&'s str>, ResolveError> {
        let mut path = Vec::new();
        let mut words = Vec::with_capacity(tokens.len());
        self.expand(key, tokens, &mut path, &mut words)?;
        Ok(words)
    }

    /// Append the literal words of `key` to `out`.
    ///
    /// `path` holds the keys currently being expanded, outermost first;
    /// meeting one of them again is a cycle.
    fn expand<'s>(
        &'s self,
        key: &'s str,
        tokens: &'s [Token<'static>],
        path: &mut Vec<&'s str>,
        out: &mut Vec<&'s str>,
    ) -> Result<(), ResolveError> {
        let origin = path.first().copied().unwrap_or(key);
        if path.len() > self.options.max_depth {
            return Err(ResolveError::DepthExceeded {
                key: origin.to_owned(),
                limit: self.options.max_depth,
            });
        }

        path.push(key);
        for token in tokens {
            match token {
                Token::Literal(text) => out.push(text),
                Token::Reference(name) if name == key => match self.options.self_reference {
                    SelfReferencePolicy::Drop => {
                        warn!(key, "dropping self-reference");
                    }
                    SelfReferencePolicy::Error => {
                        return Err(ResolveError::CyclicReference {
                            key: origin.to_owned(),
                            cycle: vec![key.to_owned()],
                        });
                    }
                },
                Token::Reference(name) => {
                    let name: &str = name;
                    if let Some(start) = path.iter().position(|seen| *seen == name) {
                        return Err(ResolveError::CyclicReference {
                            key: origin.to_owned(),
                            cycle: path[start..].iter().map(|k| k.to_string()).collect(),
                        });
                    }

                    let Some((name, referenced)) = self.table.entries().get_key_value(name) else {
                        return Err(ResolveError::UndefinedReference {
                            requesting_key: origin.to_owned(),
                            missing_key: name.to_owned(),
                        });
                    };

                    trace!(key, reference = name.as_str(), "expanding reference");
                    self.expand(name, referenced, path, out)?;
                }
            }
        }
        path.pop();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolver(pairs: &[(&str, &str)]) -> Resolver {
        Resolver::new(TokenTable::build([pairs.iter().copied()]).unwrap())
    }

    fn strict(pairs: &[(&str, &str)]) -> Resolver {
        Resolver::with_options(
            TokenTable::build([pairs.iter().copied()]).unwrap(),
            ResolverOptions::default().with_self_reference(SelfReferencePolicy::Error),
        )
    }

    #[test]
    fn test_literal_values_unchanged() {
        let resolved = resolver(&[("a", "one two"), ("b", "three")])
            .resolve_table()
            .unwrap();
        assert_eq!(resolved.get("a").map(String::as_str), Some("one two"));
        assert_eq!(resolved.get("b").map(String::as_str), Some("three"));
    }

    #[test]
    fn test_whitespace_normalized() {
        let resolved = resolver(&[("a", "  one \t two  ")]).resolve_table().unwrap();
        assert_eq!(resolved["a"], "one two");
    }

    #[test]
    fn test_reference_spliced_in_place() {
        let resolved = resolver(&[("url", "http ${host} /api"), ("host", "example.com")])
            .resolve_table()
            .unwrap();
        assert_eq!(resolved["url"], "http example.com /api");
    }

    #[test]
    fn test_multi_word_referent() {
        let resolved = resolver(&[("greeting", "${name} says hi"), ("name", "Tom Hanks")])
            .resolve_table()
            .unwrap();
        assert_eq!(resolved["greeting"], "Tom Hanks says hi");
    }

    #[test]
    fn test_shared_referent_is_not_a_cycle() {
        let resolved = resolver(&[
            ("a", "${b} ${c}"),
            ("b", "${d}"),
            ("c", "${d}"),
            ("d", "x"),
        ])
        .resolve_table()
        .unwrap();
        assert_eq!(resolved["a"], "x x");
    }

    #[test]
    fn test_repeated_reference() {
        let resolved = resolver(&[("a", "${b} ${b}"), ("b", "y")])
            .resolve_table()
            .unwrap();
        assert_eq!(resolved["a"], "y y");
    }

    #[test]
    fn test_undefined_reference_names_requester() {
        let err = resolver(&[("a", "${b}")]).resolve_table().unwrap_err();
        match err {
            ResolveError::UndefinedReference {
                requesting_key,
                missing_key,
            } => {
                assert_eq!(requesting_key, "a");
                assert_eq!(missing_key, "b");
            }
            other => panic!("Expected UndefinedReference, got {other:?}"),
        }
    }

    #[test]
    fn test_undefined_reference_deep_in_chain_reports_top_level_key() {
        let err = resolver(&[("a", "${b}"), ("b", "${c}")])
            .resolve_table()
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UndefinedReference { ref requesting_key, ref missing_key }
                if requesting_key == "a" && missing_key == "c"
        ));
    }

    #[test]
    fn test_self_reference_dropped() {
        let resolved = resolver(&[("a", "x ${a} y")]).resolve_table().unwrap();
        assert_eq!(resolved["a"], "x y");
    }

    #[test]
    fn test_nested_self_reference_dropped() {
        let resolved = resolver(&[("a", "${b}"), ("b", "x ${b}")])
            .resolve_table()
            .unwrap();
        assert_eq!(resolved["a"], "x");
        assert_eq!(resolved["b"], "x");
    }

    #[test]
    fn test_self_reference_error_policy() {
        let err = strict(&[("a", "${a}")]).resolve_table().unwrap_err();
        assert!(matches!(
            err,
            ResolveError::CyclicReference { ref cycle, .. } if cycle == &["a"]
        ));
    }

    #[test]
    fn test_two_key_cycle() {
        let err = resolver(&[("a", "${b}"), ("b", "${a}")])
            .resolve_table()
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::CyclicReference { ref cycle, .. } if cycle == &["a", "b"]
        ));
    }

    #[test]
    fn test_cycle_not_through_requesting_key() {
        let err = resolver(&[("a", "${b}"), ("b", "${c}"), ("c", "${b}")])
            .resolve_table()
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::CyclicReference { ref cycle, .. } if cycle == &["b", "c"]
        ));
    }

    #[test]
    fn test_cycle_error_names_each_failing_key() {
        let resolution =
            resolver(&[("a", "${b}"), ("b", "${c}"), ("c", "${b}")]).resolve_partial();
        let keys: Vec<_> = resolution.errors.iter().map(ResolveError::key).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(
            resolution.errors[0].to_string(),
            "resolving `a`: cyclic reference b -> c -> b"
        );
    }

    #[test]
    fn test_depth_guard() {
        let table =
            TokenTable::build([[("a", "${b}"), ("b", "${c}"), ("c", "${d}"), ("d", "end")]])
                .unwrap();
        let shallow =
            Resolver::with_options(table.clone(), ResolverOptions::default().with_max_depth(2));
        let err = shallow.resolve_table().unwrap_err();
        assert!(matches!(
            err,
            ResolveError::DepthExceeded { ref key, limit: 2 } if key == "a"
        ));

        let deep = Resolver::with_options(table, ResolverOptions::default().with_max_depth(3));
        assert_eq!(deep.resolve_table().unwrap()["a"], "end");
    }

    #[test]
    fn test_empty_resolution_renders_empty_string() {
        let resolved = resolver(&[("a", ""), ("b", "${a}")]).resolve_table().unwrap();
        assert_eq!(resolved["a"], "");
        assert_eq!(resolved["b"], "");
    }

    #[test]
    fn test_output_keeps_table_order() {
        let resolved = resolver(&[("z", "1"), ("a", "${z}"), ("m", "2")])
            .resolve_table()
            .unwrap();
        assert_eq!(resolved.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_fail_fast_reports_first_key_in_order() {
        let err = resolver(&[("ok", "fine"), ("first", "${missing1}"), ("second", "${missing2}")])
            .resolve_table()
            .unwrap_err();
        assert_eq!(err.key(), "first");
    }

    #[test]
    fn test_partial_resolution_collects_errors() {
        let resolution = resolver(&[
            ("ok", "${base} /x"),
            ("base", "root"),
            ("bad", "${nowhere}"),
            ("loop", "${loop2}"),
            ("loop2", "${loop}"),
        ])
        .resolve_partial();

        assert!(!resolution.is_complete());
        assert_eq!(resolution.values.get("ok").map(String::as_str), Some("root /x"));
        assert_eq!(resolution.values.len(), 2);
        assert_eq!(resolution.errors.len(), 3);
        assert_eq!(resolution.errors[0].key(), "bad");
        assert!(resolution.into_result().is_err());
    }

    #[test]
    fn test_resolve_key() {
        let resolver = resolver(&[("a", "${b} c"), ("b", "b")]);
        assert_eq!(resolver.resolve_key("a").unwrap(), Some("b c".to_string()));
        assert_eq!(resolver.resolve_key("nope").unwrap(), None);
    }

    #[test]
    fn test_resolve_tokens_are_all_literal() {
        let resolver = resolver(&[("a", "${b} c"), ("b", "x y")]);
        let tokens = resolver.resolve_tokens("a").unwrap().unwrap();
        assert!(tokens.iter().all(Token::is_literal));
        assert_eq!(
            tokens,
            vec![Token::literal("x"), Token::literal("y"), Token::literal("c")]
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let first = resolver(&[("a", "${b} ${c}"), ("b", "1"), ("c", "${b} 2")])
            .resolve_table()
            .unwrap();
        let second = resolve([first.clone()]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render() {
        assert_eq!(render(&["a", "b", "c"]), "a b c");
        assert_eq!(render::<&str>(&[]), "");
    }
}
