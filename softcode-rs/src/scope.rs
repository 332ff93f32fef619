//! Per-evaluation state handed to the evaluator and to native handlers.
//!
//! - [`Scope`] maps substitution tokens (`%#`, `%N`, …) to literal text.  It
//!   is immutable once built and cheap to clone, so every handler call can
//!   take its own handle.
//! - [`DataBag`] is opaque host state.  Handlers may write to it, and later
//!   arguments of the same call observe those writes because arguments are
//!   evaluated strictly left to right.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, Match, MatchKind};

// ── Scope ─────────────────────────────────────────────────────────────────────

/// Token → text table for one evaluation.
///
/// Two matchers are compiled when the scope is built: one over the tokens as
/// written (literal, case-sensitive) and one over their ASCII-lowercased
/// forms, which is run against an ASCII-lowercased copy of the text.  ASCII
/// lowercasing never changes byte lengths, so match offsets map straight
/// back onto the original text.
///
/// Folding is ASCII only, like function-name lookup in the
/// [`FunctionRegistry`](crate::registry::FunctionRegistry): `%N` matches
/// `%n`, but `%Ä` does not match `%ä`.
#[derive(Clone, Default)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

#[derive(Default)]
struct ScopeInner {
    vars: BTreeMap<String, String>,
    /// Values of the non-empty tokens, indexed by matcher pattern id.
    values: Vec<String>,
    literal: Option<AhoCorasick>,
    folded: Option<AhoCorasick>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact (case-sensitive) lookup.
    pub fn get(&self, token: &str) -> Option<&str> {
        self.inner.vars.get(token).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.inner.vars.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.inner.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.vars.is_empty()
    }

    /// Iterate over all entries in token order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .vars
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// A copy of this scope with `token` set to `value`.
    pub fn with(&self, token: impl Into<String>, value: impl Into<String>) -> Self {
        let mut vars = self.inner.vars.clone();
        vars.insert(token.into(), value.into());
        Self::from_map(vars)
    }

    /// Replace every literal occurrence of a token in `text` with its value.
    /// Longest token wins where tokens overlap.
    pub fn replace_literal(&self, text: &str) -> String {
        match &self.inner.literal {
            Some(ac) => splice(text, text, ac, |m| &self.inner.values[m.pattern()]),
            None => text.to_owned(),
        }
    }

    /// Like [`replace_literal`](Self::replace_literal) but ASCII
    /// case-insensitive: `%n` also replaces `%N`.
    ///
    /// When several tokens differ only in case (`%N` and `%n`), the one
    /// written exactly as in the text wins.
    pub fn replace_folded(&self, text: &str) -> String {
        match &self.inner.folded {
            Some(ac) => {
                let lowered = text.to_ascii_lowercase();
                splice(text, &lowered, ac, |m| {
                    text.get(m.start()..m.end())
                        .and_then(|exact| self.inner.vars.get(exact))
                        .unwrap_or(&self.inner.values[m.pattern()])
                })
            }
            None => text.to_owned(),
        }
    }

    fn from_map(vars: BTreeMap<String, String>) -> Self {
        // The empty token would match at every position; it is only reachable
        // through exact lookup.
        let (keys, values): (Vec<&String>, Vec<String>) = vars
            .iter()
            .filter(|(k, _)| !k.is_empty())
            .map(|(k, v)| (k, v.clone()))
            .unzip();

        let (literal, folded) = if keys.is_empty() {
            (None, None)
        } else {
            let lowered: Vec<String> = keys.iter().map(|k| k.to_ascii_lowercase()).collect();
            (Some(build_matcher(&keys)), Some(build_matcher(&lowered)))
        };

        Scope {
            inner: Arc::new(ScopeInner {
                values,
                literal,
                folded,
                vars,
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.vars.iter()).finish()
    }
}

fn build_matcher<P: AsRef<[u8]>>(patterns: &[P]) -> AhoCorasick {
    AhoCorasickBuilder::new()
        .match_kind(MatchKind::LeftmostLongest)
        .build(patterns)
}

/// Copy `text`, swapping each match found in `haystack` for `value(m)`.
/// `haystack` must have the same byte layout as `text`.
fn splice<'v, F>(text: &str, haystack: &str, ac: &AhoCorasick, value: F) -> String
where
    F: Fn(&Match) -> &'v String,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in ac.find_iter(haystack) {
        out.push_str(&text[last..m.start()]);
        out.push_str(value(&m));
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

// ── DataBag ───────────────────────────────────────────────────────────────────

/// Shared, host-owned key/value state.  Clones share the same storage.
#[derive(Clone, Default)]
pub struct DataBag {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A handler that panicked mid-update leaves plain strings behind;
        // the map is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Set (or overwrite) a value, returning the previous one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.lock().insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.lock().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DataBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        DataBag {
            inner: Arc::new(Mutex::new(map)),
        }
    }
}

impl fmt::Debug for DataBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.lock().iter()).finish()
    }
}

// ── Context ───────────────────────────────────────────────────────────────────

/// Everything an evaluation call carries besides the text itself.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub scope: Scope,
    pub data: DataBag,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_data(mut self, data: DataBag) -> Self {
        self.data = data;
        self
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_lookup_is_case_sensitive() {
        let scope: Scope = [("%N", "Bob")].into_iter().collect();
        assert_eq!(scope.get("%N"), Some("Bob"));
        assert_eq!(scope.get("%n"), None);
    }

    #[test]
    fn literal_replace_is_global() {
        let scope: Scope = [("%#", "#12")].into_iter().collect();
        assert_eq!(scope.replace_literal("%# and %#"), "#12 and #12");
    }

    #[test]
    fn literal_replace_respects_case() {
        let scope: Scope = [("%n", "bob")].into_iter().collect();
        assert_eq!(scope.replace_literal("%N %n"), "%N bob");
    }

    #[test]
    fn folded_replace_ignores_ascii_case() {
        let scope: Scope = [("%n", "bob")].into_iter().collect();
        assert_eq!(scope.replace_folded("%N says hi to %n"), "bob says hi to bob");
    }

    #[test]
    fn folded_replace_prefers_exact_case() {
        let scope: Scope = [("%N", "Bob"), ("%n", "bob")].into_iter().collect();
        assert_eq!(scope.replace_folded("%n and %N"), "bob and Bob");
        let lower_only: Scope = [("%n", "bob")].into_iter().collect();
        assert_eq!(lower_only.replace_folded("%N"), "bob");
    }

    #[test]
    fn folding_is_ascii_only() {
        let scope: Scope = [("%ä", "umlaut")].into_iter().collect();
        assert_eq!(scope.replace_folded("%Ä %ä"), "%Ä umlaut");
    }

    #[test]
    fn longest_token_wins() {
        let scope: Scope = [("%n", "short"), ("%na", "long")].into_iter().collect();
        assert_eq!(scope.replace_literal("%na %n"), "long short");
    }

    #[test]
    fn replacement_is_single_pass() {
        // A value containing another token is not re-expanded.
        let scope: Scope = [("%a", "%b"), ("%b", "B")].into_iter().collect();
        assert_eq!(scope.replace_literal("%a%b"), "%bB");
    }

    #[test]
    fn folded_replace_keeps_non_ascii_text() {
        let scope: Scope = [("%x", "Ünï")].into_iter().collect();
        assert_eq!(scope.replace_folded("Ärger %X über"), "Ärger Ünï über");
    }

    #[test]
    fn empty_token_only_matches_exactly() {
        let scope: Scope = [("", "blank")].into_iter().collect();
        assert_eq!(scope.get(""), Some("blank"));
        assert_eq!(scope.replace_literal("abc"), "abc");
    }

    #[test]
    fn with_extends_without_mutating() {
        let base: Scope = [("%a", "1")].into_iter().collect();
        let ext = base.with("%b", "2");
        assert_eq!(base.len(), 1);
        assert_eq!(ext.replace_literal("%a%b"), "12");
    }

    #[test]
    fn data_bag_clones_share_state() {
        let bag = DataBag::new();
        let other = bag.clone();
        other.set("enactor", "#1");
        assert_eq!(bag.get("enactor").as_deref(), Some("#1"));
        assert_eq!(bag.remove("enactor").as_deref(), Some("#1"));
        assert!(!other.contains("enactor"));
    }
}
