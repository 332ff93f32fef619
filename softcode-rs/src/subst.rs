//! Named, ordered substitution tables.
//!
//! A [`SubstitutionSet`] maps a label to a list of [`Substitution`] rules.
//! Rules under one label run in insertion order, each over the output of the
//! one before.  Two labels always exist: [`PRE`], applied to a message
//! before evaluation, and [`POST`], applied to the rendered result.
//!
//! Patterns are compiled once, when the rule is built, and always match
//! case-insensitively.  A bad regular expression is reported by the
//! constructor, never at substitution time.

use std::borrow::Cow;
use std::collections::HashMap;

use regex::{NoExpand, Regex, RegexBuilder};
use tracing::trace;

use crate::error::SubstitutionError;

pub const PRE: &str = "pre";
pub const POST: &str = "post";

// ── Substitution ──────────────────────────────────────────────────────────────

/// One pattern → replacement rule.
///
/// `strip_replacement` is used instead of `replacement` by
/// [`SubstitutionSet::strip`], typically to remove markup codes rather than
/// render them.  It defaults to the empty string.
#[derive(Debug, Clone)]
pub struct Substitution {
    source: String,
    regex: Regex,
    /// Literal rules insert their replacements verbatim; regex rules expand
    /// `$1` / `${name}` references.
    expand: bool,
    replacement: String,
    strip_replacement: String,
}

impl Substitution {
    /// Replace the literal text `pattern`.  Both `pattern` and `replacement`
    /// are taken verbatim.
    pub fn literal(pattern: &str, replacement: impl Into<String>) -> Result<Self, SubstitutionError> {
        Self::build(pattern, &regex::escape(pattern), false, replacement.into())
    }

    /// Replace matches of the regular expression `pattern`.  `replacement`
    /// may refer to capture groups as `$1`, `${1}` or `${name}`.
    pub fn regex(pattern: &str, replacement: impl Into<String>) -> Result<Self, SubstitutionError> {
        Self::build(pattern, pattern, true, replacement.into())
    }

    fn build(source: &str, pattern: &str, expand: bool, replacement: String) -> Result<Self, SubstitutionError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            source: source.to_owned(),
            regex,
            expand,
            replacement,
            strip_replacement: String::new(),
        })
    }

    /// Set the text used when stripping instead of rendering.
    pub fn with_strip(mut self, strip_replacement: impl Into<String>) -> Self {
        self.strip_replacement = strip_replacement.into();
        self
    }

    /// The pattern as given to the constructor.
    pub fn pattern(&self) -> &str {
        &self.source
    }

    pub fn is_regex(&self) -> bool {
        self.expand
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn strip_replacement(&self) -> &str {
        &self.strip_replacement
    }

    /// Replace every match in `text` with the replacement.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.replace_with(text, &self.replacement)
    }

    /// Replace every match in `text` with the strip replacement.
    pub fn strip<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.replace_with(text, &self.strip_replacement)
    }

    fn replace_with<'t>(&self, text: &'t str, rep: &str) -> Cow<'t, str> {
        if self.expand {
            self.regex.replace_all(text, rep)
        } else {
            self.regex.replace_all(text, NoExpand(rep))
        }
    }
}

// ── SubstitutionSet ───────────────────────────────────────────────────────────

/// Label → ordered rules.  Labels are ASCII lower-cased on insert and lookup.
#[derive(Debug, Clone)]
pub struct SubstitutionSet {
    labels: HashMap<String, Vec<Substitution>>,
}

impl Default for SubstitutionSet {
    fn default() -> Self {
        let mut labels = HashMap::new();
        labels.insert(PRE.to_owned(), Vec::new());
        labels.insert(POST.to_owned(), Vec::new());
        Self { labels }
    }
}

impl SubstitutionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entries` to `label`, creating the label if needed.
    pub fn add(&mut self, label: &str, entries: impl IntoIterator<Item = Substitution>) {
        self.labels
            .entry(label.to_ascii_lowercase())
            .or_default()
            .extend(entries);
    }

    /// Rules under `label`, in application order.
    pub fn get(&self, label: &str) -> Option<&[Substitution]> {
        self.labels.get(&label.to_ascii_lowercase()).map(Vec::as_slice)
    }

    /// All labels, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.labels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run every rule of every label in the space-separated `label_list`
    /// over `text`.  Unknown labels are skipped.
    pub fn substitute(&self, label_list: &str, text: &str) -> String {
        self.apply_labels(label_list, text, Substitution::apply)
    }

    /// Same traversal as [`substitute`](Self::substitute), using each rule's
    /// strip replacement.
    pub fn strip(&self, label_list: &str, text: &str) -> String {
        self.apply_labels(label_list, text, Substitution::strip)
    }

    fn apply_labels<F>(&self, label_list: &str, text: &str, rule: F) -> String
    where
        F: for<'t> Fn(&Substitution, &'t str) -> Cow<'t, str>,
    {
        let mut out = text.to_owned();
        for label in label_list.split_whitespace() {
            let Some(rules) = self.get(label) else { continue };
            trace!(label, rules = rules.len(), "substitute");
            for sub in rules {
                let next = match rule(sub, &out) {
                    Cow::Borrowed(_) => continue,
                    Cow::Owned(s) => s,
                };
                out = next;
            }
        }
        out
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
