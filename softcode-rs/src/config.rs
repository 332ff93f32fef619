//! Substitution/scope definition files.
//!
//! A small line-oriented format for setting up a [`Parser`] without code:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/sub <label> <pattern> <replacement> [<strip>]` | add a literal rule |
//! | `/regex <label> <pattern> <replacement> [<strip>]` | add a regex rule |
//! | `/set <token>=<value>` or `/set <token> <value>` | default scope entry |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |
//!
//! Arguments are whitespace separated; wrap them in double quotes to keep
//! spaces, and use `\"` for a quote inside quotes.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::SubstitutionError;
use crate::parser::{Parser, Plugin};
use crate::scope::Scope;
use crate::subst::Substitution;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Parsed definitions, in file order.
#[derive(Debug, Default)]
pub struct Config {
    pub substitutions: Vec<(String, Substitution)>,
    pub vars: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Malformed lines are reported and skipped; everything else still
    /// loads.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let Some(rest) = line.strip_prefix('/') else { continue };

            let (cmd, args_str) = rest
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((rest, ""));
            let args_str = args_str.trim();

            let result = match cmd {
                "sub" => parse_rule(&split_args(args_str), false).map(|rule| config.substitutions.push(rule)),
                "regex" => parse_rule(&split_args(args_str), true).map(|rule| config.substitutions.push(rule)),
                "set" => parse_set(&split_args(args_str), &mut config.vars),
                _ => Ok(()),
            };
            if let Err(message) = result {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// The `/set` entries as a [`Scope`].
    pub fn scope(&self) -> Scope {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }
}

impl Plugin for Config {
    fn install(&self, parser: &mut Parser) -> Result<(), SubstitutionError> {
        for (label, sub) in &self.substitutions {
            parser.add_substitutions(label, [sub.clone()]);
        }
        Ok(())
    }
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring double-quoted strings
/// and `\"` escapes within them.  `""` yields an empty token.
fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if !in_quotes => {
                in_quotes = true;
                quoted = true;
            }
            '"' if in_quotes => in_quotes = false,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    if escaped != '"' && escaped != '\\' {
                        cur.push('\\');
                    }
                    cur.push(escaped);
                }
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                if !cur.is_empty() || quoted {
                    args.push(std::mem::take(&mut cur));
                    quoted = false;
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() || quoted {
        args.push(cur);
    }
    args
}

// ── /sub, /regex ──────────────────────────────────────────────────────────────

fn parse_rule(tokens: &[String], regex: bool) -> Result<(String, Substitution), String> {
    let cmd = if regex { "/regex" } else { "/sub" };
    let [label, pattern, replacement, rest @ ..] = tokens else {
        return Err(format!("{cmd}: expected <label> <pattern> <replacement> [<strip>]"));
    };
    let strip = match rest {
        [] => "",
        [strip] => strip.as_str(),
        _ => return Err(format!("{cmd}: too many arguments ({})", tokens.len())),
    };
    let sub = if regex {
        Substitution::regex(pattern, replacement.as_str())
    } else {
        Substitution::literal(pattern, replacement.as_str())
    }
    .map_err(|e| format!("{cmd}: {e}"))?;
    Ok((label.to_ascii_lowercase(), sub.with_strip(strip)))
}

// ── /set ─────────────────────────────────────────────────────────────────────

/// Parse `/set <token>=<value>` or `/set <token> <value>`.
fn parse_set(tokens: &[String], vars: &mut BTreeMap<String, String>) -> Result<(), String> {
    if tokens.is_empty() {
        return Err("/set: requires an argument".into());
    }

    let (name, value) = if let Some((name, first)) = tokens[0].split_once('=') {
        let mut value = first.to_owned();
        for t in &tokens[1..] {
            value.push(' ');
            value.push_str(t);
        }
        (name.to_owned(), value)
    } else if tokens.len() >= 2 {
        (tokens[0].clone(), tokens[1..].join(" "))
    } else {
        return Err(format!("/set: missing value for '{}'", tokens[0]));
    };

    if name.is_empty() {
        return Err("/set: token cannot be empty".into());
    }

    vars.insert(name, value);
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
