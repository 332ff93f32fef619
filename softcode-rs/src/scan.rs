//! Bracket-scan fallback for free-form text.
//!
//! Narrative text is not itself an expression, so it cannot go through
//! [`grammar::parse`](crate::grammar::parse) whole.  Instead each balanced
//! `[...]` span is lifted out, parsed and evaluated on its own, and its
//! result spliced back between the untouched literal text.  A span that
//! fails to parse or evaluate is copied through verbatim; the failure never
//! spreads to the rest of the message.

use std::slice;

use tracing::{debug, trace};

use crate::eval::Evaluator;
use crate::grammar::parse_bracketed;
use crate::scope::{DataBag, Scope};

/// Evaluate every top-level bracket span in `text`, left to right.
///
/// - Text outside brackets is copied as is.  A stray `]` at depth zero is
///   ordinary text.
/// - A span runs from a `[` at depth zero to the `]` that brings the depth
///   back to zero, so nested brackets stay inside their enclosing span.
/// - An unterminated trailing span is copied through unevaluated.
pub async fn scan(evaluator: &Evaluator<'_>, text: &str, scope: &Scope, data: &DataBag) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        match ch {
            '[' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            ']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let span = &text[start..=i];
                    out.push_str(&eval_span(evaluator, span, scope, data).await);
                }
            }
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }

    if depth > 0 {
        trace!(span = &text[start..], "unterminated span");
        out.push_str(&text[start..]);
    }
    out
}

async fn eval_span(evaluator: &Evaluator<'_>, span: &str, scope: &Scope, data: &DataBag) -> String {
    let expr = match parse_bracketed(span) {
        Ok(expr) => expr,
        Err(e) => {
            debug!(span, error = %e, "span left unevaluated");
            return span.to_owned();
        }
    };
    match evaluator.eval(slice::from_ref(&expr), scope, data).await {
        Ok(text) => text,
        Err(e) => {
            debug!(span, error = %e, "span left unevaluated");
            span.to_owned()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
