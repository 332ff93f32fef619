//! Error types for every layer of the pipeline.
//!
//! | Type | Raised by | Recovered by |
//! |------|-----------|--------------|
//! | [`ParseError`] | [`grammar`](crate::grammar) | the facade's bracket-scan fallback |
//! | [`EvalError`] | [`Evaluator`](crate::eval::Evaluator) | per-span isolation in the fallback |
//! | [`SubstitutionError`] | [`Substitution`](crate::subst::Substitution) constructors | nobody; fails registration |

use thiserror::Error;

/// Error type native handlers may return.  Boxed so host code can use `?`
/// on whatever error types its own lookups produce.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The text does not conform to the call grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at offset {offset}: {message}")]
pub struct ParseError {
    /// Byte offset into the parsed text where recognition stopped.
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Failure while evaluating an expression tree.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// No handler is registered under the (lower-cased) name.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// The tree has a shape the grammar never produces.
    #[error("unknown expression: {0}")]
    UnknownExpression(String),

    /// A native handler returned an error.
    #[error("{name}: {source}")]
    Function {
        name: String,
        #[source]
        source: HandlerError,
    },
}

/// A substitution rule could not be built.
#[derive(Debug, Error)]
pub enum SubstitutionError {
    #[error("regex error: {0}")]
    InvalidRegex(#[from] regex::Error),
}
