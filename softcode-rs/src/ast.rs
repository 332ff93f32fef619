//! Expression tree produced by [`grammar::parse`](crate::grammar::parse).
//!
//! A tree is created fresh by one parse call, owned by the caller and
//! discarded after evaluation.  Nothing in it refers back to the
//! [`Parser`](crate::Parser) that produced it.

/// Byte range `start..end` into the parsed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The slice of `src` this span covers.
    pub fn slice<'s>(&self, src: &'s str) -> &'s str {
        &src[self.start..self.end]
    }
}

/// A literal token.
///
/// `value` is `None` for a skipped argument position (`f(1,,3)`), so a call
/// keeps its positional arity even when an argument is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub value: Option<String>,
    pub span: Span,
}

impl Word {
    pub fn new(value: impl Into<String>, span: Span) -> Self {
        Self {
            value: Some(value.into()),
            span,
        }
    }

    /// Placeholder for an empty argument position.
    pub fn null(span: Span) -> Self {
        Self { value: None, span }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Word(Word),

    /// `name(args)` or `[name(args)]`; both forms produce the same node.
    Function {
        operator: Word,
        args: Vec<Expression>,
        span: Span,
    },

    /// Adjacent arguments with no comma between them, e.g. `f(a [g()])`.
    List { args: Vec<Expression> },
}

impl Expression {
    /// Build a literal word node without a meaningful source span.
    pub fn word(value: impl Into<String>) -> Self {
        Expression::Word(Word::new(value, Span::default()))
    }

    /// Build a call node without a meaningful source span.
    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Function {
            operator: Word::new(name, Span::default()),
            args,
            span: Span::default(),
        }
    }

    /// Source span, if the node has one.  `List` nodes cover the span of
    /// their first through last member.
    pub fn span(&self) -> Option<Span> {
        match self {
            Expression::Word(w) => Some(w.span),
            Expression::Function { span, .. } => Some(*span),
            Expression::List { args } => {
                let first = args.first()?.span()?;
                let last = args.last()?.span()?;
                Some(Span::new(first.start, last.end))
            }
        }
    }
}
