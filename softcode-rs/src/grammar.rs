//! Recursive-descent recognizer for the call syntax.
//!
//! ```text
//! input     = _ function (_ function)* _
//! function  = word "(" args? ")"
//!           | "[" _ word "(" args? ")" _ "]"
//! args      = position ("," position)*
//! position  = arg+            ; two or more adjacent args form a List
//!           | (empty)         ; a null Word
//! arg       = function | word
//! word      = [^()\[\],]+     ; trimmed, interior whitespace kept
//! _         = [ \t\r\n]*
//! ```
//!
//! Any mismatch fails the whole parse.  Recovering from malformed text
//! embedded in narrative is the job of [`scan`](crate::scan), one layer up.
//!
//! All delimiters are ASCII, so the cursor walks bytes and only ever slices
//! the source at ASCII positions.

use crate::ast::{Expression, Span, Word};
use crate::error::ParseError;

/// Parse a whole message as one or more calls, bare or bracketed, separated
/// only by whitespace.  Plain narrative text is rejected.
pub fn parse(src: &str) -> Result<Vec<Expression>, ParseError> {
    let mut cur = Cursor::new(src);
    cur.skip_ws();
    if cur.at_end() {
        return Err(cur.error("empty expression"));
    }
    let mut exprs = Vec::new();
    while !cur.at_end() {
        exprs.push(cur.function()?);
        cur.skip_ws();
    }
    Ok(exprs)
}

/// Parse exactly one bracketed call, `[name(args)]`, surrounded by nothing
/// but whitespace.
pub fn parse_bracketed(src: &str) -> Result<Expression, ParseError> {
    let mut cur = Cursor::new(src);
    cur.skip_ws();
    let expr = cur.bracketed()?;
    cur.skip_ws();
    if !cur.at_end() {
        return Err(cur.error("unexpected text after ']'"));
    }
    Ok(expr)
}

fn is_word_byte(b: u8) -> bool {
    !matches!(b, b'(' | b')' | b'[' | b']' | b',')
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Cursor { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.pos, message)
    }

    fn unexpected(&self) -> ParseError {
        match self.peek() {
            Some(b) => self.error(format!("unexpected '{}'", b as char)),
            None => self.error("unexpected end of input"),
        }
    }

    fn expect(&mut self, ch: u8) -> Result<(), ParseError> {
        if self.peek() == Some(ch) {
            self.pos += 1;
            Ok(())
        } else {
            Err(match self.peek() {
                Some(b) => self.error(format!("expected '{}', found '{}'", ch as char, b as char)),
                None => self.error(format!("expected '{}', found end of input", ch as char)),
            })
        }
    }

    /// Consume a run of word bytes and return it trimmed.  The span covers
    /// the trimmed text.  Returns `None` when nothing but whitespace was read.
    fn word(&mut self) -> Option<Word> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if is_word_byte(b)) {
            self.pos += 1;
        }
        let raw = &self.src[start..self.pos];
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let lead = raw.len() - raw.trim_start().len();
        let begin = start + lead;
        Some(Word::new(trimmed, Span::new(begin, begin + trimmed.len())))
    }

    /// Either call form.
    fn function(&mut self) -> Result<Expression, ParseError> {
        if self.peek() == Some(b'[') {
            return self.bracketed();
        }
        let start = self.pos;
        let name = self.word().ok_or_else(|| self.unexpected())?;
        self.expect(b'(')?;
        self.call_rest(name, start)
    }

    fn bracketed(&mut self) -> Result<Expression, ParseError> {
        let start = self.pos;
        self.expect(b'[')?;
        self.skip_ws();
        let name = self
            .word()
            .ok_or_else(|| self.error("expected function name after '['"))?;
        self.expect(b'(')?;
        let args = self.args()?;
        self.expect(b')')?;
        self.skip_ws();
        self.expect(b']')?;
        Ok(Expression::Function {
            operator: name,
            args,
            span: Span::new(start, self.pos),
        })
    }

    /// Everything after `name(`: the argument list and the closing paren.
    fn call_rest(&mut self, operator: Word, start: usize) -> Result<Expression, ParseError> {
        let args = self.args()?;
        self.expect(b')')?;
        Ok(Expression::Function {
            operator,
            args,
            span: Span::new(start, self.pos),
        })
    }

    /// Comma-separated positions up to (not including) the closing paren.
    fn args(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut args = Vec::new();
        let mut after_comma = false;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b')') => {
                    if after_comma {
                        args.push(Expression::Word(Word::null(Span::new(self.pos, self.pos))));
                    }
                    return Ok(args);
                }
                Some(b',') => {
                    args.push(Expression::Word(Word::null(Span::new(self.pos, self.pos))));
                    self.pos += 1;
                    after_comma = true;
                    continue;
                }
                None => return Err(self.error("unterminated argument list")),
                Some(_) => {}
            }

            args.push(self.position()?);

            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    after_comma = true;
                }
                Some(b')') => return Ok(args),
                None => return Err(self.error("unterminated argument list")),
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    /// One argument position: a single arg, or a List of adjacent ones.
    fn position(&mut self) -> Result<Expression, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b',' | b')') | None => break,
                Some(_) => items.push(self.arg()?),
            }
        }
        if items.len() == 1 {
            Ok(items.remove(0))
        } else {
            Ok(Expression::List { args: items })
        }
    }

    fn arg(&mut self) -> Result<Expression, ParseError> {
        if self.peek() == Some(b'[') {
            return self.bracketed();
        }
        let start = self.pos;
        let word = self.word().ok_or_else(|| self.unexpected())?;
        if self.peek() == Some(b'(') {
            self.pos += 1;
            return self.call_rest(word, start);
        }
        Ok(Expression::Word(word))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
