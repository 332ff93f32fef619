//! Stock plugins.
//!
//! The core ships no function library of its own; hosts install theirs with
//! [`Parser::install_plugins`].  These are small, self-contained ones used by
//! the `softcode` binary and handy as a starting point:
//!
//! | Plugin | Installs |
//! |--------|----------|
//! | [`arithmetic`] | `add`, `sub`, `mul`, `div`, `mod` |
//! | [`strings`] | `cat`, `strlen`, `ucstr`, `lcstr`, `repeat` |
//! | [`markup`] | the [`MARKUP`] substitution label (color and layout codes → HTML) |

use crate::error::{HandlerError, SubstitutionError};
use crate::parser::Parser;
use crate::subst::Substitution;

/// Label installed by [`markup`].
pub const MARKUP: &str = "markup";

/// Largest string `repeat` will build, in bytes.
pub const MAX_REPEAT_LEN: usize = 1 << 20;

type Builtin = fn(&[String]) -> Result<String, HandlerError>;

/// Register a synchronous builtin.  It ignores the data bag and scope.
fn register(parser: &mut Parser, name: &str, f: Builtin) {
    parser.add(name, move |args, _, _| async move { f(&args) });
}

// ── Arithmetic ────────────────────────────────────────────────────────────────

pub fn arithmetic(parser: &mut Parser) -> Result<(), SubstitutionError> {
    register(parser, "add", add);
    register(parser, "sub", sub);
    register(parser, "mul", mul);
    register(parser, "div", div);
    register(parser, "mod", modulo);
    Ok(())
}

fn add(args: &[String]) -> Result<String, HandlerError> {
    Ok(fmt_num(numbers(args, "add")?.into_iter().sum()))
}

fn mul(args: &[String]) -> Result<String, HandlerError> {
    Ok(fmt_num(numbers(args, "mul")?.into_iter().product()))
}

fn sub(args: &[String]) -> Result<String, HandlerError> {
    let a = get_num(args, 0, "sub")?;
    let b = get_num(args, 1, "sub")?;
    Ok(fmt_num(a - b))
}

fn div(args: &[String]) -> Result<String, HandlerError> {
    let a = get_num(args, 0, "div")?;
    let b = get_num(args, 1, "div")?;
    if b == 0.0 {
        return Err("div: division by zero".into());
    }
    Ok(fmt_num(a / b))
}

fn modulo(args: &[String]) -> Result<String, HandlerError> {
    let a = get_num(args, 0, "mod")?;
    let b = get_num(args, 1, "mod")?;
    if b == 0.0 {
        return Err("mod: division by zero".into());
    }
    Ok(fmt_num(a % b))
}

// ── Strings ───────────────────────────────────────────────────────────────────

pub fn strings(parser: &mut Parser) -> Result<(), SubstitutionError> {
    register(parser, "cat", cat);
    register(parser, "strlen", strlen);
    register(parser, "ucstr", |args| Ok(get_str(args, 0, "ucstr")?.to_uppercase()));
    register(parser, "lcstr", |args| Ok(get_str(args, 0, "lcstr")?.to_lowercase()));
    register(parser, "repeat", repeat);
    Ok(())
}

/// Join the non-empty arguments with single spaces.
fn cat(args: &[String]) -> Result<String, HandlerError> {
    Ok(args
        .iter()
        .filter(|a| !a.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" "))
}

fn strlen(args: &[String]) -> Result<String, HandlerError> {
    Ok(get_str(args, 0, "strlen")?.chars().count().to_string())
}

fn repeat(args: &[String]) -> Result<String, HandlerError> {
    let s = get_str(args, 0, "repeat")?;
    let count = get_str(args, 1, "repeat")?.trim();
    let n: usize = if count.is_empty() {
        0
    } else {
        count
            .parse()
            .map_err(|_| format!("repeat: '{count}' is not a non-negative integer"))?
    };
    match s.len().checked_mul(n) {
        Some(len) if len <= MAX_REPEAT_LEN => Ok(s.repeat(n)),
        _ => Err(format!("repeat: result longer than {MAX_REPEAT_LEN} bytes").into()),
    }
}

// ── Markup ────────────────────────────────────────────────────────────────────

/// Color and layout codes rendered as HTML.  Stripping removes the color
/// codes and turns layout codes into plain whitespace.
///
/// | Code | Renders as | Strips to |
/// |------|------------|-----------|
/// | `%cn;` / `%xn;` | `</span>` | |
/// | `%C<color>;` / `%X<color>;` | background-color span | |
/// | `%c<color>;` / `%x<color>;` | color span | |
/// | `%t;` | four `&nbsp;` | four spaces |
/// | `%b;` | `&nbsp;` | one space |
/// | `%r;` | `<br/>` | newline |
/// | `%<` / `%>` | `&lt;` / `&gt;` | `<` / `>` |
pub fn markup(parser: &mut Parser) -> Result<(), SubstitutionError> {
    let rules = [
        Substitution::regex(r"%[cx]n;", "</span>")?,
        // Upper-case codes select the background; matching is otherwise
        // case-insensitive, so this rule has to come before the foreground one.
        Substitution::regex(r"(?-i:%[CX])(\w+);", "<span style='background-color: ${1}'>")?,
        Substitution::regex(r"%[cx](\w+);", "<span style='color: ${1}'>")?,
        Substitution::literal("%t;", "&nbsp;".repeat(4))?.with_strip("    "),
        Substitution::literal("%b;", "&nbsp;")?.with_strip(" "),
        Substitution::literal("%r;", "<br/>")?.with_strip("\n"),
        Substitution::literal("%<", "&lt;")?.with_strip("<"),
        Substitution::literal("%>", "&gt;")?.with_strip(">"),
    ];
    parser.add_substitutions(MARKUP, rules);
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn get_str<'a>(args: &'a [String], idx: usize, name: &str) -> Result<&'a str, HandlerError> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{name}: argument {} missing", idx + 1).into())
}

/// Parse one argument as a number.  An empty argument counts as zero.
fn get_num(args: &[String], idx: usize, name: &str) -> Result<f64, HandlerError> {
    parse_num(get_str(args, idx, name)?, name)
}

fn numbers(args: &[String], name: &str) -> Result<Vec<f64>, HandlerError> {
    args.iter().map(|a| parse_num(a, name)).collect()
}

fn parse_num(s: &str, name: &str) -> Result<f64, HandlerError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(0.0);
    }
    s.parse::<f64>()
        .map_err(|_| format!("{name}: '{s}' is not a number").into())
}

/// Whole numbers print without a fractional part.
fn fmt_num(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
