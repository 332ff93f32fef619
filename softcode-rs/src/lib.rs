//! Embeddable parser and evaluator for MUSH-style softcode.
//!
//! Narrative text may embed calls such as `[add(1,2)]`; a whole message may
//! also be a bare call, `add(1,2)`.  The host supplies the function library
//! and per-call scope; this crate recognizes the syntax, evaluates it and
//! runs the result through named substitution tables.
//!
//! ```text
//! message ─► pre ─► scope tokens ─► grammar ─► evaluator ─► labels ─► post
//!                                      │ (fails)     ▲
//!                                      └─► bracket scan (per span)
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use softcode::{Context, Parser};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut parser = Parser::new();
//! parser.add("add", |args, _, _| async move {
//!     let mut sum = 0i64;
//!     for a in &args {
//!         sum += a.trim().parse::<i64>()?;
//!     }
//!     Ok::<_, softcode::HandlerError>(sum.to_string())
//! });
//!
//! let out = parser.run(&Context::new(), "2 + 2 = [add(2,2)]").await;
//! assert_eq!(out, "2 + 2 = 4");
//! # });
//! ```

pub mod ast;
pub mod cli;
pub mod config;
pub mod error;
pub mod eval;
pub mod grammar;
pub mod parser;
pub mod plugins;
pub mod registry;
pub mod scan;
pub mod scope;
pub mod subst;

// Re-exports for convenience.
pub use ast::{Expression, Span, Word};
pub use error::{EvalError, HandlerError, ParseError, SubstitutionError};
pub use parser::{Parser, Plugin};
pub use registry::{Function, FunctionRegistry};
pub use scope::{Context, DataBag, Scope};
pub use subst::{Substitution, SubstitutionSet, POST, PRE};
