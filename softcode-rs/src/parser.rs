//! The [`Parser`] facade: one function table, one substitution set, and the
//! entry points that tie grammar, evaluator and scanner together.
//!
//! Each `Parser` is independent.  Populate it at startup (directly or via
//! [`Plugin`]s), then share it read-only between concurrent evaluations.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::ast::Expression;
use crate::error::{EvalError, HandlerError, ParseError, SubstitutionError};
use crate::eval::Evaluator;
use crate::grammar;
use crate::registry::{Function, FunctionRegistry};
use crate::scan::scan;
use crate::scope::{Context, DataBag, Scope};
use crate::subst::{Substitution, SubstitutionSet, POST, PRE};

// ── Plugin ────────────────────────────────────────────────────────────────────

/// Bulk registration hook: a function library, a rendering table, a loaded
/// config file.  Any `Fn(&mut Parser) -> Result<(), SubstitutionError>`
/// is a plugin.
pub trait Plugin {
    fn install(&self, parser: &mut Parser) -> Result<(), SubstitutionError>;
}

impl<F> Plugin for F
where
    F: Fn(&mut Parser) -> Result<(), SubstitutionError>,
{
    fn install(&self, parser: &mut Parser) -> Result<(), SubstitutionError> {
        self(parser)
    }
}

// ── Parser ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Parser {
    fns: FunctionRegistry,
    subs: SubstitutionSet,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a native function under `name`, matched
    /// case-insensitively.
    pub fn add<F, Fut>(&mut self, name: &str, func: F) -> &mut Self
    where
        F: Fn(Vec<String>, DataBag, Scope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, HandlerError>> + Send + 'static,
    {
        self.fns.insert(name, Arc::new(func));
        self
    }

    /// Register a handler that implements [`Function`] directly.
    pub fn add_function(&mut self, name: &str, func: Arc<dyn Function>) -> &mut Self {
        self.fns.insert(name, func);
        self
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.fns
    }

    /// Append rules to the substitution list `label`.
    pub fn add_substitutions(&mut self, label: &str, entries: impl IntoIterator<Item = Substitution>) -> &mut Self {
        self.subs.add(label, entries);
        self
    }

    pub fn substitutions(&self) -> &SubstitutionSet {
        &self.subs
    }

    pub fn install(&mut self, plugin: &dyn Plugin) -> Result<&mut Self, SubstitutionError> {
        plugin.install(self)?;
        Ok(self)
    }

    /// Install plugins in order.  Stops at the first one that fails.
    pub fn install_plugins(&mut self, plugins: &[&dyn Plugin]) -> Result<&mut Self, SubstitutionError> {
        for plugin in plugins {
            plugin.install(self)?;
        }
        Ok(self)
    }

    pub fn parse(&self, text: &str) -> Result<Vec<Expression>, ParseError> {
        grammar::parse(text)
    }

    /// Evaluate parsed expressions and join the results.
    pub async fn eval(&self, ctx: &Context, exprs: &[Expression]) -> Result<String, EvalError> {
        Evaluator::new(&self.fns).eval(exprs, &ctx.scope, &ctx.data).await
    }

    /// Evaluate the bracketed calls embedded in `message`, then apply the
    /// `post` label.  Never fails: spans that do not evaluate are kept as
    /// written.
    pub async fn run(&self, ctx: &Context, message: &str) -> String {
        let out = scan(&Evaluator::new(&self.fns), message, &ctx.scope, &ctx.data).await;
        self.subs.substitute(POST, &out)
    }

    /// Render `message` for output.
    ///
    /// 1. Apply the `pre` label.
    /// 2. Replace scope tokens found literally in the text.
    /// 3. Evaluate the whole text as an expression; if that fails for any
    ///    reason, bracket-scan it instead.
    /// 4. Apply `label_list`, then `post`.
    pub async fn stringify(&self, label_list: &str, ctx: &Context, message: &str) -> String {
        let text = self.subs.substitute(PRE, message);
        let text = ctx.scope.replace_literal(&text);

        let evaluator = Evaluator::new(&self.fns);
        let rendered = match self.eval_whole(&evaluator, ctx, &text).await {
            Ok(out) => out,
            Err(e) => {
                debug!(error = %e, "not a whole expression; scanning for brackets");
                scan(&evaluator, &text, &ctx.scope, &ctx.data).await
            }
        };

        let rendered = self.subs.substitute(label_list, &rendered);
        self.subs.substitute(POST, &rendered)
    }

    async fn eval_whole(&self, evaluator: &Evaluator<'_>, ctx: &Context, text: &str) -> Result<String, EvalError> {
        let exprs = grammar::parse(text)?;
        evaluator.eval(&exprs, &ctx.scope, &ctx.data).await
    }

    pub fn substitute(&self, label_list: &str, text: &str) -> String {
        self.subs.substitute(label_list, text)
    }

    pub fn strip_substitutions(&self, label_list: &str, text: &str) -> String {
        self.subs.strip(label_list, text)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> Parser {
        let mut p = Parser::new();
        p.add("add", |args, _, _| async move {
            let mut sum = 0i64;
            for a in &args {
                sum += a.trim().parse::<i64>()?;
            }
            Ok::<_, HandlerError>(sum.to_string())
        });
        p.add("width", |_, _, _| async { Ok::<_, HandlerError>("FOOOOOO!".to_owned()) });
        p.add("name", |_, data: DataBag, _| async move {
            Ok::<_, HandlerError>(data.get("name").unwrap_or_else(|| "nobody".to_owned()))
        });
        p
    }

    #[tokio::test]
    async fn eval_parsed_call() {
        let p = parser();
        let exprs = p.parse("add(5,6)").unwrap();
        assert_eq!(p.eval(&Context::new(), &exprs).await.unwrap(), "11");
    }

    #[tokio::test]
    async fn no_arg_call() {
        let p = parser();
        let exprs = p.parse("width()").unwrap();
        assert_eq!(p.eval(&Context::new(), &exprs).await.unwrap(), "FOOOOOO!");
    }

    #[tokio::test]
    async fn run_applies_post() {
        let mut p = parser();
        p.add_substitutions(POST, [Substitution::literal("11", "eleven").unwrap()]);
        assert_eq!(p.run(&Context::new(), "sum: [add(5,6)]").await, "sum: eleven");
    }

    #[tokio::test]
    async fn stringify_whole_expression() {
        let p = parser();
        assert_eq!(p.stringify("", &Context::new(), "add(1,2)").await, "3");
    }

    #[tokio::test]
    async fn stringify_scope_only() {
        let p = parser();
        let ctx = Context::new().with_scope([("%#", "Foobar")].into_iter().collect());
        assert_eq!(p.stringify("", &ctx, "Hello %#!").await, "Hello Foobar!");
    }

    #[tokio::test]
    async fn stringify_label_order_is_caller_then_post() {
        let mut p = parser();
        p.add_substitutions("html", [Substitution::literal("%r", "<br>").unwrap()]);
        p.add_substitutions(POST, [Substitution::literal("<br>", "<br/>").unwrap()]);
        assert_eq!(p.stringify("html", &Context::new(), "a%rb").await, "a<br/>b");
    }

    #[tokio::test]
    async fn stringify_applies_pre_first() {
        let mut p = parser();
        p.add_substitutions(PRE, [Substitution::literal("plus", "add").unwrap()]);
        assert_eq!(p.stringify("", &Context::new(), "[plus(1,1)]").await, "2");
    }

    #[tokio::test]
    async fn data_bag_reaches_handlers() {
        let p = parser();
        let data: DataBag = [("name", "Alice")].into_iter().collect();
        let ctx = Context::new().with_data(data);
        assert_eq!(p.stringify("", &ctx, "Hi [name()]").await, "Hi Alice");
    }

    #[test]
    fn plugins_install_in_order() {
        fn first(p: &mut Parser) -> Result<(), SubstitutionError> {
            p.add_substitutions("chain", [Substitution::literal("a", "b")?]);
            Ok(())
        }
        fn second(p: &mut Parser) -> Result<(), SubstitutionError> {
            p.add_substitutions("chain", [Substitution::literal("b", "c")?]);
            Ok(())
        }
        let mut p = Parser::new();
        p.install_plugins(&[&first, &second]).unwrap();
        assert_eq!(p.substitute("chain", "a"), "c");
    }

    #[test]
    fn failing_plugin_reports_error() {
        let bad = |p: &mut Parser| -> Result<(), SubstitutionError> {
            p.add_substitutions("x", [Substitution::regex("(", "")?]);
            Ok(())
        };
        assert!(Parser::new().install(&bad).is_err());
    }

    #[test]
    fn parsers_are_independent() {
        let a = parser();
        let b = Parser::new();
        assert!(a.functions().contains("add"));
        assert!(!b.functions().contains("add"));
    }
}
