//! Tree-walking evaluator.
//!
//! Every node evaluates to text.  Top-level results and `List` members are
//! concatenated with no separator.  A call's arguments are evaluated one at
//! a time, left to right, each awaited to completion before the next starts,
//! since a handler may change the [`DataBag`] that later arguments read.
//!
//! Recursion depth follows the nesting depth of the tree and is bounded only
//! by the stack.  Hosts evaluating untrusted input should cap message length
//! or wrap the call in their own deadline.

use std::future::Future;
use std::pin::Pin;

use tracing::trace;

use crate::ast::{Expression, Word};
use crate::error::EvalError;
use crate::registry::FunctionRegistry;
use crate::scope::{DataBag, Scope};

type EvalFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<String>, EvalError>> + Send + 'a>>;

/// Evaluates expression trees against one function table.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'r> {
    registry: &'r FunctionRegistry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Evaluate `exprs` in order and join their results.
    pub async fn eval(&self, exprs: &[Expression], scope: &Scope, data: &DataBag) -> Result<String, EvalError> {
        let mut out = String::new();
        for expr in exprs {
            if let Some(text) = self.eval_expr(expr, scope, data).await? {
                out.push_str(&text);
            }
        }
        Ok(out)
    }

    /// Evaluate one node.  `Ok(None)` is the positional-empty marker produced
    /// by a null [`Word`]: the argument exists but has no value.
    fn eval_expr<'a>(&'a self, expr: &'a Expression, scope: &'a Scope, data: &'a DataBag) -> EvalFuture<'a> {
        Box::pin(async move {
            match expr {
                Expression::Word(word) => Ok(eval_word(word, scope)),

                Expression::Function { operator, args, .. } => {
                    let name = operator.value.as_deref().ok_or_else(|| {
                        EvalError::UnknownExpression("function node without a name".to_owned())
                    })?;
                    let func = self
                        .registry
                        .get(name)
                        .ok_or_else(|| EvalError::UnknownFunction(name.to_ascii_lowercase()))?;

                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(self.eval_expr(arg, scope, data).await?.unwrap_or_default());
                    }

                    trace!(function = %name, argc = values.len(), "dispatch");
                    func.call(values, data.clone(), scope.clone())
                        .await
                        .map(Some)
                        .map_err(|source| EvalError::Function {
                            name: name.to_ascii_lowercase(),
                            source,
                        })
                }

                Expression::List { args } => {
                    let mut out = String::new();
                    for arg in args {
                        if let Some(text) = self.eval_expr(arg, scope, data).await? {
                            out.push_str(&text);
                        }
                    }
                    Ok(Some(out))
                }
            }
        })
    }
}

/// An exact scope token wins outright.  Otherwise the word is literal text
/// with any tokens inside it substituted, ignoring ASCII case.
fn eval_word(word: &Word, scope: &Scope) -> Option<String> {
    let text = word.value.as_deref().unwrap_or("");
    if let Some(value) = scope.get(text) {
        return Some(value.to_owned());
    }
    word.value.as_deref().map(|text| scope.replace_folded(text))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ast::Span;
    use crate::error::HandlerError;
    use crate::grammar::parse;

    fn registry() -> FunctionRegistry {
        let mut reg = FunctionRegistry::new();
        reg.insert(
            "add",
            Arc::new(|args: Vec<String>, _: DataBag, _: Scope| async move {
                let mut sum = 0i64;
                for a in &args {
                    sum += a.trim().parse::<i64>()?;
                }
                Ok::<_, HandlerError>(sum.to_string())
            }),
        );
        reg.insert(
            "second",
            Arc::new(|args: Vec<String>, _: DataBag, _: Scope| async move {
                Ok::<_, HandlerError>(args.get(1).cloned().unwrap_or_default())
            }),
        );
        reg.insert(
            "argc",
            Arc::new(|args: Vec<String>, _: DataBag, _: Scope| async move {
                Ok::<_, HandlerError>(args.len().to_string())
            }),
        );
        reg.insert(
            "setq",
            Arc::new(|args: Vec<String>, data: DataBag, _: Scope| async move {
                data.set("q", args.first().cloned().unwrap_or_default());
                Ok::<_, HandlerError>(String::new())
            }),
        );
        reg.insert(
            "getq",
            Arc::new(|_: Vec<String>, data: DataBag, _: Scope| async move {
                Ok::<_, HandlerError>(data.get("q").unwrap_or_default())
            }),
        );
        reg
    }

    async fn run(src: &str, scope: &Scope) -> Result<String, EvalError> {
        let reg = registry();
        let exprs = parse(src)?;
        Evaluator::new(&reg).eval(&exprs, scope, &DataBag::new()).await
    }

    #[tokio::test]
    async fn sums_arguments() {
        assert_eq!(run("add(5,6)", &Scope::new()).await.unwrap(), "11");
    }

    #[tokio::test]
    async fn dispatch_ignores_case() {
        assert_eq!(run("ADD(1,2)", &Scope::new()).await.unwrap(), "3");
    }

    #[tokio::test]
    async fn nested_calls_evaluate_inside_out() {
        assert_eq!(run("add(1,add(2,add(3,4)))", &Scope::new()).await.unwrap(), "10");
    }

    #[tokio::test]
    async fn empty_position_reaches_handler_as_empty_string() {
        assert_eq!(run("second(1,,3)", &Scope::new()).await.unwrap(), "");
        assert_eq!(run("argc(1,,3)", &Scope::new()).await.unwrap(), "3");
    }

    #[tokio::test]
    async fn top_level_results_concatenate() {
        assert_eq!(run("[add(2,2)][add(2,4)]", &Scope::new()).await.unwrap(), "46");
    }

    #[tokio::test]
    async fn list_members_concatenate() {
        // `1 [add(1,1)]` is one argument position holding two adjacent args.
        assert_eq!(run("second(x, 1 [add(1,1)])", &Scope::new()).await.unwrap(), "12");
    }

    #[tokio::test]
    async fn exact_scope_token_replaces_word() {
        let scope: Scope = [("%0", "5")].into_iter().collect();
        assert_eq!(run("add(%0,1)", &scope).await.unwrap(), "6");
    }

    #[tokio::test]
    async fn scope_tokens_substitute_inside_words() {
        let scope: Scope = [("%n", "Bob")].into_iter().collect();
        assert_eq!(run("second(x, hi %N!)", &scope).await.unwrap(), "hi Bob!");
    }

    #[tokio::test]
    async fn in_word_tokens_differing_in_case_stay_distinct() {
        let scope: Scope = [("%N", "Bob"), ("%n", "bob")].into_iter().collect();
        assert_eq!(run("second(x, hi %n)", &scope).await.unwrap(), "hi bob");
        assert_eq!(run("second(x, hi %N)", &scope).await.unwrap(), "hi Bob");
    }

    #[tokio::test]
    async fn null_word_consults_empty_token() {
        let scope: Scope = [("", "blank")].into_iter().collect();
        assert_eq!(run("second(1,,3)", &scope).await.unwrap(), "blank");
    }

    #[tokio::test]
    async fn later_arguments_see_earlier_side_effects() {
        assert_eq!(run("second(setq(7), getq())", &Scope::new()).await.unwrap(), "7");
    }

    #[tokio::test]
    async fn unknown_function_is_an_error() {
        let err = run("nosuch(1)", &Scope::new()).await.unwrap_err();
        assert!(matches!(err, EvalError::UnknownFunction(ref n) if n == "nosuch"));
    }

    #[tokio::test]
    async fn unknown_function_in_argument_fails_the_call() {
        let err = run("add(1,nosuch())", &Scope::new()).await.unwrap_err();
        assert!(matches!(err, EvalError::UnknownFunction(_)));
    }

    #[tokio::test]
    async fn handler_error_carries_function_name() {
        let err = run("add(1,x)", &Scope::new()).await.unwrap_err();
        match err {
            EvalError::Function { name, .. } => assert_eq!(name, "add"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn nameless_function_node_is_rejected() {
        let reg = registry();
        let expr = Expression::Function {
            operator: Word::null(Span::default()),
            args: vec![],
            span: Span::default(),
        };
        let err = Evaluator::new(&reg)
            .eval(&[expr], &Scope::new(), &DataBag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::UnknownExpression(_)));
    }

    #[tokio::test]
    async fn hand_built_trees_evaluate() {
        let reg = registry();
        let expr = Expression::call("add", vec![Expression::word("2"), Expression::word("3")]);
        let out = Evaluator::new(&reg)
            .eval(&[expr], &Scope::new(), &DataBag::new())
            .await
            .unwrap();
        assert_eq!(out, "5");
    }
}
