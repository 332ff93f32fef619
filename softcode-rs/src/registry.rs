//! Native function table.
//!
//! Handlers are async: a host function may need to await its own I/O (an
//! object lookup, a database read) before producing text.  Names are folded
//! with [`str::to_ascii_lowercase`] on the way in and on lookup, so `ADD`,
//! `Add` and `add` all resolve to the same handler.  Non-ASCII letters are
//! kept as written, the same folding [`Scope`] uses for its tokens.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::scope::{DataBag, Scope};

/// A native softcode function.
///
/// `args` holds one string per argument position, already evaluated; empty
/// positions (`f(1,,3)`) arrive as `""`.
///
/// Any `Fn(Vec<String>, DataBag, Scope) -> impl Future<Output = Result<String, HandlerError>>`
/// closure implements this trait.
#[async_trait]
pub trait Function: Send + Sync {
    async fn call(&self, args: Vec<String>, data: DataBag, scope: Scope) -> Result<String, HandlerError>;
}

#[async_trait]
impl<F, Fut> Function for F
where
    F: Fn(Vec<String>, DataBag, Scope) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, HandlerError>> + Send + 'static,
{
    async fn call(&self, args: Vec<String>, data: DataBag, scope: Scope) -> Result<String, HandlerError> {
        (self)(args, data, scope).await
    }
}

/// Lower-cased name → handler.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    fns: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under `name`, replacing any previous handler.
    pub fn insert(&mut self, name: &str, func: Arc<dyn Function>) {
        self.fns.insert(name.to_ascii_lowercase(), func);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.fns.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("names", &self.names())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
