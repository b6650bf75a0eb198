//! Per-request execution context.
//!
//! # The chain
//!
//! Dispatch fills [`Context`] with the resolved chain (router middleware,
//! outer to inner, then the route's own handlers) and calls
//! [`next`](Context::next) once. Each handler runs with the context borrowed
//! mutably and may itself call `next`, which runs the rest of the chain and
//! returns; whatever follows that call runs on the way back out.
//!
//! ```text
//!  cursor: -1 ──next──▶ 0 mw_outer ──next──▶ 1 mw_inner ──▶ 2 endpoint
//!                         │ (after next)        │ (after next)  │
//!                         ◀─────────────────────◀───────────────┘
//! ```
//!
//! [`abort`](Context::abort) parks the cursor far past the end of the chain,
//! so every pending `next` loop falls out on its next bounds check. Handlers
//! already on the stack still finish; aborting is cooperative.

use std::error::Error as StdError;

use http::Extensions;

use crate::error::BoxError;
use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::Response;
use crate::state::SharedState;
use crate::trie::Params;

/// Cursor value that no chain can reach.
const ABORT_INDEX: isize = isize::MAX / 2;

/// State for one request as it moves through its handler chain.
///
/// Contexts are pooled and reused; every field is reset before a context is
/// handed to a new request.
pub struct Context {
    pub(crate) request: Request,
    pub(crate) response: Response,
    pub(crate) params: Params,
    pub(crate) handlers: Vec<BoxedHandler>,
    pub(crate) cursor: isize,
    pub(crate) error: Option<BoxError>,
    pub(crate) shared: Option<SharedState>,
    pub(crate) extensions: Extensions,
}

impl Context {
    /// A fresh context outside any pool, mainly for exercising handlers in
    /// tests.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::default(),
            params: Params::new(),
            handlers: Vec::new(),
            cursor: -1,
            error: None,
            shared: None,
            extensions: Extensions::new(),
        }
    }

    /// Clears everything left by a previous request and installs `request`.
    pub(crate) fn reset(&mut self, request: Request) {
        self.request = request;
        self.response.reset();
        self.params.clear();
        self.handlers.clear();
        self.cursor = -1;
        self.error = None;
        self.shared = None;
        self.extensions.clear();
    }

    /// Installs the matched parameters and the chain to run.
    pub(crate) fn prepare(
        &mut self,
        params: Params,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) {
        self.params = params;
        self.handlers.extend(handlers);
    }

    // ── Chain control ────────────────────────────────────────────────────────

    /// Runs the remaining handlers in order.
    ///
    /// Call it from middleware to hand control down the chain; it returns once
    /// every later handler has returned or the chain was aborted.
    pub fn next(&mut self) -> BoxFuture<'_> {
        Box::pin(async move {
            self.cursor += 1;
            while let Some(handler) = self.current() {
                handler.call(self).await;
                self.cursor += 1;
            }
        })
    }

    fn current(&self) -> Option<BoxedHandler> {
        let index = usize::try_from(self.cursor).ok()?;
        self.handlers.get(index).cloned()
    }

    /// Stops the chain: no handler after the current one will be called.
    pub fn abort(&mut self) {
        self.cursor = ABORT_INDEX;
    }

    pub fn is_aborted(&self) -> bool {
        self.cursor >= ABORT_INDEX
    }

    // ── Errors ───────────────────────────────────────────────────────────────

    /// Records `err` unless an error was already recorded. First write wins.
    pub fn error(&mut self, err: impl Into<BoxError>) {
        if self.error.is_none() {
            self.error = Some(err.into());
        }
    }

    /// The first error recorded for this request.
    pub fn err(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.error.as_deref()
    }

    // ── Request data ─────────────────────────────────────────────────────────

    /// A path parameter captured by `:name` or `*name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &Params { &self.params }
    pub fn request(&self) -> &Request { &self.request }
    pub fn response(&self) -> &Response { &self.response }
    pub fn response_mut(&mut self) -> &mut Response { &mut self.response }

    /// Typed scratch space for handlers of this request. Not synchronised;
    /// use [`shared`](Self::shared) for anything spawned tasks must see.
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    // ── Shared state ─────────────────────────────────────────────────────────

    /// Handle to this request's [`SharedState`]. Clone it into spawned tasks.
    pub fn shared(&mut self) -> &SharedState {
        self.shared.get_or_insert_with(SharedState::default)
    }

    pub fn set<T: std::any::Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.shared().set(key, value);
    }

    pub fn get<T: std::any::Any + Send + Sync>(&self, key: &str) -> Option<std::sync::Arc<T>> {
        self.shared.as_ref()?.get(key)
    }

    pub fn delete(&mut self, key: &str) -> bool {
        self.shared.as_ref().is_some_and(|state| state.delete(key))
    }
}
