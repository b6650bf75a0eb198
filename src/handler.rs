//! Handler trait and type erasure.
//!
//! # One contract for everything
//!
//! Endpoints, route wrappers ([`Route::with`](crate::Route::with)) and
//! router middleware ([`Router::middleware`](crate::Router::middleware)) are
//! all the same thing: something that takes the request [`Context`] and
//! returns a future. What makes a handler "middleware" is only that it calls
//! [`Context::next`] somewhere in its body.
//!
//! ```text
//! fn hello(ctx: &mut Context) -> BoxFuture<'_> { … }   ← user writes this
//!        ↓ router.get("/", hello)
//! Arc::new(hello)                                      ← BoxedHandler
//!        ↓ cloned into Context::handlers per request
//! handler.call(ctx).await                              ← one vtable call
//! ```
//!
//! The future borrows the context mutably for as long as it runs, so the
//! chain is strictly sequential inside one request. State that must cross
//! into spawned tasks goes through [`SharedState`](crate::SharedState).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;

/// A heap-allocated, type-erased future borrowed from the request context.
///
/// `Send` so the whole chain can run on any tokio worker thread.
pub type BoxFuture<'a, T = ()> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A step in a request's handler chain.
///
/// Implemented automatically for every function or closure with the shape
/// `for<'a> Fn(&'a mut Context) -> BoxFuture<'a>`:
///
/// ```rust
/// use burrow::{BoxFuture, Context};
///
/// fn hello(ctx: &mut Context) -> BoxFuture<'_> {
///     Box::pin(async move {
///         ctx.response_mut().text("hello");
///     })
/// }
/// ```
///
/// Implement it by hand for middleware that carries configuration.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a> {
        (self)(ctx)
    }
}

/// A type-erased handler shared by the route table and every request that
/// matches it. Cloning is one atomic increment.
pub(crate) type BoxedHandler = Arc<dyn Handler>;

/// Pins down the higher-ranked signature of a closure handler.
///
/// Closures cannot name the lifetime that ties their argument to the returned
/// future, so `|ctx| Box::pin(async move { … })` only type-checks when the
/// compiler is told the expected shape up front:
///
/// ```rust
/// use burrow::{Router, handler_fn};
///
/// let greeting = String::from("hi");
/// let mut router = Router::new();
/// router.get("/", handler_fn(move |ctx| {
///     let greeting = greeting.clone();
///     Box::pin(async move { ctx.response_mut().text(&greeting); })
/// }));
/// ```
pub fn handler_fn<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static,
{
    f
}

pub(crate) fn boxed(handler: impl Handler) -> BoxedHandler {
    Arc::new(handler)
}
