//! Dispatch entrypoint: one request in, one response out.
//!
//! ```text
//! http::Request<Bytes>
//!        ↓ pool.acquire          (reset context)
//! router.resolve(method, path)  (scoped middleware + trie search)
//!        ↓
//! Chain             → ctx.next()
//! MethodNotAllowed  → status 405, optional handler
//! NotFound          → status 404, optional handler
//!        ↓ response.flush        (exactly once)
//! pool.release                  (reset again, park)
//! ```

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;

use crate::pool::{ContextPool, DEFAULT_CAPACITY};
use crate::request::Request;
use crate::router::{Resolution, Router};

/// Runs requests through a [`Router`] using pooled contexts.
///
/// Use this to embed the router behind any HTTP stack that yields
/// `http::Request`s; [`Server`](crate::Server) is one such stack.
///
/// ```rust
/// # async fn demo() {
/// use burrow::{BoxFuture, Context, Dispatcher, Router};
///
/// fn hello(ctx: &mut Context) -> BoxFuture<'_> {
///     Box::pin(async move { ctx.response_mut().text("hello"); })
/// }
///
/// let mut router = Router::new();
/// router.get("/", hello);
/// let dispatcher = Dispatcher::new(router);
///
/// let req = http::Request::get("/").body(bytes::Bytes::new()).unwrap();
/// let res = dispatcher.dispatch(req).await;
/// assert_eq!(res.status(), http::StatusCode::OK);
/// # }
/// ```
pub struct Dispatcher {
    router: Router,
    pool: ContextPool,
}

impl Dispatcher {
    pub fn new(router: Router) -> Self {
        Self::with_pool_capacity(router, DEFAULT_CAPACITY)
    }

    /// Keeps at most `capacity` idle contexts between requests.
    pub fn with_pool_capacity(router: Router, capacity: usize) -> Self {
        Self { router, pool: ContextPool::new(capacity) }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn dispatch(&self, req: http::Request<Bytes>) -> http::Response<Full<Bytes>> {
        let mut ctx = self.pool.acquire(Request::new(req));

        let resolution = self.router.resolve(ctx.request().method(), ctx.request().path());
        match resolution {
            Resolution::Chain { handlers, params } => {
                ctx.prepare(params, handlers);
                ctx.next().await;
            }
            Resolution::MethodNotAllowed(handler) => {
                ctx.response_mut().set_status(StatusCode::METHOD_NOT_ALLOWED);
                if let Some(handler) = handler {
                    handler.call(&mut ctx).await;
                }
            }
            Resolution::NotFound(handler) => {
                ctx.response_mut().set_status(StatusCode::NOT_FOUND);
                if let Some(handler) = handler {
                    handler.call(&mut ctx).await;
                }
            }
        }

        let response = ctx.response_mut().flush().unwrap_or_default();
        self.pool.release(ctx);
        response
    }
}
