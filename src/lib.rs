//! # burrow
//!
//! An embeddable HTTP router: a segment trie, composable middleware and
//! pooled request contexts. Run it behind the bundled hyper [`Server`] or
//! drive it from any HTTP stack through a [`Dispatcher`].
//!
//! ## Routing
//!
//! Patterns are split on `/` into segments. Each segment is a literal
//! (`users`), a named parameter (`:id`, exactly one non-empty segment) or a
//! catch-all (`*rest`, the remainder of the path, last segment only).
//! Literals always win over wildcards at the same position; the match never
//! backtracks.
//!
//! ## Handlers and middleware
//!
//! Endpoints and middleware share one shape, `fn(&mut Context) -> BoxFuture`.
//! A middleware calls [`Context::next`] to run the rest of the chain and can
//! act on the response afterwards; returning without calling it lets the
//! chain carry on; [`Context::abort`] stops it.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use burrow::{BoxFuture, Context, Router, Server, middleware};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), burrow::Error> {
//!     let mut app = Router::new();
//!     app.middleware(middleware::trace).middleware(middleware::recover);
//!
//!     app.group("/users", |r| {
//!         r.get("/:id", get_user);
//!         r.post("/", create_user);
//!     });
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! fn get_user(ctx: &mut Context) -> BoxFuture<'_> {
//!     Box::pin(async move {
//!         let body = format!(r#"{{"id":"{}"}}"#, ctx.param("id").unwrap_or_default());
//!         ctx.response_mut().json(body.as_bytes());
//!     })
//! }
//!
//! fn create_user(ctx: &mut Context) -> BoxFuture<'_> {
//!     Box::pin(async move {
//!         if ctx.request().body().is_empty() {
//!             ctx.response_mut().set_status(http::StatusCode::BAD_REQUEST);
//!             ctx.abort();
//!             return;
//!         }
//!         ctx.response_mut()
//!             .set_status(http::StatusCode::CREATED)
//!             .json(br#"{"id":"99"}"#);
//!     })
//! }
//! ```

mod context;
mod dispatch;
mod error;
mod handler;
mod method;
mod pool;
mod request;
mod response;
mod router;
mod server;
mod state;
mod trie;

pub mod middleware;

pub use context::Context;
pub use dispatch::Dispatcher;
pub use error::{BoxError, Error, RouteError};
pub use handler::{BoxFuture, Handler, handler_fn};
pub use method::Method;
pub use request::Request;
pub use response::{ContentType, Response};
pub use router::{Route, Router, Scope};
pub use server::Server;
pub use state::SharedState;
pub use trie::Params;
