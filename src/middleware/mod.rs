//! Built-in middleware.
//!
//! Both are plain handlers: register them with
//! [`Router::middleware`](crate::Router::middleware) or on a single route with
//! [`Route::with`](crate::Route::with).
//!
//! - [`trace`]: per-request span with method and path; logs status and
//!   latency when the chain returns
//! - [`recover`]: turns a panic anywhere later in the chain into a `500`
//!
//! Register `recover` after `trace` so the access line still sees the 500.

mod recover;
mod trace;

pub use recover::recover;
pub use trace::trace;
