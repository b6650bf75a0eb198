//! Free list of request contexts.
//!
//! Acquire resets, release resets again and parks the context for the next
//! request. Resetting on both sides means a context never carries handler
//! `Arc`s, bodies or shared state past the request that filled it, and a
//! context fresh out of the list is always clean.

use parking_lot::Mutex;

use crate::context::Context;
use crate::request::Request;

pub(crate) const DEFAULT_CAPACITY: usize = 1024;

pub(crate) struct ContextPool {
    free: Mutex<Vec<Context>>,
    capacity: usize,
}

impl ContextPool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { free: Mutex::new(Vec::new()), capacity }
    }

    pub(crate) fn acquire(&self, request: Request) -> Context {
        let idle = self.free.lock().pop();
        match idle {
            Some(mut ctx) => {
                ctx.reset(request);
                ctx
            }
            None => Context::new(request),
        }
    }

    /// Returns `ctx` to the list, or drops it when the list is full.
    pub(crate) fn release(&self, mut ctx: Context) {
        ctx.reset(Request::default());
        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(ctx);
        }
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BoxFuture, boxed};

    fn noop(_: &mut Context) -> BoxFuture<'_> {
        Box::pin(async {})
    }

    #[test]
    fn reacquired_context_is_clean() {
        let pool = ContextPool::new(4);

        let mut ctx = pool.acquire(Request::default());
        ctx.prepare([("id".to_owned(), "42".to_owned())].into(), [boxed(noop), boxed(noop)]);
        ctx.cursor = 1;
        ctx.error("stale");
        ctx.set("user", String::from("ada"));
        ctx.response_mut().text("old body");
        pool.release(ctx);
        assert_eq!(pool.idle(), 1);

        let ctx = pool.acquire(Request::default());
        assert_eq!(pool.idle(), 0);
        assert!(ctx.params().is_empty());
        assert!(ctx.handlers.is_empty());
        assert_eq!(ctx.cursor, -1);
        assert!(ctx.err().is_none());
        assert!(ctx.get::<String>("user").is_none());
        assert!(ctx.response().body().is_empty());
    }

    #[test]
    fn capacity_bounds_idle_contexts() {
        let pool = ContextPool::new(1);
        let a = pool.acquire(Request::default());
        let b = pool.acquire(Request::default());
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.idle(), 1);
    }
}
