//! Route table.
//!
//! A [`Router`] owns a segment trie plus a tree of child routers keyed by
//! path segment. The trie answers "which handlers does this path run"; the
//! child routers answer "which middleware wraps this path". Grouping or
//! mounting a router grafts its routes into the parent's trie at the prefix
//! and keeps the router itself as a child, so its middleware stays scoped to
//! that prefix.
//!
//! Build the table once at startup, then hand it to a
//! [`Dispatcher`](crate::Dispatcher) or [`Server`](crate::Server). Nothing
//! mutates it afterwards, so any number of requests may read it at once.
//!
//! Registration mistakes (bad patterns, duplicate methods, conflicting
//! wildcards, double mounts) panic immediately: they are bugs in the program,
//! not conditions to handle at request time.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::{debug, trace};

use crate::error::RouteError;
use crate::handler::{BoxedHandler, Handler, boxed};
use crate::method::{Method, Slot};
use crate::trie::{self, Node, Params};

/// The application router.
///
/// ```rust
/// use burrow::{BoxFuture, Context, Router};
///
/// fn list(ctx: &mut Context) -> BoxFuture<'_> {
///     Box::pin(async move { ctx.response_mut().json(b"[]"); })
/// }
/// fn show(ctx: &mut Context) -> BoxFuture<'_> {
///     Box::pin(async move {
///         let id = ctx.param("id").unwrap_or_default().to_owned();
///         ctx.response_mut().text(&id);
///     })
/// }
///
/// let mut router = Router::new();
/// router.group("/users", |r| {
///     r.get("/", list);
///     r.get("/:id", show);
/// });
/// ```
#[derive(Default)]
pub struct Router {
    trie: Node,
    sub: HashMap<String, Router>,
    middlewares: Vec<BoxedHandler>,
    not_found: Option<BoxedHandler>,
    method_not_allowed: Option<BoxedHandler>,
}

/// Handle to a route that was just registered.
pub struct Route<'r> {
    node: &'r mut Node,
    slots: Vec<Slot>,
}

impl Route<'_> {
    /// Wraps the route's handlers in `middleware`.
    ///
    /// The middleware runs before everything already registered on this
    /// route, so `.with(a).with(b)` runs `b`, then `a`, then the endpoint.
    pub fn with(self, middleware: impl Handler) -> Self {
        let middleware = boxed(middleware);
        self.node.prepend(&self.slots, &middleware);
        self
    }
}

/// Handle to a router produced by [`Router::group`].
pub struct Scope<'r> {
    router: &'r mut Router,
}

impl Scope<'_> {
    /// Adds middleware to the grouped router, i.e. to every route under the
    /// group's prefix.
    pub fn middleware(self, middleware: impl Handler) -> Self {
        self.router.middleware(middleware);
        self
    }
}

/// What dispatch should do with a request.
pub(crate) enum Resolution {
    /// Run `handlers` (scoped middleware, then the route's own chain).
    Chain { handlers: Vec<BoxedHandler>, params: Params },
    /// The path exists but not for this method.
    MethodNotAllowed(Option<BoxedHandler>),
    NotFound(Option<BoxedHandler>),
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Registers `handler` for one method.
    pub fn on(&mut self, method: Method, pattern: &str, handler: impl Handler) -> Route<'_> {
        self.add(vec![Slot::Exact(method)], pattern, handler)
    }

    pub fn get(&mut self, pattern: &str, handler: impl Handler) -> Route<'_> {
        self.on(Method::Get, pattern, handler)
    }

    pub fn post(&mut self, pattern: &str, handler: impl Handler) -> Route<'_> {
        self.on(Method::Post, pattern, handler)
    }

    pub fn put(&mut self, pattern: &str, handler: impl Handler) -> Route<'_> {
        self.on(Method::Put, pattern, handler)
    }

    pub fn delete(&mut self, pattern: &str, handler: impl Handler) -> Route<'_> {
        self.on(Method::Delete, pattern, handler)
    }

    pub fn patch(&mut self, pattern: &str, handler: impl Handler) -> Route<'_> {
        self.on(Method::Patch, pattern, handler)
    }

    pub fn head(&mut self, pattern: &str, handler: impl Handler) -> Route<'_> {
        self.on(Method::Head, pattern, handler)
    }

    pub fn options(&mut self, pattern: &str, handler: impl Handler) -> Route<'_> {
        self.on(Method::Options, pattern, handler)
    }

    /// Registers one handler for a set of methods.
    pub fn handle(&mut self, pattern: &str, methods: &[Method], handler: impl Handler) -> Route<'_> {
        let slots = methods.iter().copied().map(Slot::Exact).collect();
        self.add(slots, pattern, handler)
    }

    /// Registers `handler` for every method. A route is either `any` or a set
    /// of specific methods; mixing the two panics.
    pub fn any(&mut self, pattern: &str, handler: impl Handler) -> Route<'_> {
        self.add(vec![Slot::Any], pattern, handler)
    }

    fn add(&mut self, slots: Vec<Slot>, pattern: &str, handler: impl Handler) -> Route<'_> {
        let node = self
            .trie
            .insert(pattern, &slots, boxed(handler))
            .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));
        debug!(pattern, methods = %join(&slots), "route registered");
        Route { node, slots }
    }

    /// Appends middleware run for every request under this router.
    pub fn middleware(&mut self, middleware: impl Handler) -> &mut Self {
        self.middlewares.push(boxed(middleware));
        self
    }

    /// Handler for paths no route matches. The status is already 404 when it
    /// runs.
    pub fn not_found(&mut self, handler: impl Handler) -> &mut Self {
        self.not_found = Some(boxed(handler));
        self
    }

    /// Handler for known paths requested with an unrouted method. The status
    /// is already 405 when it runs.
    pub fn method_not_allowed(&mut self, handler: impl Handler) -> &mut Self {
        self.method_not_allowed = Some(boxed(handler));
        self
    }

    // ── Composition ──────────────────────────────────────────────────────────

    /// Builds a router with `build` and merges it under `prefix`.
    ///
    /// `/` flattens the built router into this one. Deeper prefixes create
    /// intermediate routers as needed; when a router already sits at the
    /// prefix, both are unioned (routes, middleware, child routers). Any route
    /// defined on both sides panics rather than silently picking one.
    pub fn group(&mut self, prefix: &str, build: impl FnOnce(&mut Router)) -> Scope<'_> {
        let mut sub = Router::new();
        build(&mut sub);
        let router = self
            .merge(prefix, sub)
            .unwrap_or_else(|e| panic!("invalid group `{prefix}`: {e}"));
        Scope { router }
    }

    fn merge(&mut self, prefix: &str, mut sub: Router) -> Result<&mut Router, RouteError> {
        let segments = trie::parse_prefix(prefix)?;
        let routes = std::mem::take(&mut sub.trie);
        self.trie.literal_path_mut(&segments).merge(routes)?;

        let mut target = self;
        for segment in &segments {
            target = target.sub.entry((*segment).to_owned()).or_default();
        }
        target.absorb(sub)?;
        debug!(prefix, "group merged");
        Ok(target)
    }

    /// Unions everything but the trie of `other` into `self`.
    fn absorb(&mut self, other: Router) -> Result<(), RouteError> {
        self.middlewares.extend(other.middlewares);
        self.not_found = either(self.not_found.take(), other.not_found, "not-found")?;
        self.method_not_allowed = either(
            self.method_not_allowed.take(),
            other.method_not_allowed,
            "method-not-allowed",
        )?;

        for (key, child) in other.sub {
            match self.sub.entry(key) {
                Entry::Occupied(entry) => entry.into_mut().absorb(child)?,
                Entry::Vacant(entry) => {
                    entry.insert(child);
                }
            }
        }
        Ok(())
    }

    /// Attaches an already built router at `prefix`.
    ///
    /// Unlike [`group`](Self::group) this never merges: it panics if a router
    /// is already mounted at `prefix` or routes already exist below it.
    pub fn mount(&mut self, prefix: &str, router: Router) -> &mut Self {
        self.attach(prefix, router)
            .unwrap_or_else(|e| panic!("invalid mount `{prefix}`: {e}"));
        self
    }

    fn attach(&mut self, prefix: &str, mut router: Router) -> Result<(), RouteError> {
        let segments = trie::parse_prefix(prefix)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(RouteError::MountRoot);
        };

        let mounted = segments
            .iter()
            .try_fold(&*self, |r, segment| r.sub.get(*segment))
            .is_some();
        if mounted {
            return Err(RouteError::AlreadyMounted(prefix.to_owned()));
        }
        if self.trie.literal_path(&segments).is_some_and(|node| !node.is_empty()) {
            return Err(RouteError::Occupied(prefix.to_owned()));
        }

        let routes = std::mem::take(&mut router.trie);
        self.trie.literal_path_mut(&segments).merge(routes)?;

        let mut target = self;
        for segment in parents {
            target = target.sub.entry((*segment).to_owned()).or_default();
        }
        target.sub.insert((*last).to_owned(), router);
        debug!(prefix, "router mounted");
        Ok(())
    }

    // ── Lookup ───────────────────────────────────────────────────────────────

    /// Resolves a request into the chain to run or a terminal outcome.
    ///
    /// Middleware is collected from this router down through every child
    /// router whose key is the next segment of `path`, outer to inner. The
    /// innermost router with a not-found / method-not-allowed handler
    /// provides it.
    pub(crate) fn resolve(&self, method: &http::Method, path: &str) -> Resolution {
        let mut chain = Vec::new();
        let mut not_found = None;
        let mut method_not_allowed = None;

        let mut router = self;
        let mut rest = path;
        loop {
            chain.extend(router.middlewares.iter().cloned());
            not_found = router.not_found.as_ref().or(not_found);
            method_not_allowed = router.method_not_allowed.as_ref().or(method_not_allowed);

            let Some(tail) = rest.strip_prefix('/') else { break };
            let (segment, remainder) = tail.find('/').map_or((tail, ""), |i| tail.split_at(i));
            match router.sub.get(segment) {
                Some(child) => {
                    router = child;
                    rest = remainder;
                }
                None => break,
            }
        }

        let lookup = self.trie.search(Method::from_http(method), path);
        if !lookup.matched {
            trace!(%method, path, "no route");
            return Resolution::NotFound(not_found.cloned());
        }
        if lookup.handlers.is_empty() {
            trace!(%method, path, "method not allowed");
            return Resolution::MethodNotAllowed(method_not_allowed.cloned());
        }

        chain.extend(lookup.handlers.iter().cloned());
        Resolution::Chain { handlers: chain, params: lookup.params }
    }
}

/// Keeps whichever side is set; both set is a conflict.
fn either(
    current: Option<BoxedHandler>,
    incoming: Option<BoxedHandler>,
    what: &'static str,
) -> Result<Option<BoxedHandler>, RouteError> {
    match (current, incoming) {
        (Some(_), Some(_)) => Err(RouteError::DuplicateTerminal(what)),
        (current, incoming) => Ok(current.or(incoming)),
    }
}

fn join(slots: &[Slot]) -> String {
    slots.iter().map(Slot::to_string).collect::<Vec<_>>().join(",")
}
