//! Error types.
//!
//! Three kinds of failure exist and only two of them are values:
//!
//! - [`RouteError`]: a route table that cannot be built. The registration
//!   surface turns these into panics: a bad pattern is a programmer error and
//!   should stop the process before it serves a single request.
//! - [`Error`]: the server could not bind or accept.
//! - [`BoxError`]: whatever a handler records through
//!   [`Context::error`](crate::Context::error).
//!
//! Not-found and method-not-allowed are neither; they are dispatch outcomes.

/// Any error a handler wants to surface to downstream presentation logic.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Serving failures returned by [`Server::serve`](crate::Server::serve).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Reasons a route, group or mount cannot be added to a [`Router`](crate::Router).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("segment `{0}` is not valid")]
    InvalidSegment(String),

    #[error("pattern must start with `/`")]
    MissingLeadingSlash,

    #[error("catch-all `{0}` must be the last segment")]
    CatchAllNotLast(String),

    #[error("group and mount prefixes may only contain literal segments, found `{0}`")]
    WildcardPrefix(String),

    #[error("`{existing}` and `{new}` cannot share one position")]
    WildcardConflict { existing: String, new: String },

    #[error("method `{0}` is already routed")]
    DuplicateMethod(String),

    #[error("method `ALL` cannot be mixed with specific methods")]
    MixedAll,

    #[error("no methods given")]
    NoMethods,

    #[error("a router is already mounted at `{0}`")]
    AlreadyMounted(String),

    #[error("routes already exist under `{0}`")]
    Occupied(String),

    #[error("cannot mount at the root; use `group(\"/\", ..)` to merge")]
    MountRoot,

    #[error("two {0} handlers for one scope")]
    DuplicateTerminal(&'static str),
}
