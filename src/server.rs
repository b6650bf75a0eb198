//! HTTP server and graceful shutdown.
//!
//! The server is a thin shell: hyper parses HTTP/1.1 and HTTP/2, the body is
//! buffered, and the parsed request goes to a [`Dispatcher`]. Routing, the
//! handler chain and context pooling all live there.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **Ctrl-C** the server stops accepting connections, lets
//! in-flight requests finish, closes idle keep-alive connections, then
//! returns from [`Server::serve`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::pool::DEFAULT_CAPACITY;
use crate::router::Router;

/// The HTTP server.
///
/// ```rust,no_run
/// use burrow::{Router, Server};
///
/// # async fn run() -> Result<(), burrow::Error> {
/// Server::bind("0.0.0.0:3000")
///     .pool_capacity(4096)
///     .serve(Router::new())
///     .await
/// # }
/// ```
pub struct Server {
    addr: String,
    pool_capacity: usize,
}

impl Server {
    /// Configures the address to listen on when [`serve`](Server::serve) is
    /// called. The address is parsed there.
    pub fn bind(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), pool_capacity: DEFAULT_CAPACITY }
    }

    /// Maximum number of idle request contexts kept for reuse.
    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns after a full graceful shutdown, or immediately if the address
    /// is invalid or cannot be bound.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but shuts down when `signal` resolves
    /// instead of on SIGTERM / Ctrl-C.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let addr: SocketAddr = self.addr.parse().map_err(|source| Error::Addr {
            addr: self.addr.clone(),
            source,
        })?;
        let listener = TcpListener::bind(addr).await?;
        let dispatcher = Arc::new(Dispatcher::with_pool_capacity(router, self.pool_capacity));

        info!(%addr, "burrow listening");
        run(listener, dispatcher, signal).await;
        info!("burrow stopped");
        Ok(())
    }
}

/// Accept loop. Returns once `signal` fired and every connection closed.
async fn run(listener: TcpListener, dispatcher: Arc<Dispatcher>, signal: impl Future<Output = ()>) {
    let builder = ConnBuilder::new(TokioExecutor::new());
    // Tells idle keep-alive connections to close once the signal fires.
    let graceful = GracefulShutdown::new();
    let mut tasks = tokio::task::JoinSet::new();

    tokio::pin!(signal);

    loop {
        tokio::select! {
            // Check shutdown first so a signal stops accepting at once.
            biased;

            () = &mut signal => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let dispatcher = Arc::clone(&dispatcher);
                // Called once per request on the connection.
                let svc = service_fn(move |req| {
                    let dispatcher = Arc::clone(&dispatcher);
                    async move { handle(&dispatcher, req).await }
                });
                let conn = builder.serve_connection(TokioIo::new(stream), svc).into_owned();
                let conn = graceful.watch(conn);

                tasks.spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // Reap finished tasks so the set does not grow without bound.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    drop(listener);
    graceful.shutdown().await;
    while tasks.join_next().await.is_some() {}
}

/// Buffers the body and hands the request to the dispatcher.
///
/// Infallible: a body that cannot be read is answered with `400`.
async fn handle(
    dispatcher: &Dispatcher,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(path = parts.uri.path(), "failed to read request body: {e}");
            let mut res = http::Response::new(Full::default());
            *res.status_mut() = http::StatusCode::BAD_REQUEST;
            return Ok(res);
        }
    };

    Ok(dispatcher.dispatch(http::Request::from_parts(parts, body)).await)
}

/// Resolves on the first shutdown signal the process receives.
///
/// SIGTERM (sent by orchestrators) and SIGINT on Unix; Ctrl-C elsewhere.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    use super::*;
    use crate::context::Context;
    use crate::handler::BoxFuture;

    fn hi(ctx: &mut Context) -> BoxFuture<'_> {
        Box::pin(async move {
            ctx.response_mut().text("hi");
        })
    }

    #[tokio::test]
    async fn invalid_address_is_an_error() {
        let err = Server::bind("not-an-address").serve(Router::new()).await.unwrap_err();
        assert!(matches!(err, Error::Addr { ref addr, .. } if addr == "not-an-address"));
    }

    #[tokio::test]
    async fn shutdown_closes_idle_keep_alive_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut router = Router::new();
        router.get("/", hi);

        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(run(listener, Arc::new(Dispatcher::new(router)), async move {
            let _ = stopped.await;
        }));

        // One request, then the connection stays open and idle.
        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET / HTTP/1.1\r\nhost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut received = Vec::new();
        let mut buf = [0_u8; 512];
        while !received.ends_with(b"hi") {
            let n = client.read(&mut buf).await.unwrap();
            assert_ne!(n, 0, "connection closed before the response");
            received.extend_from_slice(&buf[..n]);
        }
        assert!(received.starts_with(b"HTTP/1.1 200 OK"));

        stop.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(3), server)
            .await
            .expect("server kept running with an idle connection open")
            .unwrap();

        // The server closed its side.
        assert!(matches!(client.read(&mut buf).await, Ok(0) | Err(_)));
    }
}
