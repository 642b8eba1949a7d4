//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. Immediately stops `listener.accept()` — no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, debug, error, info};

use crate::error::Error;
use crate::request::Request;
use crate::router::{App, Router};

/// The HTTP server.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    logger: Dispatch,
}

impl Server {
    /// Binds the listening socket.
    ///
    /// `addr` is a `host:port` string; a bare `:port` listens on every
    /// interface. Until [`logger`](Server::logger) is called the server logs
    /// to whatever dispatcher is the default at bind time.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # async fn run() -> Result<(), backdrop::Error> {
    /// use backdrop::Server;
    /// let server = Server::bind("0.0.0.0:3000").await?;
    /// # Ok(()) }
    /// ```
    pub async fn bind(addr: &str) -> Result<Self, Error> {
        let target = match addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => addr.to_owned(),
        };
        let listener = TcpListener::bind(&target)
            .await
            .map_err(|source| Error::Bind { addr: addr.to_owned(), source })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            logger: tracing::dispatcher::get_default(Dispatch::clone),
        })
    }

    /// Sets the logger for server lifecycle and connection lines.
    pub fn logger(mut self, logger: Dispatch) -> Self {
        self.logger = logger;
        self
    }

    /// The address actually bound (useful after binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops accepting when `signal`
    /// resolves instead of waiting for a process signal.
    pub async fn serve_with_shutdown<F>(self, router: Router, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send,
    {
        let logger = self.logger.clone();
        self.run(Arc::new(router.into_app()), signal)
            .with_subscriber(logger)
            .await
    }

    async fn run<F>(self, app: Arc<App>, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send,
    {
        info!(addr = %self.local_addr, "starting server on http://{}/", self.local_addr);

        // Every spawned connection task is tracked so shutdown can wait for
        // them all.
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting at once,
                // even with connections queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = self.listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let logger = self.logger.clone();
                    let io = TokioIo::new(stream);

                    let connection = async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            dispatch(app, req, remote_addr).with_subscriber(logger.clone())
                        });

                        // HTTP/1.1 or HTTP/2, whichever the client speaks.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    };
                    tasks.spawn(connection.with_subscriber(self.logger.clone()));
                }

                // Reap finished tasks so the set does not grow without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("server stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Reads the body and runs one request through the pipeline.
///
/// Never fails toward hyper: a body that cannot be read still goes through
/// the pipeline, which answers it `400`.
async fn dispatch(
    app: Arc<App>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (head, body) = req.into_parts();
    let req = match body.collect().await {
        Ok(collected) => Request::from_parts(head, collected.to_bytes(), remote_addr),
        Err(e) => {
            debug!(peer = %remote_addr, "failed to read request body: {e}");
            Request::unreadable(head, remote_addr, e)
        }
    };

    Ok(app.handle(req).await)
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (only Ctrl-C on Windows).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
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
