//! Radix-tree request router and pipeline composition.
//!
//! One tree per HTTP method. O(path-length) lookup. Middleware layers wrap
//! the router's own dispatch when the table is frozen into an [`App`].

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{ALLOW, HeaderValue};
use http::{Method, StatusCode};
use http_body_util::Full;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use crate::writer::{ResponseBuffer, ResponseWriter};

/// A group of routes that registers itself on a [`Router`].
///
/// Each content module owns its paths and methods; the router does not
/// arbitrate between modules beyond rejecting conflicting paths.
pub trait Module {
    fn register(&self, router: Router) -> Router;
}

/// The application router.
///
/// Build it once at startup, then freeze it with [`Router::into_app`] (or
/// hand it to [`Server::serve`](crate::Server::serve), which does that for
/// you). Every builder method returns `self` so registrations chain.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    layers: Vec<Box<dyn Middleware>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), layers: Vec::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use backdrop::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn delete_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::DELETE, "/users/{id}", delete_user)
    ///     .on(Method::GET,    "/users/{id}", get_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is malformed or conflicts with a route already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    /// Add a middleware around everything registered so far and later.
    /// The first layer added runs outermost.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(Box::new(middleware));
        self
    }

    /// Let a content module register its routes.
    pub fn mount(self, module: &impl Module) -> Self {
        module.register(self)
    }

    /// Freezes the routing table and composes the middleware pipeline.
    pub fn into_app(self) -> App {
        let mut handler: BoxedHandler = Arc::new(Dispatch { routes: self.routes });
        for layer in self.layers.iter().rev() {
            handler = layer.wrap(handler);
        }
        App { handler }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// Innermost pipeline step: route lookup.
///
/// A request whose body failed to read is answered `400` here, under every
/// layer, so it is logged and decorated like any other response.
struct Dispatch {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Dispatch {
    fn lookup(&self, method: &Method, path: &str) -> Option<(&BoxedHandler, HashMap<String, String>)> {
        let matched = self.routes.get(method)?.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((matched.value, params))
    }

    /// Methods with a route matching `path`, in a stable order.
    fn allowed(&self, path: &str) -> Vec<&Method> {
        let mut methods: Vec<&Method> = self.routes.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(method, _)| method)
            .collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }
}

impl ErasedHandler for Dispatch {
    fn call<'a>(&'a self, mut req: Request, w: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        if req.body_error().is_some() {
            Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .text("failed to read request body")
                .write_to(w);
            return Box::pin(std::future::ready(()));
        }

        if let Some((handler, params)) = self.lookup(req.method(), req.uri().path()) {
            req.params = params;
            return handler.call(req, w);
        }

        let allowed = self.allowed(req.uri().path());
        let response = if allowed.is_empty() {
            Response::builder().status(StatusCode::NOT_FOUND).text("404 page not found")
        } else {
            let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
            let mut builder = Response::builder().status(StatusCode::METHOD_NOT_ALLOWED);
            if let Ok(value) = HeaderValue::from_str(&allow) {
                builder = builder.header(ALLOW, value);
            }
            builder.no_body()
        };
        response.write_to(w);
        Box::pin(std::future::ready(()))
    }
}

/// A frozen router with its middleware pipeline composed.
///
/// Cheap to share behind an `Arc`; the table is never written again.
pub struct App {
    handler: BoxedHandler,
}

impl App {
    /// Runs one request through the pipeline into a fresh response buffer.
    pub async fn handle(&self, req: Request) -> http::Response<Full<Bytes>> {
        let mut sink = ResponseBuffer::new();
        self.handler.call(req, &mut sink).await;
        sink.into_response()
    }
}
