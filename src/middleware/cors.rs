//! Cross-origin resource sharing.
//!
//! The policy is fixed: any origin may call any route. Preflights are
//! answered here and never reach the router.

use std::sync::Arc;

use http::header::{
    ACCEPT, ACCEPT_LANGUAGE, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
    CONTENT_LANGUAGE, CONTENT_TYPE, HeaderName, HeaderValue, ORIGIN,
};
use http::{Method, StatusCode};

use super::Middleware;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::writer::ResponseWriter;

static ALLOWED_METHODS: &[Method] = &[Method::GET, Method::HEAD, Method::POST];

static ALLOWED_HEADERS: &[HeaderName] = &[ACCEPT, ACCEPT_LANGUAGE, CONTENT_LANGUAGE, CONTENT_TYPE, ORIGIN];

/// Allow-any-origin CORS policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cors {
    _private: (),
}

impl Cors {
    pub fn permissive() -> Self {
        Self::default()
    }
}

impl Middleware for Cors {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(CorsHandler { next })
    }
}

struct CorsHandler {
    next: BoxedHandler,
}

impl ErasedHandler for CorsHandler {
    fn call<'a>(&'a self, req: Request, w: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        w.headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));

        if !is_preflight(&req) {
            return self.next.call(req, w);
        }

        let status = preflight(&req, w);
        w.write_header(status);
        Box::pin(std::future::ready(()))
    }
}

fn is_preflight(req: &Request) -> bool {
    req.method() == Method::OPTIONS
        && req.headers().contains_key(ORIGIN)
        && req.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD)
}

/// Checks a preflight and fills in the allow headers. Returns the status to
/// answer with.
fn preflight(req: &Request, w: &mut dyn ResponseWriter) -> StatusCode {
    let requested = req
        .header(ACCESS_CONTROL_REQUEST_METHOD.as_str())
        .and_then(|m| m.parse::<Method>().ok());
    let Some(method) = requested.filter(|m| ALLOWED_METHODS.contains(m)) else {
        return StatusCode::METHOD_NOT_ALLOWED;
    };

    let requested_headers: Vec<&str> = req
        .headers()
        .get_all(ACCESS_CONTROL_REQUEST_HEADERS)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .collect();
    let all_allowed = requested_headers
        .iter()
        .all(|h| ALLOWED_HEADERS.iter().any(|allowed| allowed.as_str().eq_ignore_ascii_case(h)));
    if !all_allowed {
        return StatusCode::FORBIDDEN;
    }

    let headers = w.headers_mut();
    if let Ok(value) = HeaderValue::from_str(method.as_str()) {
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    if !requested_headers.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&requested_headers.join(", ")) {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, value);
        }
    }
    StatusCode::OK
}
