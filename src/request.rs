//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};

/// An incoming HTTP request with its body fully read.
pub struct Request {
    head: Parts,
    body: Bytes,
    remote_addr: SocketAddr,
    body_error: Option<String>,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    /// Assembles a request from the parts hyper hands over.
    pub fn from_parts(head: Parts, body: Bytes, remote_addr: SocketAddr) -> Self {
        Self { head, body, remote_addr, body_error: None, params: HashMap::new() }
    }

    /// A request whose body could not be read off the connection.
    ///
    /// The body is empty and the pipeline still runs; the router answers it
    /// with `400` instead of looking up a route.
    pub fn unreadable(head: Parts, remote_addr: SocketAddr, error: impl std::fmt::Display) -> Self {
        Self {
            body_error: Some(error.to_string()),
            ..Self::from_parts(head, Bytes::new(), remote_addr)
        }
    }

    pub fn method(&self) -> &Method { &self.head.method }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> SocketAddr { self.remote_addr }

    /// Why the body is missing, for a request built with [`Request::unreadable`].
    pub fn body_error(&self) -> Option<&str> { self.body_error.as_deref() }

    /// Header value as a string. Missing or non-ASCII values yield `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the first value of a query-string parameter, undecoded.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.head.uri.query()?
            .split('&')
            .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}
