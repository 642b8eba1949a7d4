//! # backdrop
//!
//! A small HTTP backend for front-end work: placeholder text, SVG
//! placeholder images, and sample JSON, behind one router.
//!
//! Every request passes through [`middleware::RequestLogger`], which logs a
//! `started` line, runs the rest of the pipeline through a
//! [`middleware::StatusRecorder`], and logs a `completed with` line whose
//! level follows the response status: ERROR for 5xx, WARN for 4xx, INFO
//! otherwise.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use backdrop::middleware::{Cors, RequestLogger};
//! use backdrop::{Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), backdrop::Error> {
//!     let logger = backdrop::logger::build("info", Default::default())?;
//!
//!     let app = Router::new()
//!         .layer(RequestLogger::new(logger.clone()))
//!         .layer(Cors::permissive())
//!         .get("/users/{id}", get_user);
//!
//!     Server::bind("0.0.0.0:3000").await?.logger(logger).serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;
mod writer;

pub mod compose;
pub mod config;
pub mod handlers;
pub mod logger;
pub mod middleware;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{App, Module, Router};
pub use server::Server;
pub use writer::{ResponseBuffer, ResponseWriter};
