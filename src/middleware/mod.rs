//! Middleware layer.
//!
//! A middleware turns the rest of the pipeline into a new pipeline step: it
//! receives the next handler and returns a handler that runs around it.
//! Layers are registered on the [`Router`](crate::Router); the first one
//! registered is the outermost, so it sees the request first and the
//! response last.
//!
//! Built in:
//! - [`RequestLogger`] — start and completion lines for every request, with
//!   the status captured through a [`StatusRecorder`]
//! - [`Cors`] — fixed allow-any-origin policy

mod cors;
mod log;
mod recorder;

pub use cors::Cors;
pub use log::{RequestLogger, Severity};
pub use recorder::StatusRecorder;

use crate::handler::BoxedHandler;

/// Wraps the next step of the pipeline.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}
