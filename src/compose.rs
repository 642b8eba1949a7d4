//! The application's routing table.

use tracing::Dispatch;

use crate::config::Config;
use crate::handlers::{Image, Json, Text};
use crate::middleware::{Cors, RequestLogger};
use crate::router::Router;

/// Request logging, then the CORS policy, then the content modules.
///
/// Logging runs outermost so its timing and status cover everything the
/// policy and the modules do, preflights and 404s included.
pub fn router(config: &Config, logger: &Dispatch) -> Router {
    let mut logging = RequestLogger::new(logger.clone());
    if let Some(limit) = config.request_timeout() {
        logging = logging.timeout(limit);
    }

    Router::new()
        .layer(logging)
        .layer(Cors::permissive())
        .mount(&Text)
        .mount(&Image)
        .mount(&Json)
}
