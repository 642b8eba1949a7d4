//! Placeholder text.

use http::StatusCode;

use crate::{Module, Request, Response, Router};

const LOREM: &str = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod \
    tempor incididunt ut labore et dolore magna aliqua ut enim ad minim veniam quis nostrud \
    exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat duis aute irure dolor \
    in reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur excepteur \
    sint occaecat cupidatat non proident sunt in culpa qui officia deserunt mollit anim id est \
    laborum";

const MAX_WORDS: usize = 10_000;

/// Lorem-ipsum text of a requested length.
pub struct Text;

impl Module for Text {
    fn register(&self, router: Router) -> Router {
        router
            .get("/text", paragraph)
            .get("/text/{words}", words)
    }
}

async fn paragraph(_req: Request) -> Response {
    Response::text(lorem(LOREM.split(' ').count()))
}

async fn words(req: Request) -> Response {
    match req.param("words").and_then(|n| n.parse::<usize>().ok()) {
        Some(n @ 1..=MAX_WORDS) => Response::text(lorem(n)),
        _ => Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .text(format!("word count must be between 1 and {MAX_WORDS}")),
    }
}

/// `count` words cycling through the lorem text, capitalised and closed
/// with a full stop.
fn lorem(count: usize) -> String {
    let mut out = LOREM.split(' ').cycle().take(count).collect::<Vec<_>>().join(" ");
    if let Some(first) = out.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    out.push('.');
    out
}
