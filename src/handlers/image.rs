//! Placeholder images, rendered as SVG.

use http::StatusCode;

use crate::{ContentType, Module, Request, Response, Router};

const MAX_SIDE: u32 = 4096;
const DEFAULT_BG: &str = "cccccc";
const DEFAULT_FG: &str = "555555";

/// `GET /img/{width}/{height}[?bg=rrggbb&fg=rrggbb]`
pub struct Image;

impl Module for Image {
    fn register(&self, router: Router) -> Router {
        router.get("/img/{width}/{height}", placeholder)
    }
}

async fn placeholder(req: Request) -> Response {
    let (Some(width), Some(height)) = (side(&req, "width"), side(&req, "height")) else {
        return Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .text(format!("width and height must be between 1 and {MAX_SIDE}"));
    };
    let (Some(bg), Some(fg)) = (colour(&req, "bg", DEFAULT_BG), colour(&req, "fg", DEFAULT_FG)) else {
        return Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .text("colours must be 3 or 6 hex digits");
    };

    Response::builder().bytes(ContentType::Svg, svg(width, height, bg, fg))
}

fn side(req: &Request, name: &str) -> Option<u32> {
    req.param(name)?
        .parse()
        .ok()
        .filter(|n| (1..=MAX_SIDE).contains(n))
}

/// Query colour, or `default` when absent. `None` means present but invalid.
fn colour<'r>(req: &'r Request, name: &str, default: &'r str) -> Option<&'r str> {
    let Some(value) = req.query(name) else {
        return Some(default);
    };
    let valid = matches!(value.len(), 3 | 6) && value.bytes().all(|b| b.is_ascii_hexdigit());
    valid.then_some(value)
}

fn svg(width: u32, height: u32, bg: &str, fg: &str) -> String {
    let font = (width.min(height) / 5).max(8);
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}"><rect width="100%" height="100%" fill="#{bg}"/><text x="50%" y="50%" fill="#{fg}" font-family="sans-serif" font-size="{font}" text-anchor="middle" dominant-baseline="middle">{width}×{height}</text></svg>"##
    )
}
