//! Sample JSON documents.

use http::StatusCode;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{IntoResponse, Module, Request, Response, Router};

const NAMES: &[&str] = &["alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi"];

/// `GET /json`, `GET /json/users/{id}`, `POST /json/echo`
pub struct Json;

impl Module for Json {
    fn register(&self, router: Router) -> Router {
        router
            .get("/json", sample)
            .get("/json/users/{id}", user)
            .post("/json/echo", echo)
    }
}

/// A serialisable value sent as `application/json`.
struct Body<T>(T);

impl<T: Serialize> IntoResponse for Body<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => Response::json(bytes),
            Err(_) => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

#[derive(Debug, Serialize)]
struct User {
    id: u64,
    name: &'static str,
    email: String,
    active: bool,
}

impl User {
    fn generate(id: u64) -> Self {
        let name = NAMES[(id % NAMES.len() as u64) as usize];
        Self {
            id,
            name,
            email: format!("{name}{id}@example.com"),
            active: id % 3 != 0,
        }
    }
}

async fn sample(_req: Request) -> Body<Value> {
    let users: Vec<User> = (1..=3).map(User::generate).collect();
    Body(json!({
        "status": "ok",
        "count": users.len(),
        "users": users,
    }))
}

async fn user(req: Request) -> Response {
    match req.param("id").and_then(|id| id.parse::<u64>().ok()) {
        Some(id) => Body(User::generate(id)).into_response(),
        None => error(StatusCode::BAD_REQUEST, "user id must be a non-negative integer"),
    }
}

async fn echo(req: Request) -> Response {
    match serde_json::from_slice::<Value>(req.body()) {
        Ok(value) => Body(value).into_response(),
        Err(e) => error(StatusCode::BAD_REQUEST, &format!("invalid JSON: {e}")),
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    let body = json!({ "error": message }).to_string();
    Response::builder().status(status).json(body)
}
