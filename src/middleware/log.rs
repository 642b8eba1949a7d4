//! Per-request logging.
//!
//! Every request yields exactly two lines on the logger: `started …` at
//! INFO before the downstream handler runs, and `completed with …` once it
//! has finished, at a level picked from the response status.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use http::{Method, StatusCode, Uri};
use tokio::time::Instant;
use tracing::{Dispatch, Level};

use super::Middleware;
use super::recorder::StatusRecorder;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::writer::ResponseWriter;

/// Log level of a completion line, bucketed from the status code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    /// `>= 500` is an error, `400..=499` a warning, anything else info.
    pub fn from_code(code: u16) -> Self {
        match code {
            500.. => Self::Error,
            400..=499 => Self::Warn,
            _ => Self::Info,
        }
    }

}

impl From<StatusCode> for Severity {
    fn from(status: StatusCode) -> Self {
        Self::from_code(status.as_u16())
    }
}

/// How the downstream handler returned control.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Outcome {
    Completed,
    Panicked,
    TimedOut,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Panicked => "panicked",
            Self::TimedOut => "timed out",
        }
    }
}

/// Middleware that logs the start and completion of every request.
///
/// Lines go to the [`Dispatch`] given at construction, never to the global
/// default. With a [`timeout`](Self::timeout) set, a handler still running
/// when it elapses is dropped and the request is answered `504`.
#[derive(Clone)]
pub struct RequestLogger {
    logger: Dispatch,
    timeout: Option<Duration>,
}

impl RequestLogger {
    pub fn new(logger: Dispatch) -> Self {
        Self { logger, timeout: None }
    }

    /// Per-request deadline for the downstream handler.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }
}

impl Middleware for RequestLogger {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(Logged {
            next,
            logger: self.logger.clone(),
            timeout: self.timeout,
        })
    }
}

struct Logged {
    next: BoxedHandler,
    logger: Dispatch,
    timeout: Option<Duration>,
}

impl ErasedHandler for Logged {
    fn call<'a>(&'a self, req: Request, w: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        Box::pin(async move {
            let start = Instant::now();
            let mut recorder = StatusRecorder::new(w);

            let line = Completion {
                remote_addr: req.remote_addr().to_string(),
                method: req.method().clone(),
                uri: req.uri().clone(),
                status: StatusCode::OK,
                elapsed: Duration::ZERO,
                outcome: Outcome::Completed,
                panic: None,
            };
            line.started(&self.logger);

            let run = AssertUnwindSafe(self.next.call(req, &mut recorder)).catch_unwind();
            let finished = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, run).await.ok(),
                None => Some(run.await),
            };
            let (outcome, panic) = match finished {
                Some(Ok(())) => (Outcome::Completed, None),
                Some(Err(payload)) => (Outcome::Panicked, Some(panic_message(payload.as_ref()))),
                None => (Outcome::TimedOut, None),
            };

            let forced = match outcome {
                Outcome::Completed => None,
                Outcome::Panicked => Some(StatusCode::INTERNAL_SERVER_ERROR),
                Outcome::TimedOut => Some(StatusCode::GATEWAY_TIMEOUT),
            };
            if let Some(status) = forced.filter(|_| !recorder.is_committed()) {
                recorder.write_header(status);
                recorder.write(status.canonical_reason().unwrap_or_default().as_bytes());
            }

            Completion {
                status: recorder.status(),
                elapsed: start.elapsed(),
                outcome,
                panic,
                ..line
            }
            .completed(&self.logger);
        })
    }
}

/// Text of a `panic!` payload; non-string payloads have none to give.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// One request's log record. Built, emitted, dropped.
struct Completion {
    remote_addr: String,
    method: Method,
    uri: Uri,
    status: StatusCode,
    elapsed: Duration,
    outcome: Outcome,
    panic: Option<String>,
}

// `tracing` wants the level of an event as a constant, so the completion
// line is spelled out once per severity through this macro.
macro_rules! completion_event {
    ($level:expr, $line:ident, $reason:ident) => {
        tracing::event!(
            $level,
            remote_addr = %$line.remote_addr,
            method = %$line.method,
            uri = %$line.uri,
            status = $line.status.as_u16(),
            status_text = $reason,
            elapsed_us = u64::try_from($line.elapsed.as_micros()).unwrap_or(u64::MAX),
            outcome = $line.outcome.as_str(),
            panic = $line.panic.as_deref(),
            "completed with {} {} in {:?}",
            $line.status.as_u16(),
            $reason,
            $line.elapsed,
        )
    };
}

impl Completion {
    fn started(&self, logger: &Dispatch) {
        tracing::dispatcher::with_default(logger, || {
            tracing::info!(
                remote_addr = %self.remote_addr,
                method = %self.method,
                uri = %self.uri,
                "started {} {}",
                self.method,
                self.uri,
            );
        });
    }

    fn completed(&self, logger: &Dispatch) {
        let reason = self.status.canonical_reason().unwrap_or_default();
        tracing::dispatcher::with_default(logger, || match Severity::from(self.status) {
            Severity::Info => completion_event!(Level::INFO, self, reason),
            Severity::Warn => completion_event!(Level::WARN, self, reason),
            Severity::Error => completion_event!(Level::ERROR, self, reason),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;

    use super::*;
    use crate::testing::Capture;
    use crate::{Response, ResponseBuffer, Router};

    fn request(method: Method, uri: &str) -> Request {
        let (head, ()) = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        Request::from_parts(head, Bytes::new(), "10.0.0.7:40100".parse().unwrap())
    }

    fn get(uri: &str) -> Request {
        request(Method::GET, uri)
    }

    async fn not_found(_req: Request) -> Response {
        Response::builder().status(StatusCode::NOT_FOUND).text("not found")
    }

    async fn unavailable(_req: Request) -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }

    async fn body_only(_req: Request) -> &'static str {
        "hello"
    }

    async fn slow(_req: Request) -> &'static str {
        tokio::time::sleep(Duration::from_millis(50)).await;
        "slow"
    }

    async fn hung(_req: Request) -> &'static str {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        "never"
    }

    async fn explode(_req: Request) -> Response {
        panic!("handler exploded")
    }

    fn app(capture: &Capture) -> crate::App {
        Router::new()
            .layer(RequestLogger::new(capture.dispatch()))
            .get("/missing", not_found)
            .get("/down", unavailable)
            .get("/hello", body_only)
            .get("/slow", slow)
            .get("/explode", explode)
            .into_app()
    }

    #[test]
    fn severity_boundaries() {
        assert_eq!(Severity::from_code(0), Severity::Info);
        assert_eq!(Severity::from_code(200), Severity::Info);
        assert_eq!(Severity::from_code(399), Severity::Info);
        assert_eq!(Severity::from_code(400), Severity::Warn);
        assert_eq!(Severity::from_code(404), Severity::Warn);
        assert_eq!(Severity::from_code(499), Severity::Warn);
        assert_eq!(Severity::from_code(500), Severity::Error);
        assert_eq!(Severity::from_code(599), Severity::Error);
        assert_eq!(Severity::from_code(u16::MAX), Severity::Error);
    }

    #[test]
    fn severity_from_status() {
        assert_eq!(Severity::from(StatusCode::NOT_FOUND), Severity::Warn);
        assert_eq!(Severity::from(StatusCode::INTERNAL_SERVER_ERROR), Severity::Error);
        assert_eq!(Severity::from(StatusCode::FOUND), Severity::Info);
    }

    #[test]
    fn panic_messages() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("formatted 7")), "formatted 7");
        assert_eq!(panic_message(&42u8), "non-string panic payload");
    }

    #[test]
    fn severity_ladder_is_monotonic() {
        for code in 0..=999u16 {
            let expected = if code >= 500 {
                Severity::Error
            } else if code >= 400 {
                Severity::Warn
            } else {
                Severity::Info
            };
            assert_eq!(Severity::from_code(code), expected, "code {code}");
        }
    }

    #[tokio::test]
    async fn not_found_logs_a_warning() {
        let capture = Capture::default();
        let res = app(&capture).handle(get("/missing")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let events = capture.events();
        assert_eq!(events.len(), 2);
        let done = &events[1];
        assert_eq!(done.level, Level::WARN);
        assert_eq!(done.field("status"), "404");
        assert_eq!(done.field("status_text"), "Not Found");
        assert!(done.message.starts_with("completed with 404 Not Found in "));
    }

    #[tokio::test]
    async fn unavailable_logs_an_error() {
        let capture = Capture::default();
        app(&capture).handle(get("/down")).await;

        let done = capture.last();
        assert_eq!(done.level, Level::ERROR);
        assert_eq!(done.field("status"), "503");
    }

    #[tokio::test]
    async fn implicit_status_logs_ok_at_info() {
        let capture = Capture::default();
        let res = app(&capture).handle(get("/hello")).await;
        assert_eq!(res.status(), StatusCode::OK);

        let done = capture.last();
        assert_eq!(done.level, Level::INFO);
        assert_eq!(done.field("status"), "200");
        assert_eq!(done.field("status_text"), "OK");
        assert_eq!(done.field("outcome"), "completed");
    }

    #[tokio::test]
    async fn start_line_precedes_completion() {
        let capture = Capture::default();
        app(&capture).handle(request(Method::POST, "/hello?x=1")).await;

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, Level::INFO);
        assert_eq!(events[0].message, "started POST /hello?x=1");
        assert_eq!(events[0].field("remote_addr"), "10.0.0.7:40100");
        assert!(events[1].message.starts_with("completed with 405"));
        assert_eq!(events[1].field("remote_addr"), "10.0.0.7:40100");
    }

    #[tokio::test]
    async fn unrouted_requests_are_logged() {
        let capture = Capture::default();
        app(&capture).handle(get("/nowhere")).await;

        let done = capture.last();
        assert_eq!(done.level, Level::WARN);
        assert_eq!(done.field("status"), "404");
    }

    #[tokio::test]
    async fn elapsed_covers_the_handler() {
        let capture = Capture::default();
        app(&capture).handle(get("/slow")).await;

        let elapsed: u64 = capture.last().field("elapsed_us").parse().unwrap();
        assert!(elapsed >= 50_000, "elapsed {elapsed}us");
    }

    #[tokio::test]
    async fn panic_is_logged_as_server_error() {
        let capture = Capture::default();
        let res = app(&capture).handle(get("/explode")).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].level, Level::ERROR);
        assert_eq!(events[1].field("status"), "500");
        assert_eq!(events[1].field("outcome"), "panicked");
        assert_eq!(events[1].field("panic"), "handler exploded");
    }

    #[tokio::test]
    async fn completed_requests_carry_no_panic_field() {
        let capture = Capture::default();
        app(&capture).handle(get("/hello")).await;
        assert!(!capture.last().fields.contains_key("panic"));
    }

    /// Commits `202 Accepted` up front, then misbehaves.
    enum CommitsThen {
        Panics,
        Hangs,
    }

    impl ErasedHandler for CommitsThen {
        fn call<'a>(&'a self, _req: Request, w: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
            Box::pin(async move {
                w.write_header(StatusCode::ACCEPTED);
                w.write(b"queued");
                match self {
                    Self::Panics => panic!("after commit"),
                    Self::Hangs => tokio::time::sleep(Duration::from_secs(3600)).await,
                }
            })
        }
    }

    async fn run_committed(capture: &Capture, handler: CommitsThen) -> ResponseBuffer {
        let logged = RequestLogger::new(capture.dispatch())
            .timeout(Duration::from_millis(20))
            .wrap(Arc::new(handler));
        let mut sink = ResponseBuffer::new();
        logged.call(get("/committed"), &mut sink).await;
        sink
    }

    #[tokio::test]
    async fn panic_after_commit_keeps_the_status() {
        let capture = Capture::default();
        let sink = run_committed(&capture, CommitsThen::Panics).await;
        assert_eq!(sink.status(), Some(StatusCode::ACCEPTED));
        assert_eq!(sink.body(), b"queued");

        let done = capture.last();
        assert_eq!(done.level, Level::INFO);
        assert_eq!(done.field("status"), "202");
        assert_eq!(done.field("outcome"), "panicked");
        assert_eq!(done.field("panic"), "after commit");
    }

    #[tokio::test]
    async fn deadline_after_commit_keeps_the_status() {
        let capture = Capture::default();
        let sink = run_committed(&capture, CommitsThen::Hangs).await;
        assert_eq!(sink.status(), Some(StatusCode::ACCEPTED));
        assert_eq!(sink.body(), b"queued");

        let done = capture.last();
        assert_eq!(done.level, Level::INFO);
        assert_eq!(done.field("status"), "202");
        assert_eq!(done.field("outcome"), "timed out");
    }

    #[tokio::test]
    async fn deadline_forces_gateway_timeout() {
        let capture = Capture::default();
        let app = Router::new()
            .layer(RequestLogger::new(capture.dispatch()).timeout(Duration::from_millis(20)))
            .get("/hung", hung)
            .into_app();

        let res = app.handle(get("/hung")).await;
        assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);

        let done = capture.last();
        assert_eq!(done.level, Level::ERROR);
        assert_eq!(done.field("status"), "504");
        assert_eq!(done.field("outcome"), "timed out");
    }

    #[tokio::test]
    async fn deadline_leaves_fast_handlers_alone() {
        let capture = Capture::default();
        let app = Router::new()
            .layer(RequestLogger::new(capture.dispatch()).timeout(Duration::from_secs(5)))
            .get("/hello", body_only)
            .into_app();

        assert_eq!(app.handle(get("/hello")).await.status(), StatusCode::OK);
        assert_eq!(capture.last().field("outcome"), "completed");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_do_not_share_status() {
        let capture = Capture::default();
        let app = Arc::new(
            Router::new()
                .layer(RequestLogger::new(capture.dispatch()))
                .get("/r/{n}", |req: Request| async move {
                    let n: u32 = req.param("n").and_then(|n| n.parse().ok()).unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(u64::from(n % 7))).await;
                    if n % 2 == 0 {
                        Response::builder().status(StatusCode::NOT_FOUND).text("not found")
                    } else {
                        Response::text("ok")
                    }
                })
                .into_app(),
        );

        let mut tasks = tokio::task::JoinSet::new();
        for n in 0..100u32 {
            let app = Arc::clone(&app);
            tasks.spawn(async move { (n, app.handle(get(&format!("/r/{n}"))).await.status()) });
        }
        while let Some(joined) = tasks.join_next().await {
            let (n, status) = joined.unwrap();
            let expected = if n % 2 == 0 { StatusCode::NOT_FOUND } else { StatusCode::OK };
            assert_eq!(status, expected, "request {n}");
        }

        let completions: HashMap<String, String> = capture
            .events()
            .into_iter()
            .filter(|e| e.message.starts_with("completed"))
            .map(|e| (e.field("uri").to_owned(), e.field("status").to_owned()))
            .collect();
        assert_eq!(completions.len(), 100);
        for n in 0..100u32 {
            let expected = if n % 2 == 0 { "404" } else { "200" };
            assert_eq!(completions[&format!("/r/{n}")], expected, "request {n}");
        }
    }
}
