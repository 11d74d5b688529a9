//! Framework-agnostic request/response shapes and the handler contract.
//!
//! A one-line adapter is enough to mount a [`Handler`] on any request
//! dispatch system: build a [`Request`], await `handle`, and write back the
//! [`Response`]. `Ok(None)` means "not handled, defer to the next route".
//!
//! A [`Middleware`] runs before the handler and either passes the request on,
//! possibly enriched, or answers it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{FieldError, KitResult};
use crate::storage::Row;

/// Incoming request as seen by handlers.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Path parameters bound by the route table (`:id` → `params["id"]`).
    pub params: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Value,
    /// Row already loaded by an earlier step (e.g. authorization).
    pub props: Option<Row>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: HashMap::new(),
            headers: HashMap::new(),
            body: Value::Null,
            props: None,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_props(mut self, props: Row) -> Self {
        self.props = Some(props);
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Outgoing response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// Public error payload. Carries a localization key, never internal detail.
#[derive(Debug, Clone, Serialize)]
struct ErrorBody<'a> {
    key: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "no_fields")]
    fields: &'a [FieldError],
}

fn no_fields(fields: &&[FieldError]) -> bool {
    fields.is_empty()
}

impl Response {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn created(body: Value) -> Self {
        Self::new(StatusCode::CREATED, body)
    }

    /// `{ "props": row }`, the single-resource body shape.
    pub fn props(status: StatusCode, row: Row) -> Self {
        Self::new(status, json!({ "props": row }))
    }

    /// `{ "error": { key, message, fields? } }`.
    pub fn error(status: StatusCode, key: &str, message: &str, fields: &[FieldError]) -> Self {
        let error = ErrorBody { key, message, fields };
        Self::new(status, json!({ "error": error }))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The `error.key` of an error body, if this is one.
    pub fn error_key(&self) -> Option<&str> {
        self.body.pointer("/error/key").and_then(Value::as_str)
    }
}

/// Request handler.
///
/// Returning `Err` is reserved for fatal configuration failures such as a
/// missing required bond; request-level failures are responses.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: Request) -> KitResult<Option<Response>>;
}

/// Handler backed by an async closure. See [`handler_fn`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = KitResult<Option<Response>>> + Send + 'static,
{
    async fn handle(&self, request: Request) -> KitResult<Option<Response>> {
        (self.0)(request).await
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}

/// Wrap an async closure as a shared handler.
///
/// ```rust
/// use bondkit::{handler_fn, Request, Response};
/// use serde_json::json;
///
/// let health = handler_fn(|_req: Request| async {
///     Ok(Some(Response::ok(json!({ "status": "up" }))))
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = KitResult<Option<Response>>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Handlers by name.
pub type HandlerMap = HashMap<String, Arc<dyn Handler>>;

/// A step run before a route's handler.
///
/// `Continue(request)` hands the request, with any fields the step filled in
/// (such as `props`), to the next step. `Break(response)` answers it and
/// skips the rest of the chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn call(&self, request: Request) -> KitResult<ControlFlow<Response, Request>>;
}

/// Middleware backed by an async closure. See [`middleware_fn`].
pub struct FnMiddleware<F>(F);

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = KitResult<ControlFlow<Response, Request>>> + Send + 'static,
{
    async fn call(&self, request: Request) -> KitResult<ControlFlow<Response, Request>> {
        (self.0)(request).await
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnMiddleware")
    }
}

/// Wrap an async closure as a shared middleware.
///
/// ```rust
/// use bondkit::{middleware_fn, Request};
/// use std::ops::ControlFlow;
///
/// let tag = middleware_fn(|req: Request| async move {
///     Ok(ControlFlow::Continue(req.with_header("x-seen", "1")))
/// });
/// ```
pub fn middleware_fn<F, Fut>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = KitResult<ControlFlow<Response, Request>>> + Send + 'static,
{
    Arc::new(FnMiddleware(f))
}

/// Middlewares by name.
pub type MiddlewareMap = HashMap<String, Arc<dyn Middleware>>;
