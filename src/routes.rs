//! Route composition.
//!
//! A resource declares its routes statically as [`RouteDefinition`]s. At
//! bootstrap, [`compose_routes`] resolves handler and middleware names and
//! drops every route gated on a bond type that is not bonded, yielding the
//! mountable [`MountedRoute`]s in declaration order.

use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use http::Method;

use crate::bond::BondType;
use crate::error::{KitResult, RouteConfigurationError};
use crate::handler::{Handler, HandlerMap, Middleware, MiddlewareMap, Request, Response};
use crate::registry::BondSnapshot;

/// Declarative route of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    pub method: Method,
    /// Path pattern; `:name` segments bind path parameters.
    pub path: String,
    /// Middleware names, run in order before the handler.
    pub middleware: Vec<String>,
    pub handler: String,
    /// Route exists only while this bond type is bonded.
    pub optional_bond: Option<BondType>,
}

impl RouteDefinition {
    pub fn new(method: Method, path: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            middleware: Vec::new(),
            handler: handler.into(),
            optional_bond: None,
        }
    }

    pub fn get(path: impl Into<String>, handler: impl Into<String>) -> Self {
        Self::new(Method::GET, path, handler)
    }

    pub fn post(path: impl Into<String>, handler: impl Into<String>) -> Self {
        Self::new(Method::POST, path, handler)
    }

    pub fn put(path: impl Into<String>, handler: impl Into<String>) -> Self {
        Self::new(Method::PUT, path, handler)
    }

    pub fn patch(path: impl Into<String>, handler: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path, handler)
    }

    pub fn delete(path: impl Into<String>, handler: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path, handler)
    }

    /// Append a middleware name.
    pub fn with_middleware(mut self, name: impl Into<String>) -> Self {
        self.middleware.push(name.into());
        self
    }

    /// Gate the route on `bond_type` being bonded.
    pub fn requires_bond(mut self, bond_type: BondType) -> Self {
        self.optional_bond = Some(bond_type);
        self
    }
}

/// A route with every name resolved, ready to mount.
#[derive(Clone)]
pub struct MountedRoute {
    pub method: Method,
    pub path: String,
    pub middlewares: Vec<Arc<dyn Middleware>>,
    pub handler: Arc<dyn Handler>,
}

impl MountedRoute {
    /// Run the middlewares in order, then the handler.
    ///
    /// Each middleware receives the request as the previous one passed it on.
    /// The first `Break` short-circuits the chain.
    pub async fn dispatch(&self, mut request: Request) -> KitResult<Option<Response>> {
        for middleware in &self.middlewares {
            match middleware.call(request).await? {
                ControlFlow::Continue(next) => request = next,
                ControlFlow::Break(response) => return Ok(Some(response)),
            }
        }
        self.handler.handle(request).await
    }

    /// Match `path` against this route's pattern, returning bound parameters.
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let mut pattern = self.path.trim_matches('/').split('/');
        let mut actual = path.trim_matches('/').split('/');
        let mut params = HashMap::new();
        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return Some(params),
                (Some(expected), Some(segment)) => {
                    if let Some(name) = expected.strip_prefix(':') {
                        if segment.is_empty() {
                            return None;
                        }
                        params.insert(name.to_string(), segment.to_string());
                    } else if expected != segment {
                        return None;
                    }
                }
                _ => return None,
            }
        }
    }
}

impl fmt::Debug for MountedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedRoute")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// Resolve `definitions` against the handler and middleware maps.
///
/// Routes whose `optional_bond` is absent from `snapshot` are dropped before
/// their names are resolved, so an uninstalled package does not need to supply
/// handlers for them. An unknown name on a kept route fails immediately.
pub fn compose_routes(
    definitions: &[RouteDefinition],
    handlers: &HandlerMap,
    middlewares: &MiddlewareMap,
    snapshot: &BondSnapshot,
) -> Result<Vec<MountedRoute>, RouteConfigurationError> {
    let mut routes = Vec::with_capacity(definitions.len());

    for definition in definitions {
        if let Some(bond_type) = &definition.optional_bond {
            if !snapshot.is_bonded(bond_type.as_str()) {
                tracing::debug!(
                    method = %definition.method,
                    path = %definition.path,
                    %bond_type,
                    "route pruned"
                );
                continue;
            }
        }

        let handler = handlers.get(&definition.handler).cloned().ok_or_else(|| {
            RouteConfigurationError::UnknownHandler {
                method: definition.method.clone(),
                path: definition.path.clone(),
                name: definition.handler.clone(),
            }
        })?;

        let resolved = definition
            .middleware
            .iter()
            .map(|name| {
                middlewares.get(name).cloned().ok_or_else(|| {
                    RouteConfigurationError::UnknownMiddleware {
                        method: definition.method.clone(),
                        path: definition.path.clone(),
                        name: name.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        routes.push(MountedRoute {
            method: definition.method.clone(),
            path: definition.path.clone(),
            middlewares: resolved,
            handler,
        });
    }

    Ok(routes)
}

/// Ordered table of mounted routes.
///
/// Matching follows mount order, so earlier routes get the first chance at
/// overlapping patterns. A route that answers `Ok(None)` defers to the next
/// matching one.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<MountedRoute>,
}

impl RouteTable {
    pub fn new(routes: Vec<MountedRoute>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[MountedRoute] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// `(method, path)` of every route, in mount order.
    pub fn listing(&self) -> Vec<(Method, String)> {
        self.routes
            .iter()
            .map(|route| (route.method.clone(), route.path.clone()))
            .collect()
    }

    pub fn extend(&mut self, routes: impl IntoIterator<Item = MountedRoute>) {
        self.routes.extend(routes);
    }

    /// Dispatch to the matching routes in order until one answers.
    ///
    /// Every attempt starts from the original request, so bindings and
    /// middleware changes from a deferring route do not leak into the next.
    /// `Ok(None)` when no route answers.
    pub async fn dispatch(&self, request: Request) -> KitResult<Option<Response>> {
        for route in &self.routes {
            if route.method != request.method {
                continue;
            }
            let Some(params) = route.match_path(&request.path) else {
                continue;
            };

            let mut attempt = request.clone();
            attempt.params.extend(params);
            if let Some(response) = route.dispatch(attempt).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::types;
    use crate::handler::{handler_fn, middleware_fn};
    use http::StatusCode;
    use serde_json::json;

    fn named(tag: &'static str) -> Arc<dyn Handler> {
        handler_fn(move |req: Request| async move {
            Ok(Some(Response::ok(json!({ "tag": tag, "params": req.params }))))
        })
    }

    fn pass() -> Arc<dyn Middleware> {
        middleware_fn(|req: Request| async move { Ok(ControlFlow::Continue(req)) })
    }

    fn deny() -> Arc<dyn Middleware> {
        middleware_fn(|_req: Request| async {
            Ok(ControlFlow::Break(Response::error(
                StatusCode::UNAUTHORIZED,
                "errors.unauthorized",
                "Unauthorized",
                &[],
            )))
        })
    }

    fn handlers() -> HandlerMap {
        HandlerMap::from([
            ("list".to_string(), named("list")),
            ("read".to_string(), named("read")),
            ("checkout".to_string(), named("checkout")),
        ])
    }

    fn middlewares() -> MiddlewareMap {
        MiddlewareMap::from([("pass".to_string(), pass()), ("deny".to_string(), deny())])
    }

    fn definitions() -> Vec<RouteDefinition> {
        vec![
            RouteDefinition::get("/widgets", "list"),
            RouteDefinition::post("/widgets/:id/checkout", "checkout").requires_bond(types::PAYMENTS),
        ]
    }

    #[test]
    fn test_prunes_unbonded_optional_route() {
        let routes = compose_routes(&definitions(), &handlers(), &middlewares(), &BondSnapshot::default()).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/widgets");

        let snapshot: BondSnapshot = [types::PAYMENTS].into_iter().collect();
        let routes = compose_routes(&definitions(), &handlers(), &middlewares(), &snapshot).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[1].path, "/widgets/:id/checkout");
    }

    #[test]
    fn test_gated_routes_prune_together() {
        let definitions = vec![
            RouteDefinition::post("/pay", "checkout").requires_bond(types::PAYMENTS),
            RouteDefinition::get("/widgets", "list"),
            RouteDefinition::get("/pay/:id", "read").requires_bond(types::PAYMENTS),
        ];
        let routes = compose_routes(&definitions, &handlers(), &middlewares(), &BondSnapshot::default()).unwrap();
        let paths: Vec<_> = routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/widgets"]);
    }

    #[test]
    fn test_empty_definitions() {
        let routes = compose_routes(&[], &HandlerMap::new(), &MiddlewareMap::new(), &BondSnapshot::default()).unwrap();
        assert!(routes.is_empty());
    }

    #[test]
    fn test_unknown_names_fail() {
        let definitions = vec![RouteDefinition::get("/x", "missing")];
        let err = compose_routes(&definitions, &handlers(), &middlewares(), &BondSnapshot::default()).unwrap_err();
        assert_eq!(
            err,
            RouteConfigurationError::UnknownHandler {
                method: Method::GET,
                path: "/x".into(),
                name: "missing".into()
            }
        );

        let definitions = vec![RouteDefinition::get("/x", "list").with_middleware("auth")];
        let err = compose_routes(&definitions, &handlers(), &middlewares(), &BondSnapshot::default()).unwrap_err();
        assert!(matches!(err, RouteConfigurationError::UnknownMiddleware { name, .. } if name == "auth"));
    }

    #[test]
    fn test_pruned_routes_are_not_resolved() {
        // The OAuth package would supply `oauth_callback`; it is not installed.
        let definitions = vec![
            RouteDefinition::get("/widgets", "list"),
            RouteDefinition::get("/oauth/callback", "oauth_callback").requires_bond(types::OAUTH),
        ];
        let routes = compose_routes(&definitions, &handlers(), &middlewares(), &BondSnapshot::default()).unwrap();
        assert_eq!(routes.len(), 1);

        let snapshot: BondSnapshot = [types::OAUTH].into_iter().collect();
        let err = compose_routes(&definitions, &handlers(), &middlewares(), &snapshot).unwrap_err();
        assert!(matches!(err, RouteConfigurationError::UnknownHandler { .. }));
    }

    #[test]
    fn test_match_path() {
        let route = MountedRoute {
            method: Method::GET,
            path: "/widgets/:id".into(),
            middlewares: vec![],
            handler: named("read"),
        };
        let params = route.match_path("/widgets/42").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert!(route.match_path("/widgets").is_none());
        assert!(route.match_path("/widgets/42/extra").is_none());
        assert!(route.match_path("/gadgets/42").is_none());
    }

    #[tokio::test]
    async fn test_middleware_chain() {
        let definitions = vec![
            RouteDefinition::get("/open", "list").with_middleware("pass"),
            RouteDefinition::get("/closed", "list").with_middleware("pass").with_middleware("deny"),
        ];
        let routes = compose_routes(&definitions, &handlers(), &middlewares(), &BondSnapshot::default()).unwrap();
        let table = RouteTable::new(routes);

        let open = table.dispatch(Request::new(Method::GET, "/open")).await.unwrap().unwrap();
        assert_eq!(open.body["tag"], "list");

        let closed = table.dispatch(Request::new(Method::GET, "/closed")).await.unwrap().unwrap();
        assert_eq!(closed.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_table_dispatch_binds_params_in_order() {
        let definitions = vec![
            RouteDefinition::get("/widgets/featured", "list"),
            RouteDefinition::get("/widgets/:id", "read"),
        ];
        let routes = compose_routes(&definitions, &handlers(), &middlewares(), &BondSnapshot::default()).unwrap();
        let table = RouteTable::new(routes);

        let featured = table.dispatch(Request::new(Method::GET, "/widgets/featured")).await.unwrap().unwrap();
        assert_eq!(featured.body["tag"], "list");

        let read = table.dispatch(Request::new(Method::GET, "/widgets/7")).await.unwrap().unwrap();
        assert_eq!(read.body, json!({"tag": "read", "params": {"id": "7"}}));

        assert!(table.dispatch(Request::new(Method::POST, "/widgets/7")).await.unwrap().is_none());
        assert_eq!(
            table.listing(),
            vec![
                (Method::GET, "/widgets/featured".to_string()),
                (Method::GET, "/widgets/:id".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_middleware_changes_reach_handler() {
        let tagger = middleware_fn(|req: Request| async move {
            Ok(ControlFlow::Continue(req.with_param("tenant", "acme")))
        });
        let middlewares = MiddlewareMap::from([("tenant".to_string(), tagger)]);
        let definitions = vec![RouteDefinition::get("/widgets", "list").with_middleware("tenant")];
        let routes = compose_routes(&definitions, &handlers(), &middlewares, &BondSnapshot::default()).unwrap();

        let response = RouteTable::new(routes)
            .dispatch(Request::new(Method::GET, "/widgets"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.body["params"], json!({"tenant": "acme"}));
    }

    #[tokio::test]
    async fn test_deferring_route_falls_through() {
        let first = handler_fn(|_req: Request| async { Ok(None) });
        let handlers = HandlerMap::from([("first".to_string(), first), ("second".to_string(), named("second"))]);
        let tagger = middleware_fn(|req: Request| async move {
            Ok(ControlFlow::Continue(req.with_param("seen", "first")))
        });
        let middlewares = MiddlewareMap::from([("tag".to_string(), tagger)]);
        let definitions = vec![
            RouteDefinition::get("/w/:id", "first").with_middleware("tag"),
            RouteDefinition::get("/w/:key", "second"),
        ];
        let routes = compose_routes(&definitions, &handlers, &middlewares, &BondSnapshot::default()).unwrap();
        let table = RouteTable::new(routes);

        let response = table.dispatch(Request::new(Method::GET, "/w/1")).await.unwrap().unwrap();
        // Only the second route's bindings are visible.
        assert_eq!(response.body, json!({"tag": "second", "params": {"key": "1"}}));
    }

    #[tokio::test]
    async fn test_all_routes_defer() {
        let first = handler_fn(|_req: Request| async { Ok(None) });
        let handlers = HandlerMap::from([("first".to_string(), first)]);
        let definitions = vec![RouteDefinition::get("/w/:id", "first")];
        let routes = compose_routes(&definitions, &handlers, &middlewares(), &BondSnapshot::default()).unwrap();

        let response = RouteTable::new(routes).dispatch(Request::new(Method::GET, "/w/1")).await.unwrap();
        assert!(response.is_none());
    }
}
