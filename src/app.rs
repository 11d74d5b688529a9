//! Application bootstrap.
//!
//! Runs once, after every package has bonded its providers: builds each
//! resource's handler map, composes its routes against a single registry
//! snapshot and concatenates the results into the final [`RouteTable`].

use std::sync::Arc;

use crate::config::{Config, EngineConfig};
use crate::error::{KitError, KitResult};
use crate::handler::{Handler, HandlerMap, Middleware, MiddlewareMap};
use crate::registry::Registry;
use crate::resource::{ResourceDescriptor, ResourceEngine};
use crate::routes::{compose_routes, RouteDefinition, RouteTable};

/// A resource plus its static routes and any handlers beyond the CRUD five.
#[derive(Clone)]
pub struct ResourceModule {
    pub descriptor: Arc<ResourceDescriptor>,
    pub routes: Vec<RouteDefinition>,
    extra_handlers: HandlerMap,
}

impl ResourceModule {
    pub fn new(descriptor: ResourceDescriptor, routes: Vec<RouteDefinition>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            routes,
            extra_handlers: HandlerMap::new(),
        }
    }

    /// Register a custom handler. Overrides a generated one with the same name.
    pub fn handler(mut self, name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.extra_handlers.insert(name.into(), handler);
        self
    }
}

/// Builder for the route table of an application.
///
/// # Example
///
/// ```rust
/// use bondkit::{
///     keys, Application, FieldKind, MemoryStorage, ObjectSchema, Registry,
///     ResourceDescriptor, ResourceModule, RouteDefinition,
/// };
/// use std::sync::Arc;
///
/// let registry = Registry::new();
/// registry.bond(&keys::DATABASE, Arc::new(MemoryStorage::new()));
///
/// let widgets = ResourceModule::new(
///     ResourceDescriptor::new(
///         "Widget",
///         "widgets",
///         ObjectSchema::new().required("title", FieldKind::String),
///     ),
///     vec![
///         RouteDefinition::post("/widgets", "create"),
///         RouteDefinition::get("/widgets/:id", "read"),
///     ],
/// );
///
/// let table = Application::builder(registry).resource(widgets).build().unwrap();
/// assert_eq!(table.len(), 2);
/// ```
pub struct Application {
    registry: Registry,
    config: EngineConfig,
    middlewares: MiddlewareMap,
    resources: Vec<ResourceModule>,
}

impl Application {
    pub fn builder(registry: Registry) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            middlewares: MiddlewareMap::new(),
            resources: Vec::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn middleware(mut self, name: impl Into<String>, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.insert(name.into(), middleware);
        self
    }

    /// Add a resource. Resources mount in the order they are added.
    pub fn resource(mut self, module: ResourceModule) -> Self {
        self.resources.push(module);
        self
    }

    /// Validate the configuration and compose every resource's routes.
    pub fn build(self) -> KitResult<RouteTable> {
        self.config.validate().map_err(KitError::Config)?;

        let snapshot = self.registry.snapshot();
        let engine = ResourceEngine::new(self.registry, self.config);
        let mut table = RouteTable::default();
        let mut declared = 0;

        for module in &self.resources {
            let mut handlers = engine.handlers(&module.descriptor);
            handlers.extend(
                module
                    .extra_handlers
                    .iter()
                    .map(|(name, handler)| (name.clone(), handler.clone())),
            );

            let routes = compose_routes(&module.routes, &handlers, &self.middlewares, &snapshot)?;
            declared += module.routes.len();
            table.extend(routes);
        }

        tracing::info!(
            config = engine.config().name(),
            resources = self.resources.len(),
            mounted = table.len(),
            pruned = declared - table.len(),
            "route table assembled"
        );
        Ok(table)
    }
}
