//! # Bondkit
//!
//! **Bondkit** is the bonding and resource-composition core of a pluggable
//! application kit. Independently versioned packages plug providers into a
//! shared registry; generic CRUD handlers and route tables are built on top.
//!
//! ## Overview
//!
//! ```text
//! Registry ──▶ ResourceEngine ──▶ compose_routes ──▶ HTTP layer (external)
//! ```
//!
//! - **Bond registry**: type-erased map from a bond type (`database`,
//!   `logger`, `payments`, ...) to one provider, or to several named ones.
//! - **Resource engine**: `create`, `read`, `update`, `del` and `query`
//!   handlers for a resource descriptor, backed by the bonded storage.
//! - **Route composition**: resolves a resource's static route table and
//!   prunes routes whose optional bond type is not bonded.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bondkit::prelude::*;
//!
//! let registry = Registry::global().clone();
//! registry.bond(&keys::DATABASE, Arc::new(MemoryStorage::new()));
//!
//! let widgets = ResourceModule::new(
//!     ResourceDescriptor::new("Widget", "widgets", ObjectSchema::new()
//!         .required("title", FieldKind::String)),
//!     vec![
//!         RouteDefinition::post("/widgets", "create"),
//!         RouteDefinition::get("/widgets/:id", "read"),
//!     ],
//! );
//!
//! let table = Application::builder(registry).resource(widgets).build()?;
//! let response = table.dispatch(request).await?;
//! ```

mod analytics;
mod app;
mod bond;
mod cache;
mod config;
mod error;
mod handler;
mod logging;
mod memory;
mod query;
mod registry;
mod resource;
mod routes;
mod schema;
mod storage;

pub mod prelude;

// Re-export core types
pub use analytics::{analytics, Analytics, NoopAnalytics};
pub use app::{Application, ResourceModule};
pub use bond::{keys, types, BondKey, BondType, MultiBondKey};
pub use cache::{cache, Cache, MemoryCache};
pub use config::{Config, EngineConfig};
pub use error::{
    FieldError, KitError, KitResult, ProviderError, ProviderResult, RegistryError,
    RegistryResult, ResourceError, RouteConfigurationError, ValidationError,
};
pub use handler::{
    handler_fn, middleware_fn, FnHandler, FnMiddleware, Handler, HandlerMap, Middleware,
    MiddlewareMap, Request, Response,
};
pub use logging::{logger, LogLevel, Logger, TracingLogger};
pub use memory::MemoryStorage;
pub use query::{compare_values, Condition, Direction, Filter, Operator, OrderBy, QueryOptions};
pub use registry::{BondSnapshot, Registry};
pub use resource::{Operation, ResourceDescriptor, ResourceEngine};
pub use routes::{compose_routes, MountedRoute, RouteDefinition, RouteTable};
pub use schema::{FieldKind, ObjectSchema, ValidationSchema};
pub use storage::{storage, MutationResult, Row, StorageProvider};

// Re-export for implementors of the provider traits
pub use async_trait::async_trait;
pub use http::{Method, StatusCode};
