//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits
//! from Bondkit for convenient glob imports.
//!
//! # Example
//!
//! ```rust
//! use bondkit::prelude::*;
//! ```

// Registry
pub use crate::bond::{keys, types, BondKey, BondType, MultiBondKey};
pub use crate::registry::{BondSnapshot, Registry};

// Capabilities and safe accessors
pub use crate::analytics::{analytics, Analytics};
pub use crate::cache::{cache, Cache};
pub use crate::logging::{logger, LogLevel, Logger};
pub use crate::storage::{storage, MutationResult, Row, StorageProvider};

// Resource engine
pub use crate::config::{Config, EngineConfig};
pub use crate::memory::MemoryStorage;
pub use crate::query::{Condition, Direction, Operator, OrderBy, QueryOptions};
pub use crate::resource::{ResourceDescriptor, ResourceEngine};
pub use crate::schema::{FieldKind, ObjectSchema, ValidationSchema};

// Routing
pub use crate::app::{Application, ResourceModule};
pub use crate::handler::{
    handler_fn, middleware_fn, Handler, HandlerMap, Middleware, MiddlewareMap, Request, Response,
};
pub use crate::routes::{compose_routes, RouteDefinition, RouteTable};

// Errors
pub use crate::error::{
    FieldError, KitError, KitResult, ProviderError, ProviderResult, RegistryError,
    RegistryResult, RouteConfigurationError,
};

// Re-exports for convenience
pub use async_trait::async_trait;
pub use http::{Method, StatusCode};
pub use std::ops::ControlFlow;
pub use std::sync::Arc;
