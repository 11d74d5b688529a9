//! Generic CRUD resource engine.
//!
//! Given a [`ResourceDescriptor`] and the bonded storage provider, the engine
//! produces framework-agnostic handlers with a uniform result shape:
//!
//! | operation | success                         | failure                 |
//! |-----------|---------------------------------|-------------------------|
//! | create    | `201 { props: row }`            | `400` validation        |
//! | read      | `200 { props: row }`            | `404`                   |
//! | update    | `200 { props: row }`            | `400` validation, `404` |
//! | delete    | `200 { props: { id } }`         | `404`                   |
//! | query     | `200 [row, ...]`                | `400` malformed options |
//!
//! Provider failures become a generic `400`/`500` and are logged in full
//! through the safe logger accessor. A missing `database` bond is the only
//! error a handler returns.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use serde_json::{json, Value};

use crate::analytics::analytics;
use crate::config::EngineConfig;
use crate::error::{FieldError, KitResult, ResourceError, ValidationError};
use crate::handler::{Handler, HandlerMap, Request, Response};
use crate::logging::logger;
use crate::query::QueryOptions;
use crate::registry::Registry;
use crate::schema::ValidationSchema;
use crate::storage::{id_string, storage, Row};

/// Static description of a resource exposed through the engine.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    /// Display label used in messages, e.g. `Widget`
    pub name: String,
    /// Storage identifier, e.g. `widgets`
    pub table_name: String,
    pub schema: Arc<dyn ValidationSchema>,
}

impl ResourceDescriptor {
    pub fn new(
        name: impl Into<String>,
        table_name: impl Into<String>,
        schema: impl ValidationSchema + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            schema: Arc::new(schema),
        }
    }
}

/// The five generic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Query,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
        Operation::Query,
    ];

    /// Name under which the handler is registered in a [`HandlerMap`].
    pub fn handler_name(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Query => "query",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handler_name())
    }
}

/// Factory for resource handlers bound to one registry.
#[derive(Debug, Clone)]
pub struct ResourceEngine {
    registry: Registry,
    config: Arc<EngineConfig>,
}

impl ResourceEngine {
    pub fn new(registry: Registry, config: EngineConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn handler(&self, operation: Operation, descriptor: &Arc<ResourceDescriptor>) -> Arc<dyn Handler> {
        Arc::new(ResourceHandler {
            operation,
            descriptor: descriptor.clone(),
            registry: self.registry.clone(),
            config: self.config.clone(),
        })
    }

    pub fn create(&self, descriptor: &Arc<ResourceDescriptor>) -> Arc<dyn Handler> {
        self.handler(Operation::Create, descriptor)
    }

    pub fn read(&self, descriptor: &Arc<ResourceDescriptor>) -> Arc<dyn Handler> {
        self.handler(Operation::Read, descriptor)
    }

    pub fn update(&self, descriptor: &Arc<ResourceDescriptor>) -> Arc<dyn Handler> {
        self.handler(Operation::Update, descriptor)
    }

    pub fn del(&self, descriptor: &Arc<ResourceDescriptor>) -> Arc<dyn Handler> {
        self.handler(Operation::Delete, descriptor)
    }

    pub fn query(&self, descriptor: &Arc<ResourceDescriptor>) -> Arc<dyn Handler> {
        self.handler(Operation::Query, descriptor)
    }

    /// All five handlers, keyed by [`Operation::handler_name`].
    pub fn handlers(&self, descriptor: &Arc<ResourceDescriptor>) -> HandlerMap {
        Operation::ALL
            .into_iter()
            .map(|op| (op.handler_name().to_string(), self.handler(op, descriptor)))
            .collect()
    }
}

struct ResourceHandler {
    operation: Operation,
    descriptor: Arc<ResourceDescriptor>,
    registry: Registry,
    config: Arc<EngineConfig>,
}

type OpResult = Result<Response, ResourceError>;

impl ResourceHandler {
    fn invalid(&self, fields: Vec<FieldError>) -> ResourceError {
        ValidationError {
            resource: self.descriptor.name.clone(),
            fields,
        }
        .into()
    }

    fn not_found(&self, id: &str) -> ResourceError {
        ResourceError::NotFound {
            resource: self.descriptor.name.clone(),
            id: id.to_string(),
        }
    }

    fn required_id(&self, request: &Request) -> Result<String, ResourceError> {
        request
            .param("id")
            .map(str::to_string)
            .ok_or_else(|| self.invalid(vec![FieldError::new("id", "is required")]))
    }

    async fn track(&self, action: &str, id: &str) {
        let event = format!("{}.{action}", self.descriptor.table_name);
        analytics(&self.registry)
            .track(&event, json!({ "id": id }))
            .await;
    }

    async fn create(&self, request: Request) -> OpResult {
        let storage = storage(&self.registry)?;
        let row = self
            .descriptor
            .schema
            .validate(&request.body)
            .map_err(|fields| self.invalid(fields))?;

        let created = storage.create(&self.descriptor.table_name, row).await?;
        if let Some(id) = created.get("id").and_then(id_string) {
            self.track("created", &id).await;
        }
        Ok(Response::props(StatusCode::CREATED, created))
    }

    async fn read(&self, request: Request) -> OpResult {
        let storage = storage(&self.registry)?;
        let id = self.required_id(&request)?;

        if let Some(props) = request.props {
            if props.get("id").and_then(id_string).as_deref() == Some(id.as_str()) {
                return Ok(Response::props(StatusCode::OK, props));
            }
        }

        match storage.find_by_id(&self.descriptor.table_name, &id).await? {
            Some(row) => Ok(Response::props(StatusCode::OK, row)),
            None => Err(self.not_found(&id)),
        }
    }

    async fn update(&self, request: Request) -> OpResult {
        let storage = storage(&self.registry)?;
        let id = self.required_id(&request)?;
        let patch = self
            .descriptor
            .schema
            .validate_partial(&request.body)
            .map_err(|fields| self.invalid(fields))?;

        let table = &self.descriptor.table_name;
        let result = storage.update_by_id(table, &id, patch).await?;
        if result.affected == 0 {
            return Err(self.not_found(&id));
        }
        let row = match result.data {
            Some(row) => row,
            None => storage
                .find_by_id(table, &id)
                .await?
                .ok_or_else(|| self.not_found(&id))?,
        };

        self.track("updated", &id).await;
        Ok(Response::props(StatusCode::OK, row))
    }

    async fn delete(&self, request: Request) -> OpResult {
        let storage = storage(&self.registry)?;
        let id = self.required_id(&request)?;

        let result = storage.delete_by_id(&self.descriptor.table_name, &id).await?;
        if result.affected == 0 {
            return Err(self.not_found(&id));
        }

        self.track("deleted", &id).await;
        let mut props = Row::new();
        props.insert("id".to_string(), Value::String(id));
        Ok(Response::props(StatusCode::OK, props))
    }

    async fn query(&self, request: Request) -> OpResult {
        let storage = storage(&self.registry)?;
        let mut options = match request.body {
            Value::Null => QueryOptions::default(),
            body => serde_json::from_value::<QueryOptions>(body)
                .map_err(|err| self.invalid(vec![FieldError::new("query", err.to_string())]))?,
        };
        options.limit = Some(self.config.clamp_limit(options.limit));

        let rows = storage
            .find_many(&self.descriptor.table_name, &options)
            .await?;
        Ok(Response::ok(Value::Array(
            rows.into_iter().map(Value::Object).collect(),
        )))
    }

    /// Turn a request-time failure into its public response.
    fn failure(&self, err: ResourceError) -> Response {
        let resource = &self.descriptor.name;
        match err {
            ResourceError::Validation(err) => {
                tracing::debug!(%resource, operation = %self.operation, %err, "validation failed");
                Response::error(
                    StatusCode::BAD_REQUEST,
                    "errors.validation",
                    &err.to_string(),
                    &err.fields,
                )
            }
            ResourceError::NotFound { id, .. } => {
                tracing::debug!(%resource, operation = %self.operation, %id, "not found");
                Response::error(
                    StatusCode::NOT_FOUND,
                    "errors.notFound",
                    &format!("{resource} not found"),
                    &[],
                )
            }
            ResourceError::Provider(err) => {
                logger(&self.registry).error(
                    &format!("{resource} {} failed", self.operation),
                    &json!({
                        "resource": resource,
                        "table": self.descriptor.table_name,
                        "operation": self.operation.handler_name(),
                        "error": err.to_string(),
                    }),
                );
                if err.is_client_error() {
                    Response::error(
                        StatusCode::BAD_REQUEST,
                        "errors.badRequest",
                        "The request could not be processed",
                        &[],
                    )
                } else {
                    Response::error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "errors.internal",
                        "Something went wrong",
                        &[],
                    )
                }
            }
            // Propagated by `handle` before reaching here.
            ResourceError::Registry(_) => Response::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "errors.internal",
                "Something went wrong",
                &[],
            ),
        }
    }
}

#[async_trait]
impl Handler for ResourceHandler {
    async fn handle(&self, request: Request) -> KitResult<Option<Response>> {
        let result = match self.operation {
            Operation::Create => self.create(request).await,
            Operation::Read => self.read(request).await,
            Operation::Update => self.update(request).await,
            Operation::Delete => self.delete(request).await,
            Operation::Query => self.query(request).await,
        };

        match result {
            Ok(response) => {
                if self.config.verbose {
                    tracing::info!(
                        resource = %self.descriptor.name,
                        operation = %self.operation,
                        status = response.status.as_u16(),
                        "handled"
                    );
                }
                Ok(Some(response))
            }
            Err(ResourceError::Registry(err)) => Err(err.into()),
            Err(err) => Ok(Some(self.failure(err))),
        }
    }
}
