//! Storage provider contract.
//!
//! The resource engine is correct for any provider satisfying this trait,
//! whatever the backing technology.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::bond::keys;
use crate::error::{ProviderResult, RegistryResult};
use crate::query::{Filter, QueryOptions};
use crate::registry::Registry;

/// A stored row.
pub type Row = serde_json::Map<String, Value>;

/// Uniform result of every write.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MutationResult {
    /// The written row, when the provider can return it.
    pub data: Option<Row>,
    /// Number of rows touched.
    pub affected: u64,
}

impl MutationResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn one(row: Row) -> Self {
        Self {
            data: Some(row),
            affected: 1,
        }
    }

    pub fn count(affected: u64) -> Self {
        Self {
            data: None,
            affected,
        }
    }
}

/// Table-parameterized storage operations.
#[async_trait]
pub trait StorageProvider: Send + Sync + Debug {
    async fn find_by_id(&self, table: &str, id: &str) -> ProviderResult<Option<Row>>;

    async fn find_one(&self, table: &str, filter: &Filter) -> ProviderResult<Option<Row>>;

    async fn find_many(&self, table: &str, options: &QueryOptions) -> ProviderResult<Vec<Row>>;

    async fn count(&self, table: &str, filter: &Filter) -> ProviderResult<u64>;

    /// Insert a row and return it as stored (with its generated id).
    async fn create(&self, table: &str, data: Row) -> ProviderResult<Row>;

    async fn update_by_id(&self, table: &str, id: &str, patch: Row) -> ProviderResult<MutationResult>;

    async fn update_many(&self, table: &str, filter: &Filter, patch: Row) -> ProviderResult<MutationResult>;

    async fn delete_by_id(&self, table: &str, id: &str) -> ProviderResult<MutationResult>;

    async fn delete_many(&self, table: &str, filter: &Filter) -> ProviderResult<MutationResult>;
}

/// Resolve the bonded storage provider, failing fast if none is bonded.
pub fn storage(registry: &Registry) -> RegistryResult<Arc<dyn StorageProvider>> {
    registry.require(&keys::DATABASE)
}

/// Render a row id as the string key used by `find_by_id`.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
