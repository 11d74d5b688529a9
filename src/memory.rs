//! In-memory storage provider.
//!
//! Tables keep rows in insertion order. Rows without an `id` get a UUID v4.
//! Intended for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ProviderError, ProviderResult};
use crate::query::{matches_all, Filter, QueryOptions};
use crate::storage::{id_string, MutationResult, Row, StorageProvider};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently in `table`.
    pub async fn len(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Vec::len)
    }
}

fn row_id(row: &Row) -> Option<String> {
    row.get("id").and_then(id_string)
}

fn merge(row: &mut Row, patch: &Row) {
    for (column, value) in patch {
        // The primary key is immutable.
        if column != "id" {
            row.insert(column.clone(), value.clone());
        }
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    async fn find_by_id(&self, table: &str, id: &str) -> ProviderResult<Option<Row>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| row_id(row).as_deref() == Some(id)))
            .cloned())
    }

    async fn find_one(&self, table: &str, filter: &Filter) -> ProviderResult<Option<Row>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| matches_all(filter, row)))
            .cloned())
    }

    async fn find_many(&self, table: &str, options: &QueryOptions) -> ProviderResult<Vec<Row>> {
        let tables = self.tables.read().await;
        let rows = tables.get(table).map(|rows| rows.iter().cloned());
        Ok(rows.map(|rows| options.apply(rows)).unwrap_or_default())
    }

    async fn count(&self, table: &str, filter: &Filter) -> ProviderResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map_or(0, |rows| rows.iter().filter(|row| matches_all(filter, row)).count() as u64))
    }

    async fn create(&self, table: &str, mut data: Row) -> ProviderResult<Row> {
        let id = match data.get("id") {
            None | Some(Value::Null) => {
                let id = Uuid::new_v4().to_string();
                data.insert("id".to_string(), Value::String(id.clone()));
                id
            }
            Some(value) => id_string(value)
                .ok_or_else(|| ProviderError::InvalidInput("id must be a string or number".into()))?,
        };

        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        if rows.iter().any(|row| row_id(row).as_deref() == Some(id.as_str())) {
            return Err(ProviderError::Conflict(format!("{table}: duplicate id {id}")));
        }
        rows.push(data.clone());
        Ok(data)
    }

    async fn update_by_id(&self, table: &str, id: &str, patch: Row) -> ProviderResult<MutationResult> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row).as_deref() == Some(id)))
        else {
            return Ok(MutationResult::none());
        };
        merge(row, &patch);
        Ok(MutationResult::one(row.clone()))
    }

    async fn update_many(&self, table: &str, filter: &Filter, patch: Row) -> ProviderResult<MutationResult> {
        let mut tables = self.tables.write().await;
        let mut affected = 0;
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| matches_all(filter, row)) {
                merge(row, &patch);
                affected += 1;
            }
        }
        Ok(MutationResult::count(affected))
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> ProviderResult<MutationResult> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(MutationResult::none());
        };
        match rows.iter().position(|row| row_id(row).as_deref() == Some(id)) {
            Some(index) => Ok(MutationResult::one(rows.remove(index))),
            None => Ok(MutationResult::none()),
        }
    }

    async fn delete_many(&self, table: &str, filter: &Filter) -> ProviderResult<MutationResult> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(MutationResult::none());
        };
        let before = rows.len();
        rows.retain(|row| !matches_all(filter, row));
        Ok(MutationResult::count((before - rows.len()) as u64))
    }
}
