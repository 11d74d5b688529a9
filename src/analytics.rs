//! Analytics capability. Absent by default; calls resolve without effect.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::bond::keys;
use crate::registry::Registry;

#[async_trait]
pub trait Analytics: Send + Sync + Debug {
    async fn track(&self, event: &str, properties: Value);

    async fn identify(&self, _user_id: &str, _traits: Value) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalytics;

#[async_trait]
impl Analytics for NoopAnalytics {
    async fn track(&self, _event: &str, _properties: Value) {}
}

/// The bonded analytics client, or [`NoopAnalytics`].
pub fn analytics(registry: &Registry) -> Arc<dyn Analytics> {
    registry
        .get(&keys::ANALYTICS)
        .unwrap_or_else(|| Arc::new(NoopAnalytics))
}
