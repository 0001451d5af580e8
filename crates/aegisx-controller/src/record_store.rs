//! Narrow contract the controller uses to pull stored policy documents and
//! mark them applied. The core pipeline stores no persistent state of its
//! own; whatever keeps policy documents and their revision history durable
//! lives behind this trait, entirely outside this crate.

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct Record {
    pub id: String,
    pub tenant: String,
    pub kind: String,
    pub raw: Vec<u8>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, tenant: &str, id: &str) -> Result<Record, RecordStoreError>;
    async fn mark_applied(&self, tenant: &str, id: &str) -> Result<(), RecordStoreError>;
    async fn list(&self, tenant: &str, kind: Option<&str>) -> Result<Vec<Record>, RecordStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RecordStoreError {
    #[error("record {tenant}/{id} not found")]
    NotFound { tenant: String, id: String },
    #[error("record store backend error: {0}")]
    Backend(String),
}
