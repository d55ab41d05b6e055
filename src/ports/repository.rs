use crate::domain::jobs::{JobId, JobRecord};
use crate::error::StoreError;
use async_trait::async_trait;

/// Storage for job records. Each record has a single writer (the job's own
/// execution wrapper); reads return copies.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fails if the id is already present.
    async fn create(&self, record: JobRecord) -> Result<(), StoreError>;

    async fn get(&self, id: &JobId) -> Result<Option<JobRecord>, StoreError>;

    /// Replaces an existing record. Fails if the id is unknown.
    async fn set(&self, record: JobRecord) -> Result<(), StoreError>;
}
