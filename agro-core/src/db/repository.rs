use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    CropProfile, CropReference, DiagnosticResponse, Plan, ReferenceData, ReferenceDataset,
};

/// Diagnostics returned by a listing when no limit is given.
pub const DEFAULT_DIAGNOSTIC_LIMIT: usize = 100;

/// Upper bound on a single diagnostics listing.
pub const MAX_DIAGNOSTIC_LIMIT: usize = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait AgroRepository: Send + Sync {
    // Crop profiles
    async fn list_crop_profiles(&self) -> Result<Vec<CropProfile>, RepositoryError>;
    async fn get_crop_profile(&self, code: &str) -> Result<CropProfile, RepositoryError>;
    async fn upsert_crop_profile(&self, profile: &CropProfile) -> Result<(), RepositoryError>;

    // Plan catalog
    async fn list_plans(&self) -> Result<Vec<Plan>, RepositoryError>;
    async fn get_plan(&self, id: &str) -> Result<Plan, RepositoryError>;
    async fn upsert_plan(&self, plan: &Plan) -> Result<(), RepositoryError>;

    // Reference dataset
    async fn get_reference_dataset(&self) -> Result<ReferenceDataset, RepositoryError>;
    async fn upsert_crop_reference(
        &self,
        code: &str,
        reference: &CropReference,
    ) -> Result<(), RepositoryError>;

    // Diagnostics
    /// Stores the record under its key and returns the key.
    async fn save_diagnostic(&self, record: &DiagnosticResponse) -> Result<String, RepositoryError>;

    async fn get_diagnostic(&self, key: &str) -> Result<DiagnosticResponse, RepositoryError>;

    /// Records whose key starts with `prefix`, newest first, at most `limit`.
    async fn list_diagnostics(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<DiagnosticResponse>, RepositoryError>;
}

/// Normalizes a requested listing size: absent or zero means the default,
/// anything above the maximum is capped.
pub fn diagnostic_limit(requested: Option<usize>) -> usize {
    match requested {
        None | Some(0) => DEFAULT_DIAGNOSTIC_LIMIT,
        Some(limit) => limit.min(MAX_DIAGNOSTIC_LIMIT),
    }
}

/// Assembles the engine's [`ReferenceData`] from the store.
///
/// An empty reference dataset is reported as unavailable (`None`).
pub async fn load_reference_data(
    repo: &dyn AgroRepository,
) -> Result<ReferenceData, RepositoryError> {
    let crops = repo.list_crop_profiles().await?;
    let plans = repo.list_plans().await?;
    let dataset = repo.get_reference_dataset().await?;

    let reference = ReferenceData::new(crops, plans);
    if dataset.is_empty() {
        Ok(reference)
    } else {
        Ok(reference.with_dataset(dataset))
    }
}
