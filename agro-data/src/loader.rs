use std::io::Read;

use agro_core::{AgroRepository, CropProfile, Plan, ReferenceDataset, RepositoryError};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when loading reference data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Record {0} has an empty identifier")]
    EmptyIdentifier(usize),

    #[error("Crop '{code}' has {field} = {value}, expected a percentage between 0 and 100")]
    InvalidPercentage {
        code: String,
        field: &'static str,
        value: Decimal,
    },

    #[error("Plan '{0}' has a negative amount: {1}")]
    NegativePlanAmount(String, Decimal),

    #[error("Reference entry '{0}' has a negative cost or revenue")]
    NegativeReferenceValue(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for LoaderError {
    fn from(err: csv::Error) -> Self {
        LoaderError::CsvParse(err.to_string())
    }
}

impl From<serde_json::Error> for LoaderError {
    fn from(err: serde_json::Error) -> Self {
        LoaderError::JsonParse(err.to_string())
    }
}

/// A single row of the crop profiles CSV.
///
/// - `code`: crop code, case-insensitive (e.g. `TRIGO`)
/// - `label`: display name
/// - `savings_pct`, `productivity_pct`: base rates as percentages (e.g. `10`)
/// - `net_margin_per_hectare`: official margin, empty when unknown
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CropProfileRecord {
    pub code: String,
    pub label: String,
    pub savings_pct: Decimal,
    pub productivity_pct: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub net_margin_per_hectare: Option<Decimal>,
}

impl From<&CropProfileRecord> for CropProfile {
    fn from(record: &CropProfileRecord) -> Self {
        CropProfile {
            code: CropProfile::normalize_code(&record.code),
            label: record.label.trim().to_string(),
            savings_pct: record.savings_pct,
            productivity_pct: record.productivity_pct,
            net_margin_per_hectare: record.net_margin_per_hectare,
        }
    }
}

/// A single row of the plan catalog CSV: `id,display_name,fixed_amount`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PlanRecord {
    pub id: String,
    pub display_name: String,
    pub fixed_amount: Decimal,
}

impl From<&PlanRecord> for Plan {
    fn from(record: &PlanRecord) -> Self {
        Plan {
            id: record.id.trim().to_string(),
            display_name: record.display_name.trim().to_string(),
            fixed_amount: record.fixed_amount,
        }
    }
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn check_percentage(
    code: &str,
    field: &'static str,
    value: Decimal,
) -> Result<(), LoaderError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(LoaderError::InvalidPercentage {
            code: code.to_string(),
            field,
            value,
        });
    }
    Ok(())
}

/// Loader for crop profiles from CSV.
pub struct CropProfileLoader;

impl CropProfileLoader {
    /// Parse and validate crop profile rows.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<CropProfileRecord>, LoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for (index, result) in csv_reader.deserialize().enumerate() {
            let record: CropProfileRecord = result?;
            if record.code.trim().is_empty() {
                return Err(LoaderError::EmptyIdentifier(index + 1));
            }
            check_percentage(&record.code, "savings_pct", record.savings_pct)?;
            check_percentage(&record.code, "productivity_pct", record.productivity_pct)?;
            records.push(record);
        }

        Ok(records)
    }

    /// Upsert crop profiles by code. Loading the same file twice leaves the
    /// store unchanged.
    pub async fn load<R: AgroRepository + ?Sized>(
        repo: &R,
        records: &[CropProfileRecord],
    ) -> Result<usize, LoaderError> {
        for record in records {
            let profile = CropProfile::from(record);
            debug!(code = %profile.code, "upserting crop profile");
            repo.upsert_crop_profile(&profile).await?;
        }
        Ok(records.len())
    }
}

/// Loader for the plan catalog from CSV.
pub struct PlanCatalogLoader;

impl PlanCatalogLoader {
    /// Parse and validate plan rows.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<PlanRecord>, LoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for (index, result) in csv_reader.deserialize().enumerate() {
            let record: PlanRecord = result?;
            if record.id.trim().is_empty() {
                return Err(LoaderError::EmptyIdentifier(index + 1));
            }
            if record.fixed_amount < Decimal::ZERO {
                return Err(LoaderError::NegativePlanAmount(
                    record.id.trim().to_string(),
                    record.fixed_amount,
                ));
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Upsert plans by id, keeping file order as catalog order.
    pub async fn load<R: AgroRepository + ?Sized>(
        repo: &R,
        records: &[PlanRecord],
    ) -> Result<usize, LoaderError> {
        for record in records {
            let plan = Plan::from(record);
            debug!(id = %plan.id, "upserting plan");
            repo.upsert_plan(&plan).await?;
        }
        Ok(records.len())
    }
}

/// Loader for the per-hectare reference dataset (JSON object keyed by crop code).
pub struct ReferenceDatasetLoader;

impl ReferenceDatasetLoader {
    pub fn parse<R: Read>(reader: R) -> Result<ReferenceDataset, LoaderError> {
        let dataset: ReferenceDataset = serde_json::from_reader(reader)?;

        for code in dataset.codes() {
            if code.trim().is_empty() {
                return Err(LoaderError::EmptyIdentifier(0));
            }
            let negative = dataset.get(code).is_some_and(|entry| {
                entry.cost_per_hectare < Decimal::ZERO || entry.revenue_per_hectare < Decimal::ZERO
            });
            if negative {
                return Err(LoaderError::NegativeReferenceValue(code.to_string()));
            }
        }

        Ok(dataset)
    }

    pub async fn load<R: AgroRepository + ?Sized>(
        repo: &R,
        dataset: &ReferenceDataset,
    ) -> Result<usize, LoaderError> {
        let mut loaded = 0;
        for code in dataset.codes() {
            if let Some(entry) = dataset.get(code) {
                repo.upsert_crop_reference(&CropProfile::normalize_code(code), entry)
                    .await?;
                loaded += 1;
            }
        }
        Ok(loaded)
    }
}
