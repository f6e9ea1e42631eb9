//! Loaders for the reference data the ROI engine reads: crop profiles and
//! the plan catalog from CSV, and the per-hectare reference dataset from JSON.

mod loader;

pub use loader::{
    CropProfileLoader, CropProfileRecord, LoaderError, PlanCatalogLoader, PlanRecord,
    ReferenceDatasetLoader,
};
