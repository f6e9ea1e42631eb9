use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CropProfile, Plan};

/// Per-hectare economics of one crop as published in the reference dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropReference {
    pub cost_per_hectare: Decimal,
    pub revenue_per_hectare: Decimal,
    #[serde(default)]
    pub cost_breakdown: BTreeMap<String, Decimal>,
}

impl CropReference {
    pub fn net_margin_per_hectare(&self) -> Decimal {
        self.revenue_per_hectare - self.cost_per_hectare
    }
}

/// Crop code → per-hectare economics, as fetched from the reference document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceDataset(BTreeMap<String, CropReference>);

impl ReferenceDataset {
    pub fn new(entries: BTreeMap<String, CropReference>) -> Self {
        Self(entries)
    }

    /// Case-insensitive lookup by crop code.
    pub fn get(
        &self,
        code: &str,
    ) -> Option<&CropReference> {
        let code = code.trim();
        self.0.get(code).or_else(|| {
            self.0
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(code))
                .map(|(_, entry)| entry)
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Everything an estimate reads besides its own input.
///
/// Passed explicitly into the engine; nothing is held in process-wide state.
/// `dataset` is `None` while the reference document is unavailable, in which
/// case estimates that need it are refused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub crops: Vec<CropProfile>,
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub dataset: Option<ReferenceDataset>,
}

impl ReferenceData {
    pub fn new(
        crops: Vec<CropProfile>,
        plans: Vec<Plan>,
    ) -> Self {
        Self {
            crops,
            plans,
            dataset: None,
        }
    }

    /// Built-in crop profiles and plan catalog, without a reference dataset.
    pub fn builtin() -> Self {
        Self::new(CropProfile::defaults(), Plan::defaults())
    }

    pub fn with_dataset(
        mut self,
        dataset: ReferenceDataset,
    ) -> Self {
        self.dataset = Some(dataset);
        self
    }

    pub fn crop(
        &self,
        code: &str,
    ) -> Option<&CropProfile> {
        self.crops.iter().find(|c| c.matches(code))
    }

    pub fn plan(
        &self,
        id: &str,
    ) -> Option<&Plan> {
        let id = id.trim();
        self.plans.iter().find(|p| p.id == id)
    }

    /// Looks the crop up in the reference dataset, if one is loaded.
    pub fn crop_reference(
        &self,
        code: &str,
    ) -> Option<&CropReference> {
        self.dataset.as_ref().and_then(|d| d.get(code))
    }
}
