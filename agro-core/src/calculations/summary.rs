//! Rounded, labeled view of an estimate for downstream text generation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::SimulationResult;
use crate::calculations::common::{round_currency, round_percent};

/// Text rendered in place of a payback that never happens.
pub const PAYBACK_NOT_AVAILABLE: &str = "N/A";

/// Display-ready figures of a [`SimulationResult`].
///
/// Money is rounded to whole pesos, percentages and months to one decimal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub crop: String,
    pub area_hectares: Decimal,
    pub level: String,
    pub scenario: String,
    pub monthly_savings: Decimal,
    pub monthly_productivity_gain: Decimal,
    pub monthly_benefit: Decimal,
    pub investment: Decimal,
    pub roi_12_months: Decimal,
    pub roi_at_horizon: Decimal,
    pub payback_months: Option<Decimal>,
    pub payback_label: String,
    pub horizon_months: u32,
}

impl SimulationSummary {
    pub fn from_result(result: &SimulationResult) -> Self {
        let payback_months = result.payback_months.map(round_percent);
        let payback_label = match payback_months {
            Some(months) => months.to_string(),
            None => PAYBACK_NOT_AVAILABLE.to_string(),
        };

        Self {
            crop: result.crop.clone(),
            area_hectares: result.area_hectares,
            level: result.level.as_str().to_string(),
            scenario: result.scenario.as_str().to_string(),
            monthly_savings: round_currency(result.monthly_savings),
            monthly_productivity_gain: round_currency(result.monthly_productivity_gain),
            monthly_benefit: round_currency(result.monthly_benefit),
            investment: round_currency(result.investment),
            roi_12_months: round_percent(result.roi_12_months),
            roi_at_horizon: round_percent(result.roi_at_horizon),
            payback_months,
            payback_label,
            horizon_months: result.horizon_months,
        }
    }
}
