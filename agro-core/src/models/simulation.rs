use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Self-assessed digital maturity of the farm.
///
/// Lower existing digitization leaves more room for improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DigitizationLevel {
    #[serde(alias = "BAJO")]
    Low,
    #[serde(alias = "MEDIO")]
    Medium,
    #[serde(alias = "ALTO")]
    High,
}

impl DigitizationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LOW" | "BAJO" => Some(Self::Low),
            "MEDIUM" | "MEDIO" => Some(Self::Medium),
            "HIGH" | "ALTO" => Some(Self::High),
            _ => None,
        }
    }
}

/// Sensitivity applied uniformly to the estimated benefit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scenario {
    #[serde(alias = "CONSERVADOR")]
    Conservative,
    #[serde(alias = "REALISTA")]
    Realistic,
    #[serde(alias = "OPTIMISTA")]
    Optimistic,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "CONSERVATIVE",
            Self::Realistic => "REALISTIC",
            Self::Optimistic => "OPTIMISTIC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CONSERVATIVE" | "CONSERVADOR" => Some(Self::Conservative),
            "REALISTIC" | "REALISTA" => Some(Self::Realistic),
            "OPTIMISTIC" | "OPTIMISTA" => Some(Self::Optimistic),
            _ => None,
        }
    }
}

/// Evaluation window for the cumulative cash-flow series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Horizon {
    Months24,
    Months36,
}

impl Horizon {
    pub fn months(&self) -> u32 {
        match self {
            Self::Months24 => 24,
            Self::Months36 => 36,
        }
    }
}

impl TryFrom<u32> for Horizon {
    type Error = String;

    fn try_from(months: u32) -> Result<Self, Self::Error> {
        match months {
            24 => Ok(Self::Months24),
            36 => Ok(Self::Months36),
            other => Err(format!("unsupported horizon {other}; expected 24 or 36")),
        }
    }
}

impl From<Horizon> for u32 {
    fn from(horizon: Horizon) -> Self {
        horizon.months()
    }
}

/// Where the annual manageable spend comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Baseline {
    /// Annual manageable spend supplied directly.
    ManagedSpend { amount: Decimal },
    /// Per-hectare cost supplied by the caller, multiplied by the area.
    CostPerHectare { amount: Decimal },
    /// Per-hectare cost taken from the reference dataset, multiplied by the area.
    ReferenceCost,
}

/// How the up-front investment is determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InvestmentMode {
    /// Tiered by area.
    Automatic,
    /// Fixed price of a catalog plan.
    Plan { plan_id: String },
    /// Caller-supplied amount.
    Manual { amount: Decimal },
}

/// Caller-supplied base percentages replacing the crop's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateOverride {
    pub savings_pct: Decimal,
    pub productivity_pct: Decimal,
}

/// The complete parameter set for one estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationInput {
    pub crop: String,
    pub area_hectares: Decimal,
    pub level: DigitizationLevel,
    pub scenario: Scenario,
    pub baseline: Baseline,
    #[serde(default)]
    pub rate_override: Option<RateOverride>,
    pub investment: InvestmentMode,
    pub horizon: Horizon,
}

/// Official-margin reference next to the estimated improvement.
///
/// The `chart_*` values are clipped at zero for display and never feed the
/// KPIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub net_margin_per_hectare: Decimal,
    pub annual_baseline_margin: Decimal,
    pub annual_with_digitization: Decimal,
    pub baseline_is_negative: bool,
    pub chart_baseline: Decimal,
    pub chart_with_digitization: Decimal,
}

/// Output of one estimate. Never mutated; every input change produces a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub crop: String,
    /// Area after clamping negatives to zero.
    pub area_hectares: Decimal,
    pub level: DigitizationLevel,
    pub scenario: Scenario,
    pub scaling_factor: Decimal,
    pub effective_savings_pct: Decimal,
    pub effective_productivity_pct: Decimal,
    pub annual_baseline_spend: Decimal,
    pub monthly_savings: Decimal,
    pub monthly_productivity_gain: Decimal,
    pub monthly_benefit: Decimal,
    pub annual_benefit: Decimal,
    pub investment: Decimal,
    pub roi_12_months: Decimal,
    /// `None` when the monthly benefit is zero: payback never happens.
    pub payback_months: Option<Decimal>,
    pub horizon_months: u32,
    /// Cumulative cash flow indexed by month, `0..=horizon_months`.
    pub cumulative_cash_flow: Vec<Decimal>,
    /// First month whose cumulative flow is non-negative, if any.
    pub crossing_month: Option<u32>,
    pub roi_at_horizon: Decimal,
    pub baseline_comparison: Option<BaselineComparison>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn level_parse_accepts_spanish_codes() {
        assert_eq!(DigitizationLevel::parse("bajo"), Some(DigitizationLevel::Low));
        assert_eq!(DigitizationLevel::parse("MEDIUM"), Some(DigitizationLevel::Medium));
        assert_eq!(DigitizationLevel::parse("Alto"), Some(DigitizationLevel::High));
        assert_eq!(DigitizationLevel::parse("total"), None);
    }

    #[test]
    fn scenario_parse_accepts_spanish_codes() {
        assert_eq!(Scenario::parse("REALISTA"), Some(Scenario::Realistic));
        assert_eq!(Scenario::parse("optimistic"), Some(Scenario::Optimistic));
        assert_eq!(Scenario::parse("conservador"), Some(Scenario::Conservative));
        assert_eq!(Scenario::parse(""), None);
    }

    #[test]
    fn horizon_rejects_unsupported_months() {
        assert_eq!(Horizon::try_from(24), Ok(Horizon::Months24));
        assert_eq!(Horizon::try_from(36), Ok(Horizon::Months36));
        assert!(Horizon::try_from(0).is_err());
        assert!(Horizon::try_from(12).is_err());
    }

    #[test]
    fn input_deserializes_from_json() {
        let json = r#"{
            "crop": "trigo",
            "area_hectares": 30,
            "level": "BAJO",
            "scenario": "REALISTIC",
            "baseline": { "kind": "managed_spend", "amount": 12000000 },
            "investment": { "mode": "plan", "plan_id": "raiz" },
            "horizon": 36
        }"#;

        let input: SimulationInput = serde_json::from_str(json).expect("input should parse");

        assert_eq!(input.crop, "trigo");
        assert_eq!(input.area_hectares, dec!(30));
        assert_eq!(input.level, DigitizationLevel::Low);
        assert_eq!(input.baseline, Baseline::ManagedSpend { amount: dec!(12000000) });
        assert_eq!(
            input.investment,
            InvestmentMode::Plan {
                plan_id: "raiz".to_string()
            }
        );
        assert_eq!(input.horizon, Horizon::Months36);
        assert!(input.rate_override.is_none());
    }

    #[test]
    fn input_rejects_unsupported_horizon() {
        let json = r#"{
            "crop": "TRIGO",
            "area_hectares": 30,
            "level": "LOW",
            "scenario": "REALISTIC",
            "baseline": { "kind": "reference_cost" },
            "investment": { "mode": "automatic" },
            "horizon": 18
        }"#;

        let result: Result<SimulationInput, _> = serde_json::from_str(json);

        assert!(result.is_err());
    }
}
