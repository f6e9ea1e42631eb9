//! ROI estimation engine for farm digitization.
//!
//! Given a [`SimulationInput`] and the [`ReferenceData`] it refers to, the
//! engine computes the monthly benefit of digitizing, the investment, the
//! 12-month and horizon ROI, the payback time, and a month-indexed
//! cumulative cash-flow series. It performs no I/O and holds no state.
//!
//! # Calculation Steps
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Area scaling factor `1 + s·ln(1 + area/H)`, capped |
//! | 2    | Effective rates: base (or override) × digitization × scaling |
//! | 3    | Annual manageable spend (direct, cost/ha × area, or reference cost × area) |
//! | 4    | Monthly savings and productivity gain: spend × rate / 100 / 12 |
//! | 5    | Monthly benefit: (savings + productivity) × scenario, floored at 0 |
//! | 6    | Investment: area tier, catalog plan, or manual amount |
//! | 7    | ROI at 12 months and at the horizon, payback, cumulative series |
//! | 8    | Official margin comparison, when a benchmark is known |
//!
//! # Failure semantics
//!
//! Numeric edge cases never fail: negative inputs are clamped to zero, a zero
//! investment yields a zero ROI, and a zero benefit yields no payback
//! (`None`). Areas above [`MAX_AREA_HECTARES`] and peso amounts above
//! [`MAX_AMOUNT`] are clamped to those bounds. Missing reference data
//! (unknown crop, unknown plan, reference dataset unavailable) or an invalid
//! [`EngineConfig`] produce a [`ConfigurationError`]. All arithmetic is
//! checked; a figure that still cannot be represented (for instance ROI
//! against a near-zero investment) is reported as
//! [`ConfigurationError::OutOfRange`] instead of panicking.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use agro_core::calculations::{EngineConfig, RoiEngine};
//! use agro_core::{
//!     Baseline, DigitizationLevel, Horizon, InvestmentMode, ReferenceData, Scenario,
//!     SimulationInput,
//! };
//!
//! let config = EngineConfig::default();
//! let reference = ReferenceData::builtin();
//! let engine = RoiEngine::new(&config, &reference).unwrap();
//!
//! let input = SimulationInput {
//!     crop: "TRIGO".to_string(),
//!     area_hectares: dec!(0),
//!     level: DigitizationLevel::Medium,
//!     scenario: Scenario::Realistic,
//!     baseline: Baseline::ManagedSpend { amount: dec!(12000000) },
//!     rate_override: None,
//!     investment: InvestmentMode::Manual { amount: dec!(1000000) },
//!     horizon: Horizon::Months24,
//! };
//!
//! let result = engine.simulate(&input).unwrap();
//!
//! assert_eq!(result.monthly_benefit, dec!(200000));
//! assert_eq!(result.payback_months, Some(dec!(5)));
//! assert_eq!(result.roi_12_months, dec!(140));
//! assert_eq!(result.crossing_month, Some(5));
//! ```

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::calculations::EngineConfig;
use crate::calculations::common::{clamp, non_negative};
use crate::{
    Baseline, BaselineComparison, CropProfile, DigitizationLevel, InvestmentMode, RateOverride,
    ReferenceData, Scenario, SimulationInput, SimulationResult,
};

const MONTHS_PER_YEAR: u32 = 12;

/// Largest area accepted, one billion hectares.
pub const MAX_AREA_HECTARES: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Largest peso amount accepted, 10^18 CLP.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA764_0000, 0x0DE0_B6B3, 0, false, 0);

/// Errors raised when the reference data or engine table cannot support an
/// estimate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The crop code is not in the crop profiles.
    #[error("unknown crop '{0}'")]
    UnknownCrop(String),

    /// The plan id is not in the plan catalog.
    #[error("unknown plan '{0}'")]
    UnknownPlan(String),

    /// The reference dataset is not loaded or has no entry for the crop.
    #[error("reference data unavailable for crop '{0}'")]
    ReferenceDataUnavailable(String),

    #[error("scale hectares must be positive, got {0}")]
    InvalidScaleHectares(Decimal),

    #[error("scale gain must be non-negative, got {0}")]
    InvalidScaleGain(Decimal),

    #[error("scale cap must be at least 1, got {0}")]
    InvalidScaleCap(Decimal),

    #[error("multiplier '{name}' must be positive, got {value}")]
    InvalidMultiplier { name: String, value: Decimal },

    #[error("override bounds must satisfy 0 <= min <= max, got [{min}, {max}]")]
    InvalidOverrideBounds { min: Decimal, max: Decimal },

    #[error("no investment tiers configured")]
    NoInvestmentTiers,

    #[error("investment tiers must be strictly ascending, found {0} out of order")]
    UnorderedInvestmentTiers(Decimal),

    #[error("only the last investment tier may be unbounded")]
    UnboundedInnerTier,

    #[error("last investment tier must be unbounded, got max {0}")]
    BoundedLastTier(Decimal),

    #[error("investment tier amount must be non-negative, got {0}")]
    NegativeTierAmount(Decimal),

    /// An intermediate figure does not fit in a decimal.
    #[error("{0} is outside the representable range")]
    OutOfRange(&'static str),
}

/// Effective improvement percentages after all multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveRates {
    pub scaling_factor: Decimal,
    pub savings_pct: Decimal,
    pub productivity_pct: Decimal,
}

/// Monthly amounts derived from the manageable spend.
///
/// `savings` and `productivity_gain` are reported before the scenario
/// multiplier; `total` includes it and is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyBenefit {
    pub savings: Decimal,
    pub productivity_gain: Decimal,
    pub total: Decimal,
}

/// Return figures for a constant monthly benefit against an up-front investment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiAndPayback {
    pub roi_12_months: Decimal,
    pub payback_months: Option<Decimal>,
    pub cumulative_cash_flow: Vec<Decimal>,
    pub crossing_month: Option<u32>,
    pub roi_at_horizon: Decimal,
}

/// Calculator for digitization ROI estimates.
///
/// Borrows the engine table and the reference data; both are immutable for
/// the lifetime of the engine, so one engine may serve any number of
/// concurrent estimates.
#[derive(Debug, Clone)]
pub struct RoiEngine<'a> {
    config: &'a EngineConfig,
    reference: &'a ReferenceData,
}

impl<'a> RoiEngine<'a> {
    /// Creates an engine after validating the configuration table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the table is invalid
    /// (see [`EngineConfig::validate`]).
    pub fn new(
        config: &'a EngineConfig,
        reference: &'a ReferenceData,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { config, reference })
    }

    /// Runs a complete estimate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if:
    /// - the crop is not among the crop profiles
    /// - the investment names a plan missing from the catalog
    /// - the baseline needs the reference dataset and it is unavailable or
    ///   lacks the crop
    /// - a derived figure overflows ([`ConfigurationError::OutOfRange`])
    pub fn simulate(
        &self,
        input: &SimulationInput,
    ) -> Result<SimulationResult, ConfigurationError> {
        let profile = self
            .reference
            .crop(&input.crop)
            .ok_or_else(|| ConfigurationError::UnknownCrop(input.crop.clone()))?;

        let area = self.clamp_area(input.area_hectares);
        let annual_spend = self.resolve_baseline(&input.baseline, &profile.code, area)?;
        let investment = self.resolve_investment(&input.investment, area)?;

        let rates = self.effective_rates(profile, input.level, area, input.rate_override.as_ref());
        let benefit = self.monthly_benefit(annual_spend, &rates, input.scenario)?;
        let horizon_months = input.horizon.months();
        let returns = self.roi_and_payback(investment, benefit.total, horizon_months)?;

        let annual_benefit = in_range(
            benefit.total.checked_mul(Decimal::from(MONTHS_PER_YEAR)),
            "annual benefit",
        )?;
        let baseline_comparison = self.baseline_comparison(profile, area, annual_benefit)?;

        debug!(
            crop = %profile.code,
            %area,
            level = input.level.as_str(),
            scenario = input.scenario.as_str(),
            monthly_benefit = %benefit.total,
            %investment,
            "estimate computed"
        );

        Ok(SimulationResult {
            crop: profile.code.clone(),
            area_hectares: area,
            level: input.level,
            scenario: input.scenario,
            scaling_factor: rates.scaling_factor,
            effective_savings_pct: rates.savings_pct,
            effective_productivity_pct: rates.productivity_pct,
            annual_baseline_spend: annual_spend,
            monthly_savings: benefit.savings,
            monthly_productivity_gain: benefit.productivity_gain,
            monthly_benefit: benefit.total,
            annual_benefit,
            investment,
            roi_12_months: returns.roi_12_months,
            payback_months: returns.payback_months,
            horizon_months,
            cumulative_cash_flow: returns.cumulative_cash_flow,
            crossing_month: returns.crossing_month,
            roi_at_horizon: returns.roi_at_horizon,
            baseline_comparison,
        })
    }

    /// Economies-of-scale factor for the given area.
    ///
    /// Continuous and non-decreasing in area, exactly `1` at zero hectares
    /// and never above the configured cap. Negative areas count as zero.
    pub fn scaling_factor(
        &self,
        area_hectares: Decimal,
    ) -> Decimal {
        let area = clamp(area_hectares, Decimal::ZERO, MAX_AREA_HECTARES);
        if area.is_zero() {
            return Decimal::ONE;
        }

        let factor = area
            .checked_div(self.config.scale_hectares)
            .and_then(|ratio| ratio.checked_add(Decimal::ONE))
            .and_then(|x| x.checked_ln())
            .and_then(|growth| self.config.scale_gain.checked_mul(growth))
            .and_then(|gain| gain.checked_add(Decimal::ONE));

        // An unrepresentable curve value lies far above any sane cap.
        match factor {
            Some(factor) => factor.min(self.config.scale_cap),
            None if self.config.scale_gain.is_zero() => Decimal::ONE,
            None => self.config.scale_cap,
        }
    }

    /// Effective savings and productivity percentages.
    ///
    /// An override replaces the crop's base percentages entirely, after being
    /// clamped to the configured range, and still goes through the
    /// digitization and area multipliers.
    pub fn effective_rates(
        &self,
        profile: &CropProfile,
        level: DigitizationLevel,
        area_hectares: Decimal,
        rate_override: Option<&RateOverride>,
    ) -> EffectiveRates {
        let (savings, productivity) = match rate_override {
            Some(rates) => (
                self.clamp_override(rates.savings_pct),
                self.clamp_override(rates.productivity_pct),
            ),
            None => (profile.savings_pct, profile.productivity_pct),
        };

        let scaling_factor = self.scaling_factor(area_hectares);
        let multiplier = self
            .config
            .digitization_multiplier(level)
            .saturating_mul(scaling_factor);

        EffectiveRates {
            scaling_factor,
            savings_pct: savings.saturating_mul(multiplier),
            productivity_pct: productivity.saturating_mul(multiplier),
        }
    }

    /// Monthly savings, productivity gain and total benefit.
    ///
    /// The total is floored at zero; a losing operation is expressed through
    /// the baseline comparison, never as a negative benefit.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::OutOfRange`] if a monthly amount does
    /// not fit in a decimal.
    pub fn monthly_benefit(
        &self,
        annual_spend: Decimal,
        rates: &EffectiveRates,
        scenario: Scenario,
    ) -> Result<MonthlyBenefit, ConfigurationError> {
        let spend = clamp(annual_spend, Decimal::ZERO, MAX_AMOUNT);
        let months = Decimal::from(MONTHS_PER_YEAR);
        let monthly_share = |pct: Decimal, quantity: &'static str| {
            let share = spend
                .checked_mul(pct)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .and_then(|v| v.checked_div(months));
            in_range(share, quantity)
        };

        let savings = monthly_share(rates.savings_pct, "monthly savings")?;
        let productivity_gain = monthly_share(rates.productivity_pct, "monthly productivity gain")?;
        let gross = savings
            .checked_add(productivity_gain)
            .and_then(|v| v.checked_mul(self.config.scenario_multiplier(scenario)));
        let total = non_negative(in_range(gross, "monthly benefit")?);

        Ok(MonthlyBenefit {
            savings,
            productivity_gain,
            total,
        })
    }

    /// Resolves the up-front investment amount.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownPlan`] if a plan-based investment
    /// names a plan missing from the catalog.
    pub fn resolve_investment(
        &self,
        mode: &InvestmentMode,
        area_hectares: Decimal,
    ) -> Result<Decimal, ConfigurationError> {
        match mode {
            InvestmentMode::Automatic => self.tier_amount(area_hectares),
            InvestmentMode::Plan { plan_id } => self
                .reference
                .plan(plan_id)
                .map(|plan| self.clamp_amount(plan.fixed_amount, "plan amount"))
                .ok_or_else(|| ConfigurationError::UnknownPlan(plan_id.clone())),
            InvestmentMode::Manual { amount } => Ok(self.clamp_amount(*amount, "investment")),
        }
    }

    /// ROI, payback and cumulative cash flow over `horizon_months`.
    ///
    /// A zero investment gives a zero ROI rather than a division by zero. A
    /// zero benefit gives `None` for the payback.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::OutOfRange`] if the payback, a cash-flow
    /// point or an ROI does not fit in a decimal.
    pub fn roi_and_payback(
        &self,
        investment: Decimal,
        monthly_benefit: Decimal,
        horizon_months: u32,
    ) -> Result<RoiAndPayback, ConfigurationError> {
        let investment = non_negative(investment);
        let monthly_benefit = non_negative(monthly_benefit);

        let payback_months = if monthly_benefit > Decimal::ZERO {
            Some(in_range(
                investment.checked_div(monthly_benefit),
                "payback",
            )?)
        } else {
            None
        };

        let cumulative_cash_flow = (0..=horizon_months)
            .map(|month| {
                let flow = monthly_benefit
                    .checked_mul(Decimal::from(month))
                    .and_then(|earned| earned.checked_sub(investment));
                in_range(flow, "cumulative cash flow")
            })
            .collect::<Result<Vec<_>, _>>()?;

        let crossing_month = cumulative_cash_flow
            .iter()
            .position(|flow| *flow >= Decimal::ZERO)
            .and_then(|month| u32::try_from(month).ok());

        Ok(RoiAndPayback {
            roi_12_months: roi_over(investment, monthly_benefit, MONTHS_PER_YEAR)?,
            payback_months,
            cumulative_cash_flow,
            crossing_month,
            roi_at_horizon: roi_over(investment, monthly_benefit, horizon_months)?,
        })
    }

    fn clamp_area(
        &self,
        area_hectares: Decimal,
    ) -> Decimal {
        let area = clamp(area_hectares, Decimal::ZERO, MAX_AREA_HECTARES);
        if area != area_hectares {
            warn!(input = %area_hectares, %area, "area clamped to accepted range");
        }
        area
    }

    fn clamp_amount(
        &self,
        amount: Decimal,
        quantity: &'static str,
    ) -> Decimal {
        let clamped = clamp(amount, Decimal::ZERO, MAX_AMOUNT);
        if clamped != amount {
            warn!(input = %amount, %clamped, quantity, "amount clamped to accepted range");
        }
        clamped
    }

    fn clamp_override(
        &self,
        pct: Decimal,
    ) -> Decimal {
        let clamped = clamp(pct, self.config.override_min_pct, self.config.override_max_pct);
        if clamped != pct {
            warn!(input = %pct, %clamped, "rate override clamped");
        }
        clamped
    }

    /// Annual manageable spend for the chosen baseline.
    fn resolve_baseline(
        &self,
        baseline: &Baseline,
        crop_code: &str,
        area: Decimal,
    ) -> Result<Decimal, ConfigurationError> {
        let cost_per_hectare = match baseline {
            Baseline::ManagedSpend { amount } => {
                return Ok(self.clamp_amount(*amount, "managed spend"));
            }
            Baseline::CostPerHectare { amount } => *amount,
            Baseline::ReferenceCost => self
                .reference
                .crop_reference(crop_code)
                .map(|entry| entry.cost_per_hectare)
                .ok_or_else(|| ConfigurationError::ReferenceDataUnavailable(crop_code.to_string()))?,
        };

        let cost_per_hectare = self.clamp_amount(cost_per_hectare, "cost per hectare");
        let spend = in_range(cost_per_hectare.checked_mul(area), "annual spend")?;
        Ok(self.clamp_amount(spend, "annual spend"))
    }

    /// Investment of the first tier whose bound covers the area.
    fn tier_amount(
        &self,
        area_hectares: Decimal,
    ) -> Result<Decimal, ConfigurationError> {
        let area = non_negative(area_hectares);
        self.config
            .investment_tiers
            .iter()
            .find(|tier| tier.max_hectares.is_none_or(|max| area <= max))
            .map(|tier| tier.amount)
            .ok_or(ConfigurationError::NoInvestmentTiers)
    }

    /// Official margin × area next to the same figure plus the estimated benefit.
    fn baseline_comparison(
        &self,
        profile: &CropProfile,
        area: Decimal,
        annual_benefit: Decimal,
    ) -> Result<Option<BaselineComparison>, ConfigurationError> {
        let margin = profile.net_margin_per_hectare.or_else(|| {
            self.reference
                .crop_reference(&profile.code)
                .map(|entry| entry.net_margin_per_hectare())
        });
        let Some(margin) = margin else {
            return Ok(None);
        };

        let annual_baseline_margin =
            in_range(margin.checked_mul(area), "annual baseline margin")?;
        let annual_with_digitization = in_range(
            annual_baseline_margin.checked_add(annual_benefit),
            "annual margin with digitization",
        )?;

        Ok(Some(BaselineComparison {
            net_margin_per_hectare: margin,
            annual_baseline_margin,
            annual_with_digitization,
            baseline_is_negative: annual_baseline_margin < Decimal::ZERO,
            chart_baseline: non_negative(annual_baseline_margin),
            chart_with_digitization: non_negative(annual_with_digitization),
        }))
    }
}

fn in_range(
    value: Option<Decimal>,
    quantity: &'static str,
) -> Result<Decimal, ConfigurationError> {
    value.ok_or(ConfigurationError::OutOfRange(quantity))
}

/// `((benefit × months − investment) / investment) × 100`, or zero without investment.
fn roi_over(
    investment: Decimal,
    monthly_benefit: Decimal,
    months: u32,
) -> Result<Decimal, ConfigurationError> {
    if investment.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let roi = monthly_benefit
        .checked_mul(Decimal::from(months))
        .and_then(|earned| earned.checked_sub(investment))
        .and_then(|net| net.checked_div(investment))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
    in_range(roi, "ROI")
}
