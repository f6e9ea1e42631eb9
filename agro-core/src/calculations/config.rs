//! Configuration table for the ROI estimation engine.
//!
//! Every constant the estimate depends on lives here, so one engine serves
//! every calculator variant and the table can be supplied from outside
//! (see the application's TOML loader).
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use agro_core::calculations::EngineConfig;
//! use agro_core::{DigitizationLevel, Scenario};
//!
//! let config = EngineConfig::default();
//! config.validate().unwrap();
//!
//! assert_eq!(config.digitization_multiplier(DigitizationLevel::Low), dec!(1.10));
//! assert_eq!(config.scenario_multiplier(Scenario::Optimistic), dec!(1.2));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::roi::ConfigurationError;
use crate::{DigitizationLevel, Scenario};

/// Investment amount for farms up to `max_hectares` (inclusive).
///
/// The last tier of a table has no upper bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentTier {
    pub max_hectares: Option<Decimal>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitizationMultipliers {
    pub low: Decimal,
    pub medium: Decimal,
    pub high: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioMultipliers {
    pub conservative: Decimal,
    pub realistic: Decimal,
    pub optimistic: Decimal,
}

/// Constants of the estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Characteristic scale `H` of the area curve, in hectares.
    pub scale_hectares: Decimal,

    /// Asymptotic gain `s` of the area curve.
    pub scale_gain: Decimal,

    /// Ceiling of the area scaling factor.
    pub scale_cap: Decimal,

    pub digitization: DigitizationMultipliers,

    pub scenario: ScenarioMultipliers,

    /// Lower bound applied to manually supplied percentages.
    pub override_min_pct: Decimal,

    /// Upper bound applied to manually supplied percentages.
    pub override_max_pct: Decimal,

    /// Area tiers for automatic investment, ascending by `max_hectares`.
    pub investment_tiers: Vec<InvestmentTier>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scale_hectares: Decimal::from(50),
            scale_gain: Decimal::new(12, 2),
            scale_cap: Decimal::new(115, 2),
            digitization: DigitizationMultipliers {
                low: Decimal::new(110, 2),
                medium: Decimal::ONE,
                high: Decimal::new(90, 2),
            },
            scenario: ScenarioMultipliers {
                conservative: Decimal::new(8, 1),
                realistic: Decimal::ONE,
                optimistic: Decimal::new(12, 1),
            },
            override_min_pct: Decimal::ZERO,
            override_max_pct: Decimal::from(40),
            investment_tiers: vec![
                InvestmentTier {
                    max_hectares: Some(Decimal::from(50)),
                    amount: Decimal::from(1_500_000),
                },
                InvestmentTier {
                    max_hectares: Some(Decimal::from(200)),
                    amount: Decimal::from(3_500_000),
                },
                InvestmentTier {
                    max_hectares: Some(Decimal::from(500)),
                    amount: Decimal::from(6_000_000),
                },
                InvestmentTier {
                    max_hectares: None,
                    amount: Decimal::from(9_500_000),
                },
            ],
        }
    }
}

impl EngineConfig {
    pub fn digitization_multiplier(
        &self,
        level: DigitizationLevel,
    ) -> Decimal {
        match level {
            DigitizationLevel::Low => self.digitization.low,
            DigitizationLevel::Medium => self.digitization.medium,
            DigitizationLevel::High => self.digitization.high,
        }
    }

    pub fn scenario_multiplier(
        &self,
        scenario: Scenario,
    ) -> Decimal {
        match scenario {
            Scenario::Conservative => self.scenario.conservative,
            Scenario::Realistic => self.scenario.realistic,
            Scenario::Optimistic => self.scenario.optimistic,
        }
    }

    /// Validates the table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if:
    /// - `scale_hectares` is not positive
    /// - `scale_gain` is negative
    /// - `scale_cap` is below 1
    /// - any digitization or scenario multiplier is not positive
    /// - the override range is inverted or starts below zero
    /// - the tier list is empty, not strictly ascending, has a negative
    ///   amount, or its last tier is bounded
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.scale_hectares <= Decimal::ZERO {
            return Err(ConfigurationError::InvalidScaleHectares(
                self.scale_hectares,
            ));
        }
        if self.scale_gain < Decimal::ZERO {
            return Err(ConfigurationError::InvalidScaleGain(self.scale_gain));
        }
        if self.scale_cap < Decimal::ONE {
            return Err(ConfigurationError::InvalidScaleCap(self.scale_cap));
        }

        let multipliers = [
            ("digitization.low", self.digitization.low),
            ("digitization.medium", self.digitization.medium),
            ("digitization.high", self.digitization.high),
            ("scenario.conservative", self.scenario.conservative),
            ("scenario.realistic", self.scenario.realistic),
            ("scenario.optimistic", self.scenario.optimistic),
        ];
        if let Some((name, value)) = multipliers.iter().find(|(_, v)| *v <= Decimal::ZERO) {
            return Err(ConfigurationError::InvalidMultiplier {
                name: (*name).to_string(),
                value: *value,
            });
        }

        if self.override_min_pct < Decimal::ZERO || self.override_min_pct > self.override_max_pct {
            return Err(ConfigurationError::InvalidOverrideBounds {
                min: self.override_min_pct,
                max: self.override_max_pct,
            });
        }

        self.validate_tiers()
    }

    fn validate_tiers(&self) -> Result<(), ConfigurationError> {
        let (last, bounded) = self
            .investment_tiers
            .split_last()
            .ok_or(ConfigurationError::NoInvestmentTiers)?;

        if let Some(max) = last.max_hectares {
            return Err(ConfigurationError::BoundedLastTier(max));
        }

        let mut previous: Option<Decimal> = None;
        for tier in bounded {
            let Some(max) = tier.max_hectares else {
                return Err(ConfigurationError::UnboundedInnerTier);
            };
            if previous.is_some_and(|p| max <= p) {
                return Err(ConfigurationError::UnorderedInvestmentTiers(max));
            }
            previous = Some(max);
        }

        if let Some(tier) = self
            .investment_tiers
            .iter()
            .find(|t| t.amount < Decimal::ZERO)
        {
            return Err(ConfigurationError::NegativeTierAmount(tier.amount));
        }

        Ok(())
    }
}
