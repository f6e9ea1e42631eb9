//! Estimation logic for agricultural digitization returns.
//!
//! This module provides the ROI estimation engine, its configuration table,
//! the rounded summary handed to downstream consumers, and the scoring of the
//! self-diagnostic survey.

pub mod common;
pub mod config;
pub mod roi;
pub mod summary;
pub mod survey;

pub use config::{EngineConfig, InvestmentTier};
pub use roi::{
    ConfigurationError, EffectiveRates, MAX_AMOUNT, MAX_AREA_HECTARES, MonthlyBenefit,
    RoiAndPayback, RoiEngine,
};
pub use summary::SimulationSummary;
pub use survey::{DiagnosticScore, Recommendation, SurveyError, SurveySection};
