mod crop_profile;
mod diagnostic;
mod plan;
mod reference;
mod simulation;

pub use crop_profile::CropProfile;
pub use diagnostic::{DiagnosticLevel, DiagnosticResponse, NewDiagnosticResponse, SectionScore};
pub use plan::Plan;
pub use reference::{CropReference, ReferenceData, ReferenceDataset};
pub use simulation::{
    Baseline, BaselineComparison, DigitizationLevel, Horizon, InvestmentMode, RateOverride,
    Scenario, SimulationInput, SimulationResult,
};
