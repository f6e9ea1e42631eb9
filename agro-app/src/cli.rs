use std::net::SocketAddr;
use std::path::PathBuf;

use agro_core::db::DbConfig;
use agro_core::{
    Baseline, DigitizationLevel, Horizon, InvestmentMode, RateOverride, Scenario, SimulationInput,
};
use clap::{ArgGroup, Args, Parser, Subcommand};
use rust_decimal::Decimal;

use crate::utils::{parse_clp_amount, parse_decimal, parse_investment};

/// Return-on-investment estimator for farm digitization.
///
/// Reads crop profiles and plans from the configured database, estimates
/// monthly benefit, payback and ROI, and serves the same over HTTP.
#[derive(Debug, Parser)]
#[command(name = "agro-roi", version)]
pub struct Cli {
    /// Database backend to use.
    #[arg(long, global = true, default_value = "sqlite")]
    pub backend: String,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `agro.db`) or `:memory:`.
    #[arg(long, global = true, default_value = "agro.db")]
    pub db: String,

    /// TOML file overriding the engine constants.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `info,agro_core=trace`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also append log output to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            backend: self.backend.clone(),
            connection_string: self.db.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one estimate and print it as JSON.
    Simulate(SimulateArgs),

    /// Start the HTTP JSON service.
    Serve(ServeArgs),

    /// Inspect stored self-diagnostic responses.
    Diagnostics {
        #[command(subcommand)]
        command: DiagnosticsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum DiagnosticsCommand {
    /// Print stored responses as JSON, newest first.
    List {
        /// Maximum number of responses (default 100, at most 500).
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("baseline")
        .required(true)
        .args(["spend", "cost_per_ha", "reference"])
))]
pub struct SimulateArgs {
    /// Crop code, e.g. TRIGO.
    #[arg(long)]
    pub crop: String,

    /// Cultivated area in hectares.
    #[arg(long, value_parser = parse_decimal)]
    pub area: Decimal,

    /// Current digitization: LOW, MEDIUM or HIGH (BAJO, MEDIO, ALTO).
    #[arg(long, default_value = "MEDIUM", value_parser = parse_level)]
    pub level: DigitizationLevel,

    /// CONSERVATIVE, REALISTIC or OPTIMISTIC.
    #[arg(long, default_value = "REALISTIC", value_parser = parse_scenario)]
    pub scenario: Scenario,

    /// Annual manageable spend in pesos, e.g. `12.000.000`.
    #[arg(long, value_parser = parse_clp_amount)]
    pub spend: Option<Decimal>,

    /// Cost per hectare in pesos; multiplied by the area.
    #[arg(long, value_parser = parse_clp_amount)]
    pub cost_per_ha: Option<Decimal>,

    /// JSON reference dataset; its per-hectare cost for the crop is the baseline.
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// `auto`, `plan:<id>` or an amount in pesos.
    #[arg(long, default_value = "auto", value_parser = parse_investment)]
    pub investment: InvestmentMode,

    /// Evaluation horizon in months: 24 or 36.
    #[arg(long, default_value = "24", value_parser = parse_horizon)]
    pub horizon: Horizon,

    /// Base savings percentage replacing the crop's own.
    #[arg(long, requires = "productivity_pct", value_parser = parse_decimal)]
    pub savings_pct: Option<Decimal>,

    /// Base productivity percentage replacing the crop's own.
    #[arg(long, requires = "savings_pct", value_parser = parse_decimal)]
    pub productivity_pct: Option<Decimal>,
}

impl SimulateArgs {
    pub fn to_input(&self) -> SimulationInput {
        let baseline = match (self.spend, self.cost_per_ha) {
            (Some(amount), _) => Baseline::ManagedSpend { amount },
            (None, Some(amount)) => Baseline::CostPerHectare { amount },
            (None, None) => Baseline::ReferenceCost,
        };
        let rate_override = self
            .savings_pct
            .zip(self.productivity_pct)
            .map(|(savings_pct, productivity_pct)| RateOverride {
                savings_pct,
                productivity_pct,
            });

        SimulationInput {
            crop: self.crop.clone(),
            area_hectares: self.area,
            level: self.level,
            scenario: self.scenario,
            baseline,
            rate_override,
            investment: self.investment.clone(),
            horizon: self.horizon,
        }
    }
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,
}

fn parse_level(s: &str) -> Result<DigitizationLevel, String> {
    DigitizationLevel::parse(s).ok_or_else(|| format!("unknown digitization level '{s}'"))
}

fn parse_scenario(s: &str) -> Result<Scenario, String> {
    Scenario::parse(s).ok_or_else(|| format!("unknown scenario '{s}'"))
}

fn parse_horizon(s: &str) -> Result<Horizon, String> {
    let months: u32 = s
        .trim()
        .parse()
        .map_err(|_| format!("horizon must be a number of months, got '{s}'"))?;
    Horizon::try_from(months)
}
