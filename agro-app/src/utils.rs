use agro_core::InvestmentMode;
use rust_decimal::Decimal;
use thiserror::Error;

/// Error returned when command-line or form input cannot be interpreted.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("invalid decimal '{input}': {source}")]
    InvalidDecimal {
        input: String,
        #[source]
        source: rust_decimal::Error,
    },

    #[error("invalid peso amount '{0}': expected digits with optional '.' grouping")]
    InvalidAmount(String),

    #[error("investment plan id is empty")]
    EmptyPlanId,
}

/// Normalizes input for decimal parsing: trims whitespace and removes commas (thousands separator).
fn normalize_decimal_input(s: &str) -> String {
    s.trim().replace(',', "")
}

/// Parses a string into a [`Decimal`].
///
/// Handles comma as thousands separator (e.g. `"1,234.5"`).
/// Empty or whitespace-only input is treated as 0.
pub fn parse_decimal(s: &str) -> Result<Decimal, InputError> {
    let normalized = normalize_decimal_input(s);
    if normalized.is_empty() {
        return Ok(Decimal::ZERO);
    }
    normalized.parse().map_err(|e| {
        tracing::error!(input = %s, "invalid decimal: {}", e);
        InputError::InvalidDecimal {
            input: s.to_string(),
            source: e,
        }
    })
}

/// Parses a whole-peso amount as typed in Chilean notation.
///
/// Accepts an optional leading `$` and `.` as the thousands separator, so
/// `"$12.000.000"`, `"12.000.000"` and `"12000000"` are all twelve million.
/// Signs, decimals and any other character are rejected.
pub fn parse_clp_amount(s: &str) -> Result<Decimal, InputError> {
    let trimmed = s.trim();
    let digits: String = trimmed
        .strip_prefix('$')
        .unwrap_or(trimmed)
        .trim()
        .chars()
        .filter(|c| *c != '.')
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(InputError::InvalidAmount(s.to_string()));
    }
    digits
        .parse()
        .map_err(|_| InputError::InvalidAmount(s.to_string()))
}

/// Parses an investment selector.
///
/// | input          | mode                            |
/// |----------------|---------------------------------|
/// | `auto`         | [`InvestmentMode::Automatic`]   |
/// | `plan:<id>`    | [`InvestmentMode::Plan`]        |
/// | a peso amount  | [`InvestmentMode::Manual`]      |
pub fn parse_investment(s: &str) -> Result<InvestmentMode, InputError> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("auto") || trimmed.eq_ignore_ascii_case("automatic") {
        return Ok(InvestmentMode::Automatic);
    }
    if let Some(plan_id) = trimmed.strip_prefix("plan:") {
        let plan_id = plan_id.trim();
        if plan_id.is_empty() {
            return Err(InputError::EmptyPlanId);
        }
        return Ok(InvestmentMode::Plan {
            plan_id: plan_id.to_lowercase(),
        });
    }
    Ok(InvestmentMode::Manual {
        amount: parse_clp_amount(trimmed)?,
    })
}
