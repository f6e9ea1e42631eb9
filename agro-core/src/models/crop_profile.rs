use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Baseline improvement rates and official margin benchmark for one crop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropProfile {
    pub code: String,
    pub label: String,
    /// Base savings percentage (e.g. `10` for 10%).
    pub savings_pct: Decimal,
    /// Base productivity percentage.
    pub productivity_pct: Decimal,
    /// Published net margin per hectare. Negative when the crop loses money,
    /// `None` while no official figure is available.
    pub net_margin_per_hectare: Option<Decimal>,
}

impl CropProfile {
    /// Canonical form of a crop code: trimmed and uppercased.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    pub fn matches(
        &self,
        code: &str,
    ) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }

    /// Traditional southern crops with their conservative base rates.
    pub fn defaults() -> Vec<CropProfile> {
        vec![
            Self::builtin("TRIGO", "Trigo (sur)", 10, 10, Some(Decimal::from(-177_607))),
            Self::builtin("MAIZ", "Maíz grano (sur)", 10, 10, None),
            Self::builtin("AVENA", "Avena (sur)", 9, 8, None),
            Self::builtin("CEBADA", "Cebada (sur)", 9, 8, None),
            Self::builtin("RAPS", "Raps/Canola (sur)", 10, 9, None),
        ]
    }

    fn builtin(
        code: &str,
        label: &str,
        savings_pct: i64,
        productivity_pct: i64,
        net_margin_per_hectare: Option<Decimal>,
    ) -> Self {
        Self {
            code: code.to_string(),
            label: label.to_string(),
            savings_pct: Decimal::from(savings_pct),
            productivity_pct: Decimal::from(productivity_pct),
            net_margin_per_hectare,
        }
    }
}
