use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An entry of the consulting plan catalog, used by plan-based investment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub display_name: String,
    pub fixed_amount: Decimal,
}

impl Plan {
    pub fn defaults() -> Vec<Plan> {
        vec![
            Plan {
                id: "raiz".to_string(),
                display_name: "Plan Raíz Digital".to_string(),
                fixed_amount: Decimal::from(1_200_000),
            },
            Plan {
                id: "cosecha".to_string(),
                display_name: "Plan Cosecha".to_string(),
                fixed_amount: Decimal::from(2_400_000),
            },
        ]
    }
}
