use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Digital maturity level derived from the self-diagnostic score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    #[serde(rename = "inicial")]
    Initial,
    #[serde(rename = "basico")]
    Basic,
    #[serde(rename = "intermedio")]
    Intermediate,
    #[serde(rename = "avanzado")]
    Advanced,
}

impl DiagnosticLevel {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Initial => "inicial",
            Self::Basic => "basico",
            Self::Intermediate => "intermedio",
            Self::Advanced => "avanzado",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Initial => "Inicial",
            Self::Basic => "Básico",
            Self::Intermediate => "Intermedio",
            Self::Advanced => "Avanzado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inicial" => Some(Self::Initial),
            "basico" => Some(Self::Basic),
            "intermedio" => Some(Self::Intermediate),
            "avanzado" => Some(Self::Advanced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionScore {
    pub id: String,
    pub title: String,
    /// Rounded percentage of the section's maximum.
    pub pct: u32,
}

/// A survey submission as received from the client.
///
/// `answers` is keyed `"{section_id}-{question_index}"` with Likert values 1..=5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDiagnosticResponse {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub sector: String,
    pub answers: BTreeMap<String, u8>,
}

/// A scored and stored survey response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticResponse {
    /// Storage key, `diagnostico/{timestamp}_{phone digits}`.
    pub key: String,
    pub submitted_at: DateTime<Utc>,
    pub name: String,
    pub phone: String,
    pub region: String,
    pub sector: String,
    pub score: u32,
    pub max: u32,
    pub pct: u32,
    pub level: DiagnosticLevel,
    pub sections: Vec<SectionScore>,
    pub answers: BTreeMap<String, u8>,
    pub user_agent: String,
    pub client_ip: String,
    pub source: String,
}
