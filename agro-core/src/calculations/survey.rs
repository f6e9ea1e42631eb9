//! Scoring of the digital-maturity self-diagnostic survey.
//!
//! The survey has five sections of Likert questions (1 = very low / never,
//! 5 = very high / always). Answers are keyed `"{section_id}-{index}"`.
//!
//! | Level       | Percentage of max score |
//! |-------------|-------------------------|
//! | Inicial     | [0, 40)                 |
//! | Básico      | [40, 70)                |
//! | Intermedio  | [70, 90)                |
//! | Avanzado    | [90, 100]               |
//!
//! Thresholds apply to the unrounded percentage; the reported percentage is
//! rounded half-up.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DiagnosticLevel, DiagnosticResponse, NewDiagnosticResponse, SectionScore};

/// Storage key prefix of every diagnostic record.
pub const DIAGNOSTIC_KEY_PREFIX: &str = "diagnostico/";

/// Source tag written on every stored record.
pub const DIAGNOSTIC_SOURCE: &str = "diagnostico-digital-bdata";

const MIN_ANSWER: u8 = 1;
const MAX_ANSWER: u8 = 5;

/// Sections scoring below this percentage get a recommendation.
const RECOMMENDATION_THRESHOLD_PCT: u32 = 50;

/// Overall percentage below which the entry plan is suggested.
const ENTRY_PLAN_THRESHOLD_PCT: u32 = 60;

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+?56)?\s?9\s?\d{4}\s?\d{4}$").expect("phone pattern is a valid regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SurveyError {
    #[error("{answered} of {expected} questions answered")]
    Incomplete { answered: usize, expected: usize },

    #[error("answer '{key}' must be between 1 and 5, got {value}")]
    InvalidAnswer { key: String, value: u8 },

    #[error("unknown question '{0}'")]
    UnknownQuestion(String),

    #[error("name is required")]
    InvalidName,

    #[error("invalid phone '{0}', expected +56 9 XXXX XXXX")]
    InvalidPhone(String),
}

/// One block of survey questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveySection {
    pub id: &'static str,
    pub title: &'static str,
    pub questions: &'static [&'static str],
    /// Tip shown when the section scores below 50%.
    pub recommendation: &'static str,
}

const SECTIONS: [SurveySection; 5] = [
    SurveySection {
        id: "gestion",
        title: "1.-Gestión y planificación",
        questions: &[
            "Planifica la temporada antes de iniciarla.",
            "Cuenta con un presupuesto definido para la temporada.",
            "Centraliza la información en un sistema único.",
            "Usa reportes o dashboards automáticos para revisar datos.",
            "Confía en la calidad de los datos que utiliza para decidir.",
        ],
        recommendation: "Parte por presupuesto y reportes básicos mensuales. Un tablero simple ya te ordena decisiones.",
    },
    SurveySection {
        id: "herramientas",
        title: "2.-Tecnologías y herramientas",
        questions: &[
            "Utiliza software agrícola o de gestión del campo.",
            "Registra las labores del campo en un sistema o app (no solo papel).",
            "Comparte información digitalmente con asesor o administración.",
            "Automatiza tareas (riego, informes, alertas, etc.).",
            "Le resulta fácil aprender y adoptar nuevas herramientas.",
        ],
        recommendation: "Formaliza registro en app/sistema y estandariza. Evita papel suelto.",
    },
    SurveySection {
        id: "conectividad",
        title: "3.-Conectividad e infraestructura",
        questions: &[
            "Cuenta con señal de internet en la mayoría de los sectores del campo.",
            "La señal permite usar aplicaciones o enviar datos desde terreno.",
            "El personal en terreno puede usar apps o sistemas directamente.",
            "Los problemas de conexión son raros u ocasionales.",
            "Dispone de dispositivos adecuados (smartphones / tablet / PC).",
        ],
        recommendation: "Asegura señal en los puntos críticos y define un “lugar con internet” para sincronizar.",
    },
    SurveySection {
        id: "datos",
        title: "4.-Uso de datos y automatización",
        questions: &[
            "Registra datos productivos (rendimientos, costos, aplicaciones, riego, etc.).",
            "Analiza los datos antes de tomar decisiones.",
            "Compara temporadas o lotes para mejorar resultados.",
            "Utiliza sensores / IoT / estaciones meteorológicas.",
            "Recibe alertas o recomendaciones automáticas (clima, plagas, riego, etc.).",
            "La información del campo llega a la oficina durante el mismo día.",
        ],
        recommendation: "Define qué registrar sí o sí (rendimiento, costos, aplicaciones) y revísalo 1 vez por semana.",
    },
    SurveySection {
        id: "adopcion",
        title: "5.-Disposición y adopción",
        questions: &[
            "Existe interés real en incorporar más herramientas digitales.",
            "Se sienten preparados para avanzar en digitalización.",
            "Cuentan con apoyo interno para implementar cambios.",
            "Hay disposición a capacitarse (tiempo y ganas).",
            "El factor resultados/retorno pesa más que el costo al decidir.",
        ],
        recommendation: "Alinea equipo y agenda 1 capacitación breve. Muestra resultados rápidos (ganancias visibles).",
    },
];

impl SurveySection {
    pub fn all() -> &'static [SurveySection] {
        &SECTIONS
    }

    pub fn total_questions() -> usize {
        SECTIONS.iter().map(|s| s.questions.len()).sum()
    }

    pub fn answer_key(
        &self,
        index: usize,
    ) -> String {
        format!("{}-{}", self.id, index)
    }

    fn max_score(&self) -> u32 {
        self.questions.len() as u32 * u32::from(MAX_ANSWER)
    }
}

/// Tip for a weak section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub section_id: String,
    pub title: String,
    pub tip: String,
}

/// Scored survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticScore {
    pub sum: u32,
    pub max: u32,
    /// Rounded percentage of `max`.
    pub pct: u32,
    pub level: DiagnosticLevel,
    pub message: String,
    pub sections: Vec<SectionScore>,
    pub recommendations: Vec<Recommendation>,
    /// Catalog plan id suggested for this maturity.
    pub recommended_plan: String,
}

impl DiagnosticScore {
    /// Builds the record persisted for a submission scored at `submitted_at`.
    pub fn to_record(
        &self,
        submission: &NewDiagnosticResponse,
        submitted_at: DateTime<Utc>,
        user_agent: &str,
        client_ip: &str,
    ) -> DiagnosticResponse {
        DiagnosticResponse {
            key: diagnostic_key(submitted_at, &submission.phone),
            submitted_at,
            name: submission.name.trim().to_string(),
            phone: submission.phone.trim().to_string(),
            region: submission.region.clone(),
            sector: submission.sector.clone(),
            score: self.sum,
            max: self.max,
            pct: self.pct,
            level: self.level,
            sections: self.sections.clone(),
            answers: submission.answers.clone(),
            user_agent: user_agent.to_string(),
            client_ip: client_ip.to_string(),
            source: DIAGNOSTIC_SOURCE.to_string(),
        }
    }
}

/// Scores a complete set of answers.
///
/// # Errors
///
/// Returns [`SurveyError`] if:
/// - a key does not name a survey question
/// - a value is outside 1..=5
/// - any question is unanswered
pub fn score(answers: &BTreeMap<String, u8>) -> Result<DiagnosticScore, SurveyError> {
    let mut known = 0;
    for section in SurveySection::all() {
        for index in 0..section.questions.len() {
            if answers.contains_key(&section.answer_key(index)) {
                known += 1;
            }
        }
    }
    if let Some(key) = answers.keys().find(|k| !is_question_key(k)) {
        return Err(SurveyError::UnknownQuestion(key.clone()));
    }
    if let Some((key, value)) = answers
        .iter()
        .find(|(_, v)| !(MIN_ANSWER..=MAX_ANSWER).contains(*v))
    {
        return Err(SurveyError::InvalidAnswer {
            key: key.clone(),
            value: *value,
        });
    }

    let expected = SurveySection::total_questions();
    if known != expected {
        return Err(SurveyError::Incomplete {
            answered: known,
            expected,
        });
    }

    let mut sum = 0;
    let mut sections = Vec::with_capacity(SECTIONS.len());
    let mut recommendations = Vec::new();
    for section in SurveySection::all() {
        let section_sum: u32 = (0..section.questions.len())
            .filter_map(|i| answers.get(&section.answer_key(i)))
            .map(|v| u32::from(*v))
            .sum();
        let pct = rounded_pct(section_sum, section.max_score());

        if pct < RECOMMENDATION_THRESHOLD_PCT {
            recommendations.push(Recommendation {
                section_id: section.id.to_string(),
                title: section.title.to_string(),
                tip: section.recommendation.to_string(),
            });
        }
        sections.push(SectionScore {
            id: section.id.to_string(),
            title: section.title.to_string(),
            pct,
        });
        sum += section_sum;
    }

    let max = SECTIONS.iter().map(SurveySection::max_score).sum();
    let level = level_for(sum, max);
    let pct = rounded_pct(sum, max);
    let recommended_plan = if pct < ENTRY_PLAN_THRESHOLD_PCT {
        "raiz"
    } else {
        "cosecha"
    };

    Ok(DiagnosticScore {
        sum,
        max,
        pct,
        level,
        message: level_message(level).to_string(),
        sections,
        recommendations,
        recommended_plan: recommended_plan.to_string(),
    })
}

/// Validates contact data, then scores the answers.
///
/// # Errors
///
/// Returns [`SurveyError::InvalidName`] or [`SurveyError::InvalidPhone`] for
/// bad contact data, otherwise any error from [`score`].
pub fn evaluate(submission: &NewDiagnosticResponse) -> Result<DiagnosticScore, SurveyError> {
    validate_contact(&submission.name, &submission.phone)?;
    score(&submission.answers)
}

/// Requires a non-blank name and a Chilean mobile number.
pub fn validate_contact(
    name: &str,
    phone: &str,
) -> Result<(), SurveyError> {
    if name.trim().is_empty() {
        return Err(SurveyError::InvalidName);
    }
    if !PHONE_PATTERN.is_match(phone.trim()) {
        return Err(SurveyError::InvalidPhone(phone.to_string()));
    }
    Ok(())
}

/// Maturity level for a raw score, compared without rounding.
pub fn level_for(
    sum: u32,
    max: u32,
) -> DiagnosticLevel {
    // sum / max < t / 100  <=>  100·sum < t·max
    let scaled = u64::from(sum) * 100;
    let max = u64::from(max);
    if scaled < 40 * max {
        DiagnosticLevel::Initial
    } else if scaled < 70 * max {
        DiagnosticLevel::Basic
    } else if scaled < 90 * max {
        DiagnosticLevel::Intermediate
    } else {
        DiagnosticLevel::Advanced
    }
}

pub fn level_message(level: DiagnosticLevel) -> &'static str {
    match level {
        DiagnosticLevel::Initial => {
            "Estás dando los primeros pasos. Parte por ordenar registros básicos, definir presupuesto y asegurar conectividad mínima."
        }
        DiagnosticLevel::Basic => {
            "Ya tienes base. Siguiente salto: centralizar la información y automatizar reportes simples."
        }
        DiagnosticLevel::Intermediate => {
            "Buen avance. Es momento de integrar sensores/IoT y automatizar riego/alertas, conectando sistemas."
        }
        DiagnosticLevel::Advanced => {
            "Excelente nivel. Puedes ir por analítica avanzada, modelos predictivos y orquestación end-to-end."
        }
    }
}

/// `diagnostico/{RFC 3339 timestamp}_{last 8 phone digits}`.
pub fn diagnostic_key(
    submitted_at: DateTime<Utc>,
    phone: &str,
) -> String {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    let tail: String = digits[digits.len().saturating_sub(8)..].iter().collect();
    format!(
        "{DIAGNOSTIC_KEY_PREFIX}{}_{tail}",
        submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

fn is_question_key(key: &str) -> bool {
    SurveySection::all().iter().any(|section| {
        key.strip_prefix(section.id)
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|index| index.parse::<usize>().ok())
            .is_some_and(|index| index < section.questions.len() && key == section.answer_key(index))
    })
}

/// Half-up rounded `part / whole × 100`; zero when `whole` is zero.
fn rounded_pct(
    part: u32,
    whole: u32,
) -> u32 {
    if whole == 0 {
        return 0;
    }
    let part = u64::from(part);
    let whole = u64::from(whole);
    ((part * 200 + whole) / (2 * whole)) as u32
}
