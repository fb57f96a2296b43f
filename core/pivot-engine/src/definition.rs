//! FILENAME: core/pivot-engine/src/definition.rs
//! Pivot query definition - the serializable configuration.
//!
//! This module contains the types that DESCRIBE a pivot request: which
//! dimensions go on each axis, which measures are aggregated and how, which
//! raw values pass the filters, and which calculated columns run before and
//! after grouping.

use model::CalculationSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Upper bound on measures per query.
pub const MAX_MEASURES: usize = 6;

/// Display label used for absent grouping values; sorts after every real
/// value.
pub const EMPTY_CELL_LABEL: &str = "Células Vazias";

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Aggregator {
    Sum,
    Avg,
    Count,
    #[serde(alias = "distinct_count")]
    DistinctCount,
    Min,
    Max,
}

impl Aggregator {
    /// Every aggregator, in presentation order.
    pub const ALL: [Aggregator; 6] = [
        Aggregator::Sum,
        Aggregator::Avg,
        Aggregator::Count,
        Aggregator::DistinctCount,
        Aggregator::Min,
        Aggregator::Max,
    ];

    /// Resolves the wire identifier. Accepts the snake_case spelling the
    /// older front-end sends for distinct counts.
    pub fn from_id(id: &str) -> Option<Aggregator> {
        match id {
            "sum" => Some(Aggregator::Sum),
            "avg" => Some(Aggregator::Avg),
            "count" => Some(Aggregator::Count),
            "distinctCount" | "distinct_count" => Some(Aggregator::DistinctCount),
            "min" => Some(Aggregator::Min),
            "max" => Some(Aggregator::Max),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Aggregator::Sum => "sum",
            Aggregator::Avg => "avg",
            Aggregator::Count => "count",
            Aggregator::DistinctCount => "distinctCount",
            Aggregator::Min => "min",
            Aggregator::Max => "max",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Aggregator::Sum => "Somar",
            Aggregator::Avg => "Média",
            Aggregator::Count => "Contagem",
            Aggregator::DistinctCount => "Contagem distinta",
            Aggregator::Min => "Mínimo",
            Aggregator::Max => "Máximo",
        }
    }

    /// Whether results of this aggregator can carry a currency format.
    /// Counting aggregators are always plain numbers.
    pub fn supports_currency(&self) -> bool {
        matches!(
            self,
            Aggregator::Sum | Aggregator::Avg | Aggregator::Min | Aggregator::Max
        )
    }
}

/// How cell values should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    Number,
    Currency,
}

/// Measure names that look monetary.
pub fn name_is_currency(name: &str) -> bool {
    let folded = model::collate::sort_key(name);
    ["valor", "saldo", "empenho", "executado", "estimado"]
        .iter()
        .any(|token| folded.contains(token))
}

/// One aggregator option as advertised to clients after upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationOption {
    pub id: String,
    pub label: String,
    pub format: ValueFormat,
}

/// Builds the option list for a dataset: an option advertises currency when
/// the aggregator supports it and at least one measure name looks monetary.
pub fn aggregation_options(measure_names: &[String]) -> Vec<AggregationOption> {
    let any_currency = measure_names.iter().any(|name| name_is_currency(name));
    Aggregator::ALL
        .iter()
        .map(|agg| AggregationOption {
            id: agg.id().to_string(),
            label: agg.label().to_string(),
            format: if agg.supports_currency() && any_currency {
                ValueFormat::Currency
            } else {
                ValueFormat::Number
            },
        })
        .collect()
}

// ============================================================================
// QUERY
// ============================================================================

/// The complete pivot request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotQuery {
    pub dataset_id: String,

    /// Row dimensions, outermost first.
    #[serde(default)]
    pub rows: Vec<String>,

    /// Column dimensions, outermost first.
    #[serde(default)]
    pub columns: Vec<String>,

    /// Measures in caller order; the first is the primary measure.
    #[serde(default)]
    pub measures: Vec<String>,

    /// Legacy single-measure field, honored when `measures` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure: Option<String>,

    /// Aggregator identifier; resolved at query time so unknown values get
    /// a typed rejection instead of a deserialization failure.
    #[serde(default = "default_aggregator")]
    pub aggregator: String,

    /// Allow-sets per column key, matched against stringified values.
    #[serde(default)]
    pub filters: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub pre_calculations: Vec<CalculationSpec>,

    #[serde(default)]
    pub post_calculations: Vec<CalculationSpec>,
}

fn default_aggregator() -> String {
    "sum".to_string()
}

impl PivotQuery {
    /// The measure list actually used: `measures` deduplicated preserving
    /// order, falling back to the legacy `measure` field.
    pub fn effective_measures(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let candidates: Vec<&String> = if self.measures.is_empty() {
            self.measure.iter().collect()
        } else {
            self.measures.iter().collect()
        };
        for measure in candidates {
            if !measure.is_empty() && !out.iter().any(|m| m == measure) {
                out.push(measure.clone());
            }
        }
        out
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum PivotError {
    #[error("É necessário escolher pelo menos uma medida numérica.")]
    NoMeasure,

    #[error("No máximo {MAX_MEASURES} medidas são suportadas; {0} foram solicitadas.")]
    TooManyMeasures(usize),

    #[error("Agregador '{0}' não é suportado.")]
    UnknownAggregator(String),

    #[error("Coluna '{0}' não encontrada na base carregada.")]
    UnknownColumn(String),

    #[error("{0}")]
    InvalidExpression(String),

    #[error("Consulta cancelada pelo cliente.")]
    Cancelled,

    #[error("Tempo limite excedido ao gerar a tabela dinâmica.")]
    Timeout,
}

impl From<model::CalcError> for PivotError {
    fn from(err: model::CalcError) -> Self {
        PivotError::InvalidExpression(err.to_string())
    }
}

impl From<parser::ParseError> for PivotError {
    fn from(err: parser::ParseError) -> Self {
        PivotError::InvalidExpression(err.to_string())
    }
}
