use crate::llm::error::PipelineError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A single cell from the portfolio source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Int, then float, then text; blank cells are null.
    pub fn infer(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return Scalar::Null;
        }
        if let Ok(n) = s.parse::<i64>() {
            return Scalar::Int(n);
        }
        if let Ok(n) = s.parse::<f64>() {
            if n.is_finite() {
                return Scalar::Float(n);
            }
        }
        Scalar::Text(s.to_string())
    }
}

/// One row of the source table, keyed by column name in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Holding {
    fields: Vec<(String, Scalar)>,
}

impl Holding {
    pub fn new(fields: Vec<(String, Scalar)>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[(String, Scalar)] {
        &self.fields
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }
}

impl Serialize for Holding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortfolioSnapshot {
    holdings: Vec<Holding>,
}

impl PortfolioSnapshot {
    pub fn new(holdings: Vec<Holding>) -> Self {
        Self { holdings }
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Compact records, one JSON object per holding per line, inside a JSON array.
    pub fn records_json(&self) -> String {
        if self.holdings.is_empty() {
            return "[]".to_string();
        }
        let lines: Vec<String> = self
            .holdings
            .iter()
            .map(|h| serde_json::to_string(h).unwrap_or_else(|_| "{}".to_string()))
            .collect();
        format!("[\n{}\n]", lines.join(",\n"))
    }
}

#[derive(Debug, Clone)]
pub struct PlanningRequest {
    pub goal: String,
    pub horizon_years: String,
    pub risk_tolerance: String,
    pub snapshot: PortfolioSnapshot,
}

impl PlanningRequest {
    pub fn try_new(
        goal: impl Into<String>,
        horizon_years: impl ToString,
        risk_tolerance: impl Into<String>,
        snapshot: PortfolioSnapshot,
    ) -> Result<Self, PipelineError> {
        let goal = goal.into();
        let risk_tolerance = risk_tolerance.into();
        if goal.trim().is_empty() {
            return Err(PipelineError::InvalidRequest("goal must be non-empty".to_string()));
        }
        if risk_tolerance.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "risk tolerance must be non-empty".to_string(),
            ));
        }

        Ok(Self {
            goal,
            horizon_years: horizon_years.to_string(),
            risk_tolerance,
            snapshot,
        })
    }
}
