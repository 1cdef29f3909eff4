#![allow(dead_code)]

use serde::Serialize;

/// Outcome of the safety gate. Independent of the quality score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetyReport {
    pub ok: bool,
    pub reasons: Vec<String>,
}

/// What the cost units count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostUnit {
    /// Character counts of the prompt and the raw completion.
    Characters,
    /// Provider-reported token counts.
    Tokens,
}

/// Billing proxy for one variant. Not currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CostEstimate {
    pub input_units: u64,
    pub output_units: u64,
    pub unit: CostUnit,
}

/// One candidate caption. Built once by the orchestrator and never mutated;
/// approval and persistence happen downstream by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    id: String,
    text: String,
    hashtags: Vec<String>,
    score: u8,
    score_reasons: Vec<String>,
    safety: SafetyReport,
    cost: CostEstimate,
}

impl Variant {
    pub(crate) fn new(
        id: String,
        text: String,
        hashtags: Vec<String>,
        score: u8,
        score_reasons: Vec<String>,
        safety: SafetyReport,
        cost: CostEstimate,
    ) -> Self {
        Self {
            id,
            text,
            hashtags,
            score,
            score_reasons,
            safety,
            cost,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn hashtags(&self) -> &[String] {
        &self.hashtags
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn score_reasons(&self) -> &[String] {
        &self.score_reasons
    }

    pub fn safety(&self) -> &SafetyReport {
        &self.safety
    }

    pub fn cost(&self) -> CostEstimate {
        self.cost
    }
}
