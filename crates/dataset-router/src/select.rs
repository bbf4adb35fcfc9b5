//! Picking the best response among everything the targets returned.

use axum::http::StatusCode;
use tokio::sync::mpsc;

use crate::evaluate::{ScoreStrategy, INVALID_SCORE, WORST_SCORE};
use crate::response::ForwardResult;

/// The winning response and the score it won with.
#[derive(Debug)]
pub struct Selection {
    pub result: ForwardResult,
    pub score: f64,
}

/// Canonical form used to detect responses that changed nothing: newlines
/// and spaces removed, double quotes turned into single quotes.
pub fn normalize(data_set: &str) -> String {
    data_set
        .chars()
        .filter(|c| *c != '\n' && *c != ' ')
        .map(|c| if c == '"' { '\'' } else { c })
        .collect()
}

/// Scores responses with the configured strategy and keeps the best one.
#[derive(Debug, Clone, Copy)]
pub struct ResponseSelector {
    strategy: ScoreStrategy,
}

impl ResponseSelector {
    pub fn new(strategy: ScoreStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ScoreStrategy {
        self.strategy
    }

    /// Drain `results` and return the highest-scoring one.
    ///
    /// Only a score strictly above zero can win. Among equal scores the
    /// first one received is kept, so ties follow completion order.
    pub async fn select(
        &self,
        mut results: mpsc::Receiver<ForwardResult>,
        restricted_text: &str,
        original_data_set: &str,
    ) -> Option<Selection> {
        let original = normalize(original_data_set);
        let mut best: Option<Selection> = None;
        let mut best_score = WORST_SCORE;

        while let Some(result) = results.recv().await {
            let score = self.score(&result, restricted_text, &original);
            tracing::debug!(target = %result.target, score, "Evaluated response");

            if score > best_score {
                tracing::debug!(target = %result.target, score, "New best response");
                best_score = score;
                best = Some(Selection { result, score });
            }
        }

        tracing::debug!(
            score_function = %self.strategy,
            score = best_score,
            selected = best.is_some(),
            "Selection finished"
        );
        best
    }

    /// Score one captured response. `original` must already be normalized.
    fn score(&self, result: &ForwardResult, restricted_text: &str, original: &str) -> f64 {
        if result.status != StatusCode::OK {
            return INVALID_SCORE;
        }

        let parsed: serde_json::Value = match serde_json::from_slice(&result.body) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target = %result.target, error = %e, "Failed to parse response body");
                return INVALID_SCORE;
            }
        };

        if let Some(data_set) = parsed.get("dataSet").and_then(|v| v.as_str()) {
            if normalize(data_set) == original {
                tracing::debug!(target = %result.target, "Response identical to request, discarding");
                return INVALID_SCORE;
            }
        }

        self.strategy.score(&parsed, restricted_text)
    }
}
