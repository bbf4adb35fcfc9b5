//! Scoring strategies for backend responses.
//!
//! A backend answers 200 whether or not it managed to transform the
//! payload, so the status alone says nothing about quality. Each strategy
//! looks at the parsed response body and returns a score where higher is
//! better: `[0, 1]` for comparable responses and [`INVALID_SCORE`] for
//! responses that must never be selected.

use std::fmt;

use serde_json::{Map, Value};

pub const BEST_SCORE: f64 = 1.0;
pub const WORST_SCORE: f64 = 0.0;
pub const INVALID_SCORE: f64 = -1.0;

/// The configured way of ranking responses. Chosen once at start-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScoreStrategy {
    /// Any response carrying a `dataSet` key is as good as any other.
    #[default]
    Basic,
    /// Fraction of fields in the returned `dataSet` that no longer contain
    /// the restricted-text marker.
    Percentage,
}

impl ScoreStrategy {
    /// Resolve a strategy by its configured name, falling back to
    /// [`ScoreStrategy::Basic`] for unknown names.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "basic" => ScoreStrategy::Basic,
            "percentage" => ScoreStrategy::Percentage,
            other => {
                tracing::warn!(score_function = %other, "Unknown score function, using basic");
                ScoreStrategy::Basic
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreStrategy::Basic => "basic",
            ScoreStrategy::Percentage => "percentage",
        }
    }

    /// Score a parsed response body.
    pub fn score(&self, response: &Value, restricted_text: &str) -> f64 {
        match self {
            ScoreStrategy::Basic => basic_score(response),
            ScoreStrategy::Percentage => percentage_score(response, restricted_text),
        }
    }
}

impl fmt::Display for ScoreStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn basic_score(response: &Value) -> f64 {
    if response.get("dataSet").is_some() {
        return BEST_SCORE;
    }
    tracing::warn!("Response does not contain the 'dataSet' key");
    WORST_SCORE
}

fn percentage_score(response: &Value, restricted_text: &str) -> f64 {
    let Some(raw) = response.get("dataSet").and_then(Value::as_str) else {
        tracing::warn!("Response 'dataSet' is missing or not a string");
        return INVALID_SCORE;
    };

    let data_set: Map<String, Value> = match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!(error = %e, "Response 'dataSet' is not a JSON object");
            return INVALID_SCORE;
        }
    };

    let tally = count_fields(&data_set, restricted_text);
    if tally.total == 0 {
        // Nothing to measure: cannot beat the selection floor.
        return WORST_SCORE;
    }

    1.0 - tally.matches as f64 / tally.total as f64
}

#[derive(Debug, Default, PartialEq, Eq)]
struct FieldTally {
    matches: usize,
    total: usize,
}

/// Walk every key/value pair of `object`, recursing into nested objects and
/// into objects held in arrays. Every pair counts toward `total`; string
/// values containing `pattern` count toward `matches`.
fn count_fields(object: &Map<String, Value>, pattern: &str) -> FieldTally {
    let mut tally = FieldTally::default();

    for value in object.values() {
        tally.total += 1;
        match value {
            Value::String(s) => {
                if s.contains(pattern) {
                    tally.matches += 1;
                }
            }
            Value::Object(nested) => tally.absorb(count_fields(nested, pattern)),
            Value::Array(items) => {
                for nested in items.iter().filter_map(Value::as_object) {
                    tally.absorb(count_fields(nested, pattern));
                }
            }
            _ => {}
        }
    }

    tally
}

impl FieldTally {
    fn absorb(&mut self, other: FieldTally) {
        self.matches += other.matches;
        self.total += other.total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn with_data_set(data_set: Value) -> Value {
        json!({ "dataSet": data_set.to_string() })
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ScoreStrategy::from_name("basic"), ScoreStrategy::Basic);
        assert_eq!(ScoreStrategy::from_name("Percentage"), ScoreStrategy::Percentage);
        assert_eq!(ScoreStrategy::from_name(" percentage "), ScoreStrategy::Percentage);
        assert_eq!(ScoreStrategy::from_name("best-effort"), ScoreStrategy::Basic);
        assert_eq!(ScoreStrategy::from_name(""), ScoreStrategy::Basic);
    }

    #[test]
    fn test_basic_checks_data_set_key() {
        let strategy = ScoreStrategy::Basic;
        assert_eq!(strategy.score(&json!({"dataSet": "{}"}), "X"), BEST_SCORE);
        assert_eq!(strategy.score(&json!({"dataSet": null}), "X"), BEST_SCORE);
        assert_eq!(strategy.score(&json!({"other": 1}), "X"), WORST_SCORE);
    }

    #[test]
    fn test_percentage_fully_transformed() {
        let response = with_data_set(json!({
            "name": "Jane",
            "email": "jane@example.com",
            "age": 41,
            "active": true
        }));
        assert_eq!(ScoreStrategy::Percentage.score(&response, "RESTRICTED"), 1.0);
    }

    #[test]
    fn test_percentage_is_one_minus_ratio() {
        let response = with_data_set(json!({
            "name": "RESTRICTED",
            "email": "RESTRICTED",
            "city": "Leeds",
            "zip": "LS1"
        }));
        assert_eq!(ScoreStrategy::Percentage.score(&response, "RESTRICTED"), 0.5);
    }

    #[test]
    fn test_percentage_strictly_decreases_with_matches() {
        let mut previous = f64::INFINITY;
        for m in 0..=4 {
            let mut fields = Map::new();
            for i in 0..4 {
                let value = if i < m { "xxRESTRICTEDxx" } else { "plain" };
                fields.insert(format!("f{i}"), Value::String(value.to_string()));
            }
            let score = ScoreStrategy::Percentage
                .score(&with_data_set(Value::Object(fields)), "RESTRICTED");
            assert_eq!(score, 1.0 - m as f64 / 4.0);
            assert!(score < previous);
            previous = score;
        }
    }

    #[test]
    fn test_nested_objects_and_arrays_counted() {
        let data_set = json!({
            "person": { "name": "RESTRICTED", "id": 7 },
            "cards": [ { "pan": "RESTRICTED" }, { "pan": "4111" }, "RESTRICTED" ],
            "note": "ok"
        });
        let object = data_set.as_object().unwrap();
        // person(1) + name(1) + id(1) + cards(1) + pan(1) + pan(1) + note(1)
        assert_eq!(
            count_fields(object, "RESTRICTED"),
            FieldTally {
                matches: 2,
                total: 7
            }
        );
    }

    #[test]
    fn test_percentage_empty_object_scores_floor() {
        let response = with_data_set(json!({}));
        assert_eq!(ScoreStrategy::Percentage.score(&response, "X"), WORST_SCORE);
    }

    #[test]
    fn test_percentage_invalid_inputs() {
        let strategy = ScoreStrategy::Percentage;
        assert_eq!(strategy.score(&json!({"other": 1}), "X"), INVALID_SCORE);
        assert_eq!(strategy.score(&json!({"dataSet": {"a": 1}}), "X"), INVALID_SCORE);
        assert_eq!(strategy.score(&json!({"dataSet": "not json"}), "X"), INVALID_SCORE);
        assert_eq!(strategy.score(&json!({"dataSet": "[1,2]"}), "X"), INVALID_SCORE);
    }
}
