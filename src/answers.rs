// 📝 Answer Batch - ordered (field_id, value) pairs from a UI or provider
//
// Accepted shapes:
// - {"essential_housing": true, "debt-1_balance": 1500}
// - [{"field_id": "essential_housing", "value": true}, ...]
//
// Document order is preserved so validation errors come back in input order.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Usually a string; anything else is reported as `not_a_string`
    pub field_id: Value,
    #[serde(default)]
    pub value: Value,
}

impl Answer {
    pub fn new(field_id: impl Into<String>, value: Value) -> Self {
        Answer {
            field_id: Value::String(field_id.into()),
            value,
        }
    }

    pub fn field_id_str(&self) -> Option<&str> {
        self.field_id.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerBatch {
    answers: Vec<Answer>,
}

impl AnswerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append one answer
    pub fn with(mut self, field_id: impl Into<String>, value: Value) -> Self {
        self.answers.push(Answer::new(field_id, value));
        self
    }

    pub fn push(&mut self, answer: Answer) {
        self.answers.push(answer);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Answer> {
        self.answers.iter()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Field ids that are strings, in batch order (for audit records)
    pub fn field_ids(&self) -> Vec<String> {
        self.answers
            .iter()
            .filter_map(|a| a.field_id_str().map(str::to_string))
            .collect()
    }

    /// Build from either accepted JSON shape.
    /// Any other shape is a caller contract violation.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::from(map)),
            Value::Array(items) => {
                let answers = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| {
                        if !item.is_object() {
                            return Err(anyhow!(
                                "Answer #{} must be an object with field_id and value",
                                index
                            ));
                        }
                        serde_json::from_value::<Answer>(item)
                            .with_context(|| format!("Answer #{} is missing field_id", index))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(AnswerBatch { answers })
            }
            other => Err(anyhow!(
                "Answers must be a JSON object or array, got {}",
                json_type_name(&other)
            )),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).context("Failed to parse answers JSON")?;
        Self::from_value(value)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read answers file: {:?}", path.as_ref()))?;
        Self::from_json_str(&content)
    }
}

impl From<Map<String, Value>> for AnswerBatch {
    fn from(map: Map<String, Value>) -> Self {
        AnswerBatch {
            answers: map
                .into_iter()
                .map(|(field_id, value)| Answer::new(field_id, value))
                .collect(),
        }
    }
}

impl FromIterator<Answer> for AnswerBatch {
    fn from_iter<I: IntoIterator<Item = Answer>>(iter: I) -> Self {
        AnswerBatch {
            answers: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a AnswerBatch {
    type Item = &'a Answer;
    type IntoIter = std::slice::Iter<'a, Answer>;

    fn into_iter(self) -> Self::IntoIter {
        self.answers.iter()
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_preserves_document_order() {
        let batch = AnswerBatch::from_json_str(
            r#"{"zeta_balance": 1, "essential_housing": true, "alpha_priority": "high"}"#,
        )
        .unwrap();

        assert_eq!(
            batch.field_ids(),
            vec!["zeta_balance", "essential_housing", "alpha_priority"]
        );
    }

    #[test]
    fn test_array_form_keeps_non_string_field_ids() {
        let batch = AnswerBatch::from_value(json!([
            {"field_id": "essential_housing", "value": true},
            {"field_id": 42, "value": "x"}
        ]))
        .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.field_ids(), vec!["essential_housing"]);
        assert_eq!(batch.iter().nth(1).unwrap().field_id, json!(42));
    }

    #[test]
    fn test_missing_value_defaults_to_null() {
        let batch = AnswerBatch::from_value(json!([{"field_id": "essential_housing"}])).unwrap();
        assert_eq!(batch.iter().next().unwrap().value, Value::Null);
    }

    #[test]
    fn test_invalid_shapes_are_contract_violations() {
        assert!(AnswerBatch::from_value(json!("essential_housing")).is_err());
        assert!(AnswerBatch::from_value(json!([1, 2])).is_err());
        assert!(AnswerBatch::from_value(json!([{"value": true}])).is_err());
    }

    #[test]
    fn test_builder() {
        let batch = AnswerBatch::new()
            .with("essential_housing", json!(true))
            .with("debt-1_balance", json!(1500));
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
    }
}
