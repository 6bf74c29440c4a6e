// 🧾 Expense Entity - monthly spending lines
//
// `category` is the display label and the alias source.
// `essential` stays None until the user classifies the expense.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Stable identity (e.g., "housing")
    #[serde(default)]
    pub id: String,

    /// Display label (e.g., "Housing", "Credit Card Payment")
    #[serde(default)]
    pub category: String,

    /// Non-negative monthly amount
    #[serde(default)]
    pub monthly_amount: f64,

    /// Non-discretionary flag. None = not yet classified
    #[serde(default)]
    pub essential: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Expense {
    pub fn new(id: impl Into<String>, category: impl Into<String>, monthly_amount: f64) -> Self {
        Expense {
            id: id.into(),
            category: category.into(),
            monthly_amount,
            essential: None,
            notes: None,
        }
    }

    /// Builder: pre-classify the expense
    pub fn with_essential(mut self, essential: bool) -> Self {
        self.essential = Some(essential);
        self
    }

    pub fn is_classified(&self) -> bool {
        self.essential.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unclassified_expense_roundtrips_null() {
        let expense = Expense::new("housing", "Housing", 1800.0);
        assert!(!expense.is_classified());

        let value = serde_json::to_value(&expense).unwrap();
        assert_eq!(value["essential"], json!(null));
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn test_partial_expense_deserializes() {
        let expense: Expense = serde_json::from_value(json!({
            "id": "groceries",
            "category": "Groceries"
        }))
        .unwrap();

        assert_eq!(expense.monthly_amount, 0.0);
        assert_eq!(expense.essential, None);
    }
}
