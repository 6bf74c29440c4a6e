// 📊 Unified Budget Model - the snapshot passed between pipeline stages
//
// Snapshots are values: stages read one and produce a new one.
// `summary` is derived from income/expenses and never trusted from input.

use crate::entities::{Debt, Expense, Income, Preferences};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_income: f64,
    pub total_expenses: f64,
    /// total_income - total_expenses (negative = shortfall)
    pub surplus: f64,
}

impl Summary {
    pub fn from_lists(income: &[Income], expenses: &[Expense]) -> Self {
        let total_income: f64 = income.iter().map(|i| i.monthly_amount).sum();
        let total_expenses: f64 = expenses.iter().map(|e| e.monthly_amount).sum();
        Summary {
            total_income,
            total_expenses,
            surplus: total_income - total_expenses,
        }
    }
}

// ============================================================================
// UNIFIED BUDGET MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnifiedBudgetModel {
    #[serde(default)]
    pub income: Vec<Income>,

    #[serde(default)]
    pub expenses: Vec<Expense>,

    #[serde(default)]
    pub debts: Vec<Debt>,

    #[serde(default)]
    pub preferences: Preferences,

    #[serde(default)]
    pub summary: Summary,
}

impl UnifiedBudgetModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append an income
    pub fn with_income(mut self, income: Income) -> Self {
        self.income.push(income);
        self
    }

    /// Builder: append an expense
    pub fn with_expense(mut self, expense: Expense) -> Self {
        self.expenses.push(expense);
        self
    }

    /// Builder: append a debt
    pub fn with_debt(mut self, debt: Debt) -> Self {
        self.debts.push(debt);
        self
    }

    /// Parse a model from JSON. A payload that is not an object is a caller
    /// contract violation and surfaces as an error here, before validation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).context("Failed to parse budget model JSON")?;
        Self::from_value(value)
    }

    /// Same as `from_json_str`, from an already-parsed document
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            bail!("Budget model must be a JSON object");
        }
        let mut model: UnifiedBudgetModel =
            serde_json::from_value(value).context("Failed to parse budget model JSON")?;
        model.recompute_summary();
        Ok(model)
    }

    /// Load a model from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read model file: {:?}", path.as_ref()))?;
        Self::from_json_str(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize budget model")
    }

    /// SHA-256 over the canonical JSON encoding.
    /// Equal fingerprints mean byte-identical snapshots.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        // Serializing plain structs and maps of JSON values cannot fail.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    pub fn recompute_summary(&mut self) {
        self.summary = Summary::from_lists(&self.income, &self.expenses);
    }

    /// Index of the income with the greatest monthly amount.
    /// Ties go to the first one seen.
    pub fn primary_income_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, income) in self.income.iter().enumerate() {
            match best {
                Some((_, amount)) if income.monthly_amount <= amount => {}
                _ => best = Some((index, income.monthly_amount)),
            }
        }
        best.map(|(index, _)| index)
    }

    pub fn primary_income(&self) -> Option<&Income> {
        self.primary_income_index().map(|i| &self.income[i])
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_model() -> UnifiedBudgetModel {
        UnifiedBudgetModel::new()
            .with_income(Income::new("side", "Side Gig", 800.0))
            .with_income(Income::new("salary", "Salary", 4200.0))
            .with_expense(Expense::new("housing", "Housing", 1800.0))
            .with_expense(Expense::new("groceries", "Groceries", 600.0))
            .with_debt(Debt::new("debt-1", "Visa", 3000.0))
    }

    #[test]
    fn test_primary_income_is_largest() {
        let model = sample_model();
        assert_eq!(model.primary_income().unwrap().id, "salary");
    }

    #[test]
    fn test_primary_income_tie_goes_to_first_seen() {
        let model = UnifiedBudgetModel::new()
            .with_income(Income::new("a", "A", 1000.0))
            .with_income(Income::new("b", "B", 1000.0));
        assert_eq!(model.primary_income_index(), Some(0));
    }

    #[test]
    fn test_no_income_has_no_primary() {
        assert!(UnifiedBudgetModel::new().primary_income().is_none());
    }

    #[test]
    fn test_summary_is_recomputed_not_trusted() {
        let json = json!({
            "income": [{"id": "salary", "name": "Salary", "monthly_amount": 5000.0}],
            "expenses": [{"id": "rent", "category": "Rent", "monthly_amount": 2000.0}],
            "summary": {"total_income": 1.0, "total_expenses": 1.0, "surplus": 0.0}
        });

        let model = UnifiedBudgetModel::from_json_str(&json.to_string()).unwrap();
        assert_eq!(model.summary.total_income, 5000.0);
        assert_eq!(model.summary.total_expenses, 2000.0);
        assert_eq!(model.summary.surplus, 3000.0);
    }

    #[test]
    fn test_partial_model_deserializes() {
        let model = UnifiedBudgetModel::from_json_str("{}").unwrap();
        assert!(model.income.is_empty());
        assert!(model.preferences.protect_essentials);
    }

    #[test]
    fn test_non_object_model_is_rejected() {
        assert!(UnifiedBudgetModel::from_json_str("[1, 2, 3]").is_err());
        assert!(UnifiedBudgetModel::from_json_str("\"budget\"").is_err());
        assert!(UnifiedBudgetModel::from_value(json!([])).is_err());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let model = sample_model();
        let same = sample_model();
        assert_eq!(model.fingerprint(), same.fingerprint());
        assert_eq!(model.fingerprint().len(), 64);

        let mut changed = sample_model();
        changed.expenses[0].essential = Some(true);
        assert_ne!(model.fingerprint(), changed.fingerprint());
    }
}
