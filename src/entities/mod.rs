// Entity Models - income, expenses, debts and preferences
//
// Each entity has:
// - A stable string id (the exact-match key for identifier resolution)
// - A display label that doubles as an alias source (name / category)
// - An attribute locator enum naming every attribute an answer may write
//
// Locators replace string-path traversal: a field_id is parsed once into a
// locator, and the locator owns the type check and the setter.

pub mod income;
pub mod expense;
pub mod debt;
pub mod preferences;

pub use income::{Income, IncomeField, IncomeStability, IncomeType};
pub use expense::Expense;
pub use debt::{Debt, DebtField, DebtPriority, RateChange};
pub use preferences::{OptimizationFocus, PreferenceField, Preferences};

use serde_json::Value;

// ============================================================================
// VALUE COERCION HELPERS
// ============================================================================

/// Strict boolean: `true`/`false` only, never a truthy int or string
pub(crate) fn strict_bool(value: &Value) -> Option<bool> {
    value.as_bool()
}

/// Any JSON number, widened to f64
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// A string with at least one non-whitespace character, trimmed
pub(crate) fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Case-insensitive enum lookup against a list of canonical lowercase names
pub(crate) fn choice<T: Copy>(value: &Value, options: &[(&str, T)]) -> Option<T> {
    let normalized = value.as_str()?.trim().to_lowercase();
    options
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, variant)| *variant)
}

/// "one of: a, b, c" description for enum-valued attributes
pub(crate) fn one_of(names: &[&str]) -> String {
    format!("one of: {}", names.join(", "))
}
