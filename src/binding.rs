// 🧭 Field Binding Interpreter - field_id string → structural binding
//
// Grammar, first match wins (the order is load-bearing):
// 1. Legacy flat names       optimization_focus, primary_income_type, ...
// 2. Essential prefix        essential_<expense id>
// 3. Legacy debt suffixes    <debt id>_interest_rate, <debt id>_balance, ...
// 4. Dot paths               preferences.<field>
//                            income.<id>.<path...>
//                            debts.<id>.<path...>
//                            expenses.<id>.essential
//
// The interpreter is purely syntactic: it never looks at a model. Whether
// the target exists and the path is supported is the validator's job.

use crate::entities::DebtField;
use serde::Serialize;
use std::fmt;

const ESSENTIAL_PREFIX: &str = "essential_";

// ============================================================================
// BINDING TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    ExpenseEssential,
    Preferences,
    Income,
    Debt,
}

impl BindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingKind::ExpenseEssential => "expense_essential",
            BindingKind::Preferences => "preferences",
            BindingKind::Income => "income",
            BindingKind::Debt => "debt",
        }
    }
}

/// Which entity and attribute a field_id addresses.
/// Created per answer, discarded after validation/apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldBinding {
    /// Sets `expenses[target].essential`
    ExpenseEssential { raw: String, target_id: String },

    /// Preferences have no target; `path[0]` names the field
    Preferences { raw: String, path: Vec<String> },

    /// Empty or "primary" target means the primary income
    Income {
        raw: String,
        target_id: String,
        path: Vec<String>,
    },

    Debt {
        raw: String,
        target_id: String,
        path: Vec<String>,
    },
}

impl FieldBinding {
    pub fn kind(&self) -> BindingKind {
        match self {
            FieldBinding::ExpenseEssential { .. } => BindingKind::ExpenseEssential,
            FieldBinding::Preferences { .. } => BindingKind::Preferences,
            FieldBinding::Income { .. } => BindingKind::Income,
            FieldBinding::Debt { .. } => BindingKind::Debt,
        }
    }

    /// Original field_id, kept for error reporting
    pub fn raw(&self) -> &str {
        match self {
            FieldBinding::ExpenseEssential { raw, .. }
            | FieldBinding::Preferences { raw, .. }
            | FieldBinding::Income { raw, .. }
            | FieldBinding::Debt { raw, .. } => raw,
        }
    }

    pub fn target_id(&self) -> Option<&str> {
        match self {
            FieldBinding::Preferences { .. } => None,
            FieldBinding::ExpenseEssential { target_id, .. }
            | FieldBinding::Income { target_id, .. }
            | FieldBinding::Debt { target_id, .. } => Some(target_id),
        }
    }

    /// Attribute path inside the target (empty for expense_essential)
    pub fn path(&self) -> &[String] {
        match self {
            FieldBinding::ExpenseEssential { .. } => &[],
            FieldBinding::Preferences { path, .. }
            | FieldBinding::Income { path, .. }
            | FieldBinding::Debt { path, .. } => path,
        }
    }
}

impl fmt::Display for FieldBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]/{}",
            self.kind().as_str(),
            self.target_id().unwrap_or("-"),
            self.path().join(".")
        )
    }
}

// ============================================================================
// INTERPRETER
// ============================================================================

/// Interpret a raw field_id. `None` means "no known mapping".
pub fn interpret(field_id: &str) -> Option<FieldBinding> {
    legacy_flat(field_id)
        .or_else(|| essential_prefix(field_id))
        .or_else(|| legacy_debt_suffix(field_id))
        .or_else(|| dot_path(field_id))
}

fn owned(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| s.to_string()).collect()
}

/// Rule 1: fixed table of pre-dot-path field_ids
fn legacy_flat(field_id: &str) -> Option<FieldBinding> {
    let raw = field_id.to_string();
    match field_id {
        "optimization_focus" => Some(FieldBinding::Preferences {
            raw,
            path: owned(&["optimization_focus"]),
        }),
        "primary_income_type" => Some(FieldBinding::Income {
            raw,
            target_id: "primary".to_string(),
            path: owned(&["metadata", "net_or_gross"]),
        }),
        "primary_income_stability" => Some(FieldBinding::Income {
            raw,
            target_id: "primary".to_string(),
            path: owned(&["stability"]),
        }),
        _ => None,
    }
}

/// Rule 2: "essential_<expense id>"
fn essential_prefix(field_id: &str) -> Option<FieldBinding> {
    field_id
        .strip_prefix(ESSENTIAL_PREFIX)
        .map(|target| FieldBinding::ExpenseEssential {
            raw: field_id.to_string(),
            target_id: target.to_string(),
        })
}

/// Rule 3: "<debt id><suffix>", suffixes tried in DebtField::LEGACY_SUFFIX_ORDER
fn legacy_debt_suffix(field_id: &str) -> Option<FieldBinding> {
    DebtField::LEGACY_SUFFIX_ORDER.into_iter().find_map(|field| {
        let debt_id = field_id.strip_suffix(field.legacy_suffix().as_str())?;
        if debt_id.is_empty() {
            return None;
        }
        Some(FieldBinding::Debt {
            raw: field_id.to_string(),
            target_id: debt_id.to_string(),
            path: owned(field.path()),
        })
    })
}

/// Rules 4 + 5: "<collection>.<target>.<path...>" / "preferences.<path...>"
fn dot_path(field_id: &str) -> Option<FieldBinding> {
    let segments: Vec<&str> = field_id
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if segments.len() < 2 {
        return None;
    }

    let raw = field_id.to_string();
    let collection = segments[0];

    if collection == "preferences" {
        return Some(FieldBinding::Preferences {
            raw,
            path: owned(&segments[1..]),
        });
    }

    if segments.len() < 3 {
        return None;
    }
    let target_id = segments[1].to_string();
    let path = owned(&segments[2..]);

    match collection {
        "income" => Some(FieldBinding::Income {
            raw,
            target_id,
            path,
        }),
        "debts" => Some(FieldBinding::Debt {
            raw,
            target_id,
            path,
        }),
        "expenses" if path == ["essential"] => {
            Some(FieldBinding::ExpenseEssential { raw, target_id })
        }
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn path_of(binding: &FieldBinding) -> Vec<&str> {
        binding.path().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_legacy_flat_bindings() {
        let focus = interpret("optimization_focus").unwrap();
        assert_eq!(focus.kind(), BindingKind::Preferences);
        assert_eq!(focus.target_id(), None);
        assert_eq!(path_of(&focus), ["optimization_focus"]);

        let income_type = interpret("primary_income_type").unwrap();
        assert_eq!(income_type.kind(), BindingKind::Income);
        assert_eq!(income_type.target_id(), Some("primary"));
        assert_eq!(path_of(&income_type), ["metadata", "net_or_gross"]);

        let stability = interpret("primary_income_stability").unwrap();
        assert_eq!(path_of(&stability), ["stability"]);
    }

    #[test]
    fn test_essential_prefix() {
        let binding = interpret("essential_housing").unwrap();
        assert_eq!(
            binding,
            FieldBinding::ExpenseEssential {
                raw: "essential_housing".to_string(),
                target_id: "housing".to_string(),
            }
        );
        assert!(binding.path().is_empty());
    }

    #[test]
    fn test_essential_prefix_wins_over_debt_suffix() {
        // Ends with "_balance" but the prefix rule is checked first
        let binding = interpret("essential_loan_balance").unwrap();
        assert_eq!(binding.kind(), BindingKind::ExpenseEssential);
        assert_eq!(binding.target_id(), Some("loan_balance"));
    }

    #[test]
    fn test_legacy_debt_suffixes() {
        let cases = [
            ("debt-1_balance", "debt-1", vec!["balance"]),
            ("debt-1_interest_rate", "debt-1", vec!["interest_rate"]),
            ("debt-1_min_payment", "debt-1", vec!["min_payment"]),
            ("debt-1_priority", "debt-1", vec!["priority"]),
            ("debt-1_approximate", "debt-1", vec!["approximate"]),
            ("debt-1_rate_change_date", "debt-1", vec!["rate_changes", "0", "date"]),
            (
                "debt-1_rate_change_new_rate",
                "debt-1",
                vec!["rate_changes", "0", "new_rate"],
            ),
        ];

        for (field_id, target, path) in cases {
            let binding = interpret(field_id).unwrap();
            assert_eq!(binding.kind(), BindingKind::Debt, "{}", field_id);
            assert_eq!(binding.target_id(), Some(target), "{}", field_id);
            assert_eq!(path_of(&binding), path, "{}", field_id);
        }
    }

    #[test]
    fn test_suffix_with_empty_debt_id_is_not_a_match() {
        assert_eq!(interpret("_balance"), None);
        assert_eq!(interpret("_rate_change_date"), None);
    }

    #[test]
    fn test_debt_id_may_contain_underscores() {
        let binding = interpret("car_loan_min_payment").unwrap();
        assert_eq!(binding.target_id(), Some("car_loan"));
        assert_eq!(path_of(&binding), ["min_payment"]);
    }

    #[test]
    fn test_dot_path_preferences() {
        let binding = interpret("preferences.protect_essentials").unwrap();
        assert_eq!(binding.kind(), BindingKind::Preferences);
        assert_eq!(path_of(&binding), ["protect_essentials"]);

        // Unknown preference names still bind; the validator rejects them
        let unknown = interpret("preferences.risk_tolerance").unwrap();
        assert_eq!(path_of(&unknown), ["risk_tolerance"]);
    }

    #[test]
    fn test_dot_path_income_and_debts() {
        let income = interpret("income.salary.metadata.net_or_gross").unwrap();
        assert_eq!(income.kind(), BindingKind::Income);
        assert_eq!(income.target_id(), Some("salary"));
        assert_eq!(path_of(&income), ["metadata", "net_or_gross"]);

        let debt = interpret("debts.debt-1.rate_changes.0.new_rate").unwrap();
        assert_eq!(debt.kind(), BindingKind::Debt);
        assert_eq!(path_of(&debt), ["rate_changes", "0", "new_rate"]);
    }

    #[test]
    fn test_dot_path_segments_are_trimmed() {
        let binding = interpret("debts. debt-1 .balance").unwrap();
        assert_eq!(binding.target_id(), Some("debt-1"));
        assert_eq!(path_of(&binding), ["balance"]);

        let collapsed = interpret("income..salary..type").unwrap();
        assert_eq!(collapsed.target_id(), Some("salary"));
        assert_eq!(path_of(&collapsed), ["type"]);
    }

    #[test]
    fn test_dot_path_expenses_essential_only() {
        let binding = interpret("expenses.housing.essential").unwrap();
        assert_eq!(binding.kind(), BindingKind::ExpenseEssential);
        assert_eq!(binding.target_id(), Some("housing"));
        assert!(binding.path().is_empty());

        assert_eq!(interpret("expenses.housing.monthly_amount"), None);
        assert_eq!(interpret("expenses.housing.essential.extra"), None);
    }

    #[test]
    fn test_dot_path_too_short() {
        assert_eq!(interpret("preferences"), None);
        assert_eq!(interpret("income.salary"), None);
        assert_eq!(interpret("debts.debt-1"), None);
        assert_eq!(interpret("expenses.housing"), None);
    }

    #[test]
    fn test_unknown_shapes() {
        assert_eq!(interpret("mystery_field"), None);
        assert_eq!(interpret("budget.total.amount"), None);
        assert_eq!(interpret(""), None);
    }

    #[test]
    fn test_display() {
        let binding = interpret("debt-1_rate_change_date").unwrap();
        assert_eq!(binding.to_string(), "debt[debt-1]/rate_changes.0.date");
    }
}
