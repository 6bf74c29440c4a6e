// ✅ Binding Validator - checks answers before anything touches the model
//
// Two passes per answer, both pure:
// 1. Target: does the binding name an entity that exists, and an attribute
//    that is supported?  → ResolvedTarget
// 2. Value: does the supplied JSON value have the shape the attribute wants?
//
// Answers are validated independently of each other. Errors come back in
// batch order, one per failing answer.

use crate::answers::{json_type_name, Answer, AnswerBatch};
use crate::binding::{interpret, FieldBinding};
use crate::entities::{strict_bool, DebtField, IncomeField, PreferenceField};
use crate::model::UnifiedBudgetModel;
use crate::resolver::ResolverContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ============================================================================
// FIELD ERROR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorReason {
    NotAString,
    EmptyFieldId,
    UnsupportedFieldId,
    UnknownExpense,
    UnsupportedPreference,
    UnknownIncome,
    UnknownDebt,
    InvalidType,
    /// Part of the wire vocabulary. The current grammar reports unmapped
    /// debt paths as `unknown_debt`, so validation never emits this.
    UnsupportedDebtField,
}

/// Coarse grouping of reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The field_id itself is malformed or unrecognized
    Structural,
    /// Valid syntax, but the target entity is absent
    Reference,
    /// Real target, unsupported attribute
    Semantic,
    /// Valid target and attribute, wrong value shape
    Type,
}

impl FieldErrorReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldErrorReason::NotAString => "not_a_string",
            FieldErrorReason::EmptyFieldId => "empty_field_id",
            FieldErrorReason::UnsupportedFieldId => "unsupported_field_id",
            FieldErrorReason::UnknownExpense => "unknown_expense",
            FieldErrorReason::UnsupportedPreference => "unsupported_preference",
            FieldErrorReason::UnknownIncome => "unknown_income",
            FieldErrorReason::UnknownDebt => "unknown_debt",
            FieldErrorReason::InvalidType => "invalid_type",
            FieldErrorReason::UnsupportedDebtField => "unsupported_debt_field",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            FieldErrorReason::NotAString
            | FieldErrorReason::EmptyFieldId
            | FieldErrorReason::UnsupportedFieldId => ErrorCategory::Structural,
            FieldErrorReason::UnknownExpense
            | FieldErrorReason::UnknownIncome
            | FieldErrorReason::UnknownDebt => ErrorCategory::Reference,
            FieldErrorReason::UnsupportedPreference => ErrorCategory::Semantic,
            // Wire vocabulary only: unmapped debt paths are reported as UnknownDebt
            FieldErrorReason::UnsupportedDebtField => ErrorCategory::Semantic,
            FieldErrorReason::InvalidType => ErrorCategory::Type,
        }
    }
}

impl fmt::Display for FieldErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field_id: String,
    pub reason: FieldErrorReason,
    pub detail: String,
}

impl FieldError {
    pub fn new(field_id: impl Into<String>, reason: FieldErrorReason, detail: impl Into<String>) -> Self {
        FieldError {
            field_id: field_id.into(),
            reason,
            detail: detail.into(),
        }
    }

    fn invalid_type(field_id: &str, expected: &str, value: &Value) -> Self {
        FieldError::new(
            field_id,
            FieldErrorReason::InvalidType,
            format!("expected {}, got {}", expected, describe(value)),
        )
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.reason, self.field_id, self.detail)
    }
}

impl std::error::Error for FieldError {}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string {:?}", s),
        Value::Number(n) => format!("number {}", n),
        Value::Bool(b) => format!("boolean {}", b),
        other => json_type_name(other).to_string(),
    }
}

// ============================================================================
// RESOLVED TARGET
// ============================================================================

/// A binding whose target exists, with its attribute locator.
/// Indices point into the snapshot the ResolverContext was built from.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTarget {
    ExpenseEssential { expense: usize },
    Preference(PreferenceField),
    Income { income: usize, field: IncomeField },
    Debt { debt: usize, field: DebtField },
}

/// Target pass: existence + supported attribute
pub fn resolve_target(
    binding: &FieldBinding,
    ctx: &ResolverContext<'_>,
) -> Result<ResolvedTarget, FieldError> {
    let raw = binding.raw();

    match binding {
        FieldBinding::ExpenseEssential { target_id, .. } => ctx
            .resolve_expense(target_id)
            .map(|expense| ResolvedTarget::ExpenseEssential { expense })
            .ok_or_else(|| {
                FieldError::new(
                    raw,
                    FieldErrorReason::UnknownExpense,
                    format!("no expense matches '{}'", target_id),
                )
            }),

        FieldBinding::Preferences { path, .. } => path
            .first()
            .and_then(|name| PreferenceField::from_name(name))
            .map(ResolvedTarget::Preference)
            .ok_or_else(|| {
                FieldError::new(
                    raw,
                    FieldErrorReason::UnsupportedPreference,
                    format!(
                        "'{}' is not a preference; known: {}",
                        path.join("."),
                        PreferenceField::ALL.map(|f| f.name()).join(", ")
                    ),
                )
            }),

        FieldBinding::Income { target_id, path, .. } => {
            let income = ctx.resolve_income(target_id).ok_or_else(|| {
                FieldError::new(
                    raw,
                    FieldErrorReason::UnknownIncome,
                    format!("no income matches '{}'", target_id),
                )
            })?;
            let field = IncomeField::from_path(path).ok_or_else(|| {
                FieldError::new(
                    raw,
                    FieldErrorReason::UnknownIncome,
                    format!("unsupported income attribute '{}'", path.join(".")),
                )
            })?;
            Ok(ResolvedTarget::Income { income, field })
        }

        FieldBinding::Debt { target_id, path, .. } => {
            let resolution = ctx.resolve_debt(target_id);
            let field = DebtField::from_path(path);

            match (resolution.debt, field) {
                (Some(debt), Some(field)) => Ok(ResolvedTarget::Debt { debt, field }),
                (_, None) => Err(FieldError::new(
                    raw,
                    FieldErrorReason::UnknownDebt,
                    format!("unsupported debt attribute '{}'", path.join(".")),
                )),
                (None, Some(_)) => {
                    let detail = match resolution.expense {
                        Some(index) => format!(
                            "'{}' matches expense '{}', not a debt",
                            target_id,
                            ctx.model().expenses[index].category
                        ),
                        None => format!("no debt matches '{}'", target_id),
                    };
                    Err(FieldError::new(raw, FieldErrorReason::UnknownDebt, detail))
                }
            }
        }
    }
}

/// Target pass only. Used to vet provider-generated field_ids before a
/// value exists.
pub fn validate_target(binding: &FieldBinding, ctx: &ResolverContext<'_>) -> Option<FieldError> {
    resolve_target(binding, ctx).err()
}

/// Value pass for an already-resolved target
pub fn check_value(target: &ResolvedTarget, field_id: &str, value: &Value) -> Option<FieldError> {
    let (accepted, expected) = match target {
        ResolvedTarget::ExpenseEssential { .. } => (strict_bool(value).is_some(), "boolean".to_string()),
        ResolvedTarget::Preference(field) => (field.accepts(value), field.expected()),
        ResolvedTarget::Income { field, .. } => (field.accepts(value), field.expected()),
        ResolvedTarget::Debt { field, .. } => (field.accepts(value), field.expected()),
    };

    if accepted {
        None
    } else {
        Some(FieldError::invalid_type(field_id, &expected, value))
    }
}

/// Both passes for one binding
pub fn validate_binding(
    binding: &FieldBinding,
    value: &Value,
    ctx: &ResolverContext<'_>,
) -> Option<FieldError> {
    match resolve_target(binding, ctx) {
        Ok(target) => check_value(&target, binding.raw(), value),
        Err(error) => Some(error),
    }
}

// ============================================================================
// BATCH VALIDATION
// ============================================================================

/// A fully validated answer: where to write, and what
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWrite<'v> {
    pub target: ResolvedTarget,
    pub value: &'v Value,
}

/// Structural checks, interpretation, then both passes.
/// Errors report the field_id exactly as submitted.
pub fn plan_answer<'v>(
    answer: &'v Answer,
    ctx: &ResolverContext<'_>,
) -> Result<PlannedWrite<'v>, FieldError> {
    let Some(submitted) = answer.field_id.as_str() else {
        return Err(FieldError::new(
            answer.field_id.to_string(),
            FieldErrorReason::NotAString,
            format!("field_id must be a string, got {}", json_type_name(&answer.field_id)),
        ));
    };

    let field_id = submitted.trim();
    if field_id.is_empty() {
        return Err(FieldError::new(
            submitted,
            FieldErrorReason::EmptyFieldId,
            "field_id is empty",
        ));
    }

    let Some(binding) = interpret(field_id) else {
        return Err(FieldError::new(
            submitted,
            FieldErrorReason::UnsupportedFieldId,
            format!("no known mapping for field_id '{}'", field_id),
        ));
    };

    let target = resolve_target(&binding, ctx).map_err(|mut error| {
        error.field_id = submitted.to_string();
        error
    })?;

    match check_value(&target, submitted, &answer.value) {
        Some(error) => Err(error),
        None => Ok(PlannedWrite {
            target,
            value: &answer.value,
        }),
    }
}

pub fn validate_answer(answer: &Answer, ctx: &ResolverContext<'_>) -> Option<FieldError> {
    plan_answer(answer, ctx).err()
}

/// Validate a whole batch against one snapshot. Empty result = valid.
pub fn validate_answers(model: &UnifiedBudgetModel, answers: &AnswerBatch) -> Vec<FieldError> {
    let ctx = ResolverContext::new(model);
    let errors: Vec<FieldError> = answers
        .iter()
        .filter_map(|answer| validate_answer(answer, &ctx))
        .collect();

    tracing::debug!(
        answers = answers.len(),
        errors = errors.len(),
        "validated answer batch"
    );

    errors
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Debt, Expense, Income};
    use serde_json::json;

    fn sample_model() -> UnifiedBudgetModel {
        UnifiedBudgetModel::new()
            .with_income(Income::new("salary", "Salary", 4200.0))
            .with_income(Income::new("rental", "Rental Unit", 900.0))
            .with_expense(Expense::new("housing", "Housing", 1800.0))
            .with_expense(Expense::new("streaming", "Subscription", 30.0))
            .with_debt(Debt::new("debt-1", "Credit Card", 3000.0))
            .with_debt(Debt::new("loan-a", "Loan", 9000.0))
            .with_debt(Debt::new("loan-b", "Loan", 4000.0))
    }

    fn reasons(errors: &[FieldError]) -> Vec<FieldErrorReason> {
        errors.iter().map(|e| e.reason).collect()
    }

    #[test]
    fn test_essential_prefix_valid() {
        let model = sample_model();
        let batch = AnswerBatch::new().with("essential_housing", json!(true));
        assert!(validate_answers(&model, &batch).is_empty());
    }

    #[test]
    fn test_debt_suffix_valid() {
        let model = sample_model();
        let batch = AnswerBatch::new().with("debt-1_balance", json!(1500));
        assert!(validate_answers(&model, &batch).is_empty());
    }

    #[test]
    fn test_unsupported_field_id() {
        let model = sample_model();
        let batch = AnswerBatch::new().with("mystery_field", json!("x"));
        let errors = validate_answers(&model, &batch);

        assert_eq!(reasons(&errors), vec![FieldErrorReason::UnsupportedFieldId]);
        assert_eq!(errors[0].field_id, "mystery_field");
    }

    #[test]
    fn test_essential_requires_strict_boolean() {
        let model = sample_model();
        for value in [json!("maybe"), json!(1), json!("true"), json!(null)] {
            let batch = AnswerBatch::new().with("essential_housing", value.clone());
            let errors = validate_answers(&model, &batch);
            assert_eq!(reasons(&errors), vec![FieldErrorReason::InvalidType], "{}", value);
            assert!(errors[0].detail.contains("boolean"));
        }
    }

    #[test]
    fn test_optimization_focus_lists_valid_values() {
        let model = sample_model();
        let batch = AnswerBatch::new().with("optimization_focus", json!("aggressive"));
        let errors = validate_answers(&model, &batch);

        assert_eq!(reasons(&errors), vec![FieldErrorReason::InvalidType]);
        for option in ["debt", "savings", "balanced"] {
            assert!(errors[0].detail.contains(option));
        }

        let ok = AnswerBatch::new().with("optimization_focus", json!(" SAVINGS "));
        assert!(validate_answers(&model, &ok).is_empty());
    }

    #[test]
    fn test_debt_answer_on_expense_alias_is_unknown_debt() {
        let model = sample_model();
        let batch = AnswerBatch::new().with("subscription_balance", json!(10));
        let errors = validate_answers(&model, &batch);

        assert_eq!(reasons(&errors), vec![FieldErrorReason::UnknownDebt]);
        assert!(errors[0].detail.contains("expense"));
    }

    #[test]
    fn test_structural_errors() {
        let model = sample_model();
        let batch = AnswerBatch::from_value(json!([
            {"field_id": 7, "value": true},
            {"field_id": "   ", "value": true},
            {"field_id": "", "value": true}
        ]))
        .unwrap();

        let errors = validate_answers(&model, &batch);
        assert_eq!(
            reasons(&errors),
            vec![
                FieldErrorReason::NotAString,
                FieldErrorReason::EmptyFieldId,
                FieldErrorReason::EmptyFieldId,
            ]
        );
        assert_eq!(errors[0].field_id, "7");
    }

    #[test]
    fn test_reference_errors() {
        let model = sample_model();
        let batch = AnswerBatch::new()
            .with("essential_travel", json!(true))
            .with("income.bonus.type", json!("earned"))
            .with("mortgage_balance", json!(100))
            .with("expenses.travel.essential", json!(false));

        assert_eq!(
            reasons(&validate_answers(&model, &batch)),
            vec![
                FieldErrorReason::UnknownExpense,
                FieldErrorReason::UnknownIncome,
                FieldErrorReason::UnknownDebt,
                FieldErrorReason::UnknownExpense,
            ]
        );
    }

    #[test]
    fn test_semantic_errors() {
        let model = sample_model();
        let batch = AnswerBatch::new()
            .with("preferences.risk_tolerance", json!("high"))
            .with("income.salary.monthly_amount", json!(5000))
            .with("debts.debt-1.name", json!("Visa"));

        assert_eq!(
            reasons(&validate_answers(&model, &batch)),
            vec![
                FieldErrorReason::UnsupportedPreference,
                FieldErrorReason::UnknownIncome,
                FieldErrorReason::UnknownDebt,
            ]
        );
    }

    #[test]
    fn test_income_value_rules() {
        let model = sample_model();
        let valid = AnswerBatch::new()
            .with("income.salary.type", json!("Earned"))
            .with("income.rental.stability", json!("seasonal"))
            .with("income.primary.metadata.net_or_gross", json!("net"))
            .with("primary_income_type", json!("gross"))
            .with("primary_income_stability", json!("variable"));
        assert!(validate_answers(&model, &valid).is_empty());

        let invalid = AnswerBatch::new()
            .with("income.salary.type", json!("salary"))
            .with("primary_income_stability", json!("steady"))
            .with("primary_income_type", json!(""));
        assert_eq!(
            reasons(&validate_answers(&model, &invalid)),
            vec![FieldErrorReason::InvalidType; 3]
        );
    }

    #[test]
    fn test_debt_value_rules() {
        let model = sample_model();
        let valid = AnswerBatch::new()
            .with("debt-1_interest_rate", json!(19.99))
            .with("debt-1_min_payment", json!(75))
            .with("debt-1_priority", json!("High"))
            .with("debt-1_approximate", json!(false))
            .with("debt-1_rate_change_date", json!("2025-06-01"))
            .with("debt-1_rate_change_new_rate", json!(24.99));
        assert!(validate_answers(&model, &valid).is_empty());

        let invalid = AnswerBatch::new()
            .with("debt-1_interest_rate", json!("19.99"))
            .with("debt-1_priority", json!("urgent"))
            .with("debt-1_approximate", json!(0))
            .with("debt-1_rate_change_date", json!("  "));
        assert_eq!(
            reasons(&validate_answers(&model, &invalid)),
            vec![FieldErrorReason::InvalidType; 4]
        );
    }

    #[test]
    fn test_preference_value_rules() {
        let model = sample_model();
        let valid = AnswerBatch::new()
            .with("preferences.protect_essentials", json!(false))
            .with("preferences.max_desired_change_per_category", json!(0.15))
            .with("preferences.optimization_focus", json!("debt"));
        assert!(validate_answers(&model, &valid).is_empty());

        let invalid = AnswerBatch::new()
            .with("preferences.protect_essentials", json!("no"))
            .with("preferences.max_desired_change_per_category", json!("15%"));
        assert_eq!(
            reasons(&validate_answers(&model, &invalid)),
            vec![FieldErrorReason::InvalidType; 2]
        );
    }

    #[test]
    fn test_first_seen_alias_and_exact_id() {
        let model = sample_model();
        let ctx = ResolverContext::new(&model);

        let by_alias = interpret("loan_balance").unwrap();
        assert_eq!(
            resolve_target(&by_alias, &ctx).unwrap(),
            ResolvedTarget::Debt { debt: 1, field: DebtField::Balance }
        );

        let by_id = interpret("loan-b_balance").unwrap();
        assert_eq!(
            resolve_target(&by_id, &ctx).unwrap(),
            ResolvedTarget::Debt { debt: 2, field: DebtField::Balance }
        );
    }

    #[test]
    fn test_every_known_path_in_every_form() {
        let model = sample_model();

        let mut batch = AnswerBatch::new()
            .with("essential_housing", json!(true))
            .with("expenses.housing.essential", json!(false))
            .with("optimization_focus", json!("balanced"))
            .with("primary_income_type", json!("net"))
            .with("primary_income_stability", json!("stable"))
            .with("income.salary.type", json!("earned"))
            .with("income.salary.stability", json!("stable"))
            .with("income.salary.metadata.employer", json!("ACME"));

        for field in PreferenceField::ALL {
            let value = match field {
                PreferenceField::OptimizationFocus => json!("debt"),
                PreferenceField::ProtectEssentials => json!(true),
                PreferenceField::MaxDesiredChangePerCategory => json!(0.1),
            };
            batch = batch.with(format!("preferences.{}", field.name()), value);
        }

        for field in DebtField::LEGACY_SUFFIX_ORDER {
            let value = match field {
                DebtField::Priority => json!("low"),
                DebtField::Approximate => json!(true),
                DebtField::RateChangeDate => json!("2026-01-01"),
                _ => json!(12.5),
            };
            batch = batch.with(format!("debt-1{}", field.legacy_suffix()), value.clone());
            batch = batch.with(format!("debts.debt-1.{}", field.path().join(".")), value);
        }

        let errors = validate_answers(&model, &batch);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn test_revalidation_is_idempotent() {
        let model = sample_model();
        let batch = AnswerBatch::new()
            .with("essential_housing", json!("maybe"))
            .with("mystery_field", json!(1))
            .with("debt-1_balance", json!(10));

        assert_eq!(validate_answers(&model, &batch), validate_answers(&model, &batch));
    }

    #[test]
    fn test_order_insensitive() {
        let model = sample_model();
        let forward = AnswerBatch::new()
            .with("essential_housing", json!("maybe"))
            .with("subscription_balance", json!(10));
        let reverse = AnswerBatch::new()
            .with("subscription_balance", json!(10))
            .with("essential_housing", json!("maybe"));

        let mut a = validate_answers(&model, &forward);
        let mut b = validate_answers(&model, &reverse);
        // Input order is preserved...
        assert_eq!(a[0].field_id, "essential_housing");
        assert_eq!(b[0].field_id, "subscription_balance");
        // ...and the set of errors is the same
        a.sort_by(|x, y| x.field_id.cmp(&y.field_id));
        b.sort_by(|x, y| x.field_id.cmp(&y.field_id));
        assert_eq!(a, b);
    }

    #[test]
    fn test_error_field_id_is_as_submitted() {
        let model = sample_model();
        let batch = AnswerBatch::new().with("  essential_housing ", json!("maybe"));
        let errors = validate_answers(&model, &batch);
        assert_eq!(errors[0].field_id, "  essential_housing ");
    }

    #[test]
    fn test_reason_categories_and_wire_names() {
        assert_eq!(FieldErrorReason::UnknownDebt.category(), ErrorCategory::Reference);
        assert_eq!(FieldErrorReason::InvalidType.category(), ErrorCategory::Type);
        assert_eq!(
            serde_json::to_value(FieldErrorReason::UnsupportedFieldId).unwrap(),
            json!("unsupported_field_id")
        );
        assert_eq!(
            FieldErrorReason::UnsupportedDebtField.to_string(),
            "unsupported_debt_field"
        );
        assert_eq!(FieldErrorReason::UnsupportedDebtField.category(), ErrorCategory::Semantic);
    }

    #[test]
    fn test_unmapped_debt_path_never_reports_unsupported_debt_field() {
        let model = sample_model();
        let batch = AnswerBatch::new()
            .with("debts.debt-1.color", json!("red"))
            .with("debts.debt-1.rate_changes.3.date", json!("2027-01-01"));

        let reasons: Vec<FieldErrorReason> =
            validate_answers(&model, &batch).iter().map(|e| e.reason).collect();
        assert_eq!(reasons, vec![FieldErrorReason::UnknownDebt; 2]);
    }

    #[test]
    fn test_validate_target_and_binding() {
        let model = sample_model();
        let ctx = ResolverContext::new(&model);

        let binding = interpret("debt-1_priority").unwrap();
        assert_eq!(validate_target(&binding, &ctx), None);
        assert_eq!(validate_binding(&binding, &json!("low"), &ctx), None);

        let error = validate_binding(&binding, &json!(3), &ctx).unwrap();
        assert_eq!(error.reason, FieldErrorReason::InvalidType);
        assert_eq!(error.field_id, "debt-1_priority");
        assert!(error.detail.contains("high"));

        let missing = interpret("essential_travel").unwrap();
        assert_eq!(
            validate_target(&missing, &ctx).map(|e| e.reason),
            Some(FieldErrorReason::UnknownExpense)
        );
    }

    #[test]
    fn test_plan_answer_carries_value() {
        let model = sample_model();
        let ctx = ResolverContext::new(&model);
        let answer = Answer::new("income.rental.stability", json!("seasonal"));

        let planned = plan_answer(&answer, &ctx).unwrap();
        assert_eq!(
            planned.target,
            ResolvedTarget::Income { income: 1, field: IncomeField::Stability }
        );
        assert_eq!(planned.value, &json!("seasonal"));
    }
}
