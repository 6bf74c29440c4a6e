// 🛠️ Answer Applier - validated answers → next model snapshot
//
// Guarded: the whole batch is planned against the input snapshot first.
// One failing answer rejects the batch and the input is never cloned,
// let alone written.

use crate::answers::AnswerBatch;
use crate::entities::strict_bool;
use crate::model::UnifiedBudgetModel;
use crate::resolver::ResolverContext;
use crate::validation::{plan_answer, FieldError, PlannedWrite, ResolvedTarget};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// READINESS RULES
// ============================================================================

/// Completeness predicate deciding whether a model can move past the
/// clarification stage. Each rule can be switched off from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessRules {
    /// Every expense has a non-null `essential` flag
    pub require_essential_flags: bool,

    /// At least one income, and every income has type + stability
    pub require_income_classification: bool,

    /// Every debt has non-zero interest_rate and min_payment
    pub require_debt_terms: bool,
}

impl Default for ReadinessRules {
    fn default() -> Self {
        ReadinessRules {
            require_essential_flags: true,
            require_income_classification: true,
            require_debt_terms: true,
        }
    }
}

impl ReadinessRules {
    /// Everything still blocking readiness, in model order
    pub fn missing(&self, model: &UnifiedBudgetModel) -> Vec<String> {
        let mut missing = Vec::new();

        if self.require_essential_flags {
            for expense in model.expenses.iter().filter(|e| !e.is_classified()) {
                missing.push(format!("expense '{}' is not classified as essential or not", expense.id));
            }
        }

        if self.require_income_classification {
            if model.income.is_empty() {
                missing.push("no income recorded".to_string());
            }
            for income in &model.income {
                if income.income_type.is_none() {
                    missing.push(format!("income '{}' has no type", income.id));
                }
                if income.stability.is_none() {
                    missing.push(format!("income '{}' has no stability", income.id));
                }
            }
        }

        if self.require_debt_terms {
            for debt in &model.debts {
                if debt.interest_rate == 0.0 {
                    missing.push(format!("debt '{}' has no interest rate", debt.id));
                }
                if debt.min_payment == 0.0 {
                    missing.push(format!("debt '{}' has no minimum payment", debt.id));
                }
            }
        }

        missing
    }

    pub fn is_ready(&self, model: &UnifiedBudgetModel) -> bool {
        self.missing(model).is_empty()
    }
}

// ============================================================================
// APPLY
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    /// New snapshot with answers written and summary recomputed
    pub model: UnifiedBudgetModel,
    /// Readiness predicate evaluated on the new snapshot
    pub ready: bool,
    /// Number of answers written
    pub applied: usize,
}

/// Validate and apply a batch. `Err` carries every field error, in batch
/// order, and means nothing was applied.
pub fn apply_answers(
    model: &UnifiedBudgetModel,
    answers: &AnswerBatch,
    rules: &ReadinessRules,
) -> Result<ApplyOutcome, Vec<FieldError>> {
    let ctx = ResolverContext::new(model);

    let mut planned = Vec::with_capacity(answers.len());
    let mut errors = Vec::new();
    for answer in answers {
        match plan_answer(answer, &ctx) {
            Ok(write) => planned.push(write),
            Err(error) => errors.push(error),
        }
    }

    if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "answer batch rejected, nothing applied");
        return Err(errors);
    }

    let mut next = model.clone();
    for write in &planned {
        write_value(&mut next, write);
    }
    next.recompute_summary();

    let ready = rules.is_ready(&next);
    tracing::debug!(applied = planned.len(), ready, "answer batch applied");

    Ok(ApplyOutcome {
        model: next,
        ready,
        applied: planned.len(),
    })
}

/// Write one planned value. Targets were resolved against the snapshot
/// `model` was cloned from, so the indices line up.
fn write_value(model: &mut UnifiedBudgetModel, write: &PlannedWrite<'_>) {
    let value: &Value = write.value;
    let written = match &write.target {
        ResolvedTarget::ExpenseEssential { expense } => match strict_bool(value) {
            Some(flag) => {
                model.expenses[*expense].essential = Some(flag);
                true
            }
            None => false,
        },
        ResolvedTarget::Preference(field) => field.set(&mut model.preferences, value),
        ResolvedTarget::Income { income, field } => field.set(&mut model.income[*income], value),
        ResolvedTarget::Debt { debt, field } => field.set(&mut model.debts[*debt], value),
    };
    debug_assert!(written, "validated value failed to coerce: {:?}", write);
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        Debt, DebtPriority, Expense, Income, IncomeStability, IncomeType, OptimizationFocus,
    };
    use crate::validation::FieldErrorReason;
    use serde_json::json;

    fn sample_model() -> UnifiedBudgetModel {
        let mut model = UnifiedBudgetModel::new()
            .with_income(Income::new("salary", "Salary", 4200.0))
            .with_expense(Expense::new("housing", "Housing", 1800.0))
            .with_expense(Expense::new("dining", "Dining Out", 250.0))
            .with_debt(Debt::new("debt-1", "Visa", 3000.0));
        model.recompute_summary();
        model
    }

    #[test]
    fn test_apply_essential_flag() {
        let model = sample_model();
        let batch = AnswerBatch::new().with("essential_housing", json!(true));

        let outcome = apply_answers(&model, &batch, &ReadinessRules::default()).unwrap();
        assert_eq!(outcome.model.expenses[0].essential, Some(true));
        assert_eq!(outcome.applied, 1);
        // Input snapshot untouched
        assert_eq!(model.expenses[0].essential, None);
    }

    #[test]
    fn test_apply_debt_balance_as_float() {
        let model = sample_model();
        let batch = AnswerBatch::new().with("debt-1_balance", json!(1500));

        let outcome = apply_answers(&model, &batch, &ReadinessRules::default()).unwrap();
        assert_eq!(outcome.model.debts[0].balance, 1500.0);
    }

    #[test]
    fn test_rejected_batch_leaves_model_unchanged() {
        let model = sample_model();
        let before = model.fingerprint();
        let batch = AnswerBatch::new()
            .with("essential_dining", json!(false))
            .with("essential_housing", json!("maybe"));

        let errors = apply_answers(&model, &batch, &ReadinessRules::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, FieldErrorReason::InvalidType);
        assert_eq!(errors[0].field_id, "essential_housing");
        assert_eq!(model.fingerprint(), before);
        assert_eq!(model.expenses[1].essential, None);
    }

    #[test]
    fn test_enum_values_stored_canonical() {
        let model = sample_model();
        let batch = AnswerBatch::new()
            .with("optimization_focus", json!("  DEBT "))
            .with("income.salary.type", json!("Earned"))
            .with("primary_income_stability", json!("Variable"))
            .with("debts.debt-1.priority", json!("HIGH"));

        let next = apply_answers(&model, &batch, &ReadinessRules::default())
            .unwrap()
            .model;

        assert_eq!(next.preferences.optimization_focus, OptimizationFocus::Debt);
        assert_eq!(next.income[0].income_type, Some(IncomeType::Earned));
        assert_eq!(next.income[0].stability, Some(IncomeStability::Variable));
        assert_eq!(next.debts[0].priority, DebtPriority::High);

        let json = serde_json::to_value(&next).unwrap();
        assert_eq!(json["income"][0]["type"], json!("earned"));
        assert_eq!(json["preferences"]["optimization_focus"], json!("debt"));
    }

    #[test]
    fn test_legacy_income_type_writes_metadata() {
        let model = sample_model();
        let batch = AnswerBatch::new().with("primary_income_type", json!("net"));

        let next = apply_answers(&model, &batch, &ReadinessRules::default())
            .unwrap()
            .model;
        assert_eq!(next.income[0].metadata["net_or_gross"], json!("net"));
        assert_eq!(next.income[0].income_type, None);
    }

    #[test]
    fn test_readiness_after_complete_answers() {
        let model = sample_model();
        let rules = ReadinessRules::default();
        assert!(!rules.is_ready(&model));

        let batch = AnswerBatch::new()
            .with("essential_housing", json!(true))
            .with("essential_dining", json!(false))
            .with("income.salary.type", json!("earned"))
            .with("income.salary.stability", json!("stable"))
            .with("debt-1_interest_rate", json!(22.9))
            .with("debt-1_min_payment", json!(90));

        let outcome = apply_answers(&model, &batch, &rules).unwrap();
        assert!(outcome.ready, "still missing: {:?}", rules.missing(&outcome.model));
    }

    #[test]
    fn test_readiness_rules_can_be_relaxed() {
        let model = sample_model();
        let relaxed = ReadinessRules {
            require_essential_flags: false,
            require_income_classification: false,
            require_debt_terms: false,
        };
        assert!(relaxed.is_ready(&model));

        let debt_only = ReadinessRules {
            require_debt_terms: true,
            ..relaxed
        };
        assert_eq!(
            debt_only.missing(&model),
            vec![
                "debt 'debt-1' has no interest rate".to_string(),
                "debt 'debt-1' has no minimum payment".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_income_is_not_ready() {
        let model = UnifiedBudgetModel::new();
        let rules = ReadinessRules::default();
        assert_eq!(rules.missing(&model), vec!["no income recorded".to_string()]);
    }

    #[test]
    fn test_summary_recomputed_after_apply() {
        let mut model = sample_model();
        model.summary.total_income = 0.0;

        let outcome = apply_answers(
            &model,
            &AnswerBatch::new().with("essential_housing", json!(true)),
            &ReadinessRules::default(),
        )
        .unwrap();

        assert_eq!(outcome.model.summary.total_income, 4200.0);
        assert_eq!(outcome.model.summary.total_expenses, 2050.0);
        assert_eq!(outcome.model.summary.surplus, 2150.0);
    }

    #[test]
    fn test_both_essential_forms_apply() {
        let model = sample_model();
        let batch = AnswerBatch::new()
            .with("essential_housing", json!(true))
            .with("expenses.Dining Out.essential", json!(false));

        let next = apply_answers(&model, &batch, &ReadinessRules::default())
            .unwrap()
            .model;
        assert_eq!(next.expenses[0].essential, Some(true));
        assert_eq!(next.expenses[1].essential, Some(false));
    }

    #[test]
    fn test_rules_deserialize_with_defaults() {
        let rules: ReadinessRules =
            serde_json::from_value(json!({"require_debt_terms": false})).unwrap();
        assert!(rules.require_essential_flags);
        assert!(rules.require_income_classification);
        assert!(!rules.require_debt_terms);
    }
}
