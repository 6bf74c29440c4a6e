// ❓ Clarifying Questions - pluggable providers that ask for missing data
//
// Providers emit field_ids in the same grammar users answer with. Provider
// output gets no special treatment: every field_id is vetted through the
// binding interpreter and the target pass of the validator.

use crate::binding::interpret;
use crate::entities::{DebtField, IncomeField};
use crate::model::UnifiedBudgetModel;
use crate::resolver::{slugify, ResolverContext};
use crate::validation::{resolve_target, validate_target, FieldError, FieldErrorReason, ResolvedTarget};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

// ============================================================================
// QUESTION TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "options", rename_all = "snake_case")]
pub enum AnswerKind {
    Boolean,
    Choice(Vec<String>),
    Number,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// field_id the answer must be submitted under
    pub field_id: String,
    pub prompt: String,
    pub answer_kind: AnswerKind,
}

impl Question {
    pub fn new(field_id: impl Into<String>, prompt: impl Into<String>, answer_kind: AnswerKind) -> Self {
        Question {
            field_id: field_id.into(),
            prompt: prompt.into(),
            answer_kind,
        }
    }
}

fn choice(options: &[&str]) -> AnswerKind {
    AnswerKind::Choice(options.iter().map(|s| s.to_string()).collect())
}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// Source of clarifying questions (heuristics, an LLM, a fixture file...)
pub trait QuestionProvider: Send + Sync {
    fn name(&self) -> &str;

    fn questions(&self, model: &UnifiedBudgetModel) -> Result<Vec<Question>>;
}

// ============================================================================
// HEURISTIC PROVIDER
// ============================================================================

/// Asks for exactly what the readiness rules look at. Each field_id is
/// the first form that binds back to the entity being asked about:
/// legacy forms first, then dot paths over the id, the id slug and the
/// display label. Entities no form can reach are skipped.
#[derive(Debug, Default)]
pub struct HeuristicQuestionProvider;

impl HeuristicQuestionProvider {
    pub fn new() -> Self {
        HeuristicQuestionProvider
    }
}

/// First candidate that interprets and resolves to exactly `target`
fn bound_field_id(
    ctx: &ResolverContext<'_>,
    target: &ResolvedTarget,
    candidates: &[String],
) -> Option<String> {
    let bound = candidates.iter().find(|field_id| {
        interpret(field_id).is_some_and(|binding| {
            matches!(resolve_target(&binding, ctx), Ok(resolved) if resolved == *target)
        })
    });
    if bound.is_none() {
        warn!(candidates = ?candidates, "no field_id reaches {:?}; question skipped", target);
    }
    bound.cloned()
}

/// `<collection>.<key>.<path>` for the id, its slug and the label slug
fn dot_paths(collection: &str, id: &str, label: &str, path: &str) -> Vec<String> {
    [id.to_string(), slugify(id), slugify(label)]
        .into_iter()
        .filter(|key| !key.is_empty())
        .map(|key| format!("{}.{}.{}", collection, key, path))
        .collect()
}

impl QuestionProvider for HeuristicQuestionProvider {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn questions(&self, model: &UnifiedBudgetModel) -> Result<Vec<Question>> {
        let ctx = ResolverContext::new(model);
        let mut questions = Vec::new();

        for (index, expense) in model.expenses.iter().enumerate() {
            if expense.is_classified() {
                continue;
            }
            let mut candidates = vec![format!("essential_{}", expense.id)];
            candidates.extend(dot_paths("expenses", &expense.id, &expense.category, "essential"));
            let target = ResolvedTarget::ExpenseEssential { expense: index };
            if let Some(field_id) = bound_field_id(&ctx, &target, &candidates) {
                questions.push(Question::new(
                    field_id,
                    format!("Is '{}' an essential expense?", expense.category),
                    AnswerKind::Boolean,
                ));
            }
        }

        let primary_index = model.primary_income_index();
        if let Some(primary) = model.primary_income() {
            if !primary.metadata.contains_key("net_or_gross") {
                questions.push(Question::new(
                    "primary_income_type",
                    format!("Is the amount for '{}' before or after tax?", primary.name),
                    choice(&["net", "gross"]),
                ));
            }
            if primary.stability.is_none() {
                questions.push(Question::new(
                    "primary_income_stability",
                    format!("How steady is '{}' month to month?", primary.name),
                    choice(&["stable", "variable", "seasonal"]),
                ));
            }
        }

        for (index, income) in model.income.iter().enumerate() {
            if income.income_type.is_none() {
                let target = ResolvedTarget::Income {
                    income: index,
                    field: IncomeField::Type,
                };
                let candidates = dot_paths("income", &income.id, &income.name, "type");
                if let Some(field_id) = bound_field_id(&ctx, &target, &candidates) {
                    questions.push(Question::new(
                        field_id,
                        format!("What kind of income is '{}'?", income.name),
                        choice(&["earned", "passive", "transfer"]),
                    ));
                }
            }
            // Primary stability is asked through the legacy form above
            if income.stability.is_none() && Some(index) != primary_index {
                let target = ResolvedTarget::Income {
                    income: index,
                    field: IncomeField::Stability,
                };
                let candidates = dot_paths("income", &income.id, &income.name, "stability");
                if let Some(field_id) = bound_field_id(&ctx, &target, &candidates) {
                    questions.push(Question::new(
                        field_id,
                        format!("How steady is '{}' month to month?", income.name),
                        choice(&["stable", "variable", "seasonal"]),
                    ));
                }
            }
        }

        for (index, debt) in model.debts.iter().enumerate() {
            let asks = [
                (
                    debt.interest_rate == 0.0,
                    DebtField::InterestRate,
                    format!("What is the interest rate (APR %) on '{}'?", debt.name),
                ),
                (
                    debt.min_payment == 0.0,
                    DebtField::MinPayment,
                    format!("What is the minimum monthly payment on '{}'?", debt.name),
                ),
            ];
            for (unset, field, prompt) in asks {
                if !unset {
                    continue;
                }
                let mut candidates = vec![format!("{}{}", debt.id, field.legacy_suffix())];
                candidates.extend(dot_paths("debts", &debt.id, &debt.name, &field.path().join(".")));
                let target = ResolvedTarget::Debt { debt: index, field };
                if let Some(field_id) = bound_field_id(&ctx, &target, &candidates) {
                    questions.push(Question::new(field_id, prompt, AnswerKind::Number));
                }
            }
        }

        Ok(questions)
    }
}

// ============================================================================
// FIXED PROVIDER
// ============================================================================

/// Replays a prepared list of questions, e.g. the stored output of an
/// external generator.
#[derive(Debug, Clone)]
pub struct FixedQuestionProvider {
    name: String,
    questions: Vec<Question>,
}

impl FixedQuestionProvider {
    pub fn new(name: impl Into<String>, questions: Vec<Question>) -> Self {
        FixedQuestionProvider {
            name: name.into(),
            questions,
        }
    }

    /// Load a JSON array of questions
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read questions file: {:?}", path.as_ref()))?;
        let questions: Vec<Question> =
            serde_json::from_str(&content).context("Failed to parse questions JSON")?;
        Ok(Self::new(path.as_ref().display().to_string(), questions))
    }
}

impl QuestionProvider for FixedQuestionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn questions(&self, _model: &UnifiedBudgetModel) -> Result<Vec<Question>> {
        Ok(self.questions.clone())
    }
}

// ============================================================================
// VETTING
// ============================================================================

/// Split provider output into questions whose field_ids bind to a real
/// target, and errors for the rest.
pub fn vet_questions(
    model: &UnifiedBudgetModel,
    questions: Vec<Question>,
) -> (Vec<Question>, Vec<FieldError>) {
    let ctx = ResolverContext::new(model);
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for question in questions {
        let field_id = question.field_id.trim();
        let error = if field_id.is_empty() {
            Some(FieldError::new(
                &question.field_id,
                FieldErrorReason::EmptyFieldId,
                "field_id is empty",
            ))
        } else {
            match interpret(field_id) {
                Some(binding) => validate_target(&binding, &ctx),
                None => Some(FieldError::new(
                    &question.field_id,
                    FieldErrorReason::UnsupportedFieldId,
                    format!("no known mapping for field_id '{}'", field_id),
                )),
            }
        };

        match error {
            Some(error) => rejected.push(error),
            None => accepted.push(question),
        }
    }

    (accepted, rejected)
}

// ============================================================================
// TESTS
// ============================================================================
