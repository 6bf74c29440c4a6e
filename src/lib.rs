// Budget Planner - Core Library
// Field binding, answer validation and guarded application for the
// clarification stage of the budget pipeline. Used by the CLI, the API
// server, and tests.

pub mod entities;   // Income, expenses, debts, preferences + attribute locators
pub mod model;      // UnifiedBudgetModel + derived summary
pub mod resolver;   // Identifier resolution (ids, slug aliases, primary income)
pub mod binding;    // field_id grammar → FieldBinding
pub mod answers;    // Answer batches (object or array form)
pub mod validation; // Field errors, target + value passes
pub mod applier;    // Guarded apply + readiness rules
pub mod questions;  // Clarifying question providers
pub mod store;      // Session snapshots + transition audit trail
pub mod pipeline;   // Session lifecycle over a store
pub mod config;     // TOML config + env overrides
pub mod error;      // Pipeline error type

// Re-export commonly used types
pub use entities::{
    Debt, DebtField, DebtPriority, Expense, Income, IncomeField, IncomeStability, IncomeType,
    OptimizationFocus, PreferenceField, Preferences, RateChange,
};
pub use model::{Summary, UnifiedBudgetModel};
pub use resolver::{slugify, DebtResolution, ResolverContext};
pub use binding::{interpret, BindingKind, FieldBinding};
pub use answers::{Answer, AnswerBatch};
pub use validation::{
    check_value, resolve_target, validate_answer, validate_answers, validate_binding,
    validate_target, ErrorCategory, FieldError, FieldErrorReason, ResolvedTarget,
};
pub use applier::{apply_answers, ApplyOutcome, ReadinessRules};
pub use questions::{
    vet_questions, AnswerKind, FixedQuestionProvider, HeuristicQuestionProvider, Question,
    QuestionProvider,
};
pub use store::{
    MemorySessionStore, SessionRecord, SessionStore, SqliteSessionStore, Stage, TransitionEvent,
};
pub use pipeline::{BudgetPipeline, SubmitOutcome};
pub use config::{AppConfig, ServerConfig};
pub use error::PipelineError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
