// 🔄 Clarification Pipeline - sessions, questions, guarded answer submission
//
// Stage flow:
//   parsed ──create──> clarifying ──answers──> ready_for_optimization
//
// Stage is recomputed from readiness after every accepted batch, so a batch
// that zeroes a debt term moves the session back to clarifying.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::answers::AnswerBatch;
use crate::applier::{apply_answers, ReadinessRules};
use crate::error::{PipelineError, Result};
use crate::model::UnifiedBudgetModel;
use crate::questions::{vet_questions, HeuristicQuestionProvider, Question, QuestionProvider};
use crate::store::{SessionRecord, SessionStore, Stage, TransitionEvent};
use crate::validation::FieldError;

const DEFAULT_ACTOR: &str = "budget_planner";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Nothing was written; errors in batch order
    Rejected { errors: Vec<FieldError> },
    /// Snapshot replaced and transition recorded
    Applied { record: SessionRecord, ready: bool },
}

pub struct BudgetPipeline<S: SessionStore> {
    store: S,
    rules: ReadinessRules,
    providers: Vec<Box<dyn QuestionProvider>>,
    actor: String,
}

impl<S: SessionStore> BudgetPipeline<S> {
    /// Pipeline with the heuristic question provider
    pub fn new(store: S, rules: ReadinessRules) -> Self {
        BudgetPipeline {
            store,
            rules,
            providers: vec![Box::new(HeuristicQuestionProvider::new())],
            actor: DEFAULT_ACTOR.to_string(),
        }
    }

    /// Builder: replace the question providers
    pub fn with_providers(mut self, providers: Vec<Box<dyn QuestionProvider>>) -> Self {
        self.providers = providers;
        self
    }

    /// Builder: name recorded on transition events
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn rules(&self) -> &ReadinessRules {
        &self.rules
    }

    pub fn create_session(&self, mut model: UnifiedBudgetModel) -> Result<SessionRecord> {
        model.recompute_summary();
        let stage = Stage::for_readiness(self.rules.is_ready(&model));
        let fingerprint = model.fingerprint();

        let record = SessionRecord::new(uuid::Uuid::new_v4().to_string(), stage, model);
        let event = TransitionEvent::new(
            &record.session_id,
            Stage::Parsed,
            stage,
            Vec::new(),
            fingerprint.clone(),
            fingerprint,
            &self.actor,
        );
        if !self.store.commit(&record, &event)? {
            return Err(PipelineError::Conflict(record.session_id));
        }

        info!(session_id = %record.session_id, %stage, "session created");
        Ok(record)
    }

    pub fn session(&self, session_id: &str) -> Result<SessionRecord> {
        self.store
            .load(session_id)?
            .ok_or_else(|| PipelineError::SessionNotFound(session_id.to_string()))
    }

    /// Readiness gaps for the stored snapshot
    pub fn missing(&self, session_id: &str) -> Result<Vec<String>> {
        Ok(self.rules.missing(&self.session(session_id)?.model))
    }

    /// Questions from every provider whose field_ids bind to the stored
    /// snapshot. Duplicate field_ids keep the first provider's question.
    pub fn questions(&self, session_id: &str) -> Result<Vec<Question>> {
        let record = self.session(session_id)?;
        let mut seen = HashSet::new();
        let mut questions = Vec::new();

        for provider in &self.providers {
            let proposed = provider
                .questions(&record.model)
                .map_err(|source| PipelineError::Provider {
                    provider: provider.name().to_string(),
                    source,
                })?;

            let (accepted, rejected) = vet_questions(&record.model, proposed);
            for error in &rejected {
                warn!(provider = provider.name(), %error, "dropping question that does not bind");
            }

            questions.extend(
                accepted
                    .into_iter()
                    .filter(|q| seen.insert(q.field_id.trim().to_string())),
            );
        }

        debug!(session_id, count = questions.len(), "questions generated");
        Ok(questions)
    }

    /// Validate and apply a batch against the stored snapshot. If another
    /// batch is committed between load and commit, this one is discarded
    /// and `PipelineError::Conflict` is returned.
    pub fn submit_answers(&self, session_id: &str, answers: &AnswerBatch) -> Result<SubmitOutcome> {
        let current = self.session(session_id)?;

        let outcome = match apply_answers(&current.model, answers, &self.rules) {
            Ok(outcome) => outcome,
            Err(errors) => {
                info!(session_id, errors = errors.len(), "answer batch rejected");
                return Ok(SubmitOutcome::Rejected { errors });
            }
        };

        let stage = Stage::for_readiness(outcome.ready);
        let event = TransitionEvent::new(
            session_id,
            current.stage,
            stage,
            answers.field_ids(),
            current.model.fingerprint(),
            outcome.model.fingerprint(),
            &self.actor,
        );
        let record = current.next(stage, outcome.model);
        if !self.store.commit(&record, &event)? {
            warn!(session_id, version = current.version, "stale snapshot, answer batch discarded");
            return Err(PipelineError::Conflict(session_id.to_string()));
        }

        info!(
            session_id,
            from = %current.stage,
            to = %stage,
            applied = outcome.applied,
            "answer batch applied"
        );

        Ok(SubmitOutcome::Applied {
            record,
            ready: outcome.ready,
        })
    }

    /// Same as `submit_answers`, from a raw JSON payload
    pub fn submit_answers_json(&self, session_id: &str, payload: Value) -> Result<SubmitOutcome> {
        let answers = AnswerBatch::from_value(payload)
            .map_err(|e| PipelineError::InvalidPayload(format!("{:#}", e)))?;
        self.submit_answers(session_id, &answers)
    }

    pub fn transitions(&self, session_id: &str) -> Result<Vec<TransitionEvent>> {
        self.session(session_id)?;
        Ok(self.store.transitions(session_id)?)
    }
}

// ============================================================================
// TESTS
// ============================================================================
