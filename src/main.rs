// Budget Planner - CLI
// One-shot validation/apply against JSON files, plus persistent sessions
// backed by the SQLite session store.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use budget_planner::{
    apply_answers, validate_answers, vet_questions, AnswerBatch, AnswerKind, AppConfig,
    BudgetPipeline, FieldError, FixedQuestionProvider, HeuristicQuestionProvider, Question,
    QuestionProvider, SqliteSessionStore, SubmitOutcome, UnifiedBudgetModel,
};

#[derive(Parser, Debug)]
#[command(name = "budget-planner")]
#[command(about = "Validate and apply clarifying answers to a budget model")]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true, env = "BUDGET_PLANNER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check an answer batch against a model without applying it
    Validate {
        #[arg(short, long)]
        model: PathBuf,
        #[arg(short, long)]
        answers: PathBuf,
    },
    /// Apply an answer batch and write the next model snapshot
    Apply {
        #[arg(short, long)]
        model: PathBuf,
        #[arg(short, long)]
        answers: PathBuf,
        /// Write the new model here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List clarifying questions for a model
    Questions {
        #[arg(short, long)]
        model: PathBuf,
        /// Extra questions (JSON array) to vet alongside the heuristics
        #[arg(long)]
        extra: Option<PathBuf>,
    },
    /// Persistent clarification sessions
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Start a session from a model file
    Create {
        #[arg(short, long)]
        model: PathBuf,
    },
    /// Show stage, readiness gaps and history
    Show { session_id: String },
    /// Show the questions still open for a session
    Questions { session_id: String },
    /// Submit an answer batch to a session
    Answer {
        session_id: String,
        #[arg(short, long)]
        answers: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!(?config, "configuration loaded");

    match cli.command {
        Command::Validate { model, answers } => run_validate(&model, &answers),
        Command::Apply {
            model,
            answers,
            output,
        } => run_apply(&config, &model, &answers, output.as_deref()),
        Command::Questions { model, extra } => run_questions(&model, extra.as_deref()),
        Command::Session(command) => run_session(&config, command),
    }
}

// ============================================================================
// ONE-SHOT COMMANDS
// ============================================================================

fn run_validate(model_path: &Path, answers_path: &Path) -> Result<()> {
    let model = UnifiedBudgetModel::from_file(model_path)?;
    let answers = AnswerBatch::from_file(answers_path)?;

    println!("🔍 Validating {} answers...", answers.len());
    let errors = validate_answers(&model, &answers);

    if errors.is_empty() {
        println!("✅ All answers valid");
        return Ok(());
    }

    print_errors(&errors);
    std::process::exit(1);
}

fn run_apply(
    config: &AppConfig,
    model_path: &Path,
    answers_path: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let model = UnifiedBudgetModel::from_file(model_path)?;
    let answers = AnswerBatch::from_file(answers_path)?;

    let outcome = match apply_answers(&model, &answers, &config.readiness) {
        Ok(outcome) => outcome,
        Err(errors) => {
            eprintln!("❌ Batch rejected, nothing applied");
            print_errors(&errors);
            std::process::exit(1);
        }
    };

    let json = outcome.model.to_json_pretty()?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write model: {:?}", path))?;
            eprintln!("✓ Applied {} answers → {:?}", outcome.applied, path);
        }
        None => println!("{}", json),
    }

    if outcome.ready {
        eprintln!("🎉 Model is ready for optimization");
    } else {
        eprintln!("⏳ Still missing:");
        for gap in config.readiness.missing(&outcome.model) {
            eprintln!("   - {}", gap);
        }
    }

    Ok(())
}

fn run_questions(model_path: &Path, extra: Option<&Path>) -> Result<()> {
    let model = UnifiedBudgetModel::from_file(model_path)?;

    let mut proposed = Vec::new();
    if let Some(path) = extra {
        proposed.extend(FixedQuestionProvider::from_file(path)?.questions(&model)?);
    }
    proposed.extend(HeuristicQuestionProvider::new().questions(&model)?);

    let (accepted, rejected) = vet_questions(&model, proposed);
    for error in &rejected {
        eprintln!("⚠️  Dropped question {}", error);
    }

    print_questions(&accepted);
    Ok(())
}

// ============================================================================
// SESSION COMMANDS
// ============================================================================

fn open_pipeline(config: &AppConfig) -> Result<BudgetPipeline<SqliteSessionStore>> {
    let store = SqliteSessionStore::open(&config.database_path)?;
    debug!(path = ?config.database_path, "session database opened");
    Ok(BudgetPipeline::new(store, config.readiness).with_actor("cli"))
}

fn run_session(config: &AppConfig, command: SessionCommand) -> Result<()> {
    let pipeline = open_pipeline(config)?;

    match command {
        SessionCommand::Create { model } => {
            let model = UnifiedBudgetModel::from_file(&model)?;
            let record = pipeline.create_session(model)?;
            println!("✓ Session created: {}", record.session_id);
            println!("   Stage: {}", record.stage);
        }
        SessionCommand::Show { session_id } => {
            let record = pipeline.session(&session_id)?;
            println!("📋 Session {}", record.session_id);
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("   Stage:    {}", record.stage);
            println!("   Updated:  {}", record.updated_at.to_rfc3339());
            println!("   Income:   {:.2}", record.model.summary.total_income);
            println!("   Expenses: {:.2}", record.model.summary.total_expenses);
            println!("   Surplus:  {:.2}", record.model.summary.surplus);

            let missing = pipeline.missing(&session_id)?;
            if !missing.is_empty() {
                println!("\n⏳ Missing:");
                for gap in missing {
                    println!("   - {}", gap);
                }
            }

            println!("\n🕒 History:");
            for event in pipeline.transitions(&session_id)? {
                println!(
                    "   {} {} → {} ({} fields) by {}",
                    event.timestamp.to_rfc3339(),
                    event.from_stage,
                    event.to_stage,
                    event.field_ids.len(),
                    event.actor
                );
            }
        }
        SessionCommand::Questions { session_id } => {
            print_questions(&pipeline.questions(&session_id)?);
        }
        SessionCommand::Answer {
            session_id,
            answers,
        } => {
            let answers = AnswerBatch::from_file(&answers)?;
            match pipeline.submit_answers(&session_id, &answers)? {
                SubmitOutcome::Applied { record, ready } => {
                    println!("✓ Applied {} answers", answers.len());
                    println!("   Stage: {}", record.stage);
                    if ready {
                        println!("🎉 Ready for optimization");
                    }
                }
                SubmitOutcome::Rejected { errors } => {
                    eprintln!("❌ Batch rejected, nothing applied");
                    print_errors(&errors);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

// ============================================================================
// OUTPUT
// ============================================================================

fn print_errors(errors: &[FieldError]) {
    eprintln!("❌ {} invalid answer(s):", errors.len());
    for error in errors {
        eprintln!("   {}", error);
    }
}

fn print_questions(questions: &[Question]) {
    if questions.is_empty() {
        println!("✅ Nothing left to ask");
        return;
    }

    println!("❓ {} question(s):", questions.len());
    for question in questions {
        let hint = match &question.answer_kind {
            AnswerKind::Boolean => "true/false".to_string(),
            AnswerKind::Choice(options) => options.join(" | "),
            AnswerKind::Number => "number".to_string(),
            AnswerKind::Text => "text".to_string(),
        };
        println!("   {:<32} {} [{}]", question.field_id, question.prompt, hint);
    }
}
