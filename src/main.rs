use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use mindscreen::catalog::Catalog;
use mindscreen::config::AppConfig;
use mindscreen::db::{self, ScreeningScope};
use mindscreen::models::{AiAnalysis, Category, ResponderProfile, Role, Student, User};
use mindscreen::{answers, report, scoring, telemetry};

#[derive(Parser)]
#[command(name = "mindscreen")]
#[command(about = "Learning-difficulty risk screening from parent and teacher questionnaires", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo accounts and students
    Seed,
    /// Print the questionnaire asked of a responder role
    Catalog {
        #[arg(long)]
        role: Role,
    },
    /// Score an answer sheet (JSON object or question_id,answer CSV)
    Score {
        #[arg(long)]
        answers: PathBuf,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 0)]
        age: u8,
        #[arg(long, default_value = "")]
        grade: String,
        /// Refuse sheets with unanswered questions instead of counting them as 0
        #[arg(long)]
        require_complete: bool,
        /// Store the result against this student
        #[arg(long)]
        student_id: Option<Uuid>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List screenings visible to an account or recorded for one student
    #[command(group(
        ArgGroup::new("scope")
            .args(["email", "student_id"])
            .required(true)
            .multiple(false)
    ))]
    Screenings {
        #[arg(long, requires = "role")]
        email: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        student_id: Option<Uuid>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// List the students visible to an account
    Students {
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: Role,
    },
    /// Register a student under a parent or teacher account
    AddStudent {
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: i32,
        #[arg(long)]
        grade: String,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Attach a narrative to a stored screening
    #[command(group(
        ArgGroup::new("source")
            .args(["file", "placeholder"])
            .required(true)
            .multiple(false)
    ))]
    AttachAnalysis {
        #[arg(long)]
        screening_id: Uuid,
        /// JSON file with `letter` and `action_steps`
        #[arg(long)]
        file: Option<PathBuf>,
        /// Attach the standard placeholder used when generation failed
        #[arg(long)]
        placeholder: bool,
    },
    /// Generate a markdown report for a student or for an account's screenings
    #[command(group(
        ArgGroup::new("scope")
            .args(["email", "student_id"])
            .required(true)
            .multiple(false)
    ))]
    Report {
        #[arg(long, requires = "role")]
        email: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        student_id: Option<Uuid>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Catalog { role } => {
            let catalog = load_catalog(&config)?;
            println!("Question catalog {} for {role}:", catalog.version());
            for category in Category::ALL {
                println!();
                println!("{}", category.label());
                for question in catalog.page(category, role) {
                    println!("- [{}] (x{:.1}) {}", question.id, question.weight, question.text);
                }
            }
        }
        Commands::Score {
            answers: answers_path,
            role,
            name,
            age,
            grade,
            require_complete,
            student_id,
            json,
        } => {
            scoring::ensure_responder(role)?;
            let catalog = load_catalog(&config)?;
            let answers = answers::from_path(&answers_path)?;

            let unknown = answers::unknown_answer_ids(&catalog, &answers);
            if !unknown.is_empty() {
                warn!(ids = %unknown.join(", "), "ignoring answers for unknown questions");
            }

            if require_complete {
                scoring::require_complete(&catalog, role, &answers)?;
            } else {
                let missing = catalog.unanswered(role, &answers);
                if !missing.is_empty() {
                    warn!(
                        count = missing.len(),
                        "unanswered questions are scored as 'never'"
                    );
                }
            }

            let profile = ResponderProfile {
                name,
                age,
                grade,
                role,
            };
            let result = scoring::calculate_results(&answers, &catalog, &profile, Utc::now());
            info!(total_score = result.total_score, role = %role, "screening scored");

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "{}: total risk {}% ({})",
                    result.student_name,
                    result.total_score,
                    result.risk_level().label()
                );
                for (category, score) in &result.category_scores {
                    println!(
                        "- {}: {}% {} ({} findings)",
                        category.label(),
                        score.score,
                        score.risk_label,
                        score.findings.len()
                    );
                }
            }

            if let Some(student_id) = student_id {
                let pool = connect(&config).await?;
                db::fetch_student(&pool, student_id)
                    .await?
                    .with_context(|| format!("student {student_id} not found"))?;
                let id = db::insert_screening(&pool, student_id, &result).await?;
                println!("Stored screening {id}.");
            }
        }
        Commands::Screenings {
            email,
            role,
            student_id,
            limit,
        } => {
            let pool = connect(&config).await?;
            let scope = resolve_scope(&pool, email.as_deref(), role, student_id).await?;
            let screenings = db::fetch_screenings(&pool, scope).await?;

            if screenings.is_empty() {
                println!("No screenings found.");
                return Ok(());
            }

            for screening in screenings.iter().take(limit) {
                println!(
                    "- {} {} on {} by {}: {}% ({})",
                    screening.id,
                    screening.result.student_name,
                    screening.result.date.format("%Y-%m-%d"),
                    screening.result.completed_by,
                    screening.result.total_score,
                    screening.result.risk_level().label()
                );
            }
        }
        Commands::Students { email, role } => {
            let pool = connect(&config).await?;
            let user = find_account(&pool, &email, role).await?;
            let students = db::fetch_students(&pool, user.id, user.role).await?;

            if students.is_empty() {
                println!("No students registered for {email}.");
                return Ok(());
            }

            for student in students {
                println!(
                    "- {} {} (age {}, grade {})",
                    student.id, student.name, student.age, student.grade
                );
            }
        }
        Commands::AddStudent {
            email,
            role,
            name,
            age,
            grade,
            gender,
            notes,
        } => {
            let pool = connect(&config).await?;
            let user = find_account(&pool, &email, role).await?;
            let (parent_id, teacher_id) = match user.role {
                Role::Parent => (Some(user.id), None),
                Role::Teacher => (None, Some(user.id)),
                Role::Admin => anyhow::bail!("students are registered by a parent or teacher"),
            };

            let student = Student {
                id: Uuid::new_v4(),
                parent_id,
                teacher_id,
                name,
                age,
                grade,
                gender,
                notes,
            };
            let id = db::add_student(&pool, &student).await?;
            info!(%id, owner = %user.email, "student registered");
            println!("Added student {id}.");
        }
        Commands::AttachAnalysis {
            screening_id,
            file,
            ..
        } => {
            let analysis = match file {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    serde_json::from_str::<AiAnalysis>(&raw)
                        .with_context(|| format!("{} is not a valid analysis", path.display()))?
                }
                None => AiAnalysis::unavailable(),
            };

            let pool = connect(&config).await?;
            if !db::update_analysis(&pool, screening_id, &analysis).await? {
                anyhow::bail!("screening {screening_id} not found");
            }
            println!("Analysis attached to {screening_id}.");
        }
        Commands::Report {
            email,
            role,
            student_id,
            out,
        } => {
            let pool = connect(&config).await?;
            let document = match student_id {
                Some(student_id) => {
                    let student = db::fetch_student(&pool, student_id)
                        .await?
                        .with_context(|| format!("student {student_id} not found"))?;
                    let screenings =
                        db::fetch_screenings(&pool, ScreeningScope::Student(student_id)).await?;
                    report::build_report(&student, &screenings)
                }
                None => {
                    let scope = resolve_scope(&pool, email.as_deref(), role, None).await?;
                    let screenings = db::fetch_screenings(&pool, scope).await?;
                    let label = email.as_deref().unwrap_or("all accounts");
                    report::build_summary_report(label, &screenings)
                }
            };
            std::fs::write(&out, document)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

fn load_catalog(config: &AppConfig) -> anyhow::Result<Catalog> {
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::builtin()?,
    };
    info!(version = catalog.version(), questions = catalog.len(), "question catalog loaded");
    Ok(catalog)
}

async fn resolve_scope(
    pool: &PgPool,
    email: Option<&str>,
    role: Option<Role>,
    student_id: Option<Uuid>,
) -> anyhow::Result<ScreeningScope> {
    if let Some(student_id) = student_id {
        return Ok(ScreeningScope::Student(student_id));
    }

    let email = email.context("either --email or --student-id is required")?;
    let role = role.context("--role is required with --email")?;
    let user = find_account(pool, email, role).await?;

    Ok(ScreeningScope::Responder {
        user_id: user.id,
        role: user.role,
    })
}

async fn find_account(pool: &PgPool, email: &str, role: Role) -> anyhow::Result<User> {
    db::find_user(pool, email, role)
        .await?
        .with_context(|| format!("no {role} account for {email}"))
}
