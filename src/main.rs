use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use gradebook_risk_engine::analytics::{class_grade_sheet, student_analytics};
use gradebook_risk_engine::config::EngineConfig;
use gradebook_risk_engine::grade_map::QuarterGradeMap;
use gradebook_risk_engine::grading::{compute_overall_grade, summarize_quarter};
use gradebook_risk_engine::models::{GradeStructure, Quarter};
use gradebook_risk_engine::{db, logging, report};

#[derive(Parser)]
#[command(name = "gradebook")]
#[command(about = "Quarter grade calculation and student risk reporting", long_about = None)]
struct Cli {
    /// Engine config file (defaults to gradebook.config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import grades and/or attendance from CSV files
    #[command(group(
        ArgGroup::new("sources")
            .args(["grades", "attendance"])
            .required(true)
            .multiple(true)
    ))]
    Import {
        #[arg(long)]
        grades: Option<PathBuf>,
        #[arg(long)]
        attendance: Option<PathBuf>,
    },
    /// Print the grade sheet for a class
    Sheet {
        #[arg(long)]
        class: String,
    },
    /// Write a markdown progress report for one student
    Report {
        #[arg(long)]
        class: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Compute quarter grades from JSON files without a database
    Calc {
        #[arg(long)]
        structure: PathBuf,
        #[arg(long)]
        grades: PathBuf,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn calc(structure_path: &Path, grades_path: &Path) -> anyhow::Result<()> {
    let structure: GradeStructure = read_json(structure_path)?;
    let raw: serde_json::Map<String, serde_json::Value> = read_json(grades_path)?;
    let grades = QuarterGradeMap::from_raw(&raw);

    for (quarter, task_id) in grades.stale_keys(&structure) {
        tracing::warn!(%quarter, task_id = %task_id, "ignoring score for unknown task");
    }

    for quarter in Quarter::ALL {
        let summary = summarize_quarter(&grades, &structure, quarter);
        println!(
            "{}: {} (expected {}, {})",
            quarter,
            summary.grade,
            summary.expected,
            if summary.complete { "complete" } else { "in progress" }
        );
    }
    println!("Overall: {}", compute_overall_grade(&grades, &structure));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging()?;
    let cli = Cli::parse();
    let working_dir = std::env::current_dir().context("failed to read working directory")?;
    let config = EngineConfig::load(cli.config.as_deref(), &working_dir)?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { grades, attendance } => {
            let pool = connect().await?;
            if let Some(path) = grades {
                let written = db::import_grades_csv(&pool, &path).await?;
                println!("Imported {written} grades from {}.", path.display());
            }
            if let Some(path) = attendance {
                let written = db::import_attendance_csv(&pool, &path).await?;
                println!("Imported {written} attendance records from {}.", path.display());
            }
        }
        Commands::Sheet { class } => {
            let pool = connect().await?;
            let snapshot = db::fetch_class_snapshot(&pool, &class).await?;
            let rows = class_grade_sheet(&snapshot, &config);
            print!("{}", report::build_class_sheet(&snapshot, &rows));
        }
        Commands::Report { class, email, out } => {
            let pool = connect().await?;
            let snapshot = db::fetch_class_snapshot(&pool, &class).await?;
            let enrollment = snapshot
                .enrollments
                .iter()
                .find(|enrollment| enrollment.student_email.eq_ignore_ascii_case(&email))
                .with_context(|| format!("{email} is not enrolled in {class}"))?;
            let analytics = student_analytics(enrollment, &snapshot.structure, &config);
            let class_label = format!("{} ({})", snapshot.subject, snapshot.class_code);
            let report = report::build_student_report(&class_label, &analytics);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Calc { structure, grades } => {
            calc(&structure, &grades)?;
        }
    }

    Ok(())
}
