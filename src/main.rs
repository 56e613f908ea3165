mod ai;
mod builder;
mod config;
mod db;
mod error;
mod interview;
mod logging;
mod models;
mod report;
mod schema;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use ai::Recommender;
use builder::{ResponseBuilder, Session};
use config::Config;
use db::ResponseStore;
use error::AssistantError;
use interview::Interview;
use models::{AnswerValue, StoredRecord};
use schema::{Condition, Options, Variant};

#[derive(Parser)]
#[command(name = "career-assistant")]
#[command(about = "Academics & career questionnaire - collect answers, store them, get advice")]
struct Cli {
    /// Path to the response database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the response table
    Init {
        #[arg(long, value_enum, default_value_t = Variant::Classic)]
        variant: Variant,
    },

    /// Answer the questionnaire interactively
    Survey {
        #[arg(long, value_enum, default_value_t = Variant::Classic)]
        variant: Variant,

        /// Recommendation model (advisor variant only)
        #[arg(short, long, default_value = "gpt2")]
        model: String,

        /// Where to write the recommendation report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Submit answers from a JSON file
    Submit {
        /// JSON object mapping field ids to answers
        #[arg(short, long)]
        answers: PathBuf,

        #[arg(long, value_enum, default_value_t = Variant::Classic)]
        variant: Variant,

        /// Recommendation model (advisor variant only)
        #[arg(short, long, default_value = "gpt2")]
        model: String,

        /// Where to write the recommendation report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List stored responses
    List {
        #[arg(long, value_enum, default_value_t = Variant::Classic)]
        variant: Variant,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the questions for a variant
    Fields {
        #[arg(long, value_enum, default_value_t = Variant::Classic)]
        variant: Variant,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;
    let config = Config::load(cli.db);

    match cli.command {
        Commands::Init { variant } => {
            let store = ResponseStore::open(&config.db_path, variant)?;
            println!(
                "Table '{}' ready in {} ({} responses stored)",
                variant.table_name(),
                store.path().unwrap_or(config.db_path.as_path()).display(),
                store.count()?
            );
            store.close()?;
        }

        Commands::Survey {
            variant,
            model,
            output,
        } => {
            let recommender = load_recommender(variant, &model, &config)?;
            let store = ResponseStore::open(&config.db_path, variant)?;
            let mut builder = ResponseBuilder::new(variant, Session::new());

            println!("Your Academics & Career Assistant");
            println!(
                "Answer the questions below to get study and career suggestions \
                 based on your inputs."
            );
            let stdin = io::stdin();
            Interview::new(stdin.lock(), io::stdout()).run(&mut builder)?;

            let report_path = output.unwrap_or_else(|| default_report_path(builder.session()));
            let report = finish(
                &mut builder,
                &store,
                recommender.as_deref(),
                &report_path,
                &mut io::stdout(),
            )?;
            log_finished(builder.session(), report.as_deref());
            store.close()?;
        }

        Commands::Submit {
            answers,
            variant,
            model,
            output,
        } => {
            let content = std::fs::read_to_string(&answers)
                .with_context(|| format!("Failed to read answers file: {}", answers.display()))?;
            let parsed: BTreeMap<String, AnswerValue> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse answers file: {}", answers.display()))?;

            let recommender = load_recommender(variant, &model, &config)?;
            let store = ResponseStore::open(&config.db_path, variant)?;
            let mut builder = ResponseBuilder::new(variant, Session::new());
            builder.apply(parsed)?;

            let report_path = output.unwrap_or_else(|| default_report_path(builder.session()));
            let report = finish(
                &mut builder,
                &store,
                recommender.as_deref(),
                &report_path,
                &mut io::stdout(),
            )?;
            log_finished(builder.session(), report.as_deref());
            store.close()?;
        }

        Commands::List { variant, json } => {
            let store = ResponseStore::open(&config.db_path, variant)?;
            let records = store.records()?;
            print_records(variant, &records, json, &mut io::stdout())?;
            store.close()?;
        }

        Commands::Fields { variant } => {
            print_fields(variant, &mut io::stdout())?;
        }
    }

    Ok(())
}

/// Picks the recommendation model for variants that use one. A model that
/// cannot be set up (for example a missing API key) only disables advice.
fn load_recommender(
    variant: Variant,
    model: &str,
    config: &Config,
) -> Result<Option<Box<dyn Recommender>>> {
    if !variant.recommends() {
        return Ok(None);
    }
    let Some(spec) = ai::resolve_model(model)? else {
        return Ok(None);
    };
    info!(model = %spec.short_name, "recommendation model selected");
    match ai::create_provider(&spec, &config.inference_url) {
        Ok(provider) => Ok(Some(provider)),
        Err(e) => {
            warn!("{}", e);
            eprintln!("{}", e);
            Ok(None)
        }
    }
}

/// Stores the response, echoes it, then runs the advice and report steps.
/// Returns the report path when one was written. Only storage errors fail
/// here; advice and export problems are reported and the stored record stays.
fn finish(
    builder: &mut ResponseBuilder,
    store: &ResponseStore,
    recommender: Option<&dyn Recommender>,
    report_path: &Path,
    out: &mut impl Write,
) -> Result<Option<PathBuf>> {
    let record_id = builder.submit(store)?;
    let response = builder.finalize()?;

    writeln!(out, "\nThank you! Your response was saved as record #{}.", record_id)?;
    for line in response.display_lines() {
        writeln!(out, "  {}", line)?;
    }

    if !response.variant().recommends() {
        return Ok(None);
    }

    let Some(recommender) = recommender else {
        writeln!(out, "\nNo recommendation model available; skipping the report.")?;
        return Ok(None);
    };

    let summary = response.summary();
    writeln!(out, "\nGenerating recommendation with {}...", recommender.model_name())?;
    let recommendation = match recommender.recommend(&summary) {
        Ok(text) => text,
        Err(e) => {
            writeln!(out, "{}", e)?;
            writeln!(out, "Your answers are saved; no report was written.")?;
            return Ok(None);
        }
    };

    writeln!(out, "\n--- Recommendation ---\n{}", recommendation)?;
    match report::write_report(report_path, &summary, &recommendation) {
        Ok(()) => {
            writeln!(out, "\nReport saved to: {}", report_path.display())?;
            Ok(Some(report_path.to_path_buf()))
        }
        Err(e @ AssistantError::ExportFailed(_)) => {
            warn!("{}", e);
            writeln!(out, "{}", e)?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn log_finished(session: &Session, report: Option<&Path>) {
    info!(
        record = ?session.submitted_as(),
        report = ?report.map(Path::display),
        elapsed_secs = (chrono::Local::now() - session.started_at()).num_seconds(),
        "questionnaire session finished"
    );
}

fn print_records(
    variant: Variant,
    records: &[StoredRecord],
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    if json {
        let values: Vec<_> = records.iter().map(|r| r.to_json(variant.schema())).collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&values)?)?;
        return Ok(());
    }
    if records.is_empty() {
        writeln!(out, "No responses found.")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<6} {:<10} {:<16} {:<15} {:<30}",
        "ID", "AGE", "EDUCATION", "EMPLOYMENT", "CAREER INTERESTS"
    )?;
    writeln!(out, "{}", "-".repeat(80))?;
    for record in records {
        writeln!(
            out,
            "{:<6} {:<10} {:<16} {:<15} {:<30}",
            record.id,
            truncate(record.text("age_group").unwrap_or("-"), 8),
            truncate(record.text("education_level").unwrap_or("-"), 14),
            truncate(record.text("employment_status").unwrap_or("-"), 13),
            truncate(record.text("career_interests").unwrap_or("-"), 28),
        )?;
    }
    Ok(())
}

fn print_fields(variant: Variant, out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "{} variant - table '{}', lists joined with {:?}",
        variant,
        variant.table_name(),
        variant.delimiter()
    )?;
    for (idx, field) in variant.schema().fields().iter().enumerate() {
        let required = if field.required { "" } else { " (optional)" };
        writeln!(out, "\n{:>2}. {} [{:?}]{}", idx + 1, field.id, field.kind, required)?;
        writeln!(out, "    {}", field.prompt)?;
        match field.options {
            Options::Fixed(opts) => writeln!(out, "    options: {}", opts.join(" | "))?,
            Options::ByEducationLevel => writeln!(out, "    options: depend on education_level")?,
            Options::None => {}
        }
        if let Some((min, max)) = field.range {
            writeln!(out, "    range: {}..={}", min, max)?;
        }
        if let Some(dep) = field.depends_on {
            writeln!(out, "    asked when: {}", describe_condition(dep.field, &dep.condition))?;
        }
    }
    Ok(())
}

fn default_report_path(session: &Session) -> PathBuf {
    PathBuf::from(format!(
        "career_report_{}.txt",
        session.started_at().format("%Y%m%d_%H%M%S")
    ))
}

fn describe_condition(field: &str, condition: &Condition) -> String {
    match condition {
        Condition::NotEquals(v) => format!("{} is not '{}'", field, v),
        Condition::OneOf(vs) => format!("{} is one of {}", field, vs.join(", ")),
        Condition::Contains(v) => format!("{} includes '{}'", field, v),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
