use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

mod batch;
mod calendar;
mod causes;
mod config;
mod error;
mod features;
mod inference;
mod logging;
mod models;
mod pipeline;
mod projection;
mod report;
mod schema;
mod tiering;

use causes::CauseMode;
use config::ModelConfig;
use models::ProjectInput;
use pipeline::PipelineOptions;
use schema::ModelGeneration;

#[derive(Parser)]
#[command(name = "obra-delay-risk")]
#[command(about = "Delay risk, delay estimate and likely causes for construction projects", long_about = None)]
struct Cli {
    /// Model generation the loaded artifacts were trained as
    #[arg(long, value_enum, default_value_t = ModelGeneration::Calendario, global = true)]
    generation: ModelGeneration,
    /// Directory holding `<generation>/clasificacion.json` and `regresion.json`
    /// [env: DELAY_RISK_MODELS_DIR]
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = CauseMode::AccumulateAll, global = true)]
    cause_mode: CauseMode,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a single project
    Assess {
        #[command(flatten)]
        project: ProjectArgs,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Assess every row of a CSV file and write a markdown report
    Batch {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "delay-report.md")]
        out: PathBuf,
    },
    /// Show the classifier's feature importances
    Importances,
    /// Show columns, enumerations and bounds of the selected generation
    Schema,
}

#[derive(Args)]
struct ProjectArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long, default_value = "Vivienda")]
    work_type: String,
    #[arg(long, default_value = "Centro")]
    region: String,
    #[arg(long, default_value = "Enero")]
    start_month: String,
    #[arg(long, default_value = "Bajo")]
    seismic_risk: String,
    #[arg(long, default_value = "Bajo")]
    flood_risk: String,
    #[arg(long, default_value_t = 365)]
    duration_days: u32,
    #[arg(long, default_value_t = 50.0)]
    base_budget: f64,
    #[arg(long, default_value_t = 55.0)]
    updated_budget: f64,
    #[arg(long, default_value_t = 40.0)]
    disbursed_flow: f64,
    #[arg(long, default_value_t = 1)]
    pending_contracts: u32,
    #[arg(long, default_value_t = 300)]
    staff: u32,
    #[arg(long, default_value_t = 3000.0)]
    floor_area: f64,
    /// Average rainfall in mm (used by `realista` only)
    #[arg(long, default_value_t = 80.0)]
    rainfall_mm: f64,
    /// Used by `realista` only
    #[arg(long, default_value_t = 10)]
    suppliers: u32,
    /// Used by `avance` and `calendario`
    #[arg(long, default_value_t = 50.0)]
    planned_progress: f64,
    /// Used by `avance` and `calendario`
    #[arg(long, default_value_t = 50.0)]
    actual_progress: f64,
    #[arg(long, default_value_t = 2025)]
    start_year: i32,
    /// Contractual end date, YYYY-MM-DD
    #[arg(long, default_value = "2026-01-31")]
    planned_end: NaiveDate,
}

impl From<ProjectArgs> for ProjectInput {
    fn from(args: ProjectArgs) -> Self {
        ProjectInput {
            name: args.name,
            work_type: args.work_type,
            region: args.region,
            start_month: args.start_month,
            seismic_risk: args.seismic_risk,
            flood_risk: args.flood_risk,
            planned_duration_days: args.duration_days,
            base_budget: args.base_budget,
            updated_budget: args.updated_budget,
            disbursed_flow: args.disbursed_flow,
            pending_contracts: args.pending_contracts,
            staff_count: args.staff,
            floor_area_m2: args.floor_area,
            rainfall_mm: Some(args.rainfall_mm),
            suppliers: Some(args.suppliers),
            planned_progress_pct: Some(args.planned_progress),
            actual_progress_pct: Some(args.actual_progress),
            start_year: Some(args.start_year),
            planned_end_date: Some(args.planned_end),
        }
    }
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let model_config = ModelConfig::resolve(cli.generation, cli.models_dir);
    let options = PipelineOptions {
        cause_mode: cli.cause_mode,
    };

    match cli.command {
        Commands::Schema => {
            print!("{}", report::render_schema(cli.generation.schema()));
        }
        Commands::Importances => {
            let models = config::load_models(&model_config).context("failed to load models")?;
            print!(
                "{}",
                report::render_importances(&pipeline::feature_importances(&models))
            );
        }
        Commands::Assess { project, json } => {
            let models = config::load_models(&model_config).context("failed to load models")?;
            match pipeline::assess(&models, project.into(), options) {
                Ok(assessment) if json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&report::assessment_json(&assessment))?
                    );
                }
                Ok(assessment) => print!("{}", report::render_assessment(&assessment)),
                Err(err) if err.is_validation() => {
                    eprintln!("Input rejected: {err}");
                    std::process::exit(2);
                }
                Err(err) => return Err(err).context("assessment aborted"),
            }
        }
        Commands::Batch { csv, out } => {
            let models = config::load_models(&model_config).context("failed to load models")?;
            let outcomes = batch::assess_csv(&models, &csv, options)?;
            let source = csv.display().to_string();
            let report = report::build_batch_report(models.schema, &source, &outcomes);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            let assessed = outcomes.iter().filter(|o| o.result.is_ok()).count();
            println!(
                "Assessed {assessed} of {} projects; report written to {}.",
                outcomes.len(),
                out.display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features;

    fn parse_project(args: &[&str]) -> ProjectInput {
        let cli = Cli::try_parse_from(args).expect("arguments parse");
        match cli.command {
            Commands::Assess { project, .. } => project.into(),
            _ => panic!("expected the assess command"),
        }
    }

    #[test]
    fn bare_assess_is_valid_for_every_generation() {
        let input = parse_project(&["obra-delay-risk", "assess"]);
        for generation in [
            ModelGeneration::Realista,
            ModelGeneration::Avance,
            ModelGeneration::Calendario,
        ] {
            let record = features::build(input.clone(), generation.schema())
                .unwrap_or_else(|err| panic!("{}: {err}", generation.as_str()));
            assert_eq!(record.generation, generation);
        }
        let record = features::build(input, ModelGeneration::Calendario.schema())
            .expect("valid input");
        assert_eq!(record.derived.schedule_margin_days, Some(30));
    }

    #[test]
    fn flags_override_defaults() {
        let input = parse_project(&[
            "obra-delay-risk",
            "--generation",
            "avance",
            "assess",
            "--region",
            "Golfo",
            "--planned-end",
            "2026-06-30",
            "--actual-progress",
            "20",
        ]);
        assert_eq!(input.region, "Golfo");
        assert_eq!(input.actual_progress_pct, Some(20.0));
        assert_eq!(input.planned_end_date, NaiveDate::from_ymd_opt(2026, 6, 30));
    }
}
