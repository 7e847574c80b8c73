//! Command-line interface
//!
//! `train` runs the offline pipeline, `serve` starts the prediction form and
//! `predict` scores observations from the terminal.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{ArtifactPaths, PipelineConfig};
use crate::ingestion::read_csv;
use crate::pipeline::TrainingPipeline;
use crate::predict::{CustomData, PredictPipeline};
use crate::server::{run_server, ServerConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn step_failed(detail: &str) {
    println!("{} {}", "failed".red(), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "regress")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a regression model on tabular data and serve predictions")]
#[command(long_about = None)]
pub struct Cli {
    /// Directory for run logs
    #[arg(long, global = true, default_value = "logs")]
    pub log_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run ingestion, transformation and model training
    Train {
        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Source CSV dataset
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Artifacts directory
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// Seed for the split and the estimators
        #[arg(long)]
        seed: Option<u64>,

        /// Minimum test R² for the winning model
        #[arg(long)]
        quality_floor: Option<f64>,

        /// Fit every model once with default hyperparameters
        #[arg(long)]
        no_search: bool,
    },

    /// Start the prediction web form
    Serve {
        /// JSON pipeline configuration; supplies the form schema and artifacts
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,

        /// Artifacts directory
        #[arg(short, long)]
        artifacts: Option<PathBuf>,
    },

    /// Predict from name=value fields or a CSV file
    Predict {
        /// Feature assignment, repeatable: --field writing_score=72
        #[arg(short, long = "field")]
        fields: Vec<String>,

        /// CSV file with one observation per row
        #[arg(short, long, conflicts_with = "fields")]
        data: Option<PathBuf>,

        /// Artifacts directory
        #[arg(short, long)]
        artifacts: Option<PathBuf>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub struct TrainArgs {
    pub config: Option<PathBuf>,
    pub data: Option<PathBuf>,
    pub artifacts: Option<PathBuf>,
    pub seed: Option<u64>,
    pub quality_floor: Option<f64>,
    pub no_search: bool,
}

/// Pipeline configuration from file, environment and flags, in that order
pub fn resolve_config(args: &TrainArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    }
    .with_env_overrides();

    if let Some(data) = &args.data {
        config = config.with_source(data);
    }
    if let Some(dir) = &args.artifacts {
        config = config.with_artifacts_dir(dir);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(floor) = args.quality_floor {
        config.trainer = config.trainer.with_quality_floor(floor);
    }
    if args.no_search {
        config.trainer = config.trainer.without_search();
    }
    Ok(config)
}

pub fn cmd_train(args: TrainArgs) -> anyhow::Result<()> {
    section("Train");
    let config = resolve_config(&args)?;

    println!("  {}", kv("Source   ", &config.ingestion.source_path.display().to_string()));
    println!("  {}", kv("Artifacts", &config.artifacts.dir.display().to_string()));
    println!("  {}", kv("Models   ", &config.trainer.models.len().to_string()));
    println!();

    step_run("Running pipeline");
    let start = Instant::now();
    let summary = match TrainingPipeline::new(config).run() {
        Ok(summary) => summary,
        Err(e) => {
            step_failed(&format!("{:.1?}", start.elapsed()));
            return Err(e.into());
        }
    };
    step_done(&format!("{:.1?}", start.elapsed()));

    step_ok(&format!(
        "{} train rows, {} test rows, {} features",
        summary.ingestion.train_rows, summary.ingestion.test_rows, summary.n_features
    ));

    section("Models");
    for score in summary.outcome.report.iter() {
        let marker = if score.name == summary.outcome.best_model { ok("●") } else { dim("○") };
        let cv = score
            .cv_score
            .map(|s| format!("cv {:.4}", s))
            .unwrap_or_else(|| "cv -".to_string());
        println!(
            "  {} {:<26} {}  {}",
            marker,
            score.name,
            format!("{:.4}", score.test_r2).white(),
            dim(&cv)
        );
    }

    println!();
    println!("  {:<16} {}", muted("Best model"), summary.outcome.best_model.white().bold());
    println!("  {:<16} {}", muted("R²"), format!("{:.4}", summary.outcome.r2).white().bold());
    println!("  {:<16} {}", muted("Saved to"), summary.outcome.model_path.display().to_string().white());
    println!();

    Ok(())
}

pub fn cmd_predict(fields: &[String], data: Option<&Path>, artifacts: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");
    let paths = artifacts_or_default(artifacts);
    let pipeline = PredictPipeline::from_paths(&paths);

    match data {
        Some(path) => {
            step_run("Loading data");
            let df = read_csv(path)?;
            step_done(&format!("{} rows", df.height()));

            let predictions = pipeline.predict_frame(&df)?;
            for (i, value) in predictions.iter().enumerate() {
                println!("  {:>6}  {}", dim(&i.to_string()), format!("{:.4}", value).white());
            }
        }
        None => {
            if fields.is_empty() {
                anyhow::bail!("pass --field name=value for every feature, or --data FILE");
            }
            let observation = CustomData::from_assignments(fields)?;
            let value = pipeline.predict(&observation)?;
            println!("  {:<16} {}", muted("Prediction"), format!("{:.4}", value).white().bold());
        }
    }
    println!();
    Ok(())
}

pub struct ServeArgs {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub artifacts: Option<PathBuf>,
}

/// Server configuration from the pipeline file, environment and flags, in that order
pub fn resolve_server_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig::default();
    if let Some(path) = &args.config {
        let pipeline = PipelineConfig::from_file(path)?.with_env_overrides();
        config = config
            .with_schema(pipeline.schema)
            .with_artifacts(pipeline.artifacts);
    }
    if let Some(host) = &args.host {
        config = config.with_host(host.clone());
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(dir) = &args.artifacts {
        config = config.with_artifacts(ArtifactPaths::new(dir));
    }
    Ok(config)
}

pub async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = resolve_server_config(&args)?;

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Score Predictor".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Home     ", &format!("http://{}:{}", config.host, config.port)));
    line_box(&kv("Form     ", &format!("http://{}:{}/predictdata", config.host, config.port)));
    line_box(&kv("Artifacts", &config.artifacts.dir.display().to_string()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}

fn artifacts_or_default(dir: Option<&Path>) -> ArtifactPaths {
    match dir {
        Some(dir) => ArtifactPaths::new(dir),
        None => std::env::var("ARTIFACTS_DIR")
            .map(ArtifactPaths::new)
            .unwrap_or_default(),
    }
}
