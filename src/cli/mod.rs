//! Command-line interface
//!
//! `train` fits and saves the pipeline, `serve` runs the prediction API and
//! `predict` scores a file offline through the same inference procedure.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::inference::{predict_prices, PredictPayload, PredictionOutput, PricePipeline};
use crate::server::{load_or_train, run_server, ServerConfig};
use crate::training::{TrainEngine, TrainingConfig};
use crate::utils::DataLoader;

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

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "car-price")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Used-car price prediction for PakWheels listings")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the price pipeline on a listings CSV and save it
    Train {
        /// Listings CSV (defaults to the config's data path)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Where to write the fitted pipeline
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON training configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of sampled hyperparameter candidates
        #[arg(long)]
        n_iter: Option<usize>,

        /// Number of cross-validation folds
        #[arg(long)]
        cv_folds: Option<usize>,

        /// Fraction of rows held out for evaluation
        #[arg(long)]
        test_size: Option<f64>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Start the prediction server
    Serve {
        /// Server host
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        /// Server port
        #[arg(short, long, env = "PORT", default_value = "5000")]
        port: u16,

        /// Fitted pipeline to load
        #[arg(short, long, env = "MODEL_PATH", default_value = "artifacts/car_price_model.bin")]
        model: PathBuf,

        /// Train on this CSV first when the model file is missing
        #[arg(long)]
        train_data: Option<PathBuf>,
    },

    /// Predict prices for a JSON or CSV file of listings
    Predict {
        /// Fitted pipeline to load
        #[arg(short, long, env = "MODEL_PATH", default_value = "artifacts/car_price_model.bin")]
        model: PathBuf,

        /// Listings as JSON (any request body shape) or CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Build the training configuration: file first, then flag overrides
pub fn training_config(
    config_path: Option<&Path>,
    data: Option<&Path>,
    output: Option<&Path>,
    n_iter: Option<usize>,
    cv_folds: Option<usize>,
    test_size: Option<f64>,
    seed: Option<u64>,
) -> anyhow::Result<TrainingConfig> {
    let mut config = match config_path {
        Some(path) => TrainingConfig::from_file(path)?,
        None => TrainingConfig::default(),
    };

    if let Some(data) = data {
        config = config.with_data_path(data);
    }
    if let Some(output) = output {
        config = config.with_output_path(output);
    }
    if let Some(n) = n_iter {
        config = config.with_n_iter(n);
    }
    if let Some(k) = cv_folds {
        config = config.with_cv_folds(k);
    }
    if let Some(t) = test_size {
        config = config.with_test_size(t);
    }
    if let Some(s) = seed {
        config = config.with_random_state(s);
    }

    config.validate()?;
    Ok(config)
}

pub fn cmd_train(config: TrainingConfig) -> anyhow::Result<()> {
    section("Train");

    println!("  {:<16} {}", muted("Data"), config.data_path.display());
    println!("  {:<16} {}", muted("Candidates"), config.search.n_iter);
    println!("  {:<16} {}", muted("CV folds"), config.search.cv_folds);
    println!("  {:<16} {}", muted("Seed"), config.random_state);
    println!();

    step_run("Loading data");
    let start = Instant::now();
    let records = DataLoader::new().load_records(&config.data_path)?;
    step_done(&format!("{} rows in {:?}", records.len(), start.elapsed()));

    step_run("Searching hyperparameters");
    let engine = TrainEngine::new(config.clone());
    let (pipeline, report) = engine.train(&records)?;
    step_done(&format!("{:.1}s", report.duration_secs));

    step_run(&format!("Saving → {}", config.output_path.display()));
    pipeline.save(&config.output_path)?;
    step_done("");

    println!();
    println!("  {:<16} {}", muted("Rows used"), format!("{} train / {} test", report.n_train, report.n_test).white());
    println!("  {:<16} {}", muted("Dropped"), format!(
        "{} price outliers, {} unclean",
        report.n_price_filtered, report.n_rejected
    ).white());
    println!("  {:<16} {}", muted("Best params"), report.best_params.to_string().white());
    println!("  {:<16} {}", muted("CV R²"), format!("{:.4}", report.cv_r2).white().bold());
    println!("  {:<16} {}", muted("Test R²"), format!("{:.4}", report.test_metrics.r2).white().bold());
    println!("  {:<16} {}", muted("Test RMSE (log)"), format!("{:.4}", report.test_metrics.rmse).white());

    let importances = &pipeline.metadata().feature_importances;
    if !importances.is_empty() {
        println!();
        println!("  {:<32} {:>10}", muted("Feature"), muted("Importance"));
        println!("  {}", dim(&"─".repeat(43)));
        for (name, importance) in importances.iter().take(10) {
            println!("  {:<32} {:>10.4}", name, importance);
        }
    }

    println!();
    step_ok(&format!("Model saved to {}", config.output_path.display()));
    println!();
    Ok(())
}

pub async fn cmd_serve(
    host: &str,
    port: u16,
    model_path: &Path,
    train_data: Option<&Path>,
) -> anyhow::Result<()> {
    let config = ServerConfig {
        host: host.to_string(),
        port,
        model_path: model_path.to_path_buf(),
        ..Default::default()
    };

    let model_path = config.model_path.clone();
    let train_data = train_data.map(Path::to_path_buf);
    let pipeline = tokio::task::spawn_blocking(move || {
        load_or_train(&model_path, train_data.as_deref())
    })
    .await??;

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Car Price Predictor".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Predict", &format!("POST http://{}:{}/predict", host, port)));
    line_box(&kv("Health ", &format!("http://{}:{}/health", host, port)));
    line_box(&kv("Model  ", &config.model_path.display().to_string()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config, pipeline).await
}

/// Read listings from a `.csv` file or a JSON file in any request body shape
pub fn load_input(path: &Path) -> anyhow::Result<PredictPayload> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let payload = match ext {
        "csv" => PredictPayload::Records(DataLoader::new().load_records(path)?),
        "json" => PredictPayload::from_slice(&std::fs::read(path)?)?,
        _ => anyhow::bail!("Unsupported input format: {} (expected .json or .csv)", ext),
    };

    Ok(payload)
}

pub fn cmd_predict(model_path: &Path, input: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let pipeline = PricePipeline::load(model_path)?;
    let records = load_input(input)?.into_records();

    let prices = predict_prices(&pipeline, &records)?;
    let json = serde_json::to_string_pretty(&PredictionOutput::from_prices(prices))?;

    match output {
        Some(path) => {
            std::fs::write(path, &json)?;
            eprintln!("  {} {} predictions → {}", ok("✓"), records.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
