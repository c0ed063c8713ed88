//! Command-line interface for model selection and prediction

use clap::{Parser, Subcommand};
use colored::*;
use ndarray::Array2;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::export::load_artifact;
use crate::selection::{ModelTrainer, ModelTrainerConfig, Registry};
use crate::training::{format_params, ModelKind, RegressionMetrics, Regressor};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

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
#[command(name = "model-trainer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Select, tune and persist the best regression model for a dataset")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run model selection on a train/test pair
    Train {
        /// Training CSV (header row, numeric columns, label last)
        #[arg(long)]
        train: PathBuf,

        /// Test CSV with the same columns
        #[arg(long)]
        test: PathBuf,

        /// Artifact path (overrides the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimum test R² to accept a model (overrides the config)
        #[arg(long)]
        threshold: Option<f64>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Evaluate models in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Predict with a persisted model
    Predict {
        /// Artifact written by `train`
        #[arg(short, long)]
        model: PathBuf,

        /// Input CSV; an extra last column is treated as the label
        #[arg(short, long)]
        data: PathBuf,

        /// Output predictions CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the candidate models and their search grids
    Models,
}

// ─── Data loading ──────────────────────────────────────────────────────────────

fn load_csv(path: &Path) -> anyhow::Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Convert every column to `f64`; missing or non-numeric cells are an error
pub fn dataframe_to_array(df: &DataFrame) -> anyhow::Result<Array2<f64>> {
    let mut data = Array2::<f64>::zeros((df.height(), df.width()));
    for (j, column) in df.get_columns().iter().enumerate() {
        let series = column.as_materialized_series().cast(&DataType::Float64)?;
        for (i, value) in series.f64()?.into_iter().enumerate() {
            data[[i, j]] = value.ok_or_else(|| {
                anyhow::anyhow!("column '{}' has a missing or non-numeric value at row {}", column.name(), i)
            })?;
        }
    }
    Ok(data)
}

pub fn load_matrix(path: &Path) -> anyhow::Result<Array2<f64>> {
    dataframe_to_array(&load_csv(path)?)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    train_path: &Path,
    test_path: &Path,
    output: Option<&Path>,
    threshold: Option<f64>,
    config_path: Option<&Path>,
    parallel: bool,
) -> anyhow::Result<()> {
    section("Train");

    let mut config = match config_path {
        Some(path) => ModelTrainerConfig::from_json_file(path)?,
        None => ModelTrainerConfig::default(),
    };
    if let Some(path) = output {
        config = config.with_artifact_path(path);
    }
    if let Some(threshold) = threshold {
        config = config.with_acceptance_threshold(threshold);
    }
    if parallel {
        config = config.with_parallel(true);
    }

    step_run("Loading data");
    let start = Instant::now();
    let train = load_matrix(train_path)?;
    let test = load_matrix(test_path)?;
    step_done(&format!(
        "train {} × {}, test {} × {} in {:?}",
        train.nrows(),
        train.ncols(),
        test.nrows(),
        test.ncols(),
        start.elapsed()
    ));

    step_run("Selecting model");
    let start = Instant::now();
    let outcome = ModelTrainer::new(config).run(&train, &test)?;
    step_done(&format!("{:?}", start.elapsed()));

    section("Model report");
    let mut rows: Vec<(&String, &f64)> = outcome.model_report.iter().collect();
    rows.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
    for (name, score) in rows {
        let params = outcome
            .best_params_report
            .get(name)
            .map(format_params)
            .unwrap_or_default();
        let marker = if *name == outcome.best_model_name { ok("●") } else { dim("○") };
        println!("  {} {:<24} {:>8}  {}", marker, name, format!("{:.4}", score), dim(&params));
    }

    println!();
    println!("  {:<16} {}", muted("Best model"), outcome.best_model_name.white().bold());
    println!("  {:<16} {}", muted("Parameters"), format_params(&outcome.parameters));
    println!(
        "  {:<16} {}",
        muted("R²"),
        format!("{:.4}", outcome.validation_score).white().bold()
    );
    println!("  {:<16} {}", muted("Artifact"), outcome.artifact_path.display());
    println!();

    Ok(())
}

pub fn cmd_predict(model_path: &Path, data_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let (model, metadata) = load_artifact(model_path)?;
    step_done(&format!("{} ({})", metadata.model_name, metadata.trained_at));

    step_run("Loading data");
    let data = load_matrix(data_path)?;
    step_done(&format!("{} rows × {} cols", data.nrows(), data.ncols()));

    let n_features = metadata.n_features;
    let (x, labels) = if data.ncols() == n_features + 1 {
        let x = data.slice(ndarray::s![.., ..n_features]).to_owned();
        (x, Some(data.column(n_features).to_owned()))
    } else {
        (data, None)
    };

    let predictions = model.predict(&x)?;

    if let Some(y) = labels {
        let metrics = RegressionMetrics::compute(&y, &predictions)?;
        println!();
        println!("  {:<16} {}", muted("R²"), format!("{:.4}", metrics.r2).white().bold());
        println!("  {:<16} {:.4}", muted("RMSE"), metrics.rmse);
        println!("  {:<16} {:.4}", muted("MAE"), metrics.mae);
        println!("  {:<16} {:.4}", muted("MSE"), metrics.mse);
        println!("  {:<16} {}", muted("Samples"), metrics.n_samples);
    }

    match output {
        Some(path) => {
            let mut df = DataFrame::new(vec![Column::new("prediction".into(), predictions.to_vec())])?;
            let mut file = std::fs::File::create(path)?;
            CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
            println!("  {:<16} {}", muted("Written"), path.display());
        }
        None => {
            println!();
            for value in predictions.iter() {
                println!("  {}", value);
            }
        }
    }
    println!();

    Ok(())
}

pub fn cmd_models() -> anyhow::Result<()> {
    section("Models");
    for spec in Registry::default().specs() {
        let n = spec.grid.n_combinations();
        println!(
            "  {:<24} {}",
            spec.name.white().bold(),
            dim(&format!("{} combination{}", n, if n == 1 { "" } else { "s" }))
        );
        for name in spec.grid.names() {
            let values: Vec<String> = spec
                .grid
                .values(name)
                .unwrap_or_default()
                .iter()
                .map(|v| v.to_string())
                .collect();
            println!("    {:<20} {}", muted(name), values.join(", "));
        }
        if spec.grid.is_empty() {
            println!("    {}", dim("defaults only"));
        }
    }
    println!();
    println!("  {}", dim(&format!("{} model kinds", ModelKind::ALL.len())));
    println!();
    Ok(())
}
