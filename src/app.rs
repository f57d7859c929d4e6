//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - loads (or generates) the monthly panel
//! - runs ingest + fit + out-of-sample classification
//! - prints reports and writes optional exports

use std::path::Path;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{ClassifyArgs, Command, DemoArgs, FitArgs, FitterArgs, PredictArgs};
use crate::data::{SyntheticConfig, generate_panel};
use crate::domain::{FitterConfig, StoreConfig};
use crate::error::AppError;
use crate::io::IngestedPanel;

pub mod pipeline;

/// Entry point for the `rnpd` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is fine; it only supplies `RUST_LOG`.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Predict(args) => handle_predict(args),
        Command::Demo(args) => handle_demo(args),
        Command::Classify(args) => handle_classify(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so stdout stays clean for reports.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let panel = load(&args.file)?;
    let (store, fitter) = configs_from_args(&args.fitter);

    let mut registry = crate::registry::ModelRegistry::new(store, fitter.clone())?;
    let train = pipeline::train(&mut registry, &panel)?;

    println!("{}", crate::report::format_train_summary(&train, &fitter));
    if args.show_curves {
        for model in registry.models() {
            println!("{}", crate::report::format_model(model));
        }
    }
    if train.fitted() == 0 {
        return Err(AppError::new(4, "No month could be fitted."));
    }

    if let Some(path) = &args.export_curves {
        crate::io::write_curves_json(path, registry.models())?;
        info!(path = %path.display(), "curves exported");
    }
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let panel = load(&args.fit.file)?;
    let (store, fitter) = configs_from_args(&args.fit.fitter);
    let run = pipeline::run_panel(&panel, store, fitter.clone())?;

    print_run(&run, &fitter, args.fit.show_curves);
    export_run(&run, args.fit.export_curves.as_deref(), args.export.as_deref())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let synthetic = SyntheticConfig {
        start: args.start,
        months: args.months,
        groups: args.groups,
        securities_per_group: args.securities,
        seed: args.seed,
        noise: args.noise,
    };
    let panel = generate_panel(&synthetic)?;
    info!(rows = panel.rows.len(), months = panel.months().len(), "synthetic panel generated");

    let (store, fitter) = configs_from_args(&args.fitter);
    let run = pipeline::run_panel(&panel, store, fitter.clone())?;

    print_run(&run, &fitter, args.show_curves);
    export_run(&run, args.export_curves.as_deref(), args.export.as_deref())
}

fn handle_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let file = crate::io::read_curves_json(&args.curves)?;
    let curves = match args.month {
        Some(month) => file
            .month(month)
            .ok_or_else(|| AppError::new(4, format!("No curves for month {month} in '{}'.", args.curves.display())))?,
        None => file
            .latest()
            .ok_or_else(|| AppError::new(3, format!("Curve file '{}' holds no months.", args.curves.display())))?,
    };

    let model = curves.to_model();
    let group = crate::fit::classify(&model, args.duration, args.value)?;
    println!(
        "month={} duration={} rnpd={} -> rank_group={group}",
        model.month, args.duration, args.value
    );
    Ok(())
}

fn load(path: &Path) -> Result<IngestedPanel, AppError> {
    let panel = crate::io::load_panel(path)?;
    info!(
        rows = panel.rows.len(),
        rows_read = panel.rows_read,
        skipped = panel.row_errors.len(),
        "panel loaded"
    );
    for e in &panel.row_errors {
        debug!(line = e.line, id = e.id.as_deref().unwrap_or(""), "{}", e.message);
    }
    Ok(panel)
}

fn print_run(run: &pipeline::RunOutput, fitter: &FitterConfig, show_curves: bool) {
    println!("{}", crate::report::format_train_summary(&run.train, fitter));
    if show_curves {
        for model in run.registry.models() {
            println!("{}", crate::report::format_model(model));
        }
    }
    println!("{}", crate::report::format_prediction_summary(&run.predictions));
}

fn export_run(run: &pipeline::RunOutput, curves: Option<&Path>, predictions: Option<&Path>) -> Result<(), AppError> {
    if let Some(path) = curves {
        crate::io::write_curves_json(path, run.registry.models())?;
        info!(path = %path.display(), "curves exported");
    }
    if let Some(path) = predictions {
        crate::io::write_predictions_csv(path, &run.predictions.predictions)?;
        info!(path = %path.display(), rows = run.predictions.predictions.len(), "predictions exported");
    }
    Ok(())
}

pub fn configs_from_args(args: &FitterArgs) -> (StoreConfig, FitterConfig) {
    let store = StoreConfig::with_capacity(args.capacity);
    let fitter = FitterConfig {
        degree: args.degree,
        epsilon: args.epsilon,
        lambda_reg: args.lambda_reg,
        grid_start: args.grid_start,
        grid_end: args.grid_end,
        grid_points: args.grid_points,
    };
    (store, fitter)
}
