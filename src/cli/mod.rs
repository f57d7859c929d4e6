//! Command-line parsing for the monthly RNPD curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{
    DEFAULT_GRID_END, DEFAULT_GRID_POINTS, DEFAULT_GRID_START, DEFAULT_GROUP_EPSILON,
    DEFAULT_LAMBDA_REG, DEFAULT_POLY_DEGREE, DEFAULT_WINDOW_CAPACITY, Month,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rnpd", version, about = "Monthly RNPD term-structure fitter and rank classifier")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit monthly curves from a CSV panel, print diagnostics, and optionally export them.
    Fit(FitArgs),
    /// Fit, then classify each month with the previous month's curves.
    Predict(PredictArgs),
    /// Run the full pipeline on a generated panel.
    Demo(DemoArgs),
    /// Classify one `(duration, rnpd)` pair against a saved curve JSON.
    Classify(ClassifyArgs),
}

/// Store and fitter settings shared by every fitting command.
#[derive(Debug, Args, Clone)]
pub struct FitterArgs {
    /// Polynomial degree of each group curve.
    #[arg(long, default_value_t = DEFAULT_POLY_DEGREE)]
    pub degree: usize,

    /// Minimum gap between adjacent group curves.
    #[arg(long, default_value_t = DEFAULT_GROUP_EPSILON)]
    pub epsilon: f64,

    /// L1 penalty on each group's coefficients.
    #[arg(long = "lambda-reg", default_value_t = DEFAULT_LAMBDA_REG)]
    pub lambda_reg: f64,

    /// Observations kept per (group, duration bucket) window.
    #[arg(long, default_value_t = DEFAULT_WINDOW_CAPACITY)]
    pub capacity: usize,

    /// Start of the duration grid the constraints are enforced on.
    #[arg(long, default_value_t = DEFAULT_GRID_START)]
    pub grid_start: f64,

    /// End of the duration grid.
    #[arg(long, default_value_t = DEFAULT_GRID_END)]
    pub grid_end: f64,

    /// Number of grid points.
    #[arg(long, default_value_t = DEFAULT_GRID_POINTS)]
    pub grid_points: usize,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Input CSV panel (one row per security and month).
    #[arg(short = 'f', long, value_name = "CSV")]
    pub file: PathBuf,

    #[command(flatten)]
    pub fitter: FitterArgs,

    /// Print each month's coefficient table.
    #[arg(long)]
    pub show_curves: bool,

    /// Export fitted curves (coefficients + grid) to JSON.
    #[arg(long = "export-curves", value_name = "JSON")]
    pub export_curves: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub fit: FitArgs,

    /// Export per-row predictions to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// First generated month.
    #[arg(long, default_value = "2020-01")]
    pub start: Month,

    /// Number of generated months.
    #[arg(long, default_value_t = 6)]
    pub months: usize,

    /// Rank groups `1..=N` are generated.
    #[arg(long, default_value_t = 6)]
    pub groups: u32,

    /// Securities per rank group.
    #[arg(long, default_value_t = 40)]
    pub securities: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Log-volatility of the observation noise.
    #[arg(long, default_value_t = 0.15)]
    pub noise: f64,

    #[command(flatten)]
    pub fitter: FitterArgs,

    /// Print each month's coefficient table.
    #[arg(long)]
    pub show_curves: bool,

    /// Export fitted curves to JSON.
    #[arg(long = "export-curves", value_name = "JSON")]
    pub export_curves: Option<PathBuf>,

    /// Export per-row predictions to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ClassifyArgs {
    /// Curve JSON produced by `--export-curves`.
    #[arg(long, value_name = "JSON")]
    pub curves: PathBuf,

    /// Month whose curves to use (defaults to the latest in the file).
    #[arg(long)]
    pub month: Option<Month>,

    /// Duration (years).
    #[arg(long)]
    pub duration: f64,

    /// Observed RNPD.
    #[arg(long)]
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fitter_flags_parse() {
        let cli = Cli::try_parse_from([
            "rnpd", "predict", "-f", "panel.csv", "--epsilon", "0.05", "--capacity", "10", "--export",
            "out.csv",
        ])
        .unwrap();
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.fit.fitter.epsilon, 0.05);
        assert_eq!(args.fit.fitter.capacity, 10);
        assert_eq!(args.fit.fitter.degree, DEFAULT_POLY_DEGREE);
        assert_eq!(args.export, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn demo_start_parses_as_month() {
        let cli = Cli::try_parse_from(["rnpd", "demo", "--start", "2019-11"]).unwrap();
        let Command::Demo(args) = cli.command else {
            panic!("expected demo");
        };
        assert_eq!(args.start, Month::new(2019, 11).unwrap());
    }
}
