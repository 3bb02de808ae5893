//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` defaults and installs logging
//! - parses CLI arguments
//! - runs fits / predictions through `pipeline`
//! - prints reports/plots and writes optional exports

use std::io::IsTerminal;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, FitArgs, PredictArgs, SavingsArgs, SolveArgs};
use crate::domain::{Accelerator, FitConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `ddfit` binary.
pub fn run() -> Result<(), AppError> {
    // Environment defaults (DDFIT_GRID_SCALE, DDFIT_MAX_ITERS, RUST_LOG) may
    // come from a local `.env`; a missing file is fine.
    dotenvy::dotenv().ok();
    init_logging();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Predict(args) => handle_predict(args),
        Command::Savings(args) => handle_savings(args),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second initialization (e.g. from tests) is not an error worth reporting.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.stats, &run.model, &run.fit, run.guess_source.label())
    );
    println!("{}", crate::report::format_residuals(&run.residuals));

    if config.plot {
        let plot = crate::plot::render_ascii_plot(
            &run.residuals,
            run.fit.model,
            &run.fit.params,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, run.fit.model, &run.residuals)?;
    }
    if let Some(path) = &config.export_fit {
        crate::io::problem::write_fit_json(path, &run.fit.to_file(&run.model))?;
    }

    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let fit = crate::io::problem::read_fit_json(&args.fit)?;
    let problem = crate::io::problem::read_problem_json(&args.input)?;
    let residuals = pipeline::run_predict(&fit, &problem)?;

    println!("Model: {} | params: {}", fit.model.display_name(), fmt_params(&fit.param_vector()));
    println!("{}", crate::report::format_residuals(&residuals));

    if let Some(path) = &args.export {
        crate::io::export::write_results_csv(path, fit.model, &residuals)?;
    }
    Ok(())
}

fn handle_savings(args: SavingsArgs) -> Result<(), AppError> {
    let settings = solve_settings(&args.solve);
    let run = pipeline::run_savings(&args.baseline, &args.reporting, &settings)?;

    println!("Model: {}", run.model.display_name());
    println!(
        "Baseline fit : RMSE={:.6} params={}",
        run.baseline.quality.rmse,
        fmt_params(&run.baseline.params)
    );
    println!(
        "Reporting fit: RMSE={:.6} params={}",
        run.reporting.quality.rmse,
        fmt_params(&run.reporting.params)
    );
    println!();
    println!("{}", crate::report::format_savings(&run.report));
    Ok(())
}

/// Build the pipeline configuration for `ddfit fit`.
pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    let settings = solve_settings(&args.solve);
    FitConfig {
        input: args.input.clone(),
        model: settings.model,
        accelerator: settings.accelerator,
        max_iters: settings.max_iters,
        seed_steps: settings.seed_steps,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_results: args.export.clone(),
        export_fit: args.export_fit.clone(),
    }
}

fn solve_settings(args: &SolveArgs) -> pipeline::SolveSettings {
    pipeline::SolveSettings {
        model: args.model,
        accelerator: if args.accelerate {
            Accelerator::Grid { scale: args.grid_scale }
        } else {
            Accelerator::Off
        },
        max_iters: args.max_iters,
        seed_steps: args.seed_steps,
    }
}

fn fmt_params(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
