//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - loads the flux profile
//! - runs a single trial or a noise sweep
//! - prints reports/plots (or JSON)

use std::path::{Path, PathBuf};

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{Command, FisherArgs, SimulationArgs, SweepArgs};
use crate::data::FluxProfile;
use crate::domain::{DEFAULT_FLUX_FILE, Instrument, SimulationConfig};
use crate::error::AppError;
use crate::fisher::{DEFAULT_ANGLE_STEP, all_ellipses};
use crate::fit::FitOptions;
use crate::logging::{LogConfig, init_logging};
use crate::plot::TrendSeries;

pub mod pipeline;
pub mod sweep;

/// Environment variable naming the flux profile when `--flux-file` is absent.
pub const FLUX_FILE_ENV: &str = "RFI_FLUX_FILE";

/// Entry point for the `rfi` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` is optional; a missing file is not an error.
    let _ = dotenvy::dotenv();

    // We want `rfi` and `rfi -s easy` to behave like `rfi fisher ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    init_logging(&LogConfig {
        level: cli.log_level,
        format: cli.log_format,
        filter: None,
    });

    match cli.command {
        Command::Fisher(args) => handle_fisher(args),
        Command::Sweep(args) => handle_sweep(args),
        Command::Samples => {
            print!("{}", crate::report::format_samples());
            Ok(())
        }
    }
}

fn handle_fisher(args: FisherArgs) -> Result<(), AppError> {
    let mut config = simulation_config_from_args(&args.sim)?;
    config.noise_constant = args.noise_constant;
    let fit_options = fit_options_from_args(&args.sim);
    let flux = FluxProfile::load(&config.flux_file)?;

    let seed = config.seed.unwrap_or_else(rand::random);
    config.seed = Some(seed);
    info!(sample = ?args.sim.sample, seed, "starting trial");
    let mut rng = StdRng::seed_from_u64(seed);

    let trial = pipeline::run_trial(args.sim.sample, &config, &fit_options, &flux, &mut rng)?;

    let ellipses = if args.ellipses {
        all_ellipses(&trial.information, &trial.fitted_values(), args.k, DEFAULT_ANGLE_STEP)?
    } else {
        Vec::new()
    };

    if args.sim.json {
        #[derive(Serialize)]
        struct FisherOutput<'a> {
            trial: &'a pipeline::TrialResult,
            ellipses: Vec<&'a crate::fisher::ConfidenceEllipse>,
        }
        let output = FisherOutput {
            trial: &trial,
            ellipses: ellipses.iter().filter_map(|e| e.as_ref().ok()).collect(),
        };
        return print_json(&output);
    }

    print!("{}", crate::report::format_trial(&trial));
    for ellipse in &ellipses {
        println!();
        match ellipse {
            Ok(e) => print!("{}", crate::plot::render_ellipse(e, args.width, args.height)),
            Err(err) => println!("Ellipse skipped: {err}"),
        }
    }
    Ok(())
}

fn handle_sweep(args: SweepArgs) -> Result<(), AppError> {
    let config = simulation_config_from_args(&args.sim)?;
    let fit_options = fit_options_from_args(&args.sim);
    let flux = FluxProfile::load(&config.flux_file)?;
    let sweep_config = sweep::SweepConfig {
        log10_start: args.from,
        log10_stop: args.to,
        log10_step: args.step,
    };

    let result = sweep::run_sweep(args.sim.sample, &config, &sweep_config, &fit_options, &flux)?;

    if args.sim.json {
        #[derive(Serialize)]
        struct SweepOutput<'a> {
            sweep: &'a sweep::SweepResult,
            series: Vec<sweep::ErrorSeries>,
        }
        return print_json(&SweepOutput {
            sweep: &result,
            series: result.error_series(),
        });
    }

    print!("{}", crate::report::format_sweep(&result));
    if args.plot {
        for series in result.error_series() {
            let trends = [
                TrendSeries {
                    label: "fit error".to_string(),
                    symbol: 'f',
                    points: zip_present(&series.noise_constants, &series.fit_errors),
                },
                TrendSeries {
                    label: "Fisher error".to_string(),
                    symbol: 'F',
                    points: zip_present(&series.noise_constants, &series.fisher_errors),
                },
            ];
            println!("\n{} vs noise constant:", series.name);
            print!("{}", crate::plot::render_trends(&trends, args.width, args.height));
        }
    }
    Ok(())
}

fn zip_present(x: &[f64], y: &[Option<f64>]) -> Vec<(f64, f64)> {
    x.iter()
        .zip(y)
        .filter_map(|(&x, y)| y.map(|y| (x, y)))
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::new(4, format!("Failed to serialize report: {e}")))?;
    println!("{json}");
    Ok(())
}

pub fn simulation_config_from_args(args: &SimulationArgs) -> Result<SimulationConfig, AppError> {
    if args.points < 2 {
        return Err(AppError::new(2, "--points must be at least 2."));
    }
    if !(args.dq.is_finite() && args.dq >= 0.0) {
        return Err(AppError::new(2, "--dq must be finite and >= 0."));
    }
    Ok(SimulationConfig {
        points: args.points,
        q_min: args.q_min,
        q_max: args.q_max,
        instrument: Instrument {
            scale: 1.0,
            background: args.bkg,
            dq_percent: args.dq,
        },
        background_rate: args.bkg_rate,
        flux_file: resolve_flux_file(args.flux_file.as_deref()),
        seed: args.seed,
        ..SimulationConfig::default()
    })
}

pub fn fit_options_from_args(args: &SimulationArgs) -> FitOptions {
    FitOptions {
        max_iterations: args.max_iterations,
        scan_points: args.scan_points,
        ..FitOptions::default()
    }
}

/// `--flux-file`, then `$RFI_FLUX_FILE`, then the bundled profile.
///
/// The bundled profile is looked up relative to the working directory first and
/// falls back to the crate directory, so `rfi` also works outside the checkout.
fn resolve_flux_file(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(FLUX_FILE_ENV) {
        if !path.trim().is_empty() {
            debug!(path = %path, "flux file from environment");
            return PathBuf::from(path);
        }
    }
    let local = PathBuf::from(DEFAULT_FLUX_FILE);
    if local.exists() {
        return local;
    }
    Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_FLUX_FILE)
}

/// Rewrite argv so `rfi` defaults to `rfi fisher`.
///
/// Rules:
/// - `rfi`                      -> `rfi fisher`
/// - `rfi -s easy ...`          -> `rfi fisher -s easy ...`
/// - `rfi --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("fisher".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fisher" | "sweep" | "samples");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "fisher flags".
    if arg1.starts_with('-') {
        argv.insert(1, "fisher".to_string());
        return argv;
    }

    argv
}
