//! Command-line parsing for the reflectometry uncertainty tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the simulation/fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::SampleKind;
use crate::logging::{LogFormat, LogLevel};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "rfi",
    version,
    about = "Compare fit and Fisher-information uncertainties for simulated reflectometry"
)]
pub struct Cli {
    /// Diagnostic verbosity (overridden by RUST_LOG).
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    pub log_level: LogLevel,

    /// Diagnostic output format (always written to stderr).
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Simulate, fit and compare uncertainties at one noise level.
    Fisher(FisherArgs),
    /// Repeat the trial over a logarithmic range of noise constants.
    Sweep(SweepArgs),
    /// List the built-in sample structures.
    Samples,
}

/// Simulation options shared by `fisher` and `sweep`.
#[derive(Debug, Args, Clone)]
pub struct SimulationArgs {
    /// Sample structure to simulate.
    #[arg(short = 's', long, value_enum, default_value_t = SampleKind::SingleLayer)]
    pub sample: SampleKind,

    /// Random seed (omit for a fresh random run).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Direct-beam flux profile (CSV: Q, intensity[, ...]). Defaults to
    /// $RFI_FLUX_FILE, then the bundled profile.
    #[arg(long, value_name = "FILE")]
    pub flux_file: Option<PathBuf>,

    /// Number of log-spaced Q points.
    #[arg(long, default_value_t = 300)]
    pub points: usize,

    /// Lowest Q (1/Å).
    #[arg(long, default_value_t = 0.005)]
    pub q_min: f64,

    /// Highest Q (1/Å).
    #[arg(long, default_value_t = 0.3)]
    pub q_max: f64,

    /// Resolution dQ/Q in percent (FWHM); 0 disables smearing.
    #[arg(long, default_value_t = 2.0)]
    pub dq: f64,

    /// Constant model background.
    #[arg(long, default_value_t = 1e-6)]
    pub bkg: f64,

    /// Mean rate of the random detector background in the noise simulation.
    #[arg(long, default_value_t = 5e-7)]
    pub bkg_rate: f64,

    /// Fitter iteration budget.
    #[arg(long, default_value_t = 200)]
    pub max_iterations: usize,

    /// Coordinate-scan grid size per parameter (0 disables the scan).
    #[arg(long, default_value_t = 201)]
    pub scan_points: usize,

    /// Print the report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

/// Options for a single trial.
#[derive(Debug, Args, Clone)]
pub struct FisherArgs {
    #[command(flatten)]
    pub sim: SimulationArgs,

    /// Noise constant (multiplies the flux; larger means less noise).
    #[arg(short = 'n', long, default_value_t = 5e5)]
    pub noise_constant: f64,

    /// Draw the joint confidence ellipse of every parameter pair.
    #[arg(long)]
    pub ellipses: bool,

    /// Confidence multiplier for the ellipses.
    #[arg(long, default_value_t = 2.0)]
    pub k: f64,

    /// Plot width (columns).
    #[arg(long, default_value_t = 60)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Options for a noise sweep.
#[derive(Debug, Args, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub sim: SimulationArgs,

    /// First log10 noise constant.
    #[arg(long, default_value_t = 3.0)]
    pub from: f64,

    /// log10 noise constant to stop before.
    #[arg(long, default_value_t = 6.0)]
    pub to: f64,

    /// log10 increment.
    #[arg(long, default_value_t = 0.25)]
    pub step: f64,

    /// Plot the error trends of each parameter (log-log).
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 60)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 16)]
    pub height: usize,
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
    fn fisher_defaults() {
        let cli = Cli::parse_from(["rfi", "fisher"]);
        let Command::Fisher(args) = cli.command else {
            panic!("expected fisher");
        };
        assert_eq!(args.sim.sample, SampleKind::SingleLayer);
        assert_eq!(args.sim.points, 300);
        assert_eq!(args.noise_constant, 5e5);
        assert!(!args.ellipses);
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn sweep_parses_range_and_sample() {
        let cli = Cli::parse_from([
            "rfi", "sweep", "-s", "thin-layer-1", "--from", "4", "--to", "5", "--seed", "9",
            "--log-level", "debug",
        ]);
        let Command::Sweep(args) = cli.command else {
            panic!("expected sweep");
        };
        assert_eq!(args.sim.sample, SampleKind::ThinLayer1);
        assert_eq!(args.from, 4.0);
        assert_eq!(args.to, 5.0);
        assert_eq!(args.sim.seed, Some(9));
        assert_eq!(cli.log_level, LogLevel::Debug);
    }
}
