//! Formatted terminal output for trials and sweeps.
//!
//! We keep formatting code in one place so:
//! - the pipeline stays free of presentation
//! - output changes are localized (important for snapshot tests)

use crate::app::pipeline::{ParameterReport, TrialResult};
use crate::app::sweep::SweepResult;
use crate::domain::SampleKind;

/// Header, fit diagnostics and the per-parameter comparison table.
pub fn format_trial(trial: &TrialResult) -> String {
    let mut out = String::new();

    out.push_str("=== rfi - Fit vs Fisher uncertainty ===\n");
    out.push_str(&format!("Sample: {} ({:?})\n", trial.structure, trial.sample));
    out.push_str(&format!(
        "Noise constant: {:.3e} | points={} | seed={}\n",
        trial.noise_constant,
        trial.points,
        trial
            .seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "random".to_string()),
    ));
    out.push_str(&format!(
        "Fit: chi2={:.3} reduced={:.3} iterations={}\n",
        trial.chi2, trial.reduced_chi2, trial.iterations
    ));
    out.push('\n');

    if trial.parameters.is_empty() {
        out.push_str("No free parameters (structure has no interior layers).\n");
        return out;
    }

    out.push_str(&format_parameter_table(&trial.parameters));

    let notes: Vec<&ParameterReport> = trial.parameters.iter().filter(|p| p.note.is_some()).collect();
    if !notes.is_empty() {
        out.push_str("\nNotes:\n");
        for p in notes {
            out.push_str(&format!("- {}: {}\n", p.name, p.note.as_deref().unwrap_or("")));
        }
    }

    out
}

fn format_parameter_table(rows: &[ParameterReport]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<24} {:>10} {:>10} {:>10} {:>11} {:>11} {:>8}\n",
            "parameter", "true", "start", "fitted", "fit_err", "fisher_err", "ratio"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<24} {:-<10} {:-<10} {:-<10} {:-<11} {:-<11} {:-<8}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for p in rows {
        out.push_str(
            format!(
                "{:<24} {:>10.4} {:>10.4} {:>10.4} {:>11} {:>11} {:>8}\n",
                truncate(&p.name, 24),
                p.true_value,
                p.start,
                p.fitted,
                fmt_opt(p.fit_error, 11),
                fmt_opt(p.fisher_error, 11),
                p.ratio().map(|r| format!("{r:.3}")).unwrap_or_else(|| "-".to_string()),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// One row per noise level, then the per-parameter fit/Fisher trend tables.
pub fn format_sweep(sweep: &SweepResult) -> String {
    let mut out = String::new();

    out.push_str("=== rfi - Noise sweep ===\n");
    out.push_str(&format!(
        "Sample: {:?} | levels={} | failed={} | base seed={}\n\n",
        sweep.sample,
        sweep.levels.len(),
        sweep.failures(),
        sweep.base_seed
    ));

    out.push_str(format!("{:>12} {:>20} {:>12} {:<10}\n", "noise", "seed", "chi2", "status").trim_end());
    out.push('\n');
    for level in &sweep.levels {
        let (chi2, status) = match &level.outcome {
            Ok(t) => (format!("{:.3}", t.chi2), "ok".to_string()),
            Err(msg) => ("-".to_string(), format!("failed: {}", truncate(msg, 60))),
        };
        out.push_str(
            format!(
                "{:>12.3e} {:>20} {:>12} {:<10}\n",
                level.noise_constant, level.seed, chi2, status
            )
            .trim_end(),
        );
        out.push('\n');
    }

    for series in sweep.error_series() {
        out.push_str(&format!("\n{}:\n", series.name));
        out.push_str(format!("{:>12} {:>11} {:>11}\n", "noise", "fit_err", "fisher_err").trim_end());
        out.push('\n');
        for ((nc, fit), fisher) in series
            .noise_constants
            .iter()
            .zip(&series.fit_errors)
            .zip(&series.fisher_errors)
        {
            out.push_str(
                format!("{:>12.3e} {:>11} {:>11}\n", nc, fmt_opt(*fit, 11), fmt_opt(*fisher, 11)).trim_end(),
            );
            out.push('\n');
        }
    }

    out
}

/// The built-in structures, for `rfi samples`.
pub fn format_samples() -> String {
    let mut out = String::new();
    out.push_str(format!("{:<16} {:>6} {}\n", "sample", "layers", "description").trim_end());
    out.push('\n');
    for kind in SampleKind::ALL {
        let structure = kind.build();
        out.push_str(
            format!(
                "{:<16} {:>6} {}\n",
                sample_label(kind),
                structure.interior_count(),
                kind.description()
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// CLI spelling of a sample (`thin-layer-1`, …).
pub fn sample_label(kind: SampleKind) -> String {
    use clap::ValueEnum;
    kind.to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_else(|| format!("{kind:?}"))
}

fn fmt_opt(v: Option<f64>, width: usize) -> String {
    match v {
        Some(x) => format!("{x:>width$.3e}"),
        None => format!("{:>width$}", "undefined"),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::sweep::SweepLevel;
    use crate::domain::Bounds;
    use crate::fisher::fisher_information;
    use nalgebra::DMatrix;

    fn report(name: &str, fisher: Option<f64>) -> ParameterReport {
        ParameterReport {
            name: name.to_string(),
            true_value: 4.0,
            start: 6.0,
            bounds: Bounds::new(2.0, 6.0).unwrap(),
            fitted: 4.01,
            fit_error: Some(0.02),
            fisher_error: fisher,
            note: fisher.is_none().then(|| "degenerate".to_string()),
        }
    }

    fn trial(parameters: Vec<ParameterReport>) -> TrialResult {
        let m = parameters.len();
        let names = parameters.iter().map(|p| p.name.clone()).collect();
        TrialResult {
            sample: SampleKind::SingleLayer,
            structure: "single_layer".to_string(),
            noise_constant: 1e6,
            seed: Some(7),
            points: 300,
            chi2: 290.5,
            reduced_chi2: 0.98,
            iterations: 6,
            parameters,
            information: fisher_information(&DMatrix::zeros(1, m), &[1.0], &[1.0], names).unwrap(),
        }
    }

    #[test]
    fn trial_table_lists_every_parameter() {
        let txt = format_trial(&trial(vec![report("Layer 1 - sld", Some(0.01)), report("Layer 1 - thick", None)]));
        assert!(txt.contains("Noise constant: 1.000e6"));
        assert!(txt.contains("Layer 1 - sld"));
        assert!(txt.contains("0.500"), "ratio column: {txt}");
        assert!(txt.contains("undefined"));
        assert!(txt.contains("Notes:\n- Layer 1 - thick: degenerate"));
        assert!(txt.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn empty_trial_says_so() {
        let txt = format_trial(&trial(Vec::new()));
        assert!(txt.contains("No free parameters"));
    }

    #[test]
    fn sweep_table_marks_failures() {
        let sweep = SweepResult {
            sample: SampleKind::SingleLayer,
            base_seed: 1,
            levels: vec![
                SweepLevel {
                    noise_constant: 1e3,
                    seed: 11,
                    outcome: Err("Optimizer did not converge".to_string()),
                },
                SweepLevel {
                    noise_constant: 1e4,
                    seed: 12,
                    outcome: Ok(trial(vec![report("Layer 1 - sld", Some(0.01))])),
                },
            ],
        };
        let txt = format_sweep(&sweep);
        assert!(txt.contains("failed=1"));
        assert!(txt.contains("failed: Optimizer did not converge"));
        assert!(txt.contains("\nLayer 1 - sld:\n"));
    }

    #[test]
    fn samples_listing_uses_cli_names() {
        let txt = format_samples();
        assert!(txt.contains("thin-layer-1"));
        assert!(txt.contains("bare-substrate"));
        assert_eq!(txt.lines().count(), SampleKind::ALL.len() + 1);
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
