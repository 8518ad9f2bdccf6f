//! Direct-beam flux profile.
//!
//! The reference calibration file is a comma-delimited table with at least two
//! numeric columns: momentum transfer Q and beam intensity. Extra columns are
//! ignored, lines starting with `#` are comments.
//!
//! Any problem reading or parsing the file is reported as
//! [`ReflError::DataUnavailable`]; the noise simulator cannot run without it.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::ReflError;
use crate::math::interp;

/// Tabulated `(Q, intensity)` knots, sorted by Q.
#[derive(Debug, Clone)]
pub struct FluxProfile {
    knots: Vec<(f64, f64)>,
    source: PathBuf,
}

impl FluxProfile {
    /// Load a profile from a delimited text file.
    pub fn load(path: &Path) -> Result<Self, ReflError> {
        let unavailable = |reason: String| ReflError::DataUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| unavailable(format!("cannot open: {e}")))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut knots = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let line = idx + 1;
            let record = result.map_err(|e| unavailable(format!("record {line}: {e}")))?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            if record.len() < 2 {
                return Err(unavailable(format!(
                    "record {line}: expected at least 2 columns, found {}",
                    record.len()
                )));
            }
            let q = parse_field(&record[0]).map_err(|e| unavailable(format!("record {line}: {e}")))?;
            let intensity =
                parse_field(&record[1]).map_err(|e| unavailable(format!("record {line}: {e}")))?;
            knots.push((q, intensity));
        }

        Self::from_knots(knots)
            .map(|mut profile| {
                profile.source = path.to_path_buf();
                profile
            })
            .map_err(|e| unavailable(e.to_string()))
    }

    /// Build a profile from in-memory knots (unsorted input is accepted).
    pub fn from_knots(mut knots: Vec<(f64, f64)>) -> Result<Self, ReflError> {
        if knots.len() < 2 {
            return Err(ReflError::InvalidInput(format!(
                "Flux profile needs at least 2 points, got {}.",
                knots.len()
            )));
        }
        if let Some(&(q, i)) = knots
            .iter()
            .find(|(q, i)| !(q.is_finite() && i.is_finite() && *i >= 0.0))
        {
            return Err(ReflError::InvalidInput(format!(
                "Flux profile point (Q={q}, intensity={i}) must be finite with non-negative intensity."
            )));
        }
        knots.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self {
            knots,
            source: PathBuf::new(),
        })
    }

    /// Intensity at `q`, piecewise-linear between knots and flat beyond them.
    pub fn intensity(&self, q: f64) -> f64 {
        interp(&self.knots, q)
    }

    /// Intensity on every coordinate of `q`, multiplied by `scale`.
    pub fn scaled_on(&self, q: &[f64], scale: f64) -> Vec<f64> {
        q.iter().map(|&x| self.intensity(x) * scale).collect()
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

fn parse_field(raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|_| format!("'{raw}' is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("rfi_flux_{}_{name}", std::process::id()));
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn load_parses_two_columns_and_ignores_extras() {
        let path = temp_file("ok.dat", "# q,I,dI\n0.2, 4.0, 0.1\n0.1, 2.0, 0.1\n\n0.3,6.0,0.2\n");
        let profile = FluxProfile::load(&path).unwrap();
        assert_eq!(profile.len(), 3);
        assert!((profile.intensity(0.15) - 3.0).abs() < 1e-12);
        assert_eq!(profile.intensity(1.0), 6.0);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_data_unavailable() {
        let err = FluxProfile::load(Path::new("/definitely/not/here.dat")).unwrap_err();
        assert!(matches!(err, ReflError::DataUnavailable { .. }));
    }

    #[test]
    fn malformed_rows_are_data_unavailable() {
        let path = temp_file("bad.dat", "0.1,abc\n0.2,3.0\n");
        assert!(matches!(
            FluxProfile::load(&path),
            Err(ReflError::DataUnavailable { .. })
        ));
        std::fs::remove_file(path).ok();

        let path = temp_file("neg.dat", "0.1,1.0\n0.2,-3.0\n");
        assert!(matches!(
            FluxProfile::load(&path),
            Err(ReflError::DataUnavailable { .. })
        ));
        std::fs::remove_file(path).ok();

        let path = temp_file("short.dat", "0.1\n0.2\n");
        assert!(matches!(
            FluxProfile::load(&path),
            Err(ReflError::DataUnavailable { .. })
        ));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn shipped_profile_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(crate::domain::DEFAULT_FLUX_FILE);
        let profile = FluxProfile::load(&path).unwrap();
        assert!(profile.len() > 10);
        assert!(profile.intensity(0.05) > 0.0);
    }
}
