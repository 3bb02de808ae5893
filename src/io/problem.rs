//! Read problem JSON files and read/write fit JSON files.
//!
//! A problem file describes one fit: the model shape, the billing periods
//! (daily temperatures, observed average daily usage, optional weight), the
//! parameter bounds and an optional initial guess. The schema is
//! `domain::FitProblem`.
//!
//! A fit file is the portable result of a fit (`domain::FitFile`); `predict`
//! and `savings` reuse it without refitting.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::domain::{FitFile, FitProblem};
use crate::error::AppError;

/// Read and structurally check a problem JSON file.
///
/// Numeric validation (bounds, lengths, weights) happens in the fitter.
pub fn read_problem_json(path: &Path) -> Result<FitProblem, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open problem JSON '{}': {e}", path.display())))?;
    let problem: FitProblem = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid problem JSON '{}': {e}", path.display())))?;

    if problem.periods.is_empty() {
        return Err(AppError::new(2, format!("Problem JSON '{}' has no periods.", path.display())));
    }
    Ok(problem)
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit: &FitFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, fit).map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}

/// Read a fit JSON file, checking the parameter count against its model.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit: FitFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))?;

    if fit.params.len() != fit.model.param_len() {
        return Err(AppError::new(
            2,
            format!(
                "Fit JSON lists {} parameters but {} expects {}.",
                fit.params.len(),
                fit.model.display_name(),
                fit.model.param_len()
            ),
        ));
    }
    Ok(fit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Accelerator, FitQuality, ModelKind, NamedParam};

    fn scratch_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ddfit-{}-{name}", std::process::id()))
    }

    #[test]
    fn fit_json_survives_a_write_read_cycle() {
        let fit = FitFile {
            tool: "ddfit".to_string(),
            model: ModelKind::Heating,
            display_name: ModelKind::Heating.display_name().to_string(),
            params: vec![
                NamedParam { name: "reference_temperature".into(), value: 65.0 },
                NamedParam { name: "base_load".into(), value: 10.0 },
                NamedParam { name: "heating_slope".into(), value: 2.0 },
            ],
            bounds: vec![(55.0, 75.0), (0.0, 50.0), (0.0, 10.0)],
            accelerator: Accelerator::grid(),
            quality: FitQuality {
                sse: 0.5,
                rmse: 0.25,
                n: 8,
                iterations: 12,
                termination: "Terminated(SolverConverged)".into(),
                converged: true,
            },
        };

        let path = scratch_path("fit.json");
        write_fit_json(&path, &fit).unwrap();
        let back = read_fit_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back.model, ModelKind::Heating);
        assert_eq!(back.param_vector(), vec![65.0, 10.0, 2.0]);
        assert_eq!(back.accelerator, Accelerator::grid());
        assert_eq!(back.bounds[0], (55.0, 75.0));
    }

    #[test]
    fn fit_json_with_wrong_parameter_count_is_rejected() {
        let path = scratch_path("short-fit.json");
        std::fs::write(
            &path,
            r#"{"tool":"ddfit","model":"dual","display_name":"x",
                "params":[{"name":"ts_low","value":1.0}],
                "bounds":[[0,1]],"accelerator":{"kind":"off"},
                "quality":{"sse":0,"rmse":0,"n":1,"iterations":0,"termination":"","converged":false}}"#,
        )
        .unwrap();
        let err = read_fit_json(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn problem_without_periods_is_rejected() {
        let path = scratch_path("empty-problem.json");
        std::fs::write(&path, r#"{"periods": [], "bounds": [[55, 75], [0, 50], [0, 10]]}"#).unwrap();
        let err = read_problem_json(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert_eq!(err.exit_code(), 2);

        assert_eq!(read_problem_json(&scratch_path("missing.json")).unwrap_err().exit_code(), 2);
    }
}
