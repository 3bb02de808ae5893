//! Export per-period results to CSV.
//!
//! One row per billing period, easy to consume in spreadsheets. Missing
//! observations are written as empty fields.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{ModelKind, PeriodResidual};
use crate::error::AppError;

/// Write per-period results to a CSV file.
pub fn write_results_csv(path: &Path, model: ModelKind, residuals: &[PeriodResidual]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_results(&mut out, model, residuals)?;
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV: {e}")))
}

fn write_results<W: Write>(out: &mut W, model: ModelKind, residuals: &[PeriodResidual]) -> Result<(), AppError> {
    writeln!(out, "period,n_days,mean_temp,observed_avg,fitted_avg,residual,weight,model")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    let model = format!("{model:?}").to_lowercase();
    for r in residuals {
        writeln!(
            out,
            "{},{},{:.4},{},{:.6},{},{:.6},{}",
            r.index,
            r.n_days,
            r.mean_temp,
            r.observed_avg.map(|v| format!("{v:.6}")).unwrap_or_default(),
            r.fitted_avg,
            r.residual.map(|v| format!("{v:.6}")).unwrap_or_default(),
            r.weight,
            model,
        )
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_leave_missing_values_empty() {
        let rows = vec![
            PeriodResidual {
                index: 0,
                n_days: 30,
                mean_temp: 50.0,
                observed_avg: Some(41.0),
                fitted_avg: 40.0,
                residual: Some(1.0),
                weight: 1.0,
            },
            PeriodResidual {
                index: 1,
                n_days: 31,
                mean_temp: 70.0,
                observed_avg: None,
                fitted_avg: 10.0,
                residual: None,
                weight: 0.5,
            },
        ];

        let mut buf = Vec::new();
        write_results(&mut buf, ModelKind::Heating, &rows).unwrap();
        let txt = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = txt.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("period,n_days"));
        assert_eq!(lines[1], "0,30,50.0000,41.000000,40.000000,1.000000,1.000000,heating");
        assert_eq!(lines[2], "1,31,70.0000,,10.000000,,0.500000,heating");
    }
}
