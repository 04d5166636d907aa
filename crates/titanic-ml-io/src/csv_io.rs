use std::path::Path;

use titanic_ml_core::Tensor;
use titanic_ml_metrics::BinaryMetrics;

use crate::error::{IoError, IoResult};

/// Read an all-numeric CSV into a `[rows, cols]` tensor and its headers.
/// Empty cells become NaN; any other non-numeric cell is an error.
pub fn read_csv<P: AsRef<Path>>(path: P) -> IoResult<(Tensor<f64>, Vec<String>)> {
    let mut rdr = csv::Reader::from_path(path.as_ref())?;
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut data = Vec::new();
    let mut n_rows = 0usize;
    for result in rdr.records() {
        let record = result?;
        for (j, field) in record.iter().enumerate() {
            let field = field.trim();
            let val = if field.is_empty() {
                f64::NAN
            } else {
                field.parse().map_err(|_| IoError::NotNumeric {
                    column: headers.get(j).cloned().unwrap_or_default(),
                    row: n_rows,
                    value: field.to_string(),
                })?
            };
            data.push(val);
        }
        n_rows += 1;
    }

    let tensor = Tensor::new(data, vec![n_rows, headers.len()])?;
    Ok((tensor, headers))
}

/// Write a 2-D tensor to CSV with optional headers.
pub fn write_csv<P: AsRef<Path>>(
    path: P,
    data: &Tensor<f64>,
    headers: Option<&[String]>,
) -> IoResult<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    if let Some(h) = headers {
        wtr.write_record(h)?;
    }

    let rows = data.nrows()?;
    for i in 0..rows {
        let row: Vec<String> = data.row_slice(i)?.iter().map(|v| v.to_string()).collect();
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row per trial: a `trial` index followed by every metric.
pub fn write_metrics_csv<P: AsRef<Path>>(path: P, trials: &[BinaryMetrics]) -> IoResult<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    let mut header = vec!["trial"];
    header.extend(BinaryMetrics::FIELD_NAMES);
    wtr.write_record(&header)?;

    for (i, m) in trials.iter().enumerate() {
        let mut row = vec![i.to_string()];
        row.extend(m.values().iter().map(|v| v.to_string()));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}
