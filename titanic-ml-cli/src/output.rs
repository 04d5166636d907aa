//! Terminal rendering of reports.

use crossterm::{
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};
use std::io::{self, Write};

use titanic_ml::{BinaryMetrics, MetricsSummary};

/// Four decimals; NaN and infinities spelled out.
pub fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{:.4}", v)
    }
}

pub fn heading<W: Write>(w: &mut W, title: &str) -> io::Result<()> {
    queue!(
        w,
        Print("\n"),
        SetForegroundColor(Color::Cyan),
        SetAttribute(Attribute::Bold),
        Print(title),
        SetAttribute(Attribute::Reset),
        ResetColor,
        Print("\n"),
    )?;
    w.flush()
}

pub fn key_value<W: Write>(w: &mut W, key: &str, value: &str) -> io::Result<()> {
    queue!(
        w,
        SetForegroundColor(Color::DarkGrey),
        Print(format!("  {:<18}", key)),
        ResetColor,
        Print(value),
        Print("\n"),
    )?;
    w.flush()
}

/// Plain aligned table. The row at `highlight` is drawn in green.
pub fn table<W: Write>(
    w: &mut W,
    headers: &[&str],
    rows: &[Vec<String>],
    highlight: Option<usize>,
) -> io::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(j, (c, &wd))| if j == 0 { format!("{:<wd$}", c) } else { format!("{:>wd$}", c) })
            .collect();
        format!("  {}\n", padded.join("  "))
    };

    queue!(
        w,
        SetForegroundColor(Color::Cyan),
        Print(line(headers.to_vec())),
        ResetColor
    )?;
    for (i, row) in rows.iter().enumerate() {
        let text = line(row.iter().map(String::as_str).collect());
        if Some(i) == highlight {
            queue!(w, SetForegroundColor(Color::Green), Print(text), ResetColor)?;
        } else {
            queue!(w, Print(text))?;
        }
    }
    w.flush()
}

/// One row per metric, one column per labelled set of metrics.
pub fn metrics_table<W: Write>(w: &mut W, columns: &[(&str, &BinaryMetrics)]) -> io::Result<()> {
    let mut headers = vec!["metric"];
    headers.extend(columns.iter().map(|(label, _)| *label));
    let values: Vec<[f64; BinaryMetrics::FIELD_COUNT]> =
        columns.iter().map(|(_, m)| m.values()).collect();

    let rows: Vec<Vec<String>> = BinaryMetrics::FIELD_NAMES
        .iter()
        .enumerate()
        .map(|(k, name)| {
            let mut row = vec![name.to_string()];
            row.extend(values.iter().map(|v| fmt_value(v[k])));
            row
        })
        .collect();
    table(w, &headers, &rows, None)
}

pub fn summary_table<W: Write>(w: &mut W, summary: &MetricsSummary) -> io::Result<()> {
    let rows: Vec<Vec<String>> = summary
        .mean
        .iter()
        .zip(summary.std.values())
        .map(|((name, mean), std)| vec![name.to_string(), fmt_value(mean), fmt_value(std)])
        .collect();
    table(w, &["metric", "mean", "std"], &rows, None)
}

pub fn success<W: Write>(w: &mut W, message: &str) -> io::Result<()> {
    queue!(
        w,
        SetForegroundColor(Color::Green),
        Print(message),
        ResetColor,
        Print("\n")
    )?;
    w.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use titanic_ml::binary_metrics;

    fn render<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_fmt_value() {
        assert_eq!(fmt_value(0.5), "0.5000");
        assert_eq!(fmt_value(f64::NAN), "NaN");
        assert_eq!(fmt_value(f64::INFINITY), "inf");
    }

    #[test]
    fn test_metrics_table_lists_every_metric() {
        let m = binary_metrics(&[1.0, 0.0, 1.0, 1.0], &[1.0, 0.0, 0.0, 1.0]).unwrap();
        let out = render(|w| metrics_table(w, &[("fold 0", &m)]));
        for name in BinaryMetrics::FIELD_NAMES {
            assert!(out.contains(name), "missing {}", name);
        }
        assert!(out.contains("0.7500"));
        // no false positives, so the positive likelihood ratio is infinite
        assert!(out.contains("inf"));
    }

    #[test]
    fn test_table_alignment() {
        let rows = vec![
            vec!["a".to_string(), "1.0".to_string()],
            vec!["bbbb".to_string(), "22.5".to_string()],
        ];
        let out = render(|w| table(w, &["name", "value"], &rows, Some(1)));
        assert!(out.contains("  a       1.0\n"));
        assert!(out.contains("  bbbb   22.5\n"));
    }
}
