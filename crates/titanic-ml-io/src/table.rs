use std::io::Read;
use std::path::Path;

use titanic_ml_core::Tensor;
use titanic_ml_preprocessing::OneHotEncoder;
use tracing::debug;

use crate::error::{IoError, IoResult};

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Empty cells are NaN.
    Numeric(Vec<f64>),
    /// Empty cells are empty strings.
    Categorical(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// A column-oriented CSV table. A column is numeric when every non-empty
/// cell parses as a number, categorical otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    pub fn from_path<P: AsRef<Path>>(path: P) -> IoResult<Self> {
        let reader = csv::Reader::from_path(path.as_ref())?;
        let table = Self::from_csv(reader)?;
        debug!(
            path = %path.as_ref().display(),
            rows = table.n_rows,
            columns = table.columns.len(),
            "table loaded"
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> IoResult<Self> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: Read>(mut rdr: csv::Reader<R>) -> IoResult<Self> {
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        let mut n_rows = 0;
        for record in rdr.records() {
            let record = record?;
            for (cells, field) in raw.iter_mut().zip(record.iter()) {
                cells.push(field.trim().to_string());
            }
            n_rows += 1;
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| {
                let parsed: Option<Vec<f64>> = cells
                    .iter()
                    .map(|c| if c.is_empty() { Some(f64::NAN) } else { c.parse().ok() })
                    .collect();
                let data = match parsed {
                    Some(values) => ColumnData::Numeric(values),
                    None => ColumnData::Categorical(cells),
                };
                Column { name, data }
            })
            .collect();
        Ok(Table { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    fn position(&self, name: &str) -> IoResult<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| IoError::MissingColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> IoResult<&Column> {
        Ok(&self.columns[self.position(name)?])
    }

    /// Values of a numeric column.
    pub fn numeric(&self, name: &str) -> IoResult<&[f64]> {
        match &self.column(name)?.data {
            ColumnData::Numeric(v) => Ok(v),
            ColumnData::Categorical(_) => Err(IoError::Categorical {
                column: name.to_string(),
            }),
        }
    }

    /// Remove the named columns. Every name must exist.
    pub fn drop_columns(&mut self, names: &[&str]) -> IoResult<()> {
        for name in names {
            self.position(name)?;
        }
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
        Ok(())
    }

    /// Replace a column by one indicator column per category, named
    /// `<column>_<category>`. Numeric columns are encoded by their printed
    /// value; missing cells encode as all zeros.
    pub fn one_hot(&mut self, name: &str) -> IoResult<()> {
        let pos = self.position(name)?;
        let values: Vec<String> = match &self.columns[pos].data {
            ColumnData::Categorical(v) => v.clone(),
            ColumnData::Numeric(v) => v
                .iter()
                .map(|x| if x.is_nan() { String::new() } else { x.to_string() })
                .collect(),
        };

        let mut encoder = OneHotEncoder::new();
        let encoded: Tensor<f64> = encoder.fit_transform(&values)?;
        let indicators: Vec<Column> = encoder
            .feature_names(name)
            .into_iter()
            .enumerate()
            .map(|(k, col_name)| {
                Ok(Column {
                    name: col_name,
                    data: ColumnData::Numeric(encoded.col(k)?.into_data()),
                })
            })
            .collect::<IoResult<_>>()?;

        debug!(column = name, categories = indicators.len(), "one-hot encoded");
        self.columns.splice(pos..=pos, indicators);
        Ok(())
    }

    /// Fill missing cells of a numeric column with its median and insert a
    /// `<column>Imputed` indicator right after it. Returns the median.
    pub fn impute_median(&mut self, name: &str) -> IoResult<f64> {
        let pos = self.position(name)?;
        let ColumnData::Numeric(values) = &mut self.columns[pos].data else {
            return Err(IoError::Categorical {
                column: name.to_string(),
            });
        };

        let mut present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        present.sort_by(f64::total_cmp);
        let median = match present.len() {
            0 => f64::NAN,
            n if n % 2 == 1 => present[n / 2],
            n => (present[n / 2 - 1] + present[n / 2]) / 2.0,
        };

        let mut imputed = Vec::with_capacity(values.len());
        for v in values.iter_mut() {
            if v.is_nan() {
                *v = median;
                imputed.push(1.0);
            } else {
                imputed.push(0.0);
            }
        }
        debug!(column = name, median, filled = imputed.iter().sum::<f64>(), "imputed median");

        self.columns.insert(
            pos + 1,
            Column {
                name: format!("{}Imputed", name),
                data: ColumnData::Numeric(imputed),
            },
        );
        Ok(median)
    }

    /// Split into a feature matrix (every column except `label`, in table
    /// order), the label vector and the feature names. All feature columns
    /// must be numeric without missing values.
    pub fn to_features_and_label(
        &self,
        label: &str,
    ) -> IoResult<(Tensor<f64>, Tensor<f64>, Vec<String>)> {
        let y = Tensor::from_slice(self.numeric(label)?);
        let features: Vec<&Column> = self.columns.iter().filter(|c| c.name != label).collect();

        let mut columns = Vec::with_capacity(features.len());
        for col in &features {
            let values = self.numeric(&col.name)?;
            let missing = values.iter().filter(|v| v.is_nan()).count();
            if missing > 0 {
                return Err(IoError::MissingValues {
                    column: col.name.clone(),
                    count: missing,
                });
            }
            columns.push(values);
        }

        let p = columns.len();
        let mut data = Vec::with_capacity(self.n_rows * p);
        for i in 0..self.n_rows {
            data.extend(columns.iter().map(|c| c[i]));
        }
        let x = Tensor::new(data, vec![self.n_rows, p])?;
        let names = features.iter().map(|c| c.name.clone()).collect();
        Ok((x, y, names))
    }
}
