//! `deserialize_with` helpers reading JSON `null` back as NaN.
//!
//! serde_json writes NaN and ±inf as `null`, which a plain `f64` field
//! refuses. Infinities therefore return as NaN.

use serde::{Deserialize, Deserializer};

pub fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

pub fn floats<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let values = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}
