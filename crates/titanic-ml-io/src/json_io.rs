use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::IoResult;

/// Save any serialisable value (a report, a fitted model) as pretty JSON.
///
/// Non-finite floats are written as `null`.
pub fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> IoResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path.as_ref(), json)?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> IoResult<T> {
    let json = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&json)?)
}
