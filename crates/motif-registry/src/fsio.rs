//! Whole-file JSON persistence.
//!
//! Reads degrade: a missing file is `None`, an unreadable one is logged and
//! also `None`. Writes propagate errors.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::RegistryError;

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read registry file, treating as empty");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot parse registry file, treating as empty");
            None
        }
    }
}

/// Pretty-print `value` to a sibling temp file, then rename over `path`.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RegistryError> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json.as_bytes())?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Append one JSON document per line.
pub(crate) fn append_jsonl<'a, T, I>(path: &Path, items: I) -> Result<usize, RegistryError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut buf = String::new();
    let mut n = 0;
    for item in items {
        buf.push_str(&serde_json::to_string(item)?);
        buf.push('\n');
        n += 1;
    }
    if n == 0 {
        return Ok(0);
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(buf.as_bytes())?;
    Ok(n)
}
