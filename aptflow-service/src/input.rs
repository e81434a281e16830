//! Command-line payload parsing
//!
//! Every payload argument is either inline JSON or `@<path>` naming a JSON file.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;

use aptflow_core::Record;

/// Read the raw JSON text behind an argument
fn source(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read payload file {path}"))
        }
        None => Ok(arg.to_string()),
    }
}

pub fn parse<T: DeserializeOwned>(arg: &str) -> Result<T> {
    let text = source(arg)?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON payload: {arg}"))
}

/// Payload that must be a JSON object; a missing argument is an empty record
pub fn record(arg: Option<&str>) -> Result<Record> {
    let Some(arg) = arg else {
        return Ok(Record::new());
    };
    match parse::<Value>(arg)? {
        Value::Object(map) => Ok(map),
        other => bail!("expected a JSON object, got {other}"),
    }
}

/// Comma-separated worker names, blanks dropped
pub fn names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_inline_and_missing_record() {
        let rec = record(Some(r#"{"text": "hi"}"#)).unwrap();
        assert_eq!(rec["text"], "hi");
        assert!(record(None).unwrap().is_empty());
        assert!(record(Some("[1, 2]")).is_err());
        assert!(record(Some("{not json")).is_err());
    }

    #[test]
    fn test_record_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"user_id": "u7"}}"#).unwrap();
        let arg = format!("@{}", file.path().display());
        assert_eq!(record(Some(&arg)).unwrap()["user_id"], "u7");
        assert!(record(Some("@/nonexistent/payload.json")).is_err());
    }

    #[test]
    fn test_names() {
        assert_eq!(names("content, monitoring,,"), vec!["content", "monitoring"]);
    }
}
