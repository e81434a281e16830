//! Common types used across aptflow

use serde_json::{Map, Value};

/// A structured, insertion-ordered record exchanged between callers, workers and the engine
pub type Record = Map<String, Value>;

/// Convert an arbitrary JSON value into a record. Non-object values are kept under `"value"`.
pub fn into_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        Value::Null => Record::new(),
        other => {
            let mut record = Record::new();
            record.insert("value".to_string(), other);
            record
        }
    }
}

/// Typed accessors over [`Record`]
pub trait RecordExt {
    fn str_field(&self, key: &str) -> Option<&str>;
    fn f64_field(&self, key: &str) -> Option<f64>;
    fn object_field(&self, key: &str) -> Option<&Record>;
    /// String members of an array field; non-string members are skipped
    fn string_list(&self, key: &str) -> Vec<String>;
    /// Numeric members of an array field; non-numeric members are skipped
    fn number_list(&self, key: &str) -> Vec<f64>;
}

impl RecordExt for Record {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn f64_field(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    fn object_field(&self, key: &str) -> Option<&Record> {
        self.get(key).and_then(Value::as_object)
    }

    fn string_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn number_list(&self, key: &str) -> Vec<f64> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_record_wraps_scalars() {
        assert!(into_record(Value::Null).is_empty());
        let record = into_record(json!(42));
        assert_eq!(record.get("value"), Some(&json!(42)));
    }

    #[test]
    fn test_record_accessors() {
        let record = into_record(json!({
            "name": "content",
            "score": 0.25,
            "tips": ["a", 1, "b"],
            "times": [1.5, "x", 3],
            "nested": {"k": true}
        }));

        assert_eq!(record.str_field("name"), Some("content"));
        assert_eq!(record.f64_field("score"), Some(0.25));
        assert_eq!(record.string_list("tips"), vec!["a", "b"]);
        assert_eq!(record.number_list("times"), vec![1.5, 3.0]);
        assert!(record.object_field("nested").is_some());
        assert!(record.string_list("missing").is_empty());
    }
}
