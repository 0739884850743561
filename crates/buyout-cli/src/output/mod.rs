pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` payload of a computation envelope, or the value itself.
pub(crate) fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Period rows of an LBO run, whether top-level or nested under `lbo`.
pub(crate) fn periods_of(result: &Value) -> Option<&Vec<Value>> {
    result
        .get("periods")
        .or_else(|| result.get("lbo").and_then(|l| l.get("periods")))
        .and_then(Value::as_array)
}

pub(crate) fn scalar_text(value: &Value, null: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => null.to_string(),
        Value::Array(arr) => arr
            .iter()
            .map(|v| scalar_text(v, null))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_of_unwraps_envelope() {
        let v = json!({"result": {"irr": "0.16"}, "warnings": []});
        assert_eq!(result_of(&v), &json!({"irr": "0.16"}));
        let bare = json!({"irr": "0.16"});
        assert_eq!(result_of(&bare), &bare);
    }

    #[test]
    fn test_periods_found_under_lbo() {
        let v = json!({"max_entry_multiple": "8.1", "lbo": {"periods": [{"year": 1}]}});
        assert_eq!(periods_of(&v).map(Vec::len), Some(1));
        assert!(periods_of(&json!({"irr": "0.1"})).is_none());
    }

    #[test]
    fn test_scalar_text_joins_arrays() {
        assert_eq!(scalar_text(&json!(["6.01", "50.0"]), "-"), "6.01, 50.0");
        assert_eq!(scalar_text(&Value::Null, "-"), "-");
    }
}
