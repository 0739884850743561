use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{result_of, scalar_text};

/// Render a command result as tables: a field/value summary, one table per
/// list of records (the period schedule), and the matrix for grids.
pub fn print_table(value: &Value) {
    let result = result_of(value);

    match result {
        Value::Object(map) if map.contains_key("matrix") => print_grid(map),
        Value::Object(map) => {
            let mut rows = Vec::new();
            let mut record_lists = Vec::new();
            flatten(map, "", &mut rows, &mut record_lists);

            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            for (key, val) in rows {
                builder.push_record([key, val]);
            }
            println!("{}", Table::from(builder));

            for (name, records) in record_lists {
                println!("\n{name}:");
                print_records(records);
            }
        }
        Value::Array(arr) => print_records(arr),
        other => println!("{}", other),
    }

    if let Some(envelope) = value.as_object() {
        print_envelope_notes(envelope);
    }
}

/// Scalars and small arrays become dotted rows; arrays of objects are
/// collected for their own table.
fn flatten<'a>(
    map: &'a Map<String, Value>,
    prefix: &str,
    rows: &mut Vec<(String, String)>,
    record_lists: &mut Vec<(String, &'a Vec<Value>)>,
) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) => flatten(inner, &name, rows, record_lists),
            Value::Array(arr) if arr.first().is_some_and(Value::is_object) => {
                record_lists.push((name, arr));
            }
            other => rows.push((name, scalar_text(other, "-"))),
        }
    }
}

fn print_records(arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            println!("{}", scalar_text(item, "-"));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h).map(|v| scalar_text(v, "-")).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}

/// Row driver values down the side, column driver values across the top.
fn print_grid(map: &Map<String, Value>) {
    let label = |key: &str| map.get(key).map(|v| scalar_text(v, "")).unwrap_or_default();
    let empty = Vec::new();
    let column_values = map
        .get("column_values")
        .and_then(Value::as_array)
        .unwrap_or(&empty);
    let row_values = map
        .get("row_values")
        .and_then(Value::as_array)
        .unwrap_or(&empty);
    let matrix = map.get("matrix").and_then(Value::as_array).unwrap_or(&empty);

    let mut header = vec![format!(
        "{} \\ {}",
        label("row_driver"),
        label("column_driver")
    )];
    header.extend(column_values.iter().map(|v| scalar_text(v, "-")));

    let mut builder = Builder::default();
    builder.push_record(header);
    for (row_value, cells) in row_values.iter().zip(matrix) {
        let mut row = vec![scalar_text(row_value, "-")];
        if let Value::Array(cells) = cells {
            row.extend(cells.iter().map(|c| scalar_text(c, "n/a")));
        }
        builder.push_record(row);
    }
    println!("{}:\n{}", label("metric"), Table::from(builder));

    if let Some(base) = map.get("base_case_value") {
        println!("\nBase case: {}", scalar_text(base, "n/a"));
    }
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_separates_period_records() {
        let v = json!({
            "irr": "0.1664",
            "capital_structure": {"initial_debt": "600"},
            "periods": [{"year": 1}, {"year": 2}],
            "bracket": ["6.01", "50.0"]
        });
        let mut rows = Vec::new();
        let mut lists = Vec::new();
        flatten(v.as_object().unwrap(), "", &mut rows, &mut lists);

        assert!(rows.contains(&("capital_structure.initial_debt".to_string(), "600".to_string())));
        assert!(rows.contains(&("bracket".to_string(), "6.01, 50.0".to_string())));
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].0, "periods");
        assert_eq!(lists[0].1.len(), 2);
    }
}
