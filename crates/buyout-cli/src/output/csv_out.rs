use serde_json::{Map, Value};
use std::io;

use super::{periods_of, result_of, scalar_text};

type StdoutCsv<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Grids are written as a matrix, LBO runs as one row per projection year,
/// anything else as field/value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = result_of(value);
    let periods = periods_of(result);
    match (result, periods) {
        (Value::Object(map), _) if map.contains_key("matrix") => write_grid(&mut wtr, map),
        (_, Some(periods)) => write_records(&mut wtr, periods),
        (Value::Object(map), None) => {
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in map {
                let _ = wtr.write_record([key.as_str(), &scalar_text(val, "")]);
            }
        }
        (Value::Array(arr), None) => write_records(&mut wtr, arr),
        (other, None) => {
            let _ = wtr.write_record([&scalar_text(other, "")]);
        }
    }

    let _ = wtr.flush();
}

fn write_records(wtr: &mut StdoutCsv<'_>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([&scalar_text(item, "")]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let _ = wtr.write_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(|v| scalar_text(v, "")).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

fn write_grid(wtr: &mut StdoutCsv<'_>, map: &Map<String, Value>) {
    let empty = Vec::new();
    let array = |key: &str| map.get(key).and_then(Value::as_array).unwrap_or(&empty);

    let corner = map
        .get("row_driver")
        .map(|v| scalar_text(v, ""))
        .unwrap_or_default();
    let mut header = vec![corner];
    header.extend(array("column_values").iter().map(|v| scalar_text(v, "")));
    let _ = wtr.write_record(&header);

    for (row_value, cells) in array("row_values").iter().zip(array("matrix")) {
        let mut row = vec![scalar_text(row_value, "")];
        if let Value::Array(cells) = cells {
            row.extend(cells.iter().map(|c| scalar_text(c, "")));
        }
        let _ = wtr.write_record(&row);
    }
}
