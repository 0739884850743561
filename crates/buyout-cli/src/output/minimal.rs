use serde_json::Value;

use super::{result_of, scalar_text};

/// Key answer of each command, in lookup order.
const PRIORITY_KEYS: [&str; 5] = [
    "max_entry_multiple",
    "irr",
    "moic",
    "exit_equity",
    "base_case_value",
];

/// Print just the headline number: the fitted multiple for ability-to-pay,
/// IRR for a run, the base-case metric for a grid.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    if let Value::Object(map) = result {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key) {
                if !val.is_null() {
                    println!("{}", scalar_text(val, "null"));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, scalar_text(val, "null"));
            return;
        }
    }

    println!("{}", scalar_text(result, "null"));
}
