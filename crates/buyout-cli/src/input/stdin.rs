use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Text piped on stdin. `None` when stdin is a terminal or carries only
/// whitespace.
pub fn read_piped() -> io::Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    if buffer.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(buffer))
}

/// Parse a piped document: a JSON object when the text opens with `{`,
/// YAML otherwise.
pub fn parse_piped<T: DeserializeOwned>(text: &str) -> Result<T, Box<dyn std::error::Error>> {
    let text = text.trim();
    let parsed = if text.starts_with('{') {
        serde_json::from_str(text).map_err(|e| format!("Failed to parse stdin as JSON: {e}"))?
    } else {
        serde_yaml::from_str(text).map_err(|e| format!("Failed to parse stdin as YAML: {e}"))?
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use buyout_core::lbo::LboAssumptions;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    const YAML_DEAL: &str = "
entry_ebitda: 100
entry_multiple: 10
leverage_turns: 6
interest_rate: 0.08
exit_multiple: 10
hold_years: 5
ebitda_growth: 0.05
capex_pct: 0.2
tax_rate: 0.25
";

    #[test]
    fn test_json_object_is_parsed_as_json() {
        let v: Value = parse_piped("  {\"target_irr\": \"0.2\"}\n").unwrap();
        assert_eq!(v, json!({"target_irr": "0.2"}));
    }

    #[test]
    fn test_yaml_deal_is_accepted() {
        let a: LboAssumptions = parse_piped(YAML_DEAL).unwrap();
        assert_eq!(a.hold_years, 5);
        assert_eq!(a.leverage_turns, Decimal::from(6));
        assert_eq!(a.interest_rate, Decimal::new(8, 2));
    }

    #[test]
    fn test_malformed_json_names_the_format() {
        let err = parse_piped::<Value>("{\"entry_ebitda\": ").unwrap_err();
        assert!(err.to_string().contains("as JSON"), "{err}");
    }
}
