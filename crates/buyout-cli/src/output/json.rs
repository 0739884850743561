use serde_json::Value;
use std::io::{self, Write};

/// Pretty JSON with a trailing newline. Decimals arrive as strings, so
/// nothing is rounded on the way out.
pub fn write_json<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

pub fn print_json(value: &Value) {
    let mut stdout = io::stdout().lock();
    if let Err(e) = write_json(&mut stdout, value) {
        eprintln!("Failed to write JSON: {e}");
    }
}
