pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;
use tracing::debug;

/// The input document: the `--input` file when one is named, otherwise
/// whatever was piped on stdin. `None` when neither is present.
pub fn load<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        debug!(%path, "reading input file");
        return file::read_structured(path).map(Some);
    }
    match stdin::read_piped()? {
        Some(text) => {
            debug!(bytes = text.len(), "reading piped input");
            stdin::parse_piped(&text).map(Some)
        }
        None => Ok(None),
    }
}
