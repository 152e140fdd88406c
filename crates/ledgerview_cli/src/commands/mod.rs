//! CLI command implementations.

pub mod networks;
pub mod sync;
pub mod view;

use ledgerview_protocol::Collection;
use std::path::Path;

/// Reads a JSON array of records from `path`.
pub fn load_collection(path: &Path, id_field: &str) -> Result<Collection, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let collection = Collection::from_json_array(&value, id_field)?;
    tracing::debug!(path = %path.display(), records = collection.len(), "collection file loaded");
    Ok(collection)
}
