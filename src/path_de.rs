//! Schema documents, deserialized with the document path in error messages.
use std::path::Path;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::shape::{Schema, SchemaDocument};

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

/// Load a schema document; returns the schema and the root to register,
/// preferring `root_override` over the document's own root.
pub fn load_schema(path: &Path, root_override: Option<&str>) -> Result<(Schema, String)> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    let document = from_str_with_path::<SchemaDocument>(&source)
        .map_err(|error| anyhow::anyhow!("invalid schema file {}: {error}", path.display()))?;
    let (schema, root) = document.into_schema();
    let root = root_override.map(str::to_string).or(root)
        .with_context(|| format!("schema file {} declares no types", path.display()))?;
    Ok((schema, root))
}
