pub mod enrich;
pub mod normalize;
pub mod render;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};

use warelift::{CategoryCatalog, CategoryConfig};

/// Loads the catalog from disk, or falls back to the built-in one.
pub fn load_catalog(path: Option<&Path>) -> Result<CategoryCatalog> {
    let catalog = match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read catalog: {}", path.display()))?;
            CategoryCatalog::from_json(&json)?
        }
        None => CategoryCatalog::builtin(),
    };
    ensure!(!catalog.categories.is_empty(), "catalog has no categories");
    Ok(catalog)
}

/// Category lookup that degrades to the default category for unknown ids.
pub fn config_for<'a>(catalog: &'a CategoryCatalog, id: &str) -> &'a CategoryConfig {
    catalog
        .get(id)
        .or_else(|| catalog.get(&catalog.default_category))
        .unwrap_or(&catalog.categories[0])
}
