use super::StoreError;
use crate::model::category::{CategoryMeta, CategoryRegistry, parse_hex_color};

/// Register a category, or overwrite an existing one's metadata outright.
/// Returns the metadata it replaced, if any.
pub fn add_category(
    registry: &mut CategoryRegistry,
    name: &str,
    color: &str,
    icon: &str,
) -> Result<Option<CategoryMeta>, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::Validation("category name cannot be empty".into()));
    }
    let color = color.trim();
    if parse_hex_color(color).is_none() {
        return Err(StoreError::Validation(format!(
            "invalid color '{}' (expected #RRGGBB)",
            color
        )));
    }
    let meta = CategoryMeta::new(color.to_ascii_lowercase(), icon.trim());
    Ok(registry.insert(name, meta))
}
