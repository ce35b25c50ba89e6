use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Color used for categories with no registry entry.
pub const FALLBACK_COLOR: &str = "#888888";

/// Display metadata for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMeta {
    /// `#RRGGBB`
    pub color: String,
    /// Short glyph shown before the name; empty when unset
    #[serde(default)]
    pub icon: String,
}

impl CategoryMeta {
    pub fn new(color: impl Into<String>, icon: impl Into<String>) -> Self {
        CategoryMeta {
            color: color.into(),
            icon: icon.into(),
        }
    }

    fn fallback() -> Self {
        CategoryMeta::new(FALLBACK_COLOR, "")
    }
}

/// Category name → metadata, in insertion order.
///
/// Entries are only ever added or overwritten; nothing removes one, so a
/// task's category reference never dangles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryRegistry {
    entries: IndexMap<String, CategoryMeta>,
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::seeded()
    }
}

impl CategoryRegistry {
    /// A registry with no entries at all.
    pub fn empty() -> Self {
        CategoryRegistry {
            entries: IndexMap::new(),
        }
    }

    /// The first-run registry: General, Work, Personal, Errands.
    pub fn seeded() -> Self {
        let mut reg = Self::empty();
        reg.insert("General", CategoryMeta::new("#888888", ""));
        reg.insert("Work", CategoryMeta::new("#007acc", "💼"));
        reg.insert("Personal", CategoryMeta::new("#e91e63", "🏠"));
        reg.insert("Errands", CategoryMeta::new("#4caf50", "🛒"));
        reg
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&CategoryMeta> {
        self.entries.get(name)
    }

    /// Metadata for `name`, or a neutral gray with no icon when the name is
    /// unknown. Tasks must stay renderable whatever the registry holds.
    pub fn resolve(&self, name: &str) -> CategoryMeta {
        self.get(name).cloned().unwrap_or_else(CategoryMeta::fallback)
    }

    /// Insert or overwrite. An existing entry keeps its position.
    /// Returns the previous metadata, if any.
    pub(crate) fn insert(&mut self, name: &str, meta: CategoryMeta) -> Option<CategoryMeta> {
        self.entries.insert(name.to_string(), meta)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryMeta)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse `#RRGGBB` into RGB components.
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_order_and_contents() {
        let reg = CategoryRegistry::seeded();
        let names: Vec<&str> = reg.names().collect();
        assert_eq!(names, vec!["General", "Work", "Personal", "Errands"]);
        assert_eq!(reg.get("Work").unwrap().color, "#007acc");
        assert_eq!(reg.get("Errands").unwrap().icon, "🛒");
    }

    #[test]
    fn resolve_unknown_falls_back_to_gray() {
        let reg = CategoryRegistry::seeded();
        let meta = reg.resolve("Garden");
        assert_eq!(meta.color, FALLBACK_COLOR);
        assert_eq!(meta.icon, "");
        assert_eq!(reg.resolve("Work").icon, "💼");
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut reg = CategoryRegistry::seeded();
        let prev = reg.insert("Work", CategoryMeta::new("#000000", "🔧"));
        assert_eq!(prev.unwrap().color, "#007acc");
        assert_eq!(reg.names().nth(1), Some("Work"));
        assert_eq!(reg.get("Work").unwrap().icon, "🔧");
        assert_eq!(reg.len(), 4);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF4444"), Some((0xFF, 0x44, 0x44)));
        assert_eq!(parse_hex_color("#0c001b"), Some((0x0C, 0x00, 0x1B)));
        assert_eq!(parse_hex_color("FF4444"), None); // missing #
        assert_eq!(parse_hex_color("#888"), None); // shorthand not accepted
        assert_eq!(parse_hex_color("#ZZZZZZ"), None);
        assert_eq!(parse_hex_color("#ééé"), None);
    }

    #[test]
    fn serializes_as_plain_object() {
        let json = serde_json::to_value(CategoryRegistry::seeded()).unwrap();
        assert_eq!(json["Personal"]["color"], "#e91e63");
        assert_eq!(json["General"]["icon"], "");
        let back: CategoryRegistry = serde_json::from_value(json).unwrap();
        assert_eq!(back, CategoryRegistry::seeded());
    }
}
