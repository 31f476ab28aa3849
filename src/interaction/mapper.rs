//! Canonical-name mapping for common retail spellings.

use crate::base::types::ShoppingItem;

/// Retail names mapped to the generic product names the factor search expects.
const ALIASES: &[(&str, &str)] = &[
    ("minced beef", "ground beef"),
    ("beef mince", "ground beef"),
    ("whole milk", "milk (cow)"),
    ("2% milk", "milk (cow)"),
    ("skim milk", "milk (cow)"),
];

/// Canonicalize one item name.
pub fn canonicalize(name: &str) -> String {
    let name = name.trim().to_lowercase();

    ALIASES.iter().find(|(key, _)| *key == name).map(|(_, canon)| canon.to_string()).unwrap_or(name)
}

/// Canonicalize every item name in place.
pub fn map_items(items: Vec<ShoppingItem>) -> Vec<ShoppingItem> {
    items
        .into_iter()
        .map(|mut item| {
            item.name = canonicalize(&item.name);
            item
        })
        .collect()
}
