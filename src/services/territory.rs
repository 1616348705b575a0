use std::collections::HashSet;

use crate::services::hierarchy::{Level, TerritoryPath};

/// Distinct names at `level`, in the order the paths list them. These are the
/// anchors every fact/target join hangs off.
pub fn level_names(paths: &[TerritoryPath], level: Level) -> Vec<String> {
    let mut seen = HashSet::new();
    paths
        .iter()
        .map(|path| path.name_at(level))
        .filter(|name| !name.trim().is_empty())
        .filter(|name| seen.insert(*name))
        .map(ToOwned::to_owned)
        .collect()
}

/// Anchor sets for all five levels. The region block always holds the
/// configured region, even when the scope leaves no paths behind.
pub fn anchor_sets(region: &str, paths: &[TerritoryPath]) -> [Vec<String>; 5] {
    Level::ALL.map(|level| match level {
        Level::Region => vec![region.to_string()],
        other => level_names(paths, other),
    })
}
