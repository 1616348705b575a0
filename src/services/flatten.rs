use std::collections::HashMap;

use serde::Serialize;

use crate::services::{
    hierarchy::{Level, TerritoryPath},
    metric_family::MetricFamily,
    metrics::MetricInputs,
    rollup::{build_row, LevelRollup, RollupRow},
};

/// Header row in front of `level`'s block, if the level has one.
pub fn level_header(level: Level, family: &MetricFamily) -> Option<RollupRow> {
    level
        .has_header()
        .then(|| RollupRow::header(level, family))
}

/// Concatenates the five level blocks in contract order. `levels` may arrive
/// in any order; blocks are placed by their level, never by position.
pub fn flatten_levels(family: &MetricFamily, levels: Vec<LevelRollup>) -> Vec<RollupRow> {
    let mut by_level = levels
        .into_iter()
        .map(|rollup| (rollup.level, rollup.rows))
        .collect::<HashMap<_, _>>();

    let mut flat = Vec::new();
    for level in Level::ALL {
        flat.extend(level_header(level, family));
        flat.extend(by_level.remove(&level).unwrap_or_default());
    }
    flat
}

/// Node of the tree-shaped report.
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub level: Level,
    #[serde(flatten)]
    pub metrics: RollupRow,
    pub children: Vec<TreeNode>,
    #[serde(skip)]
    totals: MetricInputs,
    #[serde(skip)]
    child_index: HashMap<String, usize>,
}

impl TreeNode {
    fn new(level: Level, metrics: RollupRow) -> Self {
        Self {
            level,
            metrics,
            children: Vec::new(),
            totals: MetricInputs::default(),
            child_index: HashMap::new(),
        }
    }

    /// Returns the child stored under `key`, creating it with `init` on first
    /// encounter only.
    fn upsert_child(&mut self, key: &str, init: impl FnOnce() -> TreeNode) -> &mut TreeNode {
        let position = match self.child_index.get(key).copied() {
            Some(position) => position,
            None => {
                self.children.push(init());
                let position = self.children.len() - 1;
                self.child_index.insert(key.to_string(), position);
                position
            }
        };
        &mut self.children[position]
    }

    fn derive_metrics(&mut self, family: &MetricFamily) {
        self.metrics = build_row(&self.metrics.name, family, &self.totals);
        for child in &mut self.children {
            child.derive_metrics(family);
        }
    }
}

/// Nests region → branch → subbranch → cluster → kabupaten by walking the
/// hierarchy paths. The root keeps the region row; every other node sums the
/// kabupaten inputs beneath it, so a name repeated under two parents gets
/// each parent's share.
pub fn assemble_tree(
    region: &str,
    family: &MetricFamily,
    paths: &[TerritoryPath],
    levels: Vec<LevelRollup>,
) -> TreeNode {
    let mut region_row = None;
    let mut leaf_inputs = HashMap::new();
    for rollup in levels {
        match rollup.level {
            Level::Region => region_row = rollup.rows.into_iter().next(),
            Level::Kabupaten => leaf_inputs.extend(
                rollup
                    .rows
                    .iter()
                    .map(|row| row.name.to_ascii_uppercase())
                    .zip(rollup.inputs),
            ),
            _ => {}
        }
    }

    let blank = |level: Level, name: &str| {
        let mut row = RollupRow::header(level, family);
        row.name = name.to_string();
        row
    };

    let mut root = TreeNode::new(
        Level::Region,
        region_row.unwrap_or_else(|| blank(Level::Region, region)),
    );
    for path in paths {
        let inputs = leaf_inputs.get(&path.kabupaten.to_ascii_uppercase());
        let mut node = &mut root;
        for level in &Level::ALL[1..] {
            let name = path.name_at(*level);
            node = node.upsert_child(&name.to_ascii_uppercase(), || {
                TreeNode::new(*level, blank(*level, name))
            });
            if let Some(inputs) = inputs {
                node.totals.accumulate(inputs);
            }
        }
    }
    for child in &mut root.children {
        child.derive_metrics(family);
    }
    root
}

#[cfg(test)]
mod tests {
    use super::{assemble_tree, flatten_levels};
    use crate::services::{
        hierarchy::{Level, TerritoryPath},
        metric_family::find_family,
        metrics::MetricInputs,
        rollup::{build_row, LevelRollup},
    };

    fn block(level: Level, entries: &[(&str, f64)]) -> LevelRollup {
        let family = find_family("revenue").unwrap();
        let inputs = entries
            .iter()
            .map(|(_, actual)| MetricInputs {
                actual: Some(*actual),
                target: Some(100.0),
                elapsed_fraction: 1.0,
                ..MetricInputs::default()
            })
            .collect::<Vec<_>>();
        let rows = entries
            .iter()
            .zip(&inputs)
            .map(|((name, _), inputs)| build_row(name, family, inputs))
            .collect();
        LevelRollup { level, rows, inputs }
    }

    #[test]
    fn headers_sit_between_blocks_in_fixed_order() {
        let family = find_family("revenue").unwrap();
        // deliberately out of order, as if gathered by completion time
        let levels = vec![
            block(Level::Cluster, &[("CL_1", 1.0)]),
            block(Level::Kabupaten, &[("KAB_1", 1.0), ("KAB_2", 1.0)]),
            block(Level::Region, &[("R", 1.0)]),
            block(Level::Subbranch, &[("SB_1", 1.0)]),
            block(Level::Branch, &[("BRANCH_A", 1.0), ("BRANCH_B", 1.0)]),
        ];
        let names = flatten_levels(family, levels)
            .into_iter()
            .map(|row| row.name)
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            [
                "R", "BRANCH", "BRANCH_A", "BRANCH_B", "SUBBRANCH", "SB_1", "CLUSTER", "CL_1",
                "KABUPATEN", "KAB_1", "KAB_2"
            ]
        );
    }

    #[test]
    fn empty_levels_still_get_headers() {
        let family = find_family("revenue").unwrap();
        let flat = flatten_levels(family, vec![block(Level::Region, &[("R", 1.0)])]);
        let headers = flat.iter().filter(|row| row.is_header()).count();
        assert_eq!(flat.len(), 5);
        assert_eq!(headers, 4);
        assert_eq!(flat[0].name, "R");
    }

    #[test]
    fn tree_sums_kabupaten_into_each_parent() {
        let family = find_family("revenue").unwrap();
        let paths = vec![
            TerritoryPath::new("R", "BRANCH_A", "SB_1", "CL_1", "KAB_1"),
            TerritoryPath::new("R", "BRANCH_A", "SB_1", "CL_1", "KAB_2"),
            TerritoryPath::new("R", "BRANCH_A", "SB_2", "CL_2", "KAB_3"),
            TerritoryPath::new("R", "BRANCH_B", "SB_3", "CL_3", "KAB_4"),
        ];
        let levels = vec![
            block(Level::Region, &[("R", 1000.0)]),
            block(Level::Kabupaten, &[("KAB_1", 7.0), ("KAB_2", 8.0), ("KAB_3", 9.0)]),
        ];

        let tree = assemble_tree("R", family, &paths, levels);
        assert_eq!(tree.metrics.name, "R");
        assert_eq!(tree.metrics.actual, Some(1000.0));
        assert_eq!(tree.children.len(), 2);

        let branch_a = &tree.children[0];
        assert_eq!(branch_a.metrics.name, "BRANCH_A");
        assert_eq!(branch_a.metrics.actual, Some(24.0));
        assert_eq!(branch_a.metrics.target, Some(300.0));
        assert_eq!(branch_a.metrics.achievement_pct.value(), Some(8.0));
        assert_eq!(branch_a.children.len(), 2);

        let cluster = &branch_a.children[0].children[0];
        assert_eq!(cluster.level, Level::Cluster);
        assert_eq!(cluster.metrics.actual, Some(15.0));
        let kabupaten = cluster
            .children
            .iter()
            .map(|node| (node.metrics.name.as_str(), node.metrics.actual))
            .collect::<Vec<_>>();
        assert_eq!(kabupaten, [("KAB_1", Some(7.0)), ("KAB_2", Some(8.0))]);
        assert!(cluster.children.iter().all(|node| node.children.is_empty()));

        // KAB_4 has no rollup row: it and its ancestors stay blank
        let branch_b = &tree.children[1];
        assert_eq!(branch_b.metrics.actual, None);
        let kab_4 = &branch_b.children[0].children[0].children[0];
        assert_eq!(kab_4.metrics.name, "KAB_4");
        assert_eq!(kab_4.metrics.actual, None);
    }

    #[test]
    fn cluster_split_across_subbranches_gets_each_share() {
        let family = find_family("revenue").unwrap();
        // KAMPAR is regrouped into PEKANBARU OUTER, RIAU INNER stays shared
        let paths = vec![
            TerritoryPath::new("R", "PEKANBARU", "PEKANBARU", "RIAU INNER", "KOTA PEKANBARU"),
            TerritoryPath::new("R", "PEKANBARU", "PEKANBARU", "RIAU INNER", "KAMPAR"),
        ];
        let levels = vec![block(Level::Kabupaten, &[("KOTA PEKANBARU", 60.0), ("KAMPAR", 40.0)])];

        let tree = assemble_tree("R", family, &paths, levels);
        let subbranches = &tree.children[0].children;
        let clusters = subbranches
            .iter()
            .map(|node| {
                let cluster = &node.children[0];
                (
                    node.metrics.name.as_str(),
                    cluster.metrics.name.as_str(),
                    cluster.metrics.actual,
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(
            clusters,
            [
                ("PEKANBARU", "RIAU INNER", Some(60.0)),
                ("PEKANBARU OUTER", "RIAU INNER", Some(40.0)),
            ]
        );
        assert_eq!(tree.children[0].metrics.actual, Some(100.0));
    }

    #[test]
    fn tree_serializes_level_and_children() {
        let family = find_family("revenue").unwrap();
        let paths = vec![TerritoryPath::new("R", "B", "S", "C", "K")];
        let tree = assemble_tree("R", family, &paths, vec![block(Level::Region, &[("R", 1.0)])]);
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["level"], "region");
        assert_eq!(json["name"], "R");
        assert_eq!(json["children"][0]["level"], "branch");
        assert_eq!(json["children"][0]["children"][0]["children"][0]["children"][0]["name"], "K");
        assert!(json.get("child_index").is_none());
        assert!(json.get("totals").is_none());
    }
}
