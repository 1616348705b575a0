use serde::Serialize;

/// One level of the territory containment tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Region,
    Branch,
    Subbranch,
    Cluster,
    Kabupaten,
}

impl Level {
    /// Contract order of the flattened report.
    pub const ALL: [Level; 5] = [
        Level::Region,
        Level::Branch,
        Level::Subbranch,
        Level::Cluster,
        Level::Kabupaten,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Level::Region => "REGION",
            Level::Branch => "BRANCH",
            Level::Subbranch => "SUBBRANCH",
            Level::Cluster => "CLUSTER",
            Level::Kabupaten => "KABUPATEN",
        }
    }

    /// Column of `territory_hierarchy` holding this level's name.
    pub fn column(self) -> &'static str {
        match self {
            Level::Region => "region",
            Level::Branch => "branch",
            Level::Subbranch => "subbranch",
            Level::Cluster => "cluster",
            Level::Kabupaten => "kabupaten",
        }
    }

    pub fn depth(self) -> usize {
        match self {
            Level::Region => 0,
            Level::Branch => 1,
            Level::Subbranch => 2,
            Level::Cluster => 3,
            Level::Kabupaten => 4,
        }
    }

    /// Levels that get a header row in front of their block.
    pub fn has_header(self) -> bool {
        self.depth() > 0
    }
}

/// One row of the hierarchy table, with the subbranch already remapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerritoryPath {
    pub region: String,
    pub branch: String,
    pub subbranch: String,
    pub cluster: String,
    pub kabupaten: String,
}

impl TerritoryPath {
    pub fn new(region: &str, branch: &str, subbranch: &str, cluster: &str, kabupaten: &str) -> Self {
        Self {
            region: region.to_string(),
            branch: branch.to_string(),
            subbranch: effective_subbranch(kabupaten, subbranch).to_string(),
            cluster: cluster.to_string(),
            kabupaten: kabupaten.to_string(),
        }
    }

    pub fn name_at(&self, level: Level) -> &str {
        match level {
            Level::Region => &self.region,
            Level::Branch => &self.branch,
            Level::Subbranch => &self.subbranch,
            Level::Cluster => &self.cluster,
            Level::Kabupaten => &self.kabupaten,
        }
    }
}

/// Districts whose sales are booked under a different subbranch than the one
/// recorded in the hierarchy table. Keys are upper-case kabupaten names.
pub const SUBBRANCH_REMAP: &[(&str, &str)] = &[
    ("KAMPAR", "PEKANBARU OUTER"),
    ("SIAK", "PEKANBARU OUTER"),
    ("PELALAWAN", "PEKANBARU OUTER"),
    ("BENGKALIS", "DUMAI"),
    ("KEPULAUAN MERANTI", "DUMAI"),
    ("KARIMUN", "BATAM"),
    ("LINGGA", "TANJUNG PINANG"),
];

/// Subbranch a kabupaten rolls up to, after applying [`SUBBRANCH_REMAP`].
pub fn effective_subbranch<'a>(kabupaten: &str, recorded: &'a str) -> &'a str {
    let key = kabupaten.trim();
    SUBBRANCH_REMAP
        .iter()
        .find(|(district, _)| district.eq_ignore_ascii_case(key))
        .map(|(_, subbranch)| *subbranch)
        .unwrap_or(recorded)
}
