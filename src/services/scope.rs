use crate::services::hierarchy::{Level, TerritoryPath};

/// A single applied `level = value` restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeConstraint {
    pub level: Level,
    pub value: String,
}

/// Optional branch/subbranch/cluster/kabupaten narrowing for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFilter {
    branch: Option<String>,
    subbranch: Option<String>,
    cluster: Option<String>,
    kabupaten: Option<String>,
}

impl ScopeFilter {
    pub fn new(
        branch: Option<&str>,
        subbranch: Option<&str>,
        cluster: Option<&str>,
        kabupaten: Option<&str>,
    ) -> Self {
        Self {
            branch: normalize(branch),
            subbranch: normalize(subbranch),
            cluster: normalize(cluster),
            kabupaten: normalize(kabupaten),
        }
    }

    fn value_at(&self, level: Level) -> Option<&str> {
        match level {
            Level::Region => None,
            Level::Branch => self.branch.as_deref(),
            Level::Subbranch => self.subbranch.as_deref(),
            Level::Cluster => self.cluster.as_deref(),
            Level::Kabupaten => self.kabupaten.as_deref(),
        }
    }

    /// Constraints along the left prefix of branch → subbranch → cluster →
    /// kabupaten; the first missing value ends the chain. They narrow every
    /// block below region; the region block is never narrowed.
    pub fn effective(&self) -> Vec<ScopeConstraint> {
        Level::ALL
            .iter()
            .skip(1)
            .map_while(|level| {
                self.value_at(*level).map(|value| ScopeConstraint {
                    level: *level,
                    value: value.to_string(),
                })
            })
            .collect()
    }
}

pub fn matches_all(constraints: &[ScopeConstraint], path: &TerritoryPath) -> bool {
    constraints
        .iter()
        .all(|constraint| path.name_at(constraint.level).eq_ignore_ascii_case(&constraint.value))
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_ascii_uppercase)
}
