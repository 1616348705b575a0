//! In-memory [`KpiStore`] backing the rollup and route tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    repository::kpi_store::{FactQuery, KpiStore, LevelTotal, TargetQuery},
    services::{
        hierarchy::{Level, TerritoryPath},
        scope::{matches_all, ScopeConstraint},
    },
};

#[derive(Debug, Clone)]
struct FactRecord {
    table: String,
    kabupaten: String,
    date: NaiveDate,
    brand: String,
    values: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
struct TargetRecord {
    kabupaten: String,
    metric: String,
    period: String,
    value: f64,
}

#[derive(Debug, Default)]
pub struct MemoryKpiStore {
    paths: Vec<TerritoryPath>,
    facts: Vec<FactRecord>,
    targets: Vec<TargetRecord>,
    failing_level: Option<Level>,
    failing_hierarchy: bool,
}

impl MemoryKpiStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn territory(mut self, region: &str, branch: &str, subbranch: &str, cluster: &str, kabupaten: &str) -> Self {
        self.paths
            .push(TerritoryPath::new(region, branch, subbranch, cluster, kabupaten));
        self
    }

    pub fn fact(
        mut self,
        table: &str,
        kabupaten: &str,
        date: NaiveDate,
        brand: &str,
        values: &[(&str, f64)],
    ) -> Self {
        self.facts.push(FactRecord {
            table: table.to_string(),
            kabupaten: kabupaten.to_string(),
            date,
            brand: brand.to_string(),
            values: values
                .iter()
                .map(|(column, value)| ((*column).to_string(), *value))
                .collect(),
        });
        self
    }

    pub fn target(mut self, kabupaten: &str, metric: &str, period: &str, value: f64) -> Self {
        self.targets.push(TargetRecord {
            kabupaten: kabupaten.to_string(),
            metric: metric.to_string(),
            period: period.to_string(),
            value,
        });
        self
    }

    /// Every fact/target read at `level` fails with a dependency error.
    pub fn failing_at(mut self, level: Level) -> Self {
        self.failing_level = Some(level);
        self
    }

    /// Hierarchy reads fail with a dependency error.
    pub fn failing_hierarchy(mut self) -> Self {
        self.failing_hierarchy = true;
        self
    }

    fn path_of(
        &self,
        region: &str,
        constraints: &[ScopeConstraint],
        kabupaten: &str,
    ) -> Option<&TerritoryPath> {
        self.paths
            .iter()
            .find(|path| {
                path.kabupaten.eq_ignore_ascii_case(kabupaten)
                    && path.region.eq_ignore_ascii_case(region)
            })
            .filter(|path| matches_all(constraints, path))
    }

    fn check_level(&self, level: Level) -> AppResult<()> {
        if self.failing_level == Some(level) {
            return Err(AppError::Dependency("Database operation failed.".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KpiStore for MemoryKpiStore {
    async fn territory_paths(
        &self,
        region: &str,
        constraints: &[ScopeConstraint],
    ) -> AppResult<Vec<TerritoryPath>> {
        if self.failing_hierarchy {
            return Err(AppError::Dependency("Database operation failed.".to_string()));
        }
        let mut paths = self
            .paths
            .iter()
            .filter(|path| path.region.eq_ignore_ascii_case(region))
            .filter(|path| matches_all(constraints, path))
            .cloned()
            .collect::<Vec<_>>();
        paths.sort_by(|left, right| {
            (&left.branch, &left.subbranch, &left.cluster, &left.kabupaten).cmp(&(
                &right.branch,
                &right.subbranch,
                &right.cluster,
                &right.kabupaten,
            ))
        });
        paths.dedup();
        Ok(paths)
    }

    async fn fact_totals(&self, query: FactQuery<'_>) -> AppResult<Vec<LevelTotal>> {
        self.check_level(query.level)?;
        let mut totals: Vec<LevelTotal> = Vec::new();
        for record in &self.facts {
            if record.table != query.source.table || record.date != query.date {
                continue;
            }
            if query
                .source
                .brand
                .is_some_and(|brand| !brand.eq_ignore_ascii_case(&record.brand))
            {
                continue;
            }
            let Some(path) = self.path_of(query.region, query.constraints, &record.kabupaten) else {
                continue;
            };
            let value = record.values.get(query.source.value_column).copied();
            let ytd = query
                .source
                .ytd_column
                .and_then(|column| record.values.get(column).copied());
            accumulate(&mut totals, path.name_at(query.level), value, ytd);
        }
        Ok(totals)
    }

    async fn target_totals(&self, query: TargetQuery<'_>) -> AppResult<Vec<LevelTotal>> {
        self.check_level(query.level)?;
        let mut totals: Vec<LevelTotal> = Vec::new();
        for record in &self.targets {
            if record.metric != query.metric || record.period != query.period {
                continue;
            }
            let Some(path) = self.path_of(query.region, query.constraints, &record.kabupaten) else {
                continue;
            };
            accumulate(&mut totals, path.name_at(query.level), Some(record.value), None);
        }
        Ok(totals)
    }
}

// SUM() semantics: nulls are skipped, an all-null group stays null.
fn accumulate(totals: &mut Vec<LevelTotal>, name: &str, value: Option<f64>, ytd: Option<f64>) {
    let add = |current: Option<f64>, extra: Option<f64>| match (current, extra) {
        (Some(left), Some(right)) => Some(left + right),
        (left, right) => left.or(right),
    };
    match totals.iter_mut().find(|total| total.name == name) {
        Some(total) => {
            total.value = add(total.value, value);
            total.ytd = add(total.ytd, ytd);
        }
        None => totals.push(LevelTotal {
            name: name.to_string(),
            value,
            ytd,
        }),
    }
}
