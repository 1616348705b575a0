use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};

use crate::{
    error::{AppError, AppResult},
    services::{
        hierarchy::{Level, TerritoryPath, SUBBRANCH_REMAP},
        metric_family::FactSource,
        scope::ScopeConstraint,
    },
};

const HIERARCHY_TABLE: &str = "territory_hierarchy";
const TARGET_TABLE: &str = "kpi_targets";

/// A source summed to one hierarchy level, keyed by territory name.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelTotal {
    pub name: String,
    pub value: Option<f64>,
    pub ytd: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct FactQuery<'a> {
    pub source: &'a FactSource,
    pub level: Level,
    pub region: &'a str,
    /// Only kabupaten under these ancestors are summed.
    pub constraints: &'a [ScopeConstraint],
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy)]
pub struct TargetQuery<'a> {
    pub metric: &'a str,
    pub level: Level,
    pub region: &'a str,
    pub constraints: &'a [ScopeConstraint],
    /// `YYYYMM`
    pub period: &'a str,
}

/// Read-only access to the hierarchy, fact and target tables.
#[async_trait]
pub trait KpiStore: Send + Sync {
    /// Hierarchy rows of `region` matching every constraint, ordered by
    /// branch, subbranch, cluster, kabupaten.
    async fn territory_paths(
        &self,
        region: &str,
        constraints: &[ScopeConstraint],
    ) -> AppResult<Vec<TerritoryPath>>;

    async fn fact_totals(&self, query: FactQuery<'_>) -> AppResult<Vec<LevelTotal>>;

    /// Kabupaten targets summed up to `query.level`.
    async fn target_totals(&self, query: TargetQuery<'_>) -> AppResult<Vec<LevelTotal>>;
}

pub struct PgKpiStore {
    pool: PgPool,
}

impl PgKpiStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KpiStore for PgKpiStore {
    async fn territory_paths(
        &self,
        region: &str,
        constraints: &[ScopeConstraint],
    ) -> AppResult<Vec<TerritoryPath>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT DISTINCT h.region, h.branch, ");
        push_level_expr(&mut query, Level::Subbranch);
        query
            .push(" AS subbranch, h.cluster, h.kabupaten FROM ")
            .push(HIERARCHY_TABLE)
            .push(" h WHERE UPPER(h.region) = UPPER(")
            .push_bind(region.to_string())
            .push(")");
        push_scope(&mut query, constraints);
        query.push(" ORDER BY 2, 3, 4, 5");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        rows.iter().map(read_path).collect()
    }

    async fn fact_totals(&self, fact: FactQuery<'_>) -> AppResult<Vec<LevelTotal>> {
        let mut query = fact_totals_query(&fact)?;
        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        rows.iter().map(read_total).collect()
    }

    async fn target_totals(&self, target: TargetQuery<'_>) -> AppResult<Vec<LevelTotal>> {
        let mut query = target_totals_query(&target);
        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        rows.iter().map(read_total).collect()
    }
}

fn fact_totals_query(fact: &FactQuery<'_>) -> AppResult<QueryBuilder<'static, Postgres>> {
    let table = validate_identifier(fact.source.table)?;
    let value_column = validate_identifier(fact.source.value_column)?;
    let ytd_column = fact
        .source
        .ytd_column
        .map(validate_identifier)
        .transpose()?;

    let mut query = QueryBuilder::<Postgres>::new("SELECT ");
    push_level_expr(&mut query, fact.level);
    query
        .push(" AS name, SUM(f.")
        .push(value_column)
        .push(")::float8 AS value, ");
    match ytd_column {
        Some(column) => query.push("SUM(f.").push(column).push(")::float8 AS ytd"),
        None => query.push("NULL::float8 AS ytd"),
    };
    query
        .push(" FROM ")
        .push(table)
        .push(" f JOIN ")
        .push(HIERARCHY_TABLE)
        .push(" h ON UPPER(h.kabupaten) = UPPER(f.kabupaten) WHERE UPPER(h.region) = UPPER(")
        .push_bind(fact.region.to_string())
        .push(") AND f.period_date = ")
        .push_bind(fact.date);
    if let Some(brand) = fact.source.brand {
        query
            .push(" AND UPPER(f.brand) = UPPER(")
            .push_bind(brand.to_string())
            .push(")");
    }
    push_scope(&mut query, fact.constraints);
    query.push(" GROUP BY 1");
    Ok(query)
}

fn target_totals_query(target: &TargetQuery<'_>) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new("SELECT ");
    push_level_expr(&mut query, target.level);
    query
        .push(" AS name, SUM(t.target_value)::float8 AS value, NULL::float8 AS ytd FROM ")
        .push(TARGET_TABLE)
        .push(" t JOIN ")
        .push(HIERARCHY_TABLE)
        .push(" h ON UPPER(h.kabupaten) = UPPER(t.kabupaten) WHERE UPPER(h.region) = UPPER(")
        .push_bind(target.region.to_string())
        .push(") AND t.metric = ")
        .push_bind(target.metric.to_string())
        .push(" AND t.period = ")
        .push_bind(target.period.to_string());
    push_scope(&mut query, target.constraints);
    query.push(" GROUP BY 1");
    query
}

/// Restricts the hierarchy alias `h` to the descendants of every constraint.
fn push_scope(query: &mut QueryBuilder<'_, Postgres>, constraints: &[ScopeConstraint]) {
    for constraint in constraints {
        query.push(" AND UPPER(");
        push_level_expr(query, constraint.level);
        query
            .push(") = UPPER(")
            .push_bind(constraint.value.clone())
            .push(")");
    }
}

/// Name expression of `level` over the hierarchy alias `h`. Subbranch goes
/// through the remap table so every query groups districts the same way.
fn push_level_expr(query: &mut QueryBuilder<'_, Postgres>, level: Level) {
    if level != Level::Subbranch || SUBBRANCH_REMAP.is_empty() {
        query.push("h.").push(level.column());
        return;
    }
    query.push("CASE UPPER(TRIM(h.kabupaten))");
    for (district, subbranch) in SUBBRANCH_REMAP {
        query
            .push(" WHEN ")
            .push_bind(*district)
            .push(" THEN ")
            .push_bind(*subbranch);
    }
    query.push(" ELSE h.subbranch END");
}

fn read_path(row: &PgRow) -> AppResult<TerritoryPath> {
    let text = |column: &str| -> AppResult<String> {
        row.try_get::<Option<String>, _>(column)
            .map(Option::unwrap_or_default)
            .map_err(map_db_error)
    };
    // subbranch is already remapped by the query
    Ok(TerritoryPath {
        region: text("region")?,
        branch: text("branch")?,
        subbranch: text("subbranch")?,
        cluster: text("cluster")?,
        kabupaten: text("kabupaten")?,
    })
}

fn read_total(row: &PgRow) -> AppResult<LevelTotal> {
    Ok(LevelTotal {
        name: row
            .try_get::<Option<String>, _>("name")
            .map_err(map_db_error)?
            .unwrap_or_default(),
        value: row.try_get::<Option<f64>, _>("value").map_err(map_db_error)?,
        ytd: row.try_get::<Option<f64>, _>("ytd").map_err(map_db_error)?,
    })
}

fn validate_identifier(value: &str) -> AppResult<&str> {
    let trimmed = value.trim();
    let mut chars = trimmed.chars();
    let valid_start = chars
        .next()
        .is_some_and(|first| first.is_ascii_lowercase() || first == '_');
    if valid_start
        && chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
    {
        return Ok(trimmed);
    }
    Err(AppError::Internal(format!("Invalid identifier: {value}")))
}

fn map_db_error(error: sqlx::Error) -> AppError {
    tracing::error!(db_error = %error, "Database query failed");
    AppError::Dependency("Database operation failed.".to_string())
}
