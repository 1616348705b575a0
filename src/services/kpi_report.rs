use crate::{
    error::{AppError, AppResult},
    repository::kpi_store::KpiStore,
    services::{
        flatten::{assemble_tree, flatten_levels, TreeNode},
        hierarchy::{Level, TerritoryPath},
        metric_family::MetricFamily,
        period::ReportPeriod,
        rollup::{rollup_level, RollupRow},
        scope::{matches_all, ScopeConstraint, ScopeFilter},
        territory::anchor_sets,
    },
};

/// Failure label for the hierarchy read that precedes the level rollups.
const HIERARCHY_STAGE: &str = "HIERARCHY";

/// Everything one report request needs, resolved from the query string.
#[derive(Debug, Clone)]
pub struct KpiReportRequest<'a> {
    pub family: &'a MetricFamily,
    pub region: &'a str,
    pub period: ReportPeriod,
    pub scope: ScopeFilter,
}

pub async fn flat_report(store: &dyn KpiStore, request: &KpiReportRequest<'_>) -> AppResult<Vec<RollupRow>> {
    let scope = request.scope.effective();
    let paths = scoped_paths(store, request, &scope).await?;
    let [region_anchors, branch_anchors, subbranch_anchors, cluster_anchors, kabupaten_anchors] =
        anchor_sets(request.region, &paths);

    tracing::debug!(
        family = request.family.key,
        date = %request.period.curr_date,
        month_end = request.period.is_month_end(),
        scope = ?scope,
        paths = paths.len(),
        "Rolling up KPI levels"
    );

    // Dropping this future abandons every outstanding level.
    let (family, period, region) = (request.family, &request.period, request.region);
    let (region_rows, branch_rows, subbranch_rows, cluster_rows, kabupaten_rows) = tokio::try_join!(
        rollup_level(store, family, Level::Region, &region_anchors, &[], period, region),
        rollup_level(store, family, Level::Branch, &branch_anchors, &scope, period, region),
        rollup_level(store, family, Level::Subbranch, &subbranch_anchors, &scope, period, region),
        rollup_level(store, family, Level::Cluster, &cluster_anchors, &scope, period, region),
        rollup_level(store, family, Level::Kabupaten, &kabupaten_anchors, &scope, period, region),
    )?;

    Ok(flatten_levels(
        family,
        vec![region_rows, branch_rows, subbranch_rows, cluster_rows, kabupaten_rows],
    ))
}

/// Only the region and kabupaten levels are read; the levels in between are
/// summed from the kabupaten under each tree node.
pub async fn tree_report(store: &dyn KpiStore, request: &KpiReportRequest<'_>) -> AppResult<TreeNode> {
    let scope = request.scope.effective();
    let paths = scoped_paths(store, request, &scope).await?;
    let [region_anchors, _, _, _, kabupaten_anchors] = anchor_sets(request.region, &paths);

    let (family, period, region) = (request.family, &request.period, request.region);
    let (region_rows, kabupaten_rows) = tokio::try_join!(
        rollup_level(store, family, Level::Region, &region_anchors, &[], period, region),
        rollup_level(store, family, Level::Kabupaten, &kabupaten_anchors, &scope, period, region),
    )?;

    Ok(assemble_tree(region, family, &paths, vec![region_rows, kabupaten_rows]))
}

async fn scoped_paths(
    store: &dyn KpiStore,
    request: &KpiReportRequest<'_>,
    scope: &[ScopeConstraint],
) -> AppResult<Vec<TerritoryPath>> {
    let paths = store
        .territory_paths(request.region, scope)
        .await
        .map_err(|error| AppError::rollup(request.family.key, HIERARCHY_STAGE, error))?;
    debug_assert!(paths.iter().all(|path| matches_all(scope, path)));
    Ok(paths)
}
