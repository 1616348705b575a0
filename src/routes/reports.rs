use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    schemas::{validate_input, KpiReportQuery},
    services::{
        kpi_report::{flat_report, tree_report, KpiReportRequest},
        metric_family::{find_family, FamilySummary, MetricFamily, FAMILIES},
        period::{resolve_report_date, ReportPeriod},
        scope::ScopeFilter,
    },
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/reports/kpi", axum::routing::get(list_kpi_reports))
        .route("/reports/kpi/{family}", axum::routing::get(kpi_report))
        .route("/reports/kpi/{family}/tree", axum::routing::get(kpi_report_tree))
}

async fn list_kpi_reports() -> Json<Value> {
    let data = FAMILIES.iter().map(FamilySummary::from).collect::<Vec<_>>();
    Json(json!({ "data": data }))
}

async fn kpi_report(
    State(state): State<AppState>,
    Path(family): Path<String>,
    Query(query): Query<KpiReportQuery>,
) -> AppResult<Json<Value>> {
    let family = family_or_404(&family)?;
    let request = build_request(&state, family, &query)?;
    let store = state.kpi_store()?;

    let rows = flat_report(store, &request).await?;
    tracing::info!(
        family = family.key,
        date = %request.period.curr_date,
        rows = rows.len(),
        "KPI report built"
    );
    Ok(Json(json!({ "data": rows })))
}

async fn kpi_report_tree(
    State(state): State<AppState>,
    Path(family): Path<String>,
    Query(query): Query<KpiReportQuery>,
) -> AppResult<Json<Value>> {
    let family = family_or_404(&family)?;
    let request = build_request(&state, family, &query)?;
    let store = state.kpi_store()?;

    let tree = tree_report(store, &request).await?;
    Ok(Json(json!({ "data": tree })))
}

fn family_or_404(key: &str) -> AppResult<&'static MetricFamily> {
    find_family(key).ok_or_else(|| AppError::NotFound(format!("Unknown KPI report '{key}'.")))
}

/// Validates the query and resolves period and scope. Runs before any store
/// access so malformed requests never reach the database.
fn build_request<'a>(
    state: &'a AppState,
    family: &'a MetricFamily,
    query: &KpiReportQuery,
) -> AppResult<KpiReportRequest<'a>> {
    validate_input(query)?;

    let today = Utc::now().with_timezone(&state.config.report_tz()).date_naive();
    let date = resolve_report_date(
        query.date.as_deref(),
        today,
        state.config.report_latency_days,
    )?;

    Ok(KpiReportRequest {
        family,
        region: &state.config.report_region,
        period: ReportPeriod::resolve(date),
        scope: ScopeFilter::new(
            query.branch.as_deref(),
            query.subbranch.as_deref(),
            query.cluster.as_deref(),
            query.kabupaten.as_deref(),
        ),
    })
}
