use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    repository::kpi_store::{FactQuery, KpiStore, LevelTotal, TargetQuery},
    services::{
        hierarchy::Level,
        metric_family::{FactSource, MetricFamily},
        metrics::{derive, round2, MetricInputs, Percent},
        period::ReportPeriod,
        scope::ScopeConstraint,
    },
};

/// One line of a report: a territory, or a level header when every metric is
/// blank and `name` is the level label.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupRow {
    pub name: String,
    pub target: Option<f64>,
    pub actual: Option<f64>,
    pub achievement_pct: Percent,
    pub drr_pct: Percent,
    pub gap: Option<f64>,
    pub prev_month: Option<f64>,
    pub mom_pct: Percent,
    pub prev_year: Option<f64>,
    pub yoy_pct: Percent,
    pub ytd: Option<f64>,
    pub ytd_pct: Percent,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub penetration: Option<Penetration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Penetration {
    pub base: Option<f64>,
    pub penetration_pct: Percent,
}

impl RollupRow {
    pub fn header(level: Level, family: &MetricFamily) -> Self {
        Self::blank(level.label(), family)
    }

    fn blank(name: &str, family: &MetricFamily) -> Self {
        Self {
            name: name.to_string(),
            target: None,
            actual: None,
            achievement_pct: Percent::BLANK,
            drr_pct: Percent::BLANK,
            gap: None,
            prev_month: None,
            mom_pct: Percent::BLANK,
            prev_year: None,
            yoy_pct: Percent::BLANK,
            ytd: None,
            ytd_pct: Percent::BLANK,
            penetration: family.base.map(|_| Penetration {
                base: None,
                penetration_pct: Percent::BLANK,
            }),
        }
    }

    pub fn is_header(&self) -> bool {
        Level::ALL
            .iter()
            .any(|level| level.has_header() && level.label() == self.name)
            && self.target.is_none()
            && self.actual.is_none()
            && self.achievement_pct.is_blank()
    }
}

/// Rows of one hierarchy level, in anchor order. `inputs[i]` holds the
/// unrounded sums behind `rows[i]`.
#[derive(Debug, Clone)]
pub struct LevelRollup {
    pub level: Level,
    pub rows: Vec<RollupRow>,
    pub inputs: Vec<MetricInputs>,
}

/// Left-joins `anchors` against every source `family` needs at `level` and
/// derives the ratios. Only kabupaten under `constraints` contribute to the
/// sums. Territories without facts or targets keep a row with null metrics.
pub async fn rollup_level(
    store: &dyn KpiStore,
    family: &MetricFamily,
    level: Level,
    anchors: &[String],
    constraints: &[ScopeConstraint],
    period: &ReportPeriod,
    region: &str,
) -> AppResult<LevelRollup> {
    if anchors.is_empty() {
        return Ok(LevelRollup {
            level,
            rows: Vec::new(),
            inputs: Vec::new(),
        });
    }

    let reader = LevelReader {
        store,
        level,
        region,
        constraints,
    };
    let exclusion = family.exclusion.as_ref();
    let period_key = period.period_key();
    let (current, prev_month, prev_year, excl_current, excl_prev_month, excl_prev_year, targets, base) =
        tokio::try_join!(
            reader.facts(Some(&family.actual), period.curr_date, true),
            reader.facts(Some(&family.actual), period.prev_month_date, family.compare_prev_month),
            reader.facts(Some(&family.actual), period.prev_year_date, family.compare_prev_year),
            reader.facts(exclusion, period.curr_date, true),
            reader.facts(exclusion, period.prev_month_date, family.compare_prev_month),
            reader.facts(exclusion, period.prev_year_date, family.compare_prev_year),
            store.target_totals(TargetQuery {
                metric: family.target_metric,
                level,
                region,
                constraints,
                period: &period_key,
            }),
            reader.facts(family.base.as_ref(), period.curr_date, true),
        )
        .map_err(|error| AppError::rollup(family.key, level.label(), error))?;

    let current = index_totals(current.unwrap_or_default());
    let prev_month = prev_month.map(index_totals);
    let prev_year = prev_year.map(index_totals);
    let excl_current = excl_current.map(index_totals);
    let excl_prev_month = excl_prev_month.map(index_totals);
    let excl_prev_year = excl_prev_year.map(index_totals);
    let targets = index_totals(targets);
    let base = base.map(index_totals);

    let (rows, inputs): (Vec<_>, Vec<_>) = anchors
        .iter()
        .map(|name| {
            let key = name.to_ascii_uppercase();
            let current_total = current.get(&key);
            let prev_year_total = lookup(&prev_year, &key);
            let excl_current_total = lookup(&excl_current, &key);
            let excl_prev_year_total = lookup(&excl_prev_year, &key);

            let inputs = MetricInputs {
                actual: residual(
                    current_total.and_then(|total| total.value),
                    excl_current_total.and_then(|total| total.value),
                ),
                prev_month: residual(
                    lookup(&prev_month, &key).and_then(|total| total.value),
                    lookup(&excl_prev_month, &key).and_then(|total| total.value),
                ),
                prev_year: residual(
                    prev_year_total.and_then(|total| total.value),
                    excl_prev_year_total.and_then(|total| total.value),
                ),
                ytd: residual(
                    current_total.and_then(|total| total.ytd),
                    excl_current_total.and_then(|total| total.ytd),
                ),
                ytd_prev_year: residual(
                    prev_year_total.and_then(|total| total.ytd),
                    excl_prev_year_total.and_then(|total| total.ytd),
                ),
                target: targets.get(&key).and_then(|total| total.value),
                base: lookup(&base, &key).and_then(|total| total.value),
                elapsed_fraction: period.elapsed_fraction(),
            };
            (build_row(name, family, &inputs), inputs)
        })
        .unzip();

    tracing::debug!(
        family = family.key,
        level = level.label(),
        rows = rows.len(),
        "Level rollup computed"
    );

    Ok(LevelRollup {
        level,
        rows,
        inputs,
    })
}

struct LevelReader<'a> {
    store: &'a dyn KpiStore,
    level: Level,
    region: &'a str,
    constraints: &'a [ScopeConstraint],
}

impl LevelReader<'_> {
    async fn facts(
        &self,
        source: Option<&FactSource>,
        date: NaiveDate,
        wanted: bool,
    ) -> AppResult<Option<Vec<LevelTotal>>> {
        let Some(source) = source.filter(|_| wanted) else {
            return Ok(None);
        };
        self.store
            .fact_totals(FactQuery {
                source,
                level: self.level,
                region: self.region,
                constraints: self.constraints,
                date,
            })
            .await
            .map(Some)
    }
}

pub fn build_row(name: &str, family: &MetricFamily, inputs: &MetricInputs) -> RollupRow {
    let derived = derive(inputs);
    RollupRow {
        name: name.to_string(),
        target: inputs.target.map(round2),
        actual: inputs.actual.map(round2),
        achievement_pct: derived.achievement_pct,
        drr_pct: derived.drr_pct,
        gap: derived.gap,
        prev_month: inputs.prev_month.map(round2),
        mom_pct: derived.mom_pct,
        prev_year: inputs.prev_year.map(round2),
        yoy_pct: derived.yoy_pct,
        ytd: inputs.ytd.map(round2),
        ytd_pct: derived.ytd_pct,
        penetration: family.base.map(|_| Penetration {
            base: inputs.base.map(round2),
            penetration_pct: derived.penetration_pct,
        }),
    }
}

/// `all - excluded` at one territory and date. A missing excluded total
/// subtracts nothing; a missing all-brand total stays missing.
pub fn residual(all: Option<f64>, excluded: Option<f64>) -> Option<f64> {
    all.map(|all| all - excluded.unwrap_or(0.0))
}

fn index_totals(totals: Vec<LevelTotal>) -> HashMap<String, LevelTotal> {
    totals
        .into_iter()
        .map(|total| (total.name.trim().to_ascii_uppercase(), total))
        .collect()
}

fn lookup<'a>(index: &'a Option<HashMap<String, LevelTotal>>, key: &str) -> Option<&'a LevelTotal> {
    index.as_ref().and_then(|totals| totals.get(key))
}
