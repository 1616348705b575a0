use serde::Serialize;

/// A fact table summed to a hierarchy level. Rows are keyed by kabupaten and
/// `period_date`; `brand` narrows to one sub-brand when set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactSource {
    pub table: &'static str,
    pub value_column: &'static str,
    pub ytd_column: Option<&'static str>,
    pub brand: Option<&'static str>,
}

/// One report type: which facts make up the actual, what it is compared
/// against, and which target metric it is measured by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricFamily {
    pub key: &'static str,
    pub title: &'static str,
    pub actual: FactSource,
    /// Subtracted from `actual` at the same territory and date.
    pub exclusion: Option<FactSource>,
    pub target_metric: &'static str,
    pub compare_prev_month: bool,
    pub compare_prev_year: bool,
    /// Denominator of `penetrationPct`.
    pub base: Option<FactSource>,
}

const REVENUE_ALL_BRANDS: FactSource = FactSource {
    table: "revenue_summary",
    value_column: "revenue_mtd",
    ytd_column: Some("revenue_ytd"),
    brand: None,
};

pub const FAMILIES: &[MetricFamily] = &[
    MetricFamily {
        key: "revenue",
        title: "Total revenue",
        actual: REVENUE_ALL_BRANDS,
        exclusion: None,
        target_metric: "REVENUE",
        compare_prev_month: true,
        compare_prev_year: true,
        base: None,
    },
    MetricFamily {
        key: "revenue-prepaid",
        title: "Prepaid revenue excluding BYU",
        actual: REVENUE_ALL_BRANDS,
        exclusion: Some(FactSource {
            brand: Some("BYU"),
            ..REVENUE_ALL_BRANDS
        }),
        target_metric: "REVENUE_PREPAID",
        compare_prev_month: true,
        compare_prev_year: true,
        base: None,
    },
    MetricFamily {
        key: "sales",
        title: "Gross adds",
        actual: FactSource {
            table: "sales_summary",
            value_column: "gross_adds_mtd",
            ytd_column: Some("gross_adds_ytd"),
            brand: None,
        },
        exclusion: None,
        target_metric: "SALES",
        compare_prev_month: true,
        compare_prev_year: true,
        base: Some(FactSource {
            table: "subscriber_base",
            value_column: "subscribers",
            ytd_column: None,
            brand: None,
        }),
    },
];

pub fn find_family(key: &str) -> Option<&'static MetricFamily> {
    let key = key.trim();
    FAMILIES
        .iter()
        .find(|family| family.key.eq_ignore_ascii_case(key))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilySummary {
    pub key: &'static str,
    pub title: &'static str,
    pub compares_prev_month: bool,
    pub compares_prev_year: bool,
    pub residual: bool,
    pub has_penetration: bool,
}

impl From<&MetricFamily> for FamilySummary {
    fn from(family: &MetricFamily) -> Self {
        Self {
            key: family.key,
            title: family.title,
            compares_prev_month: family.compare_prev_month,
            compares_prev_year: family.compare_prev_year,
            residual: family.exclusion.is_some(),
            has_penetration: family.base.is_some(),
        }
    }
}
