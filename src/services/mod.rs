pub mod flatten;
pub mod hierarchy;
pub mod kpi_report;
pub mod metric_family;
pub mod metrics;
pub mod period;
pub mod rollup;
pub mod scope;
pub mod territory;
