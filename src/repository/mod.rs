pub mod kpi_store;
#[cfg(test)]
pub mod memory_store;
