use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::error::AppError;

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

fn no_control_chars(value: &str) -> Result<(), ValidationError> {
    if value.chars().any(char::is_control) {
        return Err(ValidationError::new("control_characters"));
    }
    Ok(())
}

/// Query string shared by the flat and tree KPI endpoints.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct KpiReportQuery {
    pub date: Option<String>,
    #[validate(length(max = 100), custom(function = "no_control_chars"))]
    pub branch: Option<String>,
    #[validate(length(max = 100), custom(function = "no_control_chars"))]
    pub subbranch: Option<String>,
    #[validate(length(max = 100), custom(function = "no_control_chars"))]
    pub cluster: Option<String>,
    #[validate(length(max = 100), custom(function = "no_control_chars"))]
    pub kabupaten: Option<String>,
}
