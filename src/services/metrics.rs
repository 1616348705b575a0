use std::fmt;

use serde::{Serialize, Serializer};

/// A percentage that may be blank. Rendered as `"12.34%"` or `""` only when
/// serialized; arithmetic stays numeric.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Percent(Option<f64>);

impl Percent {
    pub const BLANK: Percent = Percent(None);

    pub fn new(value: Option<f64>) -> Self {
        // -0.0 would render as "-0.00%"
        Percent(
            value
                .filter(|item| item.is_finite())
                .map(round2)
                .map(|item| if item == 0.0 { 0.0 } else { item }),
        )
    }

    pub fn value(self) -> Option<f64> {
        self.0
    }

    pub fn is_blank(self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{value:.2}%"),
            None => Ok(()),
        }
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Inputs of one territory row, after joins and residual subtraction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricInputs {
    pub actual: Option<f64>,
    pub prev_month: Option<f64>,
    pub prev_year: Option<f64>,
    pub ytd: Option<f64>,
    pub ytd_prev_year: Option<f64>,
    pub target: Option<f64>,
    pub base: Option<f64>,
    pub elapsed_fraction: f64,
}

impl MetricInputs {
    /// Adds `other` into `self` the way SQL `SUM()` does: nulls are skipped
    /// and an all-null sum stays null.
    pub fn accumulate(&mut self, other: &MetricInputs) {
        self.actual = sum(self.actual, other.actual);
        self.prev_month = sum(self.prev_month, other.prev_month);
        self.prev_year = sum(self.prev_year, other.prev_year);
        self.ytd = sum(self.ytd, other.ytd);
        self.ytd_prev_year = sum(self.ytd_prev_year, other.ytd_prev_year);
        self.target = sum(self.target, other.target);
        self.base = sum(self.base, other.base);
        self.elapsed_fraction = other.elapsed_fraction;
    }
}

fn sum(left: Option<f64>, right: Option<f64>) -> Option<f64> {
    match (left, right) {
        (Some(left), Some(right)) => Some(left + right),
        (left, right) => left.or(right),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedMetrics {
    pub achievement_pct: Percent,
    pub drr_pct: Percent,
    pub gap: Option<f64>,
    pub mom_pct: Percent,
    pub yoy_pct: Percent,
    pub ytd_pct: Percent,
    pub penetration_pct: Percent,
}

pub fn derive(inputs: &MetricInputs) -> DerivedMetrics {
    let pace_target = inputs.target.map(|target| target * inputs.elapsed_fraction);
    DerivedMetrics {
        achievement_pct: Percent::new(ratio(inputs.actual, inputs.target).map(|r| r * 100.0)),
        drr_pct: Percent::new(ratio(inputs.actual, pace_target).map(|r| r * 100.0)),
        gap: inputs
            .actual
            .zip(inputs.target)
            .map(|(actual, target)| round2(actual - target))
            .filter(|gap| gap.is_finite()),
        mom_pct: growth(inputs.actual, inputs.prev_month),
        yoy_pct: growth(inputs.actual, inputs.prev_year),
        ytd_pct: growth(inputs.ytd, inputs.ytd_prev_year),
        penetration_pct: Percent::new(ratio(inputs.actual, inputs.base).map(|r| r * 100.0)),
    }
}

/// `numerator / denominator`, blank on a missing or zero operand.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (numerator, denominator) = numerator.zip(denominator)?;
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return None;
    }
    Some(numerator / denominator).filter(|value| value.is_finite())
}

fn growth(current: Option<f64>, previous: Option<f64>) -> Percent {
    Percent::new(ratio(current, previous).map(|r| (r - 1.0) * 100.0))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
