//! Reductions of a time series to a single value.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// `(timestamp_ms, value)`; `None` is a missing sample.
pub type TimeSeriesValueTuple = (i64, Option<f64>);

/// Outcome of a calculation.
///
/// `None` when the series has nothing to compute from; `Some(None)` when the
/// selected sample itself is null.
pub type CalculationValue = Option<Option<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalculationType {
    First,
    FirstNumber,
    Last,
    LastNumber,
    Mean,
    Sum,
    Min,
    Max,
}

impl CalculationType {
    pub const ALL: [CalculationType; 8] = [
        CalculationType::First,
        CalculationType::FirstNumber,
        CalculationType::Last,
        CalculationType::LastNumber,
        CalculationType::Mean,
        CalculationType::Sum,
        CalculationType::Min,
        CalculationType::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationType::First => "First",
            CalculationType::FirstNumber => "FirstNumber",
            CalculationType::Last => "Last",
            CalculationType::LastNumber => "LastNumber",
            CalculationType::Mean => "Mean",
            CalculationType::Sum => "Sum",
            CalculationType::Min => "Min",
            CalculationType::Max => "Max",
        }
    }
}

impl std::fmt::Display for CalculationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalculationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown calculation: {}", s))
    }
}

/// Reduce `values` with `calculation`: `None` when there is nothing to reduce,
/// `Some(None)` when the picked sample itself is null.
pub fn get_calculation(values: &[TimeSeriesValueTuple], calculation: CalculationType) -> CalculationValue {
    let numbers = || values.iter().filter_map(|(_, v)| *v);

    match calculation {
        CalculationType::First => values.first().map(|(_, v)| *v),
        CalculationType::Last => values.last().map(|(_, v)| *v),
        CalculationType::FirstNumber => numbers().next().map(Some),
        CalculationType::LastNumber => numbers().last().map(Some),
        CalculationType::Sum => numbers().reduce(|a, b| a + b).map(Some),
        CalculationType::Mean => {
            let (sum, count) = numbers().fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
            (count > 0).then(|| Some(sum / count as f64))
        }
        CalculationType::Min => numbers().reduce(f64::min).map(Some),
        CalculationType::Max => numbers().reduce(f64::max).map(Some),
    }
}

/// Compute several calculations, in the requested order.
pub fn get_calculations(
    values: &[TimeSeriesValueTuple],
    calculations: &[CalculationType],
) -> Vec<(CalculationType, CalculationValue)> {
    calculations
        .iter()
        .map(|c| (*c, get_calculation(values, *c)))
        .collect()
}
