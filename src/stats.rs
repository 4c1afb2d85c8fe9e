use crate::models::MapDataEntry;
use serde::{Deserialize, Serialize};

/// Summary statistics over one value table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// Compute statistics; `null` values count as missing, never as zero.
pub fn summarize(entries: &[MapDataEntry]) -> Summary {
    let mut vals: Vec<f64> = entries
        .iter()
        .filter_map(|e| e.value)
        .filter(|v| v.is_finite())
        .collect();
    let missing = entries.len() - vals.len();
    vals.sort_by(f64::total_cmp);

    let count = vals.len();
    let min = vals.first().copied();
    let max = vals.last().copied();
    let mean = if count > 0 {
        Some(vals.iter().sum::<f64>() / count as f64)
    } else {
        None
    };
    let median = if count == 0 {
        None
    } else if count % 2 == 1 {
        Some(vals[count / 2])
    } else {
        Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
    };
    Summary {
        count,
        missing,
        min,
        max,
        mean,
        median,
    }
}
