//! Scalar summaries over built series. Nulls are ignored; an empty input
//! yields `None` rather than zero.

use std::collections::BTreeMap;

use diary_store::{STOOL_NONE, SymptomType};
use serde::Serialize;

use crate::series::{Series, round_to};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SymptomStats {
    pub avg: Option<f64>,
    pub min: Option<i32>,
    pub max: Option<i32>,
}

pub fn symptom_stats(values: &[Option<i32>]) -> SymptomStats {
    let present: Vec<i32> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return SymptomStats::default();
    }
    let sum: i64 = present.iter().map(|&v| i64::from(v)).sum();
    SymptomStats {
        avg: Some(round_to(sum as f64 / present.len() as f64, 2)),
        min: present.iter().min().copied(),
        max: present.iter().max().copied(),
    }
}

/// Mean of the present values rounded to `places`.
pub fn average(values: impl IntoIterator<Item = Option<f64>>, places: i32) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| round_to(sum / count as f64, places))
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseStats {
    pub stats: BTreeMap<SymptomType, SymptomStats>,
    pub stool_avg: Option<f64>,
    pub habit_fulfillment_avg: Option<f64>,
}

pub fn phase_stats(series: &Series) -> PhaseStats {
    let stats = SymptomType::ALL
        .into_iter()
        .map(|s| {
            let values = series.symptoms.get(&s).map(Vec::as_slice).unwrap_or(&[]);
            (s, symptom_stats(values))
        })
        .collect();

    // The phase series carries the raw stool value, so the sentinel is dropped here.
    let stool = series
        .stool
        .iter()
        .map(|v| v.filter(|&s| s != STOOL_NONE).map(f64::from));

    PhaseStats {
        stats,
        stool_avg: average(stool, 2),
        habit_fulfillment_avg: average(series.habit_fulfillment.iter().copied(), 3),
    }
}
