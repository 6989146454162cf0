//! Projection of assembled day facts onto an ordered list of date keys.
//!
//! Every array has exactly one slot per date key, whether or not a day record
//! exists for that date. Absent values are explicit `None` (`null` in JSON).

use std::collections::{BTreeMap, BTreeSet};

use diary_store::{CustomSymptomId, HabitId, STOOL_NONE, SymptomType};
use serde::Serialize;

use crate::assembly::Assembled;

/// How the stored "no stool" sentinel is surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoolMode {
    /// `99` becomes `null` (rolling and weekly views).
    NullSentinel,
    /// The stored value passes through unchanged.
    Raw,
}

impl StoolMode {
    fn apply(self, value: Option<i32>) -> Option<i32> {
        match (self, value) {
            (StoolMode::NullSentinel, Some(STOOL_NONE)) => None,
            (_, v) => v,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CustomSeries {
    pub id: CustomSymptomId,
    pub title: String,
    pub values: Vec<Option<i32>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub days: Vec<String>,
    pub symptoms: BTreeMap<SymptomType, Vec<Option<i32>>>,
    pub stool: Vec<Option<i32>>,
    pub well_being_index: Vec<Option<f64>>,
    pub habit_fulfillment: Vec<Option<f64>>,
    pub custom_symptoms: Vec<CustomSeries>,
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Mean of the present standard-symptom scores, 2 decimals.
pub fn well_being_index(scores: impl IntoIterator<Item = i32>) -> Option<f64> {
    let (sum, count) = scores
        .into_iter()
        .fold((0i64, 0u32), |(sum, count), s| (sum + i64::from(s), count + 1));
    if count == 0 {
        return None;
    }
    Some(round_to(sum as f64 / f64::from(count), 2))
}

/// Ticked habits over the active-habit count, 3 decimals.
///
/// `None` when there are no active habits or no day record for the date.
pub fn habit_ratio(done: usize, active: usize, has_day: bool) -> Option<f64> {
    if active == 0 || !has_day {
        return None;
    }
    Some(round_to(done as f64 / active as f64, 3))
}

impl Assembled {
    fn standard_scores(&self, key: &str) -> impl Iterator<Item = i32> {
        SymptomType::ALL
            .into_iter()
            .filter_map(move |s| self.symptom(s, key))
    }

    pub fn well_being_for(&self, key: &str) -> Option<f64> {
        well_being_index(self.standard_scores(key))
    }

    pub fn habit_ratio_for(&self, key: &str) -> Option<f64> {
        let day = self.day_for_key(key);
        let done = day.map_or(0, |id| self.ticks_done_count(id));
        habit_ratio(done, self.active_habit_count, day.is_some())
    }
}

pub fn build_series(assembled: &Assembled, keys: &[String], stool_mode: StoolMode) -> Series {
    let mut symptoms = BTreeMap::new();
    for symptom in SymptomType::ALL {
        let values = keys.iter().map(|k| assembled.symptom(symptom, k)).collect();
        symptoms.insert(symptom, values);
    }

    let custom_symptoms = assembled
        .custom_defs
        .iter()
        .map(|def| CustomSeries {
            id: def.id,
            title: def.title.clone(),
            values: keys
                .iter()
                .map(|k| assembled.custom_score(def.id, k))
                .collect(),
        })
        .collect();

    Series {
        days: keys.to_vec(),
        symptoms,
        stool: keys
            .iter()
            .map(|k| stool_mode.apply(assembled.stool_raw(k)))
            .collect(),
        well_being_index: keys.iter().map(|k| assembled.well_being_for(k)).collect(),
        habit_fulfillment: keys.iter().map(|k| assembled.habit_ratio_for(k)).collect(),
        custom_symptoms,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CustomValue {
    pub id: CustomSymptomId,
    pub title: String,
    pub value: Option<i32>,
}

/// Single-date projection used to compare today against the day before.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YesterdaySnapshot {
    pub date: String,
    pub symptoms: BTreeMap<SymptomType, Option<i32>>,
    pub custom_symptoms: Vec<CustomValue>,
    pub stool: Option<i32>,
    pub habits_done: BTreeSet<HabitId>,
}

pub fn yesterday_snapshot(assembled: &Assembled, key: &str, stool_mode: StoolMode) -> YesterdaySnapshot {
    YesterdaySnapshot {
        date: key.to_string(),
        symptoms: SymptomType::ALL
            .into_iter()
            .map(|s| (s, assembled.symptom(s, key)))
            .collect(),
        custom_symptoms: assembled
            .custom_defs
            .iter()
            .map(|def| CustomValue {
                id: def.id,
                title: def.title.clone(),
                value: assembled.custom_score(def.id, key),
            })
            .collect(),
        stool: stool_mode.apply(assembled.stool_raw(key)),
        habits_done: assembled
            .day_for_key(key)
            .and_then(|id| assembled.ticks_done(id))
            .cloned()
            .unwrap_or_default(),
    }
}
