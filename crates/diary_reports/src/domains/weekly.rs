use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use diary_store::{DayFilter, SymptomType, UserId, WeekStart};
use serde::Serialize;

use crate::ReportEngine;
use crate::dates::{enumerate_days, start_of_week, to_date_key};
use crate::error::ReportResult;
use crate::series::{CustomSeries, StoolMode, build_series};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub days: Vec<String>,
    pub symptoms: BTreeMap<SymptomType, Vec<Option<i32>>>,
    pub stool: Vec<Option<i32>>,
    pub custom_symptoms: Vec<CustomSeries>,
    pub well_being_index: Vec<Option<f64>>,
    pub habit_fulfillment: Vec<Option<f64>>,
    /// Day key of the first day served.
    pub week_start: String,
    /// The user's week-start preference, used when `from` is absent.
    pub week_starts_on: WeekStart,
}

/// Seven days beginning at `from`. Without `from` the current week is used,
/// aligned to the user's week-start preference.
pub async fn weekly_report(
    engine: &ReportEngine,
    user: UserId,
    from: Option<NaiveDate>,
) -> ReportResult<WeeklyReport> {
    let week_starts_on = engine
        .store()
        .get_profile(user)
        .await?
        .map(|p| p.week_start)
        .unwrap_or_default();
    let start = from.unwrap_or_else(|| start_of_week(engine.calendar().today(), week_starts_on));
    let filter = DayFilter::Range {
        start: Some(start),
        end_exclusive: Some(start + Days::new(7)),
    };

    let assembled = engine.assemble(user, &filter).await?;
    let keys: Vec<String> = enumerate_days(start, 7).into_iter().map(to_date_key).collect();
    let series = build_series(&assembled, &keys, StoolMode::NullSentinel);

    Ok(WeeklyReport {
        days: series.days,
        symptoms: series.symptoms,
        stool: series.stool,
        custom_symptoms: series.custom_symptoms,
        well_being_index: series.well_being_index,
        habit_fulfillment: series.habit_fulfillment,
        week_start: to_date_key(start),
        week_starts_on,
    })
}
