use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use diary_store::{DayFilter, SymptomType, UserId};
use serde::Serialize;

use crate::ReportEngine;
use crate::dates::{enumerate_days, to_date_key};
use crate::error::ReportResult;
use crate::series::{CustomSeries, StoolMode, YesterdaySnapshot, build_series, yesterday_snapshot};

pub const WINDOW_DAYS: usize = 7;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingReport {
    pub days: Vec<String>,
    pub symptoms: BTreeMap<SymptomType, Vec<Option<i32>>>,
    pub stool: Vec<Option<i32>>,
    pub custom_symptoms: Vec<CustomSeries>,
    pub yesterday: YesterdaySnapshot,
}

/// Seven consecutive days ending at `to` (default: today).
pub async fn rolling_report(
    engine: &ReportEngine,
    user: UserId,
    to: Option<NaiveDate>,
) -> ReportResult<RollingReport> {
    let to = to.unwrap_or_else(|| engine.calendar().today());
    let start = to - Days::new(WINDOW_DAYS as u64 - 1);
    let filter = DayFilter::Range {
        start: Some(start),
        end_exclusive: Some(to + Days::new(1)),
    };

    let assembled = engine.assemble(user, &filter).await?;
    let keys: Vec<String> = enumerate_days(start, WINDOW_DAYS)
        .into_iter()
        .map(to_date_key)
        .collect();
    let series = build_series(&assembled, &keys, StoolMode::NullSentinel);
    let yesterday = yesterday_snapshot(
        &assembled,
        &to_date_key(to - Days::new(1)),
        StoolMode::NullSentinel,
    );

    Ok(RollingReport {
        days: series.days,
        symptoms: series.symptoms,
        stool: series.stool,
        custom_symptoms: series.custom_symptoms,
        yesterday,
    })
}
