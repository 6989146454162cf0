use diary_store::{DayFilter, UserId};
use serde::Serialize;
use uuid::Uuid;

use crate::ReportEngine;
use crate::error::{ReportError, ReportResult};
use crate::series::{Series, StoolMode, build_series};

/// A reflection placed on the calendar.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    pub id: Uuid,
    pub date: String,
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryReport {
    #[serde(flatten)]
    pub series: Series,
    pub markers: Vec<Marker>,
}

pub async fn history_report(engine: &ReportEngine, user: UserId) -> ReportResult<HistoryReport> {
    let (assembled, mut reflections) = tokio::try_join!(
        engine.assemble(user, &DayFilter::All),
        async {
            engine
                .store()
                .list_reflections(user)
                .await
                .map_err(ReportError::from)
        },
    )?;

    reflections.sort_by_key(|r| r.created_at);
    let markers = reflections
        .into_iter()
        .map(|r| Marker {
            id: r.id,
            date: engine.calendar().date_key_of(r.created_at),
            kind: r.kind,
        })
        .collect();

    let series = build_series(&assembled, &assembled.day_keys(), StoolMode::Raw);
    Ok(HistoryReport { series, markers })
}
