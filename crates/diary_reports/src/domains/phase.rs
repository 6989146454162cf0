use diary_store::{DayFilter, Phase, UserId};
use serde::Serialize;

use crate::ReportEngine;
use crate::error::ReportResult;
use crate::series::{Series, StoolMode, build_series};
use crate::stats::{PhaseStats, phase_stats};

#[derive(Debug, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    #[serde(flatten)]
    pub stats: PhaseStats,
    #[serde(flatten)]
    pub series: Series,
}

/// Unknown or missing phase names select the first phase.
pub fn parse_phase(raw: Option<&str>) -> Phase {
    raw.and_then(Phase::parse).unwrap_or_default()
}

/// All recorded days of one phase with per-symptom statistics.
pub async fn phase_report(
    engine: &ReportEngine,
    user: UserId,
    phase: Phase,
) -> ReportResult<PhaseReport> {
    let assembled = engine.assemble(user, &DayFilter::Phase(phase)).await?;
    let series = build_series(&assembled, &assembled.day_keys(), StoolMode::Raw);
    Ok(PhaseReport {
        phase,
        stats: phase_stats(&series),
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemoryStore, engine_at, fixture_user};
    use diary_store::{STOOL_NONE, SymptomType};
    use std::sync::Arc;

    #[test]
    fn phase_param_falls_back_to_first_phase() {
        assert_eq!(parse_phase(Some("PHASE_3")), Phase::Phase3);
        assert_eq!(parse_phase(Some("phase_9")), Phase::Phase1);
        assert_eq!(parse_phase(None), Phase::Phase1);
    }

    #[tokio::test]
    async fn aggregates_only_days_of_the_phase() {
        let mut store = MemoryStore::with_three_days();
        let other = store.day("2025-03-04", Phase::Phase2);
        store.symptom(other, SymptomType::Bloating, 10);

        let engine = engine_at(Arc::new(store), "2025-03-10");
        let report = phase_report(&engine, fixture_user(), Phase::Phase1)
            .await
            .expect("report");

        assert_eq!(report.series.days, vec!["2025-03-01", "2025-03-02", "2025-03-03"]);
        let bloating = report.stats.stats[&SymptomType::Bloating];
        assert_eq!(bloating.avg, Some(5.0));
        assert_eq!(bloating.min, Some(4));
        assert_eq!(bloating.max, Some(6));
        assert_eq!(report.stats.stats[&SymptomType::Mood].avg, None);
    }

    #[tokio::test]
    async fn passes_raw_stool_through() {
        let mut store = MemoryStore::new();
        let a = store.day("2025-03-01", Phase::Phase1);
        let b = store.day("2025-03-02", Phase::Phase1);
        store.stool(a, STOOL_NONE);
        store.stool(b, 4);

        let engine = engine_at(Arc::new(store), "2025-03-10");
        let report = phase_report(&engine, fixture_user(), Phase::Phase1)
            .await
            .expect("report");
        assert_eq!(report.series.stool, vec![Some(99), Some(4)]);
        assert_eq!(report.stats.stool_avg, Some(4.0));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["phase"], "PHASE_1");
        assert_eq!(json["stool"][0], 99);
        assert_eq!(json["stoolAvg"], 4.0);
        assert!(json["habitFulfillmentAvg"].is_null());
        assert_eq!(json["stats"]["BLOATING"]["avg"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn empty_phase_has_empty_series() {
        let engine = engine_at(Arc::new(MemoryStore::new()), "2025-03-10");
        let report = phase_report(&engine, fixture_user(), Phase::Phase2)
            .await
            .expect("report");
        assert!(report.series.days.is_empty());
        assert_eq!(report.stats.stool_avg, None);
    }
}
