//! Shared test fixtures: an in-memory [`DiaryStore`] that counts its queries.
#![cfg(test)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use diary_store::{
    CareCategory, CustomSymptom, CustomSymptomId, CustomSymptomScore, DayFilter, DayId, DayRecord,
    DiaryStore, Habit, HabitId, HabitTick, Note, Phase, Profile, Reflection, StoolScore,
    StoreError, SymptomScore, SymptomType, UserId, WeekStart,
};

use crate::ReportEngine;
use crate::collation::TitleCollator;
use crate::dates::{FixedClock, LocalCalendar};

pub fn fixture_user() -> UserId {
    Uuid::parse_str("7c1d2e3f-4a5b-4c6d-8e7f-9a0b1c2d3e4f").unwrap()
}

pub fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Noon UTC on the given date.
pub fn noon(s: &str) -> DateTime<Utc> {
    let date = d(s);
    Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
}

/// Engine over `store` whose "today" is `today` in Europe/Berlin.
pub fn engine_at(store: Arc<MemoryStore>, today: &str) -> ReportEngine {
    let calendar = LocalCalendar::new(Arc::new(FixedClock(noon(today))), chrono_tz::Europe::Berlin);
    ReportEngine::new(store, calendar, TitleCollator)
}

#[derive(Default)]
pub struct MemoryStore {
    pub profiles: Vec<Profile>,
    pub days: Vec<DayRecord>,
    pub symptom_scores: Vec<SymptomScore>,
    pub stool_scores: Vec<StoolScore>,
    pub habit_ticks: Vec<HabitTick>,
    pub custom_symptoms: Vec<CustomSymptom>,
    pub custom_scores: Vec<CustomSymptomScore>,
    pub habits: Vec<Habit>,
    pub reflections: Vec<Reflection>,
    pub notes: Vec<Note>,
    fail: bool,
    queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every query fails as if the backend were down.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Three phase-1 days, 2025-03-01..03, with bloating scored 4, 6 and
    /// missing.
    pub fn with_three_days() -> Self {
        let mut store = Self::new();
        let d1 = store.day("2025-03-01", Phase::Phase1);
        let d2 = store.day("2025-03-02", Phase::Phase1);
        store.day("2025-03-03", Phase::Phase1);
        store.symptom(d1, SymptomType::Bloating, 4);
        store.symptom(d2, SymptomType::Bloating, 6);
        store
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn week_start(&mut self, week_start: WeekStart) {
        self.profiles.push(Profile {
            id: fixture_user(),
            week_start,
        });
    }

    pub fn day(&mut self, date: &str, phase: Phase) -> DayId {
        self.day_with(date, phase, CareCategory::Standard, None)
    }

    pub fn day_with(
        &mut self,
        date: &str,
        phase: Phase,
        care: CareCategory,
        note: Option<&str>,
    ) -> DayId {
        let id = Uuid::new_v4();
        self.days.push(DayRecord {
            id,
            user_id: fixture_user(),
            date: d(date),
            phase,
            care,
            note: note.map(str::to_string),
        });
        id
    }

    pub fn symptom(&mut self, day_id: DayId, symptom: SymptomType, score: i32) {
        self.symptom_scores.push(SymptomScore {
            day_id,
            symptom,
            score,
        });
    }

    pub fn stool(&mut self, day_id: DayId, value: i32) {
        self.stool_scores.push(StoolScore { day_id, value });
    }

    pub fn habit(&mut self, title: &str, own: bool, active: bool) -> HabitId {
        let id = Uuid::new_v4();
        let sort_index = self.habits.len() as i32;
        self.habits.push(Habit {
            id,
            user_id: own.then(fixture_user),
            title: title.to_string(),
            is_active: active,
            sort_index,
        });
        id
    }

    pub fn tick(&mut self, day_id: DayId, habit_id: HabitId, checked: bool) {
        self.habit_ticks.push(HabitTick {
            day_id,
            habit_id,
            checked,
        });
    }

    pub fn custom(&mut self, title: &str, active: bool) -> CustomSymptomId {
        let id = Uuid::new_v4();
        let sort_index = self.custom_symptoms.len() as i32;
        self.custom_symptoms.push(CustomSymptom {
            id,
            user_id: fixture_user(),
            title: title.to_string(),
            is_active: active,
            sort_index,
        });
        id
    }

    pub fn custom_score(&mut self, day_id: DayId, custom_symptom_id: CustomSymptomId, score: i32) {
        self.custom_scores.push(CustomSymptomScore {
            day_id,
            custom_symptom_id,
            score,
        });
    }

    pub fn reflection(&mut self, created_at: DateTime<Utc>, kind: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.reflections.push(Reflection {
            id,
            created_at,
            kind: kind.to_string(),
        });
        id
    }

    pub fn note(&mut self, day_id: DayId, created_at: DateTime<Utc>, text: &str, photos: &[&str]) {
        self.notes.push(Note {
            id: Uuid::new_v4(),
            day_id,
            created_at,
            text: Some(text.to_string()),
            photo_urls: photos.iter().map(|p| p.to_string()).collect(),
        });
    }

    fn begin(&self) -> Result<(), StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::Status {
                status: 503,
                body: "store unavailable".into(),
            });
        }
        Ok(())
    }
}

fn by_day<T: Clone>(rows: &[T], day_ids: &[DayId], day_of: impl Fn(&T) -> DayId) -> Vec<T> {
    rows.iter()
        .filter(|r| day_ids.contains(&day_of(r)))
        .cloned()
        .collect()
}

#[async_trait]
impl DiaryStore for MemoryStore {
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StoreError> {
        self.begin()?;
        Ok(self.profiles.iter().find(|p| p.id == user).cloned())
    }

    async fn list_days(
        &self,
        user: UserId,
        filter: &DayFilter,
    ) -> Result<Vec<DayRecord>, StoreError> {
        self.begin()?;
        let mut days: Vec<DayRecord> = self
            .days
            .iter()
            .filter(|day| day.user_id == user)
            .filter(|day| match filter {
                DayFilter::All => true,
                DayFilter::Range {
                    start,
                    end_exclusive,
                } => {
                    start.is_none_or(|s| day.date >= s)
                        && end_exclusive.is_none_or(|e| day.date < e)
                }
                DayFilter::Phase(phase) => day.phase == *phase,
            })
            .cloned()
            .collect();
        days.sort_by_key(|day| day.date);
        Ok(days)
    }

    async fn list_symptom_scores(
        &self,
        day_ids: &[DayId],
    ) -> Result<Vec<SymptomScore>, StoreError> {
        self.begin()?;
        Ok(by_day(&self.symptom_scores, day_ids, |r| r.day_id))
    }

    async fn list_stool_scores(&self, day_ids: &[DayId]) -> Result<Vec<StoolScore>, StoreError> {
        self.begin()?;
        Ok(by_day(&self.stool_scores, day_ids, |r| r.day_id))
    }

    async fn list_habit_ticks(&self, day_ids: &[DayId]) -> Result<Vec<HabitTick>, StoreError> {
        self.begin()?;
        Ok(by_day(&self.habit_ticks, day_ids, |r| r.day_id))
    }

    async fn list_custom_symptom_scores(
        &self,
        day_ids: &[DayId],
    ) -> Result<Vec<CustomSymptomScore>, StoreError> {
        self.begin()?;
        Ok(by_day(&self.custom_scores, day_ids, |r| r.day_id))
    }

    async fn list_custom_symptoms(&self, user: UserId) -> Result<Vec<CustomSymptom>, StoreError> {
        self.begin()?;
        Ok(self
            .custom_symptoms
            .iter()
            .filter(|c| c.user_id == user)
            .cloned()
            .collect())
    }

    async fn list_habits(&self, user: UserId) -> Result<Vec<Habit>, StoreError> {
        self.begin()?;
        Ok(self
            .habits
            .iter()
            .filter(|h| h.user_id.is_none_or(|owner| owner == user))
            .cloned()
            .collect())
    }

    async fn list_reflections(&self, _user: UserId) -> Result<Vec<Reflection>, StoreError> {
        self.begin()?;
        Ok(self.reflections.clone())
    }

    async fn list_notes(&self, day_ids: &[DayId]) -> Result<Vec<Note>, StoreError> {
        self.begin()?;
        let mut notes = by_day(&self.notes, day_ids, |r| r.day_id);
        notes.sort_by_key(|n| n.created_at);
        Ok(notes)
    }
}
