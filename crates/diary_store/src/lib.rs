//! Read-only access to the diary's persisted records.
//!
//! The reporting engine only ever reads. Every list operation that takes a set of
//! day ids is a single batched lookup (`day_id IN (...)`), so callers can assemble
//! a whole date range with a constant number of round trips.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod config;
pub mod http_client;
pub mod utils;

pub type UserId = Uuid;
pub type DayId = Uuid;
pub type HabitId = Uuid;
pub type CustomSymptomId = Uuid;

/// Stored stool value meaning "no stool that day".
pub const STOOL_NONE: i32 = 99;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("decode error: {0}")]
    Decode(String),
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Phase {
    #[default]
    #[serde(rename = "PHASE_1")]
    Phase1,
    #[serde(rename = "PHASE_2")]
    Phase2,
    #[serde(rename = "PHASE_3")]
    Phase3,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Phase1, Phase::Phase2, Phase::Phase3];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Phase1 => "PHASE_1",
            Phase::Phase2 => "PHASE_2",
            Phase::Phase3 => "PHASE_3",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CareCategory {
    Standard,
    Intensive,
    Recovery,
}

impl CareCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            CareCategory::Standard => "STANDARD",
            CareCategory::Intensive => "INTENSIVE",
            CareCategory::Recovery => "RECOVERY",
        }
    }
}

/// The seven built-in symptom kinds. Declaration order is the output order of
/// every report and export.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymptomType {
    Bloating,
    AbdominalPain,
    Flatulence,
    Nausea,
    Fatigue,
    Mood,
    Sleep,
}

impl SymptomType {
    pub const ALL: [SymptomType; 7] = [
        SymptomType::Bloating,
        SymptomType::AbdominalPain,
        SymptomType::Flatulence,
        SymptomType::Nausea,
        SymptomType::Fatigue,
        SymptomType::Mood,
        SymptomType::Sleep,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SymptomType::Bloating => "BLOATING",
            SymptomType::AbdominalPain => "ABDOMINAL_PAIN",
            SymptomType::Flatulence => "FLATULENCE",
            SymptomType::Nausea => "NAUSEA",
            SymptomType::Fatigue => "FATIGUE",
            SymptomType::Mood => "MOOD",
            SymptomType::Sleep => "SLEEP",
        }
    }

    /// Human readable label used in exports.
    pub fn label(self) -> &'static str {
        match self {
            SymptomType::Bloating => "Bloating",
            SymptomType::AbdominalPain => "Abdominal pain",
            SymptomType::Flatulence => "Flatulence",
            SymptomType::Nausea => "Nausea",
            SymptomType::Fatigue => "Fatigue",
            SymptomType::Mood => "Mood",
            SymptomType::Sleep => "Sleep",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum WeekStart {
    #[default]
    Mon,
    Sun,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DayRecord {
    pub id: DayId,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub phase: Phase,
    pub care: CareCategory,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SymptomScore {
    pub day_id: DayId,
    pub symptom: SymptomType,
    pub score: i32,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct StoolScore {
    pub day_id: DayId,
    pub value: i32,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Habit {
    pub id: HabitId,
    /// `None` for the built-in habits every user sees.
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub title: String,
    pub is_active: bool,
    #[serde(default)]
    pub sort_index: i32,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct HabitTick {
    pub day_id: DayId,
    pub habit_id: HabitId,
    pub checked: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CustomSymptom {
    pub id: CustomSymptomId,
    pub user_id: UserId,
    pub title: String,
    pub is_active: bool,
    #[serde(default)]
    pub sort_index: i32,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CustomSymptomScore {
    pub day_id: DayId,
    pub custom_symptom_id: CustomSymptomId,
    pub score: i32,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Reflection {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub kind: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Note {
    pub id: Uuid,
    pub day_id: DayId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub week_start: WeekStart,
}

/// Which day records a report covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DayFilter {
    /// Everything the user ever recorded.
    All,
    /// `start <= date < end_exclusive`; an open side is unbounded.
    Range {
        start: Option<NaiveDate>,
        end_exclusive: Option<NaiveDate>,
    },
    Phase(Phase),
}

#[async_trait]
pub trait DiaryStore: Send + Sync + 'static {
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StoreError>;

    /// Day records matching `filter`, ascending by date.
    async fn list_days(&self, user: UserId, filter: &DayFilter)
    -> Result<Vec<DayRecord>, StoreError>;

    async fn list_symptom_scores(&self, day_ids: &[DayId])
    -> Result<Vec<SymptomScore>, StoreError>;

    async fn list_stool_scores(&self, day_ids: &[DayId]) -> Result<Vec<StoolScore>, StoreError>;

    async fn list_habit_ticks(&self, day_ids: &[DayId]) -> Result<Vec<HabitTick>, StoreError>;

    async fn list_custom_symptom_scores(
        &self,
        day_ids: &[DayId],
    ) -> Result<Vec<CustomSymptomScore>, StoreError>;

    /// All custom symptom definitions of the user, active or not.
    async fn list_custom_symptoms(&self, user: UserId) -> Result<Vec<CustomSymptom>, StoreError>;

    /// Global habits plus the user's own, active or not.
    async fn list_habits(&self, user: UserId) -> Result<Vec<Habit>, StoreError>;

    async fn list_reflections(&self, user: UserId) -> Result<Vec<Reflection>, StoreError>;

    /// Timestamped notes for the given days, oldest first.
    async fn list_notes(&self, day_ids: &[DayId]) -> Result<Vec<Note>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn day_record_deserializes_store_row() {
        let row = json!({
            "id": "0b6f3c1e-2a4d-4f4e-9a55-1f2b3c4d5e6f",
            "user_id": "7c1d2e3f-4a5b-4c6d-8e7f-9a0b1c2d3e4f",
            "date": "2025-03-04",
            "phase": "PHASE_2",
            "care": "INTENSIVE"
        });
        let day: DayRecord = serde_json::from_value(row).expect("day");
        assert_eq!(day.phase, Phase::Phase2);
        assert_eq!(day.care, CareCategory::Intensive);
        assert_eq!(day.date, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
        assert!(day.note.is_none());
    }

    #[test]
    fn symptom_type_serializes_screaming_snake() {
        let v = serde_json::to_value(SymptomType::AbdominalPain).unwrap();
        assert_eq!(v, json!("ABDOMINAL_PAIN"));
        for s in SymptomType::ALL {
            assert_eq!(serde_json::to_value(s).unwrap(), json!(s.as_str()));
        }
    }

    #[test]
    fn phase_parse_matches_wire_names() {
        assert_eq!(Phase::parse("PHASE_3"), Some(Phase::Phase3));
        assert_eq!(Phase::parse("phase_3"), None);
        assert_eq!(Phase::default(), Phase::Phase1);
    }

    #[test]
    fn profile_defaults_to_monday_week() {
        let p: Profile =
            serde_json::from_value(json!({"id": "7c1d2e3f-4a5b-4c6d-8e7f-9a0b1c2d3e4f"})).unwrap();
        assert_eq!(p.week_start, WeekStart::Mon);
    }
}
