//! Batched loading of a user's day records and every per-day fact.
//!
//! One query resolves the day records for the predicate; the fact tables are then
//! read with one `day_id IN (...)` query each, concurrently. The result is a set
//! of lookup tables built once per request and dropped with it.

use std::collections::{BTreeSet, HashMap};

use diary_store::{
    CustomSymptom, CustomSymptomId, DayFilter, DayId, DayRecord, DiaryStore, Habit, HabitId,
    SymptomType, UserId,
};

use crate::collation::TitleCollator;
use crate::dates::to_date_key;
use crate::error::ReportResult;

/// Everything a report needs about one user and one predicate.
#[derive(Debug, Default)]
pub struct Assembled {
    /// Day records ascending by date.
    pub days: Vec<DayRecord>,
    pub day_id_by_key: HashMap<String, DayId>,
    pub key_by_day_id: HashMap<DayId, String>,
    pub symptoms_by_type_by_key: HashMap<SymptomType, HashMap<String, i32>>,
    pub stool_by_day_id: HashMap<DayId, i32>,
    /// Habits ticked `true`, per day.
    pub ticks_done_by_day_id: HashMap<DayId, BTreeSet<HabitId>>,
    /// Currently active habits visible to the user, regardless of the predicate.
    pub active_habit_count: usize,
    /// All habits visible to the user (global and own), in sort order.
    pub habits: Vec<Habit>,
    /// Active custom symptom definitions in title collation order.
    pub custom_defs: Vec<CustomSymptom>,
    pub custom_scores_by_def_by_key: HashMap<CustomSymptomId, HashMap<String, i32>>,
}

impl Assembled {
    pub fn day_ids(&self) -> Vec<DayId> {
        self.days.iter().map(|d| d.id).collect()
    }

    /// Date keys of the assembled day records, ascending.
    pub fn day_keys(&self) -> Vec<String> {
        self.days.iter().map(|d| to_date_key(d.date)).collect()
    }

    pub fn day_for_key(&self, key: &str) -> Option<DayId> {
        self.day_id_by_key.get(key).copied()
    }

    pub fn symptom(&self, symptom: SymptomType, key: &str) -> Option<i32> {
        self.symptoms_by_type_by_key
            .get(&symptom)
            .and_then(|by_key| by_key.get(key))
            .copied()
    }

    pub fn custom_score(&self, def: CustomSymptomId, key: &str) -> Option<i32> {
        self.custom_scores_by_def_by_key
            .get(&def)
            .and_then(|by_key| by_key.get(key))
            .copied()
    }

    /// Raw stored stool value for the day behind `key`.
    pub fn stool_raw(&self, key: &str) -> Option<i32> {
        self.day_for_key(key)
            .and_then(|id| self.stool_by_day_id.get(&id))
            .copied()
    }

    pub fn ticks_done(&self, day_id: DayId) -> Option<&BTreeSet<HabitId>> {
        self.ticks_done_by_day_id.get(&day_id)
    }

    pub fn ticks_done_count(&self, day_id: DayId) -> usize {
        self.ticks_done(day_id).map_or(0, BTreeSet::len)
    }

    /// User-owned habits that are still active, in sort order.
    pub fn own_active_habits(&self) -> impl Iterator<Item = &Habit> {
        self.habits
            .iter()
            .filter(|h| h.user_id.is_some() && h.is_active)
    }
}

/// Load the day records matching `filter` and all their facts.
pub async fn assemble(
    store: &dyn DiaryStore,
    collator: &TitleCollator,
    user: UserId,
    filter: &DayFilter,
) -> ReportResult<Assembled> {
    let mut days = store.list_days(user, filter).await?;
    days.sort_by_key(|d| d.date);
    let ids: Vec<DayId> = days.iter().map(|d| d.id).collect();

    let (symptom_rows, stool_rows, tick_rows, custom_rows, custom_defs, habits) = tokio::try_join!(
        store.list_symptom_scores(&ids),
        store.list_stool_scores(&ids),
        store.list_habit_ticks(&ids),
        store.list_custom_symptom_scores(&ids),
        store.list_custom_symptoms(user),
        store.list_habits(user),
    )?;

    tracing::debug!(
        %user,
        days = days.len(),
        symptom_rows = symptom_rows.len(),
        stool_rows = stool_rows.len(),
        tick_rows = tick_rows.len(),
        custom_rows = custom_rows.len(),
        "assembled day facts"
    );

    let mut day_id_by_key = HashMap::with_capacity(days.len());
    let mut key_by_day_id = HashMap::with_capacity(days.len());
    for day in &days {
        let key = to_date_key(day.date);
        day_id_by_key.insert(key.clone(), day.id);
        key_by_day_id.insert(day.id, key);
    }

    let mut symptoms_by_type_by_key: HashMap<SymptomType, HashMap<String, i32>> = HashMap::new();
    for row in symptom_rows {
        if let Some(key) = key_by_day_id.get(&row.day_id) {
            symptoms_by_type_by_key
                .entry(row.symptom)
                .or_default()
                .insert(key.clone(), row.score);
        }
    }

    let stool_by_day_id = stool_rows
        .into_iter()
        .map(|row| (row.day_id, row.value))
        .collect();

    let mut ticks_done_by_day_id: HashMap<DayId, BTreeSet<HabitId>> = HashMap::new();
    for tick in tick_rows.into_iter().filter(|t| t.checked) {
        ticks_done_by_day_id
            .entry(tick.day_id)
            .or_default()
            .insert(tick.habit_id);
    }

    let mut custom_scores_by_def_by_key: HashMap<CustomSymptomId, HashMap<String, i32>> =
        HashMap::new();
    for row in custom_rows {
        if let Some(key) = key_by_day_id.get(&row.day_id) {
            custom_scores_by_def_by_key
                .entry(row.custom_symptom_id)
                .or_default()
                .insert(key.clone(), row.score);
        }
    }

    let mut custom_defs: Vec<CustomSymptom> =
        custom_defs.into_iter().filter(|c| c.is_active).collect();
    collator.sort_by_title(&mut custom_defs, |c| c.title.as_str());

    let mut habits = habits;
    habits.sort_by(|a, b| {
        a.sort_index
            .cmp(&b.sort_index)
            .then_with(|| collator.compare(&a.title, &b.title))
    });
    let active_habit_count = habits.iter().filter(|h| h.is_active).count();

    Ok(Assembled {
        days,
        day_id_by_key,
        key_by_day_id,
        symptoms_by_type_by_key,
        stool_by_day_id,
        ticks_done_by_day_id,
        active_habit_count,
        habits,
        custom_defs,
        custom_scores_by_def_by_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemoryStore, d, fixture_user};
    use diary_store::Phase;

    #[tokio::test]
    async fn builds_both_indices_and_fact_maps() {
        let mut store = MemoryStore::new();
        let day = store.day("2025-03-04", Phase::Phase2);
        store.symptom(day, SymptomType::Nausea, 7);
        store.stool(day, 4);
        let walk = store.habit("Walk", false, true);
        let tea = store.habit("Tea", true, true);
        store.tick(day, walk, true);
        store.tick(day, tea, false);

        let a = assemble(&store, &TitleCollator, fixture_user(), &DayFilter::All)
            .await
            .expect("assembled");

        assert_eq!(a.day_for_key("2025-03-04"), Some(day));
        assert_eq!(a.key_by_day_id.get(&day).map(String::as_str), Some("2025-03-04"));
        assert_eq!(a.symptom(SymptomType::Nausea, "2025-03-04"), Some(7));
        assert_eq!(a.symptom(SymptomType::Sleep, "2025-03-04"), None);
        assert_eq!(a.stool_raw("2025-03-04"), Some(4));
        assert_eq!(a.ticks_done_count(day), 1);
        assert_eq!(a.active_habit_count, 2);
        assert_eq!(a.own_active_habits().count(), 1);
    }

    #[tokio::test]
    async fn issues_one_query_per_fact_type() {
        let mut store = MemoryStore::new();
        for i in 1..=30 {
            let day = store.day(&format!("2025-04-{i:02}"), Phase::Phase1);
            store.symptom(day, SymptomType::Mood, 5);
            store.stool(day, 3);
        }

        let a = assemble(&store, &TitleCollator, fixture_user(), &DayFilter::All)
            .await
            .expect("assembled");
        assert_eq!(a.days.len(), 30);
        // days + symptoms + stool + ticks + custom scores + custom defs + habits
        assert_eq!(store.query_count(), 7);
    }

    #[tokio::test]
    async fn active_habit_count_ignores_the_date_range() {
        let mut store = MemoryStore::new();
        store.day("2025-01-01", Phase::Phase1);
        store.habit("Walk", false, true);
        store.habit("Stretch", true, true);
        store.habit("Retired", true, false);

        let filter = DayFilter::Range {
            start: Some(d("2030-01-01")),
            end_exclusive: None,
        };
        let a = assemble(&store, &TitleCollator, fixture_user(), &filter)
            .await
            .expect("assembled");
        assert!(a.days.is_empty());
        assert_eq!(a.active_habit_count, 2);
    }

    #[tokio::test]
    async fn custom_defs_are_active_only_and_collated() {
        let mut store = MemoryStore::new();
        store.custom("zittern", true);
        store.custom("Übelkeit", true);
        store.custom("Aufstoßen", true);
        store.custom("Ohrensausen", false);

        let a = assemble(&store, &TitleCollator, fixture_user(), &DayFilter::All)
            .await
            .expect("assembled");
        let titles: Vec<&str> = a.custom_defs.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Aufstoßen", "Übelkeit", "zittern"]);
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let store = MemoryStore::failing();
        let res = assemble(&store, &TitleCollator, fixture_user(), &DayFilter::All).await;
        assert!(matches!(res, Err(crate::error::ReportError::Store(_))));
    }
}
