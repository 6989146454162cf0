//! Logging and timing around store calls.
//!
//! Wraps any [`DiaryStore`] so report code never has to log its own queries:
//! every call is traced at debug level and its latency lands in the
//! `diary_store_request_duration_seconds` histogram, labelled by operation.

use std::sync::Arc;
use std::time::Instant;

use diary_store::{
    CustomSymptom, CustomSymptomScore, DayFilter, DayId, DayRecord, DiaryStore, Habit, HabitTick,
    Note, Profile, Reflection, StoolScore, StoreError, SymptomScore, UserId,
};
use tracing::debug;

#[derive(Clone)]
pub struct LoggingMiddleware<S: DiaryStore> {
    inner: Arc<S>,
}

impl<S: DiaryStore> LoggingMiddleware<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    async fn with_logging<F, Fut, T>(&self, operation: F, name: &'static str) -> Result<T, StoreError>
    where
        F: FnOnce(Arc<S>) -> Fut,
        Fut: std::future::Future<Output = Result<T, StoreError>>,
    {
        let start = Instant::now();
        debug!("Starting store operation: {}", name);

        let result = operation(self.inner.clone()).await;

        let duration = start.elapsed();
        metrics::histogram!("diary_store_request_duration_seconds", "op" => name)
            .record(duration.as_secs_f64());
        match &result {
            Ok(_) => debug!("Store operation completed: {} in {:?}", name, duration),
            Err(e) => debug!("Store operation failed: {} in {:?} - error: {}", name, duration, e),
        }

        result
    }
}

#[async_trait::async_trait]
impl<S: DiaryStore> DiaryStore for LoggingMiddleware<S> {
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StoreError> {
        self.with_logging(
            |store| async move { store.get_profile(user).await },
            "get_profile",
        )
        .await
    }

    async fn list_days(
        &self,
        user: UserId,
        filter: &DayFilter,
    ) -> Result<Vec<DayRecord>, StoreError> {
        self.with_logging(
            |store| async move { store.list_days(user, filter).await },
            "list_days",
        )
        .await
    }

    async fn list_symptom_scores(
        &self,
        day_ids: &[DayId],
    ) -> Result<Vec<SymptomScore>, StoreError> {
        self.with_logging(
            |store| async move { store.list_symptom_scores(day_ids).await },
            "list_symptom_scores",
        )
        .await
    }

    async fn list_stool_scores(&self, day_ids: &[DayId]) -> Result<Vec<StoolScore>, StoreError> {
        self.with_logging(
            |store| async move { store.list_stool_scores(day_ids).await },
            "list_stool_scores",
        )
        .await
    }

    async fn list_habit_ticks(&self, day_ids: &[DayId]) -> Result<Vec<HabitTick>, StoreError> {
        self.with_logging(
            |store| async move { store.list_habit_ticks(day_ids).await },
            "list_habit_ticks",
        )
        .await
    }

    async fn list_custom_symptom_scores(
        &self,
        day_ids: &[DayId],
    ) -> Result<Vec<CustomSymptomScore>, StoreError> {
        self.with_logging(
            |store| async move { store.list_custom_symptom_scores(day_ids).await },
            "list_custom_symptom_scores",
        )
        .await
    }

    async fn list_custom_symptoms(&self, user: UserId) -> Result<Vec<CustomSymptom>, StoreError> {
        self.with_logging(
            |store| async move { store.list_custom_symptoms(user).await },
            "list_custom_symptoms",
        )
        .await
    }

    async fn list_habits(&self, user: UserId) -> Result<Vec<Habit>, StoreError> {
        self.with_logging(
            |store| async move { store.list_habits(user).await },
            "list_habits",
        )
        .await
    }

    async fn list_reflections(&self, user: UserId) -> Result<Vec<Reflection>, StoreError> {
        self.with_logging(
            |store| async move { store.list_reflections(user).await },
            "list_reflections",
        )
        .await
    }

    async fn list_notes(&self, day_ids: &[DayId]) -> Result<Vec<Note>, StoreError> {
        self.with_logging(
            |store| async move { store.list_notes(day_ids).await },
            "list_notes",
        )
        .await
    }
}
