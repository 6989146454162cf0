//! PostgREST-style HTTP implementation of [`DiaryStore`](crate::DiaryStore).
//!
//! Every table is read with a single `GET /rest/v1/<table>` carrying the filter as
//! query parameters. Lookups by day id use an `in.(...)` filter; very large id
//! sets are split into chunks so the URL stays within common proxy limits.
//!
//! Servers cap the rows of a single reply (`max-rows`), so every select asks
//! for an exact count and keeps requesting further offsets until the
//! `Content-Range` total is reached.

use crate::config::Config;
use crate::utils::{day_filter_params, eq, in_list};
use crate::{
    CustomSymptom, CustomSymptomScore, DayFilter, DayId, DayRecord, DiaryStore, Habit, HabitTick,
    Note, Profile, Reflection, StoolScore, StoreError, SymptomScore, UserId,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;

const MAX_IDS_PER_REQUEST: usize = 150;

/// Client for the diary's REST data API using reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestDiaryStore {
    base_url: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl ReqwestDiaryStore {
    /// Create a new store handle.
    ///
    /// # Arguments
    /// * `base_url` - Root of the data API (e.g. "https://db.example.org")
    /// * `api_key` - Service key sent as `apikey` and bearer token
    /// * `timeout` - Per-request timeout
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        Self::new(&config.base_url, config.api_key.clone(), config.timeout)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Build an authenticated GET request for a table.
    fn get_request(&self, table: &str) -> reqwest::RequestBuilder {
        let key = self.api_key.expose_secret();
        self.client
            .get(self.table_url(table))
            .header("apikey", key)
            .bearer_auth(key)
            .header("Accept", "application/json")
            .header("Prefer", "count=exact")
    }

    /// Execute a request and decode a JSON array of rows, together with the
    /// total row count the server reported, if any.
    async fn execute_rows<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(Vec<T>, Option<usize>), StoreError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        let total = resp
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(content_range_total);
        let bytes = resp.bytes().await?;
        let rows = serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok((rows, total))
    }

    /// Extract error information from a failed response.
    async fn error_from_response(resp: reqwest::Response) -> StoreError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        StoreError::Status {
            status,
            body: body.chars().take(256).collect(),
        }
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let mut rows: Vec<T> = Vec::new();
        loop {
            let mut page_params = params.to_vec();
            page_params.push(("offset", rows.len().to_string()));
            tracing::trace!(table, ?page_params, "select");
            let (page, total): (Vec<T>, _) = self
                .execute_rows(self.get_request(table).query(&page_params))
                .await?;
            let fetched = page.len();
            rows.extend(page);
            match total {
                Some(total) if fetched > 0 && rows.len() < total => {
                    tracing::debug!(table, fetched = rows.len(), total, "reply truncated, fetching next page");
                }
                _ => break,
            }
        }
        Ok(rows)
    }

    /// Select rows whose `day_id` is in `day_ids`. An empty id set never hits
    /// the network.
    async fn select_by_day_ids<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        day_ids: &[DayId],
        order: Option<&str>,
    ) -> Result<Vec<T>, StoreError> {
        let mut rows = Vec::new();
        for chunk in day_ids.chunks(MAX_IDS_PER_REQUEST) {
            let mut params = vec![
                ("select", columns.to_string()),
                ("day_id", in_list(chunk)),
            ];
            if let Some(order) = order {
                params.push(("order", order.to_string()));
            }
            rows.extend(self.select::<T>(table, &params).await?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl DiaryStore for ReqwestDiaryStore {
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StoreError> {
        let params = [
            ("select", "id,week_start".to_string()),
            ("id", eq(user)),
            ("limit", "1".to_string()),
        ];
        let rows: Vec<Profile> = self.select("profiles", &params).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_days(
        &self,
        user: UserId,
        filter: &DayFilter,
    ) -> Result<Vec<DayRecord>, StoreError> {
        let mut params = vec![
            ("select", "id,user_id,date,phase,care,note".to_string()),
            ("user_id", eq(user)),
        ];
        params.extend(day_filter_params(filter));
        params.push(("order", "date.asc".to_string()));
        self.select("days", &params).await
    }

    async fn list_symptom_scores(
        &self,
        day_ids: &[DayId],
    ) -> Result<Vec<SymptomScore>, StoreError> {
        self.select_by_day_ids("symptom_scores", "day_id,symptom,score", day_ids, None)
            .await
    }

    async fn list_stool_scores(&self, day_ids: &[DayId]) -> Result<Vec<StoolScore>, StoreError> {
        self.select_by_day_ids("stool_scores", "day_id,value", day_ids, None)
            .await
    }

    async fn list_habit_ticks(&self, day_ids: &[DayId]) -> Result<Vec<HabitTick>, StoreError> {
        self.select_by_day_ids("habit_ticks", "day_id,habit_id,checked", day_ids, None)
            .await
    }

    async fn list_custom_symptom_scores(
        &self,
        day_ids: &[DayId],
    ) -> Result<Vec<CustomSymptomScore>, StoreError> {
        self.select_by_day_ids(
            "custom_symptom_scores",
            "day_id,custom_symptom_id,score",
            day_ids,
            None,
        )
        .await
    }

    async fn list_custom_symptoms(&self, user: UserId) -> Result<Vec<CustomSymptom>, StoreError> {
        let params = [
            ("select", "id,user_id,title,is_active,sort_index".to_string()),
            ("user_id", eq(user)),
            ("order", "sort_index.asc".to_string()),
        ];
        self.select("custom_symptoms", &params).await
    }

    async fn list_habits(&self, user: UserId) -> Result<Vec<Habit>, StoreError> {
        let params = [
            ("select", "id,user_id,title,is_active,sort_index".to_string()),
            ("or", format!("(user_id.is.null,user_id.eq.{user})")),
            ("order", "sort_index.asc".to_string()),
        ];
        self.select("habits", &params).await
    }

    async fn list_reflections(&self, user: UserId) -> Result<Vec<Reflection>, StoreError> {
        let params = [
            ("select", "id,created_at,kind".to_string()),
            ("user_id", eq(user)),
            ("order", "created_at.asc".to_string()),
        ];
        self.select("reflections", &params).await
    }

    async fn list_notes(&self, day_ids: &[DayId]) -> Result<Vec<Note>, StoreError> {
        self.select_by_day_ids(
            "notes",
            "id,day_id,created_at,text,photo_urls",
            day_ids,
            Some("created_at.asc"),
        )
        .await
    }
}

/// Total from a `Content-Range` value such as `0-999/1050` or `*/0`. An
/// unknown total (`*`) yields `None`.
fn content_range_total(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_range_totals() {
        assert_eq!(content_range_total("0-999/1050"), Some(1050));
        assert_eq!(content_range_total("*/0"), Some(0));
        assert_eq!(content_range_total("0-24/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[test]
    fn new_trims_trailing_slash() {
        let store = ReqwestDiaryStore::new(
            "http://localhost/",
            SecretString::new("key".into()),
            Duration::from_secs(1),
        )
        .expect("store");
        assert_eq!(store.table_url("days"), "http://localhost/rest/v1/days");
    }
}
