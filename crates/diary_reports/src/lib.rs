//! Reporting and export engine for the health diary.
//!
//! A request flows through one pipeline: [`assembly`] batch-loads the user's
//! day records and facts for a predicate, [`series`] projects them onto date
//! keys, [`stats`] reduces series to scalars, and the [`domains`] views and
//! [`export`] renderers pick what to expose.

use std::sync::Arc;

use diary_store::{DayFilter, DiaryStore, UserId};

pub mod assembly;
pub mod collation;
pub mod config;
pub mod dates;
pub mod domains;
pub mod error;
pub mod export;
pub mod middleware;
pub mod routes;
pub mod series;
pub mod session;
pub mod stats;

#[cfg(test)]
mod test_utils;

use crate::assembly::Assembled;
use crate::collation::TitleCollator;
use crate::dates::LocalCalendar;
use crate::error::ReportResult;

pub use crate::error::ReportError;

/// Shared, immutable dependencies of every report: the store handle, the
/// calendar that defines "today", and the title collator.
#[derive(Clone)]
pub struct ReportEngine {
    store: Arc<dyn DiaryStore>,
    calendar: LocalCalendar,
    collator: TitleCollator,
}

impl std::fmt::Debug for ReportEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportEngine")
            .field("calendar", &self.calendar)
            .finish_non_exhaustive()
    }
}

impl ReportEngine {
    pub fn new(store: Arc<dyn DiaryStore>, calendar: LocalCalendar, collator: TitleCollator) -> Self {
        Self {
            store,
            calendar,
            collator,
        }
    }

    pub fn store(&self) -> &dyn DiaryStore {
        self.store.as_ref()
    }

    pub fn calendar(&self) -> &LocalCalendar {
        &self.calendar
    }

    pub fn collator(&self) -> &TitleCollator {
        &self.collator
    }

    pub async fn assemble(&self, user: UserId, filter: &DayFilter) -> ReportResult<Assembled> {
        assembly::assemble(self.store(), &self.collator, user, filter).await
    }
}
