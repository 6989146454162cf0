//! File exports: a flat CSV table and a paginated PDF document.

use chrono::{Days, NaiveDate};
use diary_store::DayFilter;

use crate::dates::{month_range, to_date_key};

pub mod csv;
pub mod layout;
pub mod pdf;
pub mod photos;

pub use csv::{export_csv, render_csv};
pub use pdf::{PdfOptions, RenderedPdf, export_pdf};
pub use photos::{FsHttpPhotoSource, PhotoError, PhotoSource};

/// Day predicate for an export.
///
/// `from`/`to` are inclusive bounds and either may be open. `month`
/// (`YYYY-MM`) only applies when neither bound is given. With nothing usable
/// every recorded day is exported.
pub fn export_filter(from: Option<NaiveDate>, to: Option<NaiveDate>, month: Option<&str>) -> DayFilter {
    if from.is_some() || to.is_some() {
        return DayFilter::Range {
            start: from,
            end_exclusive: to.and_then(|t| t.checked_add_days(Days::new(1))),
        };
    }
    match month.and_then(month_range) {
        Some((first, next)) => DayFilter::Range {
            start: Some(first),
            end_exclusive: Some(next),
        },
        None => DayFilter::All,
    }
}

/// `diary-export-<today>.<ext>`
pub fn export_filename(today: NaiveDate, ext: &str) -> String {
    format!("diary-export-{}.{ext}", to_date_key(today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::d;

    #[test]
    fn inclusive_bounds_become_half_open() {
        assert_eq!(
            export_filter(Some(d("2025-03-01")), Some(d("2025-03-31")), Some("2024-01")),
            DayFilter::Range {
                start: Some(d("2025-03-01")),
                end_exclusive: Some(d("2025-04-01")),
            }
        );
        assert_eq!(
            export_filter(None, Some(d("2025-03-31")), None),
            DayFilter::Range {
                start: None,
                end_exclusive: Some(d("2025-04-01")),
            }
        );
    }

    #[test]
    fn month_applies_without_bounds() {
        assert_eq!(
            export_filter(None, None, Some("2024-12")),
            DayFilter::Range {
                start: Some(d("2024-12-01")),
                end_exclusive: Some(d("2025-01-01")),
            }
        );
        assert_eq!(export_filter(None, None, Some("2024-13")), DayFilter::All);
        assert_eq!(export_filter(None, None, None), DayFilter::All);
    }

    #[test]
    fn filename_carries_the_date() {
        assert_eq!(export_filename(d("2025-03-09"), "csv"), "diary-export-2025-03-09.csv");
    }
}
