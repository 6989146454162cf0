//! Helpers for building PostgREST-style filter parameters.

use crate::DayFilter;
use std::fmt::Display;

/// `eq.<value>`
pub fn eq(value: impl Display) -> String {
    format!("eq.{value}")
}

/// `in.(a,b,c)` for a batch of ids.
pub fn in_list<T: Display>(values: &[T]) -> String {
    let joined = values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

/// Query parameters restricting `days.date` / `days.phase` to `filter`.
pub fn day_filter_params(filter: &DayFilter) -> Vec<(&'static str, String)> {
    match filter {
        DayFilter::All => Vec::new(),
        DayFilter::Range {
            start,
            end_exclusive,
        } => {
            let mut params = Vec::with_capacity(2);
            if let Some(start) = start {
                params.push(("date", format!("gte.{}", start.format("%Y-%m-%d"))));
            }
            if let Some(end) = end_exclusive {
                params.push(("date", format!("lt.{}", end.format("%Y-%m-%d"))));
            }
            params
        }
        DayFilter::Phase(phase) => vec![("phase", eq(phase.as_str()))],
    }
}
