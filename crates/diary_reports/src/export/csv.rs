//! Flat CSV export, one row per recorded day.

use std::fmt::Write as _;

use diary_store::{SymptomType, UserId};

use crate::ReportEngine;
use crate::assembly::Assembled;
use crate::error::ReportResult;

/// UTF-8 byte order mark so spreadsheet tools pick the right encoding.
pub const BOM: &str = "\u{feff}";

const FIXED_COLUMNS: [&str; 8] = [
    "date",
    "phase",
    "care",
    "well_being",
    "stool",
    "habits_done",
    "habits_total",
    "habit_ratio",
];

pub fn escape_csv(value: &str) -> String {
    let needs_quotes = value.contains([',', '"', '\n', '\r']);
    if needs_quotes {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

fn opt_cell<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Render the assembled days. Stool values are written as stored.
pub fn render_csv(assembled: &Assembled) -> String {
    let habits: Vec<_> = assembled.own_active_habits().collect();

    let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(SymptomType::ALL.iter().map(|s| s.as_str().to_lowercase()));
    header.extend(habits.iter().map(|h| escape_csv(&h.title)));

    let mut out = String::from(BOM);
    out.push_str(&header.join(","));
    out.push('\n');

    for day in &assembled.days {
        let key = crate::dates::to_date_key(day.date);
        let done = assembled.ticks_done(day.id);

        let mut row = vec![
            key.clone(),
            day.phase.as_str().to_string(),
            day.care.as_str().to_string(),
            opt_cell(assembled.well_being_for(&key)),
            opt_cell(assembled.stool_by_day_id.get(&day.id)),
            assembled.ticks_done_count(day.id).to_string(),
            assembled.active_habit_count.to_string(),
            opt_cell(assembled.habit_ratio_for(&key)),
        ];
        row.extend(
            SymptomType::ALL
                .iter()
                .map(|&s| opt_cell(assembled.symptom(s, &key))),
        );
        row.extend(habits.iter().map(|h| {
            let ticked = done.is_some_and(|set| set.contains(&h.id));
            u8::from(ticked).to_string()
        }));

        let _ = writeln!(out, "{}", row.join(","));
    }
    out
}

pub async fn export_csv(
    engine: &ReportEngine,
    user: UserId,
    filter: &diary_store::DayFilter,
) -> ReportResult<Vec<u8>> {
    let assembled = engine.assemble(user, filter).await?;
    let csv = render_csv(&assembled);
    tracing::debug!(%user, rows = assembled.days.len(), bytes = csv.len(), "rendered csv export");
    Ok(csv.into_bytes())
}
