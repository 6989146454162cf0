//! Report views over the shared assembly and series pipeline.
//!
//! Each view only decides which days it covers and which derived fields it
//! exposes.
//!
//! # Modules
//!
//! - [`rolling`]: the seven days ending at an anchor date, plus yesterday
//! - [`weekly`]: one calendar week aligned to the user's week start
//! - [`phase`]: every day of one program phase with aggregate statistics
//! - [`history`]: all recorded days with reflection markers

pub mod history;
pub mod phase;
pub mod rolling;
pub mod weekly;

pub use history::{HistoryReport, history_report};
pub use phase::{PhaseReport, phase_report};
pub use rolling::{RollingReport, rolling_report};
pub use weekly::{WeeklyReport, weekly_report};
