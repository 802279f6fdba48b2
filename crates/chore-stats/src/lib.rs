//! # chore-stats
//!
//! Pure aggregation over a household snapshot: temporal task buckets,
//! per-member completion stats, household summary and trend, completion
//! timeliness, and the smaller dashboard views built from them.
//!
//! Nothing here reads a clock or touches I/O. The reference instant is
//! always passed in, so every function returns the same output for the
//! same input.

pub mod dashboard;
pub mod grouping;
pub mod members;
pub mod rounding;
pub mod summary;
pub mod timeliness;
pub mod views;

#[cfg(test)]
mod testutil;

pub use dashboard::{dashboard, Dashboard};
pub use grouping::{group_tasks, TaskGroups};
pub use members::{member_stats, MemberStats};
pub use summary::{household_summary, household_summary_for, summary_trend, HouseholdSummary, SummaryTrend};
pub use timeliness::{completion_timeliness, Timeliness, TimelinessEntry, DEFAULT_TIMELINESS_LIMIT};
pub use views::{member_view, recurrence_breakdown, tasks_on_day, MemberView, RecurrenceCount};
