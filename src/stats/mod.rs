//! Pure statistics core.
//!
//! Every screen-facing number — overview charts, weekly report, export —
//! is computed here from an in-memory snapshot of daily log records.
//! Nothing in this module performs I/O or reads the wall clock directly;
//! handlers fetch a snapshot through [`crate::store::DailyLogStore`] and
//! hand it in, so two calls over the same snapshot always agree.

pub mod aggregate;
pub mod export;
pub mod report;

pub use aggregate::{
    comments_in_window, daily_trend, distinct_food_counts, food_frequency, meal_breakdown,
    mood_frequency, stats_linked_to_food, symptom_frequency, symptom_top_foods, DatedComment,
    DistinctFoodCounts, FoodCategory, FoodLinkedStats, FrequencyEntry, SymptomFoods, TrendPoint,
};
pub use export::StatsExport;
pub use report::{build_weekly_report, week_bounds, Clock, SystemClock, WeeklyReport};
