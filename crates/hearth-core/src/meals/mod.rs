//! Meal planning: dish catalog, per-session dish selection, and the
//! backward preparation scheduler.

mod catalog;
mod schedule;
mod selection;
mod time;

pub use catalog::{DishCatalog, DishCatalogEntry, DishStep, PreparationMode};
pub use schedule::{compute_steps, PreparationStep};
pub use selection::{AddOutcome, RemoveOutcome, SelectedDish, SelectedDishCollection};
pub use time::{parse_ready_time, parse_ready_time_today, ACCEPTED_TIME_FORMATS};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MealsError {
    #[error("Dish {0} not found.")]
    UnknownDish(String),

    #[error("Dish {name} cannot be cooked from {mode}.")]
    UnsupportedPreparationMode { name: String, mode: PreparationMode },

    #[error("Time format not recognized: try {}.", ACCEPTED_TIME_FORMATS)]
    MalformedTimeInput { input: String },

    #[error("Preparation of {0} would start before the earliest representable time.")]
    ScheduleOutOfRange(String),

    #[error("Time to be ready not set.")]
    ReadyTimeNotSet,

    #[error("invalid dish catalog: {0}")]
    InvalidCatalog(String),
}
