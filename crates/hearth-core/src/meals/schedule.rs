use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::catalog::DishCatalog;
use super::selection::SelectedDish;
use super::MealsError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationStep {
    pub dish_name: String,
    pub start_time: NaiveDateTime,
    pub description: String,
}

/// Compute the merged preparation plan so every dish finishes at `ready_time`.
///
/// Each dish is scheduled on its own timeline by walking its steps backward
/// from `ready_time`. The merged plan is stably sorted by start time, so
/// ties keep selection order and then each dish's own step order.
pub fn compute_steps(
    selected: &[SelectedDish],
    ready_time: NaiveDateTime,
    catalog: &DishCatalog,
) -> Result<Vec<PreparationStep>, MealsError> {
    let mut plan = Vec::new();

    for dish in selected {
        let entry = catalog
            .get(&dish.name)
            .ok_or_else(|| MealsError::UnknownDish(dish.name.clone()))?;
        let steps = entry.steps_for(dish.mode()).ok_or_else(|| {
            MealsError::UnsupportedPreparationMode {
                name: dish.name.clone(),
                mode: dish.mode(),
            }
        })?;

        let mut cursor = ready_time;
        let mut dish_plan = Vec::with_capacity(steps.len());
        for step in steps.iter().rev() {
            cursor = cursor
                .checked_sub_signed(Duration::minutes(i64::from(step.duration_minutes)))
                .ok_or_else(|| MealsError::ScheduleOutOfRange(dish.name.clone()))?;
            dish_plan.push(PreparationStep {
                dish_name: dish.name.clone(),
                start_time: cursor,
                description: step.description.clone(),
            });
        }
        dish_plan.reverse();
        plan.extend(dish_plan);
    }

    plan.sort_by_key(|step| step.start_time);
    Ok(plan)
}
