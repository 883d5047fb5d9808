use crate::api::MealApi;
use crate::errors::ClientError;
use crate::models::Meal;
use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Deletion bookkeeping for the meal table: which row is waiting on the
/// confirmation dialog and which rows have a delete in flight.
#[derive(Debug, Default)]
pub struct MealList {
    confirming: Mutex<Option<i64>>,
    deleting: Mutex<BTreeSet<i64>>,
}

impl MealList {
    /// First step: opens the confirmation dialog for `id`.
    pub fn request_delete(&self, id: i64) {
        *self.confirming.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);
    }

    pub fn cancel_delete(&self) {
        *self.confirming.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn confirming(&self) -> Option<i64> {
        *self.confirming.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn deleting(&self) -> Vec<i64> {
        self.deleting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    /// Second step. The row stays in place until the dashboard reloads;
    /// on failure the dialog stays open as well.
    pub async fn confirm_delete(&self, api: &dyn MealApi, id: i64) -> Result<(), ClientError> {
        if self.confirming() != Some(id) {
            return Err(ClientError::Unconfirmed(id));
        }

        let _deleting = Deleting::mark(&self.deleting, id).ok_or(ClientError::Busy)?;
        api.delete_meal(id).await?;
        info!(id, "meal deleted");

        let mut confirming = self.confirming.lock().unwrap_or_else(PoisonError::into_inner);
        if *confirming == Some(id) {
            *confirming = None;
        }
        Ok(())
    }
}

struct Deleting<'a> {
    set: &'a Mutex<BTreeSet<i64>>,
    id: i64,
}

impl<'a> Deleting<'a> {
    fn mark(set: &'a Mutex<BTreeSet<i64>>, id: i64) -> Option<Self> {
        let inserted = set.lock().unwrap_or_else(PoisonError::into_inner).insert(id);
        inserted.then(|| Self { set, id })
    }
}

impl Drop for Deleting<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealRow {
    pub id: i64,
    pub title: String,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
    pub total_calories: f64,
    pub created: String,
    pub deleting: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MealRows {
    Placeholder,
    Rows(Vec<MealRow>),
}

pub fn meal_rows(meals: &[Meal], deleting: &[i64]) -> MealRows {
    if meals.is_empty() {
        return MealRows::Placeholder;
    }
    MealRows::Rows(
        meals
            .iter()
            .map(|meal| MealRow {
                id: meal.id,
                title: meal.title.clone(),
                carbs: meal.carbs,
                proteins: meal.proteins,
                fats: meal.fats,
                total_calories: meal.total_calories,
                created: format_created(&meal.created_at),
                deleting: deleting.contains(&meal.id),
            })
            .collect(),
    )
}

/// `2024-05-01T14:05:00` becomes `May 1, 2024, 02:05 PM`. Values that do
/// not parse are shown as they came.
pub fn format_created(raw: &str) -> String {
    const FORMAT: &str = "%b %-d, %Y, %I:%M %p";
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format(FORMAT).to_string();
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(parsed) => parsed.format(FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}
