//! In-memory stand-in for the remote API used by unit tests.

use crate::api::MealApi;
use crate::errors::ClientError;
use crate::models::{DateFilter, InferredMeal, Meal, MealCreate, MealDescription, Stats, TodayStats};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub const TODAY: &str = "2024-05-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Create,
    List,
    Delete,
    AllTimeStats,
    TodayStats,
    Infer,
}

#[derive(Debug, Default)]
struct Inner {
    meals: Vec<(Meal, bool)>,
    next_id: i64,
    calls: HashMap<Endpoint, usize>,
    failing: HashSet<Endpoint>,
    stalled: Option<DateFilter>,
    stall_next: bool,
    last_description: Option<MealDescription>,
}

#[derive(Debug, Default)]
pub struct FakeApi {
    inner: Mutex<Inner>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a meal that only shows up in all-time listings.
    pub fn seed_older(&self, username: &str, title: &str) -> Meal {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let meal = Meal {
            id: inner.next_id,
            username: username.into(),
            title: title.into(),
            carbs: 10.0,
            proteins: 10.0,
            fats: 10.0,
            total_calories: 170.0,
            created_at: "2024-04-01T12:00:00".into(),
            deleted_at: None,
        };
        inner.meals.push((meal.clone(), false));
        meal
    }

    pub fn fail(&self, endpoint: Endpoint) {
        self.inner.lock().unwrap().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.inner.lock().unwrap().failing.remove(&endpoint);
    }

    /// Listing with this filter never completes until the call is aborted.
    pub fn stall(&self, filter: DateFilter) {
        self.inner.lock().unwrap().stalled = Some(filter);
    }

    /// Only the next listing hangs, whatever its filter.
    pub fn stall_next(&self) {
        self.inner.lock().unwrap().stall_next = true;
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.inner.lock().unwrap().calls.get(&endpoint).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.inner.lock().unwrap().calls.values().sum()
    }

    pub fn last_description(&self) -> Option<MealDescription> {
        self.inner.lock().unwrap().last_description.clone()
    }

    fn enter(&self, endpoint: Endpoint) -> Result<(), ClientError> {
        let mut inner = self.inner.lock().unwrap();
        *inner.calls.entry(endpoint).or_default() += 1;
        if inner.failing.contains(&endpoint) {
            return Err(ClientError::Api {
                status: 422,
                detail: format!("{endpoint:?} rejected"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MealApi for FakeApi {
    async fn create_meal(&self, meal: &MealCreate) -> Result<Meal, ClientError> {
        self.enter(Endpoint::Create)?;
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let created = Meal {
            id: inner.next_id,
            username: meal.username.clone(),
            title: meal.title.clone(),
            carbs: meal.carbs,
            proteins: meal.proteins,
            fats: meal.fats,
            total_calories: meal.total_calories,
            created_at: format!("{TODAY}T12:00:00"),
            deleted_at: None,
        };
        inner.meals.push((created.clone(), true));
        Ok(created)
    }

    async fn list_meals(&self, username: &str, filter: DateFilter) -> Result<Vec<Meal>, ClientError> {
        self.enter(Endpoint::List)?;
        let stalled = {
            let mut inner = self.inner.lock().unwrap();
            inner.stalled == Some(filter) || std::mem::take(&mut inner.stall_next)
        };
        if stalled {
            std::future::pending::<()>().await;
        }
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .meals
            .iter()
            .filter(|(meal, today)| meal.username == username && (*today || filter == DateFilter::AllTime))
            .map(|(meal, _)| meal.clone())
            .collect())
    }

    async fn delete_meal(&self, id: i64) -> Result<(), ClientError> {
        self.enter(Endpoint::Delete)?;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.meals.len();
        inner.meals.retain(|(meal, _)| meal.id != id);
        if inner.meals.len() == before {
            return Err(ClientError::Api {
                status: 404,
                detail: "Meal not found".into(),
            });
        }
        Ok(())
    }

    async fn all_time_stats(&self, username: &str) -> Result<Stats, ClientError> {
        self.enter(Endpoint::AllTimeStats)?;
        let inner = self.inner.lock().unwrap();
        Ok(totals(inner.meals.iter().filter(|(meal, _)| meal.username == username)))
    }

    async fn today_stats(&self, username: &str) -> Result<TodayStats, ClientError> {
        self.enter(Endpoint::TodayStats)?;
        let inner = self.inner.lock().unwrap();
        Ok(TodayStats {
            totals: totals(
                inner
                    .meals
                    .iter()
                    .filter(|(meal, today)| *today && meal.username == username),
            ),
            date: TODAY.into(),
        })
    }

    async fn infer_meal(&self, request: &MealDescription) -> Result<InferredMeal, ClientError> {
        self.enter(Endpoint::Infer)?;
        self.inner.lock().unwrap().last_description = Some(request.clone());
        Ok(InferredMeal {
            title: format!("Inferred: {}", request.description),
            carbs: 30.0,
            proteins: 20.0,
            fats: 10.0,
            total_calories: 290.0,
        })
    }
}

fn totals<'a>(meals: impl Iterator<Item = &'a (Meal, bool)>) -> Stats {
    meals.fold(Stats::default(), |mut acc, (meal, _)| {
        acc.total_carbs += meal.carbs;
        acc.total_proteins += meal.proteins;
        acc.total_fats += meal.fats;
        acc.total_calories += meal.total_calories;
        acc.meal_count += 1;
        acc
    })
}
