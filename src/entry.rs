use crate::api::MealApi;
use crate::errors::ClientError;
use crate::models::{Meal, MealCreate, MealDescription, MealEntryForm};
use crate::session::Session;
use async_trait::async_trait;
use serde::Serialize;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Turns form input into a meal the API can create.
#[async_trait]
pub trait DraftProducer: Send + Sync {
    /// Local precondition, checked before anything goes over the wire.
    fn validate(&self) -> Result<(), ClientError>;

    async fn produce(&self, api: &dyn MealApi, session: &Session) -> Result<MealCreate, ClientError>;
}

/// Every macro typed in by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualDraft {
    pub title: String,
    pub carbs: String,
    pub proteins: String,
    pub fats: String,
    pub calories: String,
}

#[async_trait]
impl DraftProducer for ManualDraft {
    fn validate(&self) -> Result<(), ClientError> {
        if self.title.trim().is_empty() {
            return Err(ClientError::Validation("title"));
        }
        Ok(())
    }

    async fn produce(&self, _api: &dyn MealApi, session: &Session) -> Result<MealCreate, ClientError> {
        Ok(MealCreate {
            username: session.username().to_owned(),
            title: self.title.trim().to_owned(),
            carbs: parse_numeric(&self.carbs),
            proteins: parse_numeric(&self.proteins),
            fats: parse_numeric(&self.fats),
            total_calories: parse_numeric(&self.calories),
        })
    }
}

/// A free-text description that the inference endpoint turns into macros.
#[derive(Debug, Clone, PartialEq)]
pub struct AiDraft {
    pub description: String,
}

#[async_trait]
impl DraftProducer for AiDraft {
    fn validate(&self) -> Result<(), ClientError> {
        if self.description.trim().is_empty() {
            return Err(ClientError::Validation("description"));
        }
        Ok(())
    }

    async fn produce(&self, api: &dyn MealApi, session: &Session) -> Result<MealCreate, ClientError> {
        let request = MealDescription {
            description: self.description.trim().to_owned(),
            username: session.username().to_owned(),
        };
        let inferred = api.infer_meal(&request).await?;
        debug!(title = %inferred.title, calories = inferred.total_calories, "meal inferred");
        Ok(inferred.into_create(session.username()))
    }
}

/// Best-effort numeric coercion: anything that is not a finite number
/// becomes zero.
pub fn parse_numeric(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    #[default]
    Manual,
    Ai,
}

impl EntryMode {
    pub fn draft(self, form: &MealEntryForm) -> Box<dyn DraftProducer> {
        match self {
            EntryMode::Manual => Box::new(ManualDraft {
                title: form.title.clone(),
                carbs: form.carbs.clone(),
                proteins: form.proteins.clone(),
                fats: form.fats.clone(),
                calories: form.calories.clone(),
            }),
            EntryMode::Ai => Box::new(AiDraft {
                description: form.description.clone(),
            }),
        }
    }
}

impl FromStr for EntryMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(EntryMode::Manual),
            "ai" => Ok(EntryMode::Ai),
            other => Err(format!("unknown entry mode '{other}' (expected 'manual' or 'ai')")),
        }
    }
}

/// Form-side state of meal entry: the in-flight flag, plus the inputs of a
/// failed submit so they can be shown again.
#[derive(Debug, Default)]
pub struct MealEntry {
    submitting: AtomicBool,
    retained: Mutex<Option<MealEntryForm>>,
}

impl MealEntry {
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub fn retained(&self) -> Option<MealEntryForm> {
        self.retained
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validates, produces the draft, then creates it. Creation is only
    /// attempted once the draft exists; a failed creation discards it.
    pub async fn submit(
        &self,
        api: &dyn MealApi,
        session: &Session,
        mode: EntryMode,
        form: MealEntryForm,
    ) -> Result<Meal, ClientError> {
        let outcome = self.run(api, session, mode, &form).await;
        let mut retained = self.retained.lock().unwrap_or_else(PoisonError::into_inner);
        match &outcome {
            Ok(_) => *retained = None,
            Err(ClientError::Busy) => {}
            Err(_) => *retained = Some(form),
        }
        drop(retained);
        outcome
    }

    async fn run(
        &self,
        api: &dyn MealApi,
        session: &Session,
        mode: EntryMode,
        form: &MealEntryForm,
    ) -> Result<Meal, ClientError> {
        let draft = mode.draft(form);
        draft.validate()?;

        let _submitting = InFlight::raise(&self.submitting).ok_or(ClientError::Busy)?;
        let meal = draft.produce(api, session).await?;
        api.create_meal(&meal).await
    }
}

/// Holds a flag up for the lifetime of a request and lowers it on every
/// exit path, including a dropped future.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn raise(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
