use crate::errors::ClientError;
use crate::models::{DateFilter, InferredMeal, Meal, MealCreate, MealDescription, Stats, TodayStats};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// The remote Calory Tracker API. Everything the dashboard shows comes
/// from here; nothing is computed locally.
#[async_trait]
pub trait MealApi: Send + Sync {
    async fn create_meal(&self, meal: &MealCreate) -> Result<Meal, ClientError>;

    async fn list_meals(&self, username: &str, filter: DateFilter) -> Result<Vec<Meal>, ClientError>;

    async fn delete_meal(&self, id: i64) -> Result<(), ClientError>;

    async fn all_time_stats(&self, username: &str) -> Result<Stats, ClientError>;

    async fn today_stats(&self, username: &str) -> Result<TodayStats, ClientError>;

    async fn infer_meal(&self, request: &MealDescription) -> Result<InferredMeal, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpMealApi {
    client: Client,
    base_url: Url,
}

impl HttpMealApi {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Transport(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl MealApi for HttpMealApi {
    async fn create_meal(&self, meal: &MealCreate) -> Result<Meal, ClientError> {
        let url = self.endpoint(&["meals"])?;
        debug!(%url, title = %meal.title, "creating meal");
        let response = self.client.post(url).json(meal).send().await?;
        decode(response).await
    }

    async fn list_meals(&self, username: &str, filter: DateFilter) -> Result<Vec<Meal>, ClientError> {
        let mut url = self.endpoint(&["meals", username])?;
        if !filter.as_query().is_empty() {
            url.query_pairs_mut().append_pair("date_filter", filter.as_query());
        }
        debug!(%url, "listing meals");
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    async fn delete_meal(&self, id: i64) -> Result<(), ClientError> {
        let url = self.endpoint(&["meals", &id.to_string()])?;
        debug!(%url, "deleting meal");
        let response = self.client.delete(url).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn all_time_stats(&self, username: &str) -> Result<Stats, ClientError> {
        let url = self.endpoint(&["stats", username])?;
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    async fn today_stats(&self, username: &str) -> Result<TodayStats, ClientError> {
        let url = self.endpoint(&["stats", username, "today"])?;
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    async fn infer_meal(&self, request: &MealDescription) -> Result<InferredMeal, ClientError> {
        let url = self.endpoint(&["meals", "infer"])?;
        debug!(%url, "inferring meal macros");
        let response = self.client.post(url).json(request).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let response = ensure_success(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|err| ClientError::Decode(err.to_string()))
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status: status.as_u16(),
        detail: error_detail(status, &body),
    })
}

/// Pulls a readable message out of an error body. The API answers with
/// `{"detail": "..."}`, or a list of `{"msg": ...}` items for rejected
/// payloads.
pub fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        match value.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(Value::Array(items)) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                if !messages.is_empty() {
                    return messages.join("; ");
                }
            }
            _ => {}
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    match status.canonical_reason() {
        Some(reason) => format!("request failed: {} {reason}", status.as_u16()),
        None => format!("request failed: {}", status.as_u16()),
    }
}
