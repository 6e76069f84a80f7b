use crate::errors::DashboardError;
use crate::models::{
    ErrorBody, FeedbackPayload, FeedbackResponse, RestaurantCardData, RestaurantSummary,
};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// The backend HTTP contract, one method per endpoint.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn restaurant_names(&self) -> Result<Vec<String>, DashboardError>;

    async fn restaurants_with_details(&self) -> Result<Vec<RestaurantCardData>, DashboardError>;

    async fn recommendations(&self) -> Result<Vec<RestaurantCardData>, DashboardError>;

    async fn recommend_by_location(
        &self,
        location: &str,
    ) -> Result<Vec<RestaurantCardData>, DashboardError>;

    async fn summary(&self, restaurant: &str) -> Result<RestaurantSummary, DashboardError>;

    async fn similar_restaurants(
        &self,
        restaurant: &str,
    ) -> Result<Vec<RestaurantCardData>, DashboardError>;

    async fn user_recommendations(
        &self,
        restaurant: &str,
        sentiment: Option<&str>,
    ) -> Result<Vec<RestaurantCardData>, DashboardError>;

    async fn submit_feedback(
        &self,
        payload: &FeedbackPayload,
    ) -> Result<FeedbackResponse, DashboardError>;

    /// Whether a static asset path loads.
    async fn asset_exists(&self, path: &str) -> Result<bool, DashboardError>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DashboardError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DashboardError::transport)?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, DashboardError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| DashboardError::config(format!("invalid api url {base_url:?}: {err}")))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DashboardError> {
        self.base_url
            .join(path)
            .map_err(|err| DashboardError::config(format!("invalid path {path:?}: {err}")))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, DashboardError> {
        let url = self.endpoint(path)?;
        debug!(%url, ?query, "GET");
        let response = self.client.get(url).query(query).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

/// Maps non-success statuses to errors, preferring the backend's `{error}` text.
async fn check_status(response: Response) -> Result<Response, DashboardError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .map(|body| body.error)
        .unwrap_or_else(|_| format!("request failed with status {status}"));

    if status == StatusCode::NOT_FOUND {
        Err(DashboardError::not_found(message))
    } else {
        Err(DashboardError::server(message))
    }
}

impl Backend for HttpBackend {
    async fn restaurant_names(&self) -> Result<Vec<String>, DashboardError> {
        self.get_json("/api/restaurants", &[]).await
    }

    async fn restaurants_with_details(&self) -> Result<Vec<RestaurantCardData>, DashboardError> {
        self.get_json("/api/restaurants_with_details", &[]).await
    }

    async fn recommendations(&self) -> Result<Vec<RestaurantCardData>, DashboardError> {
        self.get_json("/api/recommendations", &[]).await
    }

    async fn recommend_by_location(
        &self,
        location: &str,
    ) -> Result<Vec<RestaurantCardData>, DashboardError> {
        self.get_json("/api/recommend_by_location", &[("location", location)])
            .await
    }

    async fn summary(&self, restaurant: &str) -> Result<RestaurantSummary, DashboardError> {
        self.get_json("/api/summary", &[("restaurant", restaurant)])
            .await
    }

    async fn similar_restaurants(
        &self,
        restaurant: &str,
    ) -> Result<Vec<RestaurantCardData>, DashboardError> {
        self.get_json("/api/similar_restaurants", &[("restaurant", restaurant)])
            .await
    }

    async fn user_recommendations(
        &self,
        restaurant: &str,
        sentiment: Option<&str>,
    ) -> Result<Vec<RestaurantCardData>, DashboardError> {
        let mut query = vec![("restaurant", restaurant)];
        if let Some(sentiment) = sentiment {
            query.push(("sentiment", sentiment));
        }
        self.get_json("/api/user_recommendations", &query).await
    }

    async fn submit_feedback(
        &self,
        payload: &FeedbackPayload,
    ) -> Result<FeedbackResponse, DashboardError> {
        let url = self.endpoint("/api/submit_feedback")?;
        debug!(%url, restaurant = %payload.restaurant, "POST feedback");
        let response = self.client.post(url).json(payload).send().await?;
        let response = check_status(response).await?;
        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(FeedbackResponse::default());
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn asset_exists(&self, path: &str) -> Result<bool, DashboardError> {
        let url = self.endpoint(path)?;
        let response = self.client.get(url).send().await?;
        Ok(response.status().is_success())
    }
}
