//! Recording backend for controller tests.

use crate::api::Backend;
use crate::errors::DashboardError;
use crate::models::{FeedbackPayload, FeedbackResponse, RestaurantCardData, RestaurantSummary};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Names,
    Details,
    Recommendations,
    ByLocation(String),
    Summary(String),
    Similar(String),
    UserRecommendations(String, Option<String>),
    Feedback(FeedbackPayload),
    Asset(String),
}

#[derive(Default)]
pub struct FakeBackend {
    pub calls: Mutex<Vec<Call>>,
    pub names: Vec<String>,
    pub summaries: Mutex<HashMap<String, RestaurantSummary>>,
    pub cards: Vec<RestaurantCardData>,
    pub similar: Option<Vec<RestaurantCardData>>,
    pub feedback: Option<Result<FeedbackResponse, DashboardError>>,
    pub missing_assets: HashSet<String>,
    pub summary_delays: HashMap<String, Duration>,
    pub fail_transport: bool,
}

impl FakeBackend {
    pub fn with_summary(summary: RestaurantSummary) -> Self {
        let backend = Self::default();
        backend.insert_summary(summary);
        backend
    }

    pub fn insert_summary(&self, summary: RestaurantSummary) {
        self.summaries
            .lock()
            .unwrap()
            .insert(summary.restaurant.to_lowercase(), summary);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| matches(*call)).count()
    }

    fn record(&self, call: Call) -> Result<(), DashboardError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_transport {
            return Err(DashboardError::transport(std::io::Error::other(
                "connection refused",
            )));
        }
        Ok(())
    }
}

pub fn summary(name: &str, total_reviews: u64) -> RestaurantSummary {
    serde_json::from_value(json!({
        "restaurant": name,
        "location": "Thamel",
        "contact": "01-4444444",
        "total_reviews": total_reviews,
        "average_rating": 4.25,
        "positive": 3,
        "negative": 1,
        "rating_counts": { "2": 1, "4": 1, "5": 2 },
        "examples": {
            "positive": ["great momo", "friendly staff"],
            "negative": ["slow service"]
        }
    }))
    .unwrap()
}

pub fn card(name: &str, rating: Option<f64>) -> RestaurantCardData {
    RestaurantCardData {
        restaurant: name.to_string(),
        location: Some("Thamel".to_string()),
        contact: Some("01-5555555".to_string()),
        average_rating: rating,
    }
}

impl Backend for FakeBackend {
    async fn restaurant_names(&self) -> Result<Vec<String>, DashboardError> {
        self.record(Call::Names)?;
        Ok(self.names.clone())
    }

    async fn restaurants_with_details(&self) -> Result<Vec<RestaurantCardData>, DashboardError> {
        self.record(Call::Details)?;
        Ok(self.cards.clone())
    }

    async fn recommendations(&self) -> Result<Vec<RestaurantCardData>, DashboardError> {
        self.record(Call::Recommendations)?;
        Ok(self.cards.clone())
    }

    async fn recommend_by_location(
        &self,
        location: &str,
    ) -> Result<Vec<RestaurantCardData>, DashboardError> {
        self.record(Call::ByLocation(location.to_string()))?;
        Ok(self.cards.clone())
    }

    async fn summary(&self, restaurant: &str) -> Result<RestaurantSummary, DashboardError> {
        self.record(Call::Summary(restaurant.to_string()))?;
        if let Some(delay) = self.summary_delays.get(restaurant) {
            tokio::time::sleep(*delay).await;
        }
        self.summaries
            .lock()
            .unwrap()
            .get(&restaurant.to_lowercase())
            .cloned()
            .ok_or_else(|| DashboardError::not_found("Restaurant not found"))
    }

    async fn similar_restaurants(
        &self,
        restaurant: &str,
    ) -> Result<Vec<RestaurantCardData>, DashboardError> {
        self.record(Call::Similar(restaurant.to_string()))?;
        self.similar
            .clone()
            .ok_or_else(|| DashboardError::server("similarity unavailable"))
    }

    async fn user_recommendations(
        &self,
        restaurant: &str,
        sentiment: Option<&str>,
    ) -> Result<Vec<RestaurantCardData>, DashboardError> {
        self.record(Call::UserRecommendations(
            restaurant.to_string(),
            sentiment.map(String::from),
        ))?;
        Ok(self.cards.clone())
    }

    async fn submit_feedback(
        &self,
        payload: &FeedbackPayload,
    ) -> Result<FeedbackResponse, DashboardError> {
        self.record(Call::Feedback(payload.clone()))?;
        let response = self
            .feedback
            .clone()
            .unwrap_or_else(|| Ok(FeedbackResponse::default()))?;
        let mut summaries = self.summaries.lock().unwrap();
        if let Some(summary) = summaries.get_mut(&payload.restaurant.to_lowercase()) {
            summary.total_reviews += 1;
        }
        Ok(response)
    }

    async fn asset_exists(&self, path: &str) -> Result<bool, DashboardError> {
        self.record(Call::Asset(path.to_string()))?;
        Ok(!self.missing_assets.contains(path))
    }
}
