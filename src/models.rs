use crate::errors::DashboardError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const RATING_KEYS: [&str; 5] = ["1", "2", "3", "4", "5"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReviewExamples {
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantSummary {
    pub restaurant: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    pub total_reviews: u64,
    pub average_rating: f64,
    pub positive: u64,
    pub negative: u64,
    #[serde(default)]
    pub rating_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub examples: ReviewExamples,
}

impl RestaurantSummary {
    /// Histogram values in "1".."5" order; missing keys count as zero.
    pub fn rating_histogram(&self) -> [u64; 5] {
        RATING_KEYS.map(|key| self.rating_counts.get(key).copied().unwrap_or(0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantCardData {
    pub restaurant: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub average_rating: Option<f64>,
}

/// Stable sort, best rated first. A missing rating ranks as zero.
pub fn sort_by_rating_desc(records: &mut [RestaurantCardData]) {
    records.sort_by(|a, b| {
        let a = a.average_rating.unwrap_or(0.0);
        let b = b.average_rating.unwrap_or(0.0);
        b.total_cmp(&a)
    });
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedbackForm {
    pub review: String,
    pub rating: Option<u8>,
}

impl FeedbackForm {
    pub fn is_empty(&self) -> bool {
        self.review.trim().is_empty() && self.rating.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackPayload {
    pub restaurant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl FeedbackPayload {
    /// Builds a payload carrying only the fields the user filled in.
    pub fn from_form(restaurant: Option<&str>, form: &FeedbackForm) -> Result<Self, DashboardError> {
        if form.is_empty() {
            return Err(DashboardError::validation(
                "Please enter a review or select a rating!",
            ));
        }
        if let Some(rating) = form.rating {
            if !(1..=5).contains(&rating) {
                return Err(DashboardError::validation("Rating must be between 1 and 5"));
            }
        }
        let restaurant = restaurant.map(str::trim).unwrap_or_default();
        if restaurant.is_empty() {
            return Err(DashboardError::validation("Search for a restaurant first"));
        }

        let review = form.review.trim();
        Ok(Self {
            restaurant: restaurant.to_string(),
            review: (!review.is_empty()).then(|| review.to_string()),
            rating: form.rating,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FeedbackResponse {
    #[serde(default)]
    pub restaurant: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
