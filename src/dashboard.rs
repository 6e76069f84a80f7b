//! Single-restaurant dashboard: summary, charts, feedback and the two
//! recommendation lists.

use crate::api::Backend;
use crate::cards::{
    self, CardImage, CardOptions, CardSection, SectionState, apply_probes, pending_images,
    probe_images, render_cards,
};
use crate::charts::{ChartManager, ChartSlot, ChartSpec, ChartSurface};
use crate::errors::{DashboardError, ErrorKind};
use crate::models::{FeedbackForm, FeedbackPayload, RestaurantSummary};
use reqwest::Url;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const SIMILAR_TITLE: &str = "Similar Restaurants";
pub const FOR_YOU_TITLE: &str = "Recommended for You";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardView {
    pub query: String,
    pub status: String,
    pub restaurant: Option<String>,
    pub location: Option<String>,
    pub contact: Option<String>,
    pub image: Option<CardImage>,
    pub total_reviews: u64,
    pub average_rating: f64,
    pub positive: u64,
    pub negative: u64,
    pub reviews: Vec<String>,
    pub similar: CardSection,
    pub for_you: CardSection,
    pub feedback: FeedbackForm,
    pub feedback_status: String,
    pub predicted_sentiment: String,
    pub restaurant_names: Vec<String>,
}

impl DashboardView {
    fn new() -> Self {
        Self {
            similar: CardSection::new(SIMILAR_TITLE),
            for_you: CardSection::new(FOR_YOU_TITLE),
            ..Self::default()
        }
    }

    fn apply_summary(&mut self, summary: &RestaurantSummary) {
        self.restaurant = Some(summary.restaurant.clone());
        self.location = summary.location.clone();
        self.contact = summary.contact.clone();
        self.image = Some(CardImage::for_restaurant(&summary.restaurant));
        self.total_reviews = summary.total_reviews;
        self.average_rating = summary.average_rating;
        self.positive = summary.positive;
        self.negative = summary.negative;
        self.reviews = summary
            .examples
            .positive
            .iter()
            .chain(&summary.examples.negative)
            .cloned()
            .collect();
    }

    /// Back to empty/zero defaults. The search box and feedback form survive.
    fn reset_display(&mut self) {
        let fresh = Self {
            query: std::mem::take(&mut self.query),
            feedback: std::mem::take(&mut self.feedback),
            feedback_status: std::mem::take(&mut self.feedback_status),
            predicted_sentiment: std::mem::take(&mut self.predicted_sentiment),
            restaurant_names: std::mem::take(&mut self.restaurant_names),
            for_you: std::mem::take(&mut self.for_you),
            ..Self::new()
        };
        *self = fresh;
    }

    fn images_mut(&mut self) -> impl Iterator<Item = &mut CardImage> {
        self.image
            .iter_mut()
            .chain(self.similar.images_mut())
            .chain(self.for_you.images_mut())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Blank input; nothing was requested.
    Skipped,
    Loaded,
    NotFound,
    Failed(String),
    /// A newer search started while this one was in flight.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    Rejected(String),
    Submitted { sentiment: Option<String> },
    Failed(String),
}

/// Which recommendation list a card was opened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardSection {
    Similar,
    ForYou,
}

struct Inner<S: ChartSurface> {
    view: DashboardView,
    charts: ChartManager<S>,
}

pub struct DashboardController<B, S: ChartSurface> {
    backend: B,
    inner: Mutex<Inner<S>>,
    search_seq: AtomicU64,
}

impl<B: Backend, S: ChartSurface> DashboardController<B, S> {
    pub fn new(backend: B, surface: S) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner {
                view: DashboardView::new(),
                charts: ChartManager::new(surface),
            }),
            search_seq: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn view(&self) -> DashboardView {
        self.inner.lock().await.view.clone()
    }

    pub async fn with_charts<R>(&self, f: impl FnOnce(&ChartManager<S>) -> R) -> R {
        let inner = self.inner.lock().await;
        f(&inner.charts)
    }

    /// Page load: fill the name list, then honour `?restaurant=<name>`.
    pub async fn load(&self, location: &str) -> SearchOutcome {
        match self.backend.restaurant_names().await {
            Ok(names) => self.inner.lock().await.view.restaurant_names = names,
            Err(err) => warn!("failed to load restaurant names: {err}"),
        }

        match restaurant_param(location) {
            Some(restaurant) => {
                self.inner.lock().await.view.query = restaurant.clone();
                self.search(&restaurant).await
            }
            None => SearchOutcome::Skipped,
        }
    }

    pub async fn search(&self, name: &str) -> SearchOutcome {
        let name = name.trim();
        if name.is_empty() {
            return SearchOutcome::Skipped;
        }

        let ticket = self.search_seq.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut inner = self.inner.lock().await;
            inner.view.query = name.to_string();
            inner.view.reviews.clear();
            inner.view.status = "Loading…".to_string();
        }

        info!(restaurant = name, "searching");
        let result = self.backend.summary(name).await;

        let mut inner = self.inner.lock().await;
        if !self.is_current(ticket) {
            debug!(restaurant = name, "discarding superseded summary");
            return SearchOutcome::Superseded;
        }

        match result {
            Ok(summary) => {
                let Inner { view, charts } = &mut *inner;
                view.apply_summary(&summary);
                charts.render(ChartSlot::Rating, &ChartSpec::rating(&summary));
                charts.render(ChartSlot::Sentiment, &ChartSpec::sentiment(&summary));
                view.status = "Done".to_string();
                view.similar.state = SectionState::Loading("Loading…".to_string());
                drop(inner);

                self.refresh_similar(ticket, &summary.restaurant).await;
                SearchOutcome::Loaded
            }
            Err(err) => {
                let Inner { view, charts } = &mut *inner;
                view.reset_display();
                charts.release_all();
                if err.is_not_found() {
                    info!(restaurant = name, "restaurant not found");
                    view.status = "Not found".to_string();
                    SearchOutcome::NotFound
                } else {
                    warn!(restaurant = name, "summary request failed: {err}");
                    view.status = "Error loading restaurant".to_string();
                    SearchOutcome::Failed(err.message)
                }
            }
        }
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.search_seq.load(Ordering::SeqCst) == ticket
    }

    async fn refresh_similar(&self, ticket: u64, restaurant: &str) {
        let result = self.backend.similar_restaurants(restaurant).await;

        let mut inner = self.inner.lock().await;
        if !self.is_current(ticket) {
            debug!(restaurant, "discarding superseded similar list");
            return;
        }
        let section = &mut inner.view.similar;
        match result {
            Ok(records) => section.fill(
                render_cards(&records, CardOptions { show_rating: false }),
                "No similar restaurants found.",
            ),
            Err(err) => {
                warn!(restaurant, "failed to load similar restaurants: {err}");
                section.state = SectionState::Failed("Error loading similar restaurants.".to_string());
            }
        }
    }

    pub async fn refresh_user_recommendations(&self, restaurant: &str, sentiment: Option<&str>) {
        let result = self
            .backend
            .user_recommendations(restaurant, sentiment)
            .await;

        let mut inner = self.inner.lock().await;
        let section = &mut inner.view.for_you;
        match result {
            Ok(records) => section.fill(
                render_cards(&records, CardOptions { show_rating: true }),
                "No recommendations available.",
            ),
            Err(err) => {
                warn!(restaurant, "failed to load user recommendations: {err}");
                section.state = SectionState::Failed("Error loading recommendations.".to_string());
            }
        }
    }

    pub async fn set_review(&self, review: &str) {
        self.inner.lock().await.view.feedback.review = review.to_string();
    }

    pub async fn set_rating(&self, rating: Option<u8>) {
        self.inner.lock().await.view.feedback.rating = rating;
    }

    pub async fn submit_feedback(&self) -> FeedbackOutcome {
        let payload = {
            let mut inner = self.inner.lock().await;
            let view = &mut inner.view;
            match FeedbackPayload::from_form(view.restaurant.as_deref(), &view.feedback) {
                Ok(payload) => {
                    view.feedback_status = "Submitting...".to_string();
                    view.predicted_sentiment.clear();
                    payload
                }
                Err(err) => {
                    view.feedback_status = err.message.clone();
                    view.predicted_sentiment.clear();
                    return FeedbackOutcome::Rejected(err.message);
                }
            }
        };

        info!(restaurant = %payload.restaurant, "submitting feedback");
        let response = match self.backend.submit_feedback(&payload).await {
            Ok(response) => response,
            Err(err) => {
                let message = feedback_error_message(&err);
                warn!(restaurant = %payload.restaurant, "feedback rejected: {err}");
                self.inner.lock().await.view.feedback_status = message.clone();
                return FeedbackOutcome::Failed(message);
            }
        };

        {
            let mut inner = self.inner.lock().await;
            let view = &mut inner.view;
            view.feedback_status = "Feedback submitted!".to_string();
            view.predicted_sentiment = response
                .sentiment
                .as_deref()
                .map(|sentiment| format!("Saved as {sentiment}"))
                .unwrap_or_default();
            view.feedback = FeedbackForm::default();
        }

        self.search(&payload.restaurant).await;
        self.refresh_user_recommendations(&payload.restaurant, response.sentiment.as_deref())
            .await;

        FeedbackOutcome::Submitted {
            sentiment: response.sentiment,
        }
    }

    /// Navigation target of a recommendation card. Opens on a single click.
    pub async fn open_card(&self, section: DashboardSection, index: usize) -> Option<String> {
        let inner = self.inner.lock().await;
        let section = match section {
            DashboardSection::Similar => &inner.view.similar,
            DashboardSection::ForYou => &inner.view.for_you,
        };
        section.card(index).map(|card| card.target.clone())
    }

    /// Probes every pending image and swaps failures to the default asset.
    pub async fn resolve_images(&self) -> usize {
        let pending = {
            let mut inner = self.inner.lock().await;
            pending_images(inner.view.images_mut().map(|image| &*image))
        };
        if pending.is_empty() {
            return 0;
        }
        let results = probe_images(&self.backend, pending).await;
        let mut inner = self.inner.lock().await;
        apply_probes(inner.view.images_mut(), &results)
    }
}

fn feedback_error_message(err: &DashboardError) -> String {
    match err.kind {
        ErrorKind::Server | ErrorKind::NotFound => err.message.clone(),
        _ => "Error submitting feedback".to_string(),
    }
}

/// Extracts `restaurant` from a URL, a path with query, or a bare `?query`.
pub fn restaurant_param(location: &str) -> Option<String> {
    let base = Url::parse(&format!("http://localhost{}", cards::DASHBOARD_PATH)).ok()?;
    let url = base.join(location.trim()).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "restaurant")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
