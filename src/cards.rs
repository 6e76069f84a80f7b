use crate::api::Backend;
use crate::models::RestaurantCardData;
use reqwest::Url;
use std::collections::HashMap;
use tracing::debug;

pub const IMAGE_DIR: &str = "/static/images";
pub const DEFAULT_IMAGE: &str = "/static/images/default.jpg";
pub const DASHBOARD_PATH: &str = "/dashboard";
const NOT_AVAILABLE: &str = "Not available";

/// Lower-cased restaurant name with all whitespace removed.
pub fn image_key(restaurant: &str) -> String {
    restaurant
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn image_path(restaurant: &str) -> String {
    format!("{IMAGE_DIR}/{}.jpg", image_key(restaurant))
}

/// `/dashboard?restaurant=<name>`, with the name form-encoded.
pub fn dashboard_link(restaurant: &str) -> String {
    let base = format!("http://localhost{DASHBOARD_PATH}");
    match Url::parse_with_params(&base, &[("restaurant", restaurant)]) {
        Ok(url) => format!("{}?{}", url.path(), url.query().unwrap_or_default()),
        Err(_) => DASHBOARD_PATH.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    Pending,
    Loaded,
    FellBack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardImage {
    pub src: String,
    pub alt: String,
    pub state: ImageState,
}

impl CardImage {
    pub fn for_restaurant(restaurant: &str) -> Self {
        Self {
            src: image_path(restaurant),
            alt: restaurant.to_string(),
            state: ImageState::Pending,
        }
    }

    pub fn on_loaded(&mut self) {
        if self.state == ImageState::Pending {
            self.state = ImageState::Loaded;
        }
    }

    /// Swaps in the default image. Only the first failure has any effect.
    pub fn on_load_error(&mut self) -> bool {
        if self.state != ImageState::Pending {
            return false;
        }
        self.src = DEFAULT_IMAGE.to_string();
        self.state = ImageState::FellBack;
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CardOptions {
    pub show_rating: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    pub restaurant: String,
    pub location: String,
    pub contact: String,
    pub rating: Option<String>,
    pub image: CardImage,
    pub target: String,
}

pub fn render_card(record: &RestaurantCardData, options: CardOptions) -> CardView {
    let rating = match record.average_rating {
        Some(rating) if options.show_rating => Some(format_rating(rating)),
        _ => None,
    };
    CardView {
        restaurant: record.restaurant.clone(),
        location: or_not_available(record.location.as_deref()),
        contact: or_not_available(record.contact.as_deref()),
        rating,
        image: CardImage::for_restaurant(&record.restaurant),
        target: dashboard_link(&record.restaurant),
    }
}

pub fn render_cards(records: &[RestaurantCardData], options: CardOptions) -> Vec<CardView> {
    records
        .iter()
        .map(|record| render_card(record, options))
        .collect()
}

pub fn format_rating(rating: f64) -> String {
    if rating == 0.0 {
        return "0.0".to_string();
    }
    let text = format!("{rating:.2}");
    let text = text.trim_end_matches('0');
    if text.ends_with('.') {
        format!("{text}0")
    } else {
        text.to_string()
    }
}

fn or_not_available(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SectionState {
    #[default]
    Idle,
    Loading(String),
    Loaded(Vec<CardView>),
    Empty(String),
    Failed(String),
}

/// A titled group of cards: a grid or a recommendation list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CardSection {
    pub title: String,
    pub state: SectionState,
}

impl CardSection {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            state: SectionState::Idle,
        }
    }

    pub fn cards(&self) -> &[CardView] {
        match &self.state {
            SectionState::Loaded(cards) => cards,
            _ => &[],
        }
    }

    pub fn card(&self, index: usize) -> Option<&CardView> {
        self.cards().get(index)
    }

    pub fn images_mut(&mut self) -> impl Iterator<Item = &mut CardImage> {
        let cards: &mut [CardView] = match &mut self.state {
            SectionState::Loaded(cards) => cards.as_mut_slice(),
            _ => &mut [],
        };
        cards.iter_mut().map(|card| &mut card.image)
    }

    pub fn fill(&mut self, cards: Vec<CardView>, empty_message: &str) {
        self.state = if cards.is_empty() {
            SectionState::Empty(empty_message.to_string())
        } else {
            SectionState::Loaded(cards)
        };
    }
}

/// Asks the backend once for each distinct pending image.
///
/// A transport error counts as a failed load.
pub async fn probe_images<B: Backend>(backend: &B, pending: Vec<String>) -> HashMap<String, bool> {
    let mut results = HashMap::new();
    for src in pending {
        if results.contains_key(&src) {
            continue;
        }
        let loaded = match backend.asset_exists(&src).await {
            Ok(loaded) => loaded,
            Err(err) => {
                debug!(%src, "image probe failed: {err}");
                false
            }
        };
        results.insert(src, loaded);
    }
    results
}

/// Applies probe results to every still-pending image.
pub fn apply_probes<'a>(
    images: impl Iterator<Item = &'a mut CardImage>,
    results: &HashMap<String, bool>,
) -> usize {
    let mut fell_back = 0;
    for image in images {
        match results.get(&image.src) {
            Some(true) => image.on_loaded(),
            Some(false) => {
                if image.on_load_error() {
                    fell_back += 1;
                }
            }
            None => {}
        }
    }
    fell_back
}

pub fn pending_images<'a>(images: impl Iterator<Item = &'a CardImage>) -> Vec<String> {
    images
        .filter(|image| image.state == ImageState::Pending)
        .map(|image| image.src.clone())
        .collect()
}
