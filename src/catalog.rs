//! Card grids of the catalog page.
//!
//! A single click on a card loads restaurants similar to it into the
//! similar grid; a double click navigates to its dashboard.

use crate::api::Backend;
use crate::cards::{
    CardOptions, CardSection, CardView, SectionState, apply_probes, pending_images, probe_images,
    render_cards,
};
use crate::clicks::{ClickDisambiguator, ClickOutcome, Timer, TimerHandle};
use crate::errors::DashboardError;
use crate::models::{RestaurantCardData, sort_by_rating_desc};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Grid {
    All,
    Top,
    Location(String),
    Similar,
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grid::All => f.write_str("all"),
            Grid::Top => f.write_str("top"),
            Grid::Location(location) => write!(f, "loc:{location}"),
            Grid::Similar => f.write_str("similar"),
        }
    }
}

impl FromStr for Grid {
    type Err = DashboardError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        match raw.to_ascii_lowercase().as_str() {
            "all" => Ok(Grid::All),
            "top" => Ok(Grid::Top),
            "similar" => Ok(Grid::Similar),
            "" => Err(DashboardError::validation("missing grid name")),
            _ => {
                let location = raw.strip_prefix("loc:").unwrap_or(raw).trim();
                if location.is_empty() {
                    return Err(DashboardError::validation("missing location name"));
                }
                Ok(Grid::Location(location.to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardKey {
    pub grid: Grid,
    pub index: usize,
}

impl CardKey {
    pub fn new(grid: Grid, index: usize) -> Self {
        Self { grid, index }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickResult {
    /// Waiting to see whether a second click follows.
    Pending(TimerHandle),
    Navigate(String),
    /// No card at that position.
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogView {
    pub all: CardSection,
    pub top: CardSection,
    pub locations: Vec<(String, CardSection)>,
    pub similar: CardSection,
}

impl Default for CatalogView {
    fn default() -> Self {
        Self {
            all: CardSection::new("All Restaurants"),
            top: CardSection::new("Top Recommendations"),
            locations: Vec::new(),
            similar: CardSection::new("Similar Restaurants"),
        }
    }
}

impl CatalogView {
    pub fn section(&self, grid: &Grid) -> Option<&CardSection> {
        match grid {
            Grid::All => Some(&self.all),
            Grid::Top => Some(&self.top),
            Grid::Similar => Some(&self.similar),
            Grid::Location(location) => self
                .locations
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(location))
                .map(|(_, section)| section),
        }
    }

    fn section_mut(&mut self, grid: &Grid) -> &mut CardSection {
        match grid {
            Grid::All => &mut self.all,
            Grid::Top => &mut self.top,
            Grid::Similar => &mut self.similar,
            Grid::Location(location) => {
                let position = self
                    .locations
                    .iter()
                    .position(|(name, _)| name.eq_ignore_ascii_case(location));
                let index = match position {
                    Some(index) => index,
                    None => {
                        self.locations.push((
                            location.clone(),
                            CardSection::new(format!("Top picks in {location}")),
                        ));
                        self.locations.len() - 1
                    }
                };
                &mut self.locations[index].1
            }
        }
    }

    pub fn card(&self, key: &CardKey) -> Option<&CardView> {
        self.section(&key.grid)?.card(key.index)
    }

    /// Location grids are matched ignoring case; this returns the spelling
    /// the section was created with.
    fn canonical(&self, grid: Grid) -> Grid {
        match grid {
            Grid::Location(location) => self
                .locations
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&location))
                .map(|(name, _)| Grid::Location(name.clone()))
                .unwrap_or(Grid::Location(location)),
            other => other,
        }
    }

    fn sections_mut(&mut self) -> impl Iterator<Item = &mut CardSection> {
        [&mut self.all, &mut self.top, &mut self.similar]
            .into_iter()
            .chain(self.locations.iter_mut().map(|(_, section)| section))
    }
}

pub struct CatalogController<B, T> {
    backend: B,
    timer: T,
    click_delay: Duration,
    view: CatalogView,
    clicks: HashMap<CardKey, ClickDisambiguator>,
    /// Location grids kept across `load_location` calls.
    pinned: Vec<String>,
}

impl<B: Backend, T: Timer> CatalogController<B, T> {
    pub fn new(backend: B, timer: T, click_delay: Duration) -> Self {
        Self {
            backend,
            timer,
            click_delay,
            view: CatalogView::default(),
            clicks: HashMap::new(),
            pinned: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn view(&self) -> &CatalogView {
        &self.view
    }

    /// Loads every grid of the page, one location grid per entry.
    pub async fn load_page(&mut self, locations: &[String]) {
        self.pinned = locations.to_vec();
        self.load_all().await;
        self.load_top().await;
        for location in locations {
            self.load_location(location).await;
        }
    }

    pub async fn load_all(&mut self) {
        let result = self.backend.restaurants_with_details().await;
        self.replace_grid(
            Grid::All,
            result,
            CardOptions { show_rating: false },
            "No restaurants found.",
            "Error loading restaurants.",
        );
    }

    pub async fn load_top(&mut self) {
        let result = self.backend.recommendations().await.map(|mut records| {
            sort_by_rating_desc(&mut records);
            records
        });
        self.replace_grid(
            Grid::Top,
            result,
            CardOptions { show_rating: false },
            "No recommendations available.",
            "Error loading recommendations.",
        );
    }

    pub async fn load_location(&mut self, location: &str) {
        let location = location.trim();
        if location.is_empty() {
            return;
        }
        let result = self
            .backend
            .recommend_by_location(location)
            .await
            .map(|mut records| {
                sort_by_rating_desc(&mut records);
                records
            });
        self.replace_grid(
            Grid::Location(location.to_string()),
            result,
            CardOptions { show_rating: true },
            "No restaurants found for this location.",
            "Error loading recommendations.",
        );
        self.drop_unpinned_locations(location);
    }

    /// Only the page's own locations and the latest ad hoc one keep a grid.
    fn drop_unpinned_locations(&mut self, current: &str) {
        let pinned = self.pinned.clone();
        let keep = |name: &str| {
            name.eq_ignore_ascii_case(current)
                || pinned.iter().any(|location| location.eq_ignore_ascii_case(name))
        };
        let dropped: Vec<String> = self
            .view
            .locations
            .iter()
            .filter(|(name, _)| !keep(name.as_str()))
            .map(|(name, _)| name.clone())
            .collect();
        for name in dropped {
            debug!(location = %name, "dropping location grid");
            self.reset_clicks(&Grid::Location(name));
        }
        self.view.locations.retain(|(name, _)| keep(name.as_str()));
    }

    pub async fn load_similar(&mut self, restaurant: &str) {
        let restaurant = restaurant.trim();
        if restaurant.is_empty() {
            return;
        }
        self.reset_clicks(&Grid::Similar);
        self.view.similar.title = format!("Similar to \"{restaurant}\"");
        self.view.similar.state = SectionState::Loading("Loading similar restaurants...".to_string());

        let result = self.backend.similar_restaurants(restaurant).await;
        self.replace_grid(
            Grid::Similar,
            result,
            CardOptions { show_rating: false },
            "No similar restaurants found.",
            "Error loading recommendations.",
        );
    }

    fn replace_grid(
        &mut self,
        grid: Grid,
        result: Result<Vec<RestaurantCardData>, DashboardError>,
        options: CardOptions,
        empty_message: &str,
        error_message: &str,
    ) {
        let grid = self.view.canonical(grid);
        self.reset_clicks(&grid);
        let section = self.view.section_mut(&grid);
        match result {
            Ok(records) => {
                debug!(%grid, count = records.len(), "grid loaded");
                section.fill(render_cards(&records, options), empty_message);
            }
            Err(err) => {
                warn!(%grid, "failed to load grid: {err}");
                section.state = SectionState::Failed(error_message.to_string());
            }
        }
    }

    /// Cards of a replaced grid are gone, so their pending clicks are too.
    fn reset_clicks(&mut self, grid: &Grid) {
        let timer = &mut self.timer;
        self.clicks.retain(|key, state| {
            if &key.grid == grid {
                state.reset(timer);
                false
            } else {
                true
            }
        });
    }

    pub fn click(&mut self, key: CardKey) -> ClickResult {
        let key = CardKey::new(self.view.canonical(key.grid), key.index);
        let Some(target) = self.view.card(&key).map(|card| card.target.clone()) else {
            return ClickResult::Ignored;
        };
        let delay = self.click_delay;
        let state = self
            .clicks
            .entry(key)
            .or_insert_with(|| ClickDisambiguator::new(delay));
        match state.click(&mut self.timer) {
            ClickOutcome::Scheduled(handle) => ClickResult::Pending(handle),
            ClickOutcome::DoubleClick => {
                info!(%target, "opening dashboard");
                ClickResult::Navigate(target)
            }
        }
    }

    /// Runs the single-click effect for a fired timer. Returns the restaurant
    /// whose similar list was loaded, or `None` for a stale event.
    pub async fn on_timer(&mut self, handle: TimerHandle) -> Option<String> {
        let key = self
            .clicks
            .iter_mut()
            .find_map(|(key, state)| state.fire(handle).then(|| key.clone()))?;
        let restaurant = self.view.card(&key)?.restaurant.clone();
        info!(%restaurant, "loading similar restaurants");
        self.load_similar(&restaurant).await;
        Some(restaurant)
    }

    /// Probes every pending card image and swaps failures to the default asset.
    pub async fn resolve_images(&mut self) -> usize {
        let pending = pending_images(
            self.view
                .sections_mut()
                .flat_map(|section| section.images_mut())
                .map(|image| &*image),
        );
        if pending.is_empty() {
            return 0;
        }
        let results = probe_images(&self.backend, pending).await;
        apply_probes(
            self.view
                .sections_mut()
                .flat_map(|section| section.images_mut()),
            &results,
        )
    }
}
