//! Chart specs and the per-slot chart lifecycle.
//!
//! A [`ChartManager`] owns at most one live instance per [`ChartSlot`]. Every
//! `render` releases the slot's previous instance before drawing the next one,
//! so repeated searches never stack charts on the same surface.

use crate::models::{RATING_KEYS, RestaurantSummary};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChartSlot {
    Rating,
    Sentiment,
}

impl ChartSlot {
    pub const ALL: [ChartSlot; 2] = [ChartSlot::Rating, ChartSlot::Sentiment];

    pub fn canvas_id(self) -> &'static str {
        match self {
            ChartSlot::Rating => "ratingChart",
            ChartSlot::Sentiment => "sentimentChart",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Doughnut,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: Vec<f64>,
    pub background_color: Vec<String>,
    pub border_color: Vec<String>,
    pub border_width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// Everything a drawing target needs to build one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    pub options: Value,
}

impl ChartSpec {
    /// Chart.js-compatible configuration object.
    pub fn to_config(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn rating(summary: &RestaurantSummary) -> Self {
        let values = summary.rating_histogram().map(|count| count as f64).to_vec();
        Self {
            kind: ChartKind::Bar,
            data: ChartData {
                labels: RATING_KEYS.map(String::from).to_vec(),
                datasets: vec![Dataset {
                    label: Some("Count".to_string()),
                    data: values,
                    background_color: vec!["rgba(54,162,235,0.6)".to_string()],
                    border_color: vec!["rgba(54,162,235,1)".to_string()],
                    border_width: 1,
                }],
            },
            options: json!({
                "responsive": true,
                "plugins": { "legend": { "display": false } },
                "scales": { "y": { "beginAtZero": true, "precision": 0 } }
            }),
        }
    }

    pub fn sentiment(summary: &RestaurantSummary) -> Self {
        Self {
            kind: ChartKind::Doughnut,
            data: ChartData {
                labels: vec!["Positive".to_string(), "Negative".to_string()],
                datasets: vec![Dataset {
                    label: None,
                    data: vec![summary.positive as f64, summary.negative as f64],
                    background_color: vec![
                        "rgba(75,192,192,0.7)".to_string(),
                        "rgba(255,99,132,0.7)".to_string(),
                    ],
                    border_color: vec![
                        "rgba(75,192,192,1)".to_string(),
                        "rgba(255,99,132,1)".to_string(),
                    ],
                    border_width: 1,
                }],
            },
            options: json!({
                "responsive": true,
                "plugins": { "legend": { "position": "bottom" } }
            }),
        }
    }
}

/// A drawing target that can host charts.
///
/// `destroy` takes the instance by value: once released it cannot be touched
/// again.
pub trait ChartSurface {
    type Instance;

    fn clear(&mut self, slot: ChartSlot);

    fn create(&mut self, slot: ChartSlot, spec: &ChartSpec) -> Self::Instance;

    fn destroy(&mut self, instance: Self::Instance);
}

pub struct ChartManager<S: ChartSurface> {
    surface: S,
    live: BTreeMap<ChartSlot, S::Instance>,
}

impl<S: ChartSurface> ChartManager<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            live: BTreeMap::new(),
        }
    }

    pub fn render(&mut self, slot: ChartSlot, spec: &ChartSpec) {
        self.surface.clear(slot);
        self.release(slot);
        let instance = self.surface.create(slot, spec);
        self.live.insert(slot, instance);
        debug!(slot = slot.canvas_id(), "chart rendered");
    }

    pub fn release(&mut self, slot: ChartSlot) {
        if let Some(previous) = self.live.remove(&slot) {
            self.surface.destroy(previous);
        }
    }

    pub fn release_all(&mut self) {
        for slot in ChartSlot::ALL {
            self.release(slot);
        }
    }

    pub fn is_live(&self, slot: ChartSlot) -> bool {
        self.live.contains_key(&slot)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}
