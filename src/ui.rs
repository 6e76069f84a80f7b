use crate::cards::{CardSection, CardView, ImageState, SectionState};
use crate::catalog::{CatalogView, Grid};
use crate::charts::{ChartKind, ChartSlot, ChartSpec, ChartSurface};
use crate::dashboard::DashboardView;
use std::collections::BTreeMap;
use std::fmt::Write;

const BAR_WIDTH: f64 = 30.0;
const EMPTY: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalChart {
    pub id: u64,
    pub slot: ChartSlot,
}

/// Chart surface that draws text frames, one per slot.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    next_id: u64,
    frames: BTreeMap<ChartSlot, (u64, String)>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self, slot: ChartSlot) -> Option<&str> {
        self.frames.get(&slot).map(|(_, frame)| frame.as_str())
    }
}

impl ChartSurface for TerminalSurface {
    type Instance = TerminalChart;

    fn clear(&mut self, slot: ChartSlot) {
        self.frames.remove(&slot);
    }

    fn create(&mut self, slot: ChartSlot, spec: &ChartSpec) -> TerminalChart {
        self.next_id += 1;
        self.frames.insert(slot, (self.next_id, draw_chart(spec)));
        TerminalChart {
            id: self.next_id,
            slot,
        }
    }

    fn destroy(&mut self, instance: TerminalChart) {
        // Only drop the frame if it still belongs to this instance.
        if self
            .frames
            .get(&instance.slot)
            .is_some_and(|(id, _)| *id == instance.id)
        {
            self.frames.remove(&instance.slot);
        }
    }
}

pub fn draw_chart(spec: &ChartSpec) -> String {
    let values = spec
        .data
        .datasets
        .first()
        .map(|dataset| dataset.data.as_slice())
        .unwrap_or_default();
    let mut out = String::new();

    match spec.kind {
        ChartKind::Bar => {
            let max = values.iter().copied().fold(0.0, f64::max);
            for (label, value) in spec.data.labels.iter().zip(values) {
                let width = if max > 0.0 {
                    (value / max * BAR_WIDTH).round() as usize
                } else {
                    0
                };
                let _ = writeln!(out, "  {label:>2} | {} {value}", "#".repeat(width));
            }
        }
        ChartKind::Doughnut => {
            let total: f64 = values.iter().sum();
            for (label, value) in spec.data.labels.iter().zip(values) {
                let share = if total > 0.0 { value / total * 100.0 } else { 0.0 };
                let _ = writeln!(out, "  {label:<8} {value:>5} ({share:.0}%)");
            }
        }
    }
    out
}

pub fn render_dashboard(view: &DashboardView, charts: &TerminalSurface) -> String {
    let mut out = String::new();
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| EMPTY.to_string());

    let _ = writeln!(out, "== {} ==", text(&view.restaurant));
    if !view.status.is_empty() {
        let _ = writeln!(out, "status: {}", view.status);
    }
    let _ = writeln!(out, "Location: {}", text(&view.location));
    let _ = writeln!(out, "Contact: {}", text(&view.contact));
    if let Some(image) = &view.image {
        let _ = writeln!(out, "Image: {}{}", image.src, image_note(image.state));
    }
    let _ = writeln!(out, "Total reviews: {}", view.total_reviews);
    let _ = writeln!(out, "Average rating: {:.2}", view.average_rating);
    let _ = writeln!(out, "Positive: {}  Negative: {}", view.positive, view.negative);

    for slot in ChartSlot::ALL {
        if let Some(frame) = charts.frame(slot) {
            let _ = writeln!(out, "-- {} --", slot.canvas_id());
            out.push_str(frame);
        }
    }

    if !view.reviews.is_empty() {
        let _ = writeln!(out, "-- reviews --");
        for review in &view.reviews {
            let _ = writeln!(out, "  * {review}");
        }
    }

    render_section(&mut out, "similar", &view.similar);
    render_section(&mut out, "foryou", &view.for_you);

    if !view.feedback.review.is_empty() || view.feedback.rating.is_some() {
        let rating = view
            .feedback
            .rating
            .map(|rating| rating.to_string())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "feedback draft: review={:?} rating={rating}",
            view.feedback.review
        );
    }
    if !view.feedback_status.is_empty() {
        let _ = writeln!(out, "feedback: {}", view.feedback_status);
    }
    if !view.predicted_sentiment.is_empty() {
        let _ = writeln!(out, "{}", view.predicted_sentiment);
    }
    out
}

pub fn render_catalog(view: &CatalogView) -> String {
    let mut out = String::new();
    render_section(&mut out, &Grid::All.to_string(), &view.all);
    render_section(&mut out, &Grid::Top.to_string(), &view.top);
    for (location, section) in &view.locations {
        render_section(&mut out, &Grid::Location(location.clone()).to_string(), section);
    }
    render_section(&mut out, &Grid::Similar.to_string(), &view.similar);
    out
}

fn render_section(out: &mut String, name: &str, section: &CardSection) {
    let _ = writeln!(out, "-- {} [{name}] --", section.title);
    match &section.state {
        SectionState::Idle => {}
        SectionState::Loading(message)
        | SectionState::Empty(message)
        | SectionState::Failed(message) => {
            let _ = writeln!(out, "  {message}");
        }
        SectionState::Loaded(cards) => {
            for (index, card) in cards.iter().enumerate() {
                out.push_str(&render_card(index, card));
            }
        }
    }
}

pub fn render_card(index: usize, card: &CardView) -> String {
    let mut out = format!(
        "  [{index}] {} | {} | {}",
        card.restaurant, card.location, card.contact
    );
    if let Some(rating) = &card.rating {
        let _ = write!(out, " | avg {rating}");
    }
    let _ = writeln!(out, " | {}{}", card.image.src, image_note(card.image.state));
    out
}

fn image_note(state: ImageState) -> &'static str {
    match state {
        ImageState::Pending | ImageState::Loaded => "",
        ImageState::FellBack => " (fallback)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardOptions, render_card as card_view};
    use crate::charts::ChartManager;
    use crate::models::{RestaurantCardData, RestaurantSummary};
    use serde_json::json;

    fn summary() -> RestaurantSummary {
        serde_json::from_value(json!({
            "restaurant": "Momo House",
            "total_reviews": 4,
            "average_rating": 3.5,
            "positive": 3,
            "negative": 1,
            "rating_counts": { "1": 1, "5": 3 }
        }))
        .unwrap()
    }

    #[test]
    fn bar_chart_scales_to_largest_value() {
        let frame = draw_chart(&ChartSpec::rating(&summary()));
        let lines: Vec<&str> = frame.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[4].contains(&"#".repeat(30)));
        assert!(lines[1].ends_with("|  0"));
    }

    #[test]
    fn doughnut_shows_shares() {
        let frame = draw_chart(&ChartSpec::sentiment(&summary()));
        assert!(frame.contains("Positive"));
        assert!(frame.contains("(75%)"));
        assert!(frame.contains("(25%)"));
    }

    #[test]
    fn surface_holds_one_frame_per_slot() {
        let mut charts = ChartManager::new(TerminalSurface::new());
        charts.render(ChartSlot::Rating, &ChartSpec::rating(&summary()));
        charts.render(ChartSlot::Rating, &ChartSpec::rating(&summary()));
        assert!(charts.surface().frame(ChartSlot::Rating).is_some());

        charts.release(ChartSlot::Rating);
        assert!(charts.surface().frame(ChartSlot::Rating).is_none());
    }

    #[test]
    fn card_line_includes_rating_when_present() {
        let record = RestaurantCardData {
            restaurant: "Yak Shack".to_string(),
            location: None,
            contact: None,
            average_rating: Some(4.0),
        };
        let line = render_card(0, &card_view(&record, CardOptions { show_rating: true }));
        assert_eq!(
            line,
            "  [0] Yak Shack | Not available | Not available | avg 4.0 | /static/images/yakshack.jpg\n"
        );
    }

    #[test]
    fn empty_dashboard_uses_placeholders() {
        let out = render_dashboard(&DashboardView::default(), &TerminalSurface::new());
        assert!(out.starts_with("== — =="));
        assert!(out.contains("Total reviews: 0"));
        assert!(out.contains("Average rating: 0.00"));
    }
}
