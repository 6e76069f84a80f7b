use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use restaurant_dashboard::cards::DEFAULT_IMAGE;
use restaurant_dashboard::catalog::{CardKey, ClickResult, Grid};
use restaurant_dashboard::clicks::ManualTimer;
use restaurant_dashboard::dashboard::{FeedbackOutcome, SearchOutcome};
use restaurant_dashboard::errors::ErrorKind;
use restaurant_dashboard::ui::TerminalSurface;
use restaurant_dashboard::{Backend, CatalogController, DashboardController, HttpBackend};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const RESTAURANT: &str = "Momo House";

#[derive(Default)]
struct MockData {
    total_reviews: u64,
    summary_hits: u32,
    similar_hits: u32,
    feedback_bodies: Vec<Value>,
    user_queries: Vec<HashMap<String, String>>,
}

#[derive(Clone, Default)]
struct MockBackend {
    data: Arc<Mutex<MockData>>,
}

impl MockBackend {
    fn with<R>(&self, f: impl FnOnce(&mut MockData) -> R) -> R {
        f(&mut self.data.lock().unwrap())
    }
}

fn cards() -> Value {
    json!([
        { "restaurant": "Yak Shack", "location": "Thamel", "contact": "01-1111111", "average_rating": 3.8 },
        { "restaurant": "Momo House", "location": "Thamel", "contact": null, "average_rating": 4.6 },
        { "restaurant": "Ghost Kitchen", "location": "Patan" }
    ])
}

async fn names() -> Json<Value> {
    Json(json!(["Ghost Kitchen", "Momo House", "Yak Shack"]))
}

async fn card_list() -> Json<Value> {
    Json(cards())
}

async fn summary(
    State(mock): State<MockBackend>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let name = params.get("restaurant").cloned().unwrap_or_default();
    let total = mock.with(|data| {
        data.summary_hits += 1;
        data.total_reviews
    });
    if !RESTAURANT.to_lowercase().contains(&name.trim().to_lowercase()) || name.trim().is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Restaurant not found" })),
        )
            .into_response();
    }
    Json(json!({
        "restaurant": RESTAURANT,
        "location": "Thamel",
        "contact": "01-4444444",
        "total_reviews": total,
        "average_rating": 4.5,
        "rating_counts": { "4": 1, "5": 1 },
        "positive": 2,
        "negative": 0,
        "examples": { "positive": ["juicy momo"], "negative": [] }
    }))
    .into_response()
}

async fn similar(State(mock): State<MockBackend>) -> Json<Value> {
    mock.with(|data| data.similar_hits += 1);
    Json(json!([{ "restaurant": "Yak Shack", "location": "Thamel", "contact": "01-1111111" }]))
}

async fn user_recommendations(
    State(mock): State<MockBackend>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    mock.with(|data| data.user_queries.push(params));
    Json(cards())
}

async fn submit_feedback(State(mock): State<MockBackend>, Json(body): Json<Value>) -> Response {
    if let Some(rating) = body.get("rating").and_then(Value::as_u64) {
        if !(1..=5).contains(&rating) {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid rating" })),
            )
                .into_response();
        }
    }
    let sentiment = match body.get("rating").and_then(Value::as_u64) {
        Some(rating) if rating < 3 => "Negative",
        _ => "Positive",
    };
    mock.with(|data| {
        data.total_reviews += 1;
        data.feedback_bodies.push(body.clone());
    });
    Json(json!({ "restaurant": body["restaurant"], "sentiment": sentiment })).into_response()
}

async fn image(Path(file): Path<String>) -> StatusCode {
    match file.as_str() {
        "default.jpg" | "momohouse.jpg" | "yakshack.jpg" => StatusCode::OK,
        _ => StatusCode::NOT_FOUND,
    }
}

async fn spawn_mock(mock: MockBackend) -> String {
    let app = Router::new()
        .route("/api/restaurants", get(names))
        .route("/api/restaurants_with_details", get(card_list))
        .route("/api/recommendations", get(card_list))
        .route("/api/recommend_by_location", get(card_list))
        .route("/api/summary", get(summary))
        .route("/api/similar_restaurants", get(similar))
        .route("/api/user_recommendations", get(user_recommendations))
        .route("/api/submit_feedback", post(submit_feedback))
        .route("/static/images/:file", get(image))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend");
    });
    format!("http://127.0.0.1:{port}")
}

fn backend(base_url: &str) -> HttpBackend {
    HttpBackend::new(base_url, Duration::from_secs(5)).expect("backend")
}

#[tokio::test]
async fn http_search_requests_summary_and_similar_once() {
    let mock = MockBackend::default();
    mock.with(|data| data.total_reviews = 7);
    let base_url = spawn_mock(mock.clone()).await;
    let dashboard = DashboardController::new(backend(&base_url), TerminalSurface::new());

    assert_eq!(dashboard.search("momo").await, SearchOutcome::Loaded);

    let view = dashboard.view().await;
    assert_eq!(view.restaurant.as_deref(), Some(RESTAURANT));
    assert_eq!(view.total_reviews, 7);
    assert_eq!(view.reviews, ["juicy momo"]);
    assert_eq!(view.similar.cards()[0].restaurant, "Yak Shack");
    mock.with(|data| {
        assert_eq!(data.summary_hits, 1);
        assert_eq!(data.similar_hits, 1);
    });
}

#[tokio::test]
async fn http_unknown_restaurant_is_not_found() {
    let mock = MockBackend::default();
    let base_url = spawn_mock(mock.clone()).await;
    let http = backend(&base_url);

    let err = http.summary("Nowhere").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.message, "Restaurant not found");

    let dashboard = DashboardController::new(http, TerminalSurface::new());
    assert_eq!(dashboard.search("Nowhere").await, SearchOutcome::NotFound);
    assert_eq!(dashboard.view().await.status, "Not found");
    mock.with(|data| assert_eq!(data.similar_hits, 0));
}

#[tokio::test]
async fn http_feedback_round_trip_updates_review_count() {
    let mock = MockBackend::default();
    mock.with(|data| data.total_reviews = 2);
    let base_url = spawn_mock(mock.clone()).await;
    let dashboard = DashboardController::new(backend(&base_url), TerminalSurface::new());
    dashboard.search(RESTAURANT).await;

    dashboard.set_rating(Some(2)).await;
    let outcome = dashboard.submit_feedback().await;

    assert_eq!(
        outcome,
        FeedbackOutcome::Submitted {
            sentiment: Some("Negative".to_string())
        }
    );
    let view = dashboard.view().await;
    assert_eq!(view.total_reviews, 3);
    assert_eq!(view.predicted_sentiment, "Saved as Negative");
    assert_eq!(view.for_you.cards().len(), 3);
    mock.with(|data| {
        assert_eq!(
            data.feedback_bodies,
            vec![json!({ "restaurant": RESTAURANT, "rating": 2 })]
        );
        assert_eq!(data.user_queries.len(), 1);
        assert_eq!(data.user_queries[0]["sentiment"], "Negative");
        assert_eq!(data.summary_hits, 2);
    });
}

#[tokio::test]
async fn http_server_error_message_is_surfaced() {
    let mock = MockBackend::default();
    let base_url = spawn_mock(mock.clone()).await;
    let http = backend(&base_url);

    let payload = restaurant_dashboard::models::FeedbackPayload {
        restaurant: RESTAURANT.to_string(),
        review: None,
        rating: Some(9),
    };
    let err = http.submit_feedback(&payload).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Server);
    assert_eq!(err.message, "Invalid rating");
}

#[tokio::test]
async fn http_catalog_clicks_and_image_fallback() {
    let mock = MockBackend::default();
    let base_url = spawn_mock(mock.clone()).await;
    let mut catalog = CatalogController::new(
        backend(&base_url),
        ManualTimer::new(),
        Duration::from_millis(250),
    );
    catalog.load_page(&["Thamel".to_string()]).await;

    let top = catalog.view().section(&Grid::Top).unwrap();
    assert_eq!(top.cards()[0].restaurant, RESTAURANT);

    let key = CardKey::new(Grid::All, 0);
    let ClickResult::Pending(handle) = catalog.click(key.clone()) else {
        panic!("first click must wait");
    };
    assert_eq!(catalog.timer_mut().advance(Duration::from_millis(250)), vec![handle]);
    assert_eq!(catalog.on_timer(handle).await.as_deref(), Some("Yak Shack"));
    mock.with(|data| assert_eq!(data.similar_hits, 1));

    assert!(matches!(catalog.click(key.clone()), ClickResult::Pending(_)));
    assert_eq!(
        catalog.click(key),
        ClickResult::Navigate("/dashboard?restaurant=Yak+Shack".to_string())
    );
    mock.with(|data| assert_eq!(data.similar_hits, 1));

    assert!(catalog.resolve_images().await > 0);
    let ghost = catalog.view().all.card(2).unwrap();
    assert_eq!(ghost.image.src, DEFAULT_IMAGE);
    let momo = catalog.view().all.card(1).unwrap();
    assert_eq!(momo.image.src, "/static/images/momohouse.jpg");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_binary_renders_dashboard() {
    let mock = MockBackend::default();
    mock.with(|data| data.total_reviews = 11);
    let base_url = spawn_mock(mock.clone()).await;

    let output = tokio::task::spawn_blocking(move || {
        let mut child = Command::new(env!("CARGO_BIN_EXE_restaurant_dashboard"))
            .env("DASHBOARD_API_URL", &base_url)
            .env("RUST_LOG", "warn")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .expect("failed to spawn dashboard");
        child
            .stdin
            .take()
            .expect("stdin")
            .write_all(b"search momo house\nopen ?restaurant=Nowhere\nquit\n")
            .expect("write commands");
        child.wait_with_output().expect("dashboard output")
    })
    .await
    .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("== Momo House =="));
    assert!(stdout.contains("Total reviews: 11"));
    assert!(stdout.contains("-- ratingChart --"));
    assert!(stdout.contains("-> ?restaurant=Nowhere"));
    assert!(stdout.contains("status: Not found"));
}
