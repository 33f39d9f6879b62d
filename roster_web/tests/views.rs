//! End-to-end tests for the served views.
//!
//! Each test starts a fake duty service and the roster app on random ports and
//! drives the app over HTTP.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Locale, NaiveDate};
use roster_web::render::{LOADING_DUTIES, NO_DUTIES};
use roster_web::{AppState, router};
use serde_json::{Value, json};
use shared::Config;
use shared::duties::api::DutyClient;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Default)]
struct FakeService {
    duties: Arc<Mutex<Vec<Value>>>,
    fail_duties: bool,
    fail_workers: bool,
    reject_writes: Option<String>,
    write_delay: Duration,
    received: Arc<Mutex<Vec<(String, Value)>>>,
}

fn duty_json(id: &str, date: NaiveDate, time: &str, type_name: &str) -> Value {
    json!({
        "id": id,
        "date": date.format("%Y-%m-%d").to_string(),
        "dutyWorker": { "id": "w1", "name": "Anna" },
        "type": { "id": "t1", "name": type_name, "time": time, "address": "ul. Lipowa 3" }
    })
}

async fn list_duties(State(fake): State<FakeService>) -> Response {
    if fake.fail_duties {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(Value::Array(fake.duties.lock().unwrap().clone())).into_response()
}

async fn get_duty(State(fake): State<FakeService>, Path(id): Path<String>) -> Response {
    let duties = fake.duties.lock().unwrap().clone();
    match duties.into_iter().find(|d| d["id"] == id.as_str()) {
        Some(duty) => Json(duty).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Nie znaleziono dyżuru" })),
        )
            .into_response(),
    }
}

fn write_response(fake: &FakeService, id: &str, body: &Value) -> Response {
    if let Some(message) = &fake.reject_writes {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": message })),
        )
            .into_response();
    }
    let date: NaiveDate = body["date"].as_str().unwrap().parse().unwrap();
    Json(duty_json(id, date, "08:00", "Poranny")).into_response()
}

async fn create_duty(State(fake): State<FakeService>, Json(body): Json<Value>) -> Response {
    fake.received
        .lock()
        .unwrap()
        .push(("POST /duties".to_string(), body.clone()));
    sleep(fake.write_delay).await;
    write_response(&fake, "new", &body)
}

async fn update_duty(
    State(fake): State<FakeService>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    fake.received
        .lock()
        .unwrap()
        .push((format!("PUT /duties/{id}"), body.clone()));
    sleep(fake.write_delay).await;
    write_response(&fake, &id, &body)
}

async fn list_workers(State(fake): State<FakeService>) -> Response {
    if fake.fail_workers {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(json!([
        { "id": "w1", "name": "Anna" },
        { "id": "w2", "name": "Piotr" }
    ]))
    .into_response()
}

async fn list_types() -> Json<Value> {
    Json(json!([
        { "id": "t1", "name": "Poranny", "time": "08:00", "address": "ul. Lipowa 3" },
        { "id": "t2", "name": "Popołudniowy", "time": "14:00", "address": "ul. Lipowa 3" }
    ]))
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{port}")
}

struct Harness {
    app_url: String,
    state: AppState,
    fake: FakeService,
    http: reqwest::Client,
}

async fn start(fake: FakeService) -> Harness {
    let service = Router::new()
        .route("/v1/duties", get(list_duties).post(create_duty))
        .route("/v1/duties/{id}", get(get_duty).put(update_duty))
        .route("/v1/dutyWorkers", get(list_workers))
        .route("/v1/dutyTypes", get(list_types))
        .with_state(fake.clone());
    let service_url = serve(service).await;

    let mut roster_config = Config::default().roster;
    roster_config.paging_cooldown_ms = 60_000;
    let client = DutyClient::new_with_client(reqwest::Client::new(), format!("{service_url}/v1"));
    let state = AppState::new(client, &roster_config, Locale::pl_PL);

    let app_url = serve(router(state.clone())).await;
    Harness {
        app_url,
        state,
        fake,
        http: reqwest::Client::new(),
    }
}

impl Harness {
    async fn load_roster(&self) {
        self.state.reload_duties();
        timeout(TEST_TIMEOUT, async {
            while self.state.roster.read().is_loading() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("duties never finished loading");
    }

    async fn get(&self, path: &str) -> (StatusCode, String) {
        let response = self
            .http
            .get(format!("{}{path}", self.app_url))
            .send()
            .await
            .unwrap();
        (response.status(), response.text().await.unwrap())
    }

    async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> (StatusCode, String) {
        let response = self
            .http
            .post(format!("{}{path}", self.app_url))
            .form(fields)
            .send()
            .await
            .unwrap();
        (response.status(), response.text().await.unwrap())
    }

    fn received(&self) -> Vec<(String, Value)> {
        self.fake.received.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn roster_groups_duties_for_the_anchor_day() {
    let harness = start(FakeService::default()).await;
    let anchor = harness.state.roster.read().anchor();
    *harness.fake.duties.lock().unwrap() = vec![
        duty_json("1", anchor, "14:00", "Popołudniowy"),
        duty_json("2", anchor, "09:00", "Poranny"),
    ];
    harness.load_roster().await;

    let (status, html) = harness.get("/?view=day").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!html.contains(LOADING_DUTIES));
    let morning = html.find("Poranny").unwrap();
    let afternoon = html.find("Popołudniowy").unwrap();
    assert!(morning < afternoon);

    let (_, week) = harness.get("/").await;
    assert_eq!(week.matches("class=\"day-column\"").count(), 6);
    assert_eq!(week.matches(NO_DUTIES).count(), 5);
}

#[tokio::test]
async fn failed_duty_fetch_renders_empty_roster_without_error() {
    let harness = start(FakeService {
        fail_duties: true,
        ..FakeService::default()
    })
    .await;
    harness.load_roster().await;

    let (status, html) = harness.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(html.matches(NO_DUTIES).count(), 6);
    assert!(!html.contains("role=\"alert\""));
}

#[tokio::test]
async fn paging_moves_anchor_once_per_cooldown() {
    let harness = start(FakeService::default()).await;
    harness.load_roster().await;
    let anchor = harness.state.roster.read().anchor();

    let (status, html) = harness.post_form("/page/next?view=week", &[]).await;
    assert_eq!(status, StatusCode::OK);
    let moved = harness.state.roster.read().anchor();
    assert_eq!((moved - anchor).num_days(), 7);
    assert!(html.contains(&format!("data-day=\"{}\"", moved.format("%Y-%m-%d"))));

    harness.post_form("/page/previous?view=week", &[]).await;
    assert_eq!(harness.state.roster.read().anchor(), moved);
}

#[tokio::test]
async fn new_duty_form_defaults_and_creates() {
    let harness = start(FakeService::default()).await;

    let (status, html) = harness.get("/form").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Dodawanie dyżuru"));
    let today = roster_web::state::today().format("%Y-%m-%d").to_string();
    assert!(html.contains(&format!("value=\"{today}\"")));
    assert!(html.contains("<option value=\"t1\" selected>"));
    assert!(html.contains("<option value=\"w1\" selected>"));

    let (status, html) = harness
        .post_form(
            "/form",
            &[
                ("date", "2024-06-12"),
                ("dutyTypeId", "t2"),
                ("dutyWorkerId", "w2"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Dodano dyżur"));
    assert!(html.contains("<option value=\"t1\" selected>"));

    assert_eq!(
        harness.received(),
        vec![(
            "POST /duties".to_string(),
            json!({ "date": "2024-06-12", "dutyWorkerId": "w2", "dutyTypeId": "t2" })
        )]
    );
}

#[tokio::test]
async fn edit_form_populates_and_updates_by_id() {
    let fake = FakeService::default();
    *fake.duties.lock().unwrap() = vec![json!({
        "id": "42",
        "date": "2024-06-14",
        "dutyWorker": { "id": "w2", "name": "Piotr" },
        "type": { "id": "t2", "name": "Popołudniowy", "time": "14:00", "address": "" }
    })];
    let harness = start(fake).await;

    let (_, html) = harness.get("/form/42").await;
    assert!(html.contains("Edytowanie dyżuru"));
    assert!(html.contains("value=\"2024-06-14\""));
    assert!(html.contains("<option value=\"t2\" selected>"));
    assert!(html.contains("<option value=\"w2\" selected>"));
    assert!(html.contains("action=\"/form/42\""));

    let (status, html) = harness
        .post_form(
            "/form/42",
            &[
                ("date", "2024-06-15"),
                ("dutyTypeId", "t2"),
                ("dutyWorkerId", "w2"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("value=\"2024-06-15\""));
    assert_eq!(
        harness.received(),
        vec![(
            "PUT /duties/42".to_string(),
            json!({ "date": "2024-06-15", "dutyWorkerId": "w2", "dutyTypeId": "t2" })
        )]
    );
}

#[tokio::test]
async fn reference_data_failure_shows_error_panel() {
    let harness = start(FakeService {
        fail_workers: true,
        ..FakeService::default()
    })
    .await;

    let (status, html) = harness.get("/form").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("error-panel"));
    assert!(html.contains("API request failed with status 503"));
    assert!(!html.contains("<select"));

    let (status, _) = harness
        .post_form(
            "/form",
            &[("date", "2024-06-12"), ("dutyTypeId", "t1"), ("dutyWorkerId", "w1")],
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(harness.received().is_empty());
}

#[tokio::test]
async fn rejected_submission_is_shown_inline_and_form_stays_editable() {
    let harness = start(FakeService {
        reject_writes: Some("Kurier ma już dyżur".to_string()),
        ..FakeService::default()
    })
    .await;
    harness.get("/form").await;

    let (status, html) = harness
        .post_form(
            "/form",
            &[("date", "2024-06-12"), ("dutyTypeId", "t1"), ("dutyWorkerId", "w2")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(html.contains("Błąd zapisu: Kurier ma już dyżur"));
    assert!(html.contains("<option value=\"w2\" selected>"));
    assert!(html.contains("<button type=\"submit\">Dodaj dyżur</button>"));
}

#[tokio::test]
async fn invalid_form_is_not_sent() {
    let harness = start(FakeService::default()).await;

    let (status, html) = harness
        .post_form("/form", &[("date", ""), ("dutyTypeId", "t1"), ("dutyWorkerId", "w1")])
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(html.contains("Data jest wymagana"));
    assert!(harness.received().is_empty());
}

fn slow_writes() -> FakeService {
    let fake = FakeService {
        write_delay: Duration::from_millis(500),
        ..FakeService::default()
    };
    *fake.duties.lock().unwrap() = vec![duty_json(
        "42",
        "2024-06-14".parse().unwrap(),
        "14:00",
        "Popołudniowy",
    )];
    fake
}

const NEW_DUTY: [(&str, &str); 3] = [
    ("date", "2024-06-12"),
    ("dutyTypeId", "t1"),
    ("dutyWorkerId", "w2"),
];

#[tokio::test]
async fn second_submission_is_refused_while_first_is_in_flight() {
    let harness = start(slow_writes()).await;
    harness.get("/form").await;

    let first = harness.post_form("/form", &NEW_DUTY);
    let second = async {
        sleep(Duration::from_millis(150)).await;
        harness.post_form("/form", &NEW_DUTY).await
    };
    let ((first_status, first_html), (second_status, second_html)) = tokio::join!(first, second);

    assert_eq!(second_status, StatusCode::CONFLICT);
    assert!(second_html.contains("Dodawanie..."));
    assert_eq!(first_status, StatusCode::OK);
    assert!(first_html.contains("Dodano dyżur"));
    assert_eq!(harness.received().len(), 1);
}

#[tokio::test]
async fn editor_is_not_remounted_under_a_running_submission() {
    let harness = start(slow_writes()).await;

    let create = harness.post_form("/form", &NEW_DUTY);
    let others = async {
        sleep(Duration::from_millis(150)).await;
        let edit = harness
            .post_form(
                "/form/42",
                &[
                    ("date", "2024-06-15"),
                    ("dutyTypeId", "t2"),
                    ("dutyWorkerId", "w1"),
                ],
            )
            .await;
        let view = harness.get("/form/42").await;
        (edit, view)
    };
    let ((create_status, create_html), ((edit_status, _), (view_status, _))) =
        tokio::join!(create, others);

    assert_eq!(edit_status, StatusCode::CONFLICT);
    assert_eq!(view_status, StatusCode::CONFLICT);
    assert_eq!(create_status, StatusCode::OK);
    assert!(create_html.contains("Dodano dyżur"));
    assert!(!create_html.contains("Edytowanie dyżuru"));

    let received = harness.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0, "POST /duties");

    let (status, html) = harness.get("/form/42").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Edytowanie dyżuru"));
}
