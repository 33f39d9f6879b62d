use crate::editor::{DutyEditor, EditorSlot, FormFields, load_editor, send_submission};
use crate::render::{editor_page, roster_page};
use crate::roster::{DisplayMode, PageOutcome};
use crate::state::{AppState, today};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use shared::calendar::Direction;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub view: DisplayMode,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(show_roster))
        .route("/page/previous", post(previous_page))
        .route("/page/next", post(next_page))
        .route("/reload", post(reload_roster))
        .route("/form", get(new_duty_form).post(submit_new_duty))
        .route("/form/{id}", get(edit_duty_form).post(submit_duty_edit))
        .route("/health", get(|| async { StatusCode::OK }))
        .with_state(state)
}

fn roster_location(mode: DisplayMode) -> String {
    format!("/?view={}", mode.query_value())
}

async fn show_roster(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> Html<String> {
    let snapshot = state.roster.read().snapshot(query.view);
    Html(roster_page(&snapshot, &state.labels))
}

async fn previous_page(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> Redirect {
    page(&state, Direction::Backward, query.view)
}

async fn next_page(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> Redirect {
    page(&state, Direction::Forward, query.view)
}

fn page(state: &AppState, direction: Direction, mode: DisplayMode) -> Redirect {
    let outcome = state.roster.write().page(direction, mode, Instant::now());
    match outcome {
        PageOutcome::Moved(anchor) => info!(%anchor, ?direction, ?mode, "paged roster"),
        PageOutcome::Throttled => debug!(?direction, "dropped page request during cool-down"),
        PageOutcome::Loading => debug!(?direction, "dropped page request while duties load"),
    }
    Redirect::to(&roster_location(mode))
}

async fn reload_roster(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> Redirect {
    state.reload_duties();
    Redirect::to(&roster_location(query.view))
}

async fn new_duty_form(State(state): State<AppState>) -> Response {
    show_editor(&state, None).await
}

async fn edit_duty_form(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    show_editor(&state, Some(id)).await
}

async fn submit_new_duty(State(state): State<AppState>, Form(fields): Form<FormFields>) -> Response {
    submit(&state, None, fields).await
}

async fn submit_duty_edit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(fields): Form<FormFields>,
) -> Response {
    submit(&state, Some(id), fields).await
}

async fn mount_editor(state: &AppState, target_id: Option<String>) -> DutyEditor {
    let mut editor = DutyEditor::new(target_id, today());
    let loaded = load_editor(&state.duty_client, editor.target_id()).await;
    editor.finish_load(loaded);
    editor
}

/// 409 with the editor whose submission is still running.
fn submission_in_flight(slot: &EditorSlot) -> Response {
    warn!("refusing editor request while a duty submission is in flight");
    match slot.editor() {
        Some(editor) => (StatusCode::CONFLICT, Html(editor_page(editor))).into_response(),
        None => StatusCode::CONFLICT.into_response(),
    }
}

async fn show_editor(state: &AppState, target_id: Option<String>) -> Response {
    {
        let slot = state.editor.lock();
        if slot.is_submitting() {
            return submission_in_flight(&slot);
        }
    }

    let editor = mount_editor(state, target_id).await;
    let html = editor_page(&editor);
    let mut slot = state.editor.lock();
    match slot.mount(editor) {
        Ok(_) => Html(html).into_response(),
        Err(_) => submission_in_flight(&slot),
    }
}

async fn submit(state: &AppState, target_id: Option<String>, fields: FormFields) -> Response {
    let mounted = {
        let slot = state.editor.lock();
        if slot.is_submitting() {
            return submission_in_flight(&slot);
        }
        slot.ticket_for(target_id.as_deref())
    };
    let ticket = match mounted {
        Some(ticket) => ticket,
        None => {
            let editor = mount_editor(state, target_id).await;
            let mut slot = state.editor.lock();
            match slot.mount(editor) {
                Ok(ticket) => ticket,
                Err(_) => return submission_in_flight(&slot),
            }
        }
    };

    let request = {
        let mut slot = state.editor.lock();
        if slot.is_submitting() {
            return submission_in_flight(&slot);
        }
        let Some(editor) = slot.get_mut(ticket) else {
            debug!(?ticket, "editor was remounted before the submission started");
            return StatusCode::CONFLICT.into_response();
        };
        match editor.begin_submit(fields) {
            Ok(request) => request,
            Err(refused) => {
                debug!(reason = %refused, "duty submission refused");
                return (StatusCode::UNPROCESSABLE_ENTITY, Html(editor_page(editor)))
                    .into_response();
            }
        }
    };

    let result = send_submission(&state.duty_client, &request).await;
    let saved = result.is_ok();
    if saved {
        state.reload_duties();
    }

    let mut slot = state.editor.lock();
    let Some(editor) = slot.get_mut(ticket) else {
        warn!(?ticket, saved, "editor was replaced while its submission was in flight");
        return StatusCode::CONFLICT.into_response();
    };
    editor.finish_submit(result);
    let html = Html(editor_page(editor));
    if saved {
        html.into_response()
    } else {
        (StatusCode::BAD_GATEWAY, html).into_response()
    }
}
