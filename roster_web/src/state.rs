use crate::editor::EditorSlot;
use crate::render::DayLabels;
use crate::roster::RosterController;
use chrono::{Local, Locale, NaiveDate};
use parking_lot::{Mutex, RwLock};
use shared::RosterConfig;
use shared::calendar::DateWindow;
use shared::duties::api::DutyClient;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct AppState {
    pub duty_client: DutyClient,
    pub roster: Arc<RwLock<RosterController>>,
    /// The one mounted editor. Replaced on every form page visit unless a submission is in flight.
    pub editor: Arc<Mutex<EditorSlot>>,
    pub labels: DayLabels,
}

impl AppState {
    pub fn new(duty_client: DutyClient, roster_config: &RosterConfig, locale: Locale) -> Self {
        let roster = RosterController::new(
            DateWindow::new(roster_config.rest_weekday),
            roster_config.paging_cooldown(),
            today(),
        );
        Self {
            duty_client,
            roster: Arc::new(RwLock::new(roster)),
            editor: Arc::new(Mutex::new(EditorSlot::default())),
            labels: DayLabels::new(locale),
        }
    }

    /// Remounts the roster: back to loading, then one background fetch of the full duty list.
    pub fn reload_duties(&self) {
        let ticket = self.roster.write().begin_load();
        let client = self.duty_client.clone();
        let roster = Arc::clone(&self.roster);
        debug!(?ticket, "spawning duty fetch");
        tokio::spawn(async move {
            let result = client.list_duties().await;
            roster.write().finish_load(ticket, result);
        });
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
