//! Create/edit form for a single duty.
//!
//! [`DutyEditor`] holds no I/O. [`load_editor`] and [`send_submission`] perform
//! the requests, and the caller feeds their results back through
//! [`DutyEditor::finish_load`] and [`DutyEditor::finish_submit`]. No lock is
//! held while a request is in flight.

use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::Deserialize;
use shared::duties::api::{DutyApiError, DutyClient};
use shared::duties::models::{Duty, DutyPayload, DutyType, DutyWorker};
use thiserror::Error;
use tracing::{info, warn};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw form input, exactly as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFields {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub duty_type_id: String,
    #[serde(default)]
    pub duty_worker_id: String,
}

impl From<&Duty> for FormFields {
    fn from(duty: &Duty) -> Self {
        Self {
            date: duty.date.format(DATE_FORMAT).to_string(),
            duty_type_id: duty.duty_type.id.clone(),
            duty_worker_id: duty.duty_worker.id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorForm {
    pub fields: FormFields,
    pub errors: Vec<ValidationError>,
    pub notice: Option<String>,
}

impl EditorForm {
    fn with_fields(fields: FormFields) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceData {
    pub workers: Vec<DutyWorker>,
    pub types: Vec<DutyType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedEditor {
    pub reference: ReferenceData,
    pub existing: Option<Duty>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorPhase {
    Loading,
    Ready(EditorForm),
    Submitting(EditorForm),
    /// `draft` is kept after a failed submission so the form stays editable.
    /// A failed load has no draft and blocks the form.
    Error {
        message: String,
        draft: Option<EditorForm>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitRequest {
    Create(DutyPayload),
    Update { id: String, payload: DutyPayload },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRefused {
    #[error("reference data is still loading")]
    Loading,
    #[error("a submission is already in flight")]
    InFlight,
    #[error("reference data is unavailable")]
    Unavailable,
    #[error("form has {} invalid field(s)", .0.len())]
    Invalid(Vec<ValidationError>),
}

#[derive(Debug, Clone)]
pub struct DutyEditor {
    target_id: Option<String>,
    today: NaiveDate,
    reference: Option<ReferenceData>,
    phase: EditorPhase,
}

impl DutyEditor {
    pub fn new(target_id: Option<String>, today: NaiveDate) -> Self {
        Self {
            target_id,
            today,
            reference: None,
            phase: EditorPhase::Loading,
        }
    }

    pub fn target_id(&self) -> Option<&str> {
        self.target_id.as_deref()
    }

    pub const fn mode(&self) -> EditorMode {
        if self.target_id.is_some() {
            EditorMode::Edit
        } else {
            EditorMode::Create
        }
    }

    pub const fn phase(&self) -> &EditorPhase {
        &self.phase
    }

    pub fn reference(&self) -> Option<&ReferenceData> {
        self.reference.as_ref()
    }

    pub fn finish_load(&mut self, result: Result<LoadedEditor, DutyApiError>) {
        if !matches!(self.phase, EditorPhase::Loading) {
            warn!("ignoring editor load result outside of the loading phase");
            return;
        }

        match result {
            Ok(loaded) => {
                let fields = match &loaded.existing {
                    Some(duty) => FormFields::from(duty),
                    None => default_fields(&loaded.reference, self.today),
                };
                self.reference = Some(loaded.reference);
                self.phase = EditorPhase::Ready(EditorForm::with_fields(fields));
            }
            Err(e) => {
                warn!(error = ?e, target_id = ?self.target_id, "failed to load duty editor data");
                self.phase = EditorPhase::Error {
                    message: format!("Błąd pobierania danych: {}", e.user_message()),
                    draft: None,
                };
            }
        }
    }

    /// True only when the form is interactive and both option lists are usable.
    pub fn can_submit(&self) -> bool {
        let interactive = matches!(
            self.phase,
            EditorPhase::Ready(_) | EditorPhase::Error { draft: Some(_), .. }
        );
        interactive
            && self
                .reference
                .as_ref()
                .is_some_and(|r| !r.workers.is_empty() && !r.types.is_empty())
    }

    pub fn begin_submit(&mut self, fields: FormFields) -> Result<SubmitRequest, SubmitRefused> {
        match &self.phase {
            EditorPhase::Loading => return Err(SubmitRefused::Loading),
            EditorPhase::Submitting(_) => return Err(SubmitRefused::InFlight),
            EditorPhase::Error { draft: None, .. } => return Err(SubmitRefused::Unavailable),
            EditorPhase::Ready(_) | EditorPhase::Error { draft: Some(_), .. } => {}
        }
        if !self.can_submit() {
            return Err(SubmitRefused::Unavailable);
        }
        let Some(reference) = self.reference.as_ref() else {
            return Err(SubmitRefused::Unavailable);
        };

        match validate(&fields, reference) {
            Ok(payload) => {
                self.phase = EditorPhase::Submitting(EditorForm::with_fields(fields));
                Ok(match &self.target_id {
                    Some(id) => SubmitRequest::Update {
                        id: id.clone(),
                        payload,
                    },
                    None => SubmitRequest::Create(payload),
                })
            }
            Err(errors) => {
                self.phase = EditorPhase::Ready(EditorForm {
                    fields,
                    errors: errors.clone(),
                    notice: None,
                });
                Err(SubmitRefused::Invalid(errors))
            }
        }
    }

    pub fn finish_submit(&mut self, result: Result<Duty, DutyApiError>) {
        let EditorPhase::Submitting(form) = &self.phase else {
            warn!("ignoring submission result outside of the submitting phase");
            return;
        };
        let form = form.clone();

        match result {
            Ok(duty) => {
                info!(duty_id = %duty.id, mode = ?self.mode(), "duty saved");
                self.phase = match self.mode() {
                    EditorMode::Create => {
                        let fields = self
                            .reference
                            .as_ref()
                            .map(|r| default_fields(r, self.today))
                            .unwrap_or_default();
                        EditorPhase::Ready(EditorForm {
                            notice: Some("Dodano dyżur".to_string()),
                            ..EditorForm::with_fields(fields)
                        })
                    }
                    EditorMode::Edit => EditorPhase::Ready(EditorForm {
                        notice: Some("Zapisano zmiany dyżuru".to_string()),
                        ..form
                    }),
                };
            }
            Err(e) => {
                warn!(error = ?e, target_id = ?self.target_id, "failed to submit duty");
                self.phase = EditorPhase::Error {
                    message: format!("Błąd zapisu: {}", e.user_message()),
                    draft: Some(form),
                };
            }
        }
    }
}

/// Identifies one mounted editor. A submission is finished only on the editor it started on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorTicket(u64);

/// The single mounted editor. Remounting is refused while a submission is in flight.
#[derive(Debug, Default)]
pub struct EditorSlot {
    generation: u64,
    editor: Option<DutyEditor>,
}

impl EditorSlot {
    pub fn editor(&self) -> Option<&DutyEditor> {
        self.editor.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.editor
            .as_ref()
            .is_some_and(|e| matches!(e.phase(), EditorPhase::Submitting(_)))
    }

    pub fn mount(&mut self, editor: DutyEditor) -> Result<EditorTicket, SubmitRefused> {
        if self.is_submitting() {
            return Err(SubmitRefused::InFlight);
        }
        self.generation += 1;
        self.editor = Some(editor);
        Ok(EditorTicket(self.generation))
    }

    /// Ticket of the mounted editor when it edits `target_id`.
    pub fn ticket_for(&self, target_id: Option<&str>) -> Option<EditorTicket> {
        self.editor
            .as_ref()
            .filter(|e| e.target_id() == target_id)
            .map(|_| EditorTicket(self.generation))
    }

    pub fn get_mut(&mut self, ticket: EditorTicket) -> Option<&mut DutyEditor> {
        if ticket.0 == self.generation {
            self.editor.as_mut()
        } else {
            None
        }
    }
}

fn default_fields(reference: &ReferenceData, today: NaiveDate) -> FormFields {
    FormFields {
        date: today.format(DATE_FORMAT).to_string(),
        duty_type_id: reference
            .types
            .first()
            .map(|t| t.id.clone())
            .unwrap_or_default(),
        duty_worker_id: reference
            .workers
            .first()
            .map(|w| w.id.clone())
            .unwrap_or_default(),
    }
}

pub fn validate(
    fields: &FormFields,
    reference: &ReferenceData,
) -> Result<DutyPayload, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let date = fields.date.trim();
    let parsed_date = if date.is_empty() {
        errors.push(ValidationError::MissingDate);
        None
    } else {
        match NaiveDate::parse_from_str(date, DATE_FORMAT) {
            Ok(d) => Some(d),
            Err(_) => {
                errors.push(ValidationError::InvalidDate(date.to_string()));
                None
            }
        }
    };

    let type_id = fields.duty_type_id.trim();
    if type_id.is_empty() {
        errors.push(ValidationError::MissingType);
    } else if !reference.types.iter().any(|t| t.id == type_id) {
        errors.push(ValidationError::UnknownType(type_id.to_string()));
    }

    let worker_id = fields.duty_worker_id.trim();
    if worker_id.is_empty() {
        errors.push(ValidationError::MissingWorker);
    } else if !reference.workers.iter().any(|w| w.id == worker_id) {
        errors.push(ValidationError::UnknownWorker(worker_id.to_string()));
    }

    match parsed_date {
        Some(date) if errors.is_empty() => Ok(DutyPayload {
            date,
            duty_worker_id: worker_id.to_string(),
            duty_type_id: type_id.to_string(),
        }),
        _ => Err(errors),
    }
}

/// Fetches workers, types and the edited duty concurrently. Any failure fails the whole load.
pub async fn load_editor(
    client: &DutyClient,
    target_id: Option<&str>,
) -> Result<LoadedEditor, DutyApiError> {
    let existing = async {
        match target_id {
            Some(id) => client.get_duty(id).await.map(Some),
            None => Ok(None),
        }
    };

    let (workers, types, existing) =
        tokio::try_join!(client.list_workers(), client.list_types(), existing)?;

    Ok(LoadedEditor {
        reference: ReferenceData { workers, types },
        existing,
    })
}

pub async fn send_submission(
    client: &DutyClient,
    request: &SubmitRequest,
) -> Result<Duty, DutyApiError> {
    match request {
        SubmitRequest::Create(payload) => client.create_duty(payload).await,
        SubmitRequest::Update { id, payload } => client.update_duty(id, payload).await,
    }
}
