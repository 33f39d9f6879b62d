use crate::editor::{DutyEditor, EditorForm, EditorMode, EditorPhase, ReferenceData};
use crate::roster::{DaySlot, DisplayMode, RosterSnapshot};
use chrono::{Locale, NaiveDate};
use shared::duties::models::Duty;

pub const LOADING_DUTIES: &str = "Ładowanie dyżurów...";
pub const NO_DUTIES: &str = "Nie zaplanowano dyżurów na ten dzień.";
pub const LOADING_FORM: &str = "Pobieranie danych...";

/// Localized day labels. Display only, never used as lookup keys.
#[derive(Debug, Clone, Copy)]
pub struct DayLabels {
    locale: Locale,
}

impl DayLabels {
    pub const fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn weekday_long(&self, day: NaiveDate) -> String {
        day.format_localized("%A", self.locale).to_string()
    }

    pub fn day_month_long(&self, day: NaiveDate) -> String {
        day.format_localized("%-d %B", self.locale).to_string()
    }

    pub fn column_heading(&self, day: NaiveDate) -> String {
        day.format_localized("%a %-d.%m", self.locale).to_string()
    }
}

/// Path of the editor for one duty. The id is percent-encoded as a single segment.
pub fn duty_form_path(id: &str) -> String {
    format!("/form/{}", urlencoding::encode(id))
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(body: &str, auto_refresh: bool) -> String {
    let refresh = if auto_refresh {
        r#"<meta http-equiv="refresh" content="1">"#
    } else {
        ""
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"pl\">\n<head><meta charset=\"utf-8\">{refresh}<title>Pop-Engine</title></head>\n<body>\n<h1>Pop-Engine</h1>\n{body}\n</body>\n</html>\n"
    )
}

fn disabled_attr(disabled: bool) -> &'static str {
    if disabled { " disabled" } else { "" }
}

pub fn roster_page(snapshot: &RosterSnapshot, labels: &DayLabels) -> String {
    let view = snapshot.mode.query_value();
    let disabled = disabled_attr(snapshot.loading);

    let heading = match snapshot.mode {
        DisplayMode::SingleDay => format!(
            "<h2 class=\"single-day\">{}<br>{}</h2>",
            escape(&labels.weekday_long(snapshot.anchor)),
            escape(&labels.day_month_long(snapshot.anchor)),
        ),
        DisplayMode::MultiDay => {
            let last = snapshot.days.last().map_or(snapshot.anchor, |d| d.date);
            format!(
                "<h2 class=\"date-range\">{} - {}</h2>",
                escape(&labels.day_month_long(snapshot.anchor)),
                escape(&labels.day_month_long(last)),
            )
        }
    };

    let picker = format!(
        "<nav class=\"date-picker\">\
<form method=\"post\" action=\"/page/previous?view={view}\"><button type=\"submit\" aria-label=\"Previous Period\"{disabled}>&lt;</button></form>\
{heading}\
<form method=\"post\" action=\"/page/next?view={view}\"><button type=\"submit\" aria-label=\"Next Period\"{disabled}>&gt;</button></form>\
</nav>"
    );

    let toolbar = format!(
        "<p class=\"toolbar\"><a href=\"/?view=day\">Dzień</a> | <a href=\"/?view=week\">Tydzień</a> | <a href=\"/form\">Dodaj dyżur</a></p>\
<form method=\"post\" action=\"/reload?view={view}\"><button type=\"submit\"{disabled}>Odśwież</button></form>"
    );

    let days = match snapshot.mode {
        DisplayMode::SingleDay => snapshot
            .days
            .first()
            .map(|slot| day_list(slot, "duty-card"))
            .unwrap_or_default(),
        DisplayMode::MultiDay => {
            let columns: String = snapshot
                .days
                .iter()
                .map(|slot| {
                    format!(
                        "<section class=\"day-column\" data-day=\"{}\"><h3>{}</h3>{}</section>",
                        slot.date.format("%Y-%m-%d"),
                        escape(&labels.column_heading(slot.date)),
                        day_list(slot, "duty-tile"),
                    )
                })
                .collect();
            format!("<div class=\"week\">{columns}</div>")
        }
    };

    page(&format!("{picker}\n{toolbar}\n{days}"), snapshot.loading)
}

fn day_list(slot: &DaySlot, card_class: &str) -> String {
    match &slot.duties {
        None => format!("<p class=\"loading\">{LOADING_DUTIES}</p>"),
        Some(duties) if duties.is_empty() => format!("<p class=\"empty\">{NO_DUTIES}</p>"),
        Some(duties) => {
            let cards: String = duties.iter().map(|d| duty_card(d, card_class)).collect();
            format!("<ul class=\"duties\">{cards}</ul>")
        }
    }
}

fn duty_card(duty: &Duty, card_class: &str) -> String {
    format!(
        "<li class=\"{card_class}\"><a href=\"{href}\">\
<strong class=\"time\">{time}</strong> <span class=\"type\">{name}</span> <span class=\"address\">{address}</span> \
<span class=\"courier\">Kurier: {worker} {worker_id}</span></a></li>",
        href = escape(&duty_form_path(&duty.id)),
        time = escape(&duty.duty_type.time),
        name = escape(&duty.duty_type.name),
        address = escape(&duty.duty_type.address),
        worker = escape(&duty.duty_worker.name),
        worker_id = escape(&duty.duty_worker.id),
    )
}

pub fn editor_page(editor: &DutyEditor) -> String {
    let body = match editor.phase() {
        EditorPhase::Loading => format!("<p class=\"loading\">{LOADING_FORM}</p>"),
        EditorPhase::Error {
            message,
            draft: None,
        } => format!(
            "<div class=\"error-panel\" role=\"alert\"><p><strong>Error:</strong></p><p>{}</p>\
<p>Coś poszło nie tak podczas pobierania danych. Spróbuj ponownie później.</p></div>",
            escape(message)
        ),
        EditorPhase::Error {
            message,
            draft: Some(form),
        } => format!(
            "<p class=\"error\" role=\"alert\">{}</p>{}",
            escape(message),
            duty_form(editor, form, false)
        ),
        EditorPhase::Ready(form) => duty_form(editor, form, false),
        EditorPhase::Submitting(form) => duty_form(editor, form, true),
    };
    page(&format!("{body}\n<p><a href=\"/\">Powrót do grafiku</a></p>"), false)
}

fn duty_form(editor: &DutyEditor, form: &EditorForm, submitting: bool) -> String {
    let empty = ReferenceData::default();
    let reference = editor.reference().unwrap_or(&empty);
    let (title, button, busy) = match editor.mode() {
        EditorMode::Create => ("Dodawanie dyżuru", "Dodaj dyżur", "Dodawanie..."),
        EditorMode::Edit => ("Edytowanie dyżuru", "Edytuj dyżur", "Edytowanie..."),
    };
    let action = match editor.target_id() {
        Some(id) => escape(&duty_form_path(id)),
        None => "/form".to_string(),
    };

    let notice = form
        .notice
        .as_deref()
        .map(|n| format!("<p class=\"notice\">{}</p>", escape(n)))
        .unwrap_or_default();
    let errors = if form.errors.is_empty() {
        String::new()
    } else {
        let items: String = form
            .errors
            .iter()
            .map(|e| format!("<li>{}</li>", escape(&e.to_string())))
            .collect();
        format!("<ul class=\"field-errors\">{items}</ul>")
    };

    let type_options = if reference.types.is_empty() {
        "<option value=\"\" disabled>Brak dostępnych typów dyżurów</option>".to_string()
    } else {
        reference
            .types
            .iter()
            .map(|t| {
                option(
                    &t.id,
                    &format!("{} {}", t.name, t.time),
                    t.id == form.fields.duty_type_id,
                )
            })
            .collect()
    };
    let worker_options = if reference.workers.is_empty() {
        "<option value=\"\" disabled>Brak dostępnych kurierów</option>".to_string()
    } else {
        reference
            .workers
            .iter()
            .map(|w| {
                option(
                    &w.id,
                    &format!("{} {}", w.name, w.id),
                    w.id == form.fields.duty_worker_id,
                )
            })
            .collect()
    };

    let submit_disabled = disabled_attr(submitting || !editor.can_submit());
    let label = if submitting { busy } else { button };

    format!(
        "<h2>{title}</h2>{notice}{errors}\
<form method=\"post\" action=\"{action}\" class=\"duty-form\">\
<label for=\"date\">Data</label><input type=\"date\" id=\"date\" name=\"date\" value=\"{date}\" required>\
<label for=\"dutyType\">Typ dyżuru</label><select id=\"dutyType\" name=\"dutyTypeId\" required>\
<option value=\"\">-- wybierz typ --</option>{type_options}</select>\
<label for=\"dutyWorker\">Kurier</label><select id=\"dutyWorker\" name=\"dutyWorkerId\" required>\
<option value=\"\">-- wybierz kuriera --</option>{worker_options}</select>\
<button type=\"submit\"{submit_disabled}>{label}</button>\
</form>",
        date = escape(&form.fields.date),
    )
}

fn option(value: &str, text: &str, selected: bool) -> String {
    format!(
        "<option value=\"{}\"{}>{}</option>",
        escape(value),
        if selected { " selected" } else { "" },
        escape(text)
    )
}
