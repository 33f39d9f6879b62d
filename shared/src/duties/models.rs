use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Duty {
    pub id: String,
    pub date: NaiveDate,
    pub duty_worker: DutyWorker,
    #[serde(rename = "type")]
    pub duty_type: DutyType,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DutyWorker {
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DutyType {
    pub id: String,
    pub name: String,
    /// Scheduled time-of-day label, usually `HH:MM`.
    pub time: String,
    #[serde(default)]
    pub address: String,
}

/// Body of the create and update requests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DutyPayload {
    pub date: NaiveDate,
    pub duty_worker_id: String,
    pub duty_type_id: String,
}
