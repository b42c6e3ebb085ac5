use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime, Time};
use uuid::Uuid;

use super::{repo_types::ScheduleRow, slots::WeeklySchedule};
use crate::serde_fmt::{hh_mm, iso_date};

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub nutritionist_id: Uuid,
    #[serde(flatten)]
    pub schedule: WeeklySchedule,
    /// `None` while the nutritionist still runs on the defaults.
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl ScheduleResponse {
    pub fn from_row(nutritionist_id: Uuid, row: Option<ScheduleRow>) -> Self {
        match row {
            Some(row) => Self {
                nutritionist_id,
                schedule: row.data.0,
                updated_at: Some(row.updated_at),
            },
            None => Self {
                nutritionist_id,
                schedule: WeeklySchedule::default(),
                updated_at: None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    #[serde(with = "iso_date")]
    pub date: Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    #[serde(with = "hh_mm")]
    pub start: Time,
    #[serde(with = "hh_mm")]
    pub end: Time,
}

impl Slot {
    pub fn new(start: Time, minutes: i64) -> Self {
        Self {
            start,
            end: start + Duration::minutes(minutes),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SlotsResponse {
    pub nutritionist_id: Uuid,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub slot_duration_minutes: i64,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Deserialize)]
pub struct BookAppointmentRequest {
    pub nutritionist_id: Uuid,
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(with = "hh_mm")]
    pub start_time: Time,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::time;

    #[test]
    fn slot_end_follows_duration() {
        let slot = Slot::new(time!(09:30), 45);
        assert_eq!(slot.end, time!(10:15));
        let json = serde_json::to_value(slot).unwrap();
        assert_eq!(json, serde_json::json!({"start": "09:30", "end": "10:15"}));
    }

    #[test]
    fn defaults_when_nothing_saved() {
        let id = Uuid::new_v4();
        let resp = ScheduleResponse::from_row(id, None);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["nutritionist_id"], id.to_string());
        assert_eq!(json["monday_start_hour"], "09:00");
        assert_eq!(json["sunday_enabled"], false);
        assert_eq!(json["updated_at"], serde_json::Value::Null);
    }

    #[test]
    fn booking_request_parses_wire_times() {
        let req: BookAppointmentRequest = serde_json::from_value(serde_json::json!({
            "nutritionist_id": Uuid::nil(),
            "date": "2025-03-03",
            "start_time": "11:00"
        }))
        .unwrap();
        assert_eq!(req.start_time, time!(11:00));
    }
}
