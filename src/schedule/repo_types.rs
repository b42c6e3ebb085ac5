use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use super::slots::WeeklySchedule;
use crate::serde_fmt::{hh_mm, iso_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Booked,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub nutritionist_id: Uuid,
    pub client_id: Uuid,
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(with = "hh_mm")]
    pub start_time: Time,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct ScheduleRow {
    pub nutritionist_id: Uuid,
    pub data: Json<WeeklySchedule>,
    pub updated_at: OffsetDateTime,
}
