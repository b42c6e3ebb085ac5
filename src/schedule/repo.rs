use sqlx::{types::Json, PgPool};
use time::{Date, Time};
use uuid::Uuid;

use super::{
    repo_types::{Appointment, AppointmentStatus, ScheduleRow},
    slots::WeeklySchedule,
};

const APPOINTMENT_COLUMNS: &str =
    "id, nutritionist_id, client_id, date, start_time, duration_minutes, status, created_at";

pub async fn is_nutritionist(db: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND role = 'nutritionist')",
    )
    .bind(user_id)
    .fetch_one(db)
    .await
}

pub async fn find_schedule(
    db: &PgPool,
    nutritionist_id: Uuid,
) -> Result<Option<ScheduleRow>, sqlx::Error> {
    sqlx::query_as::<_, ScheduleRow>(
        "SELECT nutritionist_id, data, updated_at FROM schedules WHERE nutritionist_id = $1",
    )
    .bind(nutritionist_id)
    .fetch_optional(db)
    .await
}

pub async fn upsert_schedule(
    db: &PgPool,
    nutritionist_id: Uuid,
    schedule: &WeeklySchedule,
) -> Result<ScheduleRow, sqlx::Error> {
    sqlx::query_as::<_, ScheduleRow>(
        r#"
        INSERT INTO schedules (nutritionist_id, data, updated_at)
        VALUES ($1, $2, now())
        ON CONFLICT (nutritionist_id) DO UPDATE SET
            data = EXCLUDED.data,
            updated_at = now()
        RETURNING nutritionist_id, data, updated_at
        "#,
    )
    .bind(nutritionist_id)
    .bind(Json(schedule))
    .fetch_one(db)
    .await
}

/// Booked appointments of one nutritionist on one date.
pub async fn booked_on(
    db: &PgPool,
    nutritionist_id: Uuid,
    date: Date,
) -> Result<Vec<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
          FROM appointments
         WHERE nutritionist_id = $1 AND date = $2 AND status = 'booked'
         ORDER BY start_time
        "#
    ))
    .bind(nutritionist_id)
    .bind(date)
    .fetch_all(db)
    .await
}

pub async fn create_appointment(
    db: &PgPool,
    nutritionist_id: Uuid,
    client_id: Uuid,
    date: Date,
    start_time: Time,
    duration_minutes: i32,
) -> Result<Appointment, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(&format!(
        r#"
        INSERT INTO appointments
            (nutritionist_id, client_id, date, start_time, duration_minutes, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(nutritionist_id)
    .bind(client_id)
    .bind(date)
    .bind(start_time)
    .bind(duration_minutes)
    .bind(AppointmentStatus::Booked)
    .fetch_one(db)
    .await
}

pub async fn find_appointment(db: &PgPool, id: Uuid) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Appointments where the user is either side, newest first.
pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> Result<Vec<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
          FROM appointments
         WHERE client_id = $1 OR nutritionist_id = $1
         ORDER BY date DESC, start_time DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Returns `None` when the appointment was already cancelled.
pub async fn cancel_appointment(db: &PgPool, id: Uuid) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(&format!(
        r#"
        UPDATE appointments
           SET status = 'cancelled'
         WHERE id = $1 AND status = 'booked'
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}
