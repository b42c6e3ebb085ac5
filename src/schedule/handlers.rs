use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{BookAppointmentRequest, ScheduleResponse, Slot, SlotsQuery, SlotsResponse},
    repo,
    repo_types::Appointment,
    slots::{resolve_available_slots, WeeklySchedule},
};
use crate::{
    auth::{AuthContext, Role},
    errors::{is_unique_violation, ApiError, ApiResult},
    state::AppState,
};

pub fn schedule_routes() -> Router<AppState> {
    Router::new()
        .route("/schedule", get(get_own_schedule).put(save_own_schedule))
        .route("/nutritionists/:id/schedule", get(get_nutritionist_schedule))
        .route("/nutritionists/:id/slots", get(get_slots))
}

pub fn appointment_routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(book_appointment))
        .route("/appointments/:id/cancel", post(cancel_appointment))
}

async fn load_schedule(state: &AppState, nutritionist_id: Uuid) -> ApiResult<WeeklySchedule> {
    Ok(repo::find_schedule(&state.db, nutritionist_id)
        .await?
        .map(|row| row.data.0)
        .unwrap_or_default())
}

async fn ensure_nutritionist(state: &AppState, id: Uuid) -> ApiResult<()> {
    if repo::is_nutritionist(&state.db, id).await? {
        Ok(())
    } else {
        Err(ApiError::not_found("nutritionist not found"))
    }
}

#[instrument(skip(state))]
pub async fn get_own_schedule(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<ScheduleResponse>> {
    auth.require_role(&[Role::Nutritionist])?;
    let row = repo::find_schedule(&state.db, auth.user_id).await?;
    Ok(Json(ScheduleResponse::from_row(auth.user_id, row)))
}

#[instrument(skip(state, body))]
pub async fn save_own_schedule(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<ScheduleResponse>> {
    auth.require_role(&[Role::Nutritionist])?;
    let schedule = WeeklySchedule::from_flat(&body)?;
    schedule.validate()?;

    let row = repo::upsert_schedule(&state.db, auth.user_id, &schedule).await?;
    info!(
        nutritionist_id = %auth.user_id,
        mode = schedule.mode.as_str(),
        slot_minutes = schedule.slot_duration_minutes,
        "schedule saved"
    );
    Ok(Json(ScheduleResponse::from_row(auth.user_id, Some(row))))
}

#[instrument(skip(state))]
pub async fn get_nutritionist_schedule(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ScheduleResponse>> {
    ensure_nutritionist(&state, id).await?;
    let row = repo::find_schedule(&state.db, id).await?;
    Ok(Json(ScheduleResponse::from_row(id, row)))
}

#[instrument(skip(state))]
pub async fn get_slots(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
    Query(q): Query<SlotsQuery>,
) -> ApiResult<Json<SlotsResponse>> {
    ensure_nutritionist(&state, id).await?;
    let schedule = load_schedule(&state, id).await?;
    let booked = repo::booked_on(&state.db, id, q.date).await?;

    let step = schedule.slot_duration_minutes;
    let slots = resolve_available_slots(&schedule, &booked, q.date)
        .into_iter()
        .map(|start| Slot::new(start, step))
        .collect();

    Ok(Json(SlotsResponse {
        nutritionist_id: id,
        date: q.date,
        slot_duration_minutes: step,
        slots,
    }))
}

#[instrument(skip(state))]
pub async fn list_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Appointment>>> {
    Ok(Json(repo::list_for_user(&state.db, auth.user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn book_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<BookAppointmentRequest>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    if body.nutritionist_id == auth.user_id {
        return Err(ApiError::invalid_input("cannot book an appointment with yourself"));
    }
    ensure_nutritionist(&state, body.nutritionist_id).await?;

    let schedule = load_schedule(&state, body.nutritionist_id).await?;
    let booked = repo::booked_on(&state.db, body.nutritionist_id, body.date).await?;
    let free = resolve_available_slots(&schedule, &booked, body.date);
    if !free.contains(&body.start_time) {
        warn!(
            nutritionist_id = %body.nutritionist_id,
            date = %body.date,
            start = %body.start_time,
            "requested slot not available"
        );
        return Err(ApiError::SlotUnavailable(format!(
            "{} {} is not an available slot",
            body.date, body.start_time
        )));
    }

    let duration = i32::try_from(schedule.slot_duration_minutes)
        .map_err(|_| ApiError::Internal("slot duration out of range".into()))?;
    let appointment = repo::create_appointment(
        &state.db,
        body.nutritionist_id,
        auth.user_id,
        body.date,
        body.start_time,
        duration,
    )
    .await
    .map_err(|e| {
        // Lost a race against another booking of the same start.
        if is_unique_violation(&e) {
            ApiError::SlotUnavailable("slot was just taken".into())
        } else {
            e.into()
        }
    })?;

    info!(
        appointment_id = %appointment.id,
        nutritionist_id = %appointment.nutritionist_id,
        client_id = %appointment.client_id,
        "appointment booked"
    );
    Ok((StatusCode::CREATED, Json(appointment)))
}

fn may_cancel(auth: &AuthContext, appointment: &Appointment) -> bool {
    auth.role == Role::Admin
        || appointment.client_id == auth.user_id
        || appointment.nutritionist_id == auth.user_id
}

#[instrument(skip(state))]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Appointment>> {
    let existing = repo::find_appointment(&state.db, id)
        .await?
        .filter(|a| may_cancel(&auth, a))
        .ok_or_else(|| ApiError::not_found("appointment not found"))?;

    let cancelled = repo::cancel_appointment(&state.db, existing.id)
        .await?
        .ok_or_else(|| ApiError::Conflict("appointment is already cancelled".into()))?;

    info!(appointment_id = %id, by = %auth.user_id, "appointment cancelled");
    Ok(Json(cancelled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::repo_types::AppointmentStatus;
    use time::{macros::date, macros::time, OffsetDateTime};

    fn appointment(client_id: Uuid, nutritionist_id: Uuid) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            nutritionist_id,
            client_id,
            date: date!(2025 - 03 - 03),
            start_time: time!(10:00),
            duration_minutes: 60,
            status: AppointmentStatus::Booked,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn either_party_or_admin_may_cancel() {
        let client = Uuid::new_v4();
        let nutritionist = Uuid::new_v4();
        let appt = appointment(client, nutritionist);

        let as_client = AuthContext { user_id: client, role: Role::Client };
        let as_nutritionist = AuthContext { user_id: nutritionist, role: Role::Nutritionist };
        let stranger = AuthContext { user_id: Uuid::new_v4(), role: Role::Client };
        let other_nutritionist = AuthContext { user_id: Uuid::new_v4(), role: Role::Nutritionist };
        let admin = AuthContext { user_id: Uuid::new_v4(), role: Role::Admin };

        assert!(may_cancel(&as_client, &appt));
        assert!(may_cancel(&as_nutritionist, &appt));
        assert!(may_cancel(&admin, &appt));
        assert!(!may_cancel(&stranger, &appt));
        assert!(!may_cancel(&other_nutritionist, &appt));
    }
}
