use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    calculator::{calculate_nutrition_profile, NutritionInput, NutritionMetrics},
    repo,
    repo_types::NutritionProfile,
};
use crate::{
    auth::{AuthContext, Role},
    errors::{ApiError, ApiResult},
    state::AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/nutrition/calculate", post(calculate))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/nutrition/profile", get(get_own_profile).put(upsert_own_profile))
        .route("/nutrition/profile/:user_id", get(get_client_profile))
}

/// Stateless preview of the metrics for an arbitrary input.
#[instrument(skip(input))]
pub async fn calculate(Json(input): Json<NutritionInput>) -> ApiResult<Json<NutritionMetrics>> {
    Ok(Json(calculate_nutrition_profile(&input)?))
}

#[instrument(skip(state))]
pub async fn get_own_profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<NutritionProfile>> {
    load_profile(&state, auth.user_id).await
}

#[instrument(skip(state))]
pub async fn get_client_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<NutritionProfile>> {
    auth.require_role(&[Role::Nutritionist, Role::Admin])?;
    load_profile(&state, user_id).await
}

async fn load_profile(state: &AppState, user_id: Uuid) -> ApiResult<Json<NutritionProfile>> {
    let row = repo::find_profile(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("nutrition profile not found"))?;
    Ok(Json(row.into()))
}

/// Metrics are recomputed on every save so they never drift from the inputs.
#[instrument(skip(state, input))]
pub async fn upsert_own_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(input): Json<NutritionInput>,
) -> ApiResult<Json<NutritionProfile>> {
    let metrics = calculate_nutrition_profile(&input)?;
    let row = repo::upsert_profile(&state.db, auth.user_id, &input, &metrics).await?;
    info!(
        user_id = %auth.user_id,
        calorias_objetivo = metrics.calorias_objetivo,
        "nutrition profile saved"
    );
    Ok(Json(row.into()))
}
