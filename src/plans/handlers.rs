use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        CreateIngredientRequest, GeneratePlanBody, GeneratedPlanResponse, NewBasePlan,
        PlanMealDetails, SetActiveRequest, ShoppingListQuery, ShoppingListResponse,
        WeeklyPlanDetails,
    },
    generator::{generate_weekly_plan, GeneratePlanRequest},
    repo,
    repo_types::{BasePlan, BasePlanWithRecipes, Ingredient, PlanMealIngredientRow, WeeklyPlan},
    store::PgPlanStore,
};
use crate::{
    auth::{AuthContext, Role},
    errors::{ApiError, ApiResult},
    state::AppState,
};

const STAFF: [Role; 2] = [Role::Nutritionist, Role::Admin];
const MAX_SHOPPING_LIST_DAYS: i64 = 62;

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients).post(create_ingredient))
        .route("/base-plans", get(list_base_plans).post(create_base_plan))
        .route("/base-plans/:id", get(get_base_plan))
        .route("/base-plans/:id/active", put(set_base_plan_active))
}

pub fn weekly_plan_routes() -> Router<AppState> {
    Router::new()
        .route("/weekly-plans/generate", post(generate))
        .route("/weekly-plans", get(list_weekly_plans))
        .route("/weekly-plans/:id", get(get_weekly_plan))
        .route("/shopping-list", get(shopping_list))
}

// --- catalog ---

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<Vec<Ingredient>>> {
    Ok(Json(repo::list_ingredients(&state.db).await?))
}

#[instrument(skip(state, body))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<CreateIngredientRequest>,
) -> ApiResult<(StatusCode, Json<Ingredient>)> {
    auth.require_role(&STAFF)?;
    let name = body.name.trim();
    let unit = body.default_unit.trim();
    if name.is_empty() || unit.is_empty() {
        return Err(ApiError::invalid_input("name and default_unit are required"));
    }
    let ingredient = repo::create_ingredient(&state.db, name, unit).await?;
    info!(ingredient_id = %ingredient.id, "ingredient created");
    Ok((StatusCode::CREATED, Json(ingredient)))
}

#[instrument(skip(state))]
pub async fn list_base_plans(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<BasePlan>>> {
    Ok(Json(repo::list_base_plans(&state.db, auth.is_staff()).await?))
}

#[instrument(skip(state, body))]
pub async fn create_base_plan(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<NewBasePlan>,
) -> ApiResult<(StatusCode, Json<BasePlanWithRecipes>)> {
    auth.require_role(&STAFF)?;
    body.validate()?;

    let id = repo::create_base_plan(&state.db, &body, auth.user_id)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                ApiError::invalid_input("recipe references an unknown ingredient")
            }
            _ => e.into(),
        })?;
    let created = repo::load_base_plan(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::Internal("base plan vanished after insert".into()))?;

    info!(plan_base_id = %id, recipes = created.recipes.len(), "base plan created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state))]
pub async fn get_base_plan(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BasePlanWithRecipes>> {
    let plan = repo::load_base_plan(&state.db, id)
        .await?
        .filter(|p| p.plan.active || auth.is_staff())
        .ok_or_else(|| ApiError::not_found("base plan not found"))?;
    Ok(Json(plan))
}

#[instrument(skip(state))]
pub async fn set_base_plan_active(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<SetActiveRequest>,
) -> ApiResult<Json<BasePlan>> {
    auth.require_role(&STAFF)?;
    let plan = repo::set_base_plan_active(&state.db, id, body.active)
        .await?
        .ok_or_else(|| ApiError::not_found("base plan not found"))?;
    info!(plan_base_id = %id, active = body.active, "base plan toggled");
    Ok(Json(plan))
}

// --- weekly plans ---

/// Clients act on themselves; staff may name another user.
fn target_user(auth: &AuthContext, requested: Option<Uuid>) -> ApiResult<Uuid> {
    match requested {
        None => Ok(auth.user_id),
        Some(id) if id == auth.user_id => Ok(id),
        Some(id) if auth.is_staff() => Ok(id),
        Some(_) => {
            warn!(user_id = %auth.user_id, "client tried to act for another user");
            Err(ApiError::Forbidden("cannot act on behalf of another user".into()))
        }
    }
}

#[instrument(skip(state, body))]
pub async fn generate(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<GeneratePlanBody>,
) -> ApiResult<(StatusCode, Json<GeneratedPlanResponse>)> {
    let req = GeneratePlanRequest {
        user_id: target_user(&auth, body.user_id)?,
        plan_base_id: body.plan_base_id,
        week_start_date: body.week_start_date,
    };
    let store = PgPlanStore::new(state.db.clone());
    let (plan, meals) = generate_weekly_plan(&store, &state.config.plan, req).await?;
    Ok((StatusCode::CREATED, Json(GeneratedPlanResponse { plan, meals })))
}

#[instrument(skip(state))]
pub async fn list_weekly_plans(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<WeeklyPlan>>> {
    Ok(Json(repo::list_weekly_plans(&state.db, auth.user_id).await?))
}

#[instrument(skip(state))]
pub async fn get_weekly_plan(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WeeklyPlanDetails>> {
    let plan = repo::get_weekly_plan(&state.db, id)
        .await?
        .filter(|p| p.user_id == auth.user_id || auth.is_staff())
        .ok_or_else(|| ApiError::not_found("weekly plan not found"))?;

    let meals = repo::list_plan_meals(&state.db, id).await?;
    let mut ingredients: HashMap<Uuid, Vec<PlanMealIngredientRow>> = HashMap::new();
    for row in repo::list_plan_meal_ingredients(&state.db, id).await? {
        ingredients.entry(row.meal_id).or_default().push(row);
    }

    let meals = meals
        .into_iter()
        .map(|meal| PlanMealDetails {
            ingredients: ingredients.remove(&meal.id).unwrap_or_default(),
            meal,
        })
        .collect();
    Ok(Json(WeeklyPlanDetails { plan, meals }))
}

#[instrument(skip(state))]
pub async fn shopping_list(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<ShoppingListQuery>,
) -> ApiResult<Json<ShoppingListResponse>> {
    if q.to < q.from {
        return Err(ApiError::invalid_input("`to` must not be before `from`"));
    }
    if (q.to - q.from).whole_days() > MAX_SHOPPING_LIST_DAYS {
        return Err(ApiError::invalid_input(format!(
            "range may span at most {MAX_SHOPPING_LIST_DAYS} days"
        )));
    }
    let items = repo::shopping_list(&state.db, auth.user_id, q.from, q.to).await?;
    Ok(Json(ShoppingListResponse {
        from: q.from,
        to: q.to,
        items,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_user_rules() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let client = AuthContext { user_id: me, role: Role::Client };
        let nutritionist = AuthContext { user_id: me, role: Role::Nutritionist };

        assert_eq!(target_user(&client, None).unwrap(), me);
        assert_eq!(target_user(&client, Some(me)).unwrap(), me);
        assert!(matches!(target_user(&client, Some(other)), Err(ApiError::Forbidden(_))));
        assert_eq!(target_user(&nutritionist, Some(other)).unwrap(), other);
    }
}
