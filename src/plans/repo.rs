use std::collections::HashMap;

use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::{
    dto::NewBasePlan,
    generator::normalize_duration,
    repo_types::{
        BasePlan, BasePlanWithRecipes, Ingredient, PlanMealIngredientRow, PlanMealRow, Recipe,
        RecipeIngredient, RecipeWithIngredients, ShoppingListItem, WeeklyPlan,
    },
};

const BASE_PLAN_COLUMNS: &str =
    "id, name, duration_days, calorias_base, active, created_by, created_at";
const WEEKLY_PLAN_COLUMNS: &str = "id, user_id, plan_base_id, week_start_date, duration_days, \
     calorias_objetivo, active, created_at";

// ---- Ingredients ----

pub async fn list_ingredients(db: &PgPool) -> Result<Vec<Ingredient>, sqlx::Error> {
    sqlx::query_as::<_, Ingredient>("SELECT id, name, default_unit FROM ingredients ORDER BY name")
        .fetch_all(db)
        .await
}

pub async fn create_ingredient(
    db: &PgPool,
    name: &str,
    default_unit: &str,
) -> Result<Ingredient, sqlx::Error> {
    sqlx::query_as::<_, Ingredient>(
        r#"
        INSERT INTO ingredients (name, default_unit)
        VALUES ($1, $2)
        RETURNING id, name, default_unit
        "#,
    )
    .bind(name)
    .bind(default_unit)
    .fetch_one(db)
    .await
}

// ---- Base plans ----

/// Inserts a base plan with its recipes and ingredient rows in one
/// transaction. Duration is stored normalised.
pub async fn create_base_plan(
    db: &PgPool,
    new: &NewBasePlan,
    created_by: Uuid,
) -> Result<Uuid, sqlx::Error> {
    let mut tx = db.begin().await?;

    let plan_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO base_plans (name, duration_days, calorias_base, active, created_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(new.name.trim())
    .bind(normalize_duration(new.duration_days) as i32)
    .bind(new.calorias_base)
    .bind(new.active.unwrap_or(true))
    .bind(created_by)
    .fetch_one(&mut *tx)
    .await?;

    for r in &new.recipes {
        let recipe_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO recipes
                (base_plan_id, name, meal_type, calorias, proteinas, grasas,
                 carbohidratos, porciones, prep_minutes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(plan_id)
        .bind(r.name.trim())
        .bind(r.meal_type)
        .bind(r.calorias)
        .bind(r.proteinas)
        .bind(r.grasas)
        .bind(r.carbohidratos)
        .bind(r.porciones)
        .bind(r.prep_minutes)
        .fetch_one(&mut *tx)
        .await?;

        for ing in &r.ingredients {
            sqlx::query(
                r#"
                INSERT INTO recipe_ingredients
                    (recipe_id, ingredient_id, cantidad_base, unidad, merma_pct)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(recipe_id)
            .bind(ing.ingredient_id)
            .bind(ing.cantidad_base)
            .bind(ing.unidad.trim())
            .bind(ing.merma_pct)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(plan_id)
}

pub async fn list_base_plans(
    db: &PgPool,
    include_inactive: bool,
) -> Result<Vec<BasePlan>, sqlx::Error> {
    sqlx::query_as::<_, BasePlan>(&format!(
        r#"
        SELECT {BASE_PLAN_COLUMNS}
          FROM base_plans
         WHERE active OR $1
         ORDER BY name
        "#
    ))
    .bind(include_inactive)
    .fetch_all(db)
    .await
}

pub async fn set_base_plan_active(
    db: &PgPool,
    id: Uuid,
    active: bool,
) -> Result<Option<BasePlan>, sqlx::Error> {
    sqlx::query_as::<_, BasePlan>(&format!(
        "UPDATE base_plans SET active = $2 WHERE id = $1 RETURNING {BASE_PLAN_COLUMNS}"
    ))
    .bind(id)
    .bind(active)
    .fetch_optional(db)
    .await
}

/// Base plan with every recipe and its ingredient rows.
pub async fn load_base_plan(
    db: &PgPool,
    id: Uuid,
) -> Result<Option<BasePlanWithRecipes>, sqlx::Error> {
    let Some(plan) = sqlx::query_as::<_, BasePlan>(&format!(
        "SELECT {BASE_PLAN_COLUMNS} FROM base_plans WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?
    else {
        return Ok(None);
    };

    let recipes = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, base_plan_id, name, meal_type, calorias, proteinas, grasas,
               carbohidratos, porciones, prep_minutes
          FROM recipes
         WHERE base_plan_id = $1
         ORDER BY name, id
        "#,
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    let recipe_ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let ingredient_rows = sqlx::query_as::<_, RecipeIngredient>(
        r#"
        SELECT ri.recipe_id, ri.ingredient_id, i.name AS ingredient_name,
               ri.cantidad_base, ri.unidad, ri.merma_pct
          FROM recipe_ingredients ri
          JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE ri.recipe_id = ANY($1)
         ORDER BY i.name
        "#,
    )
    .bind(&recipe_ids)
    .fetch_all(db)
    .await?;

    let mut by_recipe: HashMap<Uuid, Vec<RecipeIngredient>> = HashMap::new();
    for row in ingredient_rows {
        by_recipe.entry(row.recipe_id).or_default().push(row);
    }

    let recipes = recipes
        .into_iter()
        .map(|recipe| RecipeWithIngredients {
            ingredients: by_recipe.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect();

    Ok(Some(BasePlanWithRecipes { plan, recipes }))
}

// ---- Weekly plans ----

pub async fn list_weekly_plans(db: &PgPool, user_id: Uuid) -> Result<Vec<WeeklyPlan>, sqlx::Error> {
    sqlx::query_as::<_, WeeklyPlan>(&format!(
        r#"
        SELECT {WEEKLY_PLAN_COLUMNS}
          FROM weekly_plans
         WHERE user_id = $1
         ORDER BY week_start_date DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn get_weekly_plan(db: &PgPool, id: Uuid) -> Result<Option<WeeklyPlan>, sqlx::Error> {
    sqlx::query_as::<_, WeeklyPlan>(&format!(
        "SELECT {WEEKLY_PLAN_COLUMNS} FROM weekly_plans WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn list_plan_meals(db: &PgPool, plan_id: Uuid) -> Result<Vec<PlanMealRow>, sqlx::Error> {
    sqlx::query_as::<_, PlanMealRow>(
        r#"
        SELECT m.id, d.day_number, d.date, m.meal_type, m.recipe_id,
               r.name AS recipe_name, m.scale_factor, m.calorias
          FROM weekly_plan_meals m
          JOIN weekly_plan_days d ON d.id = m.weekly_plan_day_id
          JOIN recipes r ON r.id = m.recipe_id
         WHERE d.weekly_plan_id = $1
         ORDER BY d.day_number, CASE m.meal_type WHEN 'lunch' THEN 0 ELSE 1 END
        "#,
    )
    .bind(plan_id)
    .fetch_all(db)
    .await
}

pub async fn list_plan_meal_ingredients(
    db: &PgPool,
    plan_id: Uuid,
) -> Result<Vec<PlanMealIngredientRow>, sqlx::Error> {
    sqlx::query_as::<_, PlanMealIngredientRow>(
        r#"
        SELECT mi.weekly_plan_meal_id AS meal_id, mi.ingredient_id,
               i.name AS ingredient_name, mi.unidad, mi.cantidad_neta, mi.cantidad_bruta
          FROM weekly_plan_meal_ingredients mi
          JOIN weekly_plan_meals m ON m.id = mi.weekly_plan_meal_id
          JOIN weekly_plan_days d ON d.id = m.weekly_plan_day_id
          JOIN ingredients i ON i.id = mi.ingredient_id
         WHERE d.weekly_plan_id = $1
         ORDER BY i.name
        "#,
    )
    .bind(plan_id)
    .fetch_all(db)
    .await
}

/// Gross ingredient totals across the user's active plans for
/// `[from, to]`, both ends inclusive.
pub async fn shopping_list(
    db: &PgPool,
    user_id: Uuid,
    from: Date,
    to: Date,
) -> Result<Vec<ShoppingListItem>, sqlx::Error> {
    sqlx::query_as::<_, ShoppingListItem>(
        r#"
        SELECT c.ingredient_id, i.name AS ingredient_name, c.unidad,
               ROUND(SUM(c.cantidad)::numeric, 1)::float8 AS cantidad
          FROM ingredient_consumption c
          JOIN weekly_plans p ON p.id = c.weekly_plan_id AND p.active
          JOIN ingredients i ON i.id = c.ingredient_id
         WHERE c.user_id = $1 AND c.date BETWEEN $2 AND $3
         GROUP BY c.ingredient_id, i.name, c.unidad
         ORDER BY i.name, c.unidad
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await
}
