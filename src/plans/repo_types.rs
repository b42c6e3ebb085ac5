use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::serde_fmt::iso_date;

/// Meal slots a generated plan fills every day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Lunch,
    Dinner,
}

impl MealType {
    pub const REQUIRED: [MealType; 2] = [MealType::Lunch, MealType::Dinner];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }

    /// Name of the matching entry in the calculator's calorie distribution.
    pub fn comida(&self) -> &'static str {
        match self {
            MealType::Lunch => "almuerzo",
            MealType::Dinner => "cena",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub default_unit: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BasePlan {
    pub id: Uuid,
    pub name: String,
    pub duration_days: i32,
    pub calorias_base: f64,
    pub active: bool,
    pub created_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub base_plan_id: Option<Uuid>,
    pub name: String,
    pub meal_type: MealType,
    /// Totals for the whole recipe, i.e. all servings together.
    pub calorias: f64,
    pub proteinas: f64,
    pub grasas: f64,
    pub carbohidratos: f64,
    pub porciones: i32,
    pub prep_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeIngredient {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub cantidad_base: f64,
    pub unidad: String,
    pub merma_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeWithIngredients {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<RecipeIngredient>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BasePlanWithRecipes {
    #[serde(flatten)]
    pub plan: BasePlan,
    pub recipes: Vec<RecipeWithIngredients>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WeeklyPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_base_id: Uuid,
    #[serde(with = "iso_date")]
    pub week_start_date: Date,
    pub duration_days: i32,
    pub calorias_objetivo: f64,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlanMealRow {
    pub id: Uuid,
    pub day_number: i32,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub meal_type: MealType,
    pub recipe_id: Uuid,
    pub recipe_name: String,
    pub scale_factor: f64,
    pub calorias: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlanMealIngredientRow {
    pub meal_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unidad: String,
    pub cantidad_neta: f64,
    pub cantidad_bruta: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ShoppingListItem {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unidad: String,
    pub cantidad: f64,
}
