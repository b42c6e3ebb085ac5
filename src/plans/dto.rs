use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::{
    generator::GeneratedMeal,
    repo_types::{MealType, PlanMealIngredientRow, PlanMealRow, ShoppingListItem, WeeklyPlan},
};
use crate::{errors::ApiError, serde_fmt::iso_date};

#[derive(Debug, Deserialize)]
pub struct CreateIngredientRequest {
    pub name: String,
    pub default_unit: String,
}

#[derive(Debug, Deserialize)]
pub struct NewRecipeIngredient {
    pub ingredient_id: Uuid,
    pub cantidad_base: f64,
    pub unidad: String,
    #[serde(default)]
    pub merma_pct: f64,
}

#[derive(Debug, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub meal_type: MealType,
    pub calorias: f64,
    #[serde(default)]
    pub proteinas: f64,
    #[serde(default)]
    pub grasas: f64,
    #[serde(default)]
    pub carbohidratos: f64,
    pub porciones: i32,
    #[serde(default)]
    pub prep_minutes: Option<i32>,
    #[serde(default)]
    pub ingredients: Vec<NewRecipeIngredient>,
}

#[derive(Debug, Deserialize)]
pub struct NewBasePlan {
    pub name: String,
    pub duration_days: i32,
    pub calorias_base: f64,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub recipes: Vec<NewRecipe>,
}

impl NewBasePlan {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::invalid_input("name is required"));
        }
        if !(self.calorias_base.is_finite() && self.calorias_base > 0.0) {
            return Err(ApiError::invalid_input("calorias_base must be positive"));
        }
        for r in &self.recipes {
            r.validate()?;
        }
        Ok(())
    }
}

impl NewRecipe {
    fn validate(&self) -> Result<(), ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::invalid_input("recipe name is required"));
        }
        if self.porciones <= 0 {
            return Err(ApiError::invalid_input(format!(
                "recipe {name}: porciones must be positive"
            )));
        }
        let nutrients = [self.calorias, self.proteinas, self.grasas, self.carbohidratos];
        if nutrients.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ApiError::invalid_input(format!(
                "recipe {name}: nutrient totals must be non-negative"
            )));
        }
        for ing in &self.ingredients {
            if !(ing.cantidad_base.is_finite() && ing.cantidad_base >= 0.0) {
                return Err(ApiError::invalid_input(format!(
                    "recipe {name}: cantidad_base must be non-negative"
                )));
            }
            if !(0.0..100.0).contains(&ing.merma_pct) {
                return Err(ApiError::invalid_input(format!(
                    "recipe {name}: merma_pct must be in [0, 100)"
                )));
            }
            if ing.unidad.trim().is_empty() {
                return Err(ApiError::invalid_input(format!("recipe {name}: unidad is required")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct GeneratePlanBody {
    /// Staff may generate on behalf of a client; clients always get their own.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub plan_base_id: Uuid,
    #[serde(with = "iso_date")]
    pub week_start_date: Date,
}

#[derive(Debug, Serialize)]
pub struct GeneratedPlanResponse {
    pub plan: WeeklyPlan,
    pub meals: Vec<GeneratedMeal>,
}

#[derive(Debug, Serialize)]
pub struct PlanMealDetails {
    #[serde(flatten)]
    pub meal: PlanMealRow,
    pub ingredients: Vec<PlanMealIngredientRow>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyPlanDetails {
    pub plan: WeeklyPlan,
    pub meals: Vec<PlanMealDetails>,
}

#[derive(Debug, Deserialize)]
pub struct ShoppingListQuery {
    #[serde(with = "iso_date")]
    pub from: Date,
    #[serde(with = "iso_date")]
    pub to: Date,
}

#[derive(Debug, Serialize)]
pub struct ShoppingListResponse {
    #[serde(with = "iso_date")]
    pub from: Date,
    #[serde(with = "iso_date")]
    pub to: Date,
    pub items: Vec<ShoppingListItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_json(merma: f64, porciones: i32) -> serde_json::Value {
        serde_json::json!({
            "name": "Verano",
            "duration_days": 12,
            "calorias_base": 1800.0,
            "recipes": [{
                "name": "Ensalada",
                "meal_type": "lunch",
                "calorias": 900.0,
                "porciones": porciones,
                "ingredients": [{
                    "ingredient_id": Uuid::nil(),
                    "cantidad_base": 300.0,
                    "unidad": "g",
                    "merma_pct": merma
                }]
            }]
        })
    }

    #[test]
    fn valid_base_plan_passes() {
        let plan: NewBasePlan = serde_json::from_value(plan_json(15.0, 2)).unwrap();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.recipes[0].meal_type, MealType::Lunch);
    }

    #[test]
    fn rejects_bad_servings_and_waste() {
        let zero_servings: NewBasePlan = serde_json::from_value(plan_json(15.0, 0)).unwrap();
        assert!(zero_servings.validate().is_err());

        let full_waste: NewBasePlan = serde_json::from_value(plan_json(100.0, 2)).unwrap();
        assert!(full_waste.validate().is_err());
    }

    #[test]
    fn generate_body_parses_iso_dates() {
        let body: GeneratePlanBody = serde_json::from_value(serde_json::json!({
            "plan_base_id": Uuid::nil(),
            "week_start_date": "2025-03-03"
        }))
        .unwrap();
        assert_eq!(body.week_start_date, time::macros::date!(2025 - 03 - 03));
        assert!(body.user_id.is_none());
    }
}
