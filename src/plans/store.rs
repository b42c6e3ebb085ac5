use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use time::Date;
use uuid::Uuid;

use super::{
    generator::GeneratedPlan,
    repo,
    repo_types::{BasePlanWithRecipes, WeeklyPlan},
};
use crate::{
    errors::{is_unique_violation, ApiError, ApiResult},
    nutrition::{self, calculator::NutritionInput},
};

/// Everything plan generation reads from and writes to storage.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn load_profile(&self, user_id: Uuid) -> ApiResult<Option<NutritionInput>>;

    async fn load_base_plan(&self, plan_base_id: Uuid) -> ApiResult<Option<BasePlanWithRecipes>>;

    async fn find_active_plan(&self, user_id: Uuid, week_start: Date) -> ApiResult<Option<Uuid>>;

    /// Writes the plan with all child rows atomically, deleting `replace`
    /// first when given.
    async fn save_plan(&self, plan: &GeneratedPlan, replace: Option<Uuid>) -> ApiResult<WeeklyPlan>;
}

#[derive(Clone)]
pub struct PgPlanStore {
    db: PgPool,
}

impl PgPlanStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn load_profile(&self, user_id: Uuid) -> ApiResult<Option<NutritionInput>> {
        let row = nutrition::repo::find_profile(&self.db, user_id).await?;
        Ok(row.map(|r| r.input()))
    }

    async fn load_base_plan(&self, plan_base_id: Uuid) -> ApiResult<Option<BasePlanWithRecipes>> {
        Ok(repo::load_base_plan(&self.db, plan_base_id).await?)
    }

    async fn find_active_plan(&self, user_id: Uuid, week_start: Date) -> ApiResult<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
              FROM weekly_plans
             WHERE user_id = $1 AND week_start_date = $2 AND active
            "#,
        )
        .bind(user_id)
        .bind(week_start)
        .fetch_optional(&self.db)
        .await?;
        Ok(id)
    }

    async fn save_plan(&self, plan: &GeneratedPlan, replace: Option<Uuid>) -> ApiResult<WeeklyPlan> {
        let mut tx = self.db.begin().await?;
        match write_plan_tx(&mut tx, plan, replace).await {
            Ok(saved) => {
                tx.commit().await?;
                Ok(saved)
            }
            // Dropping the transaction rolls it back.
            Err(e) if is_unique_violation(&e) => Err(ApiError::DuplicatePlan {
                week_start: plan.week_start_date.to_string(),
            }),
            Err(e) => Err(ApiError::Persistence(e.to_string())),
        }
    }
}

async fn write_plan_tx(
    tx: &mut Transaction<'_, Postgres>,
    plan: &GeneratedPlan,
    replace: Option<Uuid>,
) -> Result<WeeklyPlan, sqlx::Error> {
    if let Some(old) = replace {
        // Child rows and ledger entries cascade.
        sqlx::query("DELETE FROM weekly_plans WHERE id = $1 AND user_id = $2")
            .bind(old)
            .bind(plan.user_id)
            .execute(&mut **tx)
            .await?;
    }

    let saved = sqlx::query_as::<_, WeeklyPlan>(
        r#"
        INSERT INTO weekly_plans
            (user_id, plan_base_id, week_start_date, duration_days, calorias_objetivo, active)
        VALUES ($1, $2, $3, $4, $5, TRUE)
        RETURNING id, user_id, plan_base_id, week_start_date, duration_days,
                  calorias_objetivo, active, created_at
        "#,
    )
    .bind(plan.user_id)
    .bind(plan.plan_base_id)
    .bind(plan.week_start_date)
    .bind(plan.duration_days as i32)
    .bind(plan.calorias_objetivo)
    .fetch_one(&mut **tx)
    .await?;

    for (day_number, date) in plan.days() {
        let day_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO weekly_plan_days (weekly_plan_id, day_number, date)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(saved.id)
        .bind(day_number as i32)
        .bind(date)
        .fetch_one(&mut **tx)
        .await?;

        for meal in plan.meals.iter().filter(|m| m.day_number == day_number) {
            let meal_id = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO weekly_plan_meals
                    (weekly_plan_day_id, meal_type, recipe_id, scale_factor, calorias)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(day_id)
            .bind(meal.meal_type)
            .bind(meal.recipe_id)
            .bind(meal.scale_factor)
            .bind(meal.calorias)
            .fetch_one(&mut **tx)
            .await?;

            for ing in &meal.ingredients {
                sqlx::query(
                    r#"
                    INSERT INTO weekly_plan_meal_ingredients
                        (weekly_plan_meal_id, ingredient_id, unidad, cantidad_neta, cantidad_bruta)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(meal_id)
                .bind(ing.ingredient_id)
                .bind(&ing.unidad)
                .bind(ing.cantidad_neta)
                .bind(ing.cantidad_bruta)
                .execute(&mut **tx)
                .await?;
            }
        }
    }

    for entry in plan.ledger() {
        sqlx::query(
            r#"
            INSERT INTO ingredient_consumption
                (weekly_plan_id, user_id, date, ingredient_id, unidad, cantidad)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(saved.id)
        .bind(plan.user_id)
        .bind(entry.date)
        .bind(entry.ingredient_id)
        .bind(&entry.unidad)
        .bind(entry.cantidad)
        .execute(&mut **tx)
        .await?;
    }

    Ok(saved)
}

/// In-memory store with the same uniqueness rule as the database.
#[cfg(test)]
pub mod memory {
    use std::{collections::HashMap, sync::Mutex};

    use time::OffsetDateTime;

    use super::*;

    struct StoredPlan {
        plan: WeeklyPlan,
        ledger_rows: usize,
    }

    pub struct MemoryPlanStore {
        base: BasePlanWithRecipes,
        profiles: HashMap<Uuid, NutritionInput>,
        plans: Mutex<Vec<StoredPlan>>,
        fail_writes: bool,
    }

    impl MemoryPlanStore {
        pub fn new(base: BasePlanWithRecipes) -> Self {
            Self {
                base,
                profiles: HashMap::new(),
                plans: Mutex::new(Vec::new()),
                fail_writes: false,
            }
        }

        pub fn with_profile(mut self, user_id: Uuid, input: NutritionInput) -> Self {
            self.profiles.insert(user_id, input);
            self
        }

        pub fn failing_writes(mut self) -> Self {
            self.fail_writes = true;
            self
        }

        pub fn only_base_plan_id(&self) -> Uuid {
            self.base.plan.id
        }

        pub fn plan_count(&self) -> usize {
            self.plans.lock().unwrap().len()
        }

        pub fn active_plan_ids(&self, user_id: Uuid) -> Vec<Uuid> {
            self.plans
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.plan.user_id == user_id && p.plan.active)
                .map(|p| p.plan.id)
                .collect()
        }

        pub fn ledger_rows(&self, plan_id: Uuid) -> usize {
            self.plans
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.plan.id == plan_id)
                .map(|p| p.ledger_rows)
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl PlanStore for MemoryPlanStore {
        async fn load_profile(&self, user_id: Uuid) -> ApiResult<Option<NutritionInput>> {
            Ok(self.profiles.get(&user_id).cloned())
        }

        async fn load_base_plan(&self, plan_base_id: Uuid) -> ApiResult<Option<BasePlanWithRecipes>> {
            Ok((self.base.plan.id == plan_base_id).then(|| self.base.clone()))
        }

        async fn find_active_plan(&self, user_id: Uuid, week_start: Date) -> ApiResult<Option<Uuid>> {
            Ok(self
                .plans
                .lock()
                .unwrap()
                .iter()
                .find(|p| {
                    p.plan.user_id == user_id && p.plan.week_start_date == week_start && p.plan.active
                })
                .map(|p| p.plan.id))
        }

        async fn save_plan(&self, plan: &GeneratedPlan, replace: Option<Uuid>) -> ApiResult<WeeklyPlan> {
            if self.fail_writes {
                return Err(ApiError::Persistence("connection reset".into()));
            }
            let mut plans = self.plans.lock().unwrap();
            if let Some(old) = replace {
                plans.retain(|p| p.plan.id != old);
            }
            let taken = plans.iter().any(|p| {
                p.plan.user_id == plan.user_id
                    && p.plan.week_start_date == plan.week_start_date
                    && p.plan.active
            });
            if taken {
                return Err(ApiError::DuplicatePlan {
                    week_start: plan.week_start_date.to_string(),
                });
            }
            let saved = WeeklyPlan {
                id: Uuid::new_v4(),
                user_id: plan.user_id,
                plan_base_id: plan.plan_base_id,
                week_start_date: plan.week_start_date,
                duration_days: plan.duration_days as i32,
                calorias_objetivo: plan.calorias_objetivo,
                active: true,
                created_at: OffsetDateTime::now_utc(),
            };
            plans.push(StoredPlan {
                plan: saved.clone(),
                ledger_rows: plan.ledger().len(),
            });
            Ok(saved)
        }
    }
}
