use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::{
    calculator::{NutritionInput, NutritionMetrics},
    repo_types::NutritionProfileRow,
};

const PROFILE_COLUMNS: &str = r#"
    user_id, sexo, edad, peso_kg, altura_cm, objetivo, nivel_actividad,
    comidas_por_dia, metrics, updated_at
"#;

pub async fn find_profile(
    db: &PgPool,
    user_id: Uuid,
) -> Result<Option<NutritionProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, NutritionProfileRow>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM nutrition_profiles WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Insert or replace the caller's profile together with freshly computed
/// metrics.
pub async fn upsert_profile(
    db: &PgPool,
    user_id: Uuid,
    input: &NutritionInput,
    metrics: &NutritionMetrics,
) -> Result<NutritionProfileRow, sqlx::Error> {
    sqlx::query_as::<_, NutritionProfileRow>(&format!(
        r#"
        INSERT INTO nutrition_profiles
            (user_id, sexo, edad, peso_kg, altura_cm, objetivo, nivel_actividad,
             comidas_por_dia, metrics, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
        ON CONFLICT (user_id) DO UPDATE SET
            sexo = EXCLUDED.sexo,
            edad = EXCLUDED.edad,
            peso_kg = EXCLUDED.peso_kg,
            altura_cm = EXCLUDED.altura_cm,
            objetivo = EXCLUDED.objetivo,
            nivel_actividad = EXCLUDED.nivel_actividad,
            comidas_por_dia = EXCLUDED.comidas_por_dia,
            metrics = EXCLUDED.metrics,
            updated_at = now()
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(input.sexo.as_deref())
    .bind(input.edad.map(|v| v as i32))
    .bind(input.peso_kg)
    .bind(input.altura_cm)
    .bind(input.objetivo.as_deref())
    .bind(input.nivel_actividad.as_deref())
    .bind(input.comidas_por_dia.map(|v| v as i32))
    .bind(Json(metrics))
    .fetch_one(db)
    .await
}
