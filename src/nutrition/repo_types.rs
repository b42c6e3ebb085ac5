use serde::Serialize;
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use super::calculator::{NutritionInput, NutritionMetrics};

/// Stored ficha técnica with the metrics computed at the last save.
#[derive(Debug, Clone, FromRow)]
pub struct NutritionProfileRow {
    pub user_id: Uuid,
    pub sexo: Option<String>,
    pub edad: Option<i32>,
    pub peso_kg: Option<f64>,
    pub altura_cm: Option<f64>,
    pub objetivo: Option<String>,
    pub nivel_actividad: Option<String>,
    pub comidas_por_dia: Option<i32>,
    pub metrics: Json<NutritionMetrics>,
    pub updated_at: OffsetDateTime,
}

impl NutritionProfileRow {
    pub fn input(&self) -> NutritionInput {
        NutritionInput {
            sexo: self.sexo.clone(),
            edad: self.edad.and_then(|v| u32::try_from(v).ok()),
            peso_kg: self.peso_kg,
            altura_cm: self.altura_cm,
            objetivo: self.objetivo.clone(),
            nivel_actividad: self.nivel_actividad.clone(),
            comidas_por_dia: self.comidas_por_dia.and_then(|v| u32::try_from(v).ok()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NutritionProfile {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub input: NutritionInput,
    pub metrics: NutritionMetrics,
    pub updated_at: OffsetDateTime,
}

impl From<NutritionProfileRow> for NutritionProfile {
    fn from(r: NutritionProfileRow) -> Self {
        Self {
            user_id: r.user_id,
            input: r.input(),
            metrics: r.metrics.0,
            updated_at: r.updated_at,
        }
    }
}
