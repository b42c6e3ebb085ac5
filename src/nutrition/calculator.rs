//! Energy and macronutrient targets from a user's ficha técnica.
//!
//! BMR uses Mifflin-St Jeor (1990):
//! `10 × weight_kg + 6.25 × height_cm − 5 × age + s`, with `s = +5` for men
//! and `s = −161` for women. When sex is not given the mean of both
//! equations is used, i.e. `s = −78`.
//!
//! TDEE (`get_total`) is BMR times the activity factor, and the calorie
//! target applies the goal multiplier on top of TDEE. Calories are rounded
//! to whole kcal, BMI and grams to one decimal. BMR keeps one decimal.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

const MALE_OFFSET: f64 = 5.0;
const FEMALE_OFFSET: f64 = -161.0;
const FIBER_G_PER_1000_KCAL: f64 = 14.0;
const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARB: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

pub const DEFAULT_MEALS_PER_DAY: u32 = 3;
pub const MAX_MEALS_PER_DAY: u32 = 6;

const AGE_RANGE: RangeInclusive<u32> = 1..=120;
const WEIGHT_KG_RANGE: RangeInclusive<f64> = 20.0..=400.0;
const HEIGHT_CM_RANGE: RangeInclusive<f64> = 50.0..=250.0;

/// Raw calculator input as it arrives over the wire or from a stored profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NutritionInput {
    #[serde(default)]
    pub sexo: Option<String>,
    #[serde(default)]
    pub edad: Option<u32>,
    #[serde(default)]
    pub peso_kg: Option<f64>,
    #[serde(default)]
    pub altura_cm: Option<f64>,
    #[serde(default)]
    pub objetivo: Option<String>,
    #[serde(default)]
    pub nivel_actividad: Option<String>,
    #[serde(default)]
    pub comidas_por_dia: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Unspecified,
}

impl Sex {
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("male" | "m" | "hombre" | "masculino") => Sex::Male,
            Some("female" | "f" | "mujer" | "femenino") => Sex::Female,
            _ => Sex::Unspecified,
        }
    }

    fn bmr_offset(self) -> f64 {
        match self {
            Sex::Male => MALE_OFFSET,
            Sex::Female => FEMALE_OFFSET,
            Sex::Unspecified => (MALE_OFFSET + FEMALE_OFFSET) / 2.0,
        }
    }
}

/// Ordered from least to most active; factors are strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Intense,
    Athlete,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 5] = [
        ActivityLevel::Sedentary,
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::Intense,
        ActivityLevel::Athlete,
    ];

    /// Case-insensitive, accepts the legacy Spanish and snake_case names.
    /// Anything unrecognised is treated as moderate.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return ActivityLevel::Moderate;
        };
        match raw.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "sedentary" | "sedentario" | "sedentaria" => ActivityLevel::Sedentary,
            "light" | "ligero" | "ligera" | "leve" | "lightly_active" => ActivityLevel::Light,
            "intense" | "intenso" | "intensa" | "activo" | "activa" | "very_active" => {
                ActivityLevel::Intense
            }
            "athlete" | "atleta" | "muy_intenso" | "muy_activo" | "extra_active" => {
                ActivityLevel::Athlete
            }
            _ => ActivityLevel::Moderate,
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Intense => 1.725,
            ActivityLevel::Athlete => 1.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    Lose,
    Maintain,
    Gain,
}

/// Share of the calorie target coming from protein and fat. Carbohydrate
/// takes the remainder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroRatios {
    pub protein: f64,
    pub fat: f64,
}

impl Goal {
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("lose" | "perder" | "bajar" | "lose_weight" | "perder_peso" | "bajar_peso") => {
                Goal::Lose
            }
            Some("gain" | "ganar" | "subir" | "gain_weight" | "ganar_peso" | "ganar_masa") => {
                Goal::Gain
            }
            _ => Goal::Maintain,
        }
    }

    pub fn calorie_multiplier(self) -> f64 {
        match self {
            Goal::Lose => 0.8,
            Goal::Maintain => 1.0,
            Goal::Gain => 1.15,
        }
    }

    pub fn macro_ratios(self) -> MacroRatios {
        match self {
            Goal::Lose => MacroRatios { protein: 0.30, fat: 0.25 },
            Goal::Maintain => MacroRatios { protein: 0.20, fat: 0.30 },
            Goal::Gain => MacroRatios { protein: 0.25, fat: 0.25 },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealCalories {
    pub comida: String,
    pub porcentaje: f64,
    pub calorias: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealMacros {
    pub comida: String,
    pub proteinas: f64,
    pub grasas: f64,
    pub carbohidratos: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionMetrics {
    pub imc: f64,
    pub tmb: f64,
    pub factor_actividad: f64,
    pub calorias_objetivo: f64,
    pub get_total: f64,
    pub proteinas_objetivo: f64,
    pub grasas_objetivo: f64,
    pub carbohidratos_objetivo: f64,
    pub fibra_objetivo: f64,
    pub distribucion_calorias: Vec<MealCalories>,
    pub distribucion_macros: Vec<MealMacros>,
}

impl NutritionMetrics {
    /// Calories the user should eat at the named meal, if the distribution
    /// has such a meal.
    pub fn meal_calories(&self, comida: &str) -> Option<f64> {
        self.distribucion_calorias
            .iter()
            .find(|m| m.comida == comida)
            .map(|m| m.calorias)
    }
}

/// Fixed distribution curve: named shares for three and four meals, equal
/// split for any other count.
pub fn meal_shares(meals_per_day: u32) -> Vec<(String, f64)> {
    let named: &[(&str, f64)] = match meals_per_day {
        1 => &[("almuerzo", 1.0)],
        2 => &[("almuerzo", 0.5), ("cena", 0.5)],
        3 => &[("desayuno", 0.30), ("almuerzo", 0.40), ("cena", 0.30)],
        4 => &[
            ("desayuno", 0.25),
            ("almuerzo", 0.35),
            ("cena", 0.30),
            ("merienda", 0.10),
        ],
        n => {
            let share = 1.0 / f64::from(n);
            return (1..=n).map(|i| (format!("comida_{i}"), share)).collect();
        }
    };
    named.iter().map(|(n, s)| (n.to_string(), *s)).collect()
}

fn round0(v: f64) -> f64 {
    v.round()
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn require_in_range(
    value: Option<f64>,
    field: &str,
    range: RangeInclusive<f64>,
) -> Result<f64, ApiError> {
    match value {
        None => Err(ApiError::invalid_input(format!("{field} is required"))),
        Some(v) if !v.is_finite() || !range.contains(&v) => Err(ApiError::invalid_input(format!(
            "{field} must be between {} and {}",
            range.start(),
            range.end()
        ))),
        Some(v) => Ok(v),
    }
}

pub fn mifflin_st_jeor(weight_kg: f64, height_cm: f64, age: u32, sex: Sex) -> f64 {
    10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age) + sex.bmr_offset()
}

/// Computes every derived metric of a nutrition profile.
///
/// # Errors
///
/// `InvalidInput` when weight, height or age is missing or outside its
/// plausible range, when they yield a non-positive BMR, or when
/// `comidas_por_dia` is outside `1..=6`.
pub fn calculate_nutrition_profile(input: &NutritionInput) -> Result<NutritionMetrics, ApiError> {
    let weight = require_in_range(input.peso_kg, "peso_kg", WEIGHT_KG_RANGE)?;
    let height = require_in_range(input.altura_cm, "altura_cm", HEIGHT_CM_RANGE)?;
    let age = match input.edad {
        None => return Err(ApiError::invalid_input("edad is required")),
        Some(a) if !AGE_RANGE.contains(&a) => {
            return Err(ApiError::invalid_input(format!(
                "edad must be between {} and {}",
                AGE_RANGE.start(),
                AGE_RANGE.end()
            )))
        }
        Some(a) => a,
    };
    let meals = input.comidas_por_dia.unwrap_or(DEFAULT_MEALS_PER_DAY);
    if !(1..=MAX_MEALS_PER_DAY).contains(&meals) {
        return Err(ApiError::invalid_input(format!(
            "comidas_por_dia must be between 1 and {MAX_MEALS_PER_DAY}"
        )));
    }

    let sex = Sex::parse_lenient(input.sexo.as_deref());
    let activity = ActivityLevel::parse_lenient(input.nivel_actividad.as_deref());
    let goal = Goal::parse_lenient(input.objetivo.as_deref());

    let height_m = height / 100.0;
    let bmi = weight / (height_m * height_m);
    let bmr = mifflin_st_jeor(weight, height, age, sex);
    // Extreme but in-range combinations can still push the formula to zero.
    if bmr <= 0.0 {
        return Err(ApiError::invalid_input(
            "edad, peso_kg and altura_cm do not describe a plausible body",
        ));
    }
    let tdee = bmr * activity.factor();
    let target = round0(tdee * goal.calorie_multiplier());

    let ratios = goal.macro_ratios();
    let protein_g = target * ratios.protein / KCAL_PER_G_PROTEIN;
    let fat_g = target * ratios.fat / KCAL_PER_G_FAT;
    let carb_g = (target - protein_g * KCAL_PER_G_PROTEIN - fat_g * KCAL_PER_G_FAT) / KCAL_PER_G_CARB;
    let fiber_g = target / 1000.0 * FIBER_G_PER_1000_KCAL;

    let shares = meal_shares(meals);
    let distribucion_calorias = shares
        .iter()
        .map(|(name, share)| MealCalories {
            comida: name.clone(),
            porcentaje: round1(share * 100.0),
            calorias: round0(target * share),
        })
        .collect();
    let distribucion_macros = shares
        .iter()
        .map(|(name, share)| MealMacros {
            comida: name.clone(),
            proteinas: round1(protein_g * share),
            grasas: round1(fat_g * share),
            carbohidratos: round1(carb_g * share),
        })
        .collect();

    Ok(NutritionMetrics {
        imc: round1(bmi),
        tmb: round1(bmr),
        factor_actividad: activity.factor(),
        calorias_objetivo: target,
        get_total: round0(tdee),
        proteinas_objetivo: round1(protein_g),
        grasas_objetivo: round1(fat_g),
        carbohidratos_objetivo: round1(carb_g),
        fibra_objetivo: round1(fiber_g),
        distribucion_calorias,
        distribucion_macros,
    })
}
