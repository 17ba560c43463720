use std::{fmt, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

pub const UNNAMED_MEAL: &str = "Unnamed Meal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    #[default]
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }

    /// Parses a comma separated list such as `breakfast,lunch,dinner`.
    /// Duplicates are dropped, order is kept.
    pub fn parse_list(raw: &str) -> anyhow::Result<Vec<MealType>> {
        let mut out = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let t: MealType = part.parse()?;
            if !out.contains(&t) {
                out.push(t);
            }
        }
        anyhow::ensure!(!out.is_empty(), "meal type list is empty");
        Ok(out)
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            other => anyhow::bail!("unknown meal type: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightUnit {
    #[default]
    Cm,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    Sedentary,
    Moderate,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    #[serde(rename = "lose weight")]
    LoseWeight,
    #[serde(rename = "maintain weight")]
    MaintainWeight,
    #[serde(rename = "gain weight")]
    GainWeight,
    #[serde(rename = "build muscle")]
    BuildMuscle,
}

/// Dietary profile submitted by the user. Input only; generation never mutates it.
///
/// Deserialization is lenient like [`Meal`]: a partially filled form is kept,
/// with missing, `null` or unrecognised values left unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawUserSettings")]
pub struct UserSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    pub weight_unit: WeightUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub height_unit: HeightUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favourite_foods: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disliked_foods: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUserSettings {
    #[serde(default)]
    age: Option<Value>,
    #[serde(default)]
    gender: Option<Value>,
    #[serde(default)]
    weight: Option<Value>,
    #[serde(default)]
    weight_unit: Option<Value>,
    #[serde(default)]
    height: Option<Value>,
    #[serde(default)]
    height_unit: Option<Value>,
    #[serde(default)]
    activity: Option<Value>,
    #[serde(default)]
    goal: Option<Value>,
    #[serde(default)]
    favourite_foods: Option<Value>,
    #[serde(default)]
    disliked_foods: Option<Value>,
    #[serde(default)]
    additional_info: Option<Value>,
}

impl From<RawUserSettings> for UserSettings {
    fn from(raw: RawUserSettings) -> Self {
        UserSettings {
            age: number(raw.age)
                .filter(|n| *n >= 0.0 && *n <= f64::from(u32::MAX))
                .map(|n| n.round() as u32),
            gender: text(raw.gender),
            weight: number(raw.weight),
            weight_unit: variant(raw.weight_unit).unwrap_or_default(),
            height: number(raw.height),
            height_unit: variant(raw.height_unit).unwrap_or_default(),
            activity: variant(raw.activity),
            goal: variant(raw.goal),
            favourite_foods: text(raw.favourite_foods),
            disliked_foods: text(raw.disliked_foods),
            additional_info: text(raw.additional_info),
        }
    }
}

/// Form inputs may hold numbers as strings.
fn number(v: Option<Value>) -> Option<f64> {
    let n: f64 = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn text(v: Option<Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

fn variant<T: serde::de::DeserializeOwned>(v: Option<Value>) -> Option<T> {
    serde_json::from_value(v?).ok()
}

/// One generated dish. `image` is empty when no picture is attached.
///
/// Deserialization is lenient: every field may be missing and is filled the
/// same way for provider output, request bodies and persisted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMeal")]
pub struct Meal {
    pub id: String,
    pub name: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[serde(rename = "type")]
    pub meal_type: MealType,
    pub image: String,
}

impl Meal {
    pub fn has_image(&self) -> bool {
        !self.image.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawMeal {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    ingredients: Option<Vec<String>>,
    #[serde(default)]
    instructions: Option<Vec<String>>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default, rename = "mealType")]
    meal_type: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

impl From<RawMeal> for Meal {
    fn from(raw: RawMeal) -> Self {
        let id = match raw.id {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => generate_id(),
        };
        let meal_type = raw
            .meal_type
            .or(raw.kind)
            .and_then(|t| t.parse().ok())
            .unwrap_or_default();
        Meal {
            id,
            name: raw
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNNAMED_MEAL.to_string()),
            ingredients: raw.ingredients.unwrap_or_default(),
            instructions: raw.instructions.unwrap_or_default(),
            meal_type,
            image: raw.image.unwrap_or_default(),
        }
    }
}

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn to_base36(mut n: u128) -> String {
    if n == 0 {
        return "0".into();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Short id for UI keys: base-36 millisecond timestamp followed by a base-36
/// random part. Not meant to be globally unique.
pub fn generate_id() -> String {
    let millis = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).max(0) as u128;
    let random: u64 = rand::thread_rng().gen();
    format!("{}{}", to_base36(millis), to_base36(random as u128))
}
