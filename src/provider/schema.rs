use serde_json::{json, Value};

use crate::meals::model::MealType;

pub const MEAL_FUNCTION_NAME: &str = "create_meal";

/// JSON schema of the `create_meal` function. The `mealType` enum follows
/// configuration so snack can be added or removed without code changes.
pub fn meal_function_parameters(meal_types: &[MealType]) -> Value {
    let types: Vec<&str> = meal_types.iter().map(|t| t.as_str()).collect();
    json!({
        "type": "object",
        "properties": {
            "meal": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Name of the dish" },
                    "ingredients": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Ingredients with quantities, in order of use"
                    },
                    "instructions": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Preparation steps in order"
                    },
                    "mealType": { "type": "string", "enum": types }
                },
                "required": ["name", "ingredients", "instructions", "mealType"],
                "additionalProperties": false
            }
        },
        "required": ["meal"],
        "additionalProperties": false
    })
}
