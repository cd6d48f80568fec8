//! Schema validation for model-generated enrichment objects.
//!
//! The model returns free text that should contain one JSON object. This
//! module extracts that object ([`parse_response`]) and checks it field by
//! field ([`validate`]), failing on the first missing, mistyped, or
//! out-of-range field. Nothing is defaulted.

use crate::error::ValidationError;
use crate::types::{DietaryTag, EnrichmentResult, MealType, ProteinLevel, Score};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Required fields, in the order they are checked.
pub const REQUIRED_FIELDS: &[&str] = &[
    "id",
    "healthiness_score",
    "ease_of_cooking_score",
    "ingredient_availability_score",
    "prep_time_minutes",
    "cooking_time_minutes",
    "soaking_required",
    "protein_level",
    "meal_type_suitability",
    "dietary_restrictions",
    "category_tags",
];

/// Alternate key names accepted for a canonical field.
const ALIASES: &[(&str, &str)] = &[
    (
        "ingredient_availability_score",
        "indian_ingredient_availability_score",
    ),
    ("cooking_time_minutes", "total_cooking_time_minutes"),
    ("category_tags", "categories"),
];

/// Pseudo-field name used when the response is not a JSON object at all.
pub const RESPONSE_FIELD: &str = "<response>";

/// Extract the JSON object from raw model output.
///
/// Tolerates markdown code fences and prose around the object by taking the
/// outermost `{ ... }` span.
pub fn parse_response(raw: &str) -> Result<Value, ValidationError> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let body = match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => {
            return Err(ValidationError::new(
                RESPONSE_FIELD,
                "no JSON object found in model output",
            ))
        }
    };

    serde_json::from_str(body)
        .map_err(|e| ValidationError::new(RESPONSE_FIELD, format!("invalid JSON: {e}")))
}

/// Validate a raw enrichment object.
pub fn validate(raw: &Value) -> Result<EnrichmentResult, ValidationError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ValidationError::new(RESPONSE_FIELD, "expected a JSON object"))?;
    let fields = Fields(obj);

    let id = fields.non_empty_string("id")?;
    let healthiness_score = fields.score("healthiness_score")?;
    let ease_of_cooking_score = fields.score("ease_of_cooking_score")?;
    let ingredient_availability_score = fields.score("ingredient_availability_score")?;
    let prep_time_minutes = fields.minutes("prep_time_minutes")?;
    let cooking_time_minutes = fields.minutes("cooking_time_minutes")?;
    let soaking_required = fields.flag("soaking_required")?;
    let protein_level = fields.label("protein_level", ProteinLevel::parse)?;
    let meal_type_suitability = fields.label_set("meal_type_suitability", MealType::parse)?;
    let dietary_restrictions = fields.label_set("dietary_restrictions", DietaryTag::parse)?;
    let category_tags = fields.category_tags("category_tags")?;

    let soaking_time_minutes = fields.optional_minutes("soaking_time_minutes")?;
    if soaking_required && soaking_time_minutes.is_none() {
        return Err(ValidationError::new(
            "soaking_time_minutes",
            "required when soaking_required is true",
        ));
    }

    Ok(EnrichmentResult {
        id,
        healthiness_score,
        ease_of_cooking_score,
        ingredient_availability_score,
        prep_time_minutes,
        cooking_time_minutes,
        soaking_required,
        soaking_time_minutes,
        protein_level,
        meal_type_suitability,
        dietary_restrictions,
        category_tags,
        generated_summary: fields.optional_string("generated_summary")?,
        prep_notes: fields.optional_string("prep_notes")?,
        prep_time_breakdown: fields.breakdown("prep_time_breakdown")?,
        cooking_time_breakdown: fields.breakdown("cooking_time_breakdown")?,
    })
}

/// Typed accessors over a JSON object, one per field kind.
struct Fields<'a>(&'a Map<String, Value>);

impl Fields<'_> {
    /// Look up a field by canonical name, then by alias. JSON `null` counts as absent.
    fn get(&self, name: &str) -> Option<&Value> {
        let alias = ALIASES
            .iter()
            .find(|(canonical, _)| *canonical == name)
            .map(|(_, alias)| *alias);

        self.0
            .get(name)
            .or_else(|| alias.and_then(|a| self.0.get(a)))
            .filter(|v| !v.is_null())
    }

    fn required(&self, name: &str) -> Result<&Value, ValidationError> {
        self.get(name).ok_or_else(|| ValidationError::missing(name))
    }

    fn non_empty_string(&self, name: &str) -> Result<String, ValidationError> {
        match self.required(name)? {
            Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Value::String(_) => Err(ValidationError::new(name, "must not be empty")),
            other => Err(type_error(name, "string", other)),
        }
    }

    fn score(&self, name: &str) -> Result<Score, ValidationError> {
        let value = self.required(name)?;
        let n = value
            .as_u64()
            .ok_or_else(|| type_error(name, "integer", value))?;
        u8::try_from(n)
            .ok()
            .and_then(Score::new)
            .ok_or_else(|| {
                ValidationError::new(
                    name,
                    format!(
                        "must be between {} and {}, got {n}",
                        Score::MIN,
                        Score::MAX
                    ),
                )
            })
    }

    fn minutes_value(name: &str, value: &Value) -> Result<u32, ValidationError> {
        if let Some(n) = value.as_i64().filter(|n| *n < 0) {
            return Err(ValidationError::new(
                name,
                format!("must be non-negative, got {n}"),
            ));
        }
        let n = value
            .as_u64()
            .ok_or_else(|| type_error(name, "integer (minutes)", value))?;
        u32::try_from(n).map_err(|_| ValidationError::new(name, format!("{n} is out of range")))
    }

    fn minutes(&self, name: &str) -> Result<u32, ValidationError> {
        Self::minutes_value(name, self.required(name)?)
    }

    fn optional_minutes(&self, name: &str) -> Result<Option<u32>, ValidationError> {
        self.get(name)
            .map(|v| Self::minutes_value(name, v))
            .transpose()
    }

    fn flag(&self, name: &str) -> Result<bool, ValidationError> {
        let value = self.required(name)?;
        value.as_bool().ok_or_else(|| type_error(name, "boolean", value))
    }

    fn label<T>(&self, name: &str, parse: fn(&str) -> Option<T>) -> Result<T, ValidationError> {
        let value = self.required(name)?;
        let s = value.as_str().ok_or_else(|| type_error(name, "string", value))?;
        parse(s).ok_or_else(|| ValidationError::new(name, format!("unknown value '{s}'")))
    }

    fn label_set<T: Ord>(
        &self,
        name: &str,
        parse: fn(&str) -> Option<T>,
    ) -> Result<BTreeSet<T>, ValidationError> {
        let value = self.required(name)?;
        let items = value
            .as_array()
            .ok_or_else(|| type_error(name, "array of strings", value))?;

        items
            .iter()
            .map(|item| {
                let s = item
                    .as_str()
                    .ok_or_else(|| type_error(name, "array of strings", item))?;
                parse(s).ok_or_else(|| ValidationError::new(name, format!("unknown value '{s}'")))
            })
            .collect()
    }

    /// Category tags: an array of strings, or an object whose values are
    /// arrays of strings (flattened).
    fn category_tags(&self, name: &str) -> Result<BTreeSet<String>, ValidationError> {
        let value = self.required(name)?;
        let items: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Object(groups) => {
                let mut items = Vec::new();
                for group in groups.values() {
                    let group = group
                        .as_array()
                        .ok_or_else(|| type_error(name, "object of string arrays", group))?;
                    items.extend(group.iter());
                }
                items
            }
            other => return Err(type_error(name, "array of strings", other)),
        };

        items
            .into_iter()
            .map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
                Value::String(_) => Err(ValidationError::new(name, "tags must not be empty")),
                other => Err(type_error(name, "array of strings", other)),
            })
            .collect()
    }

    fn optional_string(&self, name: &str) -> Result<Option<String>, ValidationError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(type_error(name, "string", other)),
        }
    }

    fn breakdown(&self, name: &str) -> Result<BTreeMap<String, u32>, ValidationError> {
        let Some(value) = self.get(name) else {
            return Ok(BTreeMap::new());
        };
        let obj = value
            .as_object()
            .ok_or_else(|| type_error(name, "object of minutes", value))?;

        obj.iter()
            .map(|(step, minutes)| {
                Self::minutes_value(&format!("{name}.{step}"), minutes).map(|m| (step.clone(), m))
            })
            .collect()
    }
}

fn type_error(name: &str, expected: &str, got: &Value) -> ValidationError {
    let got = match got {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    ValidationError::new(name, format!("expected {expected}, got {got}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "id": "r1",
            "healthiness_score": 4,
            "ease_of_cooking_score": 3,
            "ingredient_availability_score": 5,
            "prep_time_minutes": 20,
            "cooking_time_minutes": 35,
            "soaking_required": false,
            "protein_level": "Medium",
            "meal_type_suitability": ["Lunch", "Dinner"],
            "dietary_restrictions": ["Vegetarian"],
            "category_tags": ["curry", "north indian"]
        })
    }

    #[test]
    fn test_validate_accepts_complete_object() {
        let result = validate(&valid()).unwrap();
        assert_eq!(result.id, "r1");
        assert_eq!(result.healthiness_score.get(), 4);
        assert_eq!(result.protein_level, ProteinLevel::Medium);
        assert!(result.meal_type_suitability.contains(&MealType::Dinner));
        assert_eq!(result.category_tags.len(), 2);
    }

    #[test]
    fn test_validate_rejects_each_missing_required_field() {
        for field in REQUIRED_FIELDS {
            let mut raw = valid();
            raw.as_object_mut().unwrap().remove(*field);
            let err = validate(&raw).unwrap_err();
            assert_eq!(err.field, *field, "removing {field} should be reported");
            assert!(err.reason.contains("missing"));
        }
    }

    #[test]
    fn test_validate_treats_null_as_missing() {
        let mut raw = valid();
        raw["protein_level"] = Value::Null;
        assert_eq!(validate(&raw).unwrap_err().field, "protein_level");
    }

    #[test]
    fn test_validate_rejects_out_of_range_scores() {
        for (field, bad) in [
            ("healthiness_score", json!(0)),
            ("ease_of_cooking_score", json!(6)),
            ("ingredient_availability_score", json!(300)),
            ("healthiness_score", json!(-1)),
        ] {
            let mut raw = valid();
            raw[field] = bad;
            let err = validate(&raw).unwrap_err();
            assert_eq!(err.field, field);
        }
    }

    #[test]
    fn test_validate_rejects_wrong_types() {
        let mut raw = valid();
        raw["healthiness_score"] = json!("4");
        let err = validate(&raw).unwrap_err();
        assert!(err.reason.contains("expected integer, got string"));

        let mut raw = valid();
        raw["soaking_required"] = json!("no");
        assert_eq!(validate(&raw).unwrap_err().field, "soaking_required");
    }

    #[test]
    fn test_validate_reports_first_failing_field() {
        let mut raw = valid();
        raw["ease_of_cooking_score"] = json!(9);
        raw["protein_level"] = json!("extreme");
        assert_eq!(validate(&raw).unwrap_err().field, "ease_of_cooking_score");
    }

    #[test]
    fn test_validate_rejects_unknown_enum_values() {
        let mut raw = valid();
        raw["dietary_restrictions"] = json!(["Vegetarian", "Paleo-ish"]);
        let err = validate(&raw).unwrap_err();
        assert_eq!(err.field, "dietary_restrictions");
        assert!(err.reason.contains("Paleo-ish"));
    }

    #[test]
    fn test_validate_rejects_negative_minutes() {
        let mut raw = valid();
        raw["prep_time_minutes"] = json!(-5);
        let err = validate(&raw).unwrap_err();
        assert!(err.reason.contains("non-negative"));
    }

    #[test]
    fn test_validate_requires_soaking_time_when_soaking() {
        let mut raw = valid();
        raw["soaking_required"] = json!(true);
        assert_eq!(validate(&raw).unwrap_err().field, "soaking_time_minutes");

        raw["soaking_time_minutes"] = json!(240);
        assert_eq!(validate(&raw).unwrap().soaking_time_minutes, Some(240));
    }

    #[test]
    fn test_validate_accepts_aliases_and_grouped_categories() {
        let mut raw = valid();
        let obj = raw.as_object_mut().unwrap();
        obj.remove("cooking_time_minutes");
        obj.remove("category_tags");
        obj.insert("total_cooking_time_minutes".into(), json!(45));
        obj.insert(
            "categories".into(),
            json!({"dish_type": ["Curry"], "region": ["Punjabi", "Curry"]}),
        );

        let result = validate(&raw).unwrap();
        assert_eq!(result.cooking_time_minutes, 45);
        assert_eq!(
            result.category_tags,
            ["Curry".to_string(), "Punjabi".to_string()].into()
        );
    }

    #[test]
    fn test_validate_optional_fields() {
        let mut raw = valid();
        raw["generated_summary"] = json!("A hearty lentil stew.");
        raw["prep_time_breakdown"] = json!({"chopping": 10, "measuring": 5});
        let result = validate(&raw).unwrap();
        assert_eq!(result.generated_summary.as_deref(), Some("A hearty lentil stew."));
        assert_eq!(result.prep_time_breakdown.get("chopping"), Some(&10));

        raw["cooking_time_breakdown"] = json!({"simmering": "long"});
        assert_eq!(
            validate(&raw).unwrap_err().field,
            "cooking_time_breakdown.simmering"
        );
    }

    #[test]
    fn test_parse_response_strips_fences_and_prose() {
        let raw = "Here you go:\n```json\n{\"id\": \"r1\", \"nested\": {\"a\": 1}}\n```\nEnjoy!";
        let value = parse_response(raw).unwrap();
        assert_eq!(value["id"], "r1");
        assert_eq!(value["nested"]["a"], 1);
    }

    #[test]
    fn test_parse_response_rejects_non_json() {
        let err = parse_response("I cannot help with that.").unwrap_err();
        assert_eq!(err.field, RESPONSE_FIELD);

        let err = parse_response("{ not json }").unwrap_err();
        assert!(err.reason.contains("invalid JSON"));
    }
}
