//! Prompt templates for recipe enrichment requests.

use crate::error::ConfigError;
use crate::types::Recipe;
use serde::{Deserialize, Serialize};
use std::path::Path;

const NOT_PROVIDED: &str = "Not provided";

const DEFAULT_SYSTEM: &str = "You are a culinary expert. You analyze recipes and respond \
with a single JSON object containing enrichment metadata. Respond with JSON only: no \
explanations, no markdown. Use integers for numbers and lowercase true/false for booleans.";

const DEFAULT_USER: &str = r#"Analyze this recipe and respond ONLY with a JSON object.

Id: {id}
Title: {title}
Summary: {summary}
Keywords: {keywords}
Tags: {tags}
Categories: {categories}

Full Recipe Text:
{text}

Ingredients:
{ingredients}

Instructions:
{instructions}

Required JSON fields:
- id (string): exactly "{id}"
- healthiness_score (integer 1-5): 5 is very healthy
- ease_of_cooking_score (integer 1-5): 5 is very easy
- ingredient_availability_score (integer 1-5): 5 is available in any grocery store
- prep_time_minutes (integer)
- cooking_time_minutes (integer)
- soaking_required (boolean)
- soaking_time_minutes (integer, required if soaking_required is true, otherwise null)
- protein_level (string): one of "low", "medium", "high"
- meal_type_suitability (array): any of "breakfast", "brunch", "lunch", "dinner", "snack", "dessert", "beverage", "side_dish"
- dietary_restrictions (array): any of "vegetarian", "vegan", "eggetarian", "non_vegetarian", "gluten_free", "dairy_free", "nut_free", "jain", "low_carb", "keto"
- category_tags (array of strings): dish type, cooking method, and regional cuisine

Optional JSON fields:
- generated_summary (string): an enticing 2-3 sentence description of the dish
- prep_notes (string or null)
- prep_time_breakdown (object): preparation step -> minutes
- cooking_time_breakdown (object): cooking step -> minutes"#;

/// System and user prompt templates.
///
/// The user template may reference `{id}`, `{title}`, `{summary}`,
/// `{keywords}`, `{tags}`, `{categories}`, `{text}`, `{ingredients}`, and
/// `{instructions}`. Other braces are left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM.to_string(),
            user: DEFAULT_USER.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Load templates from a TOML file with `system` and `user` keys.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let template: PromptTemplate = toml::from_str(&content)?;
        if template.user.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "prompt file {} has an empty `user` template",
                path.display()
            )));
        }
        Ok(template)
    }

    /// Fill the user template with a recipe's fields.
    pub fn render(&self, recipe: &Recipe) -> String {
        let list = |items: &[String], sep: &str| {
            if items.is_empty() {
                NOT_PROVIDED.to_string()
            } else {
                items.join(sep)
            }
        };
        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(NOT_PROVIDED)
                .to_string()
        };

        let value = |key: &str| -> Option<String> {
            Some(match key {
                "id" => recipe.id.clone(),
                "title" => recipe.title.clone(),
                "summary" => optional(&recipe.summary),
                "keywords" => list(&recipe.keywords, ", "),
                "tags" => list(&recipe.tags, ", "),
                "categories" => list(&recipe.categories, ", "),
                "text" => optional(&recipe.text),
                "ingredients" => list(&recipe.ingredients, "\n"),
                "instructions" => list(&recipe.instructions, "\n"),
                _ => return None,
            })
        };

        // Single pass over the template: substituted values are never
        // rescanned for placeholders.
        let mut out = String::with_capacity(self.user.len());
        let mut rest = self.user.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let placeholder = after
                .find('}')
                .and_then(|close| value(&after[..close]).map(|v| (close, v)));
            match placeholder {
                Some((close, v)) => {
                    out.push_str(&v);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_placeholders() {
        let mut recipe = Recipe::new(
            "r7",
            "Masala Chai",
            vec!["tea".into(), "milk".into()],
            vec!["boil".into()],
        );
        recipe.keywords = vec!["tea".into(), "spiced".into()];

        let prompt = PromptTemplate::default().render(&recipe);
        assert!(prompt.contains("Title: Masala Chai"));
        assert!(prompt.contains("exactly \"r7\""));
        assert!(prompt.contains("tea\nmilk"));
        assert!(prompt.contains("Keywords: tea, spiced"));
        assert!(prompt.contains("Summary: Not provided"));
        assert!(!prompt.contains("{title}"));
    }

    #[test]
    fn test_render_leaves_unknown_braces() {
        let template = PromptTemplate {
            system: String::new(),
            user: "{title} as {\"json\": true} {unknown}".into(),
        };
        let recipe = Recipe::new("r1", "Idli", vec![], vec![]);
        assert_eq!(template.render(&recipe), "Idli as {\"json\": true} {unknown}");
    }

    #[test]
    fn test_render_does_not_expand_placeholders_inside_values() {
        let template = PromptTemplate {
            system: String::new(),
            user: "{title} | {text} | {id}".into(),
        };
        let mut recipe = Recipe::new("r2", "Dal {text} {ingredients}", vec!["dal".into()], vec![]);
        recipe.text = Some("Boil {id}".into());
        assert_eq!(
            template.render(&recipe),
            "Dal {text} {ingredients} | Boil {id} | r2"
        );
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.toml");
        std::fs::write(&path, "system = \"be brief\"\nuser = \"Recipe: {title}\"\n").unwrap();

        let template = PromptTemplate::load(&path).unwrap();
        assert_eq!(template.system, "be brief");

        std::fs::write(&path, "system = \"x\"\nuser = \"  \"\n").unwrap();
        assert!(PromptTemplate::load(&path).is_err());
    }
}
