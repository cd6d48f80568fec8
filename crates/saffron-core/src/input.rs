//! Recipe input loading.
//!
//! The input file is read once, up front. It may hold a JSON array of
//! recipes or a single recipe object. Entries that do not parse are skipped
//! with a warning so one bad record does not block the run.

use crate::error::{Result, SaffronError};
use crate::types::{Recipe, ENRICHMENT_KEY};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Headings that end an extracted section.
const SECTION_BOUNDARIES: &[&str] = &[
    "Ingredients",
    "How to make",
    "Instructions",
    "Suggestion",
    "For",
    "Time",
    "Video",
    "Tags",
    "Categories",
];

/// Load and normalize every recipe in `path`.
pub fn load_recipes(path: &Path) -> Result<Vec<Recipe>> {
    let content = std::fs::read_to_string(path).map_err(|e| SaffronError::Input {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let recipes = parse_recipes(&content).map_err(|message| SaffronError::Input {
        path: path.to_path_buf(),
        message,
    })?;
    tracing::info!("Loaded {} recipes from {:?}", recipes.len(), path);
    Ok(recipes)
}

/// Parse recipes from a JSON document.
pub fn parse_recipes(content: &str) -> std::result::Result<Vec<Recipe>, String> {
    let value: Value = serde_json::from_str(content).map_err(|e| format!("invalid JSON: {e}"))?;

    let entries = match value {
        Value::Array(entries) => entries,
        obj @ Value::Object(_) => vec![obj],
        other => {
            return Err(format!(
                "expected an array of recipes or a single recipe object, got {}",
                type_name(&other)
            ))
        }
    };

    let mut recipes = Vec::with_capacity(entries.len());
    let mut seen = HashSet::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let recipe = match serde_json::from_value::<Recipe>(entry) {
            Ok(recipe) => normalize(recipe),
            Err(e) => {
                tracing::warn!("Skipping input entry {index}: {e}");
                continue;
            }
        };
        if !seen.insert(recipe.id.clone()) {
            tracing::warn!("Duplicate recipe id '{}' at input entry {index}", recipe.id);
        }
        recipes.push(recipe);
    }
    Ok(recipes)
}

/// Fill in ingredients and instructions from the free text when absent, and
/// derive an id from the content hash when the input has none.
pub fn normalize(mut recipe: Recipe) -> Recipe {
    if let Some(text) = recipe.text.as_deref() {
        if recipe.ingredients.is_empty() {
            recipe.ingredients = extract_section(text, "Ingredients");
        }
        if recipe.instructions.is_empty() {
            let mut steps = extract_section(text, "How to make");
            if steps.is_empty() {
                steps = extract_section(text, "Instructions");
            }
            recipe.instructions = steps;
        }
    }

    if recipe.id.trim().is_empty() {
        recipe.id = recipe.content_hash()[..16].to_string();
    } else {
        recipe.id = recipe.id.trim().to_string();
    }

    if recipe.extra.remove(ENRICHMENT_KEY).is_some() {
        tracing::warn!(
            "Recipe '{}' already has an `{ENRICHMENT_KEY}` field; it will be replaced",
            recipe.id
        );
    }
    recipe
}

/// Extract the lines following the `heading` line, up to the next known
/// heading. Bullets and step numbers are stripped.
pub fn extract_section(text: &str, heading: &str) -> Vec<String> {
    let mut lines = text.lines().map(str::trim);
    let mut items = Vec::new();

    let first = loop {
        match lines.next() {
            Some(line) => {
                if let Some(rest) = heading_rest(line, heading) {
                    break rest;
                }
            }
            None => return items,
        }
    };
    if let Some(item) = clean_item(first) {
        items.push(item);
    }

    for line in lines {
        if SECTION_BOUNDARIES
            .iter()
            .any(|b| heading_rest(line, b).is_some())
        {
            break;
        }
        if let Some(item) = clean_item(line) {
            items.push(item);
        }
    }
    items
}

/// If `line` is the heading `name`, return whatever follows it on the line.
fn heading_rest<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?;
    match rest.chars().next() {
        None => Some(""),
        Some(c) if c == ':' || c == '-' || c.is_whitespace() => {
            Some(rest.trim_start_matches(|c: char| c == ':' || c == '-' || c.is_whitespace()))
        }
        Some(_) => None,
    }
}

fn clean_item(line: &str) -> Option<String> {
    let line = line.trim_start_matches(['•', '-', '*', '–']).trim_start();

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    let line = if digits > 0 && line[digits..].starts_with(['.', ')']) {
        line[digits + 1..].trim_start()
    } else {
        line
    };

    let line = line.trim();
    (!line.is_empty()).then(|| line.to_string())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
