//! Core data types for the Saffron enrichment pipeline.
//!
//! A [`Recipe`] comes in, an [`EnrichmentResult`] comes back from the model
//! (after schema validation), and the two are joined into an [`EnrichedRecipe`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A source recipe as read from the input file.
///
/// Immutable once loaded. Fields the pipeline does not know about are kept in
/// `extra` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Stable identifier; derived from the content hash when the input omits it
    #[serde(default)]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub ingredients: Vec<String>,

    #[serde(default)]
    pub instructions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Full free-form recipe text (as scraped)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,

    /// Unrecognized input fields, passed through verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Recipe {
    /// Create a recipe with only the required fields set.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        ingredients: Vec<String>,
        instructions: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ingredients,
            instructions,
            url: None,
            summary: None,
            text: None,
            keywords: Vec::new(),
            tags: Vec::new(),
            categories: Vec::new(),
            image: None,
            publish_date: None,
            extra: serde_json::Map::new(),
        }
    }

    /// BLAKE3 hash over the content the model sees (title, ingredients,
    /// instructions, text), hex encoded.
    ///
    /// Each part is length-prefixed so that moving a line between sections
    /// changes the hash.
    pub fn content_hash(&self) -> String {
        fn section<'a>(hasher: &mut blake3::Hasher, parts: impl ExactSizeIterator<Item = &'a str>) {
            hasher.update(&(parts.len() as u64).to_le_bytes());
            for part in parts {
                hasher.update(&(part.len() as u64).to_le_bytes());
                hasher.update(part.as_bytes());
            }
        }

        let mut hasher = blake3::Hasher::new();
        section(&mut hasher, std::iter::once(self.title.as_str()));
        section(&mut hasher, self.ingredients.iter().map(String::as_str));
        section(&mut hasher, self.instructions.iter().map(String::as_str));
        section(&mut hasher, self.text.as_deref().into_iter());
        hasher.finalize().to_hex().to_string()
    }
}

/// A bounded 1–5 rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Score {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "score must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

/// Lowercase, trim, and fold spaces and dashes to underscores.
fn normalize_label(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Protein content of a dish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProteinLevel {
    Low,
    Medium,
    High,
}

impl ProteinLevel {
    /// Parse a protein level (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match normalize_label(s).as_str() {
            "low" => Some(Self::Low),
            "medium" | "moderate" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Meals a dish is suitable for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Brunch,
    Lunch,
    Dinner,
    Snack,
    Dessert,
    Beverage,
    SideDish,
}

impl MealType {
    /// Parse a meal type label (case-insensitive, plurals accepted).
    pub fn parse(s: &str) -> Option<Self> {
        match normalize_label(s).as_str() {
            "breakfast" => Some(Self::Breakfast),
            "brunch" => Some(Self::Brunch),
            "lunch" => Some(Self::Lunch),
            "dinner" | "supper" => Some(Self::Dinner),
            "snack" | "snacks" => Some(Self::Snack),
            "dessert" | "desserts" => Some(Self::Dessert),
            "beverage" | "beverages" | "drink" | "drinks" => Some(Self::Beverage),
            "side_dish" | "side" | "side_dishes" => Some(Self::SideDish),
            _ => None,
        }
    }
}

/// Dietary restrictions a dish satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietaryTag {
    Vegetarian,
    Vegan,
    Eggetarian,
    NonVegetarian,
    GlutenFree,
    DairyFree,
    NutFree,
    Jain,
    LowCarb,
    Keto,
}

impl DietaryTag {
    /// Parse a dietary tag (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match normalize_label(s).as_str() {
            "vegetarian" | "veg" => Some(Self::Vegetarian),
            "vegan" => Some(Self::Vegan),
            "eggetarian" => Some(Self::Eggetarian),
            "non_vegetarian" | "non_veg" | "nonvegetarian" => Some(Self::NonVegetarian),
            "gluten_free" => Some(Self::GlutenFree),
            "dairy_free" => Some(Self::DairyFree),
            "nut_free" => Some(Self::NutFree),
            "jain" => Some(Self::Jain),
            "low_carb" => Some(Self::LowCarb),
            "keto" => Some(Self::Keto),
            _ => None,
        }
    }
}

/// Metadata derived by the model for one recipe, after validation.
///
/// Every required field is present and every score is within 1–5; the only
/// way to build one from model output is [`crate::schema::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    /// Identifier of the recipe this result belongs to
    pub id: String,

    pub healthiness_score: Score,
    pub ease_of_cooking_score: Score,
    pub ingredient_availability_score: Score,

    pub prep_time_minutes: u32,
    pub cooking_time_minutes: u32,

    pub soaking_required: bool,

    /// Required when `soaking_required` is true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soaking_time_minutes: Option<u32>,

    pub protein_level: ProteinLevel,
    pub meal_type_suitability: BTreeSet<MealType>,
    pub dietary_restrictions: BTreeSet<DietaryTag>,
    pub category_tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_notes: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub prep_time_breakdown: BTreeMap<String, u32>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cooking_time_breakdown: BTreeMap<String, u32>,
}

/// Key under which [`EnrichedRecipe`] serializes its enrichment. Reserved in
/// recipe input.
pub const ENRICHMENT_KEY: &str = "enrichment";

/// A recipe joined with its validated enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,

    pub enrichment: EnrichmentResult,
}

impl EnrichedRecipe {
    /// Join a recipe with its enrichment. Returns `None` if the ids differ.
    ///
    /// A pass-through `enrichment` field on the recipe is replaced by the new
    /// one.
    pub fn new(mut recipe: Recipe, enrichment: EnrichmentResult) -> Option<Self> {
        if recipe.id != enrichment.id {
            return None;
        }
        recipe.extra.remove(ENRICHMENT_KEY);
        Some(Self { recipe, enrichment })
    }

    pub fn id(&self) -> &str {
        &self.recipe.id
    }
}

/// One unresolved recipe failure, as written to the failure log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Batch index the recipe belonged to
    pub batch: usize,
    pub id: String,
    pub title: String,
    /// Error category ("permanent", "retry_exhausted", ...)
    pub kind: String,
    /// Number of model calls made before giving up
    pub attempts: u32,
    pub error: String,
}
