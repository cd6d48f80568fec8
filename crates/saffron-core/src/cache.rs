//! On-disk cache of validated enrichment results.
//!
//! One JSON file per (recipe content, model) pair, so a rerun, or a second
//! input file containing the same recipe, does not pay for the model call
//! again. Cache failures are logged and otherwise ignored.

use crate::types::{EnrichmentResult, Recipe};
use std::path::{Path, PathBuf};

/// Maximum length of the title portion of a cache key.
const MAX_TITLE_CHARS: usize = 60;

pub struct RecipeCache {
    dir: PathBuf,
    model: String,
}

impl RecipeCache {
    /// Open (and create if needed) a cache directory for one model.
    pub fn open(dir: impl Into<PathBuf>, model: &str) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            model: model.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Filesystem-safe key: sanitized title, content hash prefix, model.
    pub fn key(&self, recipe: &Recipe) -> String {
        let hash = recipe.content_hash();
        format!(
            "{}_{}_{}",
            sanitize(&recipe.title, MAX_TITLE_CHARS),
            &hash[..16],
            sanitize(&self.model, MAX_TITLE_CHARS)
        )
    }

    fn path_for(&self, recipe: &Recipe) -> PathBuf {
        self.dir.join(format!("{}.json", self.key(recipe)))
    }

    /// Look up a cached result. The returned result carries `recipe.id`.
    pub async fn get(&self, recipe: &Recipe) -> Option<EnrichmentResult> {
        let path = self.path_for(recipe);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Cache miss for recipe: {}", recipe.title);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read cache entry {path:?}: {e}");
                return None;
            }
        };

        match serde_json::from_slice::<EnrichmentResult>(&bytes) {
            Ok(mut result) => {
                tracing::debug!("Cache hit for recipe: {}", recipe.title);
                result.id = recipe.id.clone();
                Some(result)
            }
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache entry {path:?}: {e}");
                None
            }
        }
    }

    /// Store a validated result. Returns whether the write succeeded.
    pub async fn set(&self, recipe: &Recipe, result: &EnrichmentResult) -> bool {
        let path = self.path_for(recipe);
        let json = match serde_json::to_vec_pretty(result) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize cache entry for {}: {e}", recipe.id);
                return false;
            }
        };
        match tokio::fs::write(&path, json).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to write cache entry {path:?}: {e}");
                false
            }
        }
    }

    /// Remove every cached entry (for all models). Returns the count removed.
    pub fn clear(dir: &Path) -> std::io::Result<usize> {
        if !dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        tracing::info!("Cleared {removed} cache entries from {dir:?}");
        Ok(removed)
    }
}

fn sanitize(s: &str, max_chars: usize) -> String {
    s.chars()
        .take(max_chars)
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProteinLevel, Score};

    fn result(id: &str) -> EnrichmentResult {
        EnrichmentResult {
            id: id.to_string(),
            healthiness_score: Score::new(3).unwrap(),
            ease_of_cooking_score: Score::new(3).unwrap(),
            ingredient_availability_score: Score::new(3).unwrap(),
            prep_time_minutes: 5,
            cooking_time_minutes: 10,
            soaking_required: false,
            soaking_time_minutes: None,
            protein_level: ProteinLevel::Low,
            meal_type_suitability: Default::default(),
            dietary_restrictions: Default::default(),
            category_tags: Default::default(),
            generated_summary: None,
            prep_notes: None,
            prep_time_breakdown: Default::default(),
            cooking_time_breakdown: Default::default(),
        }
    }

    #[test]
    fn test_key_is_filesystem_safe() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RecipeCache::open(dir.path(), "gpt-4o/mini").unwrap();
        let recipe = Recipe::new("r1", "Aloo: \"Gobi\" / Sabzi?", vec![], vec![]);
        let key = cache.key(&recipe);
        assert!(key.starts_with("Aloo___Gobi____Sabzi_"));
        assert!(key.ends_with("_gpt-4o_mini"));
        assert!(!key.contains('/'));
    }

    #[test]
    fn test_key_depends_on_model() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = Recipe::new("r1", "Upma", vec!["semolina".into()], vec![]);
        let a = RecipeCache::open(dir.path(), "model-a").unwrap().key(&recipe);
        let b = RecipeCache::open(dir.path(), "model-b").unwrap().key(&recipe);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_roundtrip_rewrites_id() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RecipeCache::open(dir.path().join("cache"), "m").unwrap();
        let first = Recipe::new("first", "Upma", vec!["semolina".into()], vec![]);
        let duplicate = Recipe::new("second", "Upma", vec!["semolina".into()], vec![]);

        assert!(cache.get(&first).await.is_none());
        assert!(cache.set(&first, &result("first")).await);

        let hit = cache.get(&duplicate).await.unwrap();
        assert_eq!(hit.id, "second");
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RecipeCache::open(dir.path(), "m").unwrap();
        let recipe = Recipe::new("r1", "Upma", vec![], vec![]);
        std::fs::write(dir.path().join(format!("{}.json", cache.key(&recipe))), "{oops").unwrap();
        assert!(cache.get(&recipe).await.is_none());
    }

    #[test]
    fn test_clear_removes_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        assert_eq!(RecipeCache::clear(dir.path()).unwrap(), 2);
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(RecipeCache::clear(&dir.path().join("missing")).unwrap(), 0);
    }
}
