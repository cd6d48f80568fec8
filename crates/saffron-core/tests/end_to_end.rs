//! Full runs against a scripted provider: load input, enrich, checkpoint,
//! aggregate.

use async_trait::async_trait;
use saffron_core::batch::{combine, BatchRunner, CheckpointStore};
use saffron_core::llm::{EnrichOptions, Enricher, LlmProvider, LlmRequest, LlmResponse, RetryPolicy};
use saffron_core::{input, Config, EnrichError, EnrichedRecipe, FailureRecord, SaffronError};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const RESPONSE: &str = r#"Here you go:
```json
{"healthiness_score": 4, "ease_of_cooking_score": 3,
 "ingredient_availability_score": 5, "prep_time_minutes": 10,
 "cooking_time_minutes": 25, "soaking_required": true, "soaking_time_minutes": 120,
 "protein_level": "High", "meal_type_suitability": ["Lunch", "dinner"],
 "dietary_restrictions": ["vegan", "gluten-free"], "category_tags": ["curry", "punjabi"]}
```"#;

/// Returns `RESPONSE` for every recipe except those whose title mentions
/// "Forbidden", which fail with a non-retryable 400.
struct ScriptedProvider {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, EnrichError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.prompt.contains("Forbidden") {
            return Err(EnrichError::Permanent {
                message: "HTTP 400: invalid request".into(),
                status_code: Some(400),
            });
        }
        Ok(LlmResponse {
            text: RESPONSE.to_string(),
            model: "scripted-1".into(),
            tokens_used: Some(100),
            latency_ms: 1,
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }
}

fn write_input(dir: &Path, titles: &[&str]) -> std::path::PathBuf {
    let recipes: Vec<serde_json::Value> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            serde_json::json!({
                "id": format!("recipe-{i}"),
                "title": title,
                "ingredients": ["1 cup chickpeas", "2 onions"],
                "instructions": ["Soak chickpeas", "Cook with onions"],
                "url": format!("https://example.org/{i}")
            })
        })
        .collect();
    let path = dir.join("recipes.json");
    std::fs::write(&path, serde_json::to_string_pretty(&recipes).unwrap()).unwrap();
    path
}

fn config_for(dir: &Path, batch_size: usize) -> Config {
    let mut config = Config::default();
    config.general.output_dir = dir.join("out");
    config.batch.batch_size = batch_size;
    config
}

fn build_runner(config: &Config, calls: Arc<AtomicUsize>) -> BatchRunner {
    let options = EnrichOptions {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 4,
            jitter: true,
        },
        ..EnrichOptions::default()
    };
    let enricher = Enricher::new(Box::new(ScriptedProvider { calls }), options);
    let store = CheckpointStore::open(config.output_dir(), config.output.pretty).unwrap();
    BatchRunner::new(enricher, store, config.run_options(false))
}

fn read_final(config: &Config) -> Vec<EnrichedRecipe> {
    let content = std::fs::read_to_string(config.final_output_path()).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[tokio::test]
async fn five_recipes_in_batches_of_two() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = write_input(dir.path(), &["Chole", "Rajma", "Dal", "Kadhi", "Sambar"]);
    let config = config_for(dir.path(), 2);
    let recipes = input::load_recipes(&input_path).unwrap();

    let runner = build_runner(&config, Arc::new(AtomicUsize::new(0)));
    let report = runner.run(&recipes).await.unwrap();

    assert_eq!(report.total_batches, 3);
    assert_eq!(report.succeeded, 5);
    assert_eq!(report.failed, 0);
    assert!(!report.has_unresolved_failures());

    let store = runner.store();
    assert_eq!(store.indices().unwrap(), vec![0, 1, 2]);
    let sizes: Vec<usize> = (0..3).map(|b| store.read(b).unwrap().records.len()).collect();
    assert_eq!(sizes, vec![2, 2, 1]);

    let records = read_final(&config);
    assert_eq!(records.len(), 5);
    let ids: Vec<&str> = records.iter().map(|r| r.id()).collect();
    assert_eq!(ids, ["recipe-0", "recipe-1", "recipe-2", "recipe-3", "recipe-4"]);

    let first = &records[0];
    assert_eq!(first.recipe.url.as_deref(), Some("https://example.org/0"));
    assert_eq!(first.enrichment.ingredient_availability_score.get(), 5);
    assert_eq!(first.enrichment.soaking_time_minutes, Some(120));
    assert!(!config.failure_log_path().exists());
}

#[tokio::test]
async fn permanent_failure_is_logged_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = write_input(dir.path(), &["Forbidden Fruit Salad", "Jeera Rice"]);
    let config = config_for(dir.path(), 10);
    let recipes = input::load_recipes(&input_path).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let report = build_runner(&config, calls.clone()).run(&recipes).await.unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert!(report.has_unresolved_failures());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let records = read_final(&config);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].recipe.title, "Jeera Rice");

    let log = std::fs::read_to_string(config.failure_log_path()).unwrap();
    let failures: Vec<FailureRecord> = log
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].id, "recipe-0");
    assert_eq!(failures[0].kind, "permanent");
    assert!(failures[0].error.contains("400"));
}

#[tokio::test]
async fn rerun_does_not_reprocess_checkpointed_batches() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = write_input(dir.path(), &["Poha", "Upma", "Idli"]);
    let config = config_for(dir.path(), 2);
    let recipes = input::load_recipes(&input_path).unwrap();

    let first_calls = Arc::new(AtomicUsize::new(0));
    build_runner(&config, first_calls.clone())
        .run(&recipes)
        .await
        .unwrap();
    assert_eq!(first_calls.load(Ordering::SeqCst), 3);

    // Simulate a crash after batch 0: the second batch's checkpoint is lost.
    std::fs::remove_file(CheckpointStore::open(config.output_dir(), true).unwrap().path(1))
        .unwrap();

    let second_calls = Arc::new(AtomicUsize::new(0));
    let report = build_runner(&config, second_calls.clone())
        .run(&recipes)
        .await
        .unwrap();

    assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.batches_skipped, 1);
    assert_eq!(report.batches_run, 1);
    assert_eq!(read_final(&config).len(), 3);
}

#[tokio::test]
async fn aggregate_reports_missing_batches() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = write_input(dir.path(), &["A", "B", "C"]);
    let config = config_for(dir.path(), 1);
    let recipes = input::load_recipes(&input_path).unwrap();

    let runner = build_runner(&config, Arc::new(AtomicUsize::new(0)));
    runner.run(&recipes).await.unwrap();
    std::fs::remove_file(runner.store().path(1)).unwrap();

    match combine(runner.store(), None, false) {
        Err(SaffronError::IncompleteRun { missing }) => assert_eq!(missing, vec![1]),
        other => panic!("expected an incomplete run, got {other:?}"),
    }
    let partial = combine(runner.store(), None, true).unwrap();
    assert_eq!(partial.records.len(), 2);
}

#[tokio::test]
async fn previous_output_can_be_enriched_again() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = write_input(dir.path(), &["Chole", "Rajma"]);
    let first = config_for(dir.path(), 2);
    build_runner(&first, Arc::new(AtomicUsize::new(0)))
        .run(&input::load_recipes(&input_path).unwrap())
        .await
        .unwrap();

    let mut second = config_for(dir.path(), 2);
    second.general.output_dir = dir.path().join("again");
    let recipes = input::load_recipes(&first.final_output_path()).unwrap();
    let report = build_runner(&second, Arc::new(AtomicUsize::new(0)))
        .run(&recipes)
        .await
        .unwrap();

    assert_eq!(report.succeeded, 2);
    let text = std::fs::read_to_string(second.final_output_path()).unwrap();
    assert_eq!(text.matches("\"enrichment\"").count(), 2);
    let records = read_final(&second);
    assert_eq!(records[1].id(), "recipe-1");
    assert_eq!(records[1].recipe.url.as_deref(), Some("https://example.org/1"));
}
