//! Layered configuration loading and vendors added by configuration
use fitment_engine_lib::application::ExtractionOrchestrator;
use fitment_engine_lib::domain::{SourceDocument, StrategyId};
use fitment_engine_lib::infrastructure::config::{ConfigManager, EngineConfig};
use tempfile::TempDir;

fn write_config(dir: &TempDir, extra: &str) -> std::path::PathBuf {
    let cache_path = dir.path().join("cache.json");
    let path = dir.path().join("fitment.toml");
    let content = format!(
        r#"
[extraction]
max_documents = 2

[cache]
enabled = true
path = "{}"

[logging]
file_output = false

{extra}
"#,
        cache_path.display().to_string().replace('\\', "/")
    );
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn file_values_override_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");

    let config = ConfigManager::with_path(&path).load_config().await.unwrap();

    assert_eq!(config.extraction.max_documents, 2);
    let defaults = EngineConfig::default();
    assert!((config.extraction.definitive_confidence - defaults.extraction.definitive_confidence).abs() < f64::EPSILON);
    assert_eq!(config.validation.min_year, defaults.validation.min_year);
    assert!(!config.logging.file_output);
}

#[tokio::test]
async fn extra_vendor_from_file_is_recognized() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[[extra_vendors]]
key = "MOOG"
brand_names = ["Moog", "MOOG Parts"]
domains = ["moogparts.com"]
authority_score = 80
selectors = [".fitment-table"]

[extra_vendors.parsing_rules]
primary = "table_parser"
fallbacks = ["list_parser", "text_extraction"]
"#,
    );

    let config = ConfigManager::with_path(&path).load_config().await.unwrap();
    let orchestrator = ExtractionOrchestrator::from_config(&config).unwrap();

    assert_eq!(orchestrator.registry().identify_vendor_by_brand("moog"), Some("MOOG"));
    assert_eq!(
        orchestrator.registry().get_strategy_chain(Some("MOOG")),
        vec![StrategyId::TableParser, StrategyId::ListParser, StrategyId::TextExtraction]
    );

    let doc = SourceDocument::new(
        "https://moogparts.com/k80673",
        "<table class=\"fitment-table\"><tr><th>Year</th><th>Make</th><th>Model</th></tr>\
         <tr><td>2012</td><td>Ford</td><td>Focus</td></tr></table>",
    );
    let report = orchestrator.extract_with_report("K80673", "Moog", &[doc]);
    assert_eq!(report.vendor.as_deref(), Some("MOOG"));
    assert_eq!(report.best_strategy, Some(StrategyId::TableParser));
}

#[tokio::test]
async fn invalid_thresholds_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(
        &path,
        "[extraction]\ndefinitive_confidence = 0.5\nsufficient_confidence = 0.8\n",
    )
    .unwrap();

    let result = ConfigManager::with_path(&path).load_config().await;
    assert!(result.is_err());
}
