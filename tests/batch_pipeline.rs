//! Batch pipeline over an in-memory document supplier
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use fitment_engine_lib::application::{
    BatchExtractor, BatchItem, DocumentSupplier, ExtractionOrchestrator, ExtractionSettings,
};
use fitment_engine_lib::domain::SourceDocument;
use fitment_engine_lib::infrastructure::config::TuningConfig;
use fitment_engine_lib::infrastructure::{ExtractionCache, VendorRegistry};

struct FixtureSupplier {
    pages: HashMap<&'static str, Vec<SourceDocument>>,
}

#[async_trait]
impl DocumentSupplier for FixtureSupplier {
    async fn candidate_documents(&self, part_number: &str, _brand: &str) -> Result<Vec<SourceDocument>> {
        self.pages
            .get(part_number)
            .cloned()
            .ok_or_else(|| anyhow!("no fixture for {part_number}"))
    }
}

fn fixtures() -> FixtureSupplier {
    let mut pages = HashMap::new();
    pages.insert(
        "24-186728",
        vec![SourceDocument::new(
            "https://www.bilstein.com/en/p/24-186728",
            r#"<div class="fitment-info">Years: 2005 – 2023, Make: TOYOTA, Model: Tacoma</div>"#,
        )],
    );
    pages.insert(
        "HB453F",
        vec![SourceDocument::new(
            "https://hawkperformance.com/hb-453f",
            r#"<div class="vehicle-applications">2019 Honda Civic Si 2.0L Turbo 2020 Acura ILX 2.4L</div>"#,
        )],
    );
    pages.insert(
        "EMPTY-1",
        vec![SourceDocument::new("https://shop.example.com/empty", "<p>Out of stock</p>")],
    );
    FixtureSupplier { pages }
}

fn orchestrator() -> Arc<ExtractionOrchestrator> {
    let registry = Arc::new(VendorRegistry::with_builtin_catalog().unwrap());
    Arc::new(
        ExtractionOrchestrator::new(registry, ExtractionSettings::default(), &TuningConfig::default())
            .with_cache(Arc::new(ExtractionCache::in_memory(7))),
    )
}

#[tokio::test]
async fn batch_resolves_known_parts_in_input_order() {
    let extractor = BatchExtractor::new(orchestrator(), Arc::new(fixtures()), 3);
    let items = vec![
        BatchItem::new("HB453F", "Hawk Performance"),
        BatchItem::new("MISSING", "Moog"),
        BatchItem::new("24-186728", "Bilstein"),
        BatchItem::new("EMPTY-1", "Zzyzx"),
    ];

    let report = extractor.run(items).await;

    let parts: Vec<&str> = report.outcomes.iter().map(|o| o.item.part_number.as_str()).collect();
    assert_eq!(parts, vec!["HB453F", "MISSING", "24-186728", "EMPTY-1"]);

    assert!(!report.outcomes[0].report.applications.is_empty());
    assert_eq!(report.outcomes[0].report.vendor.as_deref(), Some("HAWK_PERFORMANCE"));

    let missing = &report.outcomes[1];
    assert!(missing.report.applications.is_empty());
    assert!(missing.error.as_deref().is_some_and(|e| e.contains("no fixture")));

    assert_eq!(report.outcomes[2].report.applications[0].model(), "Tacoma");
    assert!(report.outcomes[3].error.is_none());
    assert!(report.outcomes[3].report.applications.is_empty());

    assert_eq!(report.resolved(), 2);
    assert_eq!(report.stats.extractions, 3);
}

#[tokio::test]
async fn repeated_batch_is_served_from_cache() {
    let orchestrator = orchestrator();
    let extractor = BatchExtractor::new(Arc::clone(&orchestrator), Arc::new(fixtures()), 2);
    let items = vec![BatchItem::new("24-186728", "Bilstein"), BatchItem::new("HB453F", "Hawk")];

    let first = extractor.run(items.clone()).await;
    let second = extractor.run(items).await;

    assert!(first.outcomes.iter().all(|o| !o.report.cache_hit));
    assert!(second.outcomes.iter().all(|o| o.report.cache_hit));
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.stats.cache_hits, 2);
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let extractor = BatchExtractor::new(orchestrator(), Arc::new(fixtures()), 0);
    let report = extractor.run(Vec::new()).await;
    assert!(report.outcomes.is_empty());
    assert_eq!(report.stats.extractions, 0);
}
