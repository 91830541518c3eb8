//! Caller-side batch pipeline
//!
//! Extraction itself is synchronous. The batch extractor runs many parts at
//! once: each part is a task that waits for a semaphore permit, asks the
//! [`DocumentSupplier`] for candidate documents and then runs the shared
//! orchestrator on a blocking thread.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::orchestrator::{ExtractionOrchestrator, ExtractionReport};
use super::statistics::StatsSnapshot;
use crate::domain::SourceDocument;

/// Source of already-fetched candidate documents for a part.
#[async_trait]
pub trait DocumentSupplier: Send + Sync {
    async fn candidate_documents(&self, part_number: &str, brand: &str) -> Result<Vec<SourceDocument>>;
}

/// One product to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub part_number: String,
    pub brand: String,
}

impl BatchItem {
    pub fn new(part_number: impl Into<String>, brand: impl Into<String>) -> Self {
        Self {
            part_number: part_number.into(),
            brand: brand.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub item: BatchItem,
    pub report: ExtractionReport,
    /// Supplier or task failure; the report is empty when set
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    /// Outcomes in input order
    pub outcomes: Vec<BatchOutcome>,
    pub stats: StatsSnapshot,
}

impl BatchReport {
    pub fn resolved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !o.report.applications.is_empty())
            .count()
    }
}

pub struct BatchExtractor {
    orchestrator: Arc<ExtractionOrchestrator>,
    supplier: Arc<dyn DocumentSupplier>,
    concurrency: usize,
}

impl BatchExtractor {
    pub fn new(
        orchestrator: Arc<ExtractionOrchestrator>,
        supplier: Arc<dyn DocumentSupplier>,
        concurrency: usize,
    ) -> Self {
        Self {
            orchestrator,
            supplier,
            concurrency: concurrency.max(1),
        }
    }

    /// Resolve every item. Individual failures end up in their outcome and
    /// never abort the batch.
    pub async fn run(&self, items: Vec<BatchItem>) -> BatchReport {
        let run_id = Uuid::new_v4();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        info!(
            %run_id,
            "Starting batch of {} items (max concurrent: {})",
            items.len(),
            self.concurrency
        );

        let tasks: Vec<_> = items
            .iter()
            .cloned()
            .map(|item| {
                let semaphore = Arc::clone(&semaphore);
                let orchestrator = Arc::clone(&self.orchestrator);
                let supplier = Arc::clone(&self.supplier);
                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| anyhow!("Semaphore acquisition failed"))?;
                    Ok::<_, anyhow::Error>(process_item(orchestrator, supplier.as_ref(), item).await)
                })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;

        let outcomes: Vec<BatchOutcome> = results
            .into_iter()
            .zip(items)
            .map(|(result, item)| match result {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => failed_outcome(item, &e.to_string()),
                Err(join_error) => failed_outcome(item, &format!("Extraction task failed: {join_error}")),
            })
            .collect();

        let report = BatchReport {
            run_id,
            outcomes,
            stats: self.orchestrator.stats(),
        };
        info!(
            %run_id,
            "Batch finished: {}/{} items resolved",
            report.resolved(),
            report.outcomes.len()
        );
        report
    }
}

fn failed_outcome(item: BatchItem, error: &str) -> BatchOutcome {
    warn!(part_number = %item.part_number, "Batch item failed: {error}");
    BatchOutcome {
        report: ExtractionReport {
            part_number: item.part_number.clone(),
            brand: item.brand.clone(),
            ..ExtractionReport::default()
        },
        item,
        error: Some(error.to_string()),
        duration_ms: 0,
    }
}

async fn process_item(
    orchestrator: Arc<ExtractionOrchestrator>,
    supplier: &dyn DocumentSupplier,
    item: BatchItem,
) -> BatchOutcome {
    let start = Instant::now();

    let documents = match supplier.candidate_documents(&item.part_number, &item.brand).await {
        Ok(documents) => documents,
        Err(e) => return failed_outcome(item, &format!("Document supplier failed: {e:#}")),
    };
    debug!(part_number = %item.part_number, documents = documents.len(), "Documents supplied");

    let part_number = item.part_number.clone();
    let brand = item.brand.clone();
    let extraction = tokio::task::spawn_blocking(move || {
        orchestrator.extract_with_report(&part_number, &brand, &documents)
    })
    .await;

    match extraction {
        Ok(report) => BatchOutcome {
            item,
            report,
            error: None,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        },
        Err(join_error) => failed_outcome(item, &format!("Extraction task failed: {join_error}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestrator::ExtractionSettings;
    use crate::infrastructure::config::TuningConfig;
    use crate::infrastructure::vendor_registry::VendorRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSupplier {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl DocumentSupplier for CountingSupplier {
        async fn candidate_documents(&self, part_number: &str, _brand: &str) -> Result<Vec<SourceDocument>> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if part_number == "BROKEN" {
                return Err(anyhow!("catalog offline"));
            }
            Ok(vec![SourceDocument::new(
                format!("https://shop.example.com/{part_number}"),
                "<ul><li>2016-2018 Mazda MX-5 Club</li></ul>",
            )])
        }
    }

    #[tokio::test]
    async fn test_batch_respects_concurrency_and_isolates_failures() {
        let registry = Arc::new(VendorRegistry::with_builtin_catalog().unwrap());
        let orchestrator = Arc::new(ExtractionOrchestrator::new(
            registry,
            ExtractionSettings::default(),
            &TuningConfig::default(),
        ));
        let supplier = Arc::new(CountingSupplier {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let extractor = BatchExtractor::new(orchestrator, supplier.clone(), 2);

        let items: Vec<BatchItem> = ["A1", "BROKEN", "A3", "A4", "A5"]
            .into_iter()
            .map(|p| BatchItem::new(p, "Generic"))
            .collect();
        let report = extractor.run(items).await;

        assert_eq!(report.outcomes.len(), 5);
        assert_eq!(report.outcomes[1].item.part_number, "BROKEN");
        assert!(report.outcomes[1].error.as_deref().unwrap().contains("catalog offline"));
        assert_eq!(report.resolved(), 4);
        assert!(supplier.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(report.stats.extractions, 4);
    }
}
