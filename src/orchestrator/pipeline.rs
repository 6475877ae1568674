//! The report pipeline: prepare, dispatch, check, replace, compose, score.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::backend::TextBackend;
use crate::config::{DispatchMode, ForgeConfig};
use crate::context::ContextPreparer;
use crate::error::PipelineError;
use crate::fallback::FallbackSynthesizer;
use crate::models::{
    Annotation, ReportContext, ReportMetadata, ReportOutput, ReportRequest, ReportStatus,
    WorkerMetric, WorkerResult, WorkerStatus,
};
use crate::quality::{QualityController, scoring};
use crate::workers::{SectionWorker, WorkerRunner, WorkerStats, default_workers, score_content};

use super::compose::{DocumentComposer, HtmlComposer};

/// Coordinates the workers for one report request at a time
pub struct ReportOrchestrator {
    config: ForgeConfig,
    preparer: ContextPreparer,
    pub(super) runners: Vec<Arc<WorkerRunner>>,
    pub(super) fallback: Arc<FallbackSynthesizer>,
    quality: QualityController,
    composer: Box<dyn DocumentComposer>,
}

impl ReportOrchestrator {
    /// Orchestrator running the five standard workers against `backend`
    pub fn new(config: ForgeConfig, backend: Arc<dyn TextBackend>) -> Self {
        Self::with_workers(config, default_workers(backend))
    }

    /// Orchestrator with an explicit worker set
    pub fn with_workers(config: ForgeConfig, workers: Vec<Arc<dyn SectionWorker>>) -> Self {
        let fallback = Arc::new(FallbackSynthesizer::new(&config.report));
        let runners = workers
            .into_iter()
            .map(|worker| {
                let timeout = config.workers.timeout_for(worker.id());
                Arc::new(WorkerRunner::new(
                    worker,
                    timeout,
                    config.orchestrator.quality_threshold,
                    fallback.clone(),
                ))
            })
            .collect();

        Self {
            quality: QualityController::new(
                config.quality.clone(),
                config.orchestrator.quality_threshold,
            ),
            composer: Box::new(HtmlComposer::new(&config.report)),
            preparer: ContextPreparer::new(),
            runners,
            fallback,
            config,
        }
    }

    /// Replace the document composer
    pub fn with_composer(mut self, composer: Box<dyn DocumentComposer>) -> Self {
        self.composer = composer;
        self
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn runners(&self) -> &[Arc<WorkerRunner>] {
        &self.runners
    }

    /// Execution statistics per worker id
    pub async fn worker_stats(&self) -> Vec<(String, WorkerStats)> {
        let mut stats = Vec::with_capacity(self.runners.len());
        for runner in &self.runners {
            stats.push((runner.id().to_string(), runner.stats().await));
        }
        stats
    }

    /// Generate a report. Never fails: pipeline failures produce the
    /// safety-net document with `status = fallback`.
    pub async fn generate_report(&self, request: &ReportRequest) -> ReportOutput {
        let start = Instant::now();
        match self.try_generate(request, start).await {
            Ok(output) => output,
            Err(err) => {
                error!("Report pipeline failed, using safety net: {}", err);
                self.safety_net(request, &err, start)
            }
        }
    }

    async fn try_generate(
        &self,
        request: &ReportRequest,
        start: Instant,
    ) -> Result<ReportOutput, PipelineError> {
        let ctx = self.prepare_context(request)?;
        info!(
            "Dispatching {} workers ({:?} mode, max {} concurrent)",
            self.runners.len(),
            self.config.orchestrator.mode,
            self.config.orchestrator.max_concurrent_workers
        );

        let (mut results, ctx) = match self.config.orchestrator.mode {
            DispatchMode::Parallel => self.dispatch_parallel(Arc::new(ctx)).await?,
            DispatchMode::Sequential => self.dispatch_sequential(Arc::new(ctx)).await?,
        };

        self.quality.review(&mut results, &ctx);
        let results = self.handle_failures(results, &ctx);

        let document = catch_unwind(AssertUnwindSafe(|| self.composer.compose(&ctx, &results)))
            .map_err(|_| PipelineError::Composition("composer panicked".to_string()))??;

        let quality_breakdown = scoring::breakdown(&document, &ctx);
        let quality_score = scoring::weighted_score(&quality_breakdown, &self.config.scoring);
        let workers: Vec<WorkerMetric> = results.iter().map(WorkerMetric::from).collect();
        let fallbacks = workers.iter().filter(|w| w.fallback_used).count();

        info!(
            "Report for '{}' composed: quality {:.2}, {} of {} sections from fallback",
            ctx.company_name(),
            quality_score,
            fallbacks,
            workers.len()
        );

        Ok(ReportOutput {
            document,
            metadata: ReportMetadata {
                status: ReportStatus::Success,
                quality_score,
                quality_breakdown,
                generated_at: ctx.generated_at,
                duration_ms: start.elapsed().as_millis() as u64,
                workers,
                estimated_score: None,
                failure_reason: None,
            },
        })
    }

    fn prepare_context(&self, request: &ReportRequest) -> Result<ReportContext, PipelineError> {
        let ctx = catch_unwind(AssertUnwindSafe(|| {
            self.preparer
                .prepare(&request.scan_data, &request.company, &request.requirements)
        }))
        .map_err(|_| PipelineError::Context("context preparation panicked".to_string()))?;
        ctx.check_consistency().map_err(PipelineError::Context)?;
        Ok(ctx)
    }

    /// Replace failed, timed-out and low-quality results with contextual
    /// fallback content. Everything else passes through unchanged.
    pub fn handle_failures(&self, results: Vec<WorkerResult>, ctx: &ReportContext) -> Vec<WorkerResult> {
        let threshold = self.config.orchestrator.quality_threshold;
        results
            .into_iter()
            .map(|result| {
                if result.status.needs_fallback() || result.quality_score < threshold {
                    self.replace_with_fallback(result, ctx)
                } else {
                    result
                }
            })
            .collect()
    }

    fn replace_with_fallback(&self, original: WorkerResult, ctx: &ReportContext) -> WorkerResult {
        let status = match original.status.transition(WorkerStatus::Fallback) {
            Ok(status) => status,
            Err(err) => {
                warn!("{}; forcing fallback for '{}'", err, original.worker);
                WorkerStatus::Fallback
            }
        };

        let reason = original
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| format!("quality score {:.2} below threshold", original.quality_score));
        let content = self.fallback.for_worker(&original.worker, ctx, &reason);
        let quality = score_content(&content, ctx.company_name())
            .min(self.config.orchestrator.fallback_quality_cap);

        warn!(
            "Using fallback for '{}' ({}): {}",
            original.worker,
            original.status.as_str(),
            reason
        );

        let mut result = WorkerResult::new(
            original.worker,
            original.section,
            content,
            status,
            quality,
            original.execution_time,
        );
        result.errors = original.errors;
        result.warnings = original.warnings;
        result.add_warning(Annotation::warning(
            "FALLBACK-USED",
            format!("fallback used: {}", reason),
        ));
        result
    }

    fn safety_net(&self, request: &ReportRequest, err: &PipelineError, start: Instant) -> ReportOutput {
        let reason = err.to_string();
        let doc = self
            .fallback
            .document_fallback(&request.scan_data, &request.company, &reason);
        warn!(
            "Safety-net report built from {} raw violations (estimated score {:.0})",
            doc.violations, doc.estimated_score
        );

        ReportOutput {
            document: doc.html,
            metadata: ReportMetadata {
                status: ReportStatus::Fallback,
                quality_score: 0.0,
                quality_breakdown: Default::default(),
                generated_at: Utc::now(),
                duration_ms: start.elapsed().as_millis() as u64,
                workers: Vec::new(),
                estimated_score: Some(doc.estimated_score),
                failure_reason: Some(reason),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TemplateBackend;
    use crate::models::SectionKind;
    use serde_json::json;
    use std::time::Duration;

    fn orchestrator() -> ReportOrchestrator {
        ReportOrchestrator::new(ForgeConfig::default(), Arc::new(TemplateBackend::new()))
    }

    #[test]
    fn test_timeouts_come_from_config() {
        let mut config = ForgeConfig::default();
        config.workers.timeouts.insert("recommendations".to_string(), 2.0);
        let orch = ReportOrchestrator::new(config, Arc::new(TemplateBackend::new()));
        let timeouts: Vec<(String, Duration)> = orch
            .runners()
            .iter()
            .map(|r| (r.id().to_string(), r.timeout()))
            .collect();
        assert!(timeouts.contains(&("recommendations".to_string(), Duration::from_secs(2))));
        assert!(timeouts.contains(&("executive_summary".to_string(), Duration::from_secs(30))));
    }

    #[test]
    fn test_infinite_timeout_config_builds() {
        let mut config = ForgeConfig::default();
        config.workers.default_timeout_secs = f64::INFINITY;
        let orch = ReportOrchestrator::new(config, Arc::new(TemplateBackend::new()));
        assert!(orch.runners().iter().all(|r| r.timeout() == Duration::from_secs(30)));
    }

    #[test]
    fn test_handle_failures_preserves_annotations() {
        let orch = orchestrator();
        let ctx = ContextPreparer::new().prepare(&json!([]), &json!("Acme"), &json!({}));

        let mut failed = WorkerResult::new(
            "technical_analysis",
            SectionKind::TechnicalAnalysis,
            "<p>partial</p>".to_string(),
            WorkerStatus::Failed,
            0.0,
            Duration::from_millis(5),
        );
        failed.add_error(Annotation::error("WORKER-FAILED", "backend down"));
        failed.add_warning(Annotation::warning("QC-006", "no table"));

        let good = WorkerResult::new(
            "executive_summary",
            SectionKind::ExecutiveSummary,
            "<h2>Executive Summary</h2><p>Acme</p>".to_string(),
            WorkerStatus::Completed,
            0.9,
            Duration::from_millis(5),
        );

        let results = orch.handle_failures(vec![failed, good], &ctx);
        assert_eq!(results[0].status, WorkerStatus::Fallback);
        assert_eq!(results[0].errors[0].rule, "WORKER-FAILED");
        assert_eq!(results[0].warnings[0].rule, "QC-006");
        assert_eq!(results[0].warnings[1].rule, "FALLBACK-USED");
        assert!(results[0].quality_score <= 0.6);
        assert!(results[0].content.contains("backend down"));

        assert_eq!(results[1].status, WorkerStatus::Completed);
        assert_eq!(results[1].content, "<h2>Executive Summary</h2><p>Acme</p>");
    }

    #[tokio::test]
    async fn test_generate_report_with_templates() {
        let output = orchestrator()
            .generate_report(&ReportRequest::new(
                json!({"violations": [
                    {"code": "image-alt", "impact": "critical", "selector": "img", "wcag": "1.1.1"}
                ]}),
                json!({"name": "Acme", "url": "https://acme.test"}),
                json!({}),
            ))
            .await;

        assert_eq!(output.metadata.status, ReportStatus::Success);
        assert_eq!(output.metadata.workers.len(), 5);
        assert_eq!(output.metadata.fallback_count(), 0);
        assert!(output.metadata.quality_score > 0.5);
        for section in SectionKind::CONTENT {
            assert!(output.document.contains(section.title()));
        }
    }
}
