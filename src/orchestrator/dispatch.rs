//! Worker dispatch: bounded parallel fan-out or sequential with findings.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::error::PipelineError;
use crate::models::{Annotation, ReportContext, WorkerResult, WorkerStatus};
use crate::workers::WorkerRunner;

use super::ReportOrchestrator;

impl ReportOrchestrator {
    /// Runners in dispatch order: priority first, registration order within a
    /// priority.
    fn ordered_runners(&self) -> Vec<Arc<WorkerRunner>> {
        let mut runners = self.runners.clone();
        runners.sort_by_key(|r| r.priority());
        runners
    }

    /// Run every worker concurrently, at most `max_concurrent_workers` at a
    /// time. The runner contains panics from generation; one that escapes it
    /// still becomes a `Failed` result here.
    pub(super) async fn dispatch_parallel(
        &self,
        ctx: Arc<ReportContext>,
    ) -> Result<(Vec<WorkerResult>, Arc<ReportContext>), PipelineError> {
        let limit = self.config().orchestrator.max_concurrent_workers.max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        let runners = self.ordered_runners();
        let mut handles = Vec::with_capacity(runners.len());

        for runner in &runners {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Dispatch(format!("semaphore closed: {}", e)))?;
            let runner = runner.clone();
            let ctx = ctx.clone();

            handles.push(tokio::spawn(async move {
                let result = runner.execute(&ctx).await;
                drop(permit);
                result
            }));
        }

        let results: Vec<WorkerResult> = futures::future::join_all(handles)
            .await
            .into_iter()
            .zip(&runners)
            .map(|(joined, runner)| match joined {
                Ok(result) => result,
                Err(e) => self.panicked(runner, &ctx, &e.to_string()),
            })
            .collect();
        Ok((results, ctx))
    }

    /// Run workers one at a time, recording each result's findings in the
    /// shared context before the next worker starts.
    pub(super) async fn dispatch_sequential(
        &self,
        mut ctx: Arc<ReportContext>,
    ) -> Result<(Vec<WorkerResult>, Arc<ReportContext>), PipelineError> {
        let threshold = self.config().orchestrator.quality_threshold;
        let runners = self.ordered_runners();
        let mut results = Vec::with_capacity(runners.len());

        for runner in &runners {
            let task_runner = runner.clone();
            let task_ctx = ctx.clone();
            let handle = tokio::spawn(async move { task_runner.execute(&task_ctx).await });

            let result = match handle.await {
                Ok(result) => result,
                Err(e) => self.panicked(runner, &ctx, &e.to_string()),
            };

            let findings = findings_for(&result, threshold);
            if !Arc::make_mut(&mut ctx).record_findings(&result.worker, findings) {
                debug!("Findings for '{}' already recorded, keeping the first", result.worker);
            }
            results.push(result);
        }
        Ok((results, ctx))
    }

    fn panicked(&self, runner: &WorkerRunner, ctx: &ReportContext, cause: &str) -> WorkerResult {
        error!("Worker '{}' panicked: {}", runner.id(), cause);
        let reason = format!("worker panicked: {}", cause);
        let content = self.fallback.minimal_section(runner.section(), ctx, &reason);
        let mut result = WorkerResult::new(
            runner.id(),
            runner.section(),
            content,
            WorkerStatus::Failed,
            0.0,
            Duration::ZERO,
        );
        result.add_error(Annotation::error("WORKER-PANIC", reason));
        result
    }
}

/// Summary of a result visible to later workers
fn findings_for(result: &WorkerResult, threshold: f64) -> serde_json::Value {
    json!({
        "section": result.section.id(),
        "status": result.status.as_str(),
        "quality": result.quality_score,
        "fallback": result.status.needs_fallback() || result.quality_score < threshold,
        "words": result.metadata.words,
        "headings": result.metadata.headings,
        "tables": result.metadata.tables,
        "lists": result.metadata.lists,
        "errors": result.errors.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TemplateBackend;
    use crate::config::{DispatchMode, ForgeConfig};
    use crate::context::ContextPreparer;
    use crate::models::WorkerPriority;

    fn ctx() -> Arc<ReportContext> {
        Arc::new(ContextPreparer::new().prepare(
            &serde_json::json!([{"code": "x", "impact": "serious", "selector": "a"}]),
            &serde_json::json!({"name": "Acme", "url": "https://acme.test"}),
            &serde_json::json!({}),
        ))
    }

    #[test]
    fn test_dispatch_order_by_priority() {
        let orch = ReportOrchestrator::new(ForgeConfig::default(), Arc::new(TemplateBackend::new()));
        let priorities: Vec<WorkerPriority> =
            orch.ordered_runners().iter().map(|r| r.priority()).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
        assert_eq!(orch.ordered_runners()[0].id(), "executive_summary");
        assert_eq!(orch.ordered_runners()[4].id(), "recommendations");
    }

    #[tokio::test]
    async fn test_sequential_records_findings() {
        let mut config = ForgeConfig::default();
        config.orchestrator.mode = DispatchMode::Sequential;
        let orch = ReportOrchestrator::new(config, Arc::new(TemplateBackend::new()));

        let (results, ctx) = orch.dispatch_sequential(ctx()).await.unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(ctx.findings().len(), 5);
        let exec = &ctx.findings()["executive_summary"];
        assert_eq!(exec["status"], "completed");
        assert_eq!(exec["fallback"], false);
    }

    #[tokio::test]
    async fn test_parallel_returns_results_in_dispatch_order() {
        let mut config = ForgeConfig::default();
        config.orchestrator.max_concurrent_workers = 2;
        let orch = ReportOrchestrator::new(config, Arc::new(TemplateBackend::new()));

        let (results, ctx) = orch.dispatch_parallel(ctx()).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.worker.as_str()).collect();
        let expected: Vec<String> = orch.ordered_runners().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, expected);
        assert!(ctx.findings().is_empty());
        assert!(results.iter().all(|r| r.status == WorkerStatus::Completed));
    }
}
