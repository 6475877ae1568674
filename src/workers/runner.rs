//! Shared execution wrapper for section workers.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::WorkerError;
use crate::fallback::FallbackSynthesizer;
use crate::models::{
    Annotation, ContentMetadata, ReportContext, SectionKind, WorkerPriority, WorkerResult,
    WorkerStatus, clamp_unit, mentions,
};

use super::SectionWorker;

/// Content shorter than this is considered thin
const SHORT_CONTENT_CHARS: usize = 100;

/// Heuristic section quality in [0, 1].
///
/// Structure is scored first and clamped; the missing-company penalty is
/// applied afterwards so the structure bonus can never absorb it.
pub fn score_content(content: &str, company_name: &str) -> f64 {
    let meta = ContentMetadata::extract(content);
    let mut score: f64 = 1.0;
    if meta.characters < SHORT_CONTENT_CHARS {
        score -= 0.3;
    }
    if meta.headings == 0 {
        score -= 0.2;
    }
    if meta.tables > 0 {
        score += 0.1;
    }
    if meta.lists > 0 {
        score += 0.1;
    }

    let mut score = clamp_unit(score);
    if !mentions(content, company_name) {
        score -= 0.2;
    }
    clamp_unit(score)
}

fn rule_for(error: &WorkerError) -> &'static str {
    match error {
        WorkerError::InputValidation { .. } => "WORKER-INPUT",
        WorkerError::Timeout { .. } => "WORKER-TIMEOUT",
        WorkerError::Panicked(_) => "WORKER-PANIC",
        WorkerError::Generation(_) | WorkerError::Backend(_) => "WORKER-FAILED",
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn advance(from: WorkerStatus, to: WorkerStatus) -> WorkerStatus {
    debug_assert!(from.can_transition_to(to), "{:?} -> {:?}", from, to);
    to
}

#[derive(Debug, Clone, Copy)]
struct ExecutionRecord {
    status: WorkerStatus,
    quality: f64,
    time: Duration,
}

/// Aggregate statistics over a runner's history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerStats {
    pub executions: usize,
    pub completions: usize,
    pub failures: usize,
    pub timeouts: usize,
    pub mean_quality: f64,
    pub mean_time: Duration,
}

/// Runs one worker with a deadline and converts every failure into a result
pub struct WorkerRunner {
    worker: Arc<dyn SectionWorker>,
    timeout: Duration,
    quality_threshold: f64,
    fallback: Arc<FallbackSynthesizer>,
    history: Mutex<Vec<ExecutionRecord>>,
}

impl WorkerRunner {
    pub fn new(
        worker: Arc<dyn SectionWorker>,
        timeout: Duration,
        quality_threshold: f64,
        fallback: Arc<FallbackSynthesizer>,
    ) -> Self {
        Self {
            worker,
            timeout,
            quality_threshold,
            fallback,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        self.worker.id()
    }

    pub fn section(&self) -> SectionKind {
        self.worker.section()
    }

    pub fn priority(&self) -> WorkerPriority {
        self.worker.priority()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute the worker once. Never fails: errors and timeouts come back as
    /// `Failed` / `TimedOut` results carrying minimal fallback content.
    pub async fn execute(&self, ctx: &ReportContext) -> WorkerResult {
        let id = self.worker.id().to_string();
        let section = self.worker.section();
        let start = Instant::now();
        let status = advance(WorkerStatus::Idle, WorkerStatus::Processing);
        debug!("Worker '{}' processing", id);

        let outcome = self.generate(ctx).await;
        let elapsed = start.elapsed();

        let result = match outcome {
            Ok(content) => {
                let quality = score_content(&content, ctx.company_name());
                let status = advance(status, WorkerStatus::Completed);
                let mut result =
                    WorkerResult::new(id.as_str(), section, content, status, quality, elapsed);
                if quality < self.quality_threshold {
                    warn!(
                        "Worker '{}' quality {:.2} below threshold {:.2}",
                        id, quality, self.quality_threshold
                    );
                    result.add_warning(Annotation::warning(
                        "WORKER-QUALITY",
                        format!(
                            "quality {:.2} is below the threshold of {:.2}",
                            quality, self.quality_threshold
                        ),
                    ));
                }
                info!(
                    "Worker '{}' completed in {}ms (quality {:.2})",
                    id,
                    elapsed.as_millis(),
                    quality
                );
                result
            }
            Err(err) => {
                let terminal = match err {
                    WorkerError::Timeout { .. } => WorkerStatus::TimedOut,
                    _ => WorkerStatus::Failed,
                };
                let status = advance(status, terminal);
                warn!("Worker '{}' {}: {}", id, status.as_str(), err);
                let reason = err.to_string();
                let content = self.fallback.minimal_section(section, ctx, &reason);
                let mut result =
                    WorkerResult::new(id.as_str(), section, content, status, 0.0, elapsed);
                result.add_error(Annotation::error(rule_for(&err), reason));
                result
            }
        };

        self.history.lock().await.push(ExecutionRecord {
            status: result.status,
            quality: result.quality_score,
            time: elapsed,
        });
        result
    }

    async fn generate(&self, ctx: &ReportContext) -> Result<String, WorkerError> {
        if !self.worker.validate_input(ctx) {
            return Err(WorkerError::InputValidation {
                worker: self.worker.id().to_string(),
            });
        }

        // Expired generations are dropped, not cancelled
        let generation = AssertUnwindSafe(self.worker.generate_section(ctx)).catch_unwind();
        let content = match tokio::time::timeout(self.timeout, generation).await {
            Ok(Ok(result)) => result?,
            Ok(Err(payload)) => {
                return Err(WorkerError::Panicked(panic_message(payload.as_ref())));
            }
            Err(_) => {
                return Err(WorkerError::Timeout {
                    worker: self.worker.id().to_string(),
                    timeout: self.timeout,
                });
            }
        };

        if content.trim().is_empty() {
            return Err(WorkerError::Generation("worker produced no content".to_string()));
        }
        Ok(content)
    }

    pub async fn stats(&self) -> WorkerStats {
        let history = self.history.lock().await;
        let executions = history.len();
        if executions == 0 {
            return WorkerStats::default();
        }

        let count = |status: WorkerStatus| history.iter().filter(|r| r.status == status).count();
        let total_time: Duration = history.iter().map(|r| r.time).sum();

        WorkerStats {
            executions,
            completions: count(WorkerStatus::Completed),
            failures: count(WorkerStatus::Failed),
            timeouts: count(WorkerStatus::TimedOut),
            mean_quality: history.iter().map(|r| r.quality).sum::<f64>() / executions as f64,
            mean_time: total_time / executions as u32,
        }
    }
}
