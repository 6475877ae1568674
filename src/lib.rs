pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod fallback;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod quality;
pub mod slug;
pub mod workers;

// Re-export main types
pub use backend::{GenerationRequest, GenerationResponse, TemplateBackend, TextBackend};
pub use config::{DispatchMode, ForgeConfig, OutputConfig};
pub use context::ContextPreparer;
pub use error::{BackendError, PipelineError, WorkerError};
pub use fallback::FallbackSynthesizer;
pub use models::{ReportContext, ReportMetadata, ReportOutput, ReportRequest, ReportStatus};
pub use orchestrator::{DocumentComposer, HtmlComposer, ReportOrchestrator};
pub use output::{FileReportWriter, ReportWriter};
pub use quality::QualityController;
pub use workers::{SectionWorker, WorkerRunner};

// Re-export slug utilities
pub use slug::{report_slug, slugify, slugify_truncate};
