//! Report orchestration.
//!
//! The orchestrator prepares a shared context, dispatches the section workers
//! (bounded parallel or sequential), runs quality control, replaces failed
//! sections with fallback content and composes the final document. If any
//! stage fails outright, a standalone safety-net document is returned instead.

mod compose;
mod dispatch;
mod pipeline;

pub use compose::{DocumentComposer, HtmlComposer};
pub use pipeline::ReportOrchestrator;
