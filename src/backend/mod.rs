//! Text-generation backend contract.
//!
//! Each worker calls its backend exactly once per request. The backend may be
//! a deterministic template renderer ([`TemplateBackend`]) or a remote
//! generative-text service; the orchestration core does not care which.

mod template;

pub use template::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BackendError;
use crate::models::SectionKind;

/// One generation call: a role/purpose string plus structured context values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// What the section is for, phrased for the generator
    pub role: String,
    /// Section being generated
    pub section: SectionKind,
    /// Structured values the content must be computed from
    pub values: Value,
}

impl GenerationRequest {
    pub fn new(role: impl Into<String>, section: SectionKind, values: Value) -> Self {
        Self {
            role: role.into(),
            section,
            values,
        }
    }
}

/// Generated section content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub content: String,
}

/// Trait for content-generation backends
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Produce content for one section
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, BackendError>;

    /// Backend name for logging
    fn name(&self) -> &str {
        "backend"
    }
}
