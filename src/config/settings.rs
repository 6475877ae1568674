use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ForgeConfig {
    pub orchestrator: OrchestratorConfig,
    pub workers: WorkerSettings,
    pub quality: QualityConfig,
    pub scoring: ScoringWeights,
    pub report: ReportSettings,
    pub output: OutputConfig,
}

/// How workers are scheduled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Bounded-concurrency dispatch
    #[default]
    Parallel,
    /// One worker at a time; findings flow into later workers
    Sequential,
}

impl std::str::FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "parallel" => Ok(DispatchMode::Parallel),
            "sequential" => Ok(DispatchMode::Sequential),
            other => Err(format!("unknown dispatch mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub mode: DispatchMode,
    /// Maximum workers in flight at once (parallel mode)
    pub max_concurrent_workers: usize,
    /// Results below this quality are replaced by fallback content
    pub quality_threshold: f64,
    /// Upper bound on the quality assigned to fallback sections
    pub fallback_quality_cap: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Parallel,
            max_concurrent_workers: 5,
            quality_threshold: 0.5,
            fallback_quality_cap: 0.6,
        }
    }
}

const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Deadline applied to every worker without an override
    pub default_timeout_secs: f64,
    /// Per-worker deadline overrides keyed by worker id
    pub timeouts: HashMap<String, f64>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            timeouts: HashMap::new(),
        }
    }
}

impl WorkerSettings {
    /// Deadline for the given worker. Values too large for a `Duration`
    /// (including infinity) fall back to the default timeout.
    pub fn timeout_for(&self, worker: &str) -> Duration {
        let secs = self
            .timeouts
            .get(worker)
            .copied()
            .unwrap_or(self.default_timeout_secs);
        Duration::try_from_secs_f64(secs.max(0.001))
            .or_else(|_| Duration::try_from_secs_f64(self.default_timeout_secs.max(0.001)))
            .unwrap_or(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
    }
}

/// Thresholds used by the quality controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Allowed spread between count mentions, as a fraction of the largest
    pub count_tolerance: f64,
    /// Allowed distance between a mentioned score and the authoritative score
    pub score_tolerance: f64,
    pub min_content_length: usize,
    pub max_content_length: usize,
    /// Quality lost per accumulated error
    pub error_penalty: f64,
    /// Floor of the multiplicative error penalty
    pub min_retained_quality: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            count_tolerance: 0.10,
            score_tolerance: 5.0,
            min_content_length: 100,
            max_content_length: 50_000,
            error_penalty: 0.1,
            min_retained_quality: 0.5,
        }
    }
}

/// Weights of the document-level quality heuristics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub completeness: f64,
    pub accuracy: f64,
    pub readability: f64,
    pub standards_compliance: f64,
    pub professionalism: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            completeness: 0.25,
            accuracy: 0.25,
            readability: 0.20,
            standards_compliance: 0.15,
            professionalism: 0.15,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.completeness
            + self.accuracy
            + self.readability
            + self.standards_compliance
            + self.professionalism
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Title rendered in the document header
    pub title: String,
    /// Contact address used when the company supplies none
    pub contact_email: String,
    /// Directory with template overrides (`<section>.html`)
    pub template_dir: Option<PathBuf>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: "Web Accessibility Compliance Report".to_string(),
            contact_email: "accessibility@reportforge.dev".to_string(),
            template_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives `<slug>/report.html` and `<slug>/metadata.json`
    pub reports_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("./reports"),
        }
    }
}

impl ForgeConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ForgeConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, falling back to the user config file, then defaults
    pub fn load_or_default(path: Option<&PathBuf>) -> anyhow::Result<Self> {
        match path {
            Some(p) if p.exists() => Self::from_file(p),
            Some(_) => Ok(Self::default()),
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    /// `<config_dir>/report-forge/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("report-forge").join("config.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ForgeConfig::default();
        assert_eq!(config.orchestrator.max_concurrent_workers, 5);
        assert_eq!(config.orchestrator.quality_threshold, 0.5);
        assert_eq!(config.quality.score_tolerance, 5.0);
        assert!((config.scoring.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
orchestrator:
  mode: sequential
workers:
  timeouts:
    technical_analysis: 2.5
"#;
        let config: ForgeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.orchestrator.mode, DispatchMode::Sequential);
        assert_eq!(config.orchestrator.max_concurrent_workers, 5);
        assert_eq!(
            config.workers.timeout_for("technical_analysis"),
            Duration::from_secs_f64(2.5)
        );
        assert_eq!(
            config.workers.timeout_for("executive_summary"),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_unrepresentable_timeouts_fall_back() {
        let yaml = r#"
workers:
  default_timeout_secs: .inf
  timeouts:
    technical_analysis: 1.0e300
    remediation_plan: 4
"#;
        let config: ForgeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.workers.timeout_for("executive_summary"),
            Duration::from_secs(30)
        );
        assert_eq!(
            config.workers.timeout_for("technical_analysis"),
            Duration::from_secs(30)
        );
        assert_eq!(
            config.workers.timeout_for("remediation_plan"),
            Duration::from_secs(4)
        );

        let huge = WorkerSettings {
            default_timeout_secs: 20.0,
            timeouts: HashMap::from([("recommendations".to_string(), f64::INFINITY)]),
        };
        assert_eq!(huge.timeout_for("recommendations"), Duration::from_secs(20));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let path = PathBuf::from("/nonexistent/report-forge.yaml");
        let config = ForgeConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.quality.min_content_length, 100);
    }

    #[test]
    fn test_dispatch_mode_from_str() {
        assert_eq!("Sequential".parse::<DispatchMode>(), Ok(DispatchMode::Sequential));
        assert!("round-robin".parse::<DispatchMode>().is_err());
    }
}
