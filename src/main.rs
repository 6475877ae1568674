use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use report_forge::context::parse_company;
use report_forge::{
    DispatchMode, FileReportWriter, ForgeConfig, ReportOrchestrator, ReportOutput, ReportRequest,
    ReportWriter, TemplateBackend, report_slug,
};

/// Report-Forge CLI: accessibility reports from scan results
#[derive(Parser, Debug)]
#[command(name = "report-forge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a report from a scan result file
    #[command(name = "run")]
    Run {
        #[command(flatten)]
        args: RunArgs,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Scan result JSON (aggregated, flat or legacy shape)
    #[arg(short, long)]
    scan: PathBuf,

    /// Company metadata JSON
    #[arg(long)]
    company: Option<PathBuf>,

    /// Company name (overrides the company file)
    #[arg(long)]
    company_name: Option<String>,

    /// Site URL (overrides the company file)
    #[arg(long)]
    url: Option<String>,

    /// Target audience: executive, technical or mixed
    #[arg(short, long)]
    audience: Option<String>,

    /// Output language code
    #[arg(short, long)]
    language: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dispatch mode: parallel or sequential
    #[arg(long)]
    mode: Option<DispatchMode>,

    /// Maximum workers running at once (parallel mode)
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Output directory for report files
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory with template overrides
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Run { args }) => handle_run_command(args).await,
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!("Example: report-forge run --scan scan.json --company-name \"Acme\"");
            std::process::exit(1);
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path).context(format!("Failed to read: {:?}", path))?;
    serde_json::from_str(&raw).context(format!("Failed to parse JSON from {:?}", path))
}

/// Company file merged with the command-line overrides
fn resolve_company(args: &RunArgs) -> Result<Value> {
    let mut company = match &args.company {
        Some(path) => match read_json(path)? {
            Value::Object(map) => map,
            Value::String(name) => Map::from_iter([("name".to_string(), Value::String(name))]),
            other => anyhow::bail!("Company file must hold an object, found {}", other),
        },
        None => Map::new(),
    };
    if let Some(name) = &args.company_name {
        company.insert("name".to_string(), json!(name));
    }
    if let Some(url) = &args.url {
        company.insert("url".to_string(), json!(url));
    }
    Ok(Value::Object(company))
}

fn resolve_requirements(args: &RunArgs) -> Value {
    let mut requirements = Map::new();
    if let Some(audience) = &args.audience {
        requirements.insert("audience".to_string(), json!(audience));
    }
    if let Some(language) = &args.language {
        requirements.insert("language".to_string(), json!(language));
    }
    Value::Object(requirements)
}

async fn handle_run_command(args: RunArgs) -> Result<()> {
    // Set up logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("Report-Forge CLI starting");

    // Load configuration
    let mut config = ForgeConfig::load_or_default(args.config.as_ref())?;

    // Apply CLI overrides
    if let Some(mode) = args.mode {
        config.orchestrator.mode = mode;
    }
    if let Some(max) = args.max_concurrent {
        config.orchestrator.max_concurrent_workers = max;
    }
    if let Some(output) = &args.output {
        config.output.reports_dir = output.clone();
    }
    if let Some(templates) = &args.templates {
        config.report.template_dir = Some(templates.clone());
    }

    let scan_data = read_json(&args.scan)?;
    let company = resolve_company(&args)?;
    let requirements = resolve_requirements(&args);
    let company_name = parse_company(&company).name().to_string();

    info!("Scan: {:?}", args.scan);
    info!("Company: {}", company_name);

    let backend = Arc::new(TemplateBackend::with_template_dir(
        config.report.template_dir.clone(),
    ));
    let writer = FileReportWriter::new(config.output.clone());
    let orchestrator = ReportOrchestrator::new(config, backend);

    let output = orchestrator
        .generate_report(&ReportRequest::new(scan_data, company, requirements))
        .await;

    let date = output.metadata.generated_at.format("%Y-%m-%d").to_string();
    let dir = writer
        .write_report(&output, &report_slug(&company_name, &date))
        .await?;

    print_result(&output, &dir)
}

fn print_result(output: &ReportOutput, dir: &Path) -> Result<()> {
    let meta = &output.metadata;
    println!("\n========================================");
    println!("Report Complete!");
    println!("========================================");
    println!("Status: {}", if output.is_fallback() { "FALLBACK" } else { "SUCCESS" });
    println!("Quality score: {:.2}", meta.quality_score);
    println!("Duration: {}ms", meta.duration_ms);
    for worker in &meta.workers {
        println!(
            "  {:<24} {:<10} quality {:.2}  {}ms{}",
            worker.name,
            worker.status.as_str(),
            worker.quality,
            worker.time_ms,
            if worker.fallback_used { "  (fallback)" } else { "" }
        );
    }
    println!("\nWritten to: {}", dir.display());

    if let Some(reason) = &meta.failure_reason {
        println!("\n⚠️  Pipeline failed, safety-net report written: {}", reason);
        if let Some(score) = meta.estimated_score {
            println!("Estimated compliance score: {:.0}", score);
        }
        std::process::exit(1);
    }

    Ok(())
}
