mod analyzer;
mod chunker;
mod completion;
mod error;
mod fusion;
mod loader;
mod pipeline;
mod settings;
mod sink;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use completion::http::HttpCompletionClient;
use error::PipelineError;
use loader::DocumentFormat;
use pipeline::{plan_document, Pipeline};
use settings::Settings;

/// Rough per-chunk wall time, used only for the dry-run estimate.
const EST_SECS_PER_CHUNK: u64 = 30;
const RULE_WIDTH: usize = 80;

#[derive(Parser)]
#[command(
    name = "bill_impact",
    about = "Chunked financial-impact analysis of regulatory documents"
)]
struct Cli {
    /// Document to analyze (.xml, .html, .txt)
    file: PathBuf,

    /// Treat the file as this format instead of inferring it from the extension
    #[arg(long, value_parser = parse_format)]
    format: Option<DocumentFormat>,

    /// Sentences per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Max chunk requests in flight (1 = sequential)
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Directory the consolidated report is written to
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Hard wall-clock limit for the whole run, in seconds (0 = none)
    #[arg(long)]
    run_timeout: Option<u64>,

    /// Config file (default: ./bill_impact.{toml,yaml,json} if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Load and chunk the document, report the plan, call nothing
    #[arg(long)]
    dry_run: bool,
}

fn parse_format(s: &str) -> Result<DocumentFormat, String> {
    s.parse().map_err(|e: error::InputError| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    // logs go to stderr; stdout carries progress and the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = tokio::select! {
        res = run(cli) => res,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Analysis aborted.");
            return ExitCode::from(130);
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(n) = cli.chunk_size {
        settings.chunk_size = n;
    }
    if let Some(n) = cli.concurrency {
        settings.concurrency = n;
    }
    if let Some(dir) = cli.out_dir {
        settings.out_dir = dir;
    }
    if let Some(secs) = cli.run_timeout {
        settings.run_timeout_secs = secs;
    }
    settings.validate().context("Invalid configuration")?;

    println!("Starting complete document analysis");
    println!("File: {}", cli.file.display());

    if cli.dry_run {
        return dry_run(&cli.file, cli.format, &settings, &mut std::io::stdout().lock());
    }

    let client = HttpCompletionClient::from_settings(&settings).context("Failed to create completion client")?;
    let pipeline = Pipeline::new(Arc::new(client), settings);
    let summary = pipeline.run(&cli.file, cli.format).await?;

    println!("{}", "=".repeat(RULE_WIDTH));
    println!("CONSOLIDATED FINANCIAL IMPACT ANALYSIS");
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("{}", summary.report.raw_text);
    println!("{}", "=".repeat(RULE_WIDTH));

    println!(
        "Analyzed {} sentences in {} chunks ({} failed) with {} + {}",
        summary.units,
        summary.chunks,
        summary.failed_chunks,
        pipeline.settings().extraction_model,
        pipeline.settings().fusion_model,
    );
    if summary.report.is_degraded() {
        println!("Consolidation failed; the saved report holds the failure message.");
    }
    println!("Consolidated analysis saved to: {}", summary.artifact.display());
    println!("Done in {}", format_duration(summary.elapsed));
    Ok(())
}

/// Load and partition only: print the plan, call nothing, write nothing.
fn dry_run(
    file: &Path,
    format: Option<DocumentFormat>,
    settings: &Settings,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let plan = plan_document(file, format, settings)?;
    let sizes: Vec<String> = plan.chunks.iter().map(|c| c.units.len().to_string()).collect();
    writeln!(
        out,
        "Processing {} sentences in {} chunks ({})",
        plan.units,
        plan.chunks.len(),
        sizes.join("/")
    )?;
    let estimate = Duration::from_secs(EST_SECS_PER_CHUNK * plan.chunks.len() as u64);
    writeln!(out, "Analysis would take approximately {}", format_duration(estimate))?;
    Ok(())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
