//! crm-segments — evaluate saved CRM segments against exported records.
//!
//! Reads records and segment definitions as JSON files, prints results as
//! JSON on stdout. Logs go to stderr.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use crm_core::config::{AppConfig, LogConfig};
use crm_core::{records_from_json, Record};
use crm_segmentation::{FilterSet, PageRequest, QueryPlan, Segment, SegmentBuilder, SegmentationEngine};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "crm-segments")]
#[command(about = "Evaluate saved CRM segments against exported records")]
#[command(version)]
struct Cli {
    /// TOML config file (CRM__* environment variables take precedence)
    #[arg(long, global = true, env = "CRM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one page of the records that belong to a segment
    Eval {
        /// JSON array of records
        #[arg(long)]
        records: PathBuf,
        /// Saved segment, `{"name", "filters"}` object, or bare filter array
        #[arg(long)]
        segment: PathBuf,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Page size (overrides config)
        #[arg(long)]
        page_size: Option<usize>,
        /// Reject unknown operators instead of letting them match
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Show which filters the hosted store can apply and which stay in memory
    Plan {
        #[arg(long)]
        segment: PathBuf,
    },
    /// Fail if the segment uses an unknown operator
    Validate {
        #[arg(long)]
        segment: PathBuf,
    },
}

/// Accepted shapes for a segment definition file.
#[derive(Deserialize)]
#[serde(untagged)]
enum SegmentFile {
    Saved(Segment),
    Inline {
        #[serde(default)]
        name: Option<String>,
        filters: FilterSet,
    },
    Bare(FilterSet),
}

#[derive(Serialize)]
struct EvalOutput {
    segment_id: Uuid,
    count: usize,
    page: usize,
    page_size: usize,
    total_pages: usize,
    items: Vec<Record>,
}

#[derive(Serialize)]
struct PlanOutput {
    query: String,
    fully_pushed_down: bool,
    #[serde(flatten)]
    plan: QueryPlan,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_error) = match load_config(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    init_tracing(&config.log);
    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    match cli.command {
        Command::Eval {
            records,
            segment,
            page,
            page_size,
            strict,
        } => {
            config.segments.strict_operators |= strict;
            let engine = SegmentationEngine::with_config(&config.segments);

            let segment = read_segment(&segment)?;
            let segment_id = segment.id;
            engine.register(segment)?;
            let records = read_records(&records)?;

            let request = PageRequest::from_page(page, page_size.unwrap_or(engine.default_page_size()));
            let result = engine.members(segment_id, &records, request)?;
            info!(
                segment_id = %segment_id,
                candidates = records.len(),
                count = result.count,
                page = request.page_number(),
                "Segment evaluated"
            );

            print_json(&EvalOutput {
                segment_id,
                count: result.count,
                page: request.page_number(),
                page_size: request.limit,
                total_pages: result.total_pages(request.limit),
                items: result.items,
            })
        }
        Command::Plan { segment } => {
            let segment = read_segment(&segment)?;
            let plan = segment.filters.plan();
            info!(
                segment_id = %segment.id,
                remote = plan.remote.len(),
                residual = plan.residual.len(),
                "Query plan built"
            );
            print_json(&PlanOutput {
                query: plan.query_string(),
                fully_pushed_down: plan.is_fully_pushed_down(),
                plan,
            })
        }
        Command::Validate { segment } => {
            let segment = read_segment(&segment)?;
            segment.filters.validate()?;
            println!("{}: {} predicates OK", segment.name, segment.filters.len());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig, crm_core::CrmError> {
    let config = match path {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    Ok(config)
}

fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_segment(path: &Path) -> anyhow::Result<Segment> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading segment file {}", path.display()))?;
    let file: SegmentFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing segment file {}", path.display()))?;

    let segment = match file {
        SegmentFile::Saved(segment) => segment,
        SegmentFile::Inline { name, filters } => {
            SegmentBuilder::new(Uuid::nil(), name.unwrap_or_else(|| file_stem(path)))
                .filters(filters)
                .build()
        }
        SegmentFile::Bare(filters) => SegmentBuilder::new(Uuid::nil(), file_stem(path))
            .filters(filters)
            .build(),
    };
    Ok(segment)
}

fn read_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading records file {}", path.display()))?;
    records_from_json(&raw).with_context(|| format!("parsing records file {}", path.display()))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "segment".to_string())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
