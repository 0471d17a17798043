use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod context;
mod error;
mod loader;
mod metrics;
mod models;
mod pages;
mod report;
mod risk;
mod survival;

use context::AppContext;
use loader::DatasetCache;
use metrics::RecordFilter;
use survival::KaplanMeier;

#[derive(Parser)]
#[command(name = "retention-dashboard")]
#[command(about = "Employee retention analytics over a turnover dataset", long_about = None)]
struct Cli {
    /// Dataset path; falls back to RETENTION_DATA, then turnover-data-set.csv
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// Text encoding label of the dataset
    #[arg(long, global = true, default_value = loader::DEFAULT_ENCODING)]
    encoding: String,
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,
    /// Restrict to a profession (repeatable); also selects survival curves
    #[arg(long = "profession", global = true)]
    professions: Vec<String>,
    /// Restrict to an industry (repeatable)
    #[arg(long = "industry", global = true)]
    industries: Vec<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Headline metrics and age/tenure distributions
    Overview,
    /// Survival curves by profession
    Survival,
    /// Risk heatmap and high-risk groups
    Risk,
    /// Group statistics, correlations and retention recommendations
    Recommendations,
    /// Render all four pages together
    Report {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn setup_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "retention_dashboard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn emit<T: Serialize>(
    format: OutputFormat,
    page: &T,
    render: impl Fn(&T) -> String,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Markdown => Ok(render(page)),
        OutputFormat::Json => {
            serde_json::to_string_pretty(page).context("failed to serialize page as JSON")
        }
    }
}

fn main() -> anyhow::Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let data_path = cli
        .data
        .or_else(|| std::env::var("RETENTION_DATA").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(loader::DEFAULT_DATA_PATH));
    let encoding = loader::resolve_encoding(&cli.encoding)?;
    let ctx = AppContext::new(
        DatasetCache::new(&data_path, encoding),
        Box::new(KaplanMeier),
    );
    let filter = RecordFilter {
        professions: cli.professions,
        industries: cli.industries,
    };
    info!(path = %ctx.cache().path().display(), scope = %report::scope_label(&filter), "starting");

    let dataset_context = || format!("failed to render page from {}", data_path.display());
    let output = match cli.command {
        Commands::Overview => {
            let page = pages::overview(&ctx, &filter).with_context(dataset_context)?;
            emit(cli.format, &page, report::render_overview)?
        }
        Commands::Survival => {
            let page = pages::survival(&ctx, &filter).with_context(dataset_context)?;
            emit(cli.format, &page, report::render_survival)?
        }
        Commands::Risk => {
            let page = pages::risk(&ctx, &filter).with_context(dataset_context)?;
            emit(cli.format, &page, report::render_risk)?
        }
        Commands::Recommendations => {
            let page = pages::recommendations(&ctx, &filter).with_context(dataset_context)?;
            emit(cli.format, &page, report::render_recommendations)?
        }
        Commands::Report { out } => {
            let built = report::build_report(&ctx, &filter).with_context(dataset_context)?;
            let rendered = emit(cli.format, &built, report::render_report)?;
            if let Some(out) = out {
                std::fs::write(&out, rendered)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("Report written to {}.", out.display());
                return Ok(());
            }
            rendered
        }
    };

    println!("{output}");
    Ok(())
}
