use anyhow::Context;
use clap::Parser;
use rebalance_core::domain::portfolio::PlanningRequest;
use rebalance_core::domain::report::MergedReport;
use rebalance_core::ingest::portfolio::{load_portfolio, LoadOptions};
use rebalance_core::PipelineError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Parser)]
#[command(name = "rebalance_worker")]
struct Args {
    /// Portfolio export (.csv, .xls or .xlsx).
    #[arg(long)]
    portfolio: PathBuf,

    /// Primary financial goal.
    #[arg(long, default_value = "Create wealth")]
    goal: String,

    /// Investment horizon in years.
    #[arg(long, default_value = "5")]
    horizon_years: String,

    /// Risk tolerance, e.g. LOW, Moderate, HIGH.
    #[arg(long, default_value = "HIGH")]
    risk_tolerance: String,

    /// Leading vendor rows to drop before the header row.
    #[arg(long, default_value_t = 0)]
    skip_rows: usize,

    /// Groww holdings export (skips its 10-row preamble).
    #[arg(long, conflicts_with = "skip_rows")]
    groww: bool,

    /// Oracle provider (gemini or anthropic). Defaults to LLM_PROVIDER, then gemini.
    #[arg(long)]
    provider: Option<String>,

    /// Where to write the merged recommendation table.
    #[arg(long, default_value = "recommended_modifications.csv")]
    output: PathBuf,

    /// Print the composed prompt and stop before calling the oracle.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = rebalance_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(&settings, &args).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        if let Some(pipeline_err) = err.downcast_ref::<PipelineError>() {
            if let Some(raw) = pipeline_err.raw_output() {
                tracing::error!(raw_output = %raw, "oracle output for the failed run");
            }
        }
        tracing::error!(error = %format!("{err:#}"), "recommendation run failed");
    }
    result
}

async fn run(settings: &rebalance_core::config::Settings, args: &Args) -> anyhow::Result<()> {
    let opts = if args.groww {
        LoadOptions::groww()
    } else {
        LoadOptions {
            skip_rows: args.skip_rows,
        }
    };
    let snapshot = load_portfolio(&args.portfolio, &opts)?;

    let request = PlanningRequest::try_new(
        args.goal.as_str(),
        args.horizon_years.as_str(),
        args.risk_tolerance.as_str(),
        snapshot,
    )?;

    if args.dry_run {
        let prompt = rebalance_core::llm::prompt::compose(&request);
        tracing::info!(
            dry_run = true,
            holdings = request.snapshot.len(),
            prompt_chars = prompt.len(),
            "composed prompt; skipping oracle"
        );
        println!("{prompt}");
        return Ok(());
    }

    let oracle = rebalance_core::llm::client_from_settings(settings, args.provider.as_deref())?;

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // Without a signal handler there is nothing to wait for.
            std::future::pending::<()>().await;
        }
    };
    let output = rebalance_core::pipeline::run_with_cancel(&*oracle, &request, cancel).await?;

    rebalance_core::storage::report::write_report_csv(&output.report, &args.output)
        .context("writing recommendation report failed")?;

    print_preview(&output.report);
    tracing::info!(
        provider = %oracle.provider(),
        rows = output.report.len(),
        output = %args.output.display(),
        "recommendation run complete"
    );
    Ok(())
}

fn print_preview(report: &MergedReport) {
    if report.is_empty() {
        println!("No recommendations returned.");
        return;
    }
    println!("{}", MergedReport::COLUMNS.join(" | "));
    for row in report.rows.iter().take(PREVIEW_ROWS) {
        let units = row
            .units
            .map(|u| u.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} | {} | {} | {} | {} | {}",
            row.stock_name,
            row.stock_symbol,
            row.action,
            units,
            row.reason,
            row.section.as_str()
        );
    }
    if report.len() > PREVIEW_ROWS {
        println!("... {} more rows", report.len() - PREVIEW_ROWS);
    }
}

fn init_sentry(settings: &rebalance_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
