use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::warn;

mod alert;
mod campaign;
mod error;
mod loader;
mod metrics;
mod models;
mod report;
mod schema;
mod session;
mod tier;

use alert::RecommendedAction;
use session::{Selection, Session};

#[derive(Parser)]
#[command(name = "marketing-dss")]
#[command(about = "ROAS/CPA alerting and campaign drill-down for marketing datasets", long_about = None)]
#[command(version)]
struct Cli {
    /// Marketing dataset: .xlsx/.xlsm/.xlsb/.xls/.ods workbook (first sheet)
    /// or CSV export, first row headers
    #[arg(long, global = true, alias = "csv", env = "MARKETING_DSS_INPUT")]
    input: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "MARKETING_DSS_LOG_JSON", default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every row with derived ROAS, CPA and alert tier
    Metrics {
        #[arg(long)]
        json: bool,
    },
    /// List campaign names
    Campaigns,
    /// Summarize one campaign: totals, average ROAS, trend and alert state
    Inspect {
        #[arg(long)]
        campaign: String,
        #[arg(long)]
        json: bool,
    },
    /// Run a simulated recommended action against a campaign in alert
    Simulate {
        #[arg(long)]
        campaign: String,
        #[arg(long, value_enum)]
        action: RecommendedAction,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        campaign: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketing_dss=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let path = cli
        .input
        .context("no dataset given; pass --input or set MARKETING_DSS_INPUT")?;
    let mut session = Session::open(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    match cli.command {
        Commands::Metrics { json } => {
            if json {
                let output = report::metrics_json(&session);
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }
            for notice in &session.notices {
                println!("note: {notice}");
            }
            print!("{}", report::tier_table(&session.dataset, &session.caps));
        }
        Commands::Campaigns => {
            if !session.caps.can_drill_down() {
                println!("campaign_name column not found in dataset.");
                return Ok(());
            }
            for name in campaign::campaign_names(&session.dataset) {
                println!("{name}");
            }
        }
        Commands::Inspect { campaign: name, json } => {
            if let Err(notice) = session.select(&name) {
                warn!(%notice, "selection incomplete");
                println!("note: {notice}");
            }
            for notice in campaign::malformed_dates(&session.dataset, &name) {
                println!("note: {notice}");
            }

            let selection = session.selection();
            if json {
                println!("{}", serde_json::to_string_pretty(selection)?);
                return Ok(());
            }
            let Some(summary) = selection.summary() else {
                return Ok(());
            };

            println!("Details for: {}", summary.campaign_name);
            for row in campaign::campaign_rows(&session.dataset, &name) {
                println!(
                    "  {} | {} | {} | {} | {}",
                    row.date,
                    row.category.as_deref().unwrap_or(""),
                    report::format_amount(row.spend),
                    report::format_amount(row.revenue),
                    report::format_ratio(row.roas)
                );
            }
            print!("{}", report::summary_section(summary));
            println!("ROAS trend:");
            print!("{}", report::trend_section(summary));
            print!("{}", report::selection_section(selection));
        }
        Commands::Simulate { campaign: name, action } => {
            if let Err(notice) = session.select(&name) {
                println!("note: {notice}");
                return Ok(());
            }
            match session.selection() {
                Selection::Alert { detail, .. } => println!("{}", detail.simulate(action)),
                other => print!("{}", report::selection_section(other)),
            }
        }
        Commands::Report { campaign: name, out } => {
            if let Some(name) = name.as_deref() {
                if let Err(notice) = session.select(name) {
                    warn!(%notice, "report selection incomplete");
                }
            }
            let report = report::build_report(&session);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
