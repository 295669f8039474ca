//! sus CLI
//!
//! Run headless widget scenarios and inspect media queries.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use sus_cli::config::SusConfig;
use sus_cli::runner::Runner;
use sus_cli::scenario::Scenario;
use sus_core::{ColorScheme, Document, Size};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "sus widget kit CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a widget scenario headlessly
    Run {
        /// Scenario file (JSON)
        scenario: PathBuf,

        /// Config file or directory containing sus.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write a JSON report to this path
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Evaluate the configured media queries for a viewport
    Media {
        #[arg(long)]
        width: f32,

        #[arg(long)]
        height: f32,

        /// Config file or directory containing sus.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// light or dark
        #[arg(long)]
        color_scheme: Option<ColorScheme>,

        /// Extra query to evaluate (repeatable)
        #[arg(short, long = "query")]
        queries: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            config,
            report,
        } => cmd_run(&scenario, config.as_deref(), report.as_deref()),

        Commands::Media {
            width,
            height,
            config,
            color_scheme,
            queries,
        } => cmd_media(Size::new(width, height), config.as_deref(), color_scheme, &queries),
    }
}

fn cmd_run(scenario_path: &Path, config: Option<&Path>, report_path: Option<&Path>) -> Result<()> {
    let config = SusConfig::load_or_default(config)?;
    let scenario = Scenario::load(scenario_path)?;

    info!(
        "Running {} ({} widgets, {} steps)",
        scenario_path.display(),
        scenario.widgets.len(),
        scenario.steps.len()
    );

    let report = Runner::run(config, &scenario)
        .with_context(|| format!("Scenario {} aborted", scenario_path.display()))?;

    if let Some(path) = report_path {
        report.write(path)?;
        info!("Report written to {}", path.display());
    }

    for failure in &report.failures {
        warn!("{failure}");
    }

    if !report.passed() {
        anyhow::bail!(
            "{} of {} expectations failed",
            report.failures.len(),
            report.expectations
        );
    }

    info!("All {} expectations passed", report.expectations);
    Ok(())
}

fn cmd_media(
    viewport: Size,
    config: Option<&Path>,
    color_scheme: Option<ColorScheme>,
    extra: &[String],
) -> Result<()> {
    let config = SusConfig::load_or_default(config)?;
    let doc = Document::new(viewport);
    doc.set_color_scheme(color_scheme.unwrap_or(config.viewport.color_scheme));

    let mut queries: Vec<(String, String)> = config.media_queries().into_iter().collect();
    queries.extend(extra.iter().map(|q| (q.clone(), q.clone())));

    let alias_width = queries.iter().map(|(alias, _)| alias.len()).max().unwrap_or(0);
    for (alias, query) in &queries {
        let matches = doc
            .matches_media(query)
            .with_context(|| format!("Invalid media query `{query}`"))?;
        println!("{alias:<alias_width$}  {:<5}  {query}", matches);
    }

    println!(
        "device class: {:?}",
        config.breakpoints.device_class(viewport.width)
    );
    Ok(())
}
