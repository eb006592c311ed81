mod builder;
mod catalog;
mod config;
mod enrich;
mod error;
mod model;
mod parser;
mod pipeline;
mod source;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{Blacklist, Settings};
use crate::pipeline::Pipeline;
use crate::source::{DirSource, HttpSource, PageSource};

#[derive(Parser)]
#[command(name = "ark_catalog", about = "ARK wiki creature/item/engram/beacon catalog builder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape all listing pages and write the catalog
    Run {
        /// Settings file (toml/json); defaults to ./ark_catalog.* if present
        #[arg(long)]
        config: Option<PathBuf>,
        /// Blacklist JSON file
        #[arg(short, long)]
        blacklist: Option<PathBuf>,
        /// Catalog output path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Wiki base URL
        #[arg(long)]
        base_url: Option<String>,
        /// Read pages from a saved snapshot directory instead of the network
        #[arg(long)]
        pages_dir: Option<PathBuf>,
        /// Max concurrent detail page fetches
        #[arg(short = 'c', long)]
        concurrency: Option<usize>,
        /// Per-page timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Show entity counts of an existing catalog
    Show {
        /// Catalog file
        #[arg(default_value = "ark_data.json")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            blacklist,
            output,
            base_url,
            pages_dir,
            concurrency,
            timeout,
        } => {
            let mut settings = Settings::load(config.as_deref())?;
            if let Some(b) = blacklist {
                settings.blacklist = b;
            }
            if let Some(o) = output {
                settings.output = o;
            }
            if let Some(u) = base_url {
                settings.base_url = u;
            }
            if let Some(c) = concurrency {
                settings.concurrency = c;
            }
            if let Some(t) = timeout {
                settings.timeout_secs = t;
            }

            let blacklist = Blacklist::load(&settings.blacklist)?;
            let source: Arc<dyn PageSource> = match pages_dir {
                Some(dir) => {
                    info!("Reading pages from {}", dir.display());
                    Arc::new(DirSource::new(dir))
                }
                None => Arc::new(
                    HttpSource::new(&settings.user_agent, settings.timeout())
                        .context("Failed to build HTTP client")?,
                ),
            };

            let output = settings.output.clone();
            let (catalog, report) = Pipeline::new(settings, source).run(&blacklist).await;
            catalog::write(&output, &catalog)?;

            report.print();
            let failed = report.failures().count();
            if failed > 0 {
                println!("{} categories could not be scraped and are empty.", failed);
            }
            println!(
                "Wrote {} entries to {}",
                catalog.len(),
                output.display()
            );
            Ok(())
        }
        Commands::Show { path } => {
            let counts = catalog::summarize(&path)?;
            if counts.is_empty() {
                println!("{} is empty.", path.display());
                return Ok(());
            }
            for (category, n) in counts {
                println!("{:<10} {:>6}", category, n);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
