use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::builder::{Built, PendingEngram, RecordBuilder};
use crate::catalog;
use crate::config::{Blacklist, Settings};
use crate::enrich::{DetailEnricher, EnrichStats};
use crate::error::{CategoryFailure, FetchError};
use crate::model::{Catalog, Category, Entity, Records};
use crate::parser::{self, rows::TableParse};
use crate::source::PageSource;

/// What happened to one category during a run.
#[derive(Debug)]
pub struct CategoryReport {
    pub category: Category,
    pub rows: usize,
    pub skipped: usize,
    pub collected: usize,
    pub kept: usize,
    pub details: Option<EnrichStats>,
    pub failure: Option<CategoryFailure>,
}

impl CategoryReport {
    fn new(category: Category) -> Self {
        CategoryReport {
            category,
            rows: 0,
            skipped: 0,
            collected: 0,
            kept: 0,
            details: None,
            failure: None,
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub categories: Vec<CategoryReport>,
}

impl RunReport {
    pub fn get(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.iter().find(|r| r.category == category)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CategoryFailure> {
        self.categories.iter().filter_map(|r| r.failure.as_ref())
    }

    pub fn print(&self) {
        for r in &self.categories {
            match &r.failure {
                Some(f) => println!("{:<10} FAILED: {}", r.category.catalog_key(), f.error),
                None => println!(
                    "{:<10} {:>5} kept of {:>5} collected ({} rows, {} skipped)",
                    r.category.catalog_key(),
                    r.kept,
                    r.collected,
                    r.rows,
                    r.skipped
                ),
            }
            if let Some(d) = &r.details {
                println!(
                    "{:<10} details: {} ok, {} failed, {} dropped",
                    "", d.ok, d.failed, d.dropped
                );
            }
        }
    }
}

/// Listing page → records → (engrams) details → catalog → blacklist.
pub struct Pipeline {
    settings: Settings,
    source: Arc<dyn PageSource>,
    progress: bool,
}

impl Pipeline {
    pub fn new(settings: Settings, source: Arc<dyn PageSource>) -> Self {
        Pipeline {
            settings,
            source,
            progress: true,
        }
    }

    pub fn without_progress(mut self) -> Self {
        self.progress = false;
        self
    }

    pub async fn run(&self, blacklist: &Blacklist) -> (Catalog, RunReport) {
        let mut reports: Vec<CategoryReport> =
            Category::ALL.iter().map(|c| CategoryReport::new(*c)).collect();

        // Listing pages one at a time.
        let mut pages = Vec::new();
        for (category, report) in Category::ALL.into_iter().zip(reports.iter_mut()) {
            let url = self.settings.listing_url(category);
            let t0 = Instant::now();
            match self.fetch_listing(&url).await {
                Ok(html) => {
                    info!(
                        "{}: fetched {} ({} bytes) in {:.1}s",
                        category,
                        url,
                        html.len(),
                        t0.elapsed().as_secs_f64()
                    );
                    pages.push((category, html));
                }
                Err(error) => {
                    let failure = CategoryFailure { category, error };
                    warn!("{}", failure);
                    report.failure = Some(failure);
                }
            }
        }

        // Categories share nothing, so their pages are parsed in parallel.
        let parsed: Vec<(Category, TableParse)> = pages
            .par_iter()
            .map(|(category, html)| (*category, parser::parse_listing(*category, html)))
            .collect();

        let mut by_category: [Records; 4] = Default::default();
        for (category, parse) in parsed {
            let report = &mut reports[category.index()];
            report.rows = parse.records.len() + parse.skipped.len();
            report.skipped = parse.skipped.len();

            let (entities, pending) = build_category(category, &self.settings.base_url, parse);
            let entities = if category == Category::Engram {
                let mut enricher = DetailEnricher::new(
                    Arc::clone(&self.source),
                    self.settings.concurrency,
                    self.settings.timeout(),
                );
                if !self.progress {
                    enricher = enricher.without_progress();
                }
                info!("Engrams: fetching {} detail pages", pending.len());
                let (enriched, stats) = enricher.enrich(pending).await;
                report.details = Some(stats);
                enriched
            } else {
                entities
            };

            let records = catalog::index(entities);
            report.collected = records.len();
            by_category[category.index()] = records;
        }

        let [creatures, items, engrams, beacons] = by_category;
        let catalog = catalog::assemble(creatures, items, engrams, beacons);
        let catalog = catalog::apply_blacklist(catalog, blacklist);
        for report in &mut reports {
            report.kept = catalog.get(report.category).len();
        }

        (catalog, RunReport { categories: reports })
    }

    async fn fetch_listing(&self, url: &str) -> Result<String, FetchError> {
        let timeout = self.settings.timeout();
        match tokio::time::timeout(timeout, self.source.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                after: timeout,
            }),
        }
    }
}

/// Run a category's raw records through one [`RecordBuilder`]. Engrams come
/// back as pending detail fetches, everything else as finished entities.
pub fn build_category(
    category: Category,
    base_url: &str,
    parse: TableParse,
) -> (Vec<Entity>, Vec<PendingEngram>) {
    let mut builder = RecordBuilder::new(category, base_url);
    let mut entities = Vec::new();
    let mut pending = Vec::new();
    for raw in parse.records {
        match builder.build(raw) {
            Built::Entity(e) => entities.push(e),
            Built::Pending(p) => pending.push(p),
        }
    }
    info!("{}: {} records built", category, builder.issued());
    (entities, pending)
}

// ── Tests ──
