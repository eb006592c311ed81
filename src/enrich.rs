use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::builder::{EngramDetail, PendingEngram};
use crate::error::FetchError;
use crate::model::Entity;
use crate::parser::detail::DetailPage;
use crate::source::PageSource;

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Counts for one detail batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub total: usize,
    pub ok: usize,
    pub failed: usize,
    pub dropped: usize,
}

/// Fetches engram detail pages with bounded concurrency and a per-fetch timeout.
pub struct DetailEnricher {
    source: Arc<dyn PageSource>,
    concurrency: usize,
    timeout: Duration,
    progress: bool,
}

impl DetailEnricher {
    pub fn new(source: Arc<dyn PageSource>, concurrency: usize, timeout: Duration) -> Self {
        DetailEnricher {
            source,
            concurrency: concurrency.max(1),
            timeout,
            progress: true,
        }
    }

    pub fn without_progress(mut self) -> Self {
        self.progress = false;
        self
    }

    /// Fetch every detail page, then merge. Returns the surviving engrams in
    /// input order.
    pub async fn enrich(&self, pending: Vec<PendingEngram>) -> (Vec<Entity>, EnrichStats) {
        let total = pending.len();
        let details = self.fetch_all(&pending).await;

        let mut stats = EnrichStats {
            total,
            ..Default::default()
        };
        let mut entities = Vec::with_capacity(total);
        for (engram, result) in pending.into_iter().zip(details) {
            let detail = match result {
                Ok(detail) => {
                    stats.ok += 1;
                    detail
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!("Detail fetch failed for {:?}: {}", engram.listed_name, e);
                    EngramDetail::unknown()
                }
            };
            let listed = engram.listed_name.clone();
            match engram.complete(detail) {
                Some(entity) => entities.push(entity),
                None => {
                    stats.dropped += 1;
                    debug!("Engram {:?} has no canonical name, dropped", listed);
                }
            }
        }

        info!(
            "Engram details: {} fetched ({} ok, {} failed), {} dropped",
            stats.total, stats.ok, stats.failed, stats.dropped
        );
        (entities, stats)
    }

    /// One task per engram, gated by a semaphore; all tasks are joined before
    /// returning. Results are indexed like `pending`.
    async fn fetch_all(&self, pending: &[PendingEngram]) -> Vec<Result<EngramDetail, FetchError>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let pb = self.progress_bar(pending.len());

        let (tx, mut rx) =
            tokio::sync::mpsc::channel::<(usize, Result<EngramDetail, FetchError>)>(
                self.concurrency * 2,
            );

        for (idx, engram) in pending.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let sem = Arc::clone(&semaphore);
            let tx = tx.clone();
            let url = engram.url.clone();
            let timeout = self.timeout;

            tokio::spawn(async move {
                // Fails only on a closed semaphore, which this one never is.
                let Ok(_permit) = sem.acquire_owned().await else {
                    return;
                };
                let result = fetch_detail(source.as_ref(), &url, timeout).await;
                let _ = tx.send((idx, result)).await;
            });
        }

        // Drop our copy of tx so rx closes when all spawned tasks finish
        drop(tx);

        let mut results: Vec<Option<Result<EngramDetail, FetchError>>> =
            (0..pending.len()).map(|_| None).collect();
        while let Some((idx, result)) = rx.recv().await {
            results[idx] = Some(result);
            pb.inc(1);
        }
        pb.finish_and_clear();

        // A task that died without reporting counts as a timeout.
        results
            .into_iter()
            .zip(pending)
            .map(|(r, engram)| {
                r.unwrap_or_else(|| {
                    Err(FetchError::Timeout {
                        url: engram.url.clone(),
                        after: self.timeout,
                    })
                })
            })
            .collect()
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    }
}

async fn fetch_detail(
    source: &dyn PageSource,
    url: &str,
    timeout: Duration,
) -> Result<EngramDetail, FetchError> {
    let html = match tokio::time::timeout(timeout, source.fetch(url)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(FetchError::Timeout {
                url: url.to_string(),
                after: timeout,
            })
        }
    };
    let page = DetailPage::parse(&html);
    debug!("{} → {:?}", url, page);
    Ok(EngramDetail::from_page(page.name, page.blueprint))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::model::{EntityDetail, UNKNOWN};

    /// Serves canned pages; URLs containing "slow" never answer in time.
    struct FakeWiki {
        pages: HashMap<String, String>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeWiki {
        fn new(pages: &[(&str, &str)]) -> Self {
            FakeWiki {
                pages: pages
                    .iter()
                    .map(|(u, h)| (u.to_string(), h.to_string()))
                    .collect(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageSource for FakeWiki {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if url.contains("slow") {
                tokio::time::sleep(Duration::from_secs(30)).await;
            } else {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.pages.get(url).cloned().ok_or(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn page(name: &str, bp: &str) -> String {
        format!(
            r#"<div class="info-arkitex info-X1-100 info-masthead">{}</div>
               <div class="info-arkitex-spawn-commands-entry"><code>cheat giveitem "Blueprint'{}'" 1 0 0</code></div>"#,
            name, bp
        )
    }

    fn pending(id: u32, url: &str) -> PendingEngram {
        PendingEngram {
            id,
            listed_name: url.to_string(),
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn timed_out_fetch_drops_only_that_engram() {
        let hatchet = page("Stone Hatchet", "/Game/Hatchet");
        let pick = page("Stone Pick", "/Game/Pick");
        let wiki = Arc::new(FakeWiki::new(&[("a", hatchet.as_str()), ("c", pick.as_str())]));
        let enricher =
            DetailEnricher::new(wiki, 4, Duration::from_millis(200)).without_progress();

        let (entities, stats) = enricher
            .enrich(vec![pending(1, "a"), pending(2, "slow"), pending(3, "c")])
            .await;

        let keys: Vec<(&str, u32)> = entities.iter().map(|e| (e.key.as_str(), e.id)).collect();
        assert_eq!(keys, vec![("Stone_Hatchet", 1), ("Stone_Pick", 3)]);
        assert!(entities.iter().all(|e| e.key != UNKNOWN));
        assert_eq!(
            entities[0].detail,
            EntityDetail::Engram {
                blueprint: "/Game/Hatchet".into()
            }
        );
        assert_eq!(
            stats,
            EnrichStats {
                total: 3,
                ok: 2,
                failed: 1,
                dropped: 1
            }
        );
    }

    #[tokio::test]
    async fn page_without_name_is_dropped() {
        let wiki = Arc::new(FakeWiki::new(&[("a", "<p>moved</p>")]));
        let enricher = DetailEnricher::new(wiki, 2, Duration::from_secs(5)).without_progress();
        let (entities, stats) = enricher.enrich(vec![pending(1, "a"), pending(2, "gone")]).await;
        assert!(entities.is_empty());
        assert_eq!(stats.ok, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.dropped, 2);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let html = page("Spear", "/Game/Spear");
        let urls: Vec<String> = (0..20).map(|i| format!("u{}", i)).collect();
        let pages: Vec<(&str, &str)> = urls.iter().map(|u| (u.as_str(), html.as_str())).collect();
        let wiki = Arc::new(FakeWiki::new(&pages));
        let enricher = DetailEnricher::new(wiki.clone(), 3, Duration::from_secs(5)).without_progress();

        let batch = urls
            .iter()
            .enumerate()
            .map(|(i, u)| pending(i as u32 + 1, u))
            .collect();
        let (entities, stats) = enricher.enrich(batch).await;

        assert_eq!(stats.ok, 20);
        // Same canonical name for every page, ids still in row order.
        assert_eq!(entities.len(), 20);
        assert!(entities.windows(2).all(|w| w[0].id < w[1].id));
        assert!(wiki.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn empty_batch() {
        let wiki = Arc::new(FakeWiki::new(&[]));
        let enricher = DetailEnricher::new(wiki, 0, Duration::from_secs(1)).without_progress();
        let (entities, stats) = enricher.enrich(Vec::new()).await;
        assert!(entities.is_empty());
        assert_eq!(stats, EnrichStats::default());
    }
}
