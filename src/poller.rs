use crate::evaluator::Criteria;
use crate::notifier::Notifier;
use crate::scraper_trait::ScraperRegistry;
use crate::tracker::SeenStore;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Counters for one fetch, evaluate, notify and persist pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub new: usize,
    pub matched: usize,
    pub notified: usize,
    pub failed_sources: usize,
}

pub struct Poller {
    registry: ScraperRegistry,
    notifier: Box<dyn Notifier>,
    store: Box<dyn SeenStore>,
    criteria: Criteria,
    cities: Vec<String>,
    interval: Duration,
    seen: HashSet<String>,
    /// Links in `seen` that the store has not accepted yet
    pending: Vec<String>,
}

impl Poller {
    /// Loads the seen-set once; it is only appended to afterwards.
    pub fn new(
        registry: ScraperRegistry,
        notifier: Box<dyn Notifier>,
        mut store: Box<dyn SeenStore>,
        criteria: Criteria,
        cities: Vec<String>,
        interval: Duration,
    ) -> Result<Self> {
        let seen = store.load().context("Failed to load seen listings")?;
        tracing::info!("Loaded {} seen listings", seen.len());

        Ok(Self {
            registry,
            notifier,
            store,
            criteria,
            cities,
            interval,
            seen,
            pending: Vec::new(),
        })
    }

    #[cfg(test)]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let outcome = self.registry.scrape_all(&self.cities, &self.seen).await;
        let mut report = CycleReport {
            fetched: outcome.listings.len(),
            failed_sources: outcome.failures,
            ..CycleReport::default()
        };

        // First observation of a link wins, within the cycle and across cycles
        let mut cycle_links = HashSet::new();
        let listings: Vec<_> = outcome
            .listings
            .into_iter()
            .filter(|l| !self.seen.contains(&l.link) && cycle_links.insert(l.link.clone()))
            .collect();
        report.new = listings.len();

        let multi_city = self.cities.len() > 1;
        for listing in &listings {
            if !self.criteria.matches(listing) {
                tracing::debug!("No match: {} (€{}, {} m², furnished {:?})", listing.link, listing.price, listing.area, listing.furnished);
                continue;
            }
            report.matched += 1;

            let (title, body) = listing.format_notification(multi_city);
            match self.notifier.push(&title, &body).await {
                Ok(()) => {
                    tracing::info!("Sent notification for: {} ({})", listing.name, listing.link);
                    report.notified += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to send notification for {}: {:#}", listing.link, e);
                }
            }
        }

        // Links from an earlier failed write go out first, in the same batch
        let new_links: Vec<String> = listings.into_iter().map(|l| l.link).collect();
        self.seen.extend(new_links.iter().cloned());
        self.pending.extend(new_links);
        self.store
            .append(&self.pending)
            .with_context(|| format!("Failed to persist {} seen listings", self.pending.len()))?;
        self.pending.clear();

        Ok(report)
    }

    /// Polls until `shutdown` is cancelled. Cancellation is checked before
    /// each cycle and interrupts the sleep between cycles.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            tracing::info!("Starting polling cycle...");
            match self.run_cycle().await {
                Ok(report) => tracing::info!(
                    "Cycle done: {} fetched, {} new, {} matched, {} notified, {} failed sources",
                    report.fetched, report.new, report.matched, report.notified, report.failed_sources
                ),
                Err(e) => tracing::error!("Polling cycle failed: {:#}", e),
            }

            let next = chrono::Local::now()
                + chrono::Duration::from_std(self.interval).unwrap_or_else(|_| chrono::Duration::zero());
            tracing::info!("Waiting {} sec (next poll at {})...", self.interval.as_secs(), next.format("%H:%M:%S"));

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!("Polling stopped");
    }
}
