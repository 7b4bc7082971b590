use crate::models::Listing;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// Trait that all source adapters must implement
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Returns the name of the scraper/website
    fn name(&self) -> &str;

    /// Scrapes one city. Candidates whose link is in `seen` are skipped
    /// before their detail page is requested.
    async fn scrape(&self, city: &str, seen: &HashSet<String>) -> Result<Vec<Listing>>;

    /// Returns whether this scraper is enabled
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Listings gathered by one pass over every city and scraper
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    pub listings: Vec<Listing>,
    pub failures: usize,
}

/// Registry to manage all scrapers
pub struct ScraperRegistry {
    scrapers: Vec<Box<dyn Scraper>>,
}

impl ScraperRegistry {
    pub fn new() -> Self {
        Self {
            scrapers: Vec::new(),
        }
    }

    pub fn register(&mut self, scraper: Box<dyn Scraper>) {
        self.scrapers.push(scraper);
    }

    /// Runs every enabled scraper for every city, one at a time. A failed
    /// (city, scraper) pair is logged and counted; the others still run.
    pub async fn scrape_all(&self, cities: &[String], seen: &HashSet<String>) -> ScrapeOutcome {
        let mut outcome = ScrapeOutcome::default();

        for city in cities {
            for scraper in &self.scrapers {
                if !scraper.is_enabled() {
                    continue;
                }

                tracing::info!("Scraping {} from {}", city, scraper.name());

                match scraper.scrape(city, seen).await {
                    Ok(mut listings) => {
                        tracing::info!("Found {} new listings for {} from {}", listings.len(), city, scraper.name());
                        outcome.listings.append(&mut listings);
                    }
                    Err(e) => {
                        tracing::error!("Failed to scrape {} from {}: {:#}", city, scraper.name(), e);
                        outcome.failures += 1;
                    }
                }
            }
        }

        outcome
    }

    pub fn list_scrapers(&self) -> Vec<String> {
        self.scrapers.iter()
            .map(|s| s.name().to_string())
            .collect()
    }
}

impl Default for ScraperRegistry {
    fn default() -> Self {
        Self::new()
    }
}
