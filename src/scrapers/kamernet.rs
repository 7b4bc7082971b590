use super::{absolute_link, selector};
use crate::config::{search_url_for, KamernetConfig};
use crate::extract::{bool_of, int_of, pattern, text_of};
use crate::http_client::Fetcher;
use crate::models::Listing;
use crate::scraper_trait::Scraper;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;

const SOURCE: &str = "Kamernet";

struct Selectors {
    candidate: Selector,
    name: Selector,
    overview: Selector,
    detail_row: Selector,
    price: Selector,
    utilities: Selector,
    area: Selector,
    interior: Selector,
    location: Selector,
}

/// Kamernet search cards only carry a link; every field is read from the
/// listing page itself.
pub struct KamernetScraper {
    fetcher: Arc<dyn Fetcher>,
    enabled: bool,
    search_url: String,
    selectors: Selectors,
    furnished: Regex,
    inclusive: Regex,
}

impl KamernetScraper {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &KamernetConfig) -> Result<Self> {
        let s = &config.selectors;
        let selectors = Selectors {
            candidate: selector(&s.candidate)?,
            name: selector(&s.name)?,
            overview: selector(&s.overview)?,
            detail_row: selector(&s.detail_row)?,
            price: selector(&s.price)?,
            utilities: selector(&s.utilities)?,
            area: selector(&s.area)?,
            interior: selector(&s.interior)?,
            location: selector(&s.location)?,
        };

        Ok(Self {
            fetcher,
            enabled: config.enabled,
            search_url: config.search_url.clone(),
            selectors,
            furnished: pattern(r"\bfurnished")?,
            inclusive: pattern("incl")?,
        })
    }

    fn parse_search_page(&self, html: &str, search_url: &str) -> Result<Vec<String>> {
        let base = Url::parse(search_url).with_context(|| format!("Invalid search URL {}", search_url))?;
        let document = Html::parse_document(html);

        let links = document
            .select(&self.selectors.candidate)
            .filter_map(|card| card.value().attr("href"))
            .filter_map(|href| absolute_link(&base, href))
            .collect();

        Ok(links)
    }

    /// Builds a listing from its page. The overview holds a price row
    /// (price, with the utilities remark next to it) followed by a row with
    /// the surface and the interior.
    fn parse_listing_page(&self, html: &str, city: &str, link: &str) -> Listing {
        let document = Html::parse_document(html);
        let s = &self.selectors;

        let rows: Vec<ElementRef> = document
            .select(&s.overview)
            .next()
            .map(|overview| overview.select(&s.detail_row).collect())
            .unwrap_or_default();

        let price = rows.first().and_then(|row| row.select(&s.price).next());
        let utilities = price
            .and_then(|p| p.parent())
            .and_then(ElementRef::wrap)
            .and_then(|parent| parent.select(&s.utilities).next());
        let area = rows.get(1).and_then(|row| row.select(&s.area).next());
        let interior = rows.get(1).and_then(|row| row.select(&s.interior).next());

        Listing {
            name: text_of(document.select(&s.name).next()),
            location: text_of(document.select(&s.location).next()),
            city: city.to_string(),
            price: int_of(price),
            utilities_included: bool_of(utilities, &self.inclusive),
            area: int_of(area),
            rooms: None,
            furnished: bool_of(interior, &self.furnished),
            link: link.to_string(),
            source: SOURCE.to_string(),
        }
    }
}

#[async_trait]
impl Scraper for KamernetScraper {
    fn name(&self) -> &str {
        SOURCE
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn scrape(&self, city: &str, seen: &HashSet<String>) -> Result<Vec<Listing>> {
        let url = search_url_for(&self.search_url, city);
        tracing::debug!("Scraping {}", url);

        let html = self.fetcher.get_text(&url).await?;
        let links = self.parse_search_page(&html, &url)?;
        tracing::debug!("{} candidates on {}", links.len(), url);

        let mut listings = Vec::new();
        for link in links {
            if seen.contains(&link) {
                tracing::trace!("Already seen {}", link);
                continue;
            }

            let page = self.fetcher.get_text(&link).await?;
            let listing = self.parse_listing_page(&page, city, &link);

            tracing::debug!("Found listing: {} ({}, €{}, {} m²)", listing.name, listing.link, listing.price, listing.area);
            listings.push(listing);
        }

        Ok(listings)
    }
}
