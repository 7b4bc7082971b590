use super::{absolute_link, selector};
use crate::config::{search_url_for, ParariusConfig};
use crate::extract::{all_words_of, bool_of, int_of, pattern, text_of};
use crate::http_client::Fetcher;
use crate::models::{Listing, TriState};
use crate::scraper_trait::Scraper;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;

const SOURCE: &str = "Pararius";

struct Selectors {
    candidate: Selector,
    link: Selector,
    title: Selector,
    location: Selector,
    price: Selector,
    area: Selector,
    rooms: Selector,
    interior: Selector,
    utilities_badge: Selector,
    features: Selector,
}

pub struct ParariusScraper {
    fetcher: Arc<dyn Fetcher>,
    enabled: bool,
    search_url: String,
    selectors: Selectors,
    furnished: Regex,
    utility_words: Vec<Regex>,
    upholstery: Regex,
}

impl ParariusScraper {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &ParariusConfig) -> Result<Self> {
        let s = &config.selectors;
        let selectors = Selectors {
            candidate: selector(&s.candidate)?,
            link: selector(&s.link)?,
            title: selector(&s.title)?,
            location: selector(&s.location)?,
            price: selector(&s.price)?,
            area: selector(&s.area)?,
            rooms: selector(&s.rooms)?,
            interior: selector(&s.interior)?,
            utilities_badge: selector(&s.utilities_badge)?,
            features: selector(&s.features)?,
        };

        let utility_words = ["gas", "water", "electricity"]
            .iter()
            .map(|w| pattern(&format!(r"\b{}\b", w)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            fetcher,
            enabled: config.enabled,
            search_url: config.search_url.clone(),
            selectors,
            furnished: pattern(r"\bfurnished")?,
            utility_words,
            upholstery: pattern(r"\bupholstery\b")?,
        })
    }

    /// Extracts every candidate that carries a link. Utilities are `True`
    /// when the price transparency badge is shown, `Unknown` otherwise.
    fn parse_search_page(&self, html: &str, search_url: &str, city: &str) -> Result<Vec<Listing>> {
        let base = Url::parse(search_url).with_context(|| format!("Invalid search URL {}", search_url))?;
        let document = Html::parse_document(html);
        let s = &self.selectors;

        let mut listings = Vec::new();
        for (index, element) in document.select(&s.candidate).enumerate() {
            let link = element
                .select(&s.link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| absolute_link(&base, href));

            let Some(link) = link else {
                tracing::trace!("Skipping candidate #{} - no link", index + 1);
                continue;
            };

            let rooms = int_of(element.select(&s.rooms).next());
            let has_badge = element.select(&s.utilities_badge).next().is_some();

            listings.push(Listing {
                name: text_of(element.select(&s.title).next()),
                location: text_of(element.select(&s.location).next()),
                city: city.to_string(),
                price: int_of(element.select(&s.price).next()),
                utilities_included: if has_badge { TriState::True } else { TriState::Unknown },
                area: int_of(element.select(&s.area).next()),
                rooms: Some(rooms).filter(|r| *r >= 0),
                furnished: bool_of(element.select(&s.interior).next(), &self.furnished),
                link,
                source: SOURCE.to_string(),
            });
        }

        Ok(listings)
    }

    /// Reads the feature description of a listing page. Mentioning gas,
    /// water and electricity together, or upholstery, counts as bills included.
    fn parse_utilities(&self, html: &str) -> TriState {
        let document = Html::parse_document(html);
        let features = document.select(&self.selectors.features).next();

        match (
            all_words_of(features, &self.utility_words),
            bool_of(features, &self.upholstery),
        ) {
            (TriState::Unknown, _) => TriState::Unknown,
            (TriState::True, _) | (_, TriState::True) => TriState::True,
            _ => TriState::False,
        }
    }
}

#[async_trait]
impl Scraper for ParariusScraper {
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
        let candidates = self.parse_search_page(&html, &url, city)?;
        tracing::debug!("{} candidates on {}", candidates.len(), url);

        let mut listings = Vec::new();
        for mut listing in candidates {
            if seen.contains(&listing.link) {
                tracing::trace!("Already seen {}", listing.link);
                continue;
            }

            let page = self.fetcher.get_text(&listing.link).await?;
            if !listing.utilities_included.is_true() {
                listing.utilities_included = self.parse_utilities(&page);
            }

            tracing::debug!("Found listing: {} ({}, €{}, {} m²)", listing.name, listing.link, listing.price, listing.area);
            listings.push(listing);
        }

        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::fixtures::FixtureFetcher;

    const SEARCH_URL: &str = "https://www.pararius.com/apartments/eindhoven/huurperiode-6-600";

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <ul class="search-list">
            <li class="search-list__item search-list__item--listing">
              <section class="listing-search-item">
                <h2 class="listing-search-item__title">
                  <a class="listing-search-item__link listing-search-item__link--title" href="/apartment-for-rent/eindhoven/aaa111/kruisstraat">Apartment Kruisstraat</a>
                </h2>
                <div class="listing-search-item__sub-title">5611 BP Eindhoven (Binnenstad)</div>
                <div class="listing-search-item__price">€1,450 per month</div>
                <ul class="illustrated-features">
                  <li class="illustrated-features__item illustrated-features__item--surface-area">52 m²</li>
                  <li class="illustrated-features__item illustrated-features__item--number-of-rooms">2 rooms</li>
                  <li class="illustrated-features__item illustrated-features__item--interior">Furnished</li>
                </ul>
                <wc-price-transparency-badge></wc-price-transparency-badge>
              </section>
            </li>
            <li class="search-list__item search-list__item--listing">
              <section class="listing-search-item">
                <h2 class="listing-search-item__title">
                  <a class="listing-search-item__link listing-search-item__link--title" href="/apartment-for-rent/eindhoven/bbb222/vestdijk">Apartment Vestdijk</a>
                </h2>
                <div class="listing-search-item__price">Price on request</div>
                <ul class="illustrated-features">
                  <li class="illustrated-features__item illustrated-features__item--surface-area">30 m²</li>
                  <li class="illustrated-features__item illustrated-features__item--interior">Upholstered</li>
                </ul>
              </section>
            </li>
            <li class="search-list__item search-list__item--listing">
              <section class="listing-search-item">
                <h2 class="listing-search-item__title">No link here</h2>
              </section>
            </li>
            <li class="search-list__item search-list__item--project">
              <a class="listing-search-item__link" href="/new-build/eindhoven/ccc333">Project</a>
            </li>
          </ul>
        </body></html>
    "#;

    const DETAIL_WITH_BILLS: &str = r#"
        <html><body>
          <ul class="listing-features__sub-description">
            <li>Includes: gas, water, electricity and internet</li>
          </ul>
        </body></html>
    "#;

    const DETAIL_WITHOUT_FEATURES: &str = "<html><body><p>Nothing here</p></body></html>";

    fn scraper_with(fetcher: Arc<FixtureFetcher>) -> ParariusScraper {
        ParariusScraper::new(fetcher, &ParariusConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_search_page() {
        let scraper = scraper_with(Arc::new(FixtureFetcher::default()));
        let listings = scraper.parse_search_page(SEARCH_PAGE, SEARCH_URL, "eindhoven").unwrap();

        assert_eq!(listings.len(), 2, "candidate without link and project items are skipped");

        let first = &listings[0];
        assert_eq!(first.name, "Apartment Kruisstraat");
        assert_eq!(first.location, "5611 BP Eindhoven (Binnenstad)");
        assert_eq!(first.city, "eindhoven");
        assert_eq!(first.price, 1450);
        assert_eq!(first.area, 52);
        assert_eq!(first.rooms, Some(2));
        assert_eq!(first.furnished, TriState::True);
        assert_eq!(first.utilities_included, TriState::True);
        assert_eq!(first.link, "https://www.pararius.com/apartment-for-rent/eindhoven/aaa111/kruisstraat");
        assert_eq!(first.source, "Pararius");

        let second = &listings[1];
        assert_eq!(second.location, "Unknown");
        assert_eq!(second.price, -1);
        assert_eq!(second.rooms, None);
        assert_eq!(second.furnished, TriState::False);
        assert_eq!(second.utilities_included, TriState::Unknown);
    }

    #[test]
    fn test_unfurnished_interior_is_not_read_as_furnished() {
        let html = r#"
            <ul class="search-list">
              <li class="search-list__item search-list__item--listing">
                <a class="listing-search-item__link listing-search-item__link--title" href="/apartment-for-rent/eindhoven/ddd444/woenselse-markt">Apartment Woenselse Markt</a>
                <ul class="illustrated-features">
                  <li class="illustrated-features__item illustrated-features__item--interior">Unfurnished</li>
                </ul>
              </li>
            </ul>
        "#;
        let scraper = scraper_with(Arc::new(FixtureFetcher::default()));
        let listings = scraper.parse_search_page(html, SEARCH_URL, "eindhoven").unwrap();

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].furnished, TriState::False);
    }

    #[test]
    fn test_parse_utilities_requires_all_three_or_upholstery() {
        let scraper = scraper_with(Arc::new(FixtureFetcher::default()));
        assert_eq!(scraper.parse_utilities(DETAIL_WITH_BILLS), TriState::True);
        assert_eq!(scraper.parse_utilities(DETAIL_WITHOUT_FEATURES), TriState::Unknown);

        let partial = r#"<ul class="listing-features__sub-description"><li>Water and gas</li></ul>"#;
        assert_eq!(scraper.parse_utilities(partial), TriState::False);

        let upholstery = r#"<ul class="listing-features__sub-description"><li>Including upholstery</li></ul>"#;
        assert_eq!(scraper.parse_utilities(upholstery), TriState::True);
    }

    #[tokio::test]
    async fn test_scrape_skips_seen_links_without_detail_fetch() {
        let fetcher = Arc::new(
            FixtureFetcher::default()
                .with_page(SEARCH_URL, SEARCH_PAGE)
                .with_page("https://www.pararius.com/apartment-for-rent/eindhoven/bbb222/vestdijk", DETAIL_WITH_BILLS),
        );
        let scraper = scraper_with(fetcher.clone());

        let seen: HashSet<String> =
            ["https://www.pararius.com/apartment-for-rent/eindhoven/aaa111/kruisstraat".to_string()].into();
        let listings = scraper.scrape("eindhoven", &seen).await.unwrap();

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].name, "Apartment Vestdijk");
        assert_eq!(listings[0].utilities_included, TriState::True);
        assert_eq!(
            fetcher.requested(),
            vec![
                SEARCH_URL.to_string(),
                "https://www.pararius.com/apartment-for-rent/eindhoven/bbb222/vestdijk".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_scrape_propagates_detail_fetch_failure() {
        let fetcher = Arc::new(FixtureFetcher::default().with_page(SEARCH_URL, SEARCH_PAGE));
        let scraper = scraper_with(fetcher);

        let result = scraper.scrape("eindhoven", &HashSet::new()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_configured_selector_fails_construction() {
        let mut config = ParariusConfig::default();
        config.selectors.price = "div[".to_string();
        let result = ParariusScraper::new(Arc::new(FixtureFetcher::default()), &config);
        assert!(result.is_err());
    }
}
