mod kamernet;
mod pararius;

pub use kamernet::KamernetScraper;
pub use pararius::ParariusScraper;

use anyhow::Result;
use reqwest::Url;
use scraper::Selector;

pub(crate) fn selector(src: &str) -> Result<Selector> {
    Selector::parse(src).map_err(|e| anyhow::anyhow!("Invalid selector '{}': {:?}", src, e))
}

/// Resolves an href found on `base`. Empty or unresolvable hrefs give `None`.
pub(crate) fn absolute_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}
